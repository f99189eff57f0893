//! Policy documents
//!
//! Only the parts autogeneration touches are typed: the annotations that
//! select controllers and the rule list. Everything else round-trips through
//! flattened maps.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use policy_autogen::{
    ControllerKind, ControllerRuleGenerator, ControllerSet, CronJobRuleGenerator,
    PodControllerRuleGenerator, Rule, AUTOGEN_CONTROLLERS_ANNOTATION,
};

use crate::{Error, Result};

/// Kinds accepted as policy documents
const POLICY_KINDS: &[&str] = &["ClusterPolicy", "Policy"];

/// A `ClusterPolicy` or namespaced `Policy`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub api_version: String,
    pub kind: String,
    pub metadata: PolicyMetadata,
    pub spec: PolicySpec,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PolicyDocument {
    /// Parse a YAML or JSON policy document
    pub fn parse(input: &str) -> Result<Self> {
        let policy: Self = serde_yaml::from_str(input)?;
        if !POLICY_KINDS.contains(&policy.kind.as_str()) {
            return Err(Error::invalid_policy(format!(
                "unsupported kind '{}', expected one of {:?}",
                policy.kind, POLICY_KINDS
            )));
        }
        Ok(policy)
    }

    /// Controllers named by the autogen annotation, if present
    pub fn annotated_controllers(&self) -> Option<ControllerSet> {
        self.metadata
            .annotations
            .get(AUTOGEN_CONTROLLERS_ANNOTATION)
            .map(|value| ControllerSet::parse(value))
    }

    /// Append generated rules for `controllers`, returning how many were added.
    ///
    /// Pod-controller rules are generated without CronJob, which gets its own
    /// rule nested under `spec.jobTemplate`. Rules whose name is already in
    /// the policy are not added again.
    pub fn autogenerate(&mut self, controllers: &ControllerSet) -> usize {
        let pod_controllers = controllers.remove(&ControllerKind::CronJob);
        let pod_rules = PodControllerRuleGenerator::new();
        let cronjob_rules = CronJobRuleGenerator::new();

        let mut names: BTreeSet<String> = self.spec.rules.iter().map(|r| r.name.clone()).collect();
        let mut generated = Vec::new();

        for rule in &self.spec.rules {
            let candidates = [
                pod_rules.generate(rule, &pod_controllers),
                cronjob_rules.generate(rule, controllers),
            ];
            for candidate in candidates.into_iter().flatten() {
                if names.insert(candidate.name.clone()) {
                    generated.push(candidate);
                } else {
                    debug!(rule = %candidate.name, "generated rule already present");
                }
            }
        }

        let added = generated.len();
        info!(
            policy = %self.metadata.name,
            %controllers,
            added,
            "autogenerated controller rules"
        );
        self.spec.rules.extend(generated);
        added
    }
}
