//! Pod-controller rule generation
//!
//! Derives a rule for controllers that embed a pod template under
//! `spec.template` (DaemonSet, Deployment, Job, StatefulSet) from a rule
//! written against `Pod`. The CronJob generator builds on the `Job` output of
//! this step.

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::controllers::{ControllerKind, ControllerSet};
use crate::filters::{contains_kind_exact, rewrite_exclude, rewrite_match};
use crate::payload::{nest_any_pattern, nest_under_spec, Payload};
use crate::rule::{Mutation, Rule, Validation};
use crate::variables::{find_and_shift_references, ReferencePivot};

/// Prefix shared by every generated rule name
pub const AUTOGEN_RULE_PREFIX: &str = "autogen-";

/// Kind that source rules must match
pub const POD_KIND: &str = "Pod";

/// Where a pod template sits inside a pod controller
pub const POD_TEMPLATE_ANCHOR: &str = "spec/template";

const TEMPLATE_KEY: &str = "template";

/// Derives a controller-targeted rule from a Pod rule
#[cfg_attr(test, automock)]
pub trait ControllerRuleGenerator: Send + Sync {
    /// Generate the rule for `controllers`, or `None` when it does not apply
    fn generate(&self, rule: &Rule, controllers: &ControllerSet) -> Option<Rule>;
}

/// Generator for controllers with a `spec.template` pod template
#[derive(Clone, Copy, Debug, Default)]
pub struct PodControllerRuleGenerator;

impl PodControllerRuleGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self
    }
}

impl ControllerRuleGenerator for PodControllerRuleGenerator {
    fn generate(&self, rule: &Rule, controllers: &ControllerSet) -> Option<Rule> {
        if rule.name.starts_with(AUTOGEN_RULE_PREFIX) {
            debug!(rule = %rule.name, "rule is already generated, skipping");
            return None;
        }

        let kinds = pod_template_owners(controllers);
        if kinds.is_empty() {
            debug!(rule = %rule.name, %controllers, "no pod controllers requested");
            return None;
        }

        if !matches_pods_only(rule) {
            debug!(rule = %rule.name, "rule does not target Pods, skipping");
            return None;
        }

        let mut generated = Rule {
            name: crate::autogen_rule_name(AUTOGEN_RULE_PREFIX, &rule.name),
            match_resources: rewrite_match(&rule.match_resources, POD_KIND, &kinds),
            exclude_resources: rule
                .exclude_resources
                .as_ref()
                .filter(|exclude| !exclude.is_empty())
                .map(|exclude| rewrite_exclude(exclude, POD_KIND, &kinds)),
            context: rule.context.clone(),
            preconditions: rule.preconditions.clone(),
            ..Default::default()
        };

        let message = rule.validation_message();
        let shifted = |pivot| find_and_shift_references(message, POD_TEMPLATE_ANCHOR, pivot);

        let payload = Payload::of(rule);
        debug!(rule = %rule.name, payload = payload.name(), controllers = ?kinds, "generating pod controller rule");

        match payload {
            Payload::Overlay(overlay) => {
                generated.mutation = Some(Mutation {
                    overlay: Some(nest_under_spec(TEMPLATE_KEY, overlay)),
                    ..Default::default()
                });
            }
            Payload::StrategicMerge(patch) => {
                generated.mutation = Some(Mutation {
                    patch_strategic_merge: Some(nest_under_spec(TEMPLATE_KEY, patch)),
                    ..Default::default()
                });
            }
            Payload::Pattern(pattern) => {
                generated.validation = Some(Validation {
                    message: shifted(ReferencePivot::Pattern),
                    pattern: Some(nest_under_spec(TEMPLATE_KEY, pattern)),
                    ..Default::default()
                });
            }
            Payload::Deny(deny) => {
                generated.validation = Some(Validation {
                    message: shifted(ReferencePivot::Pattern),
                    deny: Some(deny),
                    ..Default::default()
                });
            }
            Payload::ForEachValidationPattern(each) => {
                generated.validation = Some(Validation {
                    message: shifted(ReferencePivot::Pattern),
                    for_each: Some(each),
                    ..Default::default()
                });
            }
            Payload::AnyPattern(any_pattern) => {
                generated.validation = Some(Validation {
                    message: shifted(ReferencePivot::AnyPattern),
                    any_pattern: nest_any_pattern(&rule.name, TEMPLATE_KEY, any_pattern),
                    ..Default::default()
                });
            }
            Payload::ForEachValidationAnyPattern(each) | Payload::ForEachValidationDeny(each) => {
                generated.validation = Some(Validation {
                    message: shifted(ReferencePivot::AnyPattern),
                    for_each: Some(each),
                    ..Default::default()
                });
            }
            Payload::ForEachMutationPatch(each) => {
                generated.mutation = Some(Mutation {
                    for_each: Some(each),
                    ..Default::default()
                });
            }
            Payload::VerifyImages(images) => generated.verify_images = images,
            Payload::None => return None,
        }

        Some(generated)
    }
}

/// Requested controllers that own a `spec.template`, as kind names.
///
/// `all` expands to every such controller; CronJob is never included.
fn pod_template_owners(controllers: &ControllerSet) -> Vec<String> {
    let owners = &ControllerKind::POD_TEMPLATE_OWNERS;
    if controllers.is_wildcard() {
        return owners.iter().map(ToString::to_string).collect();
    }
    controllers
        .iter()
        .filter(|kind| owners.contains(kind))
        .map(ToString::to_string)
        .collect()
}

/// The match must name `Pod`; a kind-based exclude must name it too
fn matches_pods_only(rule: &Rule) -> bool {
    if !contains_kind_exact(&rule.match_resources.all_kinds(), POD_KIND) {
        return false;
    }
    let exclude_kinds = rule
        .exclude_resources
        .as_ref()
        .map(|exclude| exclude.all_kinds())
        .unwrap_or_default();
    exclude_kinds.is_empty() || contains_kind_exact(&exclude_kinds, POD_KIND)
}
