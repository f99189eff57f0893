//! CronJob rule generation
//!
//! A CronJob embeds a Job template, which embeds the pod template:
//! `spec.jobTemplate.spec.template`. The CronJob rule is derived from the
//! generated `Job` rule by nesting its payload one level deeper, under
//! `spec.jobTemplate`, and retargeting its `Job` filters to `CronJob`.

use tracing::debug;

use crate::controllers::{ControllerKind, ControllerSet};
use crate::filters::{rewrite_exclude, rewrite_match};
use crate::generator::{ControllerRuleGenerator, PodControllerRuleGenerator};
use crate::payload::{nest_any_pattern, nest_under_spec, Payload};
use crate::rule::{Mutation, Rule, Validation};
use crate::variables::{find_and_shift_references, ReferencePivot};

/// Prefix of generated CronJob rule names
pub const CRONJOB_RULE_PREFIX: &str = "autogen-cronjob-";

/// Where a pod template sits inside a CronJob
pub const JOB_TEMPLATE_ANCHOR: &str = "spec/jobTemplate/spec/template";

const JOB_TEMPLATE_KEY: &str = "jobTemplate";

/// Generates CronJob rules on top of a `Job` rule generator
#[derive(Clone, Debug, Default)]
pub struct CronJobRuleGenerator<G = PodControllerRuleGenerator> {
    job_rules: G,
}

impl CronJobRuleGenerator {
    /// Create a generator backed by [`PodControllerRuleGenerator`]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: ControllerRuleGenerator> CronJobRuleGenerator<G> {
    /// Use `job_rules` to derive the `Job` rule the CronJob rule wraps
    pub fn with_job_rules(job_rules: G) -> Self {
        Self { job_rules }
    }

    /// Generate the CronJob rule for `rule`.
    ///
    /// Returns `None` when CronJob is not in `controllers`, when no `Job`
    /// rule can be derived, or when the payload has no CronJob form.
    pub fn generate(&self, rule: &Rule, controllers: &ControllerSet) -> Option<Rule> {
        if !controllers.contains(&ControllerKind::CronJob) {
            debug!(rule = %rule.name, %controllers, "CronJob not requested, skipping");
            return None;
        }

        let mut job_rule = self
            .job_rules
            .generate(rule, &ControllerSet::from(ControllerKind::Job))?;

        let job = ControllerKind::Job.as_str();
        let cronjob = vec![ControllerKind::CronJob.to_string()];
        let payload = Payload::take(&mut job_rule);

        debug!(rule = %rule.name, payload = payload.name(), "generating rule for CronJob");

        let mut cronjob_rule = Rule {
            name: crate::autogen_rule_name(CRONJOB_RULE_PREFIX, &rule.name),
            match_resources: rewrite_match(&job_rule.match_resources, job, &cronjob),
            exclude_resources: job_rule
                .exclude_resources
                .as_ref()
                .map(|exclude| rewrite_exclude(exclude, job, &cronjob)),
            context: job_rule.context,
            preconditions: job_rule.preconditions,
            ..Default::default()
        };

        // Messages are shifted from the source rule: the Job rule's message
        // already points under spec/template
        let message = rule.validation_message();
        let shifted = |pivot| find_and_shift_references(message, JOB_TEMPLATE_ANCHOR, pivot);

        match payload {
            Payload::Overlay(overlay) => {
                cronjob_rule.mutation = Some(Mutation {
                    overlay: Some(nest_under_spec(JOB_TEMPLATE_KEY, overlay)),
                    ..Default::default()
                });
            }
            Payload::StrategicMerge(patch) => {
                cronjob_rule.mutation = Some(Mutation {
                    patch_strategic_merge: Some(nest_under_spec(JOB_TEMPLATE_KEY, patch)),
                    ..Default::default()
                });
            }
            Payload::Pattern(pattern) => {
                cronjob_rule.validation = Some(Validation {
                    message: shifted(ReferencePivot::Pattern),
                    pattern: Some(nest_under_spec(JOB_TEMPLATE_KEY, pattern)),
                    ..Default::default()
                });
            }
            Payload::ForEachValidationPattern(each) => {
                cronjob_rule.validation = Some(Validation {
                    message: shifted(ReferencePivot::Pattern),
                    for_each: Some(each),
                    ..Default::default()
                });
            }
            Payload::AnyPattern(any_pattern) => {
                cronjob_rule.validation = Some(Validation {
                    message: shifted(ReferencePivot::AnyPattern),
                    any_pattern: nest_any_pattern(&rule.name, JOB_TEMPLATE_KEY, any_pattern),
                    ..Default::default()
                });
            }
            // foreach deny shares the anyPattern reference shift
            Payload::ForEachValidationAnyPattern(each) | Payload::ForEachValidationDeny(each) => {
                cronjob_rule.validation = Some(Validation {
                    message: shifted(ReferencePivot::AnyPattern),
                    for_each: Some(each),
                    ..Default::default()
                });
            }
            Payload::ForEachMutationPatch(each) => {
                cronjob_rule.mutation = Some(Mutation {
                    for_each: Some(each),
                    ..Default::default()
                });
            }
            Payload::VerifyImages(images) => cronjob_rule.verify_images = images,
            Payload::Deny(_) | Payload::None => {
                debug!(rule = %rule.name, "payload has no CronJob form");
                return None;
            }
        }

        Some(cronjob_rule)
    }
}

/// Generate the CronJob rule for `rule` with the default `Job` generator
pub fn generate_cronjob_rule(rule: &Rule, controllers: &ControllerSet) -> Option<Rule> {
    CronJobRuleGenerator::new().generate(rule, controllers)
}
