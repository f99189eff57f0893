//! Controller-rule autogeneration for Pod policies
//!
//! A rule written against `Pod` only sees bare pods. Pods created through a
//! controller (Deployment, Job, CronJob, ...) are admitted via their owner, so
//! each Pod rule is rewritten into rules that match the owning controllers:
//!
//! - [`PodControllerRuleGenerator`] nests the payload under `spec.template` for
//!   controllers that embed a pod template directly
//! - [`CronJobRuleGenerator`] takes the `Job` rule one level deeper, under
//!   `spec.jobTemplate`, for CronJobs that embed a Job template
//!
//! Generation is pure: no I/O, no shared state. "Not applicable" is `None`,
//! never an error.
//!
//! # Usage
//!
//! ```rust,ignore
//! let controllers = ControllerSet::parse("Deployment,CronJob");
//! if let Some(rule) = generate_cronjob_rule(&pod_rule, &controllers) {
//!     policy.rules.push(rule);
//! }
//! ```

#![cfg_attr(not(test), deny(missing_docs))]

pub mod controllers;
pub mod cronjob;
pub mod error;
pub mod filters;
pub mod generator;
pub mod payload;
pub mod rule;
pub mod variables;

pub use controllers::{ControllerKind, ControllerSet};
pub use cronjob::{generate_cronjob_rule, CronJobRuleGenerator};
pub use error::{AutogenError, Result};
pub use generator::{ControllerRuleGenerator, PodControllerRuleGenerator};
pub use payload::Payload;
pub use rule::{
    ForEachMutation, ForEachValidation, ImageVerification, Mutation, ResourceDescription,
    ResourceFilter, ResourceFilterSet, Rule, Validation,
};
pub use variables::{find_and_shift_references, ReferencePivot};

/// Policy annotation listing the controllers to autogenerate rules for
pub const AUTOGEN_CONTROLLERS_ANNOTATION: &str = "pod-policies.kyverno.io/autogen-controllers";

/// Controllers used when a policy does not carry the annotation
pub const DEFAULT_AUTOGEN_CONTROLLERS: &str = "all";

/// Maximum length of a rule name (Kubernetes name limit)
pub const MAX_RULE_NAME_LENGTH: usize = 63;

/// Build `prefix + name`, cut to [`MAX_RULE_NAME_LENGTH`] bytes.
///
/// The cut lands on the nearest char boundary at or below the limit so the
/// result stays valid UTF-8; for ASCII names this is a plain byte cut.
pub(crate) fn autogen_rule_name(prefix: &str, name: &str) -> String {
    let mut generated = format!("{prefix}{name}");
    if generated.len() > MAX_RULE_NAME_LENGTH {
        let mut end = MAX_RULE_NAME_LENGTH;
        while !generated.is_char_boundary(end) {
            end -= 1;
        }
        generated.truncate(end);
    }
    generated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_untouched() {
        assert_eq!(autogen_rule_name("autogen-", "chk"), "autogen-chk");
    }

    #[test]
    fn long_names_are_cut_at_limit() {
        let name = "a".repeat(70);
        let generated = autogen_rule_name("autogen-cronjob-", &name);
        assert_eq!(generated.len(), MAX_RULE_NAME_LENGTH);
        assert_eq!(
            generated.as_str(),
            &format!("autogen-cronjob-{name}")[..MAX_RULE_NAME_LENGTH]
        );
    }

    #[test]
    fn cut_respects_char_boundaries() {
        // 62 ASCII bytes then a 2-byte char straddling the limit
        let name = format!("{}é", "a".repeat(54));
        let generated = autogen_rule_name("autogen-", &name);
        assert_eq!(generated.len(), 62);
        assert!(generated.ends_with('a'));
    }
}
