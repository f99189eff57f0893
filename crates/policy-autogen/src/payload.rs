//! Rule payload classification
//!
//! A rule carries at most one effect, but the wire model spreads it over
//! several optional fields. [`Payload`] collapses them into one variant so
//! generators handle every shape with a single exhaustive `match`. When a
//! malformed rule sets several fields, the declaration order of the variants
//! decides which one wins.

use serde_json::{Map, Value};
use tracing::warn;

use crate::rule::{
    deserialize_any_pattern, ForEachMutation, ForEachValidation, ImageVerification, Mutation,
    Rule, Validation,
};

/// The effect of a rule, in dispatch order
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// `mutate.overlay`
    Overlay(Value),
    /// `mutate.patchStrategicMerge`
    StrategicMerge(Value),
    /// `validate.pattern`
    Pattern(Value),
    /// `validate.deny`
    ///
    /// Checked ahead of the `foreach` shapes: a rule that sets both `deny`
    /// and `foreach` classifies as `Deny`, which the CronJob wrapper does not
    /// wrap.
    Deny(Value),
    /// `validate.foreach` with a pattern
    ForEachValidationPattern(ForEachValidation),
    /// `validate.anyPattern`
    AnyPattern(Value),
    /// `validate.foreach` with an anyPattern
    ForEachValidationAnyPattern(ForEachValidation),
    /// `validate.foreach` with deny conditions
    ForEachValidationDeny(ForEachValidation),
    /// `mutate.foreach` with a strategic merge patch
    ForEachMutationPatch(ForEachMutation),
    /// `verifyImages`
    VerifyImages(Vec<ImageVerification>),
    /// No recognized effect
    None,
}

impl Payload {
    /// Move the payload out of an owned rule, leaving its payload fields empty
    pub fn take(rule: &mut Rule) -> Self {
        Self::from_parts(
            rule.mutation.take(),
            rule.validation.take(),
            std::mem::take(&mut rule.verify_images),
        )
    }

    /// Copy the payload of a borrowed rule
    pub fn of(rule: &Rule) -> Self {
        Self::from_parts(
            rule.mutation.clone(),
            rule.validation.clone(),
            rule.verify_images.clone(),
        )
    }

    /// Classify payload fields; the first populated shape wins
    pub fn from_parts(
        mutation: Option<Mutation>,
        validation: Option<Validation>,
        verify_images: Vec<ImageVerification>,
    ) -> Self {
        let Mutation {
            overlay,
            patch_strategic_merge,
            for_each: mutate_each,
            ..
        } = mutation.unwrap_or_default();
        let Validation {
            pattern,
            any_pattern,
            deny,
            for_each: mut validate_each,
            ..
        } = validation.unwrap_or_default();

        if let Some(overlay) = overlay {
            return Self::Overlay(overlay);
        }
        if let Some(patch) = patch_strategic_merge {
            return Self::StrategicMerge(patch);
        }
        if let Some(pattern) = pattern {
            return Self::Pattern(pattern);
        }
        if let Some(deny) = deny {
            return Self::Deny(deny);
        }
        if let Some(each) = validate_each.take_if(|each| each.pattern.is_some()) {
            return Self::ForEachValidationPattern(each);
        }
        if let Some(any_pattern) = any_pattern {
            return Self::AnyPattern(any_pattern);
        }
        if let Some(each) = validate_each.take_if(|each| each.any_pattern.is_some()) {
            return Self::ForEachValidationAnyPattern(each);
        }
        if let Some(each) = validate_each.take_if(|each| each.deny.is_some()) {
            return Self::ForEachValidationDeny(each);
        }
        if let Some(each) = mutate_each.filter(|each| each.patch_strategic_merge.is_some()) {
            return Self::ForEachMutationPatch(each);
        }
        if !verify_images.is_empty() {
            return Self::VerifyImages(verify_images);
        }
        Self::None
    }

    /// Short name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Overlay(_) => "overlay",
            Self::StrategicMerge(_) => "patchStrategicMerge",
            Self::Pattern(_) => "pattern",
            Self::Deny(_) => "deny",
            Self::ForEachValidationPattern(_) => "foreach.pattern",
            Self::AnyPattern(_) => "anyPattern",
            Self::ForEachValidationAnyPattern(_) => "foreach.anyPattern",
            Self::ForEachValidationDeny(_) => "foreach.deny",
            Self::ForEachMutationPatch(_) => "foreach.patchStrategicMerge",
            Self::VerifyImages(_) => "verifyImages",
            Self::None => "none",
        }
    }
}

/// Wrap `tree` as `{"spec": {key: tree}}`
pub fn nest_under_spec(key: &str, tree: Value) -> Value {
    let mut spec = Map::new();
    spec.insert(key.to_string(), tree);
    let mut root = Map::new();
    root.insert("spec".to_string(), Value::Object(spec));
    Value::Object(root)
}

/// Wrap every element of an `anyPattern` array under `spec.<key>`.
///
/// A value that is not an array is logged and treated as no patterns; `None`
/// is returned when there is nothing to wrap.
pub fn nest_any_pattern(rule: &str, key: &str, any_pattern: Value) -> Option<Value> {
    let patterns = deserialize_any_pattern(any_pattern).unwrap_or_else(|e| {
        warn!(rule = %rule, error = %e, "failed to deserialize anyPattern, expected an array");
        Vec::new()
    });
    if patterns.is_empty() {
        return None;
    }
    Some(Value::Array(
        patterns
            .into_iter()
            .map(|pattern| nest_under_spec(key, pattern))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn validation(value: Value) -> Option<Validation> {
        Some(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn overlay_wins_over_strategic_merge() {
        let mutation = Mutation {
            overlay: Some(json!({"a": 1})),
            patch_strategic_merge: Some(json!({"b": 2})),
            ..Default::default()
        };
        assert_eq!(
            Payload::from_parts(Some(mutation), None, vec![]),
            Payload::Overlay(json!({"a": 1}))
        );
    }

    #[test]
    fn pattern_wins_over_any_pattern() {
        let payload = Payload::from_parts(
            None,
            validation(json!({"pattern": {"p": 1}, "anyPattern": [{"q": 1}]})),
            vec![],
        );
        assert_eq!(payload, Payload::Pattern(json!({"p": 1})));
    }

    #[test]
    fn foreach_pattern_precedes_any_pattern() {
        let payload = Payload::from_parts(
            None,
            validation(json!({"anyPattern": [{"q": 1}], "foreach": {"pattern": {"p": 1}}})),
            vec![],
        );
        assert_eq!(payload.name(), "foreach.pattern");
    }

    #[test]
    fn foreach_shapes_are_told_apart() {
        let any = Payload::from_parts(
            None,
            validation(json!({"foreach": {"list": "x", "anyPattern": [{}]}})),
            vec![],
        );
        assert_eq!(any.name(), "foreach.anyPattern");

        let deny = Payload::from_parts(
            None,
            validation(json!({"foreach": {"list": "x", "deny": {}}})),
            vec![],
        );
        assert_eq!(deny.name(), "foreach.deny");
    }

    #[test]
    fn deny_precedes_foreach_shapes() {
        let payload = Payload::from_parts(
            None,
            validation(json!({"deny": {}, "foreach": {"list": "x", "pattern": {"p": 1}}})),
            vec![],
        );
        assert_eq!(payload, Payload::Deny(json!({})));
    }

    #[test]
    fn unread_fields_do_not_make_a_payload() {
        let payload = Payload::from_parts(
            serde_json::from_value(json!({"patchesJson6902": "[]"})).unwrap(),
            validation(json!({"message": "m", "cel": {"expressions": []}})),
            vec![],
        );
        assert_eq!(payload, Payload::None);
    }

    #[test]
    fn foreach_mutation_needs_a_patch() {
        let mutation: Mutation =
            serde_json::from_value(json!({"foreach": {"list": "x"}})).unwrap();
        assert_eq!(
            Payload::from_parts(Some(mutation), None, vec![]),
            Payload::None
        );
    }

    #[test]
    fn verify_images_come_last() {
        let images = vec![ImageVerification(json!({"image": "ghcr.io/*"}))];
        assert_eq!(
            Payload::from_parts(None, None, images.clone()),
            Payload::VerifyImages(images)
        );
    }

    #[test]
    fn take_empties_the_rule() {
        let mut rule = Rule {
            validation: validation(json!({"message": "m", "pattern": {}})),
            ..Rule::new("r")
        };
        assert_eq!(Payload::take(&mut rule), Payload::Pattern(json!({})));
        assert!(rule.validation.is_none());
    }

    #[test]
    fn nesting_adds_two_levels() {
        assert_eq!(
            nest_under_spec("jobTemplate", json!({"spec": {"replicas": 3}})),
            json!({"spec": {"jobTemplate": {"spec": {"replicas": 3}}}})
        );
    }

    #[test]
    fn malformed_any_pattern_wraps_nothing() {
        assert_eq!(nest_any_pattern("r", "template", json!("not-a-list")), None);
        assert_eq!(nest_any_pattern("r", "template", json!([])), None);
    }

    #[test]
    fn any_pattern_elements_are_wrapped_independently() {
        assert_eq!(
            nest_any_pattern("r", "template", json!([{"a": 1}, {"b": 2}])),
            Some(json!([
                {"spec": {"template": {"a": 1}}},
                {"spec": {"template": {"b": 2}}}
            ]))
        );
    }
}
