//! Policy rule model
//!
//! Typed view of the rule fields autogeneration reads and rewrites. Wire
//! names follow the policy CRD (`match`, `exclude`, `mutate`, `validate`,
//! `verifyImages`). Pattern and patch trees stay `serde_json::Value`: their
//! shape mirrors the resource they match, not a fixed schema. Fields that
//! autogeneration never inspects are captured by `#[serde(flatten)]` maps so a
//! policy survives a parse/serialize round-trip. Generated rules are built
//! fresh and do not inherit the rule-level, `mutate` or `validate` extras.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AutogenError, Result};

// =============================================================================
// Rule
// =============================================================================

/// A single policy rule
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule name, unique within the policy
    pub name: String,
    /// Resources the rule applies to
    #[serde(rename = "match", default)]
    pub match_resources: ResourceFilterSet,
    /// Resources carved out of the match. `None` means "no exclusions".
    #[serde(rename = "exclude", default, skip_serializing_if = "Option::is_none")]
    pub exclude_resources: Option<ResourceFilterSet>,
    /// Context entries (config maps, API calls), carried verbatim
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,
    /// Preconditions, carried verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Value>,
    /// Mutation payload
    #[serde(rename = "mutate", default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
    /// Validation payload
    #[serde(rename = "validate", default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// Image verification payload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_images: Vec<ImageVerification>,
    /// `generate`, `imageExtractors` and other fields autogeneration does not
    /// read. Kept for round-trips, never copied into generated rules.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Rule {
    /// Create an empty rule with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Validation message, or `""` when the rule has none
    pub fn validation_message(&self) -> &str {
        self.validation
            .as_ref()
            .map(|v| v.message.as_str())
            .unwrap_or_default()
    }
}

// =============================================================================
// Resource filters
// =============================================================================

/// Match or exclude criteria of a rule.
///
/// Exactly one form is in use: `any` (disjunction), `all` (conjunction), or
/// the flat `resources` description.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFilterSet {
    /// Filters of which at least one must match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<ResourceFilter>,
    /// Filters that must all match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<ResourceFilter>,
    /// Flat resource description
    #[serde(default, skip_serializing_if = "ResourceDescription::is_empty")]
    pub resources: ResourceDescription,
    /// User info (roles, clusterRoles, subjects), carried verbatim
    #[serde(flatten)]
    pub user_info: BTreeMap<String, Value>,
}

impl ResourceFilterSet {
    /// Flat filter set matching the given kinds
    pub fn with_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resources: ResourceDescription::with_kinds(kinds),
            ..Default::default()
        }
    }

    /// Kinds of the flat resource description
    pub fn kinds(&self) -> &[String] {
        &self.resources.kinds
    }

    /// Every kind referenced by the flat description and by `any`/`all` items
    pub fn all_kinds(&self) -> Vec<&str> {
        self.resources
            .kinds
            .iter()
            .chain(self.any.iter().flat_map(|f| f.resources.kinds.iter()))
            .chain(self.all.iter().flat_map(|f| f.resources.kinds.iter()))
            .map(String::as_str)
            .collect()
    }

    /// Whether no criteria are set at all
    pub fn is_empty(&self) -> bool {
        self.any.is_empty()
            && self.all.is_empty()
            && self.resources.is_empty()
            && self.user_info.is_empty()
    }
}

/// One item of an `any`/`all` filter list
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFilter {
    /// Resource description of this item
    #[serde(default, skip_serializing_if = "ResourceDescription::is_empty")]
    pub resources: ResourceDescription,
    /// User info (roles, clusterRoles, subjects), carried verbatim
    #[serde(flatten)]
    pub user_info: BTreeMap<String, Value>,
}

impl ResourceFilter {
    /// Filter item matching the given kinds
    pub fn with_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resources: ResourceDescription::with_kinds(kinds),
            ..Default::default()
        }
    }

    /// Kinds of this item
    pub fn kinds(&self) -> &[String] {
        &self.resources.kinds
    }
}

/// Resource kinds plus selectors
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescription {
    /// Resource kinds, optionally wildcarded (`"*"`, `"Deploy*"`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
    /// Names, namespaces, label and namespace selectors, carried verbatim
    #[serde(flatten)]
    pub selectors: BTreeMap<String, Value>,
}

impl ResourceDescription {
    /// Description matching the given kinds
    pub fn with_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
            selectors: BTreeMap::new(),
        }
    }

    /// Whether neither kinds nor selectors are set
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty() && self.selectors.is_empty()
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// Mutation payload
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    /// Patch-by-example overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<Value>,
    /// Strategic merge patch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_strategic_merge: Option<Value>,
    /// Per-item mutation
    #[serde(rename = "foreach", default, skip_serializing_if = "Option::is_none")]
    pub for_each: Option<ForEachMutation>,
    /// `patchesJson6902`, `targets` and other mutation fields, carried verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Per-item mutation descriptor. Paths are relative to each list element.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForEachMutation {
    /// Strategic merge patch applied to each element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_strategic_merge: Option<Value>,
    /// `list`, `context`, `preconditions`, carried verbatim
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// Validation payload
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// Message shown on failure; may embed `$(...)` path references
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Single pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,
    /// Alternative patterns; expected to be an array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_pattern: Option<Value>,
    /// Deny conditions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Value>,
    /// Per-item validation
    #[serde(rename = "foreach", default, skip_serializing_if = "Option::is_none")]
    pub for_each: Option<ForEachValidation>,
    /// `cel`, `podSecurity`, `failureAction` and other validation fields,
    /// carried verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Per-item validation descriptor. Paths are relative to each list element.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForEachValidation {
    /// Pattern applied to each element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,
    /// Alternative patterns applied to each element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_pattern: Option<Value>,
    /// Deny conditions evaluated per element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Value>,
    /// `list`, `context`, `preconditions`, carried verbatim
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

/// Image verification descriptor, carried verbatim
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ImageVerification(pub Value);

/// Split an `anyPattern` value into its pattern trees
pub fn deserialize_any_pattern(any_pattern: Value) -> Result<Vec<Value>> {
    match any_pattern {
        Value::Array(patterns) => Ok(patterns),
        other => Err(AutogenError::MalformedPatternArray {
            found: json_type(&other),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
