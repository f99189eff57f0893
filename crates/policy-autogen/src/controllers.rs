//! Controller sets for autogeneration
//!
//! The autogen annotation lists controllers as a comma-separated string
//! (`"Deployment,CronJob"`, `"all"`, `"none"`). It is parsed once into an
//! ordered set of [`ControllerKind`]s; `all` is kept as an explicit wildcard
//! member instead of a magic string.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// ControllerKind
// =============================================================================

/// A pod-owning controller kind named in a controller set
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    /// Wildcard: every controller
    All,
    /// apps/v1 DaemonSet
    DaemonSet,
    /// apps/v1 Deployment
    Deployment,
    /// batch/v1 Job
    Job,
    /// apps/v1 StatefulSet
    StatefulSet,
    /// batch/v1 CronJob
    CronJob,
    /// Any other token, kept verbatim
    Other(String),
}

impl ControllerKind {
    /// Controllers that embed a pod template directly under `spec.template`
    pub const POD_TEMPLATE_OWNERS: [ControllerKind; 4] = [
        ControllerKind::DaemonSet,
        ControllerKind::Deployment,
        ControllerKind::Job,
        ControllerKind::StatefulSet,
    ];

    /// Parse a single token. Known kinds match case-insensitively.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.to_ascii_lowercase().as_str() {
            "all" => Self::All,
            "daemonset" => Self::DaemonSet,
            "deployment" => Self::Deployment,
            "job" => Self::Job,
            "statefulset" => Self::StatefulSet,
            "cronjob" => Self::CronJob,
            _ => Self::Other(token.to_string()),
        }
    }

    /// Canonical kind name (`"all"` for the wildcard)
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "all",
            Self::DaemonSet => "DaemonSet",
            Self::Deployment => "Deployment",
            Self::Job => "Job",
            Self::StatefulSet => "StatefulSet",
            Self::CronJob => "CronJob",
            Self::Other(token) => token,
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ControllerSet
// =============================================================================

/// Ordered, duplicate-free set of controller kinds.
///
/// Serializes as the comma-joined string used by the policy annotation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ControllerSet {
    kinds: Vec<ControllerKind>,
}

impl ControllerSet {
    /// Parse a comma-separated list. Empty tokens are ignored; never fails.
    pub fn parse(controllers: &str) -> Self {
        controllers
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .map(ControllerKind::parse)
            .collect()
    }

    /// Whether `kind` is a member, either explicitly or through `all`
    pub fn contains(&self, kind: &ControllerKind) -> bool {
        self.is_wildcard() || self.kinds.contains(kind)
    }

    /// Whether the set holds the `all` wildcard
    pub fn is_wildcard(&self) -> bool {
        self.kinds.contains(&ControllerKind::All)
    }

    /// Copy of this set without `kind`; remaining order is preserved.
    ///
    /// The result is normalized, not a rejoin of the input tokens: known kinds
    /// print in canonical case and duplicates are gone, so
    /// `"deployment,cronjob,deployment"` becomes `"Deployment"`.
    pub fn remove(&self, kind: &ControllerKind) -> Self {
        self.kinds.iter().filter(|k| *k != kind).cloned().collect()
    }

    /// Members in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ControllerKind> {
        self.kinds.iter()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl FromIterator<ControllerKind> for ControllerSet {
    fn from_iter<I: IntoIterator<Item = ControllerKind>>(iter: I) -> Self {
        let mut kinds = Vec::new();
        for kind in iter {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Self { kinds }
    }
}

impl From<ControllerKind> for ControllerSet {
    fn from(kind: ControllerKind) -> Self {
        Self { kinds: vec![kind] }
    }
}

impl FromStr for ControllerSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for ControllerSet {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ControllerSet> for String {
    fn from(set: ControllerSet) -> Self {
        set.to_string()
    }
}

impl fmt::Display for ControllerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.kinds.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(kind.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::exact("CronJob", true)]
    #[case::lowercase("cronjob,job", true)]
    #[case::spaced("Deployment, CronJob", true)]
    #[case::wildcard("all", true)]
    #[case::wildcard_among_others("Deployment,all", true)]
    #[case::absent("pod,deployment", false)]
    #[case::job_only("Job", false)]
    #[case::empty("", false)]
    #[case::none("none", false)]
    fn cronjob_membership(#[case] controllers: &str, #[case] expected: bool) {
        let set = ControllerSet::parse(controllers);
        assert_eq!(set.contains(&ControllerKind::CronJob), expected);
    }

    #[test]
    fn wildcard_matches_unknown_tokens() {
        let set = ControllerSet::parse("all");
        assert!(set.contains(&ControllerKind::Other("ReplicaSet".to_string())));
    }

    #[rstest]
    #[case::middle("Deployment,CronJob,Job", "Deployment,Job")]
    #[case::only("CronJob", "")]
    #[case::absent("Deployment,Job", "Deployment,Job")]
    #[case::duplicates("CronJob,Job,cronjob", "Job")]
    #[case::stray_commas(",CronJob,,StatefulSet,", "StatefulSet")]
    #[case::empty("", "")]
    #[case::normalized("deployment,cronjob,deployment", "Deployment")]
    fn remove_cronjob(#[case] controllers: &str, #[case] expected: &str) {
        let set = ControllerSet::parse(controllers);
        assert_eq!(set.remove(&ControllerKind::CronJob).to_string(), expected);
    }

    #[test]
    fn parse_preserves_order_and_drops_duplicates() {
        let set = ControllerSet::parse("StatefulSet,Deployment,statefulset");
        let kinds: Vec<_> = set.iter().cloned().collect();
        assert_eq!(
            kinds,
            vec![ControllerKind::StatefulSet, ControllerKind::Deployment]
        );
    }

    #[test]
    fn unknown_tokens_survive_reserialization() {
        let set = ControllerSet::parse("ReplicaSet,CronJob");
        assert_eq!(
            set.remove(&ControllerKind::CronJob).to_string(),
            "ReplicaSet"
        );
    }

    #[test]
    fn serde_uses_annotation_string() {
        let set: ControllerSet = serde_json::from_str("\"Deployment,CronJob\"").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            "\"Deployment,CronJob\""
        );
    }
}
