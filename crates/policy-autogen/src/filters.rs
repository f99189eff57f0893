//! Resource-filter rewriting
//!
//! Retargets match/exclude criteria from one kind to another. The populated
//! form is rewritten: `any` first, then `all`, and only when neither is set
//! the flat kind list.

use globset::Glob;
use tracing::debug;

use crate::rule::{ResourceFilter, ResourceFilterSet};

/// When the flat kind list is replaced if neither `any` nor `all` is set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KindsFallback {
    /// Always replace (match criteria)
    Always,
    /// Replace only a non-empty list, so "no exclusions" stays distinct
    /// from "excludes by kind" (exclude criteria)
    WhenPresent,
}

/// Rewrite match criteria that reference `from` so they reference `to`
pub fn rewrite_match(set: &ResourceFilterSet, from: &str, to: &[String]) -> ResourceFilterSet {
    rewrite_set(set, from, to, KindsFallback::Always)
}

/// Rewrite exclude criteria that reference `from` so they reference `to`.
///
/// An empty flat kind list is left empty.
pub fn rewrite_exclude(set: &ResourceFilterSet, from: &str, to: &[String]) -> ResourceFilterSet {
    rewrite_set(set, from, to, KindsFallback::WhenPresent)
}

fn rewrite_set(
    set: &ResourceFilterSet,
    from: &str,
    to: &[String],
    fallback: KindsFallback,
) -> ResourceFilterSet {
    let mut rewritten = set.clone();
    if !set.any.is_empty() {
        rewritten.any = rewrite_filters(&set.any, from, to);
    } else if !set.all.is_empty() {
        rewritten.all = rewrite_filters(&set.all, from, to);
    } else if fallback == KindsFallback::Always || !set.resources.kinds.is_empty() {
        rewritten.resources.kinds = to.to_vec();
    }
    rewritten
}

/// Copy `filters`, replacing the kinds of every item that matches `from`.
///
/// Matching items get `to` wholesale: other kinds they listed are dropped,
/// since a generated rule targets exactly one controller family.
pub fn rewrite_filters(filters: &[ResourceFilter], from: &str, to: &[String]) -> Vec<ResourceFilter> {
    filters
        .iter()
        .map(|filter| {
            let mut filter = filter.clone();
            if contains_kind(&filter.resources.kinds, from) {
                filter.resources.kinds = to.to_vec();
            }
            filter
        })
        .collect()
}

/// Whether any entry of `kinds`, read as a wildcard pattern, matches `kind`
pub fn contains_kind<S: AsRef<str>>(kinds: &[S], kind: &str) -> bool {
    kinds.iter().any(|k| wildcard_match(k.as_ref(), kind))
}

/// Whether `kinds` lists `kind` literally
pub fn contains_kind_exact<S: AsRef<str>>(kinds: &[S], kind: &str) -> bool {
    kinds.iter().any(|k| k.as_ref() == kind)
}

/// Glob-style match: `*` matches any run of characters, `?` exactly one.
///
/// A pattern that is not a valid glob is compared literally.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(name),
        Err(e) => {
            debug!(pattern, error = %e, "kind is not a valid glob, comparing literally");
            pattern == name
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn cronjob() -> Vec<String> {
        vec!["CronJob".to_string()]
    }

    #[rstest]
    #[case::literal("Job", "Job", true)]
    #[case::different("Pod", "Job", false)]
    #[case::star("*", "Job", true)]
    #[case::prefix("Cron*", "CronJob", true)]
    #[case::prefix_miss("Cron*", "Job", false)]
    #[case::question("J?b", "Job", true)]
    #[case::inner_star("D*t", "Deployment", true)]
    #[case::backtracking("*ob*b", "CronJobJob", true)]
    #[case::trailing_literal("*Set", "DaemonSet", true)]
    #[case::too_short("Job?", "Job", false)]
    #[case::empty_pattern("", "Job", false)]
    #[case::invalid_glob_is_literal("[Job", "[Job", true)]
    #[case::invalid_glob_no_match("[Job", "Job", false)]
    fn wildcard_matching(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        assert_eq!(wildcard_match(pattern, name), expected);
    }

    #[test]
    fn exact_membership_ignores_wildcards() {
        assert!(!contains_kind_exact(&["*"], "Pod"));
        assert!(contains_kind(&["*"], "Pod"));
    }

    #[test]
    fn matching_item_is_replaced_wholesale() {
        let filters = vec![ResourceFilter::with_kinds(["Job", "Pod"])];
        let rewritten = rewrite_filters(&filters, "Job", &cronjob());
        assert_eq!(rewritten[0].kinds(), ["CronJob"]);
        // input untouched
        assert_eq!(filters[0].kinds(), ["Job", "Pod"]);
    }

    #[test]
    fn non_matching_items_are_left_alone() {
        let mut namespaced = ResourceFilter::with_kinds(["Job"]);
        namespaced
            .resources
            .selectors
            .insert("namespaces".to_string(), json!(["batch"]));
        let filters = vec![namespaced, ResourceFilter::with_kinds(["Service"])];

        let rewritten = rewrite_filters(&filters, "Job", &cronjob());
        assert_eq!(rewritten[0].kinds(), ["CronJob"]);
        assert_eq!(
            rewritten[0].resources.selectors["namespaces"],
            json!(["batch"])
        );
        assert_eq!(rewritten[1], filters[1]);
    }

    #[test]
    fn rewrite_without_source_kind_is_identity() {
        let set = ResourceFilterSet {
            any: vec![ResourceFilter::with_kinds(["CronJob"])],
            ..Default::default()
        };
        assert_eq!(rewrite_match(&set, "Job", &cronjob()), set);
    }

    #[test]
    fn any_takes_precedence_over_all() {
        let set = ResourceFilterSet {
            any: vec![ResourceFilter::with_kinds(["Job"])],
            all: vec![ResourceFilter::with_kinds(["Job"])],
            ..Default::default()
        };
        let rewritten = rewrite_match(&set, "Job", &cronjob());
        assert_eq!(rewritten.any[0].kinds(), ["CronJob"]);
        assert_eq!(rewritten.all[0].kinds(), ["Job"]);
    }

    #[test]
    fn all_is_rewritten_when_any_is_empty() {
        let set = ResourceFilterSet {
            all: vec![ResourceFilter::with_kinds(["Job"])],
            ..Default::default()
        };
        let rewritten = rewrite_match(&set, "Job", &cronjob());
        assert_eq!(rewritten.all[0].kinds(), ["CronJob"]);
        assert!(rewritten.resources.kinds.is_empty());
    }

    #[test]
    fn match_fallback_always_sets_kinds() {
        let rewritten = rewrite_match(&ResourceFilterSet::default(), "Job", &cronjob());
        assert_eq!(rewritten.kinds(), ["CronJob"]);
    }

    #[test]
    fn exclude_fallback_keeps_empty_kinds_empty() {
        let mut set = ResourceFilterSet::default();
        set.user_info
            .insert("roles".to_string(), json!(["cluster-admin"]));
        let rewritten = rewrite_exclude(&set, "Job", &cronjob());
        assert!(rewritten.kinds().is_empty());
        assert_eq!(rewritten, set);
    }

    #[test]
    fn exclude_fallback_rewrites_present_kinds() {
        let set = ResourceFilterSet::with_kinds(["Job"]);
        let rewritten = rewrite_exclude(&set, "Job", &cronjob());
        assert_eq!(rewritten.kinds(), ["CronJob"]);
    }
}
