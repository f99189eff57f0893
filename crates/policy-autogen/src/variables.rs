//! Path references in validation messages
//!
//! Messages may point into the pattern that failed with `$(...)` references,
//! e.g. `$(./../../pattern/spec/containers/0/image)`. When a pattern is nested
//! deeper in a generated rule, those references are shifted so they still
//! resolve: `pattern/spec/...` becomes `pattern/spec/template/spec/...`.
//! A backslash before `$(` escapes the reference.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;

/// `$(...)` at the start of the message, or after any char but `\`
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\(.[^ ]*\)|[^\\]\$\(.[^ ]*\)").expect("reference regex is valid")
});

static ANY_PATTERN_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"anyPattern/\d+").expect("anyPattern index regex is valid"));

/// Path segment a reference is shifted after
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferencePivot {
    /// References into `pattern`; the shift goes right after `pattern`
    Pattern,
    /// References into `anyPattern/<n>`; the shift goes after the index
    AnyPattern,
}

impl ReferencePivot {
    /// Path segment name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::AnyPattern => "anyPattern",
        }
    }

    /// Segment of `reference` to anchor the shift on
    fn segment<'a>(&self, reference: &'a str) -> Option<&'a str> {
        match self {
            Self::Pattern => reference.contains(self.as_str()).then_some(self.as_str()),
            Self::AnyPattern => ANY_PATTERN_INDEX.find(reference).map(|m| m.as_str()),
        }
    }
}

impl fmt::Display for ReferencePivot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insert `shift` after the `pivot` segment of every `$(...)` reference in
/// `message`.
///
/// References that do not contain the pivot are left unchanged.
pub fn find_and_shift_references(message: &str, shift: &str, pivot: ReferencePivot) -> String {
    REFERENCE
        .replace_all(message, |caps: &Captures| {
            let matched = &caps[0];
            // The non-anchored alternative also consumes the char before `$(`
            let (lead, reference) = if matched.starts_with("$(") {
                ("", matched)
            } else {
                let lead_len = matched.chars().next().map_or(0, char::len_utf8);
                matched.split_at(lead_len)
            };

            match pivot.segment(reference) {
                Some(segment) => {
                    let shifted = reference.replace(segment, &format!("{segment}/{shift}"));
                    format!("{lead}{shifted}")
                }
                None => {
                    warn!(
                        reference = %reference,
                        pivot = %pivot,
                        "failed to shift reference, pivot not found"
                    );
                    matched.to_string()
                }
            }
        })
        .into_owned()
}
