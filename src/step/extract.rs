//! Parameter extraction out of a matched step line.

use regex::Regex;

/// Extracts the ordered capture-group parameters of `text` under `re`.
///
/// Returns `None` when `re` does not match `text` at all. On a match, the
/// resulting vector has one entry per capture group (the whole match is not
/// included), in pattern order; groups that did not participate in the match
/// (unmatched optional groups) yield `None` entries, preserving positions.
///
/// Numeric or boolean coercion is the calling step definition's concern, so
/// a coercion failure can be reported as a binding error distinct from a
/// step-execution error.
#[must_use]
pub fn params(re: &Regex, text: &str) -> Option<Vec<Option<String>>> {
    re.captures(text).map(|caps| {
        (1..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_owned()))
            .collect()
    })
}
