//! Dotted-path lookups into JSON documents (`$.data.items[0].id`).
//!
//! Only the subset the built-in step vocabulary needs: object keys joined
//! with `.` and non-negative array indices in `[..]`. No filters, wildcards
//! or recursive descent.

use serde_json::Value;

use crate::error::{AssertionError, StepError};

/// One segment of a parsed path.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Parses `path` into segments.
///
/// The leading `$` (and `$.`) is optional, so `status` and `$.status` name
/// the same field.
fn parse(path: &str) -> Result<Vec<Segment>, StepError> {
    let trimmed = path.strip_prefix('$').unwrap_or(path);
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);

    let malformed = || {
        StepError::Assertion(AssertionError::new(format!(
            "malformed JSON path `{path}`",
        )))
    };

    let mut segments = Vec::new();
    for part in trimmed.split('.') {
        if part.is_empty() {
            return Err(malformed());
        }
        let mut rest = part;
        match rest.find('[') {
            None => segments.push(Segment::Key(rest.to_owned())),
            Some(0) => return Err(malformed()),
            Some(at) => {
                segments.push(Segment::Key(rest[..at].to_owned()));
                rest = &rest[at..];
                while let Some(stripped) = rest.strip_prefix('[') {
                    let close = stripped.find(']').ok_or_else(malformed)?;
                    let index = stripped[..close]
                        .parse()
                        .map_err(|_| malformed())?;
                    segments.push(Segment::Index(index));
                    rest = &stripped[close + 1..];
                }
                if !rest.is_empty() {
                    return Err(malformed());
                }
            }
        }
    }
    Ok(segments)
}

/// Looks up `path` inside `doc`, returning `None` when any segment is
/// absent.
///
/// # Errors
///
/// If `path` itself is malformed. Absence of the addressed value is not an
/// error, so existence conditions can be expressed over the result.
pub fn lookup<'v>(
    doc: &'v Value,
    path: &str,
) -> Result<Option<&'v Value>, StepError> {
    let mut current = doc;
    for segment in parse(path)? {
        let next = match &segment {
            Segment::Key(key) => current.get(key.as_str()),
            Segment::Index(i) => current.get(*i),
        };
        match next {
            Some(v) => current = v,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Like [`lookup`], but renders the addressed value as the flat string the
/// condition vocabulary compares against: strings unquoted, everything else
/// in its JSON serialization.
///
/// # Errors
///
/// If `path` is malformed.
pub fn lookup_str(
    doc: &Value,
    path: &str,
) -> Result<Option<String>, StepError> {
    Ok(lookup(doc, path)?.map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({
            "status": "ok",
            "count": 3,
            "data": {
                "items": [{"id": 7, "tags": ["a", "b"]}, {"id": 8}],
            },
        })
    }

    #[test]
    fn resolves_nested_keys_and_indices() {
        let doc = doc();
        assert_eq!(
            lookup_str(&doc, "$.data.items[0].id").unwrap().as_deref(),
            Some("7"),
        );
        assert_eq!(
            lookup_str(&doc, "$.data.items[0].tags[1]")
                .unwrap()
                .as_deref(),
            Some("b"),
        );
    }

    #[test]
    fn leading_dollar_is_optional() {
        let doc = doc();
        assert_eq!(lookup_str(&doc, "status").unwrap().as_deref(), Some("ok"));
        assert_eq!(
            lookup_str(&doc, "$.status").unwrap().as_deref(),
            Some("ok"),
        );
    }

    #[test]
    fn strings_render_unquoted_and_scalars_as_json() {
        let doc = doc();
        assert_eq!(lookup_str(&doc, "$.count").unwrap().as_deref(), Some("3"));
        assert_eq!(
            lookup_str(&doc, "$.data.items[1]").unwrap().as_deref(),
            Some(r#"{"id":8}"#),
        );
    }

    #[test]
    fn missing_value_is_none_not_error() {
        let doc = doc();
        assert_eq!(lookup(&doc, "$.data.items[9].id").unwrap(), None);
        assert_eq!(lookup(&doc, "$.nope").unwrap(), None);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let doc = doc();
        assert!(lookup(&doc, "$.data..items").is_err());
        assert!(lookup(&doc, "$.items[x]").is_err());
        assert!(lookup(&doc, "$.items[0").is_err());
    }
}
