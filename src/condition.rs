//! Condition vocabulary of 3-column assertion tables
//! (`field | condition | expected`).

use std::str::FromStr;

use derive_more::Display;

use crate::{
    data_table::DataTable,
    error::{AssertionError, BindError, StepError},
};

/// A single condition evaluated against one extracted value.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Condition {
    /// Value exists and equals the expectation.
    #[display(fmt = "equal")]
    Equal,

    /// Value exists and differs from the expectation.
    #[display(fmt = "not equal")]
    NotEqual,

    /// Value exists; the expectation cell is ignored.
    #[display(fmt = "exists")]
    Exists,

    /// Value does not exist; the expectation cell is ignored.
    #[display(fmt = "does not exist")]
    DoesNotExist,

    /// Value exists and contains the expectation as a substring.
    #[display(fmt = "contains")]
    Contains,

    /// Value exists and does not contain the expectation.
    #[display(fmt = "does not contain")]
    DoesNotContain,

    /// Value exists and its character length equals the expectation.
    #[display(fmt = "length")]
    Length,

    /// Value exists, parses as a JSON array, and its element count equals
    /// the expectation.
    #[display(fmt = "size")]
    Size,
}

impl FromStr for Condition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "equal" => Self::Equal,
            "not equal" => Self::NotEqual,
            "exists" => Self::Exists,
            // The original step vocabulary spells it "does not exists".
            "does not exist" | "does not exists" => Self::DoesNotExist,
            "contains" => Self::Contains,
            "does not contain" => Self::DoesNotContain,
            "length" => Self::Length,
            "size" => Self::Size,
            _ => return Err(()),
        })
    }
}

impl Condition {
    /// Evaluates this condition of `field` against the extracted `actual`
    /// value (`None` when the field is absent).
    ///
    /// # Errors
    ///
    /// [`StepError::Assertion`] when the condition does not hold;
    /// [`StepError::Binding`] when the expectation cell itself is unusable
    /// (e.g. a non-numeric `length`).
    pub fn eval(
        self,
        field: &str,
        actual: Option<&str>,
        expected: &str,
    ) -> Result<(), StepError> {
        fn present<'a>(
            field: &str,
            actual: Option<&'a str>,
        ) -> Result<&'a str, StepError> {
            actual.ok_or_else(|| {
                StepError::Assertion(AssertionError::new(format!(
                    "`{field}` does not exist",
                )))
            })
        }

        match self {
            Self::Exists => present(field, actual).map(drop),
            Self::DoesNotExist => match actual {
                None => Ok(()),
                Some(v) => Err(AssertionError::new(format!(
                    "`{field}` exists with value `{v}`",
                ))
                .into()),
            },
            Self::Equal => {
                let v = present(field, actual)?;
                if v == expected {
                    Ok(())
                } else {
                    Err(AssertionError::mismatch(
                        format!("`{field}`"),
                        format!("`{expected}`"),
                        format!("`{v}`"),
                    )
                    .into())
                }
            }
            Self::NotEqual => {
                let v = present(field, actual)?;
                if v == expected {
                    Err(AssertionError::new(format!(
                        "`{field}` equals `{expected}`, but should not",
                    ))
                    .into())
                } else {
                    Ok(())
                }
            }
            Self::Contains => {
                let v = present(field, actual)?;
                if v.contains(expected) {
                    Ok(())
                } else {
                    Err(AssertionError::new(format!(
                        "`{field}` (`{v}`) does not contain `{expected}`",
                    ))
                    .into())
                }
            }
            Self::DoesNotContain => {
                let v = present(field, actual)?;
                if v.contains(expected) {
                    Err(AssertionError::new(format!(
                        "`{field}` (`{v}`) contains `{expected}`, but \
                         should not",
                    ))
                    .into())
                } else {
                    Ok(())
                }
            }
            Self::Length => {
                let v = present(field, actual)?;
                let want = parse_count(expected)?;
                if v.chars().count() == want {
                    Ok(())
                } else {
                    Err(AssertionError::mismatch(
                        format!("length of `{field}`"),
                        want.to_string(),
                        v.chars().count().to_string(),
                    )
                    .into())
                }
            }
            Self::Size => {
                let v = present(field, actual)?;
                let want = parse_count(expected)?;
                let got = serde_json::from_str::<serde_json::Value>(v)
                    .ok()
                    .and_then(|json| json.as_array().map(Vec::len))
                    .ok_or_else(|| {
                        StepError::Assertion(AssertionError::new(format!(
                            "`{field}` (`{v}`) is not a JSON array",
                        )))
                    })?;
                if got == want {
                    Ok(())
                } else {
                    Err(AssertionError::mismatch(
                        format!("size of `{field}`"),
                        want.to_string(),
                        got.to_string(),
                    )
                    .into())
                }
            }
        }
    }
}

/// Parses the expectation cell of a `length`/`size` condition.
fn parse_count(expected: &str) -> Result<usize, StepError> {
    expected.trim().parse().map_err(|_| {
        BindError {
            group: 0,
            value: Some(expected.to_owned()),
            expected: "a non-negative integer",
        }
        .into()
    })
}

/// One row of a 3-column condition table.
#[derive(Clone, Debug)]
pub struct ConditionRow {
    /// Name of the field the row inspects (header name, cookie name,
    /// JSON path, ...).
    pub field: String,

    /// Condition to evaluate.
    pub condition: Condition,

    /// Expectation cell.
    pub expected: String,
}

/// Parses a 3-column condition table.
///
/// # Errors
///
/// If a row is not 3 cells wide or names an unknown condition; both are
/// binding errors, since the table is an argument of the step.
pub fn parse_rows(table: &DataTable) -> Result<Vec<ConditionRow>, StepError> {
    table
        .raw()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() != 3 {
                return Err(AssertionError::new(format!(
                    "expected a 3-column condition table, but row {} has {} \
                     cells",
                    i + 1,
                    row.len(),
                ))
                .into());
            }
            let condition = row[1].parse().map_err(|()| BindError {
                group: i + 1,
                value: Some(row[1].clone()),
                expected: "a condition (equal, not equal, exists, does not \
                           exist, contains, does not contain, length, size)",
            })?;
            Ok(ConditionRow {
                field: row[0].clone(),
                condition,
                expected: row[2].clone(),
            })
        })
        .collect()
}

/// Evaluates every row of a condition table against values produced by
/// `lookup`, in row order.
///
/// All rows are evaluated even after a violation, so a single run reports
/// every failing row; the resulting error cites the first violated row and
/// appends the rest.
///
/// # Errors
///
/// If any row's condition does not hold, or a row is unusable.
pub fn check_all<F>(rows: &[ConditionRow], lookup: F) -> Result<(), StepError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut violations = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let actual = lookup(&row.field);
        if let Err(e) =
            row.condition.eval(&row.field, actual.as_deref(), &row.expected)
        {
            match e {
                // An unusable expectation cell aborts right away.
                StepError::Binding(_) => return Err(e),
                other => violations.push((i + 1, other)),
            }
        }
    }

    match violations.split_first() {
        None => Ok(()),
        Some(((first_row, first_err), rest)) => {
            let mut message =
                format!("condition table row {first_row} violated: {first_err}");
            for (row, err) in rest {
                message.push_str(&format!("\nalso row {row}: {err}"));
            }
            Err(AssertionError::new(message).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(cells: &[[&str; 3]]) -> Vec<ConditionRow> {
        let table = DataTable::new(
            cells
                .iter()
                .map(|r| r.iter().map(|c| (*c).to_owned()).collect())
                .collect(),
        );
        parse_rows(&table).unwrap()
    }

    #[test]
    fn vocabulary_round_trips() {
        for s in [
            "equal",
            "not equal",
            "exists",
            "does not exist",
            "does not exists",
            "contains",
            "does not contain",
            "length",
            "size",
        ] {
            assert!(s.parse::<Condition>().is_ok(), "{s}");
        }
        assert!("matches".parse::<Condition>().is_err());
    }

    #[test]
    fn first_violated_row_is_identified() {
        let rows = rows(&[
            ["status", "equal", "200"],
            ["status", "equal", "404"],
        ]);
        let err = check_all(&rows, |_| Some("200".into())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("condition table row 2 violated"), "{msg}");
    }

    #[test]
    fn all_rows_are_evaluated_for_diagnostics() {
        let rows = rows(&[
            ["a", "equal", "1"],
            ["b", "equal", "2"],
            ["c", "equal", "3"],
        ]);
        let err = check_all(&rows, |_| Some("0".into())).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 1 violated"), "{msg}");
        assert!(msg.contains("also row 2"), "{msg}");
        assert!(msg.contains("also row 3"), "{msg}");
    }

    #[test]
    fn absent_value_fails_every_value_condition() {
        for c in [
            Condition::Equal,
            Condition::NotEqual,
            Condition::Contains,
            Condition::DoesNotContain,
            Condition::Length,
            Condition::Size,
        ] {
            let err = c.eval("h", None, "1").unwrap_err();
            assert!(
                err.to_string().contains("`h` does not exist"),
                "{c}: {err}",
            );
        }
    }

    #[test]
    fn existence_conditions_ignore_expectation() {
        assert!(Condition::Exists.eval("h", Some("v"), "").is_ok());
        assert!(Condition::Exists.eval("h", None, "").is_err());
        assert!(Condition::DoesNotExist.eval("h", None, "").is_ok());
        assert!(Condition::DoesNotExist.eval("h", Some("v"), "").is_err());
    }

    #[test]
    fn size_counts_json_array_elements() {
        assert!(Condition::Size.eval("$.items", Some("[1,2,3]"), "3").is_ok());
        assert!(Condition::Size.eval("$.items", Some("[1]"), "3").is_err());
        assert!(Condition::Size.eval("$.items", Some("oops"), "3").is_err());
    }

    #[test]
    fn bad_length_expectation_is_a_binding_error() {
        let err =
            Condition::Length.eval("h", Some("abc"), "many").unwrap_err();
        assert!(matches!(err, StepError::Binding(_)));
    }

    #[test]
    fn unknown_condition_word_is_a_binding_error() {
        let table = DataTable::new(vec![vec![
            "status".into(),
            "matches".into(),
            "200".into(),
        ]]);
        assert!(matches!(
            parse_rows(&table),
            Err(StepError::Binding(_))
        ));
    }
}
