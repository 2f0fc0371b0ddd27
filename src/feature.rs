//! [`gherkin::Feature`] preprocessing: outline expansion and rule
//! flattening.

use std::{mem, path::Path, path::PathBuf};

use derive_more::{Display, Error};
use once_cell::sync::Lazy;
use regex::Regex;

/// [`Regex`] matching `<placeholder>`s `Examples` rows expand into.
static TEMPLATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^>\s]+)>").unwrap());

/// Expands every `Scenario Outline` of `feature` into one concrete
/// scenario per `Examples` row, substituting `<column>` placeholders in
/// step texts, doc-strings and data tables, and flattens `Rule` scenarios
/// into the feature's own list (backgrounds of rules are merged into the
/// feature background semantics by the runner, which executes the feature
/// background before every scenario).
///
/// # Errors
///
/// If a placeholder names a column the `Examples` table does not have.
pub fn normalize(
    mut feature: gherkin::Feature,
) -> Result<gherkin::Feature, ExpandExamplesError> {
    let path = feature.path.clone();
    let expand = |scenarios: Vec<gherkin::Scenario>| {
        scenarios
            .into_iter()
            .flat_map(|s| expand_scenario(s, path.as_ref()))
            .collect::<Result<Vec<_>, _>>()
    };

    let mut scenarios = expand(mem::take(&mut feature.scenarios))?;
    for rule in mem::take(&mut feature.rules) {
        scenarios.extend(expand(rule.scenarios)?);
    }
    feature.scenarios = scenarios;

    Ok(feature)
}

/// Counts the scenarios of a normalized feature.
#[must_use]
pub fn count_scenarios(feature: &gherkin::Feature) -> usize {
    feature.scenarios.len()
        + feature.rules.iter().map(|r| r.scenarios.len()).sum::<usize>()
}

/// Expands one scenario's `Examples`, if any.
fn expand_scenario(
    scenario: gherkin::Scenario,
    path: Option<&PathBuf>,
) -> Vec<Result<gherkin::Scenario, ExpandExamplesError>> {
    if scenario.examples.is_empty() {
        return vec![Ok(scenario)];
    }

    let mut expansions = Vec::new();
    for example in &scenario.examples {
        let Some((header, rows)) =
            example.table.as_ref().and_then(|t| t.rows.split_first())
        else {
            continue;
        };
        for (nth, row) in rows.iter().enumerate() {
            expansions.push(expand_row(
                &scenario, example, header, row, nth, path,
            ));
        }
    }
    expansions
}

/// Instantiates one `Examples` row: a copy of the outline with every
/// `<column>` placeholder in names, step texts, doc-strings and data tables
/// replaced by the row's cell.
fn expand_row(
    scenario: &gherkin::Scenario,
    example: &gherkin::Examples,
    header: &[String],
    row: &[String],
    nth: usize,
    path: Option<&PathBuf>,
) -> Result<gherkin::Scenario, ExpandExamplesError> {
    let cell = |name: &str| {
        header
            .iter()
            .position(|column| column == name)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    };
    let substitute = |text: &str, pos: gherkin::LineCol| {
        let mut unknown = None;
        let replaced = TEMPLATE_REGEX
            .replace_all(text, |cap: &regex::Captures<'_>| {
                let name = cap.get(1).map_or("", |m| m.as_str());
                cell(name).unwrap_or_else(|| {
                    let _ = unknown.get_or_insert_with(|| {
                        ExpandExamplesError {
                            pos,
                            name: name.to_owned(),
                            path: path.cloned(),
                        }
                    });
                    ""
                })
            })
            .into_owned();
        match unknown {
            None => Ok(replaced),
            Some(e) => Err(e),
        }
    };

    let mut expanded = scenario.clone();

    // Distinguishes the expansions of one outline from each other.
    expanded.position = example.position;
    expanded.position.line += nth + 2;

    expanded.tags.extend(example.tags.iter().cloned());

    expanded.name = substitute(&expanded.name, expanded.position)?;
    for step in &mut expanded.steps {
        step.value = substitute(&step.value, step.position)?;
        if let Some(docstring) = &mut step.docstring {
            *docstring = substitute(docstring, step.position)?;
        }
        if let Some(table) = &mut step.table {
            for value in table.rows.iter_mut().flatten() {
                *value = substitute(value, step.position)?;
            }
        }
    }

    Ok(expanded)
}

/// Error of outline expansion encountering a placeholder with no matching
/// `Examples` column.
#[derive(Clone, Debug, Display, Error)]
#[display(
    fmt = "failed to resolve <{}> at {}:{}:{}",
    name,
    "path.as_deref().and_then(Path::to_str).unwrap_or_default()",
    "pos.line",
    "pos.col"
)]
pub struct ExpandExamplesError {
    /// Position of the unknown placeholder.
    pub pos: gherkin::LineCol,

    /// Name of the unknown placeholder.
    pub name: String,

    /// Path of the `.feature` file, if known.
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use gherkin::{Feature, GherkinEnv};

    use super::*;

    fn parse(src: &str) -> Feature {
        Feature::parse(src, GherkinEnv::default()).unwrap()
    }

    #[test]
    fn outline_expands_one_scenario_per_row() {
        let feature = parse(
            "Feature: Hungry\n\
             \x20 Scenario Outline: eating\n\
             \x20   Given there are <start> cucumbers\n\
             \x20   When I eat <eat> cucumbers\n\
             \n\
             \x20   Examples:\n\
             \x20     | start | eat |\n\
             \x20     | 12    | 5   |\n\
             \x20     | 20    | 4   |\n",
        );
        let feature = normalize(feature).unwrap();

        assert_eq!(feature.scenarios.len(), 2);
        assert_eq!(
            feature.scenarios[0].steps[0].value,
            "there are 12 cucumbers",
        );
        assert_eq!(
            feature.scenarios[1].steps[1].value,
            "I eat 4 cucumbers",
        );
        assert_ne!(
            feature.scenarios[0].position,
            feature.scenarios[1].position,
        );
    }

    #[test]
    fn every_examples_block_contributes_rows_and_tags() {
        let feature = parse(
            "Feature: Hungry\n\
             \x20 Scenario Outline: eating\n\
             \x20   Given there are <start> cucumbers\n\
             \n\
             \x20   @fast\n\
             \x20   Examples:\n\
             \x20     | start |\n\
             \x20     | 1     |\n\
             \n\
             \x20   @slow\n\
             \x20   Examples:\n\
             \x20     | start |\n\
             \x20     | 9     |\n",
        );
        let feature = normalize(feature).unwrap();

        assert_eq!(feature.scenarios.len(), 2);
        assert_eq!(
            feature.scenarios[0].steps[0].value,
            "there are 1 cucumbers",
        );
        assert_eq!(
            feature.scenarios[1].steps[0].value,
            "there are 9 cucumbers",
        );
        assert_eq!(feature.scenarios[0].tags, ["fast"]);
        assert_eq!(feature.scenarios[1].tags, ["slow"]);
    }

    #[test]
    fn placeholders_expand_inside_tables_and_docstrings() {
        let feature = parse(
            "Feature: Hungry\n\
             \x20 Scenario Outline: eating\n\
             \x20   Given a table\n\
             \x20     | left   |\n\
             \x20     | <left> |\n\
             \n\
             \x20   Examples:\n\
             \x20     | left |\n\
             \x20     | 7    |\n",
        );
        let feature = normalize(feature).unwrap();

        let table = feature.scenarios[0].steps[0].table.as_ref().unwrap();
        assert_eq!(table.rows[1][0], "7");
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let feature = parse(
            "Feature: Hungry\n\
             \x20 Scenario Outline: eating\n\
             \x20   Given there are <start> cucumbers\n\
             \n\
             \x20   Examples:\n\
             \x20     | begin |\n\
             \x20     | 12    |\n",
        );
        let err = normalize(feature).unwrap_err();
        assert_eq!(err.name, "start");
    }

    #[test]
    fn rule_scenarios_are_flattened() {
        let feature = parse(
            "Feature: Rules\n\
             \x20 Rule: first\n\
             \x20   Scenario: inside\n\
             \x20     Given a step\n\
             \x20 Scenario: outside\n\
             \x20   Given a step\n",
        );
        let feature = normalize(feature).unwrap();
        assert_eq!(feature.scenarios.len(), 2);
        assert!(feature.rules.is_empty());
    }
}
