//! `.feature` file discovery and parsing.

use std::path::Path;

use tracing::debug;

use crate::{error::RunError, feature};

/// Parses the `.feature` file at `path`, or every `*.feature` file under it
/// when `path` is a directory, and normalizes each parsed feature (outline
/// expansion, rule flattening).
///
/// Features are returned in discovery order; an empty directory yields an
/// empty run, not an error.
///
/// # Errors
///
/// If `path` is inaccessible, a file fails to parse, or an outline
/// references an unknown `Examples` column.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<gherkin::Feature>, RunError> {
    let path = path.as_ref().canonicalize()?;

    let parsed = if path.is_file() {
        let env = gherkin::GherkinEnv::default();
        vec![gherkin::Feature::parse_path(path, env)?]
    } else {
        let walker = globwalk::GlobWalkerBuilder::new(&path, "*.feature")
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                RunError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    e,
                ))
            })?;
        walker
            .filter_map(Result::ok)
            .map(|entry| {
                debug!("parsing {}", entry.path().display());
                let env = gherkin::GherkinEnv::default();
                gherkin::Feature::parse_path(entry.path(), env)
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    parsed
        .into_iter()
        .map(|f| feature::normalize(f).map_err(RunError::from))
        .collect()
}
