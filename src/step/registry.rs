//! Registry of step definitions and single-match resolution.

use std::fmt::{self, Debug, Formatter};

use gherkin::StepType;
use linked_hash_map::LinkedHashMap;
use regex::Regex;

use super::{
    context::Context,
    error::{AmbiguousStepError, ResolveError, UndefinedStepError},
    extract,
    regex::HashableRegex,
};
use crate::error::StepError;

/// Alias for a step capability: a plain function executed against the
/// per-scenario world.
pub type StepFn<W> = fn(&mut W, &mut Context) -> Result<(), StepError>;

/// A step text resolved to exactly one definition, with its extracted
/// parameters bound.
pub struct Match<W> {
    /// The resolved step function.
    pub func: StepFn<W>,

    /// Execution context carrying the step and its parameters.
    pub context: Context,
}

// Manual, since deriving would demand `W: Debug` for a plain fn pointer.
impl<W> Debug for Match<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Catalog of `(pattern, step function)` pairs grouped by phase.
///
/// Built once at process start and read-only afterwards; lookup scans all
/// phase-compatible definitions, which is fine since registries are small
/// and scenario counts dominate.
pub struct Registry<W> {
    given: LinkedHashMap<HashableRegex, StepFn<W>>,
    when: LinkedHashMap<HashableRegex, StepFn<W>>,
    then: LinkedHashMap<HashableRegex, StepFn<W>>,
}

impl<W> Debug for Registry<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let patterns = |m: &LinkedHashMap<HashableRegex, StepFn<W>>| {
            m.keys().map(|re| re.as_str().to_owned()).collect::<Vec<_>>()
        };
        f.debug_struct("Registry")
            .field("given", &patterns(&self.given))
            .field("when", &patterns(&self.when))
            .field("then", &patterns(&self.then))
            .finish()
    }
}

impl<W> Default for Registry<W> {
    fn default() -> Self {
        Self {
            given: LinkedHashMap::new(),
            when: LinkedHashMap::new(),
            then: LinkedHashMap::new(),
        }
    }
}

impl<W> Registry<W> {
    /// Creates an empty [`Registry`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `Given` definition.
    ///
    /// # Panics
    ///
    /// If `pattern` is not a valid regular expression. Registration happens
    /// once at startup, so a bad pattern is a programming error.
    #[must_use]
    pub fn given(mut self, pattern: &str, func: StepFn<W>) -> Self {
        Self::insert(&mut self.given, pattern, func);
        self
    }

    /// Registers a `When` definition.
    ///
    /// # Panics
    ///
    /// If `pattern` is not a valid regular expression.
    #[must_use]
    pub fn when(mut self, pattern: &str, func: StepFn<W>) -> Self {
        Self::insert(&mut self.when, pattern, func);
        self
    }

    /// Registers a `Then` definition.
    ///
    /// # Panics
    ///
    /// If `pattern` is not a valid regular expression.
    #[must_use]
    pub fn then(mut self, pattern: &str, func: StepFn<W>) -> Self {
        Self::insert(&mut self.then, pattern, func);
        self
    }

    /// Merges all definitions of `other` into this registry, keeping the
    /// first registration on identical patterns.
    pub fn append(&mut self, other: Self) {
        for (phase, incoming) in [
            (&mut self.given, other.given),
            (&mut self.when, other.when),
            (&mut self.then, other.then),
        ] {
            for (re, func) in incoming {
                if !phase.contains_key(&re) {
                    let _ = phase.insert(re, func);
                }
            }
        }
    }

    /// Resolves `step` to exactly one registered definition and binds its
    /// parameters.
    ///
    /// `And`/`But` steps inherit the phase of the preceding keyword (the
    /// Gherkin parser assigns their [`StepType`] accordingly).
    ///
    /// # Errors
    ///
    /// [`ResolveError::Undefined`] if no pattern matches the step text;
    /// [`ResolveError::Ambiguous`] if more than one does. Both indicate a
    /// broken step inventory and are fatal to the run.
    pub fn resolve(
        &self,
        step: &gherkin::Step,
    ) -> Result<Match<W>, ResolveError> {
        let phase = match step.ty {
            StepType::Given => &self.given,
            StepType::When => &self.when,
            StepType::Then => &self.then,
        };

        let mut matches = phase
            .iter()
            .filter_map(|(re, func)| {
                extract::params(re, &step.value).map(|params| (re, func, params))
            })
            .collect::<Vec<_>>();

        match matches.len() {
            0 => Err(UndefinedStepError {
                keyword: step.keyword.trim().to_owned(),
                step: step.value.clone(),
            }
            .into()),
            1 => {
                // Length was just checked.
                let (_, func, params) =
                    matches.pop().unwrap_or_else(|| unreachable!());
                Ok(Match {
                    func: *func,
                    context: Context::new(step.clone(), params),
                })
            }
            _ => Err(AmbiguousStepError::new(
                step.value.clone(),
                matches.into_iter().map(|(re, ..)| re.clone()).collect(),
            )
            .into()),
        }
    }

    /// Registers `func` under `pattern`, keeping the first registration when
    /// the identical pattern is added twice (first registered wins).
    fn insert(
        phase: &mut LinkedHashMap<HashableRegex, StepFn<W>>,
        pattern: &str,
        func: StepFn<W>,
    ) {
        let re = Regex::new(pattern).unwrap_or_else(|e| {
            panic!("`{pattern}` is not a valid regular expression: {e}")
        });
        let key = HashableRegex::from(re);
        if !phase.contains_key(&key) {
            let _ = phase.insert(key, func);
        }
    }
}
