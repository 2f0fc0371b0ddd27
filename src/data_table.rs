//! Data-table access for the two conventions the step libraries consume:
//! 2-column key/value tables and 3-column condition tables.

use std::fmt;

use linked_hash_map::LinkedHashMap;

use crate::error::{AssertionError, StepError};

/// A data table attached to a Gherkin step.
#[derive(Clone, Debug, PartialEq)]
pub struct DataTable {
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Creates a [`DataTable`] from raw rows.
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Returns the raw rows.
    #[must_use]
    pub fn raw(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Interprets a 2-column table as an ordered key/value map (headers,
    /// cookies, query parameters). Later duplicates of a key overwrite
    /// earlier ones, matching the replace-not-merge contract of the
    /// execution context.
    ///
    /// # Errors
    ///
    /// If any row does not have exactly 2 cells.
    pub fn key_values(
        &self,
    ) -> Result<LinkedHashMap<String, String>, StepError> {
        let mut out = LinkedHashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != 2 {
                return Err(AssertionError::new(format!(
                    "expected a 2-column key/value table, but row {} has {} \
                     cells",
                    i + 1,
                    row.len(),
                ))
                .into());
            }
            let _ = out.insert(row[0].clone(), row[1].clone());
        }
        Ok(out)
    }
}

impl From<&gherkin::Table> for DataTable {
    fn from(table: &gherkin::Table) -> Self {
        Self::new(table.rows.clone())
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "| {} |", row.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_values_preserves_insertion_order() {
        let table = DataTable::new(vec![
            vec!["X-Trace".into(), "1".into()],
            vec!["Authorization".into(), "Bearer t".into()],
        ]);
        let map = table.key_values().unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, ["X-Trace", "Authorization"]);
    }

    #[test]
    fn key_values_rejects_wrong_width() {
        let table =
            DataTable::new(vec![vec!["a".into(), "b".into(), "c".into()]]);
        assert!(table.key_values().is_err());
    }

    #[test]
    fn later_duplicate_key_replaces_earlier() {
        let table = DataTable::new(vec![
            vec!["token".into(), "old".into()],
            vec!["token".into(), "new".into()],
        ]);
        let map = table.key_values().unwrap();
        assert_eq!(map.get("token").map(String::as_str), Some("new"));
    }
}
