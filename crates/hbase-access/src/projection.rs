//! Column projection: which qualifiers a scan fetches and how fetched cells
//! map back to caller-facing column names.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// Qualifiers requested from the backend plus the maps needed to decode cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    family: String,
    output_columns: Vec<String>,
    /// Qualifier -> position in fetch order.
    result_index: IndexMap<String, usize>,
    /// Fetched for filtering only, never emitted.
    query_only: HashSet<String>,
}

impl Projection {
    /// Resolves comma-separated output and query-only column lists.
    ///
    /// Whitespace is stripped, empty entries are dropped and duplicates keep
    /// their first position. Query-only columns that are also output columns
    /// stay visible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no output column remains.
    pub fn resolve(output_columns: &str, query_only_columns: &str, family: &str) -> Result<Self> {
        let output: IndexSet<String> = split_columns(output_columns).collect();
        if output.is_empty() {
            return Err(Error::Validation(
                "at least one output column is required".to_string(),
            ));
        }
        let query_only_names: IndexSet<String> = split_columns(query_only_columns)
            .filter(|c| !output.contains(c))
            .collect();

        let qualify = |column: &String| format!("{family}:{column}");

        let result_index = output
            .iter()
            .chain(query_only_names.iter())
            .map(qualify)
            .enumerate()
            .map(|(position, qualifier)| (qualifier, position))
            .collect();
        let query_only = query_only_names.iter().map(qualify).collect();

        Ok(Self {
            family: family.to_string(),
            output_columns: output.into_iter().collect(),
            result_index,
            query_only,
        })
    }

    /// Column family every qualifier belongs to.
    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Qualifiers to fetch, in order.
    #[must_use]
    pub fn qualifiers(&self) -> Vec<String> {
        self.result_index.keys().cloned().collect()
    }

    /// Caller-facing columns, in request order.
    #[must_use]
    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    /// Position of a qualifier in fetch order.
    #[must_use]
    pub fn position(&self, qualifier: &str) -> Option<usize> {
        self.result_index.get(qualifier).copied()
    }

    /// Whether a qualifier is fetched only to evaluate filters.
    #[must_use]
    pub fn is_query_only(&self, qualifier: &str) -> bool {
        self.query_only.contains(qualifier)
    }

    /// Maps a fetched qualifier back to its caller-facing column name.
    ///
    /// Returns `None` for qualifiers outside this projection.
    #[must_use]
    pub fn column_name<'a>(&self, qualifier: &'a str) -> Option<&'a str> {
        self.position(qualifier)?;
        qualifier.split_once(':').map(|(_, column)| column)
    }

    /// Column name -> position map over the output columns.
    #[must_use]
    pub fn column_index(&self) -> IndexMap<String, usize> {
        self.output_columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect()
    }
}

fn split_columns(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(|c| c.chars().filter(|ch| !ch.is_whitespace()).collect::<String>())
        .filter(|c| !c.is_empty())
}
