//! Single-dimension query filters.
//!
//! A request may filter a collection on exactly one of the resource's
//! supported dimensions. A dimension counts as supplied when its query value
//! is non-empty; parameters that are not supported dimensions are ignored.

use std::collections::HashMap;
use thiserror::Error;

/// A `(dimension, value)` equality filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    pub dimension: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("a filter on one of [{}] is required", .supported.join(", "))]
    Missing { supported: &'static [&'static str] },

    #[error("only one filter may be supplied, got [{}]", .supplied.join(", "))]
    Conflicting { supplied: Vec<&'static str> },
}

impl QueryFilter {
    /// Extract the single supplied dimension from query parameters.
    pub fn from_query(
        params: &HashMap<String, String>,
        supported: &'static [&'static str],
    ) -> Result<Self, FilterError> {
        let mut supplied = supported
            .iter()
            .filter_map(|&dimension| match params.get(dimension) {
                Some(value) if !value.is_empty() => Some((dimension, value)),
                _ => None,
            });

        match (supplied.next(), supplied.next()) {
            (Some((dimension, value)), None) => Ok(Self {
                dimension,
                value: value.clone(),
            }),
            (None, _) => Err(FilterError::Missing { supported }),
            (Some(first), Some(second)) => {
                let supplied = [first.0, second.0]
                    .into_iter()
                    .chain(supplied.map(|(dimension, _)| dimension))
                    .collect();
                Err(FilterError::Conflicting { supplied })
            }
        }
    }
}

/// Whether the query names any supported dimension, even with an empty value.
///
/// Used to route collection requests: naming a dimension selects the filter
/// operation, otherwise the request lists everything.
pub fn names_dimension(params: &HashMap<String, String>, supported: &[&str]) -> bool {
    supported.iter().any(|dimension| params.contains_key(*dimension))
}
