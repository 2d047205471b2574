//! Caching implementations for policy reads.

use crate::cache::QueryKey;

use super::types::PolicyQuery;

/// Resource name shared by every policy read
pub const POLICIES: &str = "policies";

/// Query keys for policy reads.
///
/// All variants belong to the same resource, so a write invalidates list
/// pages, the popular selection and detail reads together.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PolicyQueryKey {
  /// One page of the filtered collection
  List(PolicyQuery),
  /// Whole collection, used for the popular selection
  All,
  /// A single policy by id
  Detail { id: String },
}

impl QueryKey for PolicyQueryKey {
  fn resource(&self) -> &'static str {
    POLICIES
  }

  fn description(&self) -> String {
    match self {
      Self::List(q) => format!(
        "policies page {} (limit {}, category '{}', search '{}')",
        q.page, q.limit, q.category, q.search
      ),
      Self::All => "all policies".to_string(),
      Self::Detail { id } => format!("policy {}", id),
    }
  }
}
