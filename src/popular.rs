use crate::policy::types::Policy;

/// How many policies the popular section shows
pub const POPULAR_LIMIT: usize = 6;

/// Top policies by purchase count, most purchased first.
///
/// The sort is stable: equal counts keep their input order. A missing count
/// ranks as zero.
pub fn select_popular(mut policies: Vec<Policy>) -> Vec<Policy> {
  policies.sort_by(|a, b| b.popularity().cmp(&a.popularity()));
  policies.truncate(POPULAR_LIMIT);
  policies
}

#[cfg(test)]
mod tests {
  use super::*;

  fn policy(id: &str, count: Option<u64>) -> Policy {
    serde_json::from_value(serde_json::json!({ "_id": id, "purchaseCount": count })).unwrap()
  }

  fn ids(policies: &[Policy]) -> Vec<&str> {
    policies.iter().map(|p| p.id.as_str()).collect()
  }

  #[test]
  fn test_sorted_by_purchase_count_descending() {
    let selected = select_popular(vec![
      policy("a", Some(2)),
      policy("b", Some(10)),
      policy("c", Some(5)),
    ]);
    assert_eq!(ids(&selected), vec!["b", "c", "a"]);
  }

  #[test]
  fn test_ties_keep_input_order() {
    let selected = select_popular(vec![
      policy("first", Some(3)),
      policy("top", Some(8)),
      policy("second", Some(3)),
      policy("third", Some(3)),
    ]);
    assert_eq!(ids(&selected), vec!["top", "first", "second", "third"]);
  }

  #[test]
  fn test_missing_count_ranks_as_zero() {
    let selected = select_popular(vec![
      policy("none", None),
      policy("zero", Some(0)),
      policy("one", Some(1)),
    ]);
    assert_eq!(ids(&selected), vec!["one", "none", "zero"]);
  }

  #[test]
  fn test_takes_top_six() {
    let input: Vec<Policy> = (0..10).map(|i| policy(&format!("p{i}"), Some(i))).collect();
    let selected = select_popular(input);
    assert_eq!(selected.len(), POPULAR_LIMIT);
    assert_eq!(selected[0].id, "p9");
    assert_eq!(selected[5].id, "p4");
  }

  #[test]
  fn test_empty_input() {
    assert!(select_popular(Vec::new()).is_empty());
  }
}
