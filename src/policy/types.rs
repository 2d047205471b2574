use serde::{Deserialize, Serialize};

/// Categories offered by the admin form.
pub const FORM_CATEGORIES: &[&str] = &[
  "Term Life",
  "Senior",
  "Family",
  "Health",
  "Education",
  "Travel",
];

/// Categories offered as browse filters. "All" is represented by an empty filter.
pub const BROWSE_CATEGORIES: &[&str] = &[
  "Travel",
  "Family",
  "Senior",
  "Term",
  "Education",
  "Disability",
  "Health",
  "Pilgrimage",
];

/// Insurance policy record as served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub eligibility: String,
  #[serde(default)]
  pub premium_logic_note: String,
  #[serde(default)]
  pub min_age: u32,
  #[serde(default)]
  pub max_age: u32,
  #[serde(default)]
  pub coverage_range: String,
  #[serde(default)]
  pub duration_options: Vec<u32>,
  #[serde(default)]
  pub base_premium_rate: f64,
  #[serde(default)]
  pub image: String,
  // Some legacy records only carry `imageUrl`
  #[serde(default, rename = "imageUrl", skip_serializing)]
  pub legacy_image_url: Option<String>,
  #[serde(default)]
  pub benefits: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub purchase_count: Option<u64>,
}

impl Policy {
  /// Purchase count used for popularity ranking (missing counts as zero)
  pub fn popularity(&self) -> u64 {
    self.purchase_count.unwrap_or(0)
  }

  /// Image URL, falling back to the legacy `imageUrl` field
  pub fn image_url(&self) -> Option<&str> {
    if !self.image.is_empty() {
      return Some(&self.image);
    }
    self.legacy_image_url.as_deref().filter(|url| !url.is_empty())
  }

  /// Writable subset of this policy, used to prefill an edit
  pub fn to_draft(&self) -> PolicyDraft {
    PolicyDraft {
      title: self.title.clone(),
      description: self.description.clone(),
      category: self.category.clone(),
      eligibility: self.eligibility.clone(),
      premium_logic_note: self.premium_logic_note.clone(),
      min_age: self.min_age,
      max_age: self.max_age,
      coverage_range: self.coverage_range.clone(),
      duration_options: self.duration_options.clone(),
      base_premium_rate: self.base_premium_rate,
      image: self.image_url().unwrap_or_default().to_string(),
      benefits: self.benefits.clone(),
    }
  }
}

/// Policy body sent on create and update.
///
/// `image` is always a resolved URL here. A freshly picked image travels
/// beside the draft as an [`ImageBlob`] and is uploaded before the write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDraft {
  pub title: String,
  pub description: String,
  pub category: String,
  pub eligibility: String,
  pub premium_logic_note: String,
  pub min_age: u32,
  pub max_age: u32,
  pub coverage_range: String,
  pub duration_options: Vec<u32>,
  pub base_premium_rate: f64,
  pub image: String,
  pub benefits: Vec<String>,
}

/// Raw image picked for upload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
  pub file_name: String,
  pub bytes: Vec<u8>,
}

impl ImageBlob {
  pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
    Self {
      file_name: file_name.into(),
      bytes,
    }
  }
}

impl std::fmt::Debug for ImageBlob {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ImageBlob")
      .field("file_name", &self.file_name)
      .field("len", &self.bytes.len())
      .finish()
  }
}

/// One page of the policy collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyPage {
  pub items: Vec<Policy>,
  pub total: u64,
}

/// Parameters of a collection read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyQuery {
  pub page: u32,
  pub limit: u32,
  pub category: String,
  pub search: String,
}

impl PolicyQuery {
  /// Query-string pairs; empty category and search are omitted
  pub fn params(&self) -> Vec<(&'static str, String)> {
    let mut params = vec![
      ("page", self.page.to_string()),
      ("limit", self.limit.to_string()),
    ];
    if !self.category.is_empty() {
      params.push(("category", self.category.clone()));
    }
    if !self.search.is_empty() {
      params.push(("search", self.search.clone()));
    }
    params
  }
}
