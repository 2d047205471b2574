//! Admin add/edit form state and validation.

use std::path::PathBuf;
use thiserror::Error;

use crate::policy::types::{Policy, PolicyDraft, FORM_CATEGORIES};

/// Reasons a form cannot be submitted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
  #[error("{0} is required")]
  Required(&'static str),
  #[error("{0} must be a number")]
  NotANumber(&'static str),
  #[error("minimum age {min} is above maximum age {max}")]
  AgeRange { min: u32, max: u32 },
  #[error("enter at least one duration in years")]
  NoDurations,
}

/// Editable fields, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  Title,
  Category,
  Description,
  MinAge,
  MaxAge,
  CoverageRange,
  Durations,
  BaseRate,
  ImagePath,
  Benefit(usize),
  Eligibility,
  PremiumNote,
}

impl FormField {
  pub fn label(&self) -> String {
    match self {
      FormField::Title => "Title".to_string(),
      FormField::Category => "Category".to_string(),
      FormField::Description => "Description".to_string(),
      FormField::MinAge => "Minimum Age".to_string(),
      FormField::MaxAge => "Maximum Age".to_string(),
      FormField::CoverageRange => "Coverage Range".to_string(),
      FormField::Durations => "Duration Options (years, comma separated)".to_string(),
      FormField::BaseRate => "Base Premium Rate".to_string(),
      FormField::ImagePath => "Image File".to_string(),
      FormField::Benefit(i) => format!("Benefit {}", i + 1),
      FormField::Eligibility => "Eligibility".to_string(),
      FormField::PremiumNote => "Premium Logic Note".to_string(),
    }
  }
}

/// Parse "5, 10, 15" into durations. Tokens that are not positive integers
/// are dropped.
pub fn parse_durations(input: &str) -> Vec<u32> {
  input
    .split(',')
    .filter_map(|token| token.trim().parse::<u32>().ok())
    .filter(|d| *d > 0)
    .collect()
}

/// What a valid form submits
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
  /// Policy being edited, `None` when adding
  pub id: Option<String>,
  pub draft: PolicyDraft,
  /// Image to upload before writing
  pub image_path: Option<PathBuf>,
}

/// Add/edit form values, kept as typed text until submission
#[derive(Debug, Clone, Default)]
pub struct PolicyForm {
  id: Option<String>,
  /// Image URL of the policy being edited
  existing_image: String,
  pub title: String,
  pub category: String,
  pub description: String,
  pub min_age: String,
  pub max_age: String,
  pub coverage_range: String,
  pub durations: String,
  pub base_rate: String,
  pub image_path: String,
  pub benefits: Vec<String>,
  pub eligibility: String,
  pub premium_note: String,
}

impl PolicyForm {
  /// Empty form for a new policy
  pub fn new() -> Self {
    Self {
      category: FORM_CATEGORIES[0].to_string(),
      benefits: vec![String::new()],
      ..Default::default()
    }
  }

  /// Form prefilled from an existing policy
  pub fn edit(policy: &Policy) -> Self {
    let draft = policy.to_draft();
    let durations = draft
      .duration_options
      .iter()
      .map(|d| d.to_string())
      .collect::<Vec<_>>()
      .join(", ");
    let benefits = if draft.benefits.is_empty() {
      vec![String::new()]
    } else {
      draft.benefits
    };

    Self {
      id: Some(policy.id.clone()),
      existing_image: draft.image,
      title: draft.title,
      category: draft.category,
      description: draft.description,
      min_age: draft.min_age.to_string(),
      max_age: draft.max_age.to_string(),
      coverage_range: draft.coverage_range,
      durations,
      base_rate: draft.base_premium_rate.to_string(),
      image_path: String::new(),
      benefits,
      eligibility: draft.eligibility,
      premium_note: draft.premium_logic_note,
    }
  }

  pub fn is_edit(&self) -> bool {
    self.id.is_some()
  }

  pub fn existing_image(&self) -> &str {
    &self.existing_image
  }

  /// Fields in display order for the current number of benefits
  pub fn fields(&self) -> Vec<FormField> {
    let mut fields = vec![
      FormField::Title,
      FormField::Category,
      FormField::Description,
      FormField::MinAge,
      FormField::MaxAge,
      FormField::CoverageRange,
      FormField::Durations,
      FormField::BaseRate,
      FormField::ImagePath,
    ];
    fields.extend((0..self.benefits.len()).map(FormField::Benefit));
    fields.push(FormField::Eligibility);
    fields.push(FormField::PremiumNote);
    fields
  }

  /// Text of a field. Category is chosen with a picker but reads the same way.
  pub fn value(&self, field: FormField) -> &str {
    match field {
      FormField::Title => &self.title,
      FormField::Category => &self.category,
      FormField::Description => &self.description,
      FormField::MinAge => &self.min_age,
      FormField::MaxAge => &self.max_age,
      FormField::CoverageRange => &self.coverage_range,
      FormField::Durations => &self.durations,
      FormField::BaseRate => &self.base_rate,
      FormField::ImagePath => &self.image_path,
      FormField::Benefit(i) => self.benefits.get(i).map(String::as_str).unwrap_or(""),
      FormField::Eligibility => &self.eligibility,
      FormField::PremiumNote => &self.premium_note,
    }
  }

  pub fn set_value(&mut self, field: FormField, value: String) {
    match field {
      FormField::Title => self.title = value,
      FormField::Category => self.category = value,
      FormField::Description => self.description = value,
      FormField::MinAge => self.min_age = value,
      FormField::MaxAge => self.max_age = value,
      FormField::CoverageRange => self.coverage_range = value,
      FormField::Durations => self.durations = value,
      FormField::BaseRate => self.base_rate = value,
      FormField::ImagePath => self.image_path = value,
      FormField::Benefit(i) => {
        if let Some(slot) = self.benefits.get_mut(i) {
          *slot = value;
        }
      }
      FormField::Eligibility => self.eligibility = value,
      FormField::PremiumNote => self.premium_note = value,
    }
  }

  /// Append an empty benefit after `index`, returning the new index
  pub fn add_benefit(&mut self, index: usize) -> usize {
    let at = (index + 1).min(self.benefits.len());
    self.benefits.insert(at, String::new());
    at
  }

  /// Remove a benefit. The last remaining one is kept.
  pub fn remove_benefit(&mut self, index: usize) -> bool {
    if self.benefits.len() <= 1 || index >= self.benefits.len() {
      return false;
    }
    self.benefits.remove(index);
    true
  }

  /// Validate and build the submission
  pub fn submit(&self) -> Result<Submission, FormError> {
    let title = required("Title", &self.title)?;
    let category = required("Category", &self.category)?;
    let description = required("Description", &self.description)?;
    let min_age = number::<u32>("Minimum age", &self.min_age)?;
    let max_age = number::<u32>("Maximum age", &self.max_age)?;
    if min_age > max_age {
      return Err(FormError::AgeRange {
        min: min_age,
        max: max_age,
      });
    }
    let coverage_range = required("Coverage range", &self.coverage_range)?;
    let duration_options = parse_durations(&self.durations);
    if duration_options.is_empty() {
      return Err(FormError::NoDurations);
    }
    let base_premium_rate = number::<f64>("Base premium rate", &self.base_rate)?;
    // NaN and infinities parse but serialize as null
    if !base_premium_rate.is_finite() || base_premium_rate < 0.0 {
      return Err(FormError::NotANumber("Base premium rate"));
    }
    let benefits: Vec<String> = self
      .benefits
      .iter()
      .map(|b| b.trim())
      .filter(|b| !b.is_empty())
      .map(str::to_string)
      .collect();
    if benefits.is_empty() {
      return Err(FormError::Required("At least one benefit"));
    }
    let eligibility = required("Eligibility", &self.eligibility)?;
    let premium_logic_note = required("Premium logic note", &self.premium_note)?;

    let image_path = Some(self.image_path.trim())
      .filter(|p| !p.is_empty())
      .map(PathBuf::from);

    Ok(Submission {
      id: self.id.clone(),
      draft: PolicyDraft {
        title,
        description,
        category,
        eligibility,
        premium_logic_note,
        min_age,
        max_age,
        coverage_range,
        duration_options,
        base_premium_rate,
        image: self.existing_image.clone(),
        benefits,
      },
      image_path,
    })
  }
}

fn required(name: &'static str, value: &str) -> Result<String, FormError> {
  let value = value.trim();
  if value.is_empty() {
    return Err(FormError::Required(name));
  }
  Ok(value.to_string())
}

fn number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, FormError> {
  let value = value.trim();
  if value.is_empty() {
    return Err(FormError::Required(name));
  }
  value.parse().map_err(|_| FormError::NotANumber(name))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filled() -> PolicyForm {
    PolicyForm {
      title: "Family Shield".to_string(),
      description: "Covers the whole family".to_string(),
      min_age: "18".to_string(),
      max_age: "60".to_string(),
      coverage_range: "$10k - $50k".to_string(),
      durations: "5, 10".to_string(),
      base_rate: "0.0003".to_string(),
      image_path: "./shield.png".to_string(),
      benefits: vec!["Hospital cover".to_string()],
      eligibility: "Residents".to_string(),
      premium_note: "Age based".to_string(),
      ..PolicyForm::new()
    }
  }

  #[test]
  fn test_parse_durations_drops_bad_tokens() {
    assert_eq!(parse_durations("5,10,15"), vec![5, 10, 15]);
    assert_eq!(parse_durations(" 5 , x, -3, 0, 20 "), vec![5, 20]);
    assert!(parse_durations("").is_empty());
  }

  #[test]
  fn test_valid_form_submits() {
    let submission = filled().submit().unwrap();
    assert_eq!(submission.id, None);
    assert_eq!(submission.draft.category, "Term Life");
    assert_eq!(submission.draft.duration_options, vec![5, 10]);
    assert_eq!(submission.image_path, Some(PathBuf::from("./shield.png")));
  }

  #[test]
  fn test_missing_fields_are_rejected() {
    let mut form = filled();
    form.title = "  ".to_string();
    assert_eq!(form.submit(), Err(FormError::Required("Title")));

    for rate in ["cheap", "NaN", "inf", "-inf", "infinity", "-0.5"] {
      let mut form = filled();
      form.base_rate = rate.to_string();
      assert_eq!(
        form.submit(),
        Err(FormError::NotANumber("Base premium rate")),
        "{rate}"
      );
    }

    let mut form = filled();
    form.base_rate = "0".to_string();
    assert_eq!(form.submit().unwrap().draft.base_premium_rate, 0.0);

    let mut form = filled();
    form.durations = "x, 0".to_string();
    assert_eq!(form.submit(), Err(FormError::NoDurations));

    // The image is optional
    let mut form = filled();
    form.image_path.clear();
    let submission = form.submit().unwrap();
    assert!(submission.image_path.is_none());
    assert!(submission.draft.image.is_empty());
  }

  #[test]
  fn test_age_range_is_checked() {
    let mut form = filled();
    form.min_age = "70".to_string();
    assert_eq!(form.submit(), Err(FormError::AgeRange { min: 70, max: 60 }));
  }

  #[test]
  fn test_benefits_keep_one_and_drop_blanks() {
    let mut form = filled();
    assert!(!form.remove_benefit(0));

    let at = form.add_benefit(0);
    assert_eq!(at, 1);
    form.set_value(FormField::Benefit(at), "   ".to_string());
    form.add_benefit(1);
    form.set_value(FormField::Benefit(2), "Cashless claims".to_string());

    let draft = form.submit().unwrap().draft;
    assert_eq!(draft.benefits, vec!["Hospital cover", "Cashless claims"]);

    assert!(form.remove_benefit(1));
    assert_eq!(form.benefits.len(), 2);
  }

  #[test]
  fn test_edit_prefills_and_keeps_image() {
    let policy: Policy = serde_json::from_value(serde_json::json!({
      "_id": "p1",
      "title": "Senior Care",
      "description": "For retirees",
      "category": "Senior",
      "eligibility": "60+",
      "premiumLogicNote": "Flat",
      "minAge": 60,
      "maxAge": 85,
      "coverageRange": "$5k",
      "durationOptions": [1, 2],
      "basePremiumRate": 0.5,
      "imageUrl": "https://i.example/senior.png",
      "benefits": ["Home visits"]
    }))
    .unwrap();

    let form = PolicyForm::edit(&policy);
    assert!(form.is_edit());
    assert_eq!(form.durations, "1, 2");

    let submission = form.submit().unwrap();
    assert_eq!(submission.id.as_deref(), Some("p1"));
    assert_eq!(submission.image_path, None);
    assert_eq!(submission.draft.image, "https://i.example/senior.png");
    assert_eq!(submission.draft.min_age, 60);
  }

  #[test]
  fn test_fields_follow_benefit_count() {
    let mut form = PolicyForm::new();
    let before = form.fields().len();
    form.add_benefit(0);
    assert_eq!(form.fields().len(), before + 1);
    assert_eq!(form.fields()[10], FormField::Benefit(1));
  }
}
