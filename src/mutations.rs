//! Create, update and delete pipelines for policies.
//!
//! Every mutation runs the same steps: resolve the image (uploading a freshly
//! picked one first), write, invalidate the cached reads, and report an
//! outcome the UI turns into a notification. One in-flight flag is shared by
//! all three, so a second submission while one is running is rejected.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::form::Submission;
use crate::policy::cached_client::CachedPolicyClient;
use crate::policy::error::{ApiError, UploadError};
use crate::policy::types::{ImageBlob, PolicyDraft};
use crate::policy::upload::{read_image, ImageUploader};

const GENERIC_FAILURE: &str = "Something went wrong!";
const UPLOAD_FAILURE: &str = "Failed to upload policy image.";

#[derive(Debug, Error)]
pub enum MutationError {
  #[error("another change is still being saved")]
  Busy,
  #[error(transparent)]
  Upload(#[from] UploadError),
  #[error(transparent)]
  Api(#[from] ApiError),
  #[error("{0}")]
  Invalid(String),
}

impl MutationError {
  /// Text shown to the user for this failure
  pub fn user_message(&self) -> String {
    match self {
      MutationError::Busy => "Please wait for the current change to finish.".to_string(),
      MutationError::Upload(_) => UPLOAD_FAILURE.to_string(),
      MutationError::Api(err) => err
        .server_message()
        .unwrap_or(GENERIC_FAILURE)
        .to_string(),
      MutationError::Invalid(msg) => msg.clone(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Create,
  Update,
  Delete,
}

impl MutationKind {
  fn success_title(self) -> &'static str {
    match self {
      MutationKind::Create => "Policy Added!",
      MutationKind::Update => "Policy Updated!",
      MutationKind::Delete => "Policy Deleted!",
    }
  }

  fn failure_title(self) -> &'static str {
    match self {
      MutationKind::Create => "Failed to Add Policy",
      MutationKind::Update => "Failed to Update Policy",
      MutationKind::Delete => "Failed to Delete Policy",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
  Success,
  Error,
}

/// Dismissible message reporting how a mutation went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: NotificationLevel,
  pub title: String,
  pub text: Option<String>,
}

impl Notification {
  pub fn success(kind: MutationKind) -> Self {
    Self {
      level: NotificationLevel::Success,
      title: kind.success_title().to_string(),
      text: None,
    }
  }

  pub fn failure(kind: MutationKind, err: &MutationError) -> Self {
    // Upload failures and busy rejections are self-describing
    let (title, text) = match err {
      MutationError::Upload(_) | MutationError::Busy => (err.user_message(), None),
      _ => (kind.failure_title().to_string(), Some(err.user_message())),
    };
    Self {
      level: NotificationLevel::Error,
      title,
      text,
    }
  }

  pub fn from_result(kind: MutationKind, result: &Result<(), MutationError>) -> Self {
    match result {
      Ok(()) => Self::success(kind),
      Err(err) => Self::failure(kind, err),
    }
  }
}

/// Held while a mutation runs; clears the shared flag on every exit path
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// Policy write pipelines. Cloning shares the in-flight flag.
#[derive(Clone)]
pub struct PolicyMutations {
  policies: CachedPolicyClient,
  uploader: Arc<dyn ImageUploader>,
  in_flight: Arc<AtomicBool>,
}

impl PolicyMutations {
  pub fn new(policies: CachedPolicyClient, uploader: Arc<dyn ImageUploader>) -> Self {
    Self {
      policies,
      uploader,
      in_flight: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Whether a mutation is running
  pub fn is_busy(&self) -> bool {
    self.in_flight.load(Ordering::Acquire)
  }

  fn begin(&self) -> Result<InFlightGuard, MutationError> {
    self
      .in_flight
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .map_err(|_| MutationError::Busy)?;
    Ok(InFlightGuard(Arc::clone(&self.in_flight)))
  }

  /// Upload the picked image, if any, and return the draft to write
  async fn resolve_image(
    &self,
    mut draft: PolicyDraft,
    image: Option<ImageBlob>,
  ) -> Result<PolicyDraft, MutationError> {
    if let Some(blob) = image {
      let url = self.uploader.upload(blob).await.map_err(|e| {
        warn!(error = %e, "image upload failed");
        e
      })?;
      draft.image = url;
    }
    Ok(draft)
  }

  /// Create a policy. A picked image is uploaded first; if that fails
  /// nothing is written.
  pub async fn create(
    &self,
    draft: PolicyDraft,
    image: Option<ImageBlob>,
  ) -> Result<(), MutationError> {
    let _guard = self.begin()?;
    self.write_create(draft, image).await
  }

  /// Update a policy. Without a new image the draft's current URL is kept.
  pub async fn update(
    &self,
    id: &str,
    draft: PolicyDraft,
    image: Option<ImageBlob>,
  ) -> Result<(), MutationError> {
    check_id(id)?;
    let _guard = self.begin()?;
    self.write_update(id, draft, image).await
  }

  // Callers hold the in-flight guard
  async fn write_create(
    &self,
    draft: PolicyDraft,
    image: Option<ImageBlob>,
  ) -> Result<(), MutationError> {
    let draft = self.resolve_image(draft, image).await?;

    info!(title = %draft.title, "creating policy");
    self
      .policies
      .inner()
      .create_policy(&draft)
      .await
      .map_err(|e| {
        warn!(error = %e, "create failed");
        e
      })?;
    self.policies.invalidate_policies();
    Ok(())
  }

  async fn write_update(
    &self,
    id: &str,
    draft: PolicyDraft,
    image: Option<ImageBlob>,
  ) -> Result<(), MutationError> {
    let draft = self.resolve_image(draft, image).await?;

    info!(id, title = %draft.title, "updating policy");
    self
      .policies
      .inner()
      .update_policy(id, &draft)
      .await
      .map_err(|e| {
        warn!(id, error = %e, "update failed");
        e
      })?;
    self.policies.invalidate_policies();
    Ok(())
  }

  /// Delete a policy once `confirm` resolves to `true`.
  ///
  /// Returns `Ok(false)` without any request when the confirmation is
  /// declined or abandoned.
  pub async fn delete<C>(&self, id: &str, confirm: C) -> Result<bool, MutationError>
  where
    C: Future<Output = bool>,
  {
    check_id(id)?;
    if !confirm.await {
      info!(id, "delete cancelled");
      return Ok(false);
    }
    let _guard = self.begin()?;

    info!(id, "deleting policy");
    self
      .policies
      .inner()
      .delete_policy(id)
      .await
      .map_err(|e| {
        warn!(id, error = %e, "delete failed");
        e
      })?;
    self.policies.invalidate_policies();
    Ok(true)
  }

  /// Run a validated form submission: read the picked image file, if any,
  /// then create or update. The in-flight flag is held from the start, so
  /// the view shows busy while the file is read.
  pub async fn submit(&self, submission: Submission) -> (MutationKind, Result<(), MutationError>) {
    let Submission {
      id,
      draft,
      image_path,
    } = submission;
    let kind = if id.is_some() {
      MutationKind::Update
    } else {
      MutationKind::Create
    };

    let result: Result<(), MutationError> = async {
      if let Some(id) = &id {
        check_id(id)?;
      }
      let _guard = self.begin()?;
      let image = match image_path {
        Some(path) => Some(read_image(&path).await?),
        None => None,
      };
      match id {
        Some(id) => self.write_update(&id, draft, image).await,
        None => self.write_create(draft, image).await,
      }
    }
    .await;

    (kind, result)
  }
}

fn check_id(id: &str) -> Result<(), MutationError> {
  if id.is_empty() {
    return Err(MutationError::Invalid("policy has no id".to_string()));
  }
  Ok(())
}
