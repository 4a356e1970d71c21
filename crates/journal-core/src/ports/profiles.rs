use async_trait::async_trait;

use crate::domain::{NewProfile, Profile};
use crate::error::ApiError;

/// Backend profile endpoints.
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// Look up the profile bound to an external identity id.
    /// `Ok(None)` means the user has not completed onboarding.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Profile>, ApiError>;

    /// Check whether a username is already taken.
    async fn username_exists(&self, username: &str) -> Result<bool, ApiError>;

    /// Create the profile. Returns `ApiError::Conflict` on a uniqueness violation.
    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, ApiError>;
}
