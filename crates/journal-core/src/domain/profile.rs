use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ImageSource;

/// Profile entity - the backend-owned user record, cached by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub external_id: String,
    /// Unique, immutable once set.
    pub username: String,
    pub name: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload of a profile-creation call.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<ImageSource>,
}
