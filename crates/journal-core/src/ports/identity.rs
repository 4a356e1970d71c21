//! Identity provider port.

use async_trait::async_trait;

use crate::domain::ExternalIdentity;
use crate::error::ApiError;

/// The identity provider's side channel used by the client core.
///
/// Session changes themselves are pushed into `SessionStore`; this port only
/// covers calls the core makes back into the provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Send (or resend) the email verification link.
    async fn send_verification_email(&self, identity: &ExternalIdentity) -> Result<(), ApiError>;
}
