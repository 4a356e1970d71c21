//! Session store - the identity provider's session as seen by the client.

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::ExternalIdentity;
use crate::error::ClientError;
use crate::ports::IdentityProvider;

/// Holds the current external identity and broadcasts changes.
///
/// Knows nothing about backend profiles; `ProfileStore` subscribes to it.
pub struct SessionStore {
    tx: watch::Sender<Option<ExternalIdentity>>,
    provider: Arc<dyn IdentityProvider>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx, provider }
    }

    pub fn current(&self) -> Option<ExternalIdentity> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ExternalIdentity>> {
        self.tx.subscribe()
    }

    /// Record the provider's latest session. Subscribers are only woken when
    /// the identity actually changed.
    pub fn set_identity(&self, identity: Option<ExternalIdentity>) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == identity {
                return false;
            }
            *current = identity;
            true
        });

        if changed {
            match self.tx.borrow().as_ref() {
                Some(identity) => tracing::info!(uid = %identity.uid, "Identity signed in"),
                None => tracing::info!("Identity signed out"),
            }
        }

        changed
    }

    pub fn sign_in(&self, identity: ExternalIdentity) -> bool {
        self.set_identity(Some(identity))
    }

    pub fn sign_out(&self) -> bool {
        self.set_identity(None)
    }

    /// Ask the provider to (re)send the verification link.
    /// A no-op for identities whose email is already verified.
    pub async fn send_verification_email(&self) -> Result<(), ClientError> {
        let identity = self.current().ok_or(ClientError::Unauthenticated)?;

        if identity.email_verified {
            tracing::debug!(uid = %identity.uid, "Email already verified");
            return Ok(());
        }

        self.provider
            .send_verification_email(&identity)
            .await
            .map_err(|e| {
                tracing::warn!(uid = %identity.uid, error = %e, "Verification email failed");
                ClientError::from(e)
            })
    }
}
