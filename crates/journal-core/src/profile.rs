//! Profile store - resolves the external identity to a backend profile.
//!
//! State machine:
//! - `Anonymous` -> identity appears -> `Resolving`
//! - `Resolving` -> lookup found -> `Ready`
//! - `Resolving` -> lookup not found -> `OnboardingRequired`
//! - `Resolving` -> lookup failed -> `Error` (retry re-enters `Resolving`)
//! - `OnboardingRequired` -> profile created -> `Ready`
//! - any -> identity disappears -> `Anonymous`
//!
//! Every resolution is tagged with an epoch. Identity changes bump the
//! epoch, and a result whose epoch is no longer current is dropped.

use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::{ExternalIdentity, ImageSource, NewProfile, Profile};
use crate::error::{ApiError, ClientError};
use crate::ports::ProfileApi;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_.]+$").expect("valid username pattern"));

/// Resolved session state as seen by views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileState {
    Anonymous,
    Resolving {
        identity: ExternalIdentity,
    },
    OnboardingRequired {
        identity: ExternalIdentity,
    },
    Ready {
        identity: ExternalIdentity,
        profile: Profile,
    },
    Error {
        identity: ExternalIdentity,
        message: String,
    },
}

impl ProfileState {
    pub fn identity(&self) -> Option<&ExternalIdentity> {
        match self {
            ProfileState::Anonymous => None,
            ProfileState::Resolving { identity }
            | ProfileState::OnboardingRequired { identity }
            | ProfileState::Ready { identity, .. }
            | ProfileState::Error { identity, .. } => Some(identity),
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            ProfileState::Ready { profile, .. } => Some(profile),
            _ => None,
        }
    }

    /// False only while a lookup is outstanding.
    pub fn is_settled(&self) -> bool {
        !matches!(self, ProfileState::Resolving { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProfileState::Anonymous => "anonymous",
            ProfileState::Resolving { .. } => "resolving",
            ProfileState::OnboardingRequired { .. } => "onboarding-required",
            ProfileState::Ready { .. } => "ready",
            ProfileState::Error { .. } => "error",
        }
    }
}

/// Data entered on the onboarding form.
#[derive(Debug, Clone, Default)]
pub struct OnboardingForm {
    pub name: String,
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<ImageSource>,
}

impl OnboardingForm {
    /// Seed name and image from the identity provider's data.
    pub fn prefilled(identity: &ExternalIdentity) -> Self {
        Self {
            name: identity.display_name.clone().unwrap_or_default(),
            image: identity.photo_url.clone().map(ImageSource::Url),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.name.trim().is_empty() {
            return Err(ClientError::Validation("Please enter your name.".into()));
        }
        if self.username.is_empty() {
            return Err(ClientError::Validation("Please enter a username.".into()));
        }
        if !USERNAME_PATTERN.is_match(&self.username) {
            return Err(ClientError::Validation(
                "Username may only contain lowercase letters, digits, '_' and '.'.".into(),
            ));
        }
        Ok(())
    }

    fn into_new_profile(self, external_id: String) -> NewProfile {
        NewProfile {
            external_id,
            username: self.username,
            name: self.name.trim().to_string(),
            bio: self.bio.filter(|bio| !bio.trim().is_empty()),
            image: self.image,
        }
    }
}

struct Inner {
    epoch: u64,
    state: ProfileState,
    /// Epoch of the onboarding submission in flight, if any.
    onboarding: Option<u64>,
}

/// Owns the cached profile. Only this type writes it; everything else reads
/// snapshots through [`ProfileStore::state`] or [`ProfileStore::subscribe`].
pub struct ProfileStore {
    api: Arc<dyn ProfileApi>,
    inner: Mutex<Inner>,
    tx: watch::Sender<ProfileState>,
}

impl ProfileStore {
    pub fn new(api: Arc<dyn ProfileApi>) -> Self {
        let (tx, _rx) = watch::channel(ProfileState::Anonymous);
        Self {
            api,
            inner: Mutex::new(Inner {
                epoch: 0,
                state: ProfileState::Anonymous,
                onboarding: None,
            }),
            tx,
        }
    }

    pub fn state(&self) -> ProfileState {
        self.inner.lock().state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.tx.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.lock().state.profile().cloned()
    }

    /// Id of the ready profile, used to gate viewer-only actions.
    pub fn viewer_id(&self) -> Option<Uuid> {
        self.inner.lock().state.profile().map(|p| p.id)
    }

    /// Follow a session's identity changes until the session goes away.
    ///
    /// Each lookup runs on its own task so a newer identity never waits
    /// behind an older lookup; the epoch check drops whichever loses.
    pub fn spawn_sync(
        self: &Arc<Self>,
        mut identities: watch::Receiver<Option<ExternalIdentity>>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let initial = identities.borrow_and_update().clone();
            store.dispatch(initial);

            while identities.changed().await.is_ok() {
                let identity = identities.borrow_and_update().clone();
                store.dispatch(identity);
            }

            tracing::debug!("Session closed, profile sync stopped");
        })
    }

    fn dispatch(self: &Arc<Self>, identity: Option<ExternalIdentity>) {
        // Epoch is taken here, in change order, before the lookup is spawned.
        if let Some((epoch, identity)) = self.begin(identity) {
            let store = Arc::clone(self);
            tokio::spawn(async move {
                store.resolve(epoch, identity).await;
            });
        }
    }

    /// Apply an identity change and run the resulting lookup, if any.
    pub async fn on_identity_changed(&self, identity: Option<ExternalIdentity>) {
        if let Some((epoch, identity)) = self.begin(identity) {
            self.resolve(epoch, identity).await;
        }
    }

    /// Re-run the lookup after a failed resolution.
    pub async fn retry(&self) -> Result<(), ClientError> {
        let identity = {
            let inner = self.inner.lock();
            match &inner.state {
                ProfileState::Error { identity, .. } => identity.clone(),
                ProfileState::Anonymous => return Err(ClientError::Unauthenticated),
                _ => return Err(ClientError::InvalidState("no failed resolution to retry")),
            }
        };
        self.on_identity_changed(Some(identity)).await;
        Ok(())
    }

    /// Re-fetch the profile for the current identity.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let identity = self
            .inner
            .lock()
            .state
            .identity()
            .cloned()
            .ok_or(ClientError::Unauthenticated)?;
        self.on_identity_changed(Some(identity)).await;
        Ok(())
    }

    /// Side lookup used by the onboarding form; no state change.
    pub async fn check_username(&self, username: &str) -> Result<bool, ClientError> {
        self.api
            .username_exists(username)
            .await
            .map_err(ClientError::from)
    }

    /// Create the profile for an identity that has none yet.
    ///
    /// The availability pre-check must come back negative before the create
    /// call is sent. Two onboardings racing for the same name can both pass
    /// it; the server's uniqueness constraint decides, and its conflict is
    /// reported the same way. Failures leave the store in
    /// `OnboardingRequired` for the user to resubmit.
    pub async fn complete_onboarding(&self, form: OnboardingForm) -> Result<Profile, ClientError> {
        let (epoch, identity) = {
            let mut inner = self.inner.lock();
            let identity = match &inner.state {
                ProfileState::OnboardingRequired { identity } => identity.clone(),
                ProfileState::Anonymous => return Err(ClientError::Unauthenticated),
                ProfileState::Ready { .. } => {
                    return Err(ClientError::InvalidState("profile already created"));
                }
                _ => return Err(ClientError::InvalidState("profile is not awaiting onboarding")),
            };
            if inner.onboarding == Some(inner.epoch) {
                return Err(ClientError::Busy);
            }
            form.validate()?;
            inner.onboarding = Some(inner.epoch);
            (inner.epoch, identity)
        };

        let _onboarding = OnboardingGuard {
            inner: &self.inner,
            epoch,
        };

        self.submit_onboarding(epoch, identity, form)
            .await
            .map_err(|e| match e {
                ClientError::Stale { epoch, current } => {
                    tracing::debug!(epoch, current, "Discarding stale onboarding result");
                    ClientError::InvalidState("identity changed during onboarding")
                }
                other => other,
            })
    }

    async fn submit_onboarding(
        &self,
        epoch: u64,
        identity: ExternalIdentity,
        form: OnboardingForm,
    ) -> Result<Profile, ClientError> {
        if self.check_username(&form.username).await? {
            tracing::debug!(username = %form.username, "Username already taken");
            return Err(ClientError::Conflict(format!(
                "Username {} already exists",
                form.username
            )));
        }

        self.ensure_current(epoch)?;

        let profile = self
            .api
            .create_profile(form.into_new_profile(identity.uid.clone()))
            .await
            .map_err(|e| {
                tracing::warn!(uid = %identity.uid, error = %e, "Profile creation failed");
                ClientError::from(e)
            })?;

        self.commit(epoch, |state| {
            *state = ProfileState::Ready {
                identity,
                profile: profile.clone(),
            };
        })?;

        tracing::info!(username = %profile.username, "Onboarding completed");
        Ok(profile)
    }

    /// Start a new epoch for `identity`. Returns the lookup to run, if any.
    fn begin(&self, identity: Option<ExternalIdentity>) -> Option<(u64, ExternalIdentity)> {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        let epoch = inner.epoch;

        let next = match identity {
            Some(identity) => {
                inner.state = ProfileState::Resolving {
                    identity: identity.clone(),
                };
                Some((epoch, identity))
            }
            None => {
                // Dropping the old state discards any cached profile.
                inner.state = ProfileState::Anonymous;
                None
            }
        };

        tracing::debug!(epoch, state = inner.state.name(), "Profile state changed");
        self.tx.send_replace(inner.state.clone());
        next
    }

    async fn resolve(&self, epoch: u64, identity: ExternalIdentity) {
        let result = self.api.find_by_external_id(&identity.uid).await;

        let applied = self.commit(epoch, |state| {
            *state = match result {
                Ok(Some(profile)) => ProfileState::Ready { identity, profile },
                Ok(None) => ProfileState::OnboardingRequired { identity },
                Err(ApiError::NotFound) => ProfileState::OnboardingRequired { identity },
                Err(e) => {
                    tracing::warn!(uid = %identity.uid, error = %e, "Profile lookup failed");
                    ProfileState::Error {
                        identity,
                        message: e.to_string(),
                    }
                }
            };
        });

        if let Err(ClientError::Stale { epoch, current }) = applied {
            tracing::debug!(epoch, current, "Discarding stale profile resolution");
        }
    }

    fn ensure_current(&self, epoch: u64) -> Result<(), ClientError> {
        let current = self.inner.lock().epoch;
        if current != epoch {
            return Err(ClientError::Stale { epoch, current });
        }
        Ok(())
    }

    /// Write the state only if `epoch` is still current.
    fn commit(&self, epoch: u64, update: impl FnOnce(&mut ProfileState)) -> Result<(), ClientError> {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return Err(ClientError::Stale {
                epoch,
                current: inner.epoch,
            });
        }

        update(&mut inner.state);
        tracing::debug!(epoch, state = inner.state.name(), "Profile state changed");
        self.tx.send_replace(inner.state.clone());
        Ok(())
    }
}

/// Releases the onboarding slot when a submission ends or is dropped.
struct OnboardingGuard<'a> {
    inner: &'a Mutex<Inner>,
    epoch: u64,
}

impl Drop for OnboardingGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.onboarding == Some(self.epoch) {
            inner.onboarding = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, identity, profile, settle};

    fn store() -> (Arc<FakeBackend>, Arc<ProfileStore>) {
        let backend = Arc::new(FakeBackend::default());
        let store = Arc::new(ProfileStore::new(backend.clone()));
        (backend, store)
    }

    fn onboarding_form(username: &str) -> OnboardingForm {
        OnboardingForm {
            name: "Ada".to_string(),
            username: username.to_string(),
            bio: Some("  ".to_string()),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_found_profile_is_ready() {
        let (backend, store) = store();
        let alice = profile("a", "alice");
        backend.lookups.push_ok(Some(alice.clone()));

        store.on_identity_changed(Some(identity("a"))).await;

        assert_eq!(store.profile(), Some(alice.clone()));
        assert_eq!(store.viewer_id(), Some(alice.id));
    }

    #[tokio::test]
    async fn test_missing_profile_requires_onboarding() {
        let (backend, store) = store();
        backend.lookups.push_ok(None);

        store.on_identity_changed(Some(identity("a"))).await;

        assert!(matches!(
            store.state(),
            ProfileState::OnboardingRequired { .. }
        ));
        assert_eq!(store.viewer_id(), None);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_retryable() {
        let (backend, store) = store();
        backend.lookups.push_err(ApiError::Network("timeout".into()));
        backend.lookups.push_ok(Some(profile("a", "alice")));

        store.on_identity_changed(Some(identity("a"))).await;
        assert_eq!(store.state().name(), "error");

        store.retry().await.unwrap();
        assert_eq!(store.state().name(), "ready");
        assert_eq!(backend.lookups.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_needs_failed_state() {
        let (_, store) = store();
        assert_eq!(store.retry().await, Err(ClientError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_sign_out_discards_profile() {
        let (backend, store) = store();
        backend.lookups.push_ok(Some(profile("a", "alice")));
        store.on_identity_changed(Some(identity("a"))).await;

        store.on_identity_changed(None).await;

        assert_eq!(store.state(), ProfileState::Anonymous);
        assert_eq!(store.profile(), None);
    }

    #[tokio::test]
    async fn test_superseded_lookup_never_shows_old_profile() {
        let (backend, store) = store();
        let release_a = backend.lookups.hold();
        let release_b = backend.lookups.hold();
        let mut states = store.subscribe();

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.on_identity_changed(Some(identity("a"))).await }
        });
        settle().await;
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.on_identity_changed(Some(identity("b"))).await }
        });
        settle().await;

        // B resolves first, then A's late answer arrives.
        let bob = profile("b", "bob");
        release_b.send(Ok(Some(bob.clone()))).unwrap();
        b.await.unwrap();
        release_a.send(Ok(Some(profile("a", "alice")))).unwrap();
        a.await.unwrap();

        assert_eq!(store.profile(), Some(bob));
        let last = states.borrow_and_update().clone();
        assert_eq!(last.profile().map(|p| p.username.as_str()), Some("bob"));
    }

    #[tokio::test]
    async fn test_lookup_finishing_after_sign_out_is_dropped() {
        let (backend, store) = store();
        let release = backend.lookups.hold();

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.on_identity_changed(Some(identity("a"))).await }
        });
        settle().await;
        store.on_identity_changed(None).await;

        release.send(Ok(Some(profile("a", "alice")))).unwrap();
        task.await.unwrap();

        assert_eq!(store.state(), ProfileState::Anonymous);
    }

    #[tokio::test]
    async fn test_spawn_sync_follows_session() {
        let (backend, store) = store();
        let (tx, rx) = watch::channel(None);
        backend.lookups.push_ok(Some(profile("a", "alice")));
        let handle = store.spawn_sync(rx);

        tx.send_replace(Some(identity("a")));
        let mut states = store.subscribe();
        let ready = states
            .wait_for(|state| state.name() == "ready")
            .await
            .unwrap()
            .clone();
        assert_eq!(ready.profile().unwrap().username, "alice");

        tx.send_replace(None);
        states.wait_for(|state| *state == ProfileState::Anonymous).await.unwrap();

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_onboarding_with_taken_username_conflicts() {
        let (backend, store) = store();
        backend.lookups.push_ok(None);
        store.on_identity_changed(Some(identity("a"))).await;
        backend.username_checks.push_ok(true);

        let result = store.complete_onboarding(onboarding_form("abc")).await;

        assert!(matches!(result, Err(ClientError::Conflict(_))));
        assert_eq!(store.state().name(), "onboarding-required");
        assert_eq!(backend.creations.calls(), 0);
    }

    #[tokio::test]
    async fn test_onboarding_creates_profile() {
        let (backend, store) = store();
        backend.lookups.push_ok(None);
        store.on_identity_changed(Some(identity("a"))).await;
        backend.username_checks.push_ok(false);
        backend.creations.push_ok(profile("a", "ada"));

        let created = store.complete_onboarding(onboarding_form("ada")).await.unwrap();

        assert_eq!(store.profile(), Some(created));
        let sent = backend.created_profiles.lock();
        assert_eq!(sent[0].external_id, "a");
        assert_eq!(sent[0].bio, None);
    }

    #[tokio::test]
    async fn test_onboarding_create_failure_stays_onboarding() {
        let (backend, store) = store();
        backend.lookups.push_ok(None);
        store.on_identity_changed(Some(identity("a"))).await;
        backend.username_checks.push_ok(false);
        backend
            .creations
            .push_err(ApiError::Conflict("username taken".into()));

        let result = store.complete_onboarding(onboarding_form("ada")).await;

        assert!(matches!(result, Err(ClientError::Conflict(_))));
        assert_eq!(store.state().name(), "onboarding-required");
        // Not retried behind the user's back.
        assert_eq!(backend.creations.calls(), 1);
    }

    #[tokio::test]
    async fn test_onboarding_validates_before_network() {
        let (backend, store) = store();
        backend.lookups.push_ok(None);
        store.on_identity_changed(Some(identity("a"))).await;

        let result = store.complete_onboarding(onboarding_form("Not Valid")).await;

        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert_eq!(backend.username_checks.calls(), 0);
    }

    #[tokio::test]
    async fn test_onboarding_requires_identity() {
        let (_, store) = store();
        let result = store.complete_onboarding(onboarding_form("ada")).await;
        assert_eq!(result, Err(ClientError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_prefilled_form_uses_identity() {
        let id = identity("a").with_photo_url("https://img.example/a.png");
        let form = OnboardingForm::prefilled(&id);
        assert_eq!(form.name, "User a");
        assert_eq!(
            form.image,
            Some(ImageSource::Url("https://img.example/a.png".into()))
        );
    }

    #[tokio::test]
    async fn test_identity_change_during_onboarding_is_not_stale() {
        let (backend, store) = store();
        backend.lookups.push_ok(None);
        store.on_identity_changed(Some(identity("a"))).await;
        let release = backend.username_checks.hold();

        let submit = tokio::spawn({
            let store = store.clone();
            async move { store.complete_onboarding(onboarding_form("ada")).await }
        });
        settle().await;

        backend.lookups.push_ok(None);
        store.on_identity_changed(Some(identity("b"))).await;
        release.send(Ok(false)).unwrap();

        assert_eq!(
            submit.await.unwrap(),
            Err(ClientError::InvalidState("identity changed during onboarding"))
        );
        assert_eq!(backend.creations.calls(), 0);
        assert_eq!(
            store.state(),
            ProfileState::OnboardingRequired {
                identity: identity("b")
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_onboarding_can_be_resubmitted() {
        let (backend, store) = store();
        backend.lookups.push_ok(None);
        store.on_identity_changed(Some(identity("a"))).await;
        let _never = backend.username_checks.hold();
        backend.username_checks.push_ok(false);
        backend.creations.push_ok(profile("a", "ada"));

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            store.complete_onboarding(onboarding_form("ada")),
        )
        .await;
        assert!(abandoned.is_err());

        let created = store.complete_onboarding(onboarding_form("ada")).await.unwrap();
        assert_eq!(created.username, "ada");
    }
}
