//! Client configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use journal_core::domain::ExternalIdentity;
#[cfg(feature = "http")]
use journal_infra::HttpConfig;

/// Which backend the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(BackendKind::Http),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{other}' (expected http or memory)")),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend: BackendKind,
    #[cfg(feature = "http")]
    pub http: HttpConfig,
    /// Home feed pages fetched per run.
    pub feed_pages: usize,
    /// Identity to sign in as; anonymous when unset.
    pub identity: Option<ExternalIdentity>,
    /// Username used to complete onboarding for a new identity.
    pub username: Option<String>,
    pub send_verification: bool,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let backend = env::var("JOURNAL_BACKEND")
            .ok()
            .and_then(|value| match value.parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring JOURNAL_BACKEND");
                    None
                }
            })
            .unwrap_or(if cfg!(feature = "http") {
                BackendKind::Http
            } else {
                BackendKind::Memory
            });

        Self {
            backend,
            #[cfg(feature = "http")]
            http: HttpConfig::from_env(),
            feed_pages: env::var("JOURNAL_FEED_PAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            identity: Self::identity_from_env(),
            username: env::var("JOURNAL_USERNAME").ok().filter(|u| !u.is_empty()),
            send_verification: flag("JOURNAL_SEND_VERIFICATION"),
        }
    }

    fn identity_from_env() -> Option<ExternalIdentity> {
        let uid = env::var("JOURNAL_UID").ok().filter(|uid| !uid.is_empty())?;
        let mut identity = ExternalIdentity::new(uid);

        if let Ok(name) = env::var("JOURNAL_DISPLAY_NAME") {
            identity = identity.with_display_name(name);
        }
        if let Ok(email) = env::var("JOURNAL_EMAIL") {
            identity = identity.with_email(email, flag("JOURNAL_EMAIL_VERIFIED"));
        }
        if let Ok(url) = env::var("JOURNAL_PHOTO_URL") {
            identity = identity.with_photo_url(url);
        }
        Some(identity)
    }
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("HTTP".parse::<BackendKind>(), Ok(BackendKind::Http));
        assert_eq!(" memory ".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert!("postgres".parse::<BackendKind>().is_err());
    }
}
