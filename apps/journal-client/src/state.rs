//! Client state - the backend selection and the application context.

use std::sync::Arc;

use journal_core::{Backends, JournalContext};
use journal_infra::InMemoryBackend;
#[cfg(feature = "http")]
use journal_infra::HttpBackend;

use crate::config::{BackendKind, ClientConfig};

pub struct ClientState {
    pub backend: BackendKind,
    pub context: JournalContext,
}

impl ClientState {
    /// Build the context over the configured backend.
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let (backend, backends) = Self::backends(config)?;
        let context = JournalContext::new(backends);

        Ok(Self { backend, context })
    }

    #[cfg(feature = "http")]
    fn backends(config: &ClientConfig) -> anyhow::Result<(BackendKind, Backends)> {
        match config.backend {
            BackendKind::Http => {
                tracing::info!(url = %config.http.base_url, "Using journal API");
                let backend = HttpBackend::new(config.http.clone())?;
                Ok((BackendKind::Http, Backends::shared(Arc::new(backend))))
            }
            BackendKind::Memory => Ok(Self::memory()),
        }
    }

    #[cfg(not(feature = "http"))]
    fn backends(config: &ClientConfig) -> anyhow::Result<(BackendKind, Backends)> {
        if config.backend == BackendKind::Http {
            tracing::warn!("Built without the http feature. Using in-memory backend.");
        }
        Ok(Self::memory())
    }

    fn memory() -> (BackendKind, Backends) {
        tracing::info!("Using in-memory backend; data is lost on exit");
        (
            BackendKind::Memory,
            Backends::shared(Arc::new(InMemoryBackend::default())),
        )
    }
}
