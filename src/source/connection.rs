//! Shared log connection
//!
//! One long-lived source handle is shared by every pull cycle of a process.
//! It is built lazily on first use, exactly once, even when several tasks ask
//! for it at the same time.

use super::types::LogSource;
use crate::error::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

type SourceFactory = dyn Fn() -> Result<Arc<dyn LogSource>> + Send + Sync;

struct Inner {
    source: OnceCell<Arc<dyn LogSource>>,
    factory: Box<SourceFactory>,
}

/// Cloneable handle to a lazily constructed [`LogSource`]
#[derive(Clone)]
pub struct SharedConnection {
    inner: Arc<Inner>,
}

impl SharedConnection {
    /// Create a connection that builds its source with `factory` on first use
    ///
    /// A failed construction is not cached; the next `get` tries again.
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn LogSource>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                source: OnceCell::new(),
                factory: Box::new(factory),
            }),
        }
    }

    /// Wrap an already constructed source
    pub fn from_source(source: Arc<dyn LogSource>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(Arc::clone(&source));
        Self {
            inner: Arc::new(Inner {
                source: cell,
                factory: Box::new(move || Ok(Arc::clone(&source))),
            }),
        }
    }

    /// Get the source, constructing it if this is the first call
    pub fn get(&self) -> Result<Arc<dyn LogSource>> {
        self.inner
            .source
            .get_or_try_init(|| {
                info!("Opening log connection");
                (self.inner.factory)()
            })
            .map(Arc::clone)
    }

    /// Check if the source has been constructed
    pub fn is_connected(&self) -> bool {
        self.inner.source.get().is_some()
    }
}

impl std::fmt::Debug for SharedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConnection")
            .field("connected", &self.is_connected())
            .finish()
    }
}
