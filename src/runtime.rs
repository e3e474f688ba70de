//! Runtime abstraction layer for async operations
//!
//! Texture loads run on whatever executor the host provides. The loader only
//! sees an [`AsyncSpawner`] and keeps the returned [`AsyncHandle`] so that a
//! load can be cancelled when its tile goes away.

use crate::prelude::{Arc, Future, Pin};
use crate::{MapError, Result};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience function for spawning with type safety
pub fn spawn<F>(spawner: &dyn AsyncSpawner, future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    spawner.spawn_boxed(Box::pin(future))
}

pub mod spawners {
    use super::*;
    use ::tokio::{runtime::Handle, task::JoinHandle};

    /// Tokio-based async spawner bound to one runtime
    #[derive(Debug, Clone)]
    pub struct TokioSpawner {
        handle: Handle,
    }

    impl TokioSpawner {
        pub fn new(handle: Handle) -> Self {
            Self { handle }
        }

        /// Spawner for the runtime the caller is currently running on.
        pub fn current() -> Result<Self> {
            Handle::try_current()
                .map(Self::new)
                .map_err(|e| MapError::Runtime(format!("no tokio runtime available: {}", e)))
        }
    }

    impl AsyncSpawner for TokioSpawner {
        fn spawn_boxed(
            &self,
            future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
        ) -> Box<dyn AsyncHandle> {
            Box::new(TokioHandle(self.handle.spawn(future)))
        }
    }

    struct TokioHandle(JoinHandle<()>);

    impl AsyncHandle for TokioHandle {
        fn is_finished(&self) -> bool {
            self.0.is_finished()
        }

        fn cancel(&self) {
            self.0.abort();
        }
    }
}

/// Default spawner: tokio on the current runtime.
pub fn default_spawner() -> Result<Arc<dyn AsyncSpawner>> {
    Ok(Arc::new(spawners::TokioSpawner::current()?))
}
