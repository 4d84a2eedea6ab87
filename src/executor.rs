//! Thread selection for callback-style entry points
//!
//! Hosts with a UI thread decide where network work and callbacks run.

use futures::future::BoxFuture;
use tokio::runtime::Handle;

use crate::error::{SdkError, SdkResult};

/// Work to run on the UI-capable context
pub type MainTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs units of work on a network-capable or a UI-capable context
pub trait Executor: Send + Sync {
    fn on_network_thread(&self, task: BoxFuture<'static, ()>);

    fn on_main_thread(&self, task: MainTask);
}

/// Spawns network work on a tokio runtime and runs main-thread work inline
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        TokioExecutor { handle }
    }

    /// Executor for the runtime the caller is running on
    pub fn current() -> SdkResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SdkError::Unknown(format!("no tokio runtime available: {}", e)))
    }
}

impl Executor for TokioExecutor {
    fn on_network_thread(&self, task: BoxFuture<'static, ()>) {
        self.handle.spawn(task);
    }

    fn on_main_thread(&self, task: MainTask) {
        task()
    }
}
