pub(crate) mod execution;
pub(crate) mod instructions;
pub(crate) mod parser;
pub(crate) mod repair;

use std::sync::Arc;
use std::time::Duration;

use crate::tooling::{RemoteToolHost, ToolRegistry};

/// Everything needed to resolve and run the tools a model asks for.
#[derive(Clone)]
pub(crate) struct ToolRuntime {
    registry: Arc<ToolRegistry>,
    remote: Option<Arc<dyn RemoteToolHost>>,
    timeout: Option<Duration>,
}

impl ToolRuntime {
    pub(crate) fn new(
        registry: Arc<ToolRegistry>,
        remote: Option<Arc<dyn RemoteToolHost>>,
    ) -> Self {
        Self {
            registry,
            remote,
            timeout: None,
        }
    }

    pub(crate) fn with_remote(mut self, remote: Arc<dyn RemoteToolHost>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
