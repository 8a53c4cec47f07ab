use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use super::error::ToolInvokeError;
use super::interface::ToolDefinition;

/// Executor behind a local tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError>;
}

/// Adapts an async closure into a [`ToolHandler`].
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F, Fut> ToolHandler for FnTool<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolInvokeError>> + Send,
{
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        (self.0)(arguments).await
    }
}

/// Adapts an async closure over typed arguments. Arguments that do not
/// deserialize into `A` are rejected before the closure runs.
pub struct TypedTool<A, F> {
    name: String,
    f: F,
    _arguments: PhantomData<fn() -> A>,
}

#[async_trait]
impl<A, R, F, Fut> ToolHandler for TypedTool<A, F>
where
    A: DeserializeOwned + Send + 'static,
    R: Serialize + Send,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, ToolInvokeError>> + Send,
{
    async fn call(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError> {
        let parsed: A = serde_json::from_value(Value::Object(arguments)).map_err(|err| {
            ToolInvokeError::InvalidArguments {
                tool: self.name.clone(),
                reason: err.to_string(),
            }
        })?;
        let output = (self.f)(parsed).await?;
        Ok(serde_json::to_value(output)?)
    }
}

#[derive(Clone)]
pub struct LocalTool {
    pub definition: ToolDefinition,
    pub handler: Arc<dyn ToolHandler>,
}

/// In-process tools, looked up by exact name first and then
/// case-insensitively.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<LocalTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `definition.name`, replacing any tool of the
    /// same name.
    pub fn register(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        let key = definition.name.to_lowercase();
        let tool = LocalTool {
            definition,
            handler,
        };
        match self.index.get(&key) {
            Some(&position) => {
                debug!(tool = %tool.definition.name, "Replacing registered tool");
                self.tools[position] = tool;
            }
            None => {
                self.index.insert(key, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn with_tool(
        mut self,
        definition: ToolDefinition,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        self.register(definition, Arc::new(handler));
        self
    }

    pub fn with_fn<F, Fut>(self, definition: ToolDefinition, f: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolInvokeError>> + Send + 'static,
    {
        self.with_tool(definition, FnTool(f))
    }

    /// Register a closure taking deserialized arguments and returning any
    /// serializable output.
    pub fn with_typed<A, R, F, Fut>(self, definition: ToolDefinition, f: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolInvokeError>> + Send + 'static,
    {
        let name = definition.name.clone();
        self.with_tool(
            definition,
            TypedTool {
                name,
                f,
                _arguments: PhantomData,
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&LocalTool> {
        self.tools
            .iter()
            .find(|tool| tool.definition.name == name)
            .or_else(|| {
                self.index
                    .get(&name.to_lowercase())
                    .map(|&position| &self.tools[position])
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| tool.definition.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
