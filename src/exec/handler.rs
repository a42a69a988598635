// src/exec/handler.rs

//! Named job bodies.
//!
//! Jobs refer to their body by task name; the executor looks the name up
//! here at dispatch time. Handlers receive the job's parameters followed by
//! its dependency results and return a JSON value.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::TaskError;

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<Value, TaskError>> + Send>>;

/// A job body, invocable any number of times with different arguments.
pub trait TaskHandler: Send + Sync {
    fn call(&self, args: Vec<Value>) -> TaskFuture;
}

/// Adapter turning an async function into a [`TaskHandler`].
pub struct FnHandler<F>(F);

impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    fn call(&self, args: Vec<Value>) -> TaskFuture {
        Box::pin((self.0)(args))
    }
}

/// Wrap an async function or closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    FnHandler(f)
}

/// Task name -> handler.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("TaskRegistry").field("tasks", &names).finish()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `echo`, `fail`, `sleep` and `shell`.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register("echo", handler_fn(crate::exec::builtins::echo));
        reg.register("fail", handler_fn(crate::exec::builtins::fail));
        reg.register("sleep", handler_fn(crate::exec::builtins::sleep));
        reg.register("shell", handler_fn(crate::exec::builtins::shell));
        reg
    }

    /// Register (or replace) the handler for `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: impl TaskHandler + 'static) -> &mut Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(|s| s.as_str())
    }
}
