//! Hook handler traits and implementations

use crate::hooks::{HookBroker, HookResult};
use serde_json::Value;

/// Something the broker can invoke for a registered callback.
///
/// `args` is already clamped to the registration's accepted-args count. For
/// filters the first argument is the value accumulated so far and the
/// returned value replaces it; for actions the return value is discarded.
/// The broker is handed back so a handler may register, remove or dispatch
/// while it runs.
pub trait HookHandler: Send + Sync {
    /// Invoke the handler
    fn call(&self, broker: &HookBroker, args: &[Value]) -> HookResult<Value>;

    /// Get the handler name
    fn name(&self) -> &str;
}

/// Adapter turning a closure into a [`HookHandler`]
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&HookBroker, &[Value]) -> HookResult<Value> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> HookHandler for FnHandler<F>
where
    F: Fn(&HookBroker, &[Value]) -> HookResult<Value> + Send + Sync,
{
    fn call(&self, broker: &HookBroker, args: &[Value]) -> HookResult<Value> {
        (self.func)(broker, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
