//! Callback identity
//!
//! A callback is registered, looked up and removed by a [`RegistrationId`]
//! derived from its [`CallbackRef`]. Named functions and static methods
//! derive their id from names alone. Bound methods derive it from the
//! receiving [`Instance`], which draws a process-unique number the first time
//! it is identified and keeps it for as long as any clone of it is alive.

use crate::hooks::handler::FnHandler;
use crate::hooks::{HookBroker, HookError, HookHandler, HookResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle for an object whose methods are registered as callbacks.
///
/// Clones share identity; two separately created instances never do, even
/// with the same class name.
#[derive(Clone)]
pub struct Instance {
    class: Arc<str>,
    slot: Arc<OnceLock<u64>>,
}

impl Instance {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: Arc::from(class.into()),
            slot: Arc::new(OnceLock::new()),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Process-unique number of this instance, allocated on first use
    pub fn id(&self) -> u64 {
        *self
            .slot
            .get_or_init(|| NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether an id has been allocated yet
    pub fn is_identified(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.get() {
            Some(id) => write!(f, "Instance({}#{})", self.class, id),
            None => write!(f, "Instance({})", self.class),
        }
    }
}

/// What a callback points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackRef {
    NamedFunction(String),
    BoundMethod { instance: Instance, method: String },
    StaticMethod { class: String, method: String },
}

impl CallbackRef {
    pub fn function(name: impl Into<String>) -> Self {
        Self::NamedFunction(name.into())
    }

    pub fn method(instance: &Instance, method: impl Into<String>) -> Self {
        Self::BoundMethod {
            instance: instance.clone(),
            method: method.into(),
        }
    }

    pub fn static_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::StaticMethod {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Derive the registration id for this callback
    pub fn identify(&self) -> HookResult<RegistrationId> {
        match self {
            Self::NamedFunction(name) => {
                if name.trim().is_empty() {
                    return Err(HookError::invalid_callback("function name is empty"));
                }
                Ok(RegistrationId(name.clone()))
            }
            Self::BoundMethod { instance, method } => {
                if method.is_empty() {
                    return Err(HookError::invalid_callback(format!(
                        "bound method on '{}' has no method name",
                        instance.class()
                    )));
                }
                Ok(RegistrationId(format!(
                    "{}#{}->{}",
                    instance.class(),
                    instance.id(),
                    method
                )))
            }
            Self::StaticMethod { class, method } => {
                if class.is_empty() {
                    return Err(HookError::invalid_callback(format!(
                        "static method '{}' has no class name",
                        method
                    )));
                }
                if method.is_empty() {
                    return Err(HookError::invalid_callback(format!(
                        "static method on '{}' has no method name",
                        class
                    )));
                }
                Ok(RegistrationId(format!("{}::{}", class, method)))
            }
        }
    }
}

impl fmt::Display for CallbackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedFunction(name) => write!(f, "{}", name),
            Self::BoundMethod { instance, method } => write!(f, "{}->{}", instance.class(), method),
            Self::StaticMethod { class, method } => write!(f, "{}::{}", class, method),
        }
    }
}

impl AsRef<CallbackRef> for CallbackRef {
    fn as_ref(&self) -> &CallbackRef {
        self
    }
}

/// Key of a registration inside one priority bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(String);

impl RegistrationId {
    /// Use an explicit id instead of deriving one from a callback
    pub fn forced(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A callback target paired with the handler that runs for it.
///
/// A callback without a handler is detached: it keeps its registration slot
/// but dispatch skips it.
#[derive(Clone)]
pub struct Callback {
    target: CallbackRef,
    handler: Option<Arc<dyn HookHandler>>,
}

impl Callback {
    pub fn new<H: HookHandler + 'static>(target: CallbackRef, handler: H) -> Self {
        Self {
            target,
            handler: Some(Arc::new(handler)),
        }
    }

    pub fn from_arc(target: CallbackRef, handler: Arc<dyn HookHandler>) -> Self {
        Self {
            target,
            handler: Some(handler),
        }
    }

    /// A named function callback
    pub fn function<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&HookBroker, &[Value]) -> HookResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let handler = FnHandler::new(name.clone(), func);
        Self::new(CallbackRef::NamedFunction(name), handler)
    }

    /// A method bound to `instance`
    pub fn method<F>(instance: &Instance, method: impl Into<String>, func: F) -> Self
    where
        F: Fn(&HookBroker, &[Value]) -> HookResult<Value> + Send + Sync + 'static,
    {
        let target = CallbackRef::method(instance, method);
        let handler = FnHandler::new(target.to_string(), func);
        Self::new(target, handler)
    }

    /// A static method of `class`
    pub fn static_method<F>(class: impl Into<String>, method: impl Into<String>, func: F) -> Self
    where
        F: Fn(&HookBroker, &[Value]) -> HookResult<Value> + Send + Sync + 'static,
    {
        let target = CallbackRef::static_method(class, method);
        let handler = FnHandler::new(target.to_string(), func);
        Self::new(target, handler)
    }

    /// An anonymous callback. Keep a clone of the returned value to remove it.
    pub fn closure<F>(func: F) -> Self
    where
        F: Fn(&HookBroker, &[Value]) -> HookResult<Value> + Send + Sync + 'static,
    {
        let instance = Instance::new("Closure");
        Self::new(
            CallbackRef::method(&instance, "__invoke"),
            FnHandler::new("{closure}", func),
        )
    }

    /// A callback with identity but nothing to invoke
    pub fn detached(target: CallbackRef) -> Self {
        Self {
            target,
            handler: None,
        }
    }

    pub fn target(&self) -> &CallbackRef {
        &self.target
    }

    pub fn handler(&self) -> Option<&Arc<dyn HookHandler>> {
        self.handler.as_ref()
    }

    pub fn is_detached(&self) -> bool {
        self.handler.is_none()
    }

    pub fn id(&self) -> HookResult<RegistrationId> {
        self.target.identify()
    }

    /// Name used in logs and listings
    pub fn name(&self) -> String {
        match &self.handler {
            Some(handler) => handler.name().to_string(),
            None => self.target.to_string(),
        }
    }
}

impl AsRef<CallbackRef> for Callback {
    fn as_ref(&self) -> &CallbackRef {
        &self.target
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("target", &self.target)
            .field("detached", &self.is_detached())
            .finish()
    }
}
