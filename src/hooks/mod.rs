//! HQ hook system
//!
//! A priority-ordered registry of filters and actions. Filters thread a value
//! through their callbacks and return it; actions only notify. Dispatch is
//! re-entrant: callbacks may register, remove and fire hooks while a hook is
//! running.

pub mod broker;
pub mod callback;
pub mod config;
pub mod cursor;
pub mod errors;
pub mod handler;
pub mod handlers;
pub mod plugin;
pub mod stack;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use self::broker::{HookBroker, RegistrationInfo};
pub use self::callback::{Callback, CallbackRef, Instance, RegistrationId};
pub use self::config::{HandlerConfig, HandlerType, HooksConfig, PluginConfig, SystemConfig};
pub use self::cursor::DispatchCursor;
pub use self::errors::{HookError, HookResult};
pub use self::handler::{FnHandler, HookHandler};
pub use self::handlers::{build_callback, LoggingHandler, Transform, TransformHandler};
pub use self::plugin::{
    normalize_path, plugin_dir_path, register_activation_hook, register_deactivation_hook,
    register_uninstall_hook, PluginPaths,
};
pub use self::stack::CallStack;
pub use self::table::{HookTable, Registration};
pub use self::types::{tags, DispatchKind, HookPriority, ALL_TAG, DEFAULT_ACCEPTED_ARGS};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Callback, CallbackRef, HookBroker, HookError, HookHandler, HookPriority, HookResult,
        Instance, ALL_TAG, DEFAULT_ACCEPTED_ARGS,
    };
}
