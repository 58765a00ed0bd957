//! Hook handler implementations
//!
//! Built-in handlers that can be registered from configuration.

pub mod builtin;

pub use self::builtin::*;

use crate::hooks::{Callback, CallbackRef, HandlerConfig, HandlerType, HookResult};

/// Build the callback described by a configured handler.
///
/// The handler name doubles as the callback's function name, so it can be
/// removed with `CallbackRef::function(name)`.
pub fn build_callback(config: &HandlerConfig) -> HookResult<Callback> {
    let target = CallbackRef::function(config.name.clone());
    let callback = match config.handler_type {
        HandlerType::Logging => {
            Callback::new(target, LoggingHandler::new(&config.name, &config.options))
        }
        HandlerType::Transform => Callback::new(
            target,
            TransformHandler::from_options(&config.name, &config.options)?,
        ),
    };
    Ok(callback)
}
