//! Filter and action hooks for HQ
//!
//! See [`hooks::HookBroker`] for the registry and dispatcher.

pub mod hooks;
pub mod platform_dirs;

pub use hooks::prelude;
