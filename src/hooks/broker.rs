//! Central hook broker
//!
//! One broker holds every registration for a process or request. It is
//! single-threaded: state lives in `RefCell`s and no borrow is held while a
//! callback runs, so callbacks may freely re-enter the broker. Give each
//! thread its own broker if more than one thread needs hooks.

use crate::hooks::cursor::DispatchCursor;
use crate::hooks::handlers::build_callback;
use crate::hooks::stack::StackFrame;
use crate::hooks::{
    Callback, CallbackRef, CallStack, DispatchKind, HookHandler, HookPriority, HookResult,
    HooksConfig, HookTable, Registration, RegistrationId, ALL_TAG,
};
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{debug, error, info, trace};

/// A registration as reported by [`HookBroker::registrations`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationInfo {
    pub tag: String,
    pub priority: HookPriority,
    pub id: RegistrationId,
    pub callback: String,
    pub accepted_args: usize,
    pub detached: bool,
}

/// Registry and dispatcher for filters and actions
#[derive(Default)]
pub struct HookBroker {
    table: RefCell<HookTable>,
    stack: RefCell<CallStack>,
    fired: RefCell<HashMap<String, u64>>,
}

impl HookBroker {
    /// Create an empty broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a broker with the built-in callbacks declared in `config`
    pub fn from_config(config: &HooksConfig) -> HookResult<Self> {
        config.validate()?;
        let broker = Self::new();

        if !config.system.enabled {
            info!("Configured hook handlers are disabled");
            return Ok(broker);
        }

        let mut registered = 0usize;
        for handler in config.handlers.iter().filter(|h| h.enabled) {
            let callback = build_callback(handler)?;
            for tag in &handler.tags {
                broker.add_filter(tag, callback.clone(), handler.priority, handler.accepted_args)?;
                registered += 1;
            }
        }

        info!(registrations = registered, "Hook broker configured");
        Ok(broker)
    }

    /// Register `callback` on `tag`.
    ///
    /// Registering the same callback again at the same tag and priority
    /// replaces the stored registration in place.
    pub fn add_filter(
        &self,
        tag: &str,
        callback: Callback,
        priority: HookPriority,
        accepted_args: usize,
    ) -> HookResult<()> {
        let id = callback.id()?;
        let name = callback.name();
        let result = self.table.borrow_mut().insert(
            tag,
            priority,
            id.clone(),
            Registration::new(callback, accepted_args),
        );

        match &result {
            Ok(()) => debug!(
                tag,
                priority = priority.0,
                id = %id,
                callback = %name,
                accepted_args,
                "Registered hook callback"
            ),
            Err(e) => error!(tag, priority = priority.0, id = %id, error = %e, "Hook registration rejected"),
        }
        result
    }

    /// Remove `callback` from `tag` at `priority`. Returns whether anything was removed.
    pub fn remove_filter<C>(&self, tag: &str, callback: &C, priority: HookPriority) -> bool
    where
        C: AsRef<CallbackRef> + ?Sized,
    {
        let Ok(id) = callback.as_ref().identify() else {
            return false;
        };
        let removed = self.table.borrow_mut().remove(tag, priority, &id);
        if removed {
            debug!(tag, priority = priority.0, id = %id, "Removed hook callback");
        }
        removed
    }

    /// Remove every callback of `tag`, or only those at `priority`
    pub fn remove_all_filters(&self, tag: &str, priority: Option<HookPriority>) {
        self.table.borrow_mut().clear(tag, priority);
        debug!(tag, priority = ?priority.map(|p| p.0), "Cleared hook callbacks");
    }

    /// Whether `tag` has any callback
    pub fn has_filter(&self, tag: &str) -> bool {
        self.table.borrow().has_any(tag)
    }

    /// Priority at which `callback` is registered on `tag`
    pub fn has_filter_callback<C>(&self, tag: &str, callback: &C) -> Option<HookPriority>
    where
        C: AsRef<CallbackRef> + ?Sized,
    {
        let id = callback.as_ref().identify().ok()?;
        self.table.borrow().priority_of(tag, &id)
    }

    /// Pass `value` through every callback of `tag` and return the result.
    ///
    /// Each callback receives the current value followed by `extra`, cut to
    /// its accepted-args count.
    pub fn apply_filters(&self, tag: &str, value: Value, extra: &[Value]) -> HookResult<Value> {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(value);
        args.extend_from_slice(extra);
        self.dispatch(DispatchKind::Filter, tag, args)
    }

    /// Like [`apply_filters`](Self::apply_filters) with the value as `args[0]`
    pub fn apply_filters_ref_array(&self, tag: &str, mut args: Vec<Value>) -> HookResult<Value> {
        if args.is_empty() {
            args.push(Value::Null);
        }
        self.dispatch(DispatchKind::Filter, tag, args)
    }

    /// Run every callback of `tag` with `args`, discarding return values
    pub fn do_action(&self, tag: &str, args: &[Value]) -> HookResult<()> {
        self.dispatch(DispatchKind::Action, tag, args.to_vec())
            .map(|_| ())
    }

    /// Number of times `tag` has been fired as an action
    pub fn did_action(&self, tag: &str) -> u64 {
        self.fired.borrow().get(tag).copied().unwrap_or(0)
    }

    /// Innermost tag being dispatched
    pub fn current_filter(&self) -> Option<String> {
        self.stack.borrow().current().map(str::to_string)
    }

    /// Whether `tag` is being dispatched, or any tag when `None`
    pub fn doing_filter(&self, tag: Option<&str>) -> bool {
        let stack = self.stack.borrow();
        match tag {
            Some(tag) => stack.contains(tag),
            None => !stack.is_empty(),
        }
    }

    pub fn add_action(
        &self,
        tag: &str,
        callback: Callback,
        priority: HookPriority,
        accepted_args: usize,
    ) -> HookResult<()> {
        self.add_filter(tag, callback, priority, accepted_args)
    }

    pub fn remove_action<C>(&self, tag: &str, callback: &C, priority: HookPriority) -> bool
    where
        C: AsRef<CallbackRef> + ?Sized,
    {
        self.remove_filter(tag, callback, priority)
    }

    pub fn remove_all_actions(&self, tag: &str, priority: Option<HookPriority>) {
        self.remove_all_filters(tag, priority)
    }

    pub fn has_action(&self, tag: &str) -> bool {
        self.has_filter(tag)
    }

    pub fn has_action_callback<C>(&self, tag: &str, callback: &C) -> Option<HookPriority>
    where
        C: AsRef<CallbackRef> + ?Sized,
    {
        self.has_filter_callback(tag, callback)
    }

    pub fn current_action(&self) -> Option<String> {
        self.current_filter()
    }

    pub fn doing_action(&self, tag: Option<&str>) -> bool {
        self.doing_filter(tag)
    }

    /// Tags that have been registered against
    pub fn tags(&self) -> Vec<String> {
        self.table.borrow().tags()
    }

    /// Registrations of `tag` in dispatch order
    pub fn registrations(&self, tag: &str) -> Vec<RegistrationInfo> {
        self.table
            .borrow_mut()
            .entries(tag)
            .into_iter()
            .map(|(priority, id, registration)| RegistrationInfo {
                tag: tag.to_string(),
                priority,
                id,
                callback: registration.callback.name(),
                accepted_args: registration.accepted_args,
                detached: registration.callback.is_detached(),
            })
            .collect()
    }

    fn dispatch(&self, kind: DispatchKind, tag: &str, mut args: Vec<Value>) -> HookResult<Value> {
        if kind == DispatchKind::Action {
            *self.fired.borrow_mut().entry(tag.to_string()).or_insert(0) += 1;
        }

        let (has_all, has_tag) = {
            let table = self.table.borrow();
            (table.has_any(ALL_TAG), table.has_any(tag))
        };
        if !has_all && !has_tag {
            trace!(tag, %kind, "No callbacks registered");
            return Ok(Self::outcome(kind, args));
        }

        let _frame = StackFrame::enter(&self.stack, tag);
        trace!(tag, %kind, depth = self.stack.borrow().depth(), "Dispatching hook");

        if has_all {
            self.walk(ALL_TAG, |handler, _| handler.call(self, &args).map(|_| ()))?;
        }

        self.walk(tag, |handler, accepted_args| {
            let take = accepted_args.min(args.len());
            let returned = handler.call(self, &args[..take])?;
            if kind == DispatchKind::Filter {
                if let Some(value) = args.first_mut() {
                    *value = returned;
                }
            }
            Ok(())
        })?;

        Ok(Self::outcome(kind, args))
    }

    /// Visit each live, attached callback of `tag` in dispatch order.
    ///
    /// The table is only borrowed while the cursor steps, never across `visit`.
    fn walk<F>(&self, tag: &str, mut visit: F) -> HookResult<()>
    where
        F: FnMut(&dyn HookHandler, usize) -> HookResult<()>,
    {
        let mut cursor = DispatchCursor::open(tag, &self.table.borrow());
        loop {
            let next = cursor.next(&mut self.table.borrow_mut());
            let Some(registration) = next else {
                return Ok(());
            };

            match registration.callback.handler() {
                Some(handler) => visit(handler.as_ref(), registration.accepted_args)?,
                None => trace!(
                    tag,
                    callback = %registration.callback.target(),
                    "Skipping detached callback"
                ),
            }
        }
    }

    fn outcome(kind: DispatchKind, args: Vec<Value>) -> Value {
        match kind {
            DispatchKind::Filter => args.into_iter().next().unwrap_or(Value::Null),
            DispatchKind::Action => Value::Null,
        }
    }
}
