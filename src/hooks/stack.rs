//! Stack of tags currently being dispatched

use std::cell::RefCell;

/// Tags of the dispatches in progress, innermost last
#[derive(Debug, Default, Clone)]
pub struct CallStack {
    frames: Vec<String>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: &str) {
        self.frames.push(tag.to_string());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop()
    }

    /// Innermost tag
    pub fn current(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    /// Whether `tag` is anywhere on the stack
    pub fn contains(&self, tag: &str) -> bool {
        self.frames.iter().any(|frame| frame == tag)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Tags from outermost to innermost
    pub fn frames(&self) -> &[String] {
        &self.frames
    }
}

/// Pushes a tag on creation and pops it when dropped, unwinding included
pub(crate) struct StackFrame<'a> {
    stack: &'a RefCell<CallStack>,
}

impl<'a> StackFrame<'a> {
    pub(crate) fn enter(stack: &'a RefCell<CallStack>, tag: &str) -> Self {
        stack.borrow_mut().push(tag);
        Self { stack }
    }
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}
