//! # Navigation
//!
//! Stack of screen ids driven by the `navigate`, `pop` and `popToRoot`
//! commands. The root screen sits below the stack and is never popped.

use std::cell::RefCell;
use tracing::trace;

/// Navigation collaborator used by the interpreter
pub trait Navigator {
    /// Replace the root screen and clear the stack above it
    fn set_root(&self, screen_id: &str);

    /// Push a screen on top of the stack
    fn push(&self, screen_id: &str);

    /// Pop the top screen. Popping an empty stack does nothing.
    fn pop(&self) -> Option<String>;

    /// Pop every pushed screen, leaving the root
    fn pop_to_root(&self);

    fn current_root(&self) -> Option<String>;

    /// Pushed screen ids, bottom first, root excluded
    fn stack(&self) -> Vec<String>;

    /// Screen currently on top: the last pushed screen, else the root
    fn top(&self) -> Option<String> {
        self.stack().pop().or_else(|| self.current_root())
    }
}

/// In-memory [`Navigator`]
#[derive(Debug, Default)]
pub struct NavigationStack {
    root: RefCell<Option<String>>,
    stack: RefCell<Vec<String>>,
}

impl NavigationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(screen_id: impl Into<String>) -> Self {
        Self {
            root: RefCell::new(Some(screen_id.into())),
            stack: RefCell::default(),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

impl Navigator for NavigationStack {
    fn set_root(&self, screen_id: &str) {
        trace!(screen = screen_id, "Setting navigation root");
        *self.root.borrow_mut() = Some(screen_id.to_string());
        self.stack.borrow_mut().clear();
    }

    fn push(&self, screen_id: &str) {
        self.stack.borrow_mut().push(screen_id.to_string());
    }

    fn pop(&self) -> Option<String> {
        self.stack.borrow_mut().pop()
    }

    fn pop_to_root(&self) {
        self.stack.borrow_mut().clear();
    }

    fn current_root(&self) -> Option<String> {
        self.root.borrow().clone()
    }

    fn stack(&self) -> Vec<String> {
        self.stack.borrow().clone()
    }
}
