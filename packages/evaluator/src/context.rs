//! # Context
//!
//! Mutable variable store for one running screen/session.
//!
//! A `Context` is a cheap handle: clones and contexts derived with
//! [`Context::child_for_index`] all point at the *same* storage. A derived
//! context only differs in its `current_index`. It is NOT a snapshot, so a
//! write made while rendering one row of a list is visible to the parent and
//! to every other row.
//!
//! Every effective mutation is announced to observers with a [`WillChange`]
//! before the storage is touched, so observers can still read the previous
//! state through the context.
//!
//! Contexts are single-threaded (`Rc`/`RefCell`); all evaluation and command
//! execution happens on one mutation thread.

use crate::evaluator::Evaluator;
use std::cell::RefCell;
use std::rc::Rc;
use tessera_common::{Node, NodeMap};
use tracing::{debug, instrument, trace, warn};

/// Notification emitted immediately before a variable changes
#[derive(Debug)]
pub struct WillChange<'a> {
    pub name: &'a str,
    /// Value before the change, `None` if the variable is unset
    pub old: Option<&'a Node>,
    /// Value after the change, `None` if the variable is being removed
    pub new: Option<&'a Node>,
}

/// Handle returned by [`Context::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Rc<dyn Fn(&WillChange<'_>)>;

/// Outcome of a batch re-resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveReport {
    /// Passes performed over the storage
    pub iterations: usize,
    /// False when the iteration cap was hit while values were still changing
    pub converged: bool,
}

#[derive(Default)]
struct Storage {
    variables: NodeMap,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
    revision: u64,
}

#[derive(Clone, Default)]
pub struct Context {
    storage: Rc<RefCell<Storage>>,
    current_index: Option<usize>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Context")
            .field("variables", &storage.variables)
            .field("revision", &storage.revision)
            .field("current_index", &self.current_index)
            .finish()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with variables, without notifications
    pub fn with_variables(variables: NodeMap) -> Self {
        let context = Self::new();
        context.storage.borrow_mut().variables = variables;
        context
    }

    /// Direct lookup, no path parsing. `None` means the variable is unset,
    /// which is different from a stored `Node::Null`.
    pub fn get(&self, name: &str) -> Option<Node> {
        self.storage.borrow().variables.get(name).cloned()
    }

    /// Borrow a stored value without cloning it.
    ///
    /// The closure must not mutate this context.
    pub fn with_value<R>(&self, name: &str, f: impl FnOnce(Option<&Node>) -> R) -> R {
        let storage = self.storage.borrow();
        f(storage.variables.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.storage.borrow().variables.contains_key(name)
    }

    /// Store a value.
    ///
    /// Skipped entirely, notifications included, when the stored value is
    /// shallow-equal to `value` (see [`Node::shallow_eq`]).
    pub fn set(&self, name: impl Into<String>, value: Node) {
        let name = name.into();
        {
            let storage = self.storage.borrow();
            if let Some(current) = storage.variables.get(&name) {
                if current.shallow_eq(&value) {
                    trace!(variable = %name, "Value unchanged, skipping set");
                    return;
                }
            }
        }

        self.notify(&name, Some(&value));

        let mut storage = self.storage.borrow_mut();
        storage.variables.insert(name, value);
        storage.revision += 1;
    }

    /// Remove a variable. Removing an unset variable does nothing.
    pub fn remove(&self, name: &str) -> Option<Node> {
        if !self.contains(name) {
            return None;
        }

        self.notify(name, None);

        let mut storage = self.storage.borrow_mut();
        storage.revision += 1;
        storage.variables.shift_remove(name)
    }

    fn notify(&self, name: &str, new: Option<&Node>) {
        let observers: Vec<Observer> = self
            .storage
            .borrow()
            .observers
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        if observers.is_empty() {
            return;
        }

        let old = self.get(name);
        let event = WillChange {
            name,
            old: old.as_ref(),
            new,
        };
        for observer in observers {
            observer(&event);
        }
    }

    /// Register a will-change observer shared by every derived context
    pub fn observe(&self, observer: impl Fn(&WillChange<'_>) + 'static) -> ObserverId {
        let mut storage = self.storage.borrow_mut();
        let id = ObserverId(storage.next_observer);
        storage.next_observer += 1;
        storage.observers.push((id, Rc::new(observer)));
        id
    }

    pub fn unobserve(&self, id: ObserverId) {
        self.storage
            .borrow_mut()
            .observers
            .retain(|(observer_id, _)| *observer_id != id);
    }

    /// Number of effective mutations so far
    pub fn revision(&self) -> u64 {
        self.storage.borrow().revision
    }

    /// Copy of all variables, in insertion order
    pub fn snapshot(&self) -> NodeMap {
        self.storage.borrow().variables.clone()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.storage.borrow().variables.keys().cloned().collect()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Context for one row of a repeated list.
    ///
    /// Shares storage with `self`; only the loop index differs.
    pub fn child_for_index(&self, index: usize) -> Context {
        Context {
            storage: Rc::clone(&self.storage),
            current_index: Some(index),
        }
    }

    /// True when both handles point at the same storage
    pub fn shares_storage_with(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }

    /// Re-evaluate every stored value that is itself an expression and write
    /// back results that differ, until nothing changes or `cap` passes ran.
    #[instrument(skip(self, evaluator))]
    pub fn resolve_expressions(&self, evaluator: &Evaluator, cap: usize) -> ResolveReport {
        for iteration in 1..=cap {
            let mut changed = false;

            for name in self.variable_names() {
                let Some(value) = self.get(&name) else {
                    continue;
                };
                if !evaluator.is_expression(&value) {
                    continue;
                }

                let resolved = evaluator.evaluate(&value, self);
                if resolved != value {
                    debug!(variable = %name, iteration, "Resolved expression variable");
                    self.set(name, resolved);
                    changed = true;
                }
            }

            if !changed {
                return ResolveReport {
                    iterations: iteration,
                    converged: true,
                };
            }
        }

        warn!(cap, "Expression resolution did not converge");
        ResolveReport {
            iterations: cap,
            converged: false,
        }
    }
}
