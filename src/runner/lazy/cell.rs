use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use tracing::debug;

use crate::runner::ds::error::LazyError;

type Dependent<T> = Box<dyn FnOnce(&T)>;

struct CellState<T> {
    value: Option<T>,
    dependents: Vec<Dependent<T>>,
}

/// A single-assignment slot.
///
/// The first [`resolve`](DeferredCell::resolve) wins; later ones are ignored and
/// report `false`. Cells created through [`on_resolve`](DeferredCell::on_resolve)
/// are resolved with a projection of this cell's value as soon as it has one.
pub struct DeferredCell<T> {
    state: Rc<RefCell<CellState<T>>>,
}
impl<T> Clone for DeferredCell<T> {
    fn clone(&self) -> Self {
        DeferredCell {
            state: self.state.clone(),
        }
    }
}
impl<T: Clone + 'static> DeferredCell<T> {
    pub fn new() -> Self {
        DeferredCell {
            state: Rc::new(RefCell::new(CellState {
                value: None,
                dependents: Vec::new(),
            })),
        }
    }

    pub fn resolved(value: T) -> Self {
        let cell = DeferredCell::new();
        cell.resolve(value);
        cell
    }

    pub fn is_resolved(&self) -> bool {
        self.state.borrow().value.is_some()
    }

    pub fn get(&self) -> Result<T, LazyError> {
        self.state
            .borrow()
            .value
            .clone()
            .ok_or(LazyError::NotYetResolved)
    }

    pub fn try_get(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    /// Stores `value` unless the cell already holds one, then pushes it into every
    /// dependent. Returns whether this call did the resolving.
    pub fn resolve(&self, value: T) -> bool {
        let dependents = {
            let mut state = self.state.borrow_mut();
            if state.value.is_some() {
                debug!(target: "lazy", "ignoring second resolution of a deferred cell");
                return false;
            }
            state.value = Some(value.clone());
            mem::take(&mut state.dependents)
        };
        for dependent in dependents {
            dependent(&value);
        }
        true
    }

    /// Creates a cell that resolves to `projection(value)` once this one resolves.
    /// If this cell is already resolved the child is resolved immediately.
    pub fn on_resolve<U, F>(&self, projection: F) -> DeferredCell<U>
    where
        U: Clone + 'static,
        F: FnOnce(&T) -> U + 'static,
    {
        let child = DeferredCell::new();
        let current = self.try_get();
        match current {
            Some(value) => {
                child.resolve(projection(&value));
            }
            None => {
                let target = child.clone();
                self.state
                    .borrow_mut()
                    .dependents
                    .push(Box::new(move |value: &T| {
                        target.resolve(projection(value));
                    }));
            }
        }
        child
    }

    pub fn dependent_count(&self) -> usize {
        self.state.borrow().dependents.len()
    }
}
impl<T: Clone + 'static> Default for DeferredCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
