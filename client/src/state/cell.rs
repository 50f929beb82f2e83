//! Explicit, observable state container.
//!
//! DESIGN
//! ======
//! A `StateCell` owns one state value. Every mutation goes through
//! [`StateCell::update`]; observers are notified once per committed update,
//! after the mutation finished, with a snapshot of the new value. Rendering
//! code mirrors the snapshot into a Leptos signal and never mutates the cell
//! itself.
//!
//! Cells are single-threaded (`Rc`), matching the browser event loop.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscription::Subscription;

#[cfg(test)]
#[path = "cell_test.rs"]
mod cell_test;

type Observer<T> = Rc<dyn Fn(&T)>;

struct Inner<T> {
    value: T,
    observers: Vec<(u64, Observer<T>)>,
    next_id: u64,
}

/// Shared handle to one piece of component state.
pub struct StateCell<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: Clone + 'static> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Rc::new(RefCell::new(Inner { value, observers: Vec::new(), next_id: 0 })) }
    }

    /// Snapshot of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Mutate the value, then notify every observer with the committed state.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let (result, snapshot, observers) = {
            let mut inner = self.inner.borrow_mut();
            let result = f(&mut inner.value);
            let observers: Vec<Observer<T>> = inner.observers.iter().map(|(_, o)| Rc::clone(o)).collect();
            (result, inner.value.clone(), observers)
        };
        for observer in observers {
            observer(&snapshot);
        }
        result
    }

    /// Register an observer. It stays registered while the handle lives.
    pub fn observe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, Rc::new(observer)));
            id
        };

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().observers.retain(|(oid, _)| *oid != id);
            }
        })
    }

    #[cfg(test)]
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }
}
