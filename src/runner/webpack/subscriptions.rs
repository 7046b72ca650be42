use std::fmt;

use crate::runner::ds::value::JsValue;
use crate::runner::webpack::filters::Filter;

pub type ModCallback = Box<dyn FnOnce(JsValue)>;

/// Filters waiting for a module that has not loaded yet, in registration order.
///
/// Keyed by filter identity: registering the same filter again replaces its
/// callback in place, the old one never fires.
#[derive(Default)]
pub struct SubscriptionTable {
    entries: Vec<(Filter, ModCallback)>,
}
impl SubscriptionTable {
    pub fn new() -> Self {
        SubscriptionTable::default()
    }

    pub fn insert(&mut self, filter: Filter, callback: ModCallback) {
        match self.entries.iter_mut().find(|(f, _)| f.same(&filter)) {
            Some(entry) => entry.1 = callback,
            None => self.entries.push((filter, callback)),
        }
    }

    pub fn remove(&mut self, filter: &Filter) -> Option<ModCallback> {
        let index = self.entries.iter().position(|(f, _)| f.same(filter))?;
        Some(self.entries.remove(index).1)
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.entries.iter().map(|(f, _)| f.clone()).collect()
    }

    pub fn contains(&self, filter: &Filter) -> bool {
        self.entries.iter().any(|(f, _)| f.same(filter))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl fmt::Debug for SubscriptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(filter, _)| filter))
            .finish()
    }
}
