//! The lazy-lookup search history.
//!
//! Each lazy or waiting lookup is recorded as it is requested, so tooling can
//! later replay the lot against a fully loaded registry and list the ones that
//! would never resolve.

use std::fmt;

use crate::runner::webpack::filters::{quote_all, Filter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupMethod {
    Find,
    FindByProps,
    FindByCode,
    FindStore,
    WaitFor,
    WaitForProps,
    WaitForCode,
    WaitForStore,
    ProxyLazyWebpack,
}
impl LookupMethod {
    pub fn name(&self) -> &'static str {
        match self {
            LookupMethod::Find => "find",
            LookupMethod::FindByProps => "findByProps",
            LookupMethod::FindByCode => "findByCode",
            LookupMethod::FindStore => "findStore",
            LookupMethod::WaitFor => "waitFor",
            LookupMethod::WaitForProps => "waitForProps",
            LookupMethod::WaitForCode => "waitForCode",
            LookupMethod::WaitForStore => "waitForStore",
            LookupMethod::ProxyLazyWebpack => "proxyLazyWebpack",
        }
    }
}
impl fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug)]
pub enum SearchArgs {
    /// Props, code fragments or a store name.
    Text(Vec<String>),
    Filter(Filter),
    /// An opaque factory, described by whatever the caller said about it.
    Factory(String),
}

#[derive(Clone, Debug)]
pub struct SearchRecord {
    pub method: LookupMethod,
    pub args: SearchArgs,
}
impl SearchRecord {
    pub fn new(method: LookupMethod, args: SearchArgs) -> Self {
        SearchRecord { method, args }
    }

    /// Whether the record can be re-run eagerly. Factories cannot.
    pub fn is_replayable(&self) -> bool {
        !matches!(self.args, SearchArgs::Factory(_))
    }
}
/// Renders as query text, e.g. `findByProps("a", "b")` or `waitFor(byCode("x"))`.
impl fmt::Display for SearchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.args {
            SearchArgs::Text(args) => write!(f, "{}({})", self.method, quote_all(args)),
            SearchArgs::Filter(filter) => write!(f, "{}({})", self.method, filter),
            SearchArgs::Factory(description) => write!(f, "{}(<{}>)", self.method, description),
        }
    }
}

/// Append-only, in memory.
#[derive(Clone, Debug, Default)]
pub struct SearchHistory {
    records: Vec<SearchRecord>,
}
impl SearchHistory {
    pub fn new() -> Self {
        SearchHistory::default()
    }

    pub fn push(&mut self, record: SearchRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[SearchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayOutcome {
    Found,
    Missing,
    Skipped,
}

#[derive(Clone, Debug)]
pub struct ReplayReport {
    pub record: SearchRecord,
    pub outcome: ReplayOutcome,
}
