//! Eager searches over a registry snapshot.
//!
//! Each module is tested on its exports first, then on `exports.default` when that
//! is truthy. Nothing descends further than that one level. Modules are visited in
//! registry order and the first match wins.
//!
//! None of these functions log or fail on "nothing found"; that policy belongs to
//! [`WebpackContext`](super::context::WebpackContext).

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;

use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::get_v;
use crate::runner::ds::operations::type_conversion::to_boolean;
use crate::runner::ds::value::JsValue;
use crate::runner::webpack::filters::Filter;
use crate::runner::webpack::registry::{ModuleId, ModuleRegistry};

/// The conventional default export, when it is worth testing.
pub fn default_export(exports: &JsValue) -> Option<JsValue> {
    if !exports.is_object() {
        return None;
    }
    match get_v(exports, &PropertyKey::from("default")) {
        Ok(v) if to_boolean(&v) => Some(v),
        _ => None,
    }
}

/// Tests `filter` against `exports`, then against its default export.
pub fn match_exports(filter: &Filter, exports: &JsValue) -> Option<JsValue> {
    if filter.matches(exports) {
        return Some(exports.clone());
    }
    match default_export(exports) {
        Some(d) if filter.matches(&d) => Some(d),
        _ => None,
    }
}

fn candidates(registry: &ModuleRegistry) -> impl Iterator<Item = JsValue> {
    registry
        .snapshot()
        .into_iter()
        .map(|record| record.exports)
        .filter(to_boolean)
}

pub fn find_first_match(registry: &ModuleRegistry, filter: &Filter) -> Option<JsValue> {
    candidates(registry).find_map(|exports| match_exports(filter, &exports))
}

/// Every match, direct and default-export alike. A module can contribute both.
pub fn find_all_matches(registry: &ModuleRegistry, filter: &Filter) -> Vec<JsValue> {
    let mut matches = vec![];
    for exports in candidates(registry) {
        if filter.matches(&exports) {
            matches.push(exports.clone());
        }
        if let Some(d) = default_export(&exports) {
            if filter.matches(&d) {
                matches.push(d);
            }
        }
    }
    matches
}

/// Outcome of a bulk search. `results[i]` belongs to the `i`-th filter.
#[derive(Clone, Debug, PartialEq)]
pub struct BulkMatches {
    pub results: Vec<Option<JsValue>>,
    pub found: usize,
    pub total: usize,
}
impl BulkMatches {
    pub fn is_complete(&self) -> bool {
        self.found == self.total
    }
}

/// Satisfies all filters in a single pass over the registry.
///
/// For each module the filters still unsatisfied are tried in array order; the
/// first that matches claims the module and no other filter sees it. There is no
/// second pass.
pub fn find_bulk(registry: &ModuleRegistry, filters: &[Filter]) -> BulkMatches {
    let total = filters.len();
    let mut results: Vec<Option<JsValue>> = vec![None; total];
    let mut found = 0;

    'modules: for exports in candidates(registry) {
        for (j, filter) in filters.iter().enumerate() {
            if results[j].is_some() {
                continue;
            }
            if let Some(m) = match_exports(filter, &exports) {
                results[j] = Some(m);
                found += 1;
                if found == total {
                    break 'modules;
                }
                break;
            }
        }
    }

    BulkMatches {
        results,
        found,
        total,
    }
}

/// Id of the first factory whose source contains every one of `code`.
pub fn find_module_id<S: AsRef<str>>(registry: &ModuleRegistry, code: &[S]) -> Option<ModuleId> {
    registry
        .factories_snapshot()
        .into_iter()
        .find(|(_, factory)| code.iter().all(|c| factory.source().contains(c.as_ref())))
        .map(|(id, _)| id)
}

#[derive(Clone, Debug)]
pub enum SearchTerm {
    Text(String),
    Pattern(Regex),
}
impl SearchTerm {
    pub fn is_match(&self, source: &str) -> bool {
        match self {
            SearchTerm::Text(t) => source.contains(t.as_str()),
            SearchTerm::Pattern(r) => r.is_match(source),
        }
    }
}
impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchTerm::Text(t) => write!(f, "{:?}", t),
            SearchTerm::Pattern(r) => write!(f, "/{}/", r.as_str()),
        }
    }
}
impl From<&str> for SearchTerm {
    fn from(s: &str) -> Self {
        SearchTerm::Text(s.to_string())
    }
}
impl From<Regex> for SearchTerm {
    fn from(r: Regex) -> Self {
        SearchTerm::Pattern(r)
    }
}

/// Factories whose source satisfies every term, as `id -> source`.
pub fn search(registry: &ModuleRegistry, terms: &[SearchTerm]) -> IndexMap<ModuleId, String> {
    registry
        .factories_snapshot()
        .into_iter()
        .filter(|(_, factory)| terms.iter().all(|t| t.is_match(factory.source())))
        .map(|(id, factory)| (id, factory.source().to_string()))
        .collect()
}

/// A factory's source wrapped for reading on its own, or `None` for an unknown id.
pub fn extract(registry: &ModuleRegistry, id: &ModuleId) -> Option<String> {
    let factory = registry.factory(id)?;
    Some(format!(
        "// [EXTRACTED] WebpackModule{id}\n\
         // WARNING: This module was extracted to be more easily readable.\n\
         //          It is not the code that runs; breakpoints here have no effect.\n\
         \n\
         0,{source}\n\
         //# sourceURL=ExtractedWebpackModule{id}\n",
        id = id,
        source = factory.source()
    ))
}
