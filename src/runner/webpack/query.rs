//! Textual lookups.
//!
//! A parsed [`QueryCall`] is compiled into a [`Query`] and run eagerly against a
//! registry. Running a query has no side effects: nothing is logged as missing and
//! nothing goes into the search history. The lazy and waiting method names are
//! accepted and run as their eager equivalents, which is what makes recorded
//! lookups replayable.

use std::fmt;

use indexmap::IndexMap;
use regex::RegexBuilder;

use crate::parser::ast::{QueryArg, QueryCall};
use crate::parser::FilterQueryParser;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::{get_v, own_property_keys};
use crate::runner::ds::operations::type_conversion::{get_type, TYPE_STR_FUNCTION};
use crate::runner::ds::value::JsValue;
use crate::runner::webpack::error::WebpackError;
use crate::runner::webpack::filters::Filter;
use crate::runner::webpack::history::{LookupMethod, SearchArgs, SearchRecord};
use crate::runner::webpack::registry::{ModuleId, ModuleRegistry};
use crate::runner::webpack::scanner::{self, BulkMatches, SearchTerm};

#[derive(Clone, Debug)]
pub enum Query {
    Find(Filter),
    FindAll(Filter),
    FindBulk(Vec<Filter>),
    FindModuleId(Vec<String>),
    Search(Vec<SearchTerm>),
    Extract(ModuleId),
}

#[derive(Clone, Debug)]
pub enum QueryResult {
    Module(Option<JsValue>),
    Modules(Vec<JsValue>),
    Bulk(BulkMatches),
    ModuleId(Option<ModuleId>),
    Sources(IndexMap<ModuleId, String>),
    Source(Option<String>),
}

impl Query {
    pub fn parse(text: &str) -> Result<Query, WebpackError> {
        let call = FilterQueryParser::parse_to_ast_from_str(text)
            .map_err(|e| WebpackError::InvalidQuery(e.to_string()))?;
        Query::compile(&call)
    }

    pub fn compile(call: &QueryCall) -> Result<Query, WebpackError> {
        match call.name.as_str() {
            "find" | "findLazy" | "waitFor" | "waitForLazy" => {
                Ok(Query::Find(single_filter(call)?))
            }
            "findAll" => Ok(Query::FindAll(single_filter(call)?)),
            "findBulk" => {
                let filters = call
                    .args
                    .iter()
                    .map(|a| filter_arg(call, a))
                    .collect::<Result<Vec<Filter>, WebpackError>>()?;
                Ok(Query::FindBulk(filters))
            }
            "findByProps" | "findByPropsLazy" | "waitForProps" | "waitForPropsLazy" => {
                Ok(Query::Find(Filter::by_props(&string_args(call)?)))
            }
            "findByCode" | "findByCodeLazy" | "waitForCode" | "waitForCodeLazy" => {
                Ok(Query::Find(Filter::by_code(&string_args(call)?)))
            }
            "findStore" | "findStoreLazy" | "waitForStore" | "waitForStoreLazy" => {
                Ok(Query::Find(Filter::by_store_name(single_string(call)?)))
            }
            "findModuleId" | "findModuleFactory" => Ok(Query::FindModuleId(string_args(call)?)),
            "search" => Ok(Query::Search(
                call.args
                    .iter()
                    .map(|a| search_term(call, a))
                    .collect::<Result<Vec<SearchTerm>, WebpackError>>()?,
            )),
            "extract" => match call.args.as_slice() {
                [QueryArg::Int(i)] if *i >= 0 => Ok(Query::Extract(ModuleId::Num(*i as u64))),
                [QueryArg::Str(s)] => Ok(Query::Extract(ModuleId::from(s.as_str()))),
                _ => Err(bad_args(call, "a module id")),
            },
            other => Err(WebpackError::InvalidQuery(format!(
                "unknown lookup method '{}'",
                other
            ))),
        }
    }

    /// The eager equivalent of a recorded lookup, if it has one.
    pub fn from_record(record: &SearchRecord) -> Option<Query> {
        match &record.args {
            SearchArgs::Filter(filter) => Some(Query::Find(filter.clone())),
            SearchArgs::Text(args) => match record.method {
                LookupMethod::FindByProps | LookupMethod::WaitForProps => {
                    Some(Query::Find(Filter::by_props(args)))
                }
                LookupMethod::FindByCode | LookupMethod::WaitForCode => {
                    Some(Query::Find(Filter::by_code(args)))
                }
                LookupMethod::FindStore | LookupMethod::WaitForStore => args
                    .first()
                    .map(|name| Query::Find(Filter::by_store_name(name.as_str()))),
                _ => None,
            },
            SearchArgs::Factory(_) => None,
        }
    }

    pub fn run(&self, registry: &ModuleRegistry) -> QueryResult {
        match self {
            Query::Find(filter) => QueryResult::Module(scanner::find_first_match(registry, filter)),
            Query::FindAll(filter) => {
                QueryResult::Modules(scanner::find_all_matches(registry, filter))
            }
            Query::FindBulk(filters) => QueryResult::Bulk(scanner::find_bulk(registry, filters)),
            Query::FindModuleId(code) => {
                QueryResult::ModuleId(scanner::find_module_id(registry, code))
            }
            Query::Search(terms) => QueryResult::Sources(scanner::search(registry, terms)),
            Query::Extract(id) => QueryResult::Source(scanner::extract(registry, id)),
        }
    }
}

fn bad_args(call: &QueryCall, expected: &str) -> WebpackError {
    WebpackError::InvalidQuery(format!("{} expects {}", call.name, expected))
}

fn string_args(call: &QueryCall) -> Result<Vec<String>, WebpackError> {
    if call.args.is_empty() {
        return Err(bad_args(call, "at least one string"));
    }
    call.args
        .iter()
        .map(|a| match a {
            QueryArg::Str(s) => Ok(s.clone()),
            _ => Err(bad_args(call, "string arguments")),
        })
        .collect()
}

fn single_string(call: &QueryCall) -> Result<String, WebpackError> {
    match call.args.as_slice() {
        [QueryArg::Str(s)] => Ok(s.clone()),
        _ => Err(bad_args(call, "exactly one string")),
    }
}

fn single_filter(call: &QueryCall) -> Result<Filter, WebpackError> {
    match call.args.as_slice() {
        [arg] => filter_arg(call, arg),
        _ => Err(bad_args(call, "exactly one filter")),
    }
}

fn filter_arg(call: &QueryCall, arg: &QueryArg) -> Result<Filter, WebpackError> {
    match arg {
        QueryArg::Call(inner) => match inner.name.as_str() {
            "byProps" => Ok(Filter::by_props(&string_args(inner)?)),
            "byCode" => Ok(Filter::by_code(&string_args(inner)?)),
            "byStoreName" => Ok(Filter::by_store_name(single_string(inner)?)),
            other => Err(WebpackError::InvalidQuery(format!(
                "unknown filter '{}'",
                other
            ))),
        },
        _ => Err(bad_args(call, "filter arguments (byProps, byCode, byStoreName)")),
    }
}

fn search_term(call: &QueryCall, arg: &QueryArg) -> Result<SearchTerm, WebpackError> {
    match arg {
        QueryArg::Str(s) => Ok(SearchTerm::Text(s.clone())),
        QueryArg::Pattern { source, flags } => RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map(SearchTerm::Pattern)
            .map_err(|e| WebpackError::InvalidQuery(e.to_string())),
        _ => Err(bad_args(call, "strings or /patterns/")),
    }
}

/// One-line rendering of a value, looking one level into objects.
pub fn describe(v: &JsValue) -> String {
    describe_at(v, 1)
}

fn describe_at(v: &JsValue, depth: usize) -> String {
    match v {
        JsValue::Object(_) if get_type(v) == TYPE_STR_FUNCTION => {
            match get_v(v, &PropertyKey::from("name")) {
                Ok(JsValue::String(name)) if !name.is_empty() => format!("[Function {}]", name),
                _ => "[Function]".to_string(),
            }
        }
        JsValue::Object(_) if depth == 0 => "{...}".to_string(),
        JsValue::Object(_) => match own_property_keys(v) {
            Ok(keys) => {
                let fields: Vec<String> = keys
                    .iter()
                    .map(|k| {
                        let value = get_v(v, k).unwrap_or(JsValue::Undefined);
                        format!("{}: {}", k, describe_at(&value, depth - 1))
                    })
                    .collect();
                if fields.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {} }}", fields.join(", "))
                }
            }
            Err(e) => format!("<{}>", e),
        },
        other => other.to_string(),
    }
}

impl QueryResult {
    /// Whether the lookup found what it was after. A partial bulk result counts as missing.
    pub fn is_found(&self) -> bool {
        match self {
            QueryResult::Module(m) => m.is_some(),
            QueryResult::Modules(ms) => !ms.is_empty(),
            QueryResult::Bulk(b) => b.is_complete(),
            QueryResult::ModuleId(id) => id.is_some(),
            QueryResult::Sources(s) => !s.is_empty(),
            QueryResult::Source(s) => s.is_some(),
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Module(None)
            | QueryResult::ModuleId(None)
            | QueryResult::Source(None) => write!(f, "null"),
            QueryResult::Module(Some(m)) => write!(f, "{}", describe(m)),
            QueryResult::Modules(ms) => {
                writeln!(f, "{} match(es)", ms.len())?;
                for m in ms {
                    writeln!(f, "  {}", describe(m))?;
                }
                Ok(())
            }
            QueryResult::Bulk(b) => {
                writeln!(f, "found {} of {}", b.found, b.total)?;
                for (i, r) in b.results.iter().enumerate() {
                    match r {
                        Some(m) => writeln!(f, "  [{}] {}", i, describe(m))?,
                        None => writeln!(f, "  [{}] undefined", i)?,
                    }
                }
                Ok(())
            }
            QueryResult::ModuleId(Some(id)) => write!(f, "{}", id),
            QueryResult::Sources(sources) => {
                writeln!(f, "{} module(s)", sources.len())?;
                for (id, source) in sources {
                    writeln!(f, "  {}: {}", id, source)?;
                }
                Ok(())
            }
            QueryResult::Source(Some(s)) => write!(f, "{}", s),
        }
    }
}
