//! The module-registry side: finding exports in a webpack-style module cache,
//! waiting for ones that have not loaded yet, and the diagnostics around both.
//!
//! ## Layout
//!
//! - **[`registry`]** - the module cache being searched (modelled, not owned)
//! - **[`filters`]** - predicates over a module's exports
//! - **[`scanner`]** - one-shot searches over a registry snapshot
//! - **[`subscriptions`]** - filters waiting for a future module
//! - **[`context`]** - [`WebpackContext`](context::WebpackContext), the entry point
//!   tying the above to lazy proxies
//! - **[`history`]** - the record of every lazy lookup requested, and its replay
//! - **[`query`]** - textual lookups (`findByProps("a", "b")`) compiled to scans
//! - **[`config`]** and **[`snapshot`]** - loading settings and registry dumps

pub mod config;
pub mod context;
pub mod error;
pub mod filters;
pub mod history;
pub mod query;
pub mod registry;
pub mod scanner;
pub mod snapshot;
pub mod subscriptions;
