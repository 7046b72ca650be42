//! # lazy-webpack - lazy module lookups over a webpack module cache
//!
//! Code built on top of a bundled web application often needs one of its
//! modules before the bundle has loaded it. This crate lets such code ask for
//! "the module matching this filter" up front and get back a transparent
//! stand-in that behaves like the real module once it shows up:
//! - Filters over module exports (by props, by function source, by store name)
//! - Eager scans of the module cache, and subscriptions for modules not yet loaded
//! - Lazy proxies that forward every reflective operation to the eventual target
//! - Speculative destructuring right after a proxy is created
//! - Retry-bounded lazy factories
//! - A textual query language and a search history for diagnostics
//!
//! ## Quick Start
//!
//! ### Waiting for a module
//!
//! ```
//! use lazy_webpack::runner::webpack::context::WebpackContext;
//! use lazy_webpack::runner::webpack::registry::ModuleRegistry;
//! use lazy_webpack::runner::ds::object_property::PropertyKey;
//! use lazy_webpack::runner::ds::operations::object::{create_object, get_v};
//! use lazy_webpack::runner::ds::value::JsValue;
//!
//! let ctx = WebpackContext::default();
//! let registry = ModuleRegistry::shared();
//! ctx.init_webpack(registry.clone()).unwrap();
//!
//! let users = ctx.wait_for_props_proxy(&["getUser"]);
//!
//! // Later, the bundle loads the module...
//! registry.insert(42u64, create_object(vec![("getUser", JsValue::from("fn"))]));
//! // ...and the host loop moves on to its next task.
//! ctx.tasks().run_until_idle();
//!
//! let get_user = get_v(&users, &PropertyKey::from("getUser")).unwrap();
//! assert_eq!(get_user, JsValue::from("fn"));
//! ```
//!
//! ### Running a lookup query
//!
//! ```
//! use lazy_webpack::runner::webpack::context::WebpackContext;
//! use lazy_webpack::runner::webpack::registry::ModuleRegistry;
//! use lazy_webpack::runner::webpack::snapshot::Snapshot;
//!
//! let ctx = WebpackContext::default();
//! let registry = ModuleRegistry::shared();
//! ctx.init_webpack(registry.clone()).unwrap();
//! Snapshot::parse(r#"{"modules": {"1": {"a": 1, "b": 2}}}"#)
//!     .unwrap()
//!     .populate(&registry)
//!     .unwrap();
//!
//! let result = ctx.run_query(r#"findByProps("a", "b")"#).unwrap();
//! assert!(result.is_found());
//! ```
//!
//! ## Same-tick window
//!
//! A proxy handed out by [`runner::lazy::handle::LazyHandle::proxy`] cannot be
//! resolved while the code that asked for it is still running; the module it
//! stands for has usually not loaded yet. Property reads made before the
//! context's [`TaskQueue`](runner::lazy::scheduler::TaskQueue) runs its next
//! task are therefore answered with child proxies ("the eventual value of this
//! property"), which is what makes `const { a, b } = lazyModule` work. After
//! that, reads go straight to the resolved module. Callers that know which
//! regime they are in can pick
//! [`immediate_view`](runner::lazy::handle::LazyHandle::immediate_view) or
//! [`deferred_view`](runner::lazy::handle::LazyHandle::deferred_view) instead.
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG grammar and AST for lookup queries
//! - **[`runner`]** - Everything else
//!   - **[`runner::ds`]** - Data structures (values, objects, property descriptors)
//!   - **[`runner::lazy`]** - Deferred cells, lazy factories and proxies
//!   - **[`runner::webpack`]** - Module registry, filters, scanner and subscriptions

#[macro_use]
extern crate lazy_static;

pub mod parser;
pub mod runner;
