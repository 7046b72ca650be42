//! Lazy values and the transparent proxies built on them.
//!
//! Everything here exists to let a caller hold on to "the thing that will
//! eventually be there" before it is. There are two ways to get the real value:
//!
//! - a [`DeferredCell`](cell::DeferredCell), resolved once by whoever finds the
//!   value (an eager registry scan or a subscription firing later), and
//! - a [`LazyFactory`](factory::LazyFactory), a closure retried on demand until it
//!   produces something or runs out of attempts.
//!
//! A [`LazyProxy`](proxy::LazyProxy) wraps either source and behaves like the
//! resolved object for every reflective operation. Property reads made right
//! after the proxy is created (destructuring at module scope) do not resolve
//! anything; they hand back child proxies chained on the parent. See
//! [`speculative`] for the rules and [`scheduler`] for how "right after" is
//! decided.
//!
//! ```
//! use lazy_webpack::runner::lazy::handle::deferred_proxy;
//! use lazy_webpack::runner::lazy::scheduler::TaskQueue;
//! use lazy_webpack::runner::ds::object_property::PropertyKey;
//! use lazy_webpack::runner::ds::operations::object::{create_object, get_v};
//! use lazy_webpack::runner::ds::value::JsValue;
//! use lazy_webpack::runner::lazy::handle::unwrap_lazy;
//!
//! let queue = TaskQueue::new();
//! let (handle, resolver) = deferred_proxy(&queue);
//! let proxy = handle.proxy();
//!
//! // `const { a } = proxy;` in the same tick
//! let a = get_v(&proxy, &PropertyKey::from("a")).unwrap();
//!
//! resolver.set(create_object(vec![("a", JsValue::from(42))]));
//! assert_eq!(unwrap_lazy(&a).unwrap(), JsValue::from(42));
//! ```

pub mod cell;
pub mod factory;
pub mod handle;
pub mod proxy;
pub mod scheduler;
pub mod speculative;
