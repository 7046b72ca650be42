//! Speculative destructuring.
//!
//! `const { a, b: { c } } = proxy;` runs before anything could have resolved
//! `proxy`. While a top-level proxy's window is open, reading a property off it
//! returns a child proxy standing for "property `a` of whatever the parent turns
//! out to be". The child has no window of its own, so reads on it go straight to
//! its target; speculation is one level deep per access chain.
//!
//! For a deferred parent the child is a cell chained on the parent's cell, filled
//! in the moment the parent resolves. For a factory parent the child is a factory
//! that runs the parent and reads the property, sharing the parent's attempt cap.

use std::rc::Rc;

use tracing::warn;

use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::get_v;
use crate::runner::ds::value::JsValue;
use crate::runner::lazy::factory::LazyFactory;
use crate::runner::lazy::proxy::{LazyProxy, LazySource};

pub fn project(source: &LazySource, key: PropertyKey) -> JsValue {
    let child = match source {
        LazySource::Deferred(cell) => LazySource::Deferred(cell.on_resolve(move |parent| {
            match get_v(parent, &key) {
                Ok(v) => v,
                Err(e) => {
                    warn!(target: "lazy", key = %key, error = %e, "could not project resolved value");
                    JsValue::Undefined
                }
            }
        })),
        LazySource::Factory(parent) => {
            let description = format!("{}.{}", parent.description(), key);
            let max_attempts = parent.max_attempts();
            let parent = LazySource::Factory(parent.clone());
            let factory = LazyFactory::from_value_factory(
                move || {
                    let target = parent.fetch()?;
                    get_v(&target, &key)
                },
                max_attempts,
            )
            .with_description(description);
            LazySource::Factory(Rc::new(factory))
        }
    };
    LazyProxy::new(child, None).into_value()
}
