use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::lazy::cell::DeferredCell;
use crate::runner::lazy::factory::LazyFactory;
use crate::runner::lazy::proxy::{LazyProxy, LazySource};
use crate::runner::lazy::scheduler::{SameTickWindow, TaskQueue};

/// Owner of a lazy target, able to hand out proxies onto it.
///
/// [`proxy`](LazyHandle::proxy) speculates until the queue runs its next task.
/// Callers that know which regime they are in can skip the heuristic and ask for
/// [`immediate_view`](LazyHandle::immediate_view) (always speculates, for
/// destructuring at creation) or [`deferred_view`](LazyHandle::deferred_view)
/// (never speculates, for use after resolution).
#[derive(Clone)]
pub struct LazyHandle {
    source: LazySource,
    queue: TaskQueue,
}
impl LazyHandle {
    pub fn new(source: LazySource, queue: &TaskQueue) -> Self {
        LazyHandle {
            source,
            queue: queue.clone(),
        }
    }

    pub fn proxy(&self) -> JsValue {
        LazyProxy::new(
            self.source.clone(),
            Some(SameTickWindow::scheduled(&self.queue)),
        )
        .into_value()
    }

    pub fn immediate_view(&self) -> JsValue {
        LazyProxy::new(self.source.clone(), Some(SameTickWindow::always_open())).into_value()
    }

    pub fn deferred_view(&self) -> JsValue {
        LazyProxy::new(self.source.clone(), None).into_value()
    }

    pub fn is_resolved(&self) -> bool {
        self.source.is_resolved()
    }

    pub fn value(&self) -> Result<JsValue, JErrorType> {
        self.source.fetch()
    }

    pub fn source(&self) -> &LazySource {
        &self.source
    }
}

/// The `setValue` half of [`deferred_proxy`].
#[derive(Clone)]
pub struct Resolver {
    cell: DeferredCell<JsValue>,
}
impl Resolver {
    pub fn new(cell: DeferredCell<JsValue>) -> Self {
        Resolver { cell }
    }

    /// Returns `false` when the target had already been set; the earlier value stays.
    pub fn set(&self, value: JsValue) -> bool {
        self.cell.resolve(value)
    }

    pub fn cell(&self) -> &DeferredCell<JsValue> {
        &self.cell
    }
}

pub fn deferred_proxy(queue: &TaskQueue) -> (LazyHandle, Resolver) {
    let cell = DeferredCell::new();
    (
        LazyHandle::new(LazySource::Deferred(cell.clone()), queue),
        Resolver::new(cell),
    )
}

pub fn lazy_handle<F>(queue: &TaskQueue, factory: F, max_attempts: u32) -> LazyHandle
where
    F: Fn() -> Result<JsValue, JErrorType> + 'static,
{
    let factory = LazyFactory::from_value_factory(factory, max_attempts);
    LazyHandle::new(LazySource::Factory(Rc::new(factory)), queue)
}

/// `proxyLazy(factory, attempts)`.
pub fn proxy_lazy<F>(queue: &TaskQueue, factory: F, max_attempts: u32) -> JsValue
where
    F: Fn() -> Result<JsValue, JErrorType> + 'static,
{
    lazy_handle(queue, factory, max_attempts).proxy()
}

pub fn is_lazy(v: &JsValue) -> bool {
    match v {
        JsValue::Object(o) => o
            .try_borrow()
            .map_or(false, |o| o.as_lazy_proxy().is_some()),
        _ => false,
    }
}

/// Resolves a lazy proxy (and any proxy it resolves to) down to a plain value.
/// Non-proxy values come back as they are.
pub fn unwrap_lazy(v: &JsValue) -> Result<JsValue, JErrorType> {
    let mut current = v.clone();
    loop {
        let next = match &current {
            JsValue::Object(o) => match o.borrow().as_lazy_proxy() {
                Some(proxy) => proxy.force()?,
                None => return Ok(current.clone()),
            },
            _ => return Ok(current.clone()),
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::error::LazyError;
    use crate::runner::ds::object_property::PropertyKey;
    use crate::runner::ds::operations::object::{create_object, get_v};

    #[test]
    fn test_proxy_stops_speculating_after_a_tick() {
        let queue = TaskQueue::new();
        let (handle, resolver) = deferred_proxy(&queue);
        let proxy = handle.proxy();

        let a = get_v(&proxy, &PropertyKey::from("a")).unwrap();
        assert!(is_lazy(&a));

        queue.run_until_idle();
        assert_eq!(
            get_v(&proxy, &PropertyKey::from("a")),
            Err(JErrorType::Lazy(LazyError::TargetNotReady))
        );

        resolver.set(create_object(vec![("a", JsValue::from(1))]));
        assert_eq!(get_v(&proxy, &PropertyKey::from("a")).unwrap(), JsValue::from(1));
        assert_eq!(unwrap_lazy(&a).unwrap(), JsValue::from(1));
    }

    #[test]
    fn test_explicit_views() {
        let queue = TaskQueue::new();
        let (handle, resolver) = deferred_proxy(&queue);
        resolver.set(create_object(vec![("a", JsValue::from(1))]));

        let immediate = handle.immediate_view();
        queue.run_until_idle();
        let a = get_v(&immediate, &PropertyKey::from("a")).unwrap();
        assert!(is_lazy(&a));
        assert_eq!(unwrap_lazy(&a).unwrap(), JsValue::from(1));

        let deferred = handle.deferred_view();
        assert_eq!(
            get_v(&deferred, &PropertyKey::from("a")).unwrap(),
            JsValue::from(1)
        );
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_second_set_keeps_first_value() {
        let queue = TaskQueue::new();
        let (handle, resolver) = deferred_proxy(&queue);
        assert!(resolver.set(JsValue::from("first")));
        assert!(!resolver.set(JsValue::from("second")));
        assert_eq!(handle.value().unwrap(), JsValue::from("first"));
    }
}
