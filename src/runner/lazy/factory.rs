//! Retry-bounded memoization.
//!
//! A [`LazyFactory`] calls its closure on demand until it yields a value, then
//! caches that value forever. Every call that comes back empty (or fails) uses up
//! one attempt; once `max_attempts` are spent the closure is never called again.

use std::cell::RefCell;
use std::fmt;

use tracing::{error, warn};

use crate::runner::ds::error::{JErrorType, LazyError};
use crate::runner::ds::value::JsValue;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

type FactoryFn<T> = Box<dyn Fn() -> Result<Option<T>, JErrorType>>;

struct FactoryState<T> {
    attempts_made: u32,
    cached: Option<T>,
    failure_reported: bool,
}

pub struct LazyFactory<T> {
    factory: FactoryFn<T>,
    max_attempts: u32,
    description: String,
    state: RefCell<FactoryState<T>>,
}
impl<T: Clone> LazyFactory<T> {
    pub fn new<F>(factory: F, max_attempts: u32) -> Self
    where
        F: Fn() -> Result<Option<T>, JErrorType> + 'static,
    {
        LazyFactory {
            factory: Box::new(factory),
            max_attempts,
            description: "<anonymous factory>".to_string(),
            state: RefCell::new(FactoryState {
                attempts_made: 0,
                cached: None,
                failure_reported: false,
            }),
        }
    }

    /// Text used when the factory is reported as exhausted.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempts_made(&self) -> u32 {
        self.state.borrow().attempts_made
    }

    pub fn is_exhausted(&self) -> bool {
        let state = self.state.borrow();
        state.cached.is_none() && state.attempts_made >= self.max_attempts
    }

    pub fn cached(&self) -> Option<T> {
        self.state.borrow().cached.clone()
    }

    /// One step of resolution.
    ///
    /// * `Ok(Some(_))`: the cached value, computing it first if needed.
    /// * `Ok(None)`: the factory came back empty, or the attempts were used up earlier.
    /// * `Err(FactoryExhausted)`: this very call used the last attempt without success.
    /// * any other `Err`: the factory itself failed (which also costs an attempt).
    pub fn try_get(&self) -> Result<Option<T>, JErrorType> {
        {
            let mut state = self.state.borrow_mut();
            if let Some(v) = &state.cached {
                return Ok(Some(v.clone()));
            }
            if state.attempts_made >= self.max_attempts {
                return Ok(None);
            }
            state.attempts_made += 1;
        }
        // The borrow is released so the factory may consult other lazies, or this one.
        let outcome = (self.factory)();

        let mut state = self.state.borrow_mut();
        let capped = state.attempts_made >= self.max_attempts;
        match outcome {
            Ok(Some(v)) => {
                if state.cached.is_none() {
                    state.cached = Some(v);
                }
                Ok(state.cached.clone())
            }
            Ok(None) if capped => Err(self.exhausted()),
            Ok(None) => Ok(None),
            Err(e) if capped => {
                warn!(target: "lazy", factory = %self.description, error = %e, "lazy factory raised on its last attempt");
                Err(self.exhausted())
            }
            Err(e) => Err(e),
        }
    }

    /// The plain accessor: failures are logged, never raised.
    pub fn get(&self) -> Option<T> {
        match self.try_get() {
            Ok(v) => v,
            Err(JErrorType::Lazy(LazyError::FactoryExhausted { attempts, factory })) => {
                let mut state = self.state.borrow_mut();
                if !state.failure_reported {
                    state.failure_reported = true;
                    error!(target: "lazy", attempts, factory = %factory, "lazy factory failed");
                }
                None
            }
            Err(e) => {
                warn!(target: "lazy", factory = %self.description, error = %e, "lazy factory raised");
                None
            }
        }
    }

    fn exhausted(&self) -> JErrorType {
        JErrorType::Lazy(LazyError::FactoryExhausted {
            attempts: self.max_attempts,
            factory: self.description.clone(),
        })
    }
}
impl LazyFactory<JsValue> {
    /// Adapts a value-returning closure: nullish results count as empty.
    pub fn from_value_factory<F>(factory: F, max_attempts: u32) -> Self
    where
        F: Fn() -> Result<JsValue, JErrorType> + 'static,
    {
        LazyFactory::new(
            move || factory().map(|v| if v.is_nullish() { None } else { Some(v) }),
            max_attempts,
        )
    }
}
impl<T> fmt::Debug for LazyFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFactory")
            .field("description", &self.description)
            .field("max_attempts", &self.max_attempts)
            .field("attempts_made", &self.state.borrow().attempts_made)
            .finish()
    }
}

/// `lazy(factory, attempts)`: wraps `factory` in a [`LazyFactory`] and returns its accessor.
pub fn make_lazy<T, F>(factory: F, max_attempts: u32) -> impl Fn() -> Option<T>
where
    T: Clone + 'static,
    F: Fn() -> Option<T> + 'static,
{
    let lazy = LazyFactory::new(move || Ok(factory()), max_attempts);
    move || lazy.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_attempt_cap_is_honoured() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let get = make_lazy(
            move || -> Option<i32> {
                c.set(c.get() + 1);
                None
            },
            DEFAULT_MAX_ATTEMPTS,
        );
        for _ in 0..12 {
            assert_eq!(get(), None);
        }
        assert_eq!(calls.get(), 5);
        assert!(logs_contain("lazy factory failed"));
    }

    #[test]
    fn test_first_success_is_cached_for_good() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let lazy = LazyFactory::new(
            move || {
                c.set(c.get() + 1);
                Ok(if c.get() >= 3 { Some(c.get()) } else { None })
            },
            5,
        );
        assert_eq!(lazy.try_get(), Ok(None));
        assert_eq!(lazy.try_get(), Ok(None));
        assert_eq!(lazy.try_get(), Ok(Some(3)));
        assert_eq!(lazy.try_get(), Ok(Some(3)));
        assert_eq!(lazy.attempts_made(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_exhaustion_reported_once_then_empty() {
        let lazy: LazyFactory<i32> = LazyFactory::new(|| Ok(None), 2).with_description("nothing");
        assert_eq!(lazy.try_get(), Ok(None));
        assert_eq!(
            lazy.try_get(),
            Err(JErrorType::Lazy(LazyError::FactoryExhausted {
                attempts: 2,
                factory: "nothing".to_string()
            }))
        );
        assert_eq!(lazy.try_get(), Ok(None));
        assert!(lazy.is_exhausted());
        assert_eq!(lazy.attempts_made(), 2);
    }

    #[test]
    #[traced_test]
    fn test_failing_factory_still_costs_attempts() {
        let lazy: LazyFactory<i32> =
            LazyFactory::new(|| Err(JErrorType::Error("boom".to_string())), 3);
        assert_eq!(lazy.try_get(), Err(JErrorType::Error("boom".to_string())));
        assert_eq!(lazy.get(), None);
        assert!(matches!(
            lazy.try_get(),
            Err(JErrorType::Lazy(LazyError::FactoryExhausted { attempts: 3, .. }))
        ));
        assert_eq!(lazy.attempts_made(), 3);
        assert!(logs_contain("raised on its last attempt"));
        assert!(logs_contain("boom"));
    }

    #[test]
    fn test_nullish_values_are_empty() {
        let lazy = LazyFactory::from_value_factory(|| Ok(JsValue::Null), 1);
        assert!(lazy.try_get().is_err());
        let lazy = LazyFactory::from_value_factory(|| Ok(JsValue::from(0)), 1);
        assert_eq!(lazy.try_get(), Ok(Some(JsValue::from(0))));
    }
}
