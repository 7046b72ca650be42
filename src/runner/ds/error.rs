use thiserror::Error;

/// Errors raised while a lazy value is pending, or when it resolved to something unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LazyError {
    #[error("deferred value has not been resolved yet")]
    NotYetResolved,

    #[error("proxy inner value is undefined, the value was never set")]
    TargetNotReady,

    #[error("lazy proxy called on a primitive value ({found})")]
    InvalidLazyTarget { found: String },

    #[error("lazy factory failed after {attempts} attempts: {factory}")]
    FactoryExhausted { attempts: u32, factory: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JErrorType {
    #[error("Uncaught reference error: {0}.")]
    ReferenceError(String),

    #[error("Uncaught type error: {0}.")]
    TypeError(String),

    #[error("Uncaught range error: {0}.")]
    RangeError(String),

    #[error("Uncaught error: {0}.")]
    Error(String),

    #[error(transparent)]
    Lazy(#[from] LazyError),
}
