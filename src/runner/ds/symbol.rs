use std::fmt;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SymbolData {
    description: String,
}

impl SymbolData {
    pub fn new(description: impl Into<String>) -> Self {
        SymbolData {
            description: description.into(),
        }
    }

    pub fn new_empty() -> Self {
        SymbolData {
            description: Uuid::new_v4().hyphenated().to_string(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
impl Display for SymbolData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}
impl fmt::Debug for SymbolData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.description)
    }
}

lazy_static! {
    /// `Symbol.toStringTag`, used when describing objects. Webpack puts `"Module"`
    /// under it on every ES module namespace.
    pub static ref SYMBOL_TO_STRING_TAG: SymbolData = SymbolData::new("Symbol.toStringTag");
    /// Reading this key off a lazy proxy yields its target if it is already known,
    /// `undefined` otherwise. Never triggers resolution.
    pub static ref SYMBOL_LAZY_CACHED: SymbolData = SymbolData::new("lazy.cached");
}
