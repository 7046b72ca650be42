use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::operations::test_and_comparison::same_value;
use crate::runner::ds::symbol::SymbolData;
use crate::runner::ds::value::JsValue;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum PropertyKey {
    Str(String),
    Int(u32),
    Sym(SymbolData),
}
impl PropertyKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::Str(s) => Some(s),
            _ => None,
        }
    }
}
impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Str(s) => write!(f, "{}", s),
            PropertyKey::Int(i) => write!(f, "{}", i),
            PropertyKey::Sym(s) => write!(f, "{}", s),
        }
    }
}
impl From<&str> for PropertyKey {
    /// Canonical array-index strings ("0", "17", but not "017") become integer keys.
    fn from(s: &str) -> Self {
        let is_canonical_index = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        if is_canonical_index {
            if let Ok(i) = s.parse::<u32>() {
                return PropertyKey::Int(i);
            }
        }
        PropertyKey::Str(s.to_string())
    }
}
impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::from(s.as_str())
    }
}
impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        PropertyKey::Int(i)
    }
}
impl From<SymbolData> for PropertyKey {
    fn from(s: SymbolData) -> Self {
        PropertyKey::Sym(s)
    }
}

pub enum PropertyDescriptor {
    Data {
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        set: Option<JsObjectType>,
        get: Option<JsObjectType>,
        enumerable: bool,
        configurable: bool,
    },
}
impl PropertyDescriptor {
    /// A plain writable, enumerable, configurable data property, as created by assignment.
    pub fn new_data(value: JsValue) -> Self {
        PropertyDescriptor::Data {
            value,
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    pub fn new_hidden(value: JsValue) -> Self {
        PropertyDescriptor::Data {
            value,
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    pub fn value(&self) -> Option<&JsValue> {
        match self {
            PropertyDescriptor::Data { value, .. } => Some(value),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { enumerable, .. } => *enumerable,
            PropertyDescriptor::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn is_configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { configurable, .. } => *configurable,
            PropertyDescriptor::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        match self {
            PropertyDescriptor::Data { .. } => true,
            PropertyDescriptor::Accessor { .. } => false,
        }
    }
}
impl Clone for PropertyDescriptor {
    fn clone(&self) -> Self {
        match self {
            PropertyDescriptor::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => PropertyDescriptor::Data {
                value: value.clone(),
                writable: *writable,
                enumerable: *enumerable,
                configurable: *configurable,
            },
            PropertyDescriptor::Accessor {
                set,
                get,
                enumerable,
                configurable,
            } => PropertyDescriptor::Accessor {
                set: set.clone(),
                get: get.clone(),
                enumerable: *enumerable,
                configurable: *configurable,
            },
        }
    }
}
impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyDescriptor::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => f
                .debug_struct("Data")
                .field("value", value)
                .field("writable", writable)
                .field("enumerable", enumerable)
                .field("configurable", configurable)
                .finish(),
            PropertyDescriptor::Accessor {
                set,
                get,
                enumerable,
                configurable,
            } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .field("enumerable", enumerable)
                .field("configurable", configurable)
                .finish(),
        }
    }
}
impl PartialEq for PropertyDescriptor {
    fn eq(&self, other: &Self) -> bool {
        fn same_fn(a: &Option<JsObjectType>, b: &Option<JsObjectType>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
        }
        match (self, other) {
            (
                PropertyDescriptor::Data {
                    value,
                    writable,
                    enumerable,
                    configurable,
                },
                PropertyDescriptor::Data {
                    value: other_value,
                    writable: other_writable,
                    enumerable: other_enumerable,
                    configurable: other_configurable,
                },
            ) => {
                same_value(value, other_value)
                    && writable == other_writable
                    && enumerable == other_enumerable
                    && configurable == other_configurable
            }
            (
                PropertyDescriptor::Accessor {
                    set,
                    get,
                    enumerable,
                    configurable,
                },
                PropertyDescriptor::Accessor {
                    set: other_set,
                    get: other_get,
                    enumerable: other_enumerable,
                    configurable: other_configurable,
                },
            ) => {
                same_fn(set, other_set)
                    && same_fn(get, other_get)
                    && enumerable == other_enumerable
                    && configurable == other_configurable
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_index_strings_become_int_keys() {
        assert_eq!(PropertyKey::from("0"), PropertyKey::Int(0));
        assert_eq!(PropertyKey::from("42"), PropertyKey::Int(42));
        assert_eq!(PropertyKey::from("042"), PropertyKey::Str("042".to_string()));
        assert_eq!(PropertyKey::from("foo"), PropertyKey::Str("foo".to_string()));
        assert_eq!(PropertyKey::from(""), PropertyKey::Str(String::new()));
    }

    #[test]
    fn test_descriptor_equality_uses_same_value() {
        let a = PropertyDescriptor::new_data(JsValue::from(1));
        assert_eq!(a, a.clone());
        assert_ne!(a, PropertyDescriptor::new_hidden(JsValue::from(1)));
        assert_ne!(a, PropertyDescriptor::new_data(JsValue::from(2)));
    }
}
