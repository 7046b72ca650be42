use std::fmt;
use std::rc::Rc;

use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::{function_source, get_v};
use crate::runner::ds::operations::type_conversion::{get_type, TYPE_STR_FUNCTION};
use crate::runner::ds::value::JsValue;

/// What a filter was built from. Only used to describe it.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterKind {
    Props(Vec<String>),
    Code(Vec<String>),
    StoreName(String),
    Custom(String),
}

struct FilterInner {
    kind: FilterKind,
    predicate: Box<dyn Fn(&JsValue) -> bool>,
}

/// A predicate over a module's exports.
///
/// Filters compare by identity: two filters built from the same props are still
/// two filters, and subscribe independently.
#[derive(Clone)]
pub struct Filter {
    inner: Rc<FilterInner>,
}
impl Filter {
    fn new<F: Fn(&JsValue) -> bool + 'static>(kind: FilterKind, predicate: F) -> Self {
        Filter {
            inner: Rc::new(FilterInner {
                kind,
                predicate: Box::new(predicate),
            }),
        }
    }

    /// Exports on which every one of `props` is defined.
    pub fn by_props<S: AsRef<str>>(props: &[S]) -> Self {
        let props: Vec<String> = props.iter().map(|p| p.as_ref().to_string()).collect();
        let keys: Vec<PropertyKey> = props.iter().map(|p| PropertyKey::from(p.as_str())).collect();
        Filter::new(FilterKind::Props(props), move |m| {
            if m.is_nullish() {
                return false;
            }
            keys.iter()
                .all(|k| !matches!(get_v(m, k), Ok(JsValue::Undefined) | Err(_)))
        })
    }

    /// Functions whose source text contains every one of `code`.
    pub fn by_code<S: AsRef<str>>(code: &[S]) -> Self {
        let code: Vec<String> = code.iter().map(|c| c.as_ref().to_string()).collect();
        let needles = code.clone();
        Filter::new(FilterKind::Code(code), move |m| {
            if get_type(m) != TYPE_STR_FUNCTION {
                return false;
            }
            match function_source(m) {
                Some(source) => needles.iter().all(|c| source.contains(c.as_str())),
                None => false,
            }
        })
    }

    /// Flux stores: objects whose `constructor.displayName` is `name`.
    pub fn by_store_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let expected = JsValue::String(name.clone());
        Filter::new(FilterKind::StoreName(name), move |m| {
            if m.is_nullish() {
                return false;
            }
            match get_v(m, &PropertyKey::from("constructor")) {
                Ok(ctor) if !ctor.is_nullish() => {
                    matches!(get_v(&ctor, &PropertyKey::from("displayName")), Ok(v) if v == expected)
                }
                _ => false,
            }
        })
    }

    pub fn custom<F: Fn(&JsValue) -> bool + 'static>(
        description: impl Into<String>,
        predicate: F,
    ) -> Self {
        Filter::new(FilterKind::Custom(description.into()), predicate)
    }

    pub fn matches(&self, exports: &JsValue) -> bool {
        (self.inner.predicate)(exports)
    }

    pub fn kind(&self) -> &FilterKind {
        &self.inner.kind
    }

    pub fn same(&self, other: &Filter) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The arguments the filter was built from, e.g. `"a", "b"`.
    pub fn describe_args(&self) -> String {
        match self.kind() {
            FilterKind::Props(args) | FilterKind::Code(args) => quote_all(args),
            FilterKind::StoreName(name) => format!("{:?}", name),
            FilterKind::Custom(description) => description.clone(),
        }
    }
}
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            FilterKind::Props(_) => write!(f, "byProps({})", self.describe_args()),
            FilterKind::Code(_) => write!(f, "byCode({})", self.describe_args()),
            FilterKind::StoreName(_) => write!(f, "byStoreName({})", self.describe_args()),
            FilterKind::Custom(description) => write!(f, "<{}>", description),
        }
    }
}
impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({})", self)
    }
}

pub(crate) fn quote_all(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::function_object::NativeFunctionObject;
    use crate::runner::ds::operations::object::create_object;

    #[test]
    fn test_by_props_requires_every_prop() {
        let f = Filter::by_props(&["a", "b"]);
        assert!(f.matches(&create_object(vec![
            ("a", JsValue::from(1)),
            ("b", JsValue::Null),
        ])));
        assert!(!f.matches(&create_object(vec![("a", JsValue::from(1))])));
        assert!(!f.matches(&JsValue::Undefined));
        assert!(!f.matches(&JsValue::from("a")));
    }

    #[test]
    fn test_by_code_only_matches_functions() {
        let f = Filter::by_code(&["getUser", "fetch"]);
        let func = NativeFunctionObject::from_source("f", "function f(){getUser();fetch()}").into_value();
        assert!(f.matches(&func));
        let other = NativeFunctionObject::from_source("g", "function g(){getUser()}").into_value();
        assert!(!f.matches(&other));
        assert!(!f.matches(&create_object(vec![("getUser", JsValue::from(1))])));
    }

    #[test]
    fn test_by_store_name() {
        let store = create_object(vec![(
            "constructor",
            create_object(vec![("displayName", JsValue::from("UserStore"))]),
        )]);
        assert!(Filter::by_store_name("UserStore").matches(&store));
        assert!(!Filter::by_store_name("GuildStore").matches(&store));
    }

    #[test]
    fn test_identity_and_display() {
        let a = Filter::by_props(&["x"]);
        let b = Filter::by_props(&["x"]);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert_eq!(a.to_string(), "byProps(\"x\")");
        assert_eq!(Filter::by_store_name("S").to_string(), "byStoreName(\"S\")");
    }
}
