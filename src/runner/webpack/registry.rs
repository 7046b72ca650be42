//! A webpack-style module cache.
//!
//! Two tables, keyed by module id: the cache of loaded modules (`require.c`) and
//! the module factories (`require.m`). Modules arrive either by [`insert`] (an
//! already-evaluated exports value) or by [`require`] running a factory. Either
//! way the insertion hooks see the final exports, once.
//!
//! [`insert`]: ModuleRegistry::insert
//! [`require`]: ModuleRegistry::require

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::object::create_object;
use crate::runner::ds::value::JsValue;
use crate::runner::webpack::error::WebpackError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleId {
    Num(u64),
    Str(String),
}
impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Num(n) => write!(f, "{}", n),
            ModuleId::Str(s) => write!(f, "{}", s),
        }
    }
}
impl From<&str> for ModuleId {
    fn from(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) if n.to_string() == s => ModuleId::Num(n),
            _ => ModuleId::Str(s.to_string()),
        }
    }
}
impl From<String> for ModuleId {
    fn from(s: String) -> Self {
        ModuleId::from(s.as_str())
    }
}
impl From<u64> for ModuleId {
    fn from(n: u64) -> Self {
        ModuleId::Num(n)
    }
}

#[derive(Clone, Debug)]
pub struct ModuleRecord {
    pub id: ModuleId,
    pub exports: JsValue,
    pub loaded: bool,
}

/// Evaluates a module: receives the registry (to require dependencies), the
/// module id and the initial `module.exports` object, returns the final exports.
pub type ModuleInit = Rc<dyn Fn(&ModuleRegistry, &ModuleId, &JsValue) -> Result<JsValue, JErrorType>>;

#[derive(Clone)]
pub struct ModuleFactory {
    source: String,
    init: ModuleInit,
}
impl ModuleFactory {
    pub fn new<F>(source: impl Into<String>, init: F) -> Self
    where
        F: Fn(&ModuleRegistry, &ModuleId, &JsValue) -> Result<JsValue, JErrorType> + 'static,
    {
        ModuleFactory {
            source: source.into(),
            init: Rc::new(init),
        }
    }

    /// A factory known only by its source text; requiring it leaves `module.exports` untouched.
    pub fn from_source(source: impl Into<String>) -> Self {
        ModuleFactory::new(source, |_, _, exports| Ok(exports.clone()))
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
impl fmt::Debug for ModuleFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleFactory")
            .field("source", &self.source)
            .finish()
    }
}

type InsertHook = Rc<dyn Fn(&ModuleId, &JsValue)>;

#[derive(Default)]
pub struct ModuleRegistry {
    modules: RefCell<IndexMap<ModuleId, ModuleRecord>>,
    factories: RefCell<IndexMap<ModuleId, ModuleFactory>>,
    hooks: RefCell<Vec<InsertHook>>,
}
impl ModuleRegistry {
    pub fn new() -> Self {
        ModuleRegistry::default()
    }

    pub fn shared() -> Rc<Self> {
        Rc::new(ModuleRegistry::new())
    }

    /// Called with every module whose exports become available from now on.
    pub fn add_hook<F: Fn(&ModuleId, &JsValue) + 'static>(&self, hook: F) {
        self.hooks.borrow_mut().push(Rc::new(hook));
    }

    pub fn define_factory(&self, id: impl Into<ModuleId>, factory: ModuleFactory) {
        self.factories.borrow_mut().insert(id.into(), factory);
    }

    /// Puts an evaluated module in the cache and notifies the hooks.
    pub fn insert(&self, id: impl Into<ModuleId>, exports: JsValue) {
        let id = id.into();
        self.modules.borrow_mut().insert(
            id.clone(),
            ModuleRecord {
                id: id.clone(),
                exports: exports.clone(),
                loaded: true,
            },
        );
        self.fire_hooks(&id, &exports);
    }

    /// `__webpack_require__(id)`: the cached exports, or the result of running the
    /// module's factory once. A module requiring itself while loading sees its
    /// partially built exports object.
    pub fn require(&self, id: impl Into<ModuleId>) -> Result<JsValue, WebpackError> {
        let id = id.into();
        if let Some(record) = self.modules.borrow().get(&id) {
            return Ok(record.exports.clone());
        }
        let factory = self
            .factories
            .borrow()
            .get(&id)
            .cloned()
            .ok_or_else(|| WebpackError::ModuleNotFound(id.clone()))?;

        let initial = create_object::<&str>(vec![]);
        self.modules.borrow_mut().insert(
            id.clone(),
            ModuleRecord {
                id: id.clone(),
                exports: initial.clone(),
                loaded: false,
            },
        );
        debug!(target: "webpack", module = %id, "evaluating module factory");
        let exports = match (factory.init)(self, &id, &initial) {
            Ok(exports) => exports,
            Err(e) => {
                self.modules.borrow_mut().shift_remove(&id);
                return Err(e.into());
            }
        };
        if let Some(record) = self.modules.borrow_mut().get_mut(&id) {
            record.exports = exports.clone();
            record.loaded = true;
        }
        self.fire_hooks(&id, &exports);
        Ok(exports)
    }

    fn fire_hooks(&self, id: &ModuleId, exports: &JsValue) {
        let hooks = self.hooks.borrow().clone();
        for hook in hooks {
            hook(id, exports);
        }
    }

    /// The cached modules at this instant. Later insertions do not show up in it.
    pub fn snapshot(&self) -> Vec<ModuleRecord> {
        self.modules.borrow().values().cloned().collect()
    }

    pub fn factories_snapshot(&self) -> Vec<(ModuleId, ModuleFactory)> {
        self.factories
            .borrow()
            .iter()
            .map(|(id, f)| (id.clone(), f.clone()))
            .collect()
    }

    pub fn factory(&self, id: &ModuleId) -> Option<ModuleFactory> {
        self.factories.borrow().get(id).cloned()
    }

    pub fn exports(&self, id: &ModuleId) -> Option<JsValue> {
        self.modules.borrow().get(id).map(|r| r.exports.clone())
    }

    pub fn len(&self) -> usize {
        self.modules.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.borrow().is_empty()
    }
}
impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.modules.borrow().len())
            .field("factories", &self.factories.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object_property::PropertyKey;
    use crate::runner::ds::operations::object::{get_v, set_v};
    use std::cell::Cell;

    #[test]
    fn test_module_id_parsing() {
        assert_eq!(ModuleId::from("123"), ModuleId::Num(123));
        assert_eq!(ModuleId::from("0123"), ModuleId::Str("0123".to_string()));
        assert_eq!(ModuleId::from("abc"), ModuleId::Str("abc".to_string()));
    }

    #[test]
    fn test_require_runs_factory_once_and_fires_hook() {
        let registry = ModuleRegistry::new();
        let runs = Rc::new(Cell::new(0));
        let hooks = Rc::new(Cell::new(0));
        let r = runs.clone();
        registry.define_factory(
            1u64,
            ModuleFactory::new("e.exports={a:1}", move |_, _, exports| {
                r.set(r.get() + 1);
                set_v(exports, PropertyKey::from("a"), JsValue::from(1))?;
                Ok(exports.clone())
            }),
        );
        let h = hooks.clone();
        registry.add_hook(move |_, _| h.set(h.get() + 1));

        let first = registry.require(1u64).unwrap();
        let second = registry.require(1u64).unwrap();
        assert_eq!(first, second);
        assert_eq!(get_v(&first, &PropertyKey::from("a")).unwrap(), JsValue::from(1));
        assert_eq!((runs.get(), hooks.get()), (1, 1));
    }

    #[test]
    fn test_factory_can_require_dependencies() {
        let registry = ModuleRegistry::new();
        registry.insert(
            "dep",
            create_object(vec![("value", JsValue::from(10))]),
        );
        registry.define_factory(
            2u64,
            ModuleFactory::new("n(\"dep\")", |registry, _, _| {
                let dep = registry.require("dep")?;
                let v = get_v(&dep, &PropertyKey::from("value"))?;
                Ok(create_object(vec![("fromDep", v)]))
            }),
        );
        let exports = registry.require(2u64).unwrap();
        assert_eq!(
            get_v(&exports, &PropertyKey::from("fromDep")).unwrap(),
            JsValue::from(10)
        );
    }

    #[test]
    fn test_require_unknown_module() {
        let registry = ModuleRegistry::new();
        assert!(matches!(
            registry.require(9u64),
            Err(WebpackError::ModuleNotFound(ModuleId::Num(9)))
        ));
    }
}
