use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::runner::ds::error::{JErrorType, LazyError};
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectBase, ObjectType, SimpleObject};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::type_conversion::get_type;
use crate::runner::ds::symbol::SYMBOL_LAZY_CACHED;
use crate::runner::ds::value::JsValue;
use crate::runner::lazy::cell::DeferredCell;
use crate::runner::lazy::factory::LazyFactory;
use crate::runner::lazy::scheduler::SameTickWindow;
use crate::runner::lazy::speculative;

lazy_static! {
    /// Own properties of the function a proxy stands in for. They can never be
    /// redefined, so the proxy always reports its own placeholders for them.
    pub static ref UNCONFIGURABLE: Vec<PropertyKey> = vec![
        PropertyKey::from("arguments"),
        PropertyKey::from("caller"),
        PropertyKey::from("prototype"),
    ];
    static ref LAZY_CACHED_KEY: PropertyKey = PropertyKey::Sym(SYMBOL_LAZY_CACHED.clone());
}

/// Where a proxy gets its target from.
#[derive(Clone)]
pub enum LazySource {
    Deferred(DeferredCell<JsValue>),
    Factory(Rc<LazyFactory<JsValue>>),
}
impl LazySource {
    /// Produces the target, running the factory if this is a factory source.
    pub fn fetch(&self) -> Result<JsValue, JErrorType> {
        match self {
            LazySource::Deferred(cell) => match cell.try_get() {
                Some(v) if !v.is_nullish() => Ok(v),
                _ => Err(LazyError::TargetNotReady.into()),
            },
            LazySource::Factory(factory) => match factory.try_get()? {
                Some(v) => Ok(v),
                None if factory.is_exhausted() => Err(LazyError::FactoryExhausted {
                    attempts: factory.max_attempts(),
                    factory: factory.description().to_string(),
                }
                .into()),
                None => Err(LazyError::TargetNotReady.into()),
            },
        }
    }

    /// The target if it is already known, without triggering anything.
    pub fn peek(&self) -> Option<JsValue> {
        match self {
            LazySource::Deferred(cell) => cell.try_get(),
            LazySource::Factory(factory) => factory.cached(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.peek().map_or(false, |v| !v.is_nullish())
    }
}

/// An object that forwards every reflective operation to a target it does not
/// hold yet.
///
/// Two operations do more than forward:
///
/// - `own_property_keys` always includes `arguments`, `caller` and `prototype`,
///   whether the target has them or not.
/// - `get_own_property` answers those three from the proxy's own placeholders, and
///   remembers every other descriptor it fetched from the target. Later lookups of
///   the same key are answered from that record.
///
/// While the proxy's same-tick window is open, `get` does not touch the target at
/// all and returns a child proxy for the property instead.
pub struct LazyProxy {
    object_base: ObjectBase,
    source: LazySource,
    window: Option<SameTickWindow>,
    descriptor_cache: RefCell<IndexMap<PropertyKey, PropertyDescriptor>>,
}
impl LazyProxy {
    pub fn new(source: LazySource, window: Option<SameTickWindow>) -> Self {
        let mut object_base = ObjectBase::new();
        for key in UNCONFIGURABLE.iter() {
            let value = if key.as_str() == Some("prototype") {
                JsValue::Object(ObjectType::new_ordinary(SimpleObject::new()))
            } else {
                JsValue::Null
            };
            object_base.properties.insert(
                key.clone(),
                PropertyDescriptor::Data {
                    writable: key.as_str() == Some("prototype"),
                    value,
                    enumerable: false,
                    configurable: false,
                },
            );
        }
        LazyProxy {
            object_base,
            source,
            window,
            descriptor_cache: RefCell::new(IndexMap::new()),
        }
    }

    pub fn into_value(self) -> JsValue {
        JsValue::Object(ObjectType::new_proxy(self))
    }

    pub fn source(&self) -> &LazySource {
        &self.source
    }

    pub fn is_speculating(&self) -> bool {
        self.window.as_ref().map_or(false, |w| w.is_open())
    }

    pub fn force(&self) -> Result<JsValue, JErrorType> {
        self.source.fetch()
    }

    pub fn cached_descriptor_count(&self) -> usize {
        self.descriptor_cache.borrow().len()
    }

    /// Drops what was recorded for `property`; called by every trap that writes.
    fn forget_descriptor(&self, property: &PropertyKey) {
        self.descriptor_cache.borrow_mut().shift_remove(property);
    }

    fn target(&self) -> Result<JsObjectType, JErrorType> {
        match self.source.fetch()? {
            JsValue::Object(o) => Ok(o),
            other => Err(LazyError::InvalidLazyTarget {
                found: get_type(&other).to_string(),
            }
            .into()),
        }
    }
}
impl JsObject for LazyProxy {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.object_base
    }

    fn get_object_base(&self) -> &ObjectBase {
        &self.object_base
    }

    fn as_super_trait(&self) -> &dyn JsObject {
        self
    }

    fn as_super_trait_mut(&mut self) -> &mut dyn JsObject {
        self
    }

    fn get_prototype_of(&self) -> Result<Option<JsObjectType>, JErrorType> {
        self.target()?.borrow().as_js_object().get_prototype_of()
    }

    fn set_prototype_of(&mut self, prototype: Option<JsObjectType>) -> Result<bool, JErrorType> {
        self.target()?
            .borrow_mut()
            .as_js_object_mut()
            .set_prototype_of(prototype)
    }

    fn is_extensible(&self) -> Result<bool, JErrorType> {
        self.target()?.borrow().as_js_object().is_extensible()
    }

    fn prevent_extensions(&mut self) -> Result<bool, JErrorType> {
        self.target()?
            .borrow_mut()
            .as_js_object_mut()
            .prevent_extensions()
    }

    fn get_own_property(
        &self,
        property: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JErrorType> {
        if UNCONFIGURABLE.contains(property) {
            return Ok(self.object_base.properties.get(property).cloned());
        }
        if let Some(d) = self.descriptor_cache.borrow().get(property) {
            return Ok(Some(d.clone()));
        }
        let descriptor = self
            .target()?
            .borrow()
            .as_js_object()
            .get_own_property(property)?;
        if let Some(d) = &descriptor {
            self.descriptor_cache
                .borrow_mut()
                .insert(property.clone(), d.clone());
        }
        Ok(descriptor)
    }

    fn define_own_property(
        &mut self,
        property: PropertyKey,
        descriptor: PropertyDescriptor,
    ) -> Result<bool, JErrorType> {
        let defined = self
            .target()?
            .borrow_mut()
            .as_js_object_mut()
            .define_own_property(property.clone(), descriptor);
        self.forget_descriptor(&property);
        defined
    }

    fn has_property(&self, property: &PropertyKey) -> Result<bool, JErrorType> {
        self.target()?.borrow().as_js_object().has_property(property)
    }

    fn get(&self, property: &PropertyKey, receiver: &JsValue) -> Result<JsValue, JErrorType> {
        if *property == *LAZY_CACHED_KEY {
            return Ok(self.source.peek().unwrap_or(JsValue::Undefined));
        }
        if self.is_speculating() {
            trace!(target: "lazy", key = %property, "property read in the same tick, handing out a child proxy");
            return Ok(speculative::project(&self.source, property.clone()));
        }
        self.target()?
            .borrow()
            .as_js_object()
            .get(property, receiver)
    }

    fn set(
        &mut self,
        property: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JErrorType> {
        let written = self
            .target()?
            .borrow_mut()
            .as_js_object_mut()
            .set(property.clone(), value, receiver);
        self.forget_descriptor(&property);
        written
    }

    fn delete(&mut self, property: &PropertyKey) -> Result<bool, JErrorType> {
        let deleted = self.target()?.borrow_mut().as_js_object_mut().delete(property);
        self.forget_descriptor(property);
        deleted
    }

    fn own_property_keys(&self) -> Result<Vec<PropertyKey>, JErrorType> {
        let mut keys = self.target()?.borrow().as_js_object().own_property_keys()?;
        for key in UNCONFIGURABLE.iter() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        Ok(keys)
    }

    fn call(&self, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        self.target()?.borrow().as_js_object().call(this, args)
    }

    fn construct(&self, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        self.target()?.borrow().as_js_object().construct(args)
    }

    fn source_text(&self) -> Option<String> {
        match self.source.peek()? {
            JsValue::Object(o) => o.try_borrow().ok()?.as_js_object().source_text(),
            _ => None,
        }
    }

    fn to_string(&self) -> String {
        match self.source.peek() {
            Some(v) if !v.is_nullish() => v.to_string(),
            _ => "[lazy proxy (pending)]".to_string(),
        }
    }
}
