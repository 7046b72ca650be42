use crate::runner::ds::error::JErrorType;
use crate::runner::ds::function_object::JsFunctionObject;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::test_and_comparison::{same_js_object, same_value};
use crate::runner::ds::symbol::SYMBOL_TO_STRING_TAG;
use crate::runner::ds::value::JsValue;
use crate::runner::lazy::proxy::LazyProxy;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

pub type JsObjectType = Rc<RefCell<ObjectType>>;

pub enum ObjectType {
    Ordinary(Box<dyn JsObject>),
    Function(Box<dyn JsFunctionObject>),
    Proxy(Box<LazyProxy>),
}
impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        same_js_object(self.as_js_object(), other.as_js_object())
    }
}
impl ObjectType {
    pub fn new_ordinary(o: impl JsObject + 'static) -> JsObjectType {
        Rc::new(RefCell::new(ObjectType::Ordinary(Box::new(o))))
    }

    pub fn new_function(f: impl JsFunctionObject + 'static) -> JsObjectType {
        Rc::new(RefCell::new(ObjectType::Function(Box::new(f))))
    }

    pub fn new_proxy(p: LazyProxy) -> JsObjectType {
        Rc::new(RefCell::new(ObjectType::Proxy(Box::new(p))))
    }

    /// Proxies always report callable: their stand-in target is a function.
    pub fn is_callable(&self) -> bool {
        match self {
            ObjectType::Ordinary(_) => false,
            ObjectType::Function(_) => true,
            ObjectType::Proxy(_) => true,
        }
    }

    pub fn as_js_object(&self) -> &dyn JsObject {
        match self {
            ObjectType::Ordinary(o) => o.as_super_trait(),
            ObjectType::Function(o) => o.as_super_trait(),
            ObjectType::Proxy(o) => o.as_super_trait(),
        }
    }

    pub fn as_js_object_mut(&mut self) -> &mut dyn JsObject {
        match self {
            ObjectType::Ordinary(o) => o.as_super_trait_mut(),
            ObjectType::Function(o) => o.as_super_trait_mut(),
            ObjectType::Proxy(o) => o.as_super_trait_mut(),
        }
    }

    pub fn as_lazy_proxy(&self) -> Option<&LazyProxy> {
        match self {
            ObjectType::Proxy(p) => Some(p.deref()),
            _ => None,
        }
    }
}

pub struct ObjectBase {
    pub properties: IndexMap<PropertyKey, PropertyDescriptor>,
    pub is_extensible: bool,
    pub prototype: Option<JsObjectType>,
}
impl ObjectBase {
    pub fn new() -> Self {
        ObjectBase {
            properties: IndexMap::new(),
            is_extensible: true,
            prototype: None,
        }
    }
}
impl Default for ObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

/// The reflective surface every object exposes. Ordinary objects get the default
/// behaviour; lazy proxies override every method to forward to their eventual target.
pub trait JsObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase;

    fn get_object_base(&self) -> &ObjectBase;

    fn as_super_trait(&self) -> &dyn JsObject;

    fn as_super_trait_mut(&mut self) -> &mut dyn JsObject;

    fn get_prototype_of(&self) -> Result<Option<JsObjectType>, JErrorType> {
        Ok(self.get_object_base().prototype.clone())
    }

    fn set_prototype_of(&mut self, prototype: Option<JsObjectType>) -> Result<bool, JErrorType> {
        let unchanged = match (&self.get_object_base().prototype, &prototype) {
            (None, None) => true,
            (Some(current), Some(p)) => Rc::ptr_eq(current, p),
            _ => false,
        };
        if unchanged {
            return Ok(true);
        }
        if !self.is_extensible()? {
            return Ok(false);
        }
        let mut p = prototype.clone();
        while let Some(some_p) = p {
            // A failed borrow means the object is the one being mutated right now, i.e. self.
            let next = match some_p.try_borrow() {
                Err(_) => return Ok(false),
                Ok(o) => {
                    if same_js_object(self.as_super_trait(), o.as_js_object()) {
                        // To prevent circular chain
                        return Ok(false);
                    }
                    o.as_js_object().get_prototype_of()?
                }
            };
            p = next;
        }
        self.get_object_base_mut().prototype = prototype;
        Ok(true)
    }

    fn is_extensible(&self) -> Result<bool, JErrorType> {
        Ok(self.get_object_base().is_extensible)
    }

    fn prevent_extensions(&mut self) -> Result<bool, JErrorType> {
        self.get_object_base_mut().is_extensible = false;
        Ok(true)
    }

    fn get_own_property(
        &self,
        property: &PropertyKey,
    ) -> Result<Option<PropertyDescriptor>, JErrorType> {
        Ok(self.get_object_base().properties.get(property).cloned())
    }

    fn define_own_property(
        &mut self,
        property: PropertyKey,
        descriptor: PropertyDescriptor,
    ) -> Result<bool, JErrorType> {
        Ok(ordinary_define_own_property(self, property, descriptor))
    }

    fn has_property(&self, property: &PropertyKey) -> Result<bool, JErrorType> {
        if self.get_own_property(property)?.is_some() {
            Ok(true)
        } else {
            match self.get_prototype_of()? {
                None => Ok(false),
                Some(o) => o.borrow().as_js_object().has_property(property),
            }
        }
    }

    fn get(&self, property: &PropertyKey, receiver: &JsValue) -> Result<JsValue, JErrorType> {
        match self.get_own_property(property)? {
            None => match self.get_prototype_of()? {
                None => Ok(JsValue::Undefined),
                Some(p) => p.borrow().as_js_object().get(property, receiver),
            },
            Some(PropertyDescriptor::Data { value, .. }) => Ok(value),
            Some(PropertyDescriptor::Accessor { get, .. }) => match get {
                None => Ok(JsValue::Undefined),
                Some(getter) => getter.borrow().as_js_object().call(receiver.clone(), Vec::new()),
            },
        }
    }

    fn set(
        &mut self,
        property: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Result<bool, JErrorType> {
        let descriptor = match self.get_own_property(&property)? {
            Some(d) => Some(d),
            None => match self.get_prototype_of()? {
                None => None,
                Some(p) => lookup_property(&p, &property)?,
            },
        };
        match descriptor {
            Some(PropertyDescriptor::Accessor { set, .. }) => match set {
                None => Ok(false),
                Some(setter) => {
                    setter
                        .borrow()
                        .as_js_object()
                        .call(receiver.clone(), vec![value])?;
                    Ok(true)
                }
            },
            Some(PropertyDescriptor::Data {
                writable: false, ..
            }) => Ok(false),
            _ => {
                let base = self.get_object_base_mut();
                match base.properties.get_mut(&property) {
                    Some(PropertyDescriptor::Data { value: current, .. }) => {
                        *current = value;
                        Ok(true)
                    }
                    Some(PropertyDescriptor::Accessor { .. }) => Ok(false),
                    None => {
                        if base.is_extensible {
                            base.properties
                                .insert(property, PropertyDescriptor::new_data(value));
                            Ok(true)
                        } else {
                            Ok(false)
                        }
                    }
                }
            }
        }
    }

    fn delete(&mut self, property: &PropertyKey) -> Result<bool, JErrorType> {
        let configurable = match self.get_object_base().properties.get(property) {
            None => return Ok(true),
            Some(pd) => pd.is_configurable(),
        };
        if configurable {
            self.get_object_base_mut().properties.shift_remove(property);
        }
        Ok(configurable)
    }

    fn own_property_keys(&self) -> Result<Vec<PropertyKey>, JErrorType> {
        Ok(ordinary_own_property_keys(self.get_object_base()))
    }

    fn call(&self, _this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        Err(JErrorType::TypeError(format!(
            "{} is not a function",
            self.to_string()
        )))
    }

    fn construct(&self, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        Err(JErrorType::TypeError(format!(
            "{} is not a constructor",
            self.to_string()
        )))
    }

    /// Source text of a function, what `Function.prototype.toString` would print.
    fn source_text(&self) -> Option<String> {
        None
    }

    /// `[object Tag]`, where `Tag` is the own `Symbol.toStringTag` string if there is one.
    fn to_string(&self) -> String {
        let tag_key = PropertyKey::Sym(SYMBOL_TO_STRING_TAG.clone());
        match self.get_object_base().properties.get(&tag_key) {
            Some(PropertyDescriptor::Data {
                value: JsValue::String(tag),
                ..
            }) => format!("[object {}]", tag),
            _ => "[object Object]".to_string(),
        }
    }
}

/// Walks the prototype chain starting at `o` looking for `property`.
pub fn lookup_property(
    o: &JsObjectType,
    property: &PropertyKey,
) -> Result<Option<PropertyDescriptor>, JErrorType> {
    let mut current = Some(o.clone());
    while let Some(c) = current {
        let next = {
            let c = c.borrow();
            let obj = c.as_js_object();
            if let Some(d) = obj.get_own_property(property)? {
                return Ok(Some(d));
            }
            obj.get_prototype_of()?
        };
        current = next;
    }
    Ok(None)
}

pub fn ordinary_own_property_keys(base: &ObjectBase) -> Vec<PropertyKey> {
    let mut int_keys = vec![];
    let mut str_keys = vec![];
    let mut sym_keys = vec![];
    for key in base.properties.keys() {
        match key {
            PropertyKey::Int(_) => int_keys.push(key.clone()),
            PropertyKey::Str(_) => str_keys.push(key.clone()),
            PropertyKey::Sym(_) => sym_keys.push(key.clone()),
        }
    }
    int_keys.sort_by_key(|k| match k {
        PropertyKey::Int(i) => *i,
        _ => 0,
    });

    let mut result = int_keys;
    result.append(&mut str_keys);
    result.append(&mut sym_keys);
    result
}

pub fn ordinary_define_own_property<J: JsObject + ?Sized>(
    o: &mut J,
    property: PropertyKey,
    descriptor: PropertyDescriptor,
) -> bool {
    let base = o.get_object_base();
    match base.properties.get(&property) {
        None => {
            if base.is_extensible {
                o.get_object_base_mut()
                    .properties
                    .insert(property, descriptor);
                true
            } else {
                false
            }
        }
        Some(current) => {
            if current == &descriptor {
                return true;
            }
            if !current.is_configurable() {
                if descriptor.is_configurable()
                    || current.is_enumerable() != descriptor.is_enumerable()
                    || current.is_data_descriptor() != descriptor.is_data_descriptor()
                {
                    return false;
                }
                match (current, &descriptor) {
                    (
                        PropertyDescriptor::Data {
                            value: current_value,
                            writable: current_writable,
                            ..
                        },
                        PropertyDescriptor::Data {
                            value: desc_value,
                            writable: desc_writable,
                            ..
                        },
                    ) => {
                        if !*current_writable
                            && (*desc_writable || !same_value(current_value, desc_value))
                        {
                            return false;
                        }
                    }
                    _ => {
                        // Accessors on a non-configurable property can never change.
                        return false;
                    }
                }
            }
            o.get_object_base_mut()
                .properties
                .insert(property, descriptor);
            true
        }
    }
}

pub struct SimpleObject {
    object_base: ObjectBase,
}
impl SimpleObject {
    pub fn new() -> Self {
        SimpleObject {
            object_base: ObjectBase::new(),
        }
    }

    pub fn with_properties<K: Into<PropertyKey>>(props: Vec<(K, JsValue)>) -> Self {
        let mut o = SimpleObject::new();
        for (k, v) in props {
            o.object_base
                .properties
                .insert(k.into(), PropertyDescriptor::new_data(v));
        }
        o
    }
}
impl Default for SimpleObject {
    fn default() -> Self {
        Self::new()
    }
}
impl JsObject for SimpleObject {
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
}
