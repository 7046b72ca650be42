use std::rc::Rc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObject, ObjectBase, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::value::JsValue;

/// Behaviour of a native function: `(this, args) -> result`.
pub type NativeFn = Rc<dyn Fn(JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType>>;

pub struct FunctionObjectBase {
    pub name: String,
    /// What `Function.prototype.toString` reports. Code filters match against this.
    pub source: String,
    pub object_base: ObjectBase,
}
impl FunctionObjectBase {
    pub fn new(name: String, source: String) -> Self {
        let mut object_base = ObjectBase::new();
        object_base.properties.insert(
            PropertyKey::from("name"),
            PropertyDescriptor::Data {
                value: JsValue::String(name.clone()),
                writable: false,
                enumerable: false,
                configurable: true,
            },
        );
        FunctionObjectBase {
            name,
            source,
            object_base,
        }
    }

    pub fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.object_base
    }

    pub fn get_object_base(&self) -> &ObjectBase {
        &self.object_base
    }
}

pub trait JsFunctionObject: JsObject {
    fn get_function_object_base_mut(&mut self) -> &mut FunctionObjectBase;

    fn get_function_object_base(&self) -> &FunctionObjectBase;

    fn as_js_function_object(&self) -> &dyn JsFunctionObject;

    fn as_js_function_object_mut(&mut self) -> &mut dyn JsFunctionObject;

    fn name(&self) -> &str {
        &self.get_function_object_base().name
    }
}

/// A function implemented by a Rust closure. Module exports that are functions
/// (components, utilities, store constructors) are modelled with this.
pub struct NativeFunctionObject {
    function_object: FunctionObjectBase,
    behaviour: NativeFn,
    constructor: Option<NativeFn>,
}
impl NativeFunctionObject {
    pub fn new<F>(name: impl Into<String>, source: impl Into<String>, behaviour: F) -> Self
    where
        F: Fn(JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
    {
        NativeFunctionObject {
            function_object: FunctionObjectBase::new(name.into(), source.into()),
            behaviour: Rc::new(behaviour),
            constructor: None,
        }
    }

    /// A function whose only interesting trait is its source text.
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Self {
        NativeFunctionObject::new(name, source, |_, _| Ok(JsValue::Undefined))
    }

    pub fn with_constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(JsValue, Vec<JsValue>) -> Result<JsValue, JErrorType> + 'static,
    {
        self.constructor = Some(Rc::new(constructor));
        self
    }

    pub fn with_property(mut self, key: impl Into<PropertyKey>, value: JsValue) -> Self {
        self.function_object
            .object_base
            .properties
            .insert(key.into(), PropertyDescriptor::new_data(value));
        self
    }

    pub fn into_value(self) -> JsValue {
        JsValue::Object(ObjectType::new_function(self))
    }
}
impl JsObject for NativeFunctionObject {
    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        self.function_object.get_object_base_mut()
    }

    fn get_object_base(&self) -> &ObjectBase {
        self.function_object.get_object_base()
    }

    fn as_super_trait(&self) -> &dyn JsObject {
        self
    }

    fn as_super_trait_mut(&mut self) -> &mut dyn JsObject {
        self
    }

    fn call(&self, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        (self.behaviour)(this, args)
    }

    fn construct(&self, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
        match &self.constructor {
            Some(c) => c(JsValue::Undefined, args),
            None => Err(JErrorType::TypeError(format!(
                "'{}' is not a constructor",
                self.function_object.name
            ))),
        }
    }

    fn source_text(&self) -> Option<String> {
        Some(self.function_object.source.clone())
    }

    fn to_string(&self) -> String {
        self.function_object.source.clone()
    }
}
impl JsFunctionObject for NativeFunctionObject {
    fn get_function_object_base_mut(&mut self) -> &mut FunctionObjectBase {
        &mut self.function_object
    }

    fn get_function_object_base(&self) -> &FunctionObjectBase {
        &self.function_object
    }

    fn as_js_function_object(&self) -> &dyn JsFunctionObject {
        self
    }

    fn as_js_function_object_mut(&mut self) -> &mut dyn JsFunctionObject {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::operations::object::{call, construct, get_v};

    #[test]
    fn test_native_function_call_and_name() {
        let f = NativeFunctionObject::new("add", "function add(a,b){return a+b}", |_, args| {
            let sum: f64 = args
                .iter()
                .map(|a| match a {
                    JsValue::Number(n) => n.as_f64(),
                    _ => 0.0,
                })
                .sum();
            Ok(JsValue::from(sum))
        })
        .into_value();
        assert_eq!(
            call(&f, JsValue::Undefined, vec![JsValue::from(1), JsValue::from(2)]).unwrap(),
            JsValue::from(3.0)
        );
        assert_eq!(
            get_v(&f, &PropertyKey::from("name")).unwrap(),
            JsValue::from("add")
        );
    }

    #[test]
    fn test_construct_without_constructor_is_type_error() {
        let f = NativeFunctionObject::from_source("f", "function f(){}").into_value();
        assert!(matches!(
            construct(&f, vec![]),
            Err(JErrorType::TypeError(_))
        ));
    }
}
