use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObjectType, ObjectType, SimpleObject};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::type_conversion::to_object;
use crate::runner::ds::value::JsValue;

pub fn get(o: &JsObjectType, p: &PropertyKey) -> Result<JsValue, JErrorType> {
    let o1 = o.borrow();
    o1.as_js_object().get(p, &JsValue::Object(o.clone()))
}

/// Property read on any value. Primitives other than nullish ones have no
/// properties in this model and read as `undefined`.
pub fn get_v(v: &JsValue, p: &PropertyKey) -> Result<JsValue, JErrorType> {
    match to_object(v)? {
        JsValue::Object(o) => {
            let o = o.borrow();
            o.as_js_object().get(p, v)
        }
        _ => Ok(JsValue::Undefined),
    }
}

pub fn set_v(v: &JsValue, p: PropertyKey, value: JsValue) -> Result<bool, JErrorType> {
    match v {
        JsValue::Object(o) => o.borrow_mut().as_js_object_mut().set(p, value, v),
        _ => Err(JErrorType::TypeError(format!(
            "Cannot set property '{}' of {}",
            p, v
        ))),
    }
}

pub fn has_property(v: &JsValue, p: &PropertyKey) -> Result<bool, JErrorType> {
    match v {
        JsValue::Object(o) => o.borrow().as_js_object().has_property(p),
        _ => Err(JErrorType::TypeError(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            p, v
        ))),
    }
}

pub fn delete_property(v: &JsValue, p: &PropertyKey) -> Result<bool, JErrorType> {
    match v {
        JsValue::Object(o) => o.borrow_mut().as_js_object_mut().delete(p),
        _ => Ok(true),
    }
}

pub fn get_own_property(
    v: &JsValue,
    p: &PropertyKey,
) -> Result<Option<PropertyDescriptor>, JErrorType> {
    match v {
        JsValue::Object(o) => o.borrow().as_js_object().get_own_property(p),
        _ => Ok(None),
    }
}

pub fn define_property_or_throw(
    v: &JsValue,
    p: PropertyKey,
    descriptor: PropertyDescriptor,
) -> Result<(), JErrorType> {
    match v {
        JsValue::Object(o) => {
            let key = p.to_string();
            if o.borrow_mut()
                .as_js_object_mut()
                .define_own_property(p, descriptor)?
            {
                Ok(())
            } else {
                Err(JErrorType::TypeError(format!(
                    "Cannot redefine property: {}",
                    key
                )))
            }
        }
        _ => Err(JErrorType::TypeError(
            "Object.defineProperty called on non-object".to_string(),
        )),
    }
}

pub fn own_property_keys(v: &JsValue) -> Result<Vec<PropertyKey>, JErrorType> {
    match v {
        JsValue::Object(o) => o.borrow().as_js_object().own_property_keys(),
        _ => Ok(Vec::new()),
    }
}

pub fn get_prototype_of(v: &JsValue) -> Result<Option<JsObjectType>, JErrorType> {
    match v {
        JsValue::Object(o) => o.borrow().as_js_object().get_prototype_of(),
        _ => Ok(None),
    }
}

pub fn call(f: &JsValue, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    match f {
        JsValue::Object(o) => {
            let o = o.borrow();
            if o.is_callable() {
                o.as_js_object().call(this, args)
            } else {
                Err(JErrorType::TypeError(format!("{} is not a function", f)))
            }
        }
        _ => Err(JErrorType::TypeError(format!("{} is not a function", f))),
    }
}

pub fn construct(f: &JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    match f {
        JsValue::Object(o) => o.borrow().as_js_object().construct(args),
        _ => Err(JErrorType::TypeError(format!("{} is not a constructor", f))),
    }
}

/// Source text of a function value, `None` for everything else.
pub fn function_source(v: &JsValue) -> Option<String> {
    match v {
        JsValue::Object(o) => o.try_borrow().ok()?.as_js_object().source_text(),
        _ => None,
    }
}

/// Builds a plain object from `(key, value)` pairs, in order.
pub fn create_object<K: Into<PropertyKey>>(props: Vec<(K, JsValue)>) -> JsValue {
    JsValue::Object(ObjectType::new_ordinary(SimpleObject::with_properties(props)))
}
