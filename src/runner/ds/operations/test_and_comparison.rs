use crate::runner::ds::object::JsObject;
use crate::runner::ds::value::{JsNumberType, JsValue};
use std::ptr;
use std::rc::Rc;

/// `SameValue`: like `===` except `NaN` equals itself.
pub fn same_value(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
        (JsValue::Number(na), JsValue::Number(nb)) => match (na, nb) {
            (JsNumberType::NaN, JsNumberType::NaN) => true,
            (JsNumberType::NaN, _) | (_, JsNumberType::NaN) => false,
            _ => na.as_f64() == nb.as_f64(),
        },
        (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

pub fn same_js_object<J: JsObject + ?Sized>(a: &J, b: &J) -> bool {
    ptr::eq(a.get_object_base(), b.get_object_base())
}
