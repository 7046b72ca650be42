//! Registry dumps in JSON.
//!
//! ```json
//! {
//!   "modules": {
//!     "12": { "getUser": { "$function": "function(e){return n[e]}" } },
//!     "34": { "default": { "constructor": { "displayName": "UserStore" } } }
//!   },
//!   "factories": { "12": "function(e,t,n){n.d(t,{getUser:()=>r})}" }
//! }
//! ```
//!
//! Exports objects become ordinary objects, arrays become array-like objects and
//! `{"$function": "<source>", "name": "...", "props": {...}}` becomes a function
//! object with that source text and those own properties. `{"$symbol": "react.memo"}`
//! is a symbol (`{"$symbol": null}` a fresh anonymous one). Objects flagged
//! `"__esModule": true` get the `Symbol.toStringTag` of an ES module namespace.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runner::ds::function_object::NativeFunctionObject;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::object::create_object;
use crate::runner::ds::operations::object::define_property_or_throw;
use crate::runner::ds::symbol::{SymbolData, SYMBOL_TO_STRING_TAG};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::webpack::error::WebpackError;
use crate::runner::webpack::registry::{ModuleFactory, ModuleId, ModuleRegistry};

const FUNCTION_MARKER: &str = "$function";
const SYMBOL_MARKER: &str = "$symbol";
const ES_MODULE_FLAG: &str = "__esModule";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Snapshot {
    #[serde(default)]
    pub modules: IndexMap<String, Value>,
    #[serde(default)]
    pub factories: IndexMap<String, String>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, WebpackError> {
        let content = fs::read_to_string(path).map_err(|error| WebpackError::Io {
            path: path.display().to_string(),
            error,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, WebpackError> {
        serde_json::from_str(content).map_err(|e| WebpackError::Snapshot(e.to_string()))
    }

    /// Defines every factory, then inserts every module in file order. Insertions
    /// go through the registry's hooks like any other.
    pub fn populate(&self, registry: &ModuleRegistry) -> Result<(), WebpackError> {
        for (id, source) in &self.factories {
            registry.define_factory(ModuleId::from(id.as_str()), ModuleFactory::from_source(source.as_str()));
        }
        for (id, exports) in &self.modules {
            registry.insert(ModuleId::from(id.as_str()), json_to_value(exports)?);
        }
        Ok(())
    }
}

pub fn json_to_value(json: &Value) -> Result<JsValue, WebpackError> {
    Ok(match json {
        Value::Null => JsValue::Null,
        Value::Bool(b) => JsValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => JsValue::Number(JsNumberType::Integer(i)),
            None => JsValue::Number(JsNumberType::from_f64(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => JsValue::String(s.clone()),
        Value::Array(items) => {
            let array = create_object::<u32>(vec![]);
            for (i, item) in items.iter().enumerate() {
                define_property_or_throw(
                    &array,
                    (i as u32).into(),
                    PropertyDescriptor::new_data(json_to_value(item)?),
                )?;
            }
            define_property_or_throw(
                &array,
                "length".into(),
                PropertyDescriptor::new_hidden(JsValue::from(items.len() as i64)),
            )?;
            array
        }
        Value::Object(map) => match map.get(FUNCTION_MARKER) {
            Some(Value::String(source)) => {
                let name = map.get("name").and_then(Value::as_str).unwrap_or("");
                let mut function = NativeFunctionObject::from_source(name, source.as_str());
                if let Some(props) = map.get("props") {
                    let props = props.as_object().ok_or_else(|| {
                        WebpackError::Snapshot("\"props\" of a function must be an object".to_string())
                    })?;
                    for (k, v) in props {
                        function = function.with_property(k.as_str(), json_to_value(v)?);
                    }
                }
                function.into_value()
            }
            Some(_) => {
                return Err(WebpackError::Snapshot(format!(
                    "\"{}\" must hold the function's source text",
                    FUNCTION_MARKER
                )))
            }
            None => match map.get(SYMBOL_MARKER) {
                Some(Value::String(description)) => JsValue::Symbol(SymbolData::new(description.as_str())),
                Some(Value::Null) => JsValue::Symbol(SymbolData::new_empty()),
                Some(_) => {
                    return Err(WebpackError::Snapshot(format!(
                        "\"{}\" must be a description or null",
                        SYMBOL_MARKER
                    )))
                }
                None => {
                    let mut props = Vec::with_capacity(map.len());
                    for (k, v) in map {
                        props.push((k.as_str(), json_to_value(v)?));
                    }
                    let object = create_object(props);
                    if map.get(ES_MODULE_FLAG) == Some(&Value::Bool(true)) {
                        define_property_or_throw(
                            &object,
                            PropertyKey::Sym(SYMBOL_TO_STRING_TAG.clone()),
                            PropertyDescriptor::new_hidden(JsValue::from("Module")),
                        )?;
                    }
                    object
                }
            },
        },
    })
}
