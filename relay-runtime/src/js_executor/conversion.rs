//! JavaScript data conversion utilities

use crate::error::JsExecutionError;
use boa_engine::{property::PropertyKey, Context as BoaContext, JsString, JsValue, Source};
use serde_json::Value as JsonValue;
use tracing::trace;

const RESULT_SLOT: &str = "__relay_result";

/// Convert a JSON value into a JavaScript value owned by `context`
pub fn json_to_js(context: &mut BoaContext, value: &JsonValue) -> Result<JsValue, JsExecutionError> {
    JsValue::from_json(value, context).map_err(|e| JsExecutionError::InvalidInput(e.to_string()))
}

/// Convert a JavaScript result to JSON with `JSON.stringify` semantics.
///
/// Values that stringify to `undefined` (functions, `undefined` itself)
/// become `null`.
pub fn js_to_json(context: &mut BoaContext, value: JsValue) -> Result<JsonValue, JsExecutionError> {
    if value.is_undefined() {
        return Ok(JsonValue::Null);
    }

    context
        .global_object()
        .set(PropertyKey::from(JsString::from(RESULT_SLOT)), value, true, context)
        .map_err(|e| JsExecutionError::InvalidOutputFormat(e.to_string()))?;

    let stringified = context
        .eval(Source::from_bytes(&format!("JSON.stringify({})", RESULT_SLOT)))
        .map_err(|e| JsExecutionError::InvalidOutputFormat(e.to_string()))?;

    if stringified.is_undefined() {
        trace!("Task result has no JSON representation, using null");
        return Ok(JsonValue::Null);
    }

    let json_str = stringified
        .to_string(context)
        .map_err(|e| JsExecutionError::InvalidOutputFormat(e.to_string()))?
        .to_std_string()
        .map_err(|e| JsExecutionError::InvalidOutputFormat(e.to_string()))?;

    serde_json::from_str(&json_str).map_err(|e| JsExecutionError::InvalidOutputFormat(e.to_string()))
}
