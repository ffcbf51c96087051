//! Task body evaluation

use crate::error::JsExecutionError;
use crate::js_executor::conversion::{js_to_json, json_to_js};
use boa_engine::error::JsNativeErrorKind;
use boa_engine::{
    property::PropertyKey, Context as BoaContext, JsError, JsObject, JsString, JsValue, Source,
};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Evaluate `body` and call its entry point with `(job, sandbox)`.
///
/// The entry point is, in order: the body itself when it is a function
/// expression, a global `main` defined by the body, or the value of the
/// body's last expression when that is callable.
pub fn execute_task_body(
    body: &str,
    job: &JsonValue,
    sandbox: &JsonValue,
) -> Result<JsonValue, JsExecutionError> {
    let (mut context, entry_point) = resolve_entry_point(body)?;

    let job_arg = json_to_js(&mut context, job)?;
    let sandbox_arg = json_to_js(&mut context, sandbox)?;

    let result = entry_point
        .call(&JsValue::undefined(), &[job_arg, sandbox_arg], &mut context)
        .map_err(|e| JsExecutionError::Thrown(thrown_message(&e, &mut context)))?;

    js_to_json(&mut context, result)
}

fn resolve_entry_point(body: &str) -> Result<(BoaContext, JsObject), JsExecutionError> {
    // Anonymous functions only parse in expression position
    let mut context = BoaContext::default();
    if let Ok(value) = context.eval(Source::from_bytes(&format!("(\n{}\n)", body))) {
        if let Some(function) = value.as_callable() {
            debug!("Using function expression as entry point");
            let function = function.clone();
            return Ok((context, function));
        }
    }

    let mut context = BoaContext::default();
    let script_result = context
        .eval(Source::from_bytes(body))
        .map_err(|e| classify_eval_error(&e, &mut context))?;

    let main = context
        .global_object()
        .get(PropertyKey::from(JsString::from("main")), &mut context)
        .map_err(|e| JsExecutionError::Thrown(thrown_message(&e, &mut context)))?;

    if let Some(function) = main.as_callable() {
        debug!("Using named main function as entry point");
        let function = function.clone();
        return Ok((context, function));
    }

    if let Some(function) = script_result.as_callable() {
        debug!("Using script result as entry point");
        let function = function.clone();
        return Ok((context, function));
    }

    Err(JsExecutionError::NotCallable)
}

fn classify_eval_error(error: &JsError, context: &mut BoaContext) -> JsExecutionError {
    match error.try_native(context) {
        Ok(native) if matches!(native.kind, JsNativeErrorKind::Syntax) => {
            JsExecutionError::CompileError(native.message().to_string())
        }
        _ => JsExecutionError::Thrown(thrown_message(error, context)),
    }
}

/// Text reported for a thrown value: a thrown string as is, an error
/// object's message, otherwise the value's display form
fn thrown_message(error: &JsError, context: &mut BoaContext) -> String {
    if let Some(text) = error.as_opaque().and_then(JsValue::as_string) {
        return text.to_std_string_escaped();
    }

    match error.try_native(context) {
        Ok(native) if !native.message().is_empty() => native.message().to_string(),
        Ok(native) => native.to_string(),
        Err(_) => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(body: &str) -> Result<JsonValue, JsExecutionError> {
        execute_task_body(body, &json!({"uuid": "job-1", "chain_results": []}), &json!({"region": "eu"}))
    }

    #[test]
    fn test_function_expression() {
        let result = run("function(job, sandbox) { return { id: job.uuid, region: sandbox.region }; }");
        assert_eq!(result.unwrap(), json!({"id": "job-1", "region": "eu"}));
    }

    #[test]
    fn test_arrow_function() {
        assert_eq!(run("(job) => 40 + 2").unwrap(), json!(42));
    }

    #[test]
    fn test_named_main() {
        let body = "var factor = 2;\nfunction main(job) { return job.chain_results.length * factor; }";
        assert_eq!(run(body).unwrap(), json!(0));
    }

    #[test]
    fn test_undefined_result_is_null() {
        assert_eq!(run("function(job) { }").unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_thrown_string() {
        let err = run("function(job) { throw 'queued'; }").unwrap_err();
        assert_eq!(err, JsExecutionError::Thrown("queued".to_string()));
    }

    #[test]
    fn test_thrown_error_object() {
        let err = run("function(job) { throw new Error('boom'); }").unwrap_err();
        assert_eq!(err, JsExecutionError::Thrown("boom".to_string()));
    }

    #[test]
    fn test_reference_error() {
        let err = run("function(job) { return missing.value; }").unwrap_err();
        assert!(matches!(err, JsExecutionError::Thrown(_)));
    }

    #[test]
    fn test_not_callable() {
        assert_eq!(run("var x = 1;").unwrap_err(), JsExecutionError::NotCallable);
    }

    #[test]
    fn test_syntax_error() {
        let err = run("function(job) { return ; ; }}").unwrap_err();
        assert!(matches!(err, JsExecutionError::CompileError(_)));
    }
}
