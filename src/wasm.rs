use strum::IntoEnumIterator;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::chain::{self, format};
use crate::context::{ContextPolicy, wrap_failure};
use crate::tagged::failure::Failure;
use crate::tagged::{ErrorVariant, TaggedError};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = JSON)]
    fn parse(s: &str) -> JsValue;

    #[wasm_bindgen(js_name = Error)]
    type JsError;

    #[wasm_bindgen(method, getter)]
    fn message(this: &JsError) -> JsValue;

    #[wasm_bindgen(method, getter)]
    fn stack(this: &JsError) -> JsValue;

    #[wasm_bindgen(method, getter = _tag)]
    fn tag(this: &JsError) -> JsValue;

    #[wasm_bindgen(method, getter)]
    fn context(this: &JsError) -> JsValue;

    #[wasm_bindgen(method, getter)]
    fn cause(this: &JsError) -> JsValue;
    #[wasm_bindgen(js_name = Function)]
    pub type JsContextFn;

    #[wasm_bindgen(method, catch, js_name = call)]
    fn call0(this: &JsContextFn, receiver: &JsValue) -> Result<JsValue, JsValue>;
}

fn to_js(value: &serde_json::Value) -> JsValue {
    match serde_json::to_string(value) {
        Ok(json_str) => parse(&json_str),
        Err(_) => JsValue::NULL,
    }
}

fn tagged_to_js(err: &TaggedError) -> JsValue {
    match serde_json::to_value(err) {
        Ok(value) => to_js(&value),
        Err(_) => JsValue::NULL,
    }
}

fn parse_policy(policy: Option<String>) -> ContextPolicy {
    policy
        .as_deref()
        .and_then(|p| p.parse::<ContextPolicy>().ok())
        .unwrap_or_default()
}

/// `Error` instances keep `message`, `stack` and `cause` outside their
/// enumerable fields, so they are read through getters instead of serde.
fn failure_from_js_error(err: &JsError) -> Failure {
    let message = err.message().as_string().unwrap_or_default();
    let Some(tag) = err.tag().as_string() else {
        return Failure::foreign_with_trace(message, err.stack().as_string());
    };

    let mut tagged = TaggedError::new(tag, message);
    if let Some(context) = err.context().as_string() {
        tagged = tagged.with_context(context);
    }
    let cause = err.cause();
    if cause.is_truthy() {
        tagged = tagged.with_raw_cause(failure_from_js(&cause));
    }
    Failure::Tagged(tagged)
}

fn failure_from_js(value: &JsValue) -> Failure {
    if value.is_undefined() {
        return Failure::undefined();
    }
    if let Some(err) = value.dyn_ref::<JsError>() {
        return failure_from_js_error(err);
    }
    match serde_wasm_bindgen::from_value::<serde_json::Value>(value.clone()) {
        Ok(json) => Failure::from_json(&json),
        Err(_) => Failure::other(value.as_string().unwrap_or_else(|| format!("{value:?}"))),
    }
}

/// Render any thrown or failed value as diagnostic text.
#[wasm_bindgen]
pub fn format_error_with_context(error: JsValue) -> String {
    format::format_error_with_context(&failure_from_js(&error))
}

/// Check whether a value is shaped as a tagged error.
#[wasm_bindgen]
pub fn wasm_is_tagged_error_with_context(value: JsValue) -> bool {
    failure_from_js(&value).is_tagged()
}

/// Returns the tagged errors of a chain, outermost first.
#[wasm_bindgen]
pub fn get_error_chain(error: JsValue) -> JsValue {
    let failure = failure_from_js(&error);
    let nodes: Vec<serde_json::Value> = chain::get_error_chain(&failure)
        .into_iter()
        .filter_map(|err| serde_json::to_value(err).ok())
        .collect();
    to_js(&serde_json::Value::Array(nodes))
}

/// Wrap a failure in a new tagged node. `context` is a zero-argument
/// function, called once while wrapping; a non-string result counts as an
/// empty context. An exception thrown by it propagates to the caller.
#[wasm_bindgen]
pub fn with_tagged_context(
    tag: &str,
    context: &JsContextFn,
    error: JsValue,
    policy: Option<String>,
) -> Result<JsValue, JsValue> {
    let variant = ErrorVariant::dynamic(tag);
    let mut thrown = None;
    let wrapped = wrap_failure(
        &variant,
        failure_from_js(&error),
        parse_policy(policy),
        || match context.call0(&JsValue::UNDEFINED) {
            Ok(value) => value.as_string().unwrap_or_default(),
            Err(exception) => {
                thrown = Some(exception);
                String::new()
            }
        },
    );
    match thrown {
        Some(exception) => Err(exception),
        None => Ok(tagged_to_js(&wrapped)),
    }
}

/// Accepted values for the `policy` argument of `with_tagged_context`.
#[wasm_bindgen]
pub fn wasm_context_policy_names() -> JsValue {
    let names: Vec<serde_json::Value> = ContextPolicy::iter()
        .map(|p| serde_json::Value::String(p.as_ref().to_string()))
        .collect();
    to_js(&serde_json::Value::Array(names))
}
