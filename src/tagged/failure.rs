use serde_json::{Map, Value};

use crate::tagged::TaggedError;

/// Any failure value, classified once at the boundary where it enters the
/// crate.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(untagged)]
pub enum Failure {
    /// A value already shaped as a tagged error.
    #[error(transparent)]
    Tagged(TaggedError),
    /// A native error object. The first line of `trace` repeats `message`.
    #[error("{message}")]
    Foreign {
        message: String,
        #[serde(rename = "stack", skip_serializing_if = "Option::is_none")]
        trace: Option<String>,
    },
    /// Anything else, kept as its string conversion.
    #[error("{0}")]
    Other(String),
}

impl Failure {
    /// Classifies a Rust error. Its `source()` chain becomes the trace.
    pub fn foreign(err: &dyn std::error::Error) -> Self {
        let message = err.to_string();
        let mut lines = vec![message.clone()];
        let mut source = err.source();
        while let Some(inner) = source {
            lines.push(format!("  {inner}"));
            source = inner.source();
        }
        let trace = (lines.len() > 1).then(|| lines.join("\n"));
        Self::Foreign { message, trace }
    }

    pub fn foreign_with_trace(message: impl Into<String>, trace: Option<String>) -> Self {
        Self::Foreign {
            message: message.into(),
            trace,
        }
    }

    pub fn other(value: impl Into<String>) -> Self {
        Self::Other(value.into())
    }

    pub fn null() -> Self {
        Self::Other("null".to_string())
    }

    pub fn undefined() -> Self {
        Self::Other("undefined".to_string())
    }

    /// Classifies an arbitrary JSON value. Never fails.
    pub fn from_json(value: &Value) -> Self {
        let Value::Object(fields) = value else {
            return Self::Other(js_string(value));
        };

        let tag = fields.get("_tag").and_then(Value::as_str);
        let message = fields.get("message").and_then(Value::as_str);
        match (tag, message) {
            (Some(tag), Some(message)) => Self::Tagged(tagged_from_fields(tag, message, fields)),
            (None, Some(message)) => Self::Foreign {
                message: message.to_string(),
                trace: fields
                    .get("stack")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            _ => Self::Other(js_string(value)),
        }
    }

    pub fn is_tagged(&self) -> bool {
        matches!(self, Self::Tagged(_))
    }

    pub fn as_tagged(&self) -> Option<&TaggedError> {
        match self {
            Self::Tagged(err) => Some(err),
            Self::Foreign { .. } | Self::Other(_) => None,
        }
    }

    pub fn into_tagged(self) -> Result<TaggedError, Self> {
        match self {
            Self::Tagged(err) => Ok(err),
            other => Err(other),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Tagged(err) => err.message(),
            Self::Foreign { message, .. } | Self::Other(message) => message,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tagged(_) => "tagged",
            Self::Foreign { .. } => "foreign",
            Self::Other(_) => "other",
        }
    }
}

impl From<TaggedError> for Failure {
    fn from(err: TaggedError) -> Self {
        Self::Tagged(err)
    }
}

impl<'de> serde::Deserialize<'de> for Failure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

/// True iff `value` is an object with string `_tag` and `message` fields.
pub fn is_tagged_error_with_context(value: &Value) -> bool {
    value.as_object().is_some_and(|fields| {
        fields.get("_tag").is_some_and(Value::is_string)
            && fields.get("message").is_some_and(Value::is_string)
    })
}

fn tagged_from_fields(tag: &str, message: &str, fields: &Map<String, Value>) -> TaggedError {
    let mut err = TaggedError::new(tag.to_string(), message);
    if let Some(context) = fields.get("context").and_then(Value::as_str) {
        err = err.with_context(context);
    }
    if let Some(cause) = fields.get("cause").filter(|cause| is_truthy(cause)) {
        err = err.with_raw_cause(Failure::from_json(cause));
    }
    err
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String conversion following JavaScript's `String(value)`.
fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => js_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                if item.is_null() {
                    String::new()
                } else {
                    js_string(item)
                }
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Number formatting following JavaScript's `Number.prototype.toString()`:
/// integral values carry no fraction and magnitudes outside `[1e-6, 1e21)`
/// use exponent notation with an explicit sign.
fn js_number(n: &serde_json::Number) -> String {
    let Some(x) = n.as_f64().filter(|_| n.is_f64()) else {
        return n.to_string();
    };
    if x.classify() == std::num::FpCategory::Zero {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&x.abs()) {
        return x.to_string();
    }
    let exponential = format!("{x:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}

/// Conversion of a failure value into a [`Failure`].
pub trait IntoFailure {
    fn into_failure(self) -> Failure;
}

impl IntoFailure for Failure {
    fn into_failure(self) -> Failure {
        self
    }
}

impl IntoFailure for TaggedError {
    fn into_failure(self) -> Failure {
        Failure::Tagged(self)
    }
}

impl IntoFailure for Value {
    fn into_failure(self) -> Failure {
        Failure::from_json(&self)
    }
}

impl IntoFailure for String {
    fn into_failure(self) -> Failure {
        Failure::Other(self)
    }
}

impl IntoFailure for &str {
    fn into_failure(self) -> Failure {
        Failure::Other(self.to_string())
    }
}

macro_rules! impl_native_failure {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoFailure for $ty {
                fn into_failure(self) -> Failure {
                    Failure::foreign(&self)
                }
            }
        )+
    };
}

impl_native_failure!(
    std::io::Error,
    std::fmt::Error,
    std::num::ParseIntError,
    std::num::ParseFloatError,
    std::str::Utf8Error,
    std::string::FromUtf8Error,
    serde_json::Error,
    strum::ParseError,
    crate::error::Error,
);

impl IntoFailure for Box<dyn std::error::Error + Send + Sync> {
    fn into_failure(self) -> Failure {
        Failure::foreign(&*self)
    }
}

impl IntoFailure for Box<dyn std::error::Error> {
    fn into_failure(self) -> Failure {
        Failure::foreign(&*self)
    }
}

/// Wraps any `std::error::Error` without a dedicated [`IntoFailure`] impl.
#[derive(Debug)]
pub struct NativeError<E>(pub E);

impl<E: std::error::Error> IntoFailure for NativeError<E> {
    fn into_failure(self) -> Failure {
        Failure::foreign(&self.0)
    }
}
