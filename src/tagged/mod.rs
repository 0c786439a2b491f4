pub mod failure;

use std::borrow::Cow;
use std::str::FromStr;

use crate::error::Error;
use crate::tagged::failure::{Failure, IntoFailure};

/// Tag of the leaf synthesized when a non-tagged failure is wrapped.
pub const UNKNOWN_ERROR: ErrorVariant = ErrorVariant::new("UnknownError");

/// A constructor for [`TaggedError`] values sharing one tag.
///
/// Variants are usually declared as constants:
///
/// ```
/// use tagged_error_context::ErrorVariant;
///
/// const NETWORK_ERROR: ErrorVariant = ErrorVariant::new("NetworkError");
///
/// let err = NETWORK_ERROR.error("Connection timeout");
/// assert_eq!(err.tag(), "NetworkError");
/// ```
///
/// Two variants built from the same tag string produce interchangeable
/// errors. Tag collisions are not detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorVariant {
    tag: Cow<'static, str>,
}

impl ErrorVariant {
    pub const fn new(tag: &'static str) -> Self {
        Self {
            tag: Cow::Borrowed(tag),
        }
    }

    /// Variant for a tag only known at runtime.
    pub fn dynamic(tag: impl Into<String>) -> Self {
        Self {
            tag: Cow::Owned(tag.into()),
        }
    }

    /// Variant for a member of a closed tag enumeration, e.g. an enum deriving
    /// `strum_macros::IntoStaticStr`.
    pub fn of(tag: impl Into<&'static str>) -> Self {
        Self::new(tag.into())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Leaf error of this variant.
    pub fn error(&self, message: impl Into<String>) -> TaggedError {
        TaggedError::new(self.tag.clone(), message)
    }

    /// Error of this variant wrapping `cause`.
    pub fn caused_by(&self, message: impl Into<String>, cause: TaggedError) -> TaggedError {
        self.error(message).with_cause(cause)
    }

    pub fn matches(&self, err: &TaggedError) -> bool {
        self.tag == err.tag
    }
}

/// A failure carrying a tag, a message, an optional context and an optional
/// cause.
///
/// Fields are only readable after construction. The `with_*` builders
/// consume the value, so a node that has been handed out is never changed;
/// adding context means building a new outer node.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[error("{tag}: {message}")]
pub struct TaggedError {
    #[serde(rename = "_tag")]
    tag: Cow<'static, str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[source]
    cause: Option<Box<Failure>>,
}

impl TaggedError {
    pub fn new(tag: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
            context: None,
            cause: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_cause(self, cause: TaggedError) -> Self {
        self.with_raw_cause(Failure::Tagged(cause))
    }

    /// Attaches a cause of any kind. A non-tagged cause ends chain traversal
    /// but is still rendered.
    pub fn with_raw_cause(mut self, cause: impl IntoFailure) -> Self {
        self.cause = Some(Box::new(cause.into_failure()));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// The cause, if it is itself a tagged error.
    pub fn cause(&self) -> Option<&TaggedError> {
        self.cause.as_deref().and_then(Failure::as_tagged)
    }

    pub fn raw_cause(&self) -> Option<&Failure> {
        self.cause.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.cause.is_none()
    }

    /// Parses the tag into a closed enumeration so callers can match on it
    /// exhaustively.
    pub fn parse_tag<T: FromStr>(&self) -> Option<T> {
        self.tag.parse().ok()
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        match Failure::from_json(value) {
            Failure::Tagged(err) => Ok(err),
            other => Err(Error::Parse {
                reason: format!(
                    "expected string `_tag` and `message` fields, found {} value",
                    other.kind()
                ),
            }),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }
}

// Unlinks the cause chain one node at a time; the derived drop would recurse
// once per level.
impl Drop for TaggedError {
    fn drop(&mut self) {
        let mut next = self.cause.take();
        while let Some(mut failure) = next {
            next = match failure.as_mut() {
                Failure::Tagged(inner) => inner.cause.take(),
                Failure::Foreign { .. } | Failure::Other(_) => None,
            };
        }
    }
}

impl<'de> serde::Deserialize<'de> for TaggedError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}
