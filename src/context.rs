use crate::tagged::failure::{Failure, IntoFailure};
use crate::tagged::{ErrorVariant, TaggedError, UNKNOWN_ERROR};

/// Message selection for a new node whose cause is not a tagged error.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContextPolicy {
    /// Keep the failure's own message on the new node and drop the context.
    #[default]
    PreserveCauseMessage,
    /// Always use the context as the new node's message.
    AlwaysContext,
}

/// Wraps `failure` in a new `variant` node.
///
/// `context` is called exactly once. A tagged failure becomes the cause
/// as-is; any other failure is replaced by an `UnknownError` leaf carrying its
/// message, and `policy` decides the new node's message.
pub fn wrap_failure<F, C>(
    variant: &ErrorVariant,
    failure: Failure,
    policy: ContextPolicy,
    context: F,
) -> TaggedError
where
    F: FnOnce() -> C,
    C: Into<String>,
{
    let context: String = context().into();
    tracing::trace!(
        tag = variant.tag(),
        cause_kind = failure.kind(),
        "wrapping failure"
    );

    match failure {
        Failure::Tagged(cause) => variant.caused_by(context, cause),
        Failure::Foreign { message, .. } | Failure::Other(message) => {
            let leaf = UNKNOWN_ERROR.error(message.clone());
            let message = match policy {
                ContextPolicy::PreserveCauseMessage => {
                    tracing::debug!(
                        tag = variant.tag(),
                        discarded_context = %context,
                        "cause is not a tagged error, keeping its message"
                    );
                    message
                }
                ContextPolicy::AlwaysContext => context,
            };
            variant.caused_by(message, leaf)
        }
    }
}

/// Context wrapping for fallible results.
///
/// ```
/// use tagged_error_context::{ErrorVariant, ResultExt, TaggedError};
///
/// const API_ERROR: ErrorVariant = ErrorVariant::new("APIError");
/// const IMAGE_ERROR: ErrorVariant = ErrorVariant::new("ImageProcessingError");
///
/// let result: Result<(), TaggedError> = Err(API_ERROR.error("Unsupported image format: WEBP"));
/// let err = result
///     .with_tagged_context(&IMAGE_ERROR, || "Failed to generate alt text")
///     .unwrap_err();
///
/// assert_eq!(err.tag(), "ImageProcessingError");
/// assert_eq!(err.cause().map(TaggedError::tag), Some("APIError"));
/// ```
pub trait ResultExt<T> {
    /// Rebinds the error to `variant`, computing the context only on failure.
    fn with_tagged_context<F, C>(self, variant: &ErrorVariant, context: F) -> Result<T, TaggedError>
    where
        F: FnOnce() -> C,
        C: Into<String>;

    fn with_tagged_context_using<F, C>(
        self,
        variant: &ErrorVariant,
        policy: ContextPolicy,
        context: F,
    ) -> Result<T, TaggedError>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: IntoFailure> ResultExt<T> for Result<T, E> {
    fn with_tagged_context<F, C>(self, variant: &ErrorVariant, context: F) -> Result<T, TaggedError>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.with_tagged_context_using(variant, ContextPolicy::default(), context)
    }

    fn with_tagged_context_using<F, C>(
        self,
        variant: &ErrorVariant,
        policy: ContextPolicy,
        context: F,
    ) -> Result<T, TaggedError>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|err| wrap_failure(variant, err.into_failure(), policy, context))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::cell::Cell;

    use strum::IntoEnumIterator;

    use super::*;

    const FILE_ERROR: ErrorVariant = ErrorVariant::new("FileError");
    const PARSE_ERROR: ErrorVariant = ErrorVariant::new("ParseError");
    const VALIDATION_ERROR: ErrorVariant = ErrorVariant::new("ValidationError");

    fn lcg_next(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        *state
    }

    #[test]
    fn tagged_failure_becomes_cause() {
        let result: Result<(), TaggedError> = Err(FILE_ERROR.error("File config.json not found"));
        let err = result
            .with_tagged_context(&PARSE_ERROR, || "Failed to parse configuration")
            .with_tagged_context(&VALIDATION_ERROR, || "Invalid application settings")
            .unwrap_err();

        let tags: Vec<_> = err.chain().map(TaggedError::tag).collect();
        assert_eq!(tags, ["ValidationError", "ParseError", "FileError"]);
        assert_eq!(err.message(), "Invalid application settings");
        assert_eq!(
            err.cause().unwrap().message(),
            "Failed to parse configuration"
        );
        assert_eq!(
            err.root_cause().message(),
            "File config.json not found"
        );
    }

    #[test]
    fn foreign_failure_keeps_its_message_by_default() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("x"));
        let err = result
            .with_tagged_context(&PARSE_ERROR, || "discarded")
            .unwrap_err();

        assert_eq!(err.tag(), "ParseError");
        assert_eq!(err.message(), "x");
        assert_eq!(err.cause(), Some(&UNKNOWN_ERROR.error("x")));
        assert!(err.cause().unwrap().is_leaf());
    }

    #[test]
    fn other_values_use_string_conversion() {
        let err = wrap_failure(
            &PARSE_ERROR,
            Failure::null(),
            ContextPolicy::default(),
            || "discarded",
        );
        assert_eq!(err.message(), "null");
        assert_eq!(err.cause(), Some(&UNKNOWN_ERROR.error("null")));

        let result: Result<u8, &str> = Err("String error");
        let err = result
            .with_tagged_context(&PARSE_ERROR, || "discarded")
            .unwrap_err();
        assert_eq!(err.message(), "String error");
        assert_eq!(err.cause(), Some(&UNKNOWN_ERROR.error("String error")));
    }

    #[test]
    fn always_context_policy_uses_context_for_foreign_failures() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("x"));
        let err = result
            .with_tagged_context_using(&PARSE_ERROR, ContextPolicy::AlwaysContext, || "c")
            .unwrap_err();

        assert_eq!(err.message(), "c");
        assert_eq!(err.cause(), Some(&UNKNOWN_ERROR.error("x")));
    }

    #[test]
    fn policy_does_not_change_tagged_wrapping() {
        for policy in [ContextPolicy::PreserveCauseMessage, ContextPolicy::AlwaysContext] {
            let err = wrap_failure(
                &PARSE_ERROR,
                Failure::Tagged(FILE_ERROR.error("missing")),
                policy,
                || "loading",
            );
            assert_eq!(err, PARSE_ERROR.caused_by("loading", FILE_ERROR.error("missing")));
        }
    }

    #[test]
    fn context_is_not_evaluated_on_success() {
        let calls = Cell::new(0_u32);
        let result: Result<u8, TaggedError> = Ok(7);
        let value = result
            .with_tagged_context(&PARSE_ERROR, || {
                calls.set(calls.get() + 1);
                "never"
            })
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn context_is_evaluated_once_on_failure() {
        for failure in [
            Failure::Tagged(FILE_ERROR.error("missing")),
            Failure::foreign_with_trace("boom", None),
            Failure::undefined(),
        ] {
            let calls = Cell::new(0_u32);
            let result: Result<(), Failure> = Err(failure);
            let _ = result.with_tagged_context(&PARSE_ERROR, || {
                calls.set(calls.get() + 1);
                format!("attempt {}", calls.get())
            });
            assert_eq!(calls.get(), 1);
        }
    }

    #[test]
    fn fallible_context_producer_reports_after_wrapping() {
        let producer = |fail: bool| -> Result<String, String> {
            if fail {
                Err("context lookup failed".to_string())
            } else {
                Ok("loading settings".to_string())
            }
        };

        for fail in [false, true] {
            let mut thrown = None;
            let err = wrap_failure(
                &PARSE_ERROR,
                Failure::Tagged(FILE_ERROR.error("missing")),
                ContextPolicy::default(),
                || producer(fail).unwrap_or_else(|e| {
                    thrown = Some(e);
                    String::new()
                }),
            );

            assert_eq!(thrown.is_some(), fail);
            let expected = if fail { "" } else { "loading settings" };
            assert_eq!(err.message(), expected);
            assert_eq!(err.depth(), 2);
        }
    }

    #[test]
    fn each_application_adds_exactly_one_node() {
        let variants = [FILE_ERROR, PARSE_ERROR, VALIDATION_ERROR];
        let mut seed = 0x00C0_FFEE_u64;

        for n in 0..64_usize {
            let mut result: Result<(), TaggedError> = Err(FILE_ERROR.error("origin"));
            for step in 0..n {
                let variant = &variants[(lcg_next(&mut seed) % 3) as usize];
                result = result.with_tagged_context(variant, || format!("layer {step}"));
            }

            let err = result.unwrap_err();
            assert_eq!(err.depth(), n + 1);
            assert_eq!(err.root_cause(), &FILE_ERROR.error("origin"));
            if n > 0 {
                assert_eq!(err.message(), format!("layer {}", n - 1));
            }
        }
    }

    #[test]
    fn foreign_failure_normalizes_to_two_node_chain() {
        let result: Result<(), serde_json::Value> =
            Err(serde_json::json!({"message": "Regular error", "stack": "Error: Regular error"}));
        let err = result
            .with_tagged_context(&PARSE_ERROR, || "ignored")
            .unwrap_err();

        assert_eq!(err.depth(), 2);
        assert_eq!(err.root_cause().tag(), "UnknownError");
    }

    #[test]
    fn policy_string_forms() {
        assert_eq!(
            "always_context".parse::<ContextPolicy>().ok(),
            Some(ContextPolicy::AlwaysContext)
        );
        assert_eq!(
            ContextPolicy::PreserveCauseMessage.to_string(),
            "preserve_cause_message"
        );
        assert!("sometimes".parse::<ContextPolicy>().is_err());
        assert_eq!(
            serde_json::from_str::<ContextPolicy>(r#""always_context""#).unwrap(),
            ContextPolicy::AlwaysContext
        );
        assert_eq!(ContextPolicy::default(), ContextPolicy::PreserveCauseMessage);

        let names: Vec<_> = ContextPolicy::iter().map(|p| p.as_ref().to_string()).collect();
        assert_eq!(names, ["preserve_cause_message", "always_context"]);
    }
}
