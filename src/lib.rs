#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod chain;
pub mod context;
pub mod error;
pub mod tagged;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use chain::format::{
    format_error_with_context, log_error_with_context, print_error_with_context,
    write_error_with_context,
};
pub use chain::{Chain, get_error_chain};
pub use context::{ContextPolicy, ResultExt, wrap_failure};
pub use error::Error;
pub use tagged::failure::{Failure, IntoFailure, NativeError, is_tagged_error_with_context};
pub use tagged::{ErrorVariant, TaggedError, UNKNOWN_ERROR};
