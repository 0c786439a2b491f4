use std::io::{self, Write};

use crate::tagged::TaggedError;
use crate::tagged::failure::Failure;

const INDENT: &str = "  ";

/// Renders `failure` and its causes as multi-line diagnostic text.
///
/// Each level of cause is indented by two more spaces:
///
/// ```text
/// Error [ServiceError]: Service unavailable
///   Caused by:
///   Error [DatabaseError]: Database connection failed
/// ```
///
/// The output carries no trailing newline. Rendering walks the chain in a
/// loop, so stack usage does not grow with its depth.
pub fn format_error_with_context(failure: &Failure) -> String {
    let mut lines = Vec::new();
    collect_failure(failure, 0, &mut lines);
    lines.join("\n")
}

/// Writes the rendering of `failure` followed by a newline.
pub fn write_error_with_context<W: Write>(writer: &mut W, failure: &Failure) -> io::Result<()> {
    writeln!(writer, "{}", format_error_with_context(failure))
}

pub fn print_error_with_context(failure: &Failure) -> io::Result<()> {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    write_error_with_context(&mut handle, failure)
}

/// Emits the rendering of `failure` as a single `tracing` error event.
pub fn log_error_with_context(failure: &Failure) {
    let rendered = format_error_with_context(failure);
    match failure.as_tagged() {
        Some(err) => tracing::error!(tag = err.tag(), depth = err.depth(), "{rendered}"),
        None => tracing::error!(kind = failure.kind(), "{rendered}"),
    }
}

impl TaggedError {
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        collect_tagged(self, 0, &mut lines);
        lines.join("\n")
    }
}

fn collect_failure(failure: &Failure, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    match failure {
        Failure::Tagged(err) => collect_tagged(err, depth, lines),
        Failure::Foreign { message, trace } => {
            lines.push(format!("{indent}Error: {message}"));
            if let Some(trace) = trace {
                // first line repeats the message
                lines.extend(trace.split('\n').skip(1).map(|line| format!("{indent}{line}")));
            }
        }
        Failure::Other(value) => lines.push(format!("{indent}Error: {value}")),
    }
}

/// Pushes `first` and every tagged cause below it, then hands a non-tagged
/// cause, if any, to [`collect_failure`].
fn collect_tagged(first: &TaggedError, mut depth: usize, lines: &mut Vec<String>) {
    let mut err = first;
    loop {
        let indent = INDENT.repeat(depth);
        lines.push(format!("{indent}Error [{}]: {}", err.tag(), err.message()));

        if let Some(context) = err.context()
            && !context.is_empty()
            && context != err.message()
        {
            lines.push(format!("{indent}{INDENT}Context: {context}"));
        }

        let Some(cause) = err.raw_cause() else {
            return;
        };
        lines.push(format!("{indent}{INDENT}Caused by:"));
        depth += 1;

        match cause {
            Failure::Tagged(inner) => err = inner,
            terminal => return collect_failure(terminal, depth, lines),
        }
    }
}
