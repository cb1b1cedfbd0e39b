//! Small helpers shared by the codecs and the connection state machines.

/// Returns early with `$error` when `$predicate` does not hold.
///
/// Reads like `assert!`, but turns the failed check into an `Err` instead of a panic:
///
/// ```ignore
/// ensure!(fields <= limits.max_headers, ParseError::head_too_large("too many header fields"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Splits a comma separated header value into trimmed, non-empty tokens.
pub(crate) fn split_tokens(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    value.split(|b| *b == b',').map(<[u8]>::trim_ascii).filter(|token| !token.is_empty())
}
