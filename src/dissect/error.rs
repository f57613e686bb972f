//! Error kinds of the dissection engine.
//!
//! Two kinds exist and they deliberately behave differently:
//!
//! - [`Truncated`]: the capture ran out before a required field.  Strict
//!   cursor reads produce it and printers propagate it with `?`; it
//!   unwinds every intermediate printer frame until the dispatch
//!   boundary catches it and decorates the line with ` [|proto]`.
//! - *Invalid*: the bytes are present but nonsensical.  That one never
//!   unwinds; a printer reports it inline through
//!   [`Context::invalid`](crate::dissect::Context::invalid) and carries
//!   on or returns normally.

use std::fmt;

/// Raised when a read would cross the current snapshot end.
///
/// Deliberately a unit type: by the time the dispatch boundary sees it,
/// everything worth saying is already on the output line, and the
/// protocol tag for the ` [|proto]` decoration lives in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncated;

impl fmt::Display for Truncated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("packet data truncated")
    }
}

impl std::error::Error for Truncated {}

/// Result type threaded through every printer.
pub type DissectResult<T> = Result<T, Truncated>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_displays() {
        assert_eq!(Truncated.to_string(), "packet data truncated");
    }

    fn propagates() -> DissectResult<u8> {
        fn inner() -> DissectResult<u8> {
            Err(Truncated)
        }
        let v = inner()?;
        Ok(v)
    }

    #[test]
    fn question_mark_unwinds() {
        assert_eq!(propagates(), Err(Truncated));
    }
}
