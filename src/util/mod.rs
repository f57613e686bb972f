//! Cross-cutting helpers used by the CLI, dissection, and capture layers.
//!
//! Submodules:
//! - [`timefmt`] — thin wrappers over `localtime_r` / `strftime` for
//!   timestamp rendering and date-expanded output filenames
//!
//! The most commonly needed symbols are re-exported at the `util` level.

pub mod timefmt;

pub use timefmt::{localtime, strftime};

// ── Grammar helpers ───────────────────────────────────────────────────────────

/// Returns `"s"` when `n` calls for a plural noun, `""` otherwise.
///
/// Used by the statistics report: `1 packet captured`, `2 packets captured`.
pub fn plural_suffix(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
