//! Capture statistics reporting.

use crate::display;
use crate::util::plural_suffix;

use super::source::CaptureStats;

/// Prints the end-of-session or on-request statistics block to stderr.
///
/// `verbose` selects the line-per-counter layout used at session end;
/// the compact comma-joined form is used when servicing an info request
/// mid-capture.
pub fn info(program: &str, captured: u64, stats: Option<&CaptureStats>, verbose: bool) {
    let sep = if verbose { "\n" } else { ", " };
    if !verbose {
        display!("{}: ", program);
    }
    display!(
        "{} packet{} captured",
        captured,
        plural_suffix(captured)
    );
    let Some(st) = stats else {
        display!("\n");
        return;
    };
    display!(
        "{}{} packet{} received by filter",
        sep,
        st.recv,
        plural_suffix(st.recv as u64)
    );
    display!(
        "{}{} packet{} dropped by kernel",
        sep,
        st.dropped,
        plural_suffix(st.dropped as u64)
    );
    if st.ifdrop != 0 {
        display!(
            "{}{} packet{} dropped by interface",
            sep,
            st.ifdrop,
            plural_suffix(st.ifdrop as u64)
        );
    }
    display!("\n");
}

#[cfg(test)]
mod tests {
    use crate::util::plural_suffix;

    #[test]
    fn wording_pluralizes() {
        assert_eq!(format!("{} packet{} captured", 1u64, plural_suffix(1)), "1 packet captured");
        assert_eq!(
            format!("{} packet{} captured", 5u64, plural_suffix(5)),
            "5 packets captured"
        );
    }
}
