//! Local-time conversion and `strftime` expansion.
//!
//! Timestamp rendering and the date placeholders of the `-w` filename
//! template both need broken-down local time.  Rust's standard library
//! does not expose the C locale's time formatting, so these helpers call
//! `localtime_r` and `strftime` directly.

use std::ffi::CString;

use crate::config::PATH_MAX;

/// Converts a Unix timestamp to broken-down local time.
///
/// Returns `None` if the timestamp is not representable.
pub fn localtime(t: i64) -> Option<libc::tm> {
    let time: libc::time_t = t as libc::time_t;
    // SAFETY: localtime_r writes the full `tm` out-param on success and
    // returns NULL on failure; the zeroed value is never read otherwise.
    unsafe {
        let mut tm: libc::tm = std::mem::zeroed();
        if libc::localtime_r(&time, &mut tm).is_null() {
            None
        } else {
            Some(tm)
        }
    }
}

/// Expands `%`-placeholders in `fmt` against `tm`, like `strftime(3)`.
///
/// The result is bounded by the platform path limit; `None` means the
/// expansion did not fit or the format string contained an interior NUL.
pub fn strftime(fmt: &str, tm: &libc::tm) -> Option<String> {
    let cfmt = CString::new(fmt).ok()?;
    let mut buf = vec![0u8; PATH_MAX + 1];
    // SAFETY: buf outlives the call and its length is passed alongside.
    let n = unsafe {
        libc::strftime(
            buf.as_mut_ptr() as *mut libc::c_char,
            buf.len(),
            cfmt.as_ptr(),
            tm,
        )
    };
    // A return of 0 is ambiguous in strftime; an empty format legally
    // produces it, anything else means the buffer did not fit.
    if n == 0 && !fmt.is_empty() {
        return None;
    }
    buf.truncate(n);
    String::from_utf8(buf).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tm() -> libc::tm {
        // 2024-01-02 03:04:05 local, weekday/yday filled in by mktime rules
        // not needed for the formats exercised here.
        // SAFETY: plain-old-data out-param pattern, every read field is set.
        let mut tm: libc::tm = unsafe { std::mem::zeroed() };
        tm.tm_year = 124;
        tm.tm_mon = 0;
        tm.tm_mday = 2;
        tm.tm_hour = 3;
        tm.tm_min = 4;
        tm.tm_sec = 5;
        tm
    }

    #[test]
    fn strftime_expands_date_placeholders() {
        let s = strftime("cap-%Y%m%d-%H%M%S.pcap", &sample_tm()).unwrap();
        assert_eq!(s, "cap-20240102-030405.pcap");
    }

    #[test]
    fn strftime_passes_through_literal_text() {
        let s = strftime("plain-name.pcap", &sample_tm()).unwrap();
        assert_eq!(s, "plain-name.pcap");
    }

    #[test]
    fn strftime_rejects_interior_nul() {
        assert!(strftime("bad\0name", &sample_tm()).is_none());
    }

    #[test]
    fn localtime_accepts_epoch() {
        let tm = localtime(0).unwrap();
        assert!(tm.tm_year >= 69); // 1969 or 1970 depending on zone
    }
}
