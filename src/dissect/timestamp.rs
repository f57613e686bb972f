//! Per-packet timestamp rendering.
//!
//! Five modes, selected once at session start by the number of `-t`
//! repetitions.  Delta modes keep state across packets; the engine owns
//! one [`TsState`] per session and resets nothing between packets.

use std::io::{self, Write};

use crate::util::timefmt::localtime;

use super::PacketHeader;

pub const MICROS_PER_SEC: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
    /// `HH:MM:SS.uuuuuu` local time (default).
    Absolute,
    /// No timestamp (`-t`).
    NoTime,
    /// Seconds and microseconds since the epoch (`-tt`).
    Epoch,
    /// Delta from the previous packet (`-ttt`).
    DeltaPrev,
    /// Date plus absolute local time (`-tttt`).
    AbsoluteDate,
    /// Delta from the first packet (`-ttttt`).
    DeltaFirst,
}

impl TimeMode {
    /// Maps the `-t` repetition count; more than five is a usage error.
    pub fn from_count(n: u8) -> Option<TimeMode> {
        match n {
            0 => Some(TimeMode::Absolute),
            1 => Some(TimeMode::NoTime),
            2 => Some(TimeMode::Epoch),
            3 => Some(TimeMode::DeltaPrev),
            4 => Some(TimeMode::AbsoluteDate),
            5 => Some(TimeMode::DeltaFirst),
            _ => None,
        }
    }
}

/// Cross-packet timestamp state.
#[derive(Debug, Default)]
pub struct TsState {
    first: Option<i64>,
    prev: Option<i64>,
}

fn to_micros(h: &PacketHeader) -> i64 {
    h.ts_sec as i64 * MICROS_PER_SEC + h.ts_usec as i64
}

fn write_hms<W: Write + ?Sized>(out: &mut W, total_micros: i64) -> io::Result<()> {
    let (sign, m) = if total_micros < 0 {
        ("-", -total_micros)
    } else {
        ("", total_micros)
    };
    let secs = m / MICROS_PER_SEC;
    let micros = m % MICROS_PER_SEC;
    write!(
        out,
        "{}{:02}:{:02}:{:02}.{:06} ",
        sign,
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        micros
    )
}

impl TsState {
    /// Renders the timestamp for `h` and advances the delta state.
    pub fn ts_print<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        mode: TimeMode,
        h: &PacketHeader,
    ) -> io::Result<()> {
        let now = to_micros(h);
        let first = *self.first.get_or_insert(now);
        let prev = self.prev.replace(now).unwrap_or(now);
        match mode {
            TimeMode::NoTime => Ok(()),
            TimeMode::Epoch => write!(out, "{}.{:06} ", h.ts_sec, h.ts_usec),
            TimeMode::DeltaPrev => write_hms(out, now - prev),
            TimeMode::DeltaFirst => write_hms(out, now - first),
            TimeMode::Absolute | TimeMode::AbsoluteDate => {
                match localtime(h.ts_sec as i64) {
                    Some(tm) => {
                        if mode == TimeMode::AbsoluteDate {
                            write!(
                                out,
                                "{:04}-{:02}-{:02} ",
                                tm.tm_year + 1900,
                                tm.tm_mon + 1,
                                tm.tm_mday
                            )?;
                        }
                        write!(
                            out,
                            "{:02}:{:02}:{:02}.{:06} ",
                            tm.tm_hour, tm.tm_min, tm.tm_sec, h.ts_usec
                        )
                    }
                    // Unrepresentable local time: fall back to raw seconds.
                    None => write!(out, "{}.{:06} ", h.ts_sec, h.ts_usec),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hdr(sec: u32, usec: u32) -> PacketHeader {
        PacketHeader::new(sec, usec, 0, 0)
    }

    fn render(mode: TimeMode, hdrs: &[PacketHeader]) -> Vec<String> {
        let mut st = TsState::default();
        hdrs.iter()
            .map(|h| {
                let mut out = Vec::new();
                st.ts_print(&mut out, mode, h).unwrap();
                String::from_utf8(out).unwrap()
            })
            .collect()
    }

    #[test]
    fn no_time_prints_nothing() {
        let v = render(TimeMode::NoTime, &[hdr(1000, 5)]);
        assert_eq!(v, vec![String::new()]);
    }

    #[test]
    fn epoch_prints_sec_dot_micros() {
        let v = render(TimeMode::Epoch, &[hdr(1704164645, 42)]);
        assert_eq!(v, vec!["1704164645.000042 ".to_owned()]);
    }

    #[test]
    fn delta_first_starts_at_zero_and_stays_nonnegative() {
        let v = render(
            TimeMode::DeltaFirst,
            &[hdr(100, 0), hdr(100, 500_000), hdr(103, 250_000)],
        );
        assert_eq!(v[0], "00:00:00.000000 ");
        assert_eq!(v[1], "00:00:00.500000 ");
        assert_eq!(v[2], "00:00:03.250000 ");
    }

    #[test]
    fn delta_prev_tracks_gaps() {
        let v = render(TimeMode::DeltaPrev, &[hdr(100, 0), hdr(101, 100), hdr(101, 100)]);
        assert_eq!(v[0], "00:00:00.000000 ");
        assert_eq!(v[1], "00:00:01.000100 ");
        assert_eq!(v[2], "00:00:00.000000 ");
    }

    #[test]
    fn delta_prev_negative_gap_is_signed() {
        let v = render(TimeMode::DeltaPrev, &[hdr(100, 0), hdr(99, 0)]);
        assert_eq!(v[1], "-00:00:01.000000 ");
    }

    #[test]
    fn mode_from_count() {
        assert_eq!(TimeMode::from_count(0), Some(TimeMode::Absolute));
        assert_eq!(TimeMode::from_count(5), Some(TimeMode::DeltaFirst));
        assert_eq!(TimeMode::from_count(6), None);
    }
}
