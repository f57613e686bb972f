//! Hex and ASCII dump rendering.
//!
//! These produce the `-x` / `-X` / `-A` output tiers and back the
//! default print for unclaimed payloads.  Layout: 16 bytes per line, an
//! `0x....:` offset column, hex in two-byte groups, and (for the
//! combined form) a printable-ASCII gutter.

use std::io::{self, Write};

const BYTES_PER_LINE: usize = 16;

fn gutter_char(b: u8) -> char {
    if (0x20..=0x7e).contains(&b) {
        b as char
    } else {
        '.'
    }
}

/// Hex dump with an ASCII gutter, each line prefixed by `indent`.
/// No trailing newline; the caller owns line termination.
pub fn hex_and_ascii_print<W: Write + ?Sized>(
    out: &mut W,
    indent: &str,
    data: &[u8],
) -> io::Result<()> {
    for (i, line) in data.chunks(BYTES_PER_LINE).enumerate() {
        write!(out, "{}0x{:04x}:", indent, i * BYTES_PER_LINE)?;
        let mut width = 0;
        for pair in line.chunks(2) {
            match pair {
                [a, b] => {
                    write!(out, " {:02x}{:02x}", a, b)?;
                    width += 5;
                }
                [a] => {
                    write!(out, " {:02x}", a)?;
                    width += 3;
                }
                _ => unreachable!(),
            }
        }
        // Align the gutter with full-width lines: 8 groups of 5 chars.
        for _ in width..(BYTES_PER_LINE / 2) * 5 {
            out.write_all(b" ")?;
        }
        out.write_all(b"  ")?;
        for &b in line {
            write!(out, "{}", gutter_char(b))?;
        }
    }
    Ok(())
}

/// Hex dump without the ASCII gutter.
pub fn hex_print<W: Write + ?Sized>(out: &mut W, indent: &str, data: &[u8]) -> io::Result<()> {
    for (i, line) in data.chunks(BYTES_PER_LINE).enumerate() {
        write!(out, "{}0x{:04x}:", indent, i * BYTES_PER_LINE)?;
        for pair in line.chunks(2) {
            match pair {
                [a, b] => write!(out, " {:02x}{:02x}", a, b)?,
                [a] => write!(out, " {:02x}", a)?,
                _ => unreachable!(),
            }
        }
    }
    Ok(())
}

/// Raw ASCII rendering: printable bytes and newlines pass through, a CR
/// that precedes an LF is dropped, everything else becomes `.`.
pub fn ascii_print<W: Write + ?Sized>(out: &mut W, data: &[u8]) -> io::Result<()> {
    out.write_all(b"\n")?;
    let mut iter = data.iter().peekable();
    while let Some(&b) = iter.next() {
        let c = match b {
            b'\n' => '\n',
            b'\r' => {
                if matches!(iter.peek(), Some(b'\n')) {
                    continue;
                }
                '.'
            }
            _ => gutter_char(b),
        };
        write!(out, "{}", c)?;
    }
    Ok(())
}
