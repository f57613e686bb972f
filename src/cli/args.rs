//! Command-line argument parsing.
//!
//! The entry points are [`parse_args`] (reads `std::env::args()`) and
//! [`parse_args_from`] (takes an explicit slice, suitable for
//! unit-testing).  Both return a [`ParsedArgs`] value capturing every
//! option discovered during the parse.
//!
//! Short options may be aggregated (`-nvvv`); repeatable flags count
//! occurrences (`-ttttt` selects the fifth timestamp mode).  Options
//! that take a value accept it attached (`-s128`) or as the next
//! argument (`-s 128`).  Long options use `--option=VALUE` or
//! `--option VALUE`.  A bare `--` ends option processing; everything
//! after it joins the filter expression.
//!
//! Bad or unrecognised options return an `Err` whose message begins
//! with `"bad usage: "`.

use std::str::FromStr;

use anyhow::{anyhow, bail, Result};

use crate::cli::help::{print_help, print_usage, print_version};

/// Complete set of options produced by the argument parsing loop.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    /// Detail level (`-v`, repeatable).
    pub verbosity: u8,
    /// Timestamp mode selector (`-t`, repeatable).
    pub time_count: u8,
    /// Skip name resolution (`-n`).
    pub numeric: bool,
    /// Print the link-level header (`-e`).
    pub eflag: bool,
    /// Quiet protocol output (`-q`).
    pub qflag: bool,
    /// Hex dump tier (`-x` / `-xx`).
    pub hex: u8,
    /// Hex+ASCII dump tier (`-X` / `-XX`).
    pub hex_ascii: u8,
    /// ASCII dump tier (`-A` / `-AA`).
    pub ascii: u8,
    /// Inhibit the fallback default print (`--suppress-default`).
    pub suppress_default: bool,
    /// Flush stdout after each line (`-l`).
    pub line_flush: bool,
    /// Stop after N packets (`-c`).
    pub count: Option<u64>,
    /// Snapshot length (`-s`); 0 selects the maximum.
    pub snaplen: Option<u32>,
    /// Capture interface (`-i`).
    pub iface: Option<String>,
    /// Disable promiscuous mode (`-p`).
    pub no_promisc: bool,
    /// Read packets from a savefile (`-r`).
    pub read_file: Option<String>,
    /// Read a list of savefile paths (`-V`).
    pub list_file: Option<String>,
    /// Write packets to this file template (`-w`).
    pub write_file: Option<String>,
    /// Size-rotation threshold in millions of bytes (`-C`).
    pub file_size: Option<u64>,
    /// Time-rotation interval in seconds (`-G`).
    pub interval: Option<u64>,
    /// Hard cap on rotated files (`-W`).
    pub max_files: Option<u32>,
    /// Post-rotation command (`-z`).
    pub post_rotate: Option<String>,
    /// Unprivileged user to switch to (`-Z`).
    pub user: Option<String>,
    /// Directory to chroot into (`--chroot`).
    pub chroot_dir: Option<String>,
    /// Requested link type, name or number (`-y`).
    pub linktype: Option<String>,
    /// Flush the savefile after each packet (`-U`).
    pub flush_each: bool,
    /// Read the filter expression from a file (`-F`).
    pub filter_file: Option<String>,
    /// Trailing-argument filter expression.
    pub filter: String,
    /// `-h` / `--help` / `--version` was handled; exit 0.
    pub exit_early: bool,
}

fn parse_num<T: FromStr>(opt: &str, val: &str) -> Result<T> {
    val.parse::<T>()
        .map_err(|_| anyhow!("bad usage: invalid value for -{}: '{}'", opt, val))
}

/// Parses the process arguments (skipping `argv[0]`).
pub fn parse_args() -> Result<ParsedArgs> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    parse_args_from(&argv)
}

/// Parses an explicit argument slice.
pub fn parse_args_from(argv: &[String]) -> Result<ParsedArgs> {
    let mut a = ParsedArgs::default();
    let mut filter_words: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = &argv[i];
        i += 1;

        if arg == "--" {
            filter_words.extend(argv[i..].iter().cloned());
            break;
        }
        if let Some(long) = arg.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((n, v)) => (n, Some(v.to_owned())),
                None => (long, None),
            };
            let mut value = |a_i: &mut usize| -> Result<String> {
                if let Some(v) = inline.clone() {
                    return Ok(v);
                }
                let v = argv
                    .get(*a_i)
                    .cloned()
                    .ok_or_else(|| anyhow!("bad usage: --{} requires a value", name))?;
                *a_i += 1;
                Ok(v)
            };
            match name {
                "help" => {
                    print_help();
                    a.exit_early = true;
                    return Ok(a);
                }
                "version" => {
                    print_version();
                    a.exit_early = true;
                    return Ok(a);
                }
                "chroot" => a.chroot_dir = Some(value(&mut i)?),
                "suppress-default" => a.suppress_default = true,
                other => bail!("bad usage: unknown option --{}", other),
            }
            continue;
        }
        if let Some(cluster) = arg.strip_prefix('-') {
            if cluster.is_empty() {
                bail!("bad usage: empty option");
            }
            let mut chars = cluster.char_indices();
            while let Some((pos, c)) = chars.next() {
                // Value-taking options consume the rest of the cluster
                // or the next argument.
                let mut value = |i: &mut usize| -> Result<String> {
                    let rest = &cluster[pos + c.len_utf8()..];
                    if !rest.is_empty() {
                        return Ok(rest.to_owned());
                    }
                    let v = argv
                        .get(*i)
                        .cloned()
                        .ok_or_else(|| anyhow!("bad usage: -{} requires a value", c))?;
                    *i += 1;
                    Ok(v)
                };
                let took_value = matches!(
                    c,
                    'c' | 'C' | 'F' | 'G' | 'i' | 'r' | 's' | 'V' | 'w' | 'W' | 'y' | 'z' | 'Z'
                );
                match c {
                    'A' => a.ascii = (a.ascii + 1).min(2),
                    'e' => a.eflag = true,
                    'h' => {
                        print_help();
                        a.exit_early = true;
                        return Ok(a);
                    }
                    'l' => a.line_flush = true,
                    'n' => a.numeric = true,
                    'p' => a.no_promisc = true,
                    'q' => a.qflag = true,
                    't' => a.time_count = a.time_count.saturating_add(1),
                    'U' => a.flush_each = true,
                    'v' => a.verbosity = (a.verbosity + 1).min(5),
                    'x' => a.hex = (a.hex + 1).min(2),
                    'X' => a.hex_ascii = (a.hex_ascii + 1).min(2),
                    'c' => a.count = Some(parse_num::<u64>("c", &value(&mut i)?)?),
                    'C' => a.file_size = Some(parse_num::<u64>("C", &value(&mut i)?)?),
                    'F' => a.filter_file = Some(value(&mut i)?),
                    'G' => a.interval = Some(parse_num::<u64>("G", &value(&mut i)?)?),
                    'i' => a.iface = Some(value(&mut i)?),
                    'r' => a.read_file = Some(value(&mut i)?),
                    's' => a.snaplen = Some(parse_num::<u32>("s", &value(&mut i)?)?),
                    'V' => a.list_file = Some(value(&mut i)?),
                    'w' => a.write_file = Some(value(&mut i)?),
                    'W' => a.max_files = Some(parse_num::<u32>("W", &value(&mut i)?)?),
                    'y' => a.linktype = Some(value(&mut i)?),
                    'z' => a.post_rotate = Some(value(&mut i)?),
                    'Z' => a.user = Some(value(&mut i)?),
                    other => bail!("bad usage: unknown option -{}", other),
                }
                if took_value {
                    // The remainder of the cluster was the value.
                    break;
                }
            }
            continue;
        }
        filter_words.push(arg.clone());
    }

    a.filter = filter_words.join(" ");
    validate(&a)?;
    Ok(a)
}

/// Combination checks; every message begins with `bad usage: ` so the
/// caller can print usage once.
fn validate(a: &ParsedArgs) -> Result<()> {
    if a.time_count > 5 {
        bail!("bad usage: only -t, -tt, -ttt, -tttt and -ttttt are supported");
    }
    if a.read_file.is_some() && a.list_file.is_some() {
        bail!("bad usage: -V and -r are mutually exclusive");
    }
    if a.write_file.is_none() {
        for (set, opt) in [
            (a.file_size.is_some(), "-C"),
            (a.interval.is_some(), "-G"),
            (a.max_files.is_some(), "-W"),
            (a.post_rotate.is_some(), "-z"),
            (a.flush_each, "-U"),
        ] {
            if set {
                bail!("bad usage: {} requires -w", opt);
            }
        }
    }
    if a.max_files.is_some() && a.file_size.is_none() && a.interval.is_none() {
        bail!("bad usage: -W requires -C or -G");
    }
    if a.file_size == Some(0) {
        bail!("bad usage: invalid file size 0");
    }
    if a.interval == Some(0) {
        bail!("bad usage: invalid rotation interval 0");
    }
    if a.read_file.is_none() && a.list_file.is_none() && a.iface.is_none() {
        print_usage();
        bail!("bad usage: no interface (-i) and no savefile (-r / -V)");
    }
    if a.filter_file.is_some() && !a.filter.is_empty() {
        bail!("bad usage: -F and a filter expression are mutually exclusive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ParsedArgs> {
        let v: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_args_from(&v)
    }

    #[test]
    fn aggregated_flags_and_counts() {
        let a = parse(&["-nvvv", "-tt", "-r", "x.pcap"]).unwrap();
        assert!(a.numeric);
        assert_eq!(a.verbosity, 3);
        assert_eq!(a.time_count, 2);
        assert_eq!(a.read_file.as_deref(), Some("x.pcap"));
    }

    #[test]
    fn attached_and_detached_values() {
        let a = parse(&["-s128", "-i", "eth0"]).unwrap();
        assert_eq!(a.snaplen, Some(128));
        assert_eq!(a.iface.as_deref(), Some("eth0"));
    }

    #[test]
    fn rotation_options() {
        let a = parse(&[
            "-r", "in.pcap", "-w", "out.pcap", "-C", "1", "-W", "3", "-z", "/bin/gzip", "-G", "60",
        ])
        .unwrap();
        assert_eq!(a.file_size, Some(1));
        assert_eq!(a.max_files, Some(3));
        assert_eq!(a.interval, Some(60));
        assert_eq!(a.post_rotate.as_deref(), Some("/bin/gzip"));
    }

    #[test]
    fn rotation_needs_write_file() {
        let err = parse(&["-r", "in.pcap", "-C", "1"]).unwrap_err();
        assert!(err.to_string().contains("-C requires -w"), "{}", err);
    }

    #[test]
    fn max_files_needs_a_rotation_trigger() {
        let err = parse(&["-r", "in.pcap", "-w", "o", "-W", "3"]).unwrap_err();
        assert!(err.to_string().contains("-W requires -C or -G"), "{}", err);
    }

    #[test]
    fn six_t_is_too_many() {
        let err = parse(&["-tttttt", "-r", "x"]).unwrap_err();
        assert!(err.to_string().contains("-ttttt"), "{}", err);
    }

    #[test]
    fn trailing_words_become_filter() {
        let a = parse(&["-r", "x.pcap", "tcp", "port", "80"]).unwrap();
        assert_eq!(a.filter, "tcp port 80");
    }

    #[test]
    fn double_dash_ends_options() {
        let a = parse(&["-r", "x.pcap", "--", "-v", "net"]).unwrap();
        assert_eq!(a.filter, "-v net");
        assert_eq!(a.verbosity, 0);
    }

    #[test]
    fn long_options() {
        let a = parse(&["-r", "x", "-Z", "nobody", "--chroot=/var/empty"]).unwrap();
        assert_eq!(a.chroot_dir.as_deref(), Some("/var/empty"));
        assert_eq!(a.user.as_deref(), Some("nobody"));
    }

    #[test]
    fn unknown_option_is_bad_usage() {
        let err = parse(&["-k"]).unwrap_err();
        assert!(err.to_string().starts_with("bad usage: "), "{}", err);
    }

    #[test]
    fn input_source_required() {
        let err = parse(&["-n"]).unwrap_err();
        assert!(err.to_string().contains("no interface"), "{}", err);
    }

    #[test]
    fn v_and_r_exclusive() {
        let err = parse(&["-r", "a", "-V", "b"]).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"), "{}", err);
    }
}
