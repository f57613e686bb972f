//! Binary entry point for the `netdump` command-line tool.
//!
//! Translates parsed options into a session configuration, runs the
//! capture session, and maps every startup failure to exit status 1
//! with a `netdump:`-prefixed message on stderr.

use anyhow::{anyhow, bail};

use netdump::capture::rotate::DumpConfig;
use netdump::capture::{InputMode, SessionConfig};
use netdump::cli::args::{parse_args, ParsedArgs};
use netdump::config::{DEFAULT_SNAPLEN, MAXIMUM_SNAPLEN, ROTATE_SIZE_UNIT};
use netdump::dissect::registry::linktype_from_str;
use netdump::dissect::{DissectOptions, TimeMode};

fn build_config(args: ParsedArgs) -> anyhow::Result<SessionConfig> {
    let time_mode = TimeMode::from_count(args.time_count)
        .ok_or_else(|| anyhow!("only -t, -tt, -ttt, -tttt and -ttttt are supported"))?;

    let dissect = DissectOptions {
        verbosity: args.verbosity,
        time_mode,
        numeric: args.numeric,
        eflag: args.eflag,
        qflag: args.qflag,
        hex: args.hex,
        hex_ascii: args.hex_ascii,
        ascii: args.ascii,
        suppress_default: args.suppress_default,
        line_flush: args.line_flush,
    };

    let snaplen = match args.snaplen {
        None => DEFAULT_SNAPLEN,
        Some(0) => MAXIMUM_SNAPLEN,
        Some(n) => n.min(MAXIMUM_SNAPLEN),
    };

    let input = if let Some(file) = args.read_file {
        InputMode::File(file)
    } else if let Some(list) = args.list_file {
        InputMode::FileList(list)
    } else if let Some(iface) = args.iface {
        InputMode::Live(iface)
    } else {
        bail!("no interface (-i) and no savefile (-r / -V)");
    };

    let linktype_override = match args.linktype.as_deref() {
        None => None,
        Some(s) => Some(
            linktype_from_str(s).ok_or_else(|| anyhow!("unknown data link type '{}'", s))?,
        ),
    };

    let write = args.write_file.map(|template| DumpConfig {
        template,
        max_size: args.file_size.map(|mb| mb * ROTATE_SIZE_UNIT),
        interval: args.interval,
        max_files: args.max_files,
        post_rotate: args.post_rotate.clone(),
        flush_each: args.flush_each,
    });

    let filter = match args.filter_file {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| anyhow!("reading filter file '{}': {}", path, e))?;
            Some(text.trim().to_owned())
        }
        None => {
            if args.filter.is_empty() {
                None
            } else {
                Some(args.filter)
            }
        }
    };

    Ok(SessionConfig {
        input,
        snaplen,
        promisc: !args.no_promisc,
        count: args.count,
        linktype_override,
        write,
        user: args.user,
        chroot_dir: args.chroot_dir,
        filter,
        dissect,
    })
}

fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("netdump: {}", e);
            std::process::exit(1);
        }
    };
    if args.exit_early {
        std::process::exit(0);
    }

    let cfg = match build_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("netdump: {}", e);
            std::process::exit(1);
        }
    };

    match netdump::capture::run(cfg) {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("netdump: {:#}", e);
            std::process::exit(1);
        }
    }
}
