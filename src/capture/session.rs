//! Capture-session orchestration.
//!
//! Owns the input source, wires up signal handling and privilege drop,
//! and drives the per-packet loop into either the dissector (printing)
//! or the rotating savefile writer (`-w`).

use std::io::{LineWriter, Stdout, Write};
use std::sync::atomic::Ordering;

use anyhow::{bail, Context as _};

use crate::dissect::registry::linktype_name;
use crate::dissect::{DissectOptions, Dissector};
use crate::{display, displaylevel};

use super::rotate::{DumpConfig, DumpOutcome, Dumper};
use super::signals;
use super::source::{NextPacket, OfflineSource, PacketSource};
use super::{live, privs, source, stats};

#[derive(Debug, Clone)]
pub enum InputMode {
    /// Capture from a named interface.
    Live(String),
    /// Read one savefile.
    File(String),
    /// Read a file whose lines are savefile paths.
    FileList(String),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub input: InputMode,
    pub snaplen: u32,
    pub promisc: bool,
    /// Stop after this many packets (`-c`).
    pub count: Option<u64>,
    /// Require this link type (`-y`).
    pub linktype_override: Option<u32>,
    /// Write instead of print.
    pub write: Option<DumpConfig>,
    pub user: Option<String>,
    pub chroot_dir: Option<String>,
    /// Stored for the session; compilation is a collaborator this
    /// build does not carry.
    pub filter: Option<String>,
    pub dissect: DissectOptions,
}

enum LoopEnd {
    EndOfInput,
    Broke,
    CountReached,
    FileLimit,
}

enum Sink<'a> {
    Print(&'a mut Dissector<LineWriter<Stdout>>),
    Dump(&'a mut Dumper),
}

/// Runs one capture session to completion.  The returned value is the
/// process exit status.
pub fn run(cfg: SessionConfig) -> anyhow::Result<i32> {
    signals::reset_flags();
    #[cfg(unix)]
    privs::validate(cfg.user.as_deref(), cfg.chroot_dir.as_deref())?;

    if let Some(filter) = cfg.filter.as_deref() {
        if !filter.is_empty() {
            displaylevel!(
                2,
                "netdump: warning: filter '{}' recorded but not applied (no filter engine)\n",
                filter
            );
        }
    }

    #[cfg(unix)]
    {
        signals::install_break_handlers().context("installing signal handlers")?;
        if cfg.write.as_ref().map(|w| w.post_rotate.is_some()) == Some(true) {
            signals::install_child_reaper().context("installing SIGCHLD handler")?;
        }
    }

    match cfg.input.clone() {
        InputMode::Live(iface) => run_live(&cfg, &iface),
        InputMode::File(path) => run_offline(&cfg, &[path]),
        InputMode::FileList(list) => {
            let files = source::read_file_list(&list)
                .with_context(|| format!("reading file list '{}'", list))?;
            run_offline(&cfg, &files)
        }
    }
}

fn check_linktype(cfg: &SessionConfig, dlt: u32, what: &str) -> anyhow::Result<()> {
    if let Some(want) = cfg.linktype_override {
        if want != dlt {
            bail!(
                "{}: link type {} does not match requested type {}",
                what,
                dlt,
                want
            );
        }
        display!(
            "netdump: data link type {}\n",
            linktype_name(want).map(str::to_owned).unwrap_or_else(|| want.to_string())
        );
    }
    Ok(())
}

fn dlt_banner(dlt: u32) -> String {
    match linktype_name(dlt) {
        Some(name) => format!("link-type {} ({})", dlt, name),
        None => format!("link-type {}", dlt),
    }
}

fn run_live(cfg: &SessionConfig, iface: &str) -> anyhow::Result<i32> {
    let mut src = live::open(iface, cfg.snaplen, cfg.promisc)
        .with_context(|| format!("opening interface '{}'", iface))?;
    let dlt = src.datalink();
    check_linktype(cfg, dlt, iface)?;

    if cfg.dissect.verbosity == 0 && cfg.write.is_none() {
        display!("netdump: verbose output suppressed, use -v or -vv for full protocol decode\n");
    }
    display!(
        "netdump: listening on {}, {}, capture size {} bytes\n",
        iface,
        dlt_banner(dlt),
        src.snaplen()
    );

    #[cfg(unix)]
    {
        signals::install_info_handler().context("installing info signal handler")?;
        if cfg.dissect.verbosity > 0 && cfg.write.is_some() {
            signals::install_alarm().context("arming verbose counter")?;
        }
    }

    let mut captured: u64 = 0;
    if let Some(dump_cfg) = cfg.write.clone() {
        let mut dumper = Dumper::open(dump_cfg, dlt, src.snaplen())?;
        drop_privileges(cfg)?;
        pump(&mut src, Sink::Dump(&mut dumper), cfg, &mut captured)?;
        dumper.close()?;
    } else {
        let mut dissector = stdout_dissector(cfg);
        dissector.set_linktype(dlt);
        drop_privileges(cfg)?;
        let end = pump(&mut src, Sink::Print(&mut dissector), cfg, &mut captured)?;
        finish_printing(&mut dissector, &end);
    }

    stats::info("netdump", captured, src.stats().as_ref(), true);
    Ok(0)
}

fn run_offline(cfg: &SessionConfig, files: &[String]) -> anyhow::Result<i32> {
    let mut dissector = if cfg.write.is_none() {
        Some(stdout_dissector(cfg))
    } else {
        None
    };
    let mut dumper: Option<Dumper> = None;
    let mut first_dlt: Option<u32> = None;
    let mut captured: u64 = 0;
    let mut dropped_privs = false;

    for path in files {
        let mut src = OfflineSource::open(path)
            .with_context(|| format!("opening savefile '{}'", path))?;
        let dlt = src.datalink();
        check_linktype(cfg, dlt, path)?;

        // Every file written into one dump stream must share the first
        // file's link type.
        match first_dlt {
            None => first_dlt = Some(dlt),
            Some(prev) => {
                if cfg.write.is_some() && prev != dlt {
                    bail!("{}: new data link type {} does not match the original", path, dlt);
                }
            }
        }

        display!("netdump: reading from file {}, {}\n", path, dlt_banner(dlt));

        if cfg.write.is_some() && dumper.is_none() {
            dumper = Some(Dumper::open(
                cfg.write.clone().expect("write config present"),
                dlt,
                src.snaplen(),
            )?);
        }
        if !dropped_privs {
            drop_privileges(cfg)?;
            dropped_privs = true;
        }

        let end = match (&mut dissector, &mut dumper) {
            (Some(d), None) => {
                d.set_linktype(dlt);
                pump(&mut src, Sink::Print(d), cfg, &mut captured)?
            }
            (None, Some(d)) => pump(&mut src, Sink::Dump(d), cfg, &mut captured)?,
            _ => unreachable!("exactly one sink per session"),
        };

        match end {
            LoopEnd::EndOfInput => continue,
            LoopEnd::Broke | LoopEnd::CountReached | LoopEnd::FileLimit => {
                if let Some(d) = &mut dissector {
                    finish_printing(d, &end);
                }
                if let Some(d) = dumper.take() {
                    d.close()?;
                }
                return Ok(0);
            }
        }
    }

    if let Some(d) = dumper.take() {
        d.close()?;
    }
    Ok(0)
}

fn stdout_dissector(cfg: &SessionConfig) -> Dissector<LineWriter<Stdout>> {
    Dissector::new(cfg.dissect.clone(), LineWriter::new(std::io::stdout()))
}

fn drop_privileges(cfg: &SessionConfig) -> anyhow::Result<()> {
    #[cfg(unix)]
    if let Some(user) = cfg.user.as_deref() {
        privs::droproot(user, cfg.chroot_dir.as_deref())?;
    }
    #[cfg(not(unix))]
    let _ = cfg;
    Ok(())
}

/// A break mid-line leaves a partial packet on stdout; terminate it
/// before statistics hit stderr.
fn finish_printing(d: &mut Dissector<LineWriter<Stdout>>, end: &LoopEnd) {
    if matches!(end, LoopEnd::Broke) {
        let _ = d.writer_mut().write_all(b"\n");
    }
    let _ = d.writer_mut().flush();
}

fn pump(
    src: &mut dyn PacketSource,
    mut sink: Sink<'_>,
    cfg: &SessionConfig,
    captured: &mut u64,
) -> anyhow::Result<LoopEnd> {
    loop {
        if signals::BREAK_REQUESTED.load(Ordering::Relaxed) {
            return Ok(LoopEnd::Broke);
        }
        if signals::INFO_REQUESTED.swap(false, Ordering::Relaxed) {
            stats::info("netdump", *captured, src.stats().as_ref(), false);
        }
        if signals::ALARM_TICK.swap(false, Ordering::Relaxed) {
            display!("Got {}\r", captured);
        }
        match src.next_packet().context("reading packet")? {
            NextPacket::Timeout => continue,
            NextPacket::End => return Ok(LoopEnd::EndOfInput),
            NextPacket::Packet(h, data) => {
                *captured += 1;
                match &mut sink {
                    Sink::Print(d) => d.print_packet(&h, data),
                    Sink::Dump(d) => {
                        if d.dump(&h, data)? == DumpOutcome::FileLimitReached {
                            return Ok(LoopEnd::FileLimit);
                        }
                    }
                }
                if let Some(limit) = cfg.count {
                    if *captured >= limit {
                        return Ok(LoopEnd::CountReached);
                    }
                }
            }
        }
    }
}
