//! Output-file rotation: by size, by wall-clock interval, with a hard
//! file-count cap, and an optional post-rotation command.
//!
//! Rotation is checked on the packet path, not on a timer: a time
//! boundary takes effect on the first packet written after it elapses.
//! When a time boundary and a size boundary coincide, the time rotation
//! wins (the fresh file is empty, so the size check cannot also fire).

use std::io;

use anyhow::{anyhow, bail, Context as _};

use crate::config::PATH_MAX;
use crate::dissect::PacketHeader;
use crate::displaylevel;
use crate::util::timefmt::{localtime, strftime};

use super::savefile::SavefileWriter;

/// Everything `-w` and friends configure.
#[derive(Debug, Clone, Default)]
pub struct DumpConfig {
    /// Output filename, possibly holding `strftime` placeholders.
    pub template: String,
    /// Size-rotation threshold in bytes (`-C`, already scaled).
    pub max_size: Option<u64>,
    /// Time-rotation interval in seconds (`-G`).
    pub interval: Option<u64>,
    /// Hard cap on the number of files written (`-W`).
    pub max_files: Option<u32>,
    /// Command to run on each closed file (`-z`).
    pub post_rotate: Option<String>,
    /// Flush the writer after every packet (`-U`).
    pub flush_each: bool,
}

/// Width of the numeric suffix appended under size rotation: the digit
/// count of the highest suffix that can occur.
pub fn suffix_width(max_files: Option<u32>) -> usize {
    match max_files {
        None | Some(0) | Some(1) => 0,
        Some(w) => {
            let mut x = w - 1;
            let mut chars = 0;
            while x > 0 {
                chars += 1;
                x /= 10;
            }
            chars
        }
    }
}

/// Expands the filename template: `strftime` placeholders against `tm`
/// when time rotation is active, then the zero-padded numeric suffix
/// when size rotation is active.  The result must fit the platform
/// path bound.
pub fn make_filename(
    template: &str,
    tm: Option<&libc::tm>,
    cnt: Option<u32>,
    width: usize,
) -> anyhow::Result<String> {
    let base = match tm {
        Some(tm) => strftime(template, tm)
            .ok_or_else(|| anyhow!("filename template expansion failed"))?,
        None => template.to_owned(),
    };
    let name = match cnt {
        Some(c) => format!("{}{:0>w$}", base, c, w = width),
        None => base,
    };
    if name.len() > PATH_MAX {
        bail!("too many output files or filename is too long (> {})", PATH_MAX);
    }
    Ok(name)
}

/// Forks a child that runs `cmd closed_path` at the lowest scheduling
/// priority; the parent returns immediately and the SIGCHLD reaper
/// collects the exit status.
#[cfg(unix)]
fn spawn_post_rotate(cmd: &str, closed_path: &str) {
    use std::ffi::CString;

    use nix::unistd::{fork, ForkResult};

    let (Ok(ccmd), Ok(carg)) = (CString::new(cmd), CString::new(closed_path)) else {
        displaylevel!(1, "netdump: post-rotate command contains NUL\n");
        return;
    };
    // SAFETY: the child only makes async-signal-safe calls before exec.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => {}
        Ok(ForkResult::Child) => {
            unsafe {
                libc::setpriority(libc::PRIO_PROCESS, 0, 19);
            }
            let argv = [ccmd.clone(), carg];
            let _ = nix::unistd::execvp(&ccmd, &argv);
            // exec failed; nothing sensible left to do in the child.
            unsafe { libc::_exit(1) }
        }
        Err(e) => {
            displaylevel!(1, "netdump: fork for post-rotate command: {}\n", e);
        }
    }
}

#[cfg(not(unix))]
fn spawn_post_rotate(_cmd: &str, _closed_path: &str) {
    displaylevel!(1, "netdump: post-rotate commands are not supported here\n");
}

/// Outcome of writing one packet through the rotation policy.
#[derive(Debug, PartialEq, Eq)]
pub enum DumpOutcome {
    Written,
    /// The file-count cap was reached; the capture stops cleanly.
    FileLimitReached,
}

pub struct Dumper {
    cfg: DumpConfig,
    writer: Option<SavefileWriter>,
    current_name: String,
    linktype: u32,
    snaplen: u32,
    /// Numeric suffix of the file currently open.
    seq: u32,
    /// Files opened so far, the current one included.
    files_written: u32,
    /// Wall-clock anchor of the current time-rotation window.
    rotation_start: i64,
    width: usize,
}

impl Dumper {
    /// Opens the first output file.
    pub fn open(cfg: DumpConfig, linktype: u32, snaplen: u32) -> anyhow::Result<Self> {
        let width = suffix_width(cfg.max_files);
        let rotation_start = now();
        let tm = rotation_tm(&cfg, rotation_start)?;
        let cnt = cfg.max_size.map(|_| 0);
        let name = make_filename(&cfg.template, tm.as_ref(), cnt, width)?;
        let writer = SavefileWriter::create(&name, linktype, snaplen)
            .with_context(|| format!("opening output file '{}'", name))?;
        Ok(Dumper {
            cfg,
            writer: Some(writer),
            current_name: name,
            linktype,
            snaplen,
            seq: 0,
            files_written: 1,
            rotation_start,
            width,
        })
    }

    pub fn current_name(&self) -> &str {
        &self.current_name
    }

    /// Applies the rotation policy, then writes the packet.
    pub fn dump(&mut self, h: &PacketHeader, data: &[u8]) -> anyhow::Result<DumpOutcome> {
        if let Some(interval) = self.cfg.interval {
            let t = now();
            if t - self.rotation_start >= interval as i64 {
                self.rotation_start = t;
                // Time rotation restarts the size-suffix sequence.
                if !self.rotate(Some(0))? {
                    return Ok(DumpOutcome::FileLimitReached);
                }
            }
        }
        if let Some(max_size) = self.cfg.max_size {
            let over = self
                .writer
                .as_ref()
                .map(|w| w.tell() > max_size)
                .unwrap_or(false);
            if over {
                let next = self.seq + 1;
                if !self.rotate(Some(next))? {
                    return Ok(DumpOutcome::FileLimitReached);
                }
            }
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("dump after file limit"))?;
        writer.write_packet(h, data).context("writing packet")?;
        if self.cfg.flush_each {
            writer.flush().context("flushing output file")?;
        }
        Ok(DumpOutcome::Written)
    }

    /// Closes the current file, hands it to the post-rotate command,
    /// and opens the successor unless the file cap was reached.
    /// Returns false on cap.
    fn rotate(&mut self, next_seq: Option<u32>) -> anyhow::Result<bool> {
        if let Some(w) = self.writer.take() {
            w.close().context("closing output file")?;
        }
        if let Some(cmd) = &self.cfg.post_rotate {
            spawn_post_rotate(cmd, &self.current_name);
        }
        if let Some(max) = self.cfg.max_files {
            if self.files_written >= max {
                displaylevel!(2, "netdump: maximum file limit reached: {}\n", max);
                return Ok(false);
            }
        }
        self.seq = next_seq.unwrap_or(0);
        let tm = rotation_tm(&self.cfg, self.rotation_start)?;
        let cnt = self.cfg.max_size.map(|_| self.seq);
        let name = make_filename(&self.cfg.template, tm.as_ref(), cnt, self.width)?;
        self.writer = Some(
            SavefileWriter::create(&name, self.linktype, self.snaplen)
                .with_context(|| format!("opening output file '{}'", name))?,
        );
        self.current_name = name;
        self.files_written += 1;
        Ok(true)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }

    /// Closes the session's last file.  The post-rotate command only
    /// runs for rotated files, not the final close.
    pub fn close(mut self) -> anyhow::Result<()> {
        if let Some(w) = self.writer.take() {
            w.close().context("closing output file")?;
        }
        Ok(())
    }
}

fn now() -> i64 {
    // SAFETY: time(NULL) has no failure mode worth handling beyond -1.
    unsafe { libc::time(std::ptr::null_mut()) as i64 }
}

fn rotation_tm(cfg: &DumpConfig, anchor: i64) -> anyhow::Result<Option<libc::tm>> {
    if cfg.interval.is_none() {
        return Ok(None);
    }
    localtime(anchor)
        .map(Some)
        .ok_or_else(|| anyhow!("can't convert rotation time"))
}
