//! Capture lifecycle: sources, savefiles, rotation, signals,
//! privileges, statistics, and the session loop that ties them
//! together.

pub mod live;
pub mod privs;
pub mod rotate;
pub mod savefile;
pub mod session;
pub mod signals;
pub mod source;
pub mod stats;

pub use rotate::{DumpConfig, Dumper};
pub use savefile::{SavefileReader, SavefileWriter};
pub use session::{run, InputMode, SessionConfig};
pub use source::{CaptureStats, NextPacket, PacketSource};
