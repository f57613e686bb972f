// config.rs — Compile-time configuration constants.

/// Default per-packet snapshot length when `-s` is not given.
/// Large enough to hold any frame on common link types, including
/// jumbo-frame Ethernet.
pub const DEFAULT_SNAPLEN: u32 = 262_144;

/// Hard upper bound on a snapshot length accepted from the command line
/// or from a savefile header.  Anything above this is treated as a
/// corrupt file rather than an allocation request.
pub const MAXIMUM_SNAPLEN: u32 = 262_144;

/// Maximum depth of the snapshot-end stack.  Encapsulation nesting
/// deeper than this is pathological input; pushes beyond the cap fail
/// and the caller treats the inner payload as opaque.
pub const SNAPEND_STACK_MAX: usize = 32;

/// Soft cap on per-packet arena allocations, in bytes.  Exhaustion is
/// reported to the requesting printer, never fatal.
pub const ARENA_SOFT_CAP: usize = 1 << 20;

/// Granularity of arena backing chunks.
pub const ARENA_CHUNK_SIZE: usize = 16 * 1024;

/// Unit of the `-C` size-rotation threshold: the option value is given
/// in millions of bytes, not mebibytes.
pub const ROTATE_SIZE_UNIT: u64 = 1_000_000;

/// Poll granularity of the live capture read, in milliseconds.  Bounds
/// how long a pending break or info request can sit unserviced while
/// no traffic arrives.
pub const LIVE_READ_TIMEOUT_MS: u32 = 500;

/// Upper bound for expanded output-file paths, matching the platform
/// limit.
pub const PATH_MAX: usize = libc::PATH_MAX as usize;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaplen_defaults_sane() {
        assert!(DEFAULT_SNAPLEN <= MAXIMUM_SNAPLEN);
        assert!(DEFAULT_SNAPLEN >= 68); // minimum useful IPv4 snapshot
    }

    #[test]
    fn arena_chunk_divides_cap() {
        assert_eq!(ARENA_SOFT_CAP % ARENA_CHUNK_SIZE, 0);
    }
}
