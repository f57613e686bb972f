//! Snapshot-end stack.
//!
//! A printer entering an encapsulated payload narrows the end of
//! readable bytes for its inner printers and restores the previous end
//! on the way out.  The stack is LIFO, per-packet, and the end is
//! monotone non-increasing with push depth; only
//! [`adjust_snapend`](Context::adjust_snapend) may raise it again, and
//! never above the scope it was pushed under.

use crate::config::SNAPEND_STACK_MAX;

use super::context::{Context, SavedPacketInfo};

impl Context<'_> {
    /// Current stack depth.
    pub fn packet_info_depth(&self) -> usize {
        self.stack.len()
    }

    /// Saves the cursor and narrows the snapshot end to
    /// `min(current, new_end)`.  Returns false when the nesting cap is
    /// reached, in which case nothing changes and the caller should
    /// treat the inner payload as opaque.
    #[must_use]
    pub fn push_snapend(&mut self, new_end: usize) -> bool {
        if self.stack.len() >= SNAPEND_STACK_MAX {
            return false;
        }
        self.stack.push(SavedPacketInfo {
            buf: self.buf,
            pos: self.pos,
            snapend: self.snapend,
            owns_buffer: false,
        });
        if new_end < self.snapend {
            self.snapend = new_end;
        }
        true
    }

    /// Saves the cursor and switches the active buffer to `buffer`,
    /// typically bytes the printer reassembled from fragments.  The
    /// buffer is owned by the new stack frame and released on pop.
    /// `new_pos` and `new_end` are offsets into `buffer`.
    #[must_use]
    pub fn push_buffer(&mut self, buffer: Vec<u8>, new_pos: usize, new_end: usize) -> bool {
        if self.stack.len() >= SNAPEND_STACK_MAX {
            return false;
        }
        self.stack.push(SavedPacketInfo {
            buf: self.buf,
            pos: self.pos,
            snapend: self.snapend,
            owns_buffer: true,
        });
        let cap = buffer.len();
        self.owned.push(buffer);
        self.buf = self.owned.len();
        self.snapend = new_end.min(cap);
        self.pos = new_pos.min(self.snapend);
        true
    }

    /// Changes the already-pushed snapshot end.  A raise is legal up to
    /// the end saved by the frame below the current one, or up to the
    /// buffer's capture boundary when only one frame is pushed; an
    /// out-of-bounds raise is ignored.  A lower always takes effect.
    /// IPv6 Jumbo Payload is the canonical caller: the real payload
    /// length becomes known only after the extension header is parsed.
    pub fn adjust_snapend(&mut self, new_end: usize) {
        let bound = match self.stack.len() {
            0 => {
                // No pushed scope to widen into; narrowing only.
                if new_end < self.snapend {
                    self.snapend = new_end;
                    self.pos = self.pos.min(self.snapend);
                }
                return;
            }
            1 => self.buffer_cap(),
            n => self.stack[n - 2].snapend,
        };
        if new_end <= bound {
            self.snapend = new_end;
            self.pos = self.pos.min(self.snapend);
        }
    }

    /// Restores the cursor and snapshot end from the top frame and
    /// releases any buffer the frame owned.  No-op on an empty stack.
    pub fn pop_packet_info(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        if frame.owns_buffer {
            self.owned.pop();
        }
        self.buf = frame.buf;
        self.pos = frame.pos;
        self.snapend = frame.snapend;
    }

    /// Safety net run after top-level dispatch: unwinds every frame a
    /// printer failed to balance.
    pub fn pop_all_packet_info(&mut self) {
        while !self.stack.is_empty() {
            self.pop_packet_info();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::arena::Arena;
    use crate::dissect::DissectOptions;

    fn harness() -> (DissectOptions, Arena, Vec<u8>) {
        (DissectOptions::default(), Arena::new(), Vec::new())
    }

    #[test]
    fn push_narrows_pop_restores() {
        let data: &[u8] = &[0u8; 100];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 100, 100);
        ndo.skip(10).unwrap();
        assert!(ndo.push_snapend(40));
        assert_eq!(ndo.snapend(), 40);
        ndo.skip(30).unwrap();
        assert_eq!(ndo.remaining(), 0);
        ndo.pop_packet_info();
        assert_eq!(ndo.snapend(), 100);
        assert_eq!(ndo.pos(), 10);
    }

    #[test]
    fn push_never_raises() {
        let data: &[u8] = &[0u8; 50];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 50, 50);
        assert!(ndo.push_snapend(30));
        assert!(ndo.push_snapend(45)); // above current end: clamped
        assert_eq!(ndo.snapend(), 30);
    }

    #[test]
    fn adjust_raises_within_caplen_for_single_frame() {
        let data: &[u8] = &[0u8; 100];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 100, 100);
        assert!(ndo.push_snapend(20));
        ndo.adjust_snapend(80);
        assert_eq!(ndo.snapend(), 80);
        ndo.adjust_snapend(150); // beyond caplen: ignored
        assert_eq!(ndo.snapend(), 80);
        ndo.pop_packet_info();
        assert_eq!(ndo.snapend(), 100);
    }

    #[test]
    fn adjust_bound_is_previous_frames_saved_end() {
        let data: &[u8] = &[0u8; 100];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 100, 100);
        assert!(ndo.push_snapend(60)); // frame A saves end=100, now 60
        assert!(ndo.push_snapend(30)); // frame B saves end=60, now 30
        // The bound for adjust is the saved end of the frame below the
        // top, i.e. frame A's 100.
        ndo.adjust_snapend(50);
        assert_eq!(ndo.snapend(), 50);
        ndo.adjust_snapend(100);
        assert_eq!(ndo.snapend(), 100);
        ndo.adjust_snapend(101); // beyond: ignored
        assert_eq!(ndo.snapend(), 100);
    }

    #[test]
    fn adjust_without_frames_only_narrows() {
        let data: &[u8] = &[0u8; 100];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 100, 100);
        ndo.adjust_snapend(40);
        assert_eq!(ndo.snapend(), 40);
        ndo.adjust_snapend(90);
        assert_eq!(ndo.snapend(), 40);
    }

    #[test]
    fn owned_buffer_scopes_reads_and_is_released() {
        let data: &[u8] = &[1u8, 2, 3, 4];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 4, 4);
        ndo.skip(2).unwrap();
        let reassembled = vec![9u8, 8, 7, 6, 5];
        assert!(ndo.push_buffer(reassembled, 0, 5));
        assert_eq!(ndo.fetch_u8().unwrap(), 9);
        assert_eq!(ndo.remaining(), 4);
        ndo.pop_packet_info();
        assert!(ndo.owned.is_empty());
        assert_eq!(ndo.pos(), 2);
        assert_eq!(ndo.fetch_u8().unwrap(), 3);
    }

    #[test]
    fn depth_cap_fails_push() {
        let data: &[u8] = &[0u8; 8];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 8, 8);
        for _ in 0..SNAPEND_STACK_MAX {
            assert!(ndo.push_snapend(8));
        }
        assert!(!ndo.push_snapend(8));
        assert!(!ndo.push_buffer(vec![0u8; 4], 0, 4));
        assert_eq!(ndo.packet_info_depth(), SNAPEND_STACK_MAX);
    }

    #[test]
    fn pop_all_unwinds_everything() {
        let data: &[u8] = &[0u8; 16];
        let (opts, arena, mut out) = harness();
        let mut ndo = Context::new(&opts, &mut out, &arena, data, 16, 16);
        assert!(ndo.push_snapend(12));
        assert!(ndo.push_buffer(vec![0u8; 2], 0, 2));
        assert!(ndo.push_snapend(1));
        ndo.pop_all_packet_info();
        assert_eq!(ndo.packet_info_depth(), 0);
        assert_eq!(ndo.snapend(), 16);
        assert!(ndo.owned.is_empty());
    }
}
