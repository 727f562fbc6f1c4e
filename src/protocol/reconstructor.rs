//! Frame reconstruction from an arbitrarily chunked byte stream
//!
//! Serial reads return whatever happens to be in the driver's buffer: half a frame,
//! three frames, or a frame tail followed by the next frame's header. The
//! [`FrameReconstructor`] accumulates those chunks and slices complete, checksum-valid
//! frames out of them.
//!
//! ## Usage Example
//!
//! ```rust
//! use xbus::FrameReconstructor;
//!
//! let mut reconstructor = FrameReconstructor::new();
//!
//! // Garbage before the first preamble, then a GoToMeasurement acknowledgement split in two
//! assert!(reconstructor.feed(&[0x00, 0x13, 0xFA, 0xFF]).is_empty());
//! let frames = reconstructor.feed(&[0x11, 0x00, 0xF0]);
//!
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].message_id(), 0x11);
//! assert_eq!(reconstructor.take_events().len(), 1); // the resync
//! ```
//!
//! ## Guarantees
//!
//! - The emitted frame sequence does not depend on how the input is chunked
//! - A checksum failure drops exactly one frame; the length field is trusted, so framing
//!   continues with the following byte
//! - Extended-length frames (`length == 0xFF`) are reported and skipped by rescanning for
//!   the next preamble

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::checksum;
use crate::XbusError;
use crate::types::Frame;
use crate::types::xbus_ids::frame as layout;

const INITIAL_CAPACITY: usize = 4 * 1024;
const MAX_PENDING_EVENTS: usize = 256;

/// Running counters for one reconstructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructorStats {
    pub frames_emitted: u64,
    pub checksum_failures: u64,
    pub resyncs: u64,
    pub bytes_discarded: u64,
    pub unsupported_lengths: u64,
    /// Events not queued because nobody drained [`FrameReconstructor::take_events`].
    pub events_dropped: u64,
}

enum Step {
    Emit(Frame),
    Dropped,
    NeedMore,
}

/// Stateful frame reconstructor for one byte stream.
///
/// Feed bytes in arrival order; `feed` takes `&mut self`, so a single owner per link is
/// enforced by the borrow checker. Nothing here blocks.
#[derive(Debug)]
pub struct FrameReconstructor {
    buffer: BytesMut,
    synchronized: bool,
    pending_len: Option<usize>,
    events: Vec<XbusError>,
    stats: ReconstructorStats,
}

impl Default for FrameReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReconstructor {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            synchronized: false,
            pending_len: None,
            events: Vec::new(),
            stats: ReconstructorStats::default(),
        }
    }

    /// Push a chunk of raw bytes and return every frame it completes, in stream order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if chunk.is_empty() {
            trace!("Ignoring empty chunk");
            return Vec::new();
        }

        let chunk = if self.synchronized {
            chunk
        } else {
            match chunk.iter().position(|b| *b == layout::PREAMBLE) {
                Some(start) => {
                    if start > 0 {
                        self.record_discard(start);
                    }
                    self.synchronized = true;
                    debug!("Synchronized with stream after {} byte(s)", start);
                    &chunk[start..]
                }
                None => {
                    self.record_discard(chunk.len());
                    return Vec::new();
                }
            }
        };

        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            match self.extract_one() {
                Step::Emit(frame) => frames.push(frame),
                Step::Dropped => continue,
                Step::NeedMore => break,
            }
        }
        frames
    }

    fn extract_one(&mut self) -> Step {
        if self.buffer.is_empty() {
            return Step::NeedMore;
        }

        if self.buffer[0] != layout::PREAMBLE {
            debug!("Frame boundary lost (found {:#04x}), rescanning", self.buffer[0]);
            self.rescan();
            return Step::Dropped;
        }

        if self.buffer.len() < layout::HEADER_LEN {
            return Step::NeedMore;
        }

        let length = self.buffer[layout::LENGTH_OFFSET];
        if length == layout::EXTENDED_LENGTH {
            let message_id = self.buffer[2];
            warn!("Extended-length frame for message {:#04x} is not supported", message_id);
            self.stats.unsupported_lengths += 1;
            self.push_event(XbusError::UnsupportedLength { message_id });
            self.buffer.advance(1);
            self.stats.bytes_discarded += 1;
            self.rescan();
            return Step::Dropped;
        }

        let total = usize::from(length) + layout::OVERHEAD;
        if self.buffer.len() < total {
            self.pending_len = Some(total);
            return Step::NeedMore;
        }
        self.pending_len = None;

        let bytes = self.buffer.split_to(total);
        let (body, found) = bytes.split_at(total - 1);
        let expected = checksum::compute(body);
        if expected != found[0] {
            warn!(
                "Dropping frame {:#04x}: checksum {:#04x} != {:#04x}",
                bytes[2], found[0], expected
            );
            self.stats.checksum_failures += 1;
            self.push_event(XbusError::checksum(expected, found[0]));
            return Step::Dropped;
        }

        self.stats.frames_emitted += 1;
        trace!("Frame {:#04x} with {} payload byte(s)", bytes[2], length);
        Step::Emit(Frame::from_validated(bytes.to_vec()))
    }

    /// Drop buffered bytes up to the next preamble; lose sync if there is none.
    fn rescan(&mut self) {
        self.pending_len = None;
        match self.buffer.iter().position(|b| *b == layout::PREAMBLE) {
            Some(start) => {
                if start > 0 {
                    self.record_discard(start);
                    self.buffer.advance(start);
                }
            }
            None => {
                let discarded = self.buffer.len();
                self.buffer.clear();
                self.synchronized = false;
                if discarded > 0 {
                    self.record_discard(discarded);
                }
            }
        }
    }

    fn record_discard(&mut self, discarded: usize) {
        warn!("Discarded {} byte(s) while searching for frame preamble", discarded);
        self.stats.resyncs += 1;
        self.stats.bytes_discarded += discarded as u64;
        self.push_event(XbusError::framing(discarded));
    }

    fn push_event(&mut self, event: XbusError) {
        if self.events.len() < MAX_PENDING_EVENTS {
            self.events.push(event);
        } else {
            self.stats.events_dropped += 1;
        }
    }

    /// Drain anomalies reported since the last call (resyncs, checksum failures, ...).
    pub fn take_events(&mut self) -> Vec<XbusError> {
        std::mem::take(&mut self.events)
    }

    pub fn stats(&self) -> ReconstructorStats {
        self.stats
    }

    /// Whether a preamble has been seen and framing is in progress.
    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Total length of the partially received frame, once its length byte has arrived.
    pub fn pending_frame_len(&self) -> Option<usize> {
        self.pending_len
    }

    /// Forget all buffered bytes and require a fresh preamble. Counters are kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.synchronized = false;
        self.pending_len = None;
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TlvWriter, sample_stream};
    use proptest::prelude::*;

    fn counter_frame(counter: u16) -> Frame {
        let payload = TlvWriter::new().packet_counter(counter).finish();
        Frame::mt_data2(&payload).unwrap()
    }

    fn concat(frames: &[Frame]) -> Vec<u8> {
        frames.iter().flat_map(|f| f.as_bytes().to_vec()).collect()
    }

    #[test]
    fn whole_frame_in_one_chunk() {
        let frame = counter_frame(42);
        let mut reconstructor = FrameReconstructor::new();
        let frames = reconstructor.feed(frame.as_bytes());
        assert_eq!(frames, vec![frame]);
        assert!(reconstructor.take_events().is_empty());
        assert_eq!(reconstructor.buffered_len(), 0);
    }

    #[test]
    fn frame_split_across_chunks() {
        let frame = counter_frame(7);
        let bytes = frame.as_bytes();
        let mut reconstructor = FrameReconstructor::new();

        assert!(reconstructor.feed(&bytes[..2]).is_empty());
        assert_eq!(reconstructor.pending_frame_len(), None);
        assert!(reconstructor.feed(&bytes[2..6]).is_empty());
        assert_eq!(reconstructor.pending_frame_len(), Some(bytes.len()));
        assert_eq!(reconstructor.feed(&bytes[6..]), vec![frame]);
        assert_eq!(reconstructor.pending_frame_len(), None);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut reconstructor = FrameReconstructor::new();
        assert!(reconstructor.feed(&[]).is_empty());
        assert!(!reconstructor.is_synchronized());
        assert!(reconstructor.take_events().is_empty());
    }

    #[test]
    fn garbage_prefix_is_discarded_with_resync_event() {
        let frame = counter_frame(1);
        let mut input = vec![0x01, 0x02, 0x03];
        input.extend_from_slice(frame.as_bytes());

        let mut reconstructor = FrameReconstructor::new();
        assert_eq!(reconstructor.feed(&input), vec![frame]);

        let events = reconstructor.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], XbusError::Framing { discarded: 3 }));
        assert_eq!(reconstructor.stats().resyncs, 1);
        assert_eq!(reconstructor.stats().bytes_discarded, 3);
    }

    #[test]
    fn chunk_without_preamble_keeps_searching() {
        let frame = counter_frame(9);
        let mut reconstructor = FrameReconstructor::new();
        assert!(reconstructor.feed(&[0x00, 0x11, 0x22]).is_empty());
        assert!(!reconstructor.is_synchronized());
        assert_eq!(reconstructor.feed(frame.as_bytes()), vec![frame]);
        assert!(reconstructor.is_synchronized());
    }

    #[test]
    fn checksum_failure_drops_only_that_frame() {
        let good_before = counter_frame(1);
        let good_after = counter_frame(3);
        let mut corrupt = counter_frame(2).as_bytes().to_vec();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;

        let mut input = good_before.as_bytes().to_vec();
        input.extend_from_slice(&corrupt);
        input.extend_from_slice(good_after.as_bytes());

        let mut reconstructor = FrameReconstructor::new();
        assert_eq!(reconstructor.feed(&input), vec![good_before, good_after]);

        let events = reconstructor.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], XbusError::Checksum { .. }));
        assert_eq!(reconstructor.stats().checksum_failures, 1);
        assert_eq!(reconstructor.stats().resyncs, 0);
    }

    #[test]
    fn extended_length_is_reported_and_skipped() {
        let good = counter_frame(5);
        let mut input = vec![0xFA, 0xFF, 0x36, 0xFF, 0x01, 0x04, 0x00, 0x00];
        input.extend_from_slice(good.as_bytes());

        let mut reconstructor = FrameReconstructor::new();
        assert_eq!(reconstructor.feed(&input), vec![good]);

        let events = reconstructor.take_events();
        assert!(matches!(events[0], XbusError::UnsupportedLength { message_id: 0x36 }));
        assert!(events[1..].iter().all(|e| matches!(e, XbusError::Framing { .. })));
        assert_eq!(reconstructor.stats().unsupported_lengths, 1);
    }

    #[test]
    fn extended_length_without_following_preamble_loses_sync() {
        let mut reconstructor = FrameReconstructor::new();
        assert!(reconstructor.feed(&[0xFA, 0xFF, 0x36, 0xFF, 0x00, 0x10]).is_empty());
        assert!(!reconstructor.is_synchronized());
        assert_eq!(reconstructor.buffered_len(), 0);

        let good = counter_frame(6);
        assert_eq!(reconstructor.feed(good.as_bytes()), vec![good]);
    }

    #[test]
    fn lost_boundary_rescans_for_preamble() {
        let first = counter_frame(1);
        let second = counter_frame(2);
        let mut input = first.as_bytes().to_vec();
        input.extend_from_slice(&[0x55, 0x66]);
        input.extend_from_slice(second.as_bytes());

        let mut reconstructor = FrameReconstructor::new();
        assert_eq!(reconstructor.feed(&input), vec![first, second]);
        let events = reconstructor.take_events();
        assert!(matches!(events[..], [XbusError::Framing { discarded: 2 }]));
    }

    #[test]
    fn pending_events_are_bounded() {
        let mut reconstructor = FrameReconstructor::new();
        let mut corrupt = counter_frame(1).as_bytes().to_vec();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x01;
        for _ in 0..(MAX_PENDING_EVENTS + 10) {
            reconstructor.feed(&corrupt);
        }
        assert_eq!(reconstructor.take_events().len(), MAX_PENDING_EVENTS);
        assert_eq!(reconstructor.stats().events_dropped, 10);
    }

    #[test]
    fn reset_requires_new_preamble() {
        let frame = counter_frame(4);
        let mut reconstructor = FrameReconstructor::new();
        reconstructor.feed(&frame.as_bytes()[..5]);
        assert!(reconstructor.buffered_len() > 0);

        reconstructor.reset();
        assert_eq!(reconstructor.buffered_len(), 0);
        assert!(!reconstructor.is_synchronized());
        assert_eq!(reconstructor.feed(frame.as_bytes()), vec![frame]);
    }

    #[test]
    fn sample_stream_reconstructs_every_frame() {
        let frames = sample_stream(20);
        let mut reconstructor = FrameReconstructor::new();
        assert_eq!(reconstructor.feed(&concat(&frames)), frames);
        assert_eq!(reconstructor.stats().frames_emitted, 20);
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_emitted_frames(
            count in 1usize..12,
            cuts in prop::collection::vec(1usize..40, 1..64),
            garbage in prop::collection::vec(0u8..0xFA, 0..16)
        ) {
            let frames = sample_stream(count);
            let mut stream = garbage.clone();
            stream.extend(concat(&frames));

            let mut whole = FrameReconstructor::new();
            let emitted_whole = whole.feed(&stream);

            let mut bytewise = FrameReconstructor::new();
            let emitted_bytewise: Vec<Frame> =
                stream.iter().flat_map(|b| bytewise.feed(std::slice::from_ref(b))).collect();

            let mut chunked = FrameReconstructor::new();
            let mut emitted_chunked = Vec::new();
            let mut rest = stream.as_slice();
            for cut in cuts.iter().cycle() {
                if rest.is_empty() {
                    break;
                }
                let (head, tail) = rest.split_at((*cut).min(rest.len()));
                emitted_chunked.extend(chunked.feed(head));
                rest = tail;
            }

            prop_assert_eq!(&emitted_whole, &frames);
            prop_assert_eq!(&emitted_bytewise, &frames);
            prop_assert_eq!(&emitted_chunked, &frames);
        }

        #[test]
        fn arbitrary_bytes_never_panic(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16)) {
            let mut reconstructor = FrameReconstructor::new();
            for chunk in &chunks {
                for frame in reconstructor.feed(chunk) {
                    prop_assert!(checksum::validate(frame.as_bytes()));
                }
            }
        }
    }
}
