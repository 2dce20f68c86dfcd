//! Incremental frame reassembly

use tracing::{debug, trace, warn};

use super::{HEADER_LEN, SENTINEL, decode_frame};
use crate::error::{FramingError, FramingReason};
use crate::types::Command;

/// Upper bound on a pending frame body.
///
/// A frame with a declared length is at most `3 + 255` bytes. Frames with an
/// unknown length (declared 0) are rejected once they grow past this.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + u8::MAX as usize;

/// Scan state of a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for a sentinel, bytes are discarded
    Idle,
    /// Accumulating a frame body
    Buffering,
}

/// Running counters, mostly for diagnostics views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub frames_rejected: u64,
    pub bytes_discarded: u64,
}

/// State machine that turns arbitrarily chunked bytes into commands.
///
/// Chunk boundaries never matter: feeding a stream one byte at a time or all
/// at once yields the same sequence of results.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecoderState,
    pending: Vec<u8>,
    next_frame_id: u64,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder in the idle state
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            pending: Vec::with_capacity(MAX_FRAME_LEN),
            next_frame_id: 0,
            stats: DecoderStats::default(),
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Number of bytes in the pending frame body.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one chunk.
    ///
    /// Returns one entry per frame that completed inside this chunk, in
    /// arrival order. A rejected frame yields an `Err` and never disturbs
    /// the framing of the following bytes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<Command, FramingError>> {
        trace!("Decoder fed {} bytes in state {:?}", chunk.len(), self.state);
        chunk.iter().filter_map(|&byte| self.feed_byte(byte)).collect()
    }

    /// Feed a single byte, returning the frame it completed, if any.
    pub fn feed_byte(&mut self, byte: u8) -> Option<Result<Command, FramingError>> {
        if byte == SENTINEL {
            // A sentinel closes whatever was pending, complete or not.
            let finished = match self.state {
                DecoderState::Buffering if !self.pending.is_empty() => Some(self.finish_frame()),
                _ => None,
            };
            self.pending.clear();
            self.state = DecoderState::Buffering;
            return finished;
        }

        match self.state {
            DecoderState::Idle => {
                self.stats.bytes_discarded += 1;
                None
            }
            DecoderState::Buffering => {
                self.pending.push(byte);

                let declared = self.pending.get(2).copied().unwrap_or(0);
                if declared != 0 && self.pending.len() == usize::from(declared) + HEADER_LEN {
                    let finished = self.finish_frame();
                    self.state = DecoderState::Idle;
                    return Some(finished);
                }

                if self.pending.len() > MAX_FRAME_LEN {
                    let error = self.reject(FramingReason::Oversized { limit: MAX_FRAME_LEN });
                    self.pending.clear();
                    self.state = DecoderState::Idle;
                    return Some(Err(error));
                }
                None
            }
        }
    }

    /// Finalize a pending frame without waiting for the next sentinel.
    ///
    /// Used at the tail of a recording, where a frame with unknown length
    /// would otherwise never terminate.
    pub fn flush(&mut self) -> Option<Result<Command, FramingError>> {
        let finished = match self.state {
            DecoderState::Buffering if !self.pending.is_empty() => Some(self.finish_frame()),
            _ => None,
        };
        self.pending.clear();
        self.state = DecoderState::Idle;
        finished
    }

    /// Return to idle, discarding any pending bytes without emitting.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            debug!("Decoder reset, discarding {} pending bytes", self.pending.len());
        }
        self.pending.clear();
        self.state = DecoderState::Idle;
    }

    fn finish_frame(&mut self) -> Result<Command, FramingError> {
        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;

        match decode_frame(&self.pending, frame_id) {
            Ok(command) => {
                self.stats.frames_decoded += 1;
                trace!("Frame {}: {:?}", frame_id, command.kind());
                Ok(command)
            }
            Err(error) => {
                self.stats.frames_rejected += 1;
                warn!("{}", error);
                Err(error)
            }
        }
    }

    fn reject(&mut self, reason: FramingReason) -> FramingError {
        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;
        self.stats.frames_rejected += 1;

        let error = FramingError::new(frame_id, reason, &self.pending[..HEADER_LEN]);
        warn!("{}", error);
        error
    }
}
