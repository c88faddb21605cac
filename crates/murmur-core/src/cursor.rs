//! Partially consumed chunk tracking for the device callback.

use crate::chunk_queue::SampleChunk;

/// The chunk currently being played and the read offset inside it.
///
/// Holds at most one chunk. The chunk is dropped, and the offset reset to
/// zero, exactly when the offset reaches the chunk length.
#[derive(Debug, Default)]
pub struct PlaybackCursor {
    current: Option<SampleChunk>,
    offset: usize,
}

impl PlaybackCursor {
    /// Create an empty cursor
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: None,
            offset: 0,
        }
    }

    /// Whether no chunk is held
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Read offset into the held chunk
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Samples of the held chunk not yet played
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |chunk| chunk.len() - self.offset)
    }

    /// Take ownership of the next chunk.
    ///
    /// Empty chunks are discarded immediately since there is nothing to play.
    pub fn load(&mut self, chunk: SampleChunk) {
        debug_assert!(self.current.is_none(), "cursor already holds a chunk");
        if chunk.is_empty() {
            return;
        }
        self.current = Some(chunk);
        self.offset = 0;
    }

    /// Copy as many pending samples as fit into `out`, returning the count.
    ///
    /// When the chunk has more samples than `out` can take, exactly
    /// `out.len()` samples are copied and the chunk stays loaded. Otherwise
    /// the whole remainder is copied and the chunk is released.
    pub fn drain_into(&mut self, out: &mut [f32]) -> usize {
        let Some(chunk) = self.current.as_ref() else {
            return 0;
        };

        let pending = &chunk.as_slice()[self.offset..];
        let needed = out.len();

        if pending.len() > needed {
            out.copy_from_slice(&pending[..needed]);
            self.offset += needed;
            needed
        } else {
            let copied = pending.len();
            out[..copied].copy_from_slice(pending);
            self.current = None;
            self.offset = 0;
            copied
        }
    }
}
