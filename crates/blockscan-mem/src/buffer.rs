//! Fixed-capacity byte buffer with a read cursor and an end-of-valid-data mark.

use bytes::BytesMut;

/// One pooled buffer. The slot id is stable for the life of the pool.
///
/// Invariant: `pos <= end <= capacity`.
pub struct FixedBuffer {
    id: usize,
    data: BytesMut,
    pos: usize,
    end: usize,
}

impl FixedBuffer {
    pub(crate) fn new(id: usize, data: BytesMut) -> Self {
        Self {
            id,
            data,
            pos: 0,
            end: 0,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Read cursor.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// End of valid data.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of valid bytes the last fill produced.
    pub fn readable(&self) -> usize {
        self.end
    }

    pub fn is_drained(&self) -> bool {
        self.pos >= self.end
    }

    /// Forget the previous contents before a refill.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.end = 0;
    }

    /// The whole region, for the producer to fill.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    /// Mark `n` bytes as valid. When the fill was short, the tail is zeroed
    /// so stale bytes from an earlier cycle never look like delimiters.
    pub fn set_readable(&mut self, n: usize) {
        let n = n.min(self.capacity());
        self.end = n;
        self.pos = 0;
        if n > 0 && n < self.capacity() {
            self.data[n..].fill(0);
        }
    }

    /// Valid bytes not yet consumed.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.pos..self.end]
    }

    /// Valid bytes `[start, end)` of this buffer.
    pub fn slice(&self, start: usize, end: usize) -> &[u8] {
        &self.data[start..end]
    }

    /// Move the cursor forward by `n`, clamped to the end of valid data.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.end);
    }

    /// Overwrite the byte at `at` with a zero terminator.
    pub fn terminate(&mut self, at: usize) {
        debug_assert!(at < self.end, "terminator outside valid data");
        self.data[at] = 0;
    }
}

impl std::fmt::Debug for FixedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedBuffer")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .field("pos", &self.pos)
            .field("end", &self.end)
            .finish()
    }
}
