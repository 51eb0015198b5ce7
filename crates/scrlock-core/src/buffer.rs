//! Bounded input accumulator.
//!
//! An [`InputBuffer`] holds the bytes typed for one input mode. Storage is
//! allocated once at the configured maximum so that appends never reallocate
//! and leave stray copies of credential bytes behind; the contents are wiped
//! on [`InputBuffer::clear`] and on drop.

use zeroize::{Zeroize, Zeroizing};

/// Bounded, mutable text accumulator.
///
/// Invariant: `len() <= max_len()` at all times.
pub struct InputBuffer {
    bytes: Zeroizing<Vec<u8>>,
    max_len: usize,
}

impl InputBuffer {
    /// Create an empty buffer accepting at most `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self { bytes: Zeroizing::new(Vec::with_capacity(max_len)), max_len }
    }

    /// Append `input` as a whole.
    ///
    /// Returns `false` and leaves the buffer untouched if `input` is empty,
    /// contains a control byte, or would push the length past the maximum.
    pub fn append(&mut self, input: &[u8]) -> bool {
        if input.is_empty() || input.iter().any(u8::is_ascii_control) {
            return false;
        }
        if self.bytes.len() + input.len() > self.max_len {
            return false;
        }
        self.bytes.extend_from_slice(input);
        true
    }

    /// Remove the last byte. Returns `false` if the buffer was empty.
    pub fn backspace(&mut self) -> bool {
        let Some(last) = self.bytes.last_mut() else {
            return false;
        };
        last.zeroize();
        self.bytes.pop();
        true
    }

    /// Wipe and empty the buffer.
    pub fn clear(&mut self) {
        // Zeroize on Vec wipes the initialized contents and truncates.
        self.bytes.zeroize();
    }

    /// Current contents and length.
    pub fn snapshot(&self) -> (&[u8], usize) {
        (&self.bytes, self.bytes.len())
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been typed.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Configured maximum length.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        self.max_len - self.bytes.len()
    }
}

impl std::fmt::Debug for InputBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print contents.
        f.debug_struct("InputBuffer")
            .field("len", &self.bytes.len())
            .field("max_len", &self.max_len)
            .finish()
    }
}
