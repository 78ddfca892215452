//! The body-reader collaborator used by [`crate::Parser::write_body`].
//!
//! The parser never owns the destination for body octets — the caller
//! supplies one. This trait is the minimal seam the core needs from
//! it: reserve-then-commit, the same shape an Asio-style dynamic
//! buffer uses.

/// A destination for body octets that can grow on demand.
///
/// Mirrors the `prepare`/`commit` contract of an Asio-style dynamic
/// buffer: `prepare(n)` reserves `n` bytes at the end of the readable
/// sequence without yet making them visible; `commit(n)` moves exactly
/// `n` of the most recently prepared bytes into the readable sequence,
/// discarding the rest of that reservation.
pub trait BodyReader {
    /// Reserve `n` additional bytes and return a mutable view over
    /// them.
    fn prepare(&mut self, n: usize) -> &mut [u8];

    /// Commit `written` of the bytes from the most recent
    /// [`prepare`](BodyReader::prepare) call.
    fn commit(&mut self, written: usize);
}

/// A growable `Vec<u8>`-backed [`BodyReader`] for callers that don't
/// need a custom sink.
///
/// A bare `Vec<u8>` cannot implement [`BodyReader`] directly: `commit`
/// needs to know how many bytes the preceding `prepare` reserved so it
/// can discard the unused tail, and a `Vec` has nowhere to remember
/// that between the two calls.
#[derive(Debug, Default, Clone)]
pub struct BodyBuf {
    buf: Vec<u8>,
    pending: usize,
}

impl BodyBuf {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytes committed so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the buffer, returning the committed bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl BodyReader for BodyBuf {
    fn prepare(&mut self, n: usize) -> &mut [u8] {
        let start = self.buf.len();
        self.buf.resize(start + n, 0);
        self.pending = n;
        &mut self.buf[start..]
    }

    fn commit(&mut self, written: usize) {
        let discard = self.pending.saturating_sub(written);
        let new_len = self.buf.len() - discard;
        self.buf.truncate(new_len);
        self.pending = 0;
    }
}

impl From<BodyBuf> for Vec<u8> {
    fn from(b: BodyBuf) -> Self {
        b.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_buf_round_trips() {
        let mut buf = BodyBuf::new();
        buf.prepare(4).copy_from_slice(b"abcd");
        buf.commit(4);
        assert_eq!(buf.as_slice(), b"abcd");
    }

    #[test]
    fn body_buf_partial_commit_discards_remainder() {
        let mut buf = BodyBuf::new();
        buf.prepare(2).copy_from_slice(b"xy");
        buf.commit(2);
        let slot = buf.prepare(4);
        slot[..2].copy_from_slice(b"ab");
        buf.commit(2);
        assert_eq!(buf.as_slice(), b"xyab");
    }
}
