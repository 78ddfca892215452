//! The six-method callback contract dispatched by the streaming state
//! machine.
//!
//! A caller implements this trait on their own message sink;
//! [`crate::Parser::write`] is generic over it, so monomorphization
//! keeps call sites free of indirection — no boxed trait object, no
//! virtual dispatch.
//!
//! Every method has a no-op default so a sink only needs to implement
//! the handful it cares about. Slices passed to any method alias
//! either the caller's input buffer or the parser's flatten buffer and
//! are valid only for the duration of the call.

/// Receives the parsed pieces of a message as the streaming parser
/// produces them.
pub trait Callbacks {
    /// Error type a callback may fail with. Returning `Err` halts
    /// parsing for the remainder of the current `write` call; the error
    /// is surfaced to the caller as
    /// [`ParseError::CallbackAborted`](crate::ParseError::CallbackAborted).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once, after the request-line is parsed (request role
    /// only).
    #[allow(unused_variables)]
    fn on_request(&mut self, method: &[u8], target: &[u8], version: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once, after the status-line is parsed (response role
    /// only).
    #[allow(unused_variables)]
    fn on_response(&mut self, status: u16, reason: &[u8], version: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once per header field (and once per trailer field), in
    /// wire order. `value` has obs-fold continuations joined with a
    /// single SP and surrounding OWS trimmed.
    #[allow(unused_variables)]
    fn on_field(&mut self, name: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once, after the blank line ending the header section and
    /// after framing decisions (§4.4) have been applied.
    fn on_header(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called once per chunk header, including the zero-size last
    /// chunk. `ext` is the raw bytes from the first `;` to the chunk
    /// header's CRLF (empty when there is no chunk-ext).
    #[allow(unused_variables)]
    fn on_chunk(&mut self, size: u64, ext: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called possibly many times with contiguous body octets, for
    /// fixed-length, chunked, and EOF-delimited bodies alike.
    #[allow(unused_variables)]
    fn on_body(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }
}
