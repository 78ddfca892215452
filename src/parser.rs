//! The streaming state machine (L2).

use std::marker::PhantomData;

use crate::body::BodyReader;
use crate::callbacks::Callbacks;
use crate::error::ParseError;
use crate::grammar;
use crate::role::{Request, Role};

// ---------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------

/// Configurable limits and toggles for the parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum length, in bytes, of the header section (start line
    /// through the blank line that ends it).
    pub max_header_size: usize,
    /// Maximum number of header/trailer fields.
    pub max_headers: usize,
    /// Maximum body size, counted in payload bytes (chunk framing
    /// overhead is not counted against it).
    pub max_body_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_header_size: 64 * 1024,
            max_headers: 128,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags(u32);

impl Flags {
    const HAVE_HEADER: u32 = 1 << 1;
    const HTTP_11: u32 = 1 << 2;
    const NEED_EOF: u32 = 1 << 3;
    const CONTENT_LENGTH: u32 = 1 << 4;
    const CHUNKED: u32 = 1 << 5;
    const UPGRADE: u32 = 1 << 8;
    const CONN_CLOSE: u32 = 1 << 9;
    const CONN_KEEPALIVE: u32 = 1 << 10;
    const CONN_UPGRADE: u32 = 1 << 11;
    const SKIP_BODY: u32 = 1 << 12;

    #[inline]
    fn has(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    fn set(&mut self, bit: u32) {
        self.0 |= bit;
    }
}

// ---------------------------------------------------------------------
// Internal phase
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    NoBody,
    FixedBody,
    EofBody,
    ChunkExpectCrlf,
    ChunkSize,
    ChunkData,
    Trailers,
    Done,
    Errored,
}

// ---------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------

/// An incremental, callback-driven HTTP/1.x message parser.
///
/// `R` selects [`Request`](crate::Request) or
/// [`Response`](crate::Response) parsing. The parser owns no socket and
/// no message buffer; the caller drives it by repeatedly calling
/// [`write`](Parser::write) with whatever bytes it currently has
/// unconsumed, and supplies a [`Callbacks`] sink to receive the parsed
/// pieces as soon as each one is recognized.
///
/// # Example
///
/// ```
/// use corewire::{Callbacks, Parser, Request};
///
/// #[derive(Default)]
/// struct Counter { fields: usize }
///
/// impl Callbacks for Counter {
///     type Error = std::convert::Infallible;
///     fn on_field(&mut self, _name: &[u8], _value: &[u8]) -> Result<(), Self::Error> {
///         self.fields += 1;
///         Ok(())
///     }
/// }
///
/// let mut parser = Parser::<Request>::new();
/// let mut sink = Counter::default();
/// let input = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
/// let consumed = parser.write(input, &mut sink).unwrap();
/// assert!(parser.is_done());
/// assert_eq!(sink.fields, 1);
/// assert_eq!(consumed, input.len());
/// ```
pub struct Parser<R: Role> {
    config: ParserConfig,
    phase: Phase,
    flags: Flags,
    version: u8,
    status: u16,
    /// Remaining bytes of the current fixed-length body or chunk.
    len: u64,
    /// Resume point for the current terminator search, so repeated
    /// short `write` calls don't rescan bytes already known not to
    /// contain the terminator.
    skip: usize,
    /// Grow-only scratch buffer used only to flatten multi-buffer
    /// gather-list input.
    scratch: Vec<u8>,
    bytes_consumed: u64,
    body_bytes_seen: u64,
    _role: PhantomData<R>,
}

impl<R: Role> Parser<R> {
    /// Create a parser with default limits.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Create a parser with custom limits.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            phase: Phase::Header,
            flags: Flags::default(),
            version: 0,
            status: 0,
            len: 0,
            skip: 0,
            scratch: Vec::new(),
            bytes_consumed: 0,
            body_bytes_seen: 0,
            _role: PhantomData,
        }
    }

    /// Declare that this message has no body regardless of what the
    /// headers say (e.g. the response to a `HEAD` request).
    pub fn set_skip_body(&mut self, skip: bool) {
        if skip {
            self.flags.set(Flags::SKIP_BODY);
        } else {
            self.flags.0 &= !Flags::SKIP_BODY;
        }
    }

    // ----- queries ---------------------------------------------------

    /// `true` iff the parser can make progress only with more bytes or
    /// EOF.
    pub fn need_more(&self) -> bool {
        !matches!(self.phase, Phase::Done | Phase::Errored)
    }

    /// `true` once the message is fully parsed.
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// `true` once the start-line and header section have been parsed.
    pub fn have_header(&self) -> bool {
        self.flags.has(Flags::HAVE_HEADER)
    }

    /// `true` if the body (if any) ends only at transport EOF.
    ///
    /// Only meaningful once [`have_header`](Parser::have_header) is
    /// true.
    pub fn needs_eof(&self) -> bool {
        self.flags.has(Flags::NEED_EOF)
    }

    /// `true` if an `Upgrade` header was present, or a `Connection`
    /// token list named `upgrade`.
    pub fn upgrade(&self) -> bool {
        self.flags.has(Flags::UPGRADE) || self.flags.has(Flags::CONN_UPGRADE)
    }

    /// The declared `Content-Length`, if the header was present and
    /// valid.
    pub fn content_length(&self) -> Option<u64> {
        if self.flags.has(Flags::CONTENT_LENGTH) {
            Some(self.len + self.body_bytes_seen)
        } else {
            None
        }
    }

    /// `true` if `Transfer-Encoding: chunked` applies to this message.
    pub fn is_chunked(&self) -> bool {
        self.flags.has(Flags::CHUNKED)
    }

    /// The response status code (responses only; `0` until parsed).
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// HTTP major version (`1` for both HTTP/1.0 and HTTP/1.1).
    pub fn http_major(&self) -> u8 {
        self.version / 10
    }

    /// HTTP minor version (`0` or `1`).
    pub fn http_minor(&self) -> u8 {
        self.version % 10
    }

    /// Whether the connection should be kept alive after this message:
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` was
    /// seen; HTTP/1.0 requires an explicit `Connection: keep-alive`; an
    /// EOF-delimited body always forces this to `false` since there is
    /// no way to locate the start of a following message.
    pub fn keep_alive(&self) -> bool {
        if self.flags.has(Flags::NEED_EOF) {
            return false;
        }
        if self.flags.has(Flags::CONN_CLOSE) {
            return false;
        }
        if self.flags.has(Flags::HTTP_11) {
            true
        } else {
            self.flags.has(Flags::CONN_KEEPALIVE)
        }
    }

    /// Total bytes accepted across all `write`/`write_vectored` calls.
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    fn fail(&mut self) {
        self.phase = Phase::Errored;
    }

    // ----- stream operations -----------------------------------------

    /// Feed a slice of bytes.
    ///
    /// `data` must be whatever the caller currently holds unconsumed:
    /// a `0` return means the parser needs more data appended to the
    /// same logical buffer before it can make progress; a nonzero
    /// return is the number of leading bytes the caller may now drop
    /// before the next call.
    pub fn write<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        if self.phase == Phase::Errored {
            return Err(ParseError::AlreadyFailed);
        }
        // Loop internally so a single call advances through as many
        // phase transitions as the supplied buffer allows (header into
        // body into trailers, ...), matching what a caller handing over
        // a whole message at once expects. A phase returning `0`
        // (needs more data, or a deliberate no-body/pipelining
        // boundary) stops the loop without over-consuming.
        let mut total = 0usize;
        while total < data.len() && self.phase != Phase::Done {
            match self.write_inner(&data[total..], cb) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) => {
                    self.fail();
                    return Err(e);
                }
            }
        }
        Ok(total)
    }

    fn write_inner<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        match self.phase {
            Phase::Header => self.advance_header(data, cb),
            Phase::NoBody => {
                self.phase = Phase::Done;
                Ok(0)
            }
            Phase::FixedBody => self.advance_fixed_body(data, cb),
            Phase::EofBody => self.advance_eof_body(data, cb),
            Phase::ChunkExpectCrlf => self.advance_chunk_crlf(data),
            Phase::ChunkSize => self.advance_chunk_size(data, cb),
            Phase::ChunkData => self.advance_chunk_data(data, cb),
            Phase::Trailers => self.advance_trailers(data, cb),
            Phase::Done => Ok(0),
            Phase::Errored => unreachable!("checked in write()"),
        }
    }

    /// Signal transport end-of-stream. Only valid once the header has
    /// been parsed and the body (if any) is EOF-delimited; anywhere
    /// else an EOF means the message was truncated.
    pub fn write_eof<C: Callbacks>(&mut self, cb: &mut C) -> Result<(), ParseError> {
        if self.phase == Phase::Errored {
            return Err(ParseError::AlreadyFailed);
        }
        match self.phase {
            Phase::Done => Ok(()),
            Phase::EofBody => {
                cb.on_body(&[])
                    .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
                self.phase = Phase::Done;
                Ok(())
            }
            _ => {
                self.fail();
                Err(ParseError::PartialMessage)
            }
        }
    }

    /// Flatten a gather-list of input buffers and feed it in one call.
    /// A single non-empty buffer bypasses the copy.
    pub fn write_vectored<C: Callbacks>(
        &mut self,
        bufs: &[&[u8]],
        cb: &mut C,
    ) -> Result<usize, ParseError> {
        let nonempty: Vec<&[u8]> = bufs.iter().copied().filter(|b| !b.is_empty()).collect();
        match nonempty.len() {
            0 => self.write(&[], cb),
            1 => self.write(nonempty[0], cb),
            _ => {
                self.scratch.clear();
                self.scratch.reserve(nonempty.iter().map(|b| b.len()).sum());
                for b in &nonempty {
                    self.scratch.extend_from_slice(b);
                }
                let scratch = std::mem::take(&mut self.scratch);
                let result = self.write(&scratch, cb);
                self.scratch = scratch;
                result
            }
        }
    }

    /// Transfer up to `min(remaining, data.len())` bytes of body
    /// payload directly into `reader`, bypassing
    /// [`Callbacks::on_body`].
    pub fn write_body<B: BodyReader>(
        &mut self,
        data: &[u8],
        reader: &mut B,
    ) -> Result<usize, ParseError> {
        match self.phase {
            Phase::FixedBody | Phase::ChunkData => {
                let n = (data.len() as u64).min(self.len) as usize;
                reader.prepare(n).copy_from_slice(&data[..n]);
                reader.commit(n);
                self.len -= n as u64;
                self.body_bytes_seen += n as u64;
                self.bytes_consumed += n as u64;
                if self.len == 0 {
                    self.phase = if self.phase == Phase::FixedBody {
                        Phase::Done
                    } else {
                        Phase::ChunkExpectCrlf
                    };
                }
                Ok(n)
            }
            _ => Ok(0),
        }
    }

    // ----- header parsing ---------------------------------------------

    fn advance_header<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        // Bound the terminator search to the configured limit rather than
        // rejecting based on however much trailing data (body, or a
        // pipelined next message) the caller happens to have handed over
        // in this call.
        let window_limit = self.config.max_header_size + 4;
        let window_end = data.len().min(window_limit);
        let window = &data[..window_end];
        match grammar::find(window, b"\r\n\r\n", self.skip) {
            None => {
                if window_end >= window_limit {
                    return Err(ParseError::HeaderTooLarge);
                }
                self.skip = window_end.saturating_sub(3);
                Ok(0)
            }
            Some(pos) => {
                let header_end = pos + 4;
                self.skip = 0;
                self.parse_header_block(&data[..header_end], cb)?;
                self.bytes_consumed += header_end as u64;
                Ok(header_end)
            }
        }
    }

    fn parse_header_block<C: Callbacks>(&mut self, block: &[u8], cb: &mut C) -> Result<(), ParseError> {
        let mut pos = self.parse_start_line(block, cb)?;
        let mut count = 0usize;
        loop {
            if block[pos..].starts_with(b"\r\n") {
                pos += 2;
                break;
            }
            let (name, rest) = grammar::field_name(&block[pos..]).ok_or(ParseError::BadField)?;
            pos += rest;
            if block.get(pos) != Some(&b':') {
                return Err(ParseError::BadField);
            }
            pos += 1;

            count += 1;
            if count > self.config.max_headers {
                return Err(ParseError::HeaderTooLarge);
            }

            let mut folded: Vec<u8> = Vec::new();
            let (value, next_pos) = read_field_value(block, pos, &mut folded)?;
            pos = next_pos;

            self.apply_framing(name, value)?;
            cb.on_field(name, value)
                .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
        }
        self.flags.set(Flags::HAVE_HEADER);
        self.determine_body_handling()?;
        cb.on_header()
            .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
        Ok(())
    }

    fn parse_start_line<C: Callbacks>(&mut self, block: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        if R::IS_REQUEST {
            let (method, mut pos) = grammar::method(block).ok_or(ParseError::BadMethod)?;
            if block.get(pos) != Some(&b' ') {
                return Err(ParseError::BadMethod);
            }
            pos += 1;
            let (target, adv) =
                grammar::request_target(&block[pos..]).ok_or(ParseError::BadPath)?;
            pos += adv;
            let (version, adv) = grammar::version(&block[pos..]).ok_or(ParseError::BadVersion)?;
            pos += adv;
            pos += grammar::crlf(&block[pos..]).ok_or(ParseError::BadVersion)?;
            self.version = version;
            if version >= 11 {
                self.flags.set(Flags::HTTP_11);
            }
            cb.on_request(method, target, version)
                .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
            Ok(pos)
        } else {
            let (version, mut pos) = grammar::version(block).ok_or(ParseError::BadVersion)?;
            if block.get(pos) != Some(&b' ') {
                return Err(ParseError::BadVersion);
            }
            pos += 1;
            let (status, adv) =
                grammar::status_code(&block[pos..]).ok_or(ParseError::BadStatus)?;
            pos += adv;
            if block.get(pos) != Some(&b' ') {
                return Err(ParseError::BadStatus);
            }
            pos += 1;
            let (reason, adv) =
                grammar::reason_phrase(&block[pos..]).ok_or(ParseError::BadReason)?;
            pos += adv;
            pos += grammar::crlf(&block[pos..]).ok_or(ParseError::BadReason)?;
            self.version = version;
            self.status = status;
            if version >= 11 {
                self.flags.set(Flags::HTTP_11);
            }
            cb.on_response(status, reason, version)
                .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
            Ok(pos)
        }
    }

    // ----- framing decisions ------------------------------------------

    fn apply_framing(&mut self, name: &[u8], value: &[u8]) -> Result<(), ParseError> {
        if crate::classify::eq_ignore_case(b"content-length", name) {
            if self.flags.has(Flags::CONTENT_LENGTH) || self.flags.has(Flags::CHUNKED) {
                return Err(ParseError::BadContentLength);
            }
            let n = grammar::decimal(grammar::trim(value)).ok_or(ParseError::BadContentLength)?;
            self.len = n;
            self.flags.set(Flags::CONTENT_LENGTH);
        } else if crate::classify::eq_ignore_case(b"transfer-encoding", name) {
            if self.flags.has(Flags::CHUNKED) || self.flags.has(Flags::CONTENT_LENGTH) {
                return Err(ParseError::BadTransferEncoding);
            }
            let tokens = grammar::token_list(value).ok_or(ParseError::BadTransferEncoding)?;
            if let Some(last) = tokens.last() {
                if crate::classify::eq_ignore_case(b"chunked", last) {
                    self.flags.set(Flags::CHUNKED);
                    self.len = 0;
                }
            }
        } else if crate::classify::eq_ignore_case(b"connection", name)
            || crate::classify::eq_ignore_case(b"proxy-connection", name)
        {
            let tokens = grammar::token_list(value).ok_or(ParseError::BadValue)?;
            for tok in tokens {
                if crate::classify::eq_ignore_case(b"close", tok) {
                    self.flags.set(Flags::CONN_CLOSE);
                } else if crate::classify::eq_ignore_case(b"keep-alive", tok) {
                    self.flags.set(Flags::CONN_KEEPALIVE);
                } else if crate::classify::eq_ignore_case(b"upgrade", tok) {
                    self.flags.set(Flags::CONN_UPGRADE);
                }
            }
        } else if crate::classify::eq_ignore_case(b"upgrade", name) {
            self.flags.set(Flags::UPGRADE);
        }
        Ok(())
    }

    fn determine_body_handling(&mut self) -> Result<(), ParseError> {
        let forced_no_body = self.flags.has(Flags::SKIP_BODY)
            || (!R::IS_REQUEST && matches!(self.status, 100..=199 | 204 | 304));

        if forced_no_body {
            self.phase = Phase::NoBody;
            return Ok(());
        }

        if self.flags.has(Flags::CHUNKED) {
            self.phase = Phase::ChunkSize;
        } else if self.flags.has(Flags::CONTENT_LENGTH) {
            self.phase = if self.len == 0 { Phase::NoBody } else { Phase::FixedBody };
        } else if R::IS_REQUEST {
            // Requests default to no body absent explicit framing.
            self.phase = Phase::NoBody;
        } else {
            self.flags.set(Flags::NEED_EOF);
            self.phase = Phase::EofBody;
        }
        Ok(())
    }

    // ----- body phases --------------------------------------------------

    fn advance_fixed_body<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        let n = (data.len() as u64).min(self.len) as usize;
        if self.body_bytes_seen + n as u64 > self.config.max_body_size as u64 {
            return Err(ParseError::BodyTooLarge);
        }
        if n > 0 {
            cb.on_body(&data[..n])
                .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
        }
        self.len -= n as u64;
        self.body_bytes_seen += n as u64;
        self.bytes_consumed += n as u64;
        if self.len == 0 {
            self.phase = Phase::Done;
        }
        Ok(n)
    }

    fn advance_eof_body<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        if data.is_empty() {
            return Ok(0);
        }
        if self.body_bytes_seen + data.len() as u64 > self.config.max_body_size as u64 {
            return Err(ParseError::BodyTooLarge);
        }
        cb.on_body(data)
            .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
        self.body_bytes_seen += data.len() as u64;
        self.bytes_consumed += data.len() as u64;
        Ok(data.len())
    }

    // ----- chunked decoder ----------------------------------------------

    fn advance_chunk_crlf(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if data.len() < 2 {
            return Ok(0);
        }
        if &data[..2] != b"\r\n" {
            return Err(ParseError::BadChunk);
        }
        self.phase = Phase::ChunkSize;
        self.bytes_consumed += 2;
        Ok(2)
    }

    fn advance_chunk_size<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        match grammar::find(data, b"\r\n", self.skip) {
            None => {
                self.skip = data.len().saturating_sub(1);
                Ok(0)
            }
            Some(crlf_pos) => {
                self.skip = 0;
                let line = &data[..crlf_pos];
                let semi = line.iter().position(|&b| b == b';');
                let (size_bytes, ext) = match semi {
                    Some(p) => (&line[..p], &line[p..]),
                    None => (line, &line[line.len()..]),
                };
                if !grammar::validate_chunk_ext(ext) {
                    return Err(ParseError::BadChunk);
                }
                let size = grammar::hex(size_bytes).ok_or(ParseError::BadChunk)?;
                if size > 0 && self.body_bytes_seen + size > self.config.max_body_size as u64 {
                    return Err(ParseError::BodyTooLarge);
                }
                cb.on_chunk(size, ext)
                    .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;

                let consumed = crlf_pos + 2;
                self.bytes_consumed += consumed as u64;
                if size == 0 {
                    self.phase = Phase::Trailers;
                } else {
                    self.len = size;
                    self.phase = Phase::ChunkData;
                }
                Ok(consumed)
            }
        }
    }

    fn advance_chunk_data<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        let n = (data.len() as u64).min(self.len) as usize;
        if self.body_bytes_seen + n as u64 > self.config.max_body_size as u64 {
            return Err(ParseError::BodyTooLarge);
        }
        if n > 0 {
            cb.on_body(&data[..n])
                .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
        }
        self.len -= n as u64;
        self.body_bytes_seen += n as u64;
        self.bytes_consumed += n as u64;
        if self.len == 0 {
            self.phase = Phase::ChunkExpectCrlf;
        }
        Ok(n)
    }

    fn advance_trailers<C: Callbacks>(&mut self, data: &[u8], cb: &mut C) -> Result<usize, ParseError> {
        let window_limit = self.config.max_header_size + 4;
        let window_end = data.len().min(window_limit);
        let window = &data[..window_end];
        match grammar::find(window, b"\r\n\r\n", self.skip) {
            None => {
                if window_end >= window_limit {
                    return Err(ParseError::HeaderTooLarge);
                }
                self.skip = window_end.saturating_sub(3);
                Ok(0)
            }
            Some(pos) => {
                let end = pos + 4;
                self.skip = 0;
                self.parse_trailer_block(&data[..end], cb)?;
                self.bytes_consumed += end as u64;
                self.phase = Phase::Done;
                Ok(end)
            }
        }
    }

    fn parse_trailer_block<C: Callbacks>(&mut self, block: &[u8], cb: &mut C) -> Result<(), ParseError> {
        let mut pos = 0;
        let mut count = 0usize;
        loop {
            if block[pos..].starts_with(b"\r\n") {
                break;
            }
            let (name, rest) = grammar::field_name(&block[pos..]).ok_or(ParseError::BadField)?;
            pos += rest;
            if block.get(pos) != Some(&b':') {
                return Err(ParseError::BadField);
            }
            pos += 1;
            count += 1;
            if count > self.config.max_headers {
                return Err(ParseError::HeaderTooLarge);
            }
            let mut folded: Vec<u8> = Vec::new();
            let (value, next_pos) = read_field_value(block, pos, &mut folded)?;
            pos = next_pos;
            cb.on_field(name, value)
                .map_err(|e| ParseError::CallbackAborted(Box::new(e)))?;
        }
        Ok(())
    }
}

/// Read a (possibly obs-folded) field value starting right after the
/// `:`. Returns the trimmed, logical value and the offset of the first
/// byte of the next field line. `folded` is borrowed scratch space used
/// only when continuation lines must be joined.
fn read_field_value<'b>(
    block: &'b [u8],
    pos: usize,
    folded: &'b mut Vec<u8>,
) -> Result<(&'b [u8], usize), ParseError> {
    let line_end = grammar::find(block, b"\r\n", pos).ok_or(ParseError::BadField)?;
    if block[pos..line_end]
        .iter()
        .any(|&b| crate::classify::to_value_char(b).is_none())
    {
        return Err(ParseError::BadValue);
    }
    let mut segments: Vec<&[u8]> = vec![grammar::trim(&block[pos..line_end])];
    let mut cursor = line_end + 2;

    loop {
        let next_is_fold = matches!(block.get(cursor), Some(&b) if b == b' ' || b == b'\t');
        if !next_is_fold {
            break;
        }
        let fold_line_end = grammar::find(block, b"\r\n", cursor).ok_or(ParseError::BadField)?;
        if block[cursor..fold_line_end]
            .iter()
            .any(|&b| crate::classify::to_value_char(b).is_none())
        {
            return Err(ParseError::BadValue);
        }
        segments.push(grammar::trim(&block[cursor..fold_line_end]));
        cursor = fold_line_end + 2;
    }

    let value: &[u8] = if segments.len() == 1 {
        segments[0]
    } else {
        for (i, seg) in segments.iter().enumerate() {
            if i > 0 {
                folded.push(b' ');
            }
            folded.extend_from_slice(seg);
        }
        folded.as_slice()
    };
    Ok((value, cursor))
}

impl<R: Role> Default for Parser<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience alias for a request parser.
pub type RequestParser = Parser<Request>;
/// Convenience alias for a response parser.
pub type ResponseParser = Parser<crate::role::Response>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Response;

    #[derive(Default)]
    struct Recorder {
        request_line: Option<(Vec<u8>, Vec<u8>, u8)>,
        status_line: Option<(u16, Vec<u8>, u8)>,
        fields: Vec<(Vec<u8>, Vec<u8>)>,
        chunks: Vec<(u64, Vec<u8>)>,
        body: Vec<u8>,
        header_done: bool,
    }

    impl Callbacks for Recorder {
        type Error = std::convert::Infallible;

        fn on_request(&mut self, method: &[u8], target: &[u8], version: u8) -> Result<(), Self::Error> {
            self.request_line = Some((method.to_vec(), target.to_vec(), version));
            Ok(())
        }

        fn on_response(&mut self, status: u16, reason: &[u8], version: u8) -> Result<(), Self::Error> {
            self.status_line = Some((status, reason.to_vec(), version));
            Ok(())
        }

        fn on_field(&mut self, name: &[u8], value: &[u8]) -> Result<(), Self::Error> {
            self.fields.push((name.to_vec(), value.to_vec()));
            Ok(())
        }

        fn on_header(&mut self) -> Result<(), Self::Error> {
            self.header_done = true;
            Ok(())
        }

        fn on_chunk(&mut self, size: u64, ext: &[u8]) -> Result<(), Self::Error> {
            self.chunks.push((size, ext.to_vec()));
            Ok(())
        }

        fn on_body(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.body.extend_from_slice(data);
            Ok(())
        }
    }

    #[test]
    fn parses_simple_get_with_no_body() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let input = b"GET /foo HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let n = p.write(input, &mut r).unwrap();
        assert_eq!(n, input.len());
        assert!(p.is_done());
        assert_eq!(r.request_line.unwrap(), (b"GET".to_vec(), b"/foo".to_vec(), 11));
        assert_eq!(r.fields, vec![(b"Host".to_vec(), b"example.com".to_vec())]);
        assert!(r.header_done);
        assert!(r.body.is_empty());
    }

    #[test]
    fn parses_fixed_length_body() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let input = b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let n = p.write(input, &mut r).unwrap();
        assert_eq!(n, input.len());
        assert!(p.is_done());
        assert_eq!(r.body, b"hello");
        assert_eq!(p.content_length(), Some(5));
    }

    #[test]
    fn buffer_split_invariance_for_header_and_body() {
        let input: &[u8] = b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nabcd";
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let mut offset = 0;
        while offset < input.len() {
            let consumed = p.write(&input[offset..], &mut r).unwrap();
            if consumed == 0 {
                offset += 1;
            } else {
                offset += consumed;
            }
        }
        assert!(p.is_done());
        assert_eq!(r.body, b"abcd");
    }

    #[test]
    fn parses_response_with_no_body_status() {
        let mut p = Parser::<Response>::new();
        let mut r = Recorder::default();
        let input = b"HTTP/1.1 204 No Content\r\n\r\n";
        p.write(input, &mut r).unwrap();
        assert!(p.is_done());
        assert_eq!(r.status_line.unwrap().0, 204);
    }

    #[test]
    fn response_without_framing_headers_reads_until_eof() {
        let mut p = Parser::<Response>::new();
        let mut r = Recorder::default();
        let headers = b"HTTP/1.1 200 OK\r\n\r\n";
        let n = p.write(headers, &mut r).unwrap();
        assert_eq!(n, headers.len());
        assert!(p.needs_eof());
        p.write(b"partial body", &mut r).unwrap();
        p.write_eof(&mut r).unwrap();
        assert!(p.is_done());
        assert_eq!(r.body, b"partial body");
        assert!(!p.keep_alive());
    }

    #[test]
    fn parses_chunked_body_with_trailer() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\nX-Trailer: done\r\n\r\n";
        let n = p.write(input, &mut r).unwrap();
        assert_eq!(n, input.len());
        assert!(p.is_done());
        assert_eq!(r.body, b"Wikipedia");
        assert_eq!(r.chunks.len(), 3);
        assert_eq!(r.chunks[2].0, 0);
        assert!(r.fields.iter().any(|(n, v)| n == b"X-Trailer" && v == b"done"));
    }

    #[test]
    fn chunk_extension_is_forwarded_and_validated() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3;foo=bar\r\nabc\r\n0\r\n\r\n";
        p.write(input, &mut r).unwrap();
        assert!(p.is_done());
        assert_eq!(r.chunks[0], (3, b";foo=bar".to_vec()));
    }

    #[test]
    fn obs_fold_header_value_is_joined_with_single_space() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let input = b"GET / HTTP/1.1\r\nX-Long: first\r\n second\r\n\r\n";
        p.write(input, &mut r).unwrap();
        assert_eq!(r.fields[0].1, b"first second");
    }

    #[test]
    fn duplicate_content_length_is_rejected() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let input = b"GET / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\n";
        assert!(p.write(input, &mut r).is_err());
    }

    #[test]
    fn content_length_and_chunked_together_is_rejected() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let input =
            b"GET / HTTP/1.1\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\n";
        assert!(p.write(input, &mut r).is_err());
    }

    #[test]
    fn parser_is_sticky_after_failure() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let bad = b"BAD METHOD HERE HTTP/1.1\r\n\r\n";
        assert!(p.write(bad, &mut r).is_err());
        match p.write(b"GET / HTTP/1.1\r\n\r\n", &mut r) {
            Err(ParseError::AlreadyFailed) => {}
            other => panic!("expected AlreadyFailed, got {other:?}"),
        }
    }

    #[test]
    fn write_vectored_flattens_multiple_buffers() {
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let parts: &[&[u8]] = &[b"GET / HTT", b"P/1.1\r\nHost", b": x\r\n\r\n"];
        let n = p.write_vectored(parts, &mut r).unwrap();
        assert!(p.is_done());
        assert_eq!(n, parts.iter().map(|b| b.len()).sum::<usize>());
    }

    #[test]
    fn write_body_bypasses_on_body_callback() {
        use crate::body::BodyBuf;
        let mut p = Parser::<Request>::new();
        let mut r = Recorder::default();
        let headers = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\n";
        p.write(headers, &mut r).unwrap();
        let mut reader = BodyBuf::new();
        let n = p.write_body(b"hello", &mut reader).unwrap();
        assert_eq!(n, 5);
        assert!(p.is_done());
        assert_eq!(reader.as_slice(), b"hello");
        assert!(r.body.is_empty());
    }
}
