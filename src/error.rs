use std::fmt;

/// Errors that can occur while parsing an HTTP/1.x message.
///
/// An error is never recovered internally: once one is returned, the
/// parser enters a sticky errored state and any further `write`/
/// `write_eof` call returns [`ParseError::AlreadyFailed`] rather than
/// being reused.
#[derive(Debug)]
pub enum ParseError {
    /// Malformed or empty request method.
    BadMethod,
    /// Malformed or empty request-target.
    BadPath,
    /// Malformed `HTTP-version` token.
    BadVersion,
    /// Malformed status-code.
    BadStatus,
    /// Malformed reason-phrase.
    BadReason,
    /// Empty header name, or missing `:`.
    BadField,
    /// A header value contains a byte outside `TEXT`, or a
    /// framing-sensitive header (`Connection`, `Proxy-Connection`)
    /// contains a malformed token list.
    BadValue,
    /// `Content-Length` duplicated, non-numeric, or co-occurring with
    /// `Transfer-Encoding: chunked`.
    BadContentLength,
    /// `Transfer-Encoding` duplicated, malformed, or co-occurring with
    /// `Content-Length`.
    BadTransferEncoding,
    /// Malformed chunk-size line, chunk-ext, chunk-data terminator, or
    /// trailer section.
    BadChunk,
    /// EOF was signaled before the header, or before a declared body,
    /// was fully received.
    PartialMessage,
    /// The header section exceeded the configured size cap, or the
    /// number of header fields exceeded the configured count cap.
    HeaderTooLarge,
    /// The body exceeded the configured size cap.
    BodyTooLarge,
    /// A [`crate::Callbacks`] method returned an error, short-circuiting
    /// the current `write`/`write_eof` call.
    CallbackAborted(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// `write`/`write_eof` was called again after a previous call
    /// already returned an error.
    AlreadyFailed,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMethod => write!(f, "malformed request method"),
            Self::BadPath => write!(f, "malformed request-target"),
            Self::BadVersion => write!(f, "malformed HTTP version"),
            Self::BadStatus => write!(f, "malformed status code"),
            Self::BadReason => write!(f, "malformed reason phrase"),
            Self::BadField => write!(f, "malformed header field name"),
            Self::BadValue => write!(f, "malformed header field value"),
            Self::BadContentLength => write!(f, "invalid or conflicting Content-Length"),
            Self::BadTransferEncoding => write!(f, "invalid or conflicting Transfer-Encoding"),
            Self::BadChunk => write!(f, "malformed chunked transfer coding"),
            Self::PartialMessage => write!(f, "message ended before it was complete"),
            Self::HeaderTooLarge => write!(f, "header section exceeds configured limit"),
            Self::BodyTooLarge => write!(f, "body exceeds configured limit"),
            Self::CallbackAborted(e) => write!(f, "callback error: {e}"),
            Self::AlreadyFailed => write!(f, "parser already failed and cannot be reused"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CallbackAborted(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
