//! The compile-time request/response role parameter.
//!
//! A sealed marker-type generic selects request- vs response-line
//! parsing and the role-specific framing defaults at compile time,
//! with no runtime branch or virtual dispatch.

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Request {}
    impl Sealed for super::Response {}
}

/// Selects request-line parsing and request-only framing defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request;

/// Selects status-line parsing and response-only framing defaults
/// (1xx/204/304 are body-less).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response;

/// Implemented only by [`Request`] and [`Response`].
pub trait Role: sealed::Sealed {
    /// `true` for [`Request`], `false` for [`Response`].
    const IS_REQUEST: bool;
}

impl Role for Request {
    const IS_REQUEST: bool = true;
}

impl Role for Response {
    const IS_REQUEST: bool = false;
}
