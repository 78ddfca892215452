//! # corewire
//!
//! An incremental, callback-driven parser for RFC 7230 HTTP/1.x
//! messages — both requests and responses.
//!
//! The parser never owns a socket, never owns the message, and never
//! accumulates the header section or body into an internal buffer: the
//! caller drives it by repeatedly calling [`Parser::write`] with
//! whatever bytes it currently has, and a [`Callbacks`] implementation
//! receives each parsed piece (request/status line, header fields,
//! chunk headers, body octets) as soon as it's recognized.
//!
//! ## Quick start
//!
//! ```rust
//! use corewire::{Callbacks, Parser, Request};
//!
//! #[derive(Default)]
//! struct PrintingSink;
//!
//! impl Callbacks for PrintingSink {
//!     type Error = std::convert::Infallible;
//!
//!     fn on_request(&mut self, method: &[u8], target: &[u8], _version: u8) -> Result<(), Self::Error> {
//!         println!("{} {}", String::from_utf8_lossy(method), String::from_utf8_lossy(target));
//!         Ok(())
//!     }
//! }
//!
//! let mut parser = Parser::<Request>::new();
//! let mut sink = PrintingSink;
//! parser
//!     .write(b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n", &mut sink)
//!     .expect("valid request");
//! assert!(parser.is_done());
//! ```
//!
//! Responses use [`Response`] in place of [`Request`] as the type
//! parameter of [`Parser`]; the same `write`/`write_eof` calling
//! convention applies.

mod body;
mod callbacks;
mod classify;
mod error;
mod grammar;
mod parser;
mod role;

pub use body::{BodyBuf, BodyReader};
pub use callbacks::Callbacks;
pub use error::ParseError;
pub use parser::{Parser, ParserConfig, RequestParser, ResponseParser};
pub use role::{Request, Response, Role};
