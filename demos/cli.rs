//! corewire CLI — drives the streaming parser over a raw HTTP/1.x
//! message read from a file, `--raw`, or stdin, and renders whatever it
//! collected in the chosen format. Not part of the library's public
//! contract; it exists to exercise the parser end-to-end.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser as ClapParser};
use serde::Serialize;

use corewire::{Callbacks, Parser, ParserConfig, Request, Response};

/// corewire CLI — streaming HTTP/1.x parser.
///
/// Reads a raw HTTP request or response from a file, --raw string, or
/// stdin and prints a structured representation in the chosen format.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted
/// so a full message can be passed as a single shell argument.
#[derive(ClapParser)]
#[command(name = "corewire-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw HTTP message.
    /// Reads from stdin when neither FILE nor --raw is given.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Raw HTTP message string (escape sequences \r \n \t \\ expanded).
    #[arg(long)]
    raw: Option<String>,

    /// Parse the input as a response instead of a request.
    #[arg(long)]
    response: bool,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Maximum allowed body size in bytes.
    #[arg(long, default_value = "10485760")]
    max_body_size: usize,

    /// Maximum number of headers allowed.
    #[arg(long, default_value = "128")]
    max_headers: usize,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// JSON output.
    Json,
    /// Human-readable debug output.
    Debug,
    /// Start line + headers only.
    Headers,
}

/// An owned message assembled from callback events, for display.
#[derive(Debug, Default, Serialize)]
struct Message {
    method: Option<String>,
    target: Option<String>,
    status: Option<u16>,
    reason: Option<String>,
    version: String,
    headers: Vec<(String, String)>,
    #[serde(serialize_with = "serialize_body")]
    body: Vec<u8>,
}

fn serialize_body<S: serde::Serializer>(body: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(body))
}

#[derive(Debug)]
struct Never(std::convert::Infallible);

impl std::fmt::Display for Never {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {}
    }
}
impl std::error::Error for Never {}

impl Callbacks for Message {
    type Error = Never;

    fn on_request(&mut self, method: &[u8], target: &[u8], version: u8) -> Result<(), Self::Error> {
        self.method = Some(String::from_utf8_lossy(method).into_owned());
        self.target = Some(String::from_utf8_lossy(target).into_owned());
        self.version = format!("HTTP/{}.{}", version / 10, version % 10);
        Ok(())
    }

    fn on_response(&mut self, status: u16, reason: &[u8], version: u8) -> Result<(), Self::Error> {
        self.status = Some(status);
        self.reason = Some(String::from_utf8_lossy(reason).into_owned());
        self.version = format!("HTTP/{}.{}", version / 10, version % 10);
        Ok(())
    }

    fn on_field(&mut self, name: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.headers.push((
            String::from_utf8_lossy(name).into_owned(),
            String::from_utf8_lossy(value).into_owned(),
        ));
        Ok(())
    }

    fn on_body(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.body.extend_from_slice(data);
        Ok(())
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.file.is_none() && cli.raw.is_none() && std::io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    if data.is_empty() {
        eprintln!("Error: empty input");
        process::exit(1);
    }

    let config = ParserConfig {
        max_body_size: cli.max_body_size,
        max_headers: cli.max_headers,
        ..ParserConfig::default()
    };

    let mut message = Message::default();
    let result = if cli.response {
        let mut parser = Parser::<Response>::with_config(config);
        run_to_completion(&mut parser, &data, &mut message)
    } else {
        let mut parser = Parser::<Request>::with_config(config);
        run_to_completion(&mut parser, &data, &mut message)
    };

    if let Err(e) = result {
        eprintln!("Parse error: {e}");
        process::exit(2);
    }

    let output = match cli.format {
        OutputFormat::Json => format_json(&message, cli.pretty),
        OutputFormat::Debug => format_debug(&message),
        OutputFormat::Headers => format_headers_only(&message),
    };

    print!("{output}");
}

fn run_to_completion<R: corewire::Role>(
    parser: &mut Parser<R>,
    data: &[u8],
    sink: &mut Message,
) -> Result<(), corewire::ParseError> {
    let mut offset = 0;
    while offset < data.len() && parser.need_more() {
        let consumed = parser.write(&data[offset..], sink)?;
        if consumed == 0 {
            break;
        }
        offset += consumed;
    }
    if parser.need_more() {
        parser.write_eof(sink)?;
    }
    Ok(())
}

fn read_input(cli: &Cli) -> Result<Vec<u8>, std::io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn format_json(message: &Message, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(message).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    } else {
        serde_json::to_string(message).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

fn format_debug(message: &Message) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("=== HTTP Message ===\n");
    if let Some(method) = &message.method {
        out.push_str(&format!(
            "{} {} {}\n",
            method,
            message.target.as_deref().unwrap_or(""),
            message.version
        ));
    } else if let Some(status) = message.status {
        out.push_str(&format!(
            "{} {} {}\n",
            message.version,
            status,
            message.reason.as_deref().unwrap_or("")
        ));
    }
    out.push_str(&format!("\n--- Headers ({}) ---\n", message.headers.len()));
    for (name, value) in &message.headers {
        out.push_str(&format!("  {name}: {value}\n"));
    }
    if message.body.is_empty() {
        out.push_str("\n--- No Body ---\n");
    } else {
        out.push_str(&format!("\n--- Body ({} bytes) ---\n", message.body.len()));
        match std::str::from_utf8(&message.body) {
            Ok(s) => out.push_str(s),
            Err(_) => out.push_str(&format!("<binary data: {} bytes>", message.body.len())),
        }
        out.push('\n');
    }
    out.push_str("====================\n");
    out
}

fn format_headers_only(message: &Message) -> String {
    let mut out = String::with_capacity(64 + message.headers.len() * 40);
    if let Some(method) = &message.method {
        out.push_str(&format!(
            "{} {} {}\n",
            method,
            message.target.as_deref().unwrap_or(""),
            message.version
        ));
    } else if let Some(status) = message.status {
        out.push_str(&format!(
            "{} {} {}\n",
            message.version,
            status,
            message.reason.as_deref().unwrap_or("")
        ));
    }
    for (name, value) in &message.headers {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out
}
