//! Binary wire protocol spoken with the on-device automation agent.
//!
//! # Frame layout (little endian)
//!
//! ```text
//! [u32 len][u8 opcode][payload ...]
//! ```
//!
//! `len` counts the opcode and payload, not the 4-byte header. Strings are a
//! `u32` byte count followed by UTF-8; optional values carry a `u8` presence
//! flag first.
//!
//! # Example
//!
//! ```
//! use swipeseek_core::protocol::{Request, encode_request, decode_request};
//!
//! let req = Request::Swipe { start_x: 150, start_y: 400, end_x: 150, end_y: 200, duration: Some(0.3) };
//! let wire = encode_request(&req);
//! assert_eq!(decode_request(&wire[4..]).unwrap(), req);
//! ```

use thiserror::Error;

/// Errors raised while encoding or decoding frames.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The opcode byte is not part of the protocol.
    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpCode(u8),

    /// The buffer ended before the expected field.
    #[error("insufficient data in buffer")]
    InsufficientData,

    /// A string field is not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    Utf8Error,

    /// The payload does not fit the opcode.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Operation codes, one byte at the start of every frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Keep-alive ping.
    Heartbeat = 0x01,
    /// Tap at absolute coordinates.
    TapCoord = 0x02,
    /// Tap an element by accessibility identifier.
    TapElement = 0x03,
    /// Tap an element by accessibility label.
    TapByLabel = 0x04,
    /// Single-finger swipe between two points.
    Swipe = 0x07,
    /// Full accessibility tree dump.
    DumpTree = 0x10,
    /// Agent-side lookup of a single element.
    FindElement = 0x13,
    /// Bare error message from the agent.
    Error = 0x99,
    /// Typed response.
    Response = 0xA0,
}

impl OpCode {
    /// Converts a raw byte into an `OpCode`.
    pub fn from_u8(byte: u8) -> Result<Self, ProtocolError> {
        Ok(match byte {
            0x01 => OpCode::Heartbeat,
            0x02 => OpCode::TapCoord,
            0x03 => OpCode::TapElement,
            0x04 => OpCode::TapByLabel,
            0x07 => OpCode::Swipe,
            0x10 => OpCode::DumpTree,
            0x13 => OpCode::FindElement,
            0x99 => OpCode::Error,
            0xA0 => OpCode::Response,
            other => return Err(ProtocolError::InvalidOpCode(other)),
        })
    }
}

/// A request sent from the host to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Keep-alive heartbeat.
    Heartbeat,
    /// Tap at absolute screen coordinates.
    TapCoord { x: i32, y: i32 },
    /// Tap an element by its accessibility identifier.
    TapElement { selector: String },
    /// Tap an element by its accessibility label.
    TapByLabel { label: String },
    /// Swipe from one point to another; `duration` is in seconds.
    Swipe {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration: Option<f64>,
    },
    /// Dump the accessibility tree.
    DumpTree,
    /// Find a single element by identifier or label, optionally filtered by type.
    FindElement {
        selector: String,
        by_label: bool,
        element_type: Option<String>,
    },
}

impl Request {
    /// Short static name used as tracing span metadata.
    pub fn opcode_name(&self) -> &'static str {
        match self {
            Request::Heartbeat => "heartbeat",
            Request::TapCoord { .. } => "tap_coord",
            Request::TapElement { .. } => "tap_element",
            Request::TapByLabel { .. } => "tap_by_label",
            Request::Swipe { .. } => "swipe",
            Request::DumpTree => "dump_tree",
            Request::FindElement { .. } => "find_element",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum ResponseType {
    Ok = 0x00,
    Error = 0x01,
    Tree = 0x02,
    Element = 0x05,
}

impl ResponseType {
    fn from_u8(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x00 => Ok(ResponseType::Ok),
            0x01 => Ok(ResponseType::Error),
            0x02 => Ok(ResponseType::Tree),
            0x05 => Ok(ResponseType::Element),
            other => Err(ProtocolError::InvalidPayload(format!(
                "unknown response type: 0x{other:02X}"
            ))),
        }
    }
}

/// A response sent from the agent to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Success with no data.
    Ok,
    /// The agent rejected the request.
    Error { message: String },
    /// JSON accessibility tree (array of root elements).
    Tree { json: String },
    /// JSON for a single element, or the literal `null` when nothing matched.
    Element { json: String },
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn write_optional_string(buf: &mut Vec<u8>, opt: Option<&str>) {
    match opt {
        None => buf.push(0),
        Some(s) => {
            buf.push(1);
            write_string(buf, s);
        }
    }
}

/// Sequential reader over a frame payload.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let end = self.pos + N;
        let bytes: [u8; N] = self
            .data
            .get(self.pos..end)
            .and_then(|s| s.try_into().ok())
            .ok_or(ProtocolError::InsufficientData)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take::<1>()?[0])
    }

    fn bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.u8()? != 0)
    }

    fn i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn string(&mut self) -> Result<String, ProtocolError> {
        let len = u32::from_le_bytes(self.take()?) as usize;
        let end = self.pos + len;
        let raw = self
            .data
            .get(self.pos..end)
            .ok_or(ProtocolError::InsufficientData)?;
        let s = std::str::from_utf8(raw).map_err(|_| ProtocolError::Utf8Error)?;
        self.pos = end;
        Ok(s.to_owned())
    }

    fn optional_string(&mut self) -> Result<Option<String>, ProtocolError> {
        if self.bool()? {
            self.string().map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Prefixes `payload` with its 4-byte length header.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Reads the payload length from a frame header.
pub fn read_frame_length(header: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*header)
}

/// Encodes a [`Request`] into a complete frame, header included.
pub fn encode_request(req: &Request) -> Vec<u8> {
    let mut payload = Vec::new();

    match req {
        Request::Heartbeat => payload.push(OpCode::Heartbeat as u8),
        Request::TapCoord { x, y } => {
            payload.push(OpCode::TapCoord as u8);
            payload.extend_from_slice(&x.to_le_bytes());
            payload.extend_from_slice(&y.to_le_bytes());
        }
        Request::TapElement { selector } => {
            payload.push(OpCode::TapElement as u8);
            write_string(&mut payload, selector);
        }
        Request::TapByLabel { label } => {
            payload.push(OpCode::TapByLabel as u8);
            write_string(&mut payload, label);
        }
        Request::Swipe {
            start_x,
            start_y,
            end_x,
            end_y,
            duration,
        } => {
            payload.push(OpCode::Swipe as u8);
            for v in [start_x, start_y, end_x, end_y] {
                payload.extend_from_slice(&v.to_le_bytes());
            }
            match duration {
                None => payload.push(0),
                Some(d) => {
                    payload.push(1);
                    payload.extend_from_slice(&d.to_le_bytes());
                }
            }
        }
        Request::DumpTree => payload.push(OpCode::DumpTree as u8),
        Request::FindElement {
            selector,
            by_label,
            element_type,
        } => {
            payload.push(OpCode::FindElement as u8);
            write_string(&mut payload, selector);
            payload.push(u8::from(*by_label));
            write_optional_string(&mut payload, element_type.as_deref());
        }
    }

    encode_frame(&payload)
}

/// Decodes a request payload (opcode onwards, without the length header).
pub fn decode_request(data: &[u8]) -> Result<Request, ProtocolError> {
    let mut r = Reader::new(data);
    let opcode = OpCode::from_u8(r.u8()?)?;

    match opcode {
        OpCode::Heartbeat => Ok(Request::Heartbeat),
        OpCode::TapCoord => Ok(Request::TapCoord {
            x: r.i32()?,
            y: r.i32()?,
        }),
        OpCode::TapElement => Ok(Request::TapElement {
            selector: r.string()?,
        }),
        OpCode::TapByLabel => Ok(Request::TapByLabel { label: r.string()? }),
        OpCode::Swipe => {
            let start_x = r.i32()?;
            let start_y = r.i32()?;
            let end_x = r.i32()?;
            let end_y = r.i32()?;
            let duration = if r.bool()? { Some(r.f64()?) } else { None };
            Ok(Request::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
                duration,
            })
        }
        OpCode::DumpTree => Ok(Request::DumpTree),
        OpCode::FindElement => Ok(Request::FindElement {
            selector: r.string()?,
            by_label: r.bool()?,
            element_type: r.optional_string()?,
        }),
        OpCode::Error | OpCode::Response => Err(ProtocolError::InvalidPayload(format!(
            "opcode 0x{:02X} is not a request",
            opcode as u8
        ))),
    }
}

/// Encodes a [`Response`] into a complete frame, header included.
pub fn encode_response(resp: &Response) -> Vec<u8> {
    let mut payload = vec![OpCode::Response as u8];

    match resp {
        Response::Ok => payload.push(ResponseType::Ok as u8),
        Response::Error { message } => {
            payload.push(ResponseType::Error as u8);
            write_string(&mut payload, message);
        }
        Response::Tree { json } => {
            payload.push(ResponseType::Tree as u8);
            write_string(&mut payload, json);
        }
        Response::Element { json } => {
            payload.push(ResponseType::Element as u8);
            write_string(&mut payload, json);
        }
    }

    encode_frame(&payload)
}

/// Decodes a response payload (opcode onwards, without the length header).
///
/// Accepts both the typed `Response` opcode and a bare `Error` opcode.
pub fn decode_response(data: &[u8]) -> Result<Response, ProtocolError> {
    let mut r = Reader::new(data);

    match OpCode::from_u8(r.u8()?)? {
        OpCode::Response => match ResponseType::from_u8(r.u8()?)? {
            ResponseType::Ok => Ok(Response::Ok),
            ResponseType::Error => Ok(Response::Error {
                message: r.string()?,
            }),
            ResponseType::Tree => Ok(Response::Tree { json: r.string()? }),
            ResponseType::Element => Ok(Response::Element { json: r.string()? }),
        },
        OpCode::Error => Ok(Response::Error {
            message: r.string()?,
        }),
        other => Err(ProtocolError::InvalidPayload(format!(
            "opcode 0x{:02X} is not a response",
            other as u8
        ))),
    }
}
