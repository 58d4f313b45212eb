//! Wire protocol between the fog-of-war editor host and its rendering worker.
//!
//! Every message is a JSON object tagged by `cmd`. Inbound messages are either
//! renderer [`Command`]s or interactive-surface [`InputCommand`]s; outbound
//! messages are [`Event`]s. Two encodings are supported:
//!
//! - JSON text, one message per line ([`decode_inbound`], [`encode_event`]);
//! - a length-delimited protobuf envelope that carries the same payload as a
//!   `google.protobuf.Value` and moves PNG blobs as raw bytes
//!   ([`decode_inbound_frame`], [`encode_event_frame`]).

use prost::Message;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code and retryable flag for structured error events.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Error returned by the decoders and encoders in this crate.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input is not a JSON object.
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The object has no string `cmd` field.
    #[error("message has no cmd")]
    MissingCmd,
    /// `cmd` names nothing this protocol knows.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// `cmd` is known but its fields do not match.
    #[error("invalid payload for {cmd}: {source}")]
    InvalidPayload {
        cmd: String,
        #[source]
        source: serde_json::Error,
    },
    /// The raw bytes could not be decoded as a protobuf envelope.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl ErrorCode for CodecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "E_INVALID_JSON",
            Self::MissingCmd => "E_MISSING_CMD",
            Self::UnknownCommand(_) => "E_UNKNOWN_COMMAND",
            Self::InvalidPayload { .. } => "E_INVALID_PAYLOAD",
            Self::Decode(_) => "E_DECODE",
        }
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// Rectangle as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WireRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Payload of the `init` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitValues {
    pub screen_width: f64,
    pub screen_height: f64,
    #[serde(default)]
    pub angle: f64,
    /// Location of the background image (URL or path).
    pub background: String,
    /// Location of a previously saved overlay, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
}

/// Commands understood by the rendering worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Init {
        values: InitValues,
    },
    Resize {
        width: f64,
        height: f64,
    },
    Rotate {
        angle: f64,
    },
    StartRecording,
    Record {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        buttons: u16,
    },
    #[serde(rename = "endrecording")]
    EndRecording,
    Obscure,
    Reveal,
    Clear,
    #[serde(rename = "clearselection")]
    ClearSelection,
    Opacity {
        #[serde(deserialize_with = "decimal")]
        opacity: String,
    },
    Colour {
        #[serde(deserialize_with = "decimal")]
        red: String,
        #[serde(deserialize_with = "decimal")]
        green: String,
        #[serde(deserialize_with = "decimal")]
        blue: String,
    },
    Zoom {
        rect: WireRect,
    },
    ZoomIn,
    ZoomOut,
    Player {
        #[serde(rename = "screenWidth")]
        screen_width: f64,
        #[serde(rename = "screenHeight")]
        screen_height: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        viewport: Option<WireRect>,
        /// Nominal table size the viewport is expressed in. Defaults to the
        /// decoded background size.
        #[serde(default, rename = "tableWidth", skip_serializing_if = "Option::is_none")]
        table_width: Option<f64>,
        #[serde(default, rename = "tableHeight", skip_serializing_if = "Option::is_none")]
        table_height: Option<f64>,
    },
}

/// Every `cmd` value that maps to a [`Command`].
pub const COMMAND_NAMES: &[&str] = &[
    "init",
    "resize",
    "rotate",
    "start_recording",
    "record",
    "endrecording",
    "obscure",
    "reveal",
    "clear",
    "clearselection",
    "opacity",
    "colour",
    "zoom",
    "zoom_in",
    "zoom_out",
    "player",
];

impl Command {
    /// The `cmd` tag of this command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Resize { .. } => "resize",
            Self::Rotate { .. } => "rotate",
            Self::StartRecording => "start_recording",
            Self::Record { .. } => "record",
            Self::EndRecording => "endrecording",
            Self::Obscure => "obscure",
            Self::Reveal => "reveal",
            Self::Clear => "clear",
            Self::ClearSelection => "clearselection",
            Self::Opacity { .. } => "opacity",
            Self::Colour { .. } => "colour",
            Self::Zoom { .. } => "zoom",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::Player { .. } => "player",
        }
    }
}

/// Pointer phase of an interactive-surface input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Leave,
}

/// Tool names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    Select,
    Paint,
    Pan,
    Rotate,
    Zoom,
}

/// Raw interactive-surface input, consumed by the host's interaction machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum InputCommand {
    Pointer {
        kind: PointerKind,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        buttons: u16,
    },
    Tool {
        tool: ToolName,
    },
    Cancel,
}

/// Every `cmd` value that maps to an [`InputCommand`].
pub const INPUT_NAMES: &[&str] = &["pointer", "tool", "cancel"];

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Render(Command),
    Input(InputCommand),
}

/// Events emitted by the worker and host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Event {
    Initialized {
        width: u32,
        height: u32,
        #[serde(rename = "fullWidth")]
        full_width: u32,
        #[serde(rename = "fullHeight")]
        full_height: u32,
    },
    /// Full-resolution overlay encoded as PNG.
    Overlay {
        blob: Vec<u8>,
    },
    Viewport {
        viewport: WireRect,
    },
    PanComplete,
    /// A committed selection gesture, in editor space.
    Selection {
        rect: WireRect,
        gesture: String,
    },
    PlayerFrame {
        crop: WireRect,
        rotate: bool,
        focus: WireRect,
    },
    /// Terminal failure of an `init` load.
    LoadFailed {
        code: String,
        message: String,
    },
    /// A command failed.
    Error {
        command: String,
        code: String,
        message: String,
    },
}

impl Event {
    /// Build an `error` event from any coded error.
    #[must_use]
    pub fn error(command: &str, err: &impl ErrorCode) -> Self {
        Self::Error { command: command.to_owned(), code: err.error_code().to_owned(), message: err.to_string() }
    }

    /// Build a `load_failed` event from any coded error.
    #[must_use]
    pub fn load_failed(err: &impl ErrorCode) -> Self {
        Self::LoadFailed { code: err.error_code().to_owned(), message: err.to_string() }
    }
}

/// Accept a decimal either as a JSON string or a JSON number.
fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected decimal, got {other}"))),
    }
}

// =============================================================================
// JSON CODEC
// =============================================================================

/// Decode one JSON message.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`], [`CodecError::MissingCmd`],
/// [`CodecError::UnknownCommand`] or [`CodecError::InvalidPayload`].
pub fn decode_inbound(text: &str) -> Result<Inbound, CodecError> {
    decode_inbound_value(serde_json::from_str(text)?)
}

fn decode_inbound_value(value: Value) -> Result<Inbound, CodecError> {
    let cmd = value.get("cmd").and_then(Value::as_str).ok_or(CodecError::MissingCmd)?.to_owned();
    if COMMAND_NAMES.contains(&cmd.as_str()) {
        return Command::deserialize(value)
            .map(Inbound::Render)
            .map_err(|source| CodecError::InvalidPayload { cmd, source });
    }
    if INPUT_NAMES.contains(&cmd.as_str()) {
        return InputCommand::deserialize(value)
            .map(Inbound::Input)
            .map_err(|source| CodecError::InvalidPayload { cmd, source });
    }
    Err(CodecError::UnknownCommand(cmd))
}

/// Encode an event as a single line of JSON.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`] if serialization fails.
pub fn encode_event(event: &Event) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

// =============================================================================
// PROTOBUF CODEC
// =============================================================================

/// Encode an event as a length-delimited protobuf envelope.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`] if the event cannot be turned into a
/// JSON value.
pub fn encode_event_frame(event: &Event) -> Result<Vec<u8>, CodecError> {
    let mut map = match serde_json::to_value(event)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let cmd = match map.remove("cmd") {
        Some(Value::String(cmd)) => cmd,
        _ => String::new(),
    };
    let blob = match event {
        Event::Overlay { blob } => {
            map.remove("blob");
            blob.clone()
        }
        _ => Vec::new(),
    };
    let wire = WireEnvelope { cmd, data: Some(json_to_proto_value(&Value::Object(map))), blob };
    Ok(wire.encode_length_delimited_to_vec())
}

/// Decode a length-delimited protobuf envelope produced by
/// [`encode_event_frame`].
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes, or the JSON decode
/// errors for a payload that does not match its `cmd`.
pub fn decode_event_frame(bytes: &[u8]) -> Result<Event, CodecError> {
    let wire = WireEnvelope::decode_length_delimited(bytes)?;
    let is_overlay = wire.cmd == "overlay";
    let mut map = envelope_fields(wire.data);
    if is_overlay {
        map.insert("blob".to_owned(), Value::from(wire.blob));
    }
    map.insert("cmd".to_owned(), Value::String(wire.cmd));
    Ok(Event::deserialize(Value::Object(map))?)
}

/// Decode one inbound protobuf envelope (without its length prefix).
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes, otherwise the same
/// errors as [`decode_inbound`].
pub fn decode_inbound_frame(bytes: &[u8]) -> Result<Inbound, CodecError> {
    let wire = WireEnvelope::decode(bytes)?;
    let mut map = envelope_fields(wire.data);
    map.insert("cmd".to_owned(), Value::String(wire.cmd));
    decode_inbound_value(Value::Object(map))
}

/// Encode an inbound message as an envelope (without a length prefix).
#[must_use]
pub fn encode_inbound_frame(cmd: &str, data: &Value) -> Vec<u8> {
    WireEnvelope { cmd: cmd.to_owned(), data: Some(json_to_proto_value(data)), blob: Vec::new() }.encode_to_vec()
}

fn envelope_fields(data: Option<prost_types::Value>) -> Map<String, Value> {
    match data.map(|v| proto_to_json_value(&v)) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue as i32),
        Value::Bool(v) => Kind::BoolValue(*v),
        Value::Number(v) => Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => Kind::StringValue(v.clone()),
        Value::Array(v) => Kind::ListValue(prost_types::ListValue { values: v.iter().map(json_to_proto_value).collect() }),
        Value::Object(v) => Kind::StructValue(prost_types::Struct {
            fields: v.iter().map(|(k, v)| (k.clone(), json_to_proto_value(v))).collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

/// Whole numbers come back as JSON integers so integer fields (`buttons`,
/// `width`) deserialize.
fn proto_to_json_value(value: &prost_types::Value) -> Value {
    use prost_types::value::Kind;

    let Some(kind) = &value.kind else {
        return Value::Null;
    };
    match kind {
        Kind::NullValue(_) => Value::Null,
        Kind::NumberValue(v) => number_to_json(*v),
        Kind::StringValue(v) => Value::String(v.clone()),
        Kind::BoolValue(v) => Value::Bool(*v),
        Kind::StructValue(v) => {
            Value::Object(v.fields.iter().map(|(k, v)| (k.clone(), proto_to_json_value(v))).collect())
        }
        Kind::ListValue(v) => Value::Array(v.values.iter().map(proto_to_json_value).collect()),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_json(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
        return Value::from(v as i64);
    }
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

#[derive(Clone, PartialEq, Message)]
struct WireEnvelope {
    #[prost(string, tag = "1")]
    cmd: String,
    #[prost(message, optional, tag = "2")]
    data: Option<prost_types::Value>,
    #[prost(bytes = "vec", tag = "3")]
    blob: Vec<u8>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
