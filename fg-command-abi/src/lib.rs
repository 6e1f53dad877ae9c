use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Path segments between the service base URL and the unit serial.
pub const UNITS_PATH: [&str; 2] = ["api", "units"];

/// Stream period sent when the dashboard omits one. Zero means continuous.
pub const DEFAULT_STREAM_PERIOD: u64 = 0;

pub const QUERY_CAMERA: &str = "camera";
pub const QUERY_PROFILE: &str = "profile";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitResource {
    Command,
    StreamStart,
    StreamStatus,
    StreamStop,
}

impl UnitResource {
    pub fn name(self) -> &'static str {
        match self {
            UnitResource::Command => "command",
            UnitResource::StreamStart => "stream/start",
            UnitResource::StreamStatus => "stream/status",
            UnitResource::StreamStop => "stream/stop",
        }
    }

    /// Segments appended after the serial, in order.
    pub fn segments(self) -> &'static [&'static str] {
        match self {
            UnitResource::Command => &["command"],
            UnitResource::StreamStart => &["stream", "start"],
            UnitResource::StreamStatus => &["stream", "status"],
            UnitResource::StreamStop => &["stream", "stop"],
        }
    }
}

impl fmt::Display for UnitResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Body posted to a unit's `command` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandEnvelope {
    RequestConfig,
    UpdateConfig { payload: Map<String, Value> },
}

impl CommandEnvelope {
    pub fn request_config() -> Self {
        CommandEnvelope::RequestConfig
    }

    /// Does not check that `updates` is non-empty; callers reject that before dispatch.
    pub fn update_config(updates: Map<String, Value>) -> Self {
        CommandEnvelope::UpdateConfig { payload: updates }
    }
}

/// Camera channel or stream profile identifier.
///
/// The dashboard sends these either as JSON numbers or strings; whichever
/// form arrived is kept when the value is forwarded in a request body.
/// Numbers are not range-checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelRef {
    Number(Number),
    Name(String),
}

impl ChannelRef {
    /// `None` for anything that is not a JSON number or string.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(ChannelRef::Number(number)),
            Value::String(name) => Some(ChannelRef::Name(name)),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            ChannelRef::Number(_) => false,
            ChannelRef::Name(name) => name.trim().is_empty(),
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Number(number) => write!(f, "{number}"),
            ChannelRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for ChannelRef {
    fn from(value: &str) -> Self {
        ChannelRef::Name(value.to_string())
    }
}

impl From<u64> for ChannelRef {
    fn from(value: u64) -> Self {
        ChannelRef::Number(value.into())
    }
}

/// Camera/profile pair addressed by the stream resources.
///
/// Posted as-is to `stream/stop`, sent as query parameters to `stream/status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTarget {
    pub camera: ChannelRef,
    pub profile: ChannelRef,
}

impl StreamTarget {
    pub fn new(camera: impl Into<ChannelRef>, profile: impl Into<ChannelRef>) -> Self {
        Self {
            camera: camera.into(),
            profile: profile.into(),
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            (QUERY_CAMERA, self.camera.to_string()),
            (QUERY_PROFILE, self.profile.to_string()),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStartBody {
    #[serde(flatten)]
    pub target: StreamTarget,
    #[serde(default = "default_period")]
    pub period: Number,
}

fn default_period() -> Number {
    DEFAULT_STREAM_PERIOD.into()
}

impl StreamStartBody {
    pub fn new(target: StreamTarget, period: Option<Number>) -> Self {
        Self {
            target,
            period: period.unwrap_or_else(default_period),
        }
    }
}
