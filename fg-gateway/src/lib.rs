mod address;
mod config;
mod config_client;
mod error;
mod logging;
mod model;
mod runtime;
mod stream_client;
mod upstream;

pub use command_abi::{
    ChannelRef, CommandEnvelope, DEFAULT_STREAM_PERIOD, StreamStartBody, StreamTarget,
    UnitResource,
};
pub use url::Url;

pub use address::{AddressError, UnitAddressResolver};
pub use config::{
    ConfigError, DEFAULT_LISTEN_ADDR, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_UPSTREAM_URL,
    ENV_API_KEY, ENV_LISTEN_ADDR, ENV_REQUEST_TIMEOUT_MS, ENV_UPSTREAM_URL, GatewayConfig,
    parse_listen_addr, parse_timeout_ms,
};
pub use config_client::DeviceConfigClient;
pub use error::{ErrorBody, GatewayError, ValidationError};
pub use logging::init as init_logging;
pub use model::{Credential, DeviceSerial};
pub use runtime::{SharedState, build_gateway_app};
pub use stream_client::StreamControlClient;
pub use upstream::{AuthPolicy, CallPayload, UnitCall, UpstreamDispatcher, UpstreamReply};
