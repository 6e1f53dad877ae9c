use command_abi::{StreamStartBody, StreamTarget, UnitResource};
use serde_json::Number;

use crate::{
    error::GatewayError,
    model::DeviceSerial,
    upstream::{AuthPolicy, UnitCall, UpstreamDispatcher, UpstreamReply},
};

/// Start/status/stop calls against a unit's stream resources, all bearer-authenticated.
///
/// Starts are not deduplicated: two starts for the same target are two
/// upstream calls.
#[derive(Clone)]
pub struct StreamControlClient {
    dispatcher: UpstreamDispatcher,
}

impl StreamControlClient {
    pub fn new(dispatcher: UpstreamDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Fails closed when no credential was configured at start-up.
    pub fn require_credential(&self) -> Result<(), GatewayError> {
        match self.dispatcher.credential() {
            Some(_) => Ok(()),
            None => Err(GatewayError::MissingCredential),
        }
    }

    pub async fn start(
        &self,
        serial: &DeviceSerial,
        target: StreamTarget,
        period: Option<Number>,
    ) -> Result<UpstreamReply, GatewayError> {
        let body = StreamStartBody::new(target, period);
        let call = UnitCall::post_json(UnitResource::StreamStart, AuthPolicy::Bearer, &body)?;
        self.dispatcher.dispatch(serial, call).await
    }

    pub async fn status(
        &self,
        serial: &DeviceSerial,
        target: &StreamTarget,
    ) -> Result<UpstreamReply, GatewayError> {
        let call = UnitCall::get_query(
            UnitResource::StreamStatus,
            AuthPolicy::Bearer,
            target.query_pairs().to_vec(),
        );
        self.dispatcher.dispatch(serial, call).await
    }

    pub async fn stop(
        &self,
        serial: &DeviceSerial,
        target: &StreamTarget,
    ) -> Result<UpstreamReply, GatewayError> {
        let call = UnitCall::post_json(UnitResource::StreamStop, AuthPolicy::Bearer, target)?;
        self.dispatcher.dispatch(serial, call).await
    }
}
