use command_abi::{CommandEnvelope, UnitResource};
use serde_json::{Map, Value};

use crate::{
    error::GatewayError,
    model::DeviceSerial,
    upstream::{AuthPolicy, UnitCall, UpstreamDispatcher, UpstreamReply},
};

/// Configuration commands posted to a unit's `command` resource.
///
/// These calls carry no `Authorization` header, even when a stream credential
/// is configured.
#[derive(Clone)]
pub struct DeviceConfigClient {
    dispatcher: UpstreamDispatcher,
}

impl DeviceConfigClient {
    pub fn new(dispatcher: UpstreamDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn request_config(
        &self,
        serial: &DeviceSerial,
    ) -> Result<UpstreamReply, GatewayError> {
        self.send(serial, &CommandEnvelope::request_config()).await
    }

    pub async fn update_config(
        &self,
        serial: &DeviceSerial,
        updates: Map<String, Value>,
    ) -> Result<UpstreamReply, GatewayError> {
        self.send(serial, &CommandEnvelope::update_config(updates))
            .await
    }

    async fn send(
        &self,
        serial: &DeviceSerial,
        envelope: &CommandEnvelope,
    ) -> Result<UpstreamReply, GatewayError> {
        let call = UnitCall::post_json(UnitResource::Command, AuthPolicy::Anonymous, envelope)?;
        self.dispatcher.dispatch(serial, call).await
    }
}
