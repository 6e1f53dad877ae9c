use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderValue, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use command_abi::UnitResource;
use reqwest::{Method, StatusCode};
use serde::{Serialize, de::IgnoredAny};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    address::UnitAddressResolver,
    error::GatewayError,
    logging::{method_label, status_label},
    model::{Credential, DeviceSerial},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPolicy {
    Anonymous,
    Bearer,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallPayload {
    Json(Value),
    Query(Vec<(&'static str, String)>),
}

/// One outbound call against a unit sub-resource.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitCall {
    pub method: Method,
    pub resource: UnitResource,
    pub auth: AuthPolicy,
    pub payload: CallPayload,
}

impl UnitCall {
    pub fn post_json(
        resource: UnitResource,
        auth: AuthPolicy,
        body: &impl Serialize,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            method: Method::POST,
            resource,
            auth,
            payload: CallPayload::Json(serde_json::to_value(body)?),
        })
    }

    pub fn get_query(
        resource: UnitResource,
        auth: AuthPolicy,
        query: Vec<(&'static str, String)>,
    ) -> Self {
        Self {
            method: Method::GET,
            resource,
            auth,
            payload: CallPayload::Query(query),
        }
    }
}

/// A completed upstream call, whatever its status. `body` holds the exact
/// bytes the unit sent, already checked to be JSON.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            self.body,
        )
            .into_response()
    }
}

#[derive(Clone)]
pub struct UpstreamDispatcher {
    client: reqwest::Client,
    resolver: UnitAddressResolver,
    credential: Option<Credential>,
    request_timeout: Duration,
}

impl UpstreamDispatcher {
    pub fn new(
        client: reqwest::Client,
        resolver: UnitAddressResolver,
        credential: Option<Credential>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            resolver,
            credential,
            request_timeout,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Issues exactly one request. No retries; the per-request timeout bounds
    /// the whole exchange including reading the body.
    ///
    /// Dropping the returned future aborts the request, but the unit may
    /// already have received the command.
    pub async fn dispatch(
        &self,
        serial: &DeviceSerial,
        call: UnitCall,
    ) -> Result<UpstreamReply, GatewayError> {
        let bearer = match call.auth {
            AuthPolicy::Anonymous => None,
            AuthPolicy::Bearer => Some(
                self.credential
                    .as_ref()
                    .ok_or(GatewayError::MissingCredential)?,
            ),
        };

        let url = match &call.payload {
            CallPayload::Query(query) => {
                self.resolver
                    .resolve_with_query(serial, call.resource, query)?
            }
            CallPayload::Json(_) => self.resolver.resolve(serial, call.resource)?,
        };
        debug!(
            "upstream {} {} serial={serial}",
            call.method, call.resource
        );

        let mut request = self
            .client
            .request(call.method.clone(), url)
            .timeout(self.request_timeout);
        if let Some(credential) = bearer {
            request = request.bearer_auth(credential.token());
        }
        if let CallPayload::Json(body) = &call.payload {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            warn!(
                "upstream {} {} serial={serial} failed: {err}",
                call.method, call.resource
            );
            GatewayError::transport(err)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            warn!(
                "upstream {} {} serial={serial} body read failed (status {}): {err}",
                call.method, call.resource, status
            );
            GatewayError::transport(err)
        })?;
        if let Err(err) = serde_json::from_slice::<IgnoredAny>(&body) {
            warn!(
                "upstream {} {} serial={serial} returned non-JSON body (status {}): {err}",
                call.method, call.resource, status
            );
            return Err(GatewayError::unreadable_reply(&err));
        }

        info!(
            "upstream {} {} serial={serial} -> {}",
            method_label(call.method.as_str()),
            call.resource,
            status_label(status.as_u16())
        );
        Ok(UpstreamReply { status, body })
    }
}
