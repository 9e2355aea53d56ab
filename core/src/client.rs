//! Request building, dispatch and response classification.
//!
//! # Design
//! `SpikeClient` holds an immutable `ClientConfig` and a `Transport`. Each
//! operation has a pure `build_*` method that validates parameters and
//! produces an `HttpRequest`, and a dispatching method that runs it through
//! the transport and classifies the response with `parse`. Callers that
//! bring their own I/O can use `build_*` and `parse` directly.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, FORM_CONTENT_TYPE};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Charge, ChargeList, CreateCharge, CreateToken, ListCharges, Token};
use crate::validate::{self, Validate};

/// Client for the SPIKE REST API.
///
/// Holds no mutable state, so one instance can serve concurrent calls from
/// several threads.
#[derive(Clone, Debug)]
pub struct SpikeClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl SpikeClient<UreqTransport> {
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self { config, transport }
    }
}

impl<T> SpikeClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn build_create_charge(&self, params: &CreateCharge) -> Result<HttpRequest> {
        checked(params)?;
        self.request(HttpMethod::Post, "charges", Some(params.to_form()?))
    }

    pub fn build_get_charge(&self, id: &str) -> Result<HttpRequest> {
        checked_id(id)?;
        self.request(HttpMethod::Get, &format!("charges/{id}"), None)
    }

    pub fn build_capture_charge(&self, id: &str) -> Result<HttpRequest> {
        checked_id(id)?;
        self.request(HttpMethod::Post, &format!("charges/{id}/capture"), None)
    }

    pub fn build_refund_charge(&self, id: &str) -> Result<HttpRequest> {
        checked_id(id)?;
        self.request(HttpMethod::Post, &format!("charges/{id}/refund"), None)
    }

    pub fn build_list_charges(&self, params: &ListCharges) -> Result<HttpRequest> {
        checked(params)?;
        self.request(HttpMethod::Get, &format!("charges?limit={}", params.limit), None)
    }

    pub fn build_create_token(&self, params: &CreateToken) -> Result<HttpRequest> {
        checked(params)?;
        self.request(HttpMethod::Post, "tokens", Some(params.to_form()))
    }

    pub fn build_get_token(&self, id: &str) -> Result<HttpRequest> {
        checked_id(id)?;
        self.request(HttpMethod::Get, &format!("tokens/{id}"), None)
    }

    /// Classify a response.
    ///
    /// Status >= 400 becomes `ApiError::Api` carrying the status line and the
    /// decoded body when there is one. Anything else is decoded into `R`.
    pub fn parse<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R> {
        if response.status >= 400 {
            let body = if response.body.trim().is_empty() {
                None
            } else {
                serde_json::from_str(&response.body).ok()
            };
            return Err(ApiError::Api {
                status: response.status,
                message: response.status_line(),
                body,
            });
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    fn request(
        &self,
        method: HttpMethod,
        path: &str,
        form: Option<Vec<(String, String)>>,
    ) -> Result<HttpRequest> {
        let mut headers = self.config.default_headers();
        let body = match form {
            Some(form) => {
                headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
                let encoded = serde_urlencoded::to_string(&form)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                Some(encoded)
            }
            None => None,
        };
        Ok(HttpRequest {
            method,
            url: format!("{}/{path}", self.config.base_url()),
            headers,
            body,
        })
    }
}

impl<T: Transport> SpikeClient<T> {
    /// Create a charge against a card token.
    pub fn create_charge(&self, params: &CreateCharge) -> Result<Charge> {
        self.send(self.build_create_charge(params)?)
    }

    pub fn get_charge(&self, id: &str) -> Result<Charge> {
        self.send(self.build_get_charge(id)?)
    }

    /// Settle a charge created with `capture: false`.
    pub fn capture_charge(&self, id: &str) -> Result<Charge> {
        self.send(self.build_capture_charge(id)?)
    }

    /// Refund the full amount of a charge.
    pub fn refund_charge(&self, id: &str) -> Result<Charge> {
        self.send(self.build_refund_charge(id)?)
    }

    pub fn list_charges(&self, params: &ListCharges) -> Result<ChargeList> {
        self.send(self.build_list_charges(params)?)
    }

    pub fn create_token(&self, params: &CreateToken) -> Result<Token> {
        self.send(self.build_create_token(params)?)
    }

    pub fn get_token(&self, id: &str) -> Result<Token> {
        self.send(self.build_get_token(id)?)
    }

    fn send<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R> {
        debug!(method = request.method.as_str(), url = %request.url, "sending SPIKE request");
        let response = self.transport.execute(&request)?;
        debug!(method = request.method.as_str(), url = %request.url, status = response.status, "received SPIKE response");
        self.parse(response)
    }
}

fn checked<P: Validate>(params: &P) -> Result<()> {
    params.validate().inspect_err(|err| debug!(error = %err, "rejected parameters"))
}

fn checked_id(id: &str) -> Result<()> {
    validate::resource_id("id", id).inspect_err(|err| debug!(error = %err, "rejected id"))
}
