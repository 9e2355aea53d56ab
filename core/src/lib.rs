//! Client for the SPIKE payment REST API (charges, refunds, card tokens).
//!
//! # Overview
//! Every operation is one HTTP request: parameters are validated, a request
//! is built, a `Transport` executes it, and the response is classified into
//! `Ok(payload)` or an `ApiError`.
//!
//! ```no_run
//! use spike_api::{ClientConfig, CreateCharge, SpikeClient};
//!
//! let client = SpikeClient::new(ClientConfig::from_env()?);
//! let charge = client.create_charge(&CreateCharge::new("JPY", 1080, "tok_xxx"))?;
//! let _refunded = client.refund_charge(charge.id())?;
//! # Ok::<(), spike_api::ApiError>(())
//! ```
//!
//! # Design
//! - `ClientConfig` is immutable; per-request headers are derived from it.
//! - `build_*` methods are pure and can be used without a transport; `parse`
//!   turns any `HttpResponse` into the operation's result.
//! - API errors (status >= 400) keep the decoded error payload next to the
//!   status line.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::SpikeClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Charge, ChargeList, CreateCharge, CreateToken, ListCharges, Product, Refund, Token, TokenCard,
};
pub use validate::Validate;
