//! Local error types. None of these propagate out of [`crate::gateway::Gateway::dispatch`];
//! every event that enters the queue is absorbed into a reply or destroyed silently.

use thiserror::Error;

/// Errors raised while configuring or applying the URL-map table (C1).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlMapError {
    #[error("url-map rule rejected: empty source pattern")]
    EmptySource,
    #[error("url-map rule rejected: empty destination pattern")]
    EmptyDestination,
}

/// Errors raised while decoding push-session headers (C3).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HeaderDecodeError {
    #[error("unknown WINA application id {0}")]
    UnknownApplicationId(u32),
    #[error("more than one Bearer-Indication header present")]
    DuplicateBearerIndication,
    #[error("unknown or reserved bearer indication value {0}")]
    UnknownBearerIndication(u8),
}

/// Top-level error for operations on the gateway container that can fail
/// (construction, shutdown); `dispatch` itself never returns an error.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway is not running (current status: {0:?})")]
    NotRunning(crate::event::RunStatus),
    #[error("configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
