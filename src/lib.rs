//! WAP application-layer gateway core.
//!
//! Bridges WSP session events from mobile clients to outbound HTTP fetches,
//! transforms fetched WML/WMLScript content into wireless-binary form, and
//! relays push-related session primitives to a Push Proxy Gateway. See
//! `SPEC_FULL.md` for the full module inventory; [`gateway::Gateway`] is the
//! single entry point embedders construct.

pub mod collaborators;
pub mod config;
pub mod convert;
pub mod error;
pub mod errors;
pub mod event;
pub mod event_loop;
pub mod fetch;
pub mod gateway;
pub mod headers;
pub mod http_caller;
pub mod push;
pub mod reply;
pub mod reply_pump;
pub mod urlmap;
pub mod wina;

pub use gateway::{Gateway, GatewayDeps};
