//! Endpoint client for valbridge.
//!
//! One [`EndpointClient`] serves four endpoint classes, each with its own
//! authentication source and failure policy:
//!
//! | Class | Auth | Failure policy |
//! |---|---|---|
//! | [`Regional`](EndpointClass::Regional) | bearer + JWT | stale → invalidate and retry (bounded); 429/other → wait `Retry-After + 5`, retry (configurable ceiling) |
//! | [`Party`](EndpointClass::Party) | bearer + JWT | stale or token 400 → invalidate and retry; 429/other → growing wait, retry |
//! | [`LocalService`](EndpointClass::LocalService) | basic auth from the descriptor | busy/non-200 → wait 1 s, retry 5 times, then soft-fail |
//! | [`Unrestricted`](EndpointClass::Unrestricted) | bearer + JWT | non-200 → invalidate, return the body anyway |
//!
//! # Key types
//!
//! - [`EndpointClient`] — dispatches requests
//! - [`EndpointRequest`] / [`Reply`] — what goes in and comes out
//! - [`EndpointConfig`] / [`RetryPolicy`] — per-class bounds and wire codes

mod client;
mod config;
mod error;
mod request;
mod throttle;

pub use client::{EndpointClient, LocalServiceFailure, USER_AGENT};
pub use config::{EndpointConfig, RetryPolicy};
pub use error::EndpointError;
pub use request::{EndpointClass, EndpointRequest, Reply};
pub use throttle::LogThrottle;
