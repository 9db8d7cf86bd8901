//! Uplink — HTTP delivery of readings, status reports and command polls
//!
//! The [`client::ApiClient`] talks to the remote API; the
//! [`coordinator::DeliveryCoordinator`] decides *when* to talk, draining the
//! disk buffer opportunistically and retiring records only after the server
//! acknowledges them.

pub mod client;
pub mod coordinator;

pub use client::{ApiClient, ReadingTransport, UplinkError};
pub use coordinator::{DeliveryCoordinator, RateWindow};
