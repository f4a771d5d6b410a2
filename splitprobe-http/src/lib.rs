//! HTTP plumbing for splitprobe
//!
//! This crate builds the `reqwest` clients used against the router (with or
//! without redirect following, with or without a cookie jar) and provides
//! the client for the router's provisioning API.

pub mod client;
pub mod config;
pub mod errors;
pub mod provisioning;
pub mod types;

// Re-export main types for convenience
pub use client::{ClientOptions, HttpManager};
pub use config::HttpConfig;
pub use errors::{body_snippet, HttpError, ProvisionError};
pub use provisioning::{
    Credentials, DomainPayload, DomainRef, EndpointPayload, ProvisioningClient,
    ProvisioningSession, ResourceKind, TestPayload, TestRef, VariantPayload, VariantRef,
};
pub use types::{HttpMethod, RedirectMode};
