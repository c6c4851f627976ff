//! Brazilian postal code (CEP) lookup client.
//!
//! # Overview
//! Validates and formats CEPs, fetches the address for a CEP from a
//! BrasilAPI-compatible service, and fills an address form with the result.
//!
//! # Design
//! - `CepClient` is stateless between calls; each lookup is one GET with no
//!   retries and no caching.
//! - Request building and response parsing are pure (`build_lookup` /
//!   `parse_lookup`); the round-trip goes through the `Transport` trait, so
//!   hosts with their own HTTP stack can drive the two halves directly.
//! - Forms are reached through the `FormBinding` capability, never through
//!   global state. `MemoryForm` is a ready-made implementation.
//! - The remote JSON key names are configuration (`ResponseSchema`).

pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod postal;
pub mod schedule;
pub mod types;

#[cfg(feature = "ureq")]
pub use client::default_client;
pub use client::{CepClient, LookupCallbacks};
pub use config::{ClientConfig, ErrorDisplayConfig};
pub use error::{ConfigError, LookupError, TransportError};
pub use form::{ErrorElement, FormBinding, FormHandle, MemoryForm};
#[cfg(feature = "ureq")]
pub use http::UreqTransport;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use postal::{format, validate, PostalCode};
pub use schedule::{QueuedScheduler, Scheduler, ThreadScheduler};
pub use types::{AddressField, AddressRecord, FieldBinding, ResponseSchema};
