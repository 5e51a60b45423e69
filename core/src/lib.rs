//! Synchronous client for the Formstack v2 REST API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). `FormstackApi` pairs that
//! core with a `Transport`, by default the ureq-backed `UreqTransport`.
//!
//! # Design
//! - `FormstackClient` holds the base URL, credential and strictness flag;
//!   it has no mutable state.
//! - Each operation is split into `build_*` (validates and produces a
//!   request) and `parse_*` (applies strictness and decodes), so the I/O
//!   boundary is explicit and invalid input never reaches the network.
//! - Responses decode into typed records; the service's
//!   `{"status":"error"}` body surfaces as `Reply::Failure`.
//! - Record types are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod api;
pub mod args;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;
pub mod validate;

pub use api::FormstackApi;
pub use args::{ArgValue, Arguments};
pub use client::{ApiResponse, Diagnostic, FormstackClient, Reply};
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use transport::UreqTransport;
pub use types::{
    DeleteResult, ErrorResponse, Field, FormDetail, FormList, FormSummary, Submission, SubmissionData,
    SubmissionMeta, SubmissionQuery,
};
