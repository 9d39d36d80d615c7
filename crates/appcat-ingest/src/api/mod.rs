//! Catalog service API
//!
//! The pipeline talks to the catalog through two seams, [`Resolver`] and
//! [`Submitter`]. [`CatalogClient`] implements both over HTTP; tests can
//! swap in doubles.

pub mod client;
pub mod endpoints;

pub use client::CatalogClient;

use crate::model::{CandidateIdentifier, LookupResult, SubmissionRecord, SubmitOutcome};
use async_trait::async_trait;

/// Resolves a candidate against the lookup authority.
///
/// Implementations never fail: every transport or decoding problem is
/// reported as [`LookupResult::TransientError`]. No retries happen here.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, identifier: &CandidateIdentifier) -> LookupResult;
}

/// Sends one record to the catalog's write endpoint.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, record: &SubmissionRecord) -> SubmitOutcome;
}
