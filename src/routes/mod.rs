//! Router Module Index
//!
//! One router per resource. Each resource router pins the verbs it serves on its collection
//! and item paths and answers every other verb with 405 before any credential is read.
//! Per-endpoint permissions are enforced by the `Authorized<G>` extractor in each handler.

/// Routes accessible without a credential (health check).
pub mod public;

/// `/movies` and `/movies/{id}`.
pub mod movies;

/// `/actors` and `/actors/{id}`.
pub mod actors;
