//! Serving-side scoring
//!
//! [`ScoringFacade`] applies assemble → encode → scale → classify with state
//! loaded from an [`ArtifactBundle`](crate::artifacts::ArtifactBundle). It never
//! fits anything.

mod config;
mod facade;

pub use config::ServingConfig;
pub use facade::{Classification, ScoringFacade};
