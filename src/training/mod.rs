//! Model training
//!
//! [`Trainer`] runs the one-shot fitting pass and returns an
//! [`ArtifactBundle`](crate::artifacts::ArtifactBundle):
//! schema build → scaler fit → seeded holdout split → classifier fit →
//! holdout evaluation.

mod config;
mod trainer;

pub use config::TrainingConfig;
pub use trainer::{stratified_split, Trainer, TrainingReport};
