//! Loan Risk - loan default scoring core
//!
//! Fits one-hot/binary encoders, mean imputation and a min-max scaler on a
//! training batch, freezes them with the classifier as a matched artifact
//! bundle, and scores single records through exactly the same transform.
//!
//! # Modules
//!
//! ## Feature pipeline
//! - [`schema`] - Declared feature sets and the frozen schema
//! - [`preprocessing`] - Assembler, encoder bank and scaler
//! - [`record`] - Raw input records and training batches
//!
//! ## Fitting and scoring
//! - [`model`] - Classifiers behind the scoring contract
//! - [`training`] - The one-shot fitting pass
//! - [`evaluation`] - Holdout metrics
//! - [`artifacts`] - Bundle persistence and sibling verification
//! - [`inference`] - The scoring facade
//!
//! ## Services
//! - [`dataset`] - DataFrame to training batch adapter
//! - [`server`] - HTTP scoring service
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use loan_risk::prelude::*;
//!
//! # fn main() -> loan_risk::Result<()> {
//! let batch = loan_risk::dataset::load_batch("application_train.csv")?;
//! let bundle = Trainer::new(TrainingConfig::default()).fit(&batch)?;
//! bundle.save("artifacts")?;
//!
//! let facade = ScoringFacade::load("artifacts")?;
//! let record = Record::new()
//!     .with("CODE_GENDER", "F")
//!     .with("AMT_INCOME_TOTAL", 135000.0)
//!     .with("DAYS_BIRTH", -12000.0);
//! let probability = facade.score(&record)?;
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Feature pipeline
pub mod record;
pub mod schema;
pub mod preprocessing;

// Fitting and scoring
pub mod model;
pub mod training;
pub mod evaluation;
pub mod artifacts;
pub mod inference;

// Services
pub mod dataset;
pub mod server;
pub mod cli;

pub use error::{Result, RiskError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, RiskError};

    // Records and schema
    pub use crate::record::{FieldValue, Record, TrainingBatch};
    pub use crate::schema::{FeatureKind, FeatureSchema, FeatureSet, FeatureSpec, UnitConvention};

    // Preprocessing
    pub use crate::preprocessing::{EncoderState, FeatureAssembler, MinMaxScaler, ScalerState};

    // Models
    pub use crate::model::{BoostingConfig, Classifier, LogisticConfig, ModelConfig, TrainedModel};

    // Training
    pub use crate::training::{Trainer, TrainingConfig, TrainingReport};

    // Artifacts and inference
    pub use crate::artifacts::ArtifactBundle;
    pub use crate::inference::{Classification, ScoringFacade, ServingConfig};
}
