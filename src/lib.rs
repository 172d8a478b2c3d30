//! # diabetes risk prediction
//!
//! random forest over the 8-feature Pima clinical schema - training and
//! serving kept consistent end to end
//!
//! ## what you get
//!
//! - median imputation for the "zero means unmeasured" columns
//! - training-fit standardization reapplied identically at serving time
//! - a seeded, class-balanced random forest w/ probability output
//! - the usual classification metrics + diagnostic charts
//! - a browsable, file-backed prediction history
//!
//! ## quick start
//!
//! ```rust
//! use diabetes_risk::RiskModel;
//! use ndarray::Array2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // already-standardized feature rows (two features for brevity)
//! let features = Array2::from_shape_vec((4, 2), vec![
//!     -1.0, -0.5,
//!     -0.8, -0.2,
//!      0.9,  0.7,
//!      1.1,  0.4,
//! ])?;
//! let labels = vec![0u8, 0, 1, 1];
//!
//! let mut model = RiskModel::new()
//!     .with_trees(25)
//!     .with_max_depth(4)
//!     .with_min_samples_split(2)
//!     .with_min_samples_leaf(1)
//!     .with_seed(7);
//! model.fit(features.view(), &labels)?;
//!
//! let (diabetic, probability) = model.predict_one(features.row(0))?;
//! assert!(!diabetic);
//! assert!((0.0..=1.0).contains(&probability));
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod data;
pub mod error;
pub mod forest;
pub mod history;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod prepare;
pub mod report;
pub mod schema;
pub mod train;

pub use artifacts::ModelArtifacts;
pub use data::PatientDataset;
pub use error::{Result, RiskError};
pub use forest::{ForestConfig, RandomForest};
pub use history::{PredictionRecord, PredictionStore};
pub use inference::{InferenceContext, ModelState, Prediction, RiskLevel};
pub use model::RiskModel;
pub use prepare::{ImputationTable, Scaler};
pub use schema::{FeatureVector, FEATURE_NAMES, N_FEATURES};
pub use train::{run_training, TrainingConfig, TrainingOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_constants() {
        assert_eq!(N_FEATURES, 8);
        assert_eq!(FEATURE_NAMES.len(), N_FEATURES);
        assert_eq!(FEATURE_NAMES[0], "Pregnancies");
        assert_eq!(FEATURE_NAMES[7], "Age");
    }
}
