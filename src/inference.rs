use std::fmt;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::artifacts::ModelArtifacts;
use crate::error::{Result, RiskError};
use crate::schema::FeatureVector;

/// three-tier display label derived from the probability - never stored,
/// always recomputed from the persisted percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// tier boundaries are inclusive on the lower edge: 30% is already
    /// Moderate, 60% is already High
    pub fn from_percentage(probability_pct: f64) -> Self {
        if probability_pct < 30.0 {
            Self::Low
        } else if probability_pct < 60.0 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// bootstrap-style color hint for the UI layer
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "success",
            Self::Moderate => "warning",
            Self::High => "danger",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        };
        write!(f, "{}", label)
    }
}

/// outcome of one inference request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub diabetic: bool,
    /// raw positive-class probability in [0, 1]
    pub probability: f64,
    /// display probability in [0, 100], rounded to 2 decimal places
    pub probability_pct: f64,
}

impl Prediction {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_percentage(self.probability_pct)
    }
}

/// the serving pipeline's shared immutable state: all four artifacts,
/// loaded once at process start and passed by reference into handlers
#[derive(Debug, Clone)]
pub struct InferenceContext {
    artifacts: ModelArtifacts,
}

impl InferenceContext {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            artifacts: ModelArtifacts::load(dir)?,
        })
    }

    pub fn from_artifacts(artifacts: ModelArtifacts) -> Self {
        Self { artifacts }
    }

    /// run one patient's raw measurements through impute -> scale -> forest
    ///
    /// imputation uses the training-time medians, so a sentinel zero at
    /// serving time standardizes exactly as it did during training
    pub fn predict(&self, patient: &FeatureVector) -> Result<Prediction> {
        patient.validate()?;

        let mut row = patient.to_array();
        self.artifacts.imputer.apply_row(&mut row)?;
        let scaled = self.artifacts.scaler.transform_row(row.view())?;
        let probability = self.artifacts.forest.predict_proba_row(scaled.view())?;

        let probability_pct = (probability * 100.0 * 100.0).round() / 100.0;

        Ok(Prediction {
            diabetic: probability >= 0.5,
            probability,
            probability_pct,
        })
    }
}

/// startup state of the serving pipeline - a failed artifact load leaves
/// prediction rejected but the rest of the application running
#[derive(Debug)]
pub enum ModelState {
    Ready(InferenceContext),
    Unavailable(String),
}

impl ModelState {
    /// never fails: a broken artifact directory produces the degraded state
    pub fn load(dir: impl AsRef<Path>) -> Self {
        match InferenceContext::load(&dir) {
            Ok(context) => Self::Ready(context),
            Err(e) => {
                warn!(
                    "model artifacts failed to load from {}: {}",
                    dir.as_ref().display(),
                    e
                );
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn context(&self) -> Result<&InferenceContext> {
        match self {
            Self::Ready(context) => Ok(context),
            Self::Unavailable(reason) => Err(RiskError::model_unavailable(reason.clone())),
        }
    }

    pub fn predict(&self, patient: &FeatureVector) -> Result<Prediction> {
        self.context()?.predict(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{ForestConfig, RandomForest};
    use crate::prepare::{ImputationTable, Scaler};
    use crate::schema::{FEATURE_NAMES, N_FEATURES};
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sample_patient() -> FeatureVector {
        FeatureVector {
            pregnancies: 2,
            glucose: 120.0,
            blood_pressure: 70.0,
            skin_thickness: 30.0,
            insulin: 80.0,
            bmi: 28.5,
            diabetes_pedigree: 0.3,
            age: 35,
        }
    }

    fn fitted_context() -> InferenceContext {
        let mut rng = StdRng::seed_from_u64(4);
        let n = 90;
        let mut values = Vec::with_capacity(n * N_FEATURES);
        let mut labels = Vec::with_capacity(n);

        for i in 0..n {
            let diabetic = i % 3 == 0;
            values.extend_from_slice(&[
                (i % 6) as f64,
                if diabetic { 165.0 } else { 95.0 } + rng.gen_range(-10.0..10.0),
                70.0 + rng.gen_range(-8.0..8.0),
                25.0 + rng.gen_range(-5.0..5.0),
                90.0 + rng.gen_range(-30.0..30.0),
                if diabetic { 35.0 } else { 26.0 } + rng.gen_range(-2.0..2.0),
                0.4 + rng.gen_range(0.0..0.4),
                28.0 + (i % 30) as f64,
            ]);
            labels.push(diabetic as u8);
        }

        let mut features = Array2::from_shape_vec((n, N_FEATURES), values).unwrap();
        let imputer = ImputationTable::fit(features.view()).unwrap();
        imputer.apply(&mut features);
        let scaler = Scaler::fit(features.view()).unwrap();
        let scaled = scaler.transform(features.view()).unwrap();

        let config = ForestConfig {
            n_trees: 20,
            max_depth: 6,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(scaled.view(), &labels, &config).unwrap();
        let names = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();

        InferenceContext::from_artifacts(
            ModelArtifacts::new(forest, scaler, imputer, names).unwrap(),
        )
    }

    #[test]
    fn test_risk_tiers() {
        assert_eq!(RiskLevel::from_percentage(25.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_percentage(45.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_percentage(75.0), RiskLevel::High);
        // inclusive lower bounds go to the higher tier
        assert_eq!(RiskLevel::from_percentage(30.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_percentage(60.0), RiskLevel::High);
    }

    #[test]
    fn test_risk_colors() {
        assert_eq!(RiskLevel::Low.color(), "success");
        assert_eq!(RiskLevel::Moderate.color(), "warning");
        assert_eq!(RiskLevel::High.color(), "danger");
    }

    #[test]
    fn test_prediction_bounds_and_rounding() {
        let context = fitted_context();
        let prediction = context.predict(&sample_patient()).unwrap();

        assert!((0.0..=1.0).contains(&prediction.probability));
        assert!((0.0..=100.0).contains(&prediction.probability_pct));

        // two decimal places
        let scaled = prediction.probability_pct * 100.0;
        assert_relative_eq!(scaled, scaled.round(), epsilon = 1e-9);
    }

    #[test]
    fn test_prediction_is_stable() {
        let context = fitted_context();
        let patient = sample_patient();

        let first = context.predict(&patient).unwrap();
        for _ in 0..5 {
            let again = context.predict(&patient).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_sentinel_zero_is_imputed_not_raw() {
        let context = fitted_context();

        let mut unmeasured = sample_patient();
        unmeasured.glucose = 0.0;
        let with_sentinel = context.predict(&unmeasured).unwrap();

        // prediction must match a patient whose glucose equals the
        // training median, since that is what the zero becomes
        let median = context
            .artifacts
            .imputer
            .medians()
            .iter()
            .find(|&&(col, _)| col == 1)
            .map(|&(_, m)| m)
            .unwrap();

        let mut explicit = unmeasured;
        explicit.glucose = median;
        let with_median = context.predict(&explicit).unwrap();

        assert_eq!(with_sentinel, with_median);
    }

    #[test]
    fn test_invalid_input_rejected_before_model() {
        let context = fitted_context();
        let mut patient = sample_patient();
        patient.bmi = 250.0;

        assert!(matches!(
            context.predict(&patient),
            Err(RiskError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_degraded_mode() {
        let dir = tempfile::tempdir().unwrap();
        let state = ModelState::load(dir.path()); // nothing there

        assert!(!state.is_ready());
        match state.predict(&sample_patient()) {
            Err(RiskError::ModelUnavailable { .. }) => {}
            other => panic!("expected ModelUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_ready_state_predicts() {
        let dir = tempfile::tempdir().unwrap();
        fitted_context().artifacts.save(dir.path()).unwrap();

        let state = ModelState::load(dir.path());
        assert!(state.is_ready());
        assert!(state.predict(&sample_patient()).is_ok());
    }
}
