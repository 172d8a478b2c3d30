use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// number of clinical features per patient
pub const N_FEATURES: usize = 8;

/// canonical column order - the model is order-sensitive, not name-sensitive
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
];

/// label column in the training dataset
pub const LABEL_COLUMN: &str = "Outcome";

/// columns where a zero reading is biologically implausible and means "not measured"
pub const ZERO_SENTINEL_COLUMNS: [usize; 5] = [1, 2, 3, 4, 5];

/// (min, max) accepted value per feature, in canonical order
const FIELD_RANGES: [(f64, f64); N_FEATURES] = [
    (0.0, 20.0),  // pregnancies
    (0.0, 300.0), // glucose (mg/dL)
    (0.0, 200.0), // diastolic blood pressure (mm Hg)
    (0.0, 100.0), // triceps skinfold thickness (mm)
    (0.0, 900.0), // serum insulin (mu U/ml)
    (0.0, 70.0),  // body mass index
    (0.0, 3.0),   // diabetes pedigree function
    (1.0, 120.0), // age (years)
];

/// one patient's clinical measurements, fields in the fixed model order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub pregnancies: u32,
    pub glucose: f64,
    pub blood_pressure: f64,
    pub skin_thickness: f64,
    pub insulin: f64,
    pub bmi: f64,
    pub diabetes_pedigree: f64,
    pub age: u32,
}

impl FeatureVector {
    /// flatten into the canonical 8-value order the model was trained on
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(vec![
            self.pregnancies as f64,
            self.glucose,
            self.blood_pressure,
            self.skin_thickness,
            self.insulin,
            self.bmi,
            self.diabetes_pedigree,
            self.age as f64,
        ])
    }

    /// rebuild from a slice in canonical order
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != N_FEATURES {
            return Err(RiskError::invalid_dimensions(format!(
                "expected {} feature values, got {}",
                N_FEATURES,
                values.len()
            )));
        }

        Ok(Self {
            pregnancies: values[0] as u32,
            glucose: values[1],
            blood_pressure: values[2],
            skin_thickness: values[3],
            insulin: values[4],
            bmi: values[5],
            diabetes_pedigree: values[6],
            age: values[7] as u32,
        })
    }

    /// check every field against its declared clinical range
    pub fn validate(&self) -> Result<()> {
        let values = self.to_array();
        for (i, &value) in values.iter().enumerate() {
            let (min, max) = FIELD_RANGES[i];
            if !value.is_finite() || value < min || value > max {
                return Err(RiskError::OutOfRange {
                    field: FEATURE_NAMES[i].to_string(),
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vector() -> FeatureVector {
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

    #[test]
    fn test_canonical_order() {
        let arr = sample_vector().to_array();
        assert_eq!(arr.len(), N_FEATURES);
        assert_eq!(arr[0], 2.0);
        assert_eq!(arr[1], 120.0);
        assert_eq!(arr[6], 0.3);
        assert_eq!(arr[7], 35.0);
    }

    #[test]
    fn test_roundtrip_through_slice() {
        let fv = sample_vector();
        let arr = fv.to_array();
        let back = FeatureVector::from_slice(arr.as_slice().unwrap()).unwrap();
        assert_eq!(fv, back);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(FeatureVector::from_slice(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_validation_accepts_sample() {
        assert!(sample_vector().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut fv = sample_vector();
        fv.glucose = 450.0; // above the 300 mg/dL cap
        match fv.validate() {
            Err(RiskError::OutOfRange { field, .. }) => assert_eq!(field, "Glucose"),
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_age_rejected() {
        let mut fv = sample_vector();
        fv.age = 0;
        assert!(fv.validate().is_err());
    }

    #[test]
    fn test_sentinel_columns_match_names() {
        let designated: Vec<&str> = ZERO_SENTINEL_COLUMNS
            .iter()
            .map(|&i| FEATURE_NAMES[i])
            .collect();
        assert_eq!(
            designated,
            vec!["Glucose", "BloodPressure", "SkinThickness", "Insulin", "BMI"]
        );
    }
}
