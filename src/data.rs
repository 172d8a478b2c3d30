use std::path::Path;

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, RiskError};
use crate::schema::{FEATURE_NAMES, LABEL_COLUMN, N_FEATURES};

/// labeled patient data - feature matrix plus binary diabetes outcome
#[derive(Debug, Clone)]
pub struct PatientDataset {
    features: Array2<f64>, // n_samples x N_FEATURES
    labels: Vec<u8>,       // 1 = diabetic, 0 = non-diabetic
}

impl PatientDataset {
    pub fn new(features: Array2<f64>, labels: Vec<u8>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(RiskError::invalid_dimensions(format!(
                "feature rows ({}) != labels len ({})",
                features.nrows(),
                labels.len()
            )));
        }

        if features.ncols() != N_FEATURES {
            return Err(RiskError::invalid_dimensions(format!(
                "expected {} feature columns, got {}",
                N_FEATURES,
                features.ncols()
            )));
        }

        if labels.iter().any(|&y| y > 1) {
            return Err(RiskError::invalid_dataset("labels must be 0 or 1"));
        }

        if features.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::invalid_dataset(
                "feature values must be finite",
            ));
        }

        Ok(Self { features, labels })
    }

    /// load a labeled dataset from a CSV file with the canonical header
    /// (the 8 feature columns in order, then the outcome column)
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RiskError::invalid_dataset(format!(
                "dataset file not found: {}",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let expected: Vec<&str> = FEATURE_NAMES
            .iter()
            .copied()
            .chain(std::iter::once(LABEL_COLUMN))
            .collect();

        if headers.len() != expected.len() {
            return Err(RiskError::invalid_dataset(format!(
                "expected {} columns, found {}",
                expected.len(),
                headers.len()
            )));
        }

        for (got, want) in headers.iter().zip(expected.iter()) {
            if got.trim() != *want {
                return Err(RiskError::invalid_dataset(format!(
                    "unexpected column '{}' where '{}' was required",
                    got, want
                )));
            }
        }

        let mut values = Vec::new();
        let mut labels = Vec::new();

        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            for i in 0..N_FEATURES {
                let raw = record.get(i).unwrap_or("");
                let parsed: f64 = raw.trim().parse().map_err(|_| {
                    RiskError::invalid_dataset(format!(
                        "row {}: '{}' is not numeric in column {}",
                        row_idx + 1,
                        raw,
                        FEATURE_NAMES[i]
                    ))
                })?;
                values.push(parsed);
            }

            let raw_label = record.get(N_FEATURES).unwrap_or("");
            let label: u8 = raw_label.trim().parse().map_err(|_| {
                RiskError::invalid_dataset(format!(
                    "row {}: '{}' is not a 0/1 outcome",
                    row_idx + 1,
                    raw_label
                ))
            })?;
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(RiskError::invalid_dataset("dataset contains no rows"));
        }

        let features = Array2::from_shape_vec((labels.len(), N_FEATURES), values)
            .map_err(|e| RiskError::invalid_dimensions(e.to_string()))?;

        Self::new(features, labels)
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    /// mutable access for in-place preparation (imputation)
    pub fn features_mut(&mut self) -> &mut Array2<f64> {
        &mut self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// (non-diabetic, diabetic) counts
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&y| y == 1).count();
        (self.labels.len() - positives, positives)
    }

    /// grab a subset of patients by indices
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.iter().any(|&i| i >= self.n_samples()) {
            return Err(RiskError::invalid_dimensions("subset index out of bounds"));
        }

        let features = self.features.select(Axis(0), indices);
        let labels: Vec<u8> = indices.iter().map(|&i| self.labels[i]).collect();

        Self::new(features, labels)
    }

    /// stratified train/test split - each class keeps the same proportion
    /// in both halves, shuffled with the given seed
    pub fn stratified_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
            return Err(RiskError::invalid_parameter(
                "test_fraction",
                test_fraction.to_string(),
            ));
        }

        // each class needs one row for either side of the split
        let (negatives, positives) = self.class_counts();
        if negatives < 2 || positives < 2 {
            return Err(RiskError::invalid_dataset(
                "stratified split needs at least two samples of each class",
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train_indices = Vec::new();
        let mut test_indices = Vec::new();

        for class in [0u8, 1u8] {
            let mut members: Vec<usize> = (0..self.n_samples())
                .filter(|&i| self.labels[i] == class)
                .collect();
            members.shuffle(&mut rng);

            let n_test = ((members.len() as f64) * test_fraction).round() as usize;
            let n_test = n_test.clamp(1, members.len() - 1);

            test_indices.extend_from_slice(&members[..n_test]);
            train_indices.extend_from_slice(&members[n_test..]);
        }

        // keep row order deterministic regardless of class interleaving
        train_indices.sort_unstable();
        test_indices.sort_unstable();

        Ok((self.subset(&train_indices)?, self.subset(&test_indices)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_dataset() -> PatientDataset {
        let n = 40;
        let mut values = Vec::with_capacity(n * N_FEATURES);
        let mut labels = Vec::with_capacity(n);

        for i in 0..n {
            let diabetic = i % 4 == 0; // 25% positive
            let glucose = if diabetic { 160.0 } else { 100.0 };
            values.extend_from_slice(&[
                (i % 6) as f64,
                glucose + (i % 10) as f64,
                70.0,
                25.0,
                90.0,
                30.0 + (i % 5) as f64,
                0.4,
                30.0 + (i % 20) as f64,
            ]);
            labels.push(diabetic as u8);
        }

        let features = Array2::from_shape_vec((n, N_FEATURES), values).unwrap();
        PatientDataset::new(features, labels).unwrap()
    }

    #[test]
    fn test_dataset_creation() {
        let data = create_test_dataset();
        assert_eq!(data.n_samples(), 40);
        assert_eq!(data.n_features(), N_FEATURES);
        assert_eq!(data.class_counts(), (30, 10));
    }

    #[test]
    fn test_label_length_mismatch() {
        let features = Array2::zeros((3, N_FEATURES));
        assert!(PatientDataset::new(features, vec![0, 1]).is_err());
    }

    #[test]
    fn test_bad_label_value() {
        let features = Array2::zeros((2, N_FEATURES));
        assert!(PatientDataset::new(features, vec![0, 2]).is_err());
    }

    #[test]
    fn test_subset() {
        let data = create_test_dataset();
        let subset = data.subset(&[0, 4, 8]).unwrap();
        assert_eq!(subset.n_samples(), 3);
        assert_eq!(subset.labels(), &[1, 1, 1]);
    }

    #[test]
    fn test_stratified_split_preserves_proportions() {
        let data = create_test_dataset();
        let (train, test) = data.stratified_split(0.2, 42).unwrap();

        assert_eq!(train.n_samples() + test.n_samples(), data.n_samples());

        let (_, train_pos) = train.class_counts();
        let (_, test_pos) = test.class_counts();
        assert_eq!(train_pos, 8);
        assert_eq!(test_pos, 2);
    }

    #[test]
    fn test_stratified_split_is_seeded() {
        let data = create_test_dataset();
        let (a_train, _) = data.stratified_split(0.2, 7).unwrap();
        let (b_train, _) = data.stratified_split(0.2, 7).unwrap();
        assert_eq!(a_train.labels(), b_train.labels());
        assert_eq!(a_train.features(), b_train.features());
    }

    #[test]
    fn test_split_rejects_single_class() {
        let features = Array2::zeros((4, N_FEATURES));
        let data = PatientDataset::new(features, vec![0, 0, 0, 0]).unwrap();
        assert!(data.stratified_split(0.2, 42).is_err());
    }

    #[test]
    fn test_split_rejects_class_with_single_member() {
        let features = Array2::zeros((10, N_FEATURES));
        let mut labels = vec![0u8; 10];
        labels[3] = 1; // lone diabetic row

        let data = PatientDataset::new(features, labels).unwrap();
        let err = data.stratified_split(0.2, 42).unwrap_err();
        assert!(matches!(err, RiskError::InvalidDataset { .. }));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = PatientDataset::from_csv("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, RiskError::InvalidDataset { .. }));
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diabetes.csv");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "Pregnancies,Glucose,BloodPressure,SkinThickness,Insulin,BMI,DiabetesPedigreeFunction,Age,Outcome"
        )
        .unwrap();
        writeln!(file, "2,120,70,30,80,28.5,0.3,35,0").unwrap();
        writeln!(file, "6,180,85,0,0,35.2,0.9,52,1").unwrap();
        drop(file);

        let data = PatientDataset::from_csv(&path).unwrap();
        assert_eq!(data.n_samples(), 2);
        assert_eq!(data.labels(), &[0, 1]);
        assert_eq!(data.features()[[1, 1]], 180.0);
    }

    #[test]
    fn test_csv_header_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "A,B,C,D,E,F,G,H,Outcome").unwrap();
        writeln!(file, "1,2,3,4,5,6,7,8,0").unwrap();
        drop(file);

        assert!(PatientDataset::from_csv(&path).is_err());
    }
}
