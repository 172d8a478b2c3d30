use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::inference::{Prediction, RiskLevel};
use crate::schema::FeatureVector;

/// one stored prediction request and its result - created after a fully
/// successful inference, never mutated, deleted only on explicit request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub features: FeatureVector,
    pub diabetic: bool,
    /// 0-100 scale, 2 decimal places
    pub probability_pct: f64,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// derived view, recomputed on every read
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_percentage(self.probability_pct)
    }
}

/// how the browsable history breaks down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySummary {
    pub total: usize,
    pub diabetic: usize,
    pub non_diabetic: usize,
}

/// JSON-file-backed store of prediction records, standing in for the
/// original application's database table
#[derive(Debug)]
pub struct PredictionStore {
    path: PathBuf,
    records: Vec<PredictionRecord>, // kept in insertion order
}

impl PredictionStore {
    /// open an existing store, or start an empty one if the file is missing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if path.exists() {
            let file = File::open(&path)?;
            serde_json::from_reader(BufReader::new(file))?
        } else {
            Vec::new()
        };

        Ok(Self { path, records })
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer(BufWriter::new(file), &self.records)?;
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// append a record for a completed prediction and persist immediately
    pub fn record(
        &mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        features: FeatureVector,
        prediction: &Prediction,
    ) -> Result<&PredictionRecord> {
        let record = PredictionRecord {
            id: self.next_id(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            features,
            diabetic: prediction.diabetic,
            probability_pct: prediction.probability_pct,
            created_at: Utc::now(),
        };

        self.records.push(record);
        self.persist()?;
        Ok(self.records.last().unwrap())
    }

    /// all records, newest first
    pub fn list(&self) -> Vec<&PredictionRecord> {
        self.records.iter().rev().collect()
    }

    pub fn get(&self, id: u64) -> Option<&PredictionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn delete(&mut self, id: u64) -> Result<()> {
        let position = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(RiskError::RecordNotFound { id })?;

        self.records.remove(position);
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> HistorySummary {
        let diabetic = self.records.iter().filter(|r| r.diabetic).count();
        HistorySummary {
            total: self.records.len(),
            diabetic,
            non_diabetic: self.records.len() - diabetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_features() -> FeatureVector {
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

    fn sample_prediction(pct: f64) -> Prediction {
        Prediction {
            diabetic: pct >= 50.0,
            probability: pct / 100.0,
            probability_pct: pct,
        }
    }

    #[test]
    fn test_record_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PredictionStore::open(dir.path().join("predictions.json")).unwrap();

        store
            .record("Ada", "Lovelace", sample_features(), &sample_prediction(20.0))
            .unwrap();
        store
            .record("Grace", "Hopper", sample_features(), &sample_prediction(70.0))
            .unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].first_name, "Grace");
        assert_eq!(listed[1].first_name, "Ada");
        assert_eq!(listed[0].id, 2);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");

        {
            let mut store = PredictionStore::open(&path).unwrap();
            store
                .record("Ada", "Lovelace", sample_features(), &sample_prediction(42.5))
                .unwrap();
        }

        let reopened = PredictionStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        let record = reopened.get(1).unwrap();
        assert_eq!(record.probability_pct, 42.5);
        assert_eq!(record.risk_level(), RiskLevel::Moderate);
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PredictionStore::open(dir.path().join("p.json")).unwrap();

        store
            .record("Ada", "Lovelace", sample_features(), &sample_prediction(10.0))
            .unwrap();
        store.delete(1).unwrap();
        assert!(store.is_empty());

        assert!(matches!(
            store.delete(99),
            Err(RiskError::RecordNotFound { id: 99 })
        ));
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PredictionStore::open(dir.path().join("p.json")).unwrap();

        store
            .record("A", "A", sample_features(), &sample_prediction(10.0))
            .unwrap();
        store
            .record("B", "B", sample_features(), &sample_prediction(20.0))
            .unwrap();
        store.delete(1).unwrap();

        let record = store
            .record("C", "C", sample_features(), &sample_prediction(30.0))
            .unwrap();
        assert_eq!(record.id, 3);
    }

    #[test]
    fn test_summary_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PredictionStore::open(dir.path().join("p.json")).unwrap();

        store
            .record("A", "A", sample_features(), &sample_prediction(80.0))
            .unwrap();
        store
            .record("B", "B", sample_features(), &sample_prediction(15.0))
            .unwrap();
        store
            .record("C", "C", sample_features(), &sample_prediction(90.0))
            .unwrap();

        let summary = store.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.diabetic, 2);
        assert_eq!(summary.non_diabetic, 1);
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PredictionStore::open(dir.path().join("nope.json")).unwrap();
        assert!(store.is_empty());
    }
}
