use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, RiskError};
use crate::forest::RandomForest;
use crate::prepare::{ImputationTable, Scaler};
use crate::schema::{FEATURE_NAMES, N_FEATURES};

/// locations of the four persisted artifacts inside one directory
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub forest: PathBuf,
    pub scaler: PathBuf,
    pub imputer: PathBuf,
    pub features: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            forest: dir.join("forest.json"),
            scaler: dir.join("scaler.json"),
            imputer: dir.join("imputer.json"),
            features: dir.join("features.json"),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| {
        RiskError::model_unavailable(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// everything the serving pipeline needs, loaded once at process start
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub forest: RandomForest,
    pub scaler: Scaler,
    pub imputer: ImputationTable,
    pub feature_names: Vec<String>,
}

impl ModelArtifacts {
    pub fn new(
        forest: RandomForest,
        scaler: Scaler,
        imputer: ImputationTable,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        let artifacts = Self {
            forest,
            scaler,
            imputer,
            feature_names,
        };
        artifacts.check_consistency()?;
        Ok(artifacts)
    }

    fn check_consistency(&self) -> Result<()> {
        if self.forest.n_features() != N_FEATURES {
            return Err(RiskError::invalid_dimensions(format!(
                "forest fitted on {} features, schema has {}",
                self.forest.n_features(),
                N_FEATURES
            )));
        }
        if self.scaler.n_features() != N_FEATURES {
            return Err(RiskError::invalid_dimensions(format!(
                "scaler fitted on {} features, schema has {}",
                self.scaler.n_features(),
                N_FEATURES
            )));
        }
        if self.feature_names.len() != N_FEATURES {
            return Err(RiskError::invalid_dimensions(format!(
                "feature name list has {} entries, schema has {}",
                self.feature_names.len(),
                N_FEATURES
            )));
        }
        // a reordered artifact would silently mis-assign learned weights
        for (got, want) in self.feature_names.iter().zip(FEATURE_NAMES.iter()) {
            if got != want {
                return Err(RiskError::invalid_dataset(format!(
                    "persisted feature order has '{}' where '{}' is required",
                    got, want
                )));
            }
        }
        Ok(())
    }

    /// write all four artifacts into `dir` (created if missing)
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<ArtifactPaths> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let paths = ArtifactPaths::in_dir(dir);

        write_json(&paths.forest, &self.forest)?;
        write_json(&paths.scaler, &self.scaler)?;
        write_json(&paths.imputer, &self.imputer)?;
        write_json(&paths.features, &self.feature_names)?;

        info!("artifacts written to {}", dir.display());
        Ok(paths)
    }

    /// load and cross-check the four artifacts
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let paths = ArtifactPaths::in_dir(dir.as_ref());

        let forest: RandomForest = read_json(&paths.forest)?;
        let scaler: Scaler = read_json(&paths.scaler)?;
        let imputer: ImputationTable = read_json(&paths.imputer)?;
        let feature_names: Vec<String> = read_json(&paths.features)?;

        let artifacts = Self::new(forest, scaler, imputer, feature_names)?;
        info!(
            "loaded model artifacts ({} trees) from {}",
            artifacts.forest.n_trees(),
            dir.as_ref().display()
        );
        Ok(artifacts)
    }
}
