use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::{
    error::{Result, RiskError},
    forest::{ForestConfig, RandomForest},
};

/// diabetes classifier w/ builder-style configuration
///
/// wraps the random forest behind fit/predict/predict_proba so the
/// concrete ensemble could be swapped without touching callers
#[derive(Debug, Clone)]
pub struct RiskModel {
    forest: Option<RandomForest>,
    config: ForestConfig,
    feature_names: Option<Vec<String>>,
}

impl Default for RiskModel {
    fn default() -> Self {
        Self {
            forest: None,
            config: ForestConfig::default(),
            feature_names: None,
        }
    }
}

impl RiskModel {
    /// new model w/ the production hyperparameters
    pub fn new() -> Self {
        Self::default()
    }

    /// new model from a fully specified configuration record
    pub fn from_config(config: ForestConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.config.n_trees = n_trees;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.config.min_samples_split = min_samples_split;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.config.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn with_balanced_classes(mut self, balanced: bool) -> Self {
        self.config.balanced_classes = balanced;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// give names to your features for nicer output
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// wrap an already-trained forest (artifact load path)
    pub fn from_fitted(forest: RandomForest, feature_names: Vec<String>) -> Self {
        Self {
            config: *forest.config(),
            forest: Some(forest),
            feature_names: Some(feature_names),
        }
    }

    /// fit the ensemble on standardized training data
    pub fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[u8]) -> Result<&mut Self> {
        self.forest = Some(RandomForest::fit(features, labels, &self.config)?);
        Ok(self)
    }

    pub fn is_fitted(&self) -> bool {
        self.forest.is_some()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    fn fitted_forest(&self) -> Result<&RandomForest> {
        self.forest.as_ref().ok_or(RiskError::ModelNotFitted)
    }

    /// take ownership of the trained forest for persistence
    pub fn into_forest(self) -> Result<RandomForest> {
        self.forest.ok_or(RiskError::ModelNotFitted)
    }

    /// positive-class probabilities for standardized rows
    pub fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        self.fitted_forest()?.predict_proba(features)
    }

    /// hard labels for standardized rows
    pub fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<u8>> {
        self.fitted_forest()?.predict(features)
    }

    /// (label, probability) for one standardized patient vector
    pub fn predict_one(&self, row: ArrayView1<'_, f64>) -> Result<(bool, f64)> {
        let probability = self.fitted_forest()?.predict_proba_row(row)?;
        Ok((probability >= 0.5, probability))
    }

    /// normalized feature-importance ranking
    pub fn feature_importance(&self) -> Result<Array1<f64>> {
        Ok(Array1::from(self.fitted_forest()?.feature_importances().to_vec()))
    }

    /// get a nice summary of the fitted model
    pub fn summary(&self) -> Result<RiskModelSummary> {
        let forest = self.fitted_forest()?;
        Ok(RiskModelSummary {
            importances: forest.feature_importances().to_vec(),
            config: *forest.config(),
            feature_names: self.feature_names.clone(),
        })
    }
}

/// what the fitted ensemble learned, for console reporting
#[derive(Debug, Clone)]
pub struct RiskModelSummary {
    pub importances: Vec<f64>,
    pub config: ForestConfig,
    pub feature_names: Option<Vec<String>>,
}

impl RiskModelSummary {
    /// print the importance ranking, highest first
    pub fn print(&self) {
        println!("random forest diabetes classifier");
        println!("=================================");
        println!(
            "trees: {}  max depth: {}  min split: {}  min leaf: {}  seed: {}",
            self.config.n_trees,
            self.config.max_depth,
            self.config.min_samples_split,
            self.config.min_samples_leaf,
            self.config.seed
        );
        println!();
        println!("{:<28} {:>12}", "feature", "importance");
        println!("{:-<41}", "");

        let mut ranked: Vec<(usize, f64)> = self
            .importances
            .iter()
            .copied()
            .enumerate()
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

        for (i, importance) in ranked {
            let default_name = format!("x{}", i);
            let name = match &self.feature_names {
                Some(names) => names.get(i).map(|s| s.as_str()).unwrap_or(&default_name),
                None => &default_name,
            };
            println!("{:<28} {:>12.4}", name, importance);
        }
    }
}
