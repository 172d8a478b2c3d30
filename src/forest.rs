use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// fixed-at-training hyperparameters for the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// weight each class inversely to its frequency in the training labels
    pub balanced_classes: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            balanced_classes: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(RiskError::invalid_parameter("n_trees", "0"));
        }
        if self.max_depth == 0 {
            return Err(RiskError::invalid_parameter("max_depth", "0"));
        }
        if self.min_samples_split < 2 {
            return Err(RiskError::invalid_parameter(
                "min_samples_split",
                self.min_samples_split.to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(RiskError::invalid_parameter("min_samples_leaf", "0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// weighted positive-class fraction of the training samples
        /// that reached this leaf
        probability: f64,
    },
}

/// one CART-style tree, nodes stored in a flat arena (index 0 = root)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { probability } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// seeded ensemble of bootstrapped decision trees
///
/// probability is the mean of per-tree positive-class estimates; the
/// label is that mean thresholded at 0.5
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    importances: Vec<f64>, // normalized mean decrease in impurity
    n_features: usize,
    config: ForestConfig,
}

impl RandomForest {
    pub fn fit(features: ArrayView2<'_, f64>, labels: &[u8], config: &ForestConfig) -> Result<Self> {
        config.validate()?;

        let n_samples = features.nrows();
        let n_features = features.ncols();

        if n_samples != labels.len() {
            return Err(RiskError::invalid_dimensions(format!(
                "feature rows ({}) != labels len ({})",
                n_samples,
                labels.len()
            )));
        }
        if n_samples == 0 || n_features == 0 {
            return Err(RiskError::invalid_dataset("cannot fit forest on empty data"));
        }

        let n_pos = labels.iter().filter(|&&y| y == 1).count();
        let n_neg = n_samples - n_pos;

        let class_weights = if config.balanced_classes {
            if n_pos == 0 || n_neg == 0 {
                return Err(RiskError::invalid_dataset(
                    "balanced class weights need both classes present",
                ));
            }
            [
                n_samples as f64 / (2.0 * n_neg as f64),
                n_samples as f64 / (2.0 * n_pos as f64),
            ]
        } else {
            [1.0, 1.0]
        };

        // sqrt-of-features subset per split, never below one
        let n_subfeatures = ((n_features as f64).sqrt().floor() as usize).max(1);

        let mut master = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.n_trees);
        let mut importance_acc = vec![0.0; n_features];

        for _ in 0..config.n_trees {
            // child seed per tree keeps fits reproducible independent of
            // how much randomness each tree consumes
            let tree_seed: u64 = master.gen();
            let mut rng = StdRng::seed_from_u64(tree_seed);

            let bootstrap: Vec<usize> =
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

            let mut builder = TreeBuilder {
                features,
                labels,
                class_weights,
                config,
                n_subfeatures,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            builder.grow(&bootstrap, 0, &mut rng);

            for (acc, imp) in importance_acc.iter_mut().zip(builder.importances.iter()) {
                *acc += imp;
            }
            trees.push(DecisionTree { nodes: builder.nodes });
        }

        let total: f64 = importance_acc.iter().sum();
        if total > 0.0 {
            for imp in importance_acc.iter_mut() {
                *imp /= total;
            }
        }

        Ok(Self {
            trees,
            importances: importance_acc,
            n_features,
            config: *config,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// mean positive-class probability for one standardized row
    pub fn predict_proba_row(&self, row: ArrayView1<'_, f64>) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(RiskError::invalid_dimensions(format!(
                "forest fitted on {} features, row has {}",
                self.n_features,
                row.len()
            )));
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// positive-class probabilities for every row of a standardized matrix
    pub fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let mut out = Array1::zeros(features.nrows());
        for (i, row) in features.rows().into_iter().enumerate() {
            out[i] = self.predict_proba_row(row)?;
        }
        Ok(out)
    }

    /// hard labels: probability >= 0.5 -> diabetic
    pub fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<u8>> {
        let probas = self.predict_proba(features)?;
        Ok(probas.iter().map(|&p| (p >= 0.5) as u8).collect())
    }

    /// normalized mean-decrease-in-impurity ranking, canonical column order
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

// the view is invariant over its data lifetime, so it cannot share a
// lifetime parameter with the other borrows
struct TreeBuilder<'v, 'b> {
    features: ArrayView2<'v, f64>,
    labels: &'b [u8],
    class_weights: [f64; 2],
    config: &'b ForestConfig,
    n_subfeatures: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<'v, 'b> TreeBuilder<'v, 'b> {
    fn weighted_counts(&self, indices: &[usize]) -> (f64, f64) {
        let mut w_neg = 0.0;
        let mut w_pos = 0.0;
        for &i in indices {
            if self.labels[i] == 1 {
                w_pos += self.class_weights[1];
            } else {
                w_neg += self.class_weights[0];
            }
        }
        (w_neg, w_pos)
    }

    fn gini(w_neg: f64, w_pos: f64) -> f64 {
        let total = w_neg + w_pos;
        if total == 0.0 {
            return 0.0;
        }
        let p_neg = w_neg / total;
        let p_pos = w_pos / total;
        1.0 - p_neg * p_neg - p_pos * p_pos
    }

    /// grow a node for the given sample indices, returning its arena index
    fn grow(&mut self, indices: &[usize], depth: usize, rng: &mut StdRng) -> usize {
        let (w_neg, w_pos) = self.weighted_counts(indices);
        let node_weight = w_neg + w_pos;
        let node_gini = Self::gini(w_neg, w_pos);
        let leaf_probability = w_pos / node_weight;

        let must_stop = depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || node_gini == 0.0;

        let best = if must_stop {
            None
        } else {
            self.best_split(indices, w_neg, w_pos, node_gini, rng)
        };

        match best {
            None => {
                self.nodes.push(Node::Leaf {
                    probability: leaf_probability,
                });
                self.nodes.len() - 1
            }
            Some(split) => {
                self.importances[split.feature] += node_weight * split.decrease;

                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .copied()
                    .partition(|&i| self.features[[i, split.feature]] <= split.threshold);

                // reserve the slot before recursing so the root stays at index 0
                let node_idx = self.nodes.len();
                self.nodes.push(Node::Leaf {
                    probability: leaf_probability,
                });

                let left = self.grow(&left_idx, depth + 1, rng);
                let right = self.grow(&right_idx, depth + 1, rng);

                self.nodes[node_idx] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                node_idx
            }
        }
    }

    fn best_split(
        &self,
        indices: &[usize],
        w_neg: f64,
        w_pos: f64,
        node_gini: f64,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let n_features = self.features.ncols();
        let mut pool: Vec<usize> = (0..n_features).collect();
        pool.shuffle(rng);
        pool.truncate(self.n_subfeatures);

        let min_leaf = self.config.min_samples_leaf;
        let mut best: Option<SplitCandidate> = None;

        for &feature in &pool {
            let mut pairs: Vec<(f64, u8)> = indices
                .iter()
                .map(|&i| (self.features[[i, feature]], self.labels[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

            let mut left_neg = 0.0;
            let mut left_pos = 0.0;

            for k in 0..pairs.len() - 1 {
                if pairs[k].1 == 1 {
                    left_pos += self.class_weights[1];
                } else {
                    left_neg += self.class_weights[0];
                }

                // no boundary between equal values
                if pairs[k].0 == pairs[k + 1].0 {
                    continue;
                }

                let n_left = k + 1;
                let n_right = pairs.len() - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_neg = w_neg - left_neg;
                let right_pos = w_pos - left_pos;
                let w_left = left_neg + left_pos;
                let w_right = right_neg + right_pos;

                let children_gini = (w_left * Self::gini(left_neg, left_pos)
                    + w_right * Self::gini(right_neg, right_pos))
                    / (w_left + w_right);
                let decrease = node_gini - children_gini;

                if decrease > 1e-12
                    && best.as_ref().map_or(true, |b| decrease > b.decrease)
                {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (pairs[k].0 + pairs[k + 1].0) / 2.0,
                        decrease,
                    });
                }
            }
        }

        best
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}
