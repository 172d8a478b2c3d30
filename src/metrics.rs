use ndarray::ArrayView1;

use crate::error::{Result, RiskError};

fn check_lengths(a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(RiskError::invalid_dimensions(format!(
            "label vectors must have same length ({} vs {})",
            a, b
        )));
    }
    if a == 0 {
        return Err(RiskError::invalid_dimensions(
            "need at least one sample to score",
        ));
    }
    Ok(())
}

/// fraction of correct labels
pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(a, b)| a == b)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// of everything flagged diabetic, how much really was (0 when nothing flagged)
pub fn precision(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    let cm = ConfusionMatrix::compute(y_true, y_pred)?;
    let flagged = cm.true_positive + cm.false_positive;
    if flagged == 0 {
        return Ok(0.0);
    }
    Ok(cm.true_positive as f64 / flagged as f64)
}

/// of the actual diabetics, how many were caught (0 when none present)
pub fn recall(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    let cm = ConfusionMatrix::compute(y_true, y_pred)?;
    let actual = cm.true_positive + cm.false_negative;
    if actual == 0 {
        return Ok(0.0);
    }
    Ok(cm.true_positive as f64 / actual as f64)
}

/// harmonic mean of precision and recall
pub fn f1_score(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    let p = precision(y_true, y_pred)?;
    let r = recall(y_true, y_pred)?;
    if p + r == 0.0 {
        return Ok(0.0);
    }
    Ok(2.0 * p * r / (p + r))
}

/// area under the ROC curve from positive-class scores, computed via
/// the rank statistic with tied scores averaged
pub fn roc_auc(y_true: &[u8], scores: ArrayView1<'_, f64>) -> Result<f64> {
    check_lengths(y_true.len(), scores.len())?;

    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = n - n_pos;

    if n_pos == 0 || n_neg == 0 {
        return Err(RiskError::numerical_error(
            "ROC-AUC needs both classes present",
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap());

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&y, _)| y == 1)
        .map(|(_, &r)| r)
        .sum();

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// 2x2 contingency of predicted vs true labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn compute(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        check_lengths(y_true.len(), y_pred.len())?;

        let mut cm = Self {
            true_negative: 0,
            false_positive: 0,
            false_negative: 0,
            true_positive: 0,
        };

        for (&actual, &predicted) in y_true.iter().zip(y_pred.iter()) {
            match (actual, predicted) {
                (0, 0) => cm.true_negative += 1,
                (0, _) => cm.false_positive += 1,
                (_, 0) => cm.false_negative += 1,
                _ => cm.true_positive += 1,
            }
        }

        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    pub fn print(&self) {
        println!("confusion matrix (rows = actual, cols = predicted)");
        println!("{:>14} {:>10} {:>10}", "", "healthy", "diabetic");
        println!(
            "{:>14} {:>10} {:>10}",
            "healthy", self.true_negative, self.false_positive
        );
        println!(
            "{:>14} {:>10} {:>10}",
            "diabetic", self.false_negative, self.true_positive
        );
    }
}

/// held-out evaluation of the fitted classifier
#[derive(Debug, Clone)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
}

impl ModelMetrics {
    pub fn compute(y_true: &[u8], y_pred: &[u8], scores: ArrayView1<'_, f64>) -> Result<Self> {
        Ok(Self {
            accuracy: accuracy(y_true, y_pred)?,
            precision: precision(y_true, y_pred)?,
            recall: recall(y_true, y_pred)?,
            f1: f1_score(y_true, y_pred)?,
            roc_auc: roc_auc(y_true, scores)?,
        })
    }

    pub fn print(&self) {
        println!("Model Evaluation Metrics");
        println!("========================");
        println!("Accuracy:   {:.4}", self.accuracy);
        println!("Precision:  {:.4}", self.precision);
        println!("Recall:     {:.4}", self.recall);
        println!("F1-Score:   {:.4}", self.f1);
        println!("ROC-AUC:    {:.4}", self.roc_auc);
    }
}
