use std::path::PathBuf;

use log::info;

use crate::{
    artifacts::{ArtifactPaths, ModelArtifacts},
    data::PatientDataset,
    error::Result,
    forest::ForestConfig,
    metrics::{ConfusionMatrix, ModelMetrics},
    model::RiskModel,
    prepare::{ImputationTable, Scaler},
    report,
    schema::FEATURE_NAMES,
};

/// one-shot offline training run configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub dataset_path: PathBuf,
    pub artifact_dir: PathBuf,
    /// where the diagnostic charts go; None skips chart rendering
    pub report_dir: Option<PathBuf>,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestConfig,
}

impl TrainingConfig {
    pub fn new(dataset_path: impl Into<PathBuf>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            artifact_dir: artifact_dir.into(),
            report_dir: None,
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// what a completed training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub metrics: ModelMetrics,
    pub confusion: ConfusionMatrix,
    /// (feature name, normalized importance), highest first
    pub importances: Vec<(String, f64)>,
    pub artifact_paths: ArtifactPaths,
    pub n_train: usize,
    pub n_test: usize,
}

/// the full offline pipeline: load -> impute -> split -> scale -> fit ->
/// evaluate -> charts -> persist
///
/// artifacts are only written once everything before them succeeded, so a
/// failed run leaves nothing half-finished on disk
pub fn run_training(config: &TrainingConfig) -> Result<TrainingOutcome> {
    config.forest.validate()?;

    let mut dataset = PatientDataset::from_csv(&config.dataset_path)?;
    let (healthy, diabetic) = dataset.class_counts();

    println!("=== DATASET OVERVIEW ===");
    println!("patients: {}", dataset.n_samples());
    println!("class distribution: {} healthy / {} diabetic", healthy, diabetic);

    // sentinel zeros become training medians before anything else sees the data
    let imputer = ImputationTable::fit(dataset.features())?;
    imputer.apply(dataset.features_mut());

    let (train, test) = dataset.stratified_split(config.test_fraction, config.split_seed)?;
    info!(
        "split into {} training and {} evaluation rows",
        train.n_samples(),
        test.n_samples()
    );

    // scaler fits on the training split only - never on evaluation data
    let scaler = Scaler::fit(train.features())?;
    let train_scaled = scaler.transform(train.features())?;
    let test_scaled = scaler.transform(test.features())?;

    println!("\n=== TRAINING ===");
    let feature_names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    let mut model =
        RiskModel::from_config(config.forest).with_feature_names(feature_names.clone());
    model.fit(train_scaled.view(), train.labels())?;

    let predicted = model.predict(test_scaled.view())?;
    let probabilities = model.predict_proba(test_scaled.view())?;

    println!("\n=== PERFORMANCE ===");
    let metrics = ModelMetrics::compute(test.labels(), &predicted, probabilities.view())?;
    metrics.print();

    println!();
    let confusion = ConfusionMatrix::compute(test.labels(), &predicted)?;
    confusion.print();

    println!();
    model.summary()?.print();

    let importance = model.feature_importance()?;
    let mut importances: Vec<(String, f64)> = feature_names
        .iter()
        .cloned()
        .zip(importance.iter().copied())
        .collect();
    importances.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    if let Some(report_dir) = &config.report_dir {
        std::fs::create_dir_all(report_dir)?;

        let cm_path = report_dir.join("confusion_matrix.png");
        report::confusion_matrix_heatmap(&confusion, &cm_path)?;
        println!("\nconfusion matrix chart: {}", cm_path.display());

        let fi_path = report_dir.join("feature_importance.png");
        report::feature_importance_chart(&importances, &fi_path)?;
        println!("feature importance chart: {}", fi_path.display());
    }

    let artifacts = ModelArtifacts::new(model.into_forest()?, scaler, imputer, feature_names)?;
    let artifact_paths = artifacts.save(&config.artifact_dir)?;

    println!("\n=== ARTIFACTS ===");
    println!("forest:   {}", artifact_paths.forest.display());
    println!("scaler:   {}", artifact_paths.scaler.display());
    println!("imputer:  {}", artifact_paths.imputer.display());
    println!("features: {}", artifact_paths.features.display());

    Ok(TrainingOutcome {
        metrics,
        confusion,
        importances,
        artifact_paths,
        n_train: train.n_samples(),
        n_test: test.n_samples(),
    })
}
