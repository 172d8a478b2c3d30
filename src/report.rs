use std::path::Path;

use plotters::prelude::*;

use crate::error::{Result, RiskError};
use crate::metrics::ConfusionMatrix;

fn to_report<E: std::fmt::Display>(e: E) -> RiskError {
    RiskError::report(e.to_string())
}

/// render the held-out confusion matrix as a 2x2 heatmap PNG
pub fn confusion_matrix_heatmap(cm: &ConfusionMatrix, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (640, 560)).into_drawing_area();
    root.fill(&WHITE).map_err(to_report)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Confusion Matrix", ("sans-serif", 30).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0f64..2.0, 0.0f64..2.0)
        .map_err(to_report)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .disable_y_axis()
        .x_desc("predicted")
        .y_desc("actual")
        .draw()
        .map_err(to_report)?;

    // (x, y, count): col = predicted, row = actual, actual-healthy on top
    let cells = [
        (0.0, 1.0, cm.true_negative, "TN"),
        (1.0, 1.0, cm.false_positive, "FP"),
        (0.0, 0.0, cm.false_negative, "FN"),
        (1.0, 0.0, cm.true_positive, "TP"),
    ];

    let max_count = cells.iter().map(|c| c.2).max().unwrap_or(1).max(1) as f64;

    for &(x, y, count, tag) in &cells {
        let intensity = 0.15 + 0.75 * (count as f64 / max_count);
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x + 0.02, y + 0.02), (x + 0.98, y + 0.98)],
                BLUE.mix(intensity).filled(),
            )))
            .map_err(to_report)?;
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{}: {}", tag, count),
                (x + 0.38, y + 0.5),
                ("sans-serif", 26).into_font(),
            )))
            .map_err(to_report)?;
    }

    root.present().map_err(to_report)?;
    Ok(())
}

/// render the importance ranking as a horizontal bar chart PNG,
/// most important feature at the top
pub fn feature_importance_chart(importances: &[(String, f64)], path: &Path) -> Result<()> {
    if importances.is_empty() {
        return Err(RiskError::report("no importances to plot"));
    }

    let mut ranked = importances.to_vec();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let n = ranked.len();
    let max_importance = ranked[0].1.max(1e-6);

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(to_report)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Importance", ("sans-serif", 30).into_font())
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(10)
        .build_cartesian_2d(0.0f64..(max_importance * 1.15), 0.0f64..(n as f64))
        .map_err(to_report)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .disable_y_axis()
        .x_desc("importance")
        .draw()
        .map_err(to_report)?;

    for (rank, (name, importance)) in ranked.iter().enumerate() {
        // top bar = most important
        let y = (n - 1 - rank) as f64;
        let color = Palette99::pick(rank).mix(0.9);

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(0.0, y + 0.15), (*importance, y + 0.85)],
                color.filled(),
            )))
            .map_err(to_report)?;
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{} ({:.4})", name, importance),
                (max_importance * 0.02, y + 0.4),
                ("sans-serif", 18).into_font(),
            )))
            .map_err(to_report)?;
    }

    root.present().map_err(to_report)?;
    Ok(())
}
