//! Formatted terminal output for a training run.

use crate::app::pipeline::TrainingRun;
use crate::domain::PipelineConfig;
use crate::models::Evaluation;

/// Dataset accounting, split, balancing, schema and hold-out scores.
pub fn format_training_summary(run: &TrainingRun, config: &PipelineConfig) -> String {
    let mut out = String::new();

    out.push_str("=== credit-default - training run ===\n");
    out.push_str(&format!("Data: {}\n", config.data_path.display()));
    out.push_str(&format!(
        "Rows: read={} skipped={} dropped(negative amounts)={}\n",
        run.rows_read,
        run.row_errors.len(),
        run.dropped
    ));
    for e in run.row_errors.iter().take(5) {
        let id = e.id.as_deref().unwrap_or("-");
        out.push_str(&format!("  line {} (id {id}): {}\n", e.line, e.message));
    }
    if run.row_errors.len() > 5 {
        out.push_str(&format!("  ... {} more\n", run.row_errors.len() - 5));
    }

    let s = &run.split;
    out.push_str(&format!(
        "\nSplit (seed {}, test fraction {:.2}):\n",
        config.seed, config.test_fraction
    ));
    out.push_str(&format!(
        "  train: {:>7} rows, {:>6.2}% default\n",
        s.train_rows,
        100.0 * s.train_positive_ratio()
    ));
    out.push_str(&format!(
        "  test : {:>7} rows, {:>6.2}% default\n",
        s.test_rows,
        100.0 * s.test_positive_ratio()
    ));

    let b = &run.balance;
    out.push_str("\nBalancing (training part only):\n");
    out.push_str(&format!(
        "  before: {} repay / {} default\n",
        b.before_negative, b.before_positive
    ));
    out.push_str(&format!(
        "  added : {} interpolated + {} duplicated (class {})\n",
        b.synthetic, b.duplicated, b.minority_label
    ));
    out.push_str(&format!(
        "  after : {} repay / {} default\n",
        b.after_negative, b.after_positive
    ));
    let model = run.artifact.model();
    out.push_str(&format!("  positive class weight: {:.4}\n", model.scale_pos_weight()));

    let schema = run.schema();
    out.push_str(&format!("\nSchema: {} columns\n", schema.len()));
    for group in schema.categoricals() {
        out.push_str(&format!(
            "  {:<9} reference={} indicators={:?}\n",
            group.field.name(),
            group.reference,
            group.encoded
        ));
    }
    let constant: Vec<&str> = run
        .artifact
        .scaler()
        .zero_variance_columns()
        .into_iter()
        .map(|i| schema.columns()[i].as_str())
        .collect();
    if !constant.is_empty() {
        out.push_str(&format!("  constant in training (scaled to 0): {}\n", constant.join(", ")));
    }

    let params = model.params();
    out.push_str(&format!(
        "\nModel: {} trees, depth {}, learning rate {}\n",
        model.trees().len(),
        params.max_depth,
        params.learning_rate
    ));
    out.push_str(&format_evaluation(&run.evaluation));

    out
}

pub fn format_evaluation(eval: &Evaluation) -> String {
    let c = &eval.confusion;
    let mut out = String::new();
    out.push_str(&format!("Evaluation on {} held-out rows:\n", eval.n_rows));
    out.push_str(&format!("  accuracy : {:.4}\n", eval.accuracy));
    out.push_str(&format!("  precision: {:.4}\n", eval.precision));
    out.push_str(&format!("  recall   : {:.4}\n", eval.recall));
    out.push_str(&format!("  f1       : {:.4}\n", eval.f1));
    out.push_str("  confusion:        pred 0   pred 1\n");
    out.push_str(&format!(
        "    actual 0      {:>8} {:>8}\n",
        c.true_negative, c.false_positive
    ));
    out.push_str(&format!(
        "    actual 1      {:>8} {:>8}\n",
        c.false_negative, c.true_positive
    ));
    out
}
