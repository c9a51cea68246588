//! `epiml score`

use super::validate_path;
use crate::error::Result;
use crate::output;
use epiml::scoring::{FrankenScorer, ScoreValue, SCORE_KEYS};
use epiml::EpimlModel;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ScoreReport<'a> {
    decision_score: &'a str,
    score: f64,
    metrics: &'a epiml::scoring::ScoreData,
}

pub(crate) fn run(model_path: &Path, data: &Path, decision_score: &str, json: bool) -> Result<()> {
    validate_path(model_path)?;
    validate_path(data)?;
    let scorer = FrankenScorer::new(decision_score)?;
    let model = EpimlModel::load_model(model_path)?;
    let (metrics, score) = model.score(data, &scorer)?;

    if json {
        return output::json(&ScoreReport {
            decision_score,
            score,
            metrics: &metrics,
        });
    }

    output::section("Scores");
    for key in SCORE_KEYS {
        match metrics.get(key) {
            Some(ScoreValue::Scalar(v)) => output::kv(key, output::metric(*v)),
            Some(ScoreValue::Confusion([[tn, fp], [fn_, tp]])) => {
                output::kv(key, format!("tn={tn} fp={fp} fn={fn_} tp={tp}"));
            }
            None => {}
        }
    }
    output::section("Decision");
    output::kv(decision_score, output::metric(score));
    Ok(())
}
