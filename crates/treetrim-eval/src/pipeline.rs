use serde::{Deserialize, Serialize};
use treetrim_analysis::{AttributionError, Completion, Verdict, attribute, is_subtree};
use treetrim_parse::get_node;
use treetrim_prune::{Engine, ExactOptimizer, GreedyOptimizer, PruneError, Pruning};

use crate::PipelineConfig;

/// One evaluation input: a ground-truth line and the model's continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(default)]
    pub id: String,
    pub target: String,
    pub completion: Completion,
}

/// Why a sample was left out of a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    #[error("prediction does not parse")]
    UnparsablePrediction,
    #[error("target does not parse")]
    UnparsableTarget,
    #[error("target has {nodes} nodes, fewer than {min}")]
    SmallTarget { nodes: usize, min: usize },
    #[error(transparent)]
    Attribution(#[from] AttributionError),
    #[error(transparent)]
    Prune(#[from] PruneError),
}

/// The evaluation of one sample under one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "m")]
    pub max_holes: Option<usize>,
    pub engine: Engine,
    pub prediction: String,
    pub target: String,
    /// Whether the pruned prediction is structurally part of the target.
    pub pred_in_target: Verdict,
    pub output: Pruning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub records: Vec<Record>,
    pub skipped: Vec<Skipped>,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Parses, attributes, prunes and checks one sample, one record per
    /// threshold that produced an output.
    pub fn evaluate(&self, sample: &Sample) -> Result<Vec<Record>, SampleError> {
        let config = &self.config;
        let completion = if config.first_line_only {
            sample.completion.first_line()
        } else {
            sample.completion.clone()
        };
        let target_code = sample.target.trim();

        let mut prediction = get_node(&completion.text).ok_or(SampleError::UnparsablePrediction)?;
        let target = get_node(target_code).ok_or(SampleError::UnparsableTarget)?;

        let nodes = target.total_nodes();
        if nodes < config.min_target_nodes {
            return Err(SampleError::SmallTarget { nodes, min: config.min_target_nodes });
        }

        attribute(&mut prediction, &completion.text, &completion.tokens, &completion.token_logprobs)?;

        let outputs = match config.engine {
            Engine::Exact => ExactOptimizer::new(config.max_holes)
                .with_search_limit(config.search_limit)
                .prune(&prediction, &config.thresholds)?
                .into_iter()
                .map(Ok)
                .collect(),
            Engine::Greedy => {
                GreedyOptimizer::new(config.max_holes).prune_all(&prediction, &config.thresholds)
            }
        };

        let mut records = Vec::with_capacity(outputs.len());
        for (&max_cost, output) in config.thresholds.iter().zip(outputs) {
            let output = match output {
                Ok(output) => output,
                Err(error) => {
                    tracing::warn!(id = %sample.id, max_cost, %error, "threshold skipped");
                    continue;
                }
            };

            let pred_in_target =
                is_subtree(target_code, &target, &completion.text, output.pruned.as_ref());
            records.push(Record {
                id: sample.id.clone(),
                max_holes: config.max_holes,
                engine: config.engine,
                prediction: completion.text.clone(),
                target: target_code.to_owned(),
                pred_in_target,
                output,
            });
        }
        Ok(records)
    }

    /// Evaluates every sample. A failing sample is logged and listed in
    /// `skipped`; the rest of the batch goes on.
    pub fn run_batch<'s>(&self, samples: impl IntoIterator<Item = &'s Sample>) -> Batch {
        let mut batch = Batch::default();
        let mut seen = 0;

        for sample in samples {
            seen += 1;
            match self.evaluate(sample) {
                Ok(records) => batch.records.extend(records),
                Err(error) => {
                    tracing::warn!(id = %sample.id, %error, "sample skipped");
                    batch.skipped.push(Skipped { id: sample.id.clone(), reason: error.to_string() });
                }
            }
        }

        tracing::info!(
            samples = seen,
            skipped = batch.skipped.len(),
            records = batch.records.len(),
            "batch finished"
        );
        batch
    }
}
