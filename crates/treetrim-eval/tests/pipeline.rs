use treetrim_analysis::Completion;
use treetrim_eval::calibration::{Outcome, aggregate};
use treetrim_eval::{Pipeline, PipelineConfig, Record, Sample, SampleError};
use treetrim_prune::{Check, Engine};

fn sample(id: &str, target: &str, tokens: &[(&str, f64)]) -> Sample {
    Sample {
        id: id.to_owned(),
        target: target.to_owned(),
        completion: Completion {
            text: tokens.iter().map(|(token, _)| *token).collect(),
            tokens: tokens.iter().map(|(token, _)| (*token).to_owned()).collect(),
            token_logprobs: tokens.iter().map(|(_, logprob)| *logprob).collect(),
        },
    }
}

fn wrong_argument() -> Sample {
    sample(
        "call",
        "foo(a, b)",
        &[("foo(", -0.01), ("a", -0.02), (",", -0.01), (" c", -3.0), (")", -0.01), ("\n", -0.5)],
    )
}

fn config(engine: Engine) -> PipelineConfig {
    PipelineConfig { thresholds: vec![8.0, 1.0], engine, ..PipelineConfig::default() }
}

fn verdicts(records: &[Record]) -> Vec<(f64, Check, bool)> {
    records
        .iter()
        .map(|record| (record.output.max_cost, record.output.check, record.pred_in_target.eval))
        .collect()
}

#[test]
fn pruning_the_unlikely_argument_makes_the_prediction_fit() {
    for engine in [Engine::Exact, Engine::Greedy] {
        let records = Pipeline::new(config(engine)).evaluate(&wrong_argument()).unwrap();

        assert_eq!(
            verdicts(&records),
            [(8.0, Check::Sat, false), (1.0, Check::Sat, true)],
            "{engine:?}"
        );
        assert_eq!(records[0].prediction, "foo(a, c)");
        assert_eq!(records[1].output.frac_included, 0.75);
        assert_eq!(records[1].engine, engine);
    }
}

#[test]
fn only_the_first_line_is_evaluated() {
    let sample = sample(
        "line",
        "x + 1",
        &[(" x", -0.1), (" +", -0.2), (" 1", -0.05), ("\n", -0.3), ("    y", -1.0)],
    );
    let records = Pipeline::new(config(Engine::Exact)).evaluate(&sample).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].prediction, "x + 1");
    assert!(records.iter().all(|record| record.pred_in_target.eval));
    assert!(records.iter().all(|record| record.output.frac_included == 1.0));
}

#[test]
fn failing_samples_are_skipped_and_the_batch_goes_on() {
    let mut drift = sample("drift", "y", &[("zz", -0.1)]);
    drift.completion.tokens = vec!["z".to_owned()];

    let samples = [
        sample("broken", "x", &[("x", -0.1), (" +", -0.1)]),
        wrong_argument(),
        drift,
        sample("bad-target", "def", &[("y", -0.1)]),
    ];
    let batch = Pipeline::new(config(Engine::Exact)).run_batch(&samples);

    assert_eq!(batch.records.len(), 2);
    let skipped = batch.skipped.iter().map(|skip| skip.id.as_str()).collect::<Vec<_>>();
    assert_eq!(skipped, ["broken", "drift", "bad-target"]);
    assert_eq!(batch.skipped[0].reason, "prediction does not parse");
    assert_eq!(batch.skipped[2].reason, "target does not parse");
}

#[test]
fn small_targets_are_skipped_when_asked() {
    let pipeline =
        Pipeline::new(PipelineConfig { min_target_nodes: 5, ..config(Engine::Greedy) });
    assert_eq!(
        pipeline.evaluate(&wrong_argument()),
        Err(SampleError::SmallTarget { nodes: 4, min: 5 })
    );
}

#[test]
fn records_round_trip_into_calibration_outcomes() {
    let records = Pipeline::new(config(Engine::Exact)).evaluate(&wrong_argument()).unwrap();
    let lines = records
        .iter()
        .map(|record| serde_json::to_string(record).unwrap())
        .collect::<Vec<_>>();

    let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(value["m"], serde_json::Value::Null);
    assert_eq!(value["engine"], "exact");

    let outcomes = lines
        .iter()
        .map(|line| serde_json::from_str::<Outcome>(line).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(outcomes, records.iter().map(Outcome::from).collect::<Vec<_>>());

    let stats = aggregate(outcomes);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].coverage, 0.0);
    assert_eq!(stats[1].coverage, 100.0);
    assert_eq!(stats[1].percent_nodes_removed, 25.0);
}

#[test]
fn default_configuration_handles_a_long_line() {
    let code = (1..=5).fold("return f(a0)".to_owned(), |code, i| {
        format!("{code} + g{i}(b{i}, c{i} * {i})")
    });
    let words = code
        .split_whitespace()
        .enumerate()
        .map(|(i, word)| if i == 0 { word.to_owned() } else { format!(" {word}") })
        .collect::<Vec<_>>();
    let tokens = words
        .iter()
        .enumerate()
        .map(|(i, word)| (word.as_str(), -0.05 - (i % 4) as f64 * 0.04))
        .collect::<Vec<_>>();
    let sample = sample("long", &code, &tokens);

    let records = Pipeline::new(PipelineConfig::default()).evaluate(&sample).unwrap();
    assert_eq!(records.len(), PipelineConfig::default().thresholds.len());
    assert!(records.iter().all(|record| record.pred_in_target.eval));
}
