use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use feedback_sentiment::error::{PipelineError, Result};
use feedback_sentiment::sentiment::{
    aggregate, Classification, FeedbackPipelineBuilder, Origin, SentimentClassifier,
    SentimentLabel,
};

/// Answers from a fixed table and counts how often it is asked.
#[derive(Default)]
struct ScriptedClassifier {
    answers: HashMap<&'static str, Option<Classification>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn answer(mut self, text: &'static str, label: SentimentLabel, score: f32) -> Self {
        self.answers
            .insert(text, Some(Classification::new(label, score)));
        self
    }

    fn fail_on(mut self, text: &'static str) -> Self {
        self.answers.insert(text, None);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SentimentClassifier for ScriptedClassifier {
    fn classify(&self, text: &str) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(text) {
            Some(Some(answer)) => Ok(*answer),
            Some(None) => Err(PipelineError::Classification("model exploded".into())),
            None => Ok(Classification::new(SentimentLabel::Positive, 0.99)),
        }
    }
}

const NEUTRAL_TEXT: &str = "I am neither satisfied nor dissatisfied with the service.";
const GREAT: &str = "Great job!";
const TERRIBLE: &str = "Terrible experience.";

fn survey_classifier(great_score: f32) -> ScriptedClassifier {
    ScriptedClassifier::default()
        .answer(GREAT, SentimentLabel::Positive, great_score)
        .answer(TERRIBLE, SentimentLabel::Negative, 0.85)
}

#[test]
fn classifies_the_reference_scenario() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(survey_classifier(0.95))
        .neutral_phrases(["neither satisfied nor dissatisfied"])
        .confidence_threshold(0.6)
        .build()?;

    let output = pipeline.run(&[NEUTRAL_TEXT, GREAT, TERRIBLE]);

    assert_eq!(
        output.classifications(),
        vec![
            Classification::new(SentimentLabel::Neutral, 1.0),
            Classification::new(SentimentLabel::Positive, 0.95),
            Classification::new(SentimentLabel::Negative, 0.85),
        ]
    );

    let summary = output.summary();
    assert_eq!(summary.counts.positive, 1);
    assert_eq!(summary.counts.negative, 1);
    assert_eq!(summary.counts.neutral, 1);
    for pct in [
        summary.percentages.positive,
        summary.percentages.negative,
        summary.percentages.neutral,
    ] {
        assert!((pct - 100.0 / 3.0).abs() < 1e-9);
    }
    Ok(())
}

#[test]
fn low_confidence_becomes_neutral_and_keeps_its_score() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(survey_classifier(0.4))
        .neutral_phrases(["neither satisfied nor dissatisfied"])
        .build()?;

    let output = pipeline.run(&[NEUTRAL_TEXT, GREAT, TERRIBLE]);

    assert_eq!(
        output.results[1].classification,
        Classification::new(SentimentLabel::Neutral, 0.4)
    );
    assert_eq!(output.results[1].origin, Origin::LowConfidence);
    // Both neutral paths share a label but not a score.
    assert_eq!(output.results[0].classification.score, 1.0);
    assert_eq!(output.results[0].origin, Origin::Override);
    assert_eq!(output.stats.low_confidence, 1);
    assert_eq!(output.stats.overrides, 1);
    Ok(())
}

#[test]
fn score_equal_to_threshold_is_kept() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(survey_classifier(0.6))
        .confidence_threshold(0.6)
        .build()?;

    let output = pipeline.run(GREAT);
    assert_eq!(
        output.classification,
        Classification::new(SentimentLabel::Positive, 0.6)
    );
    assert_eq!(output.origin, Origin::Model);
    Ok(())
}

#[test]
fn override_never_calls_the_classifier() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(ScriptedClassifier::default())
        .neutral_phrases(["there's room for improvement"])
        .build()?;

    let output = pipeline.run(&[
        "Skill development is ongoing, but THERE'S ROOM FOR IMPROVEMENT.",
        "There's room for improvement in communication.",
    ]);

    assert_eq!(pipeline.classifier().calls(), 0);
    for r in &output.results {
        assert_eq!(r.classification, Classification::override_neutral());
        assert_eq!(r.origin, Origin::Override);
    }
    Ok(())
}

#[test]
fn classifier_is_called_once_per_non_overridden_item() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(survey_classifier(0.95))
        .neutral_phrases(["neither satisfied nor dissatisfied"])
        .build()?;

    pipeline.run(&[NEUTRAL_TEXT, GREAT, TERRIBLE, NEUTRAL_TEXT]);
    assert_eq!(pipeline.classifier().calls(), 2);
    Ok(())
}

#[test]
fn a_failing_item_does_not_stop_the_batch() -> Result<()> {
    let classifier = survey_classifier(0.95).fail_on("Communication could be improved.");
    let pipeline = FeedbackPipelineBuilder::new(classifier).build()?;

    let output = pipeline.run(&[GREAT, "Communication could be improved.", TERRIBLE]);

    assert_eq!(output.results.len(), 3);
    assert_eq!(output.results[1].classification, Classification::unknown());
    assert_eq!(output.results[1].origin, Origin::Failed);
    assert!(matches!(
        output.results[1].error,
        Some(PipelineError::Classification(_))
    ));
    assert_eq!(output.results[2].classification.label, SentimentLabel::Negative);
    assert_eq!(output.stats.failures, 1);
    assert_eq!(pipeline.classifier().calls(), 3);
    Ok(())
}

#[test]
fn unknown_results_deflate_percentages() -> Result<()> {
    let classifier = survey_classifier(0.95).fail_on("broken");
    let pipeline = FeedbackPipelineBuilder::new(classifier).build()?;

    let summary = pipeline.run(&[GREAT, TERRIBLE, "broken", "broken"]).summary();

    // Failures stay in the denominator, so the tracked percentages sum to 50, not 100.
    assert_eq!(summary.counts.tracked(), 2);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.percentages.positive, 25.0);
    assert_eq!(summary.percentages.negative, 25.0);
    assert_eq!(summary.percentages.neutral, 0.0);
    Ok(())
}

#[test]
fn results_follow_input_order() -> Result<()> {
    let texts: Vec<String> = (0..25).map(|i| format!("comment number {i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

    let pipeline = FeedbackPipelineBuilder::new(ScriptedClassifier::default()).build()?;
    let output = pipeline.run(refs.as_slice());

    assert_eq!(output.results.len(), refs.len());
    for (result, text) in output.results.iter().zip(&refs) {
        assert_eq!(result.text, *text);
    }
    Ok(())
}

#[test]
fn empty_batch_gives_empty_results_and_zero_summary() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(ScriptedClassifier::default()).build()?;

    let empty: &[&str] = &[];
    let output = pipeline.run(empty);

    assert!(output.results.is_empty());
    assert_eq!(output.summary(), aggregate(&[] as &[Classification]));
    assert_eq!(output.summary().percentages.positive, 0.0);
    assert_eq!(pipeline.classifier().calls(), 0);
    Ok(())
}

#[test]
fn blank_text_is_unknown_without_calling_the_classifier() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(ScriptedClassifier::default()).build()?;

    let output = pipeline.run(&["   ", GREAT]);

    assert_eq!(output.results[0].classification, Classification::unknown());
    assert!(matches!(
        output.results[0].error,
        Some(PipelineError::InvalidInput(_))
    ));
    assert_eq!(pipeline.classifier().calls(), 1);
    Ok(())
}

#[test]
fn malformed_classifier_output_is_contained() -> Result<()> {
    let classifier = ScriptedClassifier::default()
        .answer("too sure", SentimentLabel::Positive, 1.7)
        .answer("reserved", SentimentLabel::Unknown, 0.9);
    let pipeline = FeedbackPipelineBuilder::new(classifier).build()?;

    let output = pipeline.run(&["too sure", "reserved", GREAT]);

    assert_eq!(output.results[0].origin, Origin::Failed);
    assert_eq!(output.results[1].origin, Origin::Failed);
    assert_eq!(output.results[2].origin, Origin::Model);
    Ok(())
}

#[test]
fn classify_batch_returns_bare_classifications() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(survey_classifier(0.95))
        .neutral_phrases(Vec::<String>::new())
        .build()?;

    let results = pipeline.classify_batch(&[NEUTRAL_TEXT, TERRIBLE]);

    // No phrases configured, so the neutral-sounding text goes to the model.
    assert_eq!(results[0], Classification::new(SentimentLabel::Positive, 0.99));
    assert_eq!(results[1], Classification::new(SentimentLabel::Negative, 0.85));
    Ok(())
}

#[test]
fn invalid_configuration_fails_at_build() {
    let err = FeedbackPipelineBuilder::new(ScriptedClassifier::default())
        .confidence_threshold(-0.2)
        .build()
        .err();
    assert!(matches!(err, Some(PipelineError::Config(_))));

    let err = FeedbackPipelineBuilder::new(ScriptedClassifier::default())
        .neutral_phrase("")
        .build()
        .err();
    assert!(matches!(err, Some(PipelineError::Config(_))));
}

#[test]
fn texts_with_label_selects_in_order() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(survey_classifier(0.95)).build()?;

    let output = pipeline.run(&[GREAT, TERRIBLE, "Fantastic support."]);
    let positive: Vec<&str> = output.texts_with_label(SentimentLabel::Positive).collect();

    assert_eq!(positive, vec![GREAT, "Fantastic support."]);
    Ok(())
}

/// A batch endpoint that rejects the whole request when any one text is bad.
struct PoisonedBatch;

impl SentimentClassifier for PoisonedBatch {
    fn classify(&self, text: &str) -> Result<Classification> {
        match text {
            "poison" => Err(PipelineError::Classification("unreadable input".into())),
            TERRIBLE => Ok(Classification::new(SentimentLabel::Negative, 0.9)),
            _ => Ok(Classification::new(SentimentLabel::Positive, 0.9)),
        }
    }

    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        if texts.contains(&"poison") {
            return Err(PipelineError::Download("service rejected the batch".into()));
        }
        Ok(texts.iter().map(|t| self.classify(t)).collect())
    }
}

#[test]
fn whole_batch_failure_falls_back_to_single_calls() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(PoisonedBatch).build()?;

    let output = pipeline.run(&[GREAT, "poison", NEUTRAL_TEXT, TERRIBLE]);

    let labels: Vec<SentimentLabel> = output
        .results
        .iter()
        .map(|r| r.classification.label)
        .collect();
    assert_eq!(
        labels,
        vec![
            SentimentLabel::Positive,
            SentimentLabel::Unknown,
            SentimentLabel::Neutral,
            SentimentLabel::Negative,
        ]
    );
    assert!(matches!(
        output.results[1].error,
        Some(PipelineError::Classification(_))
    ));
    assert_eq!(output.results[2].origin, Origin::Override);
    assert_eq!(output.stats.failures, 1);
    Ok(())
}

/// Panics on one text. The default `classify_batch` therefore panics too.
struct PanicsOn(&'static str);

impl SentimentClassifier for PanicsOn {
    fn classify(&self, text: &str) -> Result<Classification> {
        if text == self.0 {
            panic!("classifier bug");
        }
        Ok(Classification::new(SentimentLabel::Positive, 0.9))
    }
}

#[test]
fn classifier_panic_fails_only_its_item() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(PanicsOn("crash")).build()?;

    let output = pipeline.run(&[GREAT, "crash", TERRIBLE]);

    assert_eq!(output.results.len(), 3);
    assert_eq!(output.results[0].origin, Origin::Model);
    assert_eq!(output.results[1].classification, Classification::unknown());
    assert!(matches!(
        output.results[1].error,
        Some(PipelineError::Unexpected(ref msg)) if msg.contains("classifier bug")
    ));
    assert_eq!(output.results[2].origin, Origin::Model);
    assert_eq!(output.stats.failures, 1);
    Ok(())
}

#[test]
fn classifier_panic_on_a_single_text_is_contained() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(PanicsOn("crash")).build()?;

    let output = pipeline.run("crash");

    assert_eq!(output.classification, Classification::unknown());
    assert_eq!(output.origin, Origin::Failed);
    Ok(())
}

/// Returns fewer results than it was given.
struct ShortBatch;

impl SentimentClassifier for ShortBatch {
    fn classify(&self, _text: &str) -> Result<Classification> {
        Ok(Classification::new(SentimentLabel::Negative, 0.8))
    }

    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        Ok(texts
            .iter()
            .take(texts.len().saturating_sub(1))
            .map(|_| Ok(Classification::new(SentimentLabel::Positive, 0.9)))
            .collect())
    }
}

#[test]
fn short_classifier_output_is_filled_by_single_calls() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(ShortBatch).build()?;

    let output = pipeline.run(&["a", "b", "c"]);

    assert_eq!(output.results.len(), 3);
    assert_eq!(output.results[0].classification.label, SentimentLabel::Positive);
    assert_eq!(output.results[1].classification.label, SentimentLabel::Positive);
    assert_eq!(
        output.results[2].classification,
        Classification::new(SentimentLabel::Negative, 0.8)
    );
    assert_eq!(output.stats.failures, 0);
    Ok(())
}

/// Returns more results than it was given.
struct LongBatch;

impl SentimentClassifier for LongBatch {
    fn classify(&self, _text: &str) -> Result<Classification> {
        Ok(Classification::new(SentimentLabel::Positive, 0.9))
    }

    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        let mut results: Vec<Result<Classification>> =
            texts.iter().map(|t| self.classify(t)).collect();
        results.push(Ok(Classification::new(SentimentLabel::Negative, 0.9)));
        results.push(Err(PipelineError::Classification("stray".into())));
        Ok(results)
    }
}

#[test]
fn extra_classifier_output_is_ignored() -> Result<()> {
    let pipeline = FeedbackPipelineBuilder::new(LongBatch).build()?;

    let output = pipeline.run(&[GREAT, TERRIBLE]);

    assert_eq!(output.results.len(), 2);
    assert!(output
        .results
        .iter()
        .all(|r| r.classification.label == SentimentLabel::Positive));
    assert_eq!(output.stats.failures, 0);
    assert_eq!(output.summary().total, 2);
    Ok(())
}
