use feedback_sentiment::error::Result;
use feedback_sentiment::sentiment::{FeedbackPipelineBuilder, ModernBertSize, SentimentLabel};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SURVEY: &[(&str, &[&str])] = &[
    (
        "Opportunities to contribute and develop skills",
        &[
            "I had a great opportunity to enhance my skills through the workshop.",
            "The sessions were not very engaging.",
            "I am neither satisfied nor dissatisfied with the training sessions.",
            "Skill development is ongoing, but there's room for improvement.",
        ],
    ),
    (
        "Recognition and appreciation of efforts",
        &[
            "My work was highly appreciated in the team meeting.",
            "Recognition is not consistent across the team.",
            "I feel indifferent about the recognition initiatives.",
            "There is some acknowledgment, but it's not very impactful.",
        ],
    ),
    (
        "Well-informed about QE initiatives",
        &[
            "The updates are regular and keep us aligned with the goals.",
            "Communication could be improved for better clarity.",
            "Neutral on the level of information provided.",
            "I sometimes feel disconnected from the bigger picture despite the updates.",
        ],
    ),
];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Building pipeline...");
    let pipeline = FeedbackPipelineBuilder::modernbert(ModernBertSize::Base)
        .confidence_threshold(0.6)
        .build()?;
    println!("Pipeline built successfully.");

    // Every category's answers in one ordered batch.
    let feedback: Vec<&str> = SURVEY
        .iter()
        .flat_map(|(_, answers)| answers.iter().copied())
        .collect();

    let output = pipeline.run(feedback.as_slice());
    let summary = output.summary();

    info!(
        positive = summary.counts.positive,
        negative = summary.counts.negative,
        neutral = summary.counts.neutral,
        "sentiment counts"
    );
    info!(
        positive = summary.percentages.positive,
        negative = summary.percentages.negative,
        neutral = summary.percentages.neutral,
        "sentiment percentages"
    );

    println!("\n=== Feedback ===");
    for r in &output.results {
        println!(
            "[{:>8}] {:.2} {:?}: {}",
            r.classification.label, r.classification.score, r.origin, r.text
        );
    }

    println!("\n=== Positive Feedback ===");
    for text in output.texts_with_label(SentimentLabel::Positive) {
        println!("- {text}");
    }

    println!("\n=== Summary ===");
    println!("{summary}");
    println!(
        "Completed in {:.2}ms",
        output.stats.total_time.as_secs_f64() * 1000.0
    );

    Ok(())
}
