//! Stage 2: every council member ranks the anonymized answers.

use tracing::{debug, info};

use super::anonymizer::LabelMapping;
use super::events::ProgressNotifier;
use super::ranking::parse_ranking;
use super::types::{AnonymizedAnswer, Batch, Query, Review, Stage};
use crate::error::RunnerError;
use crate::runner::Dispatcher;

/// Review prompt shown to every council member. Contains labels and answer
/// text only; model identifiers never appear.
pub fn build_review_prompt(question: &str, answers: &[AnonymizedAnswer]) -> String {
    let responses_text = answers
        .iter()
        .map(|a| format!("**Response {}:**\n{}", a.label, a.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "You are evaluating different AI responses to this question:\n\n\
        QUESTION: {}\n\n\
        Here are the anonymized responses:\n\n\
        {}\n\n\
        ---\n\n\
        Please:\n\
        1. Briefly evaluate each response's strengths and weaknesses\n\
        2. End with a FINAL RANKING from best to worst:\n\n\
        FINAL RANKING:\n\
        1. Response X\n\
        2. Response Y\n\
        (etc.)",
        question, responses_text
    )
}

/// One review query per council member. Reviewers also see their own
/// answer; nothing in the prompt tells them which label it carries.
pub fn build_review_queries(
    question: &str,
    answers: &[AnonymizedAnswer],
    council_models: &[String],
) -> Vec<Query> {
    let prompt = build_review_prompt(question, answers);
    council_models
        .iter()
        .map(|model| Query::new(model.clone(), prompt.clone()))
        .collect()
}

/// Turn successful review responses into reviews, in council order.
pub fn collect_reviews(batch: &Batch, mapping: &LabelMapping) -> Vec<Review> {
    batch
        .in_query_order()
        .filter(|r| r.success)
        .map(|r| {
            let ranking = parse_ranking(&r.text, mapping);
            if ranking.is_none() {
                debug!("No ranking could be parsed from {}'s review", r.model);
            }
            Review {
                reviewer: r.model.clone(),
                text: r.text.clone(),
                ranking,
            }
        })
        .collect()
}

/// Build the review queries, dispatch them, and collect the reviews.
pub async fn run_review_stage(
    dispatcher: &Dispatcher,
    question: &str,
    answers: &[AnonymizedAnswer],
    council_models: &[String],
    mapping: &LabelMapping,
    progress: &dyn ProgressNotifier,
) -> Result<(Batch, Vec<Review>), RunnerError> {
    let queries = build_review_queries(question, answers, council_models);
    info!(
        "Asking {} reviewers to rank {} answers",
        queries.len(),
        answers.len()
    );

    let batch = dispatcher.run_batch(Stage::Review, queries, progress).await?;
    let reviews = collect_reviews(&batch, mapping);
    Ok((batch, reviews))
}
