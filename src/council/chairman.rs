//! Stage 3: the chairman merges every answer and review into one.

use std::time::Duration;
use tracing::info;

use super::types::{Query, Response, Review};
use crate::runner::Dispatcher;

/// Synthesis prompt. Answers and reviews are attributed to their models;
/// blind review is over by this point.
///
/// `review_skipped` carries the reason Stage 2 never ran; when it is `None`
/// and `reviews` is empty, the reviewers were asked but none answered.
pub fn build_synthesis_prompt(
    question: &str,
    answers: &[&Response],
    reviews: &[Review],
    review_skipped: Option<&str>,
) -> String {
    let stage1_text = answers
        .iter()
        .map(|r| format!("### {}:\n{}", r.model, r.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let stage2_text = match (reviews.is_empty(), review_skipped) {
        (true, Some(reason)) => format!("(Peer review was skipped: {}.)", reason),
        (true, None) => "(Peer review ran, but no reviewer returned an evaluation.)".to_string(),
        (false, _) => reviews
            .iter()
            .map(|r| format!("### {}'s evaluation:\n{}", r.reviewer, r.text))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n"),
    };

    format!(
        "You are the Chairman of an LLM Council. Your job is to synthesize multiple AI \
        responses into ONE comprehensive, accurate final answer.\n\n\
        ORIGINAL QUESTION: {}\n\n\
        ---\n\n\
        STAGE 1 - Individual Model Responses:\n\n\
        {}\n\n\
        ---\n\n\
        STAGE 2 - Peer Evaluations & Rankings:\n\n\
        {}\n\n\
        ---\n\n\
        YOUR TASK:\n\
        Synthesize all of this into a single, high-quality answer that:\n\
        - Incorporates the best insights from all responses\n\
        - Addresses any disagreements or gaps\n\
        - Provides clear, accurate information\n\n\
        Provide the final synthesized answer:",
        question, stage1_text, stage2_text
    )
}

/// Exactly one invocation against the chairman. The caller decides what a
/// failed response means for the run.
pub async fn synthesize(
    dispatcher: &Dispatcher,
    chairman: &str,
    question: &str,
    answers: &[&Response],
    reviews: &[Review],
    review_skipped: Option<&str>,
    timeout: Duration,
) -> Response {
    info!(
        "Chairman {} synthesizing {} answers and {} reviews",
        chairman,
        answers.len(),
        reviews.len()
    );
    let query = Query::new(
        chairman,
        build_synthesis_prompt(question, answers, reviews, review_skipped),
    );
    dispatcher.invoke(&query, timeout).await
}
