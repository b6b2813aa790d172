use crate::council::{AggregateRank, CouncilRun, Response};
use crate::error::{FailureKind, PipelineError};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Everything a finished run produced, with the label mapping revealed.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub timestamp: String,
    pub started_at: String,
    pub question: String,
    pub state: String,
    pub council: Vec<String>,
    pub chairman: String,
    pub duration_sec: f64,
    pub final_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub answers: Vec<AnswerSummary>,
    pub label_mapping: Vec<LabelEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_skipped: Option<String>,
    pub reviews: Vec<ReviewSummary>,
    pub aggregate_ranking: Vec<AggregateRank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<AnswerSummary>,
    pub stages: Vec<StageSummary>,
}

#[derive(Debug, Serialize)]
pub struct AnswerSummary {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub success: bool,
    pub duration_sec: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LabelEntry {
    pub label: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewSummary {
    pub reviewer: String,
    pub success: bool,
    pub duration_sec: f64,
    /// Labels best-first, when the review contained a ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Vec<String>>,
    /// Same ranking with labels resolved to models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranked_models: Option<Vec<String>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StageSummary {
    pub stage: u8,
    pub name: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_sec: f64,
    /// Models in the order their invocations terminated.
    pub completion_order: Vec<String>,
}

pub fn build_summary(run: &CouncilRun, error: Option<&PipelineError>) -> RunSummary {
    let label_of = |model: &str| {
        run.mapping
            .as_ref()
            .and_then(|m| m.label_for(model))
            .map(str::to_string)
    };

    let answers = run
        .stage1
        .iter()
        .flat_map(|b| b.in_query_order())
        .map(|r| answer_summary(r, label_of(&r.model)))
        .collect();

    let label_mapping = run
        .mapping
        .iter()
        .flat_map(|m| m.entries())
        .map(|(label, model)| LabelEntry {
            label: label.to_string(),
            model: model.to_string(),
        })
        .collect();

    let reviews = run
        .stage2
        .iter()
        .flat_map(|b| b.in_query_order())
        .map(|r| {
            let ranking = run
                .reviews
                .iter()
                .find(|review| review.reviewer == r.model)
                .and_then(|review| review.ranking.clone());
            let ranked_models = ranking.as_ref().map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| run.mapping.as_ref().and_then(|m| m.model_for(l)))
                    .map(str::to_string)
                    .collect()
            });
            ReviewSummary {
                reviewer: r.model.clone(),
                success: r.success,
                duration_sec: r.duration.as_secs_f64(),
                ranking,
                ranked_models,
                text: r.text.clone(),
                error: r.error.as_ref().map(|e| e.message.clone()),
            }
        })
        .collect();

    let stages = run
        .stage_timings()
        .into_iter()
        .map(|t| StageSummary {
            stage: t.stage.number(),
            name: t.stage.as_str().to_string(),
            started_at: t.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            finished_at: t.finished_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_sec: t.elapsed.as_secs_f64(),
            completion_order: t.completion_order,
        })
        .collect();

    RunSummary {
        run_id: run.id.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        started_at: run.started_at.to_rfc3339(),
        question: run.question.clone(),
        state: run.state.to_string(),
        council: run.council.clone(),
        chairman: run.chairman.clone(),
        duration_sec: run.total_duration.as_secs_f64(),
        final_answer: run.final_answer().map(str::to_string),
        error: error.map(|e| e.to_string()),
        answers,
        label_mapping,
        review_skipped: run.review_skipped.clone(),
        reviews,
        aggregate_ranking: run.aggregate_ranking.clone(),
        synthesis: run.synthesis.as_ref().map(|r| answer_summary(r, None)),
        stages,
    }
}

fn answer_summary(response: &Response, label: Option<String>) -> AnswerSummary {
    AnswerSummary {
        model: response.model.clone(),
        label,
        success: response.success,
        duration_sec: response.duration.as_secs_f64(),
        text: response.text.clone(),
        error_kind: response.error.as_ref().map(|e| e.kind),
        error: response.error.as_ref().map(|e| e.message.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::anonymizer::anonymize;
    use crate::council::ranking::aggregate_rankings;
    use crate::council::types::{Batch, Query, Review, RunState, Stage};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn batch(stage: Stage, responses: Vec<Response>) -> Batch {
        let now = Utc::now();
        Batch {
            stage,
            queries: responses.iter().map(|r| Query::new(r.model.clone(), "p")).collect(),
            completion_order: responses.iter().map(|r| r.model.clone()).collect(),
            responses: responses
                .into_iter()
                .map(|r| (r.model.clone(), r))
                .collect::<BTreeMap<_, _>>(),
            started_at: now,
            finished_at: now,
            elapsed: Duration::from_millis(1500),
        }
    }

    fn completed_run() -> CouncilRun {
        let mut run = CouncilRun::new(
            "What is 2+2?",
            vec!["m1".to_string(), "m2".to_string(), "m3".to_string()],
            "m1",
        );
        let stage1 = batch(
            Stage::Answers,
            vec![
                Response::success("m1", "4", Duration::from_secs(2)),
                Response::failure("m2", FailureKind::BackendTimeout, "timed out", Duration::from_secs(1)),
                Response::success("m3", "Four", Duration::from_secs(3)),
            ],
        );
        let (mapping, answers) = anonymize(stage1.in_query_order());
        let reviews = vec![Review {
            reviewer: "m3".to_string(),
            text: "FINAL RANKING:\n1. Response B\n2. Response A".to_string(),
            ranking: Some(vec!["B".to_string(), "A".to_string()]),
        }];
        run.aggregate_ranking = aggregate_rankings(&reviews, &mapping);
        run.stage2 = Some(batch(
            Stage::Review,
            vec![
                Response::failure("m1", FailureKind::BackendError, "exit 1", Duration::ZERO),
                Response::success("m3", reviews[0].text.clone(), Duration::from_secs(1)),
            ],
        ));
        run.stage1 = Some(stage1);
        run.mapping = Some(mapping);
        run.answers = answers;
        run.reviews = reviews;
        run.synthesis = Some(Response::success("m1", "2+2 is 4.", Duration::from_secs(4)));
        run.state = RunState::Complete;
        run
    }

    #[test]
    fn test_summary_reveals_mapping() {
        let summary = build_summary(&completed_run(), None);

        assert_eq!(summary.state, "complete");
        assert_eq!(summary.final_answer.as_deref(), Some("2+2 is 4."));
        assert!(summary.error.is_none());

        let mapping: Vec<_> = summary
            .label_mapping
            .iter()
            .map(|e| (e.label.as_str(), e.model.as_str()))
            .collect();
        assert_eq!(mapping, vec![("A", "m1"), ("B", "m3")]);

        assert_eq!(summary.answers.len(), 3);
        assert_eq!(summary.answers[1].label, None);
        assert_eq!(summary.answers[1].error_kind, Some(FailureKind::BackendTimeout));
        assert_eq!(summary.answers[2].label.as_deref(), Some("B"));

        assert_eq!(summary.reviews.len(), 2);
        assert!(!summary.reviews[0].success);
        assert_eq!(
            summary.reviews[1].ranked_models,
            Some(vec!["m3".to_string(), "m1".to_string()])
        );
        assert_eq!(summary.aggregate_ranking[0].model, "m3");
        assert_eq!(summary.stages.len(), 2);
    }

    #[test]
    fn test_summary_json_shape() {
        let json = serde_json::to_value(build_summary(&completed_run(), None)).unwrap();

        assert_eq!(json["answers"][1]["error_kind"], "backend_timeout");
        assert!(json["answers"][0].get("error").is_none());
        assert_eq!(json["label_mapping"][0]["label"], "A");
        assert_eq!(json["synthesis"]["text"], "2+2 is 4.");
        assert!(json.get("review_skipped").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
        assert!(json["started_at"].as_str().unwrap().contains('T'));
        assert_eq!(json["stages"][0]["completion_order"][0], "m1");
        assert_eq!(json["stages"][1]["completion_order"][1], "m3");
        assert!(json["stages"][1]["finished_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_failed_summary_carries_error() {
        let mut run = CouncilRun::new("q", vec!["m1".to_string()], "m1");
        run.state = RunState::Failed;
        let error = PipelineError::AllResponsesFailed { failures: vec![] };

        let summary = build_summary(&run, Some(&error));
        assert_eq!(summary.state, "failed");
        assert!(summary.final_answer.is_none());
        assert!(summary.error.unwrap().starts_with("Stage 1 failed"));
        assert!(summary.answers.is_empty());
    }
}
