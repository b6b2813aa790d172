//! Data carried between the three council stages.

use crate::error::{FailureKind, ModelFailure};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use super::anonymizer::LabelMapping;
use super::ranking::AggregateRank;

/// One prompt for one model. Built per stage, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub model: String,
    pub prompt: String,
}

impl Query {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationError {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a single invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub model: String,
    pub text: String,
    pub success: bool,
    pub duration: Duration,
    pub error: Option<InvocationError>,
}

impl Response {
    pub fn success(model: impl Into<String>, text: impl Into<String>, duration: Duration) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
            success: true,
            duration,
            error: None,
        }
    }

    pub fn failure(
        model: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            model: model.into(),
            text: String::new(),
            success: false,
            duration,
            error: Some(InvocationError {
                kind,
                message: message.into(),
            }),
        }
    }

    /// `None` for successful responses.
    pub fn as_failure(&self) -> Option<ModelFailure> {
        self.error.as_ref().map(|e| ModelFailure {
            model: self.model.clone(),
            kind: e.kind,
            message: e.message.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Answers,
    Review,
    Synthesis,
}

impl Stage {
    pub fn number(&self) -> u8 {
        match self {
            Stage::Answers => 1,
            Stage::Review => 2,
            Stage::Synthesis => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Answers => "answers",
            Stage::Review => "review",
            Stage::Synthesis => "synthesis",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.as_str())
    }
}

/// All queries of one stage and their results, keyed by model.
#[derive(Debug, Clone)]
pub struct Batch {
    pub stage: Stage,
    pub queries: Vec<Query>,
    pub responses: BTreeMap<String, Response>,
    /// Models in the order their invocations terminated.
    pub completion_order: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl Batch {
    #[cfg(test)]
    pub fn get(&self, model: &str) -> Option<&Response> {
        self.responses.get(model)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.responses.values().filter(|r| r.success).count()
    }

    /// Responses in query order; deterministic regardless of completion order.
    pub fn in_query_order(&self) -> impl Iterator<Item = &Response> {
        self.queries.iter().filter_map(|q| self.responses.get(&q.model))
    }

    pub fn failures(&self) -> Vec<ModelFailure> {
        self.in_query_order().filter_map(Response::as_failure).collect()
    }

    pub fn timing(&self) -> StageTiming {
        StageTiming {
            stage: self.stage,
            started_at: self.started_at,
            finished_at: self.finished_at,
            elapsed: self.elapsed,
            completion_order: self.completion_order.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageTiming {
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Models in the order their invocations terminated.
    pub completion_order: Vec<String>,
}

/// An answer as the reviewers see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizedAnswer {
    pub label: String,
    pub text: String,
}

/// A peer review; `ranking` holds labels best-first when the text had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub reviewer: String,
    pub text: String,
    pub ranking: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Stage1Running,
    Stage1Done,
    Stage2Running,
    Stage2Done,
    Stage3Running,
    Complete,
    Failed,
}

impl RunState {
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Init, Stage1Running)
                | (Stage1Running, Stage1Done)
                | (Stage1Done, Stage2Running)
                | (Stage1Done, Stage3Running)
                | (Stage1Done, Failed)
                | (Stage2Running, Stage2Done)
                | (Stage2Done, Stage3Running)
                | (Stage3Running, Complete)
                | (Stage3Running, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::Stage1Running => "stage1_running",
            RunState::Stage1Done => "stage1_done",
            RunState::Stage2Running => "stage2_running",
            RunState::Stage2Done => "stage2_done",
            RunState::Stage3Running => "stage3_running",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one council run produced. Only the pipeline mutates it.
#[derive(Debug, Clone)]
pub struct CouncilRun {
    pub id: Uuid,
    pub question: String,
    pub council: Vec<String>,
    pub chairman: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub stage1: Option<Batch>,
    pub mapping: Option<LabelMapping>,
    pub answers: Vec<AnonymizedAnswer>,
    pub stage2: Option<Batch>,
    /// Reason Stage 2 did not run, when it was skipped.
    pub review_skipped: Option<String>,
    pub reviews: Vec<Review>,
    pub aggregate_ranking: Vec<AggregateRank>,
    pub synthesis: Option<Response>,
    pub stage3_timing: Option<StageTiming>,
    pub total_duration: Duration,
}

impl CouncilRun {
    pub fn new(question: impl Into<String>, council: Vec<String>, chairman: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            council,
            chairman: chairman.into(),
            state: RunState::Init,
            started_at: Utc::now(),
            stage1: None,
            mapping: None,
            answers: Vec::new(),
            stage2: None,
            review_skipped: None,
            reviews: Vec::new(),
            aggregate_ranking: Vec::new(),
            synthesis: None,
            stage3_timing: None,
            total_duration: Duration::ZERO,
        }
    }

    /// Synthesized answer text, once the run is complete.
    pub fn final_answer(&self) -> Option<&str> {
        match (&self.state, &self.synthesis) {
            (RunState::Complete, Some(r)) if r.success => Some(r.text.as_str()),
            _ => None,
        }
    }

    pub fn stage_timings(&self) -> Vec<StageTiming> {
        self.stage1
            .iter()
            .chain(self.stage2.iter())
            .map(Batch::timing)
            .chain(self.stage3_timing.clone())
            .collect()
    }
}
