//! Sequences the three council stages and owns the `CouncilRun` record.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::anonymizer::anonymize;
use super::chairman::synthesize;
use super::events::ProgressNotifier;
use super::ranking::aggregate_rankings;
use super::review::run_review_stage;
use super::types::{CouncilRun, Query, Response, RunState, Stage, StageTiming};
use crate::config::Config;
use crate::error::{ConfigError, PipelineError};
use crate::provider::Invoker;
use crate::runner::Dispatcher;

/// A run that ended in `FAILED`, returned with everything it collected.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RunFailure {
    pub error: PipelineError,
    pub run: Box<CouncilRun>,
}

pub struct Pipeline {
    dispatcher: Dispatcher,
    council: Vec<String>,
    chairman: String,
    chairman_timeout: Duration,
}

impl Pipeline {
    /// Validates the council and chairman before anything can run.
    pub fn new(invoker: Arc<dyn Invoker>, config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        if !config.chairman_in_council() {
            info!(
                "Chairman {} is not on the council; it only takes part in synthesis",
                config.chairman_model
            );
        }

        Ok(Self {
            dispatcher: Dispatcher::new(invoker, config.timeout()),
            council: config.council_models.clone(),
            chairman: config.chairman_model.clone(),
            chairman_timeout: config.chairman_timeout(),
        })
    }

    pub fn council(&self) -> &[String] {
        &self.council
    }

    pub fn chairman(&self) -> &str {
        &self.chairman
    }

    pub async fn run(
        &self,
        question: &str,
        progress: &dyn ProgressNotifier,
    ) -> Result<CouncilRun, RunFailure> {
        let start = Instant::now();
        let mut run = CouncilRun::new(question, self.council.clone(), self.chairman.clone());
        info!(
            "Council run {}: {} members, chairman {}",
            run.id,
            self.council.len(),
            self.chairman
        );

        // Stage 1: every council member answers independently
        transition(&mut run, RunState::Stage1Running);
        let queries = self
            .council
            .iter()
            .map(|model| Query::new(model.clone(), question))
            .collect();
        let stage1 = match self.dispatcher.run_batch(Stage::Answers, queries, progress).await {
            Ok(batch) => batch,
            Err(e) => return Err(abort(run, e.into(), start)),
        };
        transition(&mut run, RunState::Stage1Done);

        // Labels follow council order, never completion order
        let (mapping, answers) = anonymize(stage1.in_query_order());
        let failures = stage1.failures();
        for failure in &failures {
            warn!("Excluding {} from review: {}", failure.model, failure.message);
        }
        run.stage1 = Some(stage1);

        if answers.is_empty() {
            transition(&mut run, RunState::Failed);
            run.total_duration = start.elapsed();
            return Err(RunFailure {
                error: PipelineError::AllResponsesFailed { failures },
                run: Box::new(run),
            });
        }

        // Stage 2: peer review needs at least two answers
        if answers.len() >= 2 {
            transition(&mut run, RunState::Stage2Running);
            let reviewed = run_review_stage(
                &self.dispatcher,
                question,
                &answers,
                &self.council,
                &mapping,
                progress,
            )
            .await;
            let (batch, reviews) = match reviewed {
                Ok(r) => r,
                Err(e) => {
                    run.mapping = Some(mapping);
                    run.answers = answers;
                    return Err(abort(run, e.into(), start));
                }
            };
            run.aggregate_ranking = aggregate_rankings(&reviews, &mapping);
            debug!(
                "{} of {} reviews had a parseable ranking",
                reviews.iter().filter(|r| r.ranking.is_some()).count(),
                reviews.len()
            );
            run.stage2 = Some(batch);
            run.reviews = reviews;
            transition(&mut run, RunState::Stage2Done);
        } else {
            let reason = format!("only {} answer received", answers.len());
            info!("Skipping peer review: {}", reason);
            progress.on_stage_skipped(Stage::Review, &reason);
            run.review_skipped = Some(reason);
        }
        run.mapping = Some(mapping);
        run.answers = answers;

        // Stage 3: chairman synthesis, fatal on failure
        transition(&mut run, RunState::Stage3Running);
        progress.on_stage_start(Stage::Synthesis, 1);
        let started_at = Utc::now();
        let stage3_start = Instant::now();

        let response = {
            let originals: Vec<&Response> = run
                .stage1
                .iter()
                .flat_map(|b| b.in_query_order())
                .filter(|r| r.success)
                .collect();
            synthesize(
                &self.dispatcher,
                &self.chairman,
                question,
                &originals,
                &run.reviews,
                run.review_skipped.as_deref(),
                self.chairman_timeout,
            )
            .await
        };

        let elapsed = stage3_start.elapsed();
        progress.on_invocation_complete(Stage::Synthesis, &response, 1, 1);
        progress.on_stage_complete(Stage::Synthesis, elapsed);
        run.stage3_timing = Some(StageTiming {
            stage: Stage::Synthesis,
            started_at,
            finished_at: Utc::now(),
            elapsed,
            completion_order: vec![response.model.clone()],
        });

        let failure = response.as_failure();
        run.synthesis = Some(response);
        run.total_duration = start.elapsed();

        match failure {
            Some(f) => {
                transition(&mut run, RunState::Failed);
                Err(RunFailure {
                    error: PipelineError::SynthesisFailed {
                        chairman: f.model,
                        kind: f.kind,
                        reason: f.message,
                    },
                    run: Box::new(run),
                })
            }
            None => {
                transition(&mut run, RunState::Complete);
                info!(
                    "Council run {} complete in {:.1}s",
                    run.id,
                    run.total_duration.as_secs_f64()
                );
                Ok(run)
            }
        }
    }
}

fn transition(run: &mut CouncilRun, next: RunState) {
    debug_assert!(
        run.state.can_transition_to(next),
        "illegal council transition {} -> {}",
        run.state,
        next
    );
    debug!("Run {}: {} -> {}", run.id, run.state, next);
    run.state = next;
}

/// Dispatcher-level errors are not a stage outcome; the run stops where it is.
fn abort(mut run: CouncilRun, error: PipelineError, start: Instant) -> RunFailure {
    warn!("Run {} aborted in {}: {}", run.id, run.state, error);
    run.state = RunState::Failed;
    run.total_duration = start.elapsed();
    RunFailure {
        error,
        run: Box::new(run),
    }
}
