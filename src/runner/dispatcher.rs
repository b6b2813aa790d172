use crate::council::events::ProgressNotifier;
use crate::council::types::{Batch, Query, Response, Stage};
use crate::error::{FailureKind, ProviderError, RunnerError};
use crate::provider::Invoker;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, info, warn};

/// Fans a stage's queries out to the invoker and joins on all of them.
pub struct Dispatcher {
    invoker: Arc<dyn Invoker>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(invoker: Arc<dyn Invoker>, timeout: Duration) -> Self {
        Self { invoker, timeout }
    }

    /// Run a single query with its own timeout.
    pub async fn invoke(&self, query: &Query, timeout: Duration) -> Response {
        let start = Instant::now();
        let model = query.model.clone();
        let handle = tokio::spawn(invoke_one(self.invoker.clone(), query.clone(), timeout));
        match handle.await {
            Ok(response) => response,
            Err(e) => task_failure(model, e, start.elapsed()),
        }
    }

    /// Launch every query concurrently and wait for all of them.
    ///
    /// The batch holds exactly one response per query. A failing, hanging
    /// or panicking invocation never affects its siblings.
    pub async fn run_batch(
        &self,
        stage: Stage,
        queries: Vec<Query>,
        progress: &dyn ProgressNotifier,
    ) -> Result<Batch, RunnerError> {
        let mut seen = HashSet::new();
        for query in &queries {
            if !seen.insert(query.model.as_str()) {
                return Err(RunnerError::DuplicateModel(query.model.clone()));
            }
        }

        let total = queries.len();
        let started_at = Utc::now();
        let start = Instant::now();

        info!("Starting {} queries for {}", total, stage);
        progress.on_stage_start(stage, total);

        let mut futures = FuturesUnordered::new();
        for query in &queries {
            let model = query.model.clone();
            let launched = Instant::now();
            let handle = tokio::spawn(invoke_one(
                self.invoker.clone(),
                query.clone(),
                self.timeout,
            ));
            futures.push(async move { (model, launched, handle.await) });
        }

        let mut responses = BTreeMap::new();
        let mut completion_order = Vec::with_capacity(total);

        while let Some((model, launched, joined)) = futures.next().await {
            let response = match joined {
                Ok(response) => response,
                Err(e) => task_failure(model.clone(), e, launched.elapsed()),
            };

            completion_order.push(model.clone());
            progress.on_invocation_complete(stage, &response, completion_order.len(), total);
            responses.insert(model, response);
        }

        let batch = Batch {
            stage,
            queries,
            responses,
            completion_order,
            started_at,
            finished_at: Utc::now(),
            elapsed: start.elapsed(),
        };
        info!(
            "{} finished in {:.1}s: {}/{} succeeded",
            stage,
            batch.elapsed.as_secs_f64(),
            batch.success_count(),
            total
        );
        progress.on_stage_complete(stage, batch.elapsed);

        Ok(batch)
    }
}

async fn invoke_one(invoker: Arc<dyn Invoker>, query: Query, timeout: Duration) -> Response {
    let start = Instant::now();

    let result = match tokio_timeout(timeout, invoker.invoke(&query.model, &query.prompt)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    };
    let duration = start.elapsed();

    match result {
        Ok(text) => {
            debug!(
                "{} answered in {:.1}s ({} chars)",
                query.model,
                duration.as_secs_f64(),
                text.len()
            );
            Response::success(query.model, text, duration)
        }
        Err(e) => {
            warn!("{} failed after {:.1}s: {}", query.model, duration.as_secs_f64(), e);
            Response::failure(query.model, e.kind(), e.to_string(), duration)
        }
    }
}

fn task_failure(model: String, err: tokio::task::JoinError, duration: Duration) -> Response {
    warn!("Task for {} panicked: {}", model, err);
    Response::failure(
        model,
        FailureKind::BackendError,
        format!("invocation task failed: {}", err),
        duration,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::events::recording::{Event, RecordingProgress};
    use crate::council::events::NoProgress;
    use crate::runner::test_support::{ScriptedInvoker, Step};

    fn queries(models: &[&str]) -> Vec<Query> {
        models.iter().map(|m| Query::new(*m, "prompt")).collect()
    }

    #[tokio::test]
    async fn test_one_response_per_query_despite_failures() {
        let invoker = ScriptedInvoker::new(|model, _| match model {
            "err" => Step::Error(ProviderError::NonZeroExit {
                code: 1,
                stderr: "bad".to_string(),
            }),
            "hang" => Step::Hang,
            "boom" => Step::Panic,
            _ => Step::Reply(format!("hello from {model}")),
        });
        let dispatcher = Dispatcher::new(invoker.clone(), Duration::from_millis(100));

        let batch = dispatcher
            .run_batch(
                Stage::Answers,
                queries(&["ok1", "err", "hang", "boom", "ok2"]),
                &NoProgress,
            )
            .await
            .unwrap();

        assert_eq!(batch.len(), 5);
        assert_eq!(batch.completion_order.len(), 5);
        assert_eq!(batch.success_count(), 2);
        assert_eq!(batch.get("ok1").unwrap().text, "hello from ok1");

        let err = batch.get("err").unwrap();
        assert!(!err.success);
        assert_eq!(err.error.as_ref().unwrap().kind, FailureKind::BackendError);

        let hang = batch.get("hang").unwrap();
        assert_eq!(hang.error.as_ref().unwrap().kind, FailureKind::BackendTimeout);

        let boom = batch.get("boom").unwrap();
        assert_eq!(boom.error.as_ref().unwrap().kind, FailureKind::BackendError);
        assert!(boom.error.as_ref().unwrap().message.contains("task failed"));

        assert_eq!(invoker.call_count(), 5);
    }

    #[tokio::test]
    async fn test_keyed_by_model_not_completion_order() {
        let invoker = ScriptedInvoker::new(|model, _| match model {
            "slow" => Step::Delay(Duration::from_millis(80), "slow".to_string()),
            _ => Step::Reply(model.to_string()),
        });
        let dispatcher = Dispatcher::new(invoker, Duration::from_secs(5));

        let batch = dispatcher
            .run_batch(Stage::Answers, queries(&["slow", "fast"]), &NoProgress)
            .await
            .unwrap();

        assert_eq!(batch.completion_order, vec!["fast", "slow"]);
        let order: Vec<_> = batch.in_query_order().map(|r| r.model.as_str()).collect();
        assert_eq!(order, vec!["slow", "fast"]);
        assert!(batch.get("slow").unwrap().duration >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_queries_run_concurrently() {
        let invoker = ScriptedInvoker::new(|model, _| {
            Step::Delay(Duration::from_millis(300), model.to_string())
        });
        let dispatcher = Dispatcher::new(invoker, Duration::from_secs(5));

        let batch = dispatcher
            .run_batch(Stage::Answers, queries(&["a", "b", "c", "d"]), &NoProgress)
            .await
            .unwrap();

        assert_eq!(batch.success_count(), 4);
        assert!(batch.elapsed < Duration::from_millis(900));
        assert!(batch.finished_at >= batch.started_at);
    }

    #[tokio::test]
    async fn test_duplicate_models_rejected_before_launch() {
        let invoker = ScriptedInvoker::new(|_, _| Step::Reply("x".to_string()));
        let dispatcher = Dispatcher::new(invoker.clone(), Duration::from_secs(1));

        let err = dispatcher
            .run_batch(Stage::Review, queries(&["m1", "m2", "m1"]), &NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, RunnerError::DuplicateModel(m) if m == "m1"));
        assert_eq!(invoker.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let invoker = ScriptedInvoker::new(|_, _| Step::Reply("x".to_string()));
        let dispatcher = Dispatcher::new(invoker, Duration::from_secs(1));

        let batch = dispatcher
            .run_batch(Stage::Review, Vec::new(), &NoProgress)
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_progress_events() {
        let invoker = ScriptedInvoker::new(|model, _| match model {
            "bad" => Step::Error(ProviderError::EmptyOutput),
            _ => Step::Reply("ok".to_string()),
        });
        let dispatcher = Dispatcher::new(invoker, Duration::from_secs(1));
        let progress = RecordingProgress::default();

        dispatcher
            .run_batch(Stage::Answers, queries(&["bad"]), &progress)
            .await
            .unwrap();

        assert_eq!(
            progress.events(),
            vec![
                Event::Start(Stage::Answers, 1),
                Event::Done(Stage::Answers, "bad".to_string(), false, 1, 1),
                Event::Complete(Stage::Answers),
            ]
        );
    }

    #[tokio::test]
    async fn test_single_invoke_uses_given_timeout() {
        let invoker = ScriptedInvoker::new(|_, _| Step::Hang);
        let dispatcher = Dispatcher::new(invoker, Duration::from_secs(60));

        let response = dispatcher
            .invoke(&Query::new("chair", "p"), Duration::from_millis(50))
            .await;
        assert!(!response.success);
        assert_eq!(response.error.unwrap().kind, FailureKind::BackendTimeout);
    }
}
