//! Fan-out / fan-in over one batch of provisioning tasks.
//!
//! Every task gets its own spawned unit of work, all launched before any is
//! awaited. Successful creations land in an [`Aggregator`]; the first hard
//! failure wins the [`CancellationController`] slot and cancels the batch, so
//! units that have not reached the provisioner yet exit without calling it.
//! Units already inside a remote call are left to finish: the batch always
//! joins every unit before returning, which bounds its latency by the slowest
//! in-flight call rather than by the first failure.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use reminder_core::{ScheduleExpression, ScheduleKey};

use crate::aggregator::Aggregator;
use crate::cancel::CancellationController;
use crate::error::ProvisionError;
use crate::provisioner::Provisioner;
use crate::task::{FailureMode, Task, TaskOutcome};

/// Generated schedule key → the expression it was created from.
pub type AggregatedResult = HashMap<ScheduleKey, ScheduleExpression>;

/// Either every created schedule or the batch's first failure.
///
/// Deletion batches succeed with an empty map.
pub type OrchestrationResult = Result<AggregatedResult, ProvisionError>;

/// What to do with schedules already created when a creation batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compensation {
    /// Leave them in place. They are not referenced by any record.
    #[default]
    None,
    /// Delete them in a second, not-found-tolerant batch.
    DeleteCreated,
}

/// Runs batches of tasks against a shared provisioner.
pub struct Orchestrator {
    provisioner: Arc<dyn Provisioner>,
    compensation: Compensation,
}

#[derive(Debug, Default)]
struct OutcomeCounts {
    created: usize,
    deleted: usize,
    already_absent: usize,
    skipped: usize,
    failed: usize,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Created { .. } => self.created += 1,
            TaskOutcome::Deleted { .. } => self.deleted += 1,
            TaskOutcome::AlreadyAbsent { .. } => self.already_absent += 1,
            TaskOutcome::Skipped { .. } => self.skipped += 1,
            TaskOutcome::Failed { .. } => self.failed += 1,
        }
    }
}

struct BatchReport {
    created: AggregatedResult,
    failure: Option<ProvisionError>,
}

impl Orchestrator {
    pub fn new(provisioner: Arc<dyn Provisioner>) -> Self {
        Self {
            provisioner,
            compensation: Compensation::None,
        }
    }

    pub fn with_compensation(mut self, compensation: Compensation) -> Self {
        self.compensation = compensation;
        self
    }

    pub fn compensation(&self) -> Compensation {
        self.compensation
    }

    /// Run `tasks` in a scope of their own.
    pub async fn run(&self, tasks: Vec<Task>, mode: FailureMode) -> OrchestrationResult {
        self.run_scoped(tasks, mode, &CancellationToken::new()).await
    }

    /// Run `tasks` inside the caller's `scope`.
    ///
    /// Cancelling `scope` (e.g. when a request deadline passes) stops units
    /// from starting and aborts remote calls in flight with
    /// [`ProvisionError::Cancelled`].
    pub async fn run_scoped(
        &self,
        tasks: Vec<Task>,
        mode: FailureMode,
        scope: &CancellationToken,
    ) -> OrchestrationResult {
        if tasks.is_empty() {
            debug!("empty batch, nothing to provision");
            return Ok(AggregatedResult::new());
        }

        let report = self.fan_out(tasks, mode, scope).await;
        match report.failure {
            Some(failure) => {
                if self.compensation == Compensation::DeleteCreated && !report.created.is_empty() {
                    self.compensate(report.created).await;
                }
                Err(failure)
            }
            None => Ok(report.created),
        }
    }

    async fn fan_out(
        &self,
        tasks: Vec<Task>,
        mode: FailureMode,
        scope: &CancellationToken,
    ) -> BatchReport {
        let started = Instant::now();
        let total = tasks.len();
        let (controller, first_failure) = CancellationController::new(scope);
        let aggregator = Arc::new(Aggregator::new());

        info!(
            tasks = total,
            mode = ?mode,
            backend = self.provisioner.backend_name(),
            "provisioning batch started"
        );

        let mut units = JoinSet::new();
        for task in tasks {
            let provisioner = Arc::clone(&self.provisioner);
            let controller = controller.clone();
            let aggregator = Arc::clone(&aggregator);
            let scope = scope.clone();

            units.spawn(async move {
                let kind = task.kind();
                let outcome = execute(provisioner.as_ref(), task, mode, &controller, &scope).await;
                match &outcome {
                    TaskOutcome::Created { key, expression } => {
                        aggregator.insert(key.clone(), expression.clone()).await;
                    }
                    TaskOutcome::Failed { error, .. } => {
                        controller.report(error.clone());
                    }
                    _ => {}
                }
                (kind, outcome)
            });
        }

        let mut counts = OutcomeCounts::default();
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((kind, outcome)) => {
                    debug!(
                        kind = %kind,
                        key = %outcome.key(),
                        outcome = outcome.label(),
                        success = outcome.is_success(),
                        "unit finished"
                    );
                    counts.record(&outcome);
                }
                Err(e) => {
                    counts.failed += 1;
                    controller.report(ProvisionError::Internal(format!(
                        "unit of work did not complete: {e}"
                    )));
                }
            }
        }

        let aggregated = aggregator.len().await;
        debug!(aggregated, "all units joined");
        let created = aggregator.snapshot().await;
        let failure = match first_failure.take() {
            Some(failure) => Some(failure),
            None if controller.is_cancelled() => Some(ProvisionError::Cancelled),
            None => None,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &failure {
            Some(failure) => warn!(
                tasks = total,
                created = counts.created,
                skipped = counts.skipped,
                failed = counts.failed,
                elapsed_ms,
                error = %failure,
                "provisioning batch failed"
            ),
            None => info!(
                tasks = total,
                created = counts.created,
                deleted = counts.deleted,
                already_absent = counts.already_absent,
                elapsed_ms,
                "provisioning batch finished"
            ),
        }

        BatchReport { created, failure }
    }

    async fn compensate(&self, created: AggregatedResult) {
        let tasks: Vec<Task> = created.into_keys().map(Task::delete).collect();
        let count = tasks.len();
        warn!(schedules = count, "deleting schedules created by the failed batch");

        // Fresh scope: the caller's may already be cancelled.
        let report = self
            .fan_out(tasks, FailureMode::TolerateNotFound, &CancellationToken::new())
            .await;
        match report.failure {
            Some(failure) => error!(
                schedules = count,
                error = %failure,
                "compensation failed, remote schedules may be orphaned"
            ),
            None => info!(schedules = count, "compensation finished"),
        }
    }
}

/// One unit of work: check the batch, call the provisioner, classify.
async fn execute(
    provisioner: &dyn Provisioner,
    task: Task,
    mode: FailureMode,
    batch: &CancellationController,
    scope: &CancellationToken,
) -> TaskOutcome {
    if batch.is_cancelled() {
        return TaskOutcome::Skipped { key: task.into_key() };
    }

    match task {
        Task::Create { key, spec } => {
            let result = tokio::select! {
                biased;
                _ = scope.cancelled() => Err(ProvisionError::Cancelled),
                created = provisioner.create_schedule(&key, &spec) => created,
            };
            match result {
                Ok(generated) => TaskOutcome::Created {
                    key: generated,
                    expression: spec.expression,
                },
                Err(error) => TaskOutcome::Failed { key, error },
            }
        }
        Task::Delete { key } => {
            let result = tokio::select! {
                biased;
                _ = scope.cancelled() => Err(ProvisionError::Cancelled),
                deleted = provisioner.delete_schedule(&key) => deleted,
            };
            match result {
                Ok(()) => TaskOutcome::Deleted { key },
                Err(error) if error.is_not_found() && mode == FailureMode::TolerateNotFound => {
                    TaskOutcome::AlreadyAbsent { key }
                }
                Err(error) => TaskOutcome::Failed { key, error },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::task::ScheduleSpec;

    #[derive(Clone)]
    enum Reply {
        Ok,
        Fail(ProvisionError),
        Panic,
    }

    /// Provisioner whose replies are scripted per name: the expression value
    /// for creations, the key for deletions. Unscripted creations succeed and
    /// unscripted deletions succeed only for schedules it created.
    #[derive(Default)]
    struct ScriptedProvisioner {
        script: HashMap<String, (Duration, Reply)>,
        live: Mutex<HashSet<ScheduleKey>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvisioner {
        fn with(mut self, name: &str, delay_ms: u64, reply: Reply) -> Self {
            self.script
                .insert(name.to_string(), (Duration::from_millis(delay_ms), reply));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn live(&self) -> usize {
            self.live.lock().unwrap().len()
        }

        async fn play(&self, name: &str) -> Option<Result<(), ProvisionError>> {
            let (delay, reply) = self.script.get(name).cloned()?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Reply::Ok => Some(Ok(())),
                Reply::Fail(e) => Some(Err(e)),
                Reply::Panic => panic!("scripted panic for {name}"),
            }
        }
    }

    #[async_trait]
    impl Provisioner for ScriptedProvisioner {
        async fn create_schedule(
            &self,
            key: &ScheduleKey,
            spec: &ScheduleSpec,
        ) -> Result<ScheduleKey, ProvisionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(result) = self.play(&spec.expression.value).await {
                result?;
            }
            self.live.lock().unwrap().insert(key.clone());
            Ok(key.clone())
        }

        async fn delete_schedule(&self, key: &ScheduleKey) -> Result<(), ProvisionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(result) = self.play(key.as_str()).await {
                return result;
            }
            if self.live.lock().unwrap().remove(key) {
                Ok(())
            } else {
                Err(ProvisionError::NotFound(key.to_string()))
            }
        }

        fn backend_name(&self) -> &str {
            "scripted"
        }
    }

    fn create(expression: &str) -> Task {
        Task::create(ScheduleSpec {
            expression: ScheduleExpression::cron(expression),
            timezone: "Europe/Warsaw".to_string(),
            message: "stand-up".to_string(),
            owner_id: "user-1".to_string(),
        })
    }

    fn orchestrator(provisioner: &Arc<ScriptedProvisioner>) -> Orchestrator {
        Orchestrator::new(provisioner.clone())
    }

    #[tokio::test]
    async fn all_successes_map_every_key_to_its_expression() {
        let provisioner = Arc::new(ScriptedProvisioner::default());
        let tasks = vec![create("a"), create("b"), create("c")];
        let expected: HashMap<ScheduleKey, String> = tasks
            .iter()
            .map(|t| match t {
                Task::Create { key, spec } => (key.clone(), spec.expression.value.clone()),
                Task::Delete { .. } => unreachable!(),
            })
            .collect();

        let created = orchestrator(&provisioner)
            .run(tasks, FailureMode::FailFast)
            .await
            .unwrap();

        assert_eq!(created.len(), 3);
        for (key, expression) in &created {
            assert_eq!(&expected[key], &expression.value);
        }
        assert_eq!(provisioner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn result_set_ignores_completion_order() {
        let provisioner = Arc::new(
            ScriptedProvisioner::default()
                .with("slow", 300, Reply::Ok)
                .with("medium", 200, Reply::Ok)
                .with("fast", 100, Reply::Ok),
        );

        let created = orchestrator(&provisioner)
            .run(vec![create("slow"), create("medium"), create("fast")], FailureMode::FailFast)
            .await
            .unwrap();

        let mut values: Vec<_> = created.values().map(|e| e.value.as_str()).collect();
        values.sort();
        assert_eq!(values, vec!["fast", "medium", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn single_failure_waits_for_slowest_in_flight_unit() {
        let provisioner = Arc::new(
            ScriptedProvisioner::default()
                .with("a", 1000, Reply::Fail(ProvisionError::Provider("boom".into())))
                .with("b", 2000, Reply::Ok)
                .with("c", 2000, Reply::Ok),
        );

        let started = Instant::now();
        let result = orchestrator(&provisioner)
            .run(vec![create("a"), create("b"), create("c")], FailureMode::FailFast)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(result.unwrap_err(), ProvisionError::Provider("boom".into()));
        assert!(elapsed >= Duration::from_secs(2), "returned before in-flight units: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "latencies were summed: {elapsed:?}");
        // In-flight calls were not interrupted.
        assert_eq!(provisioner.calls(), 3);
        assert_eq!(provisioner.live(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn multiple_failures_surface_exactly_one_of_them() {
        let failures = [
            ProvisionError::Provider("first".into()),
            ProvisionError::Provider("second".into()),
            ProvisionError::Internal("third".into()),
        ];
        let provisioner = Arc::new(
            ScriptedProvisioner::default()
                .with("a", 10, Reply::Fail(failures[0].clone()))
                .with("b", 10, Reply::Fail(failures[1].clone()))
                .with("c", 10, Reply::Fail(failures[2].clone())),
        );

        let error = orchestrator(&provisioner)
            .run(vec![create("a"), create("b"), create("c")], FailureMode::FailFast)
            .await
            .unwrap_err();

        assert!(failures.contains(&error), "unexpected error {error:?}");
    }

    #[tokio::test]
    async fn units_not_started_before_cancellation_skip_the_provisioner() {
        let provisioner = Arc::new(
            ScriptedProvisioner::default()
                .with("k1", 0, Reply::Fail(ProvisionError::Provider("denied".into())))
                .with("k2", 0, Reply::Ok)
                .with("k3", 0, Reply::Ok),
        );

        let result = orchestrator(&provisioner)
            .run(
                vec![Task::delete("k1"), Task::delete("k2"), Task::delete("k3")],
                FailureMode::FailFast,
            )
            .await;

        assert_eq!(result.unwrap_err(), ProvisionError::Provider("denied".into()));
        assert_eq!(provisioner.calls(), 1);
    }

    #[tokio::test]
    async fn tolerant_mode_treats_absent_schedules_as_deleted() {
        let provisioner = Arc::new(ScriptedProvisioner::default());

        let result = orchestrator(&provisioner)
            .run(
                vec![Task::delete("gone-1"), Task::delete("gone-2")],
                FailureMode::TolerateNotFound,
            )
            .await;

        assert!(result.unwrap().is_empty());
        assert_eq!(provisioner.calls(), 2);
    }

    #[tokio::test]
    async fn fail_fast_mode_reports_absent_schedules() {
        let provisioner = Arc::new(ScriptedProvisioner::default());

        let error = orchestrator(&provisioner)
            .run(vec![Task::delete("gone")], FailureMode::FailFast)
            .await
            .unwrap_err();

        assert!(error.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn tolerant_mode_still_surfaces_provider_errors() {
        let provisioner = Arc::new(
            ScriptedProvisioner::default()
                .with("broken", 50, Reply::Fail(ProvisionError::Provider("throttled".into()))),
        );

        let error = orchestrator(&provisioner)
            .run(
                vec![Task::delete("gone-1"), Task::delete("broken"), Task::delete("gone-2")],
                FailureMode::TolerateNotFound,
            )
            .await
            .unwrap_err();

        assert_eq!(error, ProvisionError::Provider("throttled".into()));
    }

    #[tokio::test]
    async fn repeated_deletion_is_idempotent() {
        let provisioner = Arc::new(ScriptedProvisioner::default());
        let orchestrator = orchestrator(&provisioner);

        let created = orchestrator
            .run(vec![create("a"), create("b")], FailureMode::FailFast)
            .await
            .unwrap();
        let deletions = || created.keys().cloned().map(Task::delete).collect::<Vec<_>>();

        assert!(orchestrator.run(deletions(), FailureMode::TolerateNotFound).await.is_ok());
        assert_eq!(provisioner.live(), 0);
        assert!(orchestrator.run(deletions(), FailureMode::TolerateNotFound).await.is_ok());
    }

    #[tokio::test]
    async fn empty_batch_succeeds_without_calls() {
        let provisioner = Arc::new(ScriptedProvisioner::default());

        let created = orchestrator(&provisioner)
            .run(Vec::new(), FailureMode::FailFast)
            .await
            .unwrap();

        assert!(created.is_empty());
        assert_eq!(provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_caller_scope_starts_nothing() {
        let provisioner = Arc::new(ScriptedProvisioner::default());
        let scope = CancellationToken::new();
        scope.cancel();

        let error = orchestrator(&provisioner)
            .run_scoped(vec![create("a"), create("b")], FailureMode::FailFast, &scope)
            .await
            .unwrap_err();

        assert_eq!(error, ProvisionError::Cancelled);
        assert_eq!(provisioner.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_aborts_in_flight_calls() {
        let provisioner = Arc::new(ScriptedProvisioner::default().with("slow", 10_000, Reply::Ok));
        let scope = CancellationToken::new();
        let deadline = scope.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            deadline.cancel();
        });

        let started = Instant::now();
        let error = orchestrator(&provisioner)
            .run_scoped(vec![create("slow")], FailureMode::FailFast, &scope)
            .await
            .unwrap_err();

        assert_eq!(error, ProvisionError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(provisioner.live(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_failures_on_worker_threads_yield_one_real_error() {
        let mut provisioner = ScriptedProvisioner::default();
        let mut failures = Vec::new();
        let mut tasks = Vec::new();
        for i in 0..32u64 {
            let name = format!("expr-{i}");
            if i % 4 == 0 {
                let failure = ProvisionError::Provider(format!("rejected {name}"));
                provisioner = provisioner.with(&name, i % 3, Reply::Fail(failure.clone()));
                failures.push(failure);
            } else {
                provisioner = provisioner.with(&name, i % 5, Reply::Ok);
            }
            tasks.push(create(&name));
        }
        let provisioner = Arc::new(provisioner);

        let error = orchestrator(&provisioner)
            .run(tasks, FailureMode::FailFast)
            .await
            .unwrap_err();

        assert!(failures.contains(&error), "unexpected error {error:?}");
        assert!(provisioner.calls() >= 1 && provisioner.calls() <= 32);
        assert!(provisioner.live() <= 24);
    }

    #[tokio::test]
    async fn panicking_unit_is_reported_as_internal_error() {
        let provisioner = Arc::new(ScriptedProvisioner::default().with("bad", 0, Reply::Panic));

        let error = orchestrator(&provisioner)
            .run(vec![create("bad")], FailureMode::FailFast)
            .await
            .unwrap_err();

        assert!(matches!(error, ProvisionError::Internal(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_creation_leaves_orphans_without_compensation() {
        let provisioner = Arc::new(
            ScriptedProvisioner::default()
                .with("bad", 1000, Reply::Fail(ProvisionError::Provider("boom".into()))),
        );

        let result = orchestrator(&provisioner)
            .run(vec![create("ok-1"), create("bad"), create("ok-2")], FailureMode::FailFast)
            .await;

        assert!(result.is_err());
        assert_eq!(provisioner.live(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn compensation_deletes_schedules_of_failed_batch() {
        let provisioner = Arc::new(
            ScriptedProvisioner::default()
                .with("bad", 1000, Reply::Fail(ProvisionError::Provider("boom".into()))),
        );
        let orchestrator = orchestrator(&provisioner).with_compensation(Compensation::DeleteCreated);

        let error = orchestrator
            .run(vec![create("ok-1"), create("bad"), create("ok-2")], FailureMode::FailFast)
            .await
            .unwrap_err();

        assert_eq!(error, ProvisionError::Provider("boom".into()));
        assert_eq!(provisioner.live(), 0);
        // Three creations plus two compensating deletions.
        assert_eq!(provisioner.calls(), 5);
    }
}
