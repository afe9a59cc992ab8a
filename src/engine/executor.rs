// ABOUTME: Orchestration state machine that sequences jobs, enforces limits and runs hook jobs
// ABOUTME: A Run yields each successful main-job result in order and can be drained into a RunSummary

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument, Span};

use super::context::RunState;
use super::error::{ExecutionError, Result, Severity};
use super::events::{HookPhase, RunEvent};
use super::result::{RunSummary, TaskReturn, Variables};
use crate::logging::LogManager;
use crate::parser::{GlobalConfig, JobSpec, WorkflowManager};
use crate::tasks::ExecutorRegistry;

/// Owns one workflow and hands out a single run over it.
pub struct ExecutorManager {
    workflow: WorkflowManager,
    registry: Arc<ExecutorRegistry>,
}

impl ExecutorManager {
    /// Dispatch through the process-wide registry.
    pub fn new(workflow: WorkflowManager) -> Self {
        Self::with_registry(workflow, ExecutorRegistry::global())
    }

    pub fn with_registry(workflow: WorkflowManager, registry: Arc<ExecutorRegistry>) -> Self {
        Self { workflow, registry }
    }

    pub fn workflow(&self) -> &WorkflowManager {
        &self.workflow
    }

    pub fn run(self) -> Run {
        Run::new(self.workflow, self.registry)
    }

    /// Run to completion and return everything that was produced.
    pub async fn await_run_all(self) -> Result<RunSummary> {
        self.run().collect_all().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Active,
    Done,
}

/// A single pass over a workflow. Not restartable: build a new
/// `ExecutorManager` to run again.
pub struct Run {
    run_id: String,
    workflow: WorkflowManager,
    registry: Arc<ExecutorRegistry>,
    globals: GlobalConfig,
    logger: LogManager,
    state: RunState,
    phase: Phase,
    span: Span,
    started_at: DateTime<Utc>,
    /// Jobs that diverted to their exit since the last real execution.
    diversions: Vec<String>,
    /// Hook jobs currently executing, outermost first.
    hook_stack: Vec<String>,
    /// A failure that happened after a result was already handed out.
    pending_error: Option<ExecutionError>,
}

impl Run {
    fn new(workflow: WorkflowManager, registry: Arc<ExecutorRegistry>) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let globals = workflow.globals().clone();
        let logger = LogManager::new(globals.debug, globals.effective_log_config());
        let span = info_span!("run", run_id = %run_id);

        Self {
            run_id,
            workflow,
            registry,
            globals,
            logger,
            state: RunState::default(),
            phase: Phase::Pending,
            span,
            started_at: Utc::now(),
            diversions: Vec::new(),
            hook_stack: Vec::new(),
            pending_error: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Advance to the next successful main-job result. `None` once the run
    /// has finished or failed.
    pub async fn next_result(&mut self) -> Option<Result<TaskReturn>> {
        if self.phase == Phase::Done {
            return None;
        }
        let span = self.span.clone();
        self.advance().instrument(span).await
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<TaskReturn>> {
        futures::stream::unfold(self, |mut run| async move {
            let item = run.next_result().await?;
            Some((item, run))
        })
    }

    /// Drain the run. The first fatal error is returned instead of a summary.
    pub async fn collect_all(mut self) -> Result<RunSummary> {
        while let Some(item) = self.next_result().await {
            item?;
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            work_chain: self.state.work_chain().to_vec(),
            results: self.state.history().to_vec(),
            attempts: self.state.all_attempts().clone(),
            crashed: self.state.crashed,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    async fn advance(&mut self) -> Option<Result<TaskReturn>> {
        if let Some(error) = self.pending_error.take() {
            return Some(Err(self.fail(error)));
        }

        if self.phase == Phase::Pending {
            match self.workflow.get_begin() {
                Ok(begin) => {
                    info!("Starting workflow at job '{}'", begin);
                    self.state.current = Some(begin);
                    self.phase = Phase::Active;
                }
                Err(e) => return Some(Err(self.fail(e.into()))),
            }
        }

        while let Some(name) = self.state.current.clone() {
            match self.step(&name).await {
                Ok(Some(result)) => return Some(Ok(result)),
                Ok(None) => continue,
                Err(e) => return Some(Err(self.fail(e.with_job(&name)))),
            }
        }

        self.phase = Phase::Done;
        None
    }

    fn fail(&mut self, error: ExecutionError) -> ExecutionError {
        self.emit(RunEvent::Crash {
            job: error.job().unwrap_or_default(),
            error: error.to_string(),
        });
        self.state.crashed = true;
        self.state.current = None;
        self.phase = Phase::Done;
        error
    }

    fn emit(&self, event: RunEvent<'_>) {
        self.logger.log(&event.message(), event.levels());
    }

    fn lookup(&mut self, name: &str, referrer: Option<&str>) -> Result<Arc<JobSpec>> {
        self.workflow
            .get_job(name)?
            .ok_or_else(|| ExecutionError::JobNotFound {
                job: referrer.map(str::to_string),
                name: name.to_string(),
            })
    }

    /// One visit of the current job. `Some` carries a result to yield.
    async fn step(&mut self, name: &str) -> Result<Option<TaskReturn>> {
        let job = self.lookup(name, None)?;
        self.emit(RunEvent::TaskStatus {
            job: name,
            attempt: self.state.attempts(name).total() + 1,
            limits: job.limits.to_string(),
        });

        match self.attempt(&job).await {
            Ok(result) => {
                self.state.record_success(result.clone());
                self.diversions.clear();
                if let Err(e) = self.finish(&job, true).await {
                    self.pending_error = Some(e);
                }
                Ok(Some(result))
            }
            Err(e) => match e.severity() {
                Severity::Ignorable => {
                    self.state.record_failure(name);
                    self.diversions.clear();
                    self.emit(RunEvent::Warn {
                        job: name,
                        error: e.to_string(),
                    });
                    self.finish(&job, false).await?;
                    Ok(None)
                }
                Severity::Critical => {
                    self.divert(&job, e)?;
                    Ok(None)
                }
                Severity::Crash => Err(e),
            },
        }
    }

    async fn attempt(&mut self, job: &JobSpec) -> Result<TaskReturn> {
        self.state.check_limits(job)?;
        self.state.check_needed(job)?;
        self.run_hooks(
            HookPhase::Before,
            &job.name,
            job.before.tasks.clone(),
            job.before.ignore_errors,
        )
        .await?;
        pause(job.delay.pre).await;
        self.dispatch(job).await
    }

    async fn dispatch(&mut self, job: &JobSpec) -> Result<TaskReturn> {
        let inputs = self.inputs_for(job)?;
        self.registry.execute(job, &self.globals, &inputs).await
    }

    /// After hooks, post delay and branching for a job that ran.
    async fn finish(&mut self, job: &JobSpec, succeeded: bool) -> Result<()> {
        let hooks = job
            .after
            .tasks_for(succeeded)
            .into_iter()
            .map(str::to_string)
            .collect();
        self.run_hooks(HookPhase::After, &job.name, hooks, job.after.ignore_errors)
            .await?;
        pause(job.delay.post).await;
        self.emit(RunEvent::JobResult {
            job: &job.name,
            success: succeeded,
        });

        match self.workflow.get_next(&job.name, succeeded)? {
            None => {
                self.emit(RunEvent::JobsCompletion {
                    chain: self.state.work_chain(),
                });
                self.state.current = None;
            }
            Some(next) => {
                if !self.workflow.contains(&next) {
                    return Err(ExecutionError::JobNotFound {
                        job: Some(job.name.clone()),
                        name: next,
                    });
                }
                self.emit(RunEvent::NextJob {
                    next: &next,
                    current: &job.name,
                });
                self.state.current = Some(next);
            }
        }
        Ok(())
    }

    /// Route a reached limit to `limits.exit`, or abort when there is none.
    fn divert(&mut self, job: &JobSpec, reason: ExecutionError) -> Result<()> {
        let attempts = self.state.attempts(&job.name).total();
        let Some(exit) = job.limits.exit_target() else {
            self.emit(RunEvent::MaxAttemptsForExit {
                job: &job.name,
                attempts,
            });
            return Err(ExecutionError::Aborted {
                job: Some(job.name.clone()),
                reason: reason.to_string(),
            });
        };

        self.emit(RunEvent::MaxAttemptsForSwitch {
            job: &job.name,
            attempts,
            exit,
        });
        if !self.workflow.contains(exit) {
            return Err(ExecutionError::JobNotFound {
                job: Some(job.name.clone()),
                name: exit.to_string(),
            });
        }
        if self.diversions.iter().any(|name| name == exit) {
            let mut chain = self.diversions.clone();
            chain.push(job.name.clone());
            chain.push(exit.to_string());
            return Err(ExecutionError::Aborted {
                job: Some(job.name.clone()),
                reason: format!(
                    "limit exits loop without executing a job: {}",
                    chain.join(" -> ")
                ),
            });
        }

        self.diversions.push(job.name.clone());
        self.emit(RunEvent::NextJob {
            next: exit,
            current: &job.name,
        });
        self.state.current = Some(exit.to_string());
        Ok(())
    }

    /// Variables recorded for the job named by `use`, if any.
    fn inputs_for(&self, job: &JobSpec) -> Result<Variables> {
        let Some(source) = job.use_job.as_deref() else {
            return Ok(Variables::new());
        };
        if let Some(variables) = self.state.propagated(source) {
            return Ok(variables.clone());
        }
        if !self.workflow.contains(source) {
            return Err(ExecutionError::JobNotFound {
                job: Some(job.name.clone()),
                name: source.to_string(),
            });
        }
        Err(ExecutionError::Needed {
            job: Some(job.name.clone()),
            missing: vec![source.to_string()],
            available: self.state.completed_jobs(),
        })
    }

    /// Run a hook group in order. Ignorable failures are swallowed only when
    /// the group allows it.
    fn run_hooks<'a>(
        &'a mut self,
        phase: HookPhase,
        owner: &'a str,
        hooks: Vec<String>,
        ignore_errors: bool,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            for hook in hooks {
                self.emit(RunEvent::HookTip {
                    phase,
                    job: owner,
                    hook: &hook,
                });
                let outcome = self.run_hook(owner, &hook).await;
                self.emit(RunEvent::HookResult {
                    phase,
                    hook: &hook,
                    success: outcome.is_ok(),
                });

                let Err(error) = outcome else {
                    continue;
                };
                if error.is_ignorable() && ignore_errors {
                    self.emit(RunEvent::Warn {
                        job: &hook,
                        error: error.to_string(),
                    });
                    continue;
                }
                self.emit(RunEvent::Error {
                    job: &hook,
                    error: error.to_string(),
                });
                if error.severity() == Severity::Crash {
                    return Err(error);
                }
                let source = Box::new(error);
                return Err(match phase {
                    HookPhase::Before => ExecutionError::BeforeJobRun {
                        job: Some(owner.to_string()),
                        hook,
                        source,
                    },
                    HookPhase::After => ExecutionError::AfterJobRun {
                        job: Some(owner.to_string()),
                        hook,
                        source,
                    },
                });
            }
            Ok(())
        }
        .boxed()
    }

    /// Execute one hook job with its own needs, hooks and delays but without
    /// attempt tracking.
    fn run_hook<'a>(&'a mut self, owner: &'a str, name: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let job = self.lookup(name, Some(owner))?;
            if self.hook_stack.iter().any(|active| active == name) {
                let mut chain = self.hook_stack.clone();
                chain.push(name.to_string());
                return Err(ExecutionError::Recursive {
                    job: Some(name.to_string()),
                    chain,
                });
            }

            self.hook_stack.push(name.to_string());
            let outcome = self.hook_body(&job).await;
            self.hook_stack.pop();
            outcome
        }
        .boxed()
    }

    async fn hook_body(&mut self, job: &JobSpec) -> Result<()> {
        self.state.check_needed(job)?;
        self.run_hooks(
            HookPhase::Before,
            &job.name,
            job.before.tasks.clone(),
            job.before.ignore_errors,
        )
        .await?;
        pause(job.delay.pre).await;

        let failure = match self.dispatch(job).await {
            Ok(result) => {
                debug!("Hook job '{}' produced: {}", job.name, result.result);
                self.state.record_hook(result);
                None
            }
            Err(e) if e.is_ignorable() => Some(e),
            Err(e) => return Err(e),
        };

        let hooks = job
            .after
            .tasks_for(failure.is_none())
            .into_iter()
            .map(str::to_string)
            .collect();
        self.run_hooks(HookPhase::After, &job.name, hooks, job.after.ignore_errors)
            .await?;
        pause(job.delay.post).await;

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
