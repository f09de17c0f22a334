//! Launches payroll and directory sync jobs.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::batch::{StageExecution, StageStatus};
use crate::config::{PipelineConfig, StageKind};
use crate::error::{EngineError, EngineResult};
use crate::models::PayrollPeriod;
use crate::rules::{CALCULATION_RULES, ELIGIBILITY_RULES, ReloadSummary, RuleBase, RuleEngine};
use crate::stages::{Resources, calculation, deduction, eligibility, sync};

use super::execution::{JobExecution, JobKind, JobStatus};
use super::listener::{CacheFlushListener, JobListener, Listeners, LoggingListener};
use super::registry::JobRegistry;

/// Runs jobs against a rule engine, a set of stores and remote clients.
///
/// Stages of a job run strictly in sequence; processors, readers, writers
/// and caches are built fresh for every launch. Concurrent launches for the
/// same tenant and period are not de-duplicated.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use chrono::{NaiveDate, Utc};
/// # use contribution_engine::config::ConfigLoader;
/// # use contribution_engine::pipeline::Orchestrator;
/// # use contribution_engine::rules::RuleEngine;
/// # use contribution_engine::stages::Resources;
/// # async fn example(resources: Resources) -> contribution_engine::error::EngineResult<()> {
/// let loader = ConfigLoader::load("./config")?;
/// let rules = Arc::new(RuleEngine::load(Arc::new(loader.rule_store())).await?);
/// let orchestrator = Orchestrator::new(rules, resources, loader.into_config());
///
/// let job = orchestrator
///     .launch(
///         "acme",
///         NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
///     )
///     .await?;
/// println!("{}", job.summary().message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Orchestrator {
    rules: Arc<RuleEngine>,
    resources: Resources,
    config: PipelineConfig,
    registry: JobRegistry,
    listeners: Listeners,
}

/// Handle to a job launched with [`Orchestrator::launch_async`].
#[derive(Debug)]
pub struct JobHandle {
    job_id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<JobExecution>,
}

impl JobHandle {
    /// Id of the launched execution.
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Requests cancellation; the job stops before its next chunk.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the job to reach a terminal state.
    pub async fn wait(self) -> EngineResult<JobExecution> {
        let job_id = self.job_id;
        self.task
            .await
            .map_err(|e| {
                EngineError::processing(format!("job task {job_id} ended abnormally: {e}"))
            })
    }
}

/// Rule bases pinned for one payroll run.
struct PinnedRules {
    eligibility: Arc<RuleBase>,
    calculation: Arc<RuleBase>,
    generation: u64,
}

impl Orchestrator {
    /// Creates an orchestrator with the logging listener attached.
    pub fn new(rules: Arc<RuleEngine>, resources: Resources, config: PipelineConfig) -> Self {
        let mut listeners = Listeners::default();
        listeners.push(Arc::new(LoggingListener));
        Self {
            rules,
            resources,
            config,
            registry: JobRegistry::new(),
            listeners,
        }
    }

    /// Adds a listener to every subsequent job.
    pub fn with_listener(mut self, listener: Arc<dyn JobListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The rule engine jobs evaluate against.
    pub fn rules(&self) -> &Arc<RuleEngine> {
        &self.rules
    }

    /// Recompiles the rule set. Running jobs keep the set they pinned.
    pub async fn reload_rules(&self) -> EngineResult<ReloadSummary> {
        self.rules.reload().await
    }

    /// Runs the payroll job for `tenant_id` and the inclusive window
    /// `start..=end` to a terminal state.
    ///
    /// # Errors
    ///
    /// Fails before any stage runs with [`EngineError::InvalidJobParameters`]
    /// for an empty tenant or a window ending before it starts, and with
    /// [`EngineError::NoRulesConfigured`] or [`EngineError::RuleBaseNotFound`]
    /// when the active rule set lacks the `eligibility` or `calculation`
    /// base. Stage failures are reported through the returned execution.
    pub async fn launch(
        &self,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<JobExecution> {
        let (job, rules) = self.prepare_payroll(tenant_id, start, end)?;
        Ok(self.run_payroll(job, rules, CancellationToken::new()).await)
    }

    /// Spawns the payroll job onto the runtime.
    ///
    /// Parameters and rules are checked before spawning, with the same
    /// errors as [`Self::launch`].
    pub fn launch_async(
        &self,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<JobHandle> {
        let (job, rules) = self.prepare_payroll(tenant_id, start, end)?;
        let job_id = job.id;
        let cancel = CancellationToken::new();
        let orchestrator = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { orchestrator.run_payroll(job, rules, token).await });
        Ok(JobHandle {
            job_id,
            cancel,
            task,
        })
    }

    /// Runs the directory sync job for `tenant_id`.
    pub async fn launch_sync(&self, tenant_id: &str) -> EngineResult<JobExecution> {
        validate_tenant(tenant_id)?;
        let job = JobExecution::new(
            JobKind::DirectorySync,
            tenant_id,
            None,
            self.config.max_reported_failures,
        );
        self.registry.record(&job);
        Ok(self.run_sync(job, CancellationToken::new()).await)
    }

    /// Latest state of job `id`.
    pub fn job(&self, id: Uuid) -> Option<JobExecution> {
        self.registry.get(id)
    }

    /// Every job launched by this orchestrator, oldest first.
    pub fn jobs(&self) -> Vec<JobExecution> {
        self.registry.all()
    }

    fn prepare_payroll(
        &self,
        tenant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<(JobExecution, PinnedRules)> {
        validate_tenant(tenant_id)?;
        let period = PayrollPeriod::new(start, end)?;

        let set = self.rules.snapshot()?;
        let rules = PinnedRules {
            eligibility: set.base(ELIGIBILITY_RULES)?,
            calculation: set.base(CALCULATION_RULES)?,
            generation: set.generation(),
        };

        let mut job = JobExecution::new(
            JobKind::Payroll,
            tenant_id,
            Some(period),
            self.config.max_reported_failures,
        );
        job.rule_generation = Some(rules.generation);
        self.registry.record(&job);
        Ok((job, rules))
    }

    async fn run_payroll(
        &self,
        mut job: JobExecution,
        rules: PinnedRules,
        cancel: CancellationToken,
    ) -> JobExecution {
        let listeners = self.listeners.clone();
        self.begin(&mut job, &listeners);

        let tenant_id = job.tenant_id.clone();
        let Some(period) = job.period else {
            let error = EngineError::InvalidJobParameters {
                message: "payroll job has no period".to_string(),
            };
            self.end(&mut job, &listeners, JobStatus::Failed, Some(error));
            return job;
        };

        self.enter(&mut job, &listeners, StageKind::Eligibility);
        let stage = eligibility::build(
            rules.eligibility,
            &self.resources,
            &tenant_id,
            period,
            &self.config,
        );
        let execution = stage
            .run(&job.stage_context(StageKind::Eligibility), &cancel)
            .await;
        if !self.leave(&mut job, &listeners, execution) {
            return job;
        }

        self.enter(&mut job, &listeners, StageKind::Calculation);
        let calculated_since = Utc::now();
        let stage = calculation::build(
            rules.calculation,
            &self.resources,
            &tenant_id,
            period,
            &self.config,
        );
        let execution = stage
            .run(&job.stage_context(StageKind::Calculation), &cancel)
            .await;
        if !self.leave(&mut job, &listeners, execution) {
            return job;
        }

        self.enter(&mut job, &listeners, StageKind::Deduction);
        let stage = deduction::build(&self.resources, period, calculated_since, &self.config);
        let execution = stage
            .run(&job.stage_context(StageKind::Deduction), &cancel)
            .await;
        if !self.leave(&mut job, &listeners, execution) {
            return job;
        }

        self.end(&mut job, &listeners, JobStatus::Completed, None);
        job
    }

    async fn run_sync(&self, mut job: JobExecution, cancel: CancellationToken) -> JobExecution {
        let (stage, cache) = sync::build(&self.resources, &job.tenant_id, &self.config);
        let mut listeners = self.listeners.clone();
        listeners.push(Arc::new(CacheFlushListener::new(cache)));
        self.begin(&mut job, &listeners);

        self.enter(&mut job, &listeners, StageKind::Sync);
        let execution = stage.run(&job.stage_context(StageKind::Sync), &cancel).await;
        if self.leave(&mut job, &listeners, execution) {
            self.end(&mut job, &listeners, JobStatus::Completed, None);
        }
        job
    }

    fn begin(&self, job: &mut JobExecution, listeners: &Listeners) {
        job.start();
        self.registry.record(job);
        listeners.before_job(job);
    }

    fn enter(&self, job: &mut JobExecution, listeners: &Listeners, stage: StageKind) {
        job.enter_stage(stage);
        self.registry.record(job);
        listeners.before_stage(job, stage);
    }

    /// Records a finished stage; returns true if the job should continue.
    fn leave(
        &self,
        job: &mut JobExecution,
        listeners: &Listeners,
        execution: StageExecution,
    ) -> bool {
        listeners.after_stage(job, &execution);
        let stage = execution.stage;
        let status = execution.status;
        let error = execution.error.clone();
        job.stages.push(execution);

        match (status, error) {
            (StageStatus::Completed, _) => {
                self.registry.record(job);
                true
            }
            (StageStatus::Stopped, _) => {
                self.end(job, listeners, JobStatus::Stopped, None);
                false
            }
            (_, error) => {
                let cause = error.unwrap_or_else(|| {
                    EngineError::processing(format!("stage {stage} ended without completing"))
                });
                let failure = EngineError::StageFailed {
                    stage: stage.name().to_string(),
                    cause: Box::new(cause),
                };
                self.end(job, listeners, JobStatus::Failed, Some(failure));
                false
            }
        }
    }

    fn end(
        &self,
        job: &mut JobExecution,
        listeners: &Listeners,
        status: JobStatus,
        failure: Option<EngineError>,
    ) {
        job.finish(status, failure);
        self.registry.record(job);
        listeners.after_job(job);
        info!(job_id = %job.id, status = ?job.status, "Job ended");
    }
}

fn validate_tenant(tenant_id: &str) -> EngineResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(EngineError::InvalidJobParameters {
            message: "tenant id must not be empty".to_string(),
        });
    }
    Ok(())
}
