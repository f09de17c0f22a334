//! Eligibility stage: participants to eligibility records.

use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::{
    FaultPolicy, ItemProcessor, KeyedWriter, RepositoryReader, Stage, StageSettings, WriteMode,
};
use crate::config::{PipelineConfig, StageKind};
use crate::error::EngineResult;
use crate::models::{EligibilityRecord, Participant, PayrollPeriod, TenantPlan};
use crate::rules::{EligibilityFact, RuleBase};

use super::{Resources, TenantPlanCache};

/// The assembled eligibility stage.
pub type EligibilityStage =
    Stage<RepositoryReader<Participant>, EligibilityProcessor, KeyedWriter<EligibilityRecord>>;

/// Evaluates the `eligibility` rule base for one participant.
pub struct EligibilityProcessor {
    rules: Arc<RuleBase>,
    plan: TenantPlanCache,
    period: PayrollPeriod,
}

impl EligibilityProcessor {
    /// Creates a processor for `tenant_id` and `period`.
    pub fn new(
        rules: Arc<RuleBase>,
        resources: &Resources,
        tenant_id: &str,
        period: PayrollPeriod,
    ) -> Self {
        Self {
            rules,
            plan: TenantPlanCache::new(Arc::clone(&resources.plans), tenant_id),
            period,
        }
    }
}

/// Builds the fact for `participant`, evaluated as of the period end.
pub fn eligibility_fact(
    participant: &Participant,
    plan: &TenantPlan,
    period: &PayrollPeriod,
) -> EligibilityFact {
    let current_date = period.end_date;
    EligibilityFact {
        employee_id: participant.employee_id.clone(),
        tenant_id: participant.tenant_id.clone(),
        date_of_birth: participant.date_of_birth,
        hire_date: participant.hire_date,
        rehire_date: participant.rehire_date,
        employment_status: participant.employment_status.clone(),
        employment_type: participant.employment_type.clone(),
        current_date,
        age: participant.age_on(current_date),
        months_of_service: participant.months_of_service_on(current_date),
        minimum_age: plan.eligibility.minimum_age,
        minimum_service_months: plan.eligibility.minimum_service_months,
        eligible: false,
        eligibility_date: None,
        eligibility_reason: String::new(),
    }
}

#[async_trait]
impl ItemProcessor for EligibilityProcessor {
    type Input = Participant;
    type Output = EligibilityRecord;

    async fn process(&self, participant: &Participant) -> EngineResult<Option<EligibilityRecord>> {
        let plan = self.plan.get().await?;
        let mut fact = eligibility_fact(participant, plan, &self.period);
        self.rules.evaluate(&mut fact)?;

        Ok(Some(EligibilityRecord::new(
            &participant.tenant_id,
            &participant.employee_id,
            self.period,
            fact.eligible,
            fact.eligibility_date,
            fact.eligibility_reason,
            fact.age,
            fact.months_of_service,
            fact.current_date,
        )))
    }
}

/// Assembles the stage: participants active in the period, upserted records.
pub fn build(
    rules: Arc<RuleBase>,
    resources: &Resources,
    tenant_id: &str,
    period: PayrollPeriod,
    config: &PipelineConfig,
) -> EligibilityStage {
    let reader = RepositoryReader::new(Arc::clone(&resources.participants), move |p: &Participant| {
        p.is_active_in(&period)
    });
    let writer = KeyedWriter::new(Arc::clone(&resources.eligibility_records), WriteMode::Upsert);
    Stage::new(
        StageKind::Eligibility,
        reader,
        EligibilityProcessor::new(rules, resources, tenant_id, period),
        writer,
        FaultPolicy::for_stage(StageKind::Eligibility, config.stage(StageKind::Eligibility)),
        StageSettings::from_config(StageKind::Eligibility, config),
    )
}
