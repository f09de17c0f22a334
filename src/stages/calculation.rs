//! Calculation stage: eligible records to contribution results.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::batch::{
    FaultPolicy, ItemProcessor, KeyedWriter, RepositoryReader, Stage, StageSettings, WriteMode,
};
use crate::config::{PipelineConfig, StageKind};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CalculationResult, ContributionAmounts, EligibilityRecord, Participant, PayrollPeriod,
    TenantPlan,
};
use crate::rules::{CalculationFact, RuleBase};
use crate::storage::Repository;

use super::{Resources, TenantPlanCache};

/// The assembled calculation stage.
pub type CalculationStage = Stage<
    RepositoryReader<EligibilityRecord>,
    CalculationProcessor,
    KeyedWriter<CalculationResult>,
>;

/// Evaluates the `calculation` rule base for one eligible participant.
pub struct CalculationProcessor {
    rules: Arc<RuleBase>,
    plan: TenantPlanCache,
    participants: Arc<dyn Repository<Participant>>,
}

impl CalculationProcessor {
    /// Creates a processor for `tenant_id`.
    pub fn new(rules: Arc<RuleBase>, resources: &Resources, tenant_id: &str) -> Self {
        Self {
            rules,
            plan: TenantPlanCache::new(Arc::clone(&resources.plans), tenant_id),
            participants: Arc::clone(&resources.participants),
        }
    }

    async fn participant(&self, record: &EligibilityRecord) -> EngineResult<Participant> {
        self.participants
            .find_by_keys(&record.tenant_id, std::slice::from_ref(&record.employee_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::DataNotFound {
                message: format!(
                    "no participant {} for tenant {}",
                    record.employee_id, record.tenant_id
                ),
            })
    }
}

/// The deferral rate that applies: the election if made, else the
/// auto-enrollment rate when enabled, else zero; capped at the plan maximum.
pub fn effective_contribution_percent(participant: &Participant, plan: &TenantPlan) -> Decimal {
    let config = &plan.employee_contribution;
    let percent = match participant.employee_contribution_percent {
        Some(elected) => elected,
        None if config.auto_enrollment_enabled => config.auto_enrollment_percent,
        None => Decimal::ZERO,
    };
    percent.max(Decimal::ZERO).min(config.max_percent)
}

/// Builds the fact for an eligible record and its participant.
pub fn calculation_fact(
    record: &EligibilityRecord,
    participant: &Participant,
    plan: &TenantPlan,
) -> CalculationFact {
    let (match_percent, match_limit) = plan
        .employer_match
        .as_ref()
        .map(|rule| (rule.match_percent, rule.limit_percent))
        .unwrap_or((Decimal::ZERO, Decimal::ZERO));

    CalculationFact {
        employee_id: record.employee_id.clone(),
        annual_compensation: participant.annual_compensation,
        eligible_compensation: participant.annual_compensation.min(plan.compensation_limit),
        compensation_limit: plan.compensation_limit,
        employee_contribution_percent: effective_contribution_percent(participant, plan),
        auto_enrollment_enabled: plan.employee_contribution.auto_enrollment_enabled,
        auto_enrollment_percent: plan.employee_contribution.auto_enrollment_percent,
        employer_match_type: plan.match_type().as_str().to_string(),
        employer_match_percent: match_percent,
        employer_match_limit_percent: match_limit,
        profit_sharing_percent: plan.profit_sharing_percent,
        employment_status: participant.employment_status.clone(),
        age: record.age,
        months_of_service: record.months_of_service,
        employee_contribution: Decimal::ZERO,
        employer_contribution: Decimal::ZERO,
        profit_sharing_contribution: Decimal::ZERO,
        eligible: record.eligible,
        calculation_reason: String::new(),
    }
}

#[async_trait]
impl ItemProcessor for CalculationProcessor {
    type Input = EligibilityRecord;
    type Output = CalculationResult;

    async fn process(&self, record: &EligibilityRecord) -> EngineResult<Option<CalculationResult>> {
        let plan = self.plan.get().await?;
        let participant = self.participant(record).await?;

        let mut fact = calculation_fact(record, &participant, plan);
        self.rules.evaluate(&mut fact)?;

        let calculated_at = Utc::now();
        let result = if fact.eligible {
            CalculationResult::success(
                &record.tenant_id,
                &record.employee_id,
                record.period,
                fact.eligible_compensation,
                ContributionAmounts {
                    employee: fact.employee_contribution,
                    employer: fact.employer_contribution,
                    profit_sharing: fact.profit_sharing_contribution,
                },
                fact.calculation_reason,
                calculated_at,
            )
        } else {
            CalculationResult::not_eligible(
                &record.tenant_id,
                &record.employee_id,
                record.period,
                fact.eligible_compensation,
                fact.calculation_reason,
                calculated_at,
            )
        };
        Ok(Some(result))
    }
}

/// Assembles the stage: eligible records of the period, upserted results.
pub fn build(
    rules: Arc<RuleBase>,
    resources: &Resources,
    tenant_id: &str,
    period: PayrollPeriod,
    config: &PipelineConfig,
) -> CalculationStage {
    let reader = RepositoryReader::new(
        Arc::clone(&resources.eligibility_records),
        move |record: &EligibilityRecord| record.eligible && record.period == period,
    );
    let writer = KeyedWriter::new(Arc::clone(&resources.calculation_results), WriteMode::Upsert);
    Stage::new(
        StageKind::Calculation,
        reader,
        CalculationProcessor::new(rules, resources, tenant_id),
        writer,
        FaultPolicy::for_stage(StageKind::Calculation, config.stage(StageKind::Calculation)),
        StageSettings::from_config(StageKind::Calculation, config),
    )
}
