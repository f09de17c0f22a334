//! Deduction stage: successful calculations registered with the benefits provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::batch::{
    FaultPolicy, ItemProcessor, KeyedWriter, RepositoryReader, Stage, StageSettings, WriteMode,
};
use crate::config::{PipelineConfig, StageKind};
use crate::error::EngineResult;
use crate::external::{BenefitsApi, DeductionRequest};
use crate::models::{CalculationResult, DeductionOutcome, PayrollPeriod};

use super::Resources;

/// The assembled deduction stage.
pub type DeductionStage =
    Stage<RepositoryReader<CalculationResult>, DeductionProcessor, KeyedWriter<DeductionOutcome>>;

/// Registers one calculation with the benefits provider.
///
/// Results with a zero total are filtered without a remote call.
pub struct DeductionProcessor {
    benefits: Arc<dyn BenefitsApi>,
}

impl DeductionProcessor {
    /// Creates a processor calling `benefits`.
    pub fn new(benefits: Arc<dyn BenefitsApi>) -> Self {
        Self { benefits }
    }
}

impl From<&CalculationResult> for DeductionRequest {
    fn from(result: &CalculationResult) -> Self {
        DeductionRequest {
            employee_id: result.employee_id.clone(),
            calculation_id: result.calculation_id.clone(),
            employee_amount: result.amounts.employee,
            employer_amount: result.amounts.employer + result.amounts.profit_sharing,
            period_start: result.period.start_date,
            period_end: result.period.end_date,
        }
    }
}

#[async_trait]
impl ItemProcessor for DeductionProcessor {
    type Input = CalculationResult;
    type Output = DeductionOutcome;

    async fn process(&self, result: &CalculationResult) -> EngineResult<Option<DeductionOutcome>> {
        if result.total_contribution.is_zero() {
            debug!(calculation_id = %result.calculation_id, "Zero contribution; no deduction");
            return Ok(None);
        }

        let request = DeductionRequest::from(result);
        let deduction_id = self
            .benefits
            .register_deduction(&result.tenant_id, &request)
            .await?;

        Ok(Some(DeductionOutcome {
            calculation_id: result.calculation_id.clone(),
            tenant_id: result.tenant_id.clone(),
            employee_id: result.employee_id.clone(),
            period: result.period,
            employee_amount: request.employee_amount,
            employer_amount: request.employer_amount,
            deduction_id,
            registered_at: Utc::now(),
        }))
    }
}

/// True if `result` is a successful calculation for `period` written at or
/// after `calculated_since`.
///
/// Results left over from earlier runs of the period are never registered
/// again, including the stale `Success` of a participant who has since
/// become ineligible.
pub fn is_deduction_candidate(
    result: &CalculationResult,
    period: PayrollPeriod,
    calculated_since: DateTime<Utc>,
) -> bool {
    result.is_success() && result.period == period && result.calculated_at >= calculated_since
}

/// Assembles the stage: successful results of the period calculated by the
/// current run, upserted outcomes.
pub fn build(
    resources: &Resources,
    period: PayrollPeriod,
    calculated_since: DateTime<Utc>,
    config: &PipelineConfig,
) -> DeductionStage {
    let reader = RepositoryReader::new(
        Arc::clone(&resources.calculation_results),
        move |result: &CalculationResult| is_deduction_candidate(result, period, calculated_since),
    );
    let writer = KeyedWriter::new(Arc::clone(&resources.deduction_outcomes), WriteMode::Upsert);
    Stage::new(
        StageKind::Deduction,
        reader,
        DeductionProcessor::new(Arc::clone(&resources.benefits)),
        writer,
        FaultPolicy::for_stage(StageKind::Deduction, config.stage(StageKind::Deduction)),
        StageSettings::from_config(StageKind::Deduction, config),
    )
}
