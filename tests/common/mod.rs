//! Shared fixtures for the integration suites: in-memory stores, scripted
//! benefits and directory fakes, and an orchestrator wired to them.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::Notify;

use contribution_engine::config::PipelineConfig;
use contribution_engine::error::{EngineError, EngineResult};
use contribution_engine::external::{BenefitsApi, DeductionRequest, HrDirectoryApi};
use contribution_engine::models::{
    CalculationResult, DeductionOutcome, DirectoryEntry, EligibilityRecord, Employment,
    EmploymentResponse, EmployeeContributionConfig, EmployerMatchRule, Income, Individual,
    IndividualResponse, MatchType, Participant, PlanEligibility, TenantPlan,
};
use contribution_engine::pipeline::Orchestrator;
use contribution_engine::rules::{InMemoryRuleStore, RuleDefinition, RuleEngine};
use contribution_engine::stages::Resources;
use contribution_engine::storage::{InMemoryPlanStore, InMemoryRepository};

pub const TENANT: &str = "acme";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn employee_id(n: usize) -> String {
    format!("emp_{n:03}")
}

// =============================================================================
// Benefits provider
// =============================================================================

/// Holds the `at`-th registration until released.
#[derive(Default)]
pub struct CallGate {
    at: usize,
    pub reached: Notify,
    pub release: Notify,
}

impl CallGate {
    pub fn at(call: usize) -> Arc<Self> {
        Arc::new(Self {
            at: call,
            ..Self::default()
        })
    }
}

/// Accepts every registration except those of `failing` employees.
#[derive(Default)]
pub struct ScriptedBenefits {
    failing: HashSet<String>,
    gate: Option<Arc<CallGate>>,
    pub calls: AtomicUsize,
    pub registered: Mutex<Vec<DeductionRequest>>,
}

impl ScriptedBenefits {
    pub fn failing_for(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn gated(gate: Arc<CallGate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn registered_ids(&self) -> Vec<String> {
        self.registered
            .lock()
            .iter()
            .map(|request| request.employee_id.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BenefitsApi for ScriptedBenefits {
    async fn register_deduction(
        &self,
        _tenant_id: &str,
        request: &DeductionRequest,
    ) -> EngineResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = self.gate.as_ref().filter(|gate| gate.at == call) {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        if self.failing.contains(&request.employee_id) {
            return Err(EngineError::ExternalApi {
                service: "benefits".to_string(),
                message: format!("rejected {}", request.employee_id),
            });
        }
        self.registered.lock().push(request.clone());
        Ok(format!("ded_{}", request.calculation_id))
    }
}

// =============================================================================
// HR directory
// =============================================================================

/// A directory serving fixed payloads and counting calls per endpoint.
#[derive(Default)]
pub struct FakeDirectory {
    entries: Vec<DirectoryEntry>,
    individuals: HashMap<String, Individual>,
    employments: HashMap<String, Employment>,
    listing_fails: bool,
    pub list_calls: AtomicUsize,
    pub individual_calls: AtomicUsize,
    pub employment_calls: AtomicUsize,
    pub requested_ids: Mutex<Vec<String>>,
}

impl FakeDirectory {
    /// `count` complete, active employees `emp_001..`.
    pub fn with_employees(count: usize) -> Self {
        let mut directory = Self::default();
        for n in 1..=count {
            directory.add_employee(&employee_id(n));
        }
        directory
    }

    pub fn failing_listing() -> Self {
        Self {
            listing_fails: true,
            ..Self::default()
        }
    }

    pub fn add_employee(&mut self, id: &str) {
        self.entries.push(DirectoryEntry {
            id: id.to_string(),
            first_name: Some("Listed".to_string()),
            last_name: Some(id.to_uppercase()),
            is_active: Some(true),
        });
        self.individuals.insert(
            id.to_string(),
            Individual {
                id: id.to_string(),
                first_name: Some("Ada".to_string()),
                last_name: None,
                dob: Some("1985-06-15".to_string()),
            },
        );
        self.employments.insert(
            id.to_string(),
            Employment {
                individual_id: id.to_string(),
                employment_status: Some("active".to_string()),
                employment_type: Some("employee".to_string()),
                start_date: Some("2019-02-01".to_string()),
                end_date: None,
                latest_rehire_date: None,
                is_active: Some(true),
                income: Some(Income {
                    unit: "yearly".to_string(),
                    amount: 7_200_000,
                    currency: Some("USD".to_string()),
                }),
            },
        );
    }

    pub fn without_employment(mut self, id: &str) -> Self {
        self.employments.remove(id);
        self
    }

    pub fn with_dob(mut self, id: &str, dob: &str) -> Self {
        if let Some(individual) = self.individuals.get_mut(id) {
            individual.dob = Some(dob.to_string());
        }
        self
    }

    pub fn listed_twice(mut self, id: &str) -> Self {
        if let Some(entry) = self.entries.iter().find(|e| e.id == id).cloned() {
            self.entries.push(entry);
        }
        self
    }

    pub fn individual_call_count(&self) -> usize {
        self.individual_calls.load(Ordering::SeqCst)
    }

    pub fn employment_call_count(&self) -> usize {
        self.employment_calls.load(Ordering::SeqCst)
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HrDirectoryApi for FakeDirectory {
    async fn list_directory(&self, _tenant_id: &str) -> EngineResult<Vec<DirectoryEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.listing_fails {
            return Err(EngineError::ExternalApi {
                service: "directory".to_string(),
                message: "listing unavailable".to_string(),
            });
        }
        Ok(self.entries.clone())
    }

    async fn retrieve_individuals(
        &self,
        _tenant_id: &str,
        ids: &[String],
    ) -> EngineResult<Vec<IndividualResponse>> {
        self.individual_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_ids.lock().extend(ids.iter().cloned());
        Ok(ids
            .iter()
            .map(|id| IndividualResponse {
                individual_id: id.clone(),
                body: self.individuals.get(id).cloned(),
            })
            .collect())
    }

    async fn retrieve_employments(
        &self,
        _tenant_id: &str,
        ids: &[String],
    ) -> EngineResult<Vec<EmploymentResponse>> {
        self.employment_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .map(|id| EmploymentResponse {
                individual_id: id.clone(),
                body: self.employments.get(id).cloned(),
            })
            .collect())
    }
}

// =============================================================================
// Reference data
// =============================================================================

pub fn create_test_plan() -> TenantPlan {
    TenantPlan {
        tenant_id: TENANT.to_string(),
        eligibility: PlanEligibility {
            minimum_age: 21,
            minimum_service_months: 1,
        },
        employee_contribution: EmployeeContributionConfig {
            auto_enrollment_enabled: true,
            auto_enrollment_percent: dec("3"),
            max_percent: dec("15"),
        },
        employer_match: Some(EmployerMatchRule {
            match_type: MatchType::Basic,
            match_percent: dec("50"),
            limit_percent: dec("6"),
        }),
        profit_sharing_percent: Decimal::ZERO,
        compensation_limit: TenantPlan::DEFAULT_COMPENSATION_LIMIT,
    }
}

/// An active employee aged 40, hired 2020, earning 60,000 and deferring 5%.
pub fn create_test_participant(id: &str) -> Participant {
    Participant {
        tenant_id: TENANT.to_string(),
        employee_id: id.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some(id.to_string()),
        date_of_birth: Some(date(1985, 6, 15)),
        hire_date: Some(date(2020, 1, 6)),
        rehire_date: None,
        termination_date: None,
        employment_status: Some("active".to_string()),
        employment_type: Some("employee".to_string()),
        annual_compensation: dec("60000"),
        employee_contribution_percent: Some(dec("5")),
        is_active: true,
    }
}

pub fn create_test_participants(count: usize) -> Vec<Participant> {
    (1..=count)
        .map(|n| create_test_participant(&employee_id(n)))
        .collect()
}

// =============================================================================
// Rules
// =============================================================================

pub fn shipped_rule(name: &str) -> String {
    std::fs::read_to_string(format!("./config/rules/{name}.yaml")).unwrap()
}

/// Appends rules to a shipped definition, which ends with its rule list.
pub fn shipped_rule_with(name: &str, extra_rules: &str) -> String {
    format!("{}\n{extra_rules}", shipped_rule(name))
}

pub fn shipped_definitions() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::new("eligibility", shipped_rule("eligibility")),
        RuleDefinition::new("calculation", shipped_rule("calculation")),
    ]
}

// =============================================================================
// Harness
// =============================================================================

/// An orchestrator plus handles to everything it reads and writes.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub rule_store: InMemoryRuleStore,
    pub participants: InMemoryRepository<Participant>,
    pub eligibility_records: InMemoryRepository<EligibilityRecord>,
    pub calculation_results: InMemoryRepository<CalculationResult>,
    pub deduction_outcomes: InMemoryRepository<DeductionOutcome>,
    pub plans: InMemoryPlanStore,
    pub benefits: Arc<ScriptedBenefits>,
    pub directory: Arc<FakeDirectory>,
}

pub struct HarnessBuilder {
    definitions: Vec<RuleDefinition>,
    participants: Vec<Participant>,
    plan: Option<TenantPlan>,
    benefits: ScriptedBenefits,
    directory: FakeDirectory,
    config: PipelineConfig,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            definitions: shipped_definitions(),
            participants: Vec::new(),
            plan: Some(create_test_plan()),
            benefits: ScriptedBenefits::default(),
            directory: FakeDirectory::default(),
            config: PipelineConfig::default(),
        }
    }
}

impl HarnessBuilder {
    pub fn definitions(mut self, definitions: Vec<RuleDefinition>) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn participants(mut self, participants: Vec<Participant>) -> Self {
        self.participants = participants;
        self
    }

    pub fn without_plan(mut self) -> Self {
        self.plan = None;
        self
    }

    pub fn benefits(mut self, benefits: ScriptedBenefits) -> Self {
        self.benefits = benefits;
        self
    }

    pub fn directory(mut self, directory: FakeDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(self) -> Harness {
        let rule_store = InMemoryRuleStore::new(self.definitions);
        let rules = Arc::new(RuleEngine::load(Arc::new(rule_store.clone())).await.unwrap());

        let participants = InMemoryRepository::with_records(self.participants);
        let eligibility_records = InMemoryRepository::new();
        let calculation_results = InMemoryRepository::new();
        let deduction_outcomes = InMemoryRepository::new();
        let plans = InMemoryPlanStore::new();
        if let Some(plan) = self.plan {
            plans.insert(plan);
        }
        let benefits = Arc::new(self.benefits);
        let directory = Arc::new(self.directory);

        let resources = Resources {
            participants: Arc::new(participants.clone()),
            eligibility_records: Arc::new(eligibility_records.clone()),
            calculation_results: Arc::new(calculation_results.clone()),
            deduction_outcomes: Arc::new(deduction_outcomes.clone()),
            plans: Arc::new(plans.clone()),
            benefits: benefits.clone(),
            directory: directory.clone(),
        };

        Harness {
            orchestrator: Orchestrator::new(rules, resources, self.config),
            rule_store,
            participants,
            eligibility_records,
            calculation_results,
            deduction_outcomes,
            plans,
            benefits,
            directory,
        }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder::default()
}
