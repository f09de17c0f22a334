//! Directory sync stage: HR directory entries to participants.
//!
//! The reader walks the tenant's directory listing. The first processed
//! entry triggers a pre-fetch that loads individual and employment details
//! for every listed id in batches of `prefetch_batch_size`; every entry is
//! then mapped from the cache. New participants are inserted, existing
//! ones are left untouched.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::batch::{
    FaultPolicy, ItemProcessor, ItemReader, KeyedWriter, Stage, StageContext, StageSettings,
    WriteMode,
};
use crate::config::{PipelineConfig, StageKind};
use crate::error::{EngineError, EngineResult};
use crate::external::HrDirectoryApi;
use crate::models::{DirectoryEntry, Employment, Individual, Participant};

use super::Resources;

/// The assembled sync stage.
pub type SyncStage = Stage<DirectoryReader, SyncProcessor, KeyedWriter<Participant>>;

#[derive(Default)]
struct Details {
    individuals: HashMap<String, Individual>,
    employments: HashMap<String, Employment>,
}

/// Per-job cache of directory data.
///
/// The listing is fetched once. The detail pre-fetch runs at most once to
/// success; a failed pre-fetch leaves the cache empty and is attempted
/// again by the next caller.
pub struct DirectoryCache {
    api: Arc<dyn HrDirectoryApi>,
    tenant_id: String,
    batch_size: usize,
    listing: OnceCell<Vec<DirectoryEntry>>,
    prefetched: OnceCell<()>,
    details: Mutex<Details>,
}

impl DirectoryCache {
    /// Creates an empty cache for `tenant_id`.
    pub fn new(
        api: Arc<dyn HrDirectoryApi>,
        tenant_id: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            api,
            tenant_id: tenant_id.into(),
            batch_size: batch_size.max(1),
            listing: OnceCell::new(),
            prefetched: OnceCell::new(),
            details: Mutex::new(Details::default()),
        }
    }

    /// The tenant's directory listing.
    pub async fn listing(&self) -> EngineResult<&[DirectoryEntry]> {
        let entries = self
            .listing
            .get_or_try_init(|| self.api.list_directory(&self.tenant_id))
            .await?;
        Ok(entries)
    }

    /// Loads details for every listed id, once.
    pub async fn prefetch(&self) -> EngineResult<()> {
        self.prefetched
            .get_or_try_init(|| self.load_details())
            .await
            .map(|_| ())
    }

    async fn load_details(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = self
            .listing()
            .await?
            .iter()
            .filter(|entry| seen.insert(entry.id.as_str()))
            .map(|entry| entry.id.clone())
            .collect();

        if ids.is_empty() {
            warn!(tenant_id = %self.tenant_id, "Directory listing is empty; nothing to pre-fetch");
            return Ok(());
        }

        let mut details = Details::default();
        for batch in ids.chunks(self.batch_size) {
            let responses = self.api.retrieve_individuals(&self.tenant_id, batch).await?;
            details.individuals.extend(
                responses
                    .into_iter()
                    .filter_map(|r| r.body.map(|body| (r.individual_id, body))),
            );
        }
        for batch in ids.chunks(self.batch_size) {
            let responses = self.api.retrieve_employments(&self.tenant_id, batch).await?;
            details.employments.extend(
                responses
                    .into_iter()
                    .filter_map(|r| r.body.map(|body| (r.individual_id, body))),
            );
        }

        info!(
            tenant_id = %self.tenant_id,
            ids = ids.len(),
            individuals = details.individuals.len(),
            employments = details.employments.len(),
            batch_size = self.batch_size,
            "Pre-fetched directory details"
        );
        *self.details.lock() = details;
        Ok(())
    }

    /// Cached personal details of `id`.
    pub fn individual(&self, id: &str) -> Option<Individual> {
        self.details.lock().individuals.get(id).cloned()
    }

    /// Cached employment details of `id`.
    pub fn employment(&self, id: &str) -> Option<Employment> {
        self.details.lock().employments.get(id).cloned()
    }

    /// Number of cached individual and employment entries.
    pub fn cached_counts(&self) -> (usize, usize) {
        let details = self.details.lock();
        (details.individuals.len(), details.employments.len())
    }

    /// Drops the cached details.
    pub fn flush(&self) {
        let (individuals, employments) = self.cached_counts();
        *self.details.lock() = Details::default();
        debug!(tenant_id = %self.tenant_id, individuals, employments, "Directory cache flushed");
    }
}

/// Reads the directory listing held by a [`DirectoryCache`].
pub struct DirectoryReader {
    cache: Arc<DirectoryCache>,
    entries: VecDeque<DirectoryEntry>,
}

impl DirectoryReader {
    /// Creates a reader over `cache`.
    pub fn new(cache: Arc<DirectoryCache>) -> Self {
        Self {
            cache,
            entries: VecDeque::new(),
        }
    }
}

#[async_trait]
impl ItemReader for DirectoryReader {
    type Item = DirectoryEntry;

    async fn open(&mut self, _ctx: &StageContext) -> EngineResult<()> {
        self.entries = self.cache.listing().await?.iter().cloned().collect();
        Ok(())
    }

    async fn read(&mut self) -> EngineResult<Option<DirectoryEntry>> {
        Ok(self.entries.pop_front())
    }
}

/// Maps a directory entry to a participant from cached details.
pub struct SyncProcessor {
    cache: Arc<DirectoryCache>,
    tenant_id: String,
}

impl SyncProcessor {
    /// Creates a processor for `tenant_id` reading from `cache`.
    pub fn new(cache: Arc<DirectoryCache>, tenant_id: impl Into<String>) -> Self {
        Self {
            cache,
            tenant_id: tenant_id.into(),
        }
    }
}

#[async_trait]
impl ItemProcessor for SyncProcessor {
    type Input = DirectoryEntry;
    type Output = Participant;

    async fn process(&self, entry: &DirectoryEntry) -> EngineResult<Option<Participant>> {
        self.cache.prefetch().await?;

        let individual = self.cache.individual(&entry.id).ok_or_else(|| {
            EngineError::DataNotFound {
                message: format!("no individual data for employee {}", entry.id),
            }
        })?;
        let employment = self.cache.employment(&entry.id).ok_or_else(|| {
            EngineError::DataNotFound {
                message: format!("no employment data for employee {}", entry.id),
            }
        })?;

        map_participant(&self.tenant_id, entry, &individual, &employment).map(Some)
    }
}

/// Builds a participant from directory payloads.
///
/// # Errors
///
/// Returns [`EngineError::Mapping`] for a malformed date or an income unit
/// that cannot be annualised.
pub fn map_participant(
    tenant_id: &str,
    entry: &DirectoryEntry,
    individual: &Individual,
    employment: &Employment,
) -> EngineResult<Participant> {
    let id = &entry.id;
    Ok(Participant {
        tenant_id: tenant_id.to_string(),
        employee_id: id.clone(),
        first_name: individual.first_name.clone().or_else(|| entry.first_name.clone()),
        last_name: individual.last_name.clone().or_else(|| entry.last_name.clone()),
        date_of_birth: parse_date(id, "dob", individual.dob.as_deref())?,
        hire_date: parse_date(id, "start_date", employment.start_date.as_deref())?,
        rehire_date: parse_date(
            id,
            "latest_rehire_date",
            employment.latest_rehire_date.as_deref(),
        )?,
        termination_date: parse_date(id, "end_date", employment.end_date.as_deref())?,
        employment_status: employment.employment_status.clone(),
        employment_type: employment.employment_type.clone(),
        annual_compensation: annual_compensation(id, employment)?,
        employee_contribution_percent: None,
        is_active: employment.is_active.or(entry.is_active).unwrap_or(false),
    })
}

fn parse_date(id: &str, field: &str, raw: Option<&str>) -> EngineResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| EngineError::Mapping {
                message: format!("employee {id}: invalid {field} '{text}': {e}"),
            }),
    }
}

fn annual_compensation(id: &str, employment: &Employment) -> EngineResult<Decimal> {
    let Some(income) = &employment.income else {
        return Ok(Decimal::ZERO);
    };
    // Amounts arrive in cents.
    let amount = Decimal::new(income.amount, 2);
    match income.unit.to_lowercase().as_str() {
        "yearly" => Ok(amount),
        "monthly" => Ok(amount * Decimal::from(12)),
        other => Err(EngineError::Mapping {
            message: format!("employee {id}: unsupported income unit '{other}'"),
        }),
    }
}

/// Assembles the stage around a fresh [`DirectoryCache`], also returned so
/// it can be flushed once the stage ends.
pub fn build(
    resources: &Resources,
    tenant_id: &str,
    config: &PipelineConfig,
) -> (SyncStage, Arc<DirectoryCache>) {
    let cache = Arc::new(DirectoryCache::new(
        Arc::clone(&resources.directory),
        tenant_id,
        config.prefetch_batch_size,
    ));
    let stage = Stage::new(
        StageKind::Sync,
        DirectoryReader::new(Arc::clone(&cache)),
        SyncProcessor::new(Arc::clone(&cache), tenant_id),
        KeyedWriter::new(Arc::clone(&resources.participants), WriteMode::InsertOnly),
        FaultPolicy::for_stage(StageKind::Sync, config.stage(StageKind::Sync)),
        StageSettings::from_config(StageKind::Sync, config),
    );
    (stage, cache)
}
