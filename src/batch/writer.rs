//! Keyed chunk writer.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::storage::{Record, Repository};

use super::traits::{ItemWriter, WriteReport};

/// How a [`KeyedWriter`] treats records whose key is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Existing records are left alone; only new keys are saved.
    InsertOnly,
    /// Every record is saved, replacing existing ones.
    Upsert,
}

/// Writes a chunk with one existence check and one batched save.
///
/// A key repeated within one chunk counts as existing after its first
/// occurrence.
pub struct KeyedWriter<R: Record> {
    repository: Arc<dyn Repository<R>>,
    mode: WriteMode,
}

impl<R: Record> KeyedWriter<R> {
    /// Creates a writer.
    pub fn new(repository: Arc<dyn Repository<R>>, mode: WriteMode) -> Self {
        Self { repository, mode }
    }
}

#[async_trait]
impl<R: Record> ItemWriter for KeyedWriter<R> {
    type Item = R;

    async fn write(&self, items: &[R]) -> EngineResult<WriteReport> {
        let Some(first) = items.first() else {
            return Ok(WriteReport::default());
        };
        let tenant_id = first.tenant_id().to_string();

        let keys: Vec<String> = items.iter().map(Record::key).collect();
        let mut stored: HashSet<String> = self
            .repository
            .find_by_keys(&tenant_id, &keys)
            .await?
            .iter()
            .map(Record::key)
            .collect();

        let mut report = WriteReport::default();
        let mut to_save = Vec::with_capacity(items.len());
        for (item, key) in items.iter().zip(keys) {
            let is_new = stored.insert(key);
            if is_new {
                report.new += 1;
            } else {
                report.existing += 1;
            }
            if is_new || self.mode == WriteMode::Upsert {
                to_save.push(item.clone());
            }
        }

        if !to_save.is_empty() {
            self.repository.save_all(&to_save).await?;
        }
        report.written = to_save.len();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Participant;
    use crate::storage::InMemoryRepository;
    use rust_decimal::Decimal;

    fn create_test_participant(id: &str, compensation: i64) -> Participant {
        Participant {
            tenant_id: "acme".to_string(),
            employee_id: id.to_string(),
            first_name: None,
            last_name: None,
            date_of_birth: None,
            hire_date: None,
            rehire_date: None,
            termination_date: None,
            employment_status: None,
            employment_type: None,
            annual_compensation: Decimal::new(compensation, 0),
            employee_contribution_percent: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_only_keeps_existing_records() {
        let repo = InMemoryRepository::with_records(vec![create_test_participant("a", 1)]);
        let writer = KeyedWriter::new(Arc::new(repo.clone()), WriteMode::InsertOnly);

        let report = writer
            .write(&[create_test_participant("a", 2), create_test_participant("b", 2)])
            .await
            .unwrap();

        assert_eq!(report, WriteReport { written: 1, new: 1, existing: 1 });
        assert_eq!(
            repo.get("acme", "a").unwrap().annual_compensation,
            Decimal::new(1, 0)
        );
        assert!(repo.get("acme", "b").is_some());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_existing_records() {
        let repo = InMemoryRepository::with_records(vec![create_test_participant("a", 1)]);
        let writer = KeyedWriter::new(Arc::new(repo.clone()), WriteMode::Upsert);

        let report = writer
            .write(&[create_test_participant("a", 2), create_test_participant("b", 2)])
            .await
            .unwrap();

        assert_eq!(report, WriteReport { written: 2, new: 1, existing: 1 });
        assert_eq!(
            repo.get("acme", "a").unwrap().annual_compensation,
            Decimal::new(2, 0)
        );
    }

    #[tokio::test]
    async fn test_duplicate_key_within_chunk_counts_as_existing() {
        let repo: InMemoryRepository<Participant> = InMemoryRepository::new();
        let writer = KeyedWriter::new(Arc::new(repo.clone()), WriteMode::InsertOnly);

        let report = writer
            .write(&[create_test_participant("a", 1), create_test_participant("a", 2)])
            .await
            .unwrap();

        assert_eq!(report.new + report.existing, 2);
        assert_eq!(report.written, 1);
        assert_eq!(repo.len(), 1);
    }
}
