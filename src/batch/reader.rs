//! Paged repository reader.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::storage::{Record, Repository};

use super::traits::{ItemReader, StageContext};

/// Records per repository page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

type Filter<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

/// Streams a tenant's records page by page, keeping those that pass a filter.
///
/// The tenant comes from the [`StageContext`] given to `open`, which also
/// rewinds to the first page.
pub struct RepositoryReader<R: Record> {
    repository: Arc<dyn Repository<R>>,
    filter: Filter<R>,
    page_size: usize,
    tenant_id: String,
    offset: usize,
    buffer: VecDeque<R>,
    exhausted: bool,
}

impl<R: Record> RepositoryReader<R> {
    /// Creates a reader over `repository` keeping records where `filter` holds.
    pub fn new<F>(repository: Arc<dyn Repository<R>>, filter: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        Self {
            repository,
            filter: Box::new(filter),
            page_size: DEFAULT_PAGE_SIZE,
            tenant_id: String::new(),
            offset: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

#[async_trait]
impl<R: Record> ItemReader for RepositoryReader<R> {
    type Item = R;

    async fn open(&mut self, ctx: &StageContext) -> EngineResult<()> {
        self.tenant_id = ctx.tenant_id.clone();
        self.offset = 0;
        self.buffer.clear();
        self.exhausted = false;
        Ok(())
    }

    async fn read(&mut self) -> EngineResult<Option<R>> {
        while self.buffer.is_empty() && !self.exhausted {
            let page = self
                .repository
                .page(&self.tenant_id, self.offset, self.page_size)
                .await?;
            self.exhausted = page.len() < self.page_size;
            self.offset += page.len();
            self.buffer
                .extend(page.into_iter().filter(|record| (self.filter)(record)));
        }
        Ok(self.buffer.pop_front())
    }
}
