//! Latest-query guard
//!
//! The visible result set reflects the most recently *issued* query, not the
//! most recently resolved one. Every request takes a ticket from a
//! [`QuerySequencer`]; a response whose ticket is no longer the newest is
//! dropped. Search input is debounced, and any filter change resets the page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use shared::models::{IssueCategory, IssueListResponse, IssueQuery, IssueStatus};
use tokio::sync::watch;

use crate::gateway::Gateway;
use crate::http::HttpClient;
use crate::{ClientConfig, ClientResult};

/// Sequence number attached to one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct QuerySequencer {
    issued: AtomicU64,
}

impl QuerySequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// No newer ticket has been handed out
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}

/// Filters and page of the issue list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseFilters {
    pub search: String,
    pub status: Option<IssueStatus>,
    pub category: Option<IssueCategory>,
    pub priority: Option<String>,
    pub page: u32,
}

impl Default for BrowseFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: None,
            category: None,
            priority: None,
            page: 1,
        }
    }
}

impl BrowseFilters {
    pub fn to_query(&self, page_size: u32) -> IssueQuery {
        let search = self.search.trim();
        IssueQuery {
            page: Some(self.page),
            limit: Some(page_size),
            search: (!search.is_empty()).then(|| search.to_string()),
            status: self.status,
            category: self.category,
            priority: self.priority.clone(),
            user_email: None,
        }
    }
}

/// Paginated, filtered issue list for one screen
pub struct IssueBrowser<C: HttpClient> {
    gateway: Arc<Gateway<C>>,
    filters: Mutex<BrowseFilters>,
    page_size: u32,
    debounce: Duration,
    sequencer: QuerySequencer,
    keystrokes: AtomicU64,
    results: watch::Sender<Option<IssueListResponse>>,
}

impl<C: HttpClient> IssueBrowser<C> {
    pub fn new(gateway: Arc<Gateway<C>>, config: &ClientConfig) -> Self {
        let (results, _) = watch::channel(None);
        Self {
            gateway,
            filters: Mutex::new(BrowseFilters::default()),
            page_size: config.page_size.max(1),
            debounce: config.search_debounce,
            sequencer: QuerySequencer::new(),
            keystrokes: AtomicU64::new(0),
            results,
        }
    }

    pub fn filters(&self) -> BrowseFilters {
        self.lock().clone()
    }

    /// Last accepted page
    pub fn current(&self) -> Option<IssueListResponse> {
        self.results.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<IssueListResponse>> {
        self.results.subscribe()
    }

    /// Debounced: only the last keystroke in a quiet period queries.
    /// `Ok(None)` means this call was superseded.
    pub async fn set_search(&self, text: &str) -> ClientResult<Option<IssueListResponse>> {
        let keystroke = self.keystrokes.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(|f| f.search = text.to_string());

        tokio::time::sleep(self.debounce).await;
        if self.keystrokes.load(Ordering::SeqCst) != keystroke {
            return Ok(None);
        }
        self.fetch().await
    }

    pub async fn set_status(
        &self,
        status: Option<IssueStatus>,
    ) -> ClientResult<Option<IssueListResponse>> {
        self.update(|f| f.status = status);
        self.fetch().await
    }

    pub async fn set_category(
        &self,
        category: Option<IssueCategory>,
    ) -> ClientResult<Option<IssueListResponse>> {
        self.update(|f| f.category = category);
        self.fetch().await
    }

    pub async fn set_priority(
        &self,
        priority: Option<String>,
    ) -> ClientResult<Option<IssueListResponse>> {
        self.update(|f| f.priority = priority);
        self.fetch().await
    }

    /// Keeps the filters; pages start at 1
    pub async fn set_page(&self, page: u32) -> ClientResult<Option<IssueListResponse>> {
        self.lock().page = page.max(1);
        self.fetch().await
    }

    /// Query with the current filters. `Ok(None)` when a newer query was
    /// issued while this one was in flight.
    pub async fn fetch(&self) -> ClientResult<Option<IssueListResponse>> {
        // Ticket and snapshot under one lock
        let (query, ticket) = {
            let filters = self.lock();
            (filters.to_query(self.page_size), self.sequencer.next())
        };

        let result = self.gateway.list_issues(&query).await;
        if !self.sequencer.is_latest(ticket) {
            tracing::debug!(?ticket, "Discarding stale issue page");
            return Ok(None);
        }

        let page = result?;
        self.results.send_replace(Some(page.clone()));
        Ok(Some(page))
    }

    /// Filter changes go back to the first page
    fn update(&self, change: impl FnOnce(&mut BrowseFilters)) {
        let mut filters = self.lock();
        change(&mut filters);
        filters.page = 1;
    }

    fn lock(&self) -> MutexGuard<'_, BrowseFilters> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
