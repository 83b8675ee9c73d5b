//! Semantic search override
//!
//! A semantic search is one round-trip to the collaborator. Requests are
//! numbered; only the response to the newest request is ever applied, so
//! results never flicker back to an older query.
//!
//! `results == None` means "not searched"; `Some(vec![])` means "searched,
//! nothing matched". The two render differently.

use tracing::{debug, warn};

use crate::error::Error;

/// Handle identifying one semantic search request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchTicket(u64);

impl SearchTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// What the shell should show for semantic search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticStatus {
    /// Never searched, or cleared
    Inactive,
    /// A request is in flight
    Searching,
    /// Results are applied
    Active { result_count: usize },
}

/// Semantic search state
#[derive(Debug, Clone, Default)]
pub struct SemanticSearch {
    query: String,
    results: Option<Vec<String>>,
    next_request: u64,
    pending: Option<u64>,
}

impl SemanticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new request; earlier in-flight requests become stale
    pub fn begin(&mut self, query: impl Into<String>) -> SearchTicket {
        self.next_request += 1;
        self.pending = Some(self.next_request);
        self.query = query.into();
        debug!(request_id = self.next_request, query = %self.query, "Semantic search started");
        SearchTicket(self.next_request)
    }

    /// Apply a response; returns false when it was superseded and discarded
    pub fn resolve(&mut self, ticket: SearchTicket, ids: Vec<String>) -> bool {
        if self.pending != Some(ticket.0) {
            warn!(request_id = ticket.0, "Discarding superseded semantic search response");
            return false;
        }
        self.pending = None;
        self.results = Some(ids);
        true
    }

    /// Record a failure; previous results stay in place
    pub fn fail(&mut self, ticket: SearchTicket, error: Error) -> Error {
        if self.pending == Some(ticket.0) {
            self.pending = None;
        }
        warn!(request_id = ticket.0, error = %error, "Semantic search failed");
        error
    }

    /// Leave semantic mode; any in-flight response will be discarded
    pub fn clear(&mut self) {
        self.query.clear();
        self.results = None;
        self.pending = None;
    }

    /// Set results directly, bypassing the request cycle
    pub fn set_results(&mut self, query: impl Into<String>, ids: Vec<String>) {
        self.query = query.into();
        self.pending = None;
        self.results = Some(ids);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Active result ids, `None` when semantic mode is off
    pub fn results(&self) -> Option<&[String]> {
        self.results.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn status(&self) -> SemanticStatus {
        match (&self.pending, &self.results) {
            (Some(_), _) => SemanticStatus::Searching,
            (None, Some(ids)) => SemanticStatus::Active {
                result_count: ids.len(),
            },
            (None, None) => SemanticStatus::Inactive,
        }
    }
}
