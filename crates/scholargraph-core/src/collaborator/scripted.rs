//! Deterministic collaborator with canned replies
//!
//! Used by tests and offline runs. Replies are configured up front; every
//! call is recorded so callers can assert on what was asked.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::graph::{Link, Node};
use crate::domain::suggestion::SuggestionBatch;
use crate::error::{Error, Result};

use super::traits::{DocumentSource, ImageSource, ParsedDocument, ResearchCollaborator};

/// A call received by [`ScriptedCollaborator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorCall {
    GenerateLinks { nodes: usize },
    GenerateSuggestions { nodes: usize },
    SemanticSearch { query: String, nodes: usize },
    Chat { query: String },
    ParseDocument { name: String },
    AnalyzeImage { name: String },
}

#[derive(Debug, Default)]
pub struct ScriptedCollaborator {
    links: Vec<Link>,
    suggestions: SuggestionBatch,
    search: HashMap<String, Vec<String>>,
    search_delays: HashMap<String, Duration>,
    chat: Option<String>,
    document: Option<ParsedDocument>,
    image_analysis: Option<String>,
    failing: bool,
    calls: Mutex<Vec<CollaboratorCall>>,
}

impl ScriptedCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(mut self, links: Vec<Link>) -> Self {
        self.links = links;
        self
    }

    pub fn with_suggestions(mut self, batch: SuggestionBatch) -> Self {
        self.suggestions = batch;
        self
    }

    /// Answer `query` with `ids`; unknown queries return no matches
    pub fn with_search(mut self, query: impl Into<String>, ids: &[&str]) -> Self {
        self.search
            .insert(query.into(), ids.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Delay the reply to `query`, to exercise overlapping requests
    pub fn with_search_delay(mut self, query: impl Into<String>, delay: Duration) -> Self {
        self.search_delays.insert(query.into(), delay);
        self
    }

    pub fn with_chat(mut self, answer: impl Into<String>) -> Self {
        self.chat = Some(answer.into());
        self
    }

    pub fn with_document(mut self, document: ParsedDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_image_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.image_analysis = Some(analysis.into());
        self
    }

    /// Make every call fail with a collaborator failure
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<CollaboratorCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: CollaboratorCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.failing {
            return Err(Error::CollaboratorFailure(
                "scripted collaborator is failing".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ResearchCollaborator for ScriptedCollaborator {
    async fn generate_links(&self, nodes: &[Node]) -> Result<Vec<Link>> {
        self.record(CollaboratorCall::GenerateLinks { nodes: nodes.len() })?;
        Ok(self.links.clone())
    }

    async fn generate_suggestions(&self, nodes: &[Node]) -> Result<SuggestionBatch> {
        self.record(CollaboratorCall::GenerateSuggestions { nodes: nodes.len() })?;
        Ok(self.suggestions.clone())
    }

    async fn semantic_search(&self, query: &str, nodes: &[Node]) -> Result<Vec<String>> {
        self.record(CollaboratorCall::SemanticSearch {
            query: query.to_string(),
            nodes: nodes.len(),
        })?;
        if let Some(delay) = self.search_delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        Ok(self.search.get(query).cloned().unwrap_or_default())
    }

    async fn chat(&self, query: &str, _nodes: &[Node]) -> Result<String> {
        self.record(CollaboratorCall::Chat {
            query: query.to_string(),
        })?;
        Ok(self.chat.clone().unwrap_or_default())
    }

    async fn parse_document(&self, document: &DocumentSource) -> Result<ParsedDocument> {
        self.record(CollaboratorCall::ParseDocument {
            name: document.name.clone(),
        })?;
        self.document
            .clone()
            .ok_or_else(|| Error::CollaboratorFailure("no document reply scripted".to_string()))
    }

    async fn analyze_image(&self, image: &ImageSource) -> Result<String> {
        self.record(CollaboratorCall::AnalyzeImage {
            name: image.name.clone(),
        })?;
        self.image_analysis
            .clone()
            .ok_or_else(|| Error::CollaboratorFailure("no image reply scripted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_search_replies_and_records() {
        let collaborator = ScriptedCollaborator::new().with_search("transformers", &["a", "b"]);

        let hits = collaborator.semantic_search("transformers", &[]).await.unwrap();
        assert_eq!(hits, vec!["a".to_string(), "b".to_string()]);
        assert!(collaborator.semantic_search("unknown", &[]).await.unwrap().is_empty());
        assert_eq!(collaborator.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_collaborator() {
        let collaborator = ScriptedCollaborator::new().with_chat("hi").failing();
        let err = collaborator.chat("hello", &[]).await.unwrap_err();
        assert!(err.is_collaborator_failure());
        assert_eq!(
            collaborator.calls(),
            vec![CollaboratorCall::Chat {
                query: "hello".to_string()
            }]
        );
    }
}
