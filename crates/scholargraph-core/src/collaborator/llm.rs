//! LLM-backed research collaborator
//!
//! Every operation is one chat completion. Structured replies are requested
//! as a single JSON object and extracted from fenced or bare text.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::{Config, SearchConfig};
use crate::domain::graph::{Link, Node, NodeKind};
use crate::domain::suggestion::SuggestionBatch;
use crate::error::{Error, Result};
use crate::llm::{LlmClient, Message};

use super::traits::{DocumentSource, ImageSource, ParsedDocument, ResearchCollaborator};

/// Maximum document characters sent for parsing
const MAX_DOCUMENT_CHARS: usize = 24_000;

/// Maximum content characters per node in the graph context
const MAX_NODE_CONTENT_CHARS: usize = 280;

/// Label used when the collaborator proposes a link without one
const DEFAULT_LINK_LABEL: &str = "Related";

const RESEARCH_SYSTEM_PROMPT: &str = "You are a research assistant helping a scholar organise \
papers, notes and concepts into a knowledge graph. Be precise and only reference node ids that \
appear in the provided graph unless asked to invent new ones.";

const LINKS_PROMPT: &str = r#"Propose meaningful relations between the nodes below.
Respond with a single JSON object and nothing else:
{"links": [{"source": "<node id>", "target": "<node id>", "label": "<short relation, e.g. Extends, Cites, Evolved To>"}]}"#;

const SUGGESTIONS_PROMPT: &str = r#"Suggest new research directions, papers or concepts that would extend this graph.
Give every new node a fresh id that does not appear in the graph.
Connect each new node to at least one existing node.
Respond with a single JSON object and nothing else:
{"nodes": [{"id": "<new id>", "label": "<title>", "kind": "paper|note|concept", "content": "<one paragraph>", "year": <optional year>, "reason": "<why it is relevant>"}],
 "links": [{"source": "<id>", "target": "<id>", "label": "<short relation>"}]}"#;

const SEARCH_PROMPT: &str = r#"Find the nodes that are semantically relevant to the query, most relevant first.
Respond with a single JSON object and nothing else:
{"ids": ["<node id>", ...]}
Return {"ids": []} when nothing is relevant."#;

const DOCUMENT_PROMPT: &str = r#"Summarise the document and extract its key elements (methods, datasets, findings, concepts).
Respond with a single JSON object and nothing else:
{"title": "<document title>", "summary": "<one paragraph>", "elements": [{"type": "method|dataset|finding|concept", "label": "<short name>", "content": "<one or two sentences>"}]}"#;

const IMAGE_PROMPT: &str = "Describe this figure for a research notebook: what it shows, the key \
quantities or components, and the takeaway. Answer in markdown.";

#[derive(Debug, Deserialize)]
struct WireLink {
    source: String,
    target: String,
    #[serde(default)]
    label: Option<String>,
}

impl WireLink {
    fn into_link(self) -> Link {
        let label = self
            .label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LINK_LABEL.to_string());
        Link::new(self.source, self.target, label)
    }
}

#[derive(Debug, Deserialize)]
struct WireNode {
    #[serde(default)]
    id: Option<String>,
    label: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    reason: Option<String>,
}

impl WireNode {
    fn into_node(self) -> Node {
        let kind = self
            .kind
            .as_deref()
            .and_then(NodeKind::parse)
            .unwrap_or(NodeKind::Concept);
        let mut node = Node::new(self.label, kind).with_content(self.content);
        if let Some(id) = self.id.filter(|id| !id.trim().is_empty()) {
            node = node.with_id(id);
        }
        if let Some(year) = self.year {
            node = node.with_year(year);
        }
        node.reason = self.reason;
        node
    }
}

#[derive(Debug, Deserialize)]
struct LinksReply {
    #[serde(default)]
    links: Vec<WireLink>,
}

#[derive(Debug, Deserialize)]
struct SuggestionsReply {
    #[serde(default)]
    nodes: Vec<WireNode>,
    #[serde(default)]
    links: Vec<WireLink>,
}

#[derive(Debug, Deserialize)]
struct SearchReply {
    #[serde(default)]
    ids: Vec<String>,
}

/// Collaborator backed by an OpenAI-compatible chat completion API
#[derive(Debug, Clone)]
pub struct LlmCollaborator {
    client: LlmClient,
    search: SearchConfig,
}

impl LlmCollaborator {
    pub fn new(client: LlmClient, search: SearchConfig) -> Self {
        Self { client, search }
    }

    /// Build from configuration, reading the API key from the environment
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = LlmClient::from_env(config.llm.clone())?;
        Ok(Self::new(client, config.search.clone()))
    }

    async fn ask(&self, instructions: &str, body: String) -> Result<String> {
        let messages = vec![
            Message::system(RESEARCH_SYSTEM_PROMPT),
            Message::user(format!("{}\n\n{}", instructions, body)),
        ];
        let prompt_chars: usize = messages.iter().map(Message::approx_chars).sum();
        debug!(prompt_chars, "Asking collaborator");
        let response = self.client.complete(messages).await?;
        Ok(response.content)
    }

    fn graph_context(&self, nodes: &[Node]) -> String {
        describe_nodes(nodes, self.search.context_nodes)
    }
}

#[async_trait]
impl ResearchCollaborator for LlmCollaborator {
    async fn generate_links(&self, nodes: &[Node]) -> Result<Vec<Link>> {
        let reply = self
            .ask(LINKS_PROMPT, format!("Graph:\n{}", self.graph_context(nodes)))
            .await?;
        let parsed: LinksReply = parse_reply(&reply)?;
        info!(count = parsed.links.len(), "Collaborator proposed links");
        Ok(parsed.links.into_iter().map(WireLink::into_link).collect())
    }

    async fn generate_suggestions(&self, nodes: &[Node]) -> Result<SuggestionBatch> {
        let reply = self
            .ask(SUGGESTIONS_PROMPT, format!("Graph:\n{}", self.graph_context(nodes)))
            .await?;
        let parsed: SuggestionsReply = parse_reply(&reply)?;
        info!(
            nodes = parsed.nodes.len(),
            links = parsed.links.len(),
            "Collaborator proposed suggestions"
        );
        Ok(SuggestionBatch::new(
            parsed.nodes.into_iter().map(WireNode::into_node).collect(),
            parsed.links.into_iter().map(WireLink::into_link).collect(),
        ))
    }

    async fn semantic_search(&self, query: &str, nodes: &[Node]) -> Result<Vec<String>> {
        let reply = self
            .ask(
                SEARCH_PROMPT,
                format!("Query: {}\n\nGraph:\n{}", query, self.graph_context(nodes)),
            )
            .await?;
        let parsed: SearchReply = parse_reply(&reply)?;

        let mut seen = HashSet::new();
        let ids: Vec<String> = parsed
            .ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .take(self.search.max_results)
            .collect();
        info!(query = %query, count = ids.len(), "Semantic search answered");
        Ok(ids)
    }

    async fn chat(&self, query: &str, nodes: &[Node]) -> Result<String> {
        let reply = self
            .ask(
                "Answer the question using the graph below as context. Cite node labels where useful.",
                format!("Question: {}\n\nGraph:\n{}", query, self.graph_context(nodes)),
            )
            .await?;
        Ok(reply.trim().to_string())
    }

    async fn parse_document(&self, document: &DocumentSource) -> Result<ParsedDocument> {
        let reply = self
            .ask(
                DOCUMENT_PROMPT,
                format!(
                    "Document: {}\n\n{}",
                    document.name,
                    truncate_content(&document.text, MAX_DOCUMENT_CHARS)
                ),
            )
            .await?;
        let parsed: ParsedDocument = parse_reply(&reply)?;
        info!(document = %document.name, elements = parsed.elements.len(), "Document parsed");
        Ok(parsed)
    }

    async fn analyze_image(&self, image: &ImageSource) -> Result<String> {
        let messages = vec![
            Message::system(RESEARCH_SYSTEM_PROMPT),
            Message::user_with_image(IMAGE_PROMPT, &image.bytes, &image.mime_type),
        ];
        let response = self.client.complete(messages).await?;
        let analysis = response.content.trim().to_string();
        if analysis.is_empty() {
            return Err(Error::CollaboratorFailure("empty image analysis".into()));
        }
        Ok(analysis)
    }
}

/// Compact one-line-per-node description of the graph
fn describe_nodes(nodes: &[Node], limit: usize) -> String {
    let mut lines: Vec<String> = nodes
        .iter()
        .take(limit)
        .map(|n| {
            let mut line = format!("- id={} | {} | {}", n.id, n.kind, n.label);
            if let Some(year) = n.year {
                line.push_str(&format!(" | {}", year));
            }
            if !n.group.is_empty() {
                line.push_str(&format!(" | group: {}", n.group));
            }
            let content = n.content.trim();
            if !content.is_empty() {
                line.push_str(&format!(
                    " | {}",
                    truncate_content(&content.replace('\n', " "), MAX_NODE_CONTENT_CHARS)
                ));
            }
            line
        })
        .collect();
    if nodes.len() > limit {
        lines.push(format!("({} more nodes omitted)", nodes.len() - limit));
    }
    lines.join("\n")
}

/// Truncate to at most `max_len` characters, on a char boundary
fn truncate_content(content: &str, max_len: usize) -> String {
    match content.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

/// Pull the JSON object out of a reply that may be fenced or wrapped in prose
fn extract_json_from_response(response: &str) -> &str {
    if let Some(start) = response.find("```json") {
        let json_start = start + 7;
        if let Some(end) = response[json_start..].find("```") {
            return response[json_start..json_start + end].trim();
        }
    }

    if let Some(start) = response.find("```") {
        let potential_start = start + 3;
        if let Some(newline) = response[potential_start..].find('\n') {
            let json_start = potential_start + newline + 1;
            if let Some(end) = response[json_start..].find("```") {
                return response[json_start..json_start + end].trim();
            }
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}'))
        && start < end
    {
        return &response[start..=end];
    }

    response.trim()
}

fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let json = extract_json_from_response(reply);
    serde_json::from_str(json).map_err(|e| {
        Error::CollaboratorFailure(format!(
            "could not parse collaborator reply ({}): {}",
            e,
            truncate_content(reply, 120)
        ))
    })
}
