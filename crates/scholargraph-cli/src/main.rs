//! Scholargraph CLI - explore and grow a research knowledge graph

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use scholargraph_core::collaborator::{DocumentSource, ImageSource, LlmCollaborator};
use scholargraph_core::commands::{self, GraphSnapshot};
use scholargraph_core::config::Config;
use scholargraph_core::domain::filter::{FilterState, YearFilter};
use scholargraph_core::domain::graph::{Badge, Link, NodeDraft, NodeKind};
use scholargraph_core::workspace::{GraphState, ResearchWorkspace, SearchOutcome};
use serde::Serialize;
use tracing::{debug, warn};

/// Upper bound on ticks for headless layout
const DEFAULT_MAX_TICKS: usize = 3_000;

#[derive(Parser)]
#[command(name = "scholargraph")]
#[command(author, version, long_about = None)]
#[command(about = "Research knowledge graph with AI suggestions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Graph snapshot file (JSON); created on first write
    #[arg(long, global = true, default_value = "scholargraph.json")]
    graph: PathBuf,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a paper, note or concept
    Add {
        /// Node title
        label: String,
        /// Node kind (paper, note, concept)
        #[arg(short, long, default_value = "paper")]
        kind: String,
        /// Body text
        #[arg(short, long, default_value = "")]
        content: String,
        /// Publication year
        #[arg(short, long)]
        year: Option<i32>,
        /// Explicit id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Badge as CATEGORY, CATEGORY:PARTITION or CATEGORY=VALUE (repeatable)
        #[arg(short, long)]
        badge: Vec<String>,
    },

    /// Link two nodes
    Link {
        source: String,
        target: String,
        /// Relation label
        #[arg(short, long, default_value = "Related")]
        label: String,
    },

    /// Remove a node and its links
    Remove { id: String },

    /// Show graph statistics
    Stats,

    /// List visible nodes
    List {
        /// Substring match on label or content
        #[arg(long)]
        query: Option<String>,
        /// Badge partition, e.g. Q1
        #[arg(long)]
        partition: Option<String>,
        /// Exact publication year
        #[arg(long, conflicts_with = "older_than")]
        year: Option<i32>,
        /// Only nodes published before this year
        #[arg(long)]
        older_than: Option<i32>,
        /// Only starred nodes
        #[arg(long)]
        starred: bool,
        /// Include pending suggestions
        #[arg(long)]
        suggestions: bool,
    },

    /// Show a node and its links
    Show { id: String },

    /// Settle the layout and print node positions
    Layout {
        /// Maximum simulation ticks
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: usize,
    },

    /// Toggle a node's star
    Star { id: String },

    /// Edit a node's label or content
    Edit {
        id: String,
        #[arg(short, long)]
        label: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Ask the AI for new research suggestions
    Suggest,

    /// Accept a suggested node into the graph
    Promote { id: String },

    /// Discard a suggested node
    Reject { id: String },

    /// Discard every pending suggestion
    ClearSuggestions,

    /// Ask the AI to link related nodes
    Connect,

    /// Semantic search over the graph
    Search { query: String },

    /// Ask a question about the graph
    Ask { question: String },

    /// Parse a document into a paper with its key elements
    Ingest { path: PathBuf },

    /// Describe a figure and store it as a note
    ImageNote { path: PathBuf },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scholargraph=info")),
        )
        .init();

    let cli = Cli::parse();
    let out = Output {
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Config { action } => cmd_config(action, &cli.graph, &out),
        Commands::Doctor => cmd_doctor(&cli.graph, &out),
        command => {
            let config = Config::load().context("Failed to load configuration")?;
            let state = open_graph(&cli.graph, &config)?;
            run(command, state, &config, &cli.graph, &out).await
        }
    }
}

async fn run(
    command: Commands,
    mut state: GraphState,
    config: &Config,
    graph: &Path,
    out: &Output,
) -> anyhow::Result<()> {
    match command {
        Commands::Add {
            label,
            kind,
            content,
            year,
            id,
            badge,
        } => {
            let kind = NodeKind::parse(&kind).ok_or_else(|| {
                anyhow!("Unknown node kind '{}' (expected paper, note or concept)", kind)
            })?;
            let badges = badge
                .iter()
                .map(|b| parse_badge(b))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let mut draft = NodeDraft::new(label, kind).with_content(content).with_badges(badges);
            if let Some(year) = year {
                draft = draft.with_year(year);
            }
            if let Some(id) = id {
                draft = draft.with_id(id);
            }
            let id = state.add_node(draft)?;
            save_graph(graph, &state)?;
            let node = state
                .store()
                .node(&id)
                .ok_or_else(|| anyhow!("node '{}' vanished after insert", id))?;
            out.emit(node, || format!("Added {}", commands::describe_node(node).trim_start()))
        }

        Commands::Link {
            source,
            target,
            label,
        } => {
            let link = Link::new(source, target, label);
            let insertion = state.insert_link(link.clone())?;
            if insertion.is_dangling() {
                warn!(
                    source = %link.source,
                    target = %link.target,
                    "Link stored with missing endpoint"
                );
            }
            save_graph(graph, &state)?;
            out.emit(&link, || {
                format!("Linked {} -[{}]-> {}", link.source, link.label, link.target)
            })
        }

        Commands::Remove { id } => {
            let node = state.remove_node(&id)?;
            save_graph(graph, &state)?;
            out.emit(&node, || format!("Removed '{}'", node.label))
        }

        Commands::Stats => {
            let stats = state.store().stats();
            out.emit(&stats, || {
                let mut text = commands::render_stats(&stats);
                let pending = state.overlay().nodes().len();
                if pending > 0 {
                    text.push_str(&format!("\nPending suggestions: {}", pending));
                }
                text
            })
        }

        Commands::List {
            query,
            partition,
            year,
            older_than,
            starred,
            suggestions,
        } => {
            let mut filters = FilterState::new().with_suggestions(suggestions);
            if let Some(query) = query {
                filters = filters.with_query(query);
            }
            if let Some(partition) = partition {
                filters = filters.with_partition(partition);
            }
            if let Some(year) = year {
                filters = filters.with_year(YearFilter::Exact(year));
            }
            if let Some(threshold) = older_than {
                filters = filters.with_year(YearFilter::OlderThan(threshold));
            }
            if starred {
                filters = filters.starred_only();
            }
            state.set_filters(filters);

            let visible = state.visible();
            out.emit(&visible.nodes, || {
                if visible.is_empty() {
                    "No nodes match.".to_string()
                } else {
                    visible
                        .nodes
                        .iter()
                        .map(commands::describe_node)
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            })
        }

        Commands::Show { id } => {
            state.set_show_suggestions(true);
            let detail = commands::node_detail(&state, &id)?;
            out.emit(&detail, || commands::render_detail(&detail))
        }

        Commands::Layout { max_ticks } => {
            state.set_show_suggestions(true);
            let ticks = state.settle(max_ticks);
            debug!(ticks, settled = state.layout().is_settled(), "Layout finished");
            let positions = state.layout().positions();
            out.emit(&positions, || commands::render_positions(&positions))
        }

        Commands::Star { id } => {
            let starred = state.toggle_star(&id)?;
            save_graph(graph, &state)?;
            out.emit(&serde_json::json!({ "id": id, "starred": starred }), || {
                if starred {
                    format!("Starred {}", id)
                } else {
                    format!("Unstarred {}", id)
                }
            })
        }

        Commands::Edit { id, label, content } => {
            if label.is_none() && content.is_none() {
                return Err(anyhow!("Nothing to edit: pass --label and/or --content"));
            }
            state.select(&id)?;
            if let Some(label) = &label {
                state.edit_label(&id, label)?;
            }
            if let Some(content) = &content {
                state.edit_content(&id, content)?;
            }
            save_graph(graph, &state)?;
            let detail = commands::node_detail(&state, &id)?;
            out.emit(&detail.node, || format!("Updated {}", detail.node.id))
        }

        Commands::Promote { id } => {
            let promotion = state.promote_node(&id)?;
            save_graph(graph, &state)?;
            out.emit(&promotion, || {
                format!(
                    "Promoted {} ({} link(s) accepted, {} suggestion link(s) pending)",
                    promotion.node_id, promotion.links_promoted, promotion.links_remaining
                )
            })
        }

        Commands::Reject { id } => {
            let links = state.reject_node(&id)?;
            save_graph(graph, &state)?;
            out.emit(&serde_json::json!({ "id": id, "links_removed": links }), || {
                format!("Rejected {} ({} suggestion link(s) removed)", id, links)
            })
        }

        Commands::ClearSuggestions => {
            state.clear_suggestions();
            save_graph(graph, &state)?;
            out.say("Suggestions cleared.")
        }

        Commands::Suggest => {
            let ws = open_workspace(config, state)?;
            if !out.quiet && out.format == OutputFormat::Text {
                println!("Asking for suggestions...");
            }
            let report = ws.generate_suggestions().await?;
            let state = close_workspace(ws, graph)?;
            match report {
                Some(report) => out.emit(&report, || {
                    let mut text = format!(
                        "{} suggestion(s), {} link(s). Review with `scholargraph list --suggestions`.",
                        report.node_count, report.link_count
                    );
                    for node in state.overlay().nodes() {
                        text.push('\n');
                        text.push_str(&commands::describe_node(node));
                    }
                    text
                }),
                None => out.say("Suggestions were superseded by a newer request."),
            }
        }

        Commands::Connect => {
            let ws = open_workspace(config, state)?;
            let report = ws.auto_connect().await?;
            close_workspace(ws, graph)?;
            out.emit(&report, || {
                format!(
                    "Added {} link(s) ({} proposed, {} duplicate, {} skipped)",
                    report.added, report.proposed, report.duplicates, report.skipped
                )
            })
        }

        Commands::Search { query } => {
            let ws = open_workspace(config, state)?;
            let outcome = ws.semantic_search(&query).await?;
            let guard = ws.read().await;
            let nodes = &guard.visible().nodes;
            out.emit(nodes, || match outcome {
                SearchOutcome::Applied { matches: 0 } => "No matches.".to_string(),
                SearchOutcome::Applied { .. } => nodes
                    .iter()
                    .map(commands::describe_node)
                    .collect::<Vec<_>>()
                    .join("\n"),
                SearchOutcome::Superseded => "Search was superseded.".to_string(),
                SearchOutcome::Cleared => "Empty query; semantic search cleared.".to_string(),
            })
        }

        Commands::Ask { question } => {
            let ws = open_workspace(config, state)?;
            let answer = ws.chat(&question).await?;
            out.emit(&serde_json::json!({ "answer": answer }), || answer.clone())
        }

        Commands::Ingest { path } => {
            let document = DocumentSource::from_path(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let ws = open_workspace(config, state)?;
            let report = ws.ingest_document(&document).await?;
            close_workspace(ws, graph)?;
            out.emit(&report, || {
                format!(
                    "Ingested {} as {} with {} element(s)",
                    document.name,
                    report.parent_id,
                    report.child_ids.len()
                )
            })
        }

        Commands::ImageNote { path } => {
            let image = ImageSource::from_path(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let ws = open_workspace(config, state)?;
            let id = ws.add_image_note(&image).await?;
            close_workspace(ws, graph)?;
            out.emit(&serde_json::json!({ "id": id }), || format!("Added note {}", id))
        }

        Commands::Config { .. } | Commands::Doctor => {
            Err(anyhow!("this command does not operate on a graph"))
        }
    }
}

struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    /// Print `value` as JSON, or the text rendering unless quiet
    fn emit<T: Serialize + ?Sized>(
        &self,
        value: &T,
        text: impl FnOnce() -> String,
    ) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => {
                if !self.quiet {
                    println!("{}", text());
                }
            }
        }
        Ok(())
    }

    fn say(&self, message: &str) -> anyhow::Result<()> {
        self.emit(&serde_json::json!({ "message": message }), || message.to_string())
    }
}

fn open_graph(path: &Path, config: &Config) -> anyhow::Result<GraphState> {
    let snapshot = GraphSnapshot::load_or_default(path)
        .with_context(|| format!("Failed to load graph from {}", path.display()))?;
    Ok(snapshot.into_state(config)?)
}

fn save_graph(path: &Path, state: &GraphState) -> anyhow::Result<()> {
    GraphSnapshot::from_state(state)
        .save(path)
        .with_context(|| format!("Failed to save graph to {}", path.display()))
}

fn open_workspace(
    config: &Config,
    state: GraphState,
) -> anyhow::Result<ResearchWorkspace<LlmCollaborator>> {
    let collaborator = LlmCollaborator::from_config(config)?;
    Ok(ResearchWorkspace::new(state, collaborator))
}

fn close_workspace(
    ws: ResearchWorkspace<LlmCollaborator>,
    path: &Path,
) -> anyhow::Result<GraphState> {
    let state = ws
        .into_state()
        .ok_or_else(|| anyhow!("workspace is still shared"))?;
    save_graph(path, &state)?;
    Ok(state)
}

/// `CAS`, `CAS:Q1` or `IF=5.2`
fn parse_badge(raw: &str) -> anyhow::Result<Badge> {
    let raw = raw.trim();
    let badge = if let Some((category, partition)) = raw.split_once(':') {
        Badge::partitioned(category.trim(), partition.trim())
    } else if let Some((category, value)) = raw.split_once('=') {
        Badge::new(category.trim()).with_value(value.trim())
    } else {
        Badge::new(raw)
    };
    if badge.category.is_empty() {
        return Err(anyhow!("Badge '{}' has no category", raw));
    }
    Ok(badge)
}

fn cmd_config(action: ConfigAction, graph: &Path, out: &Output) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !out.quiet {
                println!("Set {} = {}", key, value);
            }
            if key.starts_with("grouping.") {
                regroup_graph(graph, &config, out)?;
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            match out.format {
                OutputFormat::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = items
                        .into_iter()
                        .map(|(k, v)| (k, serde_json::Value::String(v)))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&map)?);
                }
                OutputFormat::Text => {
                    for (key, value) in items {
                        println!("{} = {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !out.quiet {
                println!("Configuration reset to defaults.");
            }
            regroup_graph(graph, &Config::default(), out)?;
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Apply the configured grouping rules to an existing graph file
fn regroup_graph(graph: &Path, config: &Config, out: &Output) -> anyhow::Result<()> {
    if !graph.exists() {
        return Ok(());
    }
    let mut state = open_graph(graph, config)?;
    let changed = state.set_rules(config.grouping.clone());
    if changed > 0 {
        save_graph(graph, &state)?;
        if !out.quiet {
            println!("Regrouped {} node(s) in {}", changed, graph.display());
        }
    }
    Ok(())
}

fn cmd_doctor(graph: &Path, out: &Output) -> anyhow::Result<()> {
    if !out.quiet {
        println!("Scholargraph Health Check");
        println!("=========================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !out.quiet {
                println!("[OK] Configuration: Valid");
            }
            Some(config)
        }
        Err(e) => {
            all_ok = false;
            if !out.quiet {
                println!("[!!] Configuration: Error - {:#}", e);
            }
            None
        }
    };

    if let Some(config) = &config {
        match config.llm.redacted_api_key() {
            Some(redacted) => {
                if !out.quiet {
                    println!("[OK] API Key: Configured ({})", redacted);
                }
            }
            None => {
                all_ok = false;
                if !out.quiet {
                    warn!("API Key: Not configured");
                    println!("[!!] API Key: Not configured");
                    println!("     Set SCHOLARGRAPH_API_KEY or OPENROUTER_API_KEY environment variable");
                }
            }
        }
    }

    if !out.quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: Error - {}", e),
        }
    }

    if graph.exists() {
        let loaded = config
            .as_ref()
            .map(|c| open_graph(graph, c))
            .unwrap_or_else(|| Err(anyhow!("configuration unavailable")));
        match loaded {
            Ok(state) => {
                if !out.quiet {
                    println!(
                        "[OK] Graph: {} ({} nodes, {} links)",
                        graph.display(),
                        state.store().len(),
                        state.store().link_count()
                    );
                }
            }
            Err(e) => {
                all_ok = false;
                if !out.quiet {
                    println!("[!!] Graph: Error - {:#}", e);
                }
            }
        }
    } else if !out.quiet {
        println!("[--] Graph: {} (not created yet)", graph.display());
    }

    if !out.quiet {
        println!();
        if all_ok {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(())
}
