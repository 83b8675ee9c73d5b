//! CLI integration tests for scholargraph
//!
//! Runs the binary end-to-end against a temporary graph file and config dir.
//! Nothing here reaches the network: commands that need the AI collaborator
//! are only checked for their missing-key failure.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn graph(&self) -> PathBuf {
        self.dir.path().join("graph.json")
    }

    /// A command isolated from the user's config, keys and `.env`
    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("scholargraph").unwrap();
        cmd.current_dir(self.dir.path())
            .env("SCHOLARGRAPH_CONFIG_DIR", self.dir.path().join("config"))
            .env_remove("SCHOLARGRAPH_API_KEY")
            .env_remove("OPENROUTER_API_KEY")
            .env("RUST_LOG", "off")
            .arg("--graph")
            .arg(self.graph());
        cmd
    }

    fn add(&self, args: &[&str]) {
        self.cmd().arg("add").args(args).assert().success();
    }

    /// Small library: two ranked papers, one old paper and a note
    fn seeded() -> Self {
        let sandbox = Self::new();
        sandbox.add(&[
            "Hierarchical ensembles",
            "--id",
            "A",
            "--year",
            "2021",
            "--badge",
            "CAS:Q1",
        ]);
        sandbox.add(&[
            "Biomedical imaging survey",
            "--id",
            "B",
            "--year",
            "2015",
            "--badge",
            "CAS:Q2",
        ]);
        sandbox.add(&["Quantum kernels", "--id", "C", "--year", "2009"]);
        sandbox.add(&[
            "Reading notes",
            "--id",
            "N",
            "--kind",
            "note",
            "--content",
            "ensembles to revisit",
        ]);
        sandbox
    }
}

#[test]
fn test_help_lists_commands() {
    Sandbox::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("connect"))
        .stdout(predicate::str::contains("layout"));
}

#[test]
fn test_add_creates_graph_file_with_group() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["add", "Quantum ensembles", "--id", "Q", "--year", "2022"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Added Q [paper] 2022 Quantum ensembles (Ensemble Learning)",
        ));

    let raw = std::fs::read_to_string(sandbox.graph()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["nodes"][0]["id"], "Q");
    assert_eq!(json["nodes"][0]["group"], "Ensemble Learning");
}

#[test]
fn test_duplicate_id_is_rejected() {
    let sandbox = Sandbox::seeded();
    sandbox
        .cmd()
        .args(["add", "Another", "--id", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_unknown_kind_is_rejected() {
    Sandbox::new()
        .cmd()
        .args(["add", "Thing", "--kind", "dataset"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown node kind"));
}

#[test]
fn test_list_partition_filter() {
    Sandbox::seeded()
        .cmd()
        .args(["list", "--partition", "Q1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hierarchical ensembles"))
        .stdout(predicate::str::contains("Biomedical").not());
}

#[test]
fn test_list_text_query_matches_content() {
    Sandbox::seeded()
        .cmd()
        .args(["list", "--query", "ENSEMBLES"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hierarchical ensembles"))
        .stdout(predicate::str::contains("Reading notes"))
        .stdout(predicate::str::contains("Quantum").not());
}

#[test]
fn test_list_older_than_excludes_undated() {
    Sandbox::seeded()
        .cmd()
        .args(["list", "--older-than", "2016", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"B\""))
        .stdout(predicate::str::contains("\"C\""))
        .stdout(predicate::str::contains("\"N\"").not())
        .stdout(predicate::str::contains("\"A\"").not());
}

#[test]
fn test_star_then_list_starred() {
    let sandbox = Sandbox::seeded();
    sandbox
        .cmd()
        .args(["star", "C"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Starred C"));

    sandbox
        .cmd()
        .args(["list", "--starred"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* C [paper] 2009 Quantum kernels"))
        .stdout(predicate::str::contains("Hierarchical").not());
}

#[test]
fn test_star_unknown_node() {
    Sandbox::seeded()
        .cmd()
        .args(["star", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_link_and_show() {
    let sandbox = Sandbox::seeded();
    sandbox
        .cmd()
        .args(["link", "A", "C", "--label", "Extends"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["show", "C"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<- Extends Hierarchical ensembles (A)"));
}

#[test]
fn test_edit_label() {
    let sandbox = Sandbox::seeded();
    sandbox
        .cmd()
        .args(["edit", "N", "--label", "Weekly notes"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["show", "N"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Weekly notes"));
}

#[test]
fn test_edit_requires_a_field() {
    Sandbox::seeded()
        .cmd()
        .args(["edit", "N"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to edit"));
}

#[test]
fn test_remove_drops_links() {
    let sandbox = Sandbox::seeded();
    sandbox.cmd().args(["link", "A", "B"]).assert().success();
    sandbox.cmd().args(["remove", "A"]).assert().success();

    sandbox
        .cmd()
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nodes: 3"))
        .stdout(predicate::str::contains("Links: 0"));
}

#[test]
fn test_stats_json() {
    let output = Sandbox::seeded()
        .cmd()
        .args(["stats", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_nodes"], 4);
    assert_eq!(stats["nodes_by_group"]["Personal Notes"], 1);
    assert_eq!(stats["nodes_by_group"]["CAS Q1"], 1);
}

#[test]
fn test_layout_positions_are_finite() {
    let sandbox = Sandbox::seeded();
    sandbox.cmd().args(["link", "A", "B"]).assert().success();

    let output = sandbox
        .cmd()
        .args(["layout", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let positions: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(positions.len(), 4);
    for p in positions {
        assert!(p["x"].as_f64().unwrap().is_finite());
        assert!(p["y"].as_f64().unwrap().is_finite());
    }
}

#[test]
fn test_layout_on_empty_graph() {
    Sandbox::new()
        .cmd()
        .args(["layout", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_suggest_without_api_key_fails_cleanly() {
    Sandbox::seeded()
        .cmd()
        .arg("suggest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SCHOLARGRAPH_API_KEY"));
}

#[test]
fn test_promote_unknown_suggestion() {
    Sandbox::seeded()
        .cmd()
        .args(["promote", "S"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_invalid_graph_file() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.graph(), "not json").unwrap();
    sandbox
        .cmd()
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a graph snapshot"));
}

#[test]
fn test_config_set_get_and_reset() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "set", "layout.charge", "-450"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["config", "get", "layout.charge"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-450"));

    sandbox.cmd().args(["config", "reset"]).assert().success();
    sandbox
        .cmd()
        .args(["config", "get", "layout.charge"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-300"));
}

#[test]
fn test_config_rejects_api_key() {
    Sandbox::new()
        .cmd()
        .args(["config", "set", "llm.api_key", "sk-secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("environment variable"));
}

#[test]
fn test_config_list_json() {
    let output = Sandbox::new()
        .cmd()
        .args(["config", "list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let map: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(map["search.max_results"], "25");
    assert_eq!(map["grouping.fallback"], "General AI");
}

#[test]
fn test_grouping_keywords_apply_to_new_nodes() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "set", "grouping.keywords", "diffusion,score=Generative Models"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["add", "Score-based diffusion", "--id", "D"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(Generative Models)"));
}

#[test]
fn test_grouping_change_regroups_existing_graph() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["add", "Score-based diffusion", "--id", "D"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(General AI)"));

    sandbox
        .cmd()
        .args(["config", "set", "grouping.keywords", "diffusion=Generative Models"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Regrouped 1 node(s)"));

    sandbox
        .cmd()
        .args(["show", "D"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(Generative Models)"));
}

#[test]
fn test_doctor_reports_missing_key() {
    Sandbox::new()
        .cmd()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[!!] API Key: Not configured"));
}
