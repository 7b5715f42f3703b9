use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use merge_core::{merge, Addressable, DefaultConflictHandler, HtmlContent, HtmlNodeMerger, Mutable, MutableTree, Traversable};
use serde::{Deserialize, Serialize};

/// One node of the preorder JSON tree format merge-cli reads and writes.
/// This shape is a CLI-only convenience, per SPEC_FULL.md §6.4 — it is not
/// a `merge-core` wire format.
#[derive(Debug, Serialize, Deserialize)]
struct JsonNode {
    id: String,
    parent: Option<String>,
    content: HtmlContent,
}

#[derive(Parser)]
#[command(name = "merge-cli", about = "Three-way merge of JSON-encoded trees")]
struct Cli {
    base: PathBuf,
    first: PathBuf,
    second: PathBuf,
    /// Where to write the merged tree; stdout if omitted.
    out: Option<PathBuf>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn read_tree(path: &Path) -> Result<MutableTree<String, HtmlContent>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let nodes: Vec<JsonNode> =
        serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON tree", path.display()))?;

    let mut tree = MutableTree::new();
    for n in nodes {
        tree.insert(n.content, n.id, n.parent, None)
            .with_context(|| format!("building tree from {}", path.display()))?;
    }
    Ok(tree)
}

fn preorder_nodes(tree: &MutableTree<String, HtmlContent>) -> Vec<JsonNode> {
    let mut out = Vec::new();
    let mut stack: Vec<String> = tree.root().into_iter().cloned().collect();
    while let Some(id) = stack.pop() {
        let node = tree.get(&id).expect("id came from the tree itself");
        out.push(JsonNode {
            id: id.clone(),
            parent: node.parent().cloned(),
            content: node.content().clone(),
        });
        stack.extend(node.children().iter().rev().cloned());
    }
    out
}

fn write_tree(out: Option<&Path>, tree: &MutableTree<String, HtmlContent>) -> Result<()> {
    let nodes = preorder_nodes(tree);
    let json = serde_json::to_string_pretty(&nodes)?;
    match out {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let base = read_tree(&cli.base)?;
    let first = read_tree(&cli.first)?;
    let second = read_tree(&cli.second)?;

    let node_merger = HtmlNodeMerger::default();
    let mut conflict_handler = DefaultConflictHandler;

    match merge(&base, &first, &second, &node_merger, &mut conflict_handler) {
        Ok((merged, origins)) => {
            let nodes = preorder_nodes(&merged).len();
            tracing::info!(nodes, "merge succeeded");
            let _ = origins;
            write_tree(cli.out.as_deref(), &merged)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("conflict: {err}");
            Ok(ExitCode::from(1))
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
