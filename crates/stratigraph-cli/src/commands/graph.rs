//! Graph commands: load JSON graph documents and query them

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};

use crate::output::{format_json, format_table, OutputFormat};
use crate::AppContext;
use stratigraph_core::{
    Direction, Edge, Error, Graph, GraphMetadata, GraphRegistry, GraphStats, MergeReport, Node,
    ParadataChain, Schema, TraversalQuery,
};

#[derive(Args)]
pub struct GraphArgs {
    #[command(subcommand)]
    pub command: GraphCommands,
}

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Load graph documents, validating every edge
    Load {
        /// Graph documents (JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Reject a document's edges entirely if any edge is invalid
        #[arg(long)]
        strict: bool,
        /// Merge every other loaded graph into this one
        #[arg(long)]
        merge_into: Option<String>,
    },
    /// Show the paradata chain of a node
    Chain {
        /// Graph document (JSON)
        file: PathBuf,
        /// Start node id
        node: String,
        /// Maximum number of hops
        #[arg(short, long)]
        depth: Option<u32>,
    },
    /// Find the shortest path between two nodes
    Path {
        /// Graph document (JSON)
        file: PathBuf,
        /// Start node id
        from: String,
        /// Target node id
        to: String,
        /// Only follow edges in their stored direction
        #[arg(long)]
        directed: bool,
        /// Maximum number of hops
        #[arg(short, long, default_value = "10")]
        depth: u32,
    },
}

/// A graph as exchanged in JSON files
#[derive(Debug, Serialize, Deserialize)]
pub struct GraphDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: GraphMetadata,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphDocument {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let doc = serde_json::from_str(&content)
            .with_context(|| format!("Invalid graph document {}", path.display()))?;
        Ok(doc)
    }

    /// Build a graph, reporting edges that failed validation
    pub fn into_graph(self, schema: Arc<Schema>, strict: bool) -> anyhow::Result<(Graph, Vec<FailedEdge>)> {
        let mut metadata = self.metadata;
        metadata.name = self.name.or(metadata.name);
        metadata.description = self.description.or(metadata.description);

        let mut graph = Graph::with_schema(self.id, schema).with_metadata(metadata);
        graph.add_nodes_batch(self.nodes);

        let failed = if strict {
            match graph.add_edges_batch_strict(self.edges) {
                Ok(_) => Vec::new(),
                Err(Error::BatchRejected { failures }) => {
                    let details: Vec<String> = failures
                        .iter()
                        .map(|(edge, reason)| format!("  {}: {}", edge, reason))
                        .collect();
                    anyhow::bail!(
                        "Graph {}: {} edge(s) rejected, nothing applied\n{}",
                        graph.id(),
                        failures.len(),
                        details.join("\n")
                    );
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            graph
                .add_edges_batch(self.edges)
                .failed
                .into_iter()
                .map(|(edge, reason)| FailedEdge {
                    edge: edge.to_string(),
                    reason: reason.to_string(),
                })
                .collect()
        };

        Ok((graph, failed))
    }
}

#[derive(Debug, Serialize)]
pub struct FailedEdge {
    pub edge: String,
    pub reason: String,
}

#[derive(Serialize)]
struct LoadSummary<'a> {
    id: &'a str,
    name: &'a str,
    stats: GraphStats,
    failed_edges: &'a [FailedEdge],
    warnings: &'a [String],
}

#[derive(Serialize)]
struct MergeSummary<'a> {
    source: &'a str,
    target: &'a str,
    #[serde(flatten)]
    report: MergeReport,
}

fn load_graph(path: &Path, ctx: &AppContext, strict: bool) -> anyhow::Result<(Graph, Vec<FailedEdge>)> {
    tracing::info!("Loading graph document {:?}", path);
    GraphDocument::read(path)?.into_graph(Arc::clone(&ctx.schema), strict)
}

pub fn run(args: &GraphArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        GraphCommands::Load {
            files,
            strict,
            merge_into,
        } => run_load(files, *strict || ctx.config.strict_batches, merge_into.as_deref(), ctx),
        GraphCommands::Chain { file, node, depth } => {
            let (graph, _) = load_graph(file, ctx, false)?;
            let depth = depth.unwrap_or(ctx.config.paradata_depth);
            let chain = graph.paradata_chain_with_depth(node, depth)?;
            print_chain(&chain, ctx.format)
        }
        GraphCommands::Path {
            file,
            from,
            to,
            directed,
            depth,
        } => {
            let (graph, _) = load_graph(file, ctx, false)?;
            let direction = if *directed { Direction::Outgoing } else { Direction::Both };
            let query = TraversalQuery::new(from.as_str())
                .find_path_to(to.as_str())
                .with_direction(direction)
                .with_depth(*depth);
            let result = graph.traverse(&query)?;

            match ctx.format {
                OutputFormat::Json => println!("{}", format_json(&result)?),
                OutputFormat::Table => match &result.path {
                    Some(path) => {
                        println!("Path from {} to {} ({} hops):", from, to, path.length);
                        for edge in &path.edges {
                            println!("  {} -[{}]-> {}", edge.from, edge.kind, edge.to);
                        }
                    }
                    None => println!("No path from {} to {} within {} hops", from, to, depth),
                },
            }
            Ok(())
        }
    }
}

fn run_load(files: &[PathBuf], strict: bool, merge_into: Option<&str>, ctx: &AppContext) -> anyhow::Result<()> {
    let mut registry = GraphRegistry::new();
    let mut failures = Vec::new();

    for file in files {
        let (graph, failed) = load_graph(file, ctx, strict)?;
        registry.register(graph)?;
        failures.push(failed);
    }

    let mut merges = Vec::new();
    if let Some(target) = merge_into {
        registry.get(target)?;
        let sources: Vec<String> = registry
            .list_ids()
            .into_iter()
            .filter(|id| *id != target)
            .map(str::to_string)
            .collect();
        for source in sources {
            let report = registry.merge(target, &source)?;
            merges.push((source, report));
        }
    }

    match ctx.format {
        OutputFormat::Json => {
            let graphs: Vec<LoadSummary> = registry
                .iter()
                .zip(&failures)
                .map(|(graph, failed)| LoadSummary {
                    id: graph.id(),
                    name: graph.name(),
                    stats: graph.stats(),
                    failed_edges: failed,
                    warnings: graph.warnings(),
                })
                .collect();
            let merged: Vec<MergeSummary> = merges
                .iter()
                .map(|(source, report)| MergeSummary {
                    source,
                    target: merge_into.unwrap_or_default(),
                    report: report.clone(),
                })
                .collect();
            println!(
                "{}",
                format_json(&serde_json::json!({ "graphs": graphs, "merges": merged }))?
            );
        }
        OutputFormat::Table => {
            for (graph, failed) in registry.iter().zip(&failures) {
                print_graph(graph, failed);
            }
            for (source, report) in &merges {
                println!(
                    "Merged {} into {}: {} nodes added ({} skipped), {} edges added ({} skipped, {} failed)",
                    source,
                    merge_into.unwrap_or_default(),
                    report.nodes_added,
                    report.nodes_skipped,
                    report.edges_added,
                    report.edges_skipped,
                    report.edges_failed
                );
            }
        }
    }

    Ok(())
}

fn print_graph(graph: &Graph, failed: &[FailedEdge]) {
    let stats = graph.stats();
    println!(
        "Graph {} ({}): {} nodes, {} edges",
        graph.id(),
        graph.name(),
        stats.nodes,
        stats.edges
    );

    let rows: Vec<Vec<String>> = stats
        .nodes_by_kind
        .iter()
        .map(|(kind, count)| vec!["node".to_string(), kind.clone(), count.to_string()])
        .chain(
            stats
                .edges_by_kind
                .iter()
                .map(|(kind, count)| vec!["edge".to_string(), kind.clone(), count.to_string()]),
        )
        .collect();
    if !rows.is_empty() {
        println!("{}", format_table(&["type", "kind", "count"], &rows));
    }

    if !failed.is_empty() {
        println!("Failed edges ({}):", failed.len());
        for f in failed {
            println!("  {}: {}", f.edge, f.reason);
        }
    }

    let warnings = graph.warnings();
    if !warnings.is_empty() {
        println!("Warnings ({}):", warnings.len());
        for w in warnings {
            println!("  - {}", w);
        }
    }
    println!();
}

fn print_chain(chain: &ParadataChain<'_>, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", format_json(chain)?);
        return Ok(());
    }

    println!("Paradata chain of {}:", chain.start);
    if chain.is_empty() {
        println!("  (no documentation)");
        return Ok(());
    }

    for (title, bucket) in [
        ("Properties", &chain.properties),
        ("Combiners", &chain.combiners),
        ("Extractors", &chain.extractors),
        ("Documents", &chain.documents),
    ] {
        if bucket.is_empty() {
            continue;
        }
        println!("  {}:", title);
        for node in bucket.iter() {
            if node.name == node.id.as_str() {
                println!("    - {}", node.id);
            } else {
                println!("    - {} ({})", node.id, node.name);
            }
        }
    }
    Ok(())
}
