//! Schema commands

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{format_json, format_table, OutputFormat};
use crate::AppContext;
use stratigraph_core::{EdgeDirection, EdgeKindDef};

#[derive(Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommands,
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// List edge kinds
    Edges {
        /// Only canonical directions (reverses are omitted)
        #[arg(long)]
        canonical: bool,
    },
    /// List node kinds with their families
    Kinds,
    /// Show one edge kind in detail
    Show {
        /// Edge kind name
        edge: String,
    },
    /// Check whether an edge kind may connect two node kinds
    Check {
        /// Source node kind
        source: String,
        /// Target node kind
        target: String,
        /// Edge kind
        edge: String,
    },
    /// Edge kinds a node kind can take part in
    Sockets {
        /// Node kind
        kind: String,
    },
}

#[derive(Serialize)]
struct CheckOutcome<'a> {
    source: &'a str,
    target: &'a str,
    edge: &'a str,
    admissible: bool,
}

pub fn run(args: &SchemaArgs, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::debug!("Running schema command with schema {}", ctx.schema.version());

    match &args.command {
        SchemaCommands::Edges { canonical } => {
            let defs: Vec<&EdgeKindDef> = ctx
                .schema
                .edge_kind_names(*canonical)
                .into_iter()
                .filter_map(|name| ctx.schema.edge_kind(name))
                .collect();

            match ctx.format {
                OutputFormat::Json => println!("{}", format_json(&defs)?),
                OutputFormat::Table => {
                    let rows: Vec<Vec<String>> = defs
                        .iter()
                        .map(|def| vec![def.name.clone(), def.label.clone(), direction(def)])
                        .collect();
                    println!("{}", format_table(&["edge", "label", "direction"], &rows));
                }
            }
        }
        SchemaCommands::Kinds => {
            let rows: Vec<Vec<String>> = ctx
                .schema
                .node_kinds()
                .map(|def| {
                    let lineage = ctx.schema.lineage(&def.name);
                    vec![def.name.clone(), def.label.clone(), lineage[1..].join(" > ")]
                })
                .collect();

            match ctx.format {
                OutputFormat::Json => {
                    let defs: Vec<_> = ctx.schema.node_kinds().collect();
                    println!("{}", format_json(&defs)?);
                }
                OutputFormat::Table => {
                    println!("{}", format_table(&["kind", "label", "ancestors"], &rows));
                }
            }
        }
        SchemaCommands::Show { edge } => {
            let Some(def) = ctx.schema.edge_kind(edge) else {
                anyhow::bail!("Unknown edge kind: {}", edge);
            };

            match ctx.format {
                OutputFormat::Json => println!("{}", format_json(def)?),
                OutputFormat::Table => {
                    println!("Edge kind: {}", def.name);
                    println!("  Label: {}", def.label);
                    if !def.description.is_empty() {
                        println!("  Description: {}", def.description);
                    }
                    println!("  Direction: {}", direction(def));
                    println!("  Sources: {}", def.sources.join(", "));
                    println!("  Targets: {}", def.targets.join(", "));
                    let mut mapping: Vec<_> = def.mapping.iter().collect();
                    mapping.sort_by(|a, b| a.0.cmp(b.0));
                    for (ontology, term) in mapping {
                        println!("  Mapping {}: {}", ontology, term);
                    }
                }
            }
        }
        SchemaCommands::Check {
            source,
            target,
            edge,
        } => {
            let admissible = ctx.schema.is_admissible(source, target, edge);
            tracing::info!(
                "{} -[{}]-> {}: admissible={}",
                source,
                edge,
                target,
                admissible
            );

            match ctx.format {
                OutputFormat::Json => {
                    let outcome = CheckOutcome {
                        source,
                        target,
                        edge,
                        admissible,
                    };
                    println!("{}", format_json(&outcome)?);
                }
                OutputFormat::Table => {
                    let verdict = if admissible { "admissible" } else { "not admissible" };
                    println!("{} -[{}]-> {}: {}", source, edge, target, verdict);
                    if !admissible && !ctx.schema.edge_exists(edge) {
                        println!("  unknown edge kind '{}'", edge);
                    }
                }
            }

            if !admissible {
                std::process::exit(1);
            }
        }
        SchemaCommands::Sockets { kind } => {
            let sockets = ctx.schema.sockets(kind);

            match ctx.format {
                OutputFormat::Json => println!("{}", format_json(&sockets)?),
                OutputFormat::Table => {
                    let rows: Vec<Vec<String>> = sockets
                        .inputs
                        .iter()
                        .map(|(name, label)| vec!["in".to_string(), name.clone(), label.clone()])
                        .chain(
                            sockets
                                .outputs
                                .iter()
                                .map(|(name, label)| vec!["out".to_string(), name.clone(), label.clone()]),
                        )
                        .collect();
                    println!("{}", format_table(&["socket", "edge", "label"], &rows));
                }
            }
        }
    }

    Ok(())
}

fn direction(def: &EdgeKindDef) -> String {
    match &def.direction {
        EdgeDirection::Symmetric => "symmetric".to_string(),
        EdgeDirection::Canonical { reverse } => format!("canonical (reverse: {})", reverse),
        EdgeDirection::Reverse { canonical } => format!("reverse of {}", canonical),
    }
}
