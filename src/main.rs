use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kgenv::{Config, GrapherOptions, RelationEntityGrapher, Vocab};
use std::path::PathBuf;

/// Build the knowledge-graph action space and inspect it.
#[derive(Parser, Debug)]
#[command(name = "kgenv", version)]
struct Cli {
    /// Config file (default: $KGENV_CONFIG or ./config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the action table and report graph statistics (default).
    Build {
        /// Override graph.max_branching.
        #[arg(long)]
        max_branching: Option<usize>,
        /// Override graph.seed.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the action row of an entity.
    Actions {
        /// Entity name as it appears in the entity vocabulary.
        #[arg(long)]
        entity: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.kgenv.log_level.as_str()),
    )
    .init();

    match cli.command.unwrap_or(Command::Build {
        max_branching: None,
        seed: None,
    }) {
        Command::Build {
            max_branching,
            seed,
        } => {
            let mut options = config.graph()?.options();
            if let Some(max_branching) = max_branching {
                options.max_branching = max_branching;
            }
            if seed.is_some() {
                options.seed = seed;
            }
            let grapher = build_grapher(&config, &options)?;
            report(&grapher);
            verify_action_table(&grapher)?;
        }
        Command::Actions { entity } => {
            let options = config.graph()?.options();
            let grapher = build_grapher(&config, &options)?;
            let actions = grapher.actions_for_name(&entity)?;
            if actions.is_empty() {
                println!("{} has no outgoing actions", entity);
            }
            for (slot, (target, relation)) in actions.iter().enumerate() {
                println!("{:>4}  {:<30} {}", slot, relation, target);
            }
        }
    }

    Ok(())
}

fn build_grapher(config: &Config, options: &GrapherOptions) -> Result<RelationEntityGrapher> {
    log::info!("Starting kgenv v{}", env!("CARGO_PKG_VERSION"));
    let graph = config.graph()?;

    let entities = Vocab::load("entity", &graph.entity_vocab)
        .with_context(|| format!("Failed to load {}", graph.entity_vocab.display()))?;
    let relations = Vocab::load("relation", &graph.relation_vocab)
        .with_context(|| format!("Failed to load {}", graph.relation_vocab.display()))?;

    let grapher = RelationEntityGrapher::build(&graph.triple_file, entities, relations, options)
        .with_context(|| format!("Failed to build graph from {}", graph.triple_file.display()))?;
    Ok(grapher)
}

fn report(grapher: &RelationEntityGrapher) {
    let relations = grapher.relation_vocab();
    let graph = grapher.graph();

    println!("\n=== Knowledge Graph ===\n");
    println!("Entities:        {}", grapher.entity_vocab().len());
    println!("Relations:       {}", relations.len());
    println!("Paired relations: {}", grapher.paired_relations().len() / 2);
    println!("Edges:           {}", graph.edge_count());
    println!("Source nodes:    {}", graph.source_nodes().count());

    println!("\n{:-<50}", "");
    println!("{:<30} {:>8} {:>10}", "Relation", "Edges", "Removed");
    println!("{:-<50}", "");
    let removed = grapher.reduction_report().map(|r| &r.removed);
    for (relation, count) in graph.relation_counts() {
        let name = relations.name(relation).unwrap_or("?");
        let dropped = removed.and_then(|r| r.get(&relation)).copied().unwrap_or(0);
        println!("{:<30} {:>8} {:>10}", name, count, dropped);
    }
    println!("{:-<50}", "");

    if let Some(reduction) = grapher.reduction_report() {
        println!(
            "\nClass threshold {}: {} edges removed",
            reduction.threshold,
            reduction.total_removed()
        );
    }

    let capacity = grapher.capacity_report();
    println!("\nAction table: {} x {}", grapher.table().num_rows(), grapher.table().width());
    if capacity.is_empty() {
        println!("  All outgoing edges fit within max_branching {}", capacity.max_branching);
    } else {
        println!(
            "  {} entities exceed max_branching {} ({} edges dropped)",
            capacity.truncated.len(),
            capacity.max_branching,
            capacity.total_dropped()
        );
        let mut worst = capacity.truncated.clone();
        worst.sort_by(|a, b| b.dropped.cmp(&a.dropped));
        for node in worst.iter().take(10) {
            let name = grapher.entity_vocab().name(node.entity).unwrap_or("?");
            println!("    {:<30} degree {:>6}, dropped {:>6}", name, node.out_degree, node.dropped);
        }
    }
    println!();
}

/// Check the stay-action and width invariants on every row.
fn verify_action_table(grapher: &RelationEntityGrapher) -> Result<()> {
    let table = grapher.table();
    let graph = grapher.graph();
    let no_op = table.tokens().no_op;

    for source in graph.source_nodes() {
        let row = table.row(source)?;
        if row[0].entity != source || row[0].relation != no_op {
            anyhow::bail!("entity {} slot 0 is not the stay action", source);
        }
        let filled = table.filled_slots(source)?;
        let bound = (graph.out_degree(source) + 1).min(table.width());
        if filled > bound {
            anyhow::bail!("entity {} has {} actions, expected at most {}", source, filled, bound);
        }
    }
    log::info!("✓ Action table verified");
    Ok(())
}
