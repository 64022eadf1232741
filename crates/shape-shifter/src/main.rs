use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

/// Local CLI front-end for the core, for manual testing against a project
/// file without a host application.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the project's YAML definition.
    #[clap(long, env = "SHAPE_SHIFTER_PROJECT")]
    project: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dependency graph's topological order, or its cycles.
    Graph,
    /// Run the Normalizer over the whole project and print per-entity stats.
    Normalize,
    /// Preview a single entity.
    Preview {
        entity: String,
        #[clap(long, default_value = "1000")]
        limit: usize,
    },
    /// Run the Validation Engine.
    Validate {
        #[clap(long, value_enum, default_value = "structural")]
        mode: ValidationModeArg,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ValidationModeArg {
    Structural,
    DataSample,
    DataComplete,
}

impl From<ValidationModeArg> for validation::ValidationMode {
    fn from(mode: ValidationModeArg) -> Self {
        match mode {
            ValidationModeArg::Structural => validation::ValidationMode::Structural,
            ValidationModeArg::DataSample => validation::ValidationMode::DataSample,
            ValidationModeArg::DataComplete => validation::ValidationMode::DataComplete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    let yaml = std::fs::read_to_string(&args.project)?;
    let project: model::Project = serde_yaml::from_str(&yaml)?;
    let ctx = shape_shifter::RunContext::default();

    match args.command {
        Command::Graph => {
            let graph = shape_shifter::build_graph(&project);
            if graph.has_cycles() {
                for cycle in &graph.cycles {
                    println!("cycle: {cycle:?}");
                }
            } else {
                println!("{:?}", graph.topo_order.unwrap_or_default());
            }
        }
        Command::Normalize => {
            let result = shape_shifter::normalize(&project, shape_shifter::NormalizeOptions::default(), &ctx).await?;
            for (name, stats) in &result.per_entity_stats {
                println!("{name:?}: {:?} ({} rows, {} ms)", stats.state, stats.row_count, stats.elapsed_ms);
            }
            for issue in &result.issues {
                println!("{:?} {}: {}", issue.severity, issue.code, issue.message);
            }
        }
        Command::Preview { entity, limit } => {
            let entity = model::EntityName::new(entity);
            let artifact = shape_shifter::preview_entity(&project, &entity, limit, &ctx).await?;
            println!(
                "{} rows ({}{})",
                artifact.table.len(),
                artifact.total_rows,
                if artifact.truncated { ", truncated" } else { "" }
            );
        }
        Command::Validate { mode } => {
            let issues = shape_shifter::validate(&project, mode.into(), &ctx).await;
            for issue in &issues {
                println!("{:?} {}: {}", issue.severity, issue.code, issue.message);
            }
        }
    }

    Ok(())
}
