mod config;
mod decompose_cmd;
mod show_cmd;
mod store;
mod text_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::{CliOverrides, TaskgraphConfig};

#[derive(Parser)]
#[command(
    name = "taskgraph",
    about = "Decompose software architectures into dependency-ordered task graphs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default taskgraph config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Generate a task graph from an architecture TOML file
    Decompose {
        /// Path to the architecture TOML file
        architecture: PathBuf,
        /// Write the task graph as JSON to this path
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Skip validation of the generated tasks
        #[arg(long)]
        no_validate: bool,
        /// Model to request (overrides TASKGRAPH_MODEL and the config file)
        #[arg(long)]
        model: Option<String>,
    },
    /// Parse saved model output and list the tasks found
    Parse {
        /// Model output file (`-` for stdin)
        file: PathBuf,
        /// Print the tasks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report every validation problem in saved model output
    Validate {
        /// Model output file (`-` for stdin)
        file: PathBuf,
    },
    /// Print the execution order and parallel waves for saved model output
    Schedule {
        /// Model output file (`-` for stdin)
        file: PathBuf,
        /// Print the schedule as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a task graph written by `decompose --output`
    Show {
        /// Path to the task graph JSON file
        file: PathBuf,
    },
}

/// Execute the `taskgraph init` command: write config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::default();
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  generation.claude_binary = {}", cfg.generation.claude_binary);
    println!("  decompose.validate_output = {}", cfg.decompose.validate_output);
    println!("  decompose.max_retries = {}", cfg.decompose.max_retries);
    println!();
    println!("Next: run `taskgraph decompose <architecture.toml>`.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Decompose {
            architecture,
            output,
            no_validate,
            model,
        } => {
            let resolved = TaskgraphConfig::resolve(CliOverrides {
                model: model.as_deref(),
                no_validate,
            })?;
            decompose_cmd::run_decompose(&resolved, &architecture, output.as_deref()).await?;
        }
        Commands::Parse { file, json } => {
            text_cmds::run_parse(&file, json)?;
        }
        Commands::Validate { file } => {
            text_cmds::run_validate(&file)?;
        }
        Commands::Schedule { file, json } => {
            text_cmds::run_schedule(&file, json)?;
        }
        Commands::Show { file } => {
            show_cmd::run_show(&file)?;
        }
    }

    Ok(())
}
