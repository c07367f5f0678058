//! `taskgraph decompose` command: turn an architecture file into a task graph.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use taskgraph_core::{Architecture, DecomposeError, Decomposer, Phase};

use crate::config::TaskgraphConfig;
use crate::{show_cmd, store};

/// Run the decompose command.
pub async fn run_decompose(
    config: &TaskgraphConfig,
    architecture_path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let contents = std::fs::read_to_string(architecture_path).with_context(|| {
        format!("failed to read architecture file {}", architecture_path.display())
    })?;
    let architecture = Architecture::from_toml_str(&contents).with_context(|| {
        format!("failed to parse architecture file {}", architecture_path.display())
    })?;

    let generator = config.generator();
    println!("Decomposing architecture: {}", architecture.name);
    println!("  Claude binary: {}", generator.binary());
    if let Some(model) = generator.model() {
        println!("  Model: {model}");
    }
    if !config.decomposer.validate_output {
        println!("  Validation: disabled");
    }

    let decomposer = Decomposer::new(Arc::new(generator)).with_config(config.decomposer.clone());

    // First signal cancels the generation, second force-exits.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));
    let got_first_clone = Arc::clone(&got_first_signal);

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            eprintln!("\nCancelling decomposition (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    let graph = match decomposer.decompose(&cancel, Some(&architecture)).await {
        Ok(graph) => graph,
        Err(DecomposeError::Cancelled) => {
            println!("\nDecomposition cancelled.");
            std::process::exit(130);
        }
        Err(e) => {
            if e.phase() == Some(Phase::Validate) {
                eprintln!("hint: rerun with --no-validate to keep the unvalidated tasks");
            }
            return Err(e).context("decomposition failed");
        }
    };

    println!();
    show_cmd::print_graph(&graph);

    if let Some(path) = output {
        store::save_graph(path, &graph)?;
        println!();
        println!("Task graph written to {}", path.display());
    }

    Ok(())
}
