//! Weave CLI - inspect, validate, and rewrite flow documents

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use walkdir::WalkDir;

use weave::{
    extract_agent_variables, extract_variables, traverse_flow, validate_flow, FixSuggestion,
    Flow, WeaveError,
};

#[derive(Parser)]
#[command(name = "weave")]
#[command(about = "Weave - flow graph orchestration engine for agent pipelines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a flow document, or every .json flow under a directory
    Validate {
        /// Path to a flow .json file or a directory of them
        path: String,
    },

    /// Print agent execution order and connectivity for a flow
    Order {
        /// Path to a flow .json file
        file: String,
    },

    /// Extract template variables from a template file
    Vars {
        /// Path to a template text file
        file: String,

        /// Comma-separated known agent names; prints the agent projection
        #[arg(short, long)]
        agents: Option<String>,
    },

    /// Rename an agent across a flow document (rewritten JSON on stdout)
    Rename {
        /// Path to a flow .json file
        file: String,
        old: String,
        new: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { path } => validate_path(&path),
        Commands::Order { file } => print_order(&file),
        Commands::Vars { file, agents } => print_vars(&file, agents.as_deref()),
        Commands::Rename { file, old, new } => rename_agent(&file, &old, &new),
    };

    match result {
        Ok(clean) => {
            if !clean {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(suggestion) = e
                .downcast_ref::<WeaveError>()
                .and_then(|we| we.fix_suggestion())
            {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

fn load_flow(file: &str) -> Result<Flow> {
    let json = fs::read_to_string(file)
        .with_context(|| format!("Failed to read flow file {:?}", file))?;
    let flow = Flow::from_json(&json).map_err(WeaveError::from)?;
    Ok(flow)
}

/// Returns Ok(false) when any file had validation errors
fn validate_path(path: &str) -> Result<bool> {
    let path = Path::new(path);
    let files: Vec<std::path::PathBuf> = if path.is_dir() {
        WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .map(|e| e.into_path())
            .collect()
    } else {
        vec![path.to_path_buf()]
    };

    let mut clean = true;
    for file in files {
        let display = file.display().to_string();
        let flow = match load_flow(&display) {
            Ok(flow) => flow,
            Err(e) => {
                println!("{} {}: {:#}", "✗".red(), display, e);
                clean = false;
                continue;
            }
        };

        let result = validate_flow(&flow);
        if result.is_valid() {
            println!(
                "{} {} ({} nodes, {} edges)",
                "✓".green(),
                display,
                flow.nodes.len(),
                flow.edges.len()
            );
        } else {
            println!("{} {}", "✗".red(), display);
            clean = false;
        }
        for error in &result.errors {
            println!("  {} {}", "error:".red(), error);
            if let Some(suggestion) = error.suggestion() {
                println!("    {} {}", "fix:".yellow(), suggestion);
            }
        }
        for warning in &result.warnings {
            println!("  {} {}", "warning:".yellow(), warning);
        }
    }

    Ok(clean)
}

fn print_order(file: &str) -> Result<bool> {
    let flow = load_flow(file)?;
    let result = traverse_flow(&flow);

    let status = if result.has_valid_flow {
        "valid".green()
    } else {
        "invalid".red()
    };
    println!("Flow: {} ({} agents)", status, result.agents.len());

    for agent in &result.agents {
        let slot = if agent.position >= 0 {
            format!("#{}", agent.position).cyan()
        } else {
            "--".dimmed()
        };
        let start = connectivity(agent.is_connected_to_start);
        let end = connectivity(agent.is_connected_to_end);
        println!(
            "  {} {} (depth {}, start {}, end {})",
            slot, agent.agent_id, agent.depth, start, end
        );
    }

    Ok(true)
}

fn connectivity(connected: bool) -> colored::ColoredString {
    if connected {
        "✓".green()
    } else {
        "✗".red()
    }
}

fn print_vars(file: &str, agents: Option<&str>) -> Result<bool> {
    let template = fs::read_to_string(file)
        .with_context(|| format!("Failed to read template file {:?}", file))?;

    for variable in extract_variables(&template) {
        println!("{}", variable);
    }

    if let Some(agents) = agents {
        let known: HashSet<String> = agents
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        let referenced = extract_agent_variables(&template, Some(&known));
        println!();
        println!("{}", "Agents referenced:".cyan().bold());
        for agent in referenced {
            println!("{}", agent);
        }
    }

    Ok(true)
}

fn rename_agent(file: &str, old: &str, new: &str) -> Result<bool> {
    let mut flow = load_flow(file)?;
    flow.rename_agent(old, new);
    println!("{}", flow.to_json().map_err(WeaveError::from)?);
    Ok(true)
}
