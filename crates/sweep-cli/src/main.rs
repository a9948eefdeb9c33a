//! AdSweep CLI
//!
//! Inspect the built-in selector catalog, validate selector lists and print
//! default settings.

use std::fs;

use clap::{Parser, Subcommand};

use sweep_core::catalog::{self, GROUPS};
use sweep_core::selector::{Selector, SelectorError, SelectorSet};
use sweep_core::{ExtensionConfig, Settings};

#[derive(Parser)]
#[command(name = "sweep-cli")]
#[command(about = "AdSweep selector catalog and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the built-in selector catalog
    Selectors {
        /// Only this group (ads, skip, close, presence, video)
        #[arg(short, long)]
        group: Option<String>,

        /// Print as a hiding stylesheet
        #[arg(long)]
        css: bool,
    },

    /// Validate selector list files, one selector per line
    Check {
        /// Selector list files
        #[arg(short, long, required = true)]
        input: Vec<String>,
    },

    /// Print default settings and runtime configuration
    Defaults,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Selectors { group, css } => cmd_selectors(group.as_deref(), css),
        Commands::Check { input } => cmd_check(&input),
        Commands::Defaults => cmd_defaults(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_selectors(group: Option<&str>, css: bool) -> Result<(), String> {
    let groups: Vec<(&str, &[&str])> = match group {
        Some(name) => {
            let sources = catalog::group(name).ok_or_else(|| {
                let known: Vec<_> = GROUPS.iter().map(|(name, _)| *name).collect();
                format!("Unknown group '{}' (expected one of: {})", name, known.join(", "))
            })?;
            vec![(name, sources)]
        }
        None => GROUPS.to_vec(),
    };

    for (name, sources) in groups {
        let set = SelectorSet::parse(sources.iter().copied())
            .map_err(|e| format!("Built-in group '{}' is invalid: {}", name, e))?;
        if css {
            println!("/* {} */", name);
            println!("{}", stylesheet(&set));
        } else {
            println!("{} ({}):", name, set.len());
            for selector in set.iter() {
                println!("  {}", selector);
            }
        }
    }

    Ok(())
}

fn cmd_check(inputs: &[String]) -> Result<(), String> {
    let mut failures = 0usize;

    for path in inputs {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;

        let report = check_list(&content);
        for (line, error) in &report.errors {
            println!("{}:{}: {}", path, line, error);
        }
        println!(
            "'{}': {} valid, {} invalid",
            path,
            report.valid.len(),
            report.errors.len()
        );
        failures += report.errors.len();
    }

    if failures > 0 {
        return Err(format!("{} invalid selectors", failures));
    }
    Ok(())
}

fn cmd_defaults() -> Result<(), String> {
    let settings = serde_json::to_string_pretty(&Settings::default())
        .map_err(|e| format!("Failed to encode settings: {}", e))?;
    let config = serde_json::to_string_pretty(&ExtensionConfig::default())
        .map_err(|e| format!("Failed to encode config: {}", e))?;

    println!("Settings:");
    println!("{}", settings);
    println!();
    println!("Config:");
    println!("{}", config);
    Ok(())
}

/// `a, b { display: none !important; }`
fn stylesheet(set: &SelectorSet) -> String {
    format!("{} {{ display: none !important; }}", set.css())
}

struct ListReport {
    valid: Vec<Selector>,
    /// 1-based line number and error
    errors: Vec<(usize, SelectorError)>,
}

/// Parse a selector list. Blank lines and `!` comments are skipped.
fn check_list(content: &str) -> ListReport {
    let mut report = ListReport {
        valid: Vec::new(),
        errors: Vec::new(),
    };

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }
        match Selector::parse(line) {
            Ok(selector) => report.valid.push(selector),
            Err(e) => report.errors.push((index + 1, e)),
        }
    }

    report
}
