use clap::Parser;
use flowline::prelude::*;
use serde::Serialize;
use std::fs;

/// Validates a flow file and summarizes every action it declares.
///
/// Exits non-zero if the file fails to parse or any action fails
/// validation, so it can double as a lint step in CI.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the flow file to inspect
    flow_path: String,

    /// Emit the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ActionReport {
    name: String,
    kind: &'static str,
    detail: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let text = fs::read_to_string(&cli.flow_path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read flow file '{}': {}", cli.flow_path, e))
    });
    let store = load(&text).unwrap_or_else(|e| exit_with_error(&e.to_string()));

    let reports: Vec<ActionReport> = store
        .action_names()
        .into_iter()
        .map(|name| describe(&store, name))
        .collect();

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => exit_with_error(&format!("Failed to render JSON: {}", e)),
        }
    } else {
        for report in &reports {
            let verdict = if report.valid { "ok" } else { "INVALID" };
            println!(
                "{:<12} {:<20} {:<8} {}",
                report.kind, report.name, verdict, report.detail
            );
            if let Some(problem) = &report.problem {
                println!("{:>12} {}", "", problem);
            }
        }
        println!("{} action(s) declared", reports.len());
    }

    if reports.iter().any(|report| !report.valid) {
        std::process::exit(1);
    }
}

fn describe(store: &FlowStore, name: &str) -> ActionReport {
    // Every name handed to us came from the store, so resolution can
    // only surface the cross-namespace winner.
    let Ok(resolved) = resolve_action(store, name) else {
        return ActionReport {
            name: name.to_string(),
            kind: "unknown",
            detail: String::new(),
            valid: false,
            problem: Some(format!("'{}' did not resolve", name)),
        };
    };

    let detail = match resolved {
        Resolved::Node(node) if node.merge_stderr => format!("{} (2>&1)", node.command),
        Resolved::Node(node) => node.command.clone(),
        Resolved::Pipe(pipe) => format!("{} | {}", pipe.from, pipe.to),
        Resolved::Concatenate(concatenate) => concatenate.parts.join(" + "),
        Resolved::File(file) => file.path.clone(),
    };
    let problem = validate(store, name).err().map(|e| e.to_string());

    ActionReport {
        name: name.to_string(),
        kind: resolved.kind(),
        detail,
        valid: problem.is_none(),
        problem,
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
