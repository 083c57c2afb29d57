//! Command-line front end: run one generation pass over a project file.
//!
//! ```bash
//! storyforge story.json --connect s1 s4 --mock
//! ```

use std::error::Error;
use std::sync::Arc;
use storyforge_core::analysis::analyze_branch;
use storyforge_core::headless::{HeadlessConfig, HeadlessRunner};
use storyforge_core::store::JsonFileStore;
use storyforge_core::testing::MockGenerator;
use storyforge_core::{analyze_structure, ConnectionChange, GenerationService};
use tracing_subscriber::EnvFilter;

struct CliArgs {
    project: String,
    edits: Vec<ConnectionChange>,
    mock: bool,
    dry_run: bool,
    analyze: bool,
    stories: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut project = None;
    let mut edits = Vec::new();
    let (mut mock, mut dry_run, mut analyze, mut stories) = (false, false, false, false);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            flag @ ("--connect" | "--disconnect") => {
                let (Some(from), Some(to)) = (args.get(i + 1), args.get(i + 2)) else {
                    return Err(format!("{flag} needs <FROM> <TO>"));
                };
                edits.push(if flag == "--connect" {
                    ConnectionChange::added(from.as_str(), to.as_str())
                } else {
                    ConnectionChange::removed(from.as_str(), to.as_str())
                });
                i += 2;
            }
            "--mock" => mock = true,
            "--dry-run" => dry_run = true,
            "--analyze" => analyze = true,
            "--stories" => stories = true,
            other if other.starts_with("--") => return Err(format!("unknown option {other}")),
            path => {
                if project.replace(path.to_string()).is_some() {
                    return Err("only one project file may be given".to_string());
                }
            }
        }
        i += 1;
    }

    Ok(CliArgs {
        project: project.ok_or("missing <PROJECT.json>")?,
        edits,
        mock,
        dry_run,
        analyze,
        stories,
    })
}

fn print_help() {
    println!("storyforge - branching story generation");
    println!();
    println!("USAGE:");
    println!("  storyforge <PROJECT.json> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --connect <FROM> <TO>      Add a connection before the pass");
    println!("  --disconnect <FROM> <TO>   Remove a connection before the pass");
    println!("  --mock                     Use the offline mock generator");
    println!("  --dry-run                  Do not write results back");
    println!("  --stories                  Print every assembled story");
    println!("  --analyze                  Print narrative analysis of the main branch");
    println!("  -h, --help                 Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("  ANTHROPIC_API_KEY          Required unless --mock is given");
    println!("  STORYFORGE_*               Engine settings (model, timeouts, concurrency, cache)");
    println!("  RUST_LOG                   Log filter (default storyforge_core=info)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyforge_core=info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("Run with --help for usage.");
            std::process::exit(2);
        }
    };

    let config = HeadlessConfig::from_env()?.with_dry_run(cli.dry_run);
    let generator: Arc<dyn GenerationService> = if cli.mock {
        Arc::new(MockGenerator::new())
    } else {
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
            eprintln!("Set it in a .env file, or pass --mock to run offline.");
            std::process::exit(1);
        }
        config.claude_generator()?
    };

    let store = Arc::new(JsonFileStore::open(&cli.project).await?);
    let mut runner = HeadlessRunner::new(store, generator, config);
    let report = runner.run_pass(&cli.edits).await?;

    for edit in &report.skipped {
        println!("[SKIPPED] {} -> {} had no effect", edit.from_id, edit.to_id);
    }
    for line in report.outcome.insights.messages() {
        println!("[INSIGHT] {line}");
    }
    if cli.dry_run {
        println!("[DRY RUN] nothing written");
    } else {
        println!("[SAVED] {} scene(s) written to {}", report.committed, cli.project);
    }

    if cli.stories {
        for story in &report.outcome.generated_stories {
            let marker = if story.metadata.is_main { " (main)" } else { "" };
            println!();
            println!("=== {}{marker} ===", story.title);
            println!(
                "{} words, ~{} min, {} / {}",
                story.word_count, story.reading_time_minutes, story.metadata.genre.name, story.metadata.tone.name
            );
            println!();
            println!("{}", story.full_text);
        }
    }

    if cli.analyze {
        let structure = analyze_structure(&report.outcome.updated_scenes);
        match analyze_branch(&structure.main_branch) {
            Ok(dna) => {
                println!();
                println!("{}", serde_json::to_string_pretty(&dna)?);
            }
            Err(e) => println!("[ANALYSIS] {e}"),
        }
    }

    Ok(())
}
