use anyhow::{Context as _, Result};
use pipegraph::cli::output::*;
use pipegraph::cli::{Cli, Command};
use pipegraph::cli::commands::{RunCommand, ValidateCommand};
use pipegraph::core::{Context, Mode, RawPipe, Settings};
use pipegraph::execution::PipeEngine;
use pipegraph::services::FixtureSource;
use pipegraph::store::DirectoryPipeStore;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipe(cmd, cli.verbose)?,
        Command::Validate(cmd) => validate_pipe(cmd)?,
    }

    Ok(())
}

fn store_for(pipes_dir: Option<&str>) -> DirectoryPipeStore {
    match pipes_dir {
        Some(dir) => DirectoryPipeStore::new(dir),
        None => DirectoryPipeStore::with_default_path(),
    }
}

fn run_pipe(cmd: &RunCommand, verbose: bool) -> Result<()> {
    let raw = RawPipe::from_file(&cmd.file).context("Failed to load pipe definition")?;

    let mut engine = PipeEngine::new(store_for(cmd.pipes_dir.as_deref()));
    if let Some(path) = &cmd.fixtures {
        let fixtures = FixtureSource::from_file(path).context("Failed to load fixtures")?;
        debug!("Loaded {} fixture feeds from {}", fixtures.feed_count(), path);
        engine = engine.with_fixtures(fixtures);
    }
    engine.add_event_handler(|event| eprintln!("{}", format_engine_event(event)));

    let settings = Settings {
        mode: if cmd.test { Mode::Test } else { Mode::Live },
        verbose,
        inputs: cmd.input.iter().cloned().collect(),
        ..Settings::default()
    };
    let mut ctx = Context::with_settings(settings);

    let graph = match engine.compile(&raw, &mut ctx) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("{} Compilation failed:", CROSS);
            eprintln!("  {}", style(&e).red());
            std::process::exit(1);
        }
    };

    let mut pipeline = engine.run(&graph, &ctx).enumerate();
    let limit = cmd.limit.unwrap_or(usize::MAX);

    let mut items = 0;
    let mut errors = 0;
    while items < limit {
        let Some((position, result)) = pipeline.next() else {
            break;
        };
        match result {
            Ok(item) => {
                println!("{}", format_item(&item));
                items += 1;
            }
            Err(e) => {
                eprintln!("{}", format_item_error(position, &e));
                errors += 1;
                if cmd.fail_fast {
                    error!("Stopping at first item error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    let summary = format!("{} items, {} errors", items, errors);
    if errors == 0 {
        eprintln!("{} {} {}", CHECK, style(graph.id()).bold(), style(summary).green());
    } else {
        eprintln!("{} {} {}", WARN, style(graph.id()).bold(), style(summary).yellow());
    }

    Ok(())
}

fn validate_pipe(cmd: &ValidateCommand) -> Result<()> {
    eprintln!("{} Validating pipe...", INFO);

    let raw = RawPipe::from_file(&cmd.file).context("Failed to load pipe definition")?;
    let engine = PipeEngine::new(store_for(cmd.pipes_dir.as_deref()));
    let mut ctx = Context::default();

    match engine.compile(&raw, &mut ctx) {
        Ok(graph) => {
            if cmd.json {
                let json = serde_json::to_string_pretty(&execution_order_json(&graph))?;
                println!("{}", json);
            } else {
                println!("{} Pipe is valid!", CHECK);
                println!("  Id: {}", style(graph.id()).bold());
                println!("  Modules: {}", style(graph.len()).cyan());
                println!("  Sub-pipes: {}", style(ctx.cached_pipe_ids().join(", ")).cyan());
                println!("  Execution order:");
                println!("{}", format_execution_order(&graph));
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
