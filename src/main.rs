use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde_json::json;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use mimic::batch::{BatchQueue, BatchReport, QueueKey, run_queues};
use mimic::domain::{EnrichmentTable, JobState, JobStatus, RefinementOption, SourceRecord, parse_table};
use mimic::enrich::find_enrichment;
use mimic::extract::SourceExtractor;
use mimic::id::{PromptId, RunId};
use mimic::orchestrator::{JobOrchestrator, JobOutcome, RunKind, SourceListOutput};
use mimic::remote::{HttpPipelineApi, PipelineApi, RemoteStatus};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimic")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("mimic.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::new();
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    // RUST_LOG wins over the configured level
    builder.parse_default_env();
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let extractor = SourceExtractor::with_exclusions(config.extract.exclusions()?);

    match &cli.command {
        Commands::Extract {
            input,
            enrichments,
            json,
        } => handle_extract_command(input, enrichments.as_deref(), *json, &extractor),
        Commands::Generate { prompt_id, json } => {
            handle_generate_command(*prompt_id, *json, config, &extractor).await
        }
        Commands::Batch {
            stories,
            picks,
            refinements,
            json,
        } => handle_batch_command(stories, picks, refinements, *json, config, &extractor).await,
    }
}

fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(input).context(format!("Failed to read {}", input.display()))
}

fn pipeline_api(config: &Config) -> Result<Arc<HttpPipelineApi>> {
    let api = HttpPipelineApi::new(config.api.http_settings()).context("Failed to create pipeline client")?;
    Ok(Arc::new(api))
}

fn records_json(records: &[SourceRecord], enrichments: &EnrichmentTable) -> serde_json::Value {
    let records: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            json!({
                "index": r.index,
                "label": r.label,
                "body": r.body,
                "enrichment": find_enrichment(&r.body, enrichments),
            })
        })
        .collect();
    json!(records)
}

fn print_records(records: &[SourceRecord], enrichments: &EnrichmentTable) {
    for record in records {
        println!("{} {}", format!("[{}]", record.index).cyan(), record.label);
        if let Some(enrichment) = find_enrichment(&record.body, enrichments) {
            let date = enrichment
                .created_on()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default();
            println!("    {} {}{}", enrichment.kind().dimmed(), enrichment.url(), date);
        }
    }
}

/// Print sources, or the raw text when no format was recognized
fn show_sources(text: &str, enrichments: &EnrichmentTable, as_json: bool, extractor: &SourceExtractor) -> Result<()> {
    let extraction = extractor.extract_with_format(text);
    if as_json {
        let records = extraction.map(|e| e.records).unwrap_or_default();
        println!("{}", serde_json::to_string_pretty(&records_json(&records, enrichments))?);
        return Ok(());
    }

    match extraction {
        Some(extraction) => {
            info!("Extracted {} sources as {}", extraction.records.len(), extraction.format);
            println!(
                "{} {} sources ({})",
                "Found".green(),
                extraction.records.len(),
                extraction.format
            );
            print_records(&extraction.records, enrichments);
        }
        None => {
            println!("{}", "No source format recognized; raw text follows".yellow());
            println!("{}", text);
        }
    }
    Ok(())
}

fn handle_extract_command(
    input: &Path,
    enrichments: Option<&Path>,
    as_json: bool,
    extractor: &SourceExtractor,
) -> Result<()> {
    info!("Extracting sources from {}", input.display());
    let text = read_input(input)?;
    let table = match enrichments {
        Some(path) => {
            let raw = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
            parse_table(&raw).context("Failed to parse enrichments")?
        }
        None => EnrichmentTable::new(),
    };
    show_sources(&text, &table, as_json, extractor)
}

fn print_state(prefix: &str, state: &JobState) {
    let status = match state.status {
        JobStatus::Starting => state.status.as_str().normal(),
        JobStatus::Running => state.status.as_str().cyan(),
        JobStatus::Completed => state.status.as_str().green(),
        JobStatus::Failed => state.status.as_str().red(),
    };
    match (&state.error, state.remote_run_id) {
        (Some(error), _) => println!("{} {}: {}", prefix, status, error),
        (None, Some(run_id)) => println!("{} {} (run {})", prefix, status, run_id),
        (None, None) => println!("{} {}", prefix, status),
    }
}

async fn handle_generate_command(
    prompt_id: PromptId,
    as_json: bool,
    config: &Config,
    extractor: &SourceExtractor,
) -> Result<()> {
    info!("Running source-list prompt {}", prompt_id);
    let orchestrator = JobOrchestrator::new(pipeline_api(config)?, config.polling.settings());
    let mut job = orchestrator.spawn(RunKind::SourceList(prompt_id));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Interrupted, stopping".yellow());
                job.cancel();
                break;
            }
            update = job.next_update() => match update {
                Some(state) => {
                    if !as_json {
                        print_state(&format!("prompt {}", prompt_id), &state);
                    }
                }
                None => break,
            }
        }
    }

    let state = match job.finish().await? {
        JobOutcome::Finished(state) => state,
        JobOutcome::Cancelled => return Ok(()),
    };
    if let Some(error) = &state.error {
        eyre::bail!("Source list failed: {}", error);
    }

    let output = SourceListOutput::from_state(&state).unwrap_or_default();
    if !as_json {
        if let Some(run_id) = state.remote_run_id {
            println!("{} {}", "Source list run:".green(), run_id);
        }
    }
    show_sources(&output.text, &output.enrichments, as_json, extractor)
}

/// Fetch the output of a finished source-list run
async fn fetch_source_list(api: &dyn PipelineApi, story: RunId) -> Result<SourceListOutput> {
    let response = api
        .poll_status(story)
        .await
        .context(format!("Failed to fetch run {}", story))?;
    if response.status != RemoteStatus::Completed {
        eyre::bail!("Run {} is not completed", story);
    }
    Ok(response
        .result
        .as_ref()
        .map(SourceListOutput::from_result)
        .unwrap_or_default())
}

fn entry_prefix(key: &QueueKey, refinement: &str) -> String {
    match key.parent {
        Some(story) => format!("[{}/{}] {}", story, key.source_index, refinement),
        None => format!("[{}] {}", key.source_index, refinement),
    }
}

/// Run a pick belongs to; a pick without one needs exactly one run
fn pick_story(pick: &QueueKey, stories: &[RunId]) -> Result<RunId> {
    match (pick.parent, stories) {
        (Some(story), _) if stories.contains(&story) => Ok(story),
        (Some(story), _) => eyre::bail!("Pick {} names run {}, which was not given with --story", pick, story),
        (None, [story]) => Ok(*story),
        (None, _) => eyre::bail!("Pick {} needs a STORY/ prefix when several runs are given", pick),
    }
}

fn print_report(report: &BatchReport) {
    let headline = if report.all_terminal {
        "Batch complete:".green()
    } else {
        "Batch stopped:".yellow()
    };
    println!("{} {}", headline, report);
}

async fn handle_batch_command(
    stories: &[RunId],
    picks: &[QueueKey],
    named: &[RefinementOption],
    as_json: bool,
    config: &Config,
    extractor: &SourceExtractor,
) -> Result<()> {
    info!("Running batch for runs {:?} with {} picks", stories, picks.len());
    let api = pipeline_api(config)?;

    // Refinements without a --refinement name still get an option
    let mut refinements = named.to_vec();
    for pick in picks {
        if !refinements.iter().any(|r| r.id == pick.refinement_id) {
            refinements.push(RefinementOption::new(pick.refinement_id, ""));
        }
    }

    let mut queues: Vec<BatchQueue> = Vec::with_capacity(stories.len());
    for &story in stories {
        if queues.iter().any(|q| q.parent() == Some(story)) {
            continue;
        }
        let output = fetch_source_list(api.as_ref(), story).await?;
        let sources = output.sources_with(extractor);
        if sources.is_empty() {
            eyre::bail!("No sources found in run {}", story);
        }
        queues.push(
            BatchQueue::new(sources, refinements.clone())
                .with_parent(story)
                .with_settings(config.batch.settings()),
        );
    }

    for pick in picks {
        let story = pick_story(pick, stories)?;
        let Some(queue) = queues.iter_mut().find(|q| q.parent() == Some(story)) else {
            eyre::bail!("Run {} was not loaded", story);
        };
        if !queue.toggle(pick.source_index, pick.refinement_id)? {
            println!("{} {} (picked twice)", "Deselected".yellow(), pick);
        }
    }
    if queues.iter().map(BatchQueue::selected_count).sum::<usize>() == 0 {
        println!("{}", "Nothing selected".yellow());
        return Ok(());
    }

    let orchestrator = JobOrchestrator::new(api, config.polling.settings());
    let mut run = run_queues(&queues, &orchestrator)?;
    if !as_json {
        for entry in run.entries() {
            println!(
                "{} {} {}",
                "Queued".cyan(),
                entry_prefix(&entry.key, &entry.refinement_name),
                entry.source_label
            );
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Interrupted, stopping batch".yellow());
                run.shutdown();
                break;
            }
            update = run.next_update() => match update {
                Some((key, state)) => {
                    if !as_json {
                        let name = run
                            .entries()
                            .iter()
                            .find(|e| e.key == key)
                            .map(|e| e.refinement_name.clone())
                            .unwrap_or_default();
                        print_state(&entry_prefix(&key, &name), &state);
                    }
                }
                None => break,
            }
        }
    }

    let report = run.report();
    if as_json {
        let states: Vec<serde_json::Value> = run
            .entries()
            .iter()
            .map(|e| {
                json!({
                    "entry": e,
                    "state": run.state(&e.key),
                    "decision": run.state(&e.key).and_then(JobState::decision),
                })
            })
            .collect();
        let body = json!({ "report": report, "jobs": states });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for entry in run.entries() {
            if let Some(decision) = run.state(&entry.key).and_then(JobState::decision) {
                println!(
                    "{} {:?}",
                    entry_prefix(&entry.key, &entry.refinement_name),
                    decision
                );
            }
        }
        print_report(&report);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
