use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use scholarpen_lib::api::AppState;
use scholarpen_lib::models::{
    CitationFormat, DetectionReport, DetectorOutcome, EssayLength, EssayOptions, EssayStyle, LlmProvider,
    PaperRecord, SearchFilters, SortOrder, SourceFilter, SummaryMode,
};
use scholarpen_lib::services::{AddOutcome, SessionEvent, SessionOutcome};

/// ScholarPen - find academic sources, draft essays from them, check text for AI patterns
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search Semantic Scholar, CrossRef and arXiv
    Search {
        query: String,
        #[arg(long)]
        year_min: Option<i32>,
        #[arg(long)]
        year_max: Option<i32>,
        #[arg(long, default_value_t = 0)]
        min_citations: u32,
        #[arg(long)]
        open_access: bool,
        /// all, semantic-scholar, crossref or arxiv
        #[arg(long, default_value = "all")]
        source: SourceFilter,
        /// relevance, citations or year
        #[arg(long, default_value = "relevance")]
        sort: SortOrder,
        /// Add the result at this 1-based position to the selected sources (repeatable)
        #[arg(long = "add")]
        add: Vec<usize>,
    },
    /// Manage the selected source list
    Sources {
        #[command(subcommand)]
        action: SourcesAction,
    },
    /// Stream an essay from the selected sources (Ctrl-C stops and keeps the partial draft)
    Generate {
        topic: String,
        #[arg(long, default_value = "medium")]
        length: EssayLength,
        #[arg(long, default_value = "academic")]
        style: EssayStyle,
        #[arg(long, default_value = "apa7")]
        citation: CitationFormat,
        #[arg(long)]
        no_humanize: bool,
        #[arg(long)]
        provider: Option<LlmProvider>,
        /// Also write the final markdown here
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Rewrite an existing essay to read more naturally
    Refine {
        /// Essay file; reads stdin when omitted
        input: Option<PathBuf>,
        #[arg(long)]
        provider: Option<LlmProvider>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Score text with the local detector and any keyed detection services
    Detect {
        input: Option<PathBuf>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize academic text
    Summarize {
        input: Option<PathBuf>,
        /// bullets, paragraph or eli5
        #[arg(long, default_value = "bullets")]
        mode: SummaryMode,
        #[arg(long)]
        provider: Option<LlmProvider>,
    },
    /// Store or remove an API key in the config file
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand, Debug)]
enum SourcesAction {
    List,
    /// Add a result of a (cached) search by its 1-based position in relevance order
    Add { query: String, position: usize },
    AddManual {
        title: String,
        #[arg(long, default_value = "")]
        authors: String,
        #[arg(long, default_value = "")]
        year: String,
    },
    /// Remove by 1-based position
    Remove { position: usize },
    Clear,
}

#[derive(Subcommand, Debug)]
enum KeyAction {
    /// Name is a provider credential (openai, anthropic, gemini) or detector (zerogpt, gptzero, sapling)
    Set { name: String, value: String },
    Delete { name: String },
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display())),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn zero_based(position: usize) -> anyhow::Result<usize> {
    position.checked_sub(1).ok_or_else(|| anyhow!("Positions start at 1"))
}

fn print_results(results: &[PaperRecord]) {
    if results.is_empty() {
        println!("No results found. Try different keywords or adjust filters.");
        return;
    }
    for (i, paper) in results.iter().enumerate() {
        let year = paper.year.map(|y| y.to_string()).unwrap_or_else(|| "n.d.".to_string());
        println!("{:>3}. {} ({})", i + 1, paper.title, year);
        println!(
            "     {} | {} | {} citations | {}",
            paper.authors, paper.venue, paper.citation_count, paper.source_provider
        );
        if !paper.url.is_empty() {
            println!("     {}", paper.url);
        }
    }
}

fn print_sources(sources: &[PaperRecord]) {
    if sources.is_empty() {
        println!("No sources selected.");
        return;
    }
    for (i, paper) in sources.iter().enumerate() {
        println!("{:>3}. {} - {} [{}]", i + 1, paper.title, paper.authors, paper.source_provider);
    }
}

fn print_stream_event(event: SessionEvent) {
    if let SessionEvent::Delta { delta, .. } = event {
        print!("{}", delta);
        let _ = std::io::stdout().flush();
    }
}

/// Runs until the session ends; Ctrl-C asks the controller to stop.
fn watch_ctrl_c(state: &Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && state.stop_generation() {
            info!("[CLI] Ctrl-C received, stopping generation");
        }
    })
}

fn finish_session(outcome: SessionOutcome, output: Option<&PathBuf>) -> anyhow::Result<()> {
    println!();
    match outcome {
        SessionOutcome::Completed { text, .. } | SessionOutcome::Cancelled { text, .. } => {
            if let Some(path) = output {
                std::fs::write(path, &text).with_context(|| format!("Failed to write {}", path.display()))?;
                eprintln!("Saved to {}", path.display());
            }
            Ok(())
        }
        SessionOutcome::Failed { message, .. } => Err(anyhow!(message)),
    }
}

fn print_report(report: &DetectionReport) {
    let local = &report.local;
    println!("Local analysis: {}% AI ({})", local.ai_score, local.verdict);
    if let Some(stats) = &local.stats {
        println!(
            "  {} words, {} sentences, {} paragraphs, avg sentence {:.1} words, variation {:.1}, diversity {:.1}%",
            stats.word_count,
            stats.sentence_count,
            stats.paragraph_count,
            stats.avg_sentence_length,
            stats.sentence_length_std_dev,
            stats.lexical_diversity * 100.0
        );
    }
    if !local.issues.ai_phrases.is_empty() {
        let phrases: Vec<&str> = local.issues.ai_phrases.iter().map(|p| p.phrase.as_str()).collect();
        println!("  Flagged phrases: {}", phrases.join(", "));
    }
    if !local.issues.ai_vocabulary.is_empty() {
        println!("  Flagged vocabulary: {}", local.issues.ai_vocabulary.join(", "));
    }
    for suggestion in &local.suggestions {
        println!("  - {}", suggestion);
    }

    for service in &report.services {
        match &service.outcome {
            DetectorOutcome::Skipped => println!("{}: no API key", service.name),
            DetectorOutcome::Failed { message } => println!("{}: error ({})", service.name, message),
            DetectorOutcome::Scored { ai_score, verdict, .. } => {
                println!("{}: {}% AI ({})", service.name, ai_score, verdict)
            }
        }
    }

    match report.average_ai_score {
        Some(avg) => println!("Average AI score: {}%", avg),
        None => println!("No detector results available"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    scholarpen_lib::init_logging();

    let state = Arc::new(AppState::open_default().map_err(|e| anyhow!(e))?);

    match args.command {
        Command::Search { query, year_min, year_max, min_citations, open_access, source, sort, add } => {
            state.set_filters(SearchFilters {
                year_min,
                year_max,
                min_citations,
                open_access_only: open_access,
                source,
            });
            state.set_sort(sort);
            let results = state.search(&query).await.map_err(|e| anyhow!(e))?;
            print_results(&results);
            for position in add {
                match state.add_visible_result(zero_based(position)?).map_err(|e| anyhow!(e))? {
                    AddOutcome::Added => println!("Added #{} to sources", position),
                    AddOutcome::AlreadyPresent => println!("#{} is already selected", position),
                }
            }
        }
        Command::Sources { action } => match action {
            SourcesAction::List => print_sources(&state.selected_sources()),
            SourcesAction::Add { query, position } => {
                state.search(&query).await.map_err(|e| anyhow!(e))?;
                match state.add_visible_result(zero_based(position)?).map_err(|e| anyhow!(e))? {
                    AddOutcome::Added => println!("Source added"),
                    AddOutcome::AlreadyPresent => println!("Source already selected"),
                }
            }
            SourcesAction::AddManual { title, authors, year } => {
                let paper = state.add_manual_source(&title, &authors, &year).map_err(|e| anyhow!(e))?;
                println!("Added manual source: {}", paper.title);
            }
            SourcesAction::Remove { position } => {
                let paper = state.remove_source(zero_based(position)?).map_err(|e| anyhow!(e))?;
                println!("Removed: {}", paper.title);
            }
            SourcesAction::Clear => {
                let removed = state.clear_sources();
                println!("Cleared {} source(s)", removed);
            }
        },
        Command::Generate { topic, length, style, citation, no_humanize, provider, output } => {
            let options = EssayOptions {
                length,
                style,
                citation_format: citation,
                humanize: !no_humanize,
            };
            let watcher = watch_ctrl_c(&state);
            let outcome = state.generate(&topic, options, provider, print_stream_event).await;
            watcher.abort();
            finish_session(outcome.map_err(|e| anyhow!(e))?, output.as_ref())?;
        }
        Command::Refine { input, provider, output } => {
            let essay = read_input(input.as_ref())?;
            let watcher = watch_ctrl_c(&state);
            let outcome = state.refine(Some(&essay), provider, print_stream_event).await;
            watcher.abort();
            finish_session(outcome.map_err(|e| anyhow!(e))?, output.as_ref())?;
        }
        Command::Detect { input, json } => {
            let text = read_input(input.as_ref())?;
            let report = state.detect(&text).await.map_err(|e| anyhow!(e))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Summarize { input, mode, provider } => {
            let text = read_input(input.as_ref())?;
            let summary = state.summarize(&text, mode, provider).await.map_err(|e| anyhow!(e))?;
            println!("{}", summary);
        }
        Command::Key { action } => match action {
            KeyAction::Set { name, value } => {
                state.config().set_api_key(&name, &value).map_err(|e| anyhow!(e))?;
                println!("Saved key for {}", name);
            }
            KeyAction::Delete { name } => {
                state.config().delete_api_key(&name).map_err(|e| anyhow!(e))?;
                println!("Deleted key for {}", name);
            }
        },
    }

    Ok(())
}
