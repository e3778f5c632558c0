use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use forumsage_core::config::Config;
use forumsage_core::types::PipelineResult;
use forumsage_corpus::CorpusIndex;
use forumsage_pipeline::{BatchReport, Orchestrator};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ask|batch|interactive> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn print_result(result: &PipelineResult) {
    println!("\n{}\n", result.synthesized);
    println!("Confidence: {:.2}", result.overall_confidence);
    println!("Threads:    {}", result.hits.len());
    println!("Responders: {}", result.outputs.len());
    println!("Time:       {:.2}s", result.elapsed.as_secs_f64());
    for step in &result.steps {
        println!("  - {}", step);
    }
}

/// Questions file: one per line, blank lines and `#` comments skipped.
fn read_questions(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read questions from {}: {}", path.display(), e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

async fn batch(
    orchestrator: &Orchestrator,
    questions: &[String],
    out: &Path,
) -> anyhow::Result<()> {
    let pb = ProgressBar::new(questions.len() as u64);
    let template =
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} questions {msg}";
    pb.set_style(ProgressStyle::default_bar().template(template)?.progress_chars("#>-"));
    let mut results = Vec::with_capacity(questions.len());
    for question in questions {
        pb.set_message(question.chars().take(40).collect::<String>());
        results.push(orchestrator.process(question).await);
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let report = BatchReport::from_results(&results);
    let doc = serde_json::json!({
        "results": serde_json::to_value(&results)?,
        "report": serde_json::to_value(&report)?,
    });
    fs::write(out, serde_json::to_string_pretty(&doc)?)?;
    println!("\n{}", report);
    println!("Results written to {}", out.display());
    Ok(())
}

async fn interactive(orchestrator: &Orchestrator) -> anyhow::Result<()> {
    println!("Ask a question (quit, exit or q to leave)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let question = line.trim();
        match question {
            "" => continue,
            "quit" | "exit" | "q" => break,
            _ => print_result(&orchestrator.process(question).await),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("forumsage=info".parse()?))
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();

    let corpus_path = settings.corpus_path(&env::current_dir()?);
    let corpus = Arc::new(CorpusIndex::load_or_empty(&corpus_path));
    if !corpus.is_available() {
        eprintln!(
            "Corpus unavailable at {}; answering without forum context",
            corpus_path.display()
        );
    }
    let orchestrator = Orchestrator::from_settings(&settings, corpus);

    match cmd.as_str() {
        "ask" => {
            let question = args.join(" ");
            if question.trim().is_empty() {
                eprintln!("Usage: forumsage ask \"<question>\"");
                std::process::exit(1);
            }
            print_result(&orchestrator.process(&question).await);
        }
        "batch" => {
            let input = args.first().map(PathBuf::from).unwrap_or_else(|| {
                eprintln!("Usage: forumsage batch <questions.txt> [out.json]");
                std::process::exit(1)
            });
            let out = args
                .get(1)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("batch_results.json"));
            let questions = read_questions(&input)?;
            println!("Processing {} questions from {}", questions.len(), input.display());
            batch(&orchestrator, &questions, &out).await?;
        }
        "interactive" => interactive(&orchestrator).await?,
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}
