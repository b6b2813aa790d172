use crate::cli::AskArgs;
use crate::config::Config;
use crate::council::{NoProgress, Pipeline, ProgressNotifier, RunFailure};
use crate::output::{self, console, ConsoleProgress};
use crate::provider::create_invoker;
use anyhow::Context;
use std::io::{self, BufRead, Write};
use tracing::info;

pub async fn execute(args: AskArgs) -> anyhow::Result<()> {
    let mut config = Config::resolve(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(council) = args.council {
        config.council_models = council;
    }
    if let Some(chairman) = args.chairman {
        config.chairman_model = chairman;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_sec = timeout;
    }
    if let Some(provider) = args.provider {
        config.provider = provider;
    }
    if let Some(report_dir) = args.report_dir {
        config.report_dir = Some(report_dir);
    }

    config.validate()?;

    let question = if args.question.is_empty() {
        prompt_for_question()?
    } else {
        args.question.join(" ").trim().to_string()
    };
    if question.is_empty() {
        println!("No question provided.");
        return Ok(());
    }

    if args.dry_run {
        info!("DRY RUN - no backend calls will be made");
        print_council_plan(&config, &question);
        return Ok(());
    }

    let invoker = create_invoker(&config);
    if args.skip_check {
        info!("Skipping {} readiness check", invoker.name());
    } else {
        invoker
            .check_ready()
            .await
            .with_context(|| format!("{} is not ready", invoker.name()))?;
    }

    let pipeline = Pipeline::new(invoker, &config)?;
    let console_progress = ConsoleProgress::new(pipeline.chairman());
    let progress: &dyn ProgressNotifier = if args.json {
        &NoProgress
    } else {
        console::print_header(&question, pipeline.council(), pipeline.chairman());
        &console_progress
    };

    let (run, error) = match pipeline.run(&question, progress).await {
        Ok(run) => (run, None),
        Err(RunFailure { error, run }) => (*run, Some(error)),
    };

    let summary = output::build_summary(&run, error.as_ref());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        console::print_run(&run, &config.preview);
    }

    if let Some(report_dir) = &config.report_dir {
        let path = output::write_run_report(report_dir, &summary)?;
        info!("Report written to {:?}", path);
        if !args.json {
            eprintln!("📁 Report written to {}", path.display());
        }
    }

    match error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Read one line from stdin. EOF yields an empty question.
fn prompt_for_question() -> anyhow::Result<String> {
    eprintln!("\n🏛️  LLM Council - Interactive Mode");
    eprintln!("{}", "-".repeat(40));
    eprint!("Enter your question: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read question from stdin")?;
    Ok(line.trim().to_string())
}

fn print_council_plan(config: &Config, question: &str) {
    println!("\n=== Council Plan ===\n");
    println!("Question: {}", question);
    println!("Provider: {}", config.provider);
    println!("Timeout: {}s per query", config.timeout_sec);
    println!("Chairman timeout: {}s", config.chairman_timeout_sec);
    if let Some(ref report_dir) = config.report_dir {
        println!("Report dir: {:?}", report_dir);
    }

    println!("\nStage 1 - answers from:");
    for model in &config.council_models {
        println!("  - {}", model);
    }

    println!(
        "\nStage 2 - {} anonymized peer reviews (skipped if fewer than 2 answers)",
        config.council_models.len()
    );

    let role = if config.chairman_in_council() {
        ""
    } else {
        " [synthesis only]"
    };
    println!("\nStage 3 - synthesis by: {}{}", config.chairman_model, role);
    println!();
}
