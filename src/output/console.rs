//! Human-readable rendering of a council run.
//!
//! Live progress goes to stderr so that `--json` output on stdout stays
//! machine-readable; the final results go to stdout.

use crate::config::PreviewConfig;
use crate::council::{CouncilRun, ProgressNotifier, Response, Stage};
use std::time::Duration;

const RULE_WIDTH: usize = 60;

/// Prints stage banners and per-invocation completions as they happen.
pub struct ConsoleProgress {
    chairman: String,
}

impl ConsoleProgress {
    pub fn new(chairman: impl Into<String>) -> Self {
        Self {
            chairman: chairman.into(),
        }
    }

    fn banner(&self, stage: Stage) -> String {
        match stage {
            Stage::Answers => "📋 STAGE 1: Collecting Individual Responses".to_string(),
            Stage::Review => "🏆 STAGE 2: Peer Review & Ranking".to_string(),
            Stage::Synthesis => format!("👑 STAGE 3: Chairman ({}) Synthesizing", self.chairman),
        }
    }
}

impl ProgressNotifier for ConsoleProgress {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        eprintln!("\n{}", "=".repeat(RULE_WIDTH));
        eprintln!("{}", self.banner(stage));
        eprintln!("{}", "=".repeat(RULE_WIDTH));
        if stage == Stage::Synthesis {
            eprintln!("(Synthesizing final answer...)");
        } else {
            eprintln!("🚀 Starting {} queries in parallel...", total);
        }
    }

    fn on_invocation_complete(&self, _stage: Stage, response: &Response, completed: usize, total: usize) {
        match &response.error {
            None => eprintln!(
                "✅ [{}/{}] {} completed ({:.1}s)",
                completed,
                total,
                response.model,
                response.duration.as_secs_f64()
            ),
            Some(e) => eprintln!(
                "❌ [{}/{}] {} failed: {}",
                completed, total, response.model, e.message
            ),
        }
    }

    fn on_stage_complete(&self, _stage: Stage, elapsed: Duration) {
        eprintln!("⏱️  Completed in {:.1}s", elapsed.as_secs_f64());
    }

    fn on_stage_skipped(&self, stage: Stage, reason: &str) {
        eprintln!("\n⚠️  Skipping {}: {}", stage, reason);
    }
}

pub fn print_header(question: &str, council: &[String], chairman: &str) {
    eprintln!("\n{}", "🏛️ ".repeat(15));
    eprintln!("       LLM COUNCIL");
    eprintln!("{}", "🏛️ ".repeat(15));
    eprintln!("\n📝 Query: {}", question);
    eprintln!("👥 Council: {}", council.join(", "));
    eprintln!("👑 Chairman: {}", chairman);
}

/// Answer previews, review previews, the revealed mapping, the aggregate
/// ranking and, when there is one, the final answer.
pub fn print_run(run: &CouncilRun, preview: &PreviewConfig) {
    if let Some(stage1) = &run.stage1 {
        println!("\n{}", "-".repeat(RULE_WIDTH));
        println!("📄 RESPONSES RECEIVED:");
        println!("{}", "-".repeat(RULE_WIDTH));
        for response in stage1.in_query_order() {
            if response.success {
                println!("\n✅ {}", response.model);
                println!("{}", "-".repeat(40));
                println!("{}\n", truncate(&response.text, preview.answer_chars));
            } else {
                println!("\n❌ {} - No response", response.model);
            }
        }
    }

    if !run.reviews.is_empty() {
        println!("\n{}", "-".repeat(RULE_WIDTH));
        println!("📊 PEER REVIEWS:");
        println!("{}", "-".repeat(RULE_WIDTH));
        for review in &run.reviews {
            println!("\n🔍 {}'s Review:", review.reviewer);
            println!("{}", "-".repeat(40));
            println!("{}\n", truncate(&review.text, preview.review_chars));
        }
    }

    if let Some(mapping) = &run.mapping {
        if !mapping.is_empty() && !run.reviews.is_empty() {
            println!("\n📊 Response mapping (revealed):");
            for (label, model) in mapping.entries() {
                println!("   Response {} = {}", label, model);
            }
        }
    }

    if !run.aggregate_ranking.is_empty() {
        println!("\n🏅 Aggregate ranking (average position, lower is better):");
        for (idx, rank) in run.aggregate_ranking.iter().enumerate() {
            println!(
                "   {}. {} (Response {}) avg {:.2} from {} vote(s)",
                idx + 1,
                rank.model,
                rank.label,
                rank.average_position,
                rank.votes
            );
        }
    }

    if let Some(answer) = run.final_answer() {
        println!("\n{}", "=".repeat(RULE_WIDTH));
        println!("🎯 FINAL SYNTHESIZED ANSWER");
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("\n{}", answer);
        println!("\n{}", "=".repeat(RULE_WIDTH));
    }
}

/// Keep the first `max_chars` characters, marking the cut with `...`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
