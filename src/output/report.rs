use super::summary::RunSummary;
use crate::error::OutputError;
use std::fs;
use std::path::{Path, PathBuf};

/// Write `<run-id>.json` and `<run-id>.md` into `report_dir`.
///
/// Returns the path of the markdown report.
pub fn write_run_report(report_dir: &Path, summary: &RunSummary) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(report_dir).map_err(OutputError::CreateDir)?;

    let json_path = report_dir.join(format!("{}.json", summary.run_id));
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(&json_path, json).map_err(OutputError::WriteReport)?;

    let md_path = report_dir.join(format!("{}.md", summary.run_id));
    fs::write(&md_path, build_report_markdown(summary)).map_err(OutputError::WriteReport)?;

    Ok(md_path)
}

pub fn build_report_markdown(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Council Report\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Run | `{}` |\n", summary.run_id));
    md.push_str(&format!("| Started | {} |\n", summary.started_at));
    md.push_str(&format!("| Generated | {} |\n", summary.timestamp));
    md.push_str(&format!("| State | {} |\n", summary.state));
    md.push_str(&format!("| Council | {} |\n", summary.council.join(", ")));
    md.push_str(&format!("| Chairman | {} |\n", summary.chairman));
    md.push_str(&format!("| Duration | {:.1}s |\n\n", summary.duration_sec));

    md.push_str("## Question\n\n");
    md.push_str(&format!("{}\n\n", summary.question));

    if let Some(error) = &summary.error {
        md.push_str(&format!("> **Run failed:** {}\n\n", error));
    }

    if let Some(answer) = &summary.final_answer {
        md.push_str("## Final Answer\n\n");
        md.push_str(&format!("{}\n\n", answer));
    }

    md.push_str("---\n\n## Stage 1: Individual Answers\n\n");
    md.push_str("| Model | Label | Status | Duration |\n");
    md.push_str("|-------|-------|--------|----------|\n");
    for answer in &summary.answers {
        md.push_str(&format!(
            "| {} | {} | {} | {:.1}s |\n",
            answer.model,
            answer.label.as_deref().unwrap_or("-"),
            status_cell(answer.success, answer.error.as_deref()),
            answer.duration_sec
        ));
    }
    md.push('\n');

    for answer in summary.answers.iter().filter(|a| a.success) {
        md.push_str(&format!("### {}\n\n{}\n\n", answer.model, answer.text));
    }

    md.push_str("---\n\n## Stage 2: Peer Review\n\n");
    if let Some(reason) = &summary.review_skipped {
        md.push_str(&format!("*Skipped: {}*\n\n", reason));
    } else if summary.reviews.is_empty() {
        md.push_str("*Not run*\n\n");
    } else {
        if !summary.label_mapping.is_empty() {
            md.push_str("**Label mapping (revealed):**\n\n");
            for entry in &summary.label_mapping {
                md.push_str(&format!("- Response {} = {}\n", entry.label, entry.model));
            }
            md.push('\n');
        }

        if !summary.aggregate_ranking.is_empty() {
            md.push_str("| Rank | Model | Label | Avg. position | Votes |\n");
            md.push_str("|------|-------|-------|---------------|-------|\n");
            for (idx, rank) in summary.aggregate_ranking.iter().enumerate() {
                md.push_str(&format!(
                    "| {} | {} | {} | {:.2} | {} |\n",
                    idx + 1,
                    rank.model,
                    rank.label,
                    rank.average_position,
                    rank.votes
                ));
            }
            md.push('\n');
        }

        for review in &summary.reviews {
            md.push_str(&format!("### {}'s review\n\n", review.reviewer));
            if review.success {
                if let Some(models) = &review.ranked_models {
                    md.push_str(&format!("**Ranking:** {}\n\n", models.join(" > ")));
                }
                md.push_str(&format!("{}\n\n", review.text));
            } else {
                md.push_str(&format!(
                    "{}\n\n",
                    status_cell(false, review.error.as_deref())
                ));
            }
        }
    }

    md.push_str("---\n\n## Stage 3: Synthesis\n\n");
    match &summary.synthesis {
        Some(synthesis) => md.push_str(&format!(
            "Chairman **{}**: {} in {:.1}s\n\n",
            synthesis.model,
            status_cell(synthesis.success, synthesis.error.as_deref()),
            synthesis.duration_sec
        )),
        None => md.push_str("*Not run*\n\n"),
    }

    if !summary.stages.is_empty() {
        md.push_str("## Timing\n\n");
        md.push_str("| Stage | Started | Finished | Duration | Completion order |\n");
        md.push_str("|-------|---------|----------|----------|------------------|\n");
        for stage in &summary.stages {
            md.push_str(&format!(
                "| {} ({}) | {} | {} | {:.1}s | {} |\n",
                stage.stage,
                stage.name,
                stage.started_at,
                stage.finished_at,
                stage.duration_sec,
                stage.completion_order.join(" → ")
            ));
        }
    }

    md
}

fn status_cell(success: bool, error: Option<&str>) -> String {
    match (success, error) {
        (true, _) => "✅ ok".to_string(),
        (false, Some(e)) => format!("❌ failed ({})", e.replace('|', "\\|")),
        (false, None) => "❌ failed".to_string(),
    }
}
