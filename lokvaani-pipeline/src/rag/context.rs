//! Grounding context assembly for the policy assistant

use crate::db::vectors::{DraftChunk, EmbeddedComment};
use lokvaani_common::db::{PostSummary, OVERALL};

/// Fixed instruction sent with every question
pub const SYSTEM_PROMPT: &str = "You are the LokVaani Policy Assistant, helping analysts understand public consultation feedback on draft legislation.

Guidelines:
- Answer ONLY from the provided context.
- When quoting statistics, use the exact numbers from the statistics section.
- When comparing stakeholder categories, keep their perspectives distinct and name the category.
- When asked about specific clauses, reference the draft sections provided.
- If the context is insufficient to answer, say so plainly instead of guessing.";

const NO_STATISTICS: &str = "No aggregate statistics available for this draft.";
const NO_SECTIONS: &str = "No relevant draft sections found.";
const NO_COMMENTS: &str = "No relevant comments found.";

fn whole_percent(part: i64, total: i64) -> i64 {
    if total == 0 {
        0
    } else {
        ((part as f64 / total as f64) * 100.0).round() as i64
    }
}

/// Render the statistics block from a summary snapshot
///
/// Totals and keywords come from the `overall` row; the breakdown lists the
/// business category rows in snapshot order.
pub fn statistics_context(summary: Option<&PostSummary>) -> String {
    let Some(summary) = summary else {
        return NO_STATISTICS.to_string();
    };
    let Some(overall) = summary
        .category_summaries
        .iter()
        .find(|row| row.category_id == OVERALL)
    else {
        return NO_STATISTICS.to_string();
    };

    let total = overall.total_comments;
    let keywords = if overall.top_keywords.is_empty() {
        "None".to_string()
    } else {
        overall
            .top_keywords
            .iter()
            .take(10)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let breakdown: Vec<String> = summary
        .category_summaries
        .iter()
        .filter(|row| row.category_id != OVERALL)
        .map(|row| {
            format!(
                "  • {}: {} comments (Score: {:.2})",
                row.category_name, row.total_comments, row.weighted_score
            )
        })
        .collect();

    format!(
        "Overall Statistics for this draft:\n\
         - Total Comments: {}\n\
         - Positive: {} ({}%)\n\
         - Negative: {} ({}%)\n\
         - Neutral: {} ({}%)\n\
         - Weighted Score: {:.2}\n\
         - Top Keywords: {}\n\
         \n\
         Category Breakdown:\n{}",
        total,
        overall.positive_count,
        whole_percent(overall.positive_count, total),
        overall.negative_count,
        whole_percent(overall.negative_count, total),
        overall.neutral_count,
        whole_percent(overall.neutral_count, total),
        overall.weighted_score,
        keywords,
        breakdown.join("\n")
    )
}

fn comment_line(comment: &EmbeddedComment) -> String {
    format!(
        "- [{} / {}] {}: \"{}\"",
        comment.category_name.as_deref().unwrap_or("Uncategorized"),
        comment.sentiment.map(|s| s.as_str()).unwrap_or("UNKNOWN"),
        comment.stakeholder_name.as_deref().unwrap_or("Anonymous"),
        comment.raw_comment
    )
}

/// Full grounding context handed to the answer generator
pub fn build_context(
    title: Option<&str>,
    summary: Option<&PostSummary>,
    chunks: &[DraftChunk],
    comments: &[EmbeddedComment],
) -> String {
    let sections = if chunks.is_empty() {
        NO_SECTIONS.to_string()
    } else {
        chunks
            .iter()
            .map(|chunk| format!("- {}", chunk.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let comment_lines = if comments.is_empty() {
        NO_COMMENTS.to_string()
    } else {
        comments.iter().map(comment_line).collect::<Vec<_>>().join("\n")
    };

    format!(
        "Draft Title: {}\n\n{}\n\nMost Relevant Draft Sections:\n{}\n\nMost Relevant Stakeholder Comments:\n{}\n",
        title.filter(|t| !t.trim().is_empty()).unwrap_or("Unknown"),
        statistics_context(summary),
        sections,
        comment_lines
    )
}
