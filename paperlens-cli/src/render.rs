//! Plain-text rendering of dashboard snapshots.

use paperlens_core::insights::{InsightsSnapshot, Slice};
use paperlens_core::profile::ProfileSnapshot;
use paperlens_core::search::SearchSession;
use paperlens_core::trends::TrendSnapshot;
use paperlens_core::types::{AuthorSummary, PaperSummary};
use std::fmt::Write;

const MAX_TITLE: usize = 72;

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn error_line(out: &mut String, error: &Option<String>) {
    if let Some(e) = error {
        let _ = writeln!(out, "  ! {}", e);
    }
}

/// Year rows with one column per topic, plus the series legend.
pub fn trends(snapshot: &TrendSnapshot) -> String {
    let mut out = String::new();
    error_line(&mut out, &snapshot.error);
    if snapshot.matrix.is_empty() {
        out.push_str("  No trend data.\n");
        return out;
    }

    let widths: Vec<usize> = snapshot
        .series
        .iter()
        .map(|s| s.topic.chars().count().max(5))
        .collect();

    let _ = write!(out, "  {:<6}", "year");
    for (series, width) in snapshot.series.iter().zip(&widths) {
        let _ = write!(out, " {:>w$}", series.topic, w = *width);
    }
    out.push('\n');

    for row in snapshot.matrix.rows() {
        let _ = write!(out, "  {:<6}", row.year);
        for ((_, value), width) in row.values.iter().zip(&widths) {
            let _ = write!(out, " {:>w$}", value, w = *width);
        }
        out.push('\n');
    }

    out.push('\n');
    for series in &snapshot.series {
        let _ = writeln!(out, "  {} {}", series.stroke, series.topic);
    }
    out
}

pub fn authors(slice: &Slice<Vec<AuthorSummary>>) -> String {
    let mut out = String::new();
    error_line(&mut out, &slice.error);
    if slice.data.is_empty() {
        out.push_str("  No authors.\n");
        return out;
    }
    let _ = writeln!(out, "  {:<32} {:>7} {:>9} {:>9}", "name", "papers", "citations", "influence");
    for author in &slice.data {
        let _ = writeln!(
            out,
            "  {:<32} {:>7} {:>9} {:>9.2}",
            clip(&author.name, 32),
            author.paper_count,
            author.citations,
            author.influence_score
        );
    }
    out
}

fn paper_line(out: &mut String, paper: &PaperSummary) {
    let mut meta = Vec::new();
    if let Some(venue) = paper.venue.as_deref().filter(|v| !v.is_empty()) {
        meta.push(venue.to_string());
    }
    if let Some(date) = paper.published_date.as_deref().filter(|d| !d.is_empty()) {
        meta.push(date.to_string());
    }
    if meta.is_empty() {
        let _ = writeln!(out, "  - {}", clip(&paper.title, MAX_TITLE));
    } else {
        let _ = writeln!(out, "  - {} ({})", clip(&paper.title, MAX_TITLE), meta.join(", "));
    }
}

pub fn papers(slice: &Slice<Vec<PaperSummary>>) -> String {
    let mut out = String::new();
    error_line(&mut out, &slice.error);
    if slice.data.is_empty() {
        out.push_str("  No papers.\n");
        return out;
    }
    for paper in &slice.data {
        paper_line(&mut out, paper);
    }
    out
}

pub fn search(session: &SearchSession) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Results for \"{}\": {}", session.query, session.results.len());
    error_line(&mut out, &session.error);
    for paper in &session.results {
        paper_line(&mut out, paper);
    }
    out
}

fn bullet_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {}:", heading);
    for item in items {
        let _ = writeln!(out, "    - {}", item);
    }
}

pub fn insights(snapshot: &InsightsSnapshot) -> String {
    let mut out = String::new();

    let insights = &snapshot.insights;
    error_line(&mut out, &insights.error);
    if !insights.data.summary.is_empty() {
        let _ = writeln!(out, "  {}", insights.data.summary);
    }
    bullet_list(&mut out, "Emerging trends", &insights.data.emerging_trends);
    bullet_list(&mut out, "Research gaps", &insights.data.research_gaps);
    bullet_list(&mut out, "Recommended directions", &insights.data.recommended_directions);
    if !insights.data.top_topics.is_empty() {
        out.push_str("  Top topics:\n");
        for topic in &insights.data.top_topics {
            let _ = writeln!(out, "    {:<24} {:>6}", topic.topic, topic.count);
        }
    }

    out.push_str("\n  Clusters:\n");
    error_line(&mut out, &snapshot.clusters.error);
    for cluster in &snapshot.clusters.data {
        let _ = writeln!(out, "    {:<24} {:>6}", cluster.name, cluster.count);
    }

    out.push_str("\n  Recommended:\n");
    error_line(&mut out, &snapshot.recommended.error);
    for paper in &snapshot.recommended.data {
        paper_line(&mut out, paper);
    }
    out
}

pub fn profile(snapshot: &ProfileSnapshot) -> String {
    let mut out = String::new();
    let form = &snapshot.form;
    let _ = writeln!(out, "  Name:     {}", form.name);
    let _ = writeln!(out, "  Title:    {}", form.title);
    let _ = writeln!(out, "  Proposal: {}", clip(&form.proposal, MAX_TITLE));
    let _ = writeln!(out, "  State:    {}", snapshot.state);
    error_line(&mut out, &snapshot.load_error);
    error_line(&mut out, &snapshot.error);

    match &snapshot.analysis {
        None => out.push_str("\n  No analysis yet.\n"),
        Some(analysis) => {
            out.push('\n');
            if snapshot.analysis_stale {
                out.push_str("  (analysis predates the latest edits)\n");
            }
            let _ = writeln!(out, "  Trajectory: {}", analysis.trajectory);
            bullet_list(&mut out, "Suggested conferences", &analysis.suggested_conferences);
            if !analysis.suggested_papers.is_empty() {
                out.push_str("  Suggested papers:\n");
                for paper in &analysis.suggested_papers {
                    let venue = paper.venue.as_deref().unwrap_or("?");
                    match paper.year {
                        Some(year) => {
                            let _ = writeln!(out, "    - {} ({}, {})", paper.title, venue, year);
                        }
                        None => {
                            let _ = writeln!(out, "    - {} ({})", paper.title, venue);
                        }
                    }
                }
            }
        }
    }
    out
}
