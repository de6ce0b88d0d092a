use std::io::Write;

use indicatif::ProgressBar;
use owo_colors::OwoColorize;

use surveytally_core::ProgressEvent;
use surveytally_reporting::Report;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Feed a pipeline progress event into the spinner. Failures are printed
/// above the spinner so they stay visible after it advances.
pub fn update_progress(spinner: &ProgressBar, event: &ProgressEvent, color: ColorMode) {
    match event {
        ProgressEvent::Rasterizing { file_name } => {
            spinner.set_message(format!("Converting {}...", file_name));
        }
        ProgressEvent::Rasterized {
            file_name,
            total_pages,
        } => {
            spinner.set_message(format!("{}: {} page(s)", file_name, total_pages));
        }
        ProgressEvent::AnalyzingPage {
            file_name,
            page_index,
            total_pages,
        } => {
            spinner.set_message(format!(
                "{}: analyzing page {}/{}",
                file_name,
                page_index + 1,
                total_pages
            ));
        }
        ProgressEvent::PageCompleted {
            file_name,
            page_index,
            item_count,
        } => {
            spinner.set_message(format!(
                "{}: page {} done ({} items)",
                file_name,
                page_index + 1,
                item_count
            ));
        }
        ProgressEvent::PageFailed {
            file_name,
            page_index,
            message,
        } => {
            let line = format!("{}: page {} failed: {}", file_name, page_index + 1, message);
            if color.enabled() {
                spinner.println(format!("{} {}", "WARNING:".yellow(), line));
            } else {
                spinner.println(format!("WARNING: {}", line));
            }
        }
        ProgressEvent::DocumentDropped { file_name, message } => {
            let line = format!("{} could not be converted and was dropped: {}", file_name, message);
            if color.enabled() {
                spinner.println(format!("{} {}", "ERROR:".red(), line));
            } else {
                spinner.println(format!("ERROR: {}", line));
            }
        }
        ProgressEvent::RasterizeFailed { file_name, message } => {
            let line = format!("{}: re-conversion failed, skipped this run: {}", file_name, message);
            if color.enabled() {
                spinner.println(format!("{} {}", "WARNING:".yellow(), line));
            } else {
                spinner.println(format!("WARNING: {}", line));
            }
        }
        ProgressEvent::Cancelled => {
            spinner.println("Cancelled. Partial results follow.");
        }
    }
}

/// Print the aggregated report to the terminal.
pub fn print_report(w: &mut dyn Write, report: &Report, color: ColorMode) -> std::io::Result<()> {
    let heading = "교육만족도 조사 결과";
    if color.enabled() {
        writeln!(w, "{}", heading.bold())?;
    } else {
        writeln!(w, "{}", heading)?;
    }
    writeln!(w, "{}", "=".repeat(40))?;

    writeln!(w, "교육명: {}", report.display_title())?;
    let overall = format!("{:.2} / 5.0", report.overall_satisfaction);
    if color.enabled() {
        writeln!(w, "전체 만족도: {}", overall.green().bold())?;
    } else {
        writeln!(w, "전체 만족도: {}", overall)?;
    }

    match report.participation_rate {
        Some(rate) => writeln!(
            w,
            "참여율: {:.1}% ({}명 / {}명)",
            rate, report.completed_respondents, report.target_audience
        )?,
        None => writeln!(w, "응답자 수: {}명", report.completed_respondents)?,
    }
    if report.error_respondents > 0 {
        let line = format!("분석 실패: {}건", report.error_respondents);
        if color.enabled() {
            writeln!(w, "{}", line.red())?;
        } else {
            writeln!(w, "{}", line)?;
        }
    }
    writeln!(w, "분석 파일 수: {}개", report.file_count)?;
    writeln!(w)?;

    if report.stats.is_empty() {
        writeln!(w, "No completed survey items.")?;
        return Ok(());
    }

    writeln!(w, "영역별 만족도")?;
    writeln!(w, "{}", "-".repeat(40))?;
    for row in &report.categories {
        let score = format!("{:.2}", row.score);
        if color.enabled() && row.score > 0.0 {
            writeln!(w, "  {:<12} {}", row.category, score.cyan())?;
        } else {
            writeln!(w, "  {:<12} {}", row.category, score)?;
        }
    }
    writeln!(w)?;

    writeln!(w, "문항별 상세")?;
    writeln!(w, "{}", "-".repeat(40))?;
    let mut current_category = "";
    for stat in &report.stats {
        if stat.category != current_category {
            current_category = &stat.category;
            if color.enabled() {
                writeln!(w, "[{}]", current_category.bold())?;
            } else {
                writeln!(w, "[{}]", current_category)?;
            }
        }
        writeln!(
            w,
            "  {} ({}명, 평균 {:.2})",
            stat.question, stat.count, stat.average_score
        )?;
        let dist = stat
            .distribution
            .entries()
            .into_iter()
            .map(|(label, n)| format!("{} {}", label, n))
            .collect::<Vec<_>>()
            .join(" | ");
        if color.enabled() {
            writeln!(w, "      {}", dist.dimmed())?;
        } else {
            writeln!(w, "      {}", dist)?;
        }
    }

    Ok(())
}
