use std::io::Write;
use std::path::Path;

use crate::types::{ExportFormat, Report};

/// UTF-8 byte order mark. Prepended to CSV output so spreadsheet software
/// decodes the Hangul headers correctly.
const BOM: &str = "\u{FEFF}";

const REPORT_HEADING: &str = "교육만족도 조사 결과 보고서";

/// Render and write a report to the given path.
pub fn export_report(report: &Report, format: ExportFormat, path: &Path) -> Result<(), String> {
    let content = render_report(report, format);
    let mut file =
        std::fs::File::create(path).map_err(|e| format!("Failed to create file: {}", e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| format!("Failed to write: {}", e))?;
    Ok(())
}

pub fn render_report(report: &Report, format: ExportFormat) -> String {
    match format {
        ExportFormat::Json => export_json(report),
        ExportFormat::Csv => export_csv(report),
        ExportFormat::Markdown => export_markdown(report),
        ExportFormat::Text => export_text(report),
    }
}

/// `"12.5% (5명 / 40명)"`, with `0%` and `-` standing in when the target
/// audience is unknown.
fn participation_cell(report: &Report) -> String {
    let rate = match report.participation_rate {
        Some(r) => format!("{:.1}", r),
        None => "0".to_string(),
    };
    let target = if report.target_audience > 0 {
        report.target_audience.to_string()
    } else {
        "-".to_string()
    };
    format!(
        "{}% ({}명 / {}명)",
        rate, report.completed_respondents, target
    )
}

fn export_json(report: &Report) -> String {
    // Report's Serialize derive carries the full structure; pretty-print so
    // the file is diffable.
    let mut out = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
    out.push('\n');
    out
}

fn csv_escape(s: &str) -> String {
    if s.contains('"') || s.contains(',') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn export_csv(report: &Report) -> String {
    let mut out = String::from(BOM);
    out.push_str(REPORT_HEADING);
    out.push_str("\n\n");

    out.push_str("1. 종합 요약\n");
    out.push_str(&format!(
        "교육명,{}\n",
        report.display_title().replace(',', " ")
    ));
    out.push_str(&format!("전체 만족도,{:.2}\n", report.overall_satisfaction));
    out.push_str(&format!("참여율,{}\n", csv_escape(&participation_cell(report))));
    out.push_str(&format!("분석 파일 수,{}개\n\n", report.file_count));

    out.push_str("2. 영역별 만족도\n");
    out.push_str("영역,점수 (5점 만점)\n");
    for row in &report.categories {
        out.push_str(&format!("{},{:.2}\n", csv_escape(&row.category), row.score));
    }
    out.push('\n');

    out.push_str("3. 문항별 상세 분석\n");
    out.push_str("카테고리,문항,응답수,평균,매우만족,만족,보통,불만,매우불만\n");
    for stat in &report.stats {
        let d = &stat.distribution;
        out.push_str(&format!(
            "{},\"{}\",{},{:.2},{},{},{},{},{}\n",
            csv_escape(&stat.category),
            stat.question.replace('"', "\"\""),
            stat.count,
            stat.average_score,
            d.very_satisfied,
            d.satisfied,
            d.neutral,
            d.dissatisfied,
            d.very_dissatisfied,
        ));
    }
    out
}

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|")
}

fn export_markdown(report: &Report) -> String {
    let mut out = format!("# {}\n\n", REPORT_HEADING);

    out.push_str("## 1. 종합 요약\n\n");
    out.push_str(&format!("- **교육명:** {}\n", report.display_title()));
    out.push_str(&format!(
        "- **전체 만족도:** {:.2} / 5.0\n",
        report.overall_satisfaction
    ));
    out.push_str(&format!("- **참여율:** {}\n", participation_cell(report)));
    out.push_str(&format!("- **분석 파일 수:** {}개\n\n", report.file_count));

    out.push_str("## 2. 영역별 만족도\n\n");
    out.push_str("| 영역 | 점수 (5점 만점) |\n");
    out.push_str("|------|----------------|\n");
    for row in &report.categories {
        out.push_str(&format!("| {} | {:.2} |\n", md_escape(&row.category), row.score));
    }
    out.push('\n');

    out.push_str("## 3. 문항별 상세 분석\n\n");
    let mut current_category = "";
    let mut open_table = false;
    for stat in &report.stats {
        if stat.category != current_category {
            current_category = &stat.category;
            if open_table {
                out.push('\n');
            }
            out.push_str(&format!("### {}\n\n", md_escape(current_category)));
            out.push_str("| 문항 | 응답수 | 평균 | 매우만족 | 만족 | 보통 | 불만 | 매우불만 |\n");
            out.push_str("|------|--------|------|----------|------|------|------|----------|\n");
            open_table = true;
        }
        let d = &stat.distribution;
        out.push_str(&format!(
            "| {} | {}명 | {:.2} | {} | {} | {} | {} | {} |\n",
            md_escape(&stat.question),
            stat.count,
            stat.average_score,
            d.very_satisfied,
            d.satisfied,
            d.neutral,
            d.dissatisfied,
            d.very_dissatisfied,
        ));
    }
    if open_table {
        out.push('\n');
    }
    out
}

fn export_text(report: &Report) -> String {
    let mut out = String::from(REPORT_HEADING);
    out.push('\n');
    out.push_str(&"=".repeat(60));
    out.push_str("\n\n");

    out.push_str("1. 종합 요약\n");
    out.push_str(&format!("  교육명: {}\n", report.display_title()));
    out.push_str(&format!(
        "  전체 만족도: {:.2} / 5.0\n",
        report.overall_satisfaction
    ));
    out.push_str(&format!("  참여율: {}\n", participation_cell(report)));
    out.push_str(&format!("  분석 파일 수: {}개\n\n", report.file_count));

    out.push_str("2. 영역별 만족도\n");
    for row in &report.categories {
        out.push_str(&format!("  {}: {:.2}\n", row.category, row.score));
    }
    out.push('\n');

    out.push_str("3. 문항별 상세 분석\n");
    let mut current_category = "";
    for stat in &report.stats {
        if stat.category != current_category {
            current_category = &stat.category;
            out.push_str(&format!("\n  [{}]\n", current_category));
        }
        out.push_str(&format!(
            "  - {} ({}명, 평균 {:.2})\n",
            stat.question, stat.count, stat.average_score
        ));
        let dist = stat
            .distribution
            .entries()
            .into_iter()
            .map(|(label, n)| format!("{}: {}", label, n))
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&format!("      {}\n", dist));
    }
    out
}
