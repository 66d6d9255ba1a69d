//! # 내보내기(Export)
//!
//! 저장된 비교 결과를 JSON, HTML, CSV 문자열로 렌더링합니다.
//! 세 형식 모두 순수 함수이며, 같은 결과를 두 번 내보내면 바이트 단위로 같은 출력이 나옵니다.
//!
//! HTML은 세그먼트 내용을 반드시 이스케이프한 뒤 삽입합니다 (`& < > " '`).

use std::fmt::Write as _;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::models::{ComparisonResult, DiffView, Granularity, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Html,
    Csv,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    /// 대소문자를 구분하지 않습니다 (`JSON`, `Html` 모두 허용).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(AppError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// 렌더링된 내보내기 본문과 다운로드용 메타데이터
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub filename: String,
    pub body: String,
    /// 본문의 SHA-256 (hex). 같은 결과는 항상 같은 ETag를 가집니다.
    pub etag: String,
}

/// HTML/CSV는 지정한 granularity의 뷰 하나를 렌더링합니다. JSON은 결과 전체입니다.
pub fn export(
    result: &ComparisonResult,
    format: ExportFormat,
    granularity: Granularity,
) -> Result<String, AppError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        ExportFormat::Html => Ok(render_html(result, result.views.get(granularity))),
        ExportFormat::Csv => Ok(render_csv(result.views.get(granularity))),
    }
}

pub fn export_file(
    result: &ComparisonResult,
    format: ExportFormat,
    granularity: Granularity,
) -> Result<ExportedFile, AppError> {
    let body = export(result, format, granularity)?;
    let etag = hex_digest(&body);
    Ok(ExportedFile {
        format,
        filename: filename(result, format),
        body,
        etag,
    })
}

fn filename(result: &ComparisonResult, format: ExportFormat) -> String {
    let title = slug::slugify(&result.original.title);
    if title.is_empty() {
        format!("comparison-{}.{}", result.id, format.extension())
    } else {
        format!("comparison-{}-{}.{}", title, result.id, format.extension())
    }
}

fn hex_digest(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// HTML 특수 문자 이스케이프
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn css_class(operation: Operation) -> &'static str {
    match operation {
        Operation::Add => "diff-added",
        Operation::Remove => "diff-removed",
        Operation::Equal => "diff-unchanged",
    }
}

/// 통계 블록 + 선택한 뷰. 숫자 외의 모든 텍스트는 이스케이프됩니다.
fn render_html(result: &ComparisonResult, view: &DiffView) -> String {
    let stats = &result.statistics;
    let mut html = String::new();

    html.push_str("<div class=\"diff-container\">\n");
    html.push_str("<div class=\"diff-stats\">\n");
    let _ = writeln!(
        html,
        "<div class=\"stat-item\"><span class=\"stat-label\">Similarity:</span> <span class=\"stat-value\">{}%</span></div>",
        stats.similarity
    );
    let _ = writeln!(
        html,
        "<div class=\"stat-item\"><span class=\"stat-label\">Additions:</span> <span class=\"stat-value stat-additions\">{}</span></div>",
        stats.additions_count
    );
    let _ = writeln!(
        html,
        "<div class=\"stat-item\"><span class=\"stat-label\">Deletions:</span> <span class=\"stat-value stat-deletions\">{}</span></div>",
        stats.deletions_count
    );
    let _ = writeln!(
        html,
        "<div class=\"stat-item\"><span class=\"stat-label\">Total Changes:</span> <span class=\"stat-value\">{}</span></div>",
        stats.total_changes
    );
    html.push_str("</div>\n");

    html.push_str("<div class=\"diff-content\">");
    for (index, segment) in view.segments.iter().enumerate() {
        let _ = write!(
            html,
            "<span class=\"{}\" data-change-id=\"{}\">{}</span>",
            css_class(segment.operation),
            index,
            escape_html(&segment.content)
        );
    }
    html.push_str("</div>\n</div>\n");
    html
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// 뷰의 세그먼트당 한 행. 모든 필드를 따옴표로 감싸고 내부 따옴표는 두 번 씁니다.
fn render_csv(view: &DiffView) -> String {
    let mut csv = String::from("operation,content,granularity\n");
    for segment in &view.segments {
        let _ = writeln!(
            csv,
            "{},{},{}",
            csv_field(segment.operation.as_str()),
            csv_field(&segment.content),
            csv_field(view.granularity.as_str())
        );
    }
    csv
}
