//! PDF rendering of a [`ReportDocument`] with `genpdf`.

use super::document::ReportDocument;
use super::ExportError;
use crate::config::ExportConfig;
use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::fonts::{self, FontData, FontFamily};
use genpdf::style::Style;
use genpdf::{Document, Element, SimplePageDecorator};
use std::path::PathBuf;

/// Fonts shipped with the crate.
const BUNDLED_FONTS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fonts");

/// Further directories searched after `export.fonts_dir` and the bundled fonts.
const FONT_DIRS: &[&str] = &[
    "./fonts",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation-sans",
    "/System/Library/Fonts/Supplemental",
    "/Library/Fonts",
];

fn font_dirs(config: &ExportConfig) -> Vec<PathBuf> {
    config
        .fonts_dir
        .iter()
        .cloned()
        .chain(std::iter::once(PathBuf::from(BUNDLED_FONTS_DIR)))
        .chain(FONT_DIRS.iter().map(PathBuf::from))
        .collect()
}

/// Load the configured font family from the first directory that has it.
pub fn load_fonts(config: &ExportConfig) -> Result<FontFamily<FontData>, ExportError> {
    let dirs = font_dirs(config);
    dirs.iter()
        .filter(|dir| dir.is_dir())
        .find_map(|dir| fonts::from_files(dir, &config.font_family, None).ok())
        .ok_or_else(|| ExportError::FontsUnavailable {
            family: config.font_family.clone(),
            searched: dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

fn heading(text: &str) -> impl Element {
    Paragraph::new(text).styled(Style::new().bold().with_font_size(14))
}

fn cell(text: &str) -> impl Element {
    Paragraph::new(text).padded(1)
}

fn header_cell(text: &str) -> impl Element {
    Paragraph::new(text).styled(Style::new().bold()).padded(1)
}

pub fn render(doc: &ReportDocument, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    let mut pdf = Document::new(load_fonts(config)?);
    pdf.set_title(doc.title.clone());
    pdf.set_minimal_conformance();
    pdf.set_line_spacing(1.25);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(15);
    pdf.set_page_decorator(decorator);

    pdf.push(Paragraph::new(doc.title.as_str()).styled(Style::new().bold().with_font_size(18)));
    pdf.push(Break::new(1.0));

    let mut metadata = TableLayout::new(vec![1, 2]);
    metadata.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    for (key, value) in &doc.metadata {
        metadata
            .row()
            .element(header_cell(key))
            .element(cell(value))
            .push()?;
    }
    pdf.push(metadata);
    pdf.push(Break::new(1.0));

    pdf.push(heading("Risk Summary"));
    pdf.push(Break::new(0.3));
    pdf.push(Paragraph::new(doc.risk_summary.as_str()));
    pdf.push(Break::new(1.0));

    pdf.push(heading("Risk Statistics"));
    pdf.push(Break::new(0.3));
    let mut stats = TableLayout::new(vec![2, 1, 1]);
    stats.set_cell_decorator(FrameCellDecorator::new(true, true, false));
    stats
        .row()
        .element(header_cell("Risk Level"))
        .element(header_cell("Count"))
        .element(header_cell("Percentage"))
        .push()?;
    for row in &doc.statistics {
        stats
            .row()
            .element(cell(row.tier.as_str()))
            .element(cell(&row.count.to_string()))
            .element(cell(&row.percentage))
            .push()?;
    }
    pdf.push(stats);
    pdf.push(Break::new(1.0));

    pdf.push(heading("Recommendations"));
    pdf.push(Break::new(0.3));
    for (i, recommendation) in doc.recommendations.iter().enumerate() {
        pdf.push(Paragraph::new(format!("{}. {}", i + 1, recommendation)));
    }

    if !doc.high_risk_details.is_empty() {
        pdf.push(Break::new(1.0));
        pdf.push(heading("High Risk Details"));
        for detail in &doc.high_risk_details {
            pdf.push(Break::new(0.5));
            pdf.push(
                Paragraph::new(format!("Log #{}", detail.log_number)).styled(Style::new().bold()),
            );
            let r = &detail.record;
            for line in [
                format!("Username: {}", r.username),
                format!("IP Address: {}", r.ip_address),
                format!("Timestamp: {}", r.timestamp),
                format!("Location: {}", r.location),
                format!("Device: {}", r.device),
                format!("Login Status: {}", r.login_status),
                format!("Risk Factors: {}", detail.risk_factors),
            ] {
                pdf.push(Paragraph::new(line).styled(Style::new().with_font_size(10)));
            }
        }
    }

    let mut buffer = Vec::new();
    pdf.render(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use crate::classify::{ClassificationResult, RiskLevel, Verdict};
    use crate::ingest::{InputFormat, LogRecord};

    fn analysis(level: RiskLevel) -> Analysis {
        Analysis::new(
            InputFormat::Delimited,
            vec![LogRecord {
                username: "alice".into(),
                ip_address: "10.0.0.5".into(),
                timestamp: "2024-01-15T02:00:00".into(),
                location: "Unknown".into(),
                device: "Unknown Device".into(),
                login_status: "failed".into(),
            }],
            ClassificationResult {
                overall_risk_score: level,
                risk_summary: "Night-time failure".into(),
                log_analysis: vec![Verdict {
                    log_index: 0,
                    risk_level: level,
                    risk_factors: vec!["unusual login time".into()],
                    explanation: "3am".into(),
                }],
                recommendations: vec!["Reset password".into()],
            },
        )
    }

    fn render_default(level: RiskLevel) -> Vec<u8> {
        let doc = ReportDocument::from_analysis(&analysis(level));
        render(&doc, &ExportConfig::default()).unwrap()
    }

    #[test]
    fn test_bundled_fonts_load_by_default() {
        assert!(load_fonts(&ExportConfig::default()).is_ok());
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render_default(RiskLevel::High);
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_high_details_section_only_with_high_records() {
        let high = ReportDocument::from_analysis(&analysis(RiskLevel::High));
        let low = ReportDocument::from_analysis(&analysis(RiskLevel::Low));
        assert_eq!(high.high_risk_details.len(), 1);
        assert!(low.high_risk_details.is_empty());

        // Both variants render; the one without HIGH records is shorter.
        let with_details = render_default(RiskLevel::High);
        let without_details = render_default(RiskLevel::Low);
        assert!(without_details.starts_with(b"%PDF"));
        assert!(without_details.len() < with_details.len());
    }

    #[test]
    fn test_missing_fonts_is_an_error() {
        let config = ExportConfig {
            fonts_dir: Some(PathBuf::from("/nonexistent/fonts")),
            font_family: "NoSuchFontFamily".to_string(),
        };
        match load_fonts(&config) {
            Err(ExportError::FontsUnavailable { family, searched }) => {
                assert_eq!(family, "NoSuchFontFamily");
                assert!(searched.starts_with("/nonexistent/fonts"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("font family should not exist"),
        }
    }
}
