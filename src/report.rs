use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;

use crate::analyzer::SeniorReport;
use crate::models::{ComparisonRow, DistributionRow};

const CHART_WIDTH: f64 = 640.0;
const BAR_HEIGHT: f64 = 22.0;
const LABEL_WIDTH: f64 = 200.0;

fn open(path: &Path) -> Result<Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))
}

/// One row per category with MP and population counts, shares and the representation index.
pub fn generate_comparison_csv(rows: &[ComparisonRow], category_header: &str, path: &Path) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(&[
        category_header,
        "mp_count",
        "mp_percentage",
        "pop_count",
        "pop_percentage",
        "representation_index",
    ])?;

    for row in rows {
        writer.write_record(&[
            row.category.clone(),
            row.mp_count.to_string(),
            row.mp_percentage.to_string(),
            row.pop_count.to_string(),
            row.pop_percentage.to_string(),
            row.representation_index.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn generate_distribution_csv(rows: &[DistributionRow], category_header: &str, path: &Path) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(&[category_header, "absolute_count", "percentage"])?;

    for row in rows {
        writer.write_record(&[
            row.category.clone(),
            row.absolute_count.to_string(),
            row.percentage.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Seniors oldest first.
pub fn generate_senior_members_csv(report: &SeniorReport, path: &Path) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(&["nome", "cognome", "genere", "eta", "ramo"])?;

    for member in &report.members {
        writer.write_record(&[
            member.nome.clone().unwrap_or_default(),
            member.cognome.clone().unwrap_or_default(),
            member.genere.clone().unwrap_or_default(),
            member.age.to_string(),
            member.ramo.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Senior counts by gender, age range and chamber in one long table.
pub fn generate_senior_summary_csv(report: &SeniorReport, path: &Path) -> Result<()> {
    let mut writer = open(path)?;
    writer.write_record(&["breakdown", "category", "count", "total", "percentage"])?;

    let seniors = report.members.len() as u64;
    let share = |count: u64| {
        if seniors == 0 {
            0.0
        } else {
            count as f64 / seniors as f64 * 100.0
        }
    };

    for (gender, count) in &report.by_gender {
        writer.write_record(&[
            "gender".to_string(),
            gender.clone(),
            count.to_string(),
            seniors.to_string(),
            share(*count).to_string(),
        ])?;
    }
    for (range, count) in &report.by_age_range {
        writer.write_record(&[
            "age_range".to_string(),
            range.clone(),
            count.to_string(),
            seniors.to_string(),
            share(*count).to_string(),
        ])?;
    }
    for chamber in &report.by_chamber {
        writer.write_record(&[
            "chamber".to_string(),
            chamber.chamber.clone(),
            chamber.seniors.to_string(),
            chamber.members.to_string(),
            chamber.percentage.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Standalone HTML page with a horizontal SVG bar chart.
pub fn render_bar_chart(title: &str, bars: &[(String, f64)]) -> String {
    let max = bars.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let plot_width = CHART_WIDTH - LABEL_WIDTH - 60.0;
    let height = BAR_HEIGHT * bars.len() as f64 + 20.0;

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape(title)));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape(title)));
    html.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" font-family=\"sans-serif\" font-size=\"12\">\n",
        CHART_WIDTH, height
    ));

    for (i, (label, value)) in bars.iter().enumerate() {
        let y = i as f64 * BAR_HEIGHT + 10.0;
        let width = if max > 0.0 { value / max * plot_width } else { 0.0 };
        html.push_str(&format!(
            "  <text x=\"{}\" y=\"{:.1}\" text-anchor=\"end\">{}</text>\n",
            LABEL_WIDTH - 6.0,
            y + BAR_HEIGHT * 0.65,
            escape(label)
        ));
        html.push_str(&format!(
            "  <rect x=\"{}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#4a78b5\"/>\n",
            LABEL_WIDTH,
            y,
            width,
            BAR_HEIGHT - 4.0
        ));
        html.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\">{:.2}</text>\n",
            LABEL_WIDTH + width + 4.0,
            y + BAR_HEIGHT * 0.65,
            value
        ));
    }

    html.push_str("</svg>\n</body>\n</html>\n");
    html
}

/// Representation index per region; regions with an undefined index are left out.
pub fn generate_region_chart(rows: &[ComparisonRow], path: &Path) -> Result<()> {
    let bars: Vec<(String, f64)> = rows
        .iter()
        .filter_map(|row| row.representation_index.value().map(|v| (row.category.clone(), v)))
        .collect();
    let html = render_bar_chart("Representation index by region of birth", &bars);
    fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn generate_senior_chart(report: &SeniorReport, path: &Path) -> Result<()> {
    let mut bars: Vec<(String, f64)> = report
        .by_age_range
        .iter()
        .map(|(range, count)| (range.clone(), *count as f64))
        .collect();
    bars.extend(
        report
            .by_gender
            .iter()
            .map(|(gender, count)| (format!("Gender {}", gender), *count as f64)),
    );
    let html = render_bar_chart("MPs aged 70 and over", &bars);
    fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RepresentationIndex;

    fn comparison(category: &str, index: RepresentationIndex) -> ComparisonRow {
        ComparisonRow {
            category: category.to_string(),
            mp_count: 1,
            mp_percentage: 0.5,
            pop_count: 0,
            pop_percentage: 0.0,
            representation_index: index,
        }
    }

    #[test]
    fn comparison_csv_marks_undefined_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("gender_comparison_analysis.csv");
        let rows = vec![
            comparison("F", RepresentationIndex::Ratio(0.5)),
            comparison("X", RepresentationIndex::Undefined),
        ];
        generate_comparison_csv(&rows, "gender", &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "gender,mp_count,mp_percentage,pop_count,pop_percentage,representation_index"
        );
        assert_eq!(lines[1], "F,1,0.5,0,0,0.5");
        assert_eq!(lines[2], "X,1,0.5,0,0,undefined");
    }

    #[test]
    fn distribution_csv_has_three_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gender_analysis_summary.csv");
        let rows = vec![DistributionRow {
            category: "M".to_string(),
            absolute_count: 3,
            percentage: 75.0,
        }];
        generate_distribution_csv(&rows, "genere", &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "genere,absolute_count,percentage\nM,3,75\n");
    }

    #[test]
    fn chart_skips_undefined_and_escapes_labels() {
        let rows = vec![
            comparison("Valle d'Aosta & co", RepresentationIndex::Ratio(2.0)),
            comparison("Molise", RepresentationIndex::Undefined),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.html");
        generate_region_chart(&rows, &path).unwrap();

        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("Valle d'Aosta &amp; co"));
        assert!(!html.contains("Molise"));
        assert_eq!(html.matches("<rect").count(), 1);
    }

    #[test]
    fn empty_chart_is_still_valid_html() {
        let html = render_bar_chart("Empty", &[]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("</svg>"));
    }
}
