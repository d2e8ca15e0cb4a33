//! Chart series and tables for the visualizer.

use serde::{Deserialize, Serialize};

use crate::config::*;

pub const TOPLINE_COLOR: &str = "rgba(75,192,192,0.2)";

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub data: Vec<f64>,
    pub color: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartSeries>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TableView {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The color of the subcategory at position `idx` out of `n`: hues spread from violet to green.
pub fn subcategory_color(idx: usize, n: usize) -> String {
    let frac = if n > 1 {
        idx as f64 / (n - 1) as f64
    } else {
        0.0
    };
    let hue = (270.0 + frac * 150.0) % 360.0;
    format!("hsl({},70%,50%)", hue)
}

pub fn topline_chart(topline: &Topline) -> ChartData {
    ChartData {
        labels: topline.labels.clone(),
        datasets: vec![ChartSeries {
            label: String::new(),
            data: topline.values.clone(),
            color: TOPLINE_COLOR.to_string(),
        }],
    }
}

pub fn crosstab_chart(crosstab: &Crosstab) -> ChartData {
    let n = crosstab.subcategories.len();
    let datasets = crosstab
        .subcategories
        .iter()
        .enumerate()
        .map(|(idx, sub)| ChartSeries {
            label: sub.clone(),
            data: crosstab.series.get(sub).cloned().unwrap_or_default(),
            color: subcategory_color(idx, n),
        })
        .collect();
    ChartData {
        labels: crosstab.groups.clone(),
        datasets,
    }
}

fn format_value(v: f64, mode: ViewMode) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    match mode {
        ViewMode::Absolute => format!("{}", v),
        ViewMode::Percentage => format!("{}%", v),
    }
}

fn value_header(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Absolute => "Count",
        ViewMode::Percentage => "Percentage (%)",
    }
}

pub fn topline_table(topline: &Topline) -> TableView {
    TableView {
        header: vec!["Answer".to_string(), value_header(topline.mode).to_string()],
        rows: topline
            .labels
            .iter()
            .zip(topline.values.iter())
            .map(|(label, v)| vec![label.clone(), format_value(*v, topline.mode)])
            .collect(),
    }
}

pub fn crosstab_table(crosstab: &Crosstab) -> TableView {
    let mut header = vec![String::new()];
    header.extend(crosstab.subcategories.iter().cloned());
    let rows = crosstab
        .groups
        .iter()
        .enumerate()
        .map(|(gi, group)| {
            let mut row = vec![group.clone()];
            for sub in crosstab.subcategories.iter() {
                let v = crosstab
                    .series
                    .get(sub)
                    .and_then(|values| values.get(gi))
                    .cloned()
                    .unwrap_or(0.0);
                row.push(format_value(v, crosstab.mode));
            }
            row
        })
        .collect();
    TableView { header, rows }
}

impl TableView {
    /// Plain text rendering: the first column is left-aligned, the values are right-aligned.
    pub fn to_text(&self) -> String {
        let ncols = self
            .rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; ncols];
        for row in std::iter::once(&self.header).chain(self.rows.iter()) {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }
        let mut out = String::new();
        for row in std::iter::once(&self.header).chain(self.rows.iter()) {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(idx, cell)| {
                    if idx == 0 {
                        format!("{:<width$}", cell, width = widths[idx])
                    } else {
                        format!("{:>width$}", cell, width = widths[idx])
                    }
                })
                .collect();
            out.push_str(cells.join(" | ").trim_end());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn crosstab() -> Crosstab {
        let mut series = BTreeMap::new();
        series.insert("No".to_string(), vec![50.0, 0.0]);
        series.insert("Yes".to_string(), vec![50.0, 100.0]);
        Crosstab {
            group_question: "Year".to_string(),
            result_question: "Vote".to_string(),
            mode: ViewMode::Percentage,
            groups: vec!["2025".to_string(), "2026".to_string()],
            subcategories: vec!["No".to_string(), "Yes".to_string()],
            series,
        }
    }

    #[test]
    fn colors() {
        assert_eq!(subcategory_color(0, 3), "hsl(270,70%,50%)");
        assert_eq!(subcategory_color(1, 3), "hsl(345,70%,50%)");
        assert_eq!(subcategory_color(2, 3), "hsl(60,70%,50%)");
        assert_eq!(subcategory_color(0, 1), "hsl(270,70%,50%)");
    }

    #[test]
    fn crosstab_series() {
        let chart = crosstab_chart(&crosstab());
        assert_eq!(chart.labels, vec!["2025", "2026"]);
        assert_eq!(chart.datasets.len(), 2);
        assert_eq!(chart.datasets[1].label, "Yes");
        assert_eq!(chart.datasets[1].data, vec![50.0, 100.0]);
        assert_eq!(chart.datasets[1].color, "hsl(60,70%,50%)");
    }

    #[test]
    fn crosstab_rows() {
        let table = crosstab_table(&crosstab());
        assert_eq!(table.header, vec!["", "No", "Yes"]);
        assert_eq!(table.rows[0], vec!["2025", "50%", "50%"]);
        assert_eq!(table.rows[1], vec!["2026", "0%", "100%"]);
    }

    #[test]
    fn topline_rows() {
        let topline = Topline {
            question: "Q".to_string(),
            mode: ViewMode::Absolute,
            labels: vec!["Yes".to_string(), "No Response".to_string()],
            values: vec![12.0, 3.0],
        };
        let table = topline_table(&topline);
        assert_eq!(table.header, vec!["Answer", "Count"]);
        assert_eq!(table.rows[0], vec!["Yes", "12"]);
        assert_eq!(
            table.to_text(),
            "Answer      | Count\nYes         |    12\nNo Response |     3\n"
        );
        let chart = topline_chart(&topline);
        assert_eq!(chart.datasets[0].color, TOPLINE_COLOR);
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(format_value(f64::NAN, ViewMode::Percentage), "0%");
        assert_eq!(format_value(33.33, ViewMode::Percentage), "33.33%");
    }
}
