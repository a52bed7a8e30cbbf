//! Figures of intra-taxon variation, rendered as standalone SVG documents.
//!
//! Two families of figures are drawn, each as a box plot or a line plot
//! ([`PlotType`]):
//!
//! - [`rank_figure`]: the groups of one rank, sorted by decreasing median.
//! - [`cross_rank_figure`]: all computed ranks in one figure.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::DnaBarcoderError;
use crate::stats::{median, round_score, BoxSummary};
use crate::variation::{VariationRecord, Variations};

const WIDTH: f64 = 480.0;
const HEIGHT: f64 = 480.0;
const FONT_SIZE: f64 = 11.0;

const MEDIAN_COLOR: &str = "#1f3fbf";
const MIN_COLOR: &str = "#d62728";
const COUNT_COLOR: &str = "#2ca02c";
const GRID_COLOR: &str = "#d3d3d3";

/// Series colors of the cross-rank line plot.
const PALETTE: [&str; 9] = [
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#a6a633", "#a65628", "#f781bf",
    "#999999",
];

/// The kind of figure to draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlotType {
    /// Box-and-whisker plots of the median and minimum distributions.
    #[default]
    Boxplot,
    /// Median and minimum scores against the group index.
    Plot,
}

impl FromStr for PlotType {
    type Err = DnaBarcoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boxplot" => Ok(PlotType::Boxplot),
            "plot" => Ok(PlotType::Plot),
            _ => Err(DnaBarcoderError::UnsupportedPlotType(s.to_string())),
        }
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlotType::Boxplot => write!(f, "boxplot"),
            PlotType::Plot => write!(f, "plot"),
        }
    }
}

/// Write an SVG document to `filepath`.
pub fn write_svg(filepath: impl AsRef<Path>, svg: &str) -> Result<(), DnaBarcoderError> {
    std::fs::write(filepath, svg)?;
    Ok(())
}

/// The figure of one rank. `rank_title` is the (pluralised) rank name used
/// in the title.
pub fn rank_figure(variations: &Variations, rank_title: &str, plot_type: PlotType) -> String {
    let sorted = variations.sorted_by_median();
    let medians: Vec<f64> = sorted.iter().map(|(_, r)| r.median).collect();
    let mins: Vec<f64> = sorted.iter().map(|(_, r)| r.min).collect();
    match plot_type {
        PlotType::Boxplot => box_figure(
            &format!("Median and min. similarity scores of {}", rank_title),
            &[
                BoxSeries::new("Median", medians, MEDIAN_COLOR),
                BoxSeries::new("Min", mins, MIN_COLOR),
            ],
            false,
        ),
        PlotType::Plot => rank_line_figure(&sorted, rank_title),
    }
}

/// The figure comparing several ranks, given as `(label, variations)` pairs.
pub fn cross_rank_figure(ranks: &[(&str, &Variations)], plot_type: PlotType) -> String {
    match plot_type {
        PlotType::Boxplot => {
            let mut series = Vec::with_capacity(ranks.len() * 2);
            for (label, variations) in ranks {
                let sorted = variations.sorted_by_median();
                series.push(BoxSeries::new(
                    format!("Median_{}", label),
                    sorted.iter().map(|(_, r)| r.median).collect(),
                    MEDIAN_COLOR,
                ));
                series.push(BoxSeries::new(
                    format!("Min_{}", label),
                    sorted.iter().map(|(_, r)| r.min).collect(),
                    MIN_COLOR,
                ));
            }
            box_figure("Median and min. similarity scores of all groups", &series, true)
        }
        PlotType::Plot => cross_rank_line_figure(ranks),
    }
}

struct BoxSeries {
    label: String,
    values: Vec<f64>,
    color: &'static str,
}

impl BoxSeries {
    fn new(label: impl Into<String>, values: Vec<f64>, color: &'static str) -> Self {
        Self {
            label: label.into(),
            values,
            color,
        }
    }
}

fn box_figure(title: &str, series: &[BoxSeries], rotate_labels: bool) -> String {
    let bottom_margin = if rotate_labels { 130.0 } else { 50.0 };
    let frame = Frame::new(
        70.0,
        30.0,
        40.0,
        bottom_margin,
        series.iter().flat_map(|s| s.values.iter().copied()),
    );
    let mut canvas = Canvas::new(WIDTH, HEIGHT);
    canvas.title(title);
    frame.draw_score_axis(&mut canvas, "Similarity score");

    let slot = frame.width() / series.len().max(1) as f64;
    let box_width = (slot * 0.5).min(60.0);
    for (i, s) in series.iter().enumerate() {
        let cx = frame.left + slot * (i as f64 + 0.5);
        let label_y = frame.bottom() + 16.0;
        if rotate_labels {
            canvas.rotated_text(cx, label_y, &s.label, "end", -90.0);
        } else {
            canvas.text(cx, label_y, &s.label, "middle", "black");
        }
        let Some(summary) = BoxSummary::new(&s.values) else {
            continue;
        };
        let half = box_width / 2.0;
        // whiskers
        canvas.line(cx, frame.y(summary.whisker_low), cx, frame.y(summary.q1), "black", None);
        canvas.line(cx, frame.y(summary.q3), cx, frame.y(summary.whisker_high), "black", None);
        for whisker in [summary.whisker_low, summary.whisker_high] {
            let y = frame.y(whisker);
            canvas.line(cx - half / 2.0, y, cx + half / 2.0, y, "black", None);
        }
        let top = frame.y(summary.q3);
        let height = (frame.y(summary.q1) - top).max(1.0);
        canvas.rect(cx - half, top, box_width, height, s.color, "black");
        let median_y = frame.y(summary.median);
        canvas.line(cx - half, median_y, cx + half, median_y, "#ff7f0e", None);
        canvas.circle(cx, frame.y(summary.mean), 3.5, "white", "black");
        for outlier in &summary.outliers {
            canvas.cross(cx, frame.y(*outlier), 4.0, MIN_COLOR);
        }
        canvas.text(
            cx,
            frame.top + 14.0,
            &round_score(summary.median).to_string(),
            "middle",
            s.color,
        );
    }
    canvas.finish()
}

fn rank_line_figure(sorted: &[(&str, &VariationRecord)], rank_title: &str) -> String {
    let mut medians: Vec<f64> = sorted.iter().map(|(_, r)| r.median).collect();
    let mut mins: Vec<f64> = sorted.iter().map(|(_, r)| r.min).collect();
    let counts: Vec<f64> = sorted.iter().map(|(_, r)| r.count as f64).collect();
    let frame = Frame::new(
        70.0,
        70.0,
        40.0,
        60.0,
        medians.iter().chain(mins.iter()).copied(),
    );
    let mut canvas = Canvas::new(WIDTH, HEIGHT);
    canvas.title(&format!(
        "Median and minimum similarity scores of the {}",
        rank_title.to_lowercase()
    ));
    frame.draw_score_axis(&mut canvas, "Similarity score");
    frame.draw_index_axis(&mut canvas, sorted.len());

    let max_count = counts.iter().copied().fold(1.0, f64::max);
    frame.draw_count_axis(&mut canvas, max_count, "Number of sequences");
    let count_points: Vec<(f64, f64)> = counts
        .iter()
        .enumerate()
        .map(|(i, c)| (frame.x(i, sorted.len()), frame.count_y(*c, max_count)))
        .collect();
    canvas.polyline(&count_points, COUNT_COLOR, None);

    let median_points: Vec<(f64, f64)> = medians
        .iter()
        .enumerate()
        .map(|(i, m)| (frame.x(i, sorted.len()), frame.y(*m)))
        .collect();
    canvas.polyline(&median_points, MEDIAN_COLOR, Some("6,4"));
    for (i, m) in mins.iter().enumerate() {
        canvas.square(frame.x(i, sorted.len()), frame.y(*m), 4.0, MIN_COLOR);
    }

    let median_median = median(&mut medians).map_or(0.0, round_score);
    let median_min = median(&mut mins).map_or(0.0, round_score);
    canvas.legend(
        frame.left + 10.0,
        frame.bottom() - 40.0,
        &[
            (format!("Median. Median score: {}", median_median), MEDIAN_COLOR),
            (format!("Min. Median score: {}", median_min), MIN_COLOR),
        ],
    );
    canvas.finish()
}

fn cross_rank_line_figure(ranks: &[(&str, &Variations)]) -> String {
    let series: Vec<(&str, Vec<f64>)> = ranks
        .iter()
        .map(|(label, variations)| {
            let sorted = variations.sorted_by_median();
            (*label, sorted.iter().map(|(_, r)| r.median).collect())
        })
        .collect();
    let frame = Frame::new(
        70.0,
        30.0,
        40.0,
        60.0,
        series.iter().flat_map(|(_, values)| values.iter().copied()),
    );
    let longest = series.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    let mut canvas = Canvas::new(WIDTH, HEIGHT);
    canvas.title("Median similarity scores of all groups");
    frame.draw_score_axis(&mut canvas, "Median similarity score");
    frame.draw_index_axis(&mut canvas, longest);

    let mut legend = Vec::with_capacity(series.len());
    for (k, (label, values)) in series.iter().enumerate() {
        let color = PALETTE[k % PALETTE.len()];
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, m)| (frame.x(i, longest), frame.y(*m)))
            .collect();
        canvas.polyline(&points, color, None);
        let mut values = values.clone();
        let median_median = median(&mut values).map_or(0.0, round_score);
        legend.push((format!("{}. Median {}", label, median_median), color));
    }
    let legend_height = 16.0 * legend.len() as f64;
    canvas.legend(frame.left + 10.0, frame.bottom() - legend_height, &legend);
    canvas.finish()
}

/// The plotting area and its score scale.
struct Frame {
    left: f64,
    right: f64,
    top: f64,
    bottom_margin: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn new(
        left: f64,
        right: f64,
        top: f64,
        bottom_margin: f64,
        scores: impl Iterator<Item = f64>,
    ) -> Self {
        let lowest = scores.filter(|x| !x.is_nan()).fold(1.0, f64::min);
        let y_min = ((lowest * 10.0).floor() / 10.0).clamp(0.0, 0.9);
        Self {
            left,
            right,
            top,
            bottom_margin,
            y_min,
            y_max: 1.0,
        }
    }

    fn width(&self) -> f64 {
        WIDTH - self.left - self.right
    }

    fn height(&self) -> f64 {
        HEIGHT - self.top - self.bottom_margin
    }

    fn bottom(&self) -> f64 {
        HEIGHT - self.bottom_margin
    }

    fn y(&self, score: f64) -> f64 {
        let frac = (score - self.y_min) / (self.y_max - self.y_min);
        self.bottom() - frac.clamp(0.0, 1.0) * self.height()
    }

    fn x(&self, index: usize, n: usize) -> f64 {
        self.left + self.width() * (index as f64 + 0.5) / n.max(1) as f64
    }

    fn count_y(&self, count: f64, max_count: f64) -> f64 {
        self.bottom() - count / max_count * self.height()
    }

    fn draw_score_axis(&self, canvas: &mut Canvas, label: &str) {
        let ticks = 5;
        for t in 0..=ticks {
            let score = self.y_min + (self.y_max - self.y_min) * t as f64 / ticks as f64;
            let y = self.y(score);
            canvas.line(self.left, y, self.left + self.width(), y, GRID_COLOR, None);
            canvas.text(self.left - 6.0, y + 4.0, &format!("{:.2}", score), "end", "black");
        }
        canvas.line(self.left, self.top, self.left, self.bottom(), "black", None);
        canvas.line(
            self.left,
            self.bottom(),
            self.left + self.width(),
            self.bottom(),
            "black",
            None,
        );
        canvas.rotated_text(18.0, self.top + self.height() / 2.0, label, "middle", -90.0);
    }

    fn draw_index_axis(&self, canvas: &mut Canvas, n: usize) {
        let step = (n / 5).max(1);
        for i in (0..n).step_by(step) {
            let x = self.x(i, n);
            canvas.line(x, self.bottom(), x, self.bottom() + 4.0, "black", None);
            canvas.text(x, self.bottom() + 16.0, &i.to_string(), "middle", "black");
        }
        canvas.text(
            self.left + self.width() / 2.0,
            self.bottom() + 36.0,
            "Group index",
            "middle",
            "black",
        );
    }

    fn draw_count_axis(&self, canvas: &mut Canvas, max_count: f64, label: &str) {
        let x = self.left + self.width();
        canvas.line(x, self.top, x, self.bottom(), "black", None);
        for count in [0.0, max_count / 2.0, max_count] {
            let y = self.count_y(count, max_count);
            canvas.line(x, y, x + 4.0, y, "black", None);
            canvas.text(x + 6.0, y + 4.0, &format!("{}", count.round()), "start", COUNT_COLOR);
        }
        canvas.rotated_text(WIDTH - 14.0, self.top + self.height() / 2.0, label, "middle", 90.0);
    }
}

/// Accumulates SVG elements.
struct Canvas {
    width: f64,
    height: f64,
    body: String,
}

impl Canvas {
    fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            body: String::new(),
        }
    }

    fn push(&mut self, element: String) {
        self.body.push_str(&element);
        self.body.push('\n');
    }

    fn title(&mut self, title: &str) {
        self.push(format!(
            r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="{}" font-weight="bold">{}</text>"#,
            self.width / 2.0,
            FONT_SIZE + 2.0,
            escape(title)
        ));
    }

    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: &str, dash: Option<&str>) {
        let dash = dash.map_or(String::new(), |d| format!(r#" stroke-dasharray="{}""#, d));
        self.push(format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}"{}/>"#,
            x1, y1, x2, y2, stroke, dash
        ));
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str, stroke: &str) {
        self.push(format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" stroke="{}"/>"#,
            x, y, width, height, fill, stroke
        ));
    }

    fn square(&mut self, cx: f64, cy: f64, half: f64, fill: &str) {
        self.rect(cx - half, cy - half, 2.0 * half, 2.0 * half, fill, fill);
    }

    fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str, stroke: &str) {
        self.push(format!(
            r#"<circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}" stroke="{}"/>"#,
            cx, cy, r, fill, stroke
        ));
    }

    fn cross(&mut self, cx: f64, cy: f64, half: f64, stroke: &str) {
        self.line(cx - half, cy, cx + half, cy, stroke, None);
        self.line(cx, cy - half, cx, cy + half, stroke, None);
    }

    fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, dash: Option<&str>) {
        if points.is_empty() {
            return;
        }
        let points: Vec<String> = points
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect();
        let dash = dash.map_or(String::new(), |d| format!(r#" stroke-dasharray="{}""#, d));
        self.push(format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="1.5"{}/>"#,
            points.join(" "),
            stroke,
            dash
        ));
    }

    fn text(&mut self, x: f64, y: f64, content: &str, anchor: &str, fill: &str) {
        self.push(format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="{}" font-size="{}" fill="{}">{}</text>"#,
            x,
            y,
            anchor,
            FONT_SIZE,
            fill,
            escape(content)
        ));
    }

    fn rotated_text(&mut self, x: f64, y: f64, content: &str, anchor: &str, degrees: f64) {
        self.push(format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="{}" font-size="{}" transform="rotate({} {:.1} {:.1})">{}</text>"#,
            x,
            y,
            anchor,
            FONT_SIZE,
            degrees,
            x,
            y,
            escape(content)
        ));
    }

    fn legend(&mut self, x: f64, y: f64, entries: &[(String, &str)]) {
        for (i, (label, color)) in entries.iter().enumerate() {
            let row = y + 16.0 * i as f64;
            self.line(x, row, x + 18.0, row, color, None);
            self.text(x + 24.0, row + 4.0, label, "start", "black");
        }
    }

    fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">\n\
             <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn variations() -> Variations {
        let mut variations = Variations::new();
        variations.insert("Alpha beta", (0.9, 0.8, 3).into());
        variations.insert("Gamma delta", (0.95, 0.9, 3).into());
        variations.insert("Omega sp", (1.0, 1.0, 1).into());
        variations
    }

    #[test]
    fn test_plot_type_from_str() {
        assert_eq!("boxplot".parse::<PlotType>().unwrap(), PlotType::Boxplot);
        assert_eq!("plot".parse::<PlotType>().unwrap(), PlotType::Plot);
        assert!(matches!(
            "violin".parse::<PlotType>(),
            Err(DnaBarcoderError::UnsupportedPlotType(t)) if t == "violin"
        ));
        assert_eq!(PlotType::default().to_string(), "boxplot");
    }

    #[test]
    fn test_rank_boxplot() {
        let svg = rank_figure(&variations(), "species", PlotType::Boxplot);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Median and min. similarity scores of species"));
        assert!(svg.contains(">Median<"));
        assert!(svg.contains(">Min<"));
        // the medians of the median and minimum distributions
        assert!(svg.contains(">0.95<"));
        assert!(svg.contains(">0.9<"));
    }

    #[test]
    fn test_rank_line_plot() {
        let svg = rank_figure(&variations(), "Families", PlotType::Plot);
        assert!(svg.contains("Median and minimum similarity scores of the families"));
        assert!(svg.contains("Group index"));
        assert!(svg.contains("Number of sequences"));
        assert!(svg.contains("Median. Median score: 0.95"));
        assert!(svg.contains("Min. Median score: 0.9"));
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[test]
    fn test_cross_rank_figures() {
        let species = variations();
        let mut genera = Variations::new();
        genera.insert("Alpha", (0.85, 0.7, 4).into());
        let ranks = [("species", &species), ("genera", &genera)];

        let svg = cross_rank_figure(&ranks, PlotType::Boxplot);
        assert!(svg.contains("Median and min. similarity scores of all groups"));
        for label in ["Median_species", "Min_species", "Median_genera", "Min_genera"] {
            assert!(svg.contains(label), "missing {}", label);
        }

        let svg = cross_rank_figure(&ranks, PlotType::Plot);
        assert!(svg.contains("Median similarity scores of all groups"));
        assert!(svg.contains("species. Median 0.95"));
        assert!(svg.contains("genera. Median 0.85"));
    }

    #[test]
    fn test_empty_and_escaped() {
        let empty = Variations::new();
        let svg = rank_figure(&empty, "groups at position 3", PlotType::Boxplot);
        assert!(svg.contains("groups at position 3"));
        let svg = rank_figure(&empty, "a<b & c", PlotType::Plot);
        assert!(svg.contains("a&lt;b &amp; c"));
    }

    #[test]
    fn test_one_element_per_line() {
        let species = variations();
        let figures = [
            rank_figure(&species, "species", PlotType::Boxplot),
            rank_figure(&species, "species", PlotType::Plot),
            cross_rank_figure(&[("species", &species)], PlotType::Plot),
        ];
        for svg in &figures {
            assert!(svg.ends_with("</svg>\n"));
            for line in svg.lines() {
                assert!(line.trim_start().starts_with('<') && line.ends_with('>'), "{}", line);
            }
        }
    }

    #[test]
    fn test_write_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("barcodes.1.variation.svg");
        write_svg(&path, &rank_figure(&variations(), "species", PlotType::Boxplot)).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    }
}
