//! SVG chart sink writing one CPU and one memory chart per run

use crate::config::OutputConfig;
use crate::error::{ProfilerError, Result};
use crate::report::{ChartSink, RunReport};
use async_trait::async_trait;
use std::fmt::{self, Write};
use std::path::PathBuf;
use tracing::info;

pub const CPU_CHART: &str = "CPU_profiling.svg";
pub const MEM_CHART: &str = "MEM_profiling.svg";
pub const SUMMARY_FILE: &str = "profile_summary.json";

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;

/// Plot description shared by both charts.
struct Chart<'a> {
    title: &'a str,
    y_label: &'a str,
    points: Vec<(f64, f64)>,
    annotation: String,
}

pub struct SvgChartSink {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    write_summary: bool,
}

impl SvgChartSink {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            output_dir: config.directory.clone(),
            width: config.width.max(200),
            height: config.height.max(200),
            write_summary: config.write_summary,
        }
    }

    fn render_svg(&self, chart: &Chart<'_>) -> Result<String> {
        let mut svg = String::new();
        self.write_svg(&mut svg, chart)
            .map_err(|e| ProfilerError::Report(e.to_string()))?;
        Ok(svg)
    }

    fn write_svg(&self, svg: &mut String, chart: &Chart<'_>) -> fmt::Result {
        let (w, h) = (self.width as f64, self.height as f64);
        let plot_w = w - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = h - MARGIN_TOP - MARGIN_BOTTOM;
        let max_t = chart
            .points
            .iter()
            .map(|(t, _)| *t)
            .fold(0.0, f64::max)
            .max(1.0);
        let x = |t: f64| MARGIN_LEFT + t / max_t * plot_w;
        let y = |v: f64| MARGIN_TOP + plot_h - v.clamp(0.0, 100.0) / 100.0 * plot_h;

        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
        )?;
        writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
        writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="20">{}</text>"#,
            w / 2.0,
            MARGIN_TOP / 2.0,
            escape(chart.title)
        )?;

        for tick in (0..=100).step_by(5) {
            let ty = y(tick as f64);
            writeln!(
                svg,
                r##"<line x1="{MARGIN_LEFT}" y1="{ty}" x2="{}" y2="{ty}" stroke="#e0e0e0"/>"##,
                MARGIN_LEFT + plot_w
            )?;
            writeln!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="end" font-size="12">{tick}</text>"#,
                MARGIN_LEFT - 8.0,
                ty + 4.0
            )?;
        }

        let axis_y = MARGIN_TOP + plot_h;
        writeln!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{axis_y}" x2="{}" y2="{axis_y}" stroke="black"/>"#,
            MARGIN_LEFT + plot_w
        )?;
        writeln!(
            svg,
            r#"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{axis_y}" stroke="black"/>"#
        )?;
        writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="14">Time(s)</text>"#,
            MARGIN_LEFT + plot_w / 2.0,
            h - MARGIN_BOTTOM / 3.0
        )?;
        writeln!(
            svg,
            r#"<text x="20" y="{mid}" text-anchor="middle" font-size="14" transform="rotate(-90 20 {mid})">{}</text>"#,
            escape(chart.y_label),
            mid = MARGIN_TOP + plot_h / 2.0
        )?;

        let polyline = chart
            .points
            .iter()
            .map(|&(t, v)| format!("{:.2},{:.2}", x(t), y(v)))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            svg,
            r##"<polyline fill="none" stroke="#1f77b4" stroke-width="2" points="{polyline}"/>"##
        )?;

        writeln!(
            svg,
            r#"<text x="{}" y="{}" font-size="14">"#,
            w * 0.7,
            h * 0.3
        )?;
        for (i, line) in chart.annotation.lines().enumerate() {
            let dy = if i == 0 { 0.0 } else { 1.4 };
            writeln!(
                svg,
                r#"<tspan x="{}" dy="{dy}em">{}</tspan>"#,
                w * 0.7,
                escape(line)
            )?;
        }
        writeln!(svg, "</text>")?;
        svg.push_str("</svg>\n");
        Ok(())
    }
}

#[async_trait]
impl ChartSink for SvgChartSink {
    async fn render(&self, report: &RunReport) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let charts = [
            (
                CPU_CHART,
                Chart {
                    title: "CPU Profiling",
                    y_label: "CPU Usage(%)",
                    points: report.cpu_points(),
                    annotation: report.cpu_annotation(),
                },
            ),
            (
                MEM_CHART,
                Chart {
                    title: "Memory Profiling",
                    y_label: "MEM Usage(%)",
                    points: report.mem_points(),
                    annotation: report.mem_annotation(),
                },
            ),
        ];

        let mut written = Vec::new();
        for (name, chart) in &charts {
            let path = self.output_dir.join(name);
            tokio::fs::write(&path, self.render_svg(chart)?).await?;
            info!("Wrote {}", path.display());
            written.push(path);
        }

        if self.write_summary {
            let path = self.output_dir.join(SUMMARY_FILE);
            tokio::fs::write(&path, serde_json::to_vec_pretty(report)?).await?;
            info!("Wrote {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
