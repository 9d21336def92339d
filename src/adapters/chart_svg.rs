//! Self-contained SVG charts written into the output directory.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::SigtraderError;
use crate::domain::indicator_helpers::IndicatorBar;
use crate::domain::metrics::SymbolResult;
use crate::domain::signal::Signal;
use crate::ports::chart_port::ChartPort;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 50.0;
const HISTOGRAM_BINS: usize = 10;
const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

/// Maps data coordinates onto the padded plot area.
struct Frame {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Frame {
    fn new(xs: impl Iterator<Item = f64>, ys: impl Iterator<Item = f64>) -> Self {
        let (min_x, max_x) = bounds(xs);
        let (min_y, max_y) = bounds(ys);
        Frame {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    fn x(&self, value: f64) -> f64 {
        let range = self.max_x - self.min_x;
        let plot_width = WIDTH - 2.0 * PADDING;
        if range > 0.0 {
            PADDING + (value - self.min_x) / range * plot_width
        } else {
            PADDING + plot_width / 2.0
        }
    }

    fn y(&self, value: f64) -> f64 {
        let range = self.max_y - self.min_y;
        let plot_height = HEIGHT - 2.0 * PADDING;
        if range > 0.0 {
            HEIGHT - PADDING - (value - self.min_y) / range * plot_height
        } else {
            HEIGHT / 2.0
        }
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn open_svg(title: &str) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{:.1}" y="25" text-anchor="middle" font-family="sans-serif" font-size="16">{}</text>
"#,
        WIDTH / 2.0,
        escape(title)
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{PADDING:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
        HEIGHT - PADDING,
        WIDTH - PADDING,
        HEIGHT - PADDING
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{PADDING:.1}" y1="{PADDING:.1}" x2="{PADDING:.1}" y2="{:.1}" stroke="black"/>"#,
        HEIGHT - PADDING
    );
    svg
}

fn polyline(svg: &mut String, points: &[(f64, f64)], frame: &Frame, color: &str) {
    let coords: Vec<String> = points
        .iter()
        .map(|&(x, y)| format!("{:.1},{:.1}", frame.x(x), frame.y(y)))
        .collect();
    let _ = writeln!(
        svg,
        r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{}"/>"#,
        coords.join(" ")
    );
}

fn legend(svg: &mut String, index: usize, label: &str, color: &str) {
    let y = PADDING + 15.0 * index as f64;
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{y:.1}" font-family="sans-serif" font-size="11" fill="{color}">{}</text>"#,
        WIDTH - PADDING + 5.0,
        escape(label)
    );
}

fn zero_line(svg: &mut String, frame: &Frame) {
    if frame.min_y < 0.0 && frame.max_y > 0.0 {
        let y = frame.y(0.0);
        let _ = writeln!(
            svg,
            r#"<line x1="{PADDING:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="grey" stroke-dasharray="4"/>"#,
            WIDTH - PADDING
        );
    }
}

/// Equal-width bins over `[min, max]`; the maximum lands in the last bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let (lo, hi) = bounds(values.iter().copied());
    if bins == 0 || !lo.is_finite() {
        return Vec::new();
    }
    let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };
    let mut counts = vec![0usize; bins];
    for v in values.iter().filter(|v| v.is_finite()) {
        let index = (((v - lo) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, count))
        .collect()
}

pub struct SvgChartAdapter {
    output_dir: PathBuf,
}

impl SvgChartAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn write(&self, name: &str, mut svg: String) -> Result<PathBuf, SigtraderError> {
        svg.push_str("</svg>\n");
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{name}.svg"));
        fs::write(&path, svg)?;
        Ok(path)
    }
}

fn nothing_to_plot(chart: &str) -> SigtraderError {
    SigtraderError::Sink {
        sink: "chart",
        reason: format!("nothing to plot for {chart}"),
    }
}

impl ChartPort for SvgChartAdapter {
    fn plot_portfolio_performance(
        &self,
        results: &BTreeMap<String, SymbolResult>,
        name: &str,
    ) -> Result<PathBuf, SigtraderError> {
        if results.is_empty() {
            return Err(nothing_to_plot(name));
        }

        let pnls: Vec<f64> = results.values().map(|r| r.stats.total_pnl).collect();
        let frame = Frame::new(
            [0.0, results.len() as f64].into_iter(),
            pnls.iter().copied().chain(std::iter::once(0.0)),
        );
        let slot = (WIDTH - 2.0 * PADDING) / results.len() as f64;
        let mut svg = open_svg("Total P&L by Symbol");

        for (i, (symbol, pnl)) in results.keys().zip(&pnls).enumerate() {
            let x = PADDING + i as f64 * slot + slot * 0.1;
            let (top, bottom) = (frame.y(pnl.max(0.0)), frame.y(pnl.min(0.0)));
            let color = if *pnl > 0.0 { "#2ca02c" } else { "#d62728" };
            let _ = writeln!(
                svg,
                r#"<rect x="{x:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="{color}"><title>{}: {pnl:.2}</title></rect>"#,
                slot * 0.8,
                (bottom - top).max(0.5),
                escape(symbol)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-family="sans-serif" font-size="10">{}</text>"#,
                x + slot * 0.4,
                HEIGHT - PADDING + 15.0,
                escape(symbol)
            );
        }
        zero_line(&mut svg, &frame);
        self.write(name, svg)
    }

    fn plot_cumulative_returns(
        &self,
        results: &BTreeMap<String, SymbolResult>,
        name: &str,
    ) -> Result<PathBuf, SigtraderError> {
        let longest = results
            .values()
            .map(|r| r.stats.cumulative_returns.len())
            .max()
            .unwrap_or(0);
        if longest == 0 {
            return Err(nothing_to_plot(name));
        }

        let frame = Frame::new(
            [0.0, longest as f64].into_iter(),
            results
                .values()
                .flat_map(|r| r.stats.cumulative_returns.iter().copied())
                .chain(std::iter::once(0.0)),
        );
        let mut svg = open_svg("Cumulative P&L by Symbol");

        for (i, (symbol, result)) in results.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<(f64, f64)> = std::iter::once((0.0, 0.0))
                .chain(
                    result
                        .stats
                        .cumulative_returns
                        .iter()
                        .enumerate()
                        .map(|(n, v)| ((n + 1) as f64, *v)),
                )
                .collect();
            polyline(&mut svg, &points, &frame, color);
            legend(&mut svg, i, symbol, color);
        }
        zero_line(&mut svg, &frame);
        self.write(name, svg)
    }

    fn plot_win_loss_distribution(
        &self,
        results: &BTreeMap<String, SymbolResult>,
        name: &str,
    ) -> Result<PathBuf, SigtraderError> {
        let returns: Vec<f64> = results
            .values()
            .flat_map(|r| r.trades.iter().map(|t| t.pnl_pct))
            .collect();
        let bins = histogram(&returns, HISTOGRAM_BINS);
        if bins.is_empty() {
            return Err(nothing_to_plot(name));
        }

        let max_count = bins.iter().map(|b| b.2).max().unwrap_or(0);
        let frame = Frame::new(
            [bins[0].0, bins[bins.len() - 1].1].into_iter(),
            [0.0, max_count as f64].into_iter(),
        );
        let mut svg = open_svg("Trade Return Distribution (%)");

        for (lo, hi, count) in &bins {
            let (x0, x1) = (frame.x(*lo), frame.x(*hi));
            let top = frame.y(*count as f64);
            let color = if *hi <= 0.0 { "#d62728" } else { "#2ca02c" };
            let _ = writeln!(
                svg,
                r#"<rect x="{x0:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="{color}" stroke="white"><title>{lo:.2}..{hi:.2}: {count}</title></rect>"#,
                (x1 - x0).max(1.0),
                HEIGHT - PADDING - top
            );
        }
        self.write(name, svg)
    }

    fn plot_stock_with_signals(
        &self,
        symbol: &str,
        bars: &[IndicatorBar],
        signals: &[Signal],
        name: &str,
    ) -> Result<PathBuf, SigtraderError> {
        let Some(first) = bars.first() else {
            return Err(nothing_to_plot(name));
        };
        let origin = first.date();
        let day = |d: chrono::NaiveDate| (d - origin).num_days() as f64;

        let frame = Frame::new(
            bars.iter().map(|b| day(b.date())),
            bars.iter()
                .flat_map(|b| [b.close(), b.sma_short, b.sma_long])
                .chain(signals.iter().map(|s| s.price)),
        );
        let mut svg = open_svg(&format!("{symbol} price and signals"));

        let series: [(&str, &str, fn(&IndicatorBar) -> f64); 3] = [
            ("Close", "#000000", |b| b.close()),
            ("SMA short", PALETTE[0], |b| b.sma_short),
            ("SMA long", PALETTE[1], |b| b.sma_long),
        ];
        for (i, (label, color, value)) in series.iter().enumerate() {
            let points: Vec<(f64, f64)> =
                bars.iter().map(|b| (day(b.date()), value(b))).collect();
            polyline(&mut svg, &points, &frame, color);
            legend(&mut svg, i, label, color);
        }

        for signal in signals {
            let (x, y) = (frame.x(day(signal.date)), frame.y(signal.price));
            let (color, dy) = if signal.is_buy() {
                ("#2ca02c", 8.0)
            } else {
                ("#d62728", -8.0)
            };
            let _ = writeln!(
                svg,
                r#"<polygon points="{x:.1},{y:.1} {:.1},{:.1} {:.1},{:.1}" fill="{color}"><title>{} {} @ {:.2}</title></polygon>"#,
                x - 5.0,
                y + dy,
                x + 5.0,
                y + dy,
                signal.signal_type,
                signal.date,
                signal.price
            );
        }
        self.write(name, svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Trade;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn results() -> BTreeMap<String, SymbolResult> {
        let mut results = BTreeMap::new();
        let a = vec![
            Trade::close("A", date(1, 1), 100.0, date(1, 5), 110.0),
            Trade::close("A", date(2, 1), 100.0, date(2, 5), 95.0),
        ];
        let b = vec![Trade::close("B<&>", date(1, 1), 50.0, date(1, 9), 40.0)];
        results.insert("A".to_string(), SymbolResult::compute("A", a).unwrap());
        results.insert("B<&>".to_string(), SymbolResult::compute("B<&>", b).unwrap());
        results
    }

    #[test]
    fn histogram_puts_max_in_last_bin() {
        let bins = histogram(&[0.0, 5.0, 10.0], 2);
        assert_eq!(bins, vec![(0.0, 5.0, 1), (5.0, 10.0, 2)]);
    }

    #[test]
    fn histogram_of_identical_values() {
        let bins = histogram(&[3.0, 3.0], 4);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 2);
        assert_eq!(bins[0].2, 2);
        assert!(histogram(&[], 4).is_empty());
    }

    #[test]
    fn portfolio_chart_is_written() {
        let dir = TempDir::new().unwrap();
        let charts = SvgChartAdapter::new(dir.path().join("charts"));

        let path = charts
            .plot_portfolio_performance(&results(), "portfolio_performance")
            .unwrap();

        assert_eq!(path, dir.path().join("charts/portfolio_performance.svg"));
        let svg = fs::read_to_string(path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<rect x=").count(), 2);
        assert!(svg.contains("B&lt;&amp;&gt;"));
    }

    #[test]
    fn cumulative_chart_draws_one_line_per_symbol() {
        let dir = TempDir::new().unwrap();
        let charts = SvgChartAdapter::new(dir.path().to_path_buf());

        let path = charts.plot_cumulative_returns(&results(), "cumulative").unwrap();

        let svg = fs::read_to_string(path).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 2);
    }

    #[test]
    fn distribution_chart_has_all_bins() {
        let dir = TempDir::new().unwrap();
        let charts = SvgChartAdapter::new(dir.path().to_path_buf());

        let path = charts.plot_win_loss_distribution(&results(), "dist").unwrap();

        let svg = fs::read_to_string(path).unwrap();
        assert_eq!(svg.matches("<rect x=").count(), HISTOGRAM_BINS);
    }

    #[test]
    fn empty_results_are_not_plotted() {
        let dir = TempDir::new().unwrap();
        let charts = SvgChartAdapter::new(dir.path().to_path_buf());

        assert!(charts.plot_portfolio_performance(&BTreeMap::new(), "p").is_err());
        assert!(charts.plot_cumulative_returns(&BTreeMap::new(), "c").is_err());
        assert!(charts.plot_win_loss_distribution(&BTreeMap::new(), "d").is_err());
        assert!(charts.plot_stock_with_signals("A", &[], &[], "s").is_err());
    }
}
