//! Minimal inline SVG charts.

use std::fmt::Write;

use super::escape_html;

const MARGIN: f64 = 40.0;

/// Vertical bar chart, one bar per `(label, value)`.
///
/// A zero width or height picks a size from the number of bars.
pub(crate) fn bar_chart(title: &str, y_label: &str, bars: &[(String, usize)], width: u32, height: u32) -> String {
    let width = if width == 0 { (80 + 60 * bars.len()) as f64 } else { f64::from(width) };
    let height = if height == 0 { 240.0 } else { f64::from(height) };
    let max = bars.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1) as f64;
    let plot_w = (width - 2.0 * MARGIN).max(1.0);
    let plot_h = (height - 2.0 * MARGIN).max(1.0);
    let slot = plot_w / bars.len().max(1) as f64;

    let mut svg = open(title, width, height);
    let _ = write!(
        svg,
        "<text x=\"12\" y=\"{:.1}\" font-size=\"11\" transform=\"rotate(-90 12 {:.1})\" text-anchor=\"middle\">{}</text>",
        height / 2.0,
        height / 2.0,
        escape_html(y_label)
    );
    for (i, (label, value)) in bars.iter().enumerate() {
        let h = plot_h * (*value as f64) / max;
        let x = MARGIN + slot * i as f64 + slot * 0.1;
        let y = MARGIN + plot_h - h;
        let _ = write!(
            svg,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#4c78a8\"><title>{}: {}</title></rect>\
             <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"middle\">{}</text>\
             <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"middle\">{}</text>",
            x,
            y,
            slot * 0.8,
            h,
            escape_html(label),
            value,
            x + slot * 0.4,
            y - 4.0,
            value,
            x + slot * 0.4,
            MARGIN + plot_h + 14.0,
            escape_html(label)
        );
    }
    svg.push_str("</svg>");
    svg
}

/// Scatter plot of labeled integer points.
pub(crate) fn scatter(
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[(i64, i64, String)],
    width: u32,
    height: u32,
) -> String {
    let width = f64::from(width.max(120));
    let height = f64::from(height.max(120));
    let (min_x, max_x) = bounds(points.iter().map(|p| p.0));
    let (min_y, max_y) = bounds(points.iter().map(|p| p.1));
    let plot_w = width - 2.0 * MARGIN;
    let plot_h = height - 2.0 * MARGIN;
    let sx = |x: i64| MARGIN + plot_w * (x - min_x) as f64 / (max_x - min_x).max(1) as f64;
    let sy = |y: i64| MARGIN + plot_h - plot_h * (y - min_y) as f64 / (max_y - min_y).max(1) as f64;

    let mut svg = open(title, width, height);
    let _ = write!(
        svg,
        "<line x1=\"{m:.1}\" y1=\"{b:.1}\" x2=\"{r:.1}\" y2=\"{b:.1}\" stroke=\"#888\"/>\
         <line x1=\"{m:.1}\" y1=\"{m:.1}\" x2=\"{m:.1}\" y2=\"{b:.1}\" stroke=\"#888\"/>\
         <text x=\"{cx:.1}\" y=\"{ly:.1}\" font-size=\"11\" text-anchor=\"middle\">{xl}</text>\
         <text x=\"12\" y=\"{cy:.1}\" font-size=\"11\" transform=\"rotate(-90 12 {cy:.1})\" text-anchor=\"middle\">{yl}</text>",
        m = MARGIN,
        b = MARGIN + plot_h,
        r = MARGIN + plot_w,
        cx = width / 2.0,
        ly = height - 8.0,
        cy = height / 2.0,
        xl = escape_html(x_label),
        yl = escape_html(y_label),
    );
    for (x, y, label) in points {
        let _ = write!(
            svg,
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"#e45756\"><title>{} ({}, {})</title></circle>\
             <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"10\" text-anchor=\"middle\">{}</text>",
            sx(*x),
            sy(*y),
            escape_html(label),
            x,
            y,
            sx(*x),
            sy(*y) - 7.0,
            escape_html(label)
        );
    }
    svg.push_str("</svg>");
    svg
}

fn open(title: &str, width: f64, height: f64) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.0}\" height=\"{:.0}\" viewBox=\"0 0 {:.0} {:.0}\" role=\"img\">\
         <title>{}</title><text x=\"{:.1}\" y=\"20\" font-size=\"13\" text-anchor=\"middle\">{}</text>",
        width,
        height,
        width,
        height,
        escape_html(title),
        width / 2.0,
        escape_html(title)
    )
}

fn bounds(values: impl Iterator<Item = i64>) -> (i64, i64) {
    values.fold(None, |acc: Option<(i64, i64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
    .unwrap_or((0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_chart_has_one_bar_per_entry() {
        let svg = bar_chart("counts", "atoms", &[("a/1".to_string(), 3), ("b/2".to_string(), 1)], 0, 0);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains("<title>a/1: 3</title>"));
    }

    #[test]
    fn test_scatter_escapes_labels() {
        let svg = scatter("front", "x", "y", &[(1, 2, "<m>".to_string()), (3, 1, "n".to_string())], 300, 200);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("&lt;m&gt;"));
        assert!(!svg.contains("<m>"));
    }

    #[test]
    fn test_single_point_does_not_divide_by_zero() {
        let svg = scatter("front", "x", "y", &[(5, 5, "only".to_string())], 0, 0);
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }
}
