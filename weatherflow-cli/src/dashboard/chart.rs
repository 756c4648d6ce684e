//! SVG charts drawn with plotters.

use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use weatherflow_core::table::{CorrelationMatrix, Series};

const SIZE: (u32, u32) = (900, 420);
const HEATMAP_SIZE: (u32, u32) = (640, 480);
const FONT: &str = "sans-serif";

/// Value range covering `values` and zero, padded by 5%; a flat range is
/// widened by one.
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo < f64::EPSILON { lo..lo + 1.0 } else { lo * 1.05..hi * 1.05 }
}

/// Category name at a segmented x position; the closing edge has none.
fn category<'a>(names: &[&'a str], x: &SegmentValue<i32>) -> &'a str {
    match x {
        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
            usize::try_from(*i).ok().and_then(|i| names.get(i)).copied().unwrap_or("")
        }
        SegmentValue::Last => "",
    }
}

/// One bar per `(label, value)` in the given order.
pub fn bar_chart(title: &str, y_label: &str, bars: &[(String, f64)]) -> anyhow::Result<String> {
    let names: Vec<&str> = bars.iter().map(|(name, _)| name.as_str()).collect();
    let n = bars.len().max(1) as i32;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 20))
            .margin(12)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(
                (0..n).into_segmented(),
                value_range(bars.iter().map(|(_, v)| *v)),
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(bars.len().max(1))
            .x_label_formatter(&|x| category(&names, x).to_string())
            .y_desc(y_label)
            .draw()?;

        chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
            let color = Palette99::pick(i).to_rgba();
            let x = i as i32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(x), 0.0), (SegmentValue::Exact(x + 1), *value)],
                color.filled(),
            );
            bar.set_margin(0, 0, 5, 5);
            bar
        }))?;

        root.present()?;
    }
    Ok(svg)
}

/// One line per series over the sorted union of their x categories.
pub fn line_chart(title: &str, y_label: &str, series: &[Series]) -> anyhow::Result<String> {
    let mut names: Vec<&str> =
        series.iter().flat_map(|s| s.points.iter().map(|(x, _)| x.as_str())).collect();
    names.sort_unstable();
    names.dedup();
    let n = names.len().max(1) as i32;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 20))
            .margin(12)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(
                (0..n).into_segmented(),
                value_range(series.iter().flat_map(|s| s.points.iter().map(|(_, v)| *v))),
            )?;

        chart
            .configure_mesh()
            .x_labels(names.len().max(1))
            .x_label_formatter(&|x| category(&names, x).to_string())
            .y_desc(y_label)
            .draw()?;

        for (i, s) in series.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            let points: Vec<(SegmentValue<i32>, f64)> = s
                .points
                .iter()
                .filter_map(|(x, v)| {
                    let idx = names.iter().position(|name| *name == x.as_str())?;
                    Some((SegmentValue::CenterOf(idx as i32), *v))
                })
                .collect();
            let label = if s.name.is_empty() { "(none)" } else { s.name.as_str() };

            chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
                .label(label)
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
        }

        if !series.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        root.present()?;
    }
    Ok(svg)
}

/// Blue (-1) through grey (0) to red (+1).
fn coolwarm(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let v = value.clamp(-1.0, 1.0);
    let (to, t) = if v < 0.0 { (COLD, -v) } else { (WARM, v) };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(mix(MID.0, to.0), mix(MID.1, to.1), mix(MID.2, to.2))
}

/// Annotated correlation heatmap; undefined cells are left blank.
pub fn heatmap(matrix: &CorrelationMatrix) -> anyhow::Result<String> {
    let names: Vec<&str> = matrix.parameters.iter().map(|p| p.as_str()).collect();
    let n = names.len() as i32;
    // Row 0 is drawn at the top.
    let row_of = |i: i32| n - 1 - i;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, HEATMAP_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Correlation Heatmap", (FONT, 20))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(110)
            .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(names.len())
            .y_labels(names.len())
            .x_label_formatter(&|x| category(&names, x).to_string())
            .y_label_formatter(&|y| match y {
                SegmentValue::Exact(r) | SegmentValue::CenterOf(r) => {
                    category(&names, &SegmentValue::Exact(row_of(*r))).to_string()
                }
                SegmentValue::Last => String::new(),
            })
            .draw()?;

        let cells = matrix.values.iter().enumerate().flat_map(|(i, row)| {
            row.iter().enumerate().map(move |(j, value)| (i as i32, j as i32, *value))
        });

        chart.draw_series(cells.clone().map(|(i, j, value)| {
            let fill = value.map(coolwarm).unwrap_or(WHITE);
            let row = row_of(i);
            Rectangle::new(
                [
                    (SegmentValue::Exact(j), SegmentValue::Exact(row)),
                    (SegmentValue::Exact(j + 1), SegmentValue::Exact(row + 1)),
                ],
                fill.filled(),
            )
        }))?;

        let annotation =
            TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        chart.draw_series(cells.filter_map(|(i, j, value)| {
            let v = value?;
            let at = (SegmentValue::CenterOf(j), SegmentValue::CenterOf(row_of(i)));
            Some(Text::new(format!("{v:.2}"), at, annotation.clone()))
        }))?;

        root.present()?;
    }
    Ok(svg)
}
