use chrono::{Duration, NaiveDate};
use minijinja::{context, Environment};
use plotters::element::Pie;
use plotters::prelude::*;
use serde::Serialize;

use crate::models::{month_label, Dashboard, StandardizationImpact, TrendRow};

const TEMPLATE_NAME: &str = "dashboard.html";
const TEMPLATE: &str = include_str!("templates/dashboard.html");

const CLEAN_COLOR: RGBColor = RGBColor(99, 110, 250);
const CHANGED_COLOR: RGBColor = RGBColor(239, 85, 59);
const LINE_COLOR: RGBColor = RGBColor(99, 110, 250);

const PIE_SIZE: (u32, u32) = (480, 320);
const TREND_SIZE: (u32, u32) = (720, 340);

#[derive(Debug, Serialize)]
struct RegionChart<'a> {
    region: &'a str,
    selected: bool,
    svg: String,
}

/// Renders the dashboard as one self-contained HTML page.
pub fn render_dashboard(dashboard: &Dashboard) -> anyhow::Result<String> {
    let impact_svg = impact_chart(&dashboard.impact)?;

    let mut charts = Vec::with_capacity(dashboard.regions.len());
    for region in &dashboard.regions {
        let rows: Vec<&TrendRow> = dashboard.region_trend(region).collect();
        charts.push(RegionChart {
            region,
            selected: dashboard.selected_region.as_deref() == Some(region.as_str()),
            svg: trend_chart(region, &rows, &dashboard.columns.enrolment)?,
        });
    }

    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, TEMPLATE)?;
    let page = env.get_template(TEMPLATE_NAME)?.render(context! {
        dashboard => dashboard,
        impact_svg => impact_svg,
        charts => charts,
    })?;
    Ok(page)
}

/// Pie of already-clean versus auto-standardized rows.
pub fn impact_chart(impact: &StandardizationImpact) -> anyhow::Result<String> {
    let slices: Vec<(String, f64, RGBColor)> = [
        ("Already Clean", impact.already_clean, CLEAN_COLOR),
        ("Auto-Standardized", impact.auto_standardized, CHANGED_COLOR),
    ]
    .into_iter()
    .filter(|(_, count, _)| *count > 0)
    .map(|(label, count, color)| (format!("{label}: {count}"), count as f64, color))
    .collect();

    let labels: Vec<String> = slices.iter().map(|(label, _, _)| label.clone()).collect();
    let sizes: Vec<f64> = slices.iter().map(|(_, size, _)| *size).collect();
    let colors: Vec<RGBColor> = slices.iter().map(|(_, _, color)| *color).collect();

    let center = (PIE_SIZE.0 as i32 / 2, PIE_SIZE.1 as i32 / 2);
    let radius = 110.0;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PIE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        if sizes.is_empty() {
            root.draw(&Text::new(
                "No rows uploaded",
                (center.0 - 60, center.1),
                ("sans-serif", 16).into_font(),
            ))?;
        } else {
            let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
            pie.label_style(("sans-serif", 14).into_font());
            pie.percentages(("sans-serif", 13).into_font().color(&WHITE));
            root.draw(&pie)?;
        }

        root.present()?;
    }
    Ok(svg)
}

/// Line chart of one region's monthly totals; `rows` must be sorted by month.
pub fn trend_chart(region: &str, rows: &[&TrendRow], y_label: &str) -> anyhow::Result<String> {
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Ok(String::new());
    };

    let start = first.month - Duration::days(15);
    let end = last.month + Duration::days(15);
    let low = rows.iter().map(|row| row.enrolment).fold(0.0, f64::min);
    let high = rows.iter().map(|row| row.enrolment).fold(0.0, f64::max);
    let high = if high > low { high * 1.1 } else { low + 1.0 };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, TREND_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Monthly Enrolment Trend - {region}"), ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(start..end, low..high)?;
        chart
            .configure_mesh()
            .x_labels(rows.len().clamp(2, 12))
            .x_label_formatter(&|month: &NaiveDate| month_label(*month))
            .x_desc("Month")
            .y_desc(y_label)
            .draw()?;

        chart.draw_series(LineSeries::new(
            rows.iter().map(|row| (row.month, row.enrolment)),
            &LINE_COLOR,
        ))?;
        chart.draw_series(
            rows.iter()
                .map(|row| Circle::new((row.month, row.enrolment), 3, LINE_COLOR.filled())),
        )?;

        root.present()?;
    }
    Ok(svg)
}
