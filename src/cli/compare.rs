use super::ui;
use crate::core::compare::{ComparisonOrchestrator, InstrumentData, PeriodComparison};
use crate::core::performance::SuperationInterval;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Table;
use tracing::info;

/// Runs a point-to-point comparison and prints its report.
pub async fn run(
    orchestrator: &ComparisonOrchestrator<'_>,
    first: &str,
    second: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    let pb = ui::new_spinner(&format!("Fetching {first} and {second}..."));
    let result = orchestrator.compare_period(first, second, start, end).await;
    pb.finish_and_clear();

    let comparison = result?;
    info!("Rendering point-to-point report");
    display(&comparison);
    Ok(())
}

fn display(comparison: &PeriodComparison) {
    let (a, b) = (&comparison.first.label, &comparison.second.label);
    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "{a} vs {b}: {} to {}",
                comparison.start.format("%d/%m/%Y"),
                comparison.end.format("%d/%m/%Y")
            ),
            ui::StyleType::Title
        )
    );
    println!("{}", overview_table(comparison));

    if comparison.intervals.is_empty() {
        println!(
            "\n{}",
            ui::style_text(&format!("{b} never outperformed {a}"), ui::StyleType::Subtle)
        );
    } else {
        println!(
            "\n{}",
            ui::style_text(&format!("Periods where {b} outperformed {a}"), ui::StyleType::Label)
        );
        println!("{}", intervals_table(a, b, &comparison.intervals, false));
    }

    let summary = &comparison.summary;
    let winner = if summary.second_wins { b } else { a };
    ui::print_separator();
    println!(
        "{} {} by {:.2} percentage points",
        ui::style_text("Winner:", ui::StyleType::Label),
        ui::style_text(winner, ui::StyleType::Winner),
        summary.difference
    );
    println!(
        "{} {} intervals, {} days in total",
        ui::style_text("Outperformance:", ui::StyleType::Label),
        summary.superation_count,
        summary.superation_days
    );
    for data in [&comparison.first, &comparison.second] {
        print_conversion_note(data);
    }
}

pub(crate) fn print_conversion_note(data: &InstrumentData) {
    if data.converted {
        println!(
            "{}",
            ui::style_text(
                &format!("* {} converted from {}", data.label, data.instrument.symbol),
                ui::StyleType::Subtle
            )
        );
    }
}

fn overview_table(comparison: &PeriodComparison) -> Table {
    let summary = &comparison.summary;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Instrument"),
        ui::header_cell("Days"),
        ui::header_cell("First close"),
        ui::header_cell("Last close"),
        ui::header_cell("Variation"),
        ui::header_cell("Annualized"),
    ]);

    let rows = [
        (&comparison.first, summary.final_variation_a, summary.annualized_a),
        (&comparison.second, summary.final_variation_b, summary.annualized_b),
    ];
    for (data, variation, annualized) in rows {
        let closes: Vec<f64> = data.series.closes().collect();
        table.add_row(vec![
            ui::label_cell(&data.label),
            ui::text_cell(data.series.len()),
            closes
                .first()
                .map_or_else(ui::na_cell, |c| ui::text_cell(format!("{c:.2}"))),
            closes
                .last()
                .map_or_else(ui::na_cell, |c| ui::text_cell(format!("{c:.2}"))),
            ui::change_cell(variation),
            ui::optional_change_cell(annualized),
        ]);
    }
    table
}

/// Table of superation intervals; `in_months` switches the duration column
/// from calendar days to months.
pub(crate) fn intervals_table(
    a: &str,
    b: &str,
    intervals: &[SuperationInterval],
    in_months: bool,
) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Start"),
        ui::header_cell("End"),
        ui::header_cell(if in_months { "Months" } else { "Days" }),
        ui::header_cell(a),
        ui::header_cell(b),
        ui::header_cell("Spread"),
    ]);
    for (i, interval) in intervals.iter().enumerate() {
        let duration = if in_months {
            format!("{:.1}", interval.months())
        } else {
            interval.calendar_days().to_string()
        };
        table.add_row(vec![
            ui::text_cell(i + 1),
            ui::text_cell(interval.start.format("%d/%m/%Y")),
            ui::text_cell(interval.end.format("%d/%m/%Y")),
            ui::text_cell(duration),
            ui::change_cell(interval.value_a),
            ui::change_cell(interval.value_b),
            ui::change_cell(interval.spread()),
        ]);
    }
    table
}
