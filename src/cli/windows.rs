use super::compare::{intervals_table, print_conversion_note};
use super::ui;
use crate::core::compare::{ComparisonOrchestrator, WindowComparison};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Table;

/// Runs a rolling-window comparison and prints its report.
pub async fn run(
    orchestrator: &ComparisonOrchestrator<'_>,
    first: &str,
    second: &str,
    years: u32,
    window_months: u32,
    today: NaiveDate,
) -> Result<()> {
    let pb = ui::new_spinner(&format!(
        "Fetching {first} and {second} for {window_months}-month windows..."
    ));
    let result = orchestrator
        .compare_windows(first, second, years, window_months, today)
        .await;
    pb.finish_and_clear();

    display(&result?);
    Ok(())
}

fn display(comparison: &WindowComparison) {
    let (a, b) = (&comparison.first.label, &comparison.second.label);
    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "{a} vs {b}: {}-month returns over {} years",
                comparison.window_months, comparison.years
            ),
            ui::StyleType::Title
        )
    );
    println!("{}", overview_table(comparison));

    if comparison.intervals.is_empty() {
        println!(
            "\n{}",
            ui::style_text(
                &format!("{b} never had the better {}-month return", comparison.window_months),
                ui::StyleType::Subtle
            )
        );
    } else {
        println!(
            "\n{}",
            ui::style_text(
                &format!("Windows where {b} returned more than {a}"),
                ui::StyleType::Label
            )
        );
        println!("{}", intervals_table(a, b, &comparison.intervals, true));
    }

    let summary = &comparison.summary;
    ui::print_separator();
    println!(
        "{} {} intervals, {:.1} months in total",
        ui::style_text("Outperformance:", ui::StyleType::Label),
        summary.superation_count,
        summary.total_months
    );
    if let (Some(months), Some(spread)) = (summary.mean_months, summary.mean_spread) {
        println!(
            "{} {months:.1} months, {spread:.2} percentage points",
            ui::style_text("Average interval:", ui::StyleType::Label),
        );
    }
    for data in [&comparison.first, &comparison.second] {
        print_conversion_note(data);
    }
}

fn overview_table(comparison: &WindowComparison) -> Table {
    let summary = &comparison.summary;
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Instrument"),
        ui::header_cell("Windows"),
        ui::header_cell("Mean return"),
        ui::header_cell("Latest return"),
        ui::header_cell("Since"),
    ]);

    let rows = [
        (&comparison.first, &comparison.returns_a, summary.mean_return_a),
        (&comparison.second, &comparison.returns_b, summary.mean_return_b),
    ];
    for (data, returns, mean) in rows {
        table.add_row(vec![
            ui::label_cell(&data.label),
            ui::text_cell(returns.len()),
            ui::optional_change_cell(mean.or_else(|| returns.mean())),
            ui::optional_change_cell(returns.last().map(|p| p.value)),
            ui::text_cell(comparison.display_from.format("%d/%m/%Y")),
        ]);
    }
    table
}
