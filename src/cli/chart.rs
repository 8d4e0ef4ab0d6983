use super::ui;
use crate::batch::BatchStatus;
use crate::chart::{ChartReport, ChartService, PortfolioSummary, select_top_symbols, summarize};
use crate::core::config::AppConfig;
use crate::core::{Interval, Range, Selection, Symbol};
use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment};
use std::time::Duration;
use tracing::{debug, info, warn};

const SPARKLINE_WIDTH: usize = 30;

/// Options for the `chart` command. Unset fields fall back to the config file.
#[derive(Debug, Clone, Default)]
pub struct ChartOptions {
    pub range: Option<Range>,
    pub interval: Option<Interval>,
    /// Bypass cached series for this selection.
    pub refresh: bool,
    /// Reload every N seconds until interrupted.
    pub watch: Option<u64>,
}

impl ChartOptions {
    /// Resolves the selection to chart. A range given without an interval uses that
    /// range's default interval rather than the configured one.
    pub fn selection(&self, config: &AppConfig) -> Result<Selection> {
        let selection = match (self.range, self.interval) {
            (None, None) => config.chart.selection()?,
            (Some(range), interval) => Selection::new(range, interval)?,
            (None, Some(interval)) => Selection::resolve(config.chart.range, Some(interval))?,
        };
        Ok(selection)
    }
}

pub async fn run(config: &AppConfig, options: &ChartOptions) -> Result<()> {
    let selection = options.selection(config)?;
    let symbols = select_top_symbols(config.investments(), config.chart.max_symbols);
    if symbols.is_empty() {
        println!("No investments found to chart.");
        return Ok(());
    }
    debug!(?symbols, "Charting {}", selection);

    let service = ChartService::from_config(config)?;

    let Some(every) = options.watch.filter(|s| *s > 0) else {
        let report = load(&service, &symbols, selection, options.refresh).await;
        display_report(&report, config, &symbols);
        if let Some(message) = report.error() {
            bail!("{}", message);
        }
        return Ok(());
    };

    info!("Watching {} symbols every {}s", symbols.len(), every);
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    watch(
        &service,
        config,
        &symbols,
        selection,
        options.refresh,
        Duration::from_secs(every),
        interrupted,
    )
    .await;
    Ok(())
}

/// Reloads and renders every `every` until `shutdown` resolves, including while a
/// batch is still loading.
async fn watch(
    service: &ChartService,
    config: &AppConfig,
    symbols: &[Symbol],
    selection: Selection,
    refresh: bool,
    every: Duration,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    loop {
        let report = tokio::select! {
            _ = &mut shutdown => {
                debug!("Interrupted while loading, leaving watch mode");
                return;
            }
            report = load(service, symbols, selection, refresh) => report,
        };
        display_report(&report, config, symbols);

        tokio::select! {
            _ = &mut shutdown => {
                debug!("Interrupted, leaving watch mode");
                return;
            }
            _ = tokio::time::sleep(every) => {
                ui::print_separator();
            }
        }
    }
}

async fn load(
    service: &ChartService,
    symbols: &[Symbol],
    selection: Selection,
    refresh: bool,
) -> ChartReport {
    let pb = ui::new_spinner(format!("Loading {} symbols for {}", symbols.len(), selection));
    let report = if refresh {
        service.refresh(symbols, selection).await
    } else {
        service.load(symbols, selection).await
    };
    pb.finish_and_clear();
    report
}

fn display_report(report: &ChartReport, config: &AppConfig, symbols: &[Symbol]) {
    println!(
        "\nPerformance: {}",
        ui::style_text(&report.selection.to_string(), ui::StyleType::Title)
    );

    if let BatchStatus::TotalFailure { message } = &report.status {
        println!("{}", ui::style_text(message, ui::StyleType::Error));
        println!(
            "{}",
            ui::style_text("Run again with --refresh to retry.", ui::StyleType::Subtle)
        );
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Series"),
        ui::header_cell("Currency"),
        ui::header_cell("Points"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Change"),
        ui::header_cell("Trend"),
    ]);

    for series in &report.series {
        let first = series.first_value();
        let last = series.last_value();
        let values: Vec<Option<f64>> = series.points.iter().map(|p| p.value).collect();
        table.add_row(vec![
            Cell::new(&series.label),
            Cell::new(&series.currency),
            Cell::new(series.len()).set_alignment(CellAlignment::Right),
            ui::format_optional_cell(first, |(p, v)| format!("{v:.2} ({})", p.label)),
            ui::format_optional_cell(last, |(p, v)| format!("{v:.2} ({})", p.label)),
            ui::change_cell(series.change_pct()),
            Cell::new(ui::sparkline(&values, SPARKLINE_WIDTH)),
        ]);
    }
    println!("{table}");

    let summary = summarize(config.investments(), symbols, &report.series);
    display_summary(&summary);

    if let Some(warning) = &report.warning {
        println!("{}", ui::style_text(warning, ui::StyleType::Warning));
        for (symbol, error) in &report.failures {
            println!(
                "  {}",
                ui::style_text(&format!("{symbol}: {error}"), ui::StyleType::Subtle)
            );
        }
    }
    if let Some(at) = report.last_updated {
        println!(
            "{}",
            ui::style_text(
                &format!("Last updated: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                ui::StyleType::Subtle
            )
        );
    }
}

fn display_summary(summary: &PortfolioSummary) {
    if summary.is_empty() {
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Invested"),
        ui::header_cell("Current Value"),
        ui::header_cell("Profit/Loss"),
        ui::header_cell("P/L %"),
    ]);
    for totals in &summary.totals {
        table.add_row(vec![
            Cell::new(&totals.currency),
            Cell::new(format!("{:.2}", totals.invested)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", totals.current_value)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:+.2}", totals.profit_loss())).set_alignment(CellAlignment::Right),
            ui::change_cell(totals.profit_loss_pct()),
        ]);
    }
    println!("{table}");

    if let (Some(best), Some(worst)) = (&summary.best, &summary.worst) {
        println!(
            "Best: {} ({:+.2}%)  Worst: {} ({:+.2}%)",
            ui::style_text(best.symbol.as_str(), ui::StyleType::Title),
            best.change_pct,
            ui::style_text(worst.symbol.as_str(), ui::StyleType::Title),
            worst.change_pct
        );
    }
    if !summary.unpriced.is_empty() {
        let names: Vec<&str> = summary.unpriced.iter().map(Symbol::as_str).collect();
        println!(
            "{}",
            ui::style_text(
                &format!("Valued at cost, no recent price: {}", names.join(", ")),
                ui::StyleType::Subtle
            )
        );
    }
    if !summary.without_cost_basis.is_empty() {
        let names: Vec<&str> = summary.without_cost_basis.iter().map(Symbol::as_str).collect();
        println!(
            "{}",
            ui::style_text(
                &format!("Not in totals, missing units or buy price: {}", names.join(", ")),
                ui::StyleType::Subtle
            )
        );
    }
}
