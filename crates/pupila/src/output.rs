use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pupila_worker::{StopReason, WorkerReport};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_report(report: &WorkerReport, format: OutputFormat) {
    println!("{}", render_report(report, format));
}

pub fn render_report(report: &WorkerReport, format: OutputFormat) -> String {
    let stats = &report.stats;
    match format {
        OutputFormat::Json => {
            serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "UNIT", "STOP", "RECEIVED", "FORWARDED", "DROPPED", "IDLE",
                ])
                .add_row(vec![
                    report.unit.clone(),
                    describe_stop(&report.stop_reason),
                    stats.received.to_string(),
                    stats.forwarded.to_string(),
                    stats.dropped.to_string(),
                    stats.idle.to_string(),
                ]);
            table.to_string()
        }
        OutputFormat::Pretty => format!(
            "unit={} stop={} received={} forwarded={} dropped={} idle={}",
            report.unit,
            describe_stop(&report.stop_reason),
            stats.received,
            stats.forwarded,
            stats.dropped,
            stats.idle
        ),
    }
}

pub fn describe_stop(reason: &StopReason) -> String {
    match reason {
        StopReason::Cancelled => "cancelled".to_string(),
        StopReason::UnsupportedMessage { tag } => format!("unsupported message type {tag}"),
        StopReason::Fault { message } => format!("fault: {message}"),
    }
}
