use anyhow::Result;
use courier_core::AppConfig;
use courier_sheets::{lookup, DeliveryRecord, LookupOutcome};
use std::process::ExitCode;

/// Human-readable rendering of a lookup result.
pub fn render(outcome: &LookupOutcome) -> String {
    match outcome {
        LookupOutcome::Found { record, report } => {
            format!("{}\n  report:   {}", render_record(record), report.display())
        }
        LookupOutcome::NotFound { message } => format!("Not found: {message}"),
        LookupOutcome::Error { message } => format!("Error: {message}"),
    }
}

fn render_record(record: &DeliveryRecord) -> String {
    let mut address = record.street.clone();
    if !record.number.is_empty() {
        address.push_str(", ");
        address.push_str(&record.number);
    }
    format!(
        "Codes:     {} / {}\n  courier:  {}\n  address:  {}\n  district: {}\n  city:     {}\n  CEP:      {}",
        record.primary_code,
        record.alternate_code,
        record.assignee,
        address,
        record.district,
        record.city,
        record.postal_code
    )
}

pub fn lookup_code(config: &AppConfig, code: &str) -> LookupOutcome {
    lookup(
        &config.paths.output_dir,
        code,
        &config.scanner.alternate_prefix,
    )
}

pub fn execute(config: &AppConfig, code: &str, json: bool) -> Result<ExitCode> {
    let outcome = lookup_code(config, code);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", render(&outcome));
    }

    Ok(if outcome.is_found() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
