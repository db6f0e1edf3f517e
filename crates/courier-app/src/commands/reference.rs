use crate::cli::ReferenceAction;
use anyhow::{bail, Context, Result};
use courier_core::AppConfig;
use courier_sheets::{ReferenceRecord, ReferenceStore};
use std::process::ExitCode;
use tracing::info;

fn render_table(records: &[ReferenceRecord]) -> String {
    if records.is_empty() {
        return "No reference records.".to_string();
    }
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{:>3}. {} | {} | {} | {}",
                i + 1,
                r.name,
                r.city,
                r.district,
                r.postal_code
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn apply(store: &ReferenceStore, action: ReferenceAction) -> Result<String> {
    store
        .ensure_exists()
        .with_context(|| format!("cannot create {}", store.path().display()))?;

    match action {
        ReferenceAction::List => Ok(render_table(&store.read_all()?)),
        ReferenceAction::Add {
            name,
            city,
            district,
            postal_code,
        } => {
            if name.trim().is_empty() {
                bail!("courier name must not be empty");
            }
            let record = ReferenceRecord::new(name.trim(), city, district, postal_code);
            store.append(record)?;
            info!("Reference record added to {}", store.path().display());
            Ok(format!("Added. {} records.", store.read_all()?.len()))
        }
        ReferenceAction::Remove { number } => {
            let Some(index) = number.checked_sub(1) else {
                bail!("record numbers start at 1");
            };
            let removed = store.remove(index)?;
            info!("Reference record {} removed", number);
            Ok(format!("Removed {}.", removed.name))
        }
    }
}

pub fn execute(config: &AppConfig, action: ReferenceAction) -> Result<ExitCode> {
    let store = ReferenceStore::new(&config.paths.reference_file);
    println!("{}", apply(&store, action)?);
    Ok(ExitCode::SUCCESS)
}
