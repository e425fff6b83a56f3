use std::path::Path;

use anyhow::Result;
use codeblue_schema::ClinicalEvent;

use crate::clock;

/// Export filename carrying the current local timestamp.
pub fn export_filename() -> String {
    format!("ACLS_logs_{}.csv", clock::export_stamp())
}

/// Write events as a spreadsheet with one row per event.
pub fn export_csv(events: &[ClinicalEvent], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["ID", "Event", "Note", "Timestamp", "Extra"])?;
    for event in events {
        let extra = event
            .extra
            .as_ref()
            .map(|m| serde_json::to_string(m).unwrap_or_default())
            .unwrap_or_default();
        writer.write_record([
            event.id.to_string(),
            event.name.clone(),
            event.note.clone(),
            event.timestamp.clone(),
            extra,
        ])?;
    }
    writer.flush()?;
    Ok(())
}
