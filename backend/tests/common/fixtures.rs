//! Ledger row factories.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};

use evidence_binder_backend::models::merged_file::NewMergedFile;
use evidence_binder_backend::services::artifact_service::artifact_filename;

/// A merge by `team_id` on 2024-03-07, `offset_secs` after 09:00 UTC.
pub fn merge_entry(team_id: &str, ticket: &str, offset_secs: i64) -> NewMergedFile {
    let base: DateTime<Utc> = NaiveDate::from_ymd_opt(2024, 3, 7)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        .and_utc();
    NewMergedFile {
        creator_ip: "198.51.100.20".to_string(),
        timestamp: base + Duration::seconds(offset_secs),
        filename: artifact_filename(team_id, base.date_naive()),
        team_id: team_id.to_string(),
        salesforce_ticket: ticket.to_string(),
    }
}
