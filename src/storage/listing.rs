//! Directory listing formats
//!
//! `LIST` uses the `ls -l` shape most clients parse; `NLST` sends bare names.

use chrono::{DateTime, Duration, Local};

use crate::storage::backend::{DirectoryListing, EntryInfo};

const SIX_MONTHS_DAYS: i64 = 180;

fn format_date(entry: &EntryInfo, now: DateTime<Local>) -> String {
    let modified: DateTime<Local> = entry.modified.into();
    if modified < now - Duration::days(SIX_MONTHS_DAYS) {
        modified.format("%b %d  %Y").to_string()
    } else {
        modified.format("%b %d %H:%M").to_string()
    }
}

/// Long listing, one CRLF-terminated line per entry, directories first.
pub fn format_long(listing: &DirectoryListing, now: DateTime<Local>) -> String {
    let mut out = String::new();
    for dir in &listing.directories {
        out.push_str(&format!(
            "drwxr-xr-x    2 ftp      ftp      {:>8} {} {}\r\n",
            4096,
            format_date(dir, now),
            dir.name
        ));
    }
    for file in &listing.files {
        out.push_str(&format!(
            "-rw-r--r--    1 ftp      ftp      {:>8} {} {}\r\n",
            file.size,
            format_date(file, now),
            file.name
        ));
    }
    out
}

/// Name-only listing.
pub fn format_names(listing: &DirectoryListing) -> String {
    listing
        .directories
        .iter()
        .chain(listing.files.iter())
        .map(|entry| format!("{}\r\n", entry.name))
        .collect()
}
