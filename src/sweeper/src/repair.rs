//! Repair scripts: the drop statements for an orphan set, written to disk
//! instead of executed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{SweepError, SweepResult};
use crate::namespace::drop_statement;
use crate::orphan::OrphanSet;

/// Text safe to place after `--`: control characters are escaped so the
/// comment cannot end early.
fn comment_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() {
                c.escape_default().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

/// Render the SQL that drops every namespace in `orphans`.
pub fn render_script(database: &str, orphans: &OrphanSet, generated_at: DateTime<Utc>) -> String {
    let mut script = format!(
        "-- Orphaned temporary schemas in database {}\n-- Generated {}\n",
        comment_text(database),
        generated_at.to_rfc3339()
    );
    for orphan in orphans.iter() {
        script.push_str(&format!("-- {}\n", orphan.reason));
        script.push_str(&drop_statement(&orphan.name));
        script.push_str(";\n");
    }
    script
}

/// File name for a database's script, safe on any filesystem.
///
/// Distinct databases can sanitize to the same name; `attempt` numbers the
/// variants tried when a file already exists.
pub fn script_file_name(database: &str, generated_at: DateTime<Utc>, attempt: u32) -> String {
    let safe: String = database
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let stamp = generated_at.format("%Y%m%d%H%M%S");
    match attempt {
        0 => format!("{safe}_orphaned_schemas_{stamp}.sql"),
        n => format!("{safe}_orphaned_schemas_{stamp}_{n}.sql"),
    }
}

/// Write the repair script for `database` under `dir`, creating the directory.
///
/// Never overwrites an existing file.
pub async fn write_script(
    dir: &Path,
    database: &str,
    orphans: &OrphanSet,
    generated_at: DateTime<Utc>,
) -> SweepResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| SweepError::RepairScript {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut attempt = 0;
    let (path, mut file) = loop {
        let path = dir.join(script_file_name(database, generated_at, attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(SweepError::RepairScript { path, source }),
        }
    };

    let script = render_script(database, orphans, generated_at);
    let written = match file.write_all(script.as_bytes()).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    written.map_err(|source| SweepError::RepairScript {
        path: path.clone(),
        source,
    })?;

    log::info!(
        "Wrote repair script for {} orphaned schemas in {database} to {}",
        orphans.len(),
        path.display()
    );
    Ok(path)
}
