use std::future::Future;
use std::path::Path;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;

use common::Configuration;

use crate::catalog::{SessionCatalog, find_orphans_as};
use crate::dropper::drop_orphans;
use crate::error::{SweepError, SweepResult};
use crate::orphan::OrphanSet;
use crate::postgres::{PgSessionCatalog, connect_options, default_database};
use crate::repair::write_script;

/// What to do with the orphans found in each database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Report only
    Scan,
    /// Drop every orphan
    Drop,
    /// Write a repair script per database
    Script,
}

/// Outcome of sweeping one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseReport {
    pub database: String,
    pub orphans: OrphanSet,
    pub dropped: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
}

/// Find orphans on an open catalog handle and apply `mode`.
pub async fn sweep_database<C>(
    catalog: &mut C,
    mode: SweepMode,
    repair_dir: &Path,
) -> SweepResult<DatabaseReport>
where
    C: SessionCatalog + ?Sized,
{
    let checker = catalog.backend_identity().await?;
    let orphans = find_orphans_as(catalog, &checker).await?;
    let database = checker.database;
    if orphans.is_empty() {
        log::info!("No orphaned temp schemas in {database}");
    } else {
        log::info!("Found {} orphaned temp schemas in {database}", orphans.len());
    }

    let mut report = DatabaseReport {
        database,
        orphans,
        dropped: Vec::new(),
        script: None,
    };
    match mode {
        SweepMode::Scan => {}
        SweepMode::Drop => {
            report.dropped = drop_orphans(catalog, &report.orphans).await?;
        }
        SweepMode::Script => {
            if !report.orphans.is_empty() {
                let path =
                    write_script(repair_dir, &report.database, &report.orphans, Utc::now())
                        .await?;
                report.script = Some(path);
            }
        }
    }
    Ok(report)
}

/// Sweeps every configured database, one connection at a time.
pub struct Sweeper {
    config: Configuration,
}

impl Sweeper {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    async fn connect(&self, database: Option<&str>) -> SweepResult<PgSessionCatalog> {
        let options = connect_options(&self.config.database.dsn, database)?;
        PgSessionCatalog::connect(
            options,
            self.config.database.flavor,
            self.config.database.connect_timeout,
        )
        .await
    }

    /// Databases this sweeper will visit, in order.
    pub async fn target_databases(&self) -> SweepResult<Vec<String>> {
        let sweep = &self.config.sweep;
        if sweep.all_databases {
            let mut catalog = self.connect(None).await?;
            let databases = catalog.list_databases().await;
            catalog.close().await;
            return databases;
        }
        if !sweep.databases.is_empty() {
            return Ok(sweep.databases.clone());
        }
        Ok(vec![default_database(&self.config.database.dsn)?])
    }

    /// Sweep a single database over a fresh connection.
    pub async fn sweep_one(&self, database: &str, mode: SweepMode) -> SweepResult<DatabaseReport> {
        let mut catalog = self.connect(Some(database)).await?;
        let repair_dir = Path::new(&self.config.sweep.repair_dir);
        let report = sweep_database(&mut catalog, mode, repair_dir).await;
        catalog.close().await;
        report
    }

    /// Sweep every target database, stopping at the first error.
    ///
    /// On failure the reports of databases already swept come back inside
    /// [`SweepError::Partial`].
    pub async fn run(&self, mode: SweepMode) -> SweepResult<Vec<DatabaseReport>> {
        let databases = self.target_databases().await?;
        log::info!(
            "Sweeping {} database(s) on a {} cluster",
            databases.len(),
            self.config.database.flavor
        );

        sweep_each(databases, |database| async move {
            self.sweep_one(&database, mode).await
        })
        .await
    }
}

/// Run `sweep` for each database in order, keeping completed reports if one fails.
pub async fn sweep_each<F, Fut>(
    databases: Vec<String>,
    mut sweep: F,
) -> SweepResult<Vec<DatabaseReport>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = SweepResult<DatabaseReport>>,
{
    let mut reports = Vec::with_capacity(databases.len());
    for database in databases {
        match sweep(database.clone()).await {
            Ok(report) => reports.push(report),
            Err(source) => {
                log::error!("Sweep of {database} failed: {source}");
                return Err(SweepError::Partial {
                    database,
                    reports,
                    source: Box::new(source),
                });
            }
        }
    }
    Ok(reports)
}
