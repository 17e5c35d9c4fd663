use crate::catalog::SessionCatalog;
use crate::error::{SweepError, SweepResult};
use crate::namespace::drop_statement;
use crate::orphan::OrphanSet;

/// Drop every namespace in `orphans`, one statement each.
///
/// Returns the names dropped. The first failure stops the run and reports
/// the failing name together with the names already dropped; earlier drops
/// are not rolled back.
pub async fn drop_orphans<C>(catalog: &mut C, orphans: &OrphanSet) -> SweepResult<Vec<String>>
where
    C: SessionCatalog + ?Sized,
{
    let mut dropped = Vec::with_capacity(orphans.len());
    for orphan in orphans.iter() {
        let sql = drop_statement(&orphan.name);
        log::debug!("Executing: {sql}");
        if let Err(e) = catalog.execute(&sql).await {
            log::error!("Failed to drop orphaned schema {}: {e}", orphan.name);
            return Err(SweepError::Drop {
                schema: orphan.name.clone(),
                dropped,
                source: Box::new(e),
            });
        }
        log::info!("Dropped orphaned schema {} ({})", orphan.name, orphan.reason);
        dropped.push(orphan.name.clone());
    }
    Ok(dropped)
}
