//! Orphaned temp schema integration tests
//!
//! Each test starts from a fresh PostgreSQL cluster, leaks or holds temp
//! namespaces, and checks what the sweeper reports and drops.

use anyhow::Result;
use sqlx::Connection;
use sweeper::{OrphanReason, SessionCatalog, SweepMode, Sweeper, drop_orphans, find_orphans};
use tests_integration::fixtures::ClusterTestContext;
use tests_integration::init_test_logging;

#[tokio::test]
async fn test_fresh_cluster_reports_nothing_and_drop_is_idempotent() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    let mut catalog = ctx.catalog("postgres").await?;

    for _ in 0..2 {
        let orphans = find_orphans(&mut catalog).await?;
        assert!(orphans.is_empty(), "unexpected orphans: {orphans:?}");
        let dropped = drop_orphans(&mut catalog, &orphans).await?;
        assert!(dropped.is_empty());
    }

    catalog.close().await;
    Ok(())
}

#[tokio::test]
async fn test_leaked_namespaces_are_found_and_dropped() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    ctx.leak_namespace("postgres", "pg_temp_4242").await?;
    ctx.leak_namespace("postgres", "pg_toast_temp_4242").await?;
    ctx.create_schema("postgres", "scratch_temp_1").await?;

    let mut catalog = ctx.catalog("postgres").await?;
    let orphans = find_orphans(&mut catalog).await?;
    assert_eq!(orphans.names(), vec!["pg_temp_4242", "pg_toast_temp_4242"]);
    assert!(orphans.iter().all(|o| o.reason == OrphanReason::NoSession));

    let dropped = drop_orphans(&mut catalog, &orphans).await?;
    assert_eq!(dropped, vec!["pg_temp_4242", "pg_toast_temp_4242"]);
    catalog.close().await;

    let schemas = ctx.schemas("postgres").await?;
    assert!(!schemas.contains(&"pg_temp_4242".to_string()));
    assert!(!schemas.contains(&"pg_toast_temp_4242".to_string()));
    assert!(schemas.contains(&"scratch_temp_1".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_live_session_keeps_its_namespace() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    let (session, live_namespace) = ctx.open_temp_session("postgres").await?;
    ctx.leak_namespace("postgres", "pg_temp_4243").await?;

    let mut catalog = ctx.catalog("postgres").await?;
    let orphans = find_orphans(&mut catalog).await?;
    assert!(orphans.contains("pg_temp_4243"));
    assert!(
        !orphans.contains(&live_namespace),
        "{live_namespace} belongs to a live session"
    );

    drop_orphans(&mut catalog, &orphans).await?;
    catalog.close().await;

    let schemas = ctx.schemas("postgres").await?;
    assert!(schemas.contains(&live_namespace));
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_checking_backend_namespace_is_orphaned() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    let mut catalog = ctx.catalog("postgres").await?;
    catalog.execute("CREATE TEMP TABLE own_scratch (id int)").await?;

    let orphans = find_orphans(&mut catalog).await?;
    assert!(
        orphans
            .iter()
            .any(|o| o.name.starts_with("pg_temp_") && o.reason == OrphanReason::SelfBackend),
        "own temp namespace not reported: {orphans:?}"
    );

    catalog.close().await;
    Ok(())
}

#[tokio::test]
async fn test_quoted_namespace_names_are_dropped() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    ctx.leak_namespace("postgres", "pg_temp_77\"x").await?;

    let mut catalog = ctx.catalog("postgres").await?;
    let orphans = find_orphans(&mut catalog).await?;
    assert_eq!(orphans.names(), vec!["pg_temp_77\"x"]);
    drop_orphans(&mut catalog, &orphans).await?;
    catalog.close().await;

    assert!(!ctx.schemas("postgres").await?.contains(&"pg_temp_77\"x".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_sweeper_visits_each_configured_database() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    ctx.create_database("sales").await?;
    ctx.leak_namespace("postgres", "pg_temp_5001").await?;
    ctx.leak_namespace("sales", "pg_temp_5002").await?;

    let mut config = ctx.config();
    config.sweep.databases = vec!["postgres".to_string(), "sales".to_string()];
    let reports = Sweeper::new(config).run(SweepMode::Drop).await?;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].database, "postgres");
    assert_eq!(reports[0].dropped, vec!["pg_temp_5001"]);
    assert_eq!(reports[1].database, "sales");
    assert_eq!(reports[1].dropped, vec!["pg_temp_5002"]);

    assert!(!ctx.schemas("sales").await?.contains(&"pg_temp_5002".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_all_databases_excludes_template0() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    ctx.create_database("sales").await?;

    let mut config = ctx.config();
    config.sweep.all_databases = true;
    let databases = Sweeper::new(config).target_databases().await?;

    assert!(databases.contains(&"postgres".to_string()));
    assert!(databases.contains(&"sales".to_string()));
    assert!(databases.contains(&"template1".to_string()));
    assert!(!databases.contains(&"template0".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_script_mode_leaves_namespaces_in_place() -> Result<()> {
    init_test_logging();
    let ctx = ClusterTestContext::new().await?;
    ctx.leak_namespace("postgres", "pg_temp_6001").await?;
    let repair = tempfile::tempdir()?;

    let mut config = ctx.config();
    config.sweep.repair_dir = repair.path().display().to_string();
    let reports = Sweeper::new(config).run(SweepMode::Script).await?;

    let script = reports[0].script.clone().expect("repair script written");
    let contents = std::fs::read_to_string(script)?;
    assert!(contents.contains("DROP SCHEMA IF EXISTS \"pg_temp_6001\" CASCADE;"));
    assert!(ctx.schemas("postgres").await?.contains(&"pg_temp_6001".to_string()));
    Ok(())
}
