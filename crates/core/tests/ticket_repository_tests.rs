//! Behaviour tests for `TicketRepository` against in-memory ports.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::providers::{ScriptedProvider, StaticFactory};
use support::stores::{InMemoryConfigStore, InMemoryIssueCache};
use support::{github_source, issue, jira_source};
use ticketsync_core::{IssueCache, TicketRepository};
use ticketsync_domain::{ProviderKind, SourceCredentials, SyncOutcome, TicketSyncError};

struct Harness {
    repo: Arc<TicketRepository>,
    jira: Arc<ScriptedProvider>,
    github: Arc<ScriptedProvider>,
    cache: InMemoryIssueCache,
    configs: InMemoryConfigStore,
}

fn harness(sources: Vec<ticketsync_domain::TicketSourceConfig>) -> Harness {
    let jira = ScriptedProvider::new(ProviderKind::Jira);
    let github = ScriptedProvider::new(ProviderKind::GitHub);
    let factory = StaticFactory::default().with(jira.clone()).with(github.clone());
    let cache = InMemoryIssueCache::default();
    let configs = InMemoryConfigStore::with_configs(sources);
    let repo = Arc::new(TicketRepository::new(
        Arc::new(factory),
        Arc::new(configs.clone()),
        Arc::new(cache.clone()),
    ));
    Harness { repo, jira, github, cache, configs }
}

#[tokio::test]
async fn refresh_source_caches_issues_under_the_source() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    h.jira.respond(
        &source.id,
        vec![issue("stale-id", "PROJ-1", "First"), issue("stale-id", "PROJ-2", "Second")],
    );

    let written = h.repo.refresh_source(&source).await?;

    assert_eq!(written, 2);
    assert_eq!(h.repo.get_cached_issue_count_by_source(&source.id).await?, 2);
    let cached = h.repo.get_issue_by_key("PROJ-2").await?.expect("cached");
    assert_eq!(cached.source_id, source.id);
    Ok(())
}

#[tokio::test]
async fn refresh_source_keeps_issues_missing_from_latest_fetch() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);

    h.jira.respond(&source.id, vec![issue(&source.id, "PROJ-1", "Old")]);
    h.repo.refresh_source(&source).await?;
    h.jira.respond(&source.id, vec![issue(&source.id, "PROJ-2", "New")]);
    h.repo.refresh_source(&source).await?;

    let keys: Vec<String> =
        h.repo.get_all_cached_issues().await?.into_iter().map(|i| i.key).collect();
    assert_eq!(keys, vec!["PROJ-2", "PROJ-1"]);
    Ok(())
}

#[tokio::test]
async fn refresh_source_rejects_mismatched_credentials_before_calling_provider() {
    let mut source = jira_source("Broken");
    source.credentials = SourceCredentials::GitLab { token: "t".into(), project_ids: vec![] };
    let h = harness(vec![]);

    let err = h.repo.refresh_source(&source).await.unwrap_err();

    assert!(matches!(err, TicketSyncError::Configuration(_)));
    assert_eq!(h.jira.calls(), 0);
}

#[tokio::test]
async fn refresh_all_sources_reports_partial_failure() -> anyhow::Result<()> {
    let work = jira_source("Work");
    let oss = github_source("OSS");
    let h = harness(vec![work.clone(), oss.clone()]);
    h.jira.respond(&work.id, vec![issue(&work.id, "PROJ-7", "Ship it")]);
    h.github.fail(&oss.id, TicketSyncError::Network("connection reset".into()));

    let summary = h.repo.refresh_all_sources().await?;

    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.total_issues(), 1);
    let failed = summary.failures().next().expect("one failure");
    assert_eq!(failed.source_id, oss.id);
    assert!(matches!(failed.outcome, SyncOutcome::Failed { .. }));
    assert_eq!(h.repo.get_cached_issue_count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn refresh_all_sources_skips_disabled_sources() -> anyhow::Result<()> {
    let active = jira_source("Active");
    let paused = jira_source("Paused").with_enabled(false);
    let h = harness(vec![active.clone(), paused]);

    let summary = h.repo.refresh_all_sources().await?;

    assert_eq!(summary.results.len(), 1);
    assert_eq!(summary.results[0].source_id, active.id);
    Ok(())
}

#[tokio::test]
async fn concurrent_refreshes_of_one_source_run_one_at_a_time() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    h.jira.set_delay(Duration::from_millis(30));

    let (a, b) = tokio::join!(h.repo.refresh_source(&source), h.repo.refresh_source(&source));
    a?;
    b?;

    assert_eq!(h.jira.calls(), 2);
    assert_eq!(h.jira.max_in_flight(), 1);
    Ok(())
}

#[tokio::test]
async fn search_with_fallback_uses_cache_when_provider_fails() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    h.cache
        .upsert_all(&[
            issue(&source.id, "PROJ-1", "Login button broken"),
            issue(&source.id, "PROJ-2", "Update docs"),
        ])
        .await?;
    h.jira.fail(&source.id, TicketSyncError::Network("offline".into()));

    let results = h.repo.search_with_fallback("login", 10).await?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].key, "PROJ-1");
    Ok(())
}

#[tokio::test]
async fn search_with_fallback_writes_provider_results_through() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    h.jira.respond(&source.id, vec![issue(&source.id, "PROJ-9", "Remote only")]);

    let results = h.repo.search_with_fallback("remote", 10).await?;

    assert_eq!(results.len(), 1);
    assert!(h.repo.get_issue_by_key("PROJ-9").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn search_with_fallback_caps_merged_results_at_limit() -> anyhow::Result<()> {
    let work = jira_source("Work");
    let oss = github_source("Open source");
    let h = harness(vec![work.clone(), oss.clone()]);
    h.jira.respond(
        &work.id,
        vec![issue(&work.id, "PROJ-1", "a"), issue(&work.id, "PROJ-2", "b")],
    );
    h.github.respond(&oss.id, vec![issue(&oss.id, "#1", "c"), issue(&oss.id, "#2", "d")]);

    let results = h.repo.search_with_fallback("", 3).await?;

    assert_eq!(results.len(), 3);
    // Everything fetched is still cached
    assert_eq!(h.repo.get_cached_issue_count().await?, 4);
    Ok(())
}

#[tokio::test]
async fn search_with_fallback_without_sources_searches_cache() -> anyhow::Result<()> {
    let h = harness(vec![]);
    h.cache.upsert(&issue("s1", "OPS-3", "Rotate keys")).await?;

    let results = h.repo.search_with_fallback("rotate", 5).await?;

    assert_eq!(results.len(), 1);
    assert!(!h.repo.has_enabled_sources().await?);
    Ok(())
}

#[tokio::test]
async fn search_with_fallback_survives_config_store_failure() -> anyhow::Result<()> {
    let h = harness(vec![]);
    h.cache.upsert(&issue("s1", "OPS-3", "Rotate keys")).await?;
    h.configs.set_fail_reads(true);

    let results = h.repo.search_with_fallback("ops", 5).await?;

    assert_eq!(results.len(), 1);
    Ok(())
}

#[tokio::test]
async fn search_issues_emits_cache_then_provider_results() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    h.cache.upsert(&issue(&source.id, "PROJ-1", "Login flow")).await?;
    h.jira.respond(&source.id, vec![issue(&source.id, "PROJ-2", "Login timeout")]);

    let mut live = h.repo.search_issues("login");

    let found = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let batch = live.next().await.expect("subscription open");
            if batch.len() == 2 {
                break batch;
            }
        }
    })
    .await?;

    let keys: Vec<&str> = found.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["PROJ-2", "PROJ-1"]);
    Ok(())
}

#[tokio::test]
async fn search_issues_keeps_serving_cache_when_provider_fails() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    h.cache.upsert(&issue(&source.id, "PROJ-1", "Login flow")).await?;
    h.jira.fail(&source.id, TicketSyncError::Authentication("expired".into()));

    let mut live = h.repo.search_issues("login");
    let first = tokio::time::timeout(Duration::from_secs(1), live.next()).await?;

    assert_eq!(first.map(|batch| batch.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn watch_project_updates_after_refresh() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    let mut live = h.repo.watch_project("PROJ");

    let initial = tokio::time::timeout(Duration::from_secs(1), live.next()).await?;
    assert_eq!(initial, Some(vec![]));

    h.jira.respond(&source.id, vec![issue(&source.id, "PROJ-5", "Fresh")]);
    h.repo.refresh_source(&source).await?;

    let updated = tokio::time::timeout(Duration::from_secs(1), live.next()).await?;
    assert_eq!(updated.map(|batch| batch.len()), Some(1));

    live.cancel();
    assert!(live.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn fetch_remote_issue_caches_result() -> anyhow::Result<()> {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    h.jira.respond(&source.id, vec![issue(&source.id, "PROJ-4", "Remote")]);

    let fetched = h.repo.fetch_remote_issue(&source, "PROJ-4").await?;

    assert_eq!(fetched.key, "PROJ-4");
    assert!(h.repo.get_issue_by_source_and_key(&source.id, "PROJ-4").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn validate_credentials_reflects_provider() {
    let source = jira_source("Work");
    let h = harness(vec![source.clone()]);
    assert!(h.repo.validate_credentials(&source).await);

    h.jira.fail(&source.id, TicketSyncError::Authentication("bad token".into()));
    assert!(!h.repo.validate_credentials(&source).await);

    let err = h.repo.test_connection(&source).await.unwrap_err();
    assert_eq!(h.repo.error_message(&err, &source), format!("Work: {err}"));
}

#[tokio::test]
async fn purge_source_removes_only_that_source() -> anyhow::Result<()> {
    let h = harness(vec![]);
    h.cache.upsert_all(&[issue("a", "A-1", "one"), issue("b", "B-1", "two")]).await?;

    assert_eq!(h.repo.purge_source("a").await?, 1);
    assert_eq!(h.repo.get_cached_issue_count().await?, 1);
    assert_eq!(h.repo.get_cached_issue_count_by_source("b").await?, 1);
    Ok(())
}
