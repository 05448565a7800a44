//! Official registry provider driven by scripted browser sessions.

use std::sync::Arc;
use std::time::Duration;

use credence_core::{Provenance, ProviderFailure, RegistrySourceConfig, VerificationQuery};
use credence_providers::{OfficialRegistryProvider, VerificationProvider};
use credence_test_utils::{registry_results_page, BrowserScript, ScriptedLauncher};

const REGISTRY_URL: &str = "https://registry.example/busca-medicos/";

fn config(timeout: Duration) -> RegistrySourceConfig {
    RegistrySourceConfig {
        enabled: true,
        url: REGISTRY_URL.to_string(),
        timeout,
    }
}

fn provider(launcher: &ScriptedLauncher, timeout: Duration) -> OfficialRegistryProvider {
    OfficialRegistryProvider::new(Arc::new(launcher.clone()), &config(timeout))
}

fn query() -> VerificationQuery {
    VerificationQuery::new("240110", "SP")
}

#[tokio::test]
async fn test_successful_lookup_fills_form_and_closes_session() {
    let launcher = ScriptedLauncher::new(BrowserScript::registry_page(registry_results_page(
        "240110",
        "Lucas Henrique Ferreira dos Santos",
        "Situação: Ativo",
    )));
    let registry = provider(&launcher, Duration::from_secs(30));

    let hit = registry.attempt(&query()).await.unwrap();

    assert_eq!(hit.full_name, "Lucas Henrique Ferreira dos Santos");
    assert_eq!(hit.standing_text.as_deref(), Some("Situação: Ativo"));
    assert_eq!(registry.provenance(), Provenance::OfficialRegistry);

    let stats = launcher.stats();
    assert_eq!(stats.visited(), vec![REGISTRY_URL.to_string()]);
    assert_eq!(
        stats.filled(),
        vec![
            ("input[name='crm']".to_string(), "240110".to_string()),
            ("select[name='uf']".to_string(), "SP".to_string()),
        ]
    );
    assert_eq!(stats.closed(), 1);
    assert_eq!(stats.aborted(), 0);
}

#[tokio::test]
async fn test_no_matching_row_closes_session() {
    let launcher = ScriptedLauncher::new(BrowserScript::registry_page(
        "<html><body><p>Nenhum resultado encontrado</p></body></html>",
    ));
    let registry = provider(&launcher, Duration::from_secs(30));

    let err = registry.attempt(&query()).await.unwrap_err();

    assert_eq!(err, ProviderFailure::NotFound);
    assert_eq!(launcher.stats().closed(), 1);
    assert_eq!(launcher.stats().aborted(), 0);
}

#[tokio::test]
async fn test_missing_license_field_is_parse_failure() {
    let launcher = ScriptedLauncher::new(
        BrowserScript::registry_page(String::new()).without_selector("input[name='crm']"),
    );
    let registry = provider(&launcher, Duration::from_secs(30));

    let err = registry.attempt(&query()).await.unwrap_err();

    assert!(matches!(err, ProviderFailure::Parse { .. }));
    assert_eq!(launcher.stats().closed(), 1);
}

#[tokio::test]
async fn test_submit_falls_back_to_button_text_scan() {
    let launcher = ScriptedLauncher::new(
        BrowserScript::registry_page(registry_results_page(
            "240110",
            "Lucas Henrique Ferreira dos Santos",
            "Regular",
        ))
        .without_selector("button[type='submit']")
        .with_button_text("Pesquisar"),
    );
    let registry = provider(&launcher, Duration::from_secs(30));

    assert!(registry.attempt(&query()).await.is_ok());
}

#[tokio::test]
async fn test_missing_submit_control_is_parse_failure() {
    let launcher = ScriptedLauncher::new(
        BrowserScript::registry_page(String::new()).without_selector("button[type='submit']"),
    );
    let registry = provider(&launcher, Duration::from_secs(30));

    let err = registry.attempt(&query()).await.unwrap_err();
    assert_eq!(err, ProviderFailure::parse("submit control not found"));
}

#[tokio::test(start_paused = true)]
async fn test_hanging_page_times_out_and_still_closes() {
    let launcher = ScriptedLauncher::new(BrowserScript::registry_page(String::new()).hanging());
    let registry = provider(&launcher, Duration::from_secs(30));

    let err = registry.attempt(&query()).await.unwrap_err();

    assert_eq!(
        err,
        ProviderFailure::Timeout {
            after: Duration::from_secs(30)
        }
    );
    assert_eq!(launcher.stats().closed(), 1);
    assert_eq!(launcher.stats().aborted(), 0);
}

#[tokio::test]
async fn test_launch_failure_is_unavailable() {
    let launcher =
        ScriptedLauncher::new(BrowserScript::registry_page(String::new()).failing_launch());
    let registry = provider(&launcher, Duration::from_secs(30));

    let err = registry.attempt(&query()).await.unwrap_err();

    assert!(matches!(err, ProviderFailure::Unavailable { .. }));
    assert_eq!(launcher.stats().launched(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_attempt_aborts_session() {
    let launcher = ScriptedLauncher::new(BrowserScript::registry_page(String::new()).hanging());
    let registry = provider(&launcher, Duration::from_secs(30));

    let outer = tokio::time::timeout(Duration::from_secs(1), registry.attempt(&query())).await;

    assert!(outer.is_err());
    let stats = launcher.stats();
    assert_eq!(stats.launched(), 1);
    assert_eq!(stats.aborted(), 1);
    assert_eq!(stats.closed(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hung_close_is_bounded_and_aborts() {
    let launcher = ScriptedLauncher::new(
        BrowserScript::registry_page(registry_results_page(
            "240110",
            "Lucas Henrique Ferreira dos Santos",
            "Ativo",
        ))
        .hanging_on_close(),
    );
    let registry = provider(&launcher, Duration::from_secs(30));

    let started = tokio::time::Instant::now();
    let hit = registry.attempt(&query()).await.unwrap();

    assert_eq!(hit.full_name, "Lucas Henrique Ferreira dos Santos");
    assert!(started.elapsed() < Duration::from_secs(30));
    let stats = launcher.stats();
    assert_eq!(stats.closed(), 0);
    assert_eq!(stats.aborted(), 1);
}
