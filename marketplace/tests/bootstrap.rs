//! Application assembly from configuration.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use ticketchain_core::mirror::{EntityType, FactState};
use ticketchain_core::{Address, Wei};
use ticketchain_marketplace::{
    ApplicationBuilder, BootstrapError, BroadcastMirror, Config, ConfigError, LedgerHandle,
    LedgerMode,
};
use ticketchain_testing::fixtures::{buyer, event_draft, organizer};

fn config(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[tokio::test]
async fn test_offline_application_serves_requests() {
    let config = config(&[("LEDGER_MODE", "offline"), ("CHAIN_ID", "31337")]);
    let app = ApplicationBuilder::new(config).build().unwrap();

    assert!(matches!(app.ledger, LedgerHandle::Offline(_)));
    assert_eq!(app.marketplace.chain_id().await.unwrap(), 31337);

    let event_id = app
        .marketplace
        .create_event(organizer(), event_draft())
        .await
        .unwrap();
    assert!(app.marketplace.event(event_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_offline_genesis_uses_configured_platform() {
    let platform = Address::from_low_u64(0x77);
    let config = config(&[
        ("LEDGER_MODE", "offline"),
        ("PLATFORM_FEE_BPS", "100"),
        ("PLATFORM_ADDRESS", &platform.to_string()),
    ]);
    let app = ApplicationBuilder::new(config).build().unwrap();

    let status = app.marketplace.platform_status().await.unwrap();
    assert_eq!(status.platform.address, platform);
    assert_eq!(status.platform.fee_bps.get(), 100);
}

#[tokio::test]
async fn test_broadcast_mirror_receives_confirmed_facts() {
    let mirror = BroadcastMirror::new(16);
    let mut facts = mirror.subscribe();
    let app = ApplicationBuilder::new(config(&[("LEDGER_MODE", "offline")]))
        .mirror(Arc::new(mirror))
        .build()
        .unwrap();

    let event_id = app
        .marketplace
        .create_event(organizer(), event_draft())
        .await
        .unwrap();
    app.marketplace
        .mint_ticket(organizer(), event_id, buyer(), "A1".into(), None)
        .await
        .unwrap();

    let created = facts.recv().await.unwrap();
    assert_eq!(created.entity_type, EntityType::Event);
    assert_eq!(created.new_state, FactState::Created);
    let minted = facts.recv().await.unwrap();
    assert_eq!(minted.entity_type, EntityType::Ticket);
    assert_eq!(minted.event_id, Some(event_id));
}

#[tokio::test]
async fn test_offline_ledger_can_be_funded() {
    let app = ApplicationBuilder::new(config(&[("LEDGER_MODE", "offline")]))
        .build()
        .unwrap();
    let ledger = app.ledger.offline().unwrap();

    ledger.fund(buyer(), Wei::new(250)).await;

    assert_eq!(app.marketplace.balance(buyer()).await.unwrap(), Wei::new(250));
}

#[test]
fn test_live_mode_builds_rpc_client() {
    let app = ApplicationBuilder::new(config(&[(
        "BLOCKCHAIN_PROVIDER_URL",
        "http://127.0.0.1:9",
    )]))
    .build()
    .unwrap();

    assert!(matches!(app.ledger, LedgerHandle::Live(_)));
    assert!(app.ledger.offline().is_none());
}

#[test]
fn test_offline_ledger_refused_in_production() {
    let mut config = config(&[("APP_ENV", "production")]);
    config.ledger.mode = LedgerMode::Offline;

    let error = ApplicationBuilder::new(config).build().err().unwrap();

    assert!(matches!(
        error,
        BootstrapError::Config(ConfigError::OfflineInProduction)
    ));
    assert_eq!(error.code(), "OFFLINE_IN_PRODUCTION");
}
