//! TicketChain settlement demo
//!
//! Runs one resale end to end against the offline ledger:
//! - Event creation (royalty 500 bps, markup cap 1000 bps, issue price 100)
//! - Minting seat A1 to a first buyer
//! - Listing at the 110 cap and a purchase by a second buyer
//! - Fund distribution to artist, platform and seller
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info,ticketchain=debug cargo run --bin demo
//! ```

use anyhow::{Context, anyhow};
use std::sync::Arc;
use ticketchain_core::model::EventDraft;
use ticketchain_core::{Address, Bps, Fingerprint, SeatId, Wei};
use ticketchain_marketplace::{ApplicationBuilder, BroadcastMirror, Config};
use ticketchain_runtime::MetricsRecorder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticketchain_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = MetricsRecorder::new();
    metrics.install()?;

    println!("\n============================================");
    println!("   TicketChain Settlement - Offline Demo");
    println!("============================================\n");

    let config = Config::load()
        .and_then(Config::into_offline)
        .context("loading configuration")?;
    let operator = config.genesis().marketplace;
    let platform = config.platform.address;

    let mirror = BroadcastMirror::new(256);
    let mut facts = mirror.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(fact) = facts.recv().await {
            println!(
                "   mirror: {:?} #{} -> {:?}",
                fact.entity_type, fact.entity_id, fact.new_state
            );
        }
    });

    let app = ApplicationBuilder::new(config)
        .mirror(Arc::new(mirror))
        .build()?;
    let marketplace = &app.marketplace;
    let ledger = app
        .ledger
        .offline()
        .ok_or_else(|| anyhow!("demo requires the offline ledger"))?;

    let organizer = Address::from_low_u64(2);
    let artist = Address::from_low_u64(3);
    let buyer1 = Address::from_low_u64(4);
    let buyer2 = Address::from_low_u64(5);
    ledger.fund(buyer2, Wei::new(1_000)).await;

    println!("Chain id: {}\n", marketplace.chain_id().await?);

    println!("1. Organizer creates the event");
    let event_id = marketplace
        .create_event(
            organizer,
            EventDraft {
                fingerprint: Fingerprint::from_bytes([0xab; 32]),
                max_supply: 100,
                royalty_bps: Bps::new(500),
                max_resale_markup_bps: Bps::new(1_000),
                artist,
                issue_price: Wei::new(100),
            },
        )
        .await?;
    println!("   event {event_id:?} created\n");

    println!("2. Organizer mints seat A1 to buyer 1");
    let ticket_id = marketplace
        .mint_ticket(organizer, event_id, buyer1, SeatId::from("A1"), None)
        .await?;
    println!("   ticket {ticket_id:?} minted\n");

    println!("3. Buyer 1 approves the marketplace and lists at the cap");
    marketplace.approve(buyer1, ticket_id, Some(operator)).await?;
    let listing_id = marketplace
        .create_listing(buyer1, ticket_id, Wei::new(110))
        .await?;
    println!("   listing {listing_id:?} active at 110 wei\n");

    println!("4. Buyer 2 purchases");
    let settlement = marketplace
        .purchase_listing(buyer2, listing_id, Wei::new(110))
        .await?;
    println!("   royalty:  {}", settlement.royalty);
    println!("   platform: {}", settlement.platform_cut);
    println!("   seller:   {}\n", settlement.seller_proceeds);

    println!("5. Final state");
    let ticket = marketplace
        .ticket(ticket_id)
        .await?
        .ok_or_else(|| anyhow!("ticket {ticket_id:?} vanished"))?;
    println!("   ticket owner: {}", ticket.owner);
    println!("   artist balance:   {}", marketplace.balance(artist).await?);
    println!("   platform balance: {}", marketplace.balance(platform).await?);
    println!("   buyer 1 balance:  {}", marketplace.balance(buyer1).await?);
    println!("   buyer 2 balance:  {}", marketplace.balance(buyer2).await?);

    drop(app);
    printer.await.ok();

    if let Some(text) = metrics.render() {
        println!("\n--- metrics ---\n{text}");
    }
    Ok(())
}
