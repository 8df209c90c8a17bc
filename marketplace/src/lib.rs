//! # TicketChain Marketplace
//!
//! Settlement service for event tickets: create events, mint tickets for unique seats,
//! list them for capped resale and settle purchases with royalty and platform fee
//! splits. The ledger is the system of record; this crate issues calls to it, waits
//! for their confirmation and reports each confirmed transition to the read mirror.
//!
//! # Architecture
//!
//! ```text
//!  Marketplace ──► TransactionExecutor ──► LedgerClient ──► ledger
//!      │            (retry, reconcile)     (RPC | in-process)
//!      │
//!      └──► MirrorSink (transition facts, best effort)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketchain_marketplace::{ApplicationBuilder, Config};
//!
//! let app = ApplicationBuilder::new(Config::load()?).build()?;
//! let event_id = app.marketplace.create_event(organizer, draft).await?;
//! let ticket_id = app
//!     .marketplace
//!     .mint_ticket(organizer, event_id, buyer, "A1".into(), None)
//!     .await?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod mirror;
pub mod service;

pub use bootstrap::{Application, ApplicationBuilder, BootstrapError, LedgerHandle};
pub use config::{AppEnvironment, Config, ConfigError, DeploymentManifest, LedgerMode};
pub use error::MarketplaceError;
pub use mirror::BroadcastMirror;
pub use service::Marketplace;
