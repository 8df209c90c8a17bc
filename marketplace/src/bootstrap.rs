//! Wiring: configuration in, a ready [`Marketplace`] out.
//!
//! The ledger client is chosen here, once, from [`LedgerMode`]. Nothing downstream
//! knows or checks which implementation it talks to.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = Config::load()?;
//! let app = ApplicationBuilder::new(config)
//!     .mirror(Arc::new(BroadcastMirror::new(1024)))
//!     .build()?;
//! let event_id = app.marketplace.create_event(organizer, draft).await?;
//! ```

use crate::config::{Config, ConfigError, LedgerMode};
use crate::service::Marketplace;
use std::sync::Arc;
use thiserror::Error;
use ticketchain_core::mirror::{MirrorSink, NoopMirror};
use ticketchain_ledger::{InMemoryLedger, LedgerClient, LedgerError, RpcLedger};
use ticketchain_runtime::TransactionExecutor;

/// Errors while assembling the application.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The ledger client could not be built
    #[error("Failed to build ledger client: {0}")]
    Ledger(#[from] LedgerError),
}

impl BootstrapError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(error) => error.code(),
            Self::Ledger(error) => error.code(),
        }
    }
}

/// The ledger client selected by configuration.
#[derive(Clone)]
pub enum LedgerHandle {
    /// JSON-RPC client
    Live(Arc<RpcLedger>),
    /// In-process ledger
    Offline(Arc<InMemoryLedger>),
}

impl LedgerHandle {
    /// Build the client `config` asks for.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::Config`] for offline mode in production,
    /// [`BootstrapError::Ledger`] if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, BootstrapError> {
        config.validate()?;
        match config.ledger.mode {
            LedgerMode::Live => {
                let rpc = RpcLedger::new(config.ledger.rpc_config(config.contracts))?;
                if rpc.is_read_only() {
                    tracing::warn!(
                        endpoint = %config.ledger.provider_url,
                        "No signing credential configured, ledger client is read-only"
                    );
                }
                Ok(Self::Live(Arc::new(rpc)))
            }
            LedgerMode::Offline => {
                tracing::warn!(
                    environment = %config.environment,
                    chain_id = config.ledger.chain_id,
                    "Using the offline in-process ledger"
                );
                Ok(Self::Offline(Arc::new(
                    InMemoryLedger::new(config.genesis()).with_chain_id(config.ledger.chain_id),
                )))
            }
        }
    }

    /// The client as a trait object.
    #[must_use]
    pub fn client(&self) -> Arc<dyn LedgerClient> {
        match self {
            Self::Live(rpc) => Arc::clone(rpc) as Arc<dyn LedgerClient>,
            Self::Offline(memory) => Arc::clone(memory) as Arc<dyn LedgerClient>,
        }
    }

    /// The in-process ledger, in offline mode.
    #[must_use]
    pub const fn offline(&self) -> Option<&Arc<InMemoryLedger>> {
        match self {
            Self::Live(_) => None,
            Self::Offline(memory) => Some(memory),
        }
    }
}

/// An assembled application.
pub struct Application {
    /// The settlement service
    pub marketplace: Arc<Marketplace>,
    /// The ledger client behind it
    pub ledger: LedgerHandle,
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    config: Config,
    mirror: Arc<dyn MirrorSink>,
}

impl ApplicationBuilder {
    /// Start from a configuration. Facts are dropped unless a mirror is set.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            mirror: Arc::new(NoopMirror),
        }
    }

    /// Publish transition facts to `mirror`.
    #[must_use]
    pub fn mirror(mut self, mirror: Arc<dyn MirrorSink>) -> Self {
        self.mirror = mirror;
        self
    }

    /// Build the ledger client, executor and service.
    ///
    /// # Errors
    ///
    /// See [`LedgerHandle::from_config`].
    pub fn build(self) -> Result<Application, BootstrapError> {
        let ledger = LedgerHandle::from_config(&self.config)?;
        let executor = TransactionExecutor::new(ledger.client(), self.config.retry.clone())
            .with_confirmations(self.config.ledger.confirmations);

        tracing::info!(
            environment = %self.config.environment,
            mode = ?self.config.ledger.mode,
            max_attempts = self.config.retry.max_attempts,
            confirmations = self.config.ledger.confirmations,
            contracts_configured = self.config.contracts.is_some(),
            "Marketplace assembled"
        );

        Ok(Application {
            marketplace: Arc::new(Marketplace::new(executor, self.mirror)),
            ledger,
        })
    }
}
