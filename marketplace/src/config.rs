//! Configuration management for the settlement service.
//!
//! Loads configuration from environment variables with sensible defaults. Contract
//! addresses come from the deployment manifest when it is present and names all three
//! contracts, otherwise from the environment.
//!
//! # Environment
//!
//! | Variable | Default |
//! |----------|---------|
//! | `APP_ENV` | `development` |
//! | `LEDGER_MODE` | `live` (`offline` uses the in-process ledger) |
//! | `BLOCKCHAIN_PROVIDER_URL` | `http://localhost:8545` |
//! | `BLOCKCHAIN_PRIVATE_KEY` | unset (read-only) |
//! | `CHAIN_ID` | `31337` |
//! | `BLOCKCHAIN_CONFIRMATIONS` | `1` |
//! | `BLOCKCHAIN_REQUEST_TIMEOUT_MS` | `30000` |
//! | `BLOCKCHAIN_CONFIRMATION_TIMEOUT_MS` | `60000` |
//! | `BLOCKCHAIN_RETRY_MAX_ATTEMPTS` | `3` |
//! | `BLOCKCHAIN_RETRY_INITIAL_BACKOFF` | `1000` (ms) |
//! | `BLOCKCHAIN_RETRY_MAX_BACKOFF` | `10000` (ms) |
//! | `BLOCKCHAIN_RETRY_BACKOFF_FACTOR` | `2.0` |
//! | `CONTRACT_EVENT_REGISTRY_ADDRESS`, `CONTRACT_TICKET_NFT_ADDRESS`, `CONTRACT_MARKETPLACE_ADDRESS` | unset |
//! | `OWNER_ADDRESS` | `0x…01` (offline ledger only) |
//! | `PLATFORM_FEE_BPS` | `250` |
//! | `PLATFORM_ADDRESS` | owner address |
//! | `DEPLOYMENT_MANIFEST_PATH` | `deployment-addresses.json` |

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use ticketchain_core::model::{MAX_PLATFORM_FEE_BPS, PlatformConfig};
use ticketchain_core::settlement::Genesis;
use ticketchain_core::{Address, Bps};
use ticketchain_ledger::{ContractAddresses, DEFAULT_CHAIN_ID, RpcConfig};
use ticketchain_runtime::RetryPolicy;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Why it was refused
        reason: String,
    },

    /// Values parse but do not make sense together
    #[error("Configuration validation failed: {0}")]
    Validation(String),

    /// Offline mode was requested in production
    #[error("Offline ledger mode is not allowed in production")]
    OfflineInProduction,

    /// The deployment manifest exists but cannot be read or parsed
    #[error("Deployment manifest {path}: {reason}")]
    Manifest {
        /// Manifest path
        path: String,
        /// Why it was refused
        reason: String,
    },
}

impl ConfigError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            Self::Validation(_) => "CONFIG_INVALID",
            Self::OfflineInProduction => "OFFLINE_IN_PRODUCTION",
            Self::Manifest { .. } => "MANIFEST_INVALID",
        }
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    /// Local development
    Development,
    /// Automated tests
    Test,
    /// Pre-production
    Staging,
    /// Production
    Production,
}

impl AppEnvironment {
    /// Check if this is the production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for AppEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "staging" | "stage" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _ => Err("expected development, test, staging or production".to_string()),
        }
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        })
    }
}

/// Which ledger client to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    /// JSON-RPC to a real endpoint
    Live,
    /// Deterministic in-process ledger
    Offline,
}

impl FromStr for LedgerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "offline" | "mock" => Ok(Self::Offline),
            _ => Err("expected live or offline".to_string()),
        }
    }
}

/// Ledger connection settings
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Client to build
    pub mode: LedgerMode,
    /// JSON-RPC endpoint
    pub provider_url: String,
    /// Signing credential; `None` means read-only
    pub credential: Option<String>,
    /// Expected chain id
    pub chain_id: u64,
    /// Confirmations to wait for
    pub confirmations: u32,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Confirmation wait limit
    pub confirmation_timeout: Duration,
}

impl LedgerConfig {
    /// JSON-RPC client settings.
    #[must_use]
    pub fn rpc_config(&self, contracts: Option<ContractAddresses>) -> RpcConfig {
        let mut rpc = RpcConfig::new(self.provider_url.clone(), self.credential.clone())
            .with_confirmation_timeout(self.confirmation_timeout);
        rpc.request_timeout = self.request_timeout;
        match contracts {
            Some(contracts) => rpc.with_contracts(contracts),
            None => rpc,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment
    pub environment: AppEnvironment,
    /// Ledger connection
    pub ledger: LedgerConfig,
    /// Contract addresses, when known
    pub contracts: Option<ContractAddresses>,
    /// Retry tuning for the executor
    pub retry: RetryPolicy,
    /// Contract owner, used to seed the offline ledger
    pub owner: Address,
    /// Platform fee and payout account
    pub platform: PlatformConfig,
    /// Deployment manifest location
    pub manifest_path: PathBuf,
}

/// Contract addresses a local development deployment uses for the offline ledger.
pub const DEV_CONTRACTS: ContractAddresses = ContractAddresses {
    event_registry: Address::from_low_u64(0x1001),
    ticket_nft: Address::from_low_u64(0x1002),
    marketplace: Address::from_low_u64(0x1003),
};

impl Config {
    /// Load configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the values are
    /// inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from the environment, then overlay the deployment manifest if it is
    /// present and complete.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`] and [`Config::overlay_manifest_file`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env()?.overlay_manifest_file()
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the values are
    /// inconsistent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::builder()
            .max_attempts(vars.parse_or("BLOCKCHAIN_RETRY_MAX_ATTEMPTS", defaults.max_attempts)?)
            .initial_backoff(Duration::from_millis(
                vars.parse_or("BLOCKCHAIN_RETRY_INITIAL_BACKOFF", 1000)?,
            ))
            .max_backoff(Duration::from_millis(
                vars.parse_or("BLOCKCHAIN_RETRY_MAX_BACKOFF", 10_000)?,
            ))
            .backoff_factor(vars.parse_or("BLOCKCHAIN_RETRY_BACKOFF_FACTOR", defaults.backoff_factor)?)
            .build();

        let owner = vars.parse_or("OWNER_ADDRESS", Address::from_low_u64(1))?;
        let platform = PlatformConfig {
            fee_bps: Bps::new(vars.parse_or("PLATFORM_FEE_BPS", 250)?),
            address: vars.parse_or("PLATFORM_ADDRESS", owner)?,
        };

        let contracts = match (
            vars.parse::<Address>("CONTRACT_EVENT_REGISTRY_ADDRESS")?,
            vars.parse::<Address>("CONTRACT_TICKET_NFT_ADDRESS")?,
            vars.parse::<Address>("CONTRACT_MARKETPLACE_ADDRESS")?,
        ) {
            (Some(event_registry), Some(ticket_nft), Some(marketplace)) => Some(ContractAddresses {
                event_registry,
                ticket_nft,
                marketplace,
            }),
            _ => None,
        };

        let config = Self {
            environment: vars.parse_or("APP_ENV", AppEnvironment::Development)?,
            ledger: LedgerConfig {
                mode: vars.parse_or("LEDGER_MODE", LedgerMode::Live)?,
                provider_url: vars
                    .get("BLOCKCHAIN_PROVIDER_URL")
                    .unwrap_or_else(|| "http://localhost:8545".to_string()),
                credential: vars.get("BLOCKCHAIN_PRIVATE_KEY"),
                chain_id: vars.parse_or("CHAIN_ID", DEFAULT_CHAIN_ID)?,
                confirmations: vars.parse_or("BLOCKCHAIN_CONFIRMATIONS", 1)?,
                request_timeout: Duration::from_millis(
                    vars.parse_or("BLOCKCHAIN_REQUEST_TIMEOUT_MS", 30_000)?,
                ),
                confirmation_timeout: Duration::from_millis(
                    vars.parse_or("BLOCKCHAIN_CONFIRMATION_TIMEOUT_MS", 60_000)?,
                ),
            },
            contracts,
            retry,
            owner,
            platform,
            manifest_path: vars
                .get("DEPLOYMENT_MANIFEST_PATH")
                .map_or_else(|| PathBuf::from("deployment-addresses.json"), PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Switch to the offline ledger.
    ///
    /// # Errors
    ///
    /// [`ConfigError::OfflineInProduction`] in production.
    pub fn into_offline(mut self) -> Result<Self, ConfigError> {
        self.ledger.mode = LedgerMode::Offline;
        self.validate()?;
        Ok(self)
    }

    /// Replace the contract addresses with the manifest's when it names all three.
    #[must_use]
    pub fn with_manifest(mut self, manifest: &DeploymentManifest) -> Self {
        if let Some(contracts) = manifest.contract_addresses() {
            self.contracts = Some(contracts);
        }
        self
    }

    /// Overlay the manifest at [`Config::manifest_path`] if the file exists.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Manifest`] if the file exists but cannot be read or parsed.
    pub fn overlay_manifest_file(self) -> Result<Self, ConfigError> {
        match DeploymentManifest::read(&self.manifest_path)? {
            Some(manifest) => {
                if manifest.contract_addresses().is_none() {
                    tracing::warn!(
                        path = %self.manifest_path.display(),
                        "Deployment manifest is incomplete, using contract addresses from the environment"
                    );
                }
                Ok(self.with_manifest(&manifest))
            }
            None => Ok(self),
        }
    }

    /// Genesis for the offline ledger.
    #[must_use]
    pub fn genesis(&self) -> Genesis {
        Genesis {
            owner: self.owner,
            marketplace: self.contracts.unwrap_or(DEV_CONTRACTS).marketplace,
            platform: self.platform,
        }
    }

    /// Check values that parse individually but may be inconsistent.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Validation`] or [`ConfigError::OfflineInProduction`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.mode == LedgerMode::Offline && self.environment.is_production() {
            return Err(ConfigError::OfflineInProduction);
        }
        if self.platform.fee_bps > MAX_PLATFORM_FEE_BPS {
            return Err(ConfigError::Validation(format!(
                "PLATFORM_FEE_BPS must be at most {MAX_PLATFORM_FEE_BPS}, got {}",
                self.platform.fee_bps
            )));
        }
        if self.platform.address.is_zero() {
            return Err(ConfigError::Validation(
                "PLATFORM_ADDRESS cannot be the zero address".to_string(),
            ));
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 1.0 {
            return Err(ConfigError::Validation(
                "BLOCKCHAIN_RETRY_BACKOFF_FACTOR must be a finite number >= 1".to_string(),
            ));
        }
        if self.retry.initial_backoff > self.retry.max_backoff {
            return Err(ConfigError::Validation(
                "BLOCKCHAIN_RETRY_INITIAL_BACKOFF cannot exceed BLOCKCHAIN_RETRY_MAX_BACKOFF"
                    .to_string(),
            ));
        }
        if self.ledger.mode == LedgerMode::Live && self.ledger.provider_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "BLOCKCHAIN_PROVIDER_URL cannot be empty in live mode".to_string(),
            ));
        }
        Ok(())
    }
}

/// Variable lookup with typed parsing.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var).filter(|value| !value.trim().is_empty())
    }

    fn parse<T>(&self, var: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(var)
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|e: T::Err| ConfigError::InvalidValue {
                        var,
                        value: value.clone(),
                        reason: e.to_string(),
                    })
            })
            .transpose()
    }

    fn parse_or<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(self.parse(var)?.unwrap_or(default))
    }
}

/// Deployment manifest written by the contract deployment scripts.
///
/// ```json
/// {"contracts": {"EventRegistry": {"address": "0x…"}, "TicketNFT": {"address": "0x…"},
///   "SimpleMarketplace": {"address": "0x…"}}}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentManifest {
    #[serde(default)]
    contracts: ManifestContracts,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ManifestContracts {
    #[serde(rename = "EventRegistry")]
    event_registry: Option<ManifestEntry>,
    #[serde(rename = "TicketNFT")]
    ticket_nft: Option<ManifestEntry>,
    #[serde(rename = "SimpleMarketplace")]
    marketplace: Option<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    address: Address,
}

impl DeploymentManifest {
    /// Parse manifest JSON.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Manifest`] if the JSON is malformed.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Manifest {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Read the manifest at `path`; `Ok(None)` if there is no file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Manifest`] if the file exists but cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let manifest_error = |reason: String| ConfigError::Manifest {
            path: path.display().to_string(),
            reason,
        };
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| manifest_error(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(manifest_error(e.to_string())),
        }
    }

    /// Addresses of all three contracts, or `None` if any is missing.
    #[must_use]
    pub fn contract_addresses(&self) -> Option<ContractAddresses> {
        let contracts = &self.contracts;
        Some(ContractAddresses {
            event_registry: contracts.event_registry.as_ref()?.address,
            ticket_nft: contracts.ticket_nft.as_ref()?.address,
            marketplace: contracts.marketplace.as_ref()?.address,
        })
    }
}
