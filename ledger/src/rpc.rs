//! JSON-RPC 2.0 ledger client.
//!
//! Speaks to a ledger gateway that signs and relays calls on behalf of the
//! configured credential. Every request is a POST of a JSON-RPC envelope; a rejection
//! by the settlement rules comes back as an error object whose `data` is the tagged
//! [`MarketError`].

use crate::{
    ContractAddresses, LedgerClient, LedgerError, LedgerFuture, PendingTransaction, Receipt,
    Submission,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use ticketchain_core::settlement::{Contract, LedgerQuery, QueryResponse};
use ticketchain_core::{Address, MarketError, OperationId, TxHash};
use tokio::time::Instant;

/// Connection settings for [`RpcLedger`].
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// Signing credential; without one the client is read-only
    pub credential: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Delay between receipt polls
    pub poll_interval: Duration,
    /// How long to wait for confirmations before giving up
    pub confirmation_timeout: Duration,
    /// Contract addresses; when absent the gateway routes by contract name
    pub contracts: Option<ContractAddresses>,
}

impl RpcConfig {
    /// Settings with default timeouts.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential,
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            confirmation_timeout: Duration::from_secs(60),
            contracts: None,
        }
    }

    /// Route calls to explicit contract addresses
    #[must_use]
    pub const fn with_contracts(mut self, contracts: ContractAddresses) -> Self {
        self.contracts = Some(contracts);
        self
    }

    /// Set the receipt poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the confirmation timeout
    #[must_use]
    pub const fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcErrorObject {
    fn into_ledger_error(self) -> LedgerError {
        if let Some(reason) = self
            .data
            .and_then(|data| serde_json::from_value::<MarketError>(data).ok())
        {
            return LedgerError::Reverted(reason);
        }
        LedgerError::classify_rpc(self.code, &self.message)
    }
}

/// Second `ticketchain_sendCall` parameter: where the call goes.
#[derive(Serialize)]
struct Route {
    contract: Contract,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<Address>,
}

#[derive(Deserialize)]
struct SentCall {
    tx_hash: TxHash,
}

#[derive(Deserialize)]
struct ReceiptEnvelope {
    receipt: Receipt,
    confirmations: u32,
}

/// [`LedgerClient`] over JSON-RPC.
pub struct RpcLedger {
    client: Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcLedger {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Network`] if the HTTP client cannot be constructed.
    pub fn new(config: RpcConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LedgerError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    /// Whether a signing credential is configured.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.config.credential.is_none()
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<R, LedgerError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method, id, endpoint = %self.config.endpoint, "JSON-RPC request");

        let mut request = self.client.post(&self.config.endpoint).json(&RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        });
        if let Some(credential) = &self.config.credential {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await.map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::TOO_MANY_REQUESTS => {
                let body = response.text().await.unwrap_or_default();
                return Err(LedgerError::RateLimited(body));
            }
            status if status.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                return Err(LedgerError::Server {
                    status: status.as_u16(),
                    message: body,
                });
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(LedgerError::InvalidResponse(format!(
                    "HTTP {}: {body}",
                    status.as_u16()
                )));
            }
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(error.into_ledger_error());
        }

        serde_json::from_value(envelope.result)
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))
    }
}

fn transport_error(error: reqwest::Error) -> LedgerError {
    if error.is_timeout() {
        LedgerError::Timeout(error.to_string())
    } else {
        LedgerError::Network(error.to_string())
    }
}

fn parse_quantity(raw: &str) -> Result<u64, LedgerError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::InvalidResponse(format!("chain id {raw:?}: {e}")))
}

impl LedgerClient for RpcLedger {
    fn chain_id(&self) -> LedgerFuture<'_, u64> {
        Box::pin(async move {
            let raw: String = self.call("eth_chainId", [(); 0]).await?;
            parse_quantity(&raw)
        })
    }

    fn submit<'a>(&'a self, submission: &'a Submission) -> LedgerFuture<'a, PendingTransaction> {
        Box::pin(async move {
            if self.is_read_only() {
                return Err(LedgerError::ReadOnly);
            }
            let contract = submission.call.target();
            let route = Route {
                contract,
                to: self
                    .config
                    .contracts
                    .map(|contracts| contracts.address_of(contract)),
            };
            let sent: SentCall = self
                .call("ticketchain_sendCall", (submission, route))
                .await?;
            tracing::info!(
                operation_id = %submission.operation_id,
                method = submission.call.name(),
                tx_hash = %sent.tx_hash,
                "Call submitted"
            );
            Ok(PendingTransaction {
                tx_hash: sent.tx_hash,
                operation_id: submission.operation_id,
            })
        })
    }

    fn wait_for_confirmations<'a>(
        &'a self,
        tx_hash: &'a TxHash,
        confirmations: u32,
    ) -> LedgerFuture<'a, Receipt> {
        Box::pin(async move {
            let deadline = Instant::now() + self.config.confirmation_timeout;
            loop {
                let found: Option<ReceiptEnvelope> = self
                    .call("ticketchain_getReceipt", [tx_hash])
                    .await
                    .map_err(|error| match error {
                        LedgerError::Rpc { message, .. }
                            if message.to_ascii_lowercase().contains("unknown transaction") =>
                        {
                            LedgerError::UnknownTransaction(*tx_hash)
                        }
                        other => other,
                    })?;

                if let Some(envelope) = found {
                    if envelope.confirmations >= confirmations {
                        return Ok(envelope.receipt);
                    }
                }

                if Instant::now() >= deadline {
                    return Err(LedgerError::Timeout(format!(
                        "transaction {tx_hash} not confirmed within {:?}",
                        self.config.confirmation_timeout
                    )));
                }
                tokio::time::sleep(self.config.poll_interval).await;
            }
        })
    }

    fn find_receipt(&self, operation_id: OperationId) -> LedgerFuture<'_, Option<Receipt>> {
        Box::pin(async move {
            self.call("ticketchain_getReceiptByOperation", [operation_id])
                .await
        })
    }

    fn query<'a>(&'a self, query: &'a LedgerQuery) -> LedgerFuture<'a, QueryResponse> {
        Box::pin(async move { self.call("ticketchain_query", [query]).await })
    }
}
