//! JSON-RPC client for a Soroban RPC server.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sorokey_xdr::{
    AccountId, AccountSummary, LedgerKey, ScVal, SorobanAuthorizationEntry, SorobanTransactionData,
    Transaction, TransactionEnvelope, Xdr,
};
use url::Url;

use super::{
    SendResult, SendStatus, SimulationResult, SorobanRpc, TransactionInfo, TransactionStatus,
};
use crate::{WalletConfig, WalletError};

#[derive(Serialize)]
struct Request<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSimulation {
    transaction_data: Option<String>,
    min_resource_fee: Option<String>,
    results: Option<Vec<RawHostFunctionResult>>,
    latest_ledger: u32,
    error: Option<String>,
}

#[derive(Deserialize)]
struct RawHostFunctionResult {
    #[serde(default)]
    auth: Vec<String>,
    xdr: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSend {
    hash: String,
    status: String,
    error_result_xdr: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    status: String,
    ledger: Option<u32>,
    result_xdr: Option<String>,
    return_value: Option<String>,
}

#[derive(Deserialize)]
struct RawLatestLedger {
    sequence: u32,
}

#[derive(Deserialize)]
struct RawLedgerEntries {
    entries: Option<Vec<RawLedgerEntry>>,
}

#[derive(Deserialize)]
struct RawLedgerEntry {
    xdr: String,
}

/// A [`SorobanRpc`] over HTTP.
///
/// ```no_run
/// use sorokey_wallet::{HttpRpcClient, SorobanRpc};
///
/// # async fn example() -> Result<(), sorokey_wallet::WalletError> {
/// let rpc = HttpRpcClient::new("https://soroban-testnet.stellar.org", 30)?;
/// let ledger = rpc.get_latest_ledger().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpRpcClient {
    url: Url,
    client: Client,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(rpc_url: &str, timeout_seconds: u64) -> Result<Self, WalletError> {
        let url = Url::parse(rpc_url).map_err(|error| WalletError::Config(error.to_string()))?;

        #[cfg(not(target_arch = "wasm32"))]
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|error| WalletError::Rpc(error.to_string()))?;

        #[cfg(target_arch = "wasm32")]
        let client = {
            let _ = timeout_seconds;
            Client::new()
        };

        Ok(Self {
            url,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, WalletError> {
        Self::new(&config.network.rpc_url, config.request_timeout)
    }

    async fn call<P, T>(&self, method: &str, params: P) -> Result<T, WalletError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| WalletError::Rpc(format!("{method}: HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WalletError::Rpc(format!(
                "{method}: HTTP {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body: Response<T> = response
            .json()
            .await
            .map_err(|e| WalletError::UnexpectedResponse(format!("{method}: {e}")))?;

        match (body.result, body.error) {
            (_, Some(error)) => Err(WalletError::Rpc(format!(
                "{method}: {} ({})",
                error.message, error.code
            ))),
            (Some(result), None) => Ok(result),
            (None, None) => Err(WalletError::UnexpectedResponse(format!(
                "{method}: neither result nor error"
            ))),
        }
    }
}

fn envelope_base64(transaction: &Transaction) -> Result<String, WalletError> {
    Ok(TransactionEnvelope::new(transaction.clone()).to_xdr_base64()?)
}

fn simulation_from_raw(raw: RawSimulation) -> Result<SimulationResult, WalletError> {
    if let Some(error) = raw.error {
        return Ok(SimulationResult {
            latest_ledger: raw.latest_ledger,
            error: Some(error),
            ..Default::default()
        });
    }

    let result = raw.results.and_then(|results| results.into_iter().next());
    let (auth, return_value) = match result {
        Some(result) => (
            result
                .auth
                .iter()
                .map(|entry| SorobanAuthorizationEntry::from_xdr_base64(entry))
                .collect::<Result<Vec<_>, _>>()?,
            result
                .xdr
                .as_deref()
                .map(ScVal::from_xdr_base64)
                .transpose()?,
        ),
        None => (Vec::new(), None),
    };

    Ok(SimulationResult {
        auth,
        min_resource_fee: raw.min_resource_fee.unwrap_or_default(),
        transaction_data: raw
            .transaction_data
            .as_deref()
            .map(SorobanTransactionData::from_xdr_base64)
            .transpose()?,
        latest_ledger: raw.latest_ledger,
        return_value,
        error: None,
    })
}

fn send_from_raw(raw: RawSend) -> Result<SendResult, WalletError> {
    let status = match raw.status.as_str() {
        "PENDING" => SendStatus::Pending,
        "DUPLICATE" => SendStatus::Duplicate,
        "TRY_AGAIN_LATER" => SendStatus::TryAgainLater,
        "ERROR" => SendStatus::Error,
        other => {
            return Err(WalletError::UnexpectedResponse(format!(
                "unknown send status {other:?}"
            )));
        }
    };
    Ok(SendResult {
        hash: raw.hash,
        status,
        error_result_xdr: raw.error_result_xdr,
    })
}

fn transaction_from_raw(hash: &str, raw: RawTransaction) -> Result<TransactionInfo, WalletError> {
    let status = match raw.status.as_str() {
        "SUCCESS" => TransactionStatus::Success,
        "FAILED" => TransactionStatus::Failed,
        "NOT_FOUND" => TransactionStatus::NotFound,
        other => {
            return Err(WalletError::UnexpectedResponse(format!(
                "unknown transaction status {other:?}"
            )));
        }
    };
    Ok(TransactionInfo {
        hash: hash.to_string(),
        status,
        ledger: raw.ledger,
        return_value: raw
            .return_value
            .as_deref()
            .map(ScVal::from_xdr_base64)
            .transpose()?,
        result_xdr: raw.result_xdr,
    })
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl SorobanRpc for HttpRpcClient {
    async fn simulate_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<SimulationResult, WalletError> {
        let params = json!({ "transaction": envelope_base64(transaction)? });
        simulation_from_raw(self.call("simulateTransaction", params).await?)
    }

    async fn send_transaction(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<SendResult, WalletError> {
        let params = json!({ "transaction": envelope.to_xdr_base64()? });
        send_from_raw(self.call("sendTransaction", params).await?)
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionInfo, WalletError> {
        let raw = self.call("getTransaction", json!({ "hash": hash })).await?;
        transaction_from_raw(hash, raw)
    }

    async fn get_latest_ledger(&self) -> Result<u32, WalletError> {
        let raw: RawLatestLedger = self.call("getLatestLedger", json!({})).await?;
        Ok(raw.sequence)
    }

    async fn get_account_sequence(&self, address: &str) -> Result<i64, WalletError> {
        let key = LedgerKey::Account {
            account_id: AccountId::from_strkey(address)?,
        };
        let raw: RawLedgerEntries = self
            .call("getLedgerEntries", json!({ "keys": [key.to_xdr_base64()?] }))
            .await?;
        let entry = raw
            .entries
            .and_then(|entries| entries.into_iter().next())
            .ok_or_else(|| WalletError::Rpc(format!("account {address} not found")))?;
        Ok(AccountSummary::from_ledger_entry_data(&entry.xdr)?.sequence)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sorokey_xdr::{
        InvokeContractArgs, LedgerFootprint, ScAddress, SorobanAddressCredentials,
        SorobanAuthorizedFunction, SorobanAuthorizedInvocation, SorobanCredentials,
        SorobanResources,
    };

    use super::*;

    fn entry() -> SorobanAuthorizationEntry {
        SorobanAuthorizationEntry {
            credentials: SorobanCredentials::Address(SorobanAddressCredentials {
                address: ScAddress::Contract([3; 32]),
                nonce: 42,
                signature_expiration_ledger: 0,
                signature: ScVal::Void,
            }),
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(InvokeContractArgs {
                    contract_address: ScAddress::Contract([4; 32]),
                    function_name: "transfer".into(),
                    args: vec![ScVal::I128(10)],
                }),
                sub_invocations: vec![],
            },
        }
    }

    fn transaction_data() -> SorobanTransactionData {
        SorobanTransactionData {
            archived_entries: None,
            resources: SorobanResources {
                footprint: LedgerFootprint {
                    read_only: vec![],
                    read_write: vec![],
                },
                instructions: 1_000,
                disk_read_bytes: 200,
                write_bytes: 100,
            },
            resource_fee: 1_500,
        }
    }

    #[test]
    fn it_reads_a_successful_simulation() {
        let raw: RawSimulation = serde_json::from_value(json!({
            "transactionData": transaction_data().to_xdr_base64().unwrap(),
            "minResourceFee": "1500",
            "results": [{
                "auth": [entry().to_xdr_base64().unwrap()],
                "xdr": ScVal::U32(7).to_xdr_base64().unwrap()
            }],
            "latestLedger": 1234
        }))
        .unwrap();

        let simulation = simulation_from_raw(raw).unwrap();
        assert_eq!(simulation.auth, vec![entry()]);
        assert_eq!(simulation.resource_fee(), 1500);
        assert_eq!(simulation.transaction_data, Some(transaction_data()));
        assert_eq!(simulation.latest_ledger, 1234);
        assert_eq!(simulation.return_value, Some(ScVal::U32(7)));
        assert!(simulation.is_success());
    }

    #[test]
    fn it_keeps_the_simulation_diagnostic() {
        let raw: RawSimulation = serde_json::from_value(json!({
            "error": "HostError: Error(Contract, #10)",
            "latestLedger": 99
        }))
        .unwrap();
        let simulation = simulation_from_raw(raw).unwrap();
        assert_eq!(
            simulation.error.as_deref(),
            Some("HostError: Error(Contract, #10)")
        );
    }

    #[test]
    fn it_rejects_malformed_auth_entries() {
        let raw: RawSimulation = serde_json::from_value(json!({
            "transactionData": transaction_data().to_xdr_base64().unwrap(),
            "minResourceFee": "1",
            "results": [{ "auth": ["AAAA"] }],
            "latestLedger": 1
        }))
        .unwrap();
        assert!(matches!(simulation_from_raw(raw), Err(WalletError::Xdr(_))));
    }

    #[test]
    fn it_maps_send_and_transaction_statuses() {
        let sent = send_from_raw(RawSend {
            hash: "ab".into(),
            status: "TRY_AGAIN_LATER".into(),
            error_result_xdr: None,
        })
        .unwrap();
        assert_eq!(sent.status, SendStatus::TryAgainLater);

        let info = transaction_from_raw(
            "ab",
            RawTransaction {
                status: "NOT_FOUND".into(),
                ledger: None,
                result_xdr: None,
                return_value: None,
            },
        )
        .unwrap();
        assert_eq!(info.status, TransactionStatus::NotFound);

        assert!(matches!(
            send_from_raw(RawSend {
                hash: "ab".into(),
                status: "LOST".into(),
                error_result_xdr: None,
            }),
            Err(WalletError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn it_rejects_an_invalid_url() {
        assert!(matches!(
            HttpRpcClient::new("not a url", 30),
            Err(WalletError::Config(_))
        ));
    }
}
