//! SEP-45 web authentication for contract accounts.
//!
//! An anchor proves a contract account is controlled by the caller by
//! handing out a `web_auth_verify` invocation, one authorization entry per
//! party: the server, the account, and optionally the wallet's client
//! domain. The wallet checks the challenge is what it claims to be, signs
//! its entries, and proves by simulation that the signed invocation only
//! touches nonces of the expected parties.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sorokey_credentials::ConditionalSync;
use sorokey_credentials::webauthn::Authenticator;
use sorokey_xdr::{
    AuthorizationEntries, Hash, HostFunction, InvokeContractArgs, LedgerKey, ScAddress, ScVal,
    SorobanAuthorizationEntry, SorobanAuthorizedFunction,
};
use tracing::{debug, info, instrument};
use url::Url;

use crate::keypair::verify_signature;
use crate::signer::authorization_payload;
use crate::wallet::{ContractAccount, with_auth};
use crate::{CoSigner, PasskeyRole, SignerRole, SmartWallet, SorobanRpc, WalletError};

const WEB_AUTH_VERIFY: &str = "web_auth_verify";

/// A SEP-45 challenge and what the wallet expects of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAuthChallenge {
    /// Base64 XDR array of at most three authorization entries.
    pub authorization_entries: String,
    /// `C…` address of the anchor's web auth contract.
    pub web_auth_contract: String,
    /// `G…` key the anchor signs its own entry with.
    pub server_signing_key: String,
    /// `G…` key of the wallet's client domain, when the anchor attributes
    /// the client.
    #[serde(default)]
    pub client_domain_signing_key: Option<String>,
    /// Key/value pairs every entry's argument map must contain, e.g.
    /// `account`, `home_domain`, `web_auth_domain`.
    #[serde(default)]
    pub expected_args: BTreeMap<String, String>,
}

impl<R, C, A> SmartWallet<R, C, A>
where
    R: SorobanRpc,
    C: CoSigner,
    A: Authenticator,
{
    /// Validate and sign a SEP-45 challenge for `account`, returning the
    /// signed entries in the challenge's encoding.
    #[instrument(skip(self, challenge, account), fields(contract = %account.contract_id))]
    pub async fn sign_web_auth_challenge(
        &self,
        challenge: &WebAuthChallenge,
        account: &ContractAccount,
    ) -> Result<String, WalletError> {
        let entries = AuthorizationEntries::decode(&challenge.authorization_entries)
            .map_err(WalletError::MalformedAuthorizationData)?
            .into_inner();
        if entries.is_empty() {
            return Err(WalletError::InvalidChallenge("no authorization entries".into()));
        }

        let web_auth_contract: ScAddress = challenge.web_auth_contract.parse()?;
        let server_key: ScAddress = challenge.server_signing_key.parse()?;
        let client_domain_key = challenge
            .client_domain_signing_key
            .as_deref()
            .map(str::parse::<ScAddress>)
            .transpose()?;

        let role = SignerRole::Passkey {
            credential_id: account.credential_id_bytes()?,
            role: PasskeyRole::Invoker,
        };
        let expiration = self
            .rpc()
            .get_latest_ledger()
            .await?
            .saturating_add(self.config().signature_validity_ledgers);
        let entry_signer = self.entry_signer();

        let mut signed = Vec::with_capacity(entries.len());
        for entry in &entries {
            validate_entry(entry, &web_auth_contract, &challenge.expected_args)?;
            let address = entry
                .address_credentials()
                .map(|credentials| &credentials.address)
                .ok_or_else(|| {
                    WalletError::InvalidChallenge("entry without address credentials".into())
                })?;

            let entry = if *address == server_key {
                verify_server_entry(entry, self.network_id())?;
                entry.clone()
            } else if matches!(address, ScAddress::Contract(_)) {
                entry_signer.sign_until(entry, &role, expiration).await?
            } else if client_domain_key.as_ref() == Some(address) {
                debug!("requesting client domain signature");
                self.cosigner()
                    .sign_authorization_entry(
                        entry,
                        expiration,
                        &self.config().network.network_passphrase,
                    )
                    .await?
            } else {
                entry.clone()
            };
            signed.push(entry);
        }

        let mut allowed = BTreeSet::from([server_key]);
        allowed.extend(client_domain_key);
        if let Some(account) = challenge.expected_args.get("account") {
            allowed.insert(account.parse()?);
        }
        self.verify_footprint(&signed, &web_auth_contract, &allowed).await?;

        info!("web auth challenge signed");
        AuthorizationEntries(signed)
            .encode()
            .map_err(WalletError::MalformedAuthorizationData)
    }

    /// Simulate `web_auth_verify` with the signed entries and check that it
    /// only writes nonces of the allowed addresses.
    async fn verify_footprint(
        &self,
        signed: &[SorobanAuthorizationEntry],
        web_auth_contract: &ScAddress,
        allowed: &BTreeSet<ScAddress>,
    ) -> Result<(), WalletError> {
        let args = match signed.first().map(|entry| &entry.root_invocation.function) {
            Some(SorobanAuthorizedFunction::ContractFn(function)) => function.args.clone(),
            _ => return Err(WalletError::InvalidChallenge("no contract invocation".into())),
        };
        let transaction = self
            .build_transaction(HostFunction::InvokeContract(InvokeContractArgs {
                contract_address: web_auth_contract.clone(),
                function_name: WEB_AUTH_VERIFY.into(),
                args,
            }))
            .await?;
        let transaction = with_auth(&transaction, signed.to_vec());

        let simulation = self.rpc().simulate_transaction(&transaction).await?;
        if let Some(error) = simulation.error {
            return Err(WalletError::Simulation(error));
        }
        let transaction_data = simulation
            .transaction_data
            .ok_or_else(|| WalletError::Simulation("no transaction data in simulation".into()))?;

        for key in &transaction_data.resources.footprint.read_write {
            match key {
                LedgerKey::ContractData { contract, key, .. } => {
                    if !allowed.contains(contract) {
                        return Err(WalletError::InvalidChallenge(format!(
                            "unauthorized contract access: {contract}"
                        )));
                    }
                    if !matches!(key, ScVal::LedgerKeyNonce(_)) {
                        return Err(WalletError::InvalidChallenge(
                            "contract data access other than a nonce".into(),
                        ));
                    }
                }
                _ => {
                    return Err(WalletError::InvalidChallenge(
                        "unexpected ledger key type in footprint".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Check the invocation an entry authorizes is the expected
/// `web_auth_verify` call.
fn validate_entry(
    entry: &SorobanAuthorizationEntry,
    web_auth_contract: &ScAddress,
    expected_args: &BTreeMap<String, String>,
) -> Result<(), WalletError> {
    let invocation = &entry.root_invocation;
    if !invocation.sub_invocations.is_empty() {
        return Err(WalletError::InvalidChallenge(
            "entry authorizes sub-invocations".into(),
        ));
    }
    let SorobanAuthorizedFunction::ContractFn(function) = &invocation.function else {
        return Err(WalletError::InvalidChallenge(
            "entry does not authorize a contract call".into(),
        ));
    };
    if function.contract_address != *web_auth_contract {
        return Err(WalletError::InvalidChallenge(format!(
            "contract is {}, expected {web_auth_contract}",
            function.contract_address
        )));
    }
    if function.function_name != WEB_AUTH_VERIFY {
        return Err(WalletError::InvalidChallenge(format!(
            "function is {}, expected {WEB_AUTH_VERIFY}",
            function.function_name
        )));
    }

    let arguments = function
        .args
        .first()
        .filter(|args| matches!(args, ScVal::Map(Some(_))))
        .ok_or_else(|| WalletError::InvalidChallenge("missing argument map".into()))?;
    for (key, expected) in expected_args {
        match arguments.map_get(key) {
            Some(ScVal::String(actual)) if actual == expected => {}
            Some(ScVal::String(actual)) => {
                return Err(WalletError::InvalidChallenge(format!(
                    "{key} is {actual:?}, expected {expected:?}"
                )));
            }
            Some(_) => {
                return Err(WalletError::InvalidChallenge(format!("{key} is not a string")));
            }
            None => {
                return Err(WalletError::InvalidChallenge(format!("missing argument {key}")));
            }
        }
    }
    Ok(())
}

/// Check the server's entry carries its valid Ed25519 signature.
fn verify_server_entry(
    entry: &SorobanAuthorizationEntry,
    network_id: &Hash,
) -> Result<(), WalletError> {
    let credentials = entry
        .address_credentials()
        .ok_or_else(|| WalletError::InvalidChallenge("server entry has no credentials".into()))?;
    let ScAddress::Account(public_key) = &credentials.address else {
        return Err(WalletError::InvalidChallenge("server key is not an account".into()));
    };
    let signature = credentials
        .signature
        .as_vec()
        .and_then(|signatures| signatures.first())
        .and_then(|signature| signature.map_get("signature"))
        .and_then(ScVal::as_bytes)
        .ok_or_else(|| WalletError::InvalidChallenge("server entry is not signed".into()))?;

    let payload = authorization_payload(
        network_id,
        credentials.nonce,
        credentials.signature_expiration_ledger,
        &entry.root_invocation,
    )?;
    if !verify_signature(public_key, &payload, signature) {
        return Err(WalletError::InvalidChallenge("server signature is invalid".into()));
    }
    Ok(())
}

/// A challenge as issued by an anchor's `GET /auth` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChallengeResponse {
    #[serde(alias = "authorizationEntries")]
    pub authorization_entries: String,
    #[serde(alias = "networkPassphrase")]
    pub network_passphrase: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// An anchor's SEP-45 endpoint.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait WebAuthServer: ConditionalSync {
    /// Request a challenge for `account`.
    async fn challenge(
        &self,
        account: &str,
        home_domain: &str,
        client_domain: Option<&str>,
    ) -> Result<ChallengeResponse, WalletError>;

    /// Exchange signed entries for a session token.
    async fn token(&self, authorization_entries: &str) -> Result<String, WalletError>;
}

/// A [`WebAuthServer`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpWebAuthServer {
    endpoint: Url,
    client: Client,
}

impl HttpWebAuthServer {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self, WalletError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|error| WalletError::Config(format!("auth endpoint: {error}")))?;

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

        Ok(Self { endpoint, client })
    }

    /// The challenge URL for `account`.
    pub fn challenge_url(
        &self,
        account: &str,
        home_domain: &str,
        client_domain: Option<&str>,
    ) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("account", account);
            query.append_pair("home_domain", home_domain);
            if let Some(client_domain) = client_domain {
                query.append_pair("client_domain", client_domain);
            }
        }
        url
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl WebAuthServer for HttpWebAuthServer {
    async fn challenge(
        &self,
        account: &str,
        home_domain: &str,
        client_domain: Option<&str>,
    ) -> Result<ChallengeResponse, WalletError> {
        let response = self
            .client
            .get(self.challenge_url(account, home_domain, client_domain))
            .send()
            .await
            .map_err(|e| WalletError::Rpc(format!("SEP-45 challenge request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(WalletError::Rpc(format!(
                "{} error getting SEP-45 challenge",
                response.status().as_u16()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| WalletError::UnexpectedResponse(format!("SEP-45 challenge: {e}")))
    }

    async fn token(&self, authorization_entries: &str) -> Result<String, WalletError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("authorization_entries", authorization_entries)])
            .send()
            .await
            .map_err(|e| WalletError::Rpc(format!("SEP-45 token request failed: {e}")))?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| WalletError::UnexpectedResponse(format!("SEP-45 token: {e}")))?;
        body.token
            .ok_or_else(|| WalletError::UnexpectedResponse("no token returned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_the_challenge_query() {
        let server = HttpWebAuthServer::new("https://anchor.example.com/sep45/auth", 30).unwrap();
        let url = server.challenge_url("CABC", "anchor.example.com", Some("wallet.example.com"));
        assert_eq!(
            url.as_str(),
            "https://anchor.example.com/sep45/auth?account=CABC&home_domain=anchor.example.com&client_domain=wallet.example.com"
        );
        let url = server.challenge_url("CABC", "anchor.example.com", None);
        assert_eq!(url.query(), Some("account=CABC&home_domain=anchor.example.com"));
    }

    #[test]
    fn it_reads_the_challenge_response() {
        let response: ChallengeResponse = serde_json::from_str(
            r#"{"authorization_entries":"AAAA","network_passphrase":"Test SDF Network ; September 2015"}"#,
        )
        .unwrap();
        assert_eq!(response.authorization_entries, "AAAA");
        assert_eq!(response.network_passphrase, "Test SDF Network ; September 2015");
    }
}
