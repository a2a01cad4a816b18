//! The wallet's use cases: deploying a passkey contract, reconnecting to
//! one, and transferring tokens.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use sorokey_credentials::webauthn::{
    AssertionRequest, Authenticator, PasskeyCredential, RegistrationOptions,
};
use sorokey_xdr::{
    AccountId, ContractExecutable, CreateContractArgs, Hash, HostFunction, InvokeContractArgs,
    InvokeHostFunctionOp, Memo, Operation, OperationBody, Preconditions, ScAddress, ScVal,
    SorobanAuthorizationEntry, StrKey, TimeBounds, Transaction, TransactionEnvelope, network_id,
};
use tracing::{debug, info, instrument, warn};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::address::{contract_id_preimage, derive_contract_address};
use crate::{
    CoSigner, EntrySigner, SendStatus, SignerRole, SorobanRpc, TransactionInfo, WalletConfig,
    WalletError, assemble, poll_transaction,
};

/// A passkey contract account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractAccount {
    /// The `C…` contract address.
    pub contract_id: String,
    /// The passkey credential id, unpadded base64url.
    pub credential_id: String,
}

impl ContractAccount {
    /// The role that signs for this contract with its passkey.
    pub fn signer(&self) -> Result<SignerRole, WalletError> {
        Ok(SignerRole::passkey(self.credential_id_bytes()?))
    }

    pub fn credential_id_bytes(&self) -> Result<Vec<u8>, WalletError> {
        URL_SAFE_NO_PAD
            .decode(&self.credential_id)
            .map_err(|error| WalletError::Config(format!("credential_id: {error}")))
    }
}

/// A passkey smart wallet.
///
/// The wallet owns its configuration and its three collaborators: a Soroban
/// RPC server, the co-signer holding the fee account key, and a WebAuthn
/// authenticator. Nothing in it is mutated after construction, so one
/// wallet can serve concurrent operations.
pub struct SmartWallet<R, C, A> {
    config: WalletConfig,
    rpc: R,
    cosigner: C,
    authenticator: A,
    network_id: Hash,
}

impl<R, C, A> SmartWallet<R, C, A>
where
    R: SorobanRpc,
    C: CoSigner,
    A: Authenticator,
{
    pub fn new(
        config: WalletConfig,
        rpc: R,
        cosigner: C,
        authenticator: A,
    ) -> Result<Self, WalletError> {
        config.validate()?;
        let network_id = network_id(&config.network.network_passphrase);
        Ok(Self {
            config,
            rpc,
            cosigner,
            authenticator,
            network_id,
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn cosigner(&self) -> &C {
        &self.cosigner
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    pub fn network_id(&self) -> &Hash {
        &self.network_id
    }

    /// An authorization entry signer bound to this wallet's network.
    pub fn entry_signer(&self) -> EntrySigner<'_, R, A> {
        EntrySigner::new(
            &self.rpc,
            &self.authenticator,
            &self.config.network.network_passphrase,
            self.config.rp_id.clone(),
            self.config.signature_validity_ledgers,
        )
    }

    /// Register a passkey named `name` and deploy a contract account for it.
    #[instrument(skip(self))]
    pub async fn create_contract(&self, name: &str) -> Result<ContractAccount, WalletError> {
        let options = RegistrationOptions::named(&self.config.rp_id, &self.config.rp_name, name);
        let response = self.authenticator.register(&options).await?;
        let credential = PasskeyCredential::from_registration(&response)?;
        debug!(
            credential_id = %credential.credential_id_base64url(),
            "passkey registered"
        );

        let deployer = AccountId::from_strkey(&self.config.source_account)?;
        let host_function = HostFunction::CreateContract(CreateContractArgs {
            contract_id_preimage: contract_id_preimage(&deployer, &credential.credential_id),
            executable: ContractExecutable::Wasm(self.config.wasm_hash_bytes()?),
            constructor_args: Some(vec![
                ScVal::Bytes(credential.credential_id.clone()),
                ScVal::Bytes(credential.public_key.to_vec()),
            ]),
        });

        let transaction = self.build_transaction(host_function).await?;
        let simulation = self.rpc.simulate_transaction(&transaction).await?;
        let transaction = assemble(&transaction, &simulation)?;
        debug!(fee = transaction.fee, "deployment assembled");

        let result = self.submit(transaction).await?;
        let contract_id = match result.return_value.as_ref().and_then(ScVal::as_address) {
            Some(ScAddress::Contract(id)) => StrKey::Contract(*id).to_string(),
            _ => derive_contract_address(
                &self.config.network.network_passphrase,
                &self.config.source_account,
                &credential.credential_id,
            )?,
        };

        info!(%contract_id, "contract deployed");
        Ok(ContractAccount {
            contract_id,
            credential_id: credential.credential_id_base64url(),
        })
    }

    /// Find the contract account of a passkey the user already has.
    ///
    /// The user picks any passkey for the relying party. Its contract
    /// address is derived, not looked up, so an account that was never
    /// deployed still yields an address.
    #[instrument(skip(self))]
    pub async fn connect_contract(&self) -> Result<ContractAccount, WalletError> {
        let mut challenge = [0u8; 32];
        OsRng.fill_bytes(&mut challenge);

        let assertion = self
            .authenticator
            .assert(&AssertionRequest {
                challenge: challenge.to_vec(),
                rp_id: self.config.rp_id.clone(),
                allow_credentials: vec![],
            })
            .await?;

        let contract_id = derive_contract_address(
            &self.config.network.network_passphrase,
            &self.config.source_account,
            &assertion.credential_id,
        )?;

        info!(%contract_id, "contract connected");
        Ok(ContractAccount {
            contract_id,
            credential_id: URL_SAFE_NO_PAD.encode(&assertion.credential_id),
        })
    }

    /// Transfer `amount` stroops of the token at `asset_contract` from
    /// `from` to `to`, authorized by `signer`.
    ///
    /// The invocation is simulated twice: once to learn which entries need
    /// signing, and again after signing, because a contract account's
    /// `__check_auth` changes the measured resources.
    #[instrument(skip(self, signer))]
    pub async fn transfer(
        &self,
        asset_contract: &str,
        from: &str,
        to: &str,
        amount: i128,
        signer: &SignerRole,
    ) -> Result<TransactionInfo, WalletError> {
        let host_function = HostFunction::InvokeContract(InvokeContractArgs {
            contract_address: asset_contract.parse()?,
            function_name: "transfer".into(),
            args: vec![
                ScVal::Address(from.parse()?),
                ScVal::Address(to.parse()?),
                ScVal::I128(amount),
            ],
        });

        let transaction = self.build_transaction(host_function).await?;
        let simulation = self.rpc.simulate_transaction(&transaction).await?;
        if let Some(error) = simulation.error {
            return Err(WalletError::Simulation(error));
        }
        debug!(entries = simulation.auth.len(), "transfer simulated");

        let expiration = simulation
            .latest_ledger
            .saturating_add(self.config.signature_validity_ledgers);
        let entry_signer = self.entry_signer();
        let mut auth = Vec::with_capacity(simulation.auth.len());
        for entry in &simulation.auth {
            auth.push(entry_signer.sign_until(entry, signer, expiration).await?);
        }

        let signed = with_auth(&transaction, auth);
        let first_pass = assemble(&signed, &simulation)?;
        debug!(fee = first_pass.fee, "first pass assembled");

        let simulation = self.rpc.simulate_transaction(&first_pass).await?;
        let second_pass = assemble(&first_pass, &simulation)?;
        debug!(fee = second_pass.fee, "second pass assembled");

        let result = self.submit(second_pass).await?;
        info!(hash = %result.hash, "transfer confirmed");
        Ok(result)
    }

    /// A transaction from the fee account invoking `host_function`, valid
    /// for `transaction_timeout` seconds.
    pub(crate) async fn build_transaction(
        &self,
        host_function: HostFunction,
    ) -> Result<Transaction, WalletError> {
        let source = AccountId::from_strkey(&self.config.source_account)?;
        let sequence = self
            .rpc
            .get_account_sequence(&self.config.source_account)
            .await?;
        let seq_num = sequence
            .checked_add(1)
            .ok_or_else(|| WalletError::UnexpectedResponse("account sequence overflow".into()))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        Ok(Transaction {
            source_account: source.into(),
            fee: self.config.max_fee,
            seq_num,
            cond: Preconditions::Time(TimeBounds {
                min_time: 0,
                max_time: now.saturating_add(self.config.transaction_timeout),
            }),
            memo: Memo::None,
            operations: vec![Operation {
                source_account: None,
                body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                    host_function,
                    auth: vec![],
                }),
            }],
            soroban_data: None,
        })
    }

    /// Have the co-signer add the fee account signature, submit, and wait
    /// for the outcome.
    async fn submit(&self, transaction: Transaction) -> Result<TransactionInfo, WalletError> {
        let envelope = TransactionEnvelope::new(transaction);
        let signed = self
            .cosigner
            .sign_transaction(&envelope, &self.config.network.network_passphrase)
            .await?;
        if signed.tx != envelope.tx {
            return Err(WalletError::CoSigner(
                "signed transaction differs from the one sent".into(),
            ));
        }

        let sent = self.rpc.send_transaction(&signed).await?;
        if sent.status != SendStatus::Pending {
            return Err(WalletError::Submission {
                status: sent.status.as_str().to_string(),
                error_result_xdr: sent.error_result_xdr,
            });
        }
        debug!(hash = %sent.hash, "transaction submitted");

        poll_transaction(&self.rpc, &sent.hash, &self.config.poll)
            .await
            .inspect_err(|error| {
                if error.is_timeout() {
                    warn!(hash = %sent.hash, "transaction outcome unknown");
                }
            })
    }
}

/// `transaction` with the authorization entries of its invocation replaced.
pub(crate) fn with_auth(transaction: &Transaction, auth: Vec<SorobanAuthorizationEntry>) -> Transaction {
    let mut transaction = transaction.clone();
    if let [
        Operation {
            body: OperationBody::InvokeHostFunction(op),
            ..
        },
    ] = transaction.operations.as_mut_slice()
    {
        op.auth = auth;
    }
    transaction
}
