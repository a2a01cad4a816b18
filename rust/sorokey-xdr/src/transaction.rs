//! Transactions, operations and envelopes.

use sha2::{Digest, Sha256};

use crate::XdrError;
use crate::auth::{CreateContractArgs, InvokeContractArgs, SorobanAuthorizationEntry};
use crate::codec::{UNBOUNDED, Xdr, XdrReader, XdrWriter, invalid};
use crate::ledger::{AccountId, SorobanTransactionData};
use crate::scval::Hash;

/// `ENVELOPE_TYPE_TX`, the only envelope kind this crate builds.
const ENVELOPE_TYPE_TX: i32 = 2;

/// Maximum operations in one transaction.
pub const MAX_OPS_PER_TX: u32 = 100;

/// A transaction source: an account, optionally multiplexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxedAccount {
    Ed25519([u8; 32]),
    Muxed { id: u64, ed25519: [u8; 32] },
}

impl From<AccountId> for MuxedAccount {
    fn from(account: AccountId) -> Self {
        MuxedAccount::Ed25519(account.0)
    }
}

impl Xdr for MuxedAccount {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(MuxedAccount::Ed25519(reader.read_fixed()?)),
            0x100 => Ok(MuxedAccount::Muxed {
                id: reader.read_u64()?,
                ed25519: reader.read_fixed()?,
            }),
            other => Err(invalid("CryptoKeyType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            MuxedAccount::Ed25519(key) => {
                writer.write_i32(0);
                writer.write_fixed(key);
            }
            MuxedAccount::Muxed { id, ed25519 } => {
                writer.write_i32(0x100);
                writer.write_u64(*id);
                writer.write_fixed(ed25519);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBounds {
    pub min_time: u64,
    /// Zero means no upper bound.
    pub max_time: u64,
}

impl Xdr for TimeBounds {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(TimeBounds {
            min_time: reader.read_u64()?,
            max_time: reader.read_u64()?,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_u64(self.min_time);
        writer.write_u64(self.max_time);
        Ok(())
    }
}

/// Validity conditions of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Preconditions {
    #[default]
    None,
    Time(TimeBounds),
}

impl Xdr for Preconditions {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(Preconditions::None),
            1 => Ok(Preconditions::Time(TimeBounds::read_xdr(reader)?)),
            other => Err(invalid("PreconditionType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            Preconditions::None => writer.write_i32(0),
            Preconditions::Time(bounds) => {
                writer.write_i32(1);
                bounds.write_xdr(writer)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Memo {
    #[default]
    None,
    /// At most 28 bytes.
    Text(String),
    Id(u64),
    Hash(Hash),
    Return(Hash),
}

impl Xdr for Memo {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(Memo::None),
            1 => Ok(Memo::Text(reader.read_string(28)?)),
            2 => Ok(Memo::Id(reader.read_u64()?)),
            3 => Ok(Memo::Hash(reader.read_fixed()?)),
            4 => Ok(Memo::Return(reader.read_fixed()?)),
            other => Err(invalid("MemoType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            Memo::None => writer.write_i32(0),
            Memo::Text(text) => {
                writer.write_i32(1);
                writer.write_string(text, 28)?;
            }
            Memo::Id(id) => {
                writer.write_i32(2);
                writer.write_u64(*id);
            }
            Memo::Hash(hash) => {
                writer.write_i32(3);
                writer.write_fixed(hash);
            }
            Memo::Return(hash) => {
                writer.write_i32(4);
                writer.write_fixed(hash);
            }
        }
        Ok(())
    }
}

/// The host function a Soroban operation executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostFunction {
    InvokeContract(InvokeContractArgs),
    /// `CreateContract` when `constructor_args` is `None`, else
    /// `CreateContractV2`.
    CreateContract(CreateContractArgs),
    UploadContractWasm(Vec<u8>),
}

impl Xdr for HostFunction {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(HostFunction::InvokeContract(InvokeContractArgs::read_xdr(
                reader,
            )?)),
            1 => Ok(HostFunction::CreateContract(CreateContractArgs::read_v1(
                reader,
            )?)),
            2 => Ok(HostFunction::UploadContractWasm(
                reader.read_opaque(UNBOUNDED)?,
            )),
            3 => Ok(HostFunction::CreateContract(CreateContractArgs::read_v2(
                reader,
            )?)),
            other => Err(invalid("HostFunctionType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            HostFunction::InvokeContract(args) => {
                writer.write_i32(0);
                args.write_xdr(writer)
            }
            HostFunction::CreateContract(args) => {
                writer.write_i32(if args.constructor_args.is_some() { 3 } else { 1 });
                args.write_body(writer)
            }
            HostFunction::UploadContractWasm(wasm) => {
                writer.write_i32(2);
                writer.write_opaque(wasm, UNBOUNDED)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeHostFunctionOp {
    pub host_function: HostFunction,
    pub auth: Vec<SorobanAuthorizationEntry>,
}

/// The operation kinds this crate decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationBody {
    InvokeHostFunction(InvokeHostFunctionOp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub source_account: Option<MuxedAccount>,
    pub body: OperationBody,
}

impl Xdr for Operation {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let source_account = reader.read_option()?;
        let body = match reader.read_i32()? {
            24 => OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::read_xdr(reader)?,
                auth: reader.read_array(UNBOUNDED)?,
            }),
            other => return Err(invalid("OperationType", other)),
        };
        Ok(Operation {
            source_account,
            body,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_option(self.source_account.as_ref())?;
        match &self.body {
            OperationBody::InvokeHostFunction(op) => {
                writer.write_i32(24);
                op.host_function.write_xdr(writer)?;
                writer.write_array(&op.auth, UNBOUNDED)?;
            }
        }
        Ok(())
    }
}

/// A version-1 transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub source_account: MuxedAccount,
    /// Total fee in stroops, including the Soroban resource fee.
    pub fee: u32,
    pub seq_num: i64,
    pub cond: Preconditions,
    pub memo: Memo,
    pub operations: Vec<Operation>,
    /// Soroban resources, attached after simulation.
    pub soroban_data: Option<SorobanTransactionData>,
}

impl Transaction {
    /// The single host-function invocation of a Soroban transaction.
    pub fn invoke_host_function(&self) -> Option<&InvokeHostFunctionOp> {
        match self.operations.as_slice() {
            [
                Operation {
                    body: OperationBody::InvokeHostFunction(op),
                    ..
                },
            ] => Some(op),
            _ => None,
        }
    }

    /// The bytes signed by transaction signers:
    /// `SHA-256(networkId || ENVELOPE_TYPE_TX || tx)`.
    pub fn hash(&self, network_id: &Hash) -> Result<Hash, XdrError> {
        let mut writer = XdrWriter::new();
        writer.write_fixed(network_id);
        writer.write_i32(ENVELOPE_TYPE_TX);
        self.write_xdr(&mut writer)?;
        Ok(Sha256::digest(writer.finish()).into())
    }
}

impl Xdr for Transaction {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(Transaction {
            source_account: MuxedAccount::read_xdr(reader)?,
            fee: reader.read_u32()?,
            seq_num: reader.read_i64()?,
            cond: Preconditions::read_xdr(reader)?,
            memo: Memo::read_xdr(reader)?,
            operations: reader.read_array(MAX_OPS_PER_TX)?,
            soroban_data: match reader.read_i32()? {
                0 => None,
                1 => Some(SorobanTransactionData::read_xdr(reader)?),
                other => return Err(invalid("TransactionExt", other)),
            },
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        self.source_account.write_xdr(writer)?;
        writer.write_u32(self.fee);
        writer.write_i64(self.seq_num);
        self.cond.write_xdr(writer)?;
        self.memo.write_xdr(writer)?;
        writer.write_array(&self.operations, MAX_OPS_PER_TX)?;
        match &self.soroban_data {
            None => writer.write_i32(0),
            Some(data) => {
                writer.write_i32(1);
                data.write_xdr(writer)?;
            }
        }
        Ok(())
    }
}

/// A signature with the last four bytes of the signer's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: Vec<u8>,
}

impl Xdr for DecoratedSignature {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(DecoratedSignature {
            hint: reader.read_fixed()?,
            signature: reader.read_opaque(64)?,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_fixed(&self.hint);
        writer.write_opaque(&self.signature, 64)
    }
}

/// A version-1 transaction envelope: a transaction and its signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    pub tx: Transaction,
    pub signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    /// Wrap an unsigned transaction.
    pub fn new(tx: Transaction) -> Self {
        TransactionEnvelope {
            tx,
            signatures: Vec::new(),
        }
    }
}

impl Xdr for TransactionEnvelope {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            ENVELOPE_TYPE_TX => Ok(TransactionEnvelope {
                tx: Transaction::read_xdr(reader)?,
                signatures: reader.read_array(20)?,
            }),
            other => Err(invalid("EnvelopeType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_i32(ENVELOPE_TYPE_TX);
        self.tx.write_xdr(writer)?;
        writer.write_array(&self.signatures, 20)
    }
}
