//! Soroban authorization entries and the invocation trees they authorize.

use crate::codec::{UNBOUNDED, Xdr, XdrReader, XdrWriter, invalid};
use crate::ledger::Asset;
use crate::scval::{ContractExecutable, SYMBOL_MAX, ScAddress, ScVal, validate_symbol};
use crate::XdrError;

/// Arguments of a contract function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeContractArgs {
    pub contract_address: ScAddress,
    pub function_name: String,
    pub args: Vec<ScVal>,
}

impl Xdr for InvokeContractArgs {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        let contract_address = ScAddress::read_xdr(reader)?;
        let function_name = reader.read_string(SYMBOL_MAX)?;
        validate_symbol(&function_name)?;
        Ok(InvokeContractArgs {
            contract_address,
            function_name,
            args: reader.read_array(UNBOUNDED)?,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        validate_symbol(&self.function_name)?;
        self.contract_address.write_xdr(writer)?;
        writer.write_string(&self.function_name, SYMBOL_MAX)?;
        writer.write_array(&self.args, UNBOUNDED)
    }
}

/// How a new contract's id is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractIdPreimage {
    /// From a deployer address and a 32-byte salt.
    FromAddress { address: ScAddress, salt: [u8; 32] },
    /// The Stellar Asset Contract of a classic asset.
    FromAsset(Asset),
}

impl Xdr for ContractIdPreimage {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(ContractIdPreimage::FromAddress {
                address: ScAddress::read_xdr(reader)?,
                salt: reader.read_fixed()?,
            }),
            1 => Ok(ContractIdPreimage::FromAsset(Asset::read_xdr(reader)?)),
            other => Err(invalid("ContractIDPreimageType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            ContractIdPreimage::FromAddress { address, salt } => {
                writer.write_i32(0);
                address.write_xdr(writer)?;
                writer.write_fixed(salt);
                Ok(())
            }
            ContractIdPreimage::FromAsset(asset) => {
                writer.write_i32(1);
                asset.write_xdr(writer)
            }
        }
    }
}

/// Arguments for creating a contract, optionally with constructor arguments.
///
/// `constructor_args` is `None` for the original `CreateContractArgs` shape
/// and `Some` for `CreateContractArgsV2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateContractArgs {
    pub contract_id_preimage: ContractIdPreimage,
    pub executable: ContractExecutable,
    pub constructor_args: Option<Vec<ScVal>>,
}

impl CreateContractArgs {
    pub(crate) fn read_v1(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(CreateContractArgs {
            contract_id_preimage: ContractIdPreimage::read_xdr(reader)?,
            executable: ContractExecutable::read_xdr(reader)?,
            constructor_args: None,
        })
    }

    pub(crate) fn read_v2(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(CreateContractArgs {
            contract_id_preimage: ContractIdPreimage::read_xdr(reader)?,
            executable: ContractExecutable::read_xdr(reader)?,
            constructor_args: Some(reader.read_array(UNBOUNDED)?),
        })
    }

    pub(crate) fn write_body(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        self.contract_id_preimage.write_xdr(writer)?;
        self.executable.write_xdr(writer)?;
        if let Some(args) = &self.constructor_args {
            writer.write_array(args, UNBOUNDED)?;
        }
        Ok(())
    }
}

/// The function an authorization entry grants permission for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SorobanAuthorizedFunction {
    ContractFn(InvokeContractArgs),
    CreateContract(CreateContractArgs),
}

impl Xdr for SorobanAuthorizedFunction {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(SorobanAuthorizedFunction::ContractFn(
                InvokeContractArgs::read_xdr(reader)?,
            )),
            1 => Ok(SorobanAuthorizedFunction::CreateContract(
                CreateContractArgs::read_v1(reader)?,
            )),
            2 => Ok(SorobanAuthorizedFunction::CreateContract(
                CreateContractArgs::read_v2(reader)?,
            )),
            other => Err(invalid("SorobanAuthorizedFunctionType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            SorobanAuthorizedFunction::ContractFn(args) => {
                writer.write_i32(0);
                args.write_xdr(writer)
            }
            SorobanAuthorizedFunction::CreateContract(args) => {
                writer.write_i32(if args.constructor_args.is_some() { 2 } else { 1 });
                args.write_body(writer)
            }
        }
    }
}

/// A node of an authorized call tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorobanAuthorizedInvocation {
    pub function: SorobanAuthorizedFunction,
    pub sub_invocations: Vec<SorobanAuthorizedInvocation>,
}

impl Xdr for SorobanAuthorizedInvocation {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        reader.nested(|reader| {
            Ok(SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::read_xdr(reader)?,
                sub_invocations: reader.read_array(UNBOUNDED)?,
            })
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        self.function.write_xdr(writer)?;
        writer.write_array(&self.sub_invocations, UNBOUNDED)
    }
}

/// Credentials of an entry authorized by an address other than the
/// transaction source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorobanAddressCredentials {
    pub address: ScAddress,
    pub nonce: i64,
    pub signature_expiration_ledger: u32,
    /// The signature value checked by the address's `__check_auth`, or
    /// [`ScVal::Void`] while unsigned.
    pub signature: ScVal,
}

/// Who authorizes an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SorobanCredentials {
    /// The transaction's source account; no separate signature.
    SourceAccount,
    Address(SorobanAddressCredentials),
}

impl Xdr for SorobanCredentials {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        match reader.read_i32()? {
            0 => Ok(SorobanCredentials::SourceAccount),
            1 => Ok(SorobanCredentials::Address(SorobanAddressCredentials {
                address: ScAddress::read_xdr(reader)?,
                nonce: reader.read_i64()?,
                signature_expiration_ledger: reader.read_u32()?,
                signature: ScVal::read_xdr(reader)?,
            })),
            other => Err(invalid("SorobanCredentialsType", other)),
        }
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        match self {
            SorobanCredentials::SourceAccount => {
                writer.write_i32(0);
                Ok(())
            }
            SorobanCredentials::Address(credentials) => {
                writer.write_i32(1);
                credentials.address.write_xdr(writer)?;
                writer.write_i64(credentials.nonce);
                writer.write_u32(credentials.signature_expiration_ledger);
                credentials.signature.write_xdr(writer)
            }
        }
    }
}

/// A grant of permission for one invocation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorobanAuthorizationEntry {
    pub credentials: SorobanCredentials,
    pub root_invocation: SorobanAuthorizedInvocation,
}

impl SorobanAuthorizationEntry {
    /// The address credentials, unless the entry is authorized by the
    /// transaction source.
    pub fn address_credentials(&self) -> Option<&SorobanAddressCredentials> {
        match &self.credentials {
            SorobanCredentials::Address(credentials) => Some(credentials),
            SorobanCredentials::SourceAccount => None,
        }
    }

    pub fn address_credentials_mut(&mut self) -> Option<&mut SorobanAddressCredentials> {
        match &mut self.credentials {
            SorobanCredentials::Address(credentials) => Some(credentials),
            SorobanCredentials::SourceAccount => None,
        }
    }
}

impl Xdr for SorobanAuthorizationEntry {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(SorobanAuthorizationEntry {
            credentials: SorobanCredentials::read_xdr(reader)?,
            root_invocation: SorobanAuthorizedInvocation::read_xdr(reader)?,
        })
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        self.credentials.write_xdr(writer)?;
        self.root_invocation.write_xdr(writer)
    }
}

/// A transport-encoded list of authorization entries
/// (`SorobanAuthorizationEntry<3>` as base64), as exchanged for SEP-45
/// challenges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorizationEntries(pub Vec<SorobanAuthorizationEntry>);

impl AuthorizationEntries {
    /// Maximum number of entries in the list.
    pub const MAX: u32 = 3;

    /// Decode a base64 entry list, rejecting truncated, oversized or
    /// otherwise malformed input in full.
    pub fn decode(encoded: &str) -> Result<Self, XdrError> {
        Self::from_xdr_base64(encoded)
    }

    pub fn encode(&self) -> Result<String, XdrError> {
        self.to_xdr_base64()
    }

    pub fn into_inner(self) -> Vec<SorobanAuthorizationEntry> {
        self.0
    }
}

impl Xdr for AuthorizationEntries {
    fn read_xdr(reader: &mut XdrReader<'_>) -> Result<Self, XdrError> {
        Ok(AuthorizationEntries(reader.read_array(Self::MAX)?))
    }

    fn write_xdr(&self, writer: &mut XdrWriter) -> Result<(), XdrError> {
        writer.write_array(&self.0, Self::MAX)
    }
}
