//! Attaching simulation results to a transaction.

use sorokey_xdr::{InvokeHostFunctionOp, Operation, OperationBody, Transaction};

use crate::{SimulationResult, WalletError};

/// Build a submittable transaction from `transaction` and its simulation.
///
/// The fee becomes the classic fee plus the simulated resource fee, and the
/// attached transaction data records that same resource fee, so a later
/// pass can subtract exactly what an earlier one added. The simulation's
/// footprint replaces any previous one. A sole host-function invocation
/// keeps its authorization entries when it has any (they were signed in an
/// earlier pass) and otherwise takes the simulation's. Any other operation
/// list is carried over unchanged.
///
/// Signing contract-account entries changes what the next simulation
/// measures, so callers that sign must simulate and assemble again before
/// submitting.
pub fn assemble(
    transaction: &Transaction,
    simulation: &SimulationResult,
) -> Result<Transaction, WalletError> {
    if let Some(error) = &simulation.error {
        return Err(WalletError::Simulation(error.clone()));
    }
    let mut transaction_data = simulation
        .transaction_data
        .clone()
        .ok_or_else(|| WalletError::Simulation("no transaction data in simulation".into()))?;

    let resource_fee = simulation.resource_fee();
    transaction_data.resource_fee =
        i64::try_from(resource_fee).map_err(|_| WalletError::InvalidFee(resource_fee))?;

    let attached = transaction
        .soroban_data
        .as_ref()
        .map(|data| u64::try_from(data.resource_fee).unwrap_or(0))
        .unwrap_or(0);
    let classic = u64::from(transaction.fee).saturating_sub(attached);
    let fee = classic.saturating_add(resource_fee);
    let fee = u32::try_from(fee).map_err(|_| WalletError::InvalidFee(fee))?;

    let operations = match transaction.operations.as_slice() {
        [
            Operation {
                source_account,
                body: OperationBody::InvokeHostFunction(op),
            },
        ] => vec![Operation {
            source_account: source_account.clone(),
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: op.host_function.clone(),
                auth: if op.auth.is_empty() {
                    simulation.auth.clone()
                } else {
                    op.auth.clone()
                },
            }),
        }],
        operations => operations.to_vec(),
    };

    Ok(Transaction {
        fee,
        operations,
        soroban_data: Some(transaction_data),
        ..transaction.clone()
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sorokey_xdr::{
        AccountId, HostFunction, InvokeContractArgs, LedgerFootprint, Memo, MuxedAccount,
        Preconditions, ScAddress, ScVal, SorobanAddressCredentials, SorobanAuthorizationEntry,
        SorobanAuthorizedFunction, SorobanAuthorizedInvocation, SorobanCredentials,
        SorobanResources, SorobanTransactionData,
    };

    use super::*;

    fn invoke_args() -> InvokeContractArgs {
        InvokeContractArgs {
            contract_address: ScAddress::Contract([1; 32]),
            function_name: "transfer".into(),
            args: vec![ScVal::I128(10)],
        }
    }

    fn transaction(auth: Vec<SorobanAuthorizationEntry>) -> Transaction {
        Transaction {
            source_account: MuxedAccount::from(AccountId([8; 32])),
            fee: 100,
            seq_num: 43,
            cond: Preconditions::None,
            memo: Memo::None,
            operations: vec![Operation {
                source_account: None,
                body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                    host_function: HostFunction::InvokeContract(invoke_args()),
                    auth,
                }),
            }],
            soroban_data: None,
        }
    }

    fn entry(signature: ScVal) -> SorobanAuthorizationEntry {
        SorobanAuthorizationEntry {
            credentials: SorobanCredentials::Address(SorobanAddressCredentials {
                address: ScAddress::Contract([2; 32]),
                nonce: 1,
                signature_expiration_ledger: 0,
                signature,
            }),
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(invoke_args()),
                sub_invocations: vec![],
            },
        }
    }

    fn simulation(resource_fee: i64, instructions: u32) -> SimulationResult {
        SimulationResult {
            auth: vec![entry(ScVal::Void)],
            min_resource_fee: resource_fee.to_string(),
            transaction_data: Some(SorobanTransactionData {
                archived_entries: None,
                resources: SorobanResources {
                    footprint: LedgerFootprint::default(),
                    instructions,
                    disk_read_bytes: 0,
                    write_bytes: 0,
                },
                resource_fee,
            }),
            latest_ledger: 100,
            return_value: None,
            error: None,
        }
    }

    fn auth_of(transaction: &Transaction) -> &[SorobanAuthorizationEntry] {
        &transaction.invoke_host_function().unwrap().auth
    }

    #[test]
    fn it_adds_the_resource_fee_to_the_classic_fee() {
        let assembled = assemble(&transaction(vec![]), &simulation(1500, 1)).unwrap();
        assert_eq!(assembled.fee, 1600);
        assert_eq!(assembled.seq_num, 43);
        assert_eq!(assembled.soroban_data, simulation(1500, 1).transaction_data);
        assert_eq!(auth_of(&assembled), &[entry(ScVal::Void)]);
    }

    #[test]
    fn it_uses_the_latest_simulation_on_a_second_pass() {
        let first = assemble(&transaction(vec![]), &simulation(1500, 1)).unwrap();

        let mut signed = first.clone();
        if let [Operation { body: OperationBody::InvokeHostFunction(op), .. }] =
            signed.operations.as_mut_slice()
        {
            op.auth = vec![entry(ScVal::Bool(true))];
        }

        let second = assemble(&signed, &simulation(2000, 2)).unwrap();
        assert_eq!(second.fee, 2100);
        assert_eq!(second.soroban_data, simulation(2000, 2).transaction_data);
        assert_eq!(auth_of(&second), &[entry(ScVal::Bool(true))]);
    }

    #[test]
    fn it_refuses_a_failed_simulation() {
        let failed = SimulationResult {
            error: Some("HostError: Error(Auth, InvalidAction)".into()),
            ..simulation(1500, 1)
        };
        assert!(matches!(
            assemble(&transaction(vec![]), &failed),
            Err(WalletError::Simulation(message)) if message.contains("InvalidAction")
        ));
    }

    #[test]
    fn it_treats_a_malformed_resource_fee_as_zero() {
        let odd = SimulationResult {
            min_resource_fee: "lots".into(),
            ..simulation(1500, 1)
        };
        let assembled = assemble(&transaction(vec![]), &odd).unwrap();
        assert_eq!(assembled.fee, 100);
        assert_eq!(assembled.soroban_data.unwrap().resource_fee, 0);
    }

    #[test]
    fn it_keeps_the_classic_fee_after_a_malformed_resource_fee() {
        let garbage = SimulationResult {
            min_resource_fee: "garbage".into(),
            ..simulation(1500, 1)
        };
        let first = assemble(&transaction(vec![]), &garbage).unwrap();
        assert_eq!(first.fee, 100);

        let second = assemble(&first, &simulation(2000, 2)).unwrap();
        assert_eq!(second.fee, 2100);
        assert_eq!(second.soroban_data.unwrap().resource_fee, 2000);
    }

    #[test]
    fn it_records_the_resource_fee_it_added() {
        let mismatched = SimulationResult {
            min_resource_fee: "1800".into(),
            ..simulation(1500, 1)
        };
        let first = assemble(&transaction(vec![]), &mismatched).unwrap();
        assert_eq!(first.fee, 1900);
        assert_eq!(first.soroban_data.as_ref().unwrap().resource_fee, 1800);

        let second = assemble(&first, &simulation(2000, 2)).unwrap();
        assert_eq!(second.fee, 2100);
    }

    #[test]
    fn it_rejects_a_fee_that_does_not_fit() {
        let huge = SimulationResult {
            min_resource_fee: u32::MAX.to_string(),
            ..simulation(1500, 1)
        };
        assert_eq!(
            assemble(&transaction(vec![]), &huge).unwrap_err().to_string(),
            WalletError::InvalidFee(u64::from(u32::MAX) + 100).to_string()
        );
    }

    #[test]
    fn it_carries_other_operation_lists_over_unchanged() {
        let mut two = transaction(vec![]);
        two.operations.push(two.operations[0].clone());

        let assembled = assemble(&two, &simulation(1500, 1)).unwrap();
        assert_eq!(assembled.operations, two.operations);
        assert_eq!(assembled.fee, 1600);
        assert_eq!(assembled.soroban_data, simulation(1500, 1).transaction_data);
    }
}
