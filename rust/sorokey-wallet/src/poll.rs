//! Waiting for a submitted transaction to reach a terminal state.

use std::time::Duration;

use tracing::debug;

use crate::{PollPolicy, SorobanRpc, TransactionInfo, TransactionStatus, WalletError};

/// Query `hash` until it succeeds or fails, at most `policy.attempts` times
/// with `policy.interval` between queries.
///
/// Running out of attempts yields [`WalletError::TransactionTimeout`], which
/// is not a failure: the transaction may still be applied.
pub async fn poll_transaction<R>(
    rpc: &R,
    hash: &str,
    policy: &PollPolicy,
) -> Result<TransactionInfo, WalletError>
where
    R: SorobanRpc + ?Sized,
{
    for attempt in 1..=policy.attempts {
        let info = rpc.get_transaction(hash).await?;
        match info.status {
            TransactionStatus::Success => return Ok(info),
            TransactionStatus::Failed => {
                return Err(WalletError::TransactionFailed {
                    hash: hash.to_string(),
                    result_xdr: info.result_xdr,
                });
            }
            TransactionStatus::NotFound => {
                debug!(hash, attempt, "transaction not found yet");
                if attempt < policy.attempts {
                    sleep(policy.interval()).await;
                }
            }
        }
    }

    Err(WalletError::TransactionTimeout {
        hash: hash.to_string(),
        attempts: policy.attempts,
    })
}

#[cfg(not(target_arch = "wasm32"))]
async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(target_arch = "wasm32")]
async fn sleep(duration: Duration) {
    let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
    let waited = match timer(&js_sys::global(), millis) {
        Ok(promise) => wasm_bindgen_futures::JsFuture::from(promise).await.map(|_| ()),
        Err(error) => Err(error),
    };
    if let Err(error) = waited {
        tracing::warn!(?error, "timer failed, polling again without a delay");
    }
}

/// A promise resolving after `millis` via `global.setTimeout`.
///
/// Fails when `global` has no callable `setTimeout` or the call throws, in
/// which case the promise would never settle.
#[cfg(target_arch = "wasm32")]
fn timer(
    global: &wasm_bindgen::JsValue,
    millis: i32,
) -> Result<js_sys::Promise, wasm_bindgen::JsValue> {
    use wasm_bindgen::{JsCast, JsValue};

    let mut scheduled = Ok(JsValue::UNDEFINED);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        scheduled = js_sys::Reflect::get(global, &JsValue::from_str("setTimeout"))
            .and_then(|function| function.dyn_into::<js_sys::Function>())
            .and_then(|set_timeout| set_timeout.call2(global, &resolve, &JsValue::from(millis)));
    });
    scheduled.map(|_| promise)
}
