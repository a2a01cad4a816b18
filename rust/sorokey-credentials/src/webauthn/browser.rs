//! [`Authenticator`] over the browser's Web Authentication API.
//!
//! Only compiled for `wasm32-unknown-unknown`. Both ceremonies call into
//! `navigator.credentials` and suspend until the user completes or dismisses
//! the platform prompt.

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::authenticator::{AssertionRequest, AssertionResult, Authenticator, RegistrationOptions};
use super::credential::RegistrationResponse;
use super::error::CeremonyError;

const COSE_ALG_ES256: f64 = -7.0;
const COSE_ALG_RS256: f64 = -257.0;
const DEFAULT_TIMEOUT_MS: u32 = 60_000;

/// Runs passkey ceremonies with `navigator.credentials.create()` and
/// `navigator.credentials.get()`.
#[derive(Debug, Clone)]
pub struct BrowserAuthenticator {
    timeout_ms: u32,
}

impl Default for BrowserAuthenticator {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BrowserAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long the browser waits for the user before failing a ceremony.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn creation_options(&self, options: &RegistrationOptions) -> Result<Object, CeremonyError> {
        let public_key = Object::new();

        let challenge = random_challenge(32)?;
        js_set(&public_key, "challenge", &Uint8Array::from(challenge.as_slice()))?;

        let rp = Object::new();
        js_set(&rp, "id", &JsValue::from_str(&options.rp_id))?;
        js_set(&rp, "name", &JsValue::from_str(&options.rp_name))?;
        js_set(&public_key, "rp", &rp)?;

        let user = Object::new();
        js_set(&user, "id", &Uint8Array::from(options.user_id.as_slice()))?;
        js_set(&user, "name", &JsValue::from_str(&options.user_name))?;
        js_set(
            &user,
            "displayName",
            &JsValue::from_str(&options.user_display_name),
        )?;
        js_set(&public_key, "user", &user)?;

        // ES256 first; RS256 only so platforms without P-256 still answer,
        // after which key extraction reports the unsupported key type.
        let params = Array::new();
        for alg in [COSE_ALG_ES256, COSE_ALG_RS256] {
            let param = Object::new();
            js_set(&param, "type", &JsValue::from_str("public-key"))?;
            js_set(&param, "alg", &JsValue::from_f64(alg))?;
            params.push(&param);
        }
        js_set(&public_key, "pubKeyCredParams", &params)?;

        let selection = Object::new();
        js_set(
            &selection,
            "authenticatorAttachment",
            &JsValue::from_str("platform"),
        )?;
        js_set(&selection, "residentKey", &JsValue::from_str("preferred"))?;
        js_set(
            &selection,
            "userVerification",
            &JsValue::from_str("required"),
        )?;
        js_set(&public_key, "authenticatorSelection", &selection)?;

        js_set(&public_key, "timeout", &JsValue::from_f64(self.timeout_ms.into()))?;
        js_set(&public_key, "attestation", &JsValue::from_str("none"))?;

        let options = Object::new();
        js_set(&options, "publicKey", &public_key)?;
        Ok(options)
    }

    fn request_options(&self, request: &AssertionRequest) -> Result<Object, CeremonyError> {
        let public_key = Object::new();
        js_set(
            &public_key,
            "challenge",
            &Uint8Array::from(request.challenge.as_slice()),
        )?;
        js_set(&public_key, "rpId", &JsValue::from_str(&request.rp_id))?;
        js_set(
            &public_key,
            "userVerification",
            &JsValue::from_str("required"),
        )?;
        js_set(&public_key, "timeout", &JsValue::from_f64(self.timeout_ms.into()))?;

        if !request.allow_credentials.is_empty() {
            let allow = Array::new();
            for credential_id in &request.allow_credentials {
                let descriptor = Object::new();
                js_set(&descriptor, "type", &JsValue::from_str("public-key"))?;
                js_set(&descriptor, "id", &Uint8Array::from(credential_id.as_slice()))?;
                allow.push(&descriptor);
            }
            js_set(&public_key, "allowCredentials", &allow)?;
        }

        let options = Object::new();
        js_set(&options, "publicKey", &public_key)?;
        Ok(options)
    }
}

#[async_trait(?Send)]
impl Authenticator for BrowserAuthenticator {
    async fn register(
        &self,
        options: &RegistrationOptions,
    ) -> Result<RegistrationResponse, CeremonyError> {
        let credential = call_credentials("create", &self.creation_options(options)?)
            .await
            .map_err(|error| ceremony_error(error, CeremonyError::RegistrationFailed))?;

        let credential_id = array_buffer_to_vec(&js_get(&credential, "rawId")?);
        let response = js_get(&credential, "response")?;

        Ok(RegistrationResponse {
            credential_id,
            public_key: call_optional_method(&response, "getPublicKey")?,
            authenticator_data: call_optional_method(&response, "getAuthenticatorData")?,
            attestation_object: optional_buffer(&js_get(&response, "attestationObject")?),
        })
    }

    async fn assert(&self, request: &AssertionRequest) -> Result<AssertionResult, CeremonyError> {
        let credential = call_credentials("get", &self.request_options(request)?)
            .await
            .map_err(|error| ceremony_error(error, CeremonyError::AssertionFailed))?;

        let credential_id = array_buffer_to_vec(&js_get(&credential, "rawId")?);
        let response = js_get(&credential, "response")?;

        Ok(AssertionResult {
            credential_id,
            signature: extract_response_field(&response, "signature")?,
            authenticator_data: extract_response_field(&response, "authenticatorData")?,
            client_data_json: extract_response_field(&response, "clientDataJSON")?,
        })
    }
}

/// Call `navigator.credentials.<method>(options)` and await the promise.
async fn call_credentials(method: &str, options: &Object) -> Result<JsValue, JsValue> {
    let credentials = get_credentials_container().map_err(|error| JsValue::from_str(&error.to_string()))?;
    let function: Function = Reflect::get(&credentials, &JsValue::from_str(method))?.dyn_into()?;
    let promise: Promise = function.call1(&credentials, options)?.dyn_into()?;
    JsFuture::from(promise).await
}

/// A `NotAllowedError` or `AbortError` means the user dismissed the prompt
/// or it timed out; anything else is a platform failure.
fn ceremony_error(error: JsValue, otherwise: fn(String) -> CeremonyError) -> CeremonyError {
    let name = Reflect::get(&error, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
        .unwrap_or_default();
    match name.as_str() {
        "NotAllowedError" | "AbortError" => CeremonyError::Declined(format!("{error:?}")),
        "NotSupportedError" | "SecurityError" => CeremonyError::NotAvailable(format!("{error:?}")),
        _ => otherwise(format!("{error:?}")),
    }
}

/// Get `navigator.credentials`.
fn get_credentials_container() -> Result<JsValue, CeremonyError> {
    let global = js_sys::global();
    let navigator = Reflect::get(&global, &"navigator".into())
        .map_err(|_| CeremonyError::NotAvailable("navigator not found".into()))?;
    if navigator.is_undefined() {
        return Err(CeremonyError::NotAvailable("navigator is undefined".into()));
    }
    let credentials = Reflect::get(&navigator, &"credentials".into())
        .map_err(|_| CeremonyError::NotAvailable("credentials not found".into()))?;
    if credentials.is_undefined() {
        return Err(CeremonyError::NotAvailable(
            "navigator.credentials is undefined".into(),
        ));
    }
    Ok(credentials)
}

/// Generate random bytes via `crypto.getRandomValues()`.
fn random_challenge(len: u32) -> Result<Vec<u8>, CeremonyError> {
    let global = js_sys::global();
    let crypto = Reflect::get(&global, &"crypto".into())
        .map_err(|_| CeremonyError::NotAvailable("crypto not found".into()))?;
    let array = Uint8Array::new_with_length(len);
    let get_random_values: Function = Reflect::get(&crypto, &"getRandomValues".into())
        .map_err(|e| CeremonyError::JsError(format!("{e:?}")))?
        .unchecked_into();
    get_random_values
        .call1(&crypto, &array)
        .map_err(|e| CeremonyError::JsError(format!("{e:?}")))?;
    Ok(array.to_vec())
}

/// Call a zero-argument method that older browsers may not implement.
/// Missing methods and `null` results are `None`.
fn call_optional_method(obj: &JsValue, name: &str) -> Result<Option<Vec<u8>>, CeremonyError> {
    let Ok(method) = js_get(obj, name)?.dyn_into::<Function>() else {
        return Ok(None);
    };
    let value = method
        .call0(obj)
        .map_err(|e| CeremonyError::JsError(format!("{name}() failed: {e:?}")))?;
    Ok(optional_buffer(&value))
}

fn optional_buffer(value: &JsValue) -> Option<Vec<u8>> {
    (!value.is_null() && !value.is_undefined()).then(|| array_buffer_to_vec(value))
}

fn js_get(obj: &JsValue, key: &str) -> Result<JsValue, CeremonyError> {
    Reflect::get(obj, &JsValue::from_str(key))
        .map_err(|e| CeremonyError::JsError(format!("failed to get '{key}': {e:?}")))
}

fn js_set(obj: &Object, key: &str, value: &JsValue) -> Result<(), CeremonyError> {
    Reflect::set(obj, &JsValue::from_str(key), value)
        .map_err(|e| CeremonyError::JsError(format!("failed to set '{key}': {e:?}")))?;
    Ok(())
}

fn extract_response_field(obj: &JsValue, key: &str) -> Result<Vec<u8>, CeremonyError> {
    let buffer = js_get(obj, key)?;
    optional_buffer(&buffer)
        .ok_or_else(|| CeremonyError::AssertionFailed(format!("missing '{key}'")))
}

/// Convert a JS `ArrayBuffer` (or typed-array view) to `Vec<u8>`.
fn array_buffer_to_vec(value: &JsValue) -> Vec<u8> {
    Uint8Array::new(value).to_vec()
}
