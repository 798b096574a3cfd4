// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Typed RPC method parameters and results
//!
//! Byte payloads (transactions, messages, signatures, addresses) are carried
//! as standard base64 strings, see [crate::encoding].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::Error;

/// RPC methods
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumVariantNames, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Method {
    Authorize,
    Reauthorize,
    Deauthorize,
    GetCapabilities,
    SignTransactions,
    SignMessages,
    SignAndSendTransactions,
}

impl Method {
    /// Parse a wire method name
    pub fn parse(s: &str) -> Result<Self, Error> {
        s.parse().map_err(|_| Error::UnknownMethod(s.to_string()))
    }

    /// Privileged methods require an authorized session
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Method::SignTransactions | Method::SignMessages | Method::SignAndSendTransactions
        )
    }

    /// Methods returning an [AuthorizationResult]
    pub fn is_authorization(&self) -> bool {
        matches!(self, Method::Authorize | Method::Reauthorize)
    }
}

/// dApp identity presented on authorization
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `authorize` parameters (both protocol shapes, unused fields omitted)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<AppIdentity>,
    /// CAIP-2 chain identifier (v1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Cluster name (legacy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_payload: Option<SignInPayload>,
}

/// `reauthorize` parameters (legacy)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReauthorizeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<AppIdentity>,
    pub auth_token: String,
}

/// `deauthorize` parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeauthorizeParams {
    pub auth_token: String,
}

/// Authorized account
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// base64 encoded public key
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_address_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

/// `authorize` / `reauthorize` result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub accounts: Vec<Account>,
    pub auth_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_uri_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_result: Option<SignInResult>,
}

/// Sign-in-with-wallet request, field names follow the sign-in standard
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

/// Sign-in-with-wallet result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignInResult {
    /// base64 encoded address of the signing account
    pub address: String,
    /// base64 encoded message that was signed
    pub signed_message: String,
    /// base64 encoded signature
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<String>,
}

/// `get_capabilities` result, normalised to carry both the v1 feature list
/// and the legacy boolean flags (see [crate::compat::normalize_capabilities])
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilitiesResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_transactions_per_request: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages_per_request: Option<u32>,
    #[serde(default)]
    pub supported_transaction_versions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_clone_authorization: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_sign_and_send_transactions: Option<bool>,
}

/// `sign_transactions` parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignTransactionsParams {
    pub payloads: Vec<String>,
}

/// `sign_messages` parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignMessagesParams {
    pub addresses: Vec<String>,
    pub payloads: Vec<String>,
}

/// `sign_and_send_transactions` options
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignAndSendOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_context_slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_preflight: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_commitment_to_send_next_transaction: Option<bool>,
}

/// `sign_and_send_transactions` parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignAndSendTransactionsParams {
    pub payloads: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SignAndSendOptions>,
}

/// `sign_transactions` / `sign_messages` result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedPayloadsResult {
    pub signed_payloads: Vec<String>,
}

/// `sign_and_send_transactions` result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignaturesResult {
    pub signatures: Vec<String>,
}

/// Wire-level request, one variant per method
#[derive(Clone, Debug, PartialEq)]
pub enum WireRequest {
    Authorize(AuthorizeParams),
    Reauthorize(ReauthorizeParams),
    Deauthorize(DeauthorizeParams),
    GetCapabilities,
    SignTransactions(SignTransactionsParams),
    SignMessages(SignMessagesParams),
    SignAndSendTransactions(SignAndSendTransactionsParams),
}

impl WireRequest {
    /// Fetch the method for this request
    pub fn method(&self) -> Method {
        match self {
            WireRequest::Authorize(_) => Method::Authorize,
            WireRequest::Reauthorize(_) => Method::Reauthorize,
            WireRequest::Deauthorize(_) => Method::Deauthorize,
            WireRequest::GetCapabilities => Method::GetCapabilities,
            WireRequest::SignTransactions(_) => Method::SignTransactions,
            WireRequest::SignMessages(_) => Method::SignMessages,
            WireRequest::SignAndSendTransactions(_) => Method::SignAndSendTransactions,
        }
    }

    /// Encode request parameters to JSON
    pub fn params(&self) -> Result<Value, Error> {
        let v = match self {
            WireRequest::Authorize(p) => serde_json::to_value(p)?,
            WireRequest::Reauthorize(p) => serde_json::to_value(p)?,
            WireRequest::Deauthorize(p) => serde_json::to_value(p)?,
            WireRequest::GetCapabilities => Value::Object(Default::default()),
            WireRequest::SignTransactions(p) => serde_json::to_value(p)?,
            WireRequest::SignMessages(p) => serde_json::to_value(p)?,
            WireRequest::SignAndSendTransactions(p) => serde_json::to_value(p)?,
        };

        Ok(v)
    }

    /// Decode a request from a method name and JSON parameters (wallet side)
    pub fn parse(method: &str, params: Value) -> Result<Self, Error> {
        // Absent params decode as an empty object
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            v => v,
        };

        let r = match Method::parse(method)? {
            Method::Authorize => WireRequest::Authorize(serde_json::from_value(params)?),
            Method::Reauthorize => WireRequest::Reauthorize(serde_json::from_value(params)?),
            Method::Deauthorize => WireRequest::Deauthorize(serde_json::from_value(params)?),
            Method::GetCapabilities => WireRequest::GetCapabilities,
            Method::SignTransactions => {
                WireRequest::SignTransactions(serde_json::from_value(params)?)
            }
            Method::SignMessages => WireRequest::SignMessages(serde_json::from_value(params)?),
            Method::SignAndSendTransactions => {
                WireRequest::SignAndSendTransactions(serde_json::from_value(params)?)
            }
        };

        Ok(r)
    }
}
