// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Version compatibility mapping
//!
//! Callers use the stable [ApiRequest] / [ApiResponse] model, these are
//! mapped to and from the wire shapes for the negotiated [ProtocolVersion]
//! by the pure functions [map_request] and [map_response].
//!
//! | Stable call            | `legacy` wire             | `v1` wire                 |
//! | ---------------------- | ------------------------- | ------------------------- |
//! | authorize (no token)   | `authorize{cluster}`      | `authorize{chain}`        |
//! | authorize (with token) | `reauthorize{auth_token}` | `authorize{auth_token}`   |
//! | get_capabilities       | boolean flags             | `features[]`              |
//!

use serde_json::Value;

use crate::{
    methods::{
        AppIdentity, AuthorizationResult, AuthorizeParams, CapabilitiesResult,
        DeauthorizeParams, Method, ReauthorizeParams, SignAndSendOptions,
        SignAndSendTransactionsParams, SignInPayload, SignMessagesParams, SignTransactionsParams,
        SignaturesResult, SignedPayloadsResult, WireRequest,
    },
    Error, ProtocolVersion,
};

/// Solana mainnet chain identifier
pub const CHAIN_MAINNET: &str = "solana:mainnet";
/// Solana testnet chain identifier
pub const CHAIN_TESTNET: &str = "solana:testnet";
/// Solana devnet chain identifier
pub const CHAIN_DEVNET: &str = "solana:devnet";

/// Chain identifier to legacy cluster name
const CLUSTERS: &[(&str, &str)] = &[
    (CHAIN_MAINNET, "mainnet-beta"),
    (CHAIN_TESTNET, "testnet"),
    (CHAIN_DEVNET, "devnet"),
];

pub const FEATURE_SIGN_AND_SEND_TRANSACTION: &str = "solana:signAndSendTransaction";
pub const FEATURE_SIGN_TRANSACTIONS: &str = "solana:signTransactions";
pub const FEATURE_SIGN_MESSAGES: &str = "solana:signMessages";
pub const FEATURE_SIGN_IN_WITH_SOLANA: &str = "solana:signInWithSolana";
pub const FEATURE_CLONE_AUTHORIZATION: &str = "solana:cloneAuthorization";

/// Map a chain identifier to a legacy cluster name
///
/// Cluster names are passed through unchanged.
pub fn chain_to_cluster(chain: &str) -> Result<&'static str, Error> {
    for (c, n) in CLUSTERS {
        if *c == chain || *n == chain {
            return Ok(n);
        }
    }
    Err(Error::UnsupportedChain(chain.to_string()))
}

/// Map a legacy cluster name to a chain identifier
pub fn cluster_to_chain(cluster: &str) -> Option<&'static str> {
    CLUSTERS.iter().find(|(_, n)| *n == cluster).map(|(c, _)| *c)
}

/// Combined authorize / reauthorize request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthorizeRequest {
    pub identity: Option<AppIdentity>,
    /// Chain identifier, legacy cluster names are also accepted
    pub chain: Option<String>,
    pub features: Option<Vec<String>>,
    pub addresses: Option<Vec<String>>,
    /// Existing token to refresh
    pub auth_token: Option<String>,
    pub sign_in_payload: Option<SignInPayload>,
}

/// Stable API requests
#[derive(Clone, Debug, PartialEq)]
pub enum ApiRequest {
    Authorize(AuthorizeRequest),
    Deauthorize(DeauthorizeParams),
    GetCapabilities,
    SignTransactions(SignTransactionsParams),
    SignMessages(SignMessagesParams),
    SignAndSendTransactions(SignAndSendTransactionsParams),
}

/// Stable API responses
#[derive(Clone, Debug, PartialEq)]
pub enum ApiResponse {
    Authorized(AuthorizationResult),
    Deauthorized,
    Capabilities(CapabilitiesResult),
    SignedPayloads(SignedPayloadsResult),
    Signatures(SignaturesResult),
}

/// Map a stable request to the wire request for the provided version
pub fn map_request(version: ProtocolVersion, req: ApiRequest) -> Result<WireRequest, Error> {
    let r = match (version, req) {
        // Legacy wallets refresh tokens via `reauthorize`
        (
            ProtocolVersion::Legacy,
            ApiRequest::Authorize(AuthorizeRequest {
                identity,
                auth_token: Some(auth_token),
                ..
            }),
        ) => WireRequest::Reauthorize(ReauthorizeParams {
            identity,
            auth_token,
        }),
        (ProtocolVersion::Legacy, ApiRequest::Authorize(a)) => {
            let cluster = match &a.chain {
                Some(c) => Some(chain_to_cluster(c)?.to_string()),
                None => None,
            };
            WireRequest::Authorize(AuthorizeParams {
                identity: a.identity,
                cluster,
                ..Default::default()
            })
        }
        (ProtocolVersion::V1, ApiRequest::Authorize(a)) => {
            let chain = a
                .chain
                .map(|c| cluster_to_chain(&c).map(str::to_string).unwrap_or(c));
            WireRequest::Authorize(AuthorizeParams {
                identity: a.identity,
                chain,
                cluster: None,
                features: a.features,
                addresses: a.addresses,
                auth_token: a.auth_token,
                sign_in_payload: a.sign_in_payload,
            })
        }
        (_, ApiRequest::Deauthorize(p)) => WireRequest::Deauthorize(p),
        (_, ApiRequest::GetCapabilities) => WireRequest::GetCapabilities,
        (_, ApiRequest::SignTransactions(p)) => WireRequest::SignTransactions(p),
        (_, ApiRequest::SignMessages(p)) => WireRequest::SignMessages(p),
        // Legacy wallets only accept `min_context_slot`
        (ProtocolVersion::Legacy, ApiRequest::SignAndSendTransactions(mut p)) => {
            p.options = p.options.map(|o| SignAndSendOptions {
                min_context_slot: o.min_context_slot,
                ..Default::default()
            });
            WireRequest::SignAndSendTransactions(p)
        }
        (ProtocolVersion::V1, ApiRequest::SignAndSendTransactions(p)) => {
            WireRequest::SignAndSendTransactions(p)
        }
    };

    Ok(r)
}

/// Map a wire result for the provided method to a stable response
pub fn map_response(
    version: ProtocolVersion,
    method: Method,
    result: Value,
) -> Result<ApiResponse, Error> {
    let r = match method {
        Method::Authorize | Method::Reauthorize => {
            ApiResponse::Authorized(serde_json::from_value(result)?)
        }
        Method::Deauthorize => ApiResponse::Deauthorized,
        Method::GetCapabilities => {
            let c = serde_json::from_value(result)?;
            ApiResponse::Capabilities(normalize_capabilities(version, c))
        }
        Method::SignTransactions | Method::SignMessages => {
            ApiResponse::SignedPayloads(serde_json::from_value(result)?)
        }
        Method::SignAndSendTransactions => {
            ApiResponse::Signatures(serde_json::from_value(result)?)
        }
    };

    Ok(r)
}

/// Fill in both the v1 feature list and the legacy boolean flags
pub fn normalize_capabilities(
    version: ProtocolVersion,
    mut c: CapabilitiesResult,
) -> CapabilitiesResult {
    match (version, c.features.take()) {
        (ProtocolVersion::V1, Some(features)) => {
            c.supports_sign_and_send_transactions =
                Some(has_feature(&features, FEATURE_SIGN_AND_SEND_TRANSACTION));
            c.supports_clone_authorization =
                Some(has_feature(&features, FEATURE_CLONE_AUTHORIZATION));
            c.features = Some(features);
        }
        // Legacy wallets (or v1 wallets omitting features) report flags
        (_, features) => {
            let sign_and_send = c.supports_sign_and_send_transactions.unwrap_or(true);
            let clone = c.supports_clone_authorization.unwrap_or(false);

            let mut f = features.unwrap_or_default();
            for (enabled, name) in [
                (true, FEATURE_SIGN_MESSAGES),
                (true, FEATURE_SIGN_TRANSACTIONS),
                (sign_and_send, FEATURE_SIGN_AND_SEND_TRANSACTION),
                (clone, FEATURE_CLONE_AUTHORIZATION),
            ] {
                if enabled && !has_feature(&f, name) {
                    f.push(name.to_string());
                }
            }

            c.supports_sign_and_send_transactions = Some(sign_and_send);
            c.supports_clone_authorization = Some(clone);
            c.features = Some(f);
        }
    }

    c
}

fn has_feature(features: &[String], name: &str) -> bool {
    features.iter().any(|f| f == name)
}
