// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Compatibility proxy
//!
//! [MobileWallet] exposes a stable method surface over an [RpcClient],
//! rewriting each call into the wire shape for the negotiated protocol
//! version via [mwa_proto::compat].

use log::{debug, info};

use mwa_proto::{
    compat::{map_request, map_response, ApiRequest, ApiResponse, AuthorizeRequest},
    encoding::{b58_encode, b64_decode, b64_encode},
    methods::{
        AuthorizationResult, CapabilitiesResult, DeauthorizeParams, SignAndSendTransactionsParams,
        SignInPayload, SignInResult, SignMessagesParams, SignTransactionsParams,
        SignaturesResult, SignedPayloadsResult,
    },
    siws::sign_in_message,
    ProtocolVersion,
};

use crate::{rpc::RpcClient, Error};

/// Signature scheme for sign-in results synthesised via `sign_messages`
pub const SIGN_IN_SIGNATURE_TYPE: &str = "ed25519";

const ED25519_SIGNATURE_LEN: usize = 64;

/// Wallet API, independent of the negotiated protocol version
#[derive(Debug)]
pub struct MobileWallet {
    client: RpcClient,
}

impl MobileWallet {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Fetch the negotiated protocol version
    pub fn version(&self) -> ProtocolVersion {
        self.client.version()
    }

    /// Fetch the underlying RPC client
    pub fn client(&mut self) -> &mut RpcClient {
        &mut self.client
    }

    /// Close the session
    pub async fn close(self) {
        self.client.close().await
    }

    /// Execute a stable API request
    pub async fn execute(&self, req: ApiRequest) -> Result<ApiResponse, Error> {
        let version = self.client.version();

        let wire = map_request(version, req)?;
        let method = wire.method();

        debug!("{} request (protocol version: {})", method, version);

        let result = self.client.send(&wire).await?;

        let r = map_response(version, method, result)?;
        Ok(r)
    }

    /// Authorize (or reauthorize, where an `auth_token` is provided),
    /// falling back to `sign_messages` for sign-in when the wallet does
    /// not return a sign-in result
    pub async fn authorize(&self, req: AuthorizeRequest) -> Result<AuthorizationResult, Error> {
        let sign_in = req.sign_in_payload.clone();

        let mut r = match self.execute(ApiRequest::Authorize(req)).await? {
            ApiResponse::Authorized(r) => r,
            _ => return Err(Error::UnexpectedResponse),
        };

        if let (Some(payload), None) = (sign_in, &r.sign_in_result) {
            info!("wallet omitted sign-in result, signing via sign_messages");
            r.sign_in_result = Some(self.sign_in_fallback(&r, payload).await?);
        }

        Ok(r)
    }

    /// Revoke an authorization token
    pub async fn deauthorize(&self, auth_token: &str) -> Result<(), Error> {
        let req = ApiRequest::Deauthorize(DeauthorizeParams {
            auth_token: auth_token.to_string(),
        });

        match self.execute(req).await? {
            ApiResponse::Deauthorized => Ok(()),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Fetch wallet capabilities (normalised to carry both shapes)
    pub async fn get_capabilities(&self) -> Result<CapabilitiesResult, Error> {
        match self.execute(ApiRequest::GetCapabilities).await? {
            ApiResponse::Capabilities(c) => Ok(c),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Sign base64 encoded transactions
    pub async fn sign_transactions(
        &self,
        req: SignTransactionsParams,
    ) -> Result<SignedPayloadsResult, Error> {
        match self.execute(ApiRequest::SignTransactions(req)).await? {
            ApiResponse::SignedPayloads(r) => Ok(r),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Sign base64 encoded messages with the provided (base64) addresses
    pub async fn sign_messages(
        &self,
        req: SignMessagesParams,
    ) -> Result<SignedPayloadsResult, Error> {
        match self.execute(ApiRequest::SignMessages(req)).await? {
            ApiResponse::SignedPayloads(r) => Ok(r),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Sign and submit base64 encoded transactions
    pub async fn sign_and_send_transactions(
        &self,
        req: SignAndSendTransactionsParams,
    ) -> Result<SignaturesResult, Error> {
        match self.execute(ApiRequest::SignAndSendTransactions(req)).await? {
            ApiResponse::Signatures(r) => Ok(r),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Sign the canonical sign-in message with the first authorized account
    async fn sign_in_fallback(
        &self,
        auth: &AuthorizationResult,
        payload: SignInPayload,
    ) -> Result<SignInResult, Error> {
        let account = auth.accounts.first().ok_or(Error::UnexpectedResponse)?;
        let address = b64_decode(&account.address)?;

        let message = sign_in_message(&payload, &b58_encode(&address))?;

        let signed = self
            .sign_messages(SignMessagesParams {
                addresses: vec![account.address.clone()],
                payloads: vec![b64_encode(message.as_bytes())],
            })
            .await?;

        let signed = signed
            .signed_payloads
            .first()
            .ok_or(Error::UnexpectedResponse)?;

        let signed = b64_decode(signed)?;
        let (signed_message, signature) = split_signed_message(&signed)?;

        Ok(SignInResult {
            address: account.address.clone(),
            signed_message: b64_encode(signed_message),
            signature: b64_encode(signature),
            signature_type: Some(SIGN_IN_SIGNATURE_TYPE.to_string()),
        })
    }
}

/// Split a signed message into the message and trailing signature
fn split_signed_message(b: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    if b.len() < ED25519_SIGNATURE_LEN {
        return Err(Error::UnexpectedResponse);
    }
    Ok(b.split_at(b.len() - ED25519_SIGNATURE_LEN))
}
