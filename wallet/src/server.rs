// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Wallet session server
//!
//! Responds to the dApp handshake, then decrypts and dispatches JSON-RPC
//! requests to a [WalletApp], gating authorization requests and privileged
//! methods through the session [TrustEngine].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use rand_core::OsRng;
use serde_json::Value;

use mwa::socket::{Frame, Socket};
use mwa_core::{handshake::WalletHandshake, Session};
use mwa_proto::{
    compat::{cluster_to_chain, normalize_capabilities},
    encoding::{b64_decode, b64_decode_all, b64_encode_all},
    methods::{
        Account, AppIdentity, AuthorizationResult, AuthorizeParams, CapabilitiesResult,
        SignAndSendOptions, SignInPayload, SignInResult, SignaturesResult, SignedPayloadsResult,
        WireRequest,
    },
    rpc::{self, Request, Response, RpcError},
    Error as ProtoError, ProtocolVersion,
};

use crate::{
    store::{AuthRecord, AuthorizationStore},
    trust::{TrustConfig, TrustEngine},
    Error,
};

/// Wallet configuration
#[derive(Clone, Debug, PartialEq)]
pub struct WalletConfig {
    pub max_transactions_per_request: u32,
    pub max_messages_per_request: u32,
    /// Wallet base URI (https) returned with authorizations
    pub wallet_uri_base: Option<String>,
    /// Protocol versions this wallet negotiates
    pub supported: Vec<ProtocolVersion>,
    /// Time to wait for the dApp to connect
    pub accept_timeout: Duration,
    pub trust: TrustConfig,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            max_transactions_per_request: 10,
            max_messages_per_request: 10,
            wallet_uri_base: None,
            supported: ProtocolVersion::SUPPORTED.to_vec(),
            accept_timeout: Duration::from_secs(30),
            trust: TrustConfig::default(),
        }
    }
}

/// Wallet application, approving requests and holding signing keys
///
/// Called only once the trust engine has admitted the request.
/// Payloads and addresses are decoded, results are encoded by the server.
#[async_trait]
pub trait WalletApp: Send + Sync {
    /// Approve an authorization, returning the authorized accounts
    async fn authorize(&self, req: &AuthorizeParams) -> Result<Vec<Account>, RpcError>;

    /// Sign a sign-in payload with the provided account, `None` where unsupported
    async fn sign_in(
        &self,
        _payload: &SignInPayload,
        _account: &Account,
    ) -> Result<Option<SignInResult>, RpcError> {
        Ok(None)
    }

    /// Wallet capabilities (limits are filled in from [WalletConfig] where absent)
    fn capabilities(&self) -> CapabilitiesResult;

    async fn sign_transactions(&self, payloads: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, RpcError>;

    async fn sign_messages(
        &self,
        addresses: Vec<Vec<u8>>,
        payloads: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, RpcError>;

    /// Sign and submit transactions, returning transaction signatures
    async fn sign_and_send_transactions(
        &self,
        payloads: Vec<Vec<u8>>,
        options: Option<SignAndSendOptions>,
    ) -> Result<Vec<Vec<u8>>, RpcError>;
}

/// Await the dApp hello and complete the handshake, returning the
/// session and the accepted hello
///
/// The dApp resends its hello in response to pings, so copies of the
/// hello may follow the handshake, see [WalletSession::with_hello].
pub async fn accept_session(
    socket: &mut Socket,
    handshake: &WalletHandshake,
) -> Result<(Session, Vec<u8>), Error> {
    let hello = loop {
        match socket.recv().await {
            Frame::Data(d) if d.is_empty() => continue,
            Frame::Data(d) => break d,
            Frame::Closed { .. } => return Err(Error::ClosedBeforeConnection),
        }
    };

    let (rsp, session) = match handshake.respond(&hello, &mut OsRng) {
        Ok(v) => v,
        Err(e) => {
            warn!("handshake failed: {}", e);
            socket.close().await;
            return Err(e.into());
        }
    };

    socket.send(rsp).await?;

    info!("session established (protocol version: {})", session.version());

    Ok((session, hello))
}

/// Wallet side of an established session
pub struct WalletSession {
    session: Session,
    trust: TrustEngine,
    store: AuthorizationStore,
    app: Arc<dyn WalletApp>,
    config: WalletConfig,
    /// Authorization for this session (token, record)
    current: Option<(String, AuthRecord)>,
    /// Accepted hello, repeats are dropped
    hello: Option<Vec<u8>>,
}

impl WalletSession {
    pub fn new(
        session: Session,
        trust: TrustEngine,
        store: AuthorizationStore,
        app: Arc<dyn WalletApp>,
        config: WalletConfig,
    ) -> Self {
        Self {
            session,
            trust,
            store,
            app,
            config,
            current: None,
            hello: None,
        }
    }

    /// Drop frames repeating the accepted hello
    pub fn with_hello(mut self, hello: Vec<u8>) -> Self {
        self.hello = Some(hello);
        self
    }

    /// Fetch the negotiated protocol version
    pub fn version(&self) -> ProtocolVersion {
        self.session.version()
    }

    /// Serve requests until the dApp closes the session
    ///
    /// Protocol violations (including empty frames) close the socket
    /// and are returned.
    pub async fn run(mut self, mut socket: Socket) -> Result<(), Error> {
        loop {
            let data = match socket.recv().await {
                Frame::Data(d) => d,
                Frame::Closed { clean, code } => {
                    debug!("session closed (clean: {}, code: {:?})", clean, code);
                    return Ok(());
                }
            };

            if self.hello.as_deref() == Some(&data[..]) {
                debug!("dropping repeated hello");
                continue;
            }

            let rsp = match self.receive(&data).await {
                Ok(r) => r,
                Err(e) => {
                    error!("session failed: {}", e);
                    socket.close().await;
                    return Err(e);
                }
            };

            socket.send(rsp).await?;
        }
    }

    async fn receive(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
        if data.is_empty() {
            return Err(Error::EmptyFrame);
        }

        let plaintext = self.session.decrypt(data)?;
        let rsp = self.handle(&plaintext).await;

        let b = rpc::to_bytes(&rsp)?;
        let r = self.session.encrypt(&b)?;

        Ok(r)
    }

    /// Handle a decrypted request
    pub async fn handle(&mut self, plaintext: &[u8]) -> Response {
        let req: Request = match rpc::from_bytes(plaintext) {
            Ok(r) => r,
            Err(e) => {
                warn!("malformed request: {}", e);
                return Response::err(None, RpcError::new(rpc::ERROR_PARSE, e.to_string()));
            }
        };

        debug!("request {}: {}", req.id, req.method);

        let wire = match WireRequest::parse(&req.method, req.params) {
            Ok(w) => w,
            Err(ProtoError::UnknownMethod(m)) => {
                let e = RpcError::new(rpc::ERROR_METHOD_NOT_FOUND, format!("unknown method {m}"));
                return Response::err(Some(req.id), e);
            }
            Err(e) => {
                let e = RpcError::new(rpc::ERROR_INVALID_PARAMS, e.to_string());
                return Response::err(Some(req.id), e);
            }
        };

        match self.dispatch(wire).await {
            Ok(v) => Response::ok(req.id, v),
            Err(e) => {
                debug!("request {} failed: {}", req.id, e);
                Response::err(Some(req.id), e)
            }
        }
    }

    async fn dispatch(&mut self, req: WireRequest) -> Result<Value, RpcError> {
        match req {
            WireRequest::Authorize(p) => match p.auth_token.clone() {
                Some(t) => self.reauthorize(p.identity, &t).await,
                None => self.authorize(p).await,
            },
            WireRequest::Reauthorize(p) => self.reauthorize(p.identity, &p.auth_token).await,
            WireRequest::Deauthorize(p) => {
                self.store.revoke(&p.auth_token);

                if matches!(&self.current, Some((t, _)) if *t == p.auth_token) {
                    self.current = None;
                }

                Ok(Value::Object(Default::default()))
            }
            WireRequest::GetCapabilities => {
                let mut c = self.app.capabilities();
                c.max_transactions_per_request = c
                    .max_transactions_per_request
                    .or(Some(self.config.max_transactions_per_request));
                c.max_messages_per_request = c
                    .max_messages_per_request
                    .or(Some(self.config.max_messages_per_request));

                to_value(&normalize_capabilities(self.version(), c))
            }
            WireRequest::SignTransactions(p) => {
                self.check_privileged()?;
                let payloads = decode_payloads(&p.payloads, self.config.max_transactions_per_request)?;

                let signed = self.app.sign_transactions(payloads).await?;

                to_value(&SignedPayloadsResult {
                    signed_payloads: b64_encode_all(&signed),
                })
            }
            WireRequest::SignMessages(p) => {
                self.check_privileged()?;
                let payloads = decode_payloads(&p.payloads, self.config.max_messages_per_request)?;
                let addresses = b64_decode_all(&p.addresses)
                    .map_err(|e| RpcError::new(rpc::ERROR_INVALID_PARAMS, e.to_string()))?;

                let signed = self.app.sign_messages(addresses, payloads).await?;

                to_value(&SignedPayloadsResult {
                    signed_payloads: b64_encode_all(&signed),
                })
            }
            WireRequest::SignAndSendTransactions(p) => {
                self.check_privileged()?;
                let payloads = decode_payloads(&p.payloads, self.config.max_transactions_per_request)?;

                let signatures = self
                    .app
                    .sign_and_send_transactions(payloads, p.options)
                    .await?;

                to_value(&SignaturesResult {
                    signatures: b64_encode_all(&signatures),
                })
            }
        }
    }

    async fn authorize(&mut self, mut p: AuthorizeParams) -> Result<Value, RpcError> {
        // Legacy requests name a cluster rather than a chain
        if let (None, Some(cluster)) = (&p.chain, p.cluster.take()) {
            let chain = cluster_to_chain(&cluster).ok_or_else(|| {
                RpcError::new(
                    rpc::ERROR_INVALID_PARAMS,
                    format!("unsupported cluster {cluster}"),
                )
            })?;
            p.chain = Some(chain.to_string());
        }

        let state = self
            .trust
            .verify_authorization_source(identity_uri(&p.identity))
            .await;

        let scope = state.scope(self.trust.association()).ok_or_else(|| {
            warn!("authorization source verification failed ({:?})", state);
            RpcError::new(rpc::ERROR_AUTHORIZATION_FAILED, "authorization declined")
        })?;

        let accounts = self.app.authorize(&p).await?;

        let sign_in_result = match (&p.sign_in_payload, accounts.first()) {
            (Some(payload), Some(account)) => self.app.sign_in(payload, account).await?,
            _ => None,
        };

        let record = AuthRecord {
            identity: p.identity,
            scope,
            accounts,
            chain: p.chain,
        };

        let token = self.store.issue(record.clone());

        info!("authorized (scope: {})", record.scope);

        let r = AuthorizationResult {
            accounts: record.accounts.clone(),
            auth_token: token.clone(),
            wallet_uri_base: self.config.wallet_uri_base.clone(),
            sign_in_result,
        };

        self.current = Some((token, record));

        to_value(&r)
    }

    async fn reauthorize(
        &mut self,
        identity: Option<AppIdentity>,
        token: &str,
    ) -> Result<Value, RpcError> {
        let record = self.store.get(token).ok_or_else(|| {
            RpcError::new(rpc::ERROR_AUTHORIZATION_FAILED, "unknown auth token")
        })?;

        let state = self
            .trust
            .verify_reauthorization_source(&record.scope, identity_uri(&identity))
            .await;

        if state.scope(self.trust.association()).is_none() {
            warn!("reauthorization source verification failed ({:?})", state);
            return Err(RpcError::new(
                rpc::ERROR_AUTHORIZATION_FAILED,
                "reauthorization declined",
            ));
        }

        info!("reauthorized (scope: {})", record.scope);

        let r = AuthorizationResult {
            accounts: record.accounts.clone(),
            auth_token: token.to_string(),
            wallet_uri_base: self.config.wallet_uri_base.clone(),
            sign_in_result: None,
        };

        self.current = Some((token.to_string(), record));

        to_value(&r)
    }

    /// Check the session is authorized, and the scope admits the current caller
    fn check_privileged(&self) -> Result<(), RpcError> {
        let declined = |m: &str| RpcError::new(rpc::ERROR_AUTHORIZATION_FAILED, m);

        let (token, record) = self
            .current
            .as_ref()
            .ok_or_else(|| declined("session not authorized"))?;

        // Revoked via another session
        if self.store.get(token).is_none() {
            return Err(declined("authorization revoked"));
        }

        match self
            .trust
            .verify_privileged_method_source(&record.scope, identity_uri(&record.identity))
        {
            true => Ok(()),
            false => {
                warn!("privileged method declined for scope {}", record.scope);
                Err(declined("caller not permitted for this authorization"))
            }
        }
    }
}

fn identity_uri(identity: &Option<AppIdentity>) -> Option<&str> {
    identity.as_ref().and_then(|i| i.uri.as_deref())
}

/// Decode request payloads, enforcing the per-request limit
fn decode_payloads(payloads: &[String], max: u32) -> Result<Vec<Vec<u8>>, RpcError> {
    if payloads.len() > max as usize {
        return Err(RpcError::new(
            rpc::ERROR_TOO_MANY_PAYLOADS,
            format!("{} payloads exceeds limit of {}", payloads.len(), max),
        ));
    }

    b64_decode_all(payloads).map_err(|e| {
        // Report which payloads were invalid
        let valid: Vec<_> = payloads.iter().map(|p| b64_decode(p).is_ok()).collect();

        RpcError::new(rpc::ERROR_INVALID_PAYLOADS, e.to_string())
            .with_data(serde_json::json!({ "valid": valid }))
    })
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value, RpcError> {
    serde_json::to_value(v).map_err(|e| RpcError::new(rpc::ERROR_INTERNAL, e.to_string()))
}
