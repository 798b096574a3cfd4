// Copyright (c) 2022-2023 The MobileCoin Foundation

//! JSON-RPC transport over an established session
//!
//! Each session is owned by a single task holding the [Session] cipher and
//! both socket halves, requests are submitted to the task via a channel and
//! matched to responses by id. Fatal errors (transport loss, protocol
//! violations) fail every pending request and tear the session down,
//! remote JSON-RPC errors only fail the request they respond to.

use std::{collections::HashMap, time::Duration};

use log::{debug, error, trace, warn};
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};

use mwa_core::Session;
use mwa_proto::{
    association::check_wallet_uri_base,
    methods::{Method, WireRequest},
    rpc::{self, Request, Response},
    ProtocolVersion,
};

use crate::{
    socket::{Frame, Socket, SocketReceiver, SocketSender},
    Error,
};

/// JSON-RPC transport configuration
#[derive(Clone, Debug, PartialEq, clap::Args)]
pub struct RpcConfig {
    /// Request round-trip timeout (seconds)
    #[clap(long, default_value_t = 90)]
    pub request_timeout_s: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_s: 90,
        }
    }
}

/// Session termination reason
#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
    /// Closed by the caller
    Cancelled,
    /// Socket closed (by the peer or transport loss)
    Closed { clean: bool, code: Option<u16> },
    /// Torn down following a fatal error
    Failed(String),
}

impl From<Termination> for Error {
    fn from(t: Termination) -> Self {
        match t {
            Termination::Cancelled => Error::Cancelled,
            Termination::Closed { clean, code } => Error::SessionClosed { clean, code },
            Termination::Failed(e) => Error::SessionFailed(e),
        }
    }
}

enum Command {
    Request {
        method: Method,
        params: Value,
        resp: oneshot::Sender<Result<Value, Error>>,
    },
    Close,
}

struct Pending {
    method: Method,
    resp: oneshot::Sender<Result<Value, Error>>,
}

/// JSON-RPC client for an established wallet session
#[derive(Debug)]
pub struct RpcClient {
    version: ProtocolVersion,
    config: RpcConfig,
    cmd_tx: mpsc::Sender<Command>,
    term_rx: watch::Receiver<Option<Termination>>,
    handle: JoinHandle<()>,
}

impl RpcClient {
    /// Start the transport task for an established session
    pub fn new(socket: Socket, session: Session, config: RpcConfig) -> Self {
        let version = session.version();

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (term_tx, term_rx) = watch::channel(None);
        let (tx, rx) = socket.split();

        let task = Transport {
            session,
            tx,
            rx,
            next_id: 1,
            pending: HashMap::new(),
        };

        let handle = tokio::task::spawn(task.run(cmd_rx, term_tx));

        Self {
            version,
            config,
            cmd_tx,
            term_rx,
            handle,
        }
    }

    /// Fetch the negotiated protocol version
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Check whether the session has terminated
    pub fn is_closed(&self) -> bool {
        self.term_rx.borrow().is_some()
    }

    /// Issue a wire request
    pub async fn send(&self, req: &WireRequest) -> Result<Value, Error> {
        self.request(req.method(), req.params()?).await
    }

    /// Issue a raw request, awaiting the response
    ///
    /// `authorize` / `reauthorize` results carrying a non-https
    /// `wallet_uri_base` are rejected.
    pub async fn request(&self, method: Method, params: Value) -> Result<Value, Error> {
        let (resp_tx, resp_rx) = oneshot::channel();

        let cmd = Command::Request {
            method,
            params,
            resp: resp_tx,
        };
        if self.cmd_tx.send(cmd).await.is_err() {
            return Err(self.termination());
        }

        let timeout = Duration::from_secs(self.config.request_timeout_s);
        let result = match tokio::time::timeout(timeout, resp_rx).await {
            Ok(Ok(r)) => r?,
            Ok(Err(_)) => return Err(self.termination()),
            Err(_) => {
                warn!("timeout waiting for {} response", method);
                return Err(Error::RequestTimeout(method));
            }
        };

        if method.is_authorization() {
            check_authorization_result(&result)?;
        }

        Ok(result)
    }

    /// Close the session, failing any outstanding requests
    pub async fn close(mut self) {
        let _ = self.cmd_tx.send(Command::Close).await;
        let _ = (&mut self.handle).await;
    }

    /// Wait for the session to terminate
    pub async fn closed(&mut self) -> Error {
        loop {
            if let Some(t) = self.term_rx.borrow().clone() {
                return t.into();
            }
            if self.term_rx.changed().await.is_err() {
                return Error::SessionClosed {
                    clean: false,
                    code: None,
                };
            }
        }
    }

    fn termination(&self) -> Error {
        match self.term_rx.borrow().clone() {
            Some(t) => t.into(),
            None => Error::SessionClosed {
                clean: false,
                code: None,
            },
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            let _ = self.cmd_tx.try_send(Command::Close);
        }
    }
}

/// Reject insecure wallet base URIs in authorization results
fn check_authorization_result(result: &Value) -> Result<(), Error> {
    match result.get("wallet_uri_base") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(s)) => match check_wallet_uri_base(s) {
            Ok(_) => Ok(()),
            Err(_) => {
                error!("wallet returned insecure wallet_uri_base: {}", s);
                Err(Error::InsecureWalletUri(s.clone()))
            }
        },
        Some(v) => Err(Error::InsecureWalletUri(v.to_string())),
    }
}

/// Transport task state
struct Transport {
    session: Session,
    tx: SocketSender,
    rx: SocketReceiver,
    next_id: u64,
    pending: HashMap<u64, Pending>,
}

impl Transport {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<Command>,
        term_tx: watch::Sender<Option<Termination>>,
    ) {
        let termination = loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Request { method, params, resp }) => {
                        if let Err(e) = self.submit(method, params, resp).await {
                            if e.is_fatal() {
                                break Termination::Failed(e.to_string());
                            }
                        }
                    }
                    Some(Command::Close) | None => {
                        self.tx.close().await;
                        break Termination::Cancelled;
                    }
                },
                frame = self.rx.recv() => match frame {
                    Frame::Data(d) => {
                        if let Err(e) = self.receive(&d) {
                            error!("session failed: {}", e);
                            self.tx.close().await;
                            break Termination::Failed(e.to_string());
                        }
                    }
                    Frame::Closed { clean, code } => {
                        debug!("session closed (clean: {}, code: {:?})", clean, code);
                        break Termination::Closed { clean, code };
                    }
                },
            }
        };

        // Outstanding requests are failed, never leaked
        for (id, p) in self.pending.drain() {
            debug!("failing pending request {} ({})", id, p.method);
            let _ = p.resp.send(Err(termination.clone().into()));
        }

        let _ = term_tx.send(Some(termination));
    }

    /// Encrypt and send a request, registering it as pending
    async fn submit(
        &mut self,
        method: Method,
        params: Value,
        resp: oneshot::Sender<Result<Value, Error>>,
    ) -> Result<(), Error> {
        // Drop entries abandoned by timed out callers
        self.pending.retain(|_, p| !p.resp.is_closed());

        let id = self.next_id;
        self.next_id += 1;

        let req = Request::new(id, method.to_string(), params);
        let encrypted = match rpc::to_bytes(&req)
            .map_err(Error::from)
            .and_then(|b| self.session.encrypt(&b).map_err(Error::from))
        {
            Ok(v) => v,
            Err(e) => {
                let fatal = e.is_fatal();
                let _ = resp.send(Err(e));
                return match fatal {
                    true => Err(Error::SessionFailed("failed to encrypt request".to_string())),
                    false => Ok(()),
                };
            }
        };

        debug!("request {} ({})", id, method);

        if let Err(e) = self.tx.send(encrypted).await {
            let _ = resp.send(Err(Error::SessionClosed {
                clean: false,
                code: None,
            }));
            return Err(e);
        }

        self.pending.insert(id, Pending { method, resp });

        Ok(())
    }

    /// Decrypt and dispatch a response, errors are fatal to the session
    fn receive(&mut self, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Err(Error::EmptyFrame);
        }

        let plaintext = self.session.decrypt(data)?;
        let rsp: Response = rpc::from_bytes(&plaintext)?;

        let id = match rsp.id {
            Some(id) => id,
            None => {
                let e = rsp
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "response without id".to_string());
                return Err(Error::SessionFailed(e));
            }
        };

        let p = match self.pending.remove(&id) {
            Some(p) => p,
            None => {
                warn!("response for unknown request {}", id);
                return Ok(());
            }
        };

        trace!("response {} ({})", id, p.method);

        let r = rsp.into_result().map_err(|e| Error::Rpc {
            method: p.method,
            code: e.code,
            message: e.message,
            data: e.data,
        });

        let _ = p.resp.send(r);

        Ok(())
    }
}
