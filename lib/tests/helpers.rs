#![allow(unused)]

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use rand_core::OsRng;
use serde_json::{json, Value};
use simplelog::SimpleLogger;
use tokio::sync::mpsc;
use url::Url;

use mwa::{
    engine::{handshake::WalletHandshake, Session},
    proto::{
        encoding::b64_encode,
        rpc::{self, Request, Response, RpcError},
        varint::encode_varint,
        AssociationUri, ProtocolVersion,
    },
    socket::{Frame, Socket},
    ws::Encoding,
    Connector, Error, LaunchError, Launcher,
};

/// Setup logging, level via `LOG_LEVEL`
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

pub type Handler = Arc<dyn Fn(&str, &Value) -> Result<Value, RpcError> + Send + Sync>;

/// Request handler returning canned results
pub fn default_handler(wallet_uri_base: &str) -> Handler {
    let base = wallet_uri_base.to_string();

    Arc::new(move |method, _params| match method {
        "authorize" | "reauthorize" => Ok(json!({
            "accounts": [{ "address": b64_encode([0x11u8; 32]) }],
            "auth_token": "tok1",
            "wallet_uri_base": base,
        })),
        "deauthorize" => Ok(json!({})),
        "get_capabilities" => Ok(json!({
            "max_transactions_per_request": 10,
            "max_messages_per_request": 10,
            "supported_transaction_versions": ["legacy", 0],
            "features": ["solana:signTransactions"],
        })),
        "sign_transactions" | "sign_messages" => Ok(json!({
            "signed_payloads": [b64_encode(b"signed")],
        })),
        "sign_and_send_transactions" => Ok(json!({ "signatures": [b64_encode([0u8; 64])] })),
        m => Err(RpcError::new(rpc::ERROR_METHOD_NOT_FOUND, format!("unknown method {m}"))),
    })
}

/// Wallet behaviour options
#[derive(Clone, Debug)]
pub struct WalletOpts {
    /// Versions the wallet supports
    pub supported: Vec<ProtocolVersion>,
    /// Ping before accepting the hello
    pub ping: bool,
    /// Close the socket rather than completing the handshake
    pub decline: bool,
    /// Skip a sequence number before the first response
    pub skip_seq: bool,
    /// Drop the socket (without closing) after this many responses
    pub hangup_after: Option<usize>,
}

impl Default for WalletOpts {
    fn default() -> Self {
        Self {
            supported: ProtocolVersion::SUPPORTED.to_vec(),
            ping: false,
            decline: false,
            skip_seq: false,
            hangup_after: None,
        }
    }
}

/// In-memory wallet, acting as both platform launcher and socket connector
pub struct TestWallet {
    remote: Option<Vec<u8>>,
    opts: WalletOpts,
    handler: Handler,
    dapp: Mutex<Option<Socket>>,
    wallet: Mutex<Option<Socket>>,
    launched: Mutex<Vec<Url>>,
    found: bool,
}

impl TestWallet {
    /// Local wallet
    pub fn local(opts: WalletOpts, handler: Handler) -> Arc<Self> {
        Arc::new(Self {
            remote: None,
            opts,
            handler,
            dapp: Mutex::new(None),
            wallet: Mutex::new(None),
            launched: Mutex::new(vec![]),
            found: true,
        })
    }

    /// Wallet via a reflector assigning the provided id
    pub fn remote(id: &[u8], opts: WalletOpts, handler: Handler) -> Arc<Self> {
        Arc::new(Self {
            remote: Some(id.to_vec()),
            opts,
            handler,
            dapp: Mutex::new(None),
            wallet: Mutex::new(None),
            launched: Mutex::new(vec![]),
            found: true,
        })
    }

    /// No wallet installed
    pub fn missing() -> Arc<Self> {
        Arc::new(Self {
            remote: None,
            opts: WalletOpts::default(),
            handler: default_handler("https://wallet.example"),
            dapp: Mutex::new(None),
            wallet: Mutex::new(None),
            launched: Mutex::new(vec![]),
            found: false,
        })
    }

    /// Fetch launched association URIs
    pub fn launched(&self) -> Vec<Url> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Launcher for TestWallet {
    async fn launch(&self, uri: &Url) -> Result<(), LaunchError> {
        self.launched.lock().unwrap().push(uri.clone());

        if !self.found {
            return Err(LaunchError::NotFound);
        }

        let a = AssociationUri::parse(uri).map_err(|e| LaunchError::Failed(e.to_string()))?;
        let h = WalletHandshake::from_uri(&a)
            .map_err(|e| LaunchError::Failed(e.to_string()))?
            .with_supported(&self.opts.supported);

        let socket = match (&a, &self.remote) {
            (AssociationUri::Local { .. }, None) => {
                let (dapp, wallet) = Socket::pair();
                *self.dapp.lock().unwrap() = Some(dapp);
                wallet
            }
            (AssociationUri::Remote { id, .. }, Some(expected)) => {
                assert_eq!(id, expected);

                // Reflector notifies the dApp that the wallet joined
                let wallet = self.wallet.lock().unwrap().take().unwrap();
                wallet.send(vec![]).await.unwrap();
                wallet
            }
            _ => panic!("unexpected association uri: {uri}"),
        };

        tokio::spawn(serve(socket, h, self.opts.clone(), self.handler.clone()));

        Ok(())
    }
}

#[async_trait]
impl Connector for TestWallet {
    async fn connect(&self, url: &Url, encodings: &[Encoding]) -> Result<Socket, Error> {
        debug!("connect {} ({:?})", url, encodings);

        if let Some(id) = &self.remote {
            let (dapp, wallet) = Socket::pair();

            let mut f = encode_varint(id.len() as u64);
            f.extend_from_slice(id);
            wallet.send(f).await?;

            *self.wallet.lock().unwrap() = Some(wallet);
            return Ok(dapp);
        }

        match self.dapp.lock().unwrap().take() {
            Some(s) => Ok(s),
            None => Err(Error::Transport("connection refused".to_string())),
        }
    }
}

/// Serve a single session over the provided socket
pub async fn serve(mut socket: Socket, h: WalletHandshake, opts: WalletOpts, handler: Handler) {
    if opts.ping {
        let _ = socket.send(vec![]).await;
    }

    let hello = match socket.recv().await {
        Frame::Data(d) => d,
        Frame::Closed { .. } => return,
    };

    if opts.decline {
        socket.close().await;
        return;
    }

    let (rsp, mut session) = match h.respond(&hello, &mut OsRng) {
        Ok(v) => v,
        Err(e) => {
            debug!("handshake failed: {}", e);
            socket.close().await;
            return;
        }
    };
    let _ = socket.send(rsp).await;

    let mut skip = opts.skip_seq;
    let mut responses = 0;

    loop {
        if Some(responses) == opts.hangup_after {
            debug!("wallet hanging up");
            return;
        }

        let d = match socket.recv().await {
            Frame::Data(d) if d == hello => continue,
            Frame::Data(d) => d,
            Frame::Closed { .. } => return,
        };

        let req: Request = match session.decrypt(&d).map(|p| rpc::from_bytes(&p)) {
            Ok(Ok(r)) => r,
            _ => return,
        };

        debug!("wallet request {}: {}", req.id, req.method);

        let rsp = match (handler)(&req.method, &req.params) {
            Ok(v) => Response::ok(req.id, v),
            Err(e) => Response::err(Some(req.id), e),
        };

        let b = rpc::to_bytes(&rsp).unwrap();

        // Burn a sequence number so the dApp observes a gap
        if skip {
            let _ = session.encrypt(&[]).unwrap();
            skip = false;
        }

        let m = session.encrypt(&b).unwrap();
        if socket.send(m).await.is_err() {
            return;
        }
        responses += 1;
    }
}
