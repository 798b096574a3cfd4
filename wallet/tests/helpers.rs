#![allow(unused)]

use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;
use tokio::task::JoinHandle;
use url::Url;

use mwa::{
    proto::{
        encoding::b64_encode,
        methods::{Account, AppIdentity, AuthorizeParams, CapabilitiesResult, SignAndSendOptions},
        rpc::RpcError,
    },
    LaunchError, Launcher, LocalAssociation, LocalConfig, MobileWallet, RpcConfig, WsConnector,
};
use mwa_wallet::{
    trust::{CallerIdentity, PackageVerifier, TrustError},
    Error, LocalWallet, WalletApp, WalletConfig,
};

/// Setup logging, level via `LOG_LEVEL`
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

pub const ACCOUNT: [u8; 32] = [0x22; 32];

pub const DAPP_URI: &str = "https://dapp.example";

/// Wallet app approving everything, signatures are fixed markers
#[derive(Clone, Debug, Default)]
pub struct TestApp;

#[async_trait]
impl WalletApp for TestApp {
    async fn authorize(&self, _req: &AuthorizeParams) -> Result<Vec<Account>, RpcError> {
        Ok(vec![Account {
            address: b64_encode(ACCOUNT),
            label: Some("test".to_string()),
            ..Default::default()
        }])
    }

    fn capabilities(&self) -> CapabilitiesResult {
        CapabilitiesResult {
            supports_sign_and_send_transactions: Some(true),
            ..Default::default()
        }
    }

    async fn sign_transactions(&self, payloads: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, RpcError> {
        Ok(payloads
            .into_iter()
            .map(|mut p| {
                p.push(0xff);
                p
            })
            .collect())
    }

    async fn sign_messages(
        &self,
        _addresses: Vec<Vec<u8>>,
        payloads: Vec<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, RpcError> {
        Ok(payloads
            .into_iter()
            .map(|mut p| {
                p.extend_from_slice(&[0xaa; 64]);
                p
            })
            .collect())
    }

    async fn sign_and_send_transactions(
        &self,
        payloads: Vec<Vec<u8>>,
        _options: Option<SignAndSendOptions>,
    ) -> Result<Vec<Vec<u8>>, RpcError> {
        Ok(payloads.iter().map(|_| vec![0xbb; 64]).collect())
    }
}

/// Verifier with a fixed answer
#[derive(Clone, Debug)]
pub struct FixedVerifier(pub bool);

#[async_trait]
impl PackageVerifier for FixedVerifier {
    async fn verify(&self, _package: &str, _identity_uri: &Url) -> Result<bool, TrustError> {
        Ok(self.0)
    }
}

/// Calling application with a uid that may change between calls
#[derive(Debug)]
pub struct TestCaller {
    uid: AtomicU32,
}

impl TestCaller {
    pub fn new(uid: u32) -> Arc<Self> {
        Arc::new(Self {
            uid: AtomicU32::new(uid),
        })
    }

    pub fn set_uid(&self, uid: u32) {
        self.uid.store(uid, Ordering::SeqCst);
    }
}

impl CallerIdentity for TestCaller {
    fn package(&self) -> Result<String, TrustError> {
        Ok("com.example.dapp".to_string())
    }

    fn uid(&self) -> Result<u32, TrustError> {
        Ok(self.uid.load(Ordering::SeqCst))
    }
}

/// Launcher starting a [LocalWallet] for each association URI
pub struct WalletLauncher {
    wallet: LocalWallet,
    caller: Option<Arc<dyn CallerIdentity>>,
    tasks: Mutex<Vec<JoinHandle<Result<(), Error>>>>,
}

impl WalletLauncher {
    pub fn new(wallet: LocalWallet, caller: Option<Arc<dyn CallerIdentity>>) -> Self {
        Self {
            wallet,
            caller,
            tasks: Mutex::new(vec![]),
        }
    }

    /// Await the most recently launched wallet session
    pub async fn finish(&self) -> Result<(), Error> {
        let h = self.tasks.lock().unwrap().pop().expect("no wallet launched");
        h.await.unwrap()
    }
}

#[async_trait]
impl Launcher for WalletLauncher {
    async fn launch(&self, uri: &Url) -> Result<(), LaunchError> {
        debug!("launching wallet for {}", uri);

        let wallet = self.wallet.clone();
        let caller = self.caller.clone();
        let uri = uri.clone();

        let h = tokio::spawn(async move { wallet.serve(&uri, caller).await });
        self.tasks.lock().unwrap().push(h);

        Ok(())
    }
}

/// Create a local association on a free loopback port
pub fn association() -> LocalAssociation {
    loop {
        let a = LocalAssociation::new(LocalConfig {
            backoff_ms: vec![10, 20, 50],
            connect_timeout_s: 5,
            ..Default::default()
        })
        .unwrap();

        if portpicker::is_free(a.port()) {
            return a;
        }
    }
}

/// Connect a dApp to a wallet over a loopback websocket
pub async fn connect(launcher: &WalletLauncher) -> Result<MobileWallet, mwa::Error> {
    let c = association()
        .connect(launcher, &WsConnector, &RpcConfig::default())
        .await?;

    Ok(MobileWallet::new(c))
}

pub fn identity(uri: &str) -> Option<AppIdentity> {
    Some(AppIdentity {
        name: Some("test dapp".to_string()),
        uri: Some(uri.to_string()),
        icon: None,
    })
}

pub fn short_accept() -> WalletConfig {
    WalletConfig {
        accept_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}
