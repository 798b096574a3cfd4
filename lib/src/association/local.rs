// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::time::Duration;

use log::{debug, info};
use rand::Rng;
use rand_core::OsRng;
use tokio::{sync::watch, time::Instant};
use url::Url;

use mwa_core::{handshake::Event, keys::AssociationKeypair, Handshake};
use mwa_proto::{
    association::{check_wallet_uri_base, LOCAL_PORT_RANGE},
    AssociationUri, ProtocolVersion, LOCAL_PATH,
};

use super::{closer, connect_with_backoff, establish, Backoff, Closer, Connector, Launcher};
use crate::{
    rpc::{RpcClient, RpcConfig},
    ws::Encoding,
    Error,
};

/// Local association configuration
#[derive(Clone, Debug, PartialEq, clap::Args)]
pub struct LocalConfig {
    /// Connection retry schedule (milliseconds, the last value repeats)
    #[clap(long, value_delimiter = ',', default_values_t = super::DEFAULT_BACKOFF_MS.to_vec())]
    pub backoff_ms: Vec<u64>,

    /// Total connection budget (seconds)
    #[clap(long, default_value_t = 30)]
    pub connect_timeout_s: u64,

    /// Wallet base URI (https) from a previous authorization
    #[clap(long)]
    pub wallet_uri_base: Option<Url>,

    /// Loopback port (random in the dynamic range by default)
    #[clap(long)]
    pub port: Option<u16>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            backoff_ms: super::DEFAULT_BACKOFF_MS.to_vec(),
            connect_timeout_s: 30,
            wallet_uri_base: None,
            port: None,
        }
    }
}

/// Local association, for wallets on the same device
pub struct LocalAssociation {
    handshake: Handshake,
    port: u16,
    uri: Url,
    config: LocalConfig,
    closer: Closer,
    close_rx: watch::Receiver<bool>,
}

impl std::fmt::Debug for LocalAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAssociation")
            .field("port", &self.port)
            .field("uri", &self.uri.as_str())
            .finish()
    }
}

impl LocalAssociation {
    /// Create a new local association with a fresh association key
    pub fn new(config: LocalConfig) -> Result<Self, Error> {
        let port = match config.port {
            Some(p) => p,
            None => OsRng.gen_range(LOCAL_PORT_RANGE),
        };

        let association = AssociationKeypair::generate(&mut OsRng);

        let base = match &config.wallet_uri_base {
            Some(b) => Some(
                check_wallet_uri_base(b.as_str())
                    .map_err(|_| Error::InsecureWalletUri(b.to_string()))?,
            ),
            None => None,
        };

        let uri = AssociationUri::local(
            &association.public_key(),
            port,
            ProtocolVersion::SUPPORTED,
        )?
        .to_url(base.as_ref())?;

        let (closer, close_rx) = closer();

        Ok(Self {
            handshake: Handshake::local(association),
            port,
            uri,
            config,
            closer,
            close_rx,
        })
    }

    /// Fetch the launchable association URI
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Fetch the loopback port the wallet will listen on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Fetch a handle for closing the association before it connects
    pub fn closer(&self) -> Closer {
        self.closer.clone()
    }

    /// Loopback socket URL
    pub fn socket_url(&self) -> Result<Url, Error> {
        let u = Url::parse(&format!("ws://localhost:{}{}", self.port, LOCAL_PATH))?;
        Ok(u)
    }

    /// Launch the wallet, connect and complete the handshake
    pub async fn connect(
        mut self,
        launcher: &dyn Launcher,
        connector: &dyn Connector,
        rpc: &RpcConfig,
    ) -> Result<RpcClient, Error> {
        let url = self.socket_url()?;

        info!("launching wallet: {}", self.uri);
        launcher.launch(&self.uri).await?;

        self.handshake.update(&Event::Connect)?;

        let deadline = Instant::now() + Duration::from_secs(self.config.connect_timeout_s);
        let mut backoff = Backoff::new(&self.config.backoff_ms);

        let mut socket = connect_with_backoff(
            connector,
            &url,
            &[Encoding::Binary],
            &mut backoff,
            deadline,
            &mut self.close_rx,
        )
        .await?;

        debug!("connected to {}", url);

        let handshake = establish(
            &mut self.handshake,
            &mut socket,
            &mut self.close_rx,
            launcher,
            |_| Err(Error::UnexpectedResponse),
        );

        let session = match tokio::time::timeout_at(deadline, handshake).await {
            Ok(r) => r?,
            Err(_) => {
                socket.close().await;
                return Err(Error::ConnectionTimeout);
            }
        };

        Ok(RpcClient::new(socket, session, rpc.clone()))
    }
}
