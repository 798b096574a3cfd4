// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::time::Duration;

use log::{debug, info};
use rand_core::OsRng;
use tokio::{sync::watch, time::Instant};
use url::Url;

use mwa_core::{handshake::Event, keys::AssociationKeypair, Handshake};
use mwa_proto::{AssociationUri, ProtocolVersion, PUBLIC_KEY_LEN, REFLECTOR_PATH};

use super::{closer, connect_with_backoff, establish, Backoff, Closer, Connector, Launcher};
use crate::{
    rpc::{RpcClient, RpcConfig},
    ws::Encoding,
    Error,
};

/// Default reflector host
pub const DEFAULT_REFLECTOR: &str = "reflect.solanamobile.com";

/// Remote association configuration
#[derive(Clone, Debug, PartialEq, clap::Args)]
pub struct RemoteConfig {
    /// Reflector host (and optional port)
    #[clap(long, default_value = DEFAULT_REFLECTOR)]
    pub reflector: String,

    /// Frame encoding, base64 for relays that cannot carry binary frames
    #[clap(long, value_enum, default_value_t = Encoding::Binary)]
    pub encoding: Encoding,

    /// Connect to the reflector without TLS
    #[clap(long)]
    pub insecure_reflector: bool,

    /// Reflector connection budget (seconds)
    #[clap(long, default_value_t = 30)]
    pub reflector_timeout_s: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            reflector: DEFAULT_REFLECTOR.to_string(),
            encoding: Encoding::Binary,
            insecure_reflector: false,
            reflector_timeout_s: 30,
        }
    }
}

/// Remote association, for wallets on another device, relayed via a reflector
pub struct RemoteAssociation {
    handshake: Handshake,
    config: RemoteConfig,
    closer: Closer,
    close_rx: watch::Receiver<bool>,
}

impl std::fmt::Debug for RemoteAssociation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAssociation")
            .field("reflector", &self.config.reflector)
            .field("encoding", &self.config.encoding)
            .finish()
    }
}

impl RemoteAssociation {
    /// Create a new remote association with a fresh association key
    pub fn new(config: RemoteConfig) -> Self {
        let (closer, close_rx) = closer();

        Self {
            handshake: Handshake::remote(AssociationKeypair::generate(&mut OsRng)),
            config,
            closer,
            close_rx,
        }
    }

    /// Fetch a handle for closing the association before it connects
    pub fn closer(&self) -> Closer {
        self.closer.clone()
    }

    /// Reflector socket URL
    pub fn socket_url(&self) -> Result<Url, Error> {
        let scheme = match self.config.insecure_reflector {
            true => "ws",
            false => "wss",
        };
        let u = Url::parse(&format!(
            "{}://{}{}",
            scheme, self.config.reflector, REFLECTOR_PATH
        ))?;
        Ok(u)
    }

    /// Connect to the reflector, present the association URI once the
    /// reflector assigns an id, then complete the handshake via the relay
    pub async fn connect(
        mut self,
        launcher: &dyn Launcher,
        connector: &dyn Connector,
        rpc: &RpcConfig,
    ) -> Result<RpcClient, Error> {
        let url = self.socket_url()?;

        self.handshake.update(&Event::Connect)?;

        let deadline = Instant::now() + Duration::from_secs(self.config.reflector_timeout_s);
        let mut backoff = Backoff::new(super::DEFAULT_BACKOFF_MS);

        let mut socket = connect_with_backoff(
            connector,
            &url,
            &[self.config.encoding],
            &mut backoff,
            deadline,
            &mut self.close_rx,
        )
        .await?;

        info!("connected to reflector {}", url);

        let public_key = *self.handshake.association_public();
        let reflector = self.config.reflector.clone();

        let session = establish(
            &mut self.handshake,
            &mut socket,
            &mut self.close_rx,
            launcher,
            |id| association_url(&public_key, &reflector, id),
        )
        .await?;

        debug!("remote session established");

        Ok(RpcClient::new(socket, session, rpc.clone()))
    }
}

fn association_url(
    public_key: &[u8; PUBLIC_KEY_LEN],
    reflector: &str,
    id: &[u8],
) -> Result<Url, Error> {
    let u = AssociationUri::remote(public_key, reflector, id, ProtocolVersion::SUPPORTED)
        .to_url(None)?;
    Ok(u)
}
