// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Association strategies
//!
//! An association produces a reachable wallet endpoint and a connected
//! socket, then drives the [Handshake] to obtain a [Session]:
//!
//! - [LocalAssociation] launches a co-located wallet via a [Launcher] and
//!   connects to it on a loopback port, retrying per a backoff schedule
//! - [RemoteAssociation] connects to a reflector, presents the association
//!   URI (e.g. as a QR code) once a relay id is assigned, and completes the
//!   handshake through the relay

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, info};
use tokio::{sync::watch, time::Instant};
use url::Url;

use mwa_core::{
    handshake::{Event, Output},
    Handshake, Session,
};

use crate::{
    rpc::{RpcClient, RpcConfig},
    socket::{Frame, Socket},
    ws::{self, Encoding},
    Error,
};

mod local;
pub use local::{LocalAssociation, LocalConfig};

mod remote;
pub use remote::{RemoteAssociation, RemoteConfig, DEFAULT_REFLECTOR};

/// Default connection retry schedule (milliseconds, the last value repeats)
pub const DEFAULT_BACKOFF_MS: &[u64] = &[150, 150, 200, 500, 500, 750, 750, 1000];

/// Platform launcher errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LaunchError {
    /// No installed application can handle the association URI
    #[error("no compatible wallet found")]
    NotFound,
    /// Launch failed for another reason
    #[error("launch failed: {0}")]
    Failed(String),
}

/// Platform launcher, presents association URIs to wallets
/// (launching an intent, or displaying a QR code for remote associations)
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, uri: &Url) -> Result<(), LaunchError>;
}

#[async_trait]
impl<T: Launcher + ?Sized> Launcher for Arc<T> {
    async fn launch(&self, uri: &Url) -> Result<(), LaunchError> {
        T::launch(self, uri).await
    }
}

/// Socket connector, abstract over WebSocket / in-memory sockets
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url, encodings: &[Encoding]) -> Result<Socket, Error>;
}

/// WebSocket [Connector]
#[derive(Clone, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url, encodings: &[Encoding]) -> Result<Socket, Error> {
        ws::connect(url, encodings).await
    }
}

/// Connection retry schedule, the final delay repeats
#[derive(Clone, Debug)]
pub struct Backoff {
    schedule: Vec<Duration>,
    index: usize,
}

impl Backoff {
    /// Create a backoff from a schedule in milliseconds
    pub fn new(schedule_ms: &[u64]) -> Self {
        let schedule = match schedule_ms.is_empty() {
            true => DEFAULT_BACKOFF_MS,
            false => schedule_ms,
        };

        Self {
            schedule: schedule.iter().map(|v| Duration::from_millis(*v)).collect(),
            index: 0,
        }
    }

    /// Fetch the next delay
    pub fn next_delay(&mut self) -> Duration {
        let i = self.index.min(self.schedule.len() - 1);
        self.index = self.index.saturating_add(1);
        self.schedule[i]
    }
}

/// Handle for closing an association before it connects
#[derive(Clone, Debug)]
pub struct Closer(Arc<watch::Sender<bool>>);

impl Closer {
    /// Close the association, a pending connection fails with
    /// [Error::ClosedBeforeConnection]
    pub fn close(&self) {
        let _ = self.0.send(true);
    }
}

pub(crate) fn closer() -> (Closer, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (Closer(Arc::new(tx)), rx)
}

/// Resolves once the association is closed (never if the [Closer] is dropped)
async fn wait_closed(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

/// Association, local or remote
#[derive(Debug)]
pub enum Association {
    Local(LocalAssociation),
    Remote(RemoteAssociation),
}

impl Association {
    /// Fetch a handle for closing this association before it connects
    pub fn closer(&self) -> Closer {
        match self {
            Association::Local(a) => a.closer(),
            Association::Remote(a) => a.closer(),
        }
    }

    /// Connect to the wallet, returning an RPC client for the session
    pub async fn connect(
        self,
        launcher: &dyn Launcher,
        connector: &dyn Connector,
        rpc: &RpcConfig,
    ) -> Result<RpcClient, Error> {
        match self {
            Association::Local(a) => a.connect(launcher, connector, rpc).await,
            Association::Remote(a) => a.connect(launcher, connector, rpc).await,
        }
    }
}

impl From<LocalAssociation> for Association {
    fn from(a: LocalAssociation) -> Self {
        Association::Local(a)
    }
}

impl From<RemoteAssociation> for Association {
    fn from(a: RemoteAssociation) -> Self {
        Association::Remote(a)
    }
}

/// Open a socket, retrying retryable failures per the backoff schedule
/// until the deadline
pub(crate) async fn connect_with_backoff(
    connector: &dyn Connector,
    url: &Url,
    encodings: &[Encoding],
    backoff: &mut Backoff,
    deadline: Instant,
    close: &mut watch::Receiver<bool>,
) -> Result<Socket, Error> {
    let mut attempt = 0;

    loop {
        attempt += 1;

        let r = tokio::select! {
            r = tokio::time::timeout_at(deadline, connector.connect(url, encodings)) => r,
            _ = wait_closed(close) => return Err(Error::ClosedBeforeConnection),
        };

        let e = match r {
            Ok(Ok(s)) => return Ok(s),
            Ok(Err(e)) if e.is_retryable() => e,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(Error::ConnectionTimeout),
        };

        let delay = backoff.next_delay();
        if Instant::now() + delay >= deadline {
            debug!("connection attempt {} failed: {}, budget exhausted", attempt, e);
            return Err(Error::ConnectionTimeout);
        }

        debug!(
            "connection attempt {} failed: {}, retrying in {:?}",
            attempt, e, delay
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => (),
            _ = wait_closed(close) => return Err(Error::ClosedBeforeConnection),
        }
    }
}

/// Drive the handshake over an open socket until connected,
/// presenting a remote association URI when the reflector assigns an id
pub(crate) async fn establish<F>(
    handshake: &mut Handshake,
    socket: &mut Socket,
    close: &mut watch::Receiver<bool>,
    launcher: &dyn Launcher,
    uri_for_id: F,
) -> Result<Session, Error>
where
    F: Fn(&[u8]) -> Result<Url, Error> + Send + Sync,
{
    let mut out = handshake.update(&Event::Opened)?;

    loop {
        match out {
            Output::None => (),
            Output::Send(b) => socket.send(b).await?,
            Output::ReflectorId(id) => {
                let uri = uri_for_id(&id)?;
                info!("presenting association uri: {}", uri);
                launcher.launch(&uri).await?;
            }
            Output::Connected(s) => return Ok(s),
        }

        let frame = tokio::select! {
            f = socket.recv() => f,
            _ = wait_closed(close) => {
                socket.close().await;
                return Err(Error::ClosedBeforeConnection);
            }
        };

        out = match frame {
            Frame::Data(d) => handshake.update(&Event::Frame(&d))?,
            Frame::Closed { clean, code } => {
                let _ = handshake.update(&Event::Closed);

                debug!(
                    "socket closed before connection (clean: {}, code: {:?})",
                    clean, code
                );

                return Err(match clean {
                    true => Error::SessionDeclined,
                    false => Error::Transport("socket closed before connection".to_string()),
                });
            }
        };
    }
}
