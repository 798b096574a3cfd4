// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{net::Ipv4Addr, sync::Arc};

use log::{debug, info};
use tokio::net::TcpListener;
use url::Url;

use mwa::ws::{self, Encoding};
use mwa_core::handshake::{AssociationKind, WalletHandshake};
use mwa_proto::{AssociationUri, LOCAL_PATH};

use crate::{
    permit::ConnectionPermit,
    server::{accept_session, WalletApp, WalletConfig, WalletSession},
    store::AuthorizationStore,
    trust::{CallerIdentity, PackageVerifier, TrustEngine},
    Error,
};

/// Local association listener, serving one session per association URI
#[derive(Clone)]
pub struct LocalWallet {
    app: Arc<dyn WalletApp>,
    verifier: Arc<dyn PackageVerifier>,
    store: AuthorizationStore,
    permit: ConnectionPermit,
    config: WalletConfig,
}

impl LocalWallet {
    pub fn new(
        app: Arc<dyn WalletApp>,
        verifier: Arc<dyn PackageVerifier>,
        config: WalletConfig,
    ) -> Self {
        Self {
            app,
            verifier,
            store: AuthorizationStore::default(),
            permit: ConnectionPermit::default(),
            config,
        }
    }

    /// Share an authorization store (e.g. with remote sessions)
    pub fn with_store(mut self, store: AuthorizationStore) -> Self {
        self.store = store;
        self
    }

    /// Share a connection permit
    pub fn with_permit(mut self, permit: ConnectionPermit) -> Self {
        self.permit = permit;
        self
    }

    pub fn store(&self) -> &AuthorizationStore {
        &self.store
    }

    /// Serve a single session for a local association URI, with the calling
    /// application identity where supplied by the platform
    pub async fn serve(
        &self,
        uri: &Url,
        caller: Option<Arc<dyn CallerIdentity>>,
    ) -> Result<(), Error> {
        let association = AssociationUri::parse(uri)?;
        let port = match &association {
            AssociationUri::Local { port, .. } => *port,
            AssociationUri::Remote { .. } => return Err(Error::NotLocal),
        };

        let handshake = WalletHandshake::from_uri(&association)?.with_supported(&self.config.supported);

        // Held until the session ends, on every exit path
        let _permit = self.permit.acquire().await;

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;

        info!("listening on {}", listener.local_addr()?);

        let (stream, addr) =
            match tokio::time::timeout(self.config.accept_timeout, listener.accept()).await {
                Ok(r) => r?,
                Err(_) => return Err(Error::ClosedBeforeConnection),
            };
        drop(listener);

        debug!("connection from {}", addr);

        let mut socket = ws::accept(stream, LOCAL_PATH, &[Encoding::Binary, Encoding::Base64]).await?;

        let (session, hello) = accept_session(&mut socket, &handshake).await?;

        let trust = TrustEngine::new(
            AssociationKind::Local,
            caller,
            self.verifier.clone(),
            self.config.trust.clone(),
        );

        WalletSession::new(
            session,
            trust,
            self.store.clone(),
            self.app.clone(),
            self.config.clone(),
        )
        .with_hello(hello)
        .run(socket)
        .await
    }
}
