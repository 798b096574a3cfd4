// Copyright (c) 2022-2023 The MobileCoin Foundation

use futures::future::BoxFuture;
use log::{debug, warn};

use crate::{
    association::{Association, Connector, Launcher},
    proxy::MobileWallet,
    rpc::RpcConfig,
    Error,
};

/// Run a single wallet session: associate, connect, execute `f` against the
/// wallet, then tear the session down (on every exit path)
///
/// ```no_run
/// # use mwa::{*, association::*, proto::compat::AuthorizeRequest};
/// # async fn f() -> Result<(), Error> {
/// let association = LocalAssociation::new(LocalConfig::default())?;
///
/// let auth = transact(
///     association.into(),
///     &LogLauncher,
///     &WsConnector,
///     &RpcConfig::default(),
///     |wallet| Box::pin(async move { wallet.authorize(AuthorizeRequest::default()).await }),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn transact<T, F>(
    association: Association,
    launcher: &dyn Launcher,
    connector: &dyn Connector,
    rpc: &RpcConfig,
    f: F,
) -> Result<T, Error>
where
    F: for<'a> FnOnce(&'a MobileWallet) -> BoxFuture<'a, Result<T, Error>>,
{
    let client = association.connect(launcher, connector, rpc).await?;
    let wallet = MobileWallet::new(client);

    let r = f(&wallet).await;

    match &r {
        Ok(_) => debug!("transaction complete, closing session"),
        Err(e) => warn!("transaction failed: {}", e),
    }

    wallet.close().await;

    r
}
