// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Mobile Wallet Adapter client library (and CLI)
//!
//! Associates with a wallet (locally via a platform [Launcher], or remotely
//! via a reflector), completes the session handshake and exposes the wallet
//! API through [MobileWallet], independent of the negotiated protocol
//! version.
//!
//! See [transact] for a complete session.

pub mod association;
pub use association::{
    Association, Connector, LaunchError, Launcher, LocalAssociation, LocalConfig,
    RemoteAssociation, RemoteConfig, WsConnector,
};

mod error;
pub use error::Error;

mod launcher;
pub use launcher::{AdbLauncher, LogLauncher};

mod proxy;
pub use proxy::MobileWallet;

pub mod rpc;
pub use rpc::{RpcClient, RpcConfig};

pub mod socket;

mod transact;
pub use transact::transact;

pub mod ws;

/// Re-export protocol definitions for consumers
pub use mwa_proto as proto;

/// Re-export session engine for consumers
pub use mwa_core as engine;
