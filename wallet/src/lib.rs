// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Mobile Wallet Adapter wallet side
//!
//! Serves dApp sessions for a [WalletApp], admitting requests through the
//! [trust] engine:
//!
//! - `authorize` / `reauthorize` verify the request source and issue (or
//!   check) an [AuthorizationScope](trust::AuthorizationScope)
//! - `sign_*` methods require an authorization whose scope admits the
//!   current caller
//!
//! Only one session is served at a time, see [ConnectionPermit].

mod error;
pub use error::Error;

mod local;
pub use local::LocalWallet;

mod permit;
pub use permit::ConnectionPermit;

pub mod server;
pub use server::{WalletApp, WalletConfig, WalletSession};

mod store;
pub use store::{AuthRecord, AuthorizationStore};

pub mod trust;
