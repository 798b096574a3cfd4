// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Mobile Wallet Adapter session engine
//!
//! This provides the transport-independent core of a session:
//!
//! - [keys] P-256 association and ephemeral keys, hello signing / verification
//! - [cipher] session key derivation and the sequenced AES-GCM channel
//! - [handshake] the dApp [Handshake] state machine and the wallet responder
//!
//! The [Handshake] is driven by socket [Event][handshake::Event]s and returns
//! [Output][handshake::Output]s, on reaching `connected` it yields a [Session]
//! owning the session key and sequence counters.
//!
//! ## Handshake
//!
//! 1. The dApp generates an [AssociationKeypair][keys::AssociationKeypair] and
//!    presents the public key out-of-band via an association URI
//! 2. Once the socket is ready the dApp sends `HELLO_REQ`: a fresh ephemeral
//!    ECDH public key signed by the association key
//! 3. The wallet verifies the signature and responds with `HELLO_RSP`: its own
//!    ephemeral public key and optional encrypted session properties
//! 4. Both sides derive the session key via ECDH and HKDF-SHA256, salted with
//!    the association public key
//!

pub mod cipher;

pub mod handshake;
pub use handshake::Handshake;

pub mod keys;

mod session;
pub use session::Session;

mod error;
pub use error::Error;

pub use mwa_proto as proto;
