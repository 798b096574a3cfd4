// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / wire definitions for Mobile Wallet Adapter sessions
//!
//! This crate provides the encodings shared by dApp (client) and wallet
//! implementations, independent of any transport or crypto backend:
//!
//! - [seq] fixed-width sequence numbers prefixed to every encrypted message
//! - [varint] variable-length integers used by the reflector
//! - [encoding] base64 / base64url / base58 helpers
//! - [handshake] unencrypted `HELLO_REQ` / `HELLO_RSP` frames
//! - [version] protocol versions and session properties
//! - [association] association URIs (local and remote)
//! - [rpc] JSON-RPC 2.0 envelopes and error codes
//! - [methods] typed method parameters and results
//! - [compat] mapping between the stable API and version-specific wire shapes
//! - [siws] canonical sign-in-with-wallet message text
//!
//! Wire encodings of handshake frames are fixed-width and big-endian,
//! all post-handshake payloads are UTF-8 JSON.
//!

pub mod association;
pub mod compat;
pub mod encoding;
pub mod handshake;
pub mod methods;
pub mod rpc;
pub mod seq;
pub mod siws;
pub mod varint;
pub mod version;

mod error;
pub use error::Error;

pub use association::AssociationUri;
pub use seq::SequenceNumber;
pub use version::{ProtocolVersion, SessionProperties};

/// Length of an uncompressed SEC1 encoded P-256 public key
pub const PUBLIC_KEY_LEN: usize = 65;

/// Length of a raw (`r || s`) P-256 ECDSA signature
pub const SIGNATURE_LEN: usize = 64;

/// Length of the AES-GCM initialisation vector
pub const IV_LEN: usize = 12;

/// Length of the AES-GCM authentication tag (128 bits)
pub const TAG_LEN: usize = 16;

/// Length of the sequence number header
pub const SEQ_LEN: usize = 4;

/// WebSocket sub-protocol for binary frames
pub const WS_PROTOCOL_BINARY: &str = "com.solana.mobilewalletadapter.v1";

/// WebSocket sub-protocol for base64 encoded text frames
pub const WS_PROTOCOL_BASE64: &str = "com.solana.mobilewalletadapter.v1.base64";

/// Path served by wallets for local associations
pub const LOCAL_PATH: &str = "/solana-wallet";

/// Path served by reflectors
pub const REFLECTOR_PATH: &str = "/reflect";
