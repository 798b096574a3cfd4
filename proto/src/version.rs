// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol versions and session properties

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::Error;

/// Protocol version, resolved once during the handshake
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumVariantNames,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum ProtocolVersion {
    /// Pre-versioning wallets, `cluster` based authorization
    #[default]
    #[strum(serialize = "legacy")]
    #[serde(rename = "legacy")]
    Legacy,

    /// Chain based authorization, feature flag capabilities, sign-in support
    #[strum(serialize = "v1")]
    #[serde(rename = "v1")]
    V1,
}

impl ProtocolVersion {
    /// All versions supported by this implementation
    pub const SUPPORTED: &'static [ProtocolVersion] = &[ProtocolVersion::Legacy, ProtocolVersion::V1];

    /// Parse a version string as found in association URIs
    pub fn parse(s: &str) -> Result<Self, Error> {
        s.parse().map_err(|_| Error::UnsupportedVersion(s.to_string()))
    }

    /// Select the highest version present in both lists
    pub fn negotiate(ours: &[ProtocolVersion], theirs: &[ProtocolVersion]) -> Option<Self> {
        ours.iter().filter(|v| theirs.contains(v)).max().copied()
    }
}

/// Session properties, exchanged once immediately after key agreement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionProperties {
    /// Negotiated protocol version
    #[serde(rename = "v")]
    pub protocol_version: ProtocolVersion,
}

impl SessionProperties {
    /// Encode to JSON
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from JSON
    pub fn from_json(b: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(b)?)
    }
}
