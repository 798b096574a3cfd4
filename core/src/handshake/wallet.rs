// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::Decode;
use rand_core::CryptoRngCore;

use mwa_proto::{
    association::AssociationUri,
    handshake::{HelloReq, HelloRsp},
    ProtocolVersion, SessionProperties, PUBLIC_KEY_LEN,
};

use crate::{
    cipher::SessionCipher,
    keys::{verify_hello, EphemeralKeypair},
    Error, Session,
};

/// Wallet side of the handshake, responding to a single `HELLO_REQ`
#[derive(Clone, Debug)]
pub struct WalletHandshake {
    association_public: [u8; PUBLIC_KEY_LEN],
    offered: Vec<ProtocolVersion>,
    supported: Vec<ProtocolVersion>,
}

impl WalletHandshake {
    /// Create a responder for the association key and the protocol
    /// versions offered by the dApp
    pub fn new(association_public: [u8; PUBLIC_KEY_LEN], offered: &[ProtocolVersion]) -> Self {
        Self {
            association_public,
            offered: offered.to_vec(),
            supported: ProtocolVersion::SUPPORTED.to_vec(),
        }
    }

    /// Create a responder from a parsed association URI
    pub fn from_uri(uri: &AssociationUri) -> Result<Self, Error> {
        Ok(Self::new(uri.public_key()?, uri.versions()))
    }

    /// Restrict the versions this wallet will negotiate
    pub fn with_supported(mut self, supported: &[ProtocolVersion]) -> Self {
        self.supported = supported.to_vec();
        self
    }

    /// Verify the hello, complete key agreement, and build the `HELLO_RSP`
    ///
    /// Where the dApp offered protocol versions the highest common version
    /// is sent as encrypted session properties (outbound sequence 1),
    /// otherwise the session is `legacy` and no properties are sent.
    pub fn respond(
        &self,
        hello: &[u8],
        rng: &mut impl CryptoRngCore,
    ) -> Result<(Vec<u8>, Session), Error> {
        let (req, _) = HelloReq::decode(hello)?;
        verify_hello(&self.association_public, &req)?;

        let ephemeral = EphemeralKeypair::generate(rng);
        let secret = ephemeral.agree(&req.public_key, &self.association_public)?;
        let mut cipher = SessionCipher::new(secret);

        let (version, props) = match self.offered.is_empty() {
            true => (ProtocolVersion::Legacy, None),
            false => {
                let v = ProtocolVersion::negotiate(&self.supported, &self.offered)
                    .ok_or(Error::NoCommonVersion)?;

                let p = SessionProperties {
                    protocol_version: v,
                }
                .to_json()?;

                (v, Some(cipher.encrypt(&p)?))
            }
        };

        #[cfg(feature = "log")]
        log::debug!("responding to hello (protocol version: {})", version);

        let rsp = HelloRsp {
            public_key: *ephemeral.public_key(),
            session_properties: props.as_deref(),
        };

        Ok((rsp.to_vec(), Session::new(cipher, version)))
    }
}
