// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Association URIs, presented out-of-band (platform launch or QR code)
//! to connect a dApp and wallet prior to the cryptographic handshake.
//!
//! ```text
//! solana-wallet:/v1/associate/local?association=<token>&port=<port>&v=legacy&v=v1
//! solana-wallet:/v1/associate/remote?association=<token>&reflector=<host>&id=<id>&v=v1
//! ```
//!
//! Where a wallet has previously supplied a `wallet_uri_base`, this (https only)
//! base replaces the `solana-wallet:` scheme.

use url::Url;

use crate::{
    encoding::{b64url_decode, b64url_encode},
    Error, ProtocolVersion, PUBLIC_KEY_LEN,
};

/// Default association scheme
pub const ASSOCIATION_SCHEME: &str = "solana-wallet";

/// Path prefix for association URIs
pub const ASSOCIATION_PATH: &str = "/v1/associate";

/// Dynamic (ephemeral) port range for local associations
pub const LOCAL_PORT_RANGE: core::ops::RangeInclusive<u16> = 49152..=65535;

const PARAM_ASSOCIATION: &str = "association";
const PARAM_PORT: &str = "port";
const PARAM_REFLECTOR: &str = "reflector";
const PARAM_ID: &str = "id";
const PARAM_VERSION: &str = "v";

/// Parse and check a wallet-supplied base URI, only `https` is accepted
pub fn check_wallet_uri_base(uri: &str) -> Result<Url, Error> {
    let u = Url::parse(uri)?;
    if u.scheme() != "https" {
        return Err(Error::InvalidUri(format!("insecure wallet uri base: {uri}")));
    }
    Ok(u)
}

/// Association endpoint description
#[derive(Clone, Debug, PartialEq)]
pub enum AssociationUri {
    /// Co-located wallet, reachable on a loopback port
    Local {
        /// base64url encoded association public key
        association: String,
        /// Port the wallet should listen on
        port: u16,
        /// Protocol versions supported by the dApp
        versions: Vec<ProtocolVersion>,
    },
    /// Cross-device wallet, relayed via a reflector
    Remote {
        /// base64url encoded association public key
        association: String,
        /// Reflector host (and optional port)
        reflector: String,
        /// Relay identifier assigned by the reflector
        id: Vec<u8>,
        /// Protocol versions supported by the dApp
        versions: Vec<ProtocolVersion>,
    },
}

impl AssociationUri {
    /// Build a local association URI for the provided association public key
    pub fn local(
        public_key: &[u8; PUBLIC_KEY_LEN],
        port: u16,
        versions: &[ProtocolVersion],
    ) -> Result<Self, Error> {
        if !LOCAL_PORT_RANGE.contains(&port) {
            return Err(Error::InvalidPort(port));
        }

        Ok(Self::Local {
            association: b64url_encode(public_key),
            port,
            versions: versions.to_vec(),
        })
    }

    /// Build a remote association URI for the provided association public key
    pub fn remote(
        public_key: &[u8; PUBLIC_KEY_LEN],
        reflector: &str,
        id: &[u8],
        versions: &[ProtocolVersion],
    ) -> Self {
        Self::Remote {
            association: b64url_encode(public_key),
            reflector: reflector.to_string(),
            id: id.to_vec(),
            versions: versions.to_vec(),
        }
    }

    /// Fetch the association token
    pub fn association(&self) -> &str {
        match self {
            Self::Local { association, .. } | Self::Remote { association, .. } => association,
        }
    }

    /// Decode the association public key from the association token
    pub fn public_key(&self) -> Result<[u8; PUBLIC_KEY_LEN], Error> {
        let b = b64url_decode(self.association())?;

        b.as_slice().try_into().map_err(|_| Error::InvalidLength {
            expected: PUBLIC_KEY_LEN,
            actual: b.len(),
        })
    }

    /// Fetch advertised protocol versions
    pub fn versions(&self) -> &[ProtocolVersion] {
        match self {
            Self::Local { versions, .. } | Self::Remote { versions, .. } => versions,
        }
    }

    /// Render to a launchable [Url], using the `solana-wallet:` scheme
    /// unless a wallet base URI is provided
    pub fn to_url(&self, base: Option<&Url>) -> Result<Url, Error> {
        let kind = match self {
            Self::Local { .. } => "local",
            Self::Remote { .. } => "remote",
        };

        let mut url = match base {
            Some(b) => {
                let mut u = check_wallet_uri_base(b.as_str())?;
                let path = format!("{}{ASSOCIATION_PATH}/{kind}", b.path().trim_end_matches('/'));
                u.set_path(&path);
                u.set_query(None);
                u.set_fragment(None);
                u
            }
            None => Url::parse(&format!("{ASSOCIATION_SCHEME}:{ASSOCIATION_PATH}/{kind}"))?,
        };

        {
            let mut q = url.query_pairs_mut();
            q.append_pair(PARAM_ASSOCIATION, self.association());

            match self {
                Self::Local { port, .. } => {
                    q.append_pair(PARAM_PORT, &port.to_string());
                }
                Self::Remote { reflector, id, .. } => {
                    q.append_pair(PARAM_REFLECTOR, reflector);
                    q.append_pair(PARAM_ID, &b64url_encode(id));
                }
            }

            for v in self.versions() {
                q.append_pair(PARAM_VERSION, &v.to_string());
            }
        }

        Ok(url)
    }

    /// Parse an association URI (wallet side)
    pub fn parse(url: &Url) -> Result<Self, Error> {
        match url.scheme() {
            ASSOCIATION_SCHEME | "https" => (),
            s => return Err(Error::InvalidUri(format!("unsupported scheme '{s}'"))),
        }

        let path = url.path();
        let kind = match path.rfind(ASSOCIATION_PATH) {
            Some(i) => &path[i + ASSOCIATION_PATH.len()..],
            None => return Err(Error::InvalidUri(format!("unexpected path '{path}'"))),
        };

        let mut association = None;
        let mut port = None;
        let mut reflector = None;
        let mut id = None;
        let mut versions = vec![];

        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                PARAM_ASSOCIATION => association = Some(v.to_string()),
                PARAM_PORT => {
                    let p = v
                        .parse::<u16>()
                        .map_err(|_| Error::InvalidUri(format!("invalid port '{v}'")))?;
                    port = Some(p);
                }
                PARAM_REFLECTOR => reflector = Some(v.to_string()),
                PARAM_ID => id = Some(b64url_decode(&v)?),
                // Skip versions we don't understand, the peer may be newer
                PARAM_VERSION => match ProtocolVersion::parse(&v) {
                    Ok(p) => versions.push(p),
                    Err(_) => {
                        #[cfg(feature = "log")]
                        log::debug!("ignoring unknown protocol version '{}'", v);
                    }
                },
                _ => (),
            }
        }

        let association =
            association.ok_or_else(|| Error::InvalidUri("missing association".to_string()))?;

        let uri = match kind {
            "/local" => {
                let port = port.ok_or_else(|| Error::InvalidUri("missing port".to_string()))?;
                if !LOCAL_PORT_RANGE.contains(&port) {
                    return Err(Error::InvalidPort(port));
                }

                Self::Local {
                    association,
                    port,
                    versions,
                }
            }
            "/remote" => Self::Remote {
                association,
                reflector: reflector
                    .ok_or_else(|| Error::InvalidUri("missing reflector".to_string()))?,
                id: id.ok_or_else(|| Error::InvalidUri("missing id".to_string()))?,
                versions,
            },
            k => return Err(Error::InvalidUri(format!("unknown association type '{k}'"))),
        };

        // Ensure the token decodes to a key-sized value
        uri.public_key()?;

        Ok(uri)
    }
}
