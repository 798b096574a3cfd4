// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Session handshake state machine (dApp side)
//!
//! The [Handshake] consumes socket [Event]s and returns [Output]s for the
//! caller to act on, independent of the underlying socket implementation.
//!
//! ```text
//! disconnected -> connecting -> hello_sent -> connected
//!                      |            ^
//!                      v            | (remote only)
//!               reflector_id_received
//! ```
//!
//! Zero-length frames received prior to `connected` are peer pings and
//! cause the hello to be (re)sent.

use rand_core::OsRng;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use encdec::Decode;

use mwa_proto::{
    handshake::HelloRsp, varint::decode_prefixed, ProtocolVersion, SessionProperties,
    PUBLIC_KEY_LEN,
};

use crate::{
    cipher::SessionCipher,
    keys::{AssociationKeypair, EphemeralKeypair},
    Error, Session,
};

mod wallet;
pub use wallet::WalletHandshake;

/// Association kind, determining how the socket reaches the wallet
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AssociationKind {
    /// Loopback socket to a co-located wallet
    Local,
    /// Socket to a reflector, relaying to a remote wallet
    Remote,
}

/// Handshake state, for logging and errors
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum HandshakeState {
    Disconnected,
    Connecting,
    ReflectorIdReceived,
    HelloSent,
    Connected,
    Closed,
}

/// Internal state, carrying only the data valid in each state
enum State {
    Disconnected {
        association: AssociationKeypair,
    },
    Connecting {
        association: AssociationKeypair,
    },
    ReflectorIdReceived {
        association: AssociationKeypair,
    },
    HelloSent {
        ephemeral: EphemeralKeypair,
        hello: Vec<u8>,
    },
    Connected,
    Closed,
}

impl State {
    fn kind(&self) -> HandshakeState {
        match self {
            State::Disconnected { .. } => HandshakeState::Disconnected,
            State::Connecting { .. } => HandshakeState::Connecting,
            State::ReflectorIdReceived { .. } => HandshakeState::ReflectorIdReceived,
            State::HelloSent { .. } => HandshakeState::HelloSent,
            State::Connected => HandshakeState::Connected,
            State::Closed => HandshakeState::Closed,
        }
    }
}

/// Socket events driving the [Handshake]
#[derive(Clone, Debug, PartialEq)]
pub enum Event<'a> {
    /// Socket open started
    Connect,
    /// Socket opened
    Opened,
    /// Frame received
    Frame(&'a [u8]),
    /// Socket closed
    Closed,
}

/// [Handshake] outputs (in response to events)
#[derive(Debug)]
pub enum Output {
    None,
    /// Frame to be sent to the peer
    Send(Vec<u8>),
    /// Relay identifier assigned by the reflector
    ReflectorId(Vec<u8>),
    /// Handshake complete, session established
    Connected(Session),
}

/// dApp handshake state machine, one instance per connection attempt
pub struct Handshake {
    kind: AssociationKind,
    association_public: [u8; PUBLIC_KEY_LEN],
    state: State,
}

impl Handshake {
    /// Create a handshake for the provided association kind and key
    pub fn new(kind: AssociationKind, association: AssociationKeypair) -> Self {
        Self {
            kind,
            association_public: association.public_key(),
            state: State::Disconnected { association },
        }
    }

    /// Create a handshake for a local association
    pub fn local(association: AssociationKeypair) -> Self {
        Self::new(AssociationKind::Local, association)
    }

    /// Create a handshake for a remote (reflector) association
    pub fn remote(association: AssociationKeypair) -> Self {
        Self::new(AssociationKind::Remote, association)
    }

    /// Fetch the association kind
    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    /// Fetch the association public key (for the association URI)
    pub fn association_public(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.association_public
    }

    /// Fetch the current handshake state
    pub fn state(&self) -> HandshakeState {
        self.state.kind()
    }

    /// Handle socket events
    ///
    /// Errors are terminal, the handshake is left in the `closed` state.
    pub fn update(&mut self, evt: &Event) -> Result<Output, Error> {
        let current = self.state.kind();

        #[cfg(feature = "log")]
        log::debug!("{} handshake event {:02x?} in state {}", self.kind, evt, current);

        let prev = core::mem::replace(&mut self.state, State::Closed);

        let (next, out) = match (prev, evt) {
            // Close is terminal in every state
            (State::Connected, Event::Closed) => (State::Closed, Output::None),
            (_, Event::Closed) => return Err(Error::ClosedBeforeConnection),

            (State::Disconnected { association }, Event::Connect) => {
                (State::Connecting { association }, Output::None)
            }

            // Local wallets receive the hello as soon as the socket is up,
            // remote sessions wait for the reflector to assign an id
            (State::Connecting { association }, Event::Opened) => match self.kind {
                AssociationKind::Local => self.send_hello(association),
                AssociationKind::Remote => (State::Connecting { association }, Output::None),
            },

            (State::Connecting { association }, Event::Frame(f)) => match (self.kind, f.is_empty()) {
                (AssociationKind::Local, true) => self.send_hello(association),
                (AssociationKind::Remote, true) => (State::Connecting { association }, Output::None),
                (AssociationKind::Remote, false) => {
                    let (id, _) = decode_prefixed(f)?;

                    #[cfg(feature = "log")]
                    log::debug!("reflector id: {:02x?}", id);

                    (
                        State::ReflectorIdReceived { association },
                        Output::ReflectorId(id.to_vec()),
                    )
                }
                (AssociationKind::Local, false) => return Err(Error::UnexpectedFrame(current)),
            },

            // Wallet joined the reflector
            (State::ReflectorIdReceived { association }, Event::Frame(f)) if f.is_empty() => {
                self.send_hello(association)
            }

            // Ping while waiting for a response, resend the same hello
            (State::HelloSent { ephemeral, hello }, Event::Frame(f)) if f.is_empty() => {
                let out = Output::Send(hello.clone());
                (State::HelloSent { ephemeral, hello }, out)
            }

            (State::HelloSent { ephemeral, .. }, Event::Frame(f)) => {
                let session = self.complete(ephemeral, f)?;
                (State::Connected, Output::Connected(session))
            }

            (_, Event::Frame(_)) => return Err(Error::UnexpectedFrame(current)),
            _ => return Err(Error::UnexpectedEvent(current)),
        };

        #[cfg(feature = "log")]
        log::debug!("{} handshake {} -> {}", self.kind, current, next.kind());

        self.state = next;

        Ok(out)
    }

    /// Generate an ephemeral key and signed hello, dropping the association private key
    fn send_hello(&self, association: AssociationKeypair) -> (State, Output) {
        let ephemeral = EphemeralKeypair::generate(&mut OsRng);
        let hello = association.hello(ephemeral.public_key()).to_vec();

        let out = Output::Send(hello.clone());
        (State::HelloSent { ephemeral, hello }, out)
    }

    /// Complete key agreement and resolve the protocol version
    fn complete(&self, ephemeral: EphemeralKeypair, frame: &[u8]) -> Result<Session, Error> {
        let (rsp, _) = HelloRsp::decode(frame)?;

        let secret = ephemeral.agree(&rsp.public_key, &self.association_public)?;
        let mut cipher = SessionCipher::new(secret);

        // Session properties are the first inbound encrypted message (seq 1)
        let version = match rsp.session_properties {
            Some(p) => {
                let props = SessionProperties::from_json(&cipher.decrypt(p)?)?;
                props.protocol_version
            }
            None => ProtocolVersion::Legacy,
        };

        #[cfg(feature = "log")]
        log::info!("session established (protocol version: {})", version);

        Ok(Session::new(cipher, version))
    }
}
