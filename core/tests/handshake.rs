use rand_core::OsRng;

use mwa_core::{
    handshake::{Event, HandshakeState, Output, WalletHandshake},
    keys::AssociationKeypair,
    Error, Handshake,
};
use mwa_proto::{varint::encode_varint, ProtocolVersion};

mod helpers;
use helpers::*;

#[test]
fn negotiate_v1() {
    setup_logging();

    let (mut d, mut w) = connect(ProtocolVersion::SUPPORTED, 0);
    assert_eq!(d.version(), ProtocolVersion::V1);
    assert_eq!(w.version(), ProtocolVersion::V1);

    // Wallet sent session properties with seq 1, so its next message is seq 2
    let m = w.encrypt(b"{\"jsonrpc\":\"2.0\"}").unwrap();
    assert_eq!(&m[..4], &[0, 0, 0, 2]);
    assert_eq!(d.decrypt(&m).unwrap(), b"{\"jsonrpc\":\"2.0\"}");

    // dApp outbound counter starts at 1
    let m = d.encrypt(b"ping").unwrap();
    assert_eq!(&m[..4], &[0, 0, 0, 1]);
    assert_eq!(w.decrypt(&m).unwrap(), b"ping");
}

#[test]
fn legacy_without_session_properties() {
    setup_logging();

    let (mut d, mut w) = connect(&[], 0);
    assert_eq!(d.version(), ProtocolVersion::Legacy);

    let m = w.encrypt(b"hi").unwrap();
    assert_eq!(&m[..4], &[0, 0, 0, 1]);
    assert_eq!(d.decrypt(&m).unwrap(), b"hi");
}

#[test]
fn legacy_only_offer() {
    setup_logging();

    let (d, _) = connect(&[ProtocolVersion::Legacy], 0);
    assert_eq!(d.version(), ProtocolVersion::Legacy);
}

#[test]
fn connect_after_pings() {
    setup_logging();

    for pings in [1, 2, 5] {
        let (mut d, mut w) = connect(ProtocolVersion::SUPPORTED, pings);

        let m = d.encrypt(b"after pings").unwrap();
        assert_eq!(w.decrypt(&m).unwrap(), b"after pings");
    }
}

#[test]
fn wallet_rejects_foreign_hello() {
    setup_logging();

    let association = AssociationKeypair::generate(&mut OsRng);
    let other = AssociationKeypair::generate(&mut OsRng);

    let wallet = WalletHandshake::new(other.public_key(), ProtocolVersion::SUPPORTED);

    let mut h = Handshake::local(association);
    h.update(&Event::Connect).unwrap();
    let hello = match h.update(&Event::Opened).unwrap() {
        Output::Send(b) => b,
        o => panic!("unexpected output: {o:?}"),
    };

    assert!(matches!(
        wallet.respond(&hello, &mut OsRng),
        Err(Error::InvalidSignature)
    ));
}

#[test]
fn wallet_without_common_version() {
    let association = AssociationKeypair::generate(&mut OsRng);
    let wallet = WalletHandshake::new(association.public_key(), &[ProtocolVersion::V1])
        .with_supported(&[ProtocolVersion::Legacy]);

    let mut h = Handshake::local(association);
    h.update(&Event::Connect).unwrap();
    let hello = match h.update(&Event::Opened).unwrap() {
        Output::Send(b) => b,
        o => panic!("unexpected output: {o:?}"),
    };

    assert!(matches!(
        wallet.respond(&hello, &mut OsRng),
        Err(Error::NoCommonVersion)
    ));
}

#[test]
fn remote_handshake() {
    setup_logging();

    let association = AssociationKeypair::generate(&mut OsRng);
    let wallet = WalletHandshake::new(association.public_key(), ProtocolVersion::SUPPORTED);

    let mut h = Handshake::remote(association);
    h.update(&Event::Connect).unwrap();
    h.update(&Event::Opened).unwrap();

    let mut f = encode_varint(16);
    f.extend_from_slice(&[0x42; 16]);
    assert!(matches!(
        h.update(&Event::Frame(&f)).unwrap(),
        Output::ReflectorId(id) if id == vec![0x42; 16]
    ));

    // Reflector pings once the wallet joins
    let hello = match h.update(&Event::Frame(&[])).unwrap() {
        Output::Send(b) => b,
        o => panic!("unexpected output: {o:?}"),
    };
    assert_eq!(h.state(), HandshakeState::HelloSent);

    let (rsp, _) = wallet.respond(&hello, &mut OsRng).unwrap();
    assert!(matches!(
        h.update(&Event::Frame(&rsp)).unwrap(),
        Output::Connected(_)
    ));
    assert_eq!(h.state(), HandshakeState::Connected);
}

#[test]
fn tampered_session_properties() {
    setup_logging();

    let association = AssociationKeypair::generate(&mut OsRng);
    let wallet = WalletHandshake::new(association.public_key(), ProtocolVersion::SUPPORTED);

    let mut h = Handshake::local(association);
    h.update(&Event::Connect).unwrap();
    let hello = match h.update(&Event::Opened).unwrap() {
        Output::Send(b) => b,
        o => panic!("unexpected output: {o:?}"),
    };

    let (mut rsp, _) = wallet.respond(&hello, &mut OsRng).unwrap();
    let n = rsp.len();
    rsp[n - 1] ^= 0x01;

    assert!(matches!(
        h.update(&Event::Frame(&rsp)),
        Err(Error::DecryptFailed)
    ));
    assert_eq!(h.state(), HandshakeState::Closed);
}
