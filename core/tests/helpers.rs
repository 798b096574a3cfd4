#![allow(unused)]

use std::str::FromStr;

use log::LevelFilter;
use rand_core::OsRng;
use simplelog::SimpleLogger;

use mwa_core::{
    handshake::{AssociationKind, Event, Output, WalletHandshake},
    keys::AssociationKeypair,
    Handshake, Session,
};
use mwa_proto::ProtocolVersion;

/// Setup logging, level via `LOG_LEVEL`
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Run a local handshake against a wallet responder offering the provided versions,
/// returning (dApp, wallet) sessions
pub fn connect(offered: &[ProtocolVersion], pings: usize) -> (Session, Session) {
    let association = AssociationKeypair::generate(&mut OsRng);
    let wallet = WalletHandshake::new(association.public_key(), offered);

    let mut h = Handshake::new(AssociationKind::Local, association);
    h.update(&Event::Connect).unwrap();

    let mut hello = match h.update(&Event::Opened).unwrap() {
        Output::Send(b) => b,
        o => panic!("unexpected output: {o:?}"),
    };

    for _ in 0..pings {
        hello = match h.update(&Event::Frame(&[])).unwrap() {
            Output::Send(b) => b,
            o => panic!("unexpected output: {o:?}"),
        };
    }

    let (rsp, wallet_session) = wallet.respond(&hello, &mut OsRng).unwrap();

    let dapp_session = match h.update(&Event::Frame(&rsp)).unwrap() {
        Output::Connected(s) => s,
        o => panic!("unexpected output: {o:?}"),
    };

    (dapp_session, wallet_session)
}
