// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with Mobile Wallet Adapter wallets

use clap::Parser;
use log::{debug, info, LevelFilter};

use mwa::{
    proto::{
        compat::AuthorizeRequest,
        encoding::{b64_decode, b64_encode},
        methods::{
            SignAndSendOptions, SignAndSendTransactionsParams, SignMessagesParams,
            SignTransactionsParams,
        },
    },
    transact, AdbLauncher, Association, Launcher, LocalAssociation, LocalConfig, LogLauncher,
    MobileWallet, RemoteAssociation, RemoteConfig, RpcConfig, WsConnector,
};

mod helpers;
use helpers::*;

/// Mobile Wallet Adapter command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Association kind
    #[clap(long, value_enum, default_value = "local")]
    association: Kind,

    /// Platform launcher for local associations
    #[clap(long, value_enum, default_value = "adb")]
    launcher: LauncherKind,

    /// adb device serial (where more than one device is attached)
    #[clap(long)]
    adb_serial: Option<String>,

    #[clap(flatten)]
    local: LocalConfig,

    #[clap(flatten)]
    remote: RemoteConfig,

    #[clap(flatten)]
    rpc: RpcConfig,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Copy, Clone, PartialEq, Debug, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum Kind {
    /// Wallet on this (or an adb attached) device
    Local,
    /// Wallet on another device, via a reflector
    Remote,
}

#[derive(Copy, Clone, PartialEq, Debug, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum LauncherKind {
    /// Launch wallets via adb
    Adb,
    /// Log association URIs for manual launch
    Log,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Authorize (or reauthorize, with an existing token)
    Authorize {
        #[clap(flatten)]
        identity: Identity,

        /// Chain identifier (or legacy cluster name)
        #[clap(long, default_value = "solana:mainnet")]
        chain: String,

        /// Existing authorization token
        #[clap(long)]
        auth_token: Option<String>,

        /// Sign-in payload file (.json)
        #[clap(long)]
        sign_in: Option<String>,

        /// Output file (.json), printed if not provided
        #[clap(long)]
        output: Option<String>,
    },

    /// Revoke an authorization token
    Deauthorize {
        /// Authorization token
        #[clap(long)]
        auth_token: String,
    },

    /// Fetch wallet capabilities
    Capabilities {
        /// Output file (.json), printed if not provided
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign UTF-8 messages
    SignMessages {
        #[clap(flatten)]
        identity: Identity,

        /// Authorization token from a previous session
        #[clap(long)]
        auth_token: Option<String>,

        /// Messages to sign
        #[clap(long, required = true)]
        message: Vec<String>,

        /// Output file (.json), printed if not provided
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign transactions
    SignTransactions {
        #[clap(flatten)]
        identity: Identity,

        /// Authorization token from a previous session
        #[clap(long)]
        auth_token: Option<String>,

        /// Input file (.json) containing a list of base64 encoded transactions
        #[clap(long)]
        input: String,

        /// Output file (.json), printed if not provided
        #[clap(long)]
        output: Option<String>,
    },

    /// Sign and submit transactions
    SignAndSend {
        #[clap(flatten)]
        identity: Identity,

        /// Authorization token from a previous session
        #[clap(long)]
        auth_token: Option<String>,

        /// Input file (.json) containing a list of base64 encoded transactions
        #[clap(long)]
        input: String,

        /// Minimum slot for transaction submission
        #[clap(long)]
        min_context_slot: Option<u64>,

        /// Output file (.json), printed if not provided
        #[clap(long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    let launcher: Box<dyn Launcher> = match (args.association, args.launcher) {
        (Kind::Local, LauncherKind::Adb) => {
            Box::new(AdbLauncher::new("adb", args.adb_serial.clone()))
        }
        _ => Box::new(LogLauncher),
    };

    let association: Association = match args.association {
        Kind::Local => LocalAssociation::new(args.local.clone())?.into(),
        Kind::Remote => RemoteAssociation::new(args.remote.clone()).into(),
    };

    debug!("Using association: {:?}", association);

    // Close the association on ctrl+c
    let closer = association.closer();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            closer.close();
        }
    });

    let cmd = args.cmd.clone();

    // Command errors are returned within the session result so the
    // session is closed before they are reported
    transact(
        association,
        launcher.as_ref(),
        &WsConnector,
        &args.rpc,
        |wallet| Box::pin(async move { Ok(execute(wallet, cmd).await) }),
    )
    .await??;

    Ok(())
}

/// Execute a command against a connected wallet
async fn execute(w: &MobileWallet, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    info!("connected (protocol version: {})", w.version());

    match cmd {
        Actions::Authorize {
            identity,
            chain,
            auth_token,
            sign_in,
            output,
        } => {
            let sign_in_payload = match sign_in {
                Some(f) => Some(read_input(&f).await?),
                None => None,
            };

            let r = w
                .authorize(AuthorizeRequest {
                    identity: identity.app_identity(),
                    chain: Some(chain),
                    auth_token,
                    sign_in_payload,
                    ..Default::default()
                })
                .await?;

            info!("authorized {} account(s)", r.accounts.len());

            write_output(output.as_deref(), &r).await?;
        }
        Actions::Deauthorize { auth_token } => {
            w.deauthorize(&auth_token).await?;

            info!("deauthorized");
        }
        Actions::Capabilities { output } => {
            let c = w.get_capabilities().await?;

            write_output(output.as_deref(), &c).await?;
        }
        Actions::SignMessages {
            identity,
            auth_token,
            message,
            output,
        } => {
            let auth = authorize(w, identity, auth_token).await?;

            let r = w
                .sign_messages(SignMessagesParams {
                    addresses: vec![auth],
                    payloads: message.iter().map(|m| b64_encode(m.as_bytes())).collect(),
                })
                .await?;

            for p in &r.signed_payloads {
                debug!("signed payload: {}", hex::encode(b64_decode(p)?));
            }

            write_output(output.as_deref(), &r).await?;
        }
        Actions::SignTransactions {
            identity,
            auth_token,
            input,
            output,
        } => {
            let payloads: Vec<String> = read_input(&input).await?;

            authorize(w, identity, auth_token).await?;

            let r = w
                .sign_transactions(SignTransactionsParams { payloads })
                .await?;

            write_output(output.as_deref(), &r).await?;
        }
        Actions::SignAndSend {
            identity,
            auth_token,
            input,
            min_context_slot,
            output,
        } => {
            let payloads: Vec<String> = read_input(&input).await?;

            authorize(w, identity, auth_token).await?;

            let r = w
                .sign_and_send_transactions(SignAndSendTransactionsParams {
                    payloads,
                    options: min_context_slot.map(|s| SignAndSendOptions {
                        min_context_slot: Some(s),
                        ..Default::default()
                    }),
                })
                .await?;

            write_output(output.as_deref(), &r).await?;
        }
    }

    Ok(())
}

/// Authorize (or reauthorize) prior to privileged methods,
/// returning the first authorized address
async fn authorize(
    w: &MobileWallet,
    identity: Identity,
    auth_token: Option<String>,
) -> anyhow::Result<String> {
    let r = w
        .authorize(AuthorizeRequest {
            identity: identity.app_identity(),
            auth_token,
            ..Default::default()
        })
        .await?;

    info!("authorized, token: {}", r.auth_token);

    r.accounts
        .first()
        .map(|a| a.address.clone())
        .ok_or_else(|| anyhow::anyhow!("no authorized accounts"))
}
