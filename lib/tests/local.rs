use std::time::Duration;

use serde_json::json;

use mwa::{
    proto::{
        compat::AuthorizeRequest,
        methods::{AppIdentity, SignInPayload, SignMessagesParams, SignTransactionsParams},
        rpc::{self, RpcError},
        ProtocolVersion,
    },
    transact, Error, LocalAssociation, LocalConfig, LogLauncher, MobileWallet, RpcConfig,
};

mod helpers;
use helpers::*;

fn config() -> LocalConfig {
    LocalConfig {
        backoff_ms: vec![10, 20, 50],
        connect_timeout_s: 5,
        ..Default::default()
    }
}

async fn connect(w: &TestWallet) -> Result<MobileWallet, Error> {
    let a = LocalAssociation::new(config())?;
    let c = a.connect(w, w, &RpcConfig::default()).await?;
    Ok(MobileWallet::new(c))
}

fn identity() -> Option<AppIdentity> {
    Some(AppIdentity {
        name: Some("test dapp".to_string()),
        uri: Some("https://dapp.example".to_string()),
        icon: None,
    })
}

#[tokio::test]
async fn authorize_then_sign() {
    setup_logging();

    let w = TestWallet::local(WalletOpts::default(), default_handler("https://wallet.example"));
    let wallet = connect(&w).await.unwrap();
    assert_eq!(wallet.version(), ProtocolVersion::V1);

    let auth = wallet
        .authorize(AuthorizeRequest {
            identity: identity(),
            chain: Some("solana:devnet".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(auth.auth_token, "tok1");
    assert_eq!(auth.accounts.len(), 1);
    assert_eq!(auth.wallet_uri_base.as_deref(), Some("https://wallet.example"));

    let signed = wallet
        .sign_transactions(SignTransactionsParams {
            payloads: vec!["AAAA".to_string()],
        })
        .await
        .unwrap();
    assert_eq!(signed.signed_payloads.len(), 1);

    wallet.close().await;

    // Association uri advertised supported versions
    let uri = w.launched()[0].to_string();
    assert!(uri.starts_with("solana-wallet:/v1/associate/local?"), "{uri}");
    assert!(uri.contains("v=v1"), "{uri}");
}

#[tokio::test]
async fn insecure_wallet_uri_base() {
    setup_logging();

    let w = TestWallet::local(WalletOpts::default(), default_handler("http://wallet.example"));
    let wallet = connect(&w).await.unwrap();

    let r = wallet
        .authorize(AuthorizeRequest {
            identity: identity(),
            chain: Some("solana:devnet".to_string()),
            ..Default::default()
        })
        .await;

    assert!(
        matches!(&r, Err(Error::InsecureWalletUri(u)) if u == "http://wallet.example"),
        "{r:?}"
    );

    // The session survives the rejected result
    wallet.get_capabilities().await.unwrap();

    wallet.close().await;
}

#[tokio::test]
async fn legacy_wallet_capabilities() {
    setup_logging();

    let opts = WalletOpts {
        supported: vec![ProtocolVersion::Legacy],
        ..Default::default()
    };
    let handler: Handler = std::sync::Arc::new(|method, params| match method {
        "reauthorize" => {
            assert_eq!(params["auth_token"], "tok0");
            Ok(json!({ "accounts": [], "auth_token": "tok1" }))
        }
        "get_capabilities" => Ok(json!({
            "supports_clone_authorization": false,
            "supports_sign_and_send_transactions": true,
            "max_transactions_per_request": 5,
            "supported_transaction_versions": ["legacy"],
        })),
        m => Err(RpcError::new(rpc::ERROR_METHOD_NOT_FOUND, m)),
    });

    let w = TestWallet::local(opts, handler);
    let wallet = connect(&w).await.unwrap();
    assert_eq!(wallet.version(), ProtocolVersion::Legacy);

    // Legacy sessions refresh tokens via reauthorize
    let auth = wallet
        .authorize(AuthorizeRequest {
            identity: identity(),
            auth_token: Some("tok0".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(auth.auth_token, "tok1");

    let c = wallet.get_capabilities().await.unwrap();
    let features = c.features.unwrap();
    assert!(features.contains(&"solana:signAndSendTransaction".to_string()));
    assert!(features.contains(&"solana:signTransactions".to_string()));

    wallet.close().await;
}

#[tokio::test]
async fn rpc_error_is_typed() {
    setup_logging();

    let handler: Handler = std::sync::Arc::new(|method, _| match method {
        "authorize" => Err(RpcError::new(rpc::ERROR_AUTHORIZATION_FAILED, "declined")),
        _ => Ok(json!({})),
    });

    let w = TestWallet::local(WalletOpts::default(), handler);
    let wallet = connect(&w).await.unwrap();

    let e = wallet
        .authorize(AuthorizeRequest::default())
        .await
        .unwrap_err();
    assert_eq!(e.rpc_code(), Some(rpc::ERROR_AUTHORIZATION_FAILED));
    assert!(!e.is_fatal());

    // Remote errors do not fail the session
    wallet.deauthorize("tok").await.unwrap();

    wallet.close().await;
}

#[tokio::test]
async fn sign_in_fallback() {
    setup_logging();

    let handler: Handler = std::sync::Arc::new(|method, params| match method {
        "authorize" => Ok(json!({
            "accounts": [{ "address": mwa::proto::encoding::b64_encode([0x11u8; 32]) }],
            "auth_token": "tok1",
        })),
        "sign_messages" => {
            let payload = params["payloads"][0].as_str().unwrap();
            let mut signed = mwa::proto::encoding::b64_decode(payload).unwrap();
            signed.extend_from_slice(&[0xab; 64]);
            Ok(json!({ "signed_payloads": [mwa::proto::encoding::b64_encode(signed)] }))
        }
        m => Err(RpcError::new(rpc::ERROR_METHOD_NOT_FOUND, m)),
    });

    let w = TestWallet::local(WalletOpts::default(), handler);
    let wallet = connect(&w).await.unwrap();

    let auth = wallet
        .authorize(AuthorizeRequest {
            sign_in_payload: Some(SignInPayload {
                domain: Some("dapp.example".to_string()),
                statement: Some("Sign in".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .await
        .unwrap();

    let s = auth.sign_in_result.unwrap();
    assert_eq!(s.address, auth.accounts[0].address);
    assert_eq!(s.signature, mwa::proto::encoding::b64_encode([0xab; 64]));

    let message = mwa::proto::encoding::b64_decode(&s.signed_message).unwrap();
    let message = String::from_utf8(message).unwrap();
    assert!(message.starts_with("dapp.example wants you to sign in"), "{message}");

    wallet.close().await;
}

#[tokio::test]
async fn ping_before_hello() {
    setup_logging();

    let opts = WalletOpts {
        ping: true,
        ..Default::default()
    };
    let w = TestWallet::local(opts, default_handler("https://wallet.example"));
    let wallet = connect(&w).await.unwrap();

    wallet.get_capabilities().await.unwrap();
    wallet.close().await;
}

#[tokio::test]
async fn skipped_sequence_is_fatal() {
    setup_logging();

    let opts = WalletOpts {
        skip_seq: true,
        ..Default::default()
    };
    let w = TestWallet::local(opts, default_handler("https://wallet.example"));
    let wallet = connect(&w).await.unwrap();

    let e = wallet
        .sign_messages(SignMessagesParams {
            addresses: vec![],
            payloads: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(e, Error::SessionFailed(_)), "{e:?}");

    // Subsequent requests fail with the termination reason
    let e = wallet.get_capabilities().await.unwrap_err();
    assert!(matches!(e, Error::SessionFailed(_)), "{e:?}");
}

#[tokio::test]
async fn wallet_not_found() {
    setup_logging();

    let w = TestWallet::missing();
    let r = connect(&w).await;

    assert!(matches!(r, Err(Error::WalletNotFound)), "{r:?}");
}

#[tokio::test]
async fn wallet_declines() {
    setup_logging();

    let opts = WalletOpts {
        decline: true,
        ..Default::default()
    };
    let w = TestWallet::local(opts, default_handler("https://wallet.example"));
    let r = connect(&w).await;

    assert!(matches!(r, Err(Error::SessionDeclined)), "{r:?}");
}

#[tokio::test]
async fn connect_timeout() {
    setup_logging();

    // Launch succeeds but nothing ever listens
    let w = TestWallet::local(WalletOpts::default(), default_handler("https://wallet.example"));
    let a = LocalAssociation::new(LocalConfig {
        connect_timeout_s: 1,
        ..config()
    })
    .unwrap();

    let r = a.connect(&LogLauncher, w.as_ref(), &RpcConfig::default()).await;
    assert!(matches!(r, Err(Error::ConnectionTimeout)), "{r:?}");
}

#[tokio::test]
async fn close_before_connection() {
    setup_logging();

    let w = TestWallet::local(WalletOpts::default(), default_handler("https://wallet.example"));
    let a = LocalAssociation::new(config()).unwrap();

    let closer = a.closer();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        closer.close();
    });

    let r = a.connect(&LogLauncher, w.as_ref(), &RpcConfig::default()).await;

    let e = r.unwrap_err();
    assert!(matches!(e, Error::ClosedBeforeConnection), "{e:?}");
    assert!(e.is_cancellation());
}

#[tokio::test]
async fn transact_closes_session() {
    setup_logging();

    let w = TestWallet::local(WalletOpts::default(), default_handler("https://wallet.example"));
    let a = LocalAssociation::new(config()).unwrap();

    let token = transact(a.into(), w.as_ref(), w.as_ref(), &RpcConfig::default(), |wallet| {
        Box::pin(async move {
            let r = wallet
                .authorize(AuthorizeRequest {
                    chain: Some("solana:mainnet".to_string()),
                    ..Default::default()
                })
                .await?;
            Ok(r.auth_token)
        })
    })
    .await
    .unwrap();

    assert_eq!(token, "tok1");
}

#[tokio::test]
async fn unclean_close_is_fatal() {
    setup_logging();

    let opts = WalletOpts {
        hangup_after: Some(1),
        ..Default::default()
    };
    let w = TestWallet::local(opts, default_handler("https://wallet.example"));
    let mut wallet = connect(&w).await.unwrap();

    wallet.get_capabilities().await.unwrap();

    let e = wallet.client().closed().await;
    assert!(
        matches!(e, Error::SessionClosed { clean: false, .. }),
        "{e:?}"
    );

    let e = wallet.get_capabilities().await.unwrap_err();
    assert!(matches!(e, Error::SessionClosed { clean: false, .. }), "{e:?}");
}
