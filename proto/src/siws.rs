// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Canonical sign-in-with-wallet message text
//!
//! Used to build the message signed via `sign_messages` when a wallet
//! accepts a sign-in payload but does not return a sign-in result.
//!
//! ```text
//! {domain} wants you to sign in with your Solana account:
//! {address}
//!
//! {statement}
//!
//! URI: {uri}
//! Version: {version}
//! ...
//! Resources:
//! - {resource}
//! ```

use crate::{methods::SignInPayload, Error};

/// Build the canonical sign-in message for the provided payload,
/// `address` is the base58 encoded account address.
pub fn sign_in_message(payload: &SignInPayload, address: &str) -> Result<String, Error> {
    let domain = payload
        .domain
        .as_deref()
        .ok_or(Error::MissingField("domain"))?;

    let mut m = format!("{domain} wants you to sign in with your Solana account:\n{address}");

    if let Some(s) = &payload.statement {
        m.push_str("\n\n");
        m.push_str(s);
    }

    let mut fields = Vec::new();
    for (label, value) in [
        ("URI", &payload.uri),
        ("Version", &payload.version),
        ("Chain ID", &payload.chain_id),
        ("Nonce", &payload.nonce),
        ("Issued At", &payload.issued_at),
        ("Expiration Time", &payload.expiration_time),
        ("Not Before", &payload.not_before),
        ("Request ID", &payload.request_id),
    ] {
        if let Some(v) = value {
            fields.push(format!("{label}: {v}"));
        }
    }

    if let Some(r) = payload.resources.as_ref().filter(|r| !r.is_empty()) {
        let mut f = "Resources:".to_string();
        for i in r {
            f.push_str("\n- ");
            f.push_str(i);
        }
        fields.push(f);
    }

    if !fields.is_empty() {
        m.push_str("\n\n");
        m.push_str(&fields.join("\n"));
    }

    Ok(m)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_message() {
        let p = SignInPayload {
            domain: Some("example.com".to_string()),
            ..Default::default()
        };

        assert_eq!(
            sign_in_message(&p, "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU").unwrap(),
            "example.com wants you to sign in with your Solana account:\n7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"
        );
    }

    #[test]
    fn full_message() {
        let p = SignInPayload {
            domain: Some("example.com".to_string()),
            statement: Some("Sign in to Example".to_string()),
            uri: Some("https://example.com".to_string()),
            version: Some("1".to_string()),
            chain_id: Some("solana:mainnet".to_string()),
            nonce: Some("abc123".to_string()),
            issued_at: Some("2024-01-01T00:00:00Z".to_string()),
            resources: Some(vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string(),
            ]),
            ..Default::default()
        };

        let expected = "example.com wants you to sign in with your Solana account:\n\
            ADDR\n\
            \n\
            Sign in to Example\n\
            \n\
            URI: https://example.com\n\
            Version: 1\n\
            Chain ID: solana:mainnet\n\
            Nonce: abc123\n\
            Issued At: 2024-01-01T00:00:00Z\n\
            Resources:\n\
            - https://example.com/a\n\
            - https://example.com/b";

        assert_eq!(sign_in_message(&p, "ADDR").unwrap(), expected);
    }

    #[test]
    fn domain_required() {
        assert!(sign_in_message(&SignInPayload::default(), "ADDR").is_err());
    }
}
