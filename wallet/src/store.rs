// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::debug;
use rand_core::{OsRng, RngCore};

use mwa_proto::methods::{Account, AppIdentity};

use crate::trust::AuthorizationScope;

/// Authorization token length (bytes, hex encoded on the wire)
const TOKEN_LEN: usize = 16;

/// Issued authorization
#[derive(Clone, Debug, PartialEq)]
pub struct AuthRecord {
    pub identity: Option<AppIdentity>,
    pub scope: AuthorizationScope,
    pub accounts: Vec<Account>,
    pub chain: Option<String>,
}

/// In-memory authorization store, shared between sessions
#[derive(Clone, Debug, Default)]
pub struct AuthorizationStore {
    inner: Arc<Mutex<HashMap<String, AuthRecord>>>,
}

impl AuthorizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for an authorization
    pub fn issue(&self, record: AuthRecord) -> String {
        let mut b = [0u8; TOKEN_LEN];
        OsRng.fill_bytes(&mut b);
        let token = hex::encode(b);

        debug!("issuing token for scope {}", record.scope);

        self.lock().insert(token.clone(), record);
        token
    }

    /// Fetch the authorization for a token
    pub fn get(&self, token: &str) -> Option<AuthRecord> {
        self.lock().get(token).cloned()
    }

    /// Revoke a token, returning whether it existed
    pub fn revoke(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AuthRecord>> {
        // Records are plain data, recover from poisoning
        match self.inner.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trust::AssociationType;

    #[test]
    fn issue_revoke() {
        let s = AuthorizationStore::new();

        let r = AuthRecord {
            identity: None,
            scope: AuthorizationScope::new(AssociationType::Remote, None),
            accounts: vec![],
            chain: Some("solana:devnet".to_string()),
        };

        let a = s.issue(r.clone());
        let b = s.issue(r.clone());
        assert_ne!(a, b);
        assert_eq!(a.len(), TOKEN_LEN * 2);

        assert_eq!(s.get(&a), Some(r));
        assert!(s.revoke(&a));
        assert!(!s.revoke(&a));
        assert_eq!(s.get(&a), None);
        assert_eq!(s.len(), 1);
    }
}
