// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Trust engine
//!
//! Classifies the session by how it reached the wallet, verifies the
//! source of `authorize` / `reauthorize` requests and issues
//! [AuthorizationScope]s binding authorizations to that source, which are
//! then checked on every privileged (`sign_*`) call.
//!
//! | Association        | Tag   | Qualifier                         |
//! |--------------------|-------|-----------------------------------|
//! | `LocalFromApp`     | `app` | calling application uid           |
//! | `LocalFromBrowser` | `web` | claimed identity origin           |
//! | `Remote`           | `rem` | none                              |

use std::{str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, warn};
use strum::{Display, EnumIter, EnumString};
use url::Url;

use mwa_core::handshake::AssociationKind;

/// Scope tag / qualifier delimiter
pub const SCOPE_DELIMITER: char = ',';

/// Default source verification timeout
pub const DEFAULT_VERIFICATION_TIMEOUT: Duration = Duration::from_secs(3);

/// How a session reached the wallet
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
pub enum AssociationType {
    /// Co-located, with a calling application identity supplied by the platform
    #[strum(serialize = "app")]
    LocalFromApp,
    /// Co-located, without a calling application (e.g. a browser)
    #[strum(serialize = "web")]
    LocalFromBrowser,
    /// Relayed via a reflector
    #[strum(serialize = "rem")]
    Remote,
}

impl AssociationType {
    /// Classify a session by association kind and caller identity availability
    pub fn classify(kind: AssociationKind, has_caller: bool) -> Self {
        match (kind, has_caller) {
            (AssociationKind::Local, true) => AssociationType::LocalFromApp,
            (AssociationKind::Local, false) => AssociationType::LocalFromBrowser,
            (AssociationKind::Remote, _) => AssociationType::Remote,
        }
    }
}

/// Scope describing how an authorization was obtained,
/// encoded as `tag[,qualifier]`
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AuthorizationScope {
    pub tag: AssociationType,
    pub qualifier: Option<String>,
}

impl AuthorizationScope {
    pub fn new(tag: AssociationType, qualifier: Option<String>) -> Self {
        Self { tag, qualifier }
    }
}

impl std::fmt::Display for AuthorizationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}{}{}", self.tag, SCOPE_DELIMITER, q),
            None => write!(f, "{}", self.tag),
        }
    }
}

impl FromStr for AuthorizationScope {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, qualifier) = match s.split_once(SCOPE_DELIMITER) {
            Some((t, q)) => (t, Some(q.to_string())),
            None => (s, None),
        };

        let tag = AssociationType::from_str(tag)
            .map_err(|_| TrustError::InvalidScope(s.to_string()))?;

        Ok(Self { tag, qualifier })
    }
}

/// Source verification outcome
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum VerificationState {
    InProgress,
    /// Verified, with the scope qualifier
    Succeeded(String),
    Failed,
    NotVerifiable,
}

impl VerificationState {
    /// Scope to issue for this outcome, `None` where the request must be declined
    pub fn scope(&self, tag: AssociationType) -> Option<AuthorizationScope> {
        match self {
            VerificationState::Succeeded(q) => Some(AuthorizationScope::new(tag, Some(q.clone()))),
            VerificationState::NotVerifiable => Some(AuthorizationScope::new(tag, None)),
            VerificationState::InProgress | VerificationState::Failed => None,
        }
    }
}

/// Trust engine errors
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum TrustError {
    #[error("invalid scope '{0}'")]
    InvalidScope(String),
    /// Verification could not be completed
    #[error("unable to verify: {0}")]
    Unverifiable(String),
    /// Caller identity lookup failed
    #[error("caller lookup failed: {0}")]
    CallerLookup(String),
}

/// Package / origin signature verification capability
#[async_trait]
pub trait PackageVerifier: Send + Sync {
    /// Check the package is cryptographically associated with the identity URI
    async fn verify(&self, package: &str, identity_uri: &Url) -> Result<bool, TrustError>;
}

/// Calling application identity, resolved by the platform at call time
pub trait CallerIdentity: Send + Sync {
    /// Calling application package
    fn package(&self) -> Result<String, TrustError>;

    /// Current OS-level identity (uid) of the calling application
    fn uid(&self) -> Result<u32, TrustError>;
}

/// Trust engine configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TrustConfig {
    /// Source verification timeout, unresolved verifications fail
    pub verification_timeout: Duration,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            verification_timeout: DEFAULT_VERIFICATION_TIMEOUT,
        }
    }
}

/// Per-session trust engine
#[derive(Clone)]
pub struct TrustEngine {
    association: AssociationType,
    caller: Option<Arc<dyn CallerIdentity>>,
    verifier: Arc<dyn PackageVerifier>,
    config: TrustConfig,
}

impl std::fmt::Debug for TrustEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustEngine")
            .field("association", &self.association)
            .field("config", &self.config)
            .finish()
    }
}

impl TrustEngine {
    /// Create a trust engine for a session arriving via the provided
    /// association kind, with the caller identity where supplied by the platform
    pub fn new(
        kind: AssociationKind,
        caller: Option<Arc<dyn CallerIdentity>>,
        verifier: Arc<dyn PackageVerifier>,
        config: TrustConfig,
    ) -> Self {
        let association = AssociationType::classify(kind, caller.is_some());

        debug!("session association type: {:?}", association);

        Self {
            association,
            caller,
            verifier,
            config,
        }
    }

    /// Fetch the session association type
    pub fn association(&self) -> AssociationType {
        self.association
    }

    /// Verify the source of an `authorize` request
    pub async fn verify_authorization_source(
        &self,
        identity_uri: Option<&str>,
    ) -> VerificationState {
        let timeout = self.config.verification_timeout;

        match tokio::time::timeout(timeout, self.verify_source(identity_uri)).await {
            Ok(s) => s,
            Err(_) => {
                warn!("source verification timed out after {:?}", timeout);
                VerificationState::Failed
            }
        }
    }

    /// Verify the source of a `reauthorize` request against the scope
    /// issued with the original authorization
    pub async fn verify_reauthorization_source(
        &self,
        scope: &AuthorizationScope,
        identity_uri: Option<&str>,
    ) -> VerificationState {
        if scope.tag != self.association {
            debug!(
                "scope tag {} does not match association {}",
                scope.tag, self.association
            );
            return VerificationState::Failed;
        }

        let expected = match &scope.qualifier {
            Some(q) => q,
            None => return VerificationState::NotVerifiable,
        };

        // Qualified scopes must re-verify to the same source
        match self.verify_authorization_source(identity_uri).await {
            VerificationState::Succeeded(q) if &q == expected => VerificationState::Succeeded(q),
            s => {
                warn!("reauthorization source {:?} does not match scope {}", s, scope);
                VerificationState::Failed
            }
        }
    }

    /// Check a privileged method call against the session authorization scope
    pub fn verify_privileged_method_source(
        &self,
        scope: &AuthorizationScope,
        _identity_uri: Option<&str>,
    ) -> bool {
        if scope.tag != self.association {
            return false;
        }

        let qualifier = match &scope.qualifier {
            Some(q) => q,
            None => return true,
        };

        match scope.tag {
            AssociationType::LocalFromApp => {
                let expected = match qualifier.parse::<u32>() {
                    Ok(v) => v,
                    Err(_) => {
                        warn!("malformed app scope qualifier '{}'", qualifier);
                        return false;
                    }
                };

                // Resolved per call, the caller may have changed since authorization
                match self.caller.as_ref().map(|c| c.uid()) {
                    Some(Ok(uid)) if uid == expected => true,
                    Some(Ok(uid)) => {
                        warn!("caller uid {} does not match scope uid {}", uid, expected);
                        false
                    }
                    Some(Err(e)) => {
                        warn!("caller lookup failed: {}", e);
                        false
                    }
                    None => false,
                }
            }
            // Browser origins cannot be re-verified synchronously, web scopes are bearer tokens
            AssociationType::LocalFromBrowser => true,
            // Remote scopes are never qualified
            AssociationType::Remote => {
                warn!("unexpected remote scope qualifier '{}'", qualifier);
                false
            }
        }
    }

    async fn verify_source(&self, identity_uri: Option<&str>) -> VerificationState {
        let uri = match (self.association, identity_uri) {
            (AssociationType::Remote, _) | (_, None) => return VerificationState::NotVerifiable,
            (_, Some(u)) => match Url::parse(u) {
                Ok(u) if u.scheme() == "https" => u,
                _ => {
                    debug!("invalid identity uri '{}'", u);
                    return VerificationState::Failed;
                }
            },
        };

        match self.association {
            AssociationType::LocalFromApp => self.verify_app(&uri).await,
            AssociationType::LocalFromBrowser => {
                VerificationState::Succeeded(uri.origin().ascii_serialization())
            }
            AssociationType::Remote => VerificationState::NotVerifiable,
        }
    }

    async fn verify_app(&self, uri: &Url) -> VerificationState {
        let caller = match &self.caller {
            Some(c) => c,
            None => return VerificationState::Failed,
        };

        let (package, uid) = match (caller.package(), caller.uid()) {
            (Ok(p), Ok(u)) => (p, u),
            (Err(e), _) | (_, Err(e)) => {
                warn!("caller lookup failed: {}", e);
                return VerificationState::Failed;
            }
        };

        match self.verifier.verify(&package, uri).await {
            Ok(true) => VerificationState::Succeeded(uid.to_string()),
            Ok(false) => {
                debug!("package {} not associated with {}", package, uri);
                VerificationState::Failed
            }
            Err(e) => {
                debug!("unable to verify package {}: {}", package, e);
                VerificationState::Failed
            }
        }
    }
}

/// Verifier accepting no packages, for wallets without app verification
#[derive(Clone, Debug, Default)]
pub struct DenyAllVerifier;

#[async_trait]
impl PackageVerifier for DenyAllVerifier {
    async fn verify(&self, _package: &str, _identity_uri: &Url) -> Result<bool, TrustError> {
        Ok(false)
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU32, Ordering};

    use strum::IntoEnumIterator;

    use super::*;

    struct Caller {
        uid: AtomicU32,
        fail: bool,
    }

    impl CallerIdentity for Caller {
        fn package(&self) -> Result<String, TrustError> {
            Ok("com.example.dapp".to_string())
        }

        fn uid(&self) -> Result<u32, TrustError> {
            match self.fail {
                true => Err(TrustError::CallerLookup("gone".to_string())),
                false => Ok(self.uid.load(Ordering::SeqCst)),
            }
        }
    }

    struct Verifier(Option<bool>, Duration);

    #[async_trait]
    impl PackageVerifier for Verifier {
        async fn verify(&self, _package: &str, _identity_uri: &Url) -> Result<bool, TrustError> {
            tokio::time::sleep(self.1).await;
            self.0
                .ok_or_else(|| TrustError::Unverifiable("no statement list".to_string()))
        }
    }

    fn caller(uid: u32) -> Arc<Caller> {
        Arc::new(Caller {
            uid: AtomicU32::new(uid),
            fail: false,
        })
    }

    fn engine(t: AssociationType, uid: u32, verified: Option<bool>) -> TrustEngine {
        let (kind, c): (_, Option<Arc<dyn CallerIdentity>>) = match t {
            AssociationType::LocalFromApp => (
                AssociationKind::Local,
                Some(caller(uid) as Arc<dyn CallerIdentity>),
            ),
            AssociationType::LocalFromBrowser => (AssociationKind::Local, None),
            AssociationType::Remote => (AssociationKind::Remote, None),
        };

        TrustEngine::new(
            kind,
            c,
            Arc::new(Verifier(verified, Duration::ZERO)),
            TrustConfig::default(),
        )
    }

    #[test]
    fn classify() {
        use AssociationKind::*;

        assert_eq!(AssociationType::classify(Local, true), AssociationType::LocalFromApp);
        assert_eq!(AssociationType::classify(Local, false), AssociationType::LocalFromBrowser);
        assert_eq!(AssociationType::classify(Remote, true), AssociationType::Remote);
        assert_eq!(AssociationType::classify(Remote, false), AssociationType::Remote);
    }

    #[test]
    fn scope_encoding() {
        let s = AuthorizationScope::from_str("app,1001").unwrap();
        assert_eq!(s.tag, AssociationType::LocalFromApp);
        assert_eq!(s.qualifier.as_deref(), Some("1001"));
        assert_eq!(s.to_string(), "app,1001");

        let s = AuthorizationScope::from_str("rem").unwrap();
        assert_eq!(s, AuthorizationScope::new(AssociationType::Remote, None));

        let s = AuthorizationScope::from_str("web,https://dapp.example").unwrap();
        assert_eq!(s.qualifier.as_deref(), Some("https://dapp.example"));

        assert!(AuthorizationScope::from_str("xyz,1").is_err());
    }

    #[tokio::test]
    async fn app_authorization() {
        let e = engine(AssociationType::LocalFromApp, 1001, Some(true));
        assert_eq!(
            e.verify_authorization_source(Some("https://dapp.example")).await,
            VerificationState::Succeeded("1001".to_string())
        );

        // No identity, nothing to verify against
        assert_eq!(
            e.verify_authorization_source(None).await,
            VerificationState::NotVerifiable
        );

        // Insecure identity
        assert_eq!(
            e.verify_authorization_source(Some("http://dapp.example")).await,
            VerificationState::Failed
        );

        let e = engine(AssociationType::LocalFromApp, 1001, Some(false));
        assert_eq!(
            e.verify_authorization_source(Some("https://dapp.example")).await,
            VerificationState::Failed
        );

        // Could not verify is treated as a failure
        let e = engine(AssociationType::LocalFromApp, 1001, None);
        assert_eq!(
            e.verify_authorization_source(Some("https://dapp.example")).await,
            VerificationState::Failed
        );
    }

    #[tokio::test]
    async fn browser_and_remote_authorization() {
        let e = engine(AssociationType::LocalFromBrowser, 0, None);
        assert_eq!(
            e.verify_authorization_source(Some("https://dapp.example/path")).await,
            VerificationState::Succeeded("https://dapp.example".to_string())
        );
        assert_eq!(
            e.verify_authorization_source(None).await,
            VerificationState::NotVerifiable
        );

        // Web origins must be https too
        for u in ["http://dapp.example", "file:///dapp", "not a uri"] {
            assert_eq!(
                e.verify_authorization_source(Some(u)).await,
                VerificationState::Failed,
                "{u}"
            );
        }

        let e = engine(AssociationType::Remote, 0, None);
        assert_eq!(
            e.verify_authorization_source(Some("https://dapp.example")).await,
            VerificationState::NotVerifiable
        );
    }

    #[tokio::test]
    async fn verification_timeout() {
        let e = TrustEngine::new(
            AssociationKind::Local,
            Some(caller(1001)),
            Arc::new(Verifier(Some(true), Duration::from_secs(10))),
            TrustConfig {
                verification_timeout: Duration::from_millis(50),
            },
        );

        assert_eq!(
            e.verify_authorization_source(Some("https://dapp.example")).await,
            VerificationState::Failed
        );
    }

    #[tokio::test]
    async fn reauthorization() {
        let e = engine(AssociationType::LocalFromApp, 1001, Some(true));

        // Tag mismatch
        let s = AuthorizationScope::from_str("web,https://dapp.example").unwrap();
        assert_eq!(
            e.verify_reauthorization_source(&s, Some("https://dapp.example")).await,
            VerificationState::Failed
        );

        // Unqualified
        let s = AuthorizationScope::from_str("app").unwrap();
        assert_eq!(
            e.verify_reauthorization_source(&s, Some("https://dapp.example")).await,
            VerificationState::NotVerifiable
        );

        // Qualified, re-verified
        let s = AuthorizationScope::from_str("app,1001").unwrap();
        assert_eq!(
            e.verify_reauthorization_source(&s, Some("https://dapp.example")).await,
            VerificationState::Succeeded("1001".to_string())
        );

        // Qualified, verified as another app
        let e = engine(AssociationType::LocalFromApp, 1002, Some(true));
        assert_eq!(
            e.verify_reauthorization_source(&s, Some("https://dapp.example")).await,
            VerificationState::Failed
        );

        // Qualified, source no longer verifiable
        let e = engine(AssociationType::LocalFromApp, 1001, Some(false));
        assert_eq!(
            e.verify_reauthorization_source(&s, Some("https://dapp.example")).await,
            VerificationState::Failed
        );
    }

    #[tokio::test]
    async fn browser_reauthorization_origin() {
        let e = engine(AssociationType::LocalFromBrowser, 1001, Some(true));
        let s = AuthorizationScope::from_str("web,https://dapp.example").unwrap();

        assert_eq!(
            e.verify_reauthorization_source(&s, Some("https://dapp.example")).await,
            VerificationState::Succeeded("https://dapp.example".to_string())
        );
        assert_eq!(
            e.verify_reauthorization_source(&s, Some("https://other.example")).await,
            VerificationState::Failed
        );
    }

    #[test]
    fn privileged_uid_mismatch() {
        let e = engine(AssociationType::LocalFromApp, 1002, Some(true));
        let s = AuthorizationScope::from_str("app,1001").unwrap();

        assert!(!e.verify_privileged_method_source(&s, None));
    }

    #[test]
    fn privileged_caller_changes() {
        let c = caller(1001);
        let e = TrustEngine::new(
            AssociationKind::Local,
            Some(c.clone()),
            Arc::new(DenyAllVerifier),
            TrustConfig::default(),
        );
        let s = AuthorizationScope::from_str("app,1001").unwrap();

        assert!(e.verify_privileged_method_source(&s, None));

        c.uid.store(1002, Ordering::SeqCst);
        assert!(!e.verify_privileged_method_source(&s, None));
    }

    #[test]
    fn privileged_lookup_failure() {
        let e = TrustEngine::new(
            AssociationKind::Local,
            Some(Arc::new(Caller {
                uid: AtomicU32::new(1001),
                fail: true,
            })),
            Arc::new(DenyAllVerifier),
            TrustConfig::default(),
        );

        let s = AuthorizationScope::from_str("app,1001").unwrap();
        assert!(!e.verify_privileged_method_source(&s, None));

        let s = AuthorizationScope::from_str("app,not-a-uid").unwrap();
        assert!(!e.verify_privileged_method_source(&s, None));
    }

    /// Privileged calls are admitted iff the tag matches and the scope is
    /// unqualified, web scoped, or qualified with the current caller uid
    #[test]
    fn privileged_scope_grid() {
        let qualifiers = [None, Some("1001"), Some("1002"), Some("https://dapp.example")];

        for association in AssociationType::iter() {
            let e = engine(association, 1001, Some(true));

            for tag in AssociationType::iter() {
                for q in qualifiers {
                    let s = AuthorizationScope::new(tag, q.map(str::to_string));

                    let expected = tag == association
                        && (q.is_none()
                            || tag == AssociationType::LocalFromBrowser
                            || (tag == AssociationType::LocalFromApp && q == Some("1001")));

                    assert_eq!(
                        e.verify_privileged_method_source(&s, None),
                        expected,
                        "association: {association:?} scope: {s}"
                    );
                }
            }
        }
    }
}
