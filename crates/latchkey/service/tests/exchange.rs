use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use latchkey_authority::{
    AuthorityProvider, InMemoryAuthorityProvider, MintedToken, ProviderCall, ProviderError,
};
use latchkey_identity::{IdentityVerifier, VerifyOptions};
use latchkey_policy::POLICY_PATH;
use latchkey_service::{AccessBroker, BrokerError, Classification, NO_PERMISSION_GRANTED};
use latchkey_types::{Authority, PermissionLevel, PermissionSet, ResourceId};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRUSTED_KEY: &[u8] = include_bytes!("../../../../testdata/trusted_key.pem");
const JWKS: &str = include_str!("../../../../testdata/jwks.json");

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn repo(s: &str) -> ResourceId {
    ResourceId::parse(s).unwrap()
}

fn perms(pairs: &[(&str, PermissionLevel)]) -> PermissionSet {
    pairs.iter().map(|(s, l)| (s.to_string(), *l)).collect()
}

struct Harness {
    _issuer: MockServer,
    issuer_url: String,
    provider: Arc<InMemoryAuthorityProvider>,
}

impl Harness {
    async fn start() -> Self {
        let issuer = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
            .mount(&issuer)
            .await;

        Self {
            issuer_url: issuer.uri(),
            _issuer: issuer,
            provider: Arc::new(InMemoryAuthorityProvider::recording()),
        }
    }

    fn broker(&self) -> AccessBroker {
        self.broker_with(self.provider.clone())
    }

    fn broker_with(&self, provider: Arc<dyn AuthorityProvider>) -> AccessBroker {
        let verifier = IdentityVerifier::new(Duration::from_secs(5)).unwrap();
        AccessBroker::new(provider, verifier, VerifyOptions::new(self.issuer_url.clone()))
    }

    fn token_for(&self, source: &str, exp: u64) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some("trusted-key".to_string());
        let claims = json!({
            "iss": self.issuer_url,
            "exp": exp,
            "iat": now(),
            "repository": source,
            "sub": format!("repo:{source}:ref:refs/heads/main"),
        });
        encode(&header, &claims, &EncodingKey::from_rsa_pem(TRUSTED_KEY).unwrap()).unwrap()
    }

    fn valid_token(&self, source: &str) -> String {
        self.token_for(source, now() + 600)
    }

    fn install(&self, target: &str, id: u64, granted: &[(&str, PermissionLevel)]) {
        self.provider
            .install(repo(target), Authority::new(id, perms(granted)));
    }

    fn policy(&self, target: &str, yaml: &str) {
        self.provider.put_file(repo(target), POLICY_PATH, yaml);
    }
}

fn assert_denied(err: &BrokerError) {
    assert_eq!(
        err.classification(),
        Classification::Client {
            status: 403,
            message: NO_PERMISSION_GRANTED.to_string(),
        },
        "{err:?}"
    );
}

#[tokio::test]
async fn test_self_request_grants_policy_permissions() {
    let h = Harness::start().await;
    h.install(
        "org/app-a",
        42,
        &[("contents", PermissionLevel::Write), ("single_file", PermissionLevel::Read)],
    );
    h.policy(
        "org/app-a",
        "self: org/app-a\npolicies:\n  - repo: self\n    permissions:\n      contents: read\n",
    );

    let issued = h
        .broker()
        .exchange(&h.valid_token("org/app-a"), "self")
        .await
        .unwrap();

    assert_eq!(issued.repo, repo("org/app-a"));
    assert_eq!(issued.permissions, perms(&[("contents", PermissionLevel::Read)]));
    assert!(issued.token.expose_secret().starts_with("ghs_memory_"));

    assert_eq!(
        h.provider.calls(),
        vec![
            ProviderCall::Installation(repo("org/app-a")),
            ProviderCall::Mint {
                installation_id: 42,
                repo: repo("org/app-a"),
                permissions: perms(&[("single_file", PermissionLevel::Read)]),
            },
            ProviderCall::ReadFile {
                repo: repo("org/app-a"),
                path: POLICY_PATH.to_string(),
            },
            ProviderCall::Mint {
                installation_id: 42,
                repo: repo("org/app-a"),
                permissions: perms(&[("contents", PermissionLevel::Read)]),
            },
        ]
    );
}

#[tokio::test]
async fn test_cross_repo_without_policy_is_denied() {
    let h = Harness::start().await;
    h.install("org/app-a", 1, &[("contents", PermissionLevel::Write)]);

    let err = h
        .broker()
        .exchange(&h.valid_token("org/app-b"), "org/app-a")
        .await
        .unwrap_err();

    assert_denied(&err);
    assert!(matches!(err, BrokerError::NotGranted { outcome: "no_policy" }));
}

#[tokio::test]
async fn test_self_rule_does_not_admit_other_repos() {
    let h = Harness::start().await;
    h.install("org/app-a", 1, &[("contents", PermissionLevel::Write)]);
    h.policy(
        "org/app-a",
        "self: org/app-a\npolicies:\n  - repo: self\n    permissions:\n      contents: read\n",
    );

    let err = h
        .broker()
        .exchange(&h.valid_token("org/app-b"), "org/app-a")
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::NotGranted { outcome: "no_matching_rule" }));
}

#[tokio::test]
async fn test_no_authority_never_reaches_policy() {
    let h = Harness::start().await;

    let err = h
        .broker()
        .exchange(&h.valid_token("org/app-a"), "org/app-c")
        .await
        .unwrap_err();

    assert_denied(&err);
    assert!(matches!(err, BrokerError::NoAuthority(_)));
    assert_eq!(h.provider.calls(), vec![ProviderCall::Installation(repo("org/app-c"))]);
}

#[tokio::test]
async fn test_copied_policy_is_ignored() {
    let h = Harness::start().await;
    h.install("org/copy", 5, &[("contents", PermissionLevel::Write)]);
    h.policy(
        "org/copy",
        "self: org/upstream\npolicies:\n  - repo: '*'\n    permissions:\n      contents: write\n",
    );

    let err = h
        .broker()
        .exchange(&h.valid_token("org/app-a"), "org/copy")
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::NotGranted { outcome: "foreign_policy" }));
}

#[tokio::test]
async fn test_first_matching_rule_decides() {
    let h = Harness::start().await;
    h.install(
        "org/config",
        9,
        &[("contents", PermissionLevel::Write), ("issues", PermissionLevel::Write)],
    );
    h.policy(
        "org/config",
        "self: org/config\npolicies:\n  - repo: org/app-*\n    permissions:\n      issues: read\n  - repo: org/*\n    permissions:\n      contents: write\n",
    );

    let issued = h
        .broker()
        .exchange(&h.valid_token("org/app-a"), "org/config")
        .await
        .unwrap();
    assert_eq!(issued.permissions, perms(&[("issues", PermissionLevel::Read)]));

    let issued = h
        .broker()
        .exchange(&h.valid_token("org/tools"), "org/config")
        .await
        .unwrap();
    assert_eq!(issued.permissions, perms(&[("contents", PermissionLevel::Write)]));
}

#[tokio::test]
async fn test_over_request_narrowed_to_nothing_is_denied() {
    let h = Harness::start().await;
    h.install("org/config", 9, &[("contents", PermissionLevel::Read)]);
    h.policy(
        "org/config",
        "self: org/config\npolicies:\n  - repo: org/*\n    permissions:\n      contents: write\n",
    );

    let err = h
        .broker()
        .exchange(&h.valid_token("org/app-a"), "org/config")
        .await
        .unwrap_err();
    assert_denied(&err);
    assert!(matches!(err, BrokerError::NotGranted { outcome: "narrowed_to_nothing" }));
}

#[tokio::test]
async fn test_expired_identity_is_client_error() {
    let h = Harness::start().await;
    h.install("org/app-a", 1, &[("contents", PermissionLevel::Write)]);

    let err = h
        .broker()
        .exchange(&h.token_for("org/app-a", now() - 3600), "self")
        .await
        .unwrap_err();

    match err.classification() {
        Classification::Client { status, message } => {
            assert_eq!(status, 400);
            assert!(message.starts_with("token - "), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(h.provider.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_repo_rejected_before_verification() {
    let h = Harness::start().await;

    let err = h
        .broker()
        .exchange("not-even-a-jwt", "just-a-name")
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::InvalidRepository(_)));
    assert!(matches!(err.classification(), Classification::Client { status: 400, .. }));
}

/// Serves policy reads but refuses to mint anything broader
struct PolicyReadOnly(Arc<InMemoryAuthorityProvider>);

#[async_trait]
impl AuthorityProvider for PolicyReadOnly {
    async fn installation(&self, repo: &ResourceId) -> Result<Option<Authority>, ProviderError> {
        self.0.installation(repo).await
    }

    async fn mint_token(
        &self,
        installation_id: u64,
        repo: &ResourceId,
        permissions: &PermissionSet,
    ) -> Result<MintedToken, ProviderError> {
        if permissions.get("single_file").is_some() {
            return self.0.mint_token(installation_id, repo, permissions).await;
        }
        Err(ProviderError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        })
    }

    async fn read_file(
        &self,
        repo: &ResourceId,
        path: &str,
        token: &SecretString,
    ) -> Result<Option<Vec<u8>>, ProviderError> {
        self.0.read_file(repo, path, token).await
    }
}

#[tokio::test]
async fn test_mint_failure_is_internal() {
    let h = Harness::start().await;
    h.install("org/app-a", 1, &[("contents", PermissionLevel::Write)]);
    h.policy(
        "org/app-a",
        "self: org/app-a\npolicies:\n  - repo: self\n    permissions:\n      contents: read\n",
    );

    let broker = h.broker_with(Arc::new(PolicyReadOnly(h.provider.clone())));
    let err = broker
        .exchange(&h.valid_token("org/app-a"), "self")
        .await
        .unwrap_err();

    assert!(matches!(err, BrokerError::Issuance(_)));
    assert_eq!(err.classification(), Classification::Internal);
}
