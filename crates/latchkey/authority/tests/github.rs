use latchkey_authority::{AppCredentials, AuthorityProvider, GitHubAppProvider, ProviderError};
use latchkey_types::{PermissionLevel, PermissionSet, ResourceId};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_KEY: &str = include_str!("../../../../testdata/trusted_key.pem");

fn provider(server: &MockServer) -> GitHubAppProvider {
    let credentials =
        AppCredentials::new("4242", &SecretString::from(APP_KEY.to_string())).unwrap();
    GitHubAppProvider::new(Arc::new(credentials), &server.uri(), Duration::from_secs(5)).unwrap()
}

fn repo(s: &str) -> ResourceId {
    ResourceId::parse(s).unwrap()
}

#[tokio::test]
async fn test_installation_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/app/installation"))
        .and(header("X-GitHub-Api-Version", "2022-11-28"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 991,
            "account": { "login": "org" },
            "permissions": {
                "contents": "write",
                "metadata": "read",
                "administration": "admin"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authority = provider(&server)
        .installation(&repo("org/app"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(authority.installation_id, 991);
    assert_eq!(authority.permissions.get("contents"), Some(PermissionLevel::Write));
    assert_eq!(authority.permissions.get("metadata"), Some(PermissionLevel::Read));
    assert_eq!(authority.permissions.get("administration"), None);
}

#[tokio::test]
async fn test_installation_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/ghost/installation"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let found = provider(&server).installation(&repo("org/ghost")).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_installation_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/app/installation"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = provider(&server).installation(&repo("org/app")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 502, .. }));
}

#[tokio::test]
async fn test_mint_token_scoped_to_repo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/991/access_tokens"))
        .and(body_json(json!({
            "repositories": ["app"],
            "permissions": { "contents": "read" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "ghs_minted",
            "expires_at": "2030-01-01T00:00:00Z",
            "permissions": { "contents": "read", "metadata": "read" },
            "repository_selection": "selected"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wanted = PermissionSet::single("contents", PermissionLevel::Read);
    let minted = provider(&server)
        .mint_token(991, &repo("org/app"), &wanted)
        .await
        .unwrap();

    assert_eq!(minted.token.expose_secret(), "ghs_minted");
    assert_eq!(minted.expires_at.to_rfc3339(), "2030-01-01T00:00:00+00:00");
    assert_eq!(minted.permissions.get("metadata"), Some(PermissionLevel::Read));
}

#[tokio::test]
async fn test_mint_failure_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/installations/991/access_tokens"))
        .respond_with(ResponseTemplate::new(422).set_body_string("permissions invalid"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .mint_token(991, &repo("org/app"), &PermissionSet::single("contents", PermissionLevel::Write))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 422, ref message } if message == "permissions invalid"));
}

#[tokio::test]
async fn test_read_file_uses_scoped_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/.github/access.yaml"))
        .and(header("Authorization", "Bearer ghs_reader"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "file",
            "encoding": "base64",
            "content": "c2VsZjog\nb3JnL2Fw\ncC1h\n"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let content = provider(&server)
        .read_file(
            &repo("org/app"),
            ".github/access.yaml",
            &SecretString::from("ghs_reader".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(content.as_deref(), Some(&b"self: org/app-a"[..]));
}

#[tokio::test]
async fn test_read_missing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/.github/access.yaml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let content = provider(&server)
        .read_file(
            &repo("org/app"),
            ".github/access.yaml",
            &SecretString::from("ghs_reader".to_string()),
        )
        .await
        .unwrap();
    assert!(content.is_none());
}

#[tokio::test]
async fn test_read_forbidden_file_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/.github/access.yaml"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "Resource not accessible by integration" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let content = provider(&server)
        .read_file(
            &repo("org/app"),
            ".github/access.yaml",
            &SecretString::from("ghs_reader".to_string()),
        )
        .await
        .unwrap();
    assert!(content.is_none());
}

#[tokio::test]
async fn test_read_server_error_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/org/app/contents/.github/access.yaml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = provider(&server)
        .read_file(
            &repo("org/app"),
            ".github/access.yaml",
            &SecretString::from("ghs_reader".to_string()),
        )
        .await;
    assert!(result.is_err());
}
