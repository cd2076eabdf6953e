//! HTTP-level integration tests for the transport and client state machine,
//! against a mocked ACME server.

use acme_core::crypto::generate_account_key;
use acme_core::Client;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn directory_body(server: &MockServer) -> Value {
    json!({
        "newNonce": format!("{}/new-nonce", server.uri()),
        "newAccount": format!("{}/new-account", server.uri()),
        "newOrder": format!("{}/new-order", server.uri()),
        "revokeCert": format!("{}/revoke-cert", server.uri()),
        "keyChange": format!("{}/key-change", server.uri()),
        "meta": { "termsOfService": format!("{}/tos", server.uri()) }
    })
}

async fn mount_directory(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory_body(server)))
        .mount(server)
        .await;
}

async fn mount_new_nonce(server: &MockServer, nonce: &str) {
    Mock::given(method("HEAD"))
        .and(path("/new-nonce"))
        .respond_with(ResponseTemplate::new(200).insert_header("Replay-Nonce", nonce))
        .mount(server)
        .await;
}

/// Matches a POST whose JWS `protected` header carries the given nonce,
/// so a mock can distinguish a request from its retry.
struct NonceIs(&'static str);

impl wiremock::Match for NonceIs {
    fn matches(&self, request: &Request) -> bool {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return false;
        };
        let Some(protected) = body.get("protected").and_then(Value::as_str) else {
            return false;
        };
        let Ok(decoded) = base64::decode_config(protected, base64::URL_SAFE_NO_PAD) else {
            return false;
        };
        let Ok(header) = serde_json::from_slice::<Value>(&decoded) else {
            return false;
        };
        header.get("nonce").and_then(Value::as_str) == Some(self.0)
    }
}

#[tokio::test]
async fn initialise_finds_existing_account() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_new_nonce(&server, "nonce-1").await;

    Mock::given(method("POST"))
        .and(path("/new-account"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "valid" }))
                .insert_header("Location", format!("{}/account/1", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    let http = http_client::h1::H1Client::new();
    let (_client, account) = Client::initialise(
        http,
        format!("{}/directory", server.uri()),
        None,
        generate_account_key(),
    )
    .await
    .unwrap();

    assert_eq!(account.url(), format!("{}/account/1", server.uri()));
}

#[tokio::test]
async fn initialise_creates_account_when_missing() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_new_nonce(&server, "nonce-1").await;

    Mock::given(method("POST"))
        .and(path("/new-account"))
        .and(NonceIs("nonce-1"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({
                    "type": "urn:ietf:params:acme:error:accountDoesNotExist",
                    "detail": "no such account"
                }))
                .insert_header("content-type", "application/problem+json")
                .insert_header("Replay-Nonce", "nonce-2"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/new-account"))
        .and(NonceIs("nonce-2"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "status": "valid", "termsOfServiceAgreed": true }))
                .insert_header("Location", format!("{}/account/2", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    let http = http_client::h1::H1Client::new();
    let (_client, account) = Client::initialise(
        http,
        format!("{}/directory", server.uri()),
        Some("admin@example.org".to_string()),
        generate_account_key(),
    )
    .await
    .unwrap();

    assert_eq!(account.url(), format!("{}/account/2", server.uri()));
}

/// S7: a transport that returns a badNonce problem on the first POST and
/// succeeds on the second resolves successfully, and the retry's protected
/// header carries the nonce handed back alongside the 400.
#[tokio::test]
async fn bad_nonce_retry_resends_with_new_nonce() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_new_nonce(&server, "nonce-1").await;

    Mock::given(method("POST"))
        .and(path("/new-account"))
        .and(NonceIs("nonce-1"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({
                    "type": "urn:ietf:params:acme:error:badNonce",
                    "detail": "JWS has an invalid anti-replay nonce"
                }))
                .insert_header("content-type", "application/problem+json")
                .insert_header("Replay-Nonce", "nonce-2"),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/new-account"))
        .and(NonceIs("nonce-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "valid" }))
                .insert_header("Location", format!("{}/account/3", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    let http = http_client::h1::H1Client::new();
    let (client, _account) = Client::initialise(
        http,
        format!("{}/directory", server.uri()),
        None,
        generate_account_key(),
    )
    .await
    .unwrap();

    assert!(client.terms_of_service_uri().is_some());
}

/// Full order -> authorization -> finalize -> download flow. The single
/// authorization is already `valid` on first fetch, so no challenge
/// provisioning is required of the solver.
#[tokio::test]
async fn sign_certificate_happy_path() {
    let server = MockServer::start().await;
    mount_directory(&server).await;
    mount_new_nonce(&server, "nonce-1").await;

    Mock::given(method("POST"))
        .and(path("/new-account"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "valid" }))
                .insert_header("Location", format!("{}/account/1", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    let authz_url = format!("{}/authz/1", server.uri());
    let finalize_url = format!("{}/order/1/finalize", server.uri());
    let certificate_url = format!("{}/cert/1", server.uri());
    let order_url = format!("{}/order/1", server.uri());

    Mock::given(method("POST"))
        .and(path("/new-order"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({
                    "status": "ready",
                    "identifiers": [{ "type": "dns", "value": "example.org" }],
                    "authorizations": [authz_url],
                    "finalize": finalize_url,
                }))
                .insert_header("Location", order_url.as_str()),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/authz/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "valid",
            "identifier": { "type": "dns", "value": "example.org" },
            "challenges": [],
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/order/1/finalize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "valid",
            "identifiers": [{ "type": "dns", "value": "example.org" }],
            "authorizations": [authz_url],
            "finalize": finalize_url,
            "certificate": certificate_url,
        })))
        .mount(&server)
        .await;

    let chain_pem = "-----BEGIN CERTIFICATE-----\nleaf\n-----END CERTIFICATE-----\n\
                      -----BEGIN CERTIFICATE-----\nintermediate\n-----END CERTIFICATE-----\n";
    Mock::given(method("POST"))
        .and(path("/cert/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(chain_pem))
        .mount(&server)
        .await;

    let http = http_client::h1::H1Client::new();
    let (_client, account) = Client::initialise(
        http,
        format!("{}/directory", server.uri()),
        None,
        generate_account_key(),
    )
    .await
    .unwrap();

    let (_key_pem, csr_der) = acme_core::x509::generate_key_and_csr("example.org").unwrap();
    let solver = acme_core::http_solver(|_domain, _token, _key_auth| async { Ok(()) });

    let chain = account
        .sign_certificate(
            &solver,
            || tokio::time::sleep(std::time::Duration::from_millis(1)),
            &csr_der,
        )
        .await
        .unwrap();

    assert_eq!(chain.len(), 2);
    assert!(chain[0].contains("leaf"));
    assert!(chain[1].contains("intermediate"));
}
