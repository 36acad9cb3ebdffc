//! End-to-end tests of the authorization flow.

mod common;

use serde::Deserialize;

use common::{CLIENT_ID, CLIENT_SECRET, REDIRECT_URI, TestEnv, pair, signed_sso_response};

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    id_token: Option<String>,
    scope: Option<String>,
}

/// OAuth error body.
#[derive(Debug, Deserialize)]
struct OauthError {
    error: String,
}

#[tokio::test]
async fn full_happy_path_issues_tokens_and_userinfo() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let flow = env
        .begin_authorized_flow(Some("xyz-state"), Some("client-nonce"), "openid profile")
        .await?;
    assert!(flow.consent_html.contains("alice"), "consent page shows the user");
    assert!(flow.consent_html.contains("Demo App"), "consent page shows the app");

    let pairs = env.approve().await?;
    let code = pair(&pairs, "code").expect("redirect carries a code").to_string();
    assert_eq!(pair(&pairs, "state"), Some("xyz-state"));

    let response = env.redeem_code(&code).await?;
    assert_eq!(response.status(), 200);
    let tokens: TokenResponse = response.json().await?;
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.expires_in, 1800);
    assert_eq!(tokens.scope.as_deref(), Some("openid profile"));
    let id_token = tokens.id_token.expect("openid scope yields an ID token");

    // The ID token must carry the relay address and the client's nonce.
    let payload = id_token.split('.').nth(1).unwrap();
    let claims: serde_json::Value = serde_json::from_slice(
        &base64::Engine::decode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, payload)?,
    )?;
    assert_eq!(claims["sub"], "42");
    assert_eq!(claims["nonce"], "client-nonce");
    assert_eq!(claims["email"], "alice_42@privaterelay.example.com");
    assert_eq!(claims["trust_level"], 2);
    assert_eq!(claims["aud"][0], CLIENT_ID);

    // Userinfo serves the cached privacy projection.
    let response = env
        .client
        .get(env.url("/userinfo"))
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let profile: serde_json::Value = response.json().await?;
    assert_eq!(profile["sub"], "42");
    assert_eq!(profile["preferred_username"], "alice");
    assert_eq!(profile["email"], "alice_42@privaterelay.example.com");
    assert_eq!(profile["trust_level"], 2);
    assert_eq!(profile["picture"], "https://cdn.example/a.png");
    assert_eq!(profile["active"], true);
    assert!(
        !profile.to_string().contains("alice@real.example"),
        "the real email must never reach clients"
    );

    Ok(())
}

#[tokio::test]
async fn authorization_code_is_single_use() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.begin_authorized_flow(None, None, "openid").await?;
    let pairs = env.approve().await?;
    let code = pair(&pairs, "code").unwrap().to_string();

    let first = env.redeem_code(&code).await?;
    assert_eq!(first.status(), 200);

    let second = env.redeem_code(&code).await?;
    assert_eq!(second.status(), 400);
    let error: OauthError = second.json().await?;
    assert_eq!(error.error, "invalid_grant");

    Ok(())
}

#[tokio::test]
async fn unknown_client_is_rejected_without_a_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env
        .client
        .get(env.url("/auth"))
        .query(&[("client_id", "unknown-client"), ("redirect_uri", "https://x")])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "unknown client_id");
    Ok(())
}

#[tokio::test]
async fn unregistered_redirect_uri_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env
        .client
        .get(env.url("/auth"))
        .query(&[
            ("client_id", CLIENT_ID),
            ("redirect_uri", "https://evil.example/cb"),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "redirect_uri not registered for this app");
    Ok(())
}

#[tokio::test]
async fn callback_without_session_cookie_fails() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let (sso, sig) = signed_sso_response("nonce=whatever&username=alice");
    let response = env
        .client
        .get(env.url("/callback"))
        .query(&[("sso", sso), ("sig", sig)])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "invalid session, please try again");
    Ok(())
}

#[tokio::test]
async fn callback_with_tampered_signature_fails() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.url("/auth"))
        .query(&[
            ("client_id", CLIENT_ID),
            ("redirect_uri", REDIRECT_URI),
            ("scope", "openid"),
        ])
        .send()
        .await?;
    assert!(response.status().is_redirection());

    // A signature computed under a different secret must be rejected, and
    // the session is consumed either way.
    let sso = base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        "nonce=guess&username=mallory",
    );
    let response = env
        .client
        .get(env.url("/callback"))
        .query(&[("sso", sso.as_str()), ("sig", "deadbeef")])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert!(
        response.text().await?.starts_with("authentication failed"),
        "SSO validation failure must be reported"
    );

    // The consumed session cannot be retried.
    let (sso, sig) = signed_sso_response("nonce=guess&username=mallory");
    let response = env
        .client
        .get(env.url("/callback"))
        .query(&[("sso", sso), ("sig", sig)])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "invalid session, please try again");

    Ok(())
}

#[tokio::test]
async fn expired_consent_cannot_be_approved() -> anyhow::Result<()> {
    let env = TestEnv::with_config(|c| c.consent_ttl_secs = 0).await?;
    let flow = env.begin_authorized_flow(None, None, "openid").await?;

    // Present the cookie explicitly: even with the cookie intact, the store
    // has expired the consent and must report it as gone.
    let response = env
        .client
        .post(env.url("/authorize"))
        .header("cookie", format!("consent_token={}", flow.consent_cookie))
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "consent expired, please try again");
    Ok(())
}

#[tokio::test]
async fn deny_redirects_with_access_denied() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.begin_authorized_flow(Some("xyz"), None, "openid").await?;

    let pairs = env.deny().await?;
    assert_eq!(pair(&pairs, "error"), Some("access_denied"));
    assert_eq!(pair(&pairs, "error_description"), Some("user denied the request"));
    assert_eq!(pair(&pairs, "state"), Some("xyz"));
    assert_eq!(pair(&pairs, "code"), None);

    // The consent was consumed; a second decision is impossible.
    let response = env.client.post(env.url("/deny")).send().await?;
    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn token_with_wrong_secret_is_unauthorized() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.begin_authorized_flow(None, None, "openid").await?;
    let pairs = env.approve().await?;
    let code = pair(&pairs, "code").unwrap().to_string();

    let response = env
        .client
        .post(env.url("/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", CLIENT_ID),
            ("client_secret", "wrong"),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    let error: OauthError = response.json().await?;
    assert_eq!(error.error, "invalid_client");
    Ok(())
}

#[tokio::test]
async fn token_with_mismatched_client_id_is_invalid_grant() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.begin_authorized_flow(None, None, "openid").await?;
    let pairs = env.approve().await?;
    let code = pair(&pairs, "code").unwrap().to_string();

    let response = env
        .client
        .post(env.url("/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", "test"),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    let error: OauthError = response.json().await?;
    assert_eq!(error.error, "invalid_grant");
    Ok(())
}

#[tokio::test]
async fn unsupported_grant_type_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env
        .client
        .post(env.url("/token"))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    let error: OauthError = response.json().await?;
    assert_eq!(error.error, "unsupported_grant_type");
    Ok(())
}

#[tokio::test]
async fn token_without_code_is_invalid_request() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env
        .client
        .post(env.url("/token"))
        .form(&[("grant_type", "authorization_code")])
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    let error: OauthError = response.json().await?;
    assert_eq!(error.error, "invalid_request");
    Ok(())
}

#[tokio::test]
async fn basic_auth_credentials_are_accepted() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.begin_authorized_flow(None, None, "openid").await?;
    let pairs = env.approve().await?;
    let code = pair(&pairs, "code").unwrap().to_string();

    let response = env
        .client
        .post(env.url("/token"))
        .basic_auth(CLIENT_ID, Some(CLIENT_SECRET))
        .form(&[("grant_type", "authorization_code"), ("code", code.as_str())])
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let tokens: TokenResponse = response.json().await?;
    assert!(!tokens.access_token.is_empty());
    Ok(())
}

#[tokio::test]
async fn builtin_test_client_skips_secret_validation() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    // The built-in client resolves without any registration; only loopback
    // redirects are allowed.
    let response = env
        .client
        .get(env.url("/auth"))
        .query(&[
            ("client_id", "test"),
            ("redirect_uri", "http://localhost:8080/"),
            ("scope", "openid"),
        ])
        .send()
        .await?;
    assert!(response.status().is_redirection());
    let location = response.headers().get("location").unwrap().to_str()?;
    assert!(location.starts_with("https://forum.example/session/sso_provider?sso="));
    let nonce = common::sso_nonce_from_redirect(location)?;

    let (sso, sig) =
        signed_sso_response(&format!("nonce={nonce}&username=alice&external_id=42"));
    let response = env
        .client
        .get(env.url("/callback"))
        .query(&[("sso", sso), ("sig", sig)])
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let response = env.client.post(env.url("/authorize")).send().await?;
    assert!(response.status().is_redirection());
    let location = response.headers().get("location").unwrap().to_str()?;
    assert!(location.starts_with("http://localhost:8080/"));
    let code = url::Url::parse(location)?
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
        .expect("redirect carries a code");

    // No client_id, no client_secret: the built-in client needs neither.
    let response = env
        .client
        .post(env.url("/token"))
        .form(&[("grant_type", "authorization_code"), ("code", code.as_str())])
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let tokens: TokenResponse = response.json().await?;
    assert_eq!(tokens.token_type, "Bearer");
    assert!(tokens.id_token.is_some());

    Ok(())
}
