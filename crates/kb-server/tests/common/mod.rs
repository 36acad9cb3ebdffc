//! Common test utilities and fixtures.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};

use kb_model::Client;
use kb_server::{Providers, Server, ServerConfig};

/// Shared secret the test identity provider signs with.
pub const SSO_SECRET: &str = "test-sso-secret";

/// The registered test client.
pub const CLIENT_ID: &str = "demo-app";

/// Its secret.
pub const CLIENT_SECRET: &str = "s3cret-value";

/// Its sole allow-listed redirect URI.
pub const REDIRECT_URI: &str = "https://app.example/cb";

// Fixed signing key so tests skip RSA generation.
const TEST_KEY_PEM: &str = include_str!("../../../kb-crypto/testdata/test_key.pem");

/// Test environment running a real server on an ephemeral port.
pub struct TestEnv {
    _key_dir: tempfile::TempDir,
    /// Base URL of the running server.
    pub base_url: String,
    /// Cookie-keeping HTTP client that does not follow redirects.
    pub client: reqwest::Client,
}

impl TestEnv {
    /// Starts a server with default test configuration.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(|_| {}).await
    }

    /// Starts a server after letting the test adjust the configuration.
    pub async fn with_config(customize: impl FnOnce(&mut ServerConfig)) -> anyhow::Result<Self> {
        let key_dir = tempfile::tempdir()?;
        let key_path = key_dir.path().join("signing_key.pem");
        std::fs::write(&key_path, TEST_KEY_PEM)?;

        let mut config = ServerConfig::for_testing(&key_path);
        customize(&mut config);

        let providers = Providers::new()
            .with_clients(vec![Client {
                client_id: CLIENT_ID.to_string(),
                client_secret: CLIENT_SECRET.to_string(),
                name: "Demo App".to_string(),
                redirect_uris: vec![REDIRECT_URI.to_string()],
                owner_id: 7,
            }])
            .with_trust_level("alice", 2);

        let server = Server::with_providers(config, providers).await?;
        let addr = server.local_addr()?;
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                eprintln!("test server error: {e}");
            }
        });

        let base_url = format!("http://{addr}");
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()?;

        wait_for_server(&client, &base_url).await?;

        Ok(Self {
            _key_dir: key_dir,
            base_url,
            client,
        })
    }

    /// Builds an absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Drives `auth` and `callback` for user `alice`, leaving the consent
    /// cookie in the client's jar. Returns the consent page HTML and the raw
    /// consent cookie value (the jar drops already-expired cookies, so tests
    /// for server-side expiry need the raw value).
    pub async fn begin_authorized_flow(
        &self,
        state_param: Option<&str>,
        oidc_nonce: Option<&str>,
        scope: &str,
    ) -> anyhow::Result<FlowArtifacts> {
        let mut query = vec![
            ("client_id", CLIENT_ID.to_string()),
            ("redirect_uri", REDIRECT_URI.to_string()),
            ("scope", scope.to_string()),
            ("response_type", "code".to_string()),
        ];
        if let Some(s) = state_param {
            query.push(("state", s.to_string()));
        }
        if let Some(n) = oidc_nonce {
            query.push(("nonce", n.to_string()));
        }

        let response = self
            .client
            .get(self.url("/auth"))
            .query(&query)
            .send()
            .await?;
        anyhow::ensure!(
            response.status().is_redirection(),
            "auth should redirect to the identity provider, got {}",
            response.status()
        );
        let location = response
            .headers()
            .get("location")
            .ok_or_else(|| anyhow::anyhow!("auth redirect without location"))?
            .to_str()?
            .to_string();
        let nonce = sso_nonce_from_redirect(&location)?;

        let (sso, sig) = signed_sso_response(&format!(
            "nonce={nonce}&username=alice&external_id=42&name=Alice\
             &email=alice%40real.example&avatar_url=https%3A%2F%2Fcdn.example%2Fa.png"
        ));
        let response = self
            .client
            .get(self.url("/callback"))
            .query(&[("sso", sso), ("sig", sig)])
            .send()
            .await?;
        anyhow::ensure!(
            response.status().is_success(),
            "callback should render the consent page, got {}",
            response.status()
        );
        let consent_cookie = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("consent_token="))
            .map(|v| v.split(';').next().unwrap_or("").to_string())
            .ok_or_else(|| anyhow::anyhow!("callback did not set the consent cookie"))?;

        Ok(FlowArtifacts {
            consent_html: response.text().await?,
            consent_cookie,
        })
    }

    /// Approves the pending consent; returns the redirect's query pairs.
    pub async fn approve(&self) -> anyhow::Result<Vec<(String, String)>> {
        self.post_consent("/authorize").await
    }

    /// Denies the pending consent; returns the redirect's query pairs.
    pub async fn deny(&self) -> anyhow::Result<Vec<(String, String)>> {
        self.post_consent("/deny").await
    }

    async fn post_consent(&self, path: &str) -> anyhow::Result<Vec<(String, String)>> {
        let response = self.client.post(self.url(path)).send().await?;
        anyhow::ensure!(
            response.status().is_redirection(),
            "{path} should redirect to the client, got {}",
            response.status()
        );
        let location = response
            .headers()
            .get("location")
            .ok_or_else(|| anyhow::anyhow!("consent redirect without location"))?
            .to_str()?;
        anyhow::ensure!(
            location.starts_with(REDIRECT_URI),
            "consent must redirect to the registered URI, got {location}"
        );
        let url = url::Url::parse(location)?;
        Ok(url.query_pairs().into_owned().collect())
    }

    /// Redeems `code` with the registered client's credentials.
    pub async fn redeem_code(&self, code: &str) -> anyhow::Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/token"))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", CLIENT_ID),
                ("client_secret", CLIENT_SECRET),
                ("redirect_uri", REDIRECT_URI),
            ])
            .send()
            .await?)
    }
}

/// What a completed `auth` + `callback` leaves behind for the test.
pub struct FlowArtifacts {
    /// The rendered consent page.
    pub consent_html: String,
    /// Raw value of the `consent_token` cookie.
    pub consent_cookie: String,
}

/// Signs an SSO response payload the way the identity provider would.
pub fn signed_sso_response(payload: &str) -> (String, String) {
    let sso = STANDARD.encode(payload);
    let sig = kb_crypto::hmac_sha256_hex(SSO_SECRET.as_bytes(), sso.as_bytes());
    (sso, sig)
}

/// Extracts the nonce we embedded in the outbound SSO redirect.
pub fn sso_nonce_from_redirect(location: &str) -> anyhow::Result<String> {
    let url = url::Url::parse(location)?;
    let sso = url
        .query_pairs()
        .find(|(k, _)| k == "sso")
        .map(|(_, v)| v.to_string())
        .ok_or_else(|| anyhow::anyhow!("redirect is missing the sso parameter"))?;
    let decoded = String::from_utf8(STANDARD.decode(sso.as_bytes())?)?;
    url::form_urlencoded::parse(decoded.as_bytes())
        .find(|(k, _)| k == "nonce")
        .map(|(_, v)| v.to_string())
        .ok_or_else(|| anyhow::anyhow!("sso payload is missing the nonce"))
}

/// Looks up a query pair by key.
pub fn pair<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

async fn wait_for_server(client: &reqwest::Client, base_url: &str) -> anyhow::Result<()> {
    for _ in 0..50 {
        if let Ok(response) = client.get(format!("{base_url}/health")).send().await
            && response.status().is_success()
        {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("server did not become ready")
}
