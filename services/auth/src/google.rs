//! Google identity: configuration and One-Tap ID token verification

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::{
    error::{AuthError, AuthResult},
    models::ProviderProfile,
};

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Google OAuth client configuration
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with Google for the code flow
    pub redirect_url: String,
    /// Where the browser lands after a completed sign-in
    pub app_url: String,
    pub certs_url: String,
}

impl GoogleConfig {
    /// Read the Google configuration, or `None` when Google sign-in is not set up
    ///
    /// # Environment Variables
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`
    /// - `APP_URL` (default: "http://localhost:3000")
    /// - `GOOGLE_REDIRECT_URL` (default: "{APP_URL}/api/auth/callback/google")
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let redirect_url = std::env::var("GOOGLE_REDIRECT_URL")
            .unwrap_or_else(|_| format!("{}/api/auth/callback/google", app_url));

        Some(GoogleConfig {
            client_id,
            client_secret,
            redirect_url,
            app_url,
            certs_url: GOOGLE_CERTS_URL.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Claims of a Google ID token that sign-in relies on
#[derive(Debug, Deserialize)]
pub struct GoogleIdClaims {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub exp: i64,
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

/// Turn verified claims into a provider profile.
///
/// Tokens without a verified email are refused: the email is what links
/// a Google identity to an existing user.
pub fn profile_from_claims(claims: GoogleIdClaims, id_token: &str) -> AuthResult<ProviderProfile> {
    let email = claims
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AuthError::InvalidToken("token carries no email".to_string()))?;

    if !claims.email_verified {
        return Err(AuthError::InvalidToken("email not verified".to_string()));
    }

    Ok(ProviderProfile {
        provider: "google".to_string(),
        provider_account_id: claims.sub,
        email: crate::validation::normalize_email(&email),
        name: claims.name,
        image: claims.picture,
        access_token: None,
        refresh_token: None,
        expires_at: Some(claims.exp),
        id_token: Some(id_token.to_string()),
    })
}

/// Verifies One-Tap credentials against Google's published signing keys
#[derive(Clone)]
pub struct GoogleIdTokenVerifier {
    http: reqwest::Client,
    client_id: String,
    certs_url: String,
}

impl GoogleIdTokenVerifier {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            certs_url: config.certs_url.clone(),
        }
    }

    /// Verify the credential and return the identity it asserts
    pub async fn verify(&self, credential: &str) -> AuthResult<ProviderProfile> {
        let header =
            decode_header(credential).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing key id".to_string()))?;

        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let data = decode::<GoogleIdClaims>(credential, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        info!("Verified Google ID token for subject {}", data.claims.sub);
        profile_from_claims(data.claims, credential)
    }

    async fn signing_key(&self, kid: &str) -> AuthResult<Jwk> {
        let response = self
            .http
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        if !response.status().is_success() {
            return Err(AuthError::Internal(anyhow::anyhow!(
                "Failed to fetch Google certificates: {}",
                response.status()
            )));
        }

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        keys.keys
            .into_iter()
            .find(|k| k.kid == kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown key id {}", kid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(json: serde_json::Value) -> GoogleIdClaims {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn verified_claims_become_a_profile() {
        let profile = profile_from_claims(
            claims(serde_json::json!({
                "sub": "1170",
                "email": "Buyer@Gmail.com",
                "email_verified": true,
                "name": "Buyer",
                "picture": "https://lh3.googleusercontent.com/a/pic",
                "exp": 1_900_000_000i64
            })),
            "raw.id.token",
        )
        .unwrap();

        assert_eq!(profile.provider, "google");
        assert_eq!(profile.provider_account_id, "1170");
        assert_eq!(profile.email, "buyer@gmail.com");
        assert_eq!(profile.expires_at, Some(1_900_000_000));
        assert_eq!(profile.id_token.as_deref(), Some("raw.id.token"));
    }

    #[test]
    fn string_email_verified_is_accepted() {
        let c = claims(serde_json::json!({
            "sub": "1", "email": "a@b.co", "email_verified": "true", "exp": 1
        }));
        assert!(c.email_verified);
    }

    #[test]
    fn unverified_or_missing_email_is_refused() {
        let unverified = claims(serde_json::json!({
            "sub": "1", "email": "a@b.co", "email_verified": false, "exp": 1
        }));
        assert!(matches!(
            profile_from_claims(unverified, "t"),
            Err(AuthError::InvalidToken(_))
        ));

        let missing = claims(serde_json::json!({"sub": "1", "exp": 1}));
        assert!(matches!(
            profile_from_claims(missing, "t"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn malformed_credentials_fail_before_any_network_call() {
        let verifier = GoogleIdTokenVerifier::new(&GoogleConfig {
            client_id: "client".to_string(),
            client_secret: String::new(),
            redirect_url: "http://localhost/cb".to_string(),
            app_url: "http://localhost".to_string(),
            certs_url: "http://127.0.0.1:9/unreachable".to_string(),
        });

        let err = verifier.verify("definitely-not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }
}
