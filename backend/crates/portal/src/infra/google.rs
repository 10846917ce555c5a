//! Google ID Token Verifier
//!
//! Validates Google-issued ID tokens against Google's published signing
//! keys. Keys are cached and refetched when a token names an unknown `kid`
//! (Google rotates keys) or the cache is older than its TTL. Fetches are
//! spaced at least `MIN_REFRESH_INTERVAL` apart.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

use crate::application::config::FederatedSettings;
use crate::domain::gateway::{FederatedIdentity, GatewayError, IdentityVerifier};

/// Clock skew tolerated on `exp`/`iat`
const LEEWAY_SECS: u64 = 30;

/// Minimum spacing between JWKS fetch attempts
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Where verification keys come from
#[trait_variant::make(SigningKeySource: Send)]
pub trait LocalSigningKeySource {
    async fn key_for(&self, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), GatewayError>;
}

// ============================================================================
// JWKS key source
// ============================================================================

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// RS256 keys fetched from a JWKS endpoint
pub struct JwksKeySource {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
    last_attempt: Mutex<Option<Instant>>,
}

impl JwksKeySource {
    pub fn new(url: impl Into<String>, timeout: Duration, ttl: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            ttl,
            cache: RwLock::new(None),
            last_attempt: Mutex::new(None),
        })
    }

    pub fn from_settings(settings: &FederatedSettings) -> Result<Self, GatewayError> {
        Self::new(&settings.jwks_url, settings.timeout, settings.key_cache_ttl)
    }

    fn cached(&self, kid: &str) -> Option<DecodingKey> {
        let cache = self.cache.read();
        let cached = cache.as_ref()?;
        if cached.fetched_at.elapsed() > self.ttl {
            return None;
        }
        cached.keys.get(kid).cloned()
    }

    /// Claims the next fetch slot; false while the previous attempt is recent
    fn try_claim_refresh(&self) -> bool {
        let mut last = self.last_attempt.lock();
        if let Some(at) = *last {
            if at.elapsed() < MIN_REFRESH_INTERVAL {
                return false;
            }
        }
        *last = Some(Instant::now());
        true
    }

    async fn refresh(&self) -> Result<(), GatewayError> {
        let set: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => {
                    tracing::debug!(kid = %kid, error = %e, "Skipping unusable JWK");
                }
            }
        }

        tracing::debug!(key_count = keys.len(), "Refreshed federated signing keys");
        *self.cache.write() = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

impl SigningKeySource for JwksKeySource {
    async fn key_for(&self, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), GatewayError> {
        let kid = kid.ok_or_else(|| GatewayError::InvalidToken("missing kid".to_string()))?;

        if let Some(key) = self.cached(kid) {
            return Ok((key, Algorithm::RS256));
        }

        if !self.try_claim_refresh() {
            tracing::debug!(kid = %kid, "Signing key refresh throttled");
            return Err(GatewayError::SigningKey(format!("unknown kid {}", kid)));
        }
        self.refresh().await?;
        self.cached(kid)
            .map(|key| (key, Algorithm::RS256))
            .ok_or_else(|| GatewayError::SigningKey(format!("unknown kid {}", kid)))
    }
}

/// One fixed key, for tests
#[cfg(test)]
pub struct StaticKeySource {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

#[cfg(test)]
impl SigningKeySource for StaticKeySource {
    async fn key_for(&self, _kid: Option<&str>) -> Result<(DecodingKey, Algorithm), GatewayError> {
        Ok((self.key.clone(), self.algorithm))
    }
}

// ============================================================================
// Verifier
// ============================================================================

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

pub struct GoogleIdentityVerifier<K: SigningKeySource + Sync> {
    keys: K,
    issuers: Vec<String>,
}

impl<K: SigningKeySource + Sync> GoogleIdentityVerifier<K> {
    pub fn new(keys: K, issuers: Vec<String>) -> Self {
        Self { keys, issuers }
    }
}

impl<K: SigningKeySource + Sync> IdentityVerifier for GoogleIdentityVerifier<K> {
    async fn verify(
        &self,
        assertion: &str,
        expected_audience: &str,
    ) -> Result<FederatedIdentity, GatewayError> {
        if expected_audience.is_empty() {
            return Err(GatewayError::InvalidToken(
                "no audience configured".to_string(),
            ));
        }

        let header = decode_header(assertion)?;
        let (key, algorithm) =
            SigningKeySource::key_for(&self.keys, header.kid.as_deref()).await?;
        if header.alg != algorithm {
            return Err(GatewayError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[expected_audience]);
        validation.set_issuer(&self.issuers);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = LEEWAY_SECS;

        let claims = decode::<GoogleClaims>(assertion, &key, &validation)?.claims;
        let email = claims
            .email
            .ok_or_else(|| GatewayError::InvalidToken("missing email claim".to_string()))?;

        Ok(FederatedIdentity {
            subject: claims.sub,
            email,
            email_verified: claims.email_verified,
            given_name: claims.given_name,
            family_name: claims.family_name,
            picture: claims.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const SECRET: &[u8] = b"federated-test-secret-32-bytes!!";
    const CLIENT_ID: &str = "portal-client.apps.googleusercontent.com";

    fn verifier() -> GoogleIdentityVerifier<StaticKeySource> {
        GoogleIdentityVerifier::new(
            StaticKeySource {
                key: DecodingKey::from_secret(SECRET),
                algorithm: Algorithm::HS256,
            },
            vec!["https://accounts.google.com".to_string()],
        )
    }

    fn token(claims: serde_json::Value) -> String {
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn claims(aud: &str, exp_offset: i64) -> serde_json::Value {
        json!({
            "iss": "https://accounts.google.com",
            "aud": aud,
            "sub": "110248495921238986420",
            "email": "ada@example.com",
            "email_verified": true,
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://lh3.example/ada.png",
            "exp": chrono::Utc::now().timestamp() + exp_offset,
        })
    }

    #[tokio::test]
    async fn test_valid_token() {
        let identity = verifier()
            .verify(&token(claims(CLIENT_ID, 600)), CLIENT_ID)
            .await
            .unwrap();
        assert_eq!(identity.subject, "110248495921238986420");
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.email_verified);
        assert_eq!(identity.given_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_wrong_audience_rejected() {
        let result = verifier()
            .verify(&token(claims("someone-else", 600)), CLIENT_ID)
            .await;
        assert!(matches!(result, Err(GatewayError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let result = verifier()
            .verify(&token(claims(CLIENT_ID, -3600)), CLIENT_ID)
            .await;
        assert!(matches!(result, Err(GatewayError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_wrong_issuer_rejected() {
        let mut c = claims(CLIENT_ID, 600);
        c["iss"] = json!("https://evil.example");
        let result = verifier().verify(&token(c), CLIENT_ID).await;
        assert!(matches!(result, Err(GatewayError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims(CLIENT_ID, 600),
            &EncodingKey::from_secret(b"another-secret-another-secret-!!"),
        )
        .unwrap();
        assert!(verifier().verify(&forged, CLIENT_ID).await.is_err());
        assert!(verifier().verify("not-a-jwt", CLIENT_ID).await.is_err());
    }

    // nothing listens on the discard port
    const UNREACHABLE_JWKS: &str = "http://127.0.0.1:9/oauth2/v3/certs";

    fn jwks_source() -> JwksKeySource {
        JwksKeySource::new(UNREACHABLE_JWKS, Duration::from_secs(2), Duration::from_secs(3600)).unwrap()
    }

    fn seed(source: &JwksKeySource, kid: &str) {
        let mut keys = HashMap::new();
        keys.insert(kid.to_string(), DecodingKey::from_secret(SECRET));
        *source.cache.write() = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        *source.last_attempt.lock() = Some(Instant::now());
    }

    #[tokio::test]
    async fn test_cached_kid_served_without_fetch() {
        let source = jwks_source();
        seed(&source, "k1");
        let (_, algorithm) = SigningKeySource::key_for(&source, Some("k1")).await.unwrap();
        assert_eq!(algorithm, Algorithm::RS256);
    }

    #[tokio::test]
    async fn test_unknown_kid_after_recent_fetch_not_refetched() {
        let source = jwks_source();
        seed(&source, "k1");
        // a fetch would fail with a transport error instead
        for _ in 0..3 {
            assert!(matches!(
                SigningKeySource::key_for(&source, Some("rotated")).await,
                Err(GatewayError::SigningKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_spaces_out_retries() {
        let source = jwks_source();
        assert!(matches!(
            SigningKeySource::key_for(&source, Some("k1")).await,
            Err(GatewayError::Transport(_) | GatewayError::Timeout)
        ));
        assert!(matches!(
            SigningKeySource::key_for(&source, Some("k1")).await,
            Err(GatewayError::SigningKey(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_kid_rejected() {
        let source = jwks_source();
        assert!(matches!(
            SigningKeySource::key_for(&source, None).await,
            Err(GatewayError::InvalidToken(_))
        ));
    }
}
