//! OTP Engine
//!
//! Issues and checks email one-time codes against an [`IdentityRecord`].
//! Pure state transitions: the caller loads the record, applies one of
//! these operations, and writes the record back under compare-and-swap,
//! so the quota check and the counter bump land in a single atomic write.

use chrono::{DateTime, Duration, Utc};
use platform::crypto::random_numeric_code;
use platform::rate_limit::{RateWindow, WindowDecision, ceil_secs, cooldown_remaining};
use platform::secret_hash::{OneTimeSecret, SecretHasher};

use crate::domain::entity::IdentityRecord;
use crate::domain::value_object::AuthMethod;
use crate::error::{PortalError, PortalResult, RateLimitScope};

/// Code shape, lifetime and request limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub digits: u32,
    pub ttl: Duration,
    /// Requests per window, per identity record
    pub window: RateWindow,
    /// Minimum gap between two issued codes
    pub cooldown: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            digits: 6,
            ttl: Duration::minutes(10),
            window: RateWindow::new(3, Duration::minutes(60)),
            cooldown: Duration::seconds(60),
        }
    }
}

/// A freshly issued code; the plaintext exists only here
#[derive(Debug)]
pub struct IssuedCode {
    pub code: OneTimeSecret,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCode {
    /// Seconds until expiry, as seen at `now`
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> u64 {
        ceil_secs(self.expires_at - now)
    }
}

#[derive(Debug, Clone)]
pub struct OtpEngine {
    policy: OtpPolicy,
    hasher: SecretHasher,
}

impl OtpEngine {
    pub fn new(policy: OtpPolicy, hasher: SecretHasher) -> Self {
        Self { policy, hasher }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// New random code from the OS CSPRNG
    pub fn generate(&self) -> OneTimeSecret {
        OneTimeSecret::new(random_numeric_code(self.policy.digits))
    }

    /// Issue a code onto `identity`
    ///
    /// Rejects with [`PortalError::RateLimited`] when the window quota is
    /// used up or the previous code is younger than the cooldown. On
    /// success the record holds the salted hash, expiry and updated
    /// counters; the plaintext is only in the returned value.
    pub fn request_code(
        &self,
        identity: &mut IdentityRecord,
        now: DateTime<Utc>,
    ) -> PortalResult<IssuedCode> {
        let (window_start, count) = match self.policy.window.check(
            identity.otp_window_start,
            identity.otp_request_count,
            now,
        ) {
            WindowDecision::Allowed {
                window_start,
                count,
            } => (window_start, count),
            WindowDecision::Exhausted { retry_after_secs } => {
                return Err(PortalError::RateLimited {
                    scope: RateLimitScope::Quota,
                    retry_after_secs,
                });
            }
        };

        if let Some(last_sent) = identity.otp_last_sent_at {
            if let Some(retry_after_secs) = cooldown_remaining(last_sent, self.policy.cooldown, now)
            {
                return Err(PortalError::RateLimited {
                    scope: RateLimitScope::Cooldown,
                    retry_after_secs,
                });
            }
        }

        let code = self.generate();
        let hash = self
            .hasher
            .hash(&code)
            .map_err(|e| PortalError::Internal(e.to_string()))?;
        let expires_at = now + self.policy.ttl;

        identity.set_pending_code(hash, expires_at);
        identity.otp_window_start = Some(window_start);
        identity.otp_request_count = count;
        identity.otp_last_sent_at = Some(now);
        identity.updated_at = now;

        Ok(IssuedCode { code, expires_at })
    }

    /// Check `submitted` against the pending code
    ///
    /// * no pending code: [`PortalError::NoPendingCode`], record untouched
    /// * past expiry: [`PortalError::CodeExpired`], pending code cleared
    ///   (the caller must persist that)
    /// * mismatch: [`PortalError::InvalidCode`], record untouched
    /// * match: pending code cleared and the record marked verified
    pub fn verify_code(
        &self,
        identity: &mut IdentityRecord,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> PortalResult<()> {
        let Some(pending) = &identity.pending_code else {
            return Err(PortalError::NoPendingCode);
        };

        if now > pending.expires_at {
            identity.clear_pending_code();
            identity.updated_at = now;
            return Err(PortalError::CodeExpired);
        }

        let submitted = submitted.trim();
        let well_formed = submitted.len() == self.policy.digits as usize
            && submitted.chars().all(|c| c.is_ascii_digit());
        if !well_formed || !self.hasher.verify(&pending.hash, submitted) {
            return Err(PortalError::InvalidCode);
        }

        identity.clear_pending_code();
        identity.mark_verified(AuthMethod::Email, now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::VerificationState;
    use crate::domain::value_object::Email;
    use chrono::TimeZone;
    use kernel::id::VenueId;
    use platform::secret_hash::HashParams;

    fn engine() -> OtpEngine {
        OtpEngine::new(
            OtpPolicy::default(),
            SecretHasher::new(HashParams::minimal()).unwrap(),
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 14, 0, 0).unwrap()
    }

    fn record() -> IdentityRecord {
        IdentityRecord::new(VenueId::new(), Email::new("user@x.com").unwrap(), t0())
    }

    #[test]
    fn test_generate_shape() {
        let code = engine().generate();
        assert_eq!(code.expose().len(), 6);
        assert!(code.expose().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_request_sets_hash_and_expiry_together() {
        let engine = engine();
        let mut r = record();
        let issued = engine.request_code(&mut r, t0()).unwrap();

        let pending = r.pending_code.as_ref().unwrap();
        assert_eq!(pending.expires_at, t0() + Duration::minutes(10));
        assert_ne!(pending.hash.as_phc_string(), issued.code.expose());
        assert_eq!(issued.expires_in_secs(t0()), 600);
        assert_eq!(r.otp_request_count, 1);
        assert_eq!(r.otp_window_start, Some(t0()));
        assert_eq!(r.state(t0()), VerificationState::OtpPending);
    }

    #[test]
    fn test_fourth_request_in_window_rejected() {
        let engine = engine();
        let mut r = record();
        for i in 0..3 {
            engine
                .request_code(&mut r, t0() + Duration::minutes(2 * i))
                .unwrap();
        }

        let err = engine
            .request_code(&mut r, t0() + Duration::minutes(10))
            .unwrap_err();
        match err {
            PortalError::RateLimited {
                scope: RateLimitScope::Quota,
                retry_after_secs,
            } => assert_eq!(retry_after_secs, 50 * 60),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(r.otp_request_count, 3);
    }

    #[test]
    fn test_window_resets_after_an_hour() {
        let engine = engine();
        let mut r = record();
        for i in 0..3 {
            engine
                .request_code(&mut r, t0() + Duration::minutes(2 * i))
                .unwrap();
        }

        let later = t0() + Duration::minutes(61);
        engine.request_code(&mut r, later).unwrap();
        assert_eq!(r.otp_request_count, 1);
        assert_eq!(r.otp_window_start, Some(later));
    }

    #[test]
    fn test_resend_cooldown_rounds_up() {
        let engine = engine();
        let mut r = record();
        engine.request_code(&mut r, t0()).unwrap();

        let err = engine
            .request_code(&mut r, t0() + Duration::milliseconds(17_400))
            .unwrap_err();
        match err {
            PortalError::RateLimited {
                scope: RateLimitScope::Cooldown,
                retry_after_secs,
            } => assert_eq!(retry_after_secs, 43),
            other => panic!("unexpected {other:?}"),
        }
        // the rejected resend does not consume quota
        assert_eq!(r.otp_request_count, 1);

        engine
            .request_code(&mut r, t0() + Duration::seconds(60))
            .unwrap();
        assert_eq!(r.otp_request_count, 2);
    }

    #[test]
    fn test_verify_success_is_one_time() {
        let engine = engine();
        let mut r = record();
        let issued = engine.request_code(&mut r, t0()).unwrap();
        let code = issued.code.expose().to_string();

        engine
            .verify_code(&mut r, &code, t0() + Duration::minutes(3))
            .unwrap();
        assert!(r.is_verified);
        assert!(r.pending_code.is_none());
        assert_eq!(r.visit_count, 1);
        assert_eq!(r.auth_method, AuthMethod::Email);
        assert_eq!(r.verified_at, Some(t0() + Duration::minutes(3)));

        assert!(matches!(
            engine.verify_code(&mut r, &code, t0() + Duration::minutes(4)),
            Err(PortalError::NoPendingCode)
        ));
        assert_eq!(r.visit_count, 1);
    }

    #[test]
    fn test_verify_after_expiry() {
        let engine = engine();
        let mut r = record();
        let issued = engine.request_code(&mut r, t0()).unwrap();
        let code = issued.code.expose().to_string();

        let err = engine
            .verify_code(&mut r, &code, t0() + Duration::minutes(10) + Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, PortalError::CodeExpired));
        assert!(r.pending_code.is_none());
        assert!(!r.is_verified);
    }

    #[test]
    fn test_verify_wrong_code_keeps_pending() {
        let engine = engine();
        let mut r = record();
        let issued = engine.request_code(&mut r, t0()).unwrap();
        let wrong = if issued.code.expose() == "000000" {
            "000001"
        } else {
            "000000"
        };

        assert!(matches!(
            engine.verify_code(&mut r, wrong, t0()),
            Err(PortalError::InvalidCode)
        ));
        assert!(matches!(
            engine.verify_code(&mut r, "12ab56", t0()),
            Err(PortalError::InvalidCode)
        ));
        assert!(r.pending_code.is_some());
        assert!(!r.is_verified);
    }

    #[test]
    fn test_verify_without_request() {
        let mut r = record();
        assert!(matches!(
            engine().verify_code(&mut r, "123456", t0()),
            Err(PortalError::NoPendingCode)
        ));
    }
}
