//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{AdId, ComplianceEntryId, IdentityId, VenueId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    Ad, AdCounters, ComplianceEntry, IdentityRecord, InteractionEvent, PendingCode, Venue,
};
use crate::domain::repository::{
    AdRepository, ComplianceRepository, IdentityRepository, InteractionRepository, VenueDirectory,
};
use crate::domain::value_object::{AuthMethod, Email, InteractionKind, MacAddress, SessionId};
use crate::error::{PortalError, PortalResult};
use platform::secret_hash::HashedSecret;

/// PostgreSQL-backed portal repository
#[derive(Clone)]
pub struct PgPortalRepository {
    pool: PgPool,
}

impl PgPortalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn from_db_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// ============================================================================
// Venue Directory Implementation
// ============================================================================

impl VenueDirectory for PgPortalRepository {
    async fn find_venue(&self, venue_id: &VenueId) -> PortalResult<Option<Venue>> {
        let row = sqlx::query_as::<_, VenueRow>(
            r#"
            SELECT venue_id, name, is_active, redirect_url
            FROM venues
            WHERE venue_id = $1
            "#,
        )
        .bind(venue_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_venue()))
    }
}

// ============================================================================
// Identity Repository Implementation
// ============================================================================

impl IdentityRepository for PgPortalRepository {
    async fn find_identity(
        &self,
        venue_id: &VenueId,
        email: &Email,
    ) -> PortalResult<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT
                identity_id,
                venue_id,
                email,
                provider_subject,
                first_name,
                last_name,
                avatar_url,
                is_verified,
                verified_at,
                otp_hash,
                otp_expires_at,
                otp_request_count,
                otp_window_start,
                otp_last_sent_at,
                visit_count,
                first_visit_at,
                last_visit_at,
                last_ip,
                last_user_agent,
                auth_method,
                version,
                created_at,
                updated_at
            FROM identity_records
            WHERE venue_id = $1 AND email = $2
            "#,
        )
        .bind(venue_id.as_uuid())
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_identity()).transpose()
    }

    async fn insert_identity(&self, record: &IdentityRecord) -> PortalResult<bool> {
        let (otp_hash, otp_expires_at) = pending_columns(record);

        let inserted = sqlx::query(
            r#"
            INSERT INTO identity_records (
                identity_id,
                venue_id,
                email,
                provider_subject,
                first_name,
                last_name,
                avatar_url,
                is_verified,
                verified_at,
                otp_hash,
                otp_expires_at,
                otp_request_count,
                otp_window_start,
                otp_last_sent_at,
                visit_count,
                first_visit_at,
                last_visit_at,
                last_ip,
                last_user_agent,
                auth_method,
                version,
                created_at,
                updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            ON CONFLICT (venue_id, email) DO NOTHING
            "#,
        )
        .bind(record.identity_id.as_uuid())
        .bind(record.venue_id.as_uuid())
        .bind(record.email.as_str())
        .bind(&record.provider_subject)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.avatar_url)
        .bind(record.is_verified)
        .bind(record.verified_at)
        .bind(otp_hash)
        .bind(otp_expires_at)
        .bind(to_db_count(record.otp_request_count))
        .bind(record.otp_window_start)
        .bind(record.otp_last_sent_at)
        .bind(to_db_count(record.visit_count))
        .bind(record.first_visit_at)
        .bind(record.last_visit_at)
        .bind(&record.last_ip)
        .bind(&record.last_user_agent)
        .bind(record.auth_method.code())
        .bind(record.version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted == 1)
    }

    async fn update_identity(&self, record: &IdentityRecord) -> PortalResult<bool> {
        let (otp_hash, otp_expires_at) = pending_columns(record);

        let updated = sqlx::query(
            r#"
            UPDATE identity_records SET
                provider_subject = $3,
                first_name = $4,
                last_name = $5,
                avatar_url = $6,
                is_verified = $7,
                verified_at = $8,
                otp_hash = $9,
                otp_expires_at = $10,
                otp_request_count = $11,
                otp_window_start = $12,
                otp_last_sent_at = $13,
                visit_count = $14,
                first_visit_at = $15,
                last_visit_at = $16,
                last_ip = $17,
                last_user_agent = $18,
                auth_method = $19,
                updated_at = $20,
                version = version + 1
            WHERE identity_id = $1 AND version = $2
            "#,
        )
        .bind(record.identity_id.as_uuid())
        .bind(record.version)
        .bind(&record.provider_subject)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.avatar_url)
        .bind(record.is_verified)
        .bind(record.verified_at)
        .bind(otp_hash)
        .bind(otp_expires_at)
        .bind(to_db_count(record.otp_request_count))
        .bind(record.otp_window_start)
        .bind(record.otp_last_sent_at)
        .bind(to_db_count(record.visit_count))
        .bind(record.first_visit_at)
        .bind(record.last_visit_at)
        .bind(&record.last_ip)
        .bind(&record.last_user_agent)
        .bind(record.auth_method.code())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }
}

fn pending_columns(record: &IdentityRecord) -> (Option<&str>, Option<DateTime<Utc>>) {
    match &record.pending_code {
        Some(pending) => (Some(pending.hash.as_phc_string()), Some(pending.expires_at)),
        None => (None, None),
    }
}

// ============================================================================
// Ad Repository Implementation
// ============================================================================

impl AdRepository for PgPortalRepository {
    async fn find_ad(&self, ad_id: &AdId) -> PortalResult<Option<Ad>> {
        let row = sqlx::query_as::<_, AdRow>(
            r#"
            SELECT
                ad_id,
                venue_id,
                cta_url,
                views,
                clicks,
                likes_count,
                shares_count,
                expands_count
            FROM ads
            WHERE ad_id = $1
            "#,
        )
        .bind(ad_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_ad()))
    }
}

// ============================================================================
// Interaction Repository Implementation
// ============================================================================

impl InteractionRepository for PgPortalRepository {
    async fn recent_like_exists(
        &self,
        ad_id: &AdId,
        ip: Option<&str>,
        session_id: Option<&SessionId>,
        since: DateTime<Utc>,
    ) -> PortalResult<bool> {
        // NULL binds never match, so a missing ip or session is simply ignored
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM ad_interactions
                WHERE ad_id = $1
                  AND kind = 'like'
                  AND created_at >= $2
                  AND (ip = $3 OR session_id = $4)
            )
            "#,
        )
        .bind(ad_id.as_uuid())
        .bind(since)
        .bind(ip)
        .bind(session_id.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn append_and_count(&self, event: &InteractionEvent) -> PortalResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ad_interactions (
                interaction_id,
                ad_id,
                venue_id,
                kind,
                identity_id,
                email,
                ip,
                user_agent,
                session_id,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.interaction_id.as_uuid())
        .bind(event.ad_id.as_uuid())
        .bind(event.venue_id.as_uuid())
        .bind(event.kind.code())
        .bind(event.identity_id.map(Uuid::from))
        .bind(event.email.as_ref().map(|e| e.as_str()))
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(event.session_id.as_ref().map(|s| s.as_str()))
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        // column name comes from a closed enum, never from input
        let column = event.kind.counter_column();
        let sql = format!(
            "UPDATE ads SET {column} = {column} + 1 WHERE ad_id = $1 AND venue_id = $2"
        );
        let updated = sqlx::query(&sql)
            .bind(event.ad_id.as_uuid())
            .bind(event.venue_id.as_uuid())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated != 1 {
            return Err(PortalError::Internal(format!(
                "ad {} missing from venue {} while counting {}",
                event.ad_id, event.venue_id, event.kind
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn link_session(
        &self,
        session_id: &SessionId,
        identity_id: &IdentityId,
        email: &Email,
    ) -> PortalResult<u64> {
        let linked = sqlx::query(
            r#"
            UPDATE ad_interactions SET
                identity_id = $2,
                email = $3
            WHERE session_id = $1 AND email IS NULL
            "#,
        )
        .bind(session_id.as_str())
        .bind(identity_id.as_uuid())
        .bind(email.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(linked)
    }

    async fn events_for_session(
        &self,
        session_id: &SessionId,
    ) -> PortalResult<Vec<InteractionEvent>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT
                interaction_id,
                ad_id,
                venue_id,
                kind,
                identity_id,
                email,
                ip,
                user_agent,
                session_id,
                created_at
            FROM ad_interactions
            WHERE session_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_event()).collect()
    }
}

// ============================================================================
// Compliance Repository Implementation
// ============================================================================

impl ComplianceRepository for PgPortalRepository {
    async fn append_entry(&self, entry: &ComplianceEntry) -> PortalResult<()> {
        sqlx::query(
            r#"
            INSERT INTO compliance_log (
                entry_id,
                venue_id,
                identity_id,
                mac_address,
                email,
                phone,
                ip,
                user_agent,
                login_at,
                logout_at,
                session_minutes,
                created_at,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entry.entry_id.as_uuid())
        .bind(entry.venue_id.as_uuid())
        .bind(entry.identity_id.as_uuid())
        .bind(entry.mac_address.as_ref().map(|m| m.as_str()))
        .bind(entry.email.as_ref().map(|e| e.as_str()))
        .bind(&entry.phone)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(entry.login_at)
        .bind(entry.logout_at)
        .bind(entry.session_minutes)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_entry(
        &self,
        entry_id: &ComplianceEntryId,
        now: DateTime<Utc>,
    ) -> PortalResult<Option<ComplianceEntry>> {
        let row = sqlx::query_as::<_, ComplianceRow>(
            r#"
            SELECT
                entry_id,
                venue_id,
                identity_id,
                mac_address,
                email,
                phone,
                ip,
                user_agent,
                login_at,
                logout_at,
                session_minutes,
                created_at,
                expires_at
            FROM compliance_log
            WHERE entry_id = $1 AND expires_at > $2
            "#,
        )
        .bind(entry_id.as_uuid())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_entry()))
    }

    async fn close_entry(&self, entry: &ComplianceEntry, now: DateTime<Utc>) -> PortalResult<bool> {
        let closed = sqlx::query(
            r#"
            UPDATE compliance_log SET
                logout_at = $2,
                session_minutes = $3
            WHERE entry_id = $1
              AND logout_at IS NULL
              AND expires_at > $4
            "#,
        )
        .bind(entry.entry_id.as_uuid())
        .bind(entry.logout_at)
        .bind(entry.session_minutes)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(closed == 1)
    }

    async fn list_for_venue(
        &self,
        venue_id: &VenueId,
        now: DateTime<Utc>,
        limit: u32,
    ) -> PortalResult<Vec<ComplianceEntry>> {
        let rows = sqlx::query_as::<_, ComplianceRow>(
            r#"
            SELECT
                entry_id,
                venue_id,
                identity_id,
                mac_address,
                email,
                phone,
                ip,
                user_agent,
                login_at,
                logout_at,
                session_minutes,
                created_at,
                expires_at
            FROM compliance_log
            WHERE venue_id = $1 AND expires_at > $2
            ORDER BY login_at DESC
            LIMIT $3
            "#,
        )
        .bind(venue_id.as_uuid())
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_entry()).collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortalResult<u64> {
        let deleted = sqlx::query("DELETE FROM compliance_log WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct VenueRow {
    venue_id: Uuid,
    name: String,
    is_active: bool,
    redirect_url: Option<String>,
}

impl VenueRow {
    fn into_venue(self) -> Venue {
        Venue {
            venue_id: VenueId::from_uuid(self.venue_id),
            name: self.name,
            is_active: self.is_active,
            redirect_url: self.redirect_url,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    identity_id: Uuid,
    venue_id: Uuid,
    email: String,
    provider_subject: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    avatar_url: Option<String>,
    is_verified: bool,
    verified_at: Option<DateTime<Utc>>,
    otp_hash: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
    otp_request_count: i32,
    otp_window_start: Option<DateTime<Utc>>,
    otp_last_sent_at: Option<DateTime<Utc>>,
    visit_count: i32,
    first_visit_at: Option<DateTime<Utc>>,
    last_visit_at: Option<DateTime<Utc>>,
    last_ip: Option<String>,
    last_user_agent: Option<String>,
    auth_method: String,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_identity(self) -> PortalResult<IdentityRecord> {
        let pending_code = match (self.otp_hash, self.otp_expires_at) {
            (Some(hash), Some(expires_at)) => Some(PendingCode {
                hash: HashedSecret::from_phc_string(hash)
                    .map_err(|e| PortalError::Internal(format!("Invalid otp_hash: {}", e)))?,
                expires_at,
            }),
            _ => None,
        };

        let auth_method = AuthMethod::from_code(&self.auth_method).ok_or_else(|| {
            PortalError::Internal(format!("Invalid auth_method: {}", self.auth_method))
        })?;

        Ok(IdentityRecord {
            identity_id: IdentityId::from_uuid(self.identity_id),
            venue_id: VenueId::from_uuid(self.venue_id),
            email: Email::from_db(self.email),
            provider_subject: self.provider_subject,
            first_name: self.first_name,
            last_name: self.last_name,
            avatar_url: self.avatar_url,
            is_verified: self.is_verified,
            verified_at: self.verified_at,
            pending_code,
            otp_request_count: from_db_count(self.otp_request_count),
            otp_window_start: self.otp_window_start,
            otp_last_sent_at: self.otp_last_sent_at,
            visit_count: from_db_count(self.visit_count),
            first_visit_at: self.first_visit_at,
            last_visit_at: self.last_visit_at,
            last_ip: self.last_ip,
            last_user_agent: self.last_user_agent,
            auth_method,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdRow {
    ad_id: Uuid,
    venue_id: Uuid,
    cta_url: Option<String>,
    views: i64,
    clicks: i64,
    likes_count: i64,
    shares_count: i64,
    expands_count: i64,
}

impl AdRow {
    fn into_ad(self) -> Ad {
        Ad {
            ad_id: AdId::from_uuid(self.ad_id),
            venue_id: VenueId::from_uuid(self.venue_id),
            cta_url: self.cta_url,
            counters: AdCounters {
                views: self.views,
                clicks: self.clicks,
                likes_count: self.likes_count,
                shares_count: self.shares_count,
                expands_count: self.expands_count,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    interaction_id: Uuid,
    ad_id: Uuid,
    venue_id: Uuid,
    kind: String,
    identity_id: Option<Uuid>,
    email: Option<String>,
    ip: Option<String>,
    user_agent: Option<String>,
    session_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl InteractionRow {
    fn into_event(self) -> PortalResult<InteractionEvent> {
        let kind = self
            .kind
            .parse::<InteractionKind>()
            .map_err(|e| PortalError::Internal(format!("Invalid interaction kind: {}", e)))?;

        Ok(InteractionEvent {
            interaction_id: self.interaction_id.into(),
            ad_id: AdId::from_uuid(self.ad_id),
            venue_id: VenueId::from_uuid(self.venue_id),
            kind,
            identity_id: self.identity_id.map(IdentityId::from_uuid),
            email: self.email.map(Email::from_db),
            ip: self.ip,
            user_agent: self.user_agent,
            session_id: self.session_id.map(SessionId::from_db),
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ComplianceRow {
    entry_id: Uuid,
    venue_id: Uuid,
    identity_id: Uuid,
    mac_address: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    ip: Option<String>,
    user_agent: Option<String>,
    login_at: DateTime<Utc>,
    logout_at: Option<DateTime<Utc>>,
    session_minutes: Option<i64>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ComplianceRow {
    fn into_entry(self) -> ComplianceEntry {
        ComplianceEntry {
            entry_id: ComplianceEntryId::from_uuid(self.entry_id),
            venue_id: VenueId::from_uuid(self.venue_id),
            identity_id: IdentityId::from_uuid(self.identity_id),
            mac_address: self.mac_address.map(MacAddress::from_db),
            email: self.email.map(Email::from_db),
            phone: self.phone,
            ip: self.ip,
            user_agent: self.user_agent,
            login_at: self.login_at,
            logout_at: self.logout_at,
            session_minutes: self.session_minutes,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}
