//! Identity Record Writes
//!
//! Read-transition-write loop over [`IdentityRepository`]. Every change to an
//! identity record goes through here, so two requests for the same visitor
//! can never both pass a quota check or both consume one code.

use kernel::id::VenueId;

use crate::domain::entity::IdentityRecord;
use crate::domain::repository::IdentityRepository;
use crate::domain::value_object::Email;
use crate::error::{PortalError, PortalResult};

/// Attempts before a contended write gives up
const MAX_WRITE_ATTEMPTS: usize = 5;

/// What to do once the transitioned record is stored
pub enum Transition<T> {
    /// Persist and return `T`
    Commit(T),
    /// Persist, then fail with the error (e.g. clearing an expired code)
    CommitThenFail(PortalError),
}

/// Load the record for (venue, email), apply `transition`, store it
///
/// `transition` gets the current record (or `None`) and returns the record
/// to store. Returning `Err` aborts without writing. A lost race re-reads
/// and re-applies the transition against the fresh record.
pub async fn write_identity<R, T, F>(
    repo: &R,
    venue_id: &VenueId,
    email: &Email,
    mut transition: F,
) -> PortalResult<(IdentityRecord, T)>
where
    R: IdentityRepository,
    F: FnMut(Option<IdentityRecord>) -> PortalResult<(IdentityRecord, Transition<T>)>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let current = repo.find_identity(venue_id, email).await?;
        let is_new = current.is_none();
        let (mut record, outcome) = transition(current)?;

        let stored = if is_new {
            repo.insert_identity(&record).await?
        } else {
            repo.update_identity(&record).await?
        };

        if !stored {
            tracing::debug!(
                venue_id = %venue_id,
                attempt,
                "Identity write lost a race, retrying"
            );
            continue;
        }

        if !is_new {
            record.version += 1;
        }

        return match outcome {
            Transition::Commit(value) => Ok((record, value)),
            Transition::CommitThenFail(err) => Err(err),
        };
    }

    Err(PortalError::Internal(format!(
        "identity write for venue {} still contended after {} attempts",
        venue_id, MAX_WRITE_ATTEMPTS
    )))
}
