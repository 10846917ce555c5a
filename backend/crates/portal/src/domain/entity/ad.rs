use kernel::id::{AdId, VenueId};
use serde::Serialize;

use crate::domain::value_object::InteractionKind;

/// Advertisement shown on a venue's splash page
#[derive(Debug, Clone)]
pub struct Ad {
    pub ad_id: AdId,
    pub venue_id: VenueId,
    /// Call-to-action target for clicks
    pub cta_url: Option<String>,
    pub counters: AdCounters,
}

/// Per-ad interaction counters; only ever incremented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdCounters {
    pub views: i64,
    pub clicks: i64,
    pub likes_count: i64,
    pub shares_count: i64,
    pub expands_count: i64,
}

impl AdCounters {
    pub fn get(&self, kind: InteractionKind) -> i64 {
        match kind {
            InteractionKind::View => self.views,
            InteractionKind::Click => self.clicks,
            InteractionKind::Like => self.likes_count,
            InteractionKind::Share => self.shares_count,
            InteractionKind::Expand => self.expands_count,
        }
    }

    pub fn increment(&mut self, kind: InteractionKind) {
        let counter = match kind {
            InteractionKind::View => &mut self.views,
            InteractionKind::Click => &mut self.clicks,
            InteractionKind::Like => &mut self.likes_count,
            InteractionKind::Share => &mut self.shares_count,
            InteractionKind::Expand => &mut self.expands_count,
        };
        *counter += 1;
    }
}

impl Ad {
    /// Non-blank call-to-action URL
    pub fn cta(&self) -> Option<&str> {
        self.cta_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}
