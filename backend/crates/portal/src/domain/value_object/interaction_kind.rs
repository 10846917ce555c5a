//! Interaction Kind
//!
//! The five things a visitor can do to an ad, each backed by one counter
//! column on the ad.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    #[display("view")]
    View,
    #[display("click")]
    Click,
    #[display("like")]
    Like,
    #[display("share")]
    Share,
    #[display("expand")]
    Expand,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 5] = [
        InteractionKind::View,
        InteractionKind::Click,
        InteractionKind::Like,
        InteractionKind::Share,
        InteractionKind::Expand,
    ];

    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Click => "click",
            InteractionKind::Like => "like",
            InteractionKind::Share => "share",
            InteractionKind::Expand => "expand",
        }
    }

    /// Counter column on `ads` incremented for this kind
    #[inline]
    pub const fn counter_column(&self) -> &'static str {
        match self {
            InteractionKind::View => "views",
            InteractionKind::Click => "clicks",
            InteractionKind::Like => "likes_count",
            InteractionKind::Share => "shares_count",
            InteractionKind::Expand => "expands_count",
        }
    }

    #[inline]
    pub const fn is_deduplicated(&self) -> bool {
        matches!(self, InteractionKind::Like)
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == s)
            .ok_or_else(|| format!("Unknown interaction type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for kind in InteractionKind::ALL {
            assert_eq!(kind.code().parse::<InteractionKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.code());
        }
        assert!("hover".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn test_counter_columns() {
        assert_eq!(InteractionKind::View.counter_column(), "views");
        assert_eq!(InteractionKind::Click.counter_column(), "clicks");
        assert_eq!(InteractionKind::Like.counter_column(), "likes_count");
        assert_eq!(InteractionKind::Share.counter_column(), "shares_count");
        assert_eq!(InteractionKind::Expand.counter_column(), "expands_count");
    }

    #[test]
    fn test_only_likes_are_deduplicated() {
        let deduped: Vec<_> = InteractionKind::ALL
            .into_iter()
            .filter(|k| k.is_deduplicated())
            .collect();
        assert_eq!(deduped, vec![InteractionKind::Like]);
    }
}
