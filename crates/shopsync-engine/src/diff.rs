//! Field-by-field diffing and direction-aware merging.
//!
//! Diffs are restricted to the tenant's field mapping. Fields where both
//! sides hold differing non-null values are never decided here; they are
//! handed to the conflict detector. One-sided fields are decided by the
//! configured sync direction.

use std::collections::HashMap;

use serde_json::{Map, Value};

use shopsync_core::{FieldMapping, SyncDirection};
use shopsync_store::FieldDiff;

use crate::client::ResourceSnapshot;

/// Prior conflict decisions consulted by the merge, keyed by platform
/// field name.
#[derive(Debug, Default)]
pub struct Settlements {
    /// Resolved conflict values. A divergence whose resolved value still
    /// matches one side is settled with it.
    pub resolved: HashMap<String, Value>,
    /// Ignored divergences as (platform value, authority value) at the
    /// time of the ignore. While both sides still hold those values the
    /// divergence is accepted and each side keeps its own.
    pub accepted: HashMap<String, (Value, Value)>,
}

/// Result of merging the two sides under a direction.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Winning values keyed by platform field name. Fields decided as
    /// absent are omitted.
    pub merged: Map<String, Value>,
    /// Fields where both sides disagree and no resolution applied.
    pub conflicts: Vec<FieldDiff>,
    /// Divergences accepted by an earlier ignore. Excluded from the merged
    /// set; write-back preserves each side's own value.
    pub accepted: Vec<FieldDiff>,
}

impl MergeOutcome {
    /// True when every mapped field was decided without a conflict.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

fn non_null(fields: &Map<String, Value>, key: &str) -> Option<Value> {
    fields.get(key).filter(|v| !v.is_null()).cloned()
}

/// Merge the two representations field by field.
///
/// `settled` carries the latest closed conflict's decisions: a divergent
/// field whose resolved value still matches one of the current sides is
/// settled with it, and an ignored divergence whose sides are unchanged is
/// accepted instead of re-raising a conflict. A fresh divergence reopens
/// either way.
#[must_use]
pub fn merge_fields(
    mapping: &FieldMapping,
    platform: &ResourceSnapshot,
    authority: &ResourceSnapshot,
    direction: SyncDirection,
    settled: &Settlements,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    let platform_newer = platform.updated_at >= authority.updated_at;

    for (platform_field, authority_field) in mapping.iter() {
        let p = non_null(&platform.fields, platform_field);
        let a = non_null(&authority.fields, authority_field);

        match (p, a) {
            (Some(p), Some(a)) if p == a => {
                outcome.merged.insert(platform_field.to_string(), p);
            }
            (Some(p), Some(a)) => match settled.resolved.get(platform_field) {
                Some(r) if *r == p || *r == a => {
                    outcome.merged.insert(platform_field.to_string(), r.clone());
                }
                _ if settled
                    .accepted
                    .get(platform_field)
                    .map_or(false, |(ip, ia)| *ip == p && *ia == a) =>
                {
                    outcome
                        .accepted
                        .push(FieldDiff::new(platform_field.to_string(), p, a));
                }
                _ => outcome
                    .conflicts
                    .push(FieldDiff::new(platform_field.to_string(), p, a)),
            },
            (Some(p), None) => {
                let platform_wins = match direction {
                    SyncDirection::PlatformToAuthority => true,
                    SyncDirection::AuthorityToPlatform => false,
                    SyncDirection::Bidirectional => platform_newer,
                };
                if platform_wins {
                    outcome.merged.insert(platform_field.to_string(), p);
                }
            }
            (None, Some(a)) => {
                let authority_wins = match direction {
                    SyncDirection::PlatformToAuthority => false,
                    SyncDirection::AuthorityToPlatform => true,
                    SyncDirection::Bidirectional => !platform_newer,
                };
                if authority_wins {
                    outcome.merged.insert(platform_field.to_string(), a);
                }
            }
            (None, None) => {}
        }
    }
    outcome
}

/// Project merged platform-keyed fields onto authority field names for
/// write-back.
#[must_use]
pub fn to_authority_fields(mapping: &FieldMapping, merged: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (platform_field, authority_field) in mapping.iter() {
        if let Some(value) = merged.get(platform_field) {
            out.insert(authority_field.to_string(), value.clone());
        }
    }
    out
}
