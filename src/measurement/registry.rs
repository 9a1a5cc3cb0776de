use std::collections::BTreeMap;

use crate::config::RoleAssignment;
use crate::error::{MeasureError, Result};
use crate::models::{DetectedMarker, MarkerRole};

/// Detected markers keyed by identity
#[derive(Debug, Clone, Default)]
pub struct MarkerRegistry {
    markers: BTreeMap<u32, DetectedMarker>,
}

impl MarkerRegistry {
    /// Build the registry.
    ///
    /// An identity that plays a role in `roles` must be seen at most once.
    /// Repeated identities outside the roles are ambiguous but harmless, so
    /// they are dropped.
    pub fn from_markers(markers: impl IntoIterator<Item = DetectedMarker>, roles: &RoleAssignment) -> Result<Self> {
        let mut registry: BTreeMap<u32, DetectedMarker> = BTreeMap::new();
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();

        for marker in markers {
            *counts.entry(marker.id).or_insert(0) += 1;
            registry.insert(marker.id, marker);
        }

        let mut role_ids = roles.required_ids();
        role_ids.extend(roles.bottom_right);

        for (&id, &count) in counts.iter().filter(|(_, c)| **c > 1) {
            if role_ids.contains(&id) {
                return Err(MeasureError::DuplicateMarker { id, count });
            }
            log::debug!("Ignoring marker {} seen {} times; it has no role", id, count);
            registry.remove(&id);
        }

        Ok(Self { markers: registry })
    }

    pub fn get(&self, id: u32) -> Option<&DetectedMarker> {
        self.markers.get(&id)
    }

    /// Identities present, ascending
    pub fn ids(&self) -> Vec<u32> {
        self.markers.keys().copied().collect()
    }

    /// Assign corner roles, failing if any required identity is missing
    pub fn resolve(&self, roles: &RoleAssignment) -> Result<ResolvedMarkers<'_>> {
        let required = roles.required_ids();
        let missing: Vec<u32> = required.iter().copied().filter(|id| self.get(*id).is_none()).collect();

        if !missing.is_empty() {
            return Err(MeasureError::InsufficientMarkers {
                found: self.ids(),
                missing,
                required,
            });
        }

        let lookup = |role: MarkerRole| {
            roles.id_for(role).and_then(|id| self.get(id)).ok_or_else(|| MeasureError::InsufficientMarkers {
                found: self.ids(),
                missing: roles.id_for(role).into_iter().collect(),
                required: roles.required_ids(),
            })
        };

        Ok(ResolvedMarkers {
            top_left: lookup(MarkerRole::TopLeft)?,
            top_right: lookup(MarkerRole::TopRight)?,
            bottom_left: lookup(MarkerRole::BottomLeft)?,
            bottom_right: roles.bottom_right.and_then(|id| self.get(id)),
        })
    }
}

/// Markers bound to their corner roles
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMarkers<'a> {
    pub top_left: &'a DetectedMarker,
    pub top_right: &'a DetectedMarker,
    pub bottom_left: &'a DetectedMarker,
    pub bottom_right: Option<&'a DetectedMarker>,
}

impl<'a> ResolvedMarkers<'a> {
    pub fn get(&self, role: MarkerRole) -> Option<&'a DetectedMarker> {
        match role {
            MarkerRole::TopLeft => Some(self.top_left),
            MarkerRole::TopRight => Some(self.top_right),
            MarkerRole::BottomLeft => Some(self.bottom_left),
            MarkerRole::BottomRight => self.bottom_right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point2;

    fn marker(id: u32) -> DetectedMarker {
        let o = id as f64 * 100.0;
        DetectedMarker::new(
            id,
            [
                Point2::new(o, 0.0),
                Point2::new(o + 10.0, 0.0),
                Point2::new(o + 10.0, 10.0),
                Point2::new(o, 10.0),
            ],
        )
    }

    #[test]
    fn test_no_markers_reports_all_required() {
        let registry = MarkerRegistry::from_markers(Vec::new(), &RoleAssignment::default()).unwrap();
        let err = registry.resolve(&RoleAssignment::default()).unwrap_err();
        match err {
            MeasureError::InsufficientMarkers { found, missing, required } => {
                assert!(found.is_empty());
                assert_eq!(missing, vec![0, 1, 2]);
                assert_eq!(required, vec![0, 1, 2]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_bottom_left() {
        let registry = MarkerRegistry::from_markers(vec![marker(1), marker(0)], &RoleAssignment::default()).unwrap();
        let err = registry.resolve(&RoleAssignment::default()).unwrap_err();
        assert!(matches!(
            &err,
            MeasureError::InsufficientMarkers { found, missing, .. } if *found == vec![0, 1] && *missing == vec![2]
        ));
        let msg = err.to_string();
        assert!(msg.contains("found 2 marker(s)"), "got: {msg}");
        assert!(msg.contains("[2]"), "got: {msg}");
    }

    #[test]
    fn test_three_markers_resolve_without_bottom_right() {
        let markers = vec![marker(2), marker(0), marker(1), marker(7)];
        let registry = MarkerRegistry::from_markers(markers, &RoleAssignment::default()).unwrap();
        let resolved = registry.resolve(&RoleAssignment::default()).unwrap();
        assert_eq!(resolved.top_left.id, 0);
        assert_eq!(resolved.top_right.id, 1);
        assert_eq!(resolved.bottom_left.id, 2);
        assert!(resolved.bottom_right.is_none());
        assert_eq!(registry.ids(), vec![0, 1, 2, 7]);
    }

    #[test]
    fn test_custom_roles() {
        let roles = RoleAssignment {
            top_left: 10,
            top_right: 11,
            bottom_left: 12,
            bottom_right: Some(13),
        };
        let registry = MarkerRegistry::from_markers((10..14).map(marker), &roles).unwrap();
        let resolved = registry.resolve(&roles).unwrap();
        assert_eq!(resolved.get(MarkerRole::BottomRight).map(|m| m.id), Some(13));
    }

    #[test]
    fn test_duplicate_role_identity_is_an_error() {
        let err = MarkerRegistry::from_markers(vec![marker(0), marker(1), marker(0)], &RoleAssignment::default())
            .unwrap_err();
        assert!(matches!(err, MeasureError::DuplicateMarker { id: 0, count: 2 }));

        // The optional bottom-right role counts too
        let err = MarkerRegistry::from_markers(
            vec![marker(0), marker(1), marker(2), marker(3), marker(3)],
            &RoleAssignment::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MeasureError::DuplicateMarker { id: 3, count: 2 }));
    }

    #[test]
    fn test_duplicate_spare_identity_is_dropped() {
        let markers = vec![marker(0), marker(7), marker(1), marker(2), marker(7)];
        let registry = MarkerRegistry::from_markers(markers, &RoleAssignment::default()).unwrap();

        assert_eq!(registry.ids(), vec![0, 1, 2]);
        assert!(registry.get(7).is_none());
        assert!(registry.resolve(&RoleAssignment::default()).is_ok());
    }
}
