//! Pure geometric checks for link establishment.
//!
//! Everything here is a pure function of poses, anchors, and configured
//! limits: no side effects, reproducible bit-for-bit given the same
//! transforms. The GUI calls these speculatively every frame while the
//! player aims a link, so they must stay cheap and allocation-free.
//!
//! Angles are measured between an attach node's forward axis (local +Y,
//! consistent with the ecosystem coordinate convention) and the vector from
//! that node's anchor to the other end's anchor. A configured limit of 0
//! disables the check.

use nalgebra::{Isometry3, Point3, Vector3};
use tether_types::{LinkRole, ValidationError};

/// Forward axis of an attach node in its local frame.
#[must_use]
pub fn forward_axis() -> Vector3<f64> {
    Vector3::y()
}

/// Vector from the source anchor to the target anchor, world frame.
#[must_use]
pub fn link_vector(source_anchor: &Point3<f64>, target_anchor: &Point3<f64>) -> Vector3<f64> {
    target_anchor - source_anchor
}

/// Anchor-to-anchor distance in meters.
#[must_use]
pub fn link_length(source_anchor: &Point3<f64>, target_anchor: &Point3<f64>) -> f64 {
    link_vector(source_anchor, target_anchor).norm()
}

/// Check a distance against the configured length limits.
///
/// A zero-valued bound disables that side; `min == max == 0` accepts any
/// length. Comparison is inclusive at both bounds.
#[must_use]
pub fn check_length_limit(distance: f64, min: f64, max: f64) -> Option<ValidationError> {
    if min > 0.0 && distance < min {
        return Some(ValidationError::TooShort { distance, min });
    }
    if max > 0.0 && distance > max {
        return Some(ValidationError::TooLong { distance, max });
    }
    None
}

/// Angle in degrees between a node's forward axis and a link vector.
///
/// Returns 0 for a degenerate (zero-length) link vector, so a zero-length
/// link never trips an angle limit.
#[must_use]
pub fn angle_from_forward_deg(node_pose: &Isometry3<f64>, link_vec: &Vector3<f64>) -> f64 {
    let norm = link_vec.norm();
    if norm <= f64::EPSILON {
        return 0.0;
    }
    let forward = node_pose.rotation * forward_axis();
    let cos = (forward.dot(link_vec) / norm).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Check the angle limit at one end of a prospective link.
///
/// `link_vec` must point *away* from the node (source end: source→target;
/// target end: target→source). A limit of 0 disables the check; the
/// comparison is strict, so an angle exactly at the limit passes.
#[must_use]
pub fn check_angle_limit(
    node_pose: &Isometry3<f64>,
    link_vec: &Vector3<f64>,
    limit_deg: f64,
    role: LinkRole,
) -> Option<ValidationError> {
    if limit_deg <= 0.0 {
        return None;
    }
    let angle = angle_from_forward_deg(node_pose, link_vec);
    if angle <= limit_deg {
        return None;
    }
    Some(match role {
        LinkRole::Source => ValidationError::SourceAngleLimit {
            angle,
            limit: limit_deg,
        },
        LinkRole::Target => ValidationError::TargetAngleLimit {
            angle,
            limit: limit_deg,
        },
    })
}
