//! Joint construction and geometric validation for runtime part linking.
//!
//! This crate turns a validated link between two bodies into physical
//! constraints, and provides the pure checks that gate establishment:
//!
//! - [`geometry`] - Length/angle limit checks as pure functions of poses
//! - [`BreakageSpec`] - Break thresholds with the zero = unbreakable sentinel
//! - [`ConstraintBackend`] - The contract the host physics engine fulfills
//! - [`LinkJoint`] - The closed set of joint kinds (rigid, cable,
//!   two-ends-sphere, tow-bar)
//!
//! # Joint Kinds
//!
//! - [`RigidJoint`]: Zero-length, all axes locked (struts, hard docking)
//! - [`CableJoint`]: Maximum-separation spring with a winchable deployed
//!   length
//! - [`TwoEndsSphereJoint`]: Free-rotation pivots at both ends of a strut,
//!   each bounded by a cone limit
//! - [`TowBarJoint`]: Spherical hitch at the source end of a rigid bar
//!
//! # Break Thresholds
//!
//! A configured break force or torque of exactly zero means "unbreakable"
//! and is translated to `f64::INFINITY` before it reaches the backend, for
//! every joint kind and for the temporarily-indestructible parameter set
//! alike. See [`BreakageSpec`].
//!
//! # Example
//!
//! ```
//! use tether_joint::BreakageSpec;
//!
//! let spec = BreakageSpec::new(0.0, 250.0);
//! assert_eq!(spec.effective_force(), f64::INFINITY); // 0 = unbreakable
//! assert_eq!(spec.effective_torque(), 250.0);
//! ```

#![doc(html_root_url = "https://docs.rs/tether-joint/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc, // Error docs added where non-obvious
)]

mod backend;
mod breakage;
pub mod geometry;
mod kinds;
pub mod testing;

pub use backend::{
    AxisMotion, ConstraintBackend, ConstraintBreakEvent, ConstraintSpec, LinearLimit,
};
pub use breakage::BreakageSpec;
pub use kinds::{
    joint_for_config, CableJoint, JointContext, LinkJoint, RigidJoint, TowBarJoint,
    TwoEndsSphereJoint,
};
