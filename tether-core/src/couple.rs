//! Coupling decisions: hierarchy merge vs. physical constraint.
//!
//! A linked pair is either *coupled* (the target merged under the source
//! in the host hierarchy, no backend constraint at all) or *attached*
//! (both bodies independent, bound only by the joint's constraints).
//! Switching between the two after a link exists must be lossless: joint
//! state such as a cable's deployed length is captured before the
//! teardown and reapplied after the rebuild, so nothing jumps.

use tracing::{debug, warn};

use tether_joint::ConstraintBackend;
use tether_types::{CouplingPolicy, LinkConfig, Result};

use crate::link::{build_joint_context, ActiveLink};
use crate::world::BodyWorld;

/// Mode a fresh link starts in under a policy.
pub(crate) fn initial_mode(policy: CouplingPolicy) -> bool {
    match policy {
        CouplingPolicy::AlwaysCoupled => true,
        // SetViaGui starts attached; the mode switch comes later.
        CouplingPolicy::NeverCouple | CouplingPolicy::SetViaGui => false,
    }
}

/// Whether both endpoints' attach nodes support a hierarchy merge.
pub(crate) fn can_couple(world: &dyn BodyWorld, link: &ActiveLink) -> bool {
    let source_ok = world
        .attach_node(link.source_body, &link.source_node)
        .map(|node| node.allows_coupling)
        .unwrap_or(false);
    let target_ok = world
        .attach_node(link.target_body, &link.target_node)
        .map(|node| node.allows_coupling)
        .unwrap_or(false);
    source_ok && target_ok
}

/// Switch an existing link's mode, losslessly.
///
/// On failure the previous mode is restored as far as the world allows;
/// the caller treats any `Err` as "mode unchanged".
pub(crate) fn switch_mode(
    link: &mut ActiveLink,
    config: &LinkConfig,
    world: &mut dyn BodyWorld,
    backend: &mut dyn ConstraintBackend,
    coupled: bool,
) -> Result<()> {
    // Capture joint state that must survive the rebuild.
    let deployed = link.joint.deployed_length();

    if coupled {
        link.joint.drop_joint(backend);
        if world.are_coupled(link.source_body, link.target_body) {
            debug!(link = %link.id, "bodies already coupled, refreshing");
        } else if let Err(err) = world.couple(
            link.source_body,
            &link.source_node,
            link.target_body,
            &link.target_node,
        ) {
            // Roll back to attached mode before reporting failure.
            let ctx = build_joint_context(
                world,
                link.source_body,
                &link.source_node,
                link.target_body,
                &link.target_node,
                config,
            )?;
            link.joint.create(backend, &ctx)?;
            if let Some(length) = deployed {
                link.joint.restore_deployed(backend, length)?;
            }
            return Err(err);
        }
        link.coupled = true;
    } else {
        if world.are_coupled(link.source_body, link.target_body) {
            world.decouple(link.target_body)?;
        }
        let ctx = build_joint_context(
            world,
            link.source_body,
            &link.source_node,
            link.target_body,
            &link.target_node,
            config,
        )?;
        if let Err(err) = link.joint.create(backend, &ctx) {
            // Re-merge so the pair is not left floating unconstrained.
            if let Err(undo) = world.couple(
                link.source_body,
                &link.source_node,
                link.target_body,
                &link.target_node,
            ) {
                warn!(link = %link.id, %undo, "rollback to coupled mode failed");
            }
            return Err(err);
        }
        if let Some(length) = deployed {
            link.joint.restore_deployed(backend, length)?;
        }
        link.coupled = false;
    }
    debug!(link = %link.id, coupled, "couple mode switched");
    Ok(())
}
