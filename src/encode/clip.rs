use thiserror::Error;

use crate::core::clip::Clip;
use crate::core::packet::{Packet, PacketErr};
use crate::core::registry::SkeletonRegistry;
use crate::core::skeleton::TransformKind;

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("clip references unknown skeleton {0}")]
    MissingSkeleton(u16),
    #[error("packet error")]
    PacketError(#[from] PacketErr),
}

/// Encodes a clip back into its channel-split buffer layout.
///
/// An unedited clip serializes against the group count its source file
/// declared; an edited one walks the skeleton's full group table, so its
/// serialized count may legally differ from the original. Per group the
/// first matching operation is consulted and axis values equal to the
/// group kind's default are elided.
pub fn encode(clip: &Clip, registry: &SkeletonRegistry) -> Result<Vec<u8>, Err> {
    let skeleton = registry
        .get(clip.skeleton)
        .ok_or(Err::MissingSkeleton(clip.skeleton))?;

    let group_count = if clip.is_modified() {
        skeleton.group_count()
    } else {
        clip.declared_group_count()
    };

    let mut head = Packet::with_capacity(5);
    head.write_u16(clip.id);
    head.write_u16(clip.skeleton);
    head.write_u8(group_count as u8);

    let mut flags = Packet::with_capacity(group_count);
    let mut values = Packet::new();

    for group in 0..group_count {
        let mut flag = 0u8;
        if let Some(op) = clip.ops().iter().find(|op| op.group == group) {
            let default = skeleton
                .kind(group)
                .map_or(0, TransformKind::default_operand);
            if op.x != default {
                flag |= 1;
                values.write_signed_smart(op.x)?;
            }
            if op.y != default {
                flag |= 2;
                values.write_signed_smart(op.y)?;
            }
            if op.z != default {
                flag |= 4;
                values.write_signed_smart(op.z)?;
            }
        }
        flags.write_u8(flag);
    }

    let mut out = Packet::with_capacity(head.len() + flags.len() + values.len() + 9);
    out.write_bytes(head.as_slice());
    out.write_bytes(flags.as_slice());
    out.write_bytes(values.as_slice());
    out.write_u8(clip.delay);

    // trailer
    out.write_u16(head.len() as u16);
    out.write_u16(flags.len() as u16);
    out.write_u16(values.len() as u16);
    out.write_u16(1);

    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clip::ClipOp;
    use crate::decode::clip::tests::{sample_clip_bytes, sample_registry};

    #[test]
    fn unedited_clip_roundtrips() {
        let registry = sample_registry();
        let clip = crate::decode::clip::decode(7, &sample_clip_bytes(), &registry).unwrap();

        let bytes = encode(&clip, &registry).unwrap();
        assert_eq!(bytes, sample_clip_bytes());

        let again = crate::decode::clip::decode(7, &bytes, &registry).unwrap();
        assert_eq!(again.ops(), clip.ops());
        assert_eq!(again.delay, clip.delay);
        assert_eq!(again.declared_group_count(), clip.declared_group_count());
    }

    #[test]
    fn edited_clip_serializes_the_skeleton_group_count() {
        let registry = sample_registry();
        let mut clip = crate::decode::clip::decode(7, &sample_clip_bytes(), &registry).unwrap();

        assert!(clip.remove_op(2));
        clip.add_op(1, -3, 0, 0);

        let bytes = encode(&clip, &registry).unwrap();
        let again = crate::decode::clip::decode(7, &bytes, &registry).unwrap();
        // group 1 keeps its first operation's values; group 2 fell silent
        assert_eq!(
            again.ops(),
            &[
                ClipOp { group: 0, x: 0, y: 0, z: 0 },
                ClipOp { group: 1, x: 10, y: 0, z: 0 },
            ]
        );
    }

    #[test]
    fn missing_skeleton_is_an_error() {
        let registry = sample_registry();
        let clip = crate::decode::clip::decode(7, &sample_clip_bytes(), &registry).unwrap();
        assert!(matches!(
            encode(&clip, &SkeletonRegistry::new()),
            Err(Err::MissingSkeleton(9))
        ));
    }
}
