use log::debug;
use thiserror::Error;

use crate::core::clip::{Clip, ClipOp, ClipSet};
use crate::core::packet::{Packet, PacketErr};
use crate::core::registry::SkeletonRegistry;
use crate::core::skeleton::{Skeleton, TransformKind};

/// Scratch bound for one clip of the bundled layout.
const SET_OP_CAPACITY: usize = 500;

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("operation list exceeded its scratch capacity")]
    CapacityExceeded,
    #[error("clip references unknown skeleton {0}")]
    MissingSkeleton(u16),
    #[error("packet error")]
    PacketError(#[from] PacketErr),
    #[error("skeleton decoding error")]
    SkeletonError(#[from] super::skeleton::Err),
}

/// Decodes one clip buffer against its skeleton, which must already be
/// registered. `id` is the numeric id the surrounding toolchain assigns to
/// the clip file.
pub fn decode(id: u16, data: &[u8], registry: &SkeletonRegistry) -> Result<Clip, Err> {
    let mut packet = Packet::from_slice(data);
    if packet.len() < 8 {
        return Err(PacketErr::NotEnoughData.into());
    }
    packet.seek(packet.len() - 8);
    let head_len = packet.read_u16()? as usize;
    let flag_len = packet.read_u16()? as usize;
    let value_len = packet.read_u16()? as usize;
    let delay_len = packet.read_u16()? as usize;

    packet.seek(0);
    let head_data = packet.read_bytes(head_len)?;
    let flag_data = packet.read_bytes(flag_len)?;
    let value_data = packet.read_bytes(value_len)?;
    let delay_data = packet.read_bytes(delay_len)?;

    let mut head = Packet::from_vec(head_data);
    head.read_u16()?; // reserved; holds the clip id on export
    let skeleton_id = head.read_u16()?;
    let group_count = head.read_u8()? as usize;

    let skeleton = registry
        .get(skeleton_id)
        .ok_or(Err::MissingSkeleton(skeleton_id))?;

    let delay = Packet::from_vec(delay_data).read_u8()?;

    let mut flags = Packet::from_vec(flag_data);
    let mut values = Packet::from_vec(value_data);
    let ops = decode_ops(&mut flags, &mut values, group_count, 2 * group_count, skeleton)?;

    debug!(
        "clip {}: skeleton {}, {} of {} groups set, delay {}",
        id,
        skeleton_id,
        ops.len(),
        group_count,
        delay
    );
    Ok(Clip::new(id, skeleton_id, delay, ops, group_count))
}

/// Decodes one bundled clip-set buffer: an 8-byte footer giving the meta,
/// flag, value and delay section lengths; the compact-variant skeleton sits
/// after the delay section. Every clip in the set indexes that skeleton,
/// which the caller registers under `skeleton_id`.
pub fn decode_set(skeleton_id: u16, data: &[u8]) -> Result<ClipSet, Err> {
    let mut packet = Packet::from_slice(data);
    if packet.len() < 8 {
        return Err(PacketErr::NotEnoughData.into());
    }
    packet.seek(packet.len() - 8);
    let meta_len = packet.read_u16()? as usize;
    let flag_len = packet.read_u16()? as usize;
    let value_len = packet.read_u16()? as usize;
    let delay_len = packet.read_u16()? as usize;

    packet.seek(0);
    let clip_count = packet.read_u16()? as usize;
    let meta_data = packet.read_bytes(meta_len)?;
    let flag_data = packet.read_bytes(flag_len)?;
    let value_data = packet.read_bytes(value_len)?;
    let delay_data = packet.read_bytes(delay_len)?;
    let skeleton = super::skeleton::decode_compact(&data[packet.pos()..])?;

    let mut meta = Packet::from_vec(meta_data);
    let mut flags = Packet::from_vec(flag_data);
    let mut values = Packet::from_vec(value_data);
    let mut delays = Packet::from_vec(delay_data);

    debug!("clip set: {} clips, skeleton {}", clip_count, skeleton_id);

    let mut clips = Vec::with_capacity(clip_count);
    for _ in 0..clip_count {
        let clip_id = meta.read_u16()?;
        let group_count = meta.read_u8()? as usize;
        let delay = delays.read_u8()?;
        let ops = decode_ops(&mut flags, &mut values, group_count, SET_OP_CAPACITY, &skeleton)?;
        clips.push(Clip::new(clip_id, skeleton_id, delay, ops, group_count));
    }
    Ok(ClipSet { skeleton, clips })
}

/// Walks the per-group flag bytes in file order. A zero flag byte emits
/// nothing. Before a non-pivot group's operation, the nearest pivot group
/// since the last emitted one gets a zero-valued reset operation; absent
/// flag bits fall back to the group kind's default operand.
fn decode_ops(
    flags: &mut Packet,
    values: &mut Packet,
    group_count: usize,
    capacity: usize,
    skeleton: &Skeleton,
) -> Result<Vec<ClipOp>, Err> {
    let mut ops: Vec<ClipOp> = Vec::new();
    let mut last_group: i32 = -1;

    for j in 0..group_count {
        let flag = flags.read_u8()?;
        if flag == 0 {
            continue;
        }

        if matches!(skeleton.kind(j), Some(kind) if kind != TransformKind::Pivot) {
            for group in (last_group + 1..j as i32).rev() {
                if skeleton.kind(group as usize) == Some(TransformKind::Pivot) {
                    if ops.len() >= capacity {
                        return Err(Err::CapacityExceeded);
                    }
                    ops.push(ClipOp {
                        group: group as usize,
                        x: 0,
                        y: 0,
                        z: 0,
                    });
                    break;
                }
            }
        }

        if ops.len() >= capacity {
            return Err(Err::CapacityExceeded);
        }

        let default = skeleton.kind(j).map_or(0, TransformKind::default_operand);
        let x = if flag & 1 != 0 {
            values.read_signed_smart()?
        } else {
            default
        };
        let y = if flag & 2 != 0 {
            values.read_signed_smart()?
        } else {
            default
        };
        let z = if flag & 4 != 0 {
            values.read_signed_smart()?
        } else {
            default
        };
        ops.push(ClipOp { group: j, x, y, z });
        last_group = j as i32;
    }
    Ok(ops)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::skeleton::Skeleton;

    // group 0: pivot over {0}, group 1: translate over {1},
    // group 2: scale over {2}
    pub(crate) fn sample_skeleton() -> Skeleton {
        Skeleton::new(
            vec![
                TransformKind::Pivot,
                TransformKind::Translate,
                TransformKind::Scale,
            ],
            vec![vec![0], vec![1], vec![2]],
        )
    }

    pub(crate) fn sample_registry() -> SkeletonRegistry {
        let mut registry = SkeletonRegistry::new();
        registry.insert(9, sample_skeleton());
        registry
    }

    // clip against skeleton 9: group 1 sets x=10, group 2 sets y=64
    pub(crate) fn sample_clip_bytes() -> Vec<u8> {
        vec![
            0, 7, 0, 9, 3, // head: reserved, skeleton id, group count
            0, 1, 2, // flags: group 0 silent, group 1 x, group 2 y
            74, 0xC0, 0x40, // values: +10, then wide-encoded 64
            5, // delay
            0, 5, 0, 3, 0, 3, 0, 1, // trailer
        ]
    }

    #[test]
    fn pivot_reset_is_inserted_before_the_first_non_pivot_group() {
        let clip = decode(7, &sample_clip_bytes(), &sample_registry()).unwrap();
        assert_eq!(clip.skeleton, 9);
        assert_eq!(clip.delay, 5);
        assert_eq!(clip.declared_group_count(), 3);
        assert_eq!(
            clip.ops(),
            &[
                // zero-valued reset for the silent pivot group 0
                ClipOp { group: 0, x: 0, y: 0, z: 0 },
                ClipOp { group: 1, x: 10, y: 0, z: 0 },
                // scale-kind defaults are 128, y was explicit
                ClipOp { group: 2, x: 128, y: 64, z: 128 },
            ]
        );
    }

    #[test]
    fn missing_skeleton_is_an_error() {
        let registry = SkeletonRegistry::new();
        assert!(matches!(
            decode(7, &sample_clip_bytes(), &registry),
            Err(Err::MissingSkeleton(9))
        ));
    }

    #[test]
    fn group_beyond_the_skeleton_table_defaults_to_zero() {
        let data = vec![
            0, 7, 0, 9, 5, // declares 5 groups, skeleton has 3
            0, 1, 2, 4, 1, // flags
            74, 0xC0, 0x40, 70, 75, // values
            5, // delay
            0, 5, 0, 5, 0, 5, 0, 1, // trailer
        ];
        let clip = decode(7, &data, &sample_registry()).unwrap();
        let ops = clip.ops();
        // groups 3 and 4 sit beyond the table: no pivot insertion, default 0
        assert_eq!(ops[3], ClipOp { group: 3, x: 0, y: 0, z: 6 });
        assert_eq!(ops[4], ClipOp { group: 4, x: 11, y: 0, z: 0 });
    }

    #[test]
    fn clip_set_decodes_skeleton_and_all_clips() {
        let data = vec![
            0, 2, // clip count
            0, 20, 3, // clip 20: 3 groups
            0, 21, 3, // clip 21: 3 groups
            0, 1, 2, // clip 20 flags
            0, 0, 1, // clip 21 flags
            74, 0xC0, 0x40, // clip 20 values
            54, // clip 21 values: scale x = -10
            4, 6, // delays
            3, 0, 1, 3, 1, 0, 1, 1, 1, 2, // compact skeleton
            0, 6, 0, 6, 0, 4, 0, 2, // footer
        ];
        let set = decode_set(9, &data).unwrap();
        assert_eq!(set.skeleton.group_count(), 3);
        assert_eq!(set.clips.len(), 2);

        let first = &set.clips[0];
        assert_eq!((first.id, first.skeleton, first.delay), (20, 9, 4));
        assert_eq!(
            first.ops(),
            &[
                ClipOp { group: 0, x: 0, y: 0, z: 0 },
                ClipOp { group: 1, x: 10, y: 0, z: 0 },
                ClipOp { group: 2, x: 128, y: 64, z: 128 },
            ]
        );

        let second = &set.clips[1];
        assert_eq!((second.id, second.delay), (21, 6));
        assert_eq!(
            second.ops(),
            &[
                ClipOp { group: 0, x: 0, y: 0, z: 0 },
                ClipOp { group: 2, x: -10, y: 128, z: 128 },
            ]
        );
    }
}
