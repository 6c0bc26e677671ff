use thiserror::Error;

use crate::core::packet::{Packet, PacketErr};
use crate::core::skeleton::{Skeleton, TransformKind};

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("packet error")]
    PacketError(#[from] PacketErr),
}

/// Decodes the legacy skeleton variant: a 4-byte footer giving the type and
/// label section lengths, both sections then read from offset 0. The group
/// count is the type section length.
pub fn decode_legacy(data: &[u8]) -> Result<Skeleton, Err> {
    let mut packet = Packet::from_slice(data);
    if packet.len() < 4 {
        return Err(PacketErr::NotEnoughData.into());
    }
    packet.seek(packet.len() - 4);
    let type_len = packet.read_u16()? as usize;
    let label_len = packet.read_u16()? as usize;

    packet.seek(0);
    let type_data = packet.read_bytes(type_len)?;
    let label_data = packet.read_bytes(label_len)?;

    let mut label_packet = Packet::from_vec(label_data);
    let mut kinds = Vec::with_capacity(type_len);
    let mut labels = Vec::with_capacity(type_len);
    for &raw in &type_data {
        kinds.push(TransformKind::from_raw(raw));
        let count = label_packet.read_u8()? as usize;
        labels.push(label_packet.read_bytes(count)?);
    }
    Ok(Skeleton::new(kinds, labels))
}

/// Decodes the compact skeleton variant: a leading group-count byte, all
/// kind bytes inline, then one length-prefixed label list per group.
pub fn decode_compact(data: &[u8]) -> Result<Skeleton, Err> {
    let mut packet = Packet::from_slice(data);
    let group_count = packet.read_u8()? as usize;

    let mut kinds = Vec::with_capacity(group_count);
    for _ in 0..group_count {
        kinds.push(TransformKind::from_raw(packet.read_u8()?));
    }

    let mut labels = Vec::with_capacity(group_count);
    for _ in 0..group_count {
        let count = packet.read_u8()? as usize;
        labels.push(packet.read_bytes(count)?);
    }
    Ok(Skeleton::new(kinds, labels))
}
