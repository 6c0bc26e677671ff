use thiserror::Error;

use crate::core::mesh::{Labels, Mesh};
use crate::core::packet::{Packet, PacketErr};

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("packet error")]
    PacketError(#[from] PacketErr),
}

/// Encodes a mesh back into its buffer layout.
///
/// Optional sections are emitted exactly when the source file carried them;
/// face colors serialize from the saved original palette so a live recolor
/// never leaks into an export. Re-encoding an unedited decoded mesh
/// reproduces a byte-identical trailer and an equivalent body.
pub fn encode(mesh: &Mesh) -> Result<Vec<u8>, Err> {
    let (vertex_flags, x_data, y_data, z_data) = encode_vertices(mesh)?;
    let (orientations, face_index_data) = encode_faces(mesh)?;

    let mut out = Packet::with_capacity(mesh.vertex_count * 4 + mesh.face_count * 6 + 18);
    out.write_bytes(&vertex_flags);
    out.write_bytes(&orientations);

    if mesh.had_face_priorities {
        match &mesh.face_priority {
            Some(priority) => out.write_bytes(priority),
            None => out.write_bytes(&vec![0; mesh.face_count]),
        }
    }
    if mesh.had_face_labels {
        out.write_bytes(&label_bytes(mesh.face_labels(), mesh.face_count));
    }
    if mesh.had_face_info {
        match &mesh.face_info {
            Some(info) => out.write_bytes(info),
            None => out.write_bytes(&vec![0; mesh.face_count]),
        }
    }
    if mesh.had_vertex_labels {
        out.write_bytes(&label_bytes(mesh.vertex_labels(), mesh.vertex_count));
    }
    if mesh.had_face_alphas {
        match &mesh.face_alpha {
            Some(alpha) => out.write_bytes(alpha),
            None => out.write_bytes(&vec![0; mesh.face_count]),
        }
    }

    out.write_bytes(&face_index_data);

    for f in 0..mesh.face_count {
        out.write_u16(mesh.original_face_color[f]);
    }
    for f in 0..mesh.textured_face_count {
        out.write_u16(mesh.textured_vertex_a[f]);
        out.write_u16(mesh.textured_vertex_b[f]);
        out.write_u16(mesh.textured_vertex_c[f]);
    }

    out.write_bytes(&x_data);
    out.write_bytes(&y_data);
    out.write_bytes(&z_data);

    // trailer
    out.write_u16(mesh.vertex_count as u16);
    out.write_u16(mesh.face_count as u16);
    out.write_u8(mesh.textured_face_count as u8);
    out.write_u8(mesh.had_face_info as u8);
    out.write_u8(if mesh.had_face_priorities {
        255
    } else {
        mesh.priority_val as u8
    });
    out.write_u8(mesh.had_face_alphas as u8);
    out.write_u8(mesh.had_face_labels as u8);
    out.write_u8(mesh.had_vertex_labels as u8);
    out.write_u16(x_data.len() as u16);
    out.write_u16(y_data.len() as u16);
    out.write_u16(z_data.len() as u16);
    out.write_u16(face_index_data.len() as u16);

    Ok(out.into_inner())
}

/// Positions become per-axis deltas against the previous vertex; an axis
/// with zero delta is dropped and its flag bit cleared.
fn encode_vertices(mesh: &Mesh) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>), PacketErr> {
    let mut flags = Vec::with_capacity(mesh.vertex_count);
    let mut xs = Packet::new();
    let mut ys = Packet::new();
    let mut zs = Packet::new();

    let (mut px, mut py, mut pz) = (0i32, 0i32, 0i32);
    for v in 0..mesh.vertex_count {
        let dx = mesh.vertex_x[v] - px;
        let dy = mesh.vertex_y[v] - py;
        let dz = mesh.vertex_z[v] - pz;

        let mut flag = 0u8;
        if dx != 0 {
            flag |= 1;
            xs.write_signed_smart(dx)?;
        }
        if dy != 0 {
            flag |= 2;
            ys.write_signed_smart(dy)?;
        }
        if dz != 0 {
            flag |= 4;
            zs.write_signed_smart(dz)?;
        }
        flags.push(flag);

        px = mesh.vertex_x[v];
        py = mesh.vertex_y[v];
        pz = mesh.vertex_z[v];
    }
    Ok((flags, xs.into_inner(), ys.into_inner(), zs.into_inner()))
}

/// Picks, per triangle, the orientation that reuses the most corners of the
/// previous one; only the inverse of the decoder's predictions is legal, so
/// the reuse codes are skipped whenever `c` matches the running offset.
fn encode_faces(mesh: &Mesh) -> Result<(Vec<u8>, Vec<u8>), PacketErr> {
    let mut orientations = Vec::with_capacity(mesh.face_count);
    let mut indices = Packet::new();

    let (mut ea, mut eb, mut ec, mut offset) = (0i32, 0i32, 0i32, 0i32);
    for f in 0..mesh.face_count {
        let a = mesh.face_vertex_a[f] as i32;
        let b = mesh.face_vertex_b[f] as i32;
        let c = mesh.face_vertex_c[f] as i32;

        if a == eb && b == ea && c != offset {
            orientations.push(4);
            indices.write_signed_smart(c - offset)?;
        } else if a == ec && b == eb && c != offset {
            orientations.push(3);
            indices.write_signed_smart(c - offset)?;
        } else if a == ea && b == ec && c != offset {
            orientations.push(2);
            indices.write_signed_smart(c - offset)?;
        } else {
            orientations.push(1);
            indices.write_signed_smart(a - offset)?;
            indices.write_signed_smart(b - a)?;
            indices.write_signed_smart(c - b)?;
        }
        offset = c;
        ea = a;
        eb = b;
        ec = c;
    }
    Ok((orientations, indices.into_inner()))
}

/// Serializes a label array back to one byte per element. Grouped labels are
/// flattened through their index lists; raw labels pass through.
fn label_bytes(labels: &Labels, element_count: usize) -> Vec<u8> {
    match labels {
        Labels::Raw(raw) => raw.clone(),
        Labels::Grouped(groups) => {
            let mut bytes = vec![0u8; element_count];
            for (label, indices) in groups.iter().enumerate() {
                for &index in indices {
                    if (index as usize) < element_count {
                        bytes[index as usize] = label as u8;
                    }
                }
            }
            bytes
        }
        Labels::Absent => vec![0; element_count],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;

    #[test]
    fn unedited_decode_encode_is_byte_identical() {
        // strip of four triangles exercising every orientation code
        let mut mesh = Mesh::from_geometry(
            vec![0, 10, 0, 10, 20, 20],
            vec![0, 0, 10, 10, 0, 10],
            vec![0, 0, 0, 0, 0, 5],
            vec![0, 0, 3, 2],
            vec![1, 2, 2, 3],
            vec![2, 3, 4, 5],
        );
        mesh.face_color = vec![1, 2, 3, 4];
        mesh.original_face_color = mesh.face_color.clone();

        let bytes = encode(&mesh).unwrap();
        let decoded = decode::mesh::decode(&bytes).unwrap();
        assert_eq!(decoded.vertex_x, mesh.vertex_x);
        assert_eq!(decoded.vertex_y, mesh.vertex_y);
        assert_eq!(decoded.vertex_z, mesh.vertex_z);
        assert_eq!(decoded.face_vertex_a, mesh.face_vertex_a);
        assert_eq!(decoded.face_vertex_b, mesh.face_vertex_b);
        assert_eq!(decoded.face_vertex_c, mesh.face_vertex_c);

        let (orientations, _) = encode_faces(&mesh).unwrap();
        assert_eq!(orientations, vec![1, 2, 3, 4]);
        assert_eq!(encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn orientation_codes_reuse_previous_corners() {
        // (0,1,2) explicit, then (0,2,3) reuses a and c as a and b
        let mesh = Mesh::from_geometry(
            vec![0, 10, 0, 10],
            vec![0, 0, 10, 10],
            vec![0, 0, 0, 0],
            vec![0, 0],
            vec![1, 2],
            vec![2, 3],
        );
        let (orientations, _) = encode_faces(&mesh).unwrap();
        assert_eq!(orientations, vec![1, 2]);
    }

    #[test]
    fn grouped_labels_flatten_back_to_bytes() {
        let labels = Labels::Grouped(vec![vec![1], vec![3], vec![0, 2]]);
        assert_eq!(label_bytes(&labels, 4), vec![2, 0, 2, 1]);
        assert_eq!(label_bytes(&Labels::Absent, 2), vec![0, 0]);
    }

    #[test]
    fn out_of_range_delta_fails() {
        let mesh = Mesh::from_geometry(
            vec![0, 20000],
            vec![0, 0],
            vec![0, 0],
            vec![0],
            vec![1],
            vec![1],
        );
        assert!(matches!(
            encode(&mesh),
            Err(Err::PacketError(PacketErr::SignedOutOfRange(20000)))
        ));
    }
}
