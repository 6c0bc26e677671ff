use log::debug;
use thiserror::Error;

use crate::core::mesh::{Labels, Mesh};
use crate::core::packet::{Packet, PacketErr};

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("face {face} references vertex {index} outside 0..{vertex_count}")]
    FaceIndexOutOfRange {
        face: usize,
        index: i32,
        vertex_count: usize,
    },
    #[error("packet error")]
    PacketError(#[from] PacketErr),
}

/// Decodes one mesh buffer.
///
/// The 18-byte trailer names the counts, the optional-section flags and the
/// byte lengths of the delta streams; the body is then consumed from offset 0
/// in its fixed section order. Face vertex indices are validated against the
/// vertex count; a violation abandons the decode since the predictive index
/// state would be corrupt past it.
pub fn decode(data: &[u8]) -> Result<Mesh, Err> {
    let mut packet = Packet::from_slice(data);
    if packet.len() < 18 {
        return Err(PacketErr::NotEnoughData.into());
    }
    packet.seek(packet.len() - 18);

    let vertex_count = packet.read_u16()? as usize;
    let face_count = packet.read_u16()? as usize;
    let textured_face_count = packet.read_u8()? as usize;

    let info_flag = packet.read_u8()?;
    let priority_flag = packet.read_u8()?;
    let alpha_flag = packet.read_u8()?;
    let face_label_flag = packet.read_u8()?;
    let vertex_label_flag = packet.read_u8()?;

    let x_len = packet.read_u16()? as usize;
    let y_len = packet.read_u16()? as usize;
    let z_len = packet.read_u16()? as usize;
    let face_index_len = packet.read_u16()? as usize;

    debug!(
        "mesh: {} vertices, {} faces ({} textured), streams {}+{}+{}+{} bytes",
        vertex_count, face_count, textured_face_count, x_len, y_len, z_len, face_index_len
    );

    packet.seek(0);
    let vertex_flags = packet.read_bytes(vertex_count)?;
    let orientations = packet.read_bytes(face_count)?;

    let face_priority = if priority_flag == 255 {
        Some(packet.read_bytes(face_count)?)
    } else {
        None
    };
    let face_labels = if face_label_flag == 1 {
        Some(packet.read_bytes(face_count)?)
    } else {
        None
    };
    let face_info = if info_flag == 1 {
        Some(packet.read_bytes(face_count)?)
    } else {
        None
    };
    let vertex_labels = if vertex_label_flag == 1 {
        Some(packet.read_bytes(vertex_count)?)
    } else {
        None
    };
    let face_alpha = if alpha_flag == 1 {
        Some(packet.read_bytes(face_count)?)
    } else {
        None
    };

    let face_index_data = packet.read_bytes(face_index_len)?;
    let color_data = packet.read_bytes(face_count * 2)?;
    let textured_data = packet.read_bytes(textured_face_count * 6)?;
    let x_data = packet.read_bytes(x_len)?;
    let y_data = packet.read_bytes(y_len)?;
    let z_data = packet.read_bytes(z_len)?;

    let (vertex_x, vertex_y, vertex_z) = decode_vertices(&vertex_flags, &x_data, &y_data, &z_data)?;
    let (face_a, face_b, face_c) = decode_faces(&orientations, &face_index_data, vertex_count)?;

    let mut colors = Packet::from_vec(color_data);
    let mut face_color = Vec::with_capacity(face_count);
    for _ in 0..face_count {
        face_color.push(colors.read_u16()?);
    }

    let mut textured = Packet::from_vec(textured_data);
    let mut textured_vertex_a = Vec::with_capacity(textured_face_count);
    let mut textured_vertex_b = Vec::with_capacity(textured_face_count);
    let mut textured_vertex_c = Vec::with_capacity(textured_face_count);
    for face in 0..textured_face_count {
        textured_vertex_a.push(read_textured_index(&mut textured, face, vertex_count)?);
        textured_vertex_b.push(read_textured_index(&mut textured, face, vertex_count)?);
        textured_vertex_c.push(read_textured_index(&mut textured, face, vertex_count)?);
    }

    let mut mesh = Mesh::from_geometry(vertex_x, vertex_y, vertex_z, face_a, face_b, face_c);
    mesh.original_face_color = face_color.clone();
    mesh.face_color = face_color;
    mesh.face_info = face_info;
    mesh.face_priority = face_priority;
    mesh.face_alpha = face_alpha;
    mesh.priority_val = if priority_flag == 255 {
        0
    } else {
        priority_flag as i32
    };
    mesh.textured_face_count = textured_face_count;
    mesh.textured_vertex_a = textured_vertex_a;
    mesh.textured_vertex_b = textured_vertex_b;
    mesh.textured_vertex_c = textured_vertex_c;
    mesh.vertex_labels = vertex_labels.map_or(Labels::Absent, Labels::Raw);
    mesh.face_labels = face_labels.map_or(Labels::Absent, Labels::Raw);
    mesh.had_face_info = info_flag == 1;
    mesh.had_face_priorities = priority_flag == 255;
    mesh.had_face_alphas = alpha_flag == 1;
    mesh.had_face_labels = face_label_flag == 1;
    mesh.had_vertex_labels = vertex_label_flag == 1;
    Ok(mesh)
}

/// Vertex positions are per-axis deltas against the previous vertex; flag
/// bits 1/2/4 mark which axes carry an encoded delta at all.
fn decode_vertices(
    flags: &[u8],
    x_data: &[u8],
    y_data: &[u8],
    z_data: &[u8],
) -> Result<(Vec<i32>, Vec<i32>, Vec<i32>), PacketErr> {
    let mut xs = Packet::from_slice(x_data);
    let mut ys = Packet::from_slice(y_data);
    let mut zs = Packet::from_slice(z_data);

    let mut vertex_x = Vec::with_capacity(flags.len());
    let mut vertex_y = Vec::with_capacity(flags.len());
    let mut vertex_z = Vec::with_capacity(flags.len());

    let (mut x, mut y, mut z) = (0i32, 0i32, 0i32);
    for &flag in flags {
        if flag & 1 != 0 {
            x += xs.read_signed_smart()?;
        }
        if flag & 2 != 0 {
            y += ys.read_signed_smart()?;
        }
        if flag & 4 != 0 {
            z += zs.read_signed_smart()?;
        }
        vertex_x.push(x);
        vertex_y.push(y);
        vertex_z.push(z);
    }
    Ok((vertex_x, vertex_y, vertex_z))
}

/// Face indices are predicted from the previous triangle; the orientation
/// byte picks which corners carry over. Strictly sequential.
fn decode_faces(
    orientations: &[u8],
    index_data: &[u8],
    vertex_count: usize,
) -> Result<(Vec<u16>, Vec<u16>, Vec<u16>), Err> {
    let mut indices = Packet::from_slice(index_data);

    let mut face_a = Vec::with_capacity(orientations.len());
    let mut face_b = Vec::with_capacity(orientations.len());
    let mut face_c = Vec::with_capacity(orientations.len());

    let (mut a, mut b, mut c, mut last) = (0i32, 0i32, 0i32, 0i32);
    for (face, &orientation) in orientations.iter().enumerate() {
        match orientation {
            1 => {
                a = indices.read_signed_smart()? + last;
                b = indices.read_signed_smart()? + a;
                c = indices.read_signed_smart()? + b;
                last = c;
            }
            2 => {
                b = c;
                c = indices.read_signed_smart()? + last;
                last = c;
            }
            3 => {
                a = c;
                c = indices.read_signed_smart()? + last;
                last = c;
            }
            4 => {
                std::mem::swap(&mut a, &mut b);
                c = indices.read_signed_smart()? + last;
                last = c;
            }
            _ => {}
        }

        for index in [a, b, c] {
            if index < 0 || index as usize >= vertex_count {
                return Err(Err::FaceIndexOutOfRange {
                    face,
                    index,
                    vertex_count,
                });
            }
        }
        face_a.push(a as u16);
        face_b.push(b as u16);
        face_c.push(c as u16);
    }
    Ok((face_a, face_b, face_c))
}

fn read_textured_index(packet: &mut Packet, face: usize, vertex_count: usize) -> Result<u16, Err> {
    let index = packet.read_u16()?;
    if index as usize >= vertex_count {
        return Err(Err::FaceIndexOutOfRange {
            face,
            index: index as i32,
            vertex_count,
        });
    }
    Ok(index)
}
