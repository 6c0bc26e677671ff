use indexmap::IndexMap;
use thiserror::Error;

use crate::core::mesh::{Labels, Mesh};
use crate::encode;

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("mesh encoding error")]
    EncodeError(#[from] encode::mesh::Err),
    #[error("no part {0} in this assembly")]
    UnknownPart(usize),
}

/// One source mesh's contribution to a combined mesh: where its vertices and
/// faces landed, and the per-vertex index translation. The map is
/// many-to-one under deduplication and iterates in insertion order.
#[derive(Debug, Clone)]
pub struct Part {
    mesh: Mesh,
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub face_offset: usize,
    pub face_count: usize,
    pub textured_face_offset: usize,
    pub textured_face_count: usize,
    vertex_map: IndexMap<u16, u16>,
}

impl Part {
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Original vertex index to combined vertex index.
    pub fn vertex_map(&self) -> &IndexMap<u16, u16> {
        &self.vertex_map
    }
}

/// A combined mesh that remembers where it came from. Vertex edits write
/// through to every part, and each part can be re-exported standalone.
#[derive(Debug, Clone)]
pub struct Assembly {
    combined: Mesh,
    parts: Vec<Part>,
}

impl Assembly {
    /// Merges the parts into one combined mesh, deduplicating identical
    /// vertex positions. Face attributes a part lacks are filled with
    /// defaults whenever a sibling part carries the section; a uniform
    /// priority is promoted to per-face only when parts disagree.
    pub fn merge(sources: Vec<Mesh>) -> Assembly {
        let mut copy_info = false;
        let mut copy_priority = false;
        let mut copy_alpha = false;
        let mut copy_labels = false;
        let mut uniform_priority: i32 = -1;

        let mut total_vertices = 0;
        let mut total_faces = 0;
        let mut total_textured = 0;

        for source in &sources {
            total_vertices += source.vertex_count;
            total_faces += source.face_count;
            total_textured += source.textured_face_count;

            copy_info |= source.face_info.is_some();
            match &source.face_priority {
                None => {
                    if uniform_priority == -1 {
                        uniform_priority = source.priority_val;
                    }
                    if uniform_priority != source.priority_val {
                        copy_priority = true;
                    }
                }
                Some(_) => copy_priority = true,
            }
            copy_alpha |= source.face_alpha.is_some();
            copy_labels |= source.face_labels().raw().is_some();
        }

        let mut vertices = CombinedVertices {
            x: Vec::with_capacity(total_vertices),
            y: Vec::with_capacity(total_vertices),
            z: Vec::with_capacity(total_vertices),
            label: Vec::with_capacity(total_vertices),
        };

        let mut face_a = Vec::with_capacity(total_faces);
        let mut face_b = Vec::with_capacity(total_faces);
        let mut face_c = Vec::with_capacity(total_faces);
        let mut face_color = Vec::with_capacity(total_faces);
        let mut face_info = copy_info.then(|| Vec::with_capacity(total_faces));
        let mut face_priority = copy_priority.then(|| Vec::with_capacity(total_faces));
        let mut face_alpha = copy_alpha.then(|| Vec::with_capacity(total_faces));
        let mut face_label = copy_labels.then(|| Vec::with_capacity(total_faces));

        let mut textured_a = Vec::with_capacity(total_textured);
        let mut textured_b = Vec::with_capacity(total_textured);
        let mut textured_c = Vec::with_capacity(total_textured);

        let mut parts: Vec<Part> = Vec::with_capacity(sources.len());

        for source in sources {
            let vertex_offset = vertices.x.len();
            let face_offset = face_a.len();
            let textured_face_offset = textured_a.len();
            let mut vertex_map = IndexMap::new();

            for f in 0..source.face_count {
                if let Some(info) = &mut face_info {
                    info.push(source.face_info.as_ref().map_or(0, |src| src[f]));
                }
                if let Some(priority) = &mut face_priority {
                    priority.push(
                        source
                            .face_priority
                            .as_ref()
                            .map_or(source.priority_val as u8, |src| src[f]),
                    );
                }
                if let Some(alpha) = &mut face_alpha {
                    alpha.push(source.face_alpha.as_ref().map_or(0, |src| src[f]));
                }
                if let Some(label) = &mut face_label {
                    label.push(source.face_labels().raw().map_or(0, |src| src[f]));
                }
                face_color.push(source.face_color[f]);

                face_a.push(vertices.add(&source, source.face_vertex_a[f], &mut vertex_map));
                face_b.push(vertices.add(&source, source.face_vertex_b[f], &mut vertex_map));
                face_c.push(vertices.add(&source, source.face_vertex_c[f], &mut vertex_map));
            }

            for f in 0..source.textured_face_count {
                textured_a.push(vertices.add(&source, source.textured_vertex_a[f], &mut vertex_map));
                textured_b.push(vertices.add(&source, source.textured_vertex_b[f], &mut vertex_map));
                textured_c.push(vertices.add(&source, source.textured_vertex_c[f], &mut vertex_map));
            }

            parts.push(Part {
                vertex_offset,
                vertex_count: vertices.x.len() - vertex_offset,
                face_offset,
                face_count: source.face_count,
                textured_face_offset,
                textured_face_count: source.textured_face_count,
                vertex_map,
                mesh: source,
            });
        }

        let mut combined =
            Mesh::from_geometry(vertices.x, vertices.y, vertices.z, face_a, face_b, face_c);
        combined.original_face_color = face_color.clone();
        combined.face_color = face_color;
        combined.face_info = face_info;
        combined.face_priority = face_priority;
        combined.face_alpha = face_alpha;
        combined.priority_val = uniform_priority;
        combined.textured_face_count = textured_a.len();
        combined.textured_vertex_a = textured_a;
        combined.textured_vertex_b = textured_b;
        combined.textured_vertex_c = textured_c;
        combined.vertex_labels = Labels::Raw(vertices.label);
        combined.face_labels = face_label.map_or(Labels::Absent, Labels::Raw);

        Assembly { combined, parts }
    }

    pub fn combined(&self) -> &Mesh {
        &self.combined
    }

    /// Mutable access for posing and other whole-mesh operations; single
    /// vertex edits should go through [`Assembly::update_vertex`] so they
    /// reach the parts.
    pub fn combined_mut(&mut self) -> &mut Mesh {
        &mut self.combined
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Moves one combined vertex and writes the edit through every part's
    /// mapping. Returns false for an out-of-range index.
    pub fn update_vertex(&mut self, vertex: usize, x: i32, y: i32, z: i32) -> bool {
        if !self.combined.update_vertex(vertex, x, y, z) {
            return false;
        }
        self.write_back();
        true
    }

    /// Snapshots the combined mesh's live positions as its originals and
    /// syncs every part to them.
    pub fn save_current_as_original(&mut self) {
        self.combined.save_current_as_original();
        self.write_back();
    }

    /// Restores the combined mesh and every part to their saved originals.
    pub fn reset_to_original(&mut self) {
        self.combined.reset_to_original();
        for part in &mut self.parts {
            part.mesh.reset_to_original();
        }
    }

    fn write_back(&mut self) {
        for part in &mut self.parts {
            for (&original, &combined) in &part.vertex_map {
                if (combined as usize) < self.combined.vertex_count {
                    part.mesh.vertex_x[original as usize] = self.combined.vertex_x[combined as usize];
                    part.mesh.vertex_y[original as usize] = self.combined.vertex_y[combined as usize];
                    part.mesh.vertex_z[original as usize] = self.combined.vertex_z[combined as usize];
                }
            }
            part.mesh.save_current_as_original();
        }
    }

    /// Re-encodes one source part standalone, with any written-back edits.
    pub fn export_part(&self, part: usize) -> Result<Vec<u8>, Err> {
        let part = self.parts.get(part).ok_or(Err::UnknownPart(part))?;
        Ok(encode::mesh::encode(&part.mesh)?)
    }

    /// Re-encodes every source part, in assembly order.
    pub fn export_parts(&self) -> Result<Vec<Vec<u8>>, Err> {
        self.parts
            .iter()
            .map(|part| encode::mesh::encode(&part.mesh).map_err(Err::from))
            .collect()
    }
}

/// The combined vertex arrays while a merge is in flight.
struct CombinedVertices {
    x: Vec<i32>,
    y: Vec<i32>,
    z: Vec<i32>,
    label: Vec<u8>,
}

impl CombinedVertices {
    /// Maps one source vertex to a combined index: an exact-position linear
    /// scan over every combined vertex emitted so far, appending on a miss.
    /// The first mapping recorded for a source index wins.
    fn add(&mut self, source: &Mesh, vertex: u16, map: &mut IndexMap<u16, u16>) -> u16 {
        let x = source.vertex_x[vertex as usize];
        let y = source.vertex_y[vertex as usize];
        let z = source.vertex_z[vertex as usize];

        let mut combined = None;
        for v in 0..self.x.len() {
            if self.x[v] == x && self.y[v] == y && self.z[v] == z {
                combined = Some(v as u16);
                break;
            }
        }
        let combined = combined.unwrap_or_else(|| {
            self.x.push(x);
            self.y.push(y);
            self.z.push(z);
            self.label.push(
                source
                    .vertex_labels()
                    .raw()
                    .map_or(0, |raw| raw[vertex as usize]),
            );
            (self.x.len() - 1) as u16
        });

        map.entry(vertex).or_insert(combined);
        combined
    }
}
