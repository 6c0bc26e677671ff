use crate::core::trig;

/// Per-vertex or per-face label storage.
///
/// Labels arrive from the mesh file as one tag byte per vertex/face and are
/// converted exactly once into label groups: for each label id, the list of
/// vertex (or face) indices carrying it. The conversion is a one-way state
/// transition; the raw array is consumed by it.
#[derive(Debug, Clone)]
pub enum Labels {
    Absent,
    Raw(Vec<u8>),
    Grouped(Vec<Vec<u16>>),
}

impl Labels {
    pub fn is_grouped(&self) -> bool {
        matches!(self, Labels::Grouped(_))
    }

    pub fn raw(&self) -> Option<&[u8]> {
        match self {
            Labels::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn groups(&self) -> Option<&[Vec<u16>]> {
        match self {
            Labels::Grouped(groups) => Some(groups),
            _ => None,
        }
    }

    fn group(&mut self, element_count: usize) {
        let raw = match self {
            Labels::Raw(raw) => raw,
            _ => return,
        };

        let mut counts = [0usize; 256];
        let mut max_label = 0usize;
        for &label in raw.iter().take(element_count) {
            counts[label as usize] += 1;
            max_label = max_label.max(label as usize);
        }

        let mut groups: Vec<Vec<u16>> = (0..=max_label)
            .map(|label| Vec::with_capacity(counts[label]))
            .collect();
        for (index, &label) in raw.iter().take(element_count).enumerate() {
            groups[label as usize].push(index as u16);
        }

        *self = Labels::Grouped(groups);
    }
}

/// A decoded mesh: parallel coordinate arrays, triangle index arrays and the
/// optional per-face/per-vertex attribute arrays of the mesh format.
///
/// Positions carry a saved original copy so a posed or hand-edited mesh can
/// be restored; colors carry one so exports always serialize the authored
/// palette rather than a live recolor.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertex_count: usize,
    pub vertex_x: Vec<i32>,
    pub vertex_y: Vec<i32>,
    pub vertex_z: Vec<i32>,
    original_vertex_x: Vec<i32>,
    original_vertex_y: Vec<i32>,
    original_vertex_z: Vec<i32>,

    pub face_count: usize,
    pub face_vertex_a: Vec<u16>,
    pub face_vertex_b: Vec<u16>,
    pub face_vertex_c: Vec<u16>,
    pub face_color: Vec<u16>,
    pub(crate) original_face_color: Vec<u16>,

    pub face_info: Option<Vec<u8>>,
    pub face_priority: Option<Vec<u8>>,
    pub face_alpha: Option<Vec<u8>>,
    /// Uniform priority used when there is no per-face priority section.
    /// Kept signed: merging parts that all carry per-face priorities leaves
    /// it at the -1 sentinel, as the original toolchain did.
    pub priority_val: i32,

    pub textured_face_count: usize,
    pub textured_vertex_a: Vec<u16>,
    pub textured_vertex_b: Vec<u16>,
    pub textured_vertex_c: Vec<u16>,

    pub(crate) vertex_labels: Labels,
    pub(crate) face_labels: Labels,

    // Which optional sections the source buffer carried; re-encoding emits
    // exactly these sections again.
    pub(crate) had_face_info: bool,
    pub(crate) had_face_priorities: bool,
    pub(crate) had_face_alphas: bool,
    pub(crate) had_face_labels: bool,
    pub(crate) had_vertex_labels: bool,

    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub radius: i32,
    pub min_depth: i32,
    pub max_depth: i32,

    current_scale: [i32; 3],
    base_scale: [i32; 3],
}

impl Mesh {
    /// Builds a mesh from bare geometry, with every optional attribute
    /// absent. Mostly useful for tests and procedural callers; decoded
    /// meshes come out of [`decode::mesh`](crate::decode::mesh).
    pub fn from_geometry(
        vertex_x: Vec<i32>,
        vertex_y: Vec<i32>,
        vertex_z: Vec<i32>,
        face_vertex_a: Vec<u16>,
        face_vertex_b: Vec<u16>,
        face_vertex_c: Vec<u16>,
    ) -> Self {
        debug_assert_eq!(vertex_x.len(), vertex_y.len());
        debug_assert_eq!(vertex_x.len(), vertex_z.len());
        debug_assert_eq!(face_vertex_a.len(), face_vertex_b.len());
        debug_assert_eq!(face_vertex_a.len(), face_vertex_c.len());

        let vertex_count = vertex_x.len();
        let face_count = face_vertex_a.len();
        Mesh {
            vertex_count,
            original_vertex_x: vertex_x.clone(),
            original_vertex_y: vertex_y.clone(),
            original_vertex_z: vertex_z.clone(),
            vertex_x,
            vertex_y,
            vertex_z,
            face_count,
            face_vertex_a,
            face_vertex_b,
            face_vertex_c,
            face_color: vec![0; face_count],
            original_face_color: vec![0; face_count],
            face_info: None,
            face_priority: None,
            face_alpha: None,
            priority_val: 0,
            textured_face_count: 0,
            textured_vertex_a: Vec::new(),
            textured_vertex_b: Vec::new(),
            textured_vertex_c: Vec::new(),
            vertex_labels: Labels::Absent,
            face_labels: Labels::Absent,
            had_face_info: false,
            had_face_priorities: false,
            had_face_alphas: false,
            had_face_labels: false,
            had_vertex_labels: false,
            min_x: 0,
            max_x: 0,
            min_z: 0,
            max_z: 0,
            min_y: 0,
            max_y: 0,
            radius: 0,
            min_depth: 0,
            max_depth: 0,
            current_scale: [128, 128, 128],
            base_scale: [128, 128, 128],
        }
    }

    pub fn vertex_labels(&self) -> &Labels {
        &self.vertex_labels
    }

    pub fn face_labels(&self) -> &Labels {
        &self.face_labels
    }

    /// Converts raw label arrays into label groups, once. Pose evaluation
    /// only acts on grouped labels; calling this again is a no-op.
    pub fn build_label_groups(&mut self) {
        self.vertex_labels.group(self.vertex_count);
        self.face_labels.group(self.face_count);
    }

    /// Moves a single vertex, updating the saved original so a later reset
    /// keeps the edit. Returns false for an out-of-range index.
    pub fn update_vertex(&mut self, vertex: usize, x: i32, y: i32, z: i32) -> bool {
        if vertex >= self.vertex_count {
            return false;
        }
        self.vertex_x[vertex] = x;
        self.vertex_y[vertex] = y;
        self.vertex_z[vertex] = z;

        if self.current_scale != [128, 128, 128] {
            self.original_vertex_x[vertex] = (x as i64 * 128 / self.base_scale[0] as i64) as i32;
            self.original_vertex_y[vertex] = (y as i64 * 128 / self.base_scale[1] as i64) as i32;
            self.original_vertex_z[vertex] = (z as i64 * 128 / self.base_scale[2] as i64) as i32;
        } else {
            self.original_vertex_x[vertex] = x;
            self.original_vertex_y[vertex] = y;
            self.original_vertex_z[vertex] = z;
        }
        true
    }

    /// Snapshots the live positions as the new originals, unscaling first
    /// when a base scale is in effect.
    pub fn save_current_as_original(&mut self) {
        if self.base_scale != [128, 128, 128] {
            let [sx, sy, sz] = self.base_scale;
            self.original_vertex_x = unscale(&self.vertex_x, sx);
            self.original_vertex_y = unscale(&self.vertex_y, sy);
            self.original_vertex_z = unscale(&self.vertex_z, sz);
        } else {
            self.original_vertex_x = self.vertex_x.clone();
            self.original_vertex_y = self.vertex_y.clone();
            self.original_vertex_z = self.vertex_z.clone();
        }
    }

    /// Restores the saved original positions, undoing poses and edits made
    /// since the last snapshot.
    pub fn reset_to_original(&mut self) {
        self.vertex_x.copy_from_slice(&self.original_vertex_x);
        self.vertex_y.copy_from_slice(&self.original_vertex_y);
        self.vertex_z.copy_from_slice(&self.original_vertex_z);
        self.current_scale = self.base_scale;
    }

    pub fn translate(&mut self, x: i32, y: i32, z: i32) {
        for v in 0..self.vertex_count {
            self.vertex_x[v] += x;
            self.vertex_y[v] += y;
            self.vertex_z[v] += z;
        }
    }

    /// Rotates a quarter turn around the vertical axis.
    pub fn rotate_y90(&mut self) {
        for v in 0..self.vertex_count {
            let tmp = self.vertex_x[v];
            self.vertex_x[v] = self.vertex_z[v];
            self.vertex_z[v] = -tmp;
        }
    }

    /// Rotates a half turn around the vertical axis. Faces are rewound so
    /// their winding order survives the mirroring.
    pub fn rotate_y180(&mut self) {
        for v in 0..self.vertex_count {
            self.vertex_z[v] = -self.vertex_z[v];
        }
        for f in 0..self.face_count {
            let tmp = self.face_vertex_a[f];
            self.face_vertex_a[f] = self.face_vertex_c[f];
            self.face_vertex_c[f] = tmp;
        }
    }

    /// Rotates around the x axis by a 2048-step table angle.
    pub fn rotate_x(&mut self, angle: usize) {
        let sin = trig::sin(angle) as i64;
        let cos = trig::cos(angle) as i64;

        for v in 0..self.vertex_count {
            let y = self.vertex_y[v] as i64;
            let z = self.vertex_z[v] as i64;
            self.vertex_y[v] = ((y * cos - z * sin) >> 16) as i32;
            self.vertex_z[v] = ((y * sin + z * cos) >> 16) as i32;
        }
    }

    /// Scales by per-axis factors in 128ths. The first scale establishes the
    /// base scale used to unscale positions back into file units.
    pub fn scale(&mut self, x: i32, y: i32, z: i32) {
        self.current_scale = [x, y, z];
        if self.base_scale == [128, 128, 128] {
            self.base_scale = [x, y, z];
        }

        for v in 0..self.vertex_count {
            self.vertex_x[v] = (self.vertex_x[v] as i64 * x as i64 / 128) as i32;
            self.vertex_y[v] = (self.vertex_y[v] as i64 * y as i64 / 128) as i32;
            self.vertex_z[v] = (self.vertex_z[v] as i64 * z as i64 / 128) as i32;
        }
    }

    /// Replaces every face colored `src` with `dst`. The saved original
    /// palette is untouched, so exports still carry the authored colors.
    pub fn recolor(&mut self, src: u16, dst: u16) {
        for color in self.face_color.iter_mut() {
            if *color == src {
                *color = dst;
            }
        }
    }

    pub fn calculate_bounds_cylinder(&mut self) {
        self.max_y = 0;
        self.radius = 0;
        self.min_y = 0;

        let mut radius_sqr: i64 = 0;
        for v in 0..self.vertex_count {
            let x = self.vertex_x[v] as i64;
            let y = self.vertex_y[v];
            let z = self.vertex_z[v] as i64;

            if -y > self.max_y {
                self.max_y = -y;
            }
            if y > self.min_y {
                self.min_y = y;
            }
            radius_sqr = radius_sqr.max(x * x + z * z);
        }

        self.radius = ((radius_sqr as f64).sqrt() + 0.99) as i32;
        let r = self.radius as f64;
        self.min_depth = ((r * r + (self.max_y as f64).powi(2)).sqrt() + 0.99) as i32;
        self.max_depth =
            self.min_depth + ((r * r + (self.min_y as f64).powi(2)).sqrt() + 0.99) as i32;
    }

    pub fn calculate_bounds_aabb(&mut self) {
        self.max_y = 0;
        self.radius = 0;
        self.min_y = 0;
        self.min_x = 999999;
        self.max_x = -999999;
        self.max_z = -99999;
        self.min_z = 99999;

        let mut radius_sqr: i64 = 0;
        for v in 0..self.vertex_count {
            let x = self.vertex_x[v];
            let y = self.vertex_y[v];
            let z = self.vertex_z[v];

            self.min_x = self.min_x.min(x);
            self.max_x = self.max_x.max(x);
            self.min_z = self.min_z.min(z);
            self.max_z = self.max_z.max(z);
            if -y > self.max_y {
                self.max_y = -y;
            }
            if y > self.min_y {
                self.min_y = y;
            }
            radius_sqr = radius_sqr.max(x as i64 * x as i64 + z as i64 * z as i64);
        }

        self.radius = (radius_sqr as f64).sqrt() as i32;
        let r = self.radius as f64;
        self.min_depth = (r * r + (self.max_y as f64).powi(2)).sqrt() as i32;
        self.max_depth = self.min_depth + ((r * r + (self.min_y as f64).powi(2)).sqrt()) as i32;
    }

    /// Concatenates meshes by plain index shifting, without deduplication or
    /// a part mapping. Attribute sections present on any input are filled
    /// for all, substituting defaults where an input lacks them.
    pub fn concat(parts: &[Mesh]) -> Mesh {
        let mut copy_info = false;
        let mut copy_priority = false;
        let mut copy_alpha = false;
        let mut uniform_priority: i32 = -1;

        let mut vertex_count = 0;
        let mut face_count = 0;
        let mut textured_face_count = 0;

        for part in parts {
            vertex_count += part.vertex_count;
            face_count += part.face_count;
            textured_face_count += part.textured_face_count;

            copy_info |= part.face_info.is_some();
            match &part.face_priority {
                None => {
                    if uniform_priority == -1 {
                        uniform_priority = part.priority_val;
                    }
                    if uniform_priority != part.priority_val {
                        copy_priority = true;
                    }
                }
                Some(_) => copy_priority = true,
            }
            copy_alpha |= part.face_alpha.is_some();
        }

        let mut combined = Mesh::from_geometry(
            Vec::with_capacity(vertex_count),
            Vec::with_capacity(vertex_count),
            Vec::with_capacity(vertex_count),
            Vec::with_capacity(face_count),
            Vec::with_capacity(face_count),
            Vec::with_capacity(face_count),
        );
        combined.vertex_count = vertex_count;
        combined.face_count = face_count;
        combined.textured_face_count = textured_face_count;
        combined.face_color = Vec::with_capacity(face_count);
        combined.priority_val = uniform_priority;
        if copy_info {
            combined.face_info = Some(Vec::with_capacity(face_count));
        }
        if copy_priority {
            combined.face_priority = Some(Vec::with_capacity(face_count));
        }
        if copy_alpha {
            combined.face_alpha = Some(Vec::with_capacity(face_count));
        }

        for part in parts {
            let offset = combined.vertex_x.len() as u16;

            combined.vertex_x.extend_from_slice(&part.vertex_x);
            combined.vertex_y.extend_from_slice(&part.vertex_y);
            combined.vertex_z.extend_from_slice(&part.vertex_z);

            for f in 0..part.face_count {
                combined.face_vertex_a.push(part.face_vertex_a[f] + offset);
                combined.face_vertex_b.push(part.face_vertex_b[f] + offset);
                combined.face_vertex_c.push(part.face_vertex_c[f] + offset);
                combined.face_color.push(part.face_color[f]);

                if let Some(info) = &mut combined.face_info {
                    info.push(part.face_info.as_ref().map_or(0, |src| src[f]));
                }
                if let Some(priority) = &mut combined.face_priority {
                    priority.push(
                        part.face_priority
                            .as_ref()
                            .map_or(part.priority_val as u8, |src| src[f]),
                    );
                }
                if let Some(alpha) = &mut combined.face_alpha {
                    alpha.push(part.face_alpha.as_ref().map_or(0, |src| src[f]));
                }
            }

            for f in 0..part.textured_face_count {
                combined
                    .textured_vertex_a
                    .push(part.textured_vertex_a[f] + offset);
                combined
                    .textured_vertex_b
                    .push(part.textured_vertex_b[f] + offset);
                combined
                    .textured_vertex_c
                    .push(part.textured_vertex_c[f] + offset);
            }
        }

        combined.original_face_color = combined.face_color.clone();
        combined.save_current_as_original();
        combined.calculate_bounds_cylinder();
        combined
    }
}

fn unscale(values: &[i32], scale: i32) -> Vec<i32> {
    values
        .iter()
        .map(|&v| (v as i64 * 128 / scale as i64) as i32)
        .collect()
}
