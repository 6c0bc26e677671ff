/// The transform applied by one skeleton group.
///
/// The on-disk kind byte 4 is reserved and never produced by the exporter;
/// anything outside the known range decodes to [`TransformKind::Unused`] and
/// is skipped during pose evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Recenters the pivot accumulator on the mean of the labeled vertices.
    Pivot,
    Translate,
    Rotate,
    Scale,
    /// Fades per-face alpha; its label set indexes face groups, not vertex
    /// groups.
    FaceAlpha,
    Unused,
}

impl TransformKind {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => TransformKind::Pivot,
            1 => TransformKind::Translate,
            2 => TransformKind::Rotate,
            3 => TransformKind::Scale,
            5 => TransformKind::FaceAlpha,
            _ => TransformKind::Unused,
        }
    }

    /// The axis value a clip assumes when the group's flag bit is absent:
    /// identity scale is 128/128, everything else defaults to zero.
    pub fn default_operand(self) -> i32 {
        match self {
            TransformKind::Scale => 128,
            _ => 0,
        }
    }
}

/// A skeleton definition: one transform kind and one affected-label set per
/// group. Both on-disk variants decode into this structure.
#[derive(Debug, Clone)]
pub struct Skeleton {
    kinds: Vec<TransformKind>,
    labels: Vec<Vec<u8>>,
}

impl Skeleton {
    pub fn new(kinds: Vec<TransformKind>, labels: Vec<Vec<u8>>) -> Self {
        debug_assert_eq!(kinds.len(), labels.len());
        Skeleton { kinds, labels }
    }

    pub fn group_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn kind(&self, group: usize) -> Option<TransformKind> {
        self.kinds.get(group).copied()
    }

    pub fn labels(&self, group: usize) -> Option<&[u8]> {
        self.labels.get(group).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping() {
        assert_eq!(TransformKind::from_raw(0), TransformKind::Pivot);
        assert_eq!(TransformKind::from_raw(3), TransformKind::Scale);
        assert_eq!(TransformKind::from_raw(5), TransformKind::FaceAlpha);
        assert_eq!(TransformKind::from_raw(4), TransformKind::Unused);
        assert_eq!(TransformKind::from_raw(200), TransformKind::Unused);
    }

    #[test]
    fn defaults_follow_kind() {
        assert_eq!(TransformKind::Scale.default_operand(), 128);
        assert_eq!(TransformKind::Rotate.default_operand(), 0);
    }

    #[test]
    fn out_of_range_group_lookups() {
        let skeleton = Skeleton::new(vec![TransformKind::Pivot], vec![vec![1, 2]]);
        assert_eq!(skeleton.kind(0), Some(TransformKind::Pivot));
        assert_eq!(skeleton.labels(0), Some(&[1u8, 2][..]));
        assert_eq!(skeleton.kind(1), None);
        assert_eq!(skeleton.labels(1), None);
    }
}
