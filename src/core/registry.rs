use indexmap::IndexMap;

use super::skeleton::Skeleton;

/// Caller-owned table of decoded skeletons, keyed by the numeric id the
/// surrounding toolchain assigns to each skeleton file. Clip decoding,
/// clip encoding and pose evaluation resolve their skeleton reference
/// through a `&SkeletonRegistry` instead of any shared global state.
#[derive(Debug, Default)]
pub struct SkeletonRegistry {
    skeletons: IndexMap<u16, Skeleton>,
}

impl SkeletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `skeleton` under `id`, replacing any previous entry.
    pub fn insert(&mut self, id: u16, skeleton: Skeleton) {
        self.skeletons.insert(id, skeleton);
    }

    pub fn get(&self, id: u16) -> Option<&Skeleton> {
        self.skeletons.get(&id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.skeletons.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.skeletons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skeletons.is_empty()
    }
}
