/// Defines the animation clip and the bundled clip set.
pub mod clip;

/// Defines the mesh object and its live edit operations.
pub mod mesh;

/// Defines the byte packet the codecs read from and write to.
pub mod packet;

/// Defines the caller-owned skeleton registry.
pub mod registry;

/// Defines the skeleton and its transform kinds.
pub mod skeleton;

/// Contains the fixed-point sine/cosine tables.
pub mod trig;
