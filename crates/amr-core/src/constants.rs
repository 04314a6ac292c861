/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Local scale applied to every flat (textured quad) overlay node.
pub const FLAT_NODE_SCALE: f64 = 0.5;

/// Physical image extent assumed when the tracker reports none (metres).
pub const DEFAULT_EXTENT: f64 = 0.2;
