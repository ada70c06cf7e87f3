//! Field values at one forcing frame.

use drift_grid::Plane;
use indexmap::IndexMap;

/// One field at one frame: `levels[k][leaf]` is the plane for depth
/// level `k` on leaf grid `leaf`.
///
/// A 2-D field has exactly one level.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldData {
    levels: Vec<Vec<Plane>>,
}

impl FieldData {
    /// A 2-D field: one plane per leaf grid.
    pub fn surface(planes: Vec<Plane>) -> Self {
        Self {
            levels: vec![planes],
        }
    }

    /// A 2-D field on a single grid.
    pub fn single(plane: Plane) -> Self {
        Self::surface(vec![plane])
    }

    /// A 3-D field: one entry per depth level, each with one plane per
    /// leaf grid.
    pub fn layered(levels: Vec<Vec<Plane>>) -> Self {
        Self { levels }
    }

    /// Number of depth levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Planes of level `k`, or `None` past the last level.
    pub fn level(&self, k: usize) -> Option<&[Plane]> {
        self.levels.get(k).map(Vec::as_slice)
    }
}

/// Every field at one forcing frame, keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    fields: IndexMap<String, FieldData>,
}

impl Snapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, data: FieldData) -> Self {
        self.insert(name, data);
        self
    }

    /// Add or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, data: FieldData) {
        self.fields.insert(name.into(), data);
    }

    /// A field by name.
    pub fn get(&self, name: &str) -> Option<&FieldData> {
        self.fields.get(name)
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
