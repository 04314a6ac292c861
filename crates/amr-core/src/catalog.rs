use std::collections::BTreeMap;

use crate::overlay::{LocalOffset, OverlayRecipe};

/// Maps a marker label to the overlay it should get. `None` means the
/// label has no overlay and the marker is skipped.
pub trait OverlayFactory {
    fn recipe(&self, label: &str) -> Option<OverlayRecipe>;
}

impl<F> OverlayFactory for F
where
    F: Fn(&str) -> Option<OverlayRecipe>,
{
    fn recipe(&self, label: &str) -> Option<OverlayRecipe> {
        self(label)
    }
}

/// Fixed label → recipe table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayCatalog {
    recipes: BTreeMap<String, OverlayRecipe>,
}

impl OverlayCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference-image set shipped with the demo: wall decorations and
    /// a rangoli as textured quads, a diya and a kandil as models.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(
            "abs_3",
            OverlayRecipe::flat("diwali_wall_decoration_1", 0.5, 0.8)
                .with_offset(LocalOffset::ExtentZ(1.05)),
        );
        catalog.insert(
            "abs_5",
            OverlayRecipe::flat("diwali_rangoli_scaled_571_640", 1.5, 1.5),
        );
        catalog.insert("abs_6", OverlayRecipe::dynamic("diya_textured"));
        catalog.insert("abs_7", OverlayRecipe::dynamic("kandil_texture"));
        catalog.insert(
            "abs_8",
            OverlayRecipe::flat("diwali_wall_decoration_2", 0.25, 1.0)
                .with_offset(LocalOffset::ExtentZ(1.45)),
        );
        catalog
    }

    /// Insert or replace. Returns the previous recipe for `label`.
    pub fn insert(&mut self, label: &str, recipe: OverlayRecipe) -> Option<OverlayRecipe> {
        self.recipes.insert(label.to_string(), recipe)
    }

    pub fn get(&self, label: &str) -> Option<&OverlayRecipe> {
        self.recipes.get(label)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Entries in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OverlayRecipe)> {
        self.recipes.iter().map(|(label, recipe)| (label.as_str(), recipe))
    }
}

impl OverlayFactory for OverlayCatalog {
    fn recipe(&self, label: &str) -> Option<OverlayRecipe> {
        self.recipes.get(label).cloned()
    }
}
