//! Prerequisite lookup over the concept catalog.
//!
//! The course is module-gated: a family in module N depends on every
//! family of the module immediately before it in the module ordering.
//! Module ids are fractional (half-step modules like 0.5 and 4.5 sit
//! between the integer ones), so ordering goes through `total_cmp`.

use crate::types::ConceptFamily;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ModuleGroup {
    module_id: f64,
    family_ids: Vec<String>,
}

/// Immutable view of the catalog's dependency structure, built once at
/// engine construction.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Ascending by module id; family order within a group follows the
    /// catalog.
    modules: Vec<ModuleGroup>,
    /// family id -> index into `modules`.
    module_index: HashMap<String, usize>,
    tiers: HashMap<String, u8>,
}

impl DependencyGraph {
    pub fn build(families: &[ConceptFamily]) -> Self {
        let mut modules: Vec<ModuleGroup> = Vec::new();
        let mut tiers = HashMap::new();
        for family in families {
            tiers.insert(family.id.clone(), family.tier);
            match modules
                .iter_mut()
                .find(|g| g.module_id.total_cmp(&family.module_id).is_eq())
            {
                Some(group) => group.family_ids.push(family.id.clone()),
                None => modules.push(ModuleGroup {
                    module_id: family.module_id,
                    family_ids: vec![family.id.clone()],
                }),
            }
        }
        modules.sort_by(|a, b| a.module_id.total_cmp(&b.module_id));

        let mut module_index = HashMap::new();
        for (idx, group) in modules.iter().enumerate() {
            for id in &group.family_ids {
                module_index.insert(id.clone(), idx);
            }
        }
        Self {
            modules,
            module_index,
            tiers,
        }
    }

    /// All prerequisites of a family: the full previous module. Empty
    /// for the first module, `None` for an unknown family.
    pub fn prerequisites(&self, family_id: &str) -> Option<Vec<String>> {
        let idx = *self.module_index.get(family_id)?;
        if idx == 0 {
            return Some(Vec::new());
        }
        Some(self.modules[idx - 1].family_ids.clone())
    }

    pub fn module_of(&self, family_id: &str) -> Option<f64> {
        self.module_index
            .get(family_id)
            .map(|&idx| self.modules[idx].module_id)
    }

    pub fn tier_of(&self, family_id: &str) -> Option<u8> {
        self.tiers.get(family_id).copied()
    }

    pub fn contains(&self, family_id: &str) -> bool {
        self.module_index.contains_key(family_id)
    }
}
