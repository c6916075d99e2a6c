//! Anomaly Catalog
//!
//! Validated, read-only set of anomaly definitions shared by every instance.

use std::collections::HashMap;
use std::sync::Arc;

use anomaly_events::{AnomalyDefinition, AnomalyKind};

use crate::error::CatalogError;

/// Definitions indexed by id, in load order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: Vec<Arc<AnomalyDefinition>>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Validates and indexes the definitions.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = AnomalyDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        for definition in definitions {
            validate(&definition)?;
            if catalog.by_id.contains_key(&definition.id) {
                return Err(CatalogError::DuplicateAnomaly(definition.id));
            }
            catalog
                .by_id
                .insert(definition.id.clone(), catalog.definitions.len());
            catalog.definitions.push(Arc::new(definition));
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<AnomalyDefinition>> {
        self.by_id.get(id).map(|&index| &self.definitions[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AnomalyDefinition>> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn validate(definition: &AnomalyDefinition) -> Result<(), CatalogError> {
    let id = &definition.id;
    if id.trim().is_empty() {
        return Err(CatalogError::EmptyAnomalyId);
    }
    if !definition.weight.is_finite() {
        return Err(CatalogError::InvalidWeight(id.clone()));
    }
    if definition.min_time > definition.max_time {
        return Err(CatalogError::InvertedTimeWindow {
            id: id.clone(),
            min: definition.min_time,
            max: definition.max_time,
        });
    }

    let durations = [
        ("global_cooldown", definition.global_cooldown),
        ("per_room_cooldown", definition.per_room_cooldown),
        ("auto_resolve_after", definition.kind.auto_resolve_after()),
    ];
    for (field, value) in durations {
        if !value.is_finite() || value < 0.0 {
            return Err(CatalogError::InvalidDuration { id: id.clone(), field });
        }
    }
    if let AnomalyKind::MovedObject(spec) = &definition.kind {
        for (field, value) in [("move_out", spec.move_out), ("move_back", spec.move_back)] {
            if !value.is_finite() || value < 0.0 {
                return Err(CatalogError::InvalidDuration { id: id.clone(), field });
            }
        }
    }

    if definition.requires_specific_spawn_points && definition.allowed_spawn_tags.is_empty() {
        return Err(CatalogError::MissingSpawnTags(id.clone()));
    }
    if matches!(definition.kind.target_group(), Some(group) if group.is_empty()) {
        return Err(CatalogError::EmptyTargetGroup(id.clone()));
    }
    Ok(())
}
