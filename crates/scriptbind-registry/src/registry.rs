//! The semantic registry.
//!
//! One flat namespace of type names plus ordered declaration lists. Order is
//! semantic in two places: entity declaration order fixes the synthesized
//! enum order, and property declaration order within an entity fixes the
//! registration indices baked into generated code.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use scriptbind_core::decl::{
    CodeGenMarker, CustomType, EntityDecl, EnumGroup, EventDecl, MethodDecl, ObjectDecl,
    PropertyComponent, PropertyDecl, RemoteCallDecl, SettingDecl, SettingsGroup, Side,
};
use scriptbind_core::error::{BuildError, ErrorSink};
use scriptbind_core::loc::SourceLoc;
use scriptbind_core::unified::{MetaDescriptor, Primitive};

/// Names usable without declaration: the primitives plus the generic entity
/// base handle.
pub const BUILTIN_TYPES: [&str; 16] = [
    "int8", "uint8", "int16", "uint16", "int", "uint", "int64", "uint64", "float", "double",
    "string", "bool", "hstring", "any", "void", "Entity",
];

/// Class names accepted as the generic entity base when resolving bare
/// engine pointers.
pub const ENTITY_BASE_CLASSES: [&str; 3] = ["ServerEntity", "ClientEntity", "Entity"];

/// Everything the builders extract from the scanned tags.
#[derive(Debug)]
pub struct ApiRegistry {
    valid_types: FxHashSet<String>,

    pub custom_types: Vec<CustomType>,
    custom_type_names: FxHashSet<String>,

    /// Engine-declared enum groups, in scan order.
    pub engine_enum_groups: Vec<EnumGroup>,
    /// Script-declared enum groups plus the synthesized per-entity groups.
    pub script_enum_groups: Vec<EnumGroup>,
    engine_enum_names: FxHashSet<String>,
    script_enum_names: FxHashSet<String>,

    pub objects: Vec<ObjectDecl>,
    object_names: FxHashSet<String>,

    /// Entities in declaration order.
    pub entities: Vec<EntityDecl>,
    pub entity_relatives: FxHashSet<String>,

    pub components: Vec<PropertyComponent>,
    component_keys: FxHashSet<(String, String)>,

    /// Engine-exported properties, in scan order.
    pub export_properties: Vec<PropertyDecl>,
    /// Script-declared properties, in scan order.
    pub script_properties: Vec<PropertyDecl>,

    pub methods: Vec<MethodDecl>,
    pub export_events: Vec<EventDecl>,
    pub script_events: Vec<EventDecl>,

    pub settings_groups: Vec<SettingsGroup>,
    pub settings: Vec<SettingDecl>,

    pub remote_calls: Vec<RemoteCallDecl>,
    pub engine_hooks: Vec<String>,
    pub markers: Vec<CodeGenMarker>,

    /// Deduplicated generic function signatures (pipe-joined argument
    /// descriptors), sorted for stable funcdef emission.
    pub generic_funcdefs: BTreeSet<MetaDescriptor>,
}

impl Default for ApiRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self {
            valid_types: BUILTIN_TYPES.iter().map(|s| s.to_string()).collect(),
            custom_types: Vec::new(),
            custom_type_names: FxHashSet::default(),
            engine_enum_groups: Vec::new(),
            script_enum_groups: Vec::new(),
            engine_enum_names: FxHashSet::default(),
            script_enum_names: FxHashSet::default(),
            objects: Vec::new(),
            object_names: FxHashSet::default(),
            entities: Vec::new(),
            entity_relatives: FxHashSet::default(),
            components: Vec::new(),
            component_keys: FxHashSet::default(),
            export_properties: Vec::new(),
            script_properties: Vec::new(),
            methods: Vec::new(),
            export_events: Vec::new(),
            script_events: Vec::new(),
            settings_groups: Vec::new(),
            settings: Vec::new(),
            remote_calls: Vec::new(),
            engine_hooks: Vec::new(),
            markers: Vec::new(),
            generic_funcdefs: BTreeSet::new(),
        }
    }

    // ========================================================================
    // Name universe
    // ========================================================================

    /// Claim `name` in the global type namespace. On collision reports
    /// through the sink and returns false.
    pub fn claim_type(&mut self, name: &str, loc: &SourceLoc, sink: &mut ErrorSink) -> bool {
        if self.valid_types.contains(name) {
            sink.push(BuildError::NameInUse {
                name: name.to_string(),
                loc: loc.clone(),
            });
            return false;
        }
        self.valid_types.insert(name.to_string());
        true
    }

    pub fn is_valid_type(&self, name: &str) -> bool {
        self.valid_types.contains(name)
    }

    pub fn is_custom_type(&self, name: &str) -> bool {
        self.custom_type_names.contains(name)
    }

    pub fn is_engine_enum(&self, name: &str) -> bool {
        self.engine_enum_names.contains(name)
    }

    pub fn is_script_enum(&self, name: &str) -> bool {
        self.script_enum_names.contains(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.is_engine_enum(name) || self.is_script_enum(name)
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.object_names.contains(name)
    }

    pub fn is_entity(&self, name: &str) -> bool {
        self.entities.iter().any(|e| e.name == name)
    }

    pub fn is_entity_relative(&self, name: &str) -> bool {
        self.entity_relatives.contains(name)
    }

    pub(crate) fn note_custom_type(&mut self, name: &str) {
        self.custom_type_names.insert(name.to_string());
    }

    pub(crate) fn note_engine_enum(&mut self, name: &str) {
        self.engine_enum_names.insert(name.to_string());
    }

    pub(crate) fn note_script_enum(&mut self, name: &str) {
        self.script_enum_names.insert(name.to_string());
    }

    pub(crate) fn note_object(&mut self, name: &str) {
        self.object_names.insert(name.to_string());
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    pub fn entity(&self, name: &str) -> Option<&EntityDecl> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Resolve an implementing class name back to its entity; the side tells
    /// which of the two classes matched.
    pub fn entity_by_class(&self, class_name: &str) -> Option<(Side, &EntityDecl)> {
        self.entities.iter().find_map(|e| {
            if e.server_class.as_deref() == Some(class_name) {
                Some((Side::Server, e))
            } else if e.client_class.as_deref() == Some(class_name) {
                Some((Side::Client, e))
            } else {
                None
            }
        })
    }

    pub fn has_component(&self, entity: &str, component: &str) -> bool {
        self.component_keys
            .contains(&(entity.to_string(), component.to_string()))
    }

    /// Claim a (entity, component) pair; false if already declared.
    pub fn claim_component(&mut self, entity: &str, component: &str) -> bool {
        self.component_keys
            .insert((entity.to_string(), component.to_string()))
    }

    /// All properties of an entity in registration order: exported first,
    /// then script-declared, each in scan order.
    pub fn properties_of<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a PropertyDecl> {
        self.export_properties
            .iter()
            .chain(self.script_properties.iter())
            .filter(move |p| p.entity == entity)
    }

    /// Exported and script events in one pass.
    pub fn all_events(&self) -> impl Iterator<Item = &EventDecl> {
        self.export_events.iter().chain(self.script_events.iter())
    }

    /// Both enum universes: engine groups first, then script groups.
    pub fn all_enum_groups(&self) -> impl Iterator<Item = &EnumGroup> {
        self.engine_enum_groups
            .iter()
            .chain(self.script_enum_groups.iter())
    }

    pub fn enum_group(&self, name: &str) -> Option<&EnumGroup> {
        self.all_enum_groups().find(|g| g.name == name)
    }

    /// Underlying primitive of an enum group, if the name is an enum.
    pub fn enum_underlying(&self, name: &str) -> Option<Primitive> {
        self.enum_group(name).map(|g| g.underlying)
    }

    pub fn setting_key_taken(&self, name: &str) -> bool {
        self.settings.iter().any(|s| s.name == name)
            || self
                .settings_groups
                .iter()
                .any(|g| g.entries.iter().any(|e| e.key == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn loc() -> SourceLoc {
        SourceLoc::new(Arc::new(PathBuf::from("T.h")), 0)
    }

    #[test]
    fn builtins_are_reserved() {
        let mut reg = ApiRegistry::new();
        let mut sink = ErrorSink::new();
        assert!(reg.is_valid_type("hstring"));
        assert!(!reg.claim_type("int", &loc(), &mut sink));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn claim_is_first_come_first_served() {
        let mut reg = ApiRegistry::new();
        let mut sink = ErrorSink::new();
        assert!(reg.claim_type("ItemFlags", &loc(), &mut sink));
        assert!(!reg.claim_type("ItemFlags", &loc(), &mut sink));
        assert!(reg.is_valid_type("ItemFlags"));
    }

    #[test]
    fn component_pairs_are_per_entity() {
        let mut reg = ApiRegistry::new();
        assert!(reg.claim_component("Critter", "Bag"));
        assert!(!reg.claim_component("Critter", "Bag"));
        assert!(reg.claim_component("Item", "Bag"));
        assert!(reg.has_component("Critter", "Bag"));
        assert!(!reg.has_component("Location", "Bag"));
    }
}
