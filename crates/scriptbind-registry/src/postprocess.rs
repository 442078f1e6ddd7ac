//! Post-build pass: synthesized per-entity enums and invariant checks.
//!
//! Every entity gets two script enums the engine relies on at runtime:
//!
//! - `<Entity>Component`, valuing each property component by the engine
//!   string hash of its name (`Invalid` = 0)
//! - `<Entity>Property`, valuing each property by its registration index in
//!   declaration order (`Invalid` = 0xFFFF)
//!
//! Afterwards every enum group, declared or synthesized, must contain a
//! zero entry and be free of key and value collisions. Each violation is one
//! diagnostic; the pass always inspects everything.

use rustc_hash::FxHashSet;

use scriptbind_core::decl::{EnumEntry, EnumGroup, EnumProvenance};
use scriptbind_core::error::{BuildError, ErrorSink};
use scriptbind_core::hash::script_hash;
use scriptbind_core::unified::Primitive;

use crate::registry::ApiRegistry;

pub fn run(reg: &mut ApiRegistry, sink: &mut ErrorSink) {
    synthesize_entity_enums(reg);
    check_enum_invariants(reg, sink);
}

fn synthesize_entity_enums(reg: &mut ApiRegistry) {
    let mut synthesized = Vec::new();

    for entity in &reg.entities {
        let mut entries = vec![EnumEntry::new("Invalid", "0", 0)];
        for component in reg.components.iter().filter(|c| c.entity == entity.name) {
            let hash = script_hash(&component.name);
            entries.push(EnumEntry::new(
                component.name.clone(),
                hash.to_string(),
                i64::from(hash),
            ));
        }
        synthesized.push(EnumGroup {
            name: format!("{}Component", entity.name),
            underlying: Primitive::Int,
            entries,
            flags: Vec::new(),
            doc: Vec::new(),
            provenance: EnumProvenance::Script,
        });
    }

    for entity in &reg.entities {
        let mut entries = vec![EnumEntry::new("Invalid", "0xFFFF", 0xFFFF)];
        for (index, property) in reg.properties_of(&entity.name).enumerate() {
            entries.push(EnumEntry::new(
                property.name.replace('.', "_"),
                index.to_string(),
                index as i64,
            ));
        }
        synthesized.push(EnumGroup {
            name: format!("{}Property", entity.name),
            underlying: Primitive::Uint16,
            entries,
            flags: Vec::new(),
            doc: Vec::new(),
            provenance: EnumProvenance::Script,
        });
    }

    reg.script_enum_groups.extend(synthesized);
}

fn check_enum_invariants(reg: &ApiRegistry, sink: &mut ErrorSink) {
    let mut problems = Vec::new();

    for group in reg.all_enum_groups() {
        if !group.entries.iter().any(|e| e.value == 0) {
            problems.push(BuildError::EnumNoZeroEntry {
                name: group.name.clone(),
            });
        }

        let mut keys = FxHashSet::default();
        let mut values = FxHashSet::default();
        for entry in &group.entries {
            if !keys.insert(entry.key.as_str()) {
                problems.push(BuildError::EnumDuplicateKey {
                    name: group.name.clone(),
                    key: entry.key.clone(),
                });
            }
            if !values.insert(entry.value) {
                problems.push(BuildError::EnumDuplicateValue {
                    name: group.name.clone(),
                    value: entry.value,
                });
            }
        }
    }

    for problem in problems {
        sink.push(problem);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbind_core::decl::{
        AccessMode, EntityDecl, EntityFlags, PropertyComponent, PropertyDecl,
    };
    use scriptbind_core::unified::UnifiedType;

    fn entity(name: &str) -> EntityDecl {
        EntityDecl {
            name: name.into(),
            server_class: Some(name.into()),
            client_class: None,
            flags: EntityFlags::empty(),
            exported: true,
            doc: Vec::new(),
        }
    }

    fn property(entity: &str, name: &str, exported: bool) -> PropertyDecl {
        PropertyDecl {
            entity: entity.into(),
            access: AccessMode::Public,
            ty: UnifiedType::Prim(Primitive::Uint),
            name: name.into(),
            exported,
            flags: Vec::new(),
            doc: Vec::new(),
        }
    }

    #[test]
    fn property_enum_indices_follow_declaration_order() {
        let mut reg = ApiRegistry::new();
        let mut sink = ErrorSink::new();
        reg.entities.push(entity("Item"));
        reg.export_properties.push(property("Item", "Cost", true));
        reg.export_properties.push(property("Item", "Weight", true));
        reg.script_properties.push(property("Item", "Bag.Loot", false));
        run(&mut reg, &mut sink);
        assert!(sink.is_empty());

        let group = reg.enum_group("ItemProperty").expect("synthesized");
        let spelled: Vec<(&str, i64)> = group
            .entries
            .iter()
            .map(|e| (e.key.as_str(), e.value))
            .collect();
        assert_eq!(
            spelled,
            [("Invalid", 0xFFFF), ("Cost", 0), ("Weight", 1), ("Bag_Loot", 2)]
        );
        assert_eq!(group.underlying, Primitive::Uint16);
    }

    #[test]
    fn component_enum_values_are_name_hashes() {
        let mut reg = ApiRegistry::new();
        let mut sink = ErrorSink::new();
        reg.entities.push(entity("Critter"));
        reg.export_properties.push(property("Critter", "Hp", true));
        reg.components.push(PropertyComponent {
            entity: "Critter".into(),
            name: "Bag".into(),
            flags: Vec::new(),
            doc: Vec::new(),
        });
        run(&mut reg, &mut sink);
        assert!(sink.is_empty());

        let group = reg.enum_group("CritterComponent").expect("synthesized");
        assert_eq!(group.entries[0].key, "Invalid");
        assert_eq!(group.entries[1].key, "Bag");
        assert_eq!(group.entries[1].value, i64::from(script_hash("Bag")));
        assert_eq!(group.underlying, Primitive::Int);
    }

    #[test]
    fn enum_collisions_each_cost_one_diagnostic() {
        let mut reg = ApiRegistry::new();
        let mut sink = ErrorSink::new();
        reg.engine_enum_groups.push(EnumGroup {
            name: "Corner".into(),
            underlying: Primitive::Uint8,
            entries: vec![
                EnumEntry::new("North", "1", 1),
                EnumEntry::new("South", "2", 2),
                EnumEntry::new("North", "3", 3),
                EnumEntry::new("East", "0x02", 2),
            ],
            flags: Vec::new(),
            doc: Vec::new(),
            provenance: EnumProvenance::Engine,
        });
        run(&mut reg, &mut sink);
        // Missing zero, one duplicate key, one duplicate value.
        assert_eq!(sink.len(), 3);
    }
}
