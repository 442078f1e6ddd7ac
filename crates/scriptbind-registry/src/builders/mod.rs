//! Declaration builders, one per tag family.
//!
//! Builders run in dependency order: the type universe first (enums, custom
//! types, objects, entities), then everything that references it. Each
//! record is validated independently; a bad record costs one diagnostic and
//! never stops the batch.

mod extras;
mod members;
mod types;

use scriptbind_core::error::{BuildError, ErrorSink};
use scriptbind_core::loc::SourceLoc;
use scriptbind_core::tags::TagRecord;
use scriptbind_scanner::TagSet;
use tracing::debug;

use crate::postprocess;
use crate::registry::ApiRegistry;

/// Build the registry from scanned tags. Always returns a registry; whether
/// it is usable is decided by the sink at the caller's checkpoint.
pub fn build_registry(tags: &TagSet, sink: &mut ErrorSink) -> ApiRegistry {
    let mut reg = ApiRegistry::new();

    types::export_enums(&mut reg, tags, sink);
    types::export_types(&mut reg, tags, sink);
    types::script_enums(&mut reg, tags, sink);
    types::export_objects(&mut reg, tags, sink);
    types::export_entities(&mut reg, tags, sink);
    types::script_entities(&mut reg, tags, sink);

    members::export_properties(&mut reg, tags, sink);
    members::export_methods(&mut reg, tags, sink);
    members::export_events(&mut reg, tags, sink);
    members::property_components(&mut reg, tags, sink);
    members::script_properties(&mut reg, tags, sink);
    members::script_events(&mut reg, tags, sink);
    members::remote_calls(&mut reg, tags, sink);

    extras::export_settings(&mut reg, tags, sink);
    extras::script_settings(&mut reg, tags, sink);
    extras::engine_hooks(&mut reg, tags, sink);
    extras::markers(&mut reg, tags, sink);

    postprocess::run(&mut reg, sink);

    debug!(
        entities = reg.entities.len(),
        enums = reg.engine_enum_groups.len() + reg.script_enum_groups.len(),
        methods = reg.methods.len(),
        "registry built"
    );
    reg
}

/// Run `build` over every record of a family, converting per-record failures
/// into sink entries.
pub(crate) fn for_each<F>(records: &[TagRecord], sink: &mut ErrorSink, mut build: F)
where
    F: FnMut(&TagRecord, &mut ErrorSink) -> Result<(), BuildError>,
{
    for record in records {
        if let Err(err) = build(record, sink) {
            sink.push(err);
        }
    }
}

pub(crate) fn invalid(detail: impl Into<String>, loc: &SourceLoc) -> BuildError {
    BuildError::InvalidTagInfo {
        detail: detail.into(),
        loc: loc.clone(),
    }
}

/// Parse an integer literal the way enum values are written in engine
/// headers: decimal, hex (`0x`), octal (`0o`), binary (`0b`), with an
/// optional sign.
pub(crate) fn parse_int_literal(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if let Some(oct) = digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use scriptbind_core::decl::{AccessMode, ScriptLang, Side};
    use scriptbind_core::unified::{Primitive, UnifiedType};
    use scriptbind_scanner::scan_source;

    fn build(sources: &[(&str, &str)]) -> (ApiRegistry, ErrorSink) {
        let mut set = TagSet::default();
        let mut sink = ErrorSink::new();
        for (path, content) in sources {
            scan_source(Arc::new(PathBuf::from(path)), content, &mut set, &mut sink);
        }
        let reg = build_registry(&set, &mut sink);
        (reg, sink)
    }

    const ENGINE_HEADER: &str = "\
///@ ExportEnum
enum class CornerType : uint8
{
    NorthSouth = 0,
    West = 1,
    East = 0x02,
};

///@ ExportEntity Item Item ItemView HasProto
class ItemProperties : public EntityProperties
{
public:
    ///@ ExportProperty
    ENTITY_PROPERTY(Public, uint, Cost);
    ///@ ExportProperty ReadOnly
    ENTITY_PROPERTY(PrivateServer, vector<uint>, BlockLines);
};

///@ ExportMethod
[[maybe_unused]] bool Server_Item_SetCount(Item* self, uint count, bool forced);

class Item final : public ServerEntity
{
public:
    ///@ ExportEvent
    ENTITY_EVENT(OnDropped, ServerEntity* /*owner*/, uint /*count*/);
};
";

    const SCRIPT_SOURCE: &str = "\
///@ Enum QuestState Opened
///@ Enum QuestState Done = 300
///@ Entity Server Quest
///@ PropertyComponent Item Armor
///@ Property Item Public const uint Armor.Rating
///@ Event Server Item OnRepair (Entity owner, uint cost)
///@ RemoteCall Server UseQuestItem (Item item)
///@ Setting Common uint LootCap = 100
";

    #[test]
    fn engine_header_builds_cleanly() {
        let (reg, sink) = build(&[("Core.h", ENGINE_HEADER)]);
        assert!(sink.is_empty(), "{sink}");

        let corner = reg.enum_group("CornerType").expect("enum");
        assert_eq!(corner.underlying, Primitive::Uint8);
        assert_eq!(corner.entries[2].literal, "0x02");
        assert_eq!(corner.entries[2].value, 2);

        let item = reg.entity("Item").expect("entity");
        assert_eq!(item.client_class.as_deref(), Some("ItemView"));
        assert!(reg.is_entity_relative("ProtoItem"));
        assert!(reg.is_script_enum("ItemProperty"));

        assert_eq!(reg.export_properties.len(), 2);
        assert_eq!(reg.export_properties[0].access, AccessMode::Public);
        assert_eq!(
            reg.export_properties[1].ty,
            UnifiedType::array(UnifiedType::Prim(Primitive::Uint))
        );

        let method = &reg.methods[0];
        assert_eq!((method.target, method.entity.as_str()), (Side::Server, "Item"));
        assert_eq!(method.name, "SetCount");
        assert_eq!(method.params.len(), 2);

        // Declaring class resolves to the entity via its server class name.
        let event = &reg.export_events[0];
        assert_eq!((event.target, event.entity.as_str()), (Side::Server, "Item"));
        assert_eq!(event.args[0].1, "owner");
    }

    #[test]
    fn script_declarations_build_on_engine_types() {
        let (reg, sink) = build(&[("Core.h", ENGINE_HEADER), ("quests.fos", SCRIPT_SOURCE)]);
        assert!(sink.is_empty(), "{sink}");

        // Auto-increment then explicit value; widening past 0xFF.
        let quest_state = reg.enum_group("QuestState").expect("enum");
        assert_eq!(quest_state.entries[0].value, 0);
        assert_eq!(quest_state.entries[1].value, 300);
        assert_eq!(quest_state.underlying, Primitive::Uint16);

        let prop = &reg.script_properties[0];
        assert_eq!(prop.name, "Armor.Rating");
        assert!(prop.flags.iter().any(|f| f == "ReadOnly"));

        let rc = &reg.remote_calls[0];
        assert_eq!(rc.namespace, "quests");
        assert_eq!(rc.lang, ScriptLang::AngelScript);
        assert_eq!(rc.args[0].0, UnifiedType::Named("Item".into()));

        // Entity property enum covers exported and scripted properties.
        let item_props = reg.enum_group("ItemProperty").expect("synthesized");
        let keys: Vec<&str> = item_props.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["Invalid", "Cost", "BlockLines", "Armor_Rating"]);
    }

    #[test]
    fn component_must_precede_property() {
        let (reg, sink) = build(&[
            ("Core.h", ENGINE_HEADER),
            ("bad.fos", "///@ Property Item Public uint Phantom.Rating\n"),
        ]);
        assert_eq!(sink.len(), 1);
        assert!(reg.script_properties.is_empty());
    }

    #[test]
    fn duplicate_events_and_settings_rejected() {
        let extra = "\
///@ Event Server Item OnDropped ()
///@ Setting Common uint LootCap
///@ Setting Common uint LootCap
";
        let (reg, sink) = build(&[("Core.h", ENGINE_HEADER), ("dup.fos", extra)]);
        // Exported OnDropped collides, and the second LootCap collides.
        assert_eq!(sink.len(), 2);
        assert_eq!(reg.settings.len(), 1);
        assert!(reg.script_events.is_empty());
    }

    #[test]
    fn bad_records_do_not_stop_the_batch() {
        let source = "\
///@ Entity Server Spell
///@ Entity Nowhere Ghost
///@ Entity Server Craft
";
        let (reg, sink) = build(&[("a.fos", source)]);
        assert_eq!(sink.len(), 1);
        assert!(reg.is_entity("Spell"));
        assert!(reg.is_entity("Craft"));
        assert!(!reg.is_entity("Ghost"));
    }

    #[test]
    fn int_literals() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0xFFFF"), Some(0xFFFF));
        assert_eq!(parse_int_literal("-8"), Some(-8));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("abc"), None);
        assert_eq!(parse_int_literal(""), None);
    }
}
