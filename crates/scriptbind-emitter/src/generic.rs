//! The backend-independent unit: engine hook stubs, exported property
//! registration indices and per-side settings name sets.

use scriptbind_core::decl::{KNOWN_ENGINE_HOOKS, Side};
use scriptbind_core::error::EmitError;
use scriptbind_registry::ApiRegistry;

use crate::template::Template;

const HOOK_SIGNATURES: [(&str, &str); 2] = [
    (
        "ConfigSectionParseHook",
        "void ConfigSectionParseHook(const string&, string&, map<string, string>&) { /* Stub */ }",
    ),
    (
        "ConfigEntryParseHook",
        "void ConfigEntryParseHook(const string&, const string&, string&, string&) { /* Stub */ }",
    ),
];

fn body_lines(reg: &ApiRegistry) -> Vec<String> {
    let mut lines = Vec::new();

    // Hooks the game did not claim fall back to engine stubs.
    lines.push("// Engine hooks".to_string());
    for (name, stub) in HOOK_SIGNATURES {
        debug_assert!(KNOWN_ENGINE_HOOKS.contains(&name));
        if !reg.engine_hooks.iter().any(|h| h == name) {
            lines.push(stub.to_string());
        }
    }
    lines.push(String::new());

    lines.push("// Engine property indices".to_string());
    lines.push("#include \"EntityProperties.h\"".to_string());
    lines.push("EntityProperties::EntityProperties(Properties& props) : _propsRef(props) { }".to_string());
    for entity in &reg.entities {
        for (index, prop) in reg
            .export_properties
            .iter()
            .filter(|p| p.entity == entity.name)
            .enumerate()
        {
            lines.push(format!(
                "uint16 {}Properties::{}_RegIndex = {index};",
                entity.name, prop.name
            ));
        }
    }
    lines.push(String::new());

    for side in [Side::Server, Side::Client] {
        settings_set(reg, side, &mut lines);
    }

    lines
}

/// `Get<Side>Settings()`: the set of setting keys visible on one side,
/// grouped entries first, then standalone settings.
fn settings_set(reg: &ApiRegistry, side: Side, lines: &mut Vec<String>) {
    lines.push(format!(
        "[[maybe_unused]] auto Get{}Settings() -> unordered_set<string>",
        side.name()
    ));
    lines.push("{".to_string());
    lines.push("    unordered_set<string> settings = {".to_string());
    for group in &reg.settings_groups {
        if group.target == side || group.target == Side::Common {
            for entry in &group.entries {
                lines.push(format!("        \"{}\",", entry.key));
            }
        }
    }
    for setting in &reg.settings {
        if setting.target == side || setting.target == Side::Common {
            lines.push(format!("        \"{}\",", setting.name));
        }
    }
    lines.push("    };".to_string());
    lines.push("    return settings;".to_string());
    lines.push("}".to_string());
    lines.push(String::new());
}

pub fn populate(reg: &ApiRegistry, tpl: &mut Template) -> Result<(), EmitError> {
    tpl.insert("Body", body_lines(reg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use scriptbind_core::error::ErrorSink;
    use scriptbind_scanner::{TagSet, scan_source};

    fn build(engine_hooks: &str) -> ApiRegistry {
        let source = format!(
            "\
///@ ExportEntity Item Item ItemView
class ItemProperties : public EntityProperties
{{
public:
    ///@ ExportProperty
    ENTITY_PROPERTY(Public, uint, Cost);
    ///@ ExportProperty
    ENTITY_PROPERTY(Public, uint, Weight);
}};
{engine_hooks}
///@ Setting Server uint SpawnRate = 3
///@ Setting Common bool Verbose
"
        );
        let mut set = TagSet::default();
        let mut sink = ErrorSink::new();
        scan_source(Arc::new(PathBuf::from("Core.h")), &source, &mut set, &mut sink);
        // Standalone settings come from script files in practice; the tag
        // itself has no file-kind requirement.
        let reg = scriptbind_registry::build_registry(&set, &mut sink);
        assert!(sink.is_empty(), "{sink}");
        reg
    }

    #[test]
    fn unclaimed_hooks_get_stubs() {
        let reg = build("");
        let lines = body_lines(&reg);
        assert!(lines.iter().any(|l| l.starts_with("void ConfigSectionParseHook")));
        assert!(lines.iter().any(|l| l.starts_with("void ConfigEntryParseHook")));
    }

    #[test]
    fn claimed_hooks_are_left_to_the_game() {
        let hook = "///@ EngineHook\nvoid ConfigSectionParseHook(const string& name, string& content, map<string, string>& entries);\n";
        let reg = build(hook);
        let lines = body_lines(&reg);
        assert!(!lines.iter().any(|l| l.starts_with("void ConfigSectionParseHook")));
        assert!(lines.iter().any(|l| l.starts_with("void ConfigEntryParseHook")));
    }

    #[test]
    fn property_indices_follow_declaration_order() {
        let reg = build("");
        let lines = body_lines(&reg);
        assert!(lines.contains(&"uint16 ItemProperties::Cost_RegIndex = 0;".to_string()));
        assert!(lines.contains(&"uint16 ItemProperties::Weight_RegIndex = 1;".to_string()));
    }

    #[test]
    fn settings_sets_are_side_filtered() {
        let reg = build("");
        let lines = body_lines(&reg);
        let text = lines.join("\n");
        let server = text
            .split("GetServerSettings")
            .nth(1)
            .and_then(|t| t.split("GetClientSettings").next())
            .unwrap();
        assert!(server.contains("\"SpawnRate\""));
        assert!(server.contains("\"Verbose\""));
        let client = text.split("GetClientSettings").nth(1).unwrap();
        assert!(!client.contains("\"SpawnRate\""));
        assert!(client.contains("\"Verbose\""));
    }
}
