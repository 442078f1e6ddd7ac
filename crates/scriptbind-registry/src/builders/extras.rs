//! Builders for settings, engine hooks and template insertion markers.

use scriptbind_core::decl::{
    CodeGenMarker, KNOWN_ENGINE_HOOKS, SettingDecl, SettingEntry, SettingMutability,
    SettingsGroup, Side, TemplateKind,
};
use scriptbind_core::error::{BuildError, ErrorSink};
use scriptbind_core::tags::{TagContext, TagKind};
use scriptbind_core::unified::{Primitive, UnifiedType};
use scriptbind_scanner::{TagSet, tokenize};

use super::{for_each, invalid};
use crate::registry::ApiRegistry;
use crate::resolver::{resolve_engine, resolve_unified};

/// `///@ ExportSettings Target [flags...]` above a `SETTING_GROUP` block.
pub(super) fn export_settings(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportSettings), sink, |record, _sink| {
        let loc = &record.loc;
        let mut head = tokenize(&record.args, false);
        if head.is_empty() {
            return Err(invalid("expected target in tag info", loc));
        }
        let target = Side::from_name(&head[0]).ok_or_else(|| BuildError::InvalidTarget {
            target: head[0].clone(),
            loc: loc.clone(),
        })?;
        let flags = head.split_off(1);

        let block = record
            .context
            .as_block()
            .ok_or_else(|| invalid("missing settings body", loc))?;
        let first = block
            .first()
            .filter(|l| l.starts_with("SETTING_GROUP"))
            .ok_or_else(|| invalid("expected SETTING_GROUP macro", loc))?;
        let open = first.find('(').ok_or_else(|| invalid("expected '('", loc))?;
        let comma = first.find(',').ok_or_else(|| invalid("expected ','", loc))?;
        let name = first[open + 1..comma]
            .strip_suffix("Settings")
            .ok_or_else(|| invalid("group name must end with 'Settings'", loc))?
            .to_string();

        let mut entries = Vec::new();
        for line in &block[1..] {
            let doc = line
                .find("//")
                .map(|pos| vec![line[pos + 2..].trim().to_string()])
                .unwrap_or_default();
            let open = line.find('(').ok_or_else(|| invalid("expected '('", loc))?;
            let close = line.find(')').ok_or_else(|| invalid("expected ')'", loc))?;
            let mutability = match &line[..open] {
                "FIXED_SETTING" => SettingMutability::Fixed,
                "VARIABLE_SETTING" => SettingMutability::Variable,
                other => return Err(invalid(format!("bad setting macro '{other}'"), loc)),
            };
            let parts: Vec<String> = line[open + 1..close]
                .split(',')
                .map(|p| p.trim().trim_matches('"').to_string())
                .collect();
            if parts.len() < 2 {
                return Err(invalid("expected setting type and key", loc));
            }
            let ty = resolve_engine(reg, &parts[0]).map_err(|reason| BuildError::InvalidType {
                type_str: parts[0].clone(),
                reason,
                loc: loc.clone(),
            })?;
            entries.push(SettingEntry {
                mutability,
                ty,
                key: parts[1].clone(),
                init_values: parts[2..].to_vec(),
                doc,
            });
        }

        reg.settings_groups.push(SettingsGroup {
            name,
            target,
            entries,
            flags,
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// Types a standalone setting may use: scalars, strings, the value box and
/// enums. No containers.
fn settable(reg: &ApiRegistry, ty: &UnifiedType) -> bool {
    match ty {
        UnifiedType::Prim(p) => !matches!(p, Primitive::Void | Primitive::HString),
        UnifiedType::Named(name) => reg.is_enum(name),
        _ => false,
    }
}

/// `///@ Setting Target type Name [= value] [flags...]`.
pub(super) fn script_settings(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::Setting), sink, |record, _sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 3 {
            return Err(invalid("expected target, type and name", loc));
        }
        let target = Side::from_name(&tok[0])
            .filter(|t| matches!(t, Side::Server | Side::Client | Side::Common))
            .ok_or_else(|| BuildError::InvalidTarget {
                target: tok[0].clone(),
                loc: loc.clone(),
            })?;

        if tok.get(2).is_some_and(|t| t == "[") {
            return Err(BuildError::BadSettingType {
                type_str: format!("{}[]", tok[1]),
                loc: loc.clone(),
            });
        }
        let ty = resolve_unified(reg, &tok[1]).map_err(|reason| BuildError::InvalidType {
            type_str: tok[1].clone(),
            reason,
            loc: loc.clone(),
        })?;
        if !settable(reg, &ty) {
            return Err(BuildError::BadSettingType {
                type_str: tok[1].clone(),
                loc: loc.clone(),
            });
        }

        let name = tok[2].clone();
        let init_value = if tok.get(3).is_some_and(|t| t == "=") {
            Some(
                tok.get(4)
                    .ok_or_else(|| invalid("missing value after '='", loc))?
                    .clone(),
            )
        } else {
            None
        };
        let flags_start = if init_value.is_some() { 5 } else { 3 };

        // Key names are global across groups and standalone settings.
        if reg.setting_key_taken(&name) {
            return Err(BuildError::DuplicateSetting {
                name,
                loc: loc.clone(),
            });
        }

        reg.settings.push(SettingDecl {
            target,
            ty,
            name,
            init_value,
            flags: tok.get(flags_start..).unwrap_or_default().to_vec(),
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// `///@ EngineHook` above a hook function the game claims.
pub(super) fn engine_hooks(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::EngineHook), sink, |record, _sink| {
        let loc = &record.loc;
        let line = record
            .context
            .as_line()
            .ok_or_else(|| invalid("missing hook declaration", loc))?;
        let tok = tokenize(line, false);
        let name = tok
            .get(1)
            .ok_or_else(|| invalid("missing hook name", loc))?;
        if !KNOWN_ENGINE_HOOKS.contains(&name.as_str()) {
            return Err(BuildError::UnknownHook {
                name: name.clone(),
                loc: loc.clone(),
            });
        }
        reg.engine_hooks.push(name.clone());
        Ok(())
    });
}

/// `///@ CodeGen MarkerName [flags...]` inside a backend template.
pub(super) fn markers(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::CodeGen), sink, |record, _sink| {
        let loc = &record.loc;
        let file_name = loc
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let template = TemplateKind::from_file_name(file_name).ok_or_else(|| {
            BuildError::UnknownTemplate {
                file: file_name.to_string(),
                loc: loc.clone(),
            }
        })?;

        let mut flags = tokenize(&record.args, false);
        if flags.is_empty() {
            return Err(invalid("missing marker name", loc));
        }
        let name = flags.remove(0);
        let TagContext::Indent(padding) = record.context else {
            return Err(invalid("missing marker indentation", loc));
        };

        reg.markers.push(CodeGenMarker {
            template,
            loc: loc.clone(),
            name,
            padding,
            flags,
        });
        Ok(())
    });
}
