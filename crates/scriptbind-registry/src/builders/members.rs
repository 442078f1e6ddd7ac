//! Builders for entity members: properties, methods, events, remote calls.

use scriptbind_core::decl::{
    AccessMode, EventDecl, MethodDecl, PropertyComponent, PropertyDecl, RemoteCallDecl, ScriptLang,
    Side,
};
use scriptbind_core::error::{BuildError, ErrorSink};
use scriptbind_core::loc::SourceLoc;
use scriptbind_core::tags::TagKind;
use scriptbind_core::unified::UnifiedType;
use scriptbind_scanner::{TagSet, tokenize};

use super::{for_each, invalid};
use crate::registry::ApiRegistry;
use crate::resolver::{resolve_engine, resolve_unified, split_engine_args};

fn bad_type(type_str: &str, reason: String, loc: &SourceLoc) -> BuildError {
    BuildError::InvalidType {
        type_str: type_str.to_string(),
        reason,
        loc: loc.clone(),
    }
}

fn known_entity(reg: &ApiRegistry, name: &str, loc: &SourceLoc) -> Result<(), BuildError> {
    if reg.is_entity(name) {
        Ok(())
    } else {
        Err(BuildError::UnknownEntity {
            entity: name.to_string(),
            loc: loc.clone(),
        })
    }
}

fn parse_access(name: &str, loc: &SourceLoc) -> Result<AccessMode, BuildError> {
    AccessMode::from_name(name).ok_or_else(|| BuildError::InvalidAccess {
        access: name.to_string(),
        loc: loc.clone(),
    })
}

/// `///@ ExportProperty` above an `ENTITY_PROPERTY(access, type, name)` line,
/// prefixed by the scanner with the owning entity name.
pub(super) fn export_properties(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportProperty), sink, |record, _sink| {
        let loc = &record.loc;
        let line = record
            .context
            .as_line()
            .ok_or_else(|| invalid("missing property declaration", loc))?;

        let entity = line.split(' ').next().unwrap_or("");
        known_entity(reg, entity, loc)?;

        let open = line.find('(').ok_or_else(|| invalid("expected '('", loc))?;
        let close = line.find(')').ok_or_else(|| invalid("expected ')'", loc))?;
        let parts: Vec<&str> = line[open + 1..close].split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return Err(invalid("expected access, type and name", loc));
        }

        let access = parse_access(parts[0], loc)?;
        let ty =
            resolve_engine(reg, parts[1]).map_err(|reason| bad_type(parts[1], reason, loc))?;

        reg.export_properties.push(PropertyDecl {
            entity: entity.to_string(),
            access,
            ty,
            name: parts[2].to_string(),
            exported: true,
            flags: tokenize(&record.args, false),
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// `///@ ExportMethod` above an extern function named
/// `Target_Entity_Name(self, args...)`.
pub(super) fn export_methods(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportMethod), sink, |record, _sink| {
        let loc = &record.loc;
        let line = record
            .context
            .as_line()
            .ok_or_else(|| invalid("missing method declaration", loc))?;

        let open = line.find('(').ok_or_else(|| invalid("expected '('", loc))?;
        let close = line.rfind(')').ok_or_else(|| invalid("expected ')'", loc))?;
        let ret_space = line[..open]
            .rfind(' ')
            .ok_or_else(|| invalid("expected return type", loc))?;

        let func_name = line[ret_space..open].trim();
        let name_parts: Vec<&str> = func_name.split('_').collect();
        if name_parts.len() != 3 {
            return Err(invalid(format!("bad method name '{func_name}'"), loc));
        }
        let target = Side::from_name(name_parts[0]).ok_or_else(|| BuildError::InvalidTarget {
            target: name_parts[0].to_string(),
            loc: loc.clone(),
        })?;
        let entity = name_parts[1];
        known_entity(reg, entity, loc)?;
        let name = name_parts[2];

        let ret_spelling = line[..ret_space]
            .rsplit(' ')
            .next()
            .unwrap_or("")
            .to_string();
        let ret = resolve_engine(reg, &ret_spelling)
            .map_err(|reason| bad_type(&ret_spelling, reason, loc))?;

        // First parameter is the entity itself.
        let mut params = Vec::new();
        for arg in split_engine_args(&line[open + 1..close])
            .map_err(|reason| invalid(reason, loc))?
            .into_iter()
            .skip(1)
        {
            let sep = arg
                .rfind(' ')
                .ok_or_else(|| invalid(format!("unnamed parameter '{arg}'"), loc))?;
            let ty_spelling = arg[..sep].trim_end();
            let ty = resolve_engine(reg, ty_spelling)
                .map_err(|reason| bad_type(ty_spelling, reason, loc))?;
            params.push((ty, arg[sep + 1..].to_string()));
        }

        reg.methods.push(MethodDecl {
            target,
            entity: entity.to_string(),
            name: name.to_string(),
            ret,
            params,
            flags: tokenize(&record.args, false),
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// `///@ ExportEvent` above an `ENTITY_EVENT(OnName, type /*name*/, ...)`
/// line, prefixed by the scanner with the declaring class.
pub(super) fn export_events(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportEvent), sink, |record, _sink| {
        let loc = &record.loc;
        let line = record
            .context
            .as_line()
            .ok_or_else(|| invalid("missing event declaration", loc))?;

        let class_name = line.split(' ').next().unwrap_or("");
        let (target, entity) = match reg.entity_by_class(class_name) {
            Some((side, entity)) => (side, entity.name.clone()),
            None if class_name == "FOMapper" => (Side::Mapper, "Game".to_string()),
            None => {
                return Err(invalid(format!("unknown event host class '{class_name}'"), loc));
            }
        };

        let open = line.find('(').ok_or_else(|| invalid("expected '('", loc))?;
        let close = line.rfind(')').ok_or_else(|| invalid("expected ')'", loc))?;
        let first_comma = line[open..close].find(',').map(|p| p + open);
        let name = line[open + 1..first_comma.unwrap_or(close)].trim().to_string();

        // Event parameter names live in block comments: `uint /*itemId*/`.
        let mut args = Vec::new();
        if let Some(comma) = first_comma {
            let args_str = line[comma + 1..close].trim();
            if !args_str.is_empty() {
                for arg in split_engine_args(args_str).map_err(|reason| invalid(reason, loc))? {
                    let sep = arg
                        .find('/')
                        .filter(|&p| p > 0 && arg.len() >= p + 4)
                        .ok_or_else(|| invalid(format!("unnamed event parameter '{arg}'"), loc))?;
                    let ty_spelling = arg[..sep].trim_end();
                    let ty = resolve_engine(reg, ty_spelling)
                        .map_err(|reason| bad_type(ty_spelling, reason, loc))?;
                    args.push((ty, arg[sep + 2..arg.len() - 2].to_string()));
                }
            }
        }

        reg.export_events.push(EventDecl {
            target,
            entity,
            name,
            args,
            exported: true,
            flags: tokenize(&record.args, false),
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// `///@ PropertyComponent Entity Name [flags...]`.
pub(super) fn property_components(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::PropertyComponent), sink, |record, _sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 2 {
            return Err(invalid("expected entity and component name", loc));
        }
        known_entity(reg, &tok[0], loc)?;
        if !reg.claim_component(&tok[0], &tok[1]) {
            return Err(invalid(
                format!("component '{}' already declared on '{}'", tok[1], tok[0]),
                loc,
            ));
        }
        reg.components.push(PropertyComponent {
            entity: tok[0].clone(),
            name: tok[1].clone(),
            flags: tok[2..].to_vec(),
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// `///@ Property Entity Access [const] type [Component.]Name [flags...]`.
pub(super) fn script_properties(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::Property), sink, |record, _sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, true);
        if tok.len() < 4 {
            return Err(invalid("expected entity, access, type and name", loc));
        }
        let entity = &tok[0];
        known_entity(reg, entity, loc)?;
        let access = parse_access(&tok[1], loc)?;

        // `const` marks the property read-only for scripts.
        let read_only = tok[2] == "const";
        let base = if read_only { 3 } else { 2 };
        let ty_spelling = tok
            .get(base)
            .ok_or_else(|| invalid("missing property type", loc))?;
        let ty = resolve_unified(reg, ty_spelling)
            .map_err(|reason| bad_type(ty_spelling, reason, loc))?;

        let (component, name, rest) = if tok.get(base + 2).is_some_and(|t| t == ".") {
            let comp = tok[base + 1].clone();
            let leaf = tok
                .get(base + 3)
                .ok_or_else(|| invalid("missing property name after component", loc))?;
            (Some(comp.clone()), format!("{comp}.{leaf}"), base + 4)
        } else {
            (None, tok[base + 1].clone(), base + 2)
        };

        if let Some(comp) = &component
            && !reg.has_component(entity, comp)
        {
            return Err(BuildError::UnknownComponent {
                entity: entity.clone(),
                component: comp.clone(),
                loc: loc.clone(),
            });
        }

        let mut flags = Vec::new();
        if read_only {
            flags.push("ReadOnly".to_string());
        }
        flags.extend(tok.get(rest..).unwrap_or_default().iter().cloned());

        reg.script_properties.push(PropertyDecl {
            entity: entity.clone(),
            access,
            ty,
            name,
            exported: false,
            flags,
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// Parse a `(type name, type name)` argument list written in script type
/// spellings.
fn parse_script_args(
    reg: &mut ApiRegistry,
    args_str: &str,
    loc: &SourceLoc,
) -> Result<Vec<(UnifiedType, String)>, BuildError> {
    let mut args = Vec::new();
    if args_str.trim().is_empty() {
        return Ok(args);
    }
    for arg in args_str.split(',') {
        let arg = arg.trim();
        let sep = arg
            .rfind(' ')
            .ok_or_else(|| invalid(format!("unnamed parameter '{arg}'"), loc))?;
        let ty_spelling = arg[..sep].trim();
        let ty =
            resolve_unified(reg, ty_spelling).map_err(|reason| bad_type(ty_spelling, reason, loc))?;
        args.push((ty, arg[sep + 1..].trim().to_string()));
    }
    Ok(args)
}

/// `///@ Event Target Entity OnName (args) [flags...]`, unique per
/// (target, entity, name) across both event universes.
pub(super) fn script_events(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::Event), sink, |record, _sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 3 {
            return Err(invalid("expected target, entity and event name", loc));
        }
        let target = Side::from_name(&tok[0]).ok_or_else(|| BuildError::InvalidTarget {
            target: tok[0].clone(),
            loc: loc.clone(),
        })?;
        known_entity(reg, &tok[1], loc)?;
        let name = tok[2].clone();

        let open = record.args.find('(').ok_or_else(|| invalid("expected '('", loc))?;
        let close = record.args.rfind(')').ok_or_else(|| invalid("expected ')'", loc))?;
        let args = parse_script_args(reg, &record.args[open + 1..close], loc)?;
        let flags = tokenize(&record.args[close + 1..], false);

        if reg
            .all_events()
            .any(|e| e.target == target && e.entity == tok[1] && e.name == name)
        {
            return Err(BuildError::DuplicateEvent {
                entity: tok[1].clone(),
                name,
                loc: loc.clone(),
            });
        }

        reg.script_events.push(EventDecl {
            target,
            entity: tok[1].clone(),
            name,
            args,
            exported: false,
            flags,
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// `///@ RemoteCall Target Name (args) [flags...]`. The namespace comes
/// from the declaring script's file stem, the language from its extension.
pub(super) fn remote_calls(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::RemoteCall), sink, |record, _sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 2 {
            return Err(invalid("expected target and name", loc));
        }
        let target = Side::from_name(&tok[0])
            .filter(|t| matches!(t, Side::Server | Side::Client))
            .ok_or_else(|| BuildError::InvalidTarget {
                target: tok[0].clone(),
                loc: loc.clone(),
            })?;
        let name = tok[1].clone();

        let lang = loc
            .file
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ScriptLang::from_extension)
            .ok_or_else(|| invalid("remote calls must be declared in script files", loc))?;
        let namespace = loc
            .file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| invalid("bad script file name", loc))?
            .to_string();

        let open = record.args.find('(').ok_or_else(|| invalid("expected '('", loc))?;
        let close = record.args.rfind(')').ok_or_else(|| invalid("expected ')'", loc))?;
        let args = parse_script_args(reg, &record.args[open + 1..close], loc)?;
        let flags = tokenize(&record.args[close + 1..], false);

        reg.remote_calls.push(RemoteCallDecl {
            target,
            lang,
            namespace,
            name,
            args,
            flags,
            doc: record.doc.clone(),
        });
        Ok(())
    });
}
