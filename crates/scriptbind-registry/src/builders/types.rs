//! Builders for the type universe: enums, custom types, objects, entities.

use scriptbind_core::decl::{
    CustomType, EntityDecl, EntityFlags, EnumEntry, EnumGroup, EnumProvenance, ObjectDecl,
    ObjectField, ObjectMethod, Representation, Side,
};
use scriptbind_core::error::{BuildError, ErrorSink};
use scriptbind_core::tags::TagKind;
use scriptbind_core::unified::{Primitive, UnifiedType};
use scriptbind_scanner::{TagSet, tokenize};

use super::{for_each, invalid, parse_int_literal};
use crate::registry::ApiRegistry;
use crate::resolver::resolve_engine;

/// `///@ ExportEnum` above an `enum class` definition.
pub(super) fn export_enums(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportEnum), sink, |record, sink| {
        let loc = &record.loc;
        let flags = tokenize(&record.args, false);
        let block = record
            .context
            .as_block()
            .ok_or_else(|| invalid("missing enum body", loc))?;

        let first = block.first().ok_or_else(|| invalid("empty enum body", loc))?;
        let head = first
            .strip_prefix("enum class ")
            .ok_or_else(|| invalid("expected 'enum class'", loc))?;
        let (name, underlying_spelling) = match head.split_once(':') {
            Some((name, underlying)) => (name.trim(), underlying.trim()),
            None => (head.trim(), "int"),
        };
        let underlying = resolve_primitive(reg, underlying_spelling, loc)?;

        if !block.get(1).is_some_and(|l| l.starts_with('{')) {
            return Err(invalid("expected '{' after enum header", loc));
        }

        let mut entries: Vec<EnumEntry> = Vec::new();
        for line in &block[2..] {
            let entry = match line.find('=') {
                None => {
                    let key = line.trim_end_matches(',').to_string();
                    let value = entries.last().map_or(0, |e| e.value + 1);
                    EnumEntry::new(key, value.to_string(), value)
                }
                Some(sep) => {
                    let key = line[..sep].trim_end().to_string();
                    let literal = line[sep + 1..].trim_start().trim_end_matches(',').to_string();
                    let value = parse_int_literal(&literal)
                        .ok_or_else(|| invalid(format!("bad enum value '{literal}'"), loc))?;
                    EnumEntry::new(key, literal, value)
                }
            };
            entries.push(entry);
        }

        if !reg.claim_type(name, loc, sink) {
            return Ok(());
        }
        reg.note_engine_enum(name);
        reg.engine_enum_groups.push(EnumGroup {
            name: name.to_string(),
            underlying,
            entries,
            flags,
            doc: record.doc.clone(),
            provenance: EnumProvenance::Engine,
        });
        Ok(())
    });
}

/// `///@ ExportType Name underlying representation [flags...]`.
pub(super) fn export_types(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportType), sink, |record, sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 3 {
            return Err(invalid("expected name, underlying type and representation", loc));
        }
        let name = &tok[0];
        let underlying = Primitive::from_name(&tok[1]).ok_or_else(|| {
            invalid(format!("bad underlying type '{}'", tok[1]), loc)
        })?;
        let representation = Representation::from_spelling(&tok[2])
            .ok_or_else(|| invalid(format!("bad representation '{}'", tok[2]), loc))?;

        if !reg.claim_type(name, loc, sink) {
            return Ok(());
        }
        reg.note_custom_type(name);
        reg.custom_types.push(CustomType {
            name: name.clone(),
            underlying,
            representation,
            flags: tok[3..].to_vec(),
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// `///@ Enum Group Key [= value] [flags...]`. Entries accumulate across
/// tags, and the underlying type is re-derived after every addition.
pub(super) fn script_enums(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::Enum), sink, |record, sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 2 {
            return Err(invalid("expected group and key", loc));
        }
        let group_name = &tok[0];
        let key = &tok[1];
        let explicit = if tok.get(2).is_some_and(|t| t == "=") {
            Some(
                tok.get(3)
                    .ok_or_else(|| invalid("missing value after '='", loc))?
                    .clone(),
            )
        } else {
            None
        };
        let flags_start = if explicit.is_some() { 4 } else { 2 };
        let flags = tok.get(flags_start..).unwrap_or_default().to_vec();

        if let Some(group) = reg
            .script_enum_groups
            .iter_mut()
            .find(|g| g.name == *group_name)
        {
            let literal =
                explicit.unwrap_or_else(|| (group.entries.last().map_or(0, |e| e.value + 1)).to_string());
            let value = parse_int_literal(&literal)
                .ok_or_else(|| invalid(format!("bad enum value '{literal}'"), loc))?;
            group.entries.push(EnumEntry::new(key.clone(), literal, value));
            group.underlying = derive_underlying(&group.entries, loc)?;
            return Ok(());
        }

        let literal = explicit.unwrap_or_else(|| "0".to_string());
        let value = parse_int_literal(&literal)
            .ok_or_else(|| invalid(format!("bad enum value '{literal}'"), loc))?;
        let entries = vec![EnumEntry::new(key.clone(), literal, value)];
        if !reg.claim_type(group_name, loc, sink) {
            return Ok(());
        }
        reg.note_script_enum(group_name);
        reg.script_enum_groups.push(EnumGroup {
            name: group_name.clone(),
            underlying: derive_underlying(&entries, loc)?,
            entries,
            flags,
            doc: record.doc.clone(),
            provenance: EnumProvenance::Script,
        });
        Ok(())
    });
}

/// Narrowest primitive able to hold every entry of a script enum.
fn derive_underlying(
    entries: &[EnumEntry],
    loc: &scriptbind_core::SourceLoc,
) -> Result<Primitive, BuildError> {
    if entries.is_empty() {
        return Ok(Primitive::Uint8);
    }
    let min = entries.iter().map(|e| e.value).min().unwrap_or(0);
    let max = entries.iter().map(|e| e.value).max().unwrap_or(0);
    if min < 0 {
        Ok(Primitive::Int)
    } else if max <= 0xFF {
        Ok(Primitive::Uint8)
    } else if max <= 0xFFFF {
        Ok(Primitive::Uint16)
    } else if max <= 0x7FFF_FFFF {
        Ok(Primitive::Int)
    } else if max <= 0xFFFF_FFFF {
        Ok(Primitive::Uint)
    } else {
        Err(invalid(
            format!("can't deduce enum underlying type ({min}, {max})"),
            loc,
        ))
    }
}

/// `///@ ExportObject Target [flags...]` above a `SCRIPTABLE_OBJECT` class.
pub(super) fn export_objects(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportObject), sink, |record, sink| {
        let loc = &record.loc;
        let mut head = tokenize(&record.args, false);
        if head.is_empty() {
            return Err(invalid("expected target in tag info", loc));
        }
        let target = Side::from_name(&head[0])
            .ok_or_else(|| BuildError::InvalidTarget {
                target: head[0].clone(),
                loc: loc.clone(),
            })?;
        let flags = head.split_off(1);

        let block = record
            .context
            .as_block()
            .ok_or_else(|| invalid("missing object body", loc))?;
        let first_tok = tokenize(block.first().map(String::as_str).unwrap_or(""), false);
        if first_tok.len() < 2 || (first_tok[0] != "class" && first_tok[0] != "struct") {
            return Err(invalid("expected class or struct definition", loc));
        }
        let name = first_tok[1].clone();

        if !block.get(1).is_some_and(|l| l.starts_with('{')) {
            return Err(invalid("expected '{' after object header", loc));
        }
        if !block.get(2).is_some_and(|l| l.starts_with("SCRIPTABLE_OBJECT(")) {
            return Err(invalid("expected SCRIPTABLE_OBJECT first in class body", loc));
        }

        let mut public_lines = first_tok[0] == "struct";
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        for line in &block[3..] {
            if line.contains("private:") || line.contains("protected:") {
                public_lines = false;
            } else if line.contains("public:") {
                public_lines = true;
            } else if public_lines {
                let line = match line.find("//") {
                    Some(pos) => line[..pos].trim_end(),
                    None => line.as_str(),
                };
                if line.is_empty() {
                    continue;
                }
                let tok = tokenize(line, false);
                if tok.len() < 2 {
                    return Err(invalid(format!("bad member line '{line}'"), loc));
                }
                if tok[0] == "void" {
                    methods.push(ObjectMethod {
                        name: tok[1].clone(),
                        ret: UnifiedType::Prim(Primitive::Void),
                        doc: Vec::new(),
                    });
                } else {
                    let ty = resolve_engine(reg, &tok[0]).map_err(|reason| {
                        BuildError::InvalidType {
                            type_str: tok[0].clone(),
                            reason,
                            loc: loc.clone(),
                        }
                    })?;
                    fields.push(ObjectField {
                        ty,
                        name: tok[1].clone(),
                        doc: Vec::new(),
                    });
                }
            }
        }

        if !reg.claim_type(&name, loc, sink) {
            return Ok(());
        }
        reg.note_object(&name);
        reg.objects.push(ObjectDecl {
            target,
            name,
            fields,
            methods,
            flags,
            doc: record.doc.clone(),
        });
        Ok(())
    });
}

/// Claim an entity's name plus the names of its synthesized enums and
/// relatives.
fn register_entity(
    reg: &mut ApiRegistry,
    decl: EntityDecl,
    loc: &scriptbind_core::SourceLoc,
    sink: &mut ErrorSink,
) {
    if !reg.claim_type(&decl.name, loc, sink) {
        return;
    }

    for suffix in ["Component", "Property"] {
        let enum_name = format!("{}{suffix}", decl.name);
        if reg.claim_type(&enum_name, loc, sink) {
            reg.note_script_enum(&enum_name);
        }
    }

    for (flag, prefix) in [
        (EntityFlags::HAS_ABSTRACT, "Abstract"),
        (EntityFlags::HAS_PROTO, "Proto"),
        (EntityFlags::HAS_STATICS, "Static"),
    ] {
        if decl.flags.contains(flag) {
            let relative = format!("{prefix}{}", decl.name);
            if reg.claim_type(&relative, loc, sink) {
                reg.entity_relatives.insert(relative);
            }
        }
    }

    reg.entities.push(decl);
}

/// `///@ ExportEntity Name ServerClass ClientClass [flags...]`.
pub(super) fn export_entities(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::ExportEntity), sink, |record, sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 3 {
            return Err(invalid("expected name, server class and client class", loc));
        }
        let decl = EntityDecl {
            name: tok[0].clone(),
            server_class: Some(tok[1].clone()),
            client_class: Some(tok[2].clone()),
            flags: EntityFlags::from_tokens(&tok[3..]),
            exported: true,
            doc: record.doc.clone(),
        };
        register_entity(reg, decl, loc, sink);
        Ok(())
    });
}

/// `///@ Entity Target Name`. User-declared entities are single-sided and
/// carry no capability flags yet.
pub(super) fn script_entities(reg: &mut ApiRegistry, tags: &TagSet, sink: &mut ErrorSink) {
    for_each(tags.of(TagKind::Entity), sink, |record, sink| {
        let loc = &record.loc;
        let tok = tokenize(&record.args, false);
        if tok.len() < 2 {
            return Err(invalid("expected target and name", loc));
        }
        let target = Side::from_name(&tok[0]).filter(|t| matches!(t, Side::Server | Side::Client));
        let Some(target) = target else {
            return Err(BuildError::InvalidTarget {
                target: tok[0].clone(),
                loc: loc.clone(),
            });
        };
        if !EntityFlags::from_tokens(&tok[2..]).is_empty() {
            return Err(invalid("capability flags not supported on declared entities", loc));
        }

        let (server_class, client_class) = match target {
            Side::Server => (Some("ServerEntity".to_string()), None),
            _ => (None, Some("ClientEntity".to_string())),
        };
        let decl = EntityDecl {
            name: tok[1].clone(),
            server_class,
            client_class,
            flags: EntityFlags::empty(),
            exported: false,
            doc: record.doc.clone(),
        };
        register_entity(reg, decl, loc, sink);
        Ok(())
    });
}

fn resolve_primitive(
    reg: &mut ApiRegistry,
    spelling: &str,
    loc: &scriptbind_core::SourceLoc,
) -> Result<Primitive, BuildError> {
    match resolve_engine(reg, spelling) {
        Ok(UnifiedType::Prim(p)) => Ok(p),
        Ok(other) => Err(invalid(
            format!("expected integral underlying type, got '{other}'"),
            loc,
        )),
        Err(reason) => Err(BuildError::InvalidType {
            type_str: spelling.to_string(),
            reason,
            loc: loc.clone(),
        }),
    }
}
