//! Data-registration units: enum groups, property registrators and the
//! baker's restore info, one output per target (times compiler mode).
//!
//! Script-declared enums, components and properties are omitted from the
//! plain Client unit; the client learns them from baked resources at
//! runtime. The compiler variants keep them so scripts still typecheck.

use scriptbind_core::decl::{EntityDecl, PropertyDecl, RegTarget};
use scriptbind_core::error::EmitError;
use scriptbind_core::unified::{Primitive, UnifiedType};
use scriptbind_registry::ApiRegistry;

use crate::lowering::{base_name, base_of};
use crate::template::Template;

fn entity_allowed(entity: &EntityDecl, target: RegTarget) -> bool {
    match target {
        RegTarget::Server => entity.server_class.is_some(),
        RegTarget::Client | RegTarget::Mapper => entity.client_class.is_some(),
        RegTarget::Baker => true,
    }
}

/// Storage-side underlying primitive of a base type, where one exists.
/// Wide integers have no registrable underlying and size out as zero.
fn underlying_of(reg: &ApiRegistry, base: &UnifiedType) -> Option<Primitive> {
    match base {
        UnifiedType::Named(name) => reg.enum_underlying(name).or_else(|| {
            reg.custom_types
                .iter()
                .find(|c| c.name == *name)
                .map(|c| c.underlying)
        }),
        UnifiedType::Prim(Primitive::HString) => Some(Primitive::Uint),
        UnifiedType::Prim(p) => match p {
            Primitive::Int8
            | Primitive::Uint8
            | Primitive::Int16
            | Primitive::Uint16
            | Primitive::Int
            | Primitive::Uint
            | Primitive::Bool
            | Primitive::Float
            | Primitive::Double => Some(*p),
            _ => None,
        },
        _ => None,
    }
}

fn size_of(ut: Option<Primitive>) -> String {
    ut.and_then(Primitive::byte_width)
        .map_or_else(|| "0".to_string(), |w| w.to_string())
}

fn bit(cond: bool) -> String {
    if cond { "1" } else { "0" }.to_string()
}

/// The fixed-width property descriptor consumed by the engine registrator:
/// name, access, storage kind, base type and its classification flags, plus
/// dict key descriptors where applicable, then the declaration's own flags.
pub(crate) fn register_flags(reg: &ApiRegistry, prop: &PropertyDecl) -> Vec<String> {
    register_flags_named(reg, prop, &prop.name)
}

pub(crate) fn register_flags_named(
    reg: &ApiRegistry,
    prop: &PropertyDecl,
    name: &str,
) -> Vec<String> {
    let ty = &prop.ty;
    let base = base_of(ty);
    let bt = base_name(ty);
    let is_str_like = matches!(
        base,
        UnifiedType::Prim(Primitive::String) | UnifiedType::Prim(Primitive::Any)
    );
    let storage = match ty {
        UnifiedType::Map(_, _) => "Dict",
        UnifiedType::Array(_) => "Array",
        _ if is_str_like => "String",
        _ => "PlainData",
    };
    let is_enum = matches!(base, UnifiedType::Named(n) if reg.is_enum(n));
    let ut = underlying_of(reg, base);

    let mut flags = vec![
        name.to_string(),
        prop.access.name().to_string(),
        storage.to_string(),
        bt.clone(),
        size_of(ut),
        bit(matches!(base, UnifiedType::Prim(Primitive::HString))),
        bit(is_enum),
        bit(ut.is_some_and(Primitive::is_int)),
        bit(ut.is_some_and(Primitive::is_signed_int)),
        bit(ut.is_some_and(Primitive::is_float)),
        bit(ut == Some(Primitive::Bool)),
    ];

    match ty {
        UnifiedType::Array(_) => {
            flags.push(bit(is_str_like));
        }
        UnifiedType::Map(key, value) => {
            let dict_of_arr = matches!(value.as_ref(), UnifiedType::Array(_));
            flags.push(bit(dict_of_arr));
            flags.push(bit(!dict_of_arr && is_str_like));
            flags.push(bit(dict_of_arr && is_str_like));
            let key_base = base_of(key);
            let key_ut = underlying_of(reg, key_base);
            flags.push(base_name(key));
            flags.push(size_of(key_ut));
            flags.push(bit(matches!(key_base, UnifiedType::Prim(Primitive::HString))));
            flags.push(bit(matches!(key_base, UnifiedType::Named(n) if reg.is_enum(n))));
        }
        _ => {}
    }

    flags.extend(prop.flags.iter().cloned());
    flags
}

fn enum_group_lines(out: &mut Vec<String>, name: &str, underlying: Primitive, entries: &[(String, String)]) {
    out.push(format!(
        "engine->AddEnumGroup(\"{name}\", typeid({}),",
        underlying.name()
    ));
    out.push("{".to_string());
    for (key, literal) in entries {
        out.push(format!("    {{\"{key}\", {literal}}},"));
    }
    out.push("});".to_string());
    out.push(String::new());
}

fn register_lines(reg: &ApiRegistry, target: RegTarget, compiler: bool) -> Vec<String> {
    let script_visible = target != RegTarget::Client || compiler;
    let mut lines = Vec::new();

    lines.push("// Enums".to_string());
    for group in &reg.engine_enum_groups {
        let entries: Vec<(String, String)> = group
            .entries
            .iter()
            .map(|e| (e.key.clone(), e.literal.clone()))
            .collect();
        enum_group_lines(&mut lines, &group.name, group.underlying, &entries);
    }
    if script_visible {
        for group in &reg.script_enum_groups {
            let entries: Vec<(String, String)> = group
                .entries
                .iter()
                .map(|e| (e.key.clone(), e.literal.clone()))
                .collect();
            enum_group_lines(&mut lines, &group.name, group.underlying, &entries);
        }
    }

    lines.push("// Properties".to_string());
    lines.push("unordered_map<string, PropertyRegistrator*> registrators;".to_string());
    lines.push("PropertyRegistrator* registrator;".to_string());
    lines.push(String::new());
    for entity in reg.entities.iter().filter(|e| entity_allowed(e, target)) {
        lines.push(format!(
            "registrators[\"{0}\"] = engine->GetOrCreatePropertyRegistrator(\"{0}\");",
            entity.name
        ));
    }
    lines.push(String::new());

    for entity in reg.entities.iter().filter(|e| entity_allowed(e, target)) {
        lines.push(format!("registrator = registrators[\"{}\"];", entity.name));
        if script_visible {
            for component in reg.components.iter().filter(|c| c.entity == entity.name) {
                lines.push(format!(
                    "registrator->RegisterComponent(\"{}\");",
                    component.name
                ));
            }
        }
        let mut register = |prop: &PropertyDecl| {
            let quoted: Vec<String> = register_flags(reg, prop)
                .into_iter()
                .map(|f| format!("\"{f}\""))
                .collect();
            lines.push(format!(
                "registrator->RegisterProperty({{{}}});",
                quoted.join(", ")
            ));
        };
        for prop in reg.export_properties.iter().filter(|p| p.entity == entity.name) {
            register(prop);
        }
        if script_visible {
            for prop in reg.script_properties.iter().filter(|p| p.entity == entity.name) {
                register(prop);
            }
        }
        lines.push(String::new());
    }

    lines
}

/// Restore info baked into resources so the client can rebuild the
/// script-declared surface without its sources. Server-private property
/// names are blanked out with dummy placeholders.
fn restore_lines(reg: &ApiRegistry) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("restore_info[\"Enums\"] =".to_string());
    lines.push("{".to_string());
    for group in &reg.script_enum_groups {
        if group.entries.is_empty() {
            lines.push(format!("    \"{} {}\",", group.name, group.underlying.name()));
            continue;
        }
        lines.push(format!("    \"{} {}\"", group.name, group.underlying.name()));
        let (last, rest) = group.entries.split_last().expect("non-empty");
        for entry in rest {
            lines.push(format!("    \" {}={}\"", entry.key, entry.literal));
        }
        lines.push(format!("    \" {}={}\",", last.key, last.literal));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    let client_allowed = |name: &str| {
        reg.entity(name)
            .is_some_and(|e| entity_allowed(e, RegTarget::Client))
    };

    lines.push("restore_info[\"PropertyComponents\"] =".to_string());
    lines.push("{".to_string());
    for component in reg.components.iter().filter(|c| client_allowed(&c.entity)) {
        lines.push(format!("    \"{} {}\",", component.entity, component.name));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    let mut dummy_index = 0usize;
    lines.push("restore_info[\"Properties\"] =".to_string());
    lines.push("{".to_string());
    for prop in reg.script_properties.iter().filter(|p| client_allowed(&p.entity)) {
        let flags = if prop.access.is_server_private() {
            let name = format!("__dummy{dummy_index}");
            dummy_index += 1;
            register_flags_named(reg, prop, &name)
        } else {
            register_flags(reg, prop)
        };
        lines.push(format!("    \"{} {}\",", prop.entity, flags.join(" ")));
    }
    lines.push("};".to_string());
    lines.push(String::new());

    lines
}

fn define_lines(target: RegTarget, compiler: bool) -> Vec<String> {
    let on = |t: RegTarget| if target == t { "1" } else { "0" };
    vec![
        format!("#define SERVER_REGISTRATION {}", on(RegTarget::Server)),
        format!("#define CLIENT_REGISTRATION {}", on(RegTarget::Client)),
        format!("#define MAPPER_REGISTRATION {}", on(RegTarget::Mapper)),
        format!("#define BAKER_REGISTRATION {}", on(RegTarget::Baker)),
        format!("#define COMPILER_MODE {}", if compiler { "1" } else { "0" }),
    ]
}

/// Fill a DataRegistration template for one target.
pub fn populate(
    reg: &ApiRegistry,
    target: RegTarget,
    compiler: bool,
    tpl: &mut Template,
) -> Result<(), EmitError> {
    if compiler {
        tpl.insert("CompilerRegister", register_lines(reg, target, compiler))?;
    } else {
        if target == RegTarget::Baker {
            tpl.insert("WriteRestoreInfo", restore_lines(reg))?;
        }
        let marker = format!("{}Register", target.name());
        tpl.insert(&marker, register_lines(reg, target, compiler))?;
    }
    tpl.insert("Defines", define_lines(target, compiler))?;
    Ok(())
}
