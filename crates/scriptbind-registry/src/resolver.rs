//! Type spelling resolution.
//!
//! Two textual coordinate systems feed the registry. Engine spellings are
//! the C++ declarations behind `Export*` tags (`vector<uint>`, `const
//! string&`, `Critter*`). Script spellings are what annotations write
//! (`uint[]`, `string`, `Critter`). Engine spellings are first rewritten
//! into script spellings, and a single parser then lands both on
//! [`UnifiedType`].
//!
//! Resolution is where generic function signatures get collected: every
//! `ScriptFunc` that survives parsing registers its signature for funcdef
//! emission.

use scriptbind_core::unified::{MetaDescriptor, Primitive, UnifiedType};

use crate::registry::{ApiRegistry, ENTITY_BASE_CLASSES};

/// Split a C++ argument list on top-level commas, respecting angle-bracket
/// nesting.
pub fn split_engine_args(args: &str) -> Result<Vec<String>, String> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for c in args.chars() {
        if c == ',' && depth == 0 {
            result.push(cur.trim().to_string());
            cur.clear();
        } else {
            cur.push(c);
            if c == '<' {
                depth += 1;
            } else if c == '>' {
                depth -= 1;
            }
        }
    }
    if cur.trim().is_empty() {
        return Err(format!("dangling comma in argument list '{args}'"));
    }
    result.push(cur.trim().to_string());
    Ok(result)
}

/// Parse a script-side type spelling.
pub fn resolve_unified(reg: &mut ApiRegistry, t: &str) -> Result<UnifiedType, String> {
    let t = t.trim();
    if let Some(rest) = t.strip_prefix("init-") {
        return Ok(UnifiedType::Init(Box::new(resolve_unified(reg, rest)?)));
    }
    if let Some(rest) = t.strip_prefix("predicate-") {
        return Ok(UnifiedType::Predicate(Box::new(resolve_unified(reg, rest)?)));
    }
    if let Some(rest) = t.strip_prefix("callback-") {
        return Ok(UnifiedType::Callback(Box::new(resolve_unified(reg, rest)?)));
    }
    if let Some(rest) = t.strip_prefix("ObjInfo-") {
        return Ok(UnifiedType::ObjInfo(rest.to_string()));
    }
    if let Some(rest) = t.strip_prefix("ScriptFunc-") {
        let mut args = Vec::new();
        for piece in rest.split('|').filter(|p| !p.is_empty()) {
            args.push(resolve_unified(reg, piece)?);
        }
        let signature = args
            .iter()
            .map(|a| a.to_meta().as_str().to_string())
            .collect::<Vec<_>>()
            .join("|");
        reg.generic_funcdefs
            .insert(MetaDescriptor::from_canonical(signature));
        return Ok(UnifiedType::ScriptFunc(args));
    }
    if let Some(rest) = t.strip_suffix('&') {
        return Ok(UnifiedType::reference(resolve_unified(reg, rest)?));
    }
    if let Some((key, value)) = t.split_once("=>") {
        let key = resolve_unified(reg, key)?;
        let value = resolve_unified(reg, value)?;
        return Ok(UnifiedType::map(key, value));
    }
    if let Some(rest) = t.strip_suffix("[]") {
        return Ok(UnifiedType::array(resolve_unified(reg, rest)?));
    }
    if let Some(p) = Primitive::from_name(t) {
        return Ok(UnifiedType::Prim(p));
    }
    if t == "Entity" {
        return Ok(UnifiedType::EntityBase);
    }
    if reg.is_valid_type(t) {
        return Ok(UnifiedType::Named(t.to_string()));
    }
    Err(format!("invalid type '{t}'"))
}

/// Parse an engine-side C++ type spelling.
pub fn resolve_engine(reg: &mut ApiRegistry, t: &str) -> Result<UnifiedType, String> {
    let spelling = engine_spelling(reg, t)?;
    resolve_unified(reg, &spelling)
}

/// Rewrite an engine spelling into the script spelling. Pure text rewriting;
/// name validation happens in [`resolve_unified`].
fn engine_spelling(reg: &ApiRegistry, t: &str) -> Result<String, String> {
    let t = t.trim();

    if t.starts_with("InitFunc<") {
        return Ok(format!("init-{}", engine_spelling(reg, generic_inner(t)?)?));
    }
    if t.starts_with("CallbackFunc<") {
        return Ok(format!(
            "callback-{}",
            engine_spelling(reg, generic_inner(t)?)?
        ));
    }
    if t.starts_with("PredicateFunc<") {
        return Ok(format!(
            "predicate-{}",
            engine_spelling(reg, generic_inner(t)?)?
        ));
    }
    if t.starts_with("ObjInfo<") {
        return Ok(format!("ObjInfo-{}", generic_inner(t)?));
    }
    if t.starts_with("ScriptFunc<") {
        let mut parts = Vec::new();
        for arg in split_engine_args(generic_inner(t)?)? {
            parts.push(engine_spelling(reg, &arg)?);
        }
        return Ok(format!("ScriptFunc-{}|", parts.join("|")));
    }
    if t.contains("map<") {
        let inner = generic_inner(t)?;
        let (key, value) = inner
            .split_once(',')
            .ok_or_else(|| format!("map type '{t}' needs two parameters"))?;
        let mut r = format!(
            "{}=>{}",
            engine_spelling(reg, key)?,
            engine_spelling(reg, value)?
        );
        if !t.starts_with("const") && t.ends_with('&') {
            r.push('&');
        }
        return Ok(r);
    }
    if t.contains("vector<") {
        let mut r = format!("{}[]", engine_spelling(reg, generic_inner(t)?)?);
        if !t.starts_with("const") && t.ends_with('&') {
            r.push('&');
        }
        return Ok(r);
    }
    if let Some(stem) = t.strip_suffix('&').or_else(|| t.strip_suffix('*'))
        && reg.is_custom_type(stem)
    {
        return Ok(format!("{stem}&"));
    }
    if reg.is_valid_type(t) {
        return Ok(t.to_string());
    }
    if let Some(stem) = t.strip_suffix('*')
        && engine_scalar(t).is_none()
    {
        if reg.is_object(stem) || reg.is_entity_relative(stem) {
            return Ok(stem.to_string());
        }
        if let Some((_, entity)) = reg.entity_by_class(stem) {
            return Ok(entity.name.clone());
        }
        if ENTITY_BASE_CLASSES.contains(&stem) {
            return Ok("Entity".to_string());
        }
        return Err(format!("unknown pointer type '{t}'"));
    }
    engine_scalar(t)
        .map(str::to_string)
        .ok_or_else(|| format!("invalid engine type '{t}'"))
}

/// The scalar spelling table: plain values, references, and out-pointers
/// folded onto references.
fn engine_scalar(t: &str) -> Option<&'static str> {
    Some(match t {
        "int8" => "int8",
        "uint8" => "uint8",
        "int16" => "int16",
        "uint16" => "uint16",
        "int" => "int",
        "uint" => "uint",
        "int64" => "int64",
        "uint64" => "uint64",
        "int8&" | "int8*" => "int8&",
        "uint8&" | "uint8*" => "uint8&",
        "int16&" | "int16*" => "int16&",
        "uint16&" | "uint16*" => "uint16&",
        "int&" | "int*" => "int&",
        "uint&" | "uint*" => "uint&",
        "int64&" | "int64*" => "int64&",
        "uint64&" | "uint64*" => "uint64&",
        "float" => "float",
        "double" => "double",
        "float&" | "float*" => "float&",
        "double&" | "double*" => "double&",
        "bool" => "bool",
        "bool&" | "bool*" => "bool&",
        "void" => "void",
        "string&" | "string*" => "string&",
        "const string&" | "string_view" | "string" => "string",
        "hstring" => "hstring",
        "hstring&" | "hstring*" => "hstring&",
        "any_t" => "any",
        "any_t&" | "any_t*" => "any&",
        _ => return None,
    })
}

fn generic_inner(t: &str) -> Result<&str, String> {
    let open = t.find('<').ok_or_else(|| format!("bad generic '{t}'"))?;
    let close = t.rfind('>').ok_or_else(|| format!("bad generic '{t}'"))?;
    if close <= open {
        return Err(format!("bad generic '{t}'"));
    }
    Ok(&t[open + 1..close])
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptbind_core::decl::{EntityDecl, EntityFlags};

    fn registry_with_item() -> ApiRegistry {
        let mut reg = ApiRegistry::new();
        for name in ["Item", "ItemComponent", "ItemProperty", "ProtoItem", "MapSprite", "ident_t"] {
            assert!(!reg.is_valid_type(name));
            let mut sink = scriptbind_core::ErrorSink::new();
            let loc = scriptbind_core::SourceLoc::new(
                std::sync::Arc::new(std::path::PathBuf::from("T.h")),
                0,
            );
            reg.claim_type(name, &loc, &mut sink);
        }
        reg.entities.push(EntityDecl {
            name: "Item".into(),
            server_class: Some("Item".into()),
            client_class: Some("ItemView".into()),
            flags: EntityFlags::HAS_PROTO,
            exported: true,
            doc: Vec::new(),
        });
        reg.entity_relatives.insert("ProtoItem".into());
        reg.note_object("MapSprite");
        reg.note_custom_type("ident_t");
        reg
    }

    #[test]
    fn scalar_engine_spellings() {
        let mut reg = ApiRegistry::new();
        assert_eq!(
            resolve_engine(&mut reg, "const string&").unwrap(),
            UnifiedType::Prim(Primitive::String)
        );
        assert_eq!(
            resolve_engine(&mut reg, "string_view").unwrap(),
            UnifiedType::Prim(Primitive::String)
        );
        assert_eq!(
            resolve_engine(&mut reg, "uint16*").unwrap(),
            UnifiedType::reference(UnifiedType::Prim(Primitive::Uint16))
        );
        assert_eq!(
            resolve_engine(&mut reg, "any_t").unwrap(),
            UnifiedType::Prim(Primitive::Any)
        );
    }

    #[test]
    fn containers_and_ref_rules() {
        let mut reg = ApiRegistry::new();
        assert_eq!(
            resolve_engine(&mut reg, "const vector<uint>&").unwrap(),
            UnifiedType::array(UnifiedType::Prim(Primitive::Uint))
        );
        // Non-const container reference is an out-parameter.
        assert_eq!(
            resolve_engine(&mut reg, "vector<uint>&").unwrap(),
            UnifiedType::reference(UnifiedType::array(UnifiedType::Prim(Primitive::Uint)))
        );
        assert_eq!(
            resolve_engine(&mut reg, "map<hstring, vector<int>>").unwrap(),
            UnifiedType::map(
                UnifiedType::Prim(Primitive::HString),
                UnifiedType::array(UnifiedType::Prim(Primitive::Int)),
            )
        );
    }

    #[test]
    fn entity_pointers_resolve_to_entity_names() {
        let mut reg = registry_with_item();
        assert_eq!(
            resolve_engine(&mut reg, "Item*").unwrap(),
            UnifiedType::Named("Item".into())
        );
        assert_eq!(
            resolve_engine(&mut reg, "ItemView*").unwrap(),
            UnifiedType::Named("Item".into())
        );
        assert_eq!(
            resolve_engine(&mut reg, "ProtoItem*").unwrap(),
            UnifiedType::Named("ProtoItem".into())
        );
        assert_eq!(
            resolve_engine(&mut reg, "ServerEntity*").unwrap(),
            UnifiedType::EntityBase
        );
        assert!(resolve_engine(&mut reg, "Widget*").is_err());
    }

    #[test]
    fn function_types_register_funcdefs() {
        let mut reg = registry_with_item();
        let t = resolve_engine(&mut reg, "ScriptFunc<void, Item*, int>").unwrap();
        assert_eq!(
            t,
            UnifiedType::ScriptFunc(vec![
                UnifiedType::Prim(Primitive::Void),
                UnifiedType::Named("Item".into()),
                UnifiedType::Prim(Primitive::Int),
            ])
        );
        assert_eq!(reg.generic_funcdefs.len(), 1);
        assert_eq!(
            reg.generic_funcdefs.iter().next().unwrap().as_str(),
            "void|Item|int"
        );
    }

    #[test]
    fn script_spellings() {
        let mut reg = registry_with_item();
        assert_eq!(
            resolve_unified(&mut reg, "uint=>string").unwrap(),
            UnifiedType::map(
                UnifiedType::Prim(Primitive::Uint),
                UnifiedType::Prim(Primitive::String),
            )
        );
        assert_eq!(
            resolve_unified(&mut reg, "Item[]&").unwrap(),
            UnifiedType::reference(UnifiedType::array(UnifiedType::Named("Item".into())))
        );
        assert_eq!(
            resolve_unified(&mut reg, "init-Item").unwrap(),
            UnifiedType::Init(Box::new(UnifiedType::Named("Item".into())))
        );
        assert!(resolve_unified(&mut reg, "Widget").is_err());
    }

    #[test]
    fn split_respects_nesting() {
        assert_eq!(
            split_engine_args("Map* self, map<uint, vector<int>> data, bool flag").unwrap(),
            ["Map* self", "map<uint, vector<int>> data", "bool flag"]
        );
        assert!(split_engine_args("int a,").is_err());
    }
}
