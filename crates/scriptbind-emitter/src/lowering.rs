//! Unified type → engine C++ surface spelling.
//!
//! The engine side of every generated wrapper and registration call is
//! spelled here. Pass-in positions get view types (`string_view`, `const
//! vector<T>&`); `ScriptFunc` argument refs lower to pointers because the
//! generic trampoline cannot hold references.

use scriptbind_core::decl::RegTarget;
use scriptbind_core::error::EmitError;
use scriptbind_core::unified::{Primitive, UnifiedType};
use scriptbind_registry::ApiRegistry;

/// The generic entity base class for a lowering target.
pub fn entity_base_for(target: RegTarget) -> &'static str {
    match target {
        RegTarget::Server => "ServerEntity*",
        RegTarget::Client | RegTarget::Mapper => "ClientEntity*",
        RegTarget::Baker => "Entity*",
    }
}

/// Engine C++ spelling of a unified type.
pub fn engine_type(
    reg: &ApiRegistry,
    ty: &UnifiedType,
    target: RegTarget,
    pass_in: bool,
) -> Result<String, EmitError> {
    engine_type_ext(reg, ty, target, pass_in, false)
}

fn unloweable(ty: &UnifiedType) -> EmitError {
    EmitError::Unloweable {
        type_str: ty.to_string(),
        backend: "engine surface".to_string(),
    }
}

pub(crate) fn engine_type_ext(
    reg: &ApiRegistry,
    ty: &UnifiedType,
    target: RegTarget,
    pass_in: bool,
    ref_as_ptr: bool,
) -> Result<String, EmitError> {
    // Kinds whose spelling is position-independent ignore both the ref
    // suffix and the pass-in view adjustment.
    match ty.without_ref() {
        UnifiedType::EntityBase => return Ok(entity_base_for(target).to_string()),
        UnifiedType::ObjInfo(name) => return Ok(format!("ObjInfo<{name}>")),
        UnifiedType::ScriptFunc(args) => {
            let mut parts = Vec::with_capacity(args.len());
            for arg in args {
                parts.push(engine_type_ext(reg, arg, target, false, true)?);
            }
            return Ok(format!("ScriptFunc<{}>", parts.join(", ")));
        }
        UnifiedType::Named(name) if reg.is_script_enum(name) => {
            let underlying = reg.enum_underlying(name).ok_or_else(|| unloweable(ty))?;
            return Ok(format!("ScriptEnum_{}", underlying.name()));
        }
        _ => {}
    }

    if let UnifiedType::Ref(inner) = ty {
        let base = engine_type_ext(reg, inner, target, false, false)?;
        return Ok(format!("{base}{}", if ref_as_ptr { "*" } else { "&" }));
    }

    let spelled = match ty {
        UnifiedType::Prim(Primitive::Any) => "any_t".to_string(),
        UnifiedType::Prim(p) => p.name().to_string(),
        UnifiedType::Array(elem) => {
            format!("vector<{}>", engine_type_ext(reg, elem, target, false, false)?)
        }
        UnifiedType::Map(key, value) => format!(
            "map<{}, {}>",
            engine_type_ext(reg, key, target, false, false)?,
            engine_type_ext(reg, value, target, false, false)?
        ),
        UnifiedType::Init(inner) | UnifiedType::Callback(inner) | UnifiedType::Predicate(inner) => {
            // Function arguments only exist in pass-in positions.
            if !pass_in {
                return Err(unloweable(ty));
            }
            let wrapper = match ty {
                UnifiedType::Init(_) => "InitFunc",
                UnifiedType::Callback(_) => "CallbackFunc",
                _ => "PredicateFunc",
            };
            return Ok(format!(
                "{wrapper}<{}>",
                engine_type_ext(reg, inner, target, false, false)?
            ));
        }
        UnifiedType::Named(name) => {
            if let Some(entity) = reg.entity(name) {
                if target != RegTarget::Server {
                    if name == "Game" && target == RegTarget::Mapper {
                        "FOMapper*".to_string()
                    } else {
                        let class = entity.client_class.as_deref().ok_or_else(|| unloweable(ty))?;
                        format!("{class}*")
                    }
                } else {
                    let class = entity.server_class.as_deref().ok_or_else(|| unloweable(ty))?;
                    format!("{class}*")
                }
            } else if reg.is_object(name) || reg.is_entity_relative(name) {
                format!("{name}*")
            } else {
                // Engine enums and custom value types keep their own names.
                name.clone()
            }
        }
        UnifiedType::EntityBase
        | UnifiedType::ObjInfo(_)
        | UnifiedType::ScriptFunc(_)
        | UnifiedType::Ref(_) => unreachable!("handled above"),
    };

    if pass_in {
        if spelled == "string" {
            return Ok("string_view".to_string());
        }
        if matches!(ty, UnifiedType::Array(_) | UnifiedType::Map(_, _)) {
            return Ok(format!("const {spelled}&"));
        }
    }
    Ok(spelled)
}

/// The innermost value type: array elements and map values unwrapped down to
/// a scalar or named type.
pub fn base_of(ty: &UnifiedType) -> &UnifiedType {
    match ty {
        UnifiedType::Ref(inner)
        | UnifiedType::Init(inner)
        | UnifiedType::Callback(inner)
        | UnifiedType::Predicate(inner)
        | UnifiedType::Array(inner) => base_of(inner),
        UnifiedType::Map(_, value) => base_of(value),
        other => other,
    }
}

/// Spelling of a base type for registration descriptors.
pub fn base_name(ty: &UnifiedType) -> String {
    match base_of(ty) {
        UnifiedType::Prim(p) => p.name().to_string(),
        UnifiedType::Named(name) => name.clone(),
        UnifiedType::EntityBase => "Entity".to_string(),
        other => other.to_meta().as_str().to_string(),
    }
}
