//! The unified type representation and its canonical serialization.
//!
//! Every type that crosses the binding surface is held as a [`UnifiedType`],
//! a genuine sum type over the recursive grammar the annotation syntax can
//! express: primitives, named registry types, arrays, maps, the three
//! function-pointer flavours, the reflective object-info type, the variadic
//! generic function signature, and a reference wrapper.
//!
//! [`MetaDescriptor`] is the dot-segmented canonical encoding of a unified
//! type (`arr.int`, `dict.hstring.arr.string`, `init.uint`, `int.ref`, ...).
//! It exists only at serialization boundaries (registry keys, funcdef
//! dedup, generated restore-info blocks), never as the working
//! representation. [`UnifiedType::to_meta`] and [`MetaDescriptor::parse`]
//! are exact inverses over every well-formed value.
//!
//! # Well-formedness
//!
//! A [`UnifiedType::Ref`] may only appear at the top level of a parameter or
//! return type (or as a `ScriptFunc` argument); it is illegal on
//! function-pointer kinds and inside containers. [`UnifiedType::check`]
//! enforces this, which is what makes the descriptor encoding unambiguous.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

/// The fixed primitive set of the engine's exported surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int,
    Uint,
    Int64,
    Uint64,
    Float,
    Double,
    Bool,
    String,
    /// Interned string handle.
    HString,
    /// Generic value box.
    Any,
    Void,
}

impl Primitive {
    /// The canonical spelling, shared by the unified and meta forms.
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Int8 => "int8",
            Primitive::Uint8 => "uint8",
            Primitive::Int16 => "int16",
            Primitive::Uint16 => "uint16",
            Primitive::Int => "int",
            Primitive::Uint => "uint",
            Primitive::Int64 => "int64",
            Primitive::Uint64 => "uint64",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bool => "bool",
            Primitive::String => "string",
            Primitive::HString => "hstring",
            Primitive::Any => "any",
            Primitive::Void => "void",
        }
    }

    /// Parse a canonical spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int8" => Primitive::Int8,
            "uint8" => Primitive::Uint8,
            "int16" => Primitive::Int16,
            "uint16" => Primitive::Uint16,
            "int" => Primitive::Int,
            "uint" => Primitive::Uint,
            "int64" => Primitive::Int64,
            "uint64" => Primitive::Uint64,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            "bool" => Primitive::Bool,
            "string" => Primitive::String,
            "hstring" => Primitive::HString,
            "any" => Primitive::Any,
            "void" => Primitive::Void,
            _ => return None,
        })
    }

    /// Storage width in bytes for plain-data registration, if the primitive
    /// is a fixed-width scalar.
    pub const fn byte_width(self) -> Option<u32> {
        match self {
            Primitive::Int8 | Primitive::Uint8 | Primitive::Bool => Some(1),
            Primitive::Int16 | Primitive::Uint16 => Some(2),
            Primitive::Int | Primitive::Uint | Primitive::Float => Some(4),
            Primitive::Int64 | Primitive::Uint64 | Primitive::Double => Some(8),
            _ => None,
        }
    }

    pub const fn is_int(self) -> bool {
        matches!(
            self,
            Primitive::Int8
                | Primitive::Uint8
                | Primitive::Int16
                | Primitive::Uint16
                | Primitive::Int
                | Primitive::Uint
                | Primitive::Int64
                | Primitive::Uint64
        )
    }

    pub const fn is_signed_int(self) -> bool {
        matches!(
            self,
            Primitive::Int8 | Primitive::Int16 | Primitive::Int | Primitive::Int64
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Primitive::Float | Primitive::Double)
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type in the backend-independent coordinate system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnifiedType {
    Prim(Primitive),
    /// The generic entity base handle (`Entity`), target-dependent on the
    /// engine side.
    EntityBase,
    /// A named registry type: custom value type, enum group, entity, entity
    /// relative or user object. The name must already resolve at
    /// construction time; declaration order is significant.
    Named(String),
    Array(Box<UnifiedType>),
    Map(Box<UnifiedType>, Box<UnifiedType>),
    /// One-shot initialization function.
    Init(Box<UnifiedType>),
    /// Repeatable callback function.
    Callback(Box<UnifiedType>),
    /// Boolean-returning filter function.
    Predicate(Box<UnifiedType>),
    /// Reflective object-info box for a named user object.
    ObjInfo(String),
    /// Variadic generic function signature; the first element is the return
    /// type.
    ScriptFunc(Vec<UnifiedType>),
    /// Mutable reference (out-parameter on backends without references).
    Ref(Box<UnifiedType>),
}

impl UnifiedType {
    pub fn array(elem: UnifiedType) -> Self {
        UnifiedType::Array(Box::new(elem))
    }

    pub fn map(key: UnifiedType, value: UnifiedType) -> Self {
        UnifiedType::Map(Box::new(key), Box::new(value))
    }

    pub fn reference(inner: UnifiedType) -> Self {
        UnifiedType::Ref(Box::new(inner))
    }

    /// Strip an outer reference wrapper, if any.
    pub fn without_ref(&self) -> &UnifiedType {
        match self {
            UnifiedType::Ref(inner) => inner,
            other => other,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, UnifiedType::Ref(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, UnifiedType::Prim(Primitive::Void))
    }

    /// True for the three function-pointer flavours and the generic function
    /// signature.
    pub fn is_func_kind(&self) -> bool {
        matches!(
            self,
            UnifiedType::Init(_)
                | UnifiedType::Callback(_)
                | UnifiedType::Predicate(_)
                | UnifiedType::ScriptFunc(_)
        )
    }

    /// Validate the reference placement rules.
    ///
    /// A reference is legal only at the top level (including on arrays and
    /// maps, which backends marshal as out-parameters) and never on a
    /// function-pointer kind. `ScriptFunc` may only appear at the top level.
    pub fn check(&self) -> Result<(), MetaParseError> {
        fn check_inner(t: &UnifiedType) -> Result<(), MetaParseError> {
            match t {
                UnifiedType::Ref(_) => Err(MetaParseError::MisplacedRef(t.to_string())),
                UnifiedType::ScriptFunc(_) => Err(MetaParseError::NestedScriptFunc(t.to_string())),
                other => walk(other),
            }
        }
        fn walk(t: &UnifiedType) -> Result<(), MetaParseError> {
            match t {
                UnifiedType::Array(e) | UnifiedType::Init(e) | UnifiedType::Callback(e) | UnifiedType::Predicate(e) => {
                    check_inner(e)
                }
                UnifiedType::Map(k, v) => {
                    check_inner(k)?;
                    check_inner(v)
                }
                _ => Ok(()),
            }
        }
        match self {
            UnifiedType::Ref(inner) => {
                if inner.is_func_kind() {
                    return Err(MetaParseError::RefToFunc(self.to_string()));
                }
                walk(inner)
            }
            UnifiedType::ScriptFunc(args) => {
                for arg in args {
                    match arg {
                        UnifiedType::Ref(inner) if inner.is_func_kind() => {
                            return Err(MetaParseError::RefToFunc(arg.to_string()));
                        }
                        UnifiedType::Ref(inner) => walk(inner)?,
                        other => check_inner(other)?,
                    }
                }
                Ok(())
            }
            other => walk(other),
        }
    }

    /// Serialize to the canonical meta descriptor.
    pub fn to_meta(&self) -> MetaDescriptor {
        fn encode(t: &UnifiedType, out: &mut String) {
            match t {
                UnifiedType::Prim(p) => out.push_str(p.name()),
                UnifiedType::EntityBase => out.push_str("Entity"),
                UnifiedType::Named(name) => out.push_str(name),
                UnifiedType::Array(e) => {
                    out.push_str("arr.");
                    encode(e, out);
                }
                UnifiedType::Map(k, v) => {
                    out.push_str("dict.");
                    encode(k, out);
                    out.push('.');
                    encode(v, out);
                }
                UnifiedType::Init(e) => {
                    out.push_str("init.");
                    encode(e, out);
                }
                UnifiedType::Callback(e) => {
                    out.push_str("callback.");
                    encode(e, out);
                }
                UnifiedType::Predicate(e) => {
                    out.push_str("predicate.");
                    encode(e, out);
                }
                UnifiedType::ObjInfo(name) => {
                    out.push_str("ObjInfo.");
                    out.push_str(name);
                }
                UnifiedType::ScriptFunc(args) => {
                    out.push_str("ScriptFunc.");
                    for arg in args {
                        encode(arg, out);
                        out.push('|');
                    }
                    if args.is_empty() {
                        out.push('|');
                    }
                }
                UnifiedType::Ref(inner) => {
                    encode(inner, out);
                    out.push_str(".ref");
                }
            }
        }
        let mut s = String::new();
        encode(self, &mut s);
        MetaDescriptor(s)
    }
}

impl Display for UnifiedType {
    /// The unified spelling used in script-side annotations and docs:
    /// `int`, `uint[]`, `hstring=>int`, `init-Item`, `Critter&`.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnifiedType::Prim(p) => write!(f, "{p}"),
            UnifiedType::EntityBase => f.write_str("Entity"),
            UnifiedType::Named(name) => f.write_str(name),
            UnifiedType::Array(e) => write!(f, "{e}[]"),
            UnifiedType::Map(k, v) => write!(f, "{k}=>{v}"),
            UnifiedType::Init(e) => write!(f, "init-{e}"),
            UnifiedType::Callback(e) => write!(f, "callback-{e}"),
            UnifiedType::Predicate(e) => write!(f, "predicate-{e}"),
            UnifiedType::ObjInfo(name) => write!(f, "ObjInfo-{name}"),
            UnifiedType::ScriptFunc(args) => {
                f.write_str("ScriptFunc-")?;
                for arg in args {
                    write!(f, "{arg}|")?;
                }
                Ok(())
            }
            UnifiedType::Ref(inner) => write!(f, "{inner}&"),
        }
    }
}

/// Failures while decoding a meta descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaParseError {
    #[error("empty meta descriptor")]
    Empty,
    #[error("truncated meta descriptor '{0}'")]
    Truncated(String),
    #[error("trailing segments in meta descriptor '{0}'")]
    TrailingSegments(String),
    #[error("invalid type name '{0}' in meta descriptor")]
    InvalidName(String),
    #[error("reference not allowed inside '{0}'")]
    MisplacedRef(String),
    #[error("reference to function type '{0}' is not allowed")]
    RefToFunc(String),
    #[error("generic function signature nested inside '{0}'")]
    NestedScriptFunc(String),
}

/// Canonical serialized form of a [`UnifiedType`], used as a hashable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaDescriptor(String);

impl MetaDescriptor {
    /// Wrap an already-canonical descriptor string.
    ///
    /// Used only for keys that were produced by [`UnifiedType::to_meta`];
    /// arbitrary input should go through [`MetaDescriptor::parse`].
    pub fn from_canonical(s: impl Into<String>) -> Self {
        MetaDescriptor(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back into the structured representation. Exact inverse of
    /// [`UnifiedType::to_meta`] for every well-formed value.
    pub fn parse(&self) -> Result<UnifiedType, MetaParseError> {
        parse_descriptor(&self.0)
    }
}

impl Display for MetaDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_type_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_descriptor(text: &str) -> Result<UnifiedType, MetaParseError> {
    if text.is_empty() {
        return Err(MetaParseError::Empty);
    }
    let segments: Vec<&str> = text.split('.').collect();
    let mut pos = 0usize;
    let ty = parse_segments(text, &segments, &mut pos)?;
    // A single trailing `ref` segment wraps the whole type.
    let ty = if pos < segments.len() && segments[pos] == "ref" {
        pos += 1;
        UnifiedType::reference(ty)
    } else {
        ty
    };
    if pos != segments.len() {
        return Err(MetaParseError::TrailingSegments(text.to_string()));
    }
    ty.check()?;
    Ok(ty)
}

fn parse_segments(
    text: &str,
    segments: &[&str],
    pos: &mut usize,
) -> Result<UnifiedType, MetaParseError> {
    let Some(&seg) = segments.get(*pos) else {
        return Err(MetaParseError::Truncated(text.to_string()));
    };
    *pos += 1;
    match seg {
        "arr" => Ok(UnifiedType::array(parse_segments(text, segments, pos)?)),
        "dict" => {
            let key = parse_segments(text, segments, pos)?;
            let value = parse_segments(text, segments, pos)?;
            Ok(UnifiedType::map(key, value))
        }
        "init" => Ok(UnifiedType::Init(Box::new(parse_segments(text, segments, pos)?))),
        "callback" => Ok(UnifiedType::Callback(Box::new(parse_segments(text, segments, pos)?))),
        "predicate" => Ok(UnifiedType::Predicate(Box::new(parse_segments(text, segments, pos)?))),
        "ObjInfo" => {
            let Some(&name) = segments.get(*pos) else {
                return Err(MetaParseError::Truncated(text.to_string()));
            };
            *pos += 1;
            if !is_type_name(name) {
                return Err(MetaParseError::InvalidName(name.to_string()));
            }
            Ok(UnifiedType::ObjInfo(name.to_string()))
        }
        "ScriptFunc" => {
            // The signature consumes everything that remains; arguments are
            // pipe-separated full descriptors (each may carry its own ref).
            let rest = segments[*pos..].join(".");
            *pos = segments.len();
            let mut args = Vec::new();
            for piece in rest.split('|').filter(|p| !p.is_empty()) {
                args.push(parse_descriptor(piece)?);
            }
            Ok(UnifiedType::ScriptFunc(args))
        }
        "Entity" => Ok(UnifiedType::EntityBase),
        // `ref` is only meaningful as a suffix handled by the caller.
        "ref" => Err(MetaParseError::MisplacedRef(text.to_string())),
        other => {
            if let Some(p) = Primitive::from_name(other) {
                Ok(UnifiedType::Prim(p))
            } else if is_type_name(other) {
                Ok(UnifiedType::Named(other.to_string()))
            } else {
                Err(MetaParseError::InvalidName(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(t: &UnifiedType) {
        let meta = t.to_meta();
        let back = meta.parse().expect("parse");
        assert_eq!(&back, t, "descriptor was '{meta}'");
    }

    #[test]
    fn primitive_encoding() {
        assert_eq!(UnifiedType::Prim(Primitive::Int).to_meta().as_str(), "int");
        assert_eq!(
            UnifiedType::Prim(Primitive::HString).to_meta().as_str(),
            "hstring"
        );
        assert_eq!(UnifiedType::EntityBase.to_meta().as_str(), "Entity");
    }

    #[test]
    fn container_encoding() {
        let t = UnifiedType::array(UnifiedType::Prim(Primitive::Uint));
        assert_eq!(t.to_meta().as_str(), "arr.uint");

        let t = UnifiedType::map(
            UnifiedType::Prim(Primitive::HString),
            UnifiedType::array(UnifiedType::Prim(Primitive::String)),
        );
        assert_eq!(t.to_meta().as_str(), "dict.hstring.arr.string");
    }

    #[test]
    fn ref_is_a_suffix() {
        let t = UnifiedType::reference(UnifiedType::array(UnifiedType::Prim(Primitive::Int)));
        assert_eq!(t.to_meta().as_str(), "arr.int.ref");
        roundtrip(&t);
    }

    #[test]
    fn roundtrip_representative_types() {
        let cases = [
            UnifiedType::Prim(Primitive::Bool),
            UnifiedType::EntityBase,
            UnifiedType::Named("Item".into()),
            UnifiedType::array(UnifiedType::Named("ItemProperty".into())),
            UnifiedType::array(UnifiedType::array(UnifiedType::Prim(Primitive::Int))),
            UnifiedType::map(
                UnifiedType::Prim(Primitive::Uint),
                UnifiedType::map(
                    UnifiedType::Prim(Primitive::Int),
                    UnifiedType::Prim(Primitive::String),
                ),
            ),
            UnifiedType::Init(Box::new(UnifiedType::Named("Critter".into()))),
            UnifiedType::Callback(Box::new(UnifiedType::Prim(Primitive::Any))),
            UnifiedType::Predicate(Box::new(UnifiedType::Named("Item".into()))),
            UnifiedType::ObjInfo("MapSprite".into()),
            UnifiedType::ScriptFunc(vec![
                UnifiedType::Prim(Primitive::Void),
                UnifiedType::Named("Critter".into()),
                UnifiedType::reference(UnifiedType::Prim(Primitive::Int)),
            ]),
            UnifiedType::reference(UnifiedType::map(
                UnifiedType::Prim(Primitive::HString),
                UnifiedType::Prim(Primitive::Uint),
            )),
        ];
        for case in &cases {
            roundtrip(case);
        }
    }

    #[test]
    fn deep_dict_value_is_unambiguous() {
        // dict value that itself starts with a composite head.
        let t = UnifiedType::map(
            UnifiedType::array(UnifiedType::Prim(Primitive::Int)),
            UnifiedType::Prim(Primitive::String),
        );
        assert_eq!(t.to_meta().as_str(), "dict.arr.int.string");
        roundtrip(&t);
    }

    #[test]
    fn ref_inside_container_rejected() {
        let t = UnifiedType::array(UnifiedType::reference(UnifiedType::Prim(Primitive::Int)));
        assert!(matches!(t.check(), Err(MetaParseError::MisplacedRef(_))));
        assert!(
            MetaDescriptor::from_canonical("arr.int.ref.ref")
                .parse()
                .is_err()
        );
    }

    #[test]
    fn ref_to_func_kind_rejected() {
        let t = UnifiedType::reference(UnifiedType::Init(Box::new(UnifiedType::Prim(
            Primitive::Int,
        ))));
        assert!(matches!(t.check(), Err(MetaParseError::RefToFunc(_))));
    }

    #[test]
    fn truncated_descriptor_rejected() {
        assert!(MetaDescriptor::from_canonical("dict.int").parse().is_err());
        assert!(MetaDescriptor::from_canonical("arr").parse().is_err());
        assert!(MetaDescriptor::from_canonical("").parse().is_err());
    }

    #[test]
    fn unified_spelling_display() {
        let t = UnifiedType::map(
            UnifiedType::Prim(Primitive::HString),
            UnifiedType::array(UnifiedType::Prim(Primitive::Int)),
        );
        assert_eq!(t.to_string(), "hstring=>int[]");
        assert_eq!(
            UnifiedType::reference(UnifiedType::Prim(Primitive::Float)).to_string(),
            "float&"
        );
        assert_eq!(
            UnifiedType::Init(Box::new(UnifiedType::Named("Item".into()))).to_string(),
            "init-Item"
        );
    }

    #[test]
    fn script_func_args_keep_order() {
        let t = UnifiedType::ScriptFunc(vec![
            UnifiedType::Prim(Primitive::Void),
            UnifiedType::Prim(Primitive::Int),
            UnifiedType::Prim(Primitive::String),
        ]);
        assert_eq!(t.to_meta().as_str(), "ScriptFunc.void|int|string|");
        roundtrip(&t);
    }
}
