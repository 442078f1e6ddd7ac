//! Validated declaration records.
//!
//! These are what the builders produce from raw tag records after semantic
//! validation against the registry. Each record kind mirrors one annotation
//! family. Records are created once during the build phase and only read
//! afterwards.

use bitflags::bitflags;

use crate::loc::SourceLoc;
use crate::unified::{Primitive, UnifiedType};

/// Target side of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Server,
    Client,
    Mapper,
    Common,
}

impl Side {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Server" => Side::Server,
            "Client" => Side::Client,
            "Mapper" => Side::Mapper,
            "Common" => Side::Common,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Side::Server => "Server",
            Side::Client => "Client",
            Side::Mapper => "Mapper",
            Side::Common => "Common",
        }
    }
}

/// Data-registration target: the three runtime applications plus the
/// resource baker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegTarget {
    Server,
    Client,
    Mapper,
    Baker,
}

impl RegTarget {
    pub const fn name(self) -> &'static str {
        match self {
            RegTarget::Server => "Server",
            RegTarget::Client => "Client",
            RegTarget::Mapper => "Mapper",
            RegTarget::Baker => "Baker",
        }
    }
}

/// Which world an enum group was declared in. Each provenance has its own
/// uniqueness namespace for groups, but both share the global type
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumProvenance {
    Engine,
    Script,
}

/// One key/value pair of an enum group. The literal spelling is preserved
/// for emission (hex literals stay hex); the evaluated value is used for
/// invariant checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub key: String,
    pub literal: String,
    pub value: i64,
    pub doc: Vec<String>,
}

impl EnumEntry {
    pub fn new(key: impl Into<String>, literal: impl Into<String>, value: i64) -> Self {
        Self {
            key: key.into(),
            literal: literal.into(),
            value,
            doc: Vec::new(),
        }
    }
}

/// An enum group, engine-declared or script-declared (or synthesized by the
/// post-processing pass).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumGroup {
    pub name: String,
    pub underlying: Primitive,
    pub entries: Vec<EnumEntry>,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
    pub provenance: EnumProvenance,
}

/// Convertibility of a custom value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Freely convertible to/from the underlying type
    /// (source spelling `RelaxedStrong`).
    Lenient,
    /// Nominal; no implicit conversions (source spelling `HardStrong`).
    Strict,
}

impl Representation {
    pub fn from_spelling(s: &str) -> Option<Self> {
        match s {
            "RelaxedStrong" => Some(Representation::Lenient),
            "HardStrong" => Some(Representation::Strict),
            _ => None,
        }
    }

    /// The registration macro stem used in generated code.
    pub const fn register_macro(self) -> &'static str {
        match self {
            Representation::Lenient => "REGISTER_RELAXED_STRONG_TYPE",
            Representation::Strict => "REGISTER_HARD_STRONG_TYPE",
        }
    }
}

/// An exported custom value type aliasing a scalar primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomType {
    pub name: String,
    pub underlying: Primitive,
    pub representation: Representation,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

bitflags! {
    /// Capability flags of a declared entity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntityFlags: u8 {
        /// Singleton entity, addressed without an instance.
        const GLOBAL = 1 << 0;
        /// Has a prototype relative (`Proto<Name>`).
        const HAS_PROTO = 1 << 1;
        /// Has a statics relative (`Static<Name>`).
        const HAS_STATICS = 1 << 2;
        /// Has an abstract base relative (`Abstract<Name>`).
        const HAS_ABSTRACT = 1 << 3;
    }
}

impl EntityFlags {
    /// Collect flags from annotation flag tokens; unrecognized tokens are
    /// left for the caller (they may be backend hints).
    pub fn from_tokens(tokens: &[String]) -> Self {
        let mut flags = EntityFlags::empty();
        for tok in tokens {
            match tok.as_str() {
                "Global" => flags |= EntityFlags::GLOBAL,
                "HasProto" => flags |= EntityFlags::HAS_PROTO,
                "HasStatics" => flags |= EntityFlags::HAS_STATICS,
                "HasAbstract" => flags |= EntityFlags::HAS_ABSTRACT,
                _ => {}
            }
        }
        flags
    }
}

/// A first-class engine entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    pub name: String,
    /// Implementing class on the server side, if present there.
    pub server_class: Option<String>,
    /// Implementing class on the client side, if present there.
    pub client_class: Option<String>,
    pub flags: EntityFlags,
    /// Engine-exported (built-in) vs user-declared.
    pub exported: bool,
    pub doc: Vec<String>,
}

impl EntityDecl {
    /// Implementing class for a registration target, if the entity exists
    /// on that side.
    pub fn class_for(&self, target: RegTarget) -> Option<&str> {
        match target {
            RegTarget::Server => self.server_class.as_deref(),
            RegTarget::Client | RegTarget::Mapper => self.client_class.as_deref(),
            // The baker registers everything.
            RegTarget::Baker => self
                .server_class
                .as_deref()
                .or(self.client_class.as_deref()),
        }
    }
}

/// A named property sub-namespace of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyComponent {
    pub entity: String,
    pub name: String,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// Property access mode: visibility x mutability x virtuality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    PrivateCommon,
    PrivateClient,
    PrivateServer,
    Public,
    PublicModifiable,
    PublicFullModifiable,
    Protected,
    ProtectedModifiable,
    VirtualPrivateCommon,
    VirtualPrivateClient,
    VirtualPrivateServer,
    VirtualPublic,
    VirtualProtected,
}

impl AccessMode {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "PrivateCommon" => AccessMode::PrivateCommon,
            "PrivateClient" => AccessMode::PrivateClient,
            "PrivateServer" => AccessMode::PrivateServer,
            "Public" => AccessMode::Public,
            "PublicModifiable" => AccessMode::PublicModifiable,
            "PublicFullModifiable" => AccessMode::PublicFullModifiable,
            "Protected" => AccessMode::Protected,
            "ProtectedModifiable" => AccessMode::ProtectedModifiable,
            "VirtualPrivateCommon" => AccessMode::VirtualPrivateCommon,
            "VirtualPrivateClient" => AccessMode::VirtualPrivateClient,
            "VirtualPrivateServer" => AccessMode::VirtualPrivateServer,
            "VirtualPublic" => AccessMode::VirtualPublic,
            "VirtualProtected" => AccessMode::VirtualProtected,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            AccessMode::PrivateCommon => "PrivateCommon",
            AccessMode::PrivateClient => "PrivateClient",
            AccessMode::PrivateServer => "PrivateServer",
            AccessMode::Public => "Public",
            AccessMode::PublicModifiable => "PublicModifiable",
            AccessMode::PublicFullModifiable => "PublicFullModifiable",
            AccessMode::Protected => "Protected",
            AccessMode::ProtectedModifiable => "ProtectedModifiable",
            AccessMode::VirtualPrivateCommon => "VirtualPrivateCommon",
            AccessMode::VirtualPrivateClient => "VirtualPrivateClient",
            AccessMode::VirtualPrivateServer => "VirtualPrivateServer",
            AccessMode::VirtualPublic => "VirtualPublic",
            AccessMode::VirtualProtected => "VirtualProtected",
        }
    }

    /// Server-private modes are blanked out of client-visible restore info.
    pub const fn is_server_private(self) -> bool {
        matches!(
            self,
            AccessMode::PrivateServer | AccessMode::VirtualPrivateServer
        )
    }
}

/// A declared entity property. Declaration order fixes the registration
/// index within the entity; that index is load-bearing for the generated
/// binary layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    pub entity: String,
    pub access: AccessMode,
    pub ty: UnifiedType,
    /// `name` or `component.name`.
    pub name: String,
    /// Engine-exported vs script-declared.
    pub exported: bool,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// A method exported on an entity for one target side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub target: Side,
    pub entity: String,
    pub name: String,
    pub ret: UnifiedType,
    pub params: Vec<(UnifiedType, String)>,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// An event on an entity, unique by (target, entity, name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDecl {
    pub target: Side,
    pub entity: String,
    pub name: String,
    pub args: Vec<(UnifiedType, String)>,
    /// Engine-exported events dispatch through a member object;
    /// script-declared events dispatch by name.
    pub exported: bool,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// A field of an exported scriptable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectField {
    pub ty: UnifiedType,
    pub name: String,
    pub doc: Vec<String>,
}

/// A (void, zero-argument) method of an exported scriptable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMethod {
    pub name: String,
    pub ret: UnifiedType,
    pub doc: Vec<String>,
}

/// An exported reference-counted scriptable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDecl {
    pub target: Side,
    pub name: String,
    pub fields: Vec<ObjectField>,
    pub methods: Vec<ObjectMethod>,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// Whether a setting may be reassigned at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingMutability {
    Fixed,
    Variable,
}

/// One entry of an exported settings group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingEntry {
    pub mutability: SettingMutability,
    pub ty: UnifiedType,
    pub key: String,
    pub init_values: Vec<String>,
    pub doc: Vec<String>,
}

/// An engine-exported settings group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsGroup {
    pub name: String,
    pub target: Side,
    pub entries: Vec<SettingEntry>,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// A standalone script-declared setting, stored in the custom settings bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingDecl {
    pub target: Side,
    pub ty: UnifiedType,
    pub name: String,
    pub init_value: Option<String>,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// Scripting language a remote call is declared in, derived from the file
/// extension of the declaring script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptLang {
    AngelScript,
    Mono,
}

impl ScriptLang {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "fos" => Some(ScriptLang::AngelScript),
            "cs" => Some(ScriptLang::Mono),
            _ => None,
        }
    }
}

/// A script-declared remote call endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCallDecl {
    /// Receiving side (`Server` receives calls sent by the client and vice
    /// versa).
    pub target: Side,
    /// Language of the declaring script.
    pub lang: ScriptLang,
    /// Namespace derived from the declaring script file stem.
    pub namespace: String,
    pub name: String,
    pub args: Vec<(UnifiedType, String)>,
    pub flags: Vec<String>,
    pub doc: Vec<String>,
}

/// Template kinds, one per backend template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    AngelScript,
    Mono,
    Native,
    DataRegistration,
    GenericCode,
}

impl TemplateKind {
    /// Map a template file name to its kind (the fixed file-name-to-kind
    /// table of the template marker contract).
    pub fn from_file_name(name: &str) -> Option<Self> {
        Some(match name {
            "AngelScriptScripting-Template.cpp" => TemplateKind::AngelScript,
            "MonoScripting-Template.cpp" => TemplateKind::Mono,
            "NativeScripting-Template.cpp" => TemplateKind::Native,
            "DataRegistration-Template.cpp" => TemplateKind::DataRegistration,
            "GenericCode-Template.cpp" => TemplateKind::GenericCode,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            TemplateKind::AngelScript => "AngelScript",
            TemplateKind::Mono => "Mono",
            TemplateKind::Native => "Native",
            TemplateKind::DataRegistration => "DataRegistration",
            TemplateKind::GenericCode => "GenericCode",
        }
    }
}

/// A named insertion point recorded inside a backend template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeGenMarker {
    pub template: TemplateKind,
    pub loc: SourceLoc,
    pub name: String,
    /// Indentation column of the marker line; insertions are re-indented to
    /// match.
    pub padding: usize,
    pub flags: Vec<String>,
}

/// Engine hook points a game may claim.
pub const KNOWN_ENGINE_HOOKS: [&str; 2] = ["ConfigSectionParseHook", "ConfigEntryParseHook"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_flags_from_tokens() {
        let toks: Vec<String> = ["Global", "HasProto", "ServerOnly"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let flags = EntityFlags::from_tokens(&toks);
        assert!(flags.contains(EntityFlags::GLOBAL));
        assert!(flags.contains(EntityFlags::HAS_PROTO));
        assert!(!flags.contains(EntityFlags::HAS_STATICS));
    }

    #[test]
    fn access_mode_names_roundtrip() {
        for name in [
            "PrivateCommon",
            "PrivateClient",
            "PrivateServer",
            "Public",
            "PublicModifiable",
            "PublicFullModifiable",
            "Protected",
            "ProtectedModifiable",
            "VirtualPrivateCommon",
            "VirtualPrivateClient",
            "VirtualPrivateServer",
            "VirtualPublic",
            "VirtualProtected",
        ] {
            let mode = AccessMode::from_name(name).expect(name);
            assert_eq!(mode.name(), name);
        }
        assert_eq!(AccessMode::from_name("Readable"), None);
    }

    #[test]
    fn representation_spellings() {
        assert_eq!(
            Representation::from_spelling("RelaxedStrong"),
            Some(Representation::Lenient)
        );
        assert_eq!(
            Representation::from_spelling("HardStrong"),
            Some(Representation::Strict)
        );
        assert_eq!(Representation::from_spelling("Weak"), None);
    }

    #[test]
    fn template_file_mapping() {
        assert_eq!(
            TemplateKind::from_file_name("DataRegistration-Template.cpp"),
            Some(TemplateKind::DataRegistration)
        );
        assert_eq!(TemplateKind::from_file_name("Other-Template.cpp"), None);
    }

    #[test]
    fn entity_class_per_target() {
        let ent = EntityDecl {
            name: "Item".into(),
            server_class: Some("ServerItem".into()),
            client_class: Some("ItemView".into()),
            flags: EntityFlags::HAS_PROTO,
            exported: true,
            doc: Vec::new(),
        };
        assert_eq!(ent.class_for(RegTarget::Server), Some("ServerItem"));
        assert_eq!(ent.class_for(RegTarget::Mapper), Some("ItemView"));
        assert_eq!(ent.class_for(RegTarget::Baker), Some("ServerItem"));
    }
}
