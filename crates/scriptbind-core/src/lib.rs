//! Core data model for the scriptbind generator.
//!
//! This crate holds everything shared between the scanner, the registry
//! builders and the backend emitters:
//!
//! - [`UnifiedType`]: the backend-independent type representation, with its
//!   canonical [`MetaDescriptor`] serialization
//! - declaration records ([`decl`]) produced by the builders and consumed by
//!   the emitters
//! - tag records ([`tags`]) produced by the scanner
//! - the error taxonomy ([`error`]) and the diagnostic sink used by the
//!   collect-all-errors policy
//! - the engine string hash ([`hash`])

pub mod decl;
pub mod error;
pub mod hash;
pub mod loc;
pub mod tags;
pub mod unified;

pub use decl::{
    AccessMode, CodeGenMarker, CustomType, EntityDecl, EntityFlags, EnumEntry, EnumGroup,
    EnumProvenance, EventDecl, MethodDecl, ObjectDecl, PropertyComponent, PropertyDecl, RegTarget,
    RemoteCallDecl, Representation, ScriptLang, SettingDecl, SettingEntry, SettingMutability,
    SettingsGroup, Side, TemplateKind,
};
pub use error::{BuildError, Diagnostic, EmitError, ErrorSink, ScanError};
pub use hash::script_hash;
pub use loc::SourceLoc;
pub use tags::{ContextRule, TagContext, TagKind, TagRecord};
pub use unified::{MetaDescriptor, MetaParseError, Primitive, UnifiedType};
