//! Error taxonomy and the collect-all-errors sink.
//!
//! The generator never stops at the first problem: every phase reports as
//! many independent errors as it can find, and the driver decides at phase
//! checkpoints whether to continue. [`ErrorSink`] is the shared accumulator;
//! phases push [`Diagnostic`]s into it and carry on.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::loc::SourceLoc;
use crate::tags::TagKind;
use crate::unified::MetaParseError;

// ============================================================================
// Scan phase
// ============================================================================

/// Errors found while scanning source files for annotation tags.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unknown tag '{name}'")]
    UnknownTag { name: String, loc: SourceLoc },

    #[error("tag '{kind}' missing its following declaration", kind = kind.name())]
    MissingContext { kind: TagKind, loc: SourceLoc },

    #[error("tag '{kind}' block not terminated", kind = kind.name())]
    UnterminatedBlock { kind: TagKind, loc: SourceLoc },

    #[error("tag '{kind}' has no enclosing class", kind = kind.name())]
    NoEnclosingClass { kind: TagKind, loc: SourceLoc },

    #[error("can't read file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn loc(&self) -> Option<&SourceLoc> {
        match self {
            ScanError::UnknownTag { loc, .. }
            | ScanError::MissingContext { loc, .. }
            | ScanError::UnterminatedBlock { loc, .. }
            | ScanError::NoEnclosingClass { loc, .. } => Some(loc),
            ScanError::Unreadable { .. } => None,
        }
    }
}

// ============================================================================
// Build phase
// ============================================================================

/// Errors found while building validated declarations out of tag records.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid tag info: {detail}")]
    InvalidTagInfo { detail: String, loc: SourceLoc },

    #[error("invalid target '{target}'")]
    InvalidTarget { target: String, loc: SourceLoc },

    #[error("type '{name}' already in use")]
    NameInUse { name: String, loc: SourceLoc },

    #[error("invalid type '{type_str}': {reason}")]
    InvalidType {
        type_str: String,
        reason: String,
        loc: SourceLoc,
    },

    #[error("invalid type descriptor: {source}")]
    BadDescriptor {
        #[source]
        source: MetaParseError,
        loc: SourceLoc,
    },

    #[error("entity '{entity}' not found")]
    UnknownEntity { entity: String, loc: SourceLoc },

    #[error("invalid access mode '{access}'")]
    InvalidAccess { access: String, loc: SourceLoc },

    #[error("property component '{component}' not found on entity '{entity}'")]
    UnknownComponent {
        entity: String,
        component: String,
        loc: SourceLoc,
    },

    #[error("duplicate event '{name}' on entity '{entity}'")]
    DuplicateEvent {
        entity: String,
        name: String,
        loc: SourceLoc,
    },

    #[error("duplicate setting '{name}'")]
    DuplicateSetting { name: String, loc: SourceLoc },

    #[error("type '{type_str}' not allowed for a standalone setting")]
    BadSettingType { type_str: String, loc: SourceLoc },

    #[error("unknown engine hook '{name}'")]
    UnknownHook { name: String, loc: SourceLoc },

    // Cross-declaration checks run after building, with no single source
    // line to point at.
    #[error("enum '{name}' has no zero entry")]
    EnumNoZeroEntry { name: String },

    #[error("enum '{name}' has duplicate key '{key}'")]
    EnumDuplicateKey { name: String, key: String },

    #[error("enum '{name}' has duplicate value {value}")]
    EnumDuplicateValue { name: String, value: i64 },

    #[error("unknown template file '{file}'")]
    UnknownTemplate { file: String, loc: SourceLoc },
}

impl BuildError {
    pub fn loc(&self) -> Option<&SourceLoc> {
        match self {
            BuildError::InvalidTagInfo { loc, .. }
            | BuildError::InvalidTarget { loc, .. }
            | BuildError::NameInUse { loc, .. }
            | BuildError::InvalidType { loc, .. }
            | BuildError::BadDescriptor { loc, .. }
            | BuildError::UnknownEntity { loc, .. }
            | BuildError::InvalidAccess { loc, .. }
            | BuildError::UnknownComponent { loc, .. }
            | BuildError::DuplicateEvent { loc, .. }
            | BuildError::DuplicateSetting { loc, .. }
            | BuildError::BadSettingType { loc, .. }
            | BuildError::UnknownHook { loc, .. }
            | BuildError::UnknownTemplate { loc, .. } => Some(loc),
            BuildError::EnumNoZeroEntry { .. }
            | BuildError::EnumDuplicateKey { .. }
            | BuildError::EnumDuplicateValue { .. } => None,
        }
    }
}

// ============================================================================
// Emit phase
// ============================================================================

/// Errors found while rendering and writing output files.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("marker '{marker}' not scheduled for template {template}")]
    UnknownMarker { template: String, marker: String },

    #[error("no '{template}' template was scanned")]
    MissingTemplate { template: String },

    #[error("can't read template {path}: {source}")]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no way to lower type '{type_str}' for {backend}")]
    Unloweable { type_str: String, backend: String },

    #[error("{backend} backend generation is not implemented")]
    BackendUnavailable { backend: String },

    #[error("'{file}' is not in the output file table")]
    UnknownOutput { file: String },

    #[error("can't write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Diagnostics
// ============================================================================

/// One collected problem, tagged with the phase it came from.
#[derive(Debug, Error)]
pub enum Diagnostic {
    #[error("{0}")]
    Scan(#[from] ScanError),
    #[error("{0}")]
    Build(#[from] BuildError),
    #[error("{0}")]
    Emit(#[from] EmitError),
}

impl Diagnostic {
    /// Source location, where one applies.
    pub fn loc(&self) -> Option<&SourceLoc> {
        match self {
            Diagnostic::Scan(e) => e.loc(),
            Diagnostic::Build(e) => e.loc(),
            Diagnostic::Emit(_) => None,
        }
    }
}

/// Rendered form used both for logging and for the failure-stub comment
/// block: the message first, then the location when known.
impl Diagnostic {
    pub fn render(&self) -> String {
        match self.loc() {
            Some(loc) => format!("{self}\nin {loc}"),
            None => self.to_string(),
        }
    }
}

/// Accumulator for the collect-all-errors policy.
///
/// Every phase pushes into the sink and keeps going; the driver checks
/// [`ErrorSink::is_empty`] at phase checkpoints to decide whether the run
/// may proceed to emission.
#[derive(Debug, Default)]
pub struct ErrorSink {
    diags: Vec<Diagnostic>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: impl Into<Diagnostic>) {
        let diag = diag.into();
        tracing::error!("{}", diag.render());
        self.diags.push(diag);
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }
}

impl Display for ErrorSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, diag) in self.diags.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diag.render())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn loc() -> SourceLoc {
        SourceLoc::new(Arc::new(PathBuf::from("Entity.h")), 41)
    }

    #[test]
    fn sink_collects_across_phases() {
        let mut sink = ErrorSink::new();
        assert!(sink.is_empty());
        sink.push(ScanError::UnknownTag {
            name: "ExportWidget".into(),
            loc: loc(),
        });
        sink.push(BuildError::UnknownEntity {
            entity: "Critter".into(),
            loc: loc(),
        });
        assert_eq!(sink.len(), 2);
        assert!(!sink.is_empty());
    }

    #[test]
    fn render_appends_location() {
        let diag = Diagnostic::from(BuildError::NameInUse {
            name: "ItemFlags".into(),
            loc: loc(),
        });
        let rendered = diag.render();
        assert!(rendered.starts_with("type 'ItemFlags' already in use"));
        assert!(rendered.ends_with("in Entity.h (42)"));
    }

    #[test]
    fn emit_errors_have_no_location() {
        let diag = Diagnostic::from(EmitError::UnknownMarker {
            template: "AngelScript".into(),
            marker: "Defines".into(),
        });
        assert!(diag.loc().is_none());
        assert_eq!(diag.render(), diag.to_string());
    }
}
