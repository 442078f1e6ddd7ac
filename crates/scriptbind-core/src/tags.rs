//! Tag records - the raw output of the annotation scanner.
//!
//! A tag is a `///@` trailer comment in an engine source file. The scanner
//! extracts the tag name, its inline argument string, an optional captured
//! context (source lines following the tag) and the doc-comment block that
//! preceded it. Records are immutable once scanned; the declaration builders
//! consume them in file-then-line order.

use crate::loc::SourceLoc;

/// The closed set of recognized tag names.
///
/// `Export*` tags annotate engine-side declarations (their context comes
/// from the surrounding C++ source); the bare tags declare script-side
/// constructs entirely in the tag arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    ExportEnum,
    ExportType,
    ExportProperty,
    ExportMethod,
    ExportEvent,
    ExportObject,
    ExportEntity,
    ExportSettings,
    Entity,
    Enum,
    PropertyComponent,
    Property,
    Event,
    RemoteCall,
    Setting,
    EngineHook,
    CodeGen,
}

impl TagKind {
    /// All kinds, in builder dependency order: type-level declarations
    /// first, then everything that may reference them.
    pub const ALL: [TagKind; 17] = [
        TagKind::ExportEnum,
        TagKind::ExportType,
        TagKind::Enum,
        TagKind::ExportObject,
        TagKind::ExportEntity,
        TagKind::Entity,
        TagKind::ExportProperty,
        TagKind::ExportMethod,
        TagKind::ExportEvent,
        TagKind::PropertyComponent,
        TagKind::Property,
        TagKind::Event,
        TagKind::RemoteCall,
        TagKind::ExportSettings,
        TagKind::Setting,
        TagKind::EngineHook,
        TagKind::CodeGen,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ExportEnum" => TagKind::ExportEnum,
            "ExportType" => TagKind::ExportType,
            "ExportProperty" => TagKind::ExportProperty,
            "ExportMethod" => TagKind::ExportMethod,
            "ExportEvent" => TagKind::ExportEvent,
            "ExportObject" => TagKind::ExportObject,
            "ExportEntity" => TagKind::ExportEntity,
            "ExportSettings" => TagKind::ExportSettings,
            "Entity" => TagKind::Entity,
            "Enum" => TagKind::Enum,
            "PropertyComponent" => TagKind::PropertyComponent,
            "Property" => TagKind::Property,
            "Event" => TagKind::Event,
            "RemoteCall" => TagKind::RemoteCall,
            "Setting" => TagKind::Setting,
            "EngineHook" => TagKind::EngineHook,
            "CodeGen" => TagKind::CodeGen,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            TagKind::ExportEnum => "ExportEnum",
            TagKind::ExportType => "ExportType",
            TagKind::ExportProperty => "ExportProperty",
            TagKind::ExportMethod => "ExportMethod",
            TagKind::ExportEvent => "ExportEvent",
            TagKind::ExportObject => "ExportObject",
            TagKind::ExportEntity => "ExportEntity",
            TagKind::ExportSettings => "ExportSettings",
            TagKind::Entity => "Entity",
            TagKind::Enum => "Enum",
            TagKind::PropertyComponent => "PropertyComponent",
            TagKind::Property => "Property",
            TagKind::Event => "Event",
            TagKind::RemoteCall => "RemoteCall",
            TagKind::Setting => "Setting",
            TagKind::EngineHook => "EngineHook",
            TagKind::CodeGen => "CodeGen",
        }
    }

    /// How the scanner captures context for this tag kind.
    pub const fn context_rule(self) -> ContextRule {
        match self {
            // Block captures run to a construct-specific terminator.
            TagKind::ExportEnum => ContextRule::BlockUntil {
                terminator: "};",
                trim_start: true,
            },
            TagKind::ExportObject => ContextRule::BlockUntil {
                terminator: "};",
                trim_start: false,
            },
            TagKind::ExportSettings => ContextRule::BlockUntil {
                terminator: "SETTING_GROUP_END",
                trim_start: false,
            },
            // Single-line captures of the annotated declaration.
            TagKind::ExportMethod | TagKind::EngineHook => ContextRule::NextLine,
            // Single-line captures that also need the enclosing class name.
            TagKind::ExportProperty => ContextRule::NextLineWithClass {
                strip_suffix: Some("Properties"),
            },
            TagKind::ExportEvent => ContextRule::NextLineWithClass { strip_suffix: None },
            // Presence-only markers.
            TagKind::ExportType | TagKind::ExportEntity => ContextRule::Present,
            // Insertion markers record their indentation column.
            TagKind::CodeGen => ContextRule::Indent,
            // Script-side tags are self-contained.
            _ => ContextRule::None,
        }
    }
}

/// Per-kind context capture rule (the scanner's terminal-token table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRule {
    /// No context is captured.
    None,
    /// Capture the line immediately following the tag.
    NextLine,
    /// Capture the following line, prefixed with the name of the enclosing
    /// `class` found by backward scan. `strip_suffix` removes a trailing
    /// class-name suffix (`FooProperties` annotates entity `Foo`).
    NextLineWithClass { strip_suffix: Option<&'static str> },
    /// Capture every following non-empty line (trimmed) up to, exclusive,
    /// the first line starting with `terminator`. `trim_start` controls
    /// whether leading whitespace is ignored when matching the terminator.
    BlockUntil {
        terminator: &'static str,
        trim_start: bool,
    },
    /// Record only that the tag was present.
    Present,
    /// Record the tag's indentation column.
    Indent,
}

/// Captured context for one tag occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagContext {
    None,
    Line(String),
    Block(Vec<String>),
    Present,
    Indent(usize),
}

impl TagContext {
    /// The context as a single line, if this kind captures one.
    pub fn as_line(&self) -> Option<&str> {
        match self {
            TagContext::Line(line) => Some(line),
            _ => None,
        }
    }

    /// The context as a block of lines, if this kind captures one.
    pub fn as_block(&self) -> Option<&[String]> {
        match self {
            TagContext::Block(lines) => Some(lines),
            _ => None,
        }
    }

    /// First context line for diagnostics, if any.
    pub fn first_line(&self) -> &str {
        match self {
            TagContext::Line(line) => line,
            TagContext::Block(lines) => lines.first().map(String::as_str).unwrap_or("(empty)"),
            _ => "(empty)",
        }
    }
}

/// One scanned annotation occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub kind: TagKind,
    pub loc: SourceLoc,
    /// Argument string after the tag name (inline `//` comment stripped).
    pub args: String,
    pub context: TagContext,
    /// Attached doc-comment lines.
    pub doc: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names_roundtrip() {
        for kind in TagKind::ALL {
            assert_eq!(TagKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(TagKind::from_name("ExportWidget"), None);
    }

    #[test]
    fn all_lists_every_kind_once() {
        let mut seen = std::collections::HashSet::new();
        for kind in TagKind::ALL {
            assert!(seen.insert(kind.name()));
        }
        assert_eq!(seen.len(), 17);
    }

    #[test]
    fn script_side_tags_capture_no_context() {
        assert_eq!(TagKind::Property.context_rule(), ContextRule::None);
        assert_eq!(TagKind::Enum.context_rule(), ContextRule::None);
        assert_eq!(TagKind::RemoteCall.context_rule(), ContextRule::None);
    }
}
