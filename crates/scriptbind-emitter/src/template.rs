//! Template injection.
//!
//! A backend template is an ordinary C++ source file carrying `CodeGen`
//! markers. Emitters queue blocks of lines against marker names; rendering
//! splices each block immediately below its marker, re-indented to the
//! marker's column. Recorded marker offsets are never re-derived, so blocks
//! are applied bottom-to-top and earlier insertions cannot shift later ones.

use std::fs;

use rustc_hash::FxHashMap;

use scriptbind_core::decl::{CodeGenMarker, TemplateKind};
use scriptbind_core::error::EmitError;

#[derive(Debug, Clone, Copy)]
struct MarkerSlot {
    line: usize,
    padding: usize,
}

/// One loaded template with its queued insertions.
#[derive(Debug)]
pub struct Template {
    kind: TemplateKind,
    lines: Vec<String>,
    markers: FxHashMap<String, MarkerSlot>,
    pending: Vec<(MarkerSlot, Vec<String>)>,
}

impl Template {
    /// Load the template file registered by the given markers. All markers
    /// of one kind live in one file; the file is read from the location the
    /// scanner recorded.
    pub fn load(kind: TemplateKind, markers: &[CodeGenMarker]) -> Result<Self, EmitError> {
        let first = markers
            .iter()
            .find(|m| m.template == kind)
            .ok_or_else(|| EmitError::MissingTemplate {
                template: kind.name().to_string(),
            })?;
        let content =
            fs::read_to_string(first.loc.file.as_ref()).map_err(|source| {
                EmitError::TemplateUnreadable {
                    path: first.loc.file.as_ref().clone(),
                    source,
                }
            })?;
        Ok(Self::from_source(kind, &content, markers))
    }

    /// Build from in-memory content, for callers that already hold the file.
    pub fn from_source(kind: TemplateKind, content: &str, markers: &[CodeGenMarker]) -> Self {
        let lines = content.lines().map(str::to_string).collect();
        let markers = markers
            .iter()
            .filter(|m| m.template == kind)
            .map(|m| {
                (
                    m.name.clone(),
                    MarkerSlot {
                        line: m.loc.line as usize,
                        padding: m.padding,
                    },
                )
            })
            .collect();
        Self {
            kind,
            lines,
            markers,
            pending: Vec::new(),
        }
    }

    /// Queue `block` for insertion below `marker`. An empty block is a
    /// no-op, but the marker must still exist.
    pub fn insert(&mut self, marker: &str, block: Vec<String>) -> Result<(), EmitError> {
        let slot = self
            .markers
            .get(marker)
            .copied()
            .ok_or_else(|| EmitError::UnknownMarker {
                template: self.kind.name().to_string(),
                marker: marker.to_string(),
            })?;
        if !block.is_empty() {
            self.pending.push((slot, block));
        }
        Ok(())
    }

    /// Apply all queued insertions bottom-to-top and return the final text.
    pub fn render(mut self) -> String {
        self.pending.sort_by(|a, b| b.0.line.cmp(&a.0.line));
        for (slot, block) in self.pending {
            let at = (slot.line + 1).min(self.lines.len());
            let padded = block
                .into_iter()
                .map(|l| format!("{}{l}", " ".repeat(slot.padding)));
            self.lines.splice(at..at, padded);
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use scriptbind_core::loc::SourceLoc;

    fn marker(name: &str, line: u32, padding: usize) -> CodeGenMarker {
        CodeGenMarker {
            template: TemplateKind::GenericCode,
            loc: SourceLoc::new(Arc::new(PathBuf::from("GenericCode-Template.cpp")), line),
            name: name.into(),
            padding,
            flags: Vec::new(),
        }
    }

    const SOURCE: &str = "\
#include \"Common.h\"

///@ CodeGen Defines
void Setup()
{
    ///@ CodeGen Body
}
";

    #[test]
    fn inserts_below_marker_with_indent() {
        let markers = [marker("Defines", 2, 0), marker("Body", 5, 4)];
        let mut tpl = Template::from_source(TemplateKind::GenericCode, SOURCE, &markers);
        tpl.insert("Body", vec!["DoWork();".into()]).unwrap();
        tpl.insert("Defines", vec!["#define MODE 1".into()]).unwrap();
        let out = tpl.render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[3], "#define MODE 1");
        assert_eq!(lines[6], "    ///@ CodeGen Body");
        assert_eq!(lines[7], "    DoWork();");
    }

    #[test]
    fn insertion_order_does_not_shift_offsets() {
        let markers = [marker("Defines", 2, 0), marker("Body", 5, 4)];
        let mut a = Template::from_source(TemplateKind::GenericCode, SOURCE, &markers);
        a.insert("Defines", vec!["#define A".into()]).unwrap();
        a.insert("Body", vec!["B();".into()]).unwrap();
        let mut b = Template::from_source(TemplateKind::GenericCode, SOURCE, &markers);
        b.insert("Body", vec!["B();".into()]).unwrap();
        b.insert("Defines", vec!["#define A".into()]).unwrap();
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn unknown_marker_is_an_error() {
        let markers = [marker("Body", 5, 4)];
        let mut tpl = Template::from_source(TemplateKind::GenericCode, SOURCE, &markers);
        let err = tpl.insert("Register", vec!["x;".into()]).unwrap_err();
        assert!(matches!(err, EmitError::UnknownMarker { .. }));
    }

    #[test]
    fn empty_block_keeps_template_intact() {
        let markers = [marker("Body", 5, 4)];
        let mut tpl = Template::from_source(TemplateKind::GenericCode, SOURCE, &markers);
        tpl.insert("Body", Vec::new()).unwrap();
        assert_eq!(tpl.render(), SOURCE);
    }
}
