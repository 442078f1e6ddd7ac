//! Tag extraction from source files.
//!
//! A tag line has the shape `///@ TagName args... [// doc]`, optionally
//! preceded by `///# doc` lines. Anything else is ignored, so the scanner
//! never needs to understand the host language beyond three lookups:
//!
//! - block captures run forward to a construct-specific terminator line
//! - class captures run backward to the nearest `class X` header
//! - insertion markers record the tag's indentation column
//!
//! Scanning never aborts on a bad tag; problems go to the [`ErrorSink`] and
//! the scan continues with the next line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use scriptbind_core::error::{ErrorSink, ScanError};
use scriptbind_core::loc::SourceLoc;
use scriptbind_core::tags::{ContextRule, TagContext, TagKind, TagRecord};

/// All scanned tag records, grouped by kind. Within a kind, records keep
/// file-then-line order, which later fixes declaration order.
#[derive(Debug, Default)]
pub struct TagSet {
    records: FxHashMap<TagKind, Vec<TagRecord>>,
}

impl TagSet {
    pub fn push(&mut self, record: TagRecord) {
        self.records.entry(record.kind).or_default().push(record);
    }

    /// Records of one kind, in scan order.
    pub fn of(&self, kind: TagKind) -> &[TagRecord] {
        self.records.get(&kind).map_or(&[], Vec::as_slice)
    }

    pub fn total(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}

/// Resolve, dedupe and sort the input file list. Paths under a generated
/// sources directory are dropped so the generator never feeds on its own
/// output.
pub fn collect_meta_files(paths: &[PathBuf], sink: &mut ErrorSink) -> Vec<PathBuf> {
    let mut seen = FxHashSet::default();
    let mut files = Vec::new();
    for path in paths {
        let abs = match path.canonicalize() {
            Ok(abs) => abs,
            Err(err) => {
                sink.push(ScanError::Unreadable {
                    path: path.clone(),
                    source: err,
                });
                continue;
            }
        };
        if abs.components().any(|c| c.as_os_str() == "GeneratedSource") {
            continue;
        }
        if seen.insert(abs.clone()) {
            files.push(abs);
        }
    }
    files.sort();
    files
}

/// Scan one file from disk. Unreadable files are reported and skipped.
pub fn scan_file(path: &Path, set: &mut TagSet, sink: &mut ErrorSink) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            sink.push(ScanError::Unreadable {
                path: path.to_path_buf(),
                source: err,
            });
            return;
        }
    };
    scan_source(Arc::new(path.to_path_buf()), &content, set, sink);
}

/// Scan source text. Split out from [`scan_file`] so tests can feed
/// in-memory sources.
pub fn scan_source(file: Arc<PathBuf>, content: &str, set: &mut TagSet, sink: &mut ErrorSink) {
    // Tolerate a UTF-8 byte order mark.
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let lines: Vec<&str> = content.lines().collect();

    let mut last_comment: Vec<String> = Vec::new();
    let mut found = 0usize;

    for (index, &line) in lines.iter().enumerate() {
        if line.len() < 5 {
            continue;
        }

        let Some(tag_pos) = line.find(|c| c != ' ' && c != '\t') else {
            continue;
        };
        let rest = &line[tag_pos..];
        if rest.len() < 5 || !rest.starts_with("///") {
            continue;
        }

        match rest.as_bytes()[3] {
            b'#' => {
                last_comment.push(rest[4..].trim().to_string());
            }
            b'@' => {
                let loc = SourceLoc::new(Arc::clone(&file), index as u32);
                let mut tag_str = rest[4..].trim();

                // An inline trailer comment truncates the arguments and
                // replaces any accumulated doc block.
                if let Some(comment_pos) = tag_str.find("//") {
                    last_comment = vec![tag_str[comment_pos + 2..].trim().to_string()];
                    tag_str = tag_str[..comment_pos].trim_end();
                }

                let (name, args) = match tag_str.split_once(' ') {
                    Some((name, args)) => (name, args.to_string()),
                    None => (tag_str, String::new()),
                };

                let Some(kind) = TagKind::from_name(name) else {
                    sink.push(ScanError::UnknownTag {
                        name: name.to_string(),
                        loc,
                    });
                    continue;
                };

                if let Some(context) =
                    capture_context(kind, tag_pos, index, &lines, &loc, sink)
                {
                    set.push(TagRecord {
                        kind,
                        loc,
                        args,
                        context,
                        doc: std::mem::take(&mut last_comment),
                    });
                    found += 1;
                } else {
                    last_comment.clear();
                }
            }
            _ => {}
        }
    }

    if found > 0 {
        debug!(file = %file.display(), tags = found, "scanned");
    }
}

/// Capture the context demanded by `kind`'s rule, or report why it can't
/// be captured.
fn capture_context(
    kind: TagKind,
    tag_pos: usize,
    index: usize,
    lines: &[&str],
    loc: &SourceLoc,
    sink: &mut ErrorSink,
) -> Option<TagContext> {
    match kind.context_rule() {
        ContextRule::None => Some(TagContext::None),
        ContextRule::Present => Some(TagContext::Present),
        ContextRule::Indent => Some(TagContext::Indent(tag_pos)),
        ContextRule::NextLine => match lines.get(index + 1) {
            Some(next) => Some(TagContext::Line(next.trim().to_string())),
            None => {
                sink.push(ScanError::MissingContext {
                    kind,
                    loc: loc.clone(),
                });
                None
            }
        },
        ContextRule::NextLineWithClass { strip_suffix } => {
            let Some(next) = lines.get(index + 1) else {
                sink.push(ScanError::MissingContext {
                    kind,
                    loc: loc.clone(),
                });
                return None;
            };
            let next = next.trim();
            match enclosing_class(lines, index, strip_suffix) {
                Some(class_name) => Some(TagContext::Line(format!("{class_name} {next}"))),
                None => {
                    sink.push(ScanError::NoEnclosingClass {
                        kind,
                        loc: loc.clone(),
                    });
                    None
                }
            }
        }
        ContextRule::BlockUntil {
            terminator,
            trim_start,
        } => {
            for end in index + 1..lines.len() {
                let candidate = if trim_start {
                    lines[end].trim_start()
                } else {
                    lines[end]
                };
                if candidate.starts_with(terminator) {
                    let block = lines[index + 1..end]
                        .iter()
                        .map(|l| l.trim().to_string())
                        .filter(|l| !l.is_empty())
                        .collect();
                    return Some(TagContext::Block(block));
                }
            }
            sink.push(ScanError::UnterminatedBlock {
                kind,
                loc: loc.clone(),
            });
            None
        }
    }
}

/// Backward scan for the `class X` header enclosing line `index`. With
/// `strip_suffix` the class name has that trailing suffix removed
/// (`ItemProperties` declares members of entity `Item`).
fn enclosing_class(
    lines: &[&str],
    index: usize,
    strip_suffix: Option<&str>,
) -> Option<String> {
    for probe in lines[..=index].iter().rev() {
        if let Some(after) = probe.strip_prefix("class ") {
            let name = match strip_suffix {
                Some(suffix) => after.split(suffix).next()?,
                None => after.split(' ').next()?,
            };
            return Some(name.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> (TagSet, ErrorSink) {
        let mut set = TagSet::default();
        let mut sink = ErrorSink::new();
        scan_source(
            Arc::new(PathBuf::from("Test.h")),
            content,
            &mut set,
            &mut sink,
        );
        (set, sink)
    }

    #[test]
    fn plain_tag_with_doc_block() {
        let src = "\
///# Checks line of sight.
///# Works on loaded maps only.
///@ ExportMethod
[[maybe_unused]] bool Server_Map_CheckLineOfSight(Map* self, uint16 hx, uint16 hy);
";
        let (set, sink) = scan(src);
        assert!(sink.is_empty());
        let records = set.of(TagKind::ExportMethod);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].doc, ["Checks line of sight.", "Works on loaded maps only."]);
        assert!(records[0].context.as_line().unwrap().contains("CheckLineOfSight"));
    }

    #[test]
    fn inline_comment_truncates_args_and_replaces_doc() {
        let src = "\
///# Stale doc.
///@ Property Item Public bool Hidden // Not shown in inventory
";
        let (set, sink) = scan(src);
        assert!(sink.is_empty());
        let rec = &set.of(TagKind::Property)[0];
        assert_eq!(rec.args, "Item Public bool Hidden");
        assert_eq!(rec.doc, ["Not shown in inventory"]);
    }

    #[test]
    fn unknown_tag_reported_and_scan_continues() {
        let src = "\
///@ ExportWidget Foo
///@ Entity Server Spell
";
        let (set, sink) = scan(src);
        assert_eq!(sink.len(), 1);
        assert_eq!(set.of(TagKind::Entity).len(), 1);
    }

    #[test]
    fn enum_block_capture_stops_at_terminator() {
        let src = "\
///@ ExportEnum
enum class CornerType : uint8
{
    NorthSouth = 0,
    West = 1,

    East = 2,
};
enum class Unrelated : uint8
{
};
";
        let (set, sink) = scan(src);
        assert!(sink.is_empty());
        let rec = &set.of(TagKind::ExportEnum)[0];
        let block = rec.context.as_block().unwrap();
        assert_eq!(block[0], "enum class CornerType : uint8");
        assert!(block.contains(&"East = 2,".to_string()));
        assert!(!block.iter().any(|l| l.contains("Unrelated")));
    }

    #[test]
    fn property_capture_prefixes_entity_from_class() {
        let src = "\
class ItemProperties : public EntityProperties
{
public:
    ///@ ExportProperty
    ENTITY_PROPERTY(PrivateServer, uint, Cost);
};
";
        let (set, sink) = scan(src);
        assert!(sink.is_empty());
        let rec = &set.of(TagKind::ExportProperty)[0];
        assert_eq!(
            rec.context.as_line().unwrap(),
            "Item ENTITY_PROPERTY(PrivateServer, uint, Cost);"
        );
    }

    #[test]
    fn event_capture_prefixes_class_name() {
        let src = "\
class Critter final : public ServerEntity
{
public:
    ///@ ExportEvent
    ENTITY_EVENT(OnIdle);
};
";
        let (set, sink) = scan(src);
        assert!(sink.is_empty());
        let rec = &set.of(TagKind::ExportEvent)[0];
        assert_eq!(rec.context.as_line().unwrap(), "Critter ENTITY_EVENT(OnIdle);");
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let src = "\
///@ ExportEnum
enum class Broken : uint8
{
    A = 0,
";
        let (set, sink) = scan(src);
        assert_eq!(sink.len(), 1);
        assert!(set.of(TagKind::ExportEnum).is_empty());
    }

    #[test]
    fn codegen_marker_records_indent() {
        let src = "    ///@ CodeGen Template AngelScript Register\n";
        let (set, sink) = scan(src);
        assert!(sink.is_empty());
        let rec = &set.of(TagKind::CodeGen)[0];
        assert_eq!(rec.context, TagContext::Indent(4));
    }

    #[test]
    fn short_and_plain_lines_ignored(){
        let (set, sink) = scan("//\nint x;\n// ordinary comment\n//// four slashes\n");
        assert!(sink.is_empty());
        assert_eq!(set.total(), 0);
    }
}
