//! The fixed output set and the idempotent flush.
//!
//! Every run produces exactly the files in [`OUTPUT_FILES`], no matter which
//! backends are enabled: disabled backends get linkage stubs, units nothing
//! wrote get an empty-file comment, and a failed run rewrites the whole set
//! as `#error` stubs. The build system can therefore depend on the list
//! being stable. Files are only touched when their content actually changes,
//! so a clean re-run invalidates nothing downstream.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use scriptbind_core::error::{Diagnostic, EmitError, ErrorSink};

/// Complete list of generated files, for the multiplayer engine build plus
/// the resource baker.
pub const OUTPUT_FILES: [&str; 24] = [
    "EmbeddedResources-Include.h",
    "Version-Include.h",
    "DebugSettings-Include.h",
    "GenericCode-Common.cpp",
    "DataRegistration-Server.cpp",
    "DataRegistration-Client.cpp",
    "DataRegistration-Mapper.cpp",
    "DataRegistration-Baker.cpp",
    "DataRegistration-ServerCompiler.cpp",
    "DataRegistration-ClientCompiler.cpp",
    "DataRegistration-MapperCompiler.cpp",
    "AngelScriptScripting-Server.cpp",
    "AngelScriptScripting-Client.cpp",
    "AngelScriptScripting-Mapper.cpp",
    "AngelScriptScripting-ServerCompiler.cpp",
    "AngelScriptScripting-ClientCompiler.cpp",
    "AngelScriptScripting-MapperCompiler.cpp",
    "AngelScriptScripting-ServerCompilerValidation.cpp",
    "MonoScripting-Server.cpp",
    "MonoScripting-Client.cpp",
    "MonoScripting-Mapper.cpp",
    "NativeScripting-Server.cpp",
    "NativeScripting-Client.cpp",
    "NativeScripting-Mapper.cpp",
];

/// In-memory buffers for the output set, keyed by file name.
#[derive(Debug, Default)]
pub struct GeneratedFiles {
    files: FxHashMap<&'static str, String>,
}

impl GeneratedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content for one table file. Names outside the table are
    /// rejected so the emitted set can never silently grow.
    pub fn set(&mut self, name: &str, content: String) -> Result<(), EmitError> {
        let key = OUTPUT_FILES
            .iter()
            .copied()
            .find(|f| *f == name)
            .ok_or_else(|| EmitError::UnknownOutput {
                file: name.to_string(),
            })?;
        self.files.insert(key, content);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// Fill every table file nothing wrote with an empty-file comment.
    pub fn fill_missing(&mut self) {
        for name in OUTPUT_FILES {
            self.files
                .entry(name)
                .or_insert_with(|| "// Empty file\n".to_string());
        }
    }

    /// Replace the whole set with compileable failure stubs carrying the
    /// collected diagnostics as comments.
    pub fn stub_all<'a>(&mut self, diags: impl Iterator<Item = &'a Diagnostic>) {
        let content = stub_content(diags);
        for name in OUTPUT_FILES {
            self.files.insert(name, content.clone());
        }
    }

    /// Write the buffers under `dir`, creating it as needed. A file is only
    /// rewritten when its content differs from what is on disk (modulo
    /// trailing whitespace). Returns the number of files written.
    pub fn flush(&self, dir: &Path, sink: &mut ErrorSink) -> usize {
        if let Err(source) = fs::create_dir_all(dir) {
            sink.push(EmitError::WriteFailed {
                path: dir.to_path_buf(),
                source,
            });
            return 0;
        }
        let mut written = 0;
        for name in OUTPUT_FILES {
            let Some(content) = self.files.get(name) else {
                continue;
            };
            let path = dir.join(name);
            let unchanged = fs::read_to_string(&path)
                .map(|existing| existing.trim_end() == content.trim_end())
                .unwrap_or(false);
            if unchanged {
                debug!(file = name, "up to date");
                continue;
            }
            if let Err(source) = fs::write(&path, content) {
                sink.push(EmitError::WriteFailed { path, source });
                continue;
            }
            written += 1;
        }
        info!(written, total = OUTPUT_FILES.len(), "flushed generated files");
        written
    }
}

/// The failure-stub text: a hard compile error plus every collected message.
fn stub_content<'a>(diags: impl Iterator<Item = &'a Diagnostic>) -> String {
    let mut lines = vec![
        String::new(),
        "#error Code generation failed".to_string(),
        String::new(),
        "//  Stub generated due to code generation error".to_string(),
        "//".to_string(),
    ];
    for diag in diags {
        let rendered = diag.render();
        let mut parts = rendered.lines();
        if let Some(first) = parts.next() {
            lines.push(format!("//  {first}"));
        }
        for rest in parts {
            lines.push(format!("//  - {rest}"));
        }
        lines.push("//".to_string());
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use scriptbind_core::error::BuildError;
    use scriptbind_core::loc::SourceLoc;

    #[test]
    fn names_outside_the_table_are_rejected() {
        let mut files = GeneratedFiles::new();
        assert!(files.set("GenericCode-Common.cpp", "x\n".into()).is_ok());
        assert!(files.set("SingleScripting-Single.cpp", "x\n".into()).is_err());
    }

    #[test]
    fn fill_covers_the_whole_table() {
        let mut files = GeneratedFiles::new();
        files.set("Version-Include.h", "v\n".into()).unwrap();
        files.fill_missing();
        assert_eq!(files.get("Version-Include.h"), Some("v\n"));
        assert_eq!(files.get("MonoScripting-Mapper.cpp"), Some("// Empty file\n"));
        for name in OUTPUT_FILES {
            assert!(files.get(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn stub_carries_each_diagnostic() {
        let loc = SourceLoc::new(Arc::new(PathBuf::from("Core.h")), 7);
        let diags = [
            Diagnostic::from(BuildError::UnknownEntity {
                entity: "Critter".into(),
                loc,
            }),
            Diagnostic::from(BuildError::EnumNoZeroEntry {
                name: "CornerType".into(),
            }),
        ];
        let content = stub_content(diags.iter());
        assert!(content.contains("#error Code generation failed"));
        assert!(content.contains("//  entity 'Critter' not found"));
        assert!(content.contains("//  - in Core.h (8)"));
        assert!(content.contains("//  enum 'CornerType' has no zero entry"));
    }

    #[test]
    fn flush_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = GeneratedFiles::new();
        files.fill_missing();
        let mut sink = ErrorSink::new();
        let first = files.flush(dir.path(), &mut sink);
        assert_eq!(first, OUTPUT_FILES.len());
        let second = files.flush(dir.path(), &mut sink);
        assert_eq!(second, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn changed_content_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = GeneratedFiles::new();
        files.fill_missing();
        let mut sink = ErrorSink::new();
        files.flush(dir.path(), &mut sink);
        files
            .set("GenericCode-Common.cpp", "// regenerated\n".into())
            .unwrap();
        assert_eq!(files.flush(dir.path(), &mut sink), 1);
    }
}
