//! The generation pipeline: scan, build, emit, flush.
//!
//! Errors never abort mid-phase. Each phase runs to completion collecting
//! diagnostics, and a checkpoint between phases decides whether to go on.
//! A failed run still writes the complete output set as `#error` stubs
//! carrying every diagnostic, so a broken annotation breaks the engine
//! build loudly instead of leaving stale generated code behind.

use std::path::PathBuf;

use tracing::{error, info};

use scriptbind_core::error::ErrorSink;
use scriptbind_emitter::{EmitOptions, GeneratedFiles, emit};
use scriptbind_registry::build_registry;
use scriptbind_scanner::{TagSet, collect_meta_files, scan_file};

use crate::headers;

/// Everything one run needs, resolved from the command line.
#[derive(Debug)]
pub struct PipelineArgs {
    pub meta: Vec<PathBuf>,
    pub output: PathBuf,
    pub build_hash: String,
    pub dev_name: String,
    pub game_name: String,
    pub game_version: String,
    pub config: Vec<String>,
    pub backends: EmitOptions,
}

/// Run the whole pipeline. Returns the process exit code.
pub fn run(args: &PipelineArgs) -> i32 {
    let mut sink = ErrorSink::new();

    let meta_files = collect_meta_files(&args.meta, &mut sink);
    let mut set = TagSet::default();
    for path in &meta_files {
        scan_file(path, &mut set, &mut sink);
    }
    info!(files = meta_files.len(), tags = set.total(), "scan complete");
    if !sink.is_empty() {
        return fail(args, &sink);
    }

    let reg = build_registry(&set, &mut sink);
    if !sink.is_empty() {
        return fail(args, &sink);
    }

    let mut files = GeneratedFiles::new();
    emit(&reg, args.backends, &mut files, &mut sink);
    let headers = [
        (
            "Version-Include.h",
            headers::version_include(
                &args.build_hash,
                &args.dev_name,
                &args.game_name,
                &args.game_version,
            ),
        ),
        ("DebugSettings-Include.h", headers::debug_settings(&args.config)),
    ];
    for (name, content) in headers {
        if let Err(err) = files.set(name, content) {
            sink.push(err);
        }
    }
    if !sink.is_empty() {
        return fail(args, &sink);
    }

    files.fill_missing();
    files.flush(&args.output, &mut sink);
    if sink.is_empty() {
        info!("code generation complete");
        0
    } else {
        error!(errors = sink.len(), "flush failed");
        1
    }
}

/// Replace the output set with failure stubs and report every diagnostic.
fn fail(args: &PipelineArgs, sink: &ErrorSink) -> i32 {
    error!(errors = sink.len(), "code generation failed");
    let mut files = GeneratedFiles::new();
    files.stub_all(sink.iter());
    let mut flush_sink = ErrorSink::new();
    files.flush(&args.output, &mut flush_sink);
    1
}
