//! Backend emitters.
//!
//! Consumes the validated [`ApiRegistry`](scriptbind_registry::ApiRegistry)
//! and produces the fixed set of generated source files:
//!
//! - [`template`]: marker-based injection into the engine's template files
//! - [`lowering`]: engine-side C++ type spellings shared by all backends
//! - [`generic`]: the backend-independent common unit
//! - [`registration`]: per-target data-registration units
//! - [`angelscript`]: the AngelScript scripting units
//! - [`stubs`]: linkage stubs for backends that are switched off
//! - [`output`]: the output-file table and the idempotent flush
//!
//! [`emit`] drives the whole set. Unit failures are collected into the
//! caller's sink rather than aborting, so one bad declaration reports
//! alongside every other problem of the run.

pub mod angelscript;
pub mod generic;
pub mod lowering;
pub mod output;
pub mod registration;
pub mod stubs;
pub mod template;

use scriptbind_core::decl::{RegTarget, Side, TemplateKind};
use scriptbind_core::error::{EmitError, ErrorSink};
use scriptbind_registry::ApiRegistry;

pub use lowering::{engine_type, entity_base_for};
pub use output::{GeneratedFiles, OUTPUT_FILES};
pub use stubs::Backend;
pub use template::Template;

/// Which scripting backends the engine build has enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub angelscript: bool,
    pub mono: bool,
    pub native: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            angelscript: true,
            mono: false,
            native: false,
        }
    }
}

/// Scripting sides, in emission order.
const SIDES: [Side; 3] = [Side::Server, Side::Client, Side::Mapper];

/// AngelScript unit set: runtime units, compiler units per side, plus the
/// server-side validation compiler.
const ANGELSCRIPT_UNITS: [(Side, bool, bool); 7] = [
    (Side::Server, false, false),
    (Side::Client, false, false),
    (Side::Server, true, false),
    (Side::Server, true, true),
    (Side::Client, true, false),
    (Side::Mapper, false, false),
    (Side::Mapper, true, false),
];

fn set_unit(
    files: &mut GeneratedFiles,
    sink: &mut ErrorSink,
    name: &str,
    unit: Result<String, EmitError>,
) {
    let result = unit.and_then(|content| files.set(name, content));
    if let Err(err) = result {
        sink.push(err);
    }
}

fn registration_file(target: RegTarget, compiler: bool) -> String {
    format!(
        "DataRegistration-{}{}.cpp",
        target.name(),
        if compiler { "Compiler" } else { "" }
    )
}

/// Produce every generated unit into `files`. Backends that are switched
/// off still yield linkage stubs so the output set stays fixed.
pub fn emit(
    reg: &ApiRegistry,
    opts: EmitOptions,
    files: &mut GeneratedFiles,
    sink: &mut ErrorSink,
) {
    set_unit(files, sink, "GenericCode-Common.cpp", generic_unit(reg));

    let mut registration_units = vec![
        (RegTarget::Baker, false),
        (RegTarget::Mapper, false),
        (RegTarget::Server, false),
        (RegTarget::Client, false),
    ];
    if opts.angelscript {
        registration_units.push((RegTarget::Mapper, true));
        registration_units.push((RegTarget::Server, true));
        registration_units.push((RegTarget::Client, true));
    }
    for (target, compiler) in registration_units {
        set_unit(
            files,
            sink,
            &registration_file(target, compiler),
            registration_unit(reg, target, compiler),
        );
    }

    for (side, compiler, validation) in ANGELSCRIPT_UNITS {
        let name = angelscript::file_name(side, compiler, validation);
        let unit = if opts.angelscript {
            angelscript::generate(reg, side, compiler, validation)
        } else {
            Ok(stubs::disabled_unit(Backend::AngelScript, side, compiler))
        };
        set_unit(files, sink, &name, unit);
    }

    for (backend, enabled) in [(Backend::Mono, opts.mono), (Backend::Native, opts.native)] {
        if enabled {
            sink.push(EmitError::BackendUnavailable {
                backend: backend.name().to_string(),
            });
        }
        for side in SIDES {
            set_unit(
                files,
                sink,
                &format!("{}Scripting-{}.cpp", backend.name(), side.name()),
                Ok(stubs::disabled_unit(backend, side, false)),
            );
        }
    }
}

fn generic_unit(reg: &ApiRegistry) -> Result<String, EmitError> {
    let mut tpl = Template::load(TemplateKind::GenericCode, &reg.markers)?;
    generic::populate(reg, &mut tpl)?;
    Ok(tpl.render())
}

fn registration_unit(
    reg: &ApiRegistry,
    target: RegTarget,
    compiler: bool,
) -> Result<String, EmitError> {
    let mut tpl = Template::load(TemplateKind::DataRegistration, &reg.markers)?;
    registration::populate(reg, target, compiler, &mut tpl)?;
    Ok(tpl.render())
}
