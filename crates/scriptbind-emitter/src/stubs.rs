//! Linkage stubs for scripting backends that are switched off.
//!
//! The engine links against `Init<Backend>Scripting` unconditionally, so a
//! disabled backend still produces a translation unit with an empty
//! implementation.

use scriptbind_core::decl::Side;

/// Backend names as they appear in init entry points and file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    AngelScript,
    Mono,
    Native,
}

impl Backend {
    pub const fn name(self) -> &'static str {
        match self {
            Backend::AngelScript => "AngelScript",
            Backend::Mono => "Mono",
            Backend::Native => "Native",
        }
    }
}

/// Contents of a disabled-backend unit. Compiler units cannot include the
/// real scripting header, so they carry their own minimal declaration.
pub fn disabled_unit(backend: Backend, target: Side, compiler: bool) -> String {
    let target = target.name();
    if compiler {
        format!(
            "struct {target}ScriptSystem {{ void InitAngelScriptScripting(string_view); }};\n\
             void {target}ScriptSystem::InitAngelScriptScripting(string_view) {{ }}\n"
        )
    } else {
        format!(
            "#include \"{target}Scripting.h\"\n\
             void {target}ScriptSystem::Init{}Scripting() {{ }}\n",
            backend.name()
        )
    }
}
