//! The AngelScript backend.
//!
//! One generated unit per (side, compiler, validation) combination. Each
//! unit fills four markers of the AngelScript template: preprocessor
//! defines, the global section (marshalling wrappers, event plumbing,
//! settings accessors, remote call dispatchers), the registration block and
//! the post-registration block.
//!
//! Two type coordinate systems meet here. The script-facing spelling
//! (`dict<hstring, int>@+`, `Item@+`) goes into declaration strings handed
//! to the script engine; the wrapper-facing spelling (`CScriptDict*`,
//! `ItemView*`) shapes the C++ glue the script engine calls through.
//! Compiler units keep every signature but replace bodies with throwing
//! stubs so scripts can be compiled without linking the game.

use scriptbind_core::decl::{
    EntityDecl, EntityFlags, EventDecl, MethodDecl, RegTarget, ScriptLang, SettingMutability, Side,
    TemplateKind,
};
use scriptbind_core::error::EmitError;
use scriptbind_core::unified::{MetaDescriptor, Primitive, UnifiedType};
use scriptbind_registry::ApiRegistry;

use crate::lowering::{engine_type, engine_type_ext, entity_base_for};
use crate::template::Template;

/// Output file name of one unit.
pub fn file_name(side: Side, compiler: bool, validation: bool) -> String {
    format!(
        "AngelScriptScripting-{}{}{}.cpp",
        side.name(),
        if compiler { "Compiler" } else { "" },
        if compiler && validation { "Validation" } else { "" },
    )
}

fn reg_target(side: Side) -> RegTarget {
    match side {
        Side::Server | Side::Common => RegTarget::Server,
        Side::Client => RegTarget::Client,
        Side::Mapper => RegTarget::Mapper,
    }
}

/// Render a complete unit from the scanned AngelScript template.
pub fn generate(
    reg: &ApiRegistry,
    side: Side,
    compiler: bool,
    validation: bool,
) -> Result<String, EmitError> {
    let mut tpl = Template::load(TemplateKind::AngelScript, &reg.markers)?;
    populate(reg, side, compiler, validation, &mut tpl)?;
    Ok(tpl.render())
}

/// Fill the four unit markers of an already-loaded template.
pub fn populate(
    reg: &ApiRegistry,
    side: Side,
    compiler: bool,
    validation: bool,
    tpl: &mut Template,
) -> Result<(), EmitError> {
    debug_assert!(side != Side::Common);
    let backend = Backend {
        reg,
        side,
        rt: reg_target(side),
        compiler,
    };
    tpl.insert("PostRegister", backend.post_register_lines()?)?;
    tpl.insert("Register", backend.register_lines()?)?;
    tpl.insert("Global", backend.global_lines()?)?;
    tpl.insert("Defines", define_lines(side, compiler, validation))?;
    Ok(())
}

fn define_lines(side: Side, compiler: bool, validation: bool) -> Vec<String> {
    let flag = |on: bool| if on { '1' } else { '0' };
    vec![
        format!("#define SERVER_SCRIPTING {}", flag(side == Side::Server)),
        format!("#define CLIENT_SCRIPTING {}", flag(side == Side::Client)),
        format!("#define MAPPER_SCRIPTING {}", flag(side == Side::Mapper)),
        format!("#define COMPILER_MODE {}", flag(compiler)),
        format!("#define COMPILER_VALIDATION_MODE {}", flag(validation)),
    ]
}

/// Wrapper name suffix derived from the parameter descriptors, so that
/// overloads land on distinct C++ symbols.
fn name_mangling(params: &[(UnifiedType, String)]) -> String {
    if params.is_empty() {
        return "0".to_string();
    }
    let mut out = String::new();
    for (ty, _) in params {
        let meta = ty.to_meta();
        for seg in meta.as_str().split('.') {
            let mut chars = seg.chars();
            if let Some(first) = chars.next() {
                out.push(first);
                out.push(seg.chars().last().unwrap_or(first));
            }
        }
    }
    out.retain(|c| c != '|');
    out
}

/// Funcdef name stem shared by the registration line and every use site.
fn funcdef_stem(descriptor: &str) -> String {
    descriptor.replace(['.', '|'], "_")
}

fn prefixed(items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!(", {}", items.join(", "))
    }
}

struct Backend<'a> {
    reg: &'a ApiRegistry,
    side: Side,
    rt: RegTarget,
    compiler: bool,
}

impl Backend<'_> {
    fn unloweable(&self, ty: &UnifiedType) -> EmitError {
        EmitError::Unloweable {
            type_str: ty.to_string(),
            backend: "AngelScript".to_string(),
        }
    }

    /// Declarations from `Common` apply everywhere; the mapper also pulls in
    /// client-side declarations.
    fn allowed(&self, target: Side) -> bool {
        target == Side::Common
            || target == self.side
            || (self.side == Side::Mapper && target == Side::Client)
    }

    fn class_of<'e>(&self, ent: &'e EntityDecl) -> Option<&'e str> {
        if self.side != Side::Server {
            ent.client_class.as_deref()
        } else {
            ent.server_class.as_deref()
        }
    }

    fn engine(&self, ty: &UnifiedType, pass_in: bool) -> Result<String, EmitError> {
        engine_type(self.reg, ty, self.rt, pass_in)
    }

    // ========================================================================
    // Wrapper-facing type spelling
    // ========================================================================

    /// C++ type as seen by the script engine's calling convention. Arrays,
    /// dicts and function arguments arrive as script-engine handles; enums
    /// travel as plain ints.
    fn as_engine(&self, ty: &UnifiedType) -> Result<String, EmitError> {
        match ty.without_ref() {
            UnifiedType::Array(_) => return Ok("CScriptArray*".to_string()),
            UnifiedType::Map(_, _) => return Ok("CScriptDict*".to_string()),
            UnifiedType::Init(_)
            | UnifiedType::Callback(_)
            | UnifiedType::Predicate(_)
            | UnifiedType::ScriptFunc(_) => return Ok("asIScriptFunction*".to_string()),
            UnifiedType::EntityBase => return Ok(entity_base_for(self.rt).to_string()),
            UnifiedType::ObjInfo(name) => {
                return Ok(format!("[[maybe_unused]] void* obj{name}Ptr, int"));
            }
            UnifiedType::Named(name) => {
                if let Some(ent) = self.reg.entity(name) {
                    let class = self.class_of(ent).ok_or_else(|| self.unloweable(ty))?;
                    return Ok(format!("{class}*"));
                }
                if self.reg.is_object(name) || self.reg.is_entity_relative(name) {
                    return Ok(format!("{name}*"));
                }
            }
            _ => {}
        }
        let base = match ty.without_ref() {
            UnifiedType::Named(name) if self.reg.is_enum(name) => "int".to_string(),
            UnifiedType::Named(name) => name.clone(),
            UnifiedType::Prim(Primitive::Any) => "any_t".to_string(),
            UnifiedType::Prim(p) => p.name().to_string(),
            _ => return Err(self.unloweable(ty)),
        };
        Ok(if ty.is_ref() {
            format!("{base}&")
        } else {
            base
        })
    }

    // ========================================================================
    // Script-facing type spelling
    // ========================================================================

    /// AngelScript declaration spelling. Reference types get an auto-handle
    /// suffix except in positions that pass ownership; container arguments
    /// are const unless suppressed.
    fn as_type(
        &self,
        ty: &UnifiedType,
        no_handle: bool,
        is_ret: bool,
        force_no_const: bool,
    ) -> Result<String, EmitError> {
        let is_ref = ty.is_ref();
        let no_handle = no_handle || is_ref;
        let base = ty.without_ref();
        let handle = if no_handle {
            ""
        } else if !is_ret {
            "@+"
        } else if matches!(base, UnifiedType::Array(_) | UnifiedType::Map(_, _)) {
            "@"
        } else {
            "@+"
        };
        let spelled = match base {
            UnifiedType::Map(key, value) => {
                let mut r = format!(
                    "dict<{}, {}>{handle}",
                    self.as_type(key, true, false, false)?,
                    self.as_type(value, true, false, false)?
                );
                if !is_ret && !no_handle && !force_no_const {
                    r = format!("const {r}");
                }
                r
            }
            UnifiedType::Array(elem) => {
                let mut r = format!("{}[]{handle}", self.as_type(elem, true, false, false)?);
                if !is_ret && !no_handle && !force_no_const {
                    r = format!("const {r}");
                }
                r
            }
            UnifiedType::Init(inner) => {
                format!("{}InitFunc{handle}", self.as_type(inner, true, false, false)?)
            }
            UnifiedType::Callback(inner) => {
                format!("{}Callback{handle}", self.as_type(inner, true, false, false)?)
            }
            UnifiedType::Predicate(inner) => {
                format!("{}Predicate{handle}", self.as_type(inner, true, false, false)?)
            }
            UnifiedType::EntityBase => format!("Entity{handle}"),
            UnifiedType::ObjInfo(_) => return Ok("?&in".to_string()),
            UnifiedType::ScriptFunc(args) => {
                debug_assert!(!is_ret);
                let stem = funcdef_stem(&script_func_descriptor(args));
                return Ok(format!("Generic_{stem}_Func@+"));
            }
            UnifiedType::Named(name) => {
                if self.reg.is_enum(name) {
                    name.clone()
                } else if self.reg.is_entity(name)
                    || self.reg.is_object(name)
                    || self.reg.is_entity_relative(name)
                {
                    format!("{name}{handle}")
                } else {
                    name.clone()
                }
            }
            UnifiedType::Prim(p) => p.name().to_string(),
            UnifiedType::Ref(_) => return Err(self.unloweable(ty)),
        };
        Ok(if is_ref {
            format!("{spelled}&")
        } else {
            spelled
        })
    }

    // ========================================================================
    // Marshalling expressions
    // ========================================================================

    /// Script value into engine value, used on wrapper entry.
    fn marshal_in(&self, ty: &UnifiedType, v: &str) -> Result<String, EmitError> {
        Ok(match ty.without_ref() {
            UnifiedType::Map(key, value) => format!(
                "MarshalDict<{}, {}, {}, {}>(GET_AS_ENGINE_FROM_SELF(), {v})",
                self.engine(key, false)?,
                self.engine(value, false)?,
                self.as_engine(key)?,
                self.as_engine(value)?
            ),
            UnifiedType::Array(elem) => format!(
                "MarshalArray<{}, {}>(GET_AS_ENGINE_FROM_SELF(), {v})",
                self.engine(elem, false)?,
                self.as_engine(elem)?
            ),
            UnifiedType::Init(_) | UnifiedType::Callback(_) | UnifiedType::Predicate(_) => {
                format!("GetASFuncName({v}, *self->GetEngine())")
            }
            UnifiedType::ScriptFunc(args) => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(engine_type_ext(self.reg, arg, self.rt, false, true)?);
                }
                format!(
                    "GetASScriptFunc<{}>({v}, GET_SCRIPT_SYS_FROM_SELF())",
                    parts.join(", ")
                )
            }
            UnifiedType::ObjInfo(_) => format!("GetASObjectInfo({v}Ptr, {v})"),
            UnifiedType::Named(name) if self.reg.is_engine_enum(name) => {
                format!("static_cast<{name}>({v})")
            }
            UnifiedType::Named(name) if self.reg.is_script_enum(name) => {
                let underlying = self
                    .reg
                    .enum_underlying(name)
                    .ok_or_else(|| self.unloweable(ty))?;
                format!("static_cast<ScriptEnum_{}>({v})", underlying.name())
            }
            _ => v.to_string(),
        })
    }

    /// Engine value into script value, used on wrapper exit and event entry.
    fn marshal_back(&self, ty: &UnifiedType, v: &str) -> Result<String, EmitError> {
        Ok(match ty.without_ref() {
            UnifiedType::Map(key, value) => format!(
                "MarshalBackDict<{}, {}, {}, {}>(GET_AS_ENGINE_FROM_SELF(), \"dict<{}, {}>\", {v})",
                self.engine(key, false)?,
                self.engine(value, false)?,
                self.as_engine(key)?,
                self.as_engine(value)?,
                self.as_type(key, true, false, false)?,
                self.as_type(value, true, false, false)?
            ),
            UnifiedType::Array(elem) => format!(
                "MarshalBackArray<{}, {}>(GET_AS_ENGINE_FROM_SELF(), \"{}[]\", {v})",
                self.engine(elem, false)?,
                self.as_engine(elem)?,
                self.as_type(elem, true, false, false)?
            ),
            UnifiedType::Named(name) if self.reg.is_enum(name) => {
                format!("static_cast<int>({v})")
            }
            _ => v.to_string(),
        })
    }

    /// Write-back of a mutated script container into the script-side value.
    fn marshal_back_ref(
        &self,
        ty: &UnifiedType,
        v: &str,
        v2: &str,
    ) -> Result<Option<String>, EmitError> {
        if !ty.is_ref() {
            return Ok(None);
        }
        Ok(match ty.without_ref() {
            UnifiedType::Map(key, value) => {
                let k = self.as_engine(key)?;
                Some(format!(
                    "AssignDict<{k}, {k}, {k}, {}>(GET_AS_ENGINE_FROM_SELF(), {v}, {v2})",
                    self.as_engine(value)?
                ))
            }
            UnifiedType::Array(elem) => Some(format!(
                "AssignArray<{}, {}>(GET_AS_ENGINE_FROM_SELF(), {v2}, {v})",
                self.engine(elem, false)?,
                self.as_engine(elem)?
            )),
            UnifiedType::Named(name) if self.reg.is_enum(name) => {
                Some(format!("{v} = static_cast<int>({v2})"))
            }
            _ => None,
        })
    }

    /// Write-back in the opposite direction, used after an event ran.
    fn marshal_back_ref2(
        &self,
        ty: &UnifiedType,
        v: &str,
        v2: &str,
    ) -> Result<Option<String>, EmitError> {
        if !ty.is_ref() {
            return Ok(None);
        }
        Ok(match ty.without_ref() {
            UnifiedType::Map(key, value) => {
                let k = self.as_engine(key)?;
                Some(format!(
                    "{v2} = MarshalDict<{k}, {k}, {k}, {}>(GET_AS_ENGINE_FROM_SELF(), {v})",
                    self.as_engine(value)?
                ))
            }
            UnifiedType::Array(elem) => Some(format!(
                "{v2} = MarshalArray<{}, {}>(GET_AS_ENGINE_FROM_SELF(), {v})",
                self.engine(elem, false)?,
                self.as_engine(elem)?
            )),
            inner @ UnifiedType::Named(name) if self.reg.is_enum(name) => Some(format!(
                "{v2} = static_cast<{}>({v})",
                self.engine(inner, false)?
            )),
            _ => None,
        })
    }

    fn marshal_back_release(&self, ty: &UnifiedType, v: &str) -> Option<String> {
        match ty.without_ref() {
            UnifiedType::Map(_, _) | UnifiedType::Array(_) => Some(format!("{v}->Release()")),
            _ => None,
        }
    }

    fn is_entity_param(&self, ty: &UnifiedType) -> bool {
        matches!(ty, UnifiedType::Named(name) if self.reg.is_entity(name))
    }

    /// Push `ctx->SetArg...` calls for already-marshalled `as_<name>`
    /// values, one per argument starting at `index`.
    fn ctx_set_args(
        &self,
        args: &[(UnifiedType, String)],
        mut index: usize,
        lines: &mut Vec<String>,
    ) {
        for (ty, name) in args {
            let line = if ty.is_ref() {
                format!("ctx->SetArgAddress({index}, &as_{name});")
            } else {
                match ty {
                    UnifiedType::Map(_, _) | UnifiedType::Array(_) | UnifiedType::EntityBase => {
                        format!("ctx->SetArgObject({index}, as_{name});")
                    }
                    UnifiedType::Named(n)
                        if self.reg.is_entity(n) || self.reg.is_object(n) =>
                    {
                        format!("ctx->SetArgObject({index}, as_{name});")
                    }
                    UnifiedType::Named(n) if self.reg.is_entity_relative(n) => {
                        format!("ctx->SetArgObject({index}, (void*)as_{name});")
                    }
                    UnifiedType::Prim(Primitive::String) => {
                        format!("ctx->SetArgObject({index}, &as_{name});")
                    }
                    UnifiedType::Prim(Primitive::Int8 | Primitive::Uint8 | Primitive::Bool) => {
                        format!("ctx->SetArgByte({index}, as_{name});")
                    }
                    UnifiedType::Prim(Primitive::Int16 | Primitive::Uint16) => {
                        format!("ctx->SetArgWord({index}, as_{name});")
                    }
                    UnifiedType::Prim(Primitive::Int | Primitive::Uint) => {
                        format!("ctx->SetArgDWord({index}, as_{name});")
                    }
                    UnifiedType::Named(n) if self.reg.is_enum(n) => {
                        format!("ctx->SetArgDWord({index}, as_{name});")
                    }
                    UnifiedType::Prim(Primitive::Int64 | Primitive::Uint64) => {
                        format!("ctx->SetArgQWord({index}, as_{name});")
                    }
                    UnifiedType::Prim(Primitive::Float) => {
                        format!("ctx->SetArgFloat({index}, as_{name});")
                    }
                    UnifiedType::Prim(Primitive::Double) => {
                        format!("ctx->SetArgDouble({index}, as_{name});")
                    }
                    UnifiedType::Prim(Primitive::HString) => {
                        format!("ctx->SetArgObject({index}, &as_{name});")
                    }
                    UnifiedType::Named(n) if self.reg.is_custom_type(n) => {
                        format!("ctx->SetArgObject({index}, &as_{name});")
                    }
                    _ => "static_assert(false, \"Invalid configuration\");".to_string(),
                }
            };
            lines.push(format!("    {line}"));
            index += 1;
        }
    }

    // ========================================================================
    // Global section
    // ========================================================================

    fn global_lines(&self) -> Result<Vec<String>, EmitError> {
        let mut g = Vec::new();

        g.push("// User entities info".to_string());
        for ent in &self.reg.entities {
            if ent.exported || self.class_of(ent).is_none() {
                continue;
            }
            g.push(format!("struct {}Info", ent.name));
            g.push("{".to_string());
            g.push(format!(
                "    static constexpr string_view ENTITY_CLASS_NAME = \"{}\";",
                ent.name
            ));
            g.push("};".to_string());
        }
        g.push(String::new());

        if self.compiler {
            g.push("// Compiler entity stubs".to_string());
            for ent in &self.reg.entities {
                let Some(class) = self.class_of(ent) else {
                    continue;
                };
                if !ent.exported {
                    continue;
                }
                g.push(format!("struct {class} : BaseEntity {{ }};"));
                if ent.flags.contains(EntityFlags::HAS_STATICS) {
                    g.push(format!("struct Static{} : BaseEntity {{ }};", ent.name));
                }
            }
            g.push(String::new());

            g.push("// Scriptable objects".to_string());
            for obj in &self.reg.objects {
                if !self.allowed(obj.target) {
                    continue;
                }
                g.push(format!("struct {}", obj.name));
                g.push("{".to_string());
                g.push("    void AddRef() { }".to_string());
                g.push("    void Release() { }".to_string());
                g.push("    int RefCounter;".to_string());
                for field in &obj.fields {
                    g.push(format!("    {} {};", self.as_engine(&field.ty)?, field.name));
                }
                for method in &obj.methods {
                    g.push(format!(
                        "    {} {}() {{ }}",
                        self.as_engine(&method.ret)?,
                        method.name
                    ));
                }
                g.push("};".to_string());
                g.push(String::new());
            }
        }

        g.push("// Marshalling entity methods".to_string());
        for ent in &self.reg.entities {
            for method in &self.reg.methods {
                if method.entity == ent.name && self.allowed(method.target) {
                    self.method_wrapper(ent, method, &mut g)?;
                }
            }
        }

        g.push("// Marshalling events".to_string());
        for ent in &self.reg.entities {
            for event in self.reg.all_events() {
                if event.entity == ent.name && self.allowed(event.target) {
                    self.event_plumbing(ent, event, &mut g)?;
                }
            }
        }

        self.settings_accessors(&mut g)?;
        self.remote_call_dispatchers(&mut g)?;
        Ok(g)
    }

    fn method_wrapper(
        &self,
        ent: &EntityDecl,
        method: &MethodDecl,
        g: &mut Vec<String>,
    ) -> Result<(), EmitError> {
        let entity_ty = UnifiedType::Named(ent.name.clone());
        let class = self
            .class_of(ent)
            .ok_or_else(|| self.unloweable(&entity_ty))?;

        // The game singleton is special-cased: the mapper wraps FOMapper,
        // and common externs land on the shared engine base.
        let mut self_class = class.to_string();
        let mut extern_class = class.to_string();
        if ent.name == "Game" {
            if self.side == Side::Mapper {
                self_class = "FOMapper".to_string();
            }
            match method.target {
                Side::Common => extern_class = "FOEngineBase".to_string(),
                Side::Mapper => extern_class = "FOMapper".to_string(),
                _ => {}
            }
        }

        let symbol = format!(
            "AS_{}_{}_{}_{}",
            method.target.name(),
            ent.name,
            method.name,
            name_mangling(&method.params)
        );
        let extern_symbol = format!("{}_{}_{}", method.target.name(), ent.name, method.name);

        let mut as_params = Vec::with_capacity(method.params.len());
        for (ty, name) in &method.params {
            as_params.push(format!("{} {name}", self.as_engine(ty)?));
        }
        g.push(format!(
            "static {} {symbol}({self_class}* self{})",
            self.as_engine(&method.ret)?,
            prefixed(&as_params)
        ));
        g.push("{".to_string());
        g.push("    STACK_TRACE_ENTRY();".to_string());

        if !self.compiler {
            g.push("    ENTITY_VERIFY_NULL(self);".to_string());
            g.push("    ENTITY_VERIFY(self);".to_string());
            for (ty, name) in &method.params {
                if self.is_entity_param(ty) {
                    g.push(format!("    ENTITY_VERIFY({name});"));
                }
            }
            for (ty, name) in &method.params {
                g.push(format!(
                    "    auto&& in_{name} = {};",
                    self.marshal_in(ty, name)?
                ));
            }
            let mut extern_params = Vec::with_capacity(method.params.len());
            for (ty, _) in &method.params {
                extern_params.push(self.engine(ty, true)?);
            }
            g.push(format!(
                "    extern {} {extern_symbol}({extern_class}*{});",
                self.engine(&method.ret, false)?,
                prefixed(&extern_params)
            ));
            let in_args: Vec<String> = method
                .params
                .iter()
                .map(|(_, name)| format!("in_{name}"))
                .collect();
            g.push(format!(
                "    {}{extern_symbol}(self{});",
                if method.ret.is_void() {
                    ""
                } else {
                    "auto out_result = "
                },
                prefixed(&in_args)
            ));
            for (ty, name) in &method.params {
                if let Some(back) = self.marshal_back_ref(ty, name, &format!("in_{name}"))? {
                    g.push(format!("    {back};"));
                }
            }
            if !method.ret.is_void() {
                g.push(format!(
                    "    return {};",
                    self.marshal_back(&method.ret, "out_result")?
                ));
            }
        } else {
            g.push("    UNUSED_VARIABLE(self);".to_string());
            for (_, name) in &method.params {
                g.push(format!("    UNUSED_VARIABLE({name});"));
            }
            g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
        }

        g.push("}".to_string());
        g.push(String::new());
        Ok(())
    }

    fn event_plumbing(
        &self,
        ent: &EntityDecl,
        event: &EventDecl,
        g: &mut Vec<String>,
    ) -> Result<(), EmitError> {
        let is_global = ent.flags.contains(EntityFlags::GLOBAL);
        let func_entry = format!("ASEvent_{}_{}", ent.name, event.name);
        let entity_ty = UnifiedType::Named(ent.name.clone());
        let entity_arg = format!("{} self", self.engine(&entity_ty, true)?);

        if !event.exported {
            g.push(format!(
                "static string {func_entry}_Name = \"{}\";",
                event.name
            ));
        }

        if !self.compiler {
            g.push(format!(
                "static bool {func_entry}_Callback({entity_arg}, asIScriptFunction* func, const initializer_list<void*>& args)"
            ));
            g.push("{".to_string());
            g.push("    STACK_TRACE_ENTRY();".to_string());
            g.push("    ENTITY_VERIFY_NULL(self);".to_string());
            g.push("    ENTITY_VERIFY_RETURN(self, true);".to_string());
            g.push("    UNUSED_VARIABLE(args);".to_string());
            for (index, (ty, name)) in event.args.iter().enumerate() {
                let mut arg_ty = self.engine(ty, false)?;
                if arg_ty.ends_with('&') {
                    arg_ty.pop();
                }
                g.push(format!(
                    "    auto&& arg_{name} = *reinterpret_cast<{arg_ty}*>(const_cast<void*>(*(args.begin() + {index})));"
                ));
                if self.is_entity_param(ty) {
                    g.push(format!("    ENTITY_VERIFY_RETURN(arg_{name}, true);"));
                }
            }
            for (ty, name) in &event.args {
                g.push(format!(
                    "    auto&& as_{name} = {};",
                    self.marshal_back(ty, &format!("arg_{name}"))?
                ));
            }
            g.push("    auto* script_sys = GET_SCRIPT_SYS_FROM_SELF();".to_string());
            g.push("    auto* ctx = script_sys->PrepareContext(func);".to_string());
            if !is_global {
                g.push("    ctx->SetArgObject(0, self);".to_string());
            }
            self.ctx_set_args(&event.args, if is_global { 0 } else { 1 }, g);
            g.push("    auto event_result = true;".to_string());
            g.push(
                "    if (script_sys->RunContext(ctx, func->GetReturnTypeId() == asTYPEID_VOID)) {"
                    .to_string(),
            );
            g.push(
                "        event_result = (func->GetReturnTypeId() == asTYPEID_VOID || (func->GetReturnTypeId() == asTYPEID_BOOL && ctx->GetReturnByte() != 0));"
                    .to_string(),
            );
            for (ty, name) in &event.args {
                if let Some(back) =
                    self.marshal_back_ref2(ty, &format!("as_{name}"), &format!("arg_{name}"))?
                {
                    g.push(format!("        {back};"));
                }
            }
            g.push("        script_sys->ReturnContext(ctx);".to_string());
            g.push("    }".to_string());
            for (ty, name) in &event.args {
                if let Some(release) = self.marshal_back_release(ty, &format!("as_{name}")) {
                    g.push(format!("    {release};"));
                }
            }
            g.push("    return event_result;".to_string());
            g.push("}".to_string());
        }

        g.push(format!(
            "static void {func_entry}_Subscribe({entity_arg}, asIScriptFunction* func)"
        ));
        g.push("{".to_string());
        if !self.compiler {
            g.push("    STACK_TRACE_ENTRY();".to_string());
            g.push("    ENTITY_VERIFY_NULL(self);".to_string());
            g.push("    ENTITY_VERIFY(self);".to_string());
            g.push("    auto event_data = Entity::EventCallbackData();".to_string());
            g.push(
                "    event_data.SubscribtionPtr = (func->GetFuncType() == asFUNC_DELEGATE ? func->GetDelegateFunction() : func);"
                    .to_string(),
            );
            g.push(
                "    event_data.Callback = [self, func = RefCountHolder(func)](const initializer_list<void*>& args) {"
                    .to_string(),
            );
            g.push(format!(
                "        return {func_entry}_Callback(self, func.get(), args);"
            ));
            g.push("    };".to_string());
            if event.exported {
                g.push(format!(
                    "    self->{}.Subscribe(std::move(event_data));",
                    event.name
                ));
            } else {
                g.push(format!(
                    "    self->SubscribeEvent({func_entry}_Name, std::move(event_data));"
                ));
            }
        } else {
            g.push("    UNUSED_VARIABLE(self);".to_string());
            g.push("    UNUSED_VARIABLE(func);".to_string());
            g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
        }
        g.push("}".to_string());

        g.push(format!(
            "static void {func_entry}_Unsubscribe({entity_arg}, asIScriptFunction* func)"
        ));
        g.push("{".to_string());
        if !self.compiler {
            g.push("    STACK_TRACE_ENTRY();".to_string());
            g.push("    ENTITY_VERIFY_NULL(self);".to_string());
            g.push("    ENTITY_VERIFY(self);".to_string());
            if event.exported {
                g.push(format!(
                    "    self->{}.Unsubscribe(func->GetFuncType() == asFUNC_DELEGATE ? func->GetDelegateFunction() : func);",
                    event.name
                ));
            } else {
                g.push(format!(
                    "    self->UnsubscribeEvent({func_entry}_Name, func->GetFuncType() == asFUNC_DELEGATE ? func->GetDelegateFunction() : func);"
                ));
            }
        } else {
            g.push("    UNUSED_VARIABLE(self);".to_string());
            g.push("    UNUSED_VARIABLE(func);".to_string());
            g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
        }
        g.push("}".to_string());

        g.push(format!(
            "static void {func_entry}_UnsubscribeAll({entity_arg})"
        ));
        g.push("{".to_string());
        if !self.compiler {
            g.push("    STACK_TRACE_ENTRY();".to_string());
            g.push("    ENTITY_VERIFY_NULL(self);".to_string());
            g.push("    ENTITY_VERIFY(self);".to_string());
            if event.exported {
                g.push(format!("    self->{}.UnsubscribeAll();", event.name));
            } else {
                g.push(format!(
                    "    self->UnsubscribeAllEvent({func_entry}_Name);"
                ));
            }
        } else {
            g.push("    UNUSED_VARIABLE(self);".to_string());
            g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
        }
        g.push("}".to_string());

        // Script-declared events are also fireable from scripts.
        if !event.exported {
            let mut as_args = Vec::with_capacity(event.args.len());
            for (ty, name) in &event.args {
                as_args.push(format!("{} {name}", self.as_engine(ty)?));
            }
            g.push(format!(
                "static bool {func_entry}_Fire({entity_arg}{})",
                prefixed(&as_args)
            ));
            g.push("{".to_string());
            if !self.compiler {
                g.push("    STACK_TRACE_ENTRY();".to_string());
                g.push("    ENTITY_VERIFY_NULL(self);".to_string());
                g.push("    ENTITY_VERIFY_RETURN(self, true);".to_string());
                for (ty, name) in &event.args {
                    if self.is_entity_param(ty) {
                        g.push(format!("    ENTITY_VERIFY_RETURN({name}, true);"));
                    }
                }
                for (ty, name) in &event.args {
                    g.push(format!(
                        "    auto&& in_{name} = {};",
                        self.marshal_in(ty, name)?
                    ));
                }
                let fire_args: Vec<String> = event
                    .args
                    .iter()
                    .map(|(_, name)| format!("&in_{name}"))
                    .collect();
                g.push(format!(
                    "    return self->FireEvent({func_entry}_Name, {{{}}});",
                    fire_args.join(", ")
                ));
            } else {
                g.push("    UNUSED_VARIABLE(self);".to_string());
                for (_, name) in &event.args {
                    g.push(format!("    UNUSED_VARIABLE({name});"));
                }
                g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
            }
            g.push("}".to_string());
        }
        g.push(String::new());
        Ok(())
    }

    fn settings_accessors(&self, g: &mut Vec<String>) -> Result<(), EmitError> {
        g.push("// Marshalling settings".to_string());
        let any_visible = self
            .reg
            .settings_groups
            .iter()
            .any(|group| self.allowed(group.target) && !group.entries.is_empty())
            || self.reg.settings.iter().any(|s| self.allowed(s.target));
        if !any_visible {
            return Ok(());
        }
        let game = UnifiedType::Named("Game".to_string());
        let sett_entity = format!("{} self", self.engine(&game, false)?);

        for group in &self.reg.settings_groups {
            if !self.allowed(group.target) {
                continue;
            }
            for entry in &group.entries {
                g.push(format!(
                    "static {} ASSetting_Get_{}({sett_entity})",
                    self.as_engine(&entry.ty)?,
                    entry.key
                ));
                g.push("{".to_string());
                if !self.compiler {
                    g.push("    STACK_TRACE_ENTRY();".to_string());
                    g.push(format!(
                        "    return {};",
                        self.marshal_back(&entry.ty, &format!("self->Settings.{}", entry.key))?
                    ));
                } else {
                    g.push("    UNUSED_VARIABLE(self);".to_string());
                    g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
                }
                g.push("}".to_string());
                if entry.mutability == SettingMutability::Variable {
                    g.push(format!(
                        "static void ASSetting_Set_{}({sett_entity}, {} value)",
                        entry.key,
                        self.as_engine(&entry.ty)?
                    ));
                    g.push("{".to_string());
                    if !self.compiler {
                        g.push("    STACK_TRACE_ENTRY();".to_string());
                        g.push(format!(
                            "    self->Settings.{} = {};",
                            entry.key,
                            self.marshal_in(&entry.ty, "value")?
                        ));
                    } else {
                        g.push("    UNUSED_VARIABLE(self);".to_string());
                        g.push("    UNUSED_VARIABLE(value);".to_string());
                        g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
                    }
                    g.push("}".to_string());
                }
                g.push(String::new());
            }
        }

        for setting in &self.reg.settings {
            if !self.allowed(setting.target) {
                continue;
            }
            g.push(format!(
                "static {} ASSetting_Get_{}({sett_entity})",
                self.as_engine(&setting.ty)?,
                setting.name
            ));
            g.push("{".to_string());
            if !self.compiler {
                g.push("    STACK_TRACE_ENTRY();".to_string());
                g.push("    auto* script_sys = GET_SCRIPT_SYS_FROM_SELF();".to_string());
                g.push(format!(
                    "    auto&& value = script_sys->GameEngine->Settings.Custom[\"{}\"];",
                    setting.name
                ));
                g.push(match &setting.ty {
                    UnifiedType::Prim(Primitive::String) => "    return value;".to_string(),
                    UnifiedType::Prim(Primitive::Any) => "    return any_t {value};".to_string(),
                    UnifiedType::Prim(Primitive::Bool) => {
                        "    return _str(value).toBool();".to_string()
                    }
                    UnifiedType::Prim(Primitive::Float | Primitive::Double) => format!(
                        "    return static_cast<{}>(_str(value).toDouble());",
                        self.as_engine(&setting.ty)?
                    ),
                    _ => format!(
                        "    return static_cast<{}>(_str(value).toInt64());",
                        self.as_engine(&setting.ty)?
                    ),
                });
            } else {
                g.push("    UNUSED_VARIABLE(self);".to_string());
                g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
            }
            g.push("}".to_string());

            g.push(format!(
                "static void ASSetting_Set_{}({sett_entity}, {} value)",
                setting.name,
                self.as_engine(&setting.ty)?
            ));
            g.push("{".to_string());
            if !self.compiler {
                g.push("    STACK_TRACE_ENTRY();".to_string());
                g.push("    auto* script_sys = GET_SCRIPT_SYS_FROM_SELF();".to_string());
                g.push(format!(
                    "    script_sys->GameEngine->Settings.Custom[\"{}\"] = _str(\"{{}}\", {});",
                    setting.name,
                    self.marshal_in(&setting.ty, "value")?
                ));
            } else {
                g.push("    UNUSED_VARIABLE(self);".to_string());
                g.push("    UNUSED_VARIABLE(value);".to_string());
                g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
            }
            g.push("}".to_string());
            g.push(String::new());
        }
        Ok(())
    }

    fn opposite(&self) -> Side {
        if self.side == Side::Server {
            Side::Client
        } else {
            Side::Server
        }
    }

    fn rpc_self_arg(&self) -> &'static str {
        if self.side == Side::Server {
            "Player* self"
        } else {
            "PlayerView* self"
        }
    }

    fn remote_call_dispatchers(&self, g: &mut Vec<String>) -> Result<(), EmitError> {
        if !matches!(self.side, Side::Server | Side::Client) {
            return Ok(());
        }
        g.push("// Remote calls dispatchers".to_string());

        for rc in &self.reg.remote_calls {
            if rc.target != self.opposite() || rc.lang != ScriptLang::AngelScript {
                continue;
            }
            let mut as_args = Vec::with_capacity(rc.args.len());
            for (ty, name) in &rc.args {
                as_args.push(format!("{} {name}", self.as_engine(ty)?));
            }
            g.push(format!(
                "static void ASRemoteCall_Send_{}({}{})",
                rc.name,
                self.rpc_self_arg(),
                prefixed(&as_args)
            ));
            g.push("{".to_string());
            if !self.compiler {
                g.push("    STACK_TRACE_ENTRY();".to_string());
                g.push("    ENTITY_VERIFY_NULL(self);".to_string());
                g.push("    ENTITY_VERIFY(self);".to_string());
                g.push(format!("    constexpr uint rpc_num = \"{}\"_hash;", rc.name));
                for (ty, name) in &rc.args {
                    g.push(format!(
                        "    auto&& in_{name} = {};",
                        self.marshal_in(ty, name)?
                    ));
                }
                if self.side == Side::Server {
                    g.push("    auto* conn = self->Connection;".to_string());
                    g.push("    CONNECTION_OUTPUT_BEGIN(conn);".to_string());
                    g.push("    WriteRpcHeader(conn->OutBuf, rpc_num);".to_string());
                    for (_, name) in &rc.args {
                        g.push(format!("    WriteNetBuf(conn->OutBuf, in_{name});"));
                    }
                    g.push("    WriteRpcFooter(conn->OutBuf);".to_string());
                    g.push("    CONNECTION_OUTPUT_END(conn);".to_string());
                } else {
                    g.push("    auto& conn = self->GetEngine()->GetConnection();".to_string());
                    g.push("    WriteRpcHeader(conn.OutBuf, rpc_num);".to_string());
                    for (_, name) in &rc.args {
                        g.push(format!("    WriteNetBuf(conn.OutBuf, in_{name});"));
                    }
                    g.push("    WriteRpcFooter(conn.OutBuf);".to_string());
                }
            } else {
                g.push("    UNUSED_VARIABLE(self);".to_string());
                for (_, name) in &rc.args {
                    g.push(format!("    UNUSED_VARIABLE({name});"));
                }
                g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
            }
            g.push("}".to_string());
            g.push(String::new());
        }

        for rc in &self.reg.remote_calls {
            if rc.target != self.side || rc.lang != ScriptLang::AngelScript {
                continue;
            }
            let head = format!(
                "static void ASRemoteCall_Receive_{}({}, asIScriptFunction* func)",
                rc.name,
                self.rpc_self_arg()
            );
            if !self.compiler {
                g.push(head);
            } else {
                g.push(format!("[[maybe_unused]] {head}"));
            }
            g.push("{".to_string());
            if !self.compiler {
                g.push("    STACK_TRACE_ENTRY();".to_string());
                g.push("    ENTITY_VERIFY_NULL(self);".to_string());
                g.push("    ENTITY_VERIFY(self);".to_string());
                if self.side == Side::Server {
                    g.push("    auto* conn = self->Connection;".to_string());
                    for (ty, name) in &rc.args {
                        g.push(format!("    {} arg_{name};", self.engine(ty, false)?));
                        g.push(format!(
                            "    ReadNetBuf(conn->InBuf, arg_{name}, *self->GetEngine());"
                        ));
                    }
                    g.push("    CHECK_CLIENT_IN_BUF_ERROR(conn);".to_string());
                } else {
                    g.push("    auto& conn = self->GetEngine()->GetConnection();".to_string());
                    for (ty, name) in &rc.args {
                        g.push(format!("    {} arg_{name};", self.engine(ty, false)?));
                        g.push(format!(
                            "    ReadNetBuf(conn.InBuf, arg_{name}, *self->GetEngine());"
                        ));
                    }
                    g.push("    CHECK_SERVER_IN_BUF_ERROR(conn);".to_string());
                }
                for (ty, name) in &rc.args {
                    g.push(format!(
                        "    auto&& as_{name} = {};",
                        self.marshal_back(ty, &format!("arg_{name}"))?
                    ));
                }
                g.push("    auto* script_sys = GET_SCRIPT_SYS_FROM_SELF();".to_string());
                g.push("    auto* ctx = script_sys->PrepareContext(func);".to_string());
                if self.side == Side::Server {
                    g.push("    ctx->SetArgObject(0, self);".to_string());
                    self.ctx_set_args(&rc.args, 1, g);
                } else {
                    self.ctx_set_args(&rc.args, 0, g);
                }
                for (ty, name) in &rc.args {
                    if let Some(release) = self.marshal_back_release(ty, &format!("as_{name}")) {
                        g.push(format!("    {release};"));
                    }
                }
                g.push("    if (script_sys->RunContext(ctx, true)) {".to_string());
                g.push("        script_sys->ReturnContext(ctx);".to_string());
                g.push("    }".to_string());
            } else {
                g.push("    UNUSED_VARIABLE(self);".to_string());
                g.push("    UNUSED_VARIABLE(func);".to_string());
                g.push("    throw ScriptCompilerException(\"Stub\");".to_string());
            }
            g.push("}".to_string());
            g.push(String::new());
        }
        g.push(String::new());
        Ok(())
    }

    // ========================================================================
    // Registration section
    // ========================================================================

    fn register_lines(&self) -> Result<Vec<String>, EmitError> {
        let mut r = Vec::new();

        r.push("// Exported types".to_string());
        for ct in &self.reg.custom_types {
            r.push(format!(
                "{}({}, {});",
                ct.representation.register_macro(),
                ct.name,
                ct.underlying.name()
            ));
        }
        r.push(String::new());

        r.push("// Exported objects".to_string());
        for obj in &self.reg.objects {
            if !self.allowed(obj.target) {
                continue;
            }
            let name = &obj.name;
            r.push(format!(
                "AS_VERIFY(engine->RegisterObjectType(\"{name}\", sizeof({name}), asOBJ_REF));"
            ));
            r.push(format!(
                "AS_VERIFY(engine->RegisterObjectBehaviour(\"{name}\", asBEHAVE_ADDREF, \"void f()\", SCRIPT_METHOD({name}, AddRef), SCRIPT_METHOD_CONV));"
            ));
            r.push(format!(
                "AS_VERIFY(engine->RegisterObjectBehaviour(\"{name}\", asBEHAVE_RELEASE, \"void f()\", SCRIPT_METHOD({name}, Release), SCRIPT_METHOD_CONV));"
            ));
            r.push(format!(
                "AS_VERIFY(engine->RegisterObjectBehaviour(\"{name}\", asBEHAVE_FACTORY, \"{name}@ f()\", SCRIPT_FUNC((ScriptableObject_Factory<{name}>)), SCRIPT_FUNC_CONV));"
            ));
            r.push(format!(
                "AS_VERIFY(engine->RegisterObjectProperty(\"{name}\", \"const int RefCounter\", offsetof({name}, RefCounter)));"
            ));
            for field in &obj.fields {
                r.push(format!(
                    "AS_VERIFY(engine->RegisterObjectProperty(\"{name}\", \"{} {}\", offsetof({name}, {})));",
                    self.as_type(&field.ty, true, false, false)?,
                    field.name,
                    field.name
                ));
            }
            for method in &obj.methods {
                r.push(format!(
                    "AS_VERIFY(engine->RegisterObjectMethod(\"{name}\", \"{} {}()\", SCRIPT_METHOD({name}, {}), SCRIPT_METHOD_CONV));",
                    self.as_type(&method.ret, false, true, false)?,
                    method.name,
                    method.name
                ));
            }
            r.push(String::new());
        }

        r.push("// Register entities".to_string());
        for ent in &self.reg.entities {
            let Some(class) = self.class_of(ent) else {
                continue;
            };
            if !ent.exported {
                r.push(format!(
                    "REGISTER_CUSTOM_ENTITY(\"{}\", {class}, {}Info);",
                    ent.name, ent.name
                ));
            } else if ent.flags.contains(EntityFlags::GLOBAL) {
                r.push(format!("REGISTER_GLOBAL_ENTITY(\"{}\", {class});", ent.name));
            } else {
                r.push(format!("REGISTER_ENTITY(\"{}\", {class});", ent.name));
            }
            if ent.flags.contains(EntityFlags::HAS_ABSTRACT) {
                r.push(format!(
                    "REGISTER_ENTITY_ABSTRACT(\"{}\", {class});",
                    ent.name
                ));
            }
            if ent.flags.contains(EntityFlags::HAS_PROTO) {
                r.push(format!(
                    "REGISTER_ENTITY_PROTO(\"{}\", {class}, Proto{});",
                    ent.name, ent.name
                ));
            }
            if ent.flags.contains(EntityFlags::HAS_STATICS) {
                r.push(format!(
                    "REGISTER_ENTITY_STATICS(\"{}\", {class});",
                    ent.name
                ));
            }
        }
        r.push(String::new());

        r.push("// Generic funcdefs".to_string());
        for fd in &self.reg.generic_funcdefs {
            let mut pieces = Vec::new();
            for piece in fd.as_str().split('|').filter(|p| !p.is_empty()) {
                pieces.push(MetaDescriptor::from_canonical(piece).parse().map_err(
                    |_| EmitError::Unloweable {
                        type_str: fd.as_str().to_string(),
                        backend: "AngelScript".to_string(),
                    },
                )?);
            }
            let Some((ret, args)) = pieces.split_first() else {
                continue;
            };
            let mut arg_spellings = Vec::with_capacity(args.len());
            for arg in args {
                arg_spellings.push(self.as_type(arg, false, false, true)?);
            }
            r.push(format!(
                "AS_VERIFY(engine->RegisterFuncdef(\"{} Generic_{}_Func({})\"));",
                self.as_type(ret, false, false, true)?,
                funcdef_stem(fd.as_str()),
                arg_spellings.join(", ")
            ));
        }
        r.push(String::new());

        r.push("// Register methods".to_string());
        for ent in &self.reg.entities {
            for method in &self.reg.methods {
                if method.entity != ent.name || !self.allowed(method.target) {
                    continue;
                }
                let mut ret_spelling = self.as_type(&method.ret, false, true, false)?;
                if method.flags.iter().any(|f| f == "PassOwnership") {
                    ret_spelling = ret_spelling
                        .strip_suffix('+')
                        .map(str::to_string)
                        .ok_or_else(|| self.unloweable(&method.ret))?;
                }
                let mut params = Vec::with_capacity(method.params.len());
                for (ty, name) in &method.params {
                    params.push(format!("{} {name}", self.as_type(ty, false, false, false)?));
                }
                let script_class = if ent.flags.contains(EntityFlags::GLOBAL) {
                    format!("{}Singleton", ent.name)
                } else {
                    ent.name.clone()
                };
                r.push(format!(
                    "REGISTER_ENTITY_METHOD(\"{script_class}\", \"{ret_spelling} {}({})\", AS_{}_{}_{}_{});",
                    method.name,
                    params.join(", "),
                    method.target.name(),
                    ent.name,
                    method.name,
                    name_mangling(&method.params)
                ));
            }
        }
        r.push(String::new());

        r.push("// Register events".to_string());
        for ent in &self.reg.entities {
            for event in self.reg.all_events() {
                if event.entity != ent.name || !self.allowed(event.target) {
                    continue;
                }
                let is_global = ent.flags.contains(EntityFlags::GLOBAL);
                let func_entry = format!("ASEvent_{}_{}", ent.name, event.name);
                let entity_ty = UnifiedType::Named(ent.name.clone());
                let real_class = self
                    .class_of(ent)
                    .ok_or_else(|| self.unloweable(&entity_ty))?;
                let mut as_args = Vec::with_capacity(event.args.len());
                for (ty, name) in &event.args {
                    as_args.push(format!("{} {name}", self.as_type(ty, false, false, true)?));
                }
                let as_args_ent = if is_global {
                    String::new()
                } else {
                    format!(
                        "{}{}",
                        self.as_type(&entity_ty, false, false, true)?,
                        if event.args.is_empty() { "" } else { ", " }
                    )
                };
                let script_class = if is_global {
                    format!("{}Singleton", ent.name)
                } else {
                    ent.name.clone()
                };
                let register_macro = if event.exported {
                    "REGISTER_ENTITY_EXPORTED_EVENT"
                } else {
                    "REGISTER_ENTITY_SCRIPT_EVENT"
                };
                r.push(format!(
                    "{register_macro}(\"{}\", \"{script_class}\", {real_class}, \"{}\", \"{as_args_ent}\", \"{}\", {func_entry});",
                    ent.name,
                    event.name,
                    as_args.join(", ")
                ));
            }
        }
        r.push(String::new());

        r.push("// Register settings".to_string());
        for group in &self.reg.settings_groups {
            if !self.allowed(group.target) {
                continue;
            }
            for entry in &group.entries {
                r.push(format!(
                    "REGISTER_GET_SETTING({}, \"{} get_{}() const\");",
                    entry.key,
                    self.as_type(&entry.ty, false, true, false)?,
                    entry.key
                ));
                if entry.mutability == SettingMutability::Variable {
                    r.push(format!(
                        "REGISTER_SET_SETTING({}, \"void set_{}({})\");",
                        entry.key,
                        entry.key,
                        self.as_type(&entry.ty, false, false, false)?
                    ));
                }
            }
        }
        for setting in &self.reg.settings {
            if !self.allowed(setting.target) {
                continue;
            }
            r.push(format!(
                "REGISTER_GET_SETTING({}, \"{} get_{}() const\");",
                setting.name,
                self.as_type(&setting.ty, false, true, false)?,
                setting.name
            ));
            r.push(format!(
                "REGISTER_SET_SETTING({}, \"void set_{}({})\");",
                setting.name,
                setting.name,
                self.as_type(&setting.ty, false, false, false)?
            ));
        }
        r.push(String::new());

        if matches!(self.side, Side::Server | Side::Client) {
            r.push("// Register remote call senders".to_string());
            for rc in &self.reg.remote_calls {
                if rc.target != self.opposite() || rc.lang != ScriptLang::AngelScript {
                    continue;
                }
                let mut args = Vec::with_capacity(rc.args.len());
                for (ty, name) in &rc.args {
                    args.push(format!("{} {name}", self.as_type(ty, false, false, false)?));
                }
                r.push(format!(
                    "AS_VERIFY(engine->RegisterObjectMethod(\"RemoteCaller\", \"void {}({})\", SCRIPT_FUNC_THIS(ASRemoteCall_Send_{}), SCRIPT_FUNC_THIS_CONV));",
                    rc.name,
                    args.join(", "),
                    rc.name
                ));
            }
            r.push(String::new());
        }

        Ok(r)
    }

    fn post_register_lines(&self) -> Result<Vec<String>, EmitError> {
        let mut p = Vec::new();
        if !matches!(self.side, Side::Server | Side::Client) {
            return Ok(p);
        }
        p.push("// Bind remote call receivers".to_string());
        for rc in &self.reg.remote_calls {
            if rc.target != self.side || rc.lang != ScriptLang::AngelScript {
                continue;
            }
            let first_arg = if self.side == Side::Server {
                format!(
                    "Player@+ player{}",
                    if rc.args.is_empty() { "" } else { ", " }
                )
            } else {
                String::new()
            };
            let mut args = Vec::with_capacity(rc.args.len());
            for (ty, name) in &rc.args {
                args.push(format!("{} {name}", self.as_type(ty, false, false, true)?));
            }
            p.push(format!(
                "BIND_REMOTE_CALL_RECEIVER(\"{}\", ASRemoteCall_Receive_{}, \"void {}::{}({first_arg}{})\");",
                rc.name,
                rc.name,
                rc.namespace,
                rc.name,
                args.join(", ")
            ));
        }
        p.push(String::new());
        Ok(p)
    }
}

fn script_func_descriptor(args: &[UnifiedType]) -> String {
    args.iter()
        .map(|a| a.to_meta().as_str().to_string())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use scriptbind_core::error::ErrorSink;
    use scriptbind_core::loc::SourceLoc;
    use scriptbind_scanner::{TagSet, scan_source};

    const ENGINE_HEADER: &str = "\
///@ ExportEnum
enum class CornerType : uint8
{
    North = 0,
};

///@ ExportEntity Game FOServer FOClient Global
class GameProperties : public EntityProperties
{
public:
};

///@ ExportEntity Item Item ItemView HasProto
class ItemProperties : public EntityProperties
{
public:
    ///@ ExportProperty
    ENTITY_PROPERTY(Public, uint, Cost);
};

class Item
{
public:
    ///@ ExportEvent
    ENTITY_EVENT(OnWear, uint /*strength*/);
};

///@ ExportMethod
extern uint Server_Item_CountItems(Item* self, hstring protoId);
///@ ExportMethod
extern void Client_Item_Highlight(ItemView* self, bool enable);

///@ ExportSettings Common
SETTING_GROUP(CombatSettings, SettingsBase);
FIXED_SETTING(uint, HitChance, 25);
VARIABLE_SETTING(bool, FriendlyFire, false);
SETTING_GROUP_END();
";

    const SCRIPT_SOURCE: &str = "\
///@ Event Server Item OnLooted (uint amount)
///@ RemoteCall Server TakeLoot (uint lootId, string reason)
///@ RemoteCall Client ShowLoot (uint lootId)
///@ Setting Client uint LootDelay = 3
";

    const TEMPLATE: &str = "\
// Scripting unit
///@ CodeGen Defines
#include \"Scripting.h\"
///@ CodeGen Global
static void Register()
{
    ///@ CodeGen Register
    ///@ CodeGen PostRegister
}
";

    fn fixture() -> ApiRegistry {
        let mut set = TagSet::default();
        let mut sink = ErrorSink::new();
        scan_source(
            Arc::new(PathBuf::from("Core.h")),
            ENGINE_HEADER,
            &mut set,
            &mut sink,
        );
        scan_source(
            Arc::new(PathBuf::from("Loot.fos")),
            SCRIPT_SOURCE,
            &mut set,
            &mut sink,
        );
        let reg = scriptbind_registry::build_registry(&set, &mut sink);
        assert!(sink.is_empty(), "{sink}");
        reg
    }

    fn marker(name: &str, line: u32, padding: usize) -> scriptbind_core::decl::CodeGenMarker {
        scriptbind_core::decl::CodeGenMarker {
            template: TemplateKind::AngelScript,
            loc: SourceLoc::new(
                Arc::new(PathBuf::from("AngelScriptScripting-Template.cpp")),
                line,
            ),
            name: name.into(),
            padding,
            flags: Vec::new(),
        }
    }

    fn unit(reg: &ApiRegistry, side: Side, compiler: bool, validation: bool) -> String {
        let markers = [
            marker("Defines", 1, 0),
            marker("Global", 3, 0),
            marker("Register", 6, 4),
            marker("PostRegister", 7, 4),
        ];
        let mut tpl = Template::from_source(TemplateKind::AngelScript, TEMPLATE, &markers);
        populate(reg, side, compiler, validation, &mut tpl).expect("populate");
        tpl.render()
    }

    #[test]
    fn unit_file_names() {
        assert_eq!(
            file_name(Side::Server, false, false),
            "AngelScriptScripting-Server.cpp"
        );
        assert_eq!(
            file_name(Side::Server, true, true),
            "AngelScriptScripting-ServerCompilerValidation.cpp"
        );
        assert_eq!(
            file_name(Side::Mapper, true, false),
            "AngelScriptScripting-MapperCompiler.cpp"
        );
    }

    #[test]
    fn method_wrapper_marshals_through_an_extern() {
        let reg = fixture();
        let out = unit(&reg, Side::Server, false, false);
        assert!(out.contains("static uint AS_Server_Item_CountItems_hg(Item* self, hstring protoId)"));
        assert!(out.contains("    extern uint Server_Item_CountItems(Item*, hstring);"));
        assert!(out.contains("    auto out_result = Server_Item_CountItems(self, in_protoId);"));
        assert!(out.contains(
            "REGISTER_ENTITY_METHOD(\"Item\", \"uint CountItems(hstring protoId)\", AS_Server_Item_CountItems_hg);"
        ));
        // The client-side method stays out of the server unit.
        assert!(!out.contains("AS_Client_Item_Highlight"));
    }

    #[test]
    fn client_unit_uses_client_classes() {
        let reg = fixture();
        let out = unit(&reg, Side::Client, false, false);
        assert!(out.contains("static void AS_Client_Item_Highlight_bl(ItemView* self, bool enable)"));
        assert!(out.contains("REGISTER_ENTITY(\"Item\", ItemView);"));
        assert!(out.contains("REGISTER_ENTITY_PROTO(\"Item\", ItemView, ProtoItem);"));
        assert!(out.contains("REGISTER_GLOBAL_ENTITY(\"Game\", FOClient);"));
    }

    #[test]
    fn exported_and_script_events_differ_in_dispatch() {
        let reg = fixture();
        let out = unit(&reg, Side::Server, false, false);
        // Exported events dispatch through the member object.
        assert!(out.contains("    self->OnWear.Subscribe(std::move(event_data));"));
        assert!(out.contains(
            "REGISTER_ENTITY_EXPORTED_EVENT(\"Item\", \"Item\", Item, \"OnWear\", \"Item@+, \", \"uint strength\", ASEvent_Item_OnWear);"
        ));
        // Script events dispatch by name and are fireable.
        assert!(out.contains("static string ASEvent_Item_OnLooted_Name = \"OnLooted\";"));
        assert!(out.contains(
            "    return self->FireEvent(ASEvent_Item_OnLooted_Name, {&in_amount});"
        ));
        assert!(out.contains(
            "REGISTER_ENTITY_SCRIPT_EVENT(\"Item\", \"Item\", Item, \"OnLooted\", \"Item@+, \", \"uint amount\", ASEvent_Item_OnLooted);"
        ));
    }

    #[test]
    fn compiler_unit_stubs_bodies_and_entities() {
        let reg = fixture();
        let out = unit(&reg, Side::Server, true, false);
        assert!(out.contains("#define COMPILER_MODE 1"));
        assert!(out.contains("struct Item : BaseEntity { };"));
        assert!(out.contains("struct FOServer : BaseEntity { };"));
        assert!(out.contains("    throw ScriptCompilerException(\"Stub\");"));
        assert!(!out.contains("extern uint Server_Item_CountItems"));
    }

    #[test]
    fn validation_unit_sets_its_define() {
        let reg = fixture();
        let out = unit(&reg, Side::Server, true, true);
        assert!(out.contains("#define COMPILER_VALIDATION_MODE 1"));
        let plain = unit(&reg, Side::Server, true, false);
        assert!(plain.contains("#define COMPILER_VALIDATION_MODE 0"));
    }

    #[test]
    fn remote_calls_split_into_senders_and_receivers() {
        let reg = fixture();
        let server = unit(&reg, Side::Server, false, false);
        // The server sends client-targeted calls and receives its own.
        assert!(server.contains("static void ASRemoteCall_Send_ShowLoot(Player* self, uint lootId)"));
        assert!(server.contains("    CONNECTION_OUTPUT_BEGIN(conn);"));
        assert!(server.contains(
            "static void ASRemoteCall_Receive_TakeLoot(Player* self, asIScriptFunction* func)"
        ));
        assert!(server.contains("    CHECK_CLIENT_IN_BUF_ERROR(conn);"));
        assert!(server.contains(
            "BIND_REMOTE_CALL_RECEIVER(\"TakeLoot\", ASRemoteCall_Receive_TakeLoot, \"void Loot::TakeLoot(Player@+ player, uint lootId, string reason)\");"
        ));

        let client = unit(&reg, Side::Client, false, false);
        assert!(client.contains("static void ASRemoteCall_Send_TakeLoot(PlayerView* self, uint lootId, string reason)"));
        assert!(client.contains("    CHECK_SERVER_IN_BUF_ERROR(conn);"));
        assert!(client.contains(
            "BIND_REMOTE_CALL_RECEIVER(\"ShowLoot\", ASRemoteCall_Receive_ShowLoot, \"void Loot::ShowLoot(uint lootId)\");"
        ));
    }

    #[test]
    fn settings_accessors_cover_groups_and_custom_bag() {
        let reg = fixture();
        let server = unit(&reg, Side::Server, false, false);
        assert!(server.contains("static uint ASSetting_Get_HitChance(FOServer* self)"));
        assert!(server.contains("    return self->Settings.HitChance;"));
        // Fixed entries get no setter; variable ones do.
        assert!(!server.contains("ASSetting_Set_HitChance"));
        assert!(server.contains("static void ASSetting_Set_FriendlyFire(FOServer* self, bool value)"));
        assert!(server.contains("REGISTER_SET_SETTING(FriendlyFire, \"void set_FriendlyFire(bool)\");"));

        // The client-only custom setting lives in the custom bag.
        let client = unit(&reg, Side::Client, false, false);
        assert!(client.contains(
            "    auto&& value = script_sys->GameEngine->Settings.Custom[\"LootDelay\"];"
        ));
        assert!(client.contains("    return static_cast<uint>(_str(value).toInt64());"));
        assert!(client.contains(
            "    script_sys->GameEngine->Settings.Custom[\"LootDelay\"] = _str(\"{}\", value);"
        ));
        assert!(!server.contains("ASSetting_Get_LootDelay"));
    }

    #[test]
    fn generic_funcdefs_register_under_mangled_names() {
        let mut reg = fixture();
        reg.generic_funcdefs
            .insert(MetaDescriptor::from_canonical("void|Item|int"));
        let out = unit(&reg, Side::Server, false, false);
        assert!(out.contains(
            "AS_VERIFY(engine->RegisterFuncdef(\"void Generic_void_Item_int_Func(Item@+, int)\"));"
        ));
    }

    #[test]
    fn mapper_unit_pulls_in_client_declarations() {
        let reg = fixture();
        let out = unit(&reg, Side::Mapper, false, false);
        assert!(out.contains("#define MAPPER_SCRIPTING 1"));
        assert!(out.contains("AS_Client_Item_Highlight_bl"));
        // Remote calls only exist on the two networked sides.
        assert!(!out.contains("ASRemoteCall_Send_"));
    }
}
