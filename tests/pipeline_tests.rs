//! End-to-end pipeline runs against an on-disk fixture project.

use std::fs;
use std::path::{Path, PathBuf};

use scriptbind::pipeline::{self, PipelineArgs};
use scriptbind_emitter::{EmitOptions, OUTPUT_FILES};

const ENGINE_HEADER: &str = "\
///@ ExportEntity Game FOServer FOClient Global
///@ ExportEntity Item Item ItemView
class ItemProperties : public EntityProperties
{
public:
    ///@ ExportProperty
    ENTITY_PROPERTY(Public, uint, Cost);
    ///@ ExportProperty
    ENTITY_PROPERTY(Public, uint, Weight);
};

///@ ExportMethod
extern void Server_Item_Drop(Item* self, uint count);
";

const SCRIPT_SOURCE: &str = "\
///@ Setting Server uint SpawnRate = 3
";

const GENERIC_TEMPLATE: &str = "\
#include \"Common.h\"
///@ CodeGen Body
";

const REGISTRATION_TEMPLATE: &str = "\
///@ CodeGen Defines
void RegisterData()
{
    ///@ CodeGen ServerRegister
    ///@ CodeGen ClientRegister
    ///@ CodeGen MapperRegister
    ///@ CodeGen BakerRegister
    ///@ CodeGen CompilerRegister
    ///@ CodeGen WriteRestoreInfo
}
";

const ANGELSCRIPT_TEMPLATE: &str = "\
///@ CodeGen Defines
#include \"Scripting.h\"
///@ CodeGen Global
static void Register()
{
    ///@ CodeGen Register
    ///@ CodeGen PostRegister
}
";

fn write_fixture(dir: &Path, header: &str) -> Vec<PathBuf> {
    let sources = [
        ("Core.h", header),
        ("Init.fos", SCRIPT_SOURCE),
        ("GenericCode-Template.cpp", GENERIC_TEMPLATE),
        ("DataRegistration-Template.cpp", REGISTRATION_TEMPLATE),
        ("AngelScriptScripting-Template.cpp", ANGELSCRIPT_TEMPLATE),
    ];
    sources
        .iter()
        .map(|(name, content)| {
            let path = dir.join(name);
            fs::write(&path, content).unwrap();
            path
        })
        .collect()
}

fn args(meta: Vec<PathBuf>, output: &Path) -> PipelineArgs {
    PipelineArgs {
        meta,
        output: output.to_path_buf(),
        build_hash: "abcd".to_string(),
        dev_name: "dev".to_string(),
        game_name: "Game".to_string(),
        game_version: "1.0".to_string(),
        config: vec!["Quiet,True".to_string(), "DbgLog,+extra".to_string()],
        backends: EmitOptions {
            angelscript: true,
            mono: false,
            native: false,
        },
    }
}

fn read(output: &Path, name: &str) -> String {
    fs::read_to_string(output.join(name)).unwrap_or_else(|e| panic!("{name}: {e}"))
}

#[test]
fn end_to_end_produces_the_full_output_set() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("gen");
    let meta = write_fixture(dir.path(), ENGINE_HEADER);
    assert_eq!(pipeline::run(&args(meta, &output)), 0);

    for name in OUTPUT_FILES {
        assert!(output.join(name).is_file(), "{name} missing");
    }

    let version = read(&output, "Version-Include.h");
    assert!(version.contains("static constexpr auto FO_BUILD_HASH = \"abcd\";"));
    assert!(version.contains("static constexpr auto FO_COMPATIBILITY_VERSION = 646393889;"));

    let debug = read(&output, "DebugSettings-Include.h");
    assert!(debug.contains("Quiet = True"));
    assert!(debug.contains("DbgLog += extra"));

    let server = read(&output, "AngelScriptScripting-Server.cpp");
    assert!(server.contains("AS_Server_Item_Drop_ut"));
    assert!(server.contains("#define SERVER_SCRIPTING 1"));

    assert_eq!(read(&output, "EmbeddedResources-Include.h"), "// Empty file\n");
    assert_eq!(read(&output, "MonoScripting-Server.cpp"),
        "#include \"ServerScripting.h\"\nvoid ServerScriptSystem::InitMonoScripting() { }\n");
}

#[test]
fn rerun_leaves_files_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("gen");
    let meta = write_fixture(dir.path(), ENGINE_HEADER);
    assert_eq!(pipeline::run(&args(meta.clone(), &output)), 0);

    let stamps: Vec<_> = OUTPUT_FILES
        .iter()
        .map(|name| fs::metadata(output.join(name)).unwrap().modified().unwrap())
        .collect();

    assert_eq!(pipeline::run(&args(meta, &output)), 0);
    for (name, stamp) in OUTPUT_FILES.iter().zip(stamps) {
        let now = fs::metadata(output.join(name)).unwrap().modified().unwrap();
        assert_eq!(now, stamp, "{name} was rewritten");
    }
}

#[test]
fn appended_property_keeps_earlier_indices() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("gen");
    let meta = write_fixture(dir.path(), ENGINE_HEADER);
    assert_eq!(pipeline::run(&args(meta.clone(), &output)), 0);
    let first = read(&output, "GenericCode-Common.cpp");
    assert!(first.contains("uint16 ItemProperties::Cost_RegIndex = 0;"));
    assert!(first.contains("uint16 ItemProperties::Weight_RegIndex = 1;"));

    let appended = ENGINE_HEADER.replace(
        "};\n",
        "    ///@ ExportProperty\n    ENTITY_PROPERTY(Public, uint, Damage);\n};\n",
    );
    write_fixture(dir.path(), &appended);
    assert_eq!(pipeline::run(&args(meta, &output)), 0);
    let second = read(&output, "GenericCode-Common.cpp");
    assert!(second.contains("uint16 ItemProperties::Cost_RegIndex = 0;"));
    assert!(second.contains("uint16 ItemProperties::Weight_RegIndex = 1;"));
    assert!(second.contains("uint16 ItemProperties::Damage_RegIndex = 2;"));
}

#[test]
fn failed_build_stubs_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("gen");
    let mut meta = write_fixture(dir.path(), ENGINE_HEADER);
    // A property on an entity nobody declared fails the registry phase.
    let bad = dir.path().join("Bad.fos");
    fs::write(&bad, "///@ Property Critter Public uint Karma\n").unwrap();
    meta.push(bad);

    assert_eq!(pipeline::run(&args(meta, &output)), 1);
    for name in OUTPUT_FILES {
        let content = read(&output, name);
        assert!(
            content.contains("#error Code generation failed"),
            "{name} is not a failure stub"
        );
        assert!(content.contains("Critter"), "{name} lost the diagnostic");
    }
}
