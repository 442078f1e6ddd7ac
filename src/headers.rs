//! Version and debug-settings include files, produced straight from CLI
//! arguments rather than from scanned declarations.

use scriptbind_core::script_hash;

/// Build identity constants. The compatibility version is the engine string
/// hash of the build hash, so client and server reject mismatched builds.
pub fn version_include(
    build_hash: &str,
    dev_name: &str,
    game_name: &str,
    game_version: &str,
) -> String {
    let mut lines = vec![
        format!("static constexpr auto FO_BUILD_HASH = \"{build_hash}\";"),
        format!("static constexpr auto FO_DEV_NAME = \"{dev_name}\";"),
        format!("static constexpr auto FO_GAME_NAME = \"{game_name}\";"),
        format!("static constexpr auto FO_GAME_VERSION = \"{game_version}\";"),
        format!(
            "static constexpr auto FO_COMPATIBILITY_VERSION = {};",
            script_hash(build_hash)
        ),
    ];
    lines.push(String::new());
    lines.join("\n")
}

/// The embedded debug configuration block. Each entry is `key,value`; a
/// value starting with `+` appends to the key instead of assigning it.
pub fn debug_settings(configs: &[String]) -> String {
    let mut lines = vec!["R\"CONFIG(###DebugConfig###".to_string()];
    for cfg in configs {
        let (key, value) = cfg.split_once(',').unwrap_or((cfg.as_str(), ""));
        if let Some(appended) = value.strip_prefix('+') {
            lines.push(format!("{key} += {appended}"));
        } else {
            lines.push(format!("{key} = {value}"));
        }
    }
    lines.push("###DebugConfigEnd###)CONFIG\"".to_string());
    lines.push(String::new());
    lines.join("\n")
}
