//! Named character-whitelist restrictions for region recognition.

const WHITELIST_PREFIX: &str = "tessedit_char_whitelist=";
const NUM: &str = "0123456789";
const SPACE: &str = " ";
const ALPHA_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const ALPHA_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Preset names understood by [`restriction_for`]
pub const PRESET_NAMES: &[&str] = &["num", "num_space", "alphanum_space"];

/// Restriction clause for a preset name, or an empty string for unknown names
pub fn restriction_for(name: &str) -> String {
    let allowed = match name {
        "num" => [NUM].concat(),
        "num_space" => [SPACE, NUM].concat(),
        "alphanum_space" => [SPACE, NUM, ALPHA_LOWER, ALPHA_UPPER].concat(),
        _ => return String::new(),
    };
    format!("{WHITELIST_PREFIX}{allowed}")
}

/// Map preset names to per-item configs for the dispatcher
pub fn resolve_presets<S: AsRef<str>>(names: &[S]) -> Vec<Option<String>> {
    names
        .iter()
        .map(|name| Some(restriction_for(name.as_ref())))
        .collect()
}
