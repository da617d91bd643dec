//! Platform detection utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// POSIX locale names: `language[_territory][.codeset][@modifier]`
static POSIX_LOCALE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{2,3})(?:[_-]([A-Za-z]{2}|[0-9]{3}))?(?:[.@].*)?$")
        .expect("locale pattern is valid")
});

/// Environment variables consulted for the user's language, in priority order
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Detect the current system language as a language tag (e.g. `en-US`)
///
/// Returns `None` when the environment names no language, or only the
/// `C`/`POSIX` locale.
pub fn system_language() -> Option<String> {
    LOCALE_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| parse_posix_locale(&value))
}

/// Convert a POSIX locale name into a language tag
///
/// `en_US.UTF-8` becomes `en-US`, `fr` stays `fr`.
pub fn parse_posix_locale(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "C" || value == "POSIX" || value.starts_with("C.") {
        return None;
    }

    let caps = POSIX_LOCALE.captures(value)?;
    let language = caps.get(1)?.as_str().to_lowercase();
    match caps.get(2) {
        Some(region) => Some(format!("{}-{}", language, region.as_str().to_uppercase())),
        None => Some(language),
    }
}
