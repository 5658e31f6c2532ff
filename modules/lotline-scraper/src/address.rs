use std::sync::OnceLock;

use regex::Regex;

/// Canonicalize a free-text listing address for searching. Strips the feed's
/// internal ID prefixes and lot-number noise, collapses whitespace, trims.
/// Returns an empty string for missing input; the caller records those as
/// skipped rather than burning a browser session on them.
pub fn clean_address(full_address: Option<&str>) -> String {
    static ID_PREFIX: OnceLock<Regex> = OnceLock::new();
    static LOT_PREFIX: OnceLock<Regex> = OnceLock::new();
    static LOT_PARENS: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();

    let Some(raw) = full_address else {
        return String::new();
    };

    let id_prefix = ID_PREFIX.get_or_init(|| Regex::new(r"^ID:\d+/").expect("valid regex"));
    let lot_prefix = LOT_PREFIX.get_or_init(|| Regex::new(r"^Lot \d+,\s*").expect("valid regex"));
    let lot_parens = LOT_PARENS.get_or_init(|| Regex::new(r"^\(Lot \d+\)\s*").expect("valid regex"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let cleaned = id_prefix.replace(raw, "");
    let cleaned = lot_prefix.replace(&cleaned, "");
    let cleaned = lot_parens.replace(&cleaned, "");
    spaces.replace_all(&cleaned, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_prefix_is_stripped() {
        assert_eq!(
            clean_address(Some("ID:12345/42 Wallaby Way, Sydney")),
            "42 Wallaby Way, Sydney"
        );
    }

    #[test]
    fn lot_numbers_are_stripped() {
        assert_eq!(
            clean_address(Some("Lot 7, 42 Wallaby Way, Sydney")),
            "42 Wallaby Way, Sydney"
        );
        assert_eq!(
            clean_address(Some("(Lot 7) 42 Wallaby Way, Sydney")),
            "42 Wallaby Way, Sydney"
        );
    }

    #[test]
    fn whitespace_is_collapsed_and_trimmed() {
        assert_eq!(
            clean_address(Some("  42   Wallaby Way,  Sydney ")),
            "42 Wallaby Way, Sydney"
        );
    }

    #[test]
    fn missing_address_becomes_empty() {
        assert_eq!(clean_address(None), "");
        assert_eq!(clean_address(Some("   ")), "");
    }

    #[test]
    fn clean_addresses_pass_through() {
        assert_eq!(
            clean_address(Some("42 Wallaby Way, Sydney")),
            "42 Wallaby Way, Sydney"
        );
    }
}
