//! Key name to legacy `keyCode` mapping.

const NAMED_KEYS: &[(&str, u32)] = &[
    ("Enter", 13),
    ("Tab", 9),
    ("Escape", 27),
    ("Backspace", 8),
    ("Delete", 46),
    ("ArrowUp", 38),
    ("ArrowDown", 40),
    ("ArrowLeft", 37),
    ("ArrowRight", 39),
    ("Home", 36),
    ("End", 35),
    ("PageUp", 33),
    ("PageDown", 34),
    ("Space", 32),
];

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Single characters map to their code point; unknown names map to 0.
pub fn key_code(key: &str) -> u32 {
    if let Some(c) = single_char(key) {
        return u32::from(c);
    }
    NAMED_KEYS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, code)| *code)
        .unwrap_or(0)
}

/// `KeyboardEvent.code` for a key: `KeyA` style for characters, the name
/// itself otherwise.
pub fn key_code_name(key: &str) -> String {
    match single_char(key) {
        Some(c) => format!("Key{}", c.to_uppercase()),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_keys() {
        assert_eq!(key_code("Enter"), 13);
        assert_eq!(key_code("ArrowLeft"), 37);
        assert_eq!(key_code("Space"), 32);
        assert_eq!(key_code("F13"), 0);
    }

    #[test]
    fn test_characters() {
        assert_eq!(key_code("a"), 97);
        assert_eq!(key_code("é"), 233);
        assert_eq!(key_code_name("a"), "KeyA");
        assert_eq!(key_code_name("Tab"), "Tab");
    }
}
