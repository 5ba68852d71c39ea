/// Punctuation accepted on the displays besides letters, digits and whitespace.
pub const ALLOWED_SYMBOLS: &str = ".,:;'\"!?@#$%^&*()_+-=[]{}";

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || ALLOWED_SYMBOLS.contains(c)
}

/// Whether every character of `line` can be shown on a display.
/// Length is not checked here.
pub fn is_valid(line: &str) -> bool {
    first_disallowed(line).is_none()
}

/// The first character of `line` that cannot be shown, if any.
pub fn first_disallowed(line: &str) -> Option<char> {
    line.chars().find(|c| !is_allowed(*c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_characters() {
        assert!(is_valid(""));
        assert!(is_valid("Hello World"));
        assert!(is_valid("Dist: 123mm"));
        assert!(is_valid("tab\there"));
        assert!(is_valid(ALLOWED_SYMBOLS));
        assert!(is_valid("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"));
    }

    #[test]
    fn test_disallowed_characters() {
        for line in ["Bad~Char", "back`tick", "a<b", "pipe|", "slash/", "back\\slash", "ñandú", "€5", "😀"] {
            assert!(!is_valid(line), "'{}' should be rejected", line);
        }
    }

    #[test]
    fn test_first_disallowed() {
        assert_eq!(first_disallowed("Bad~Char"), Some('~'));
        assert_eq!(first_disallowed("fine"), None);
    }

    #[test]
    fn test_valid_exactly_when_nothing_disallowed() {
        for line in ["", "Hello World", "a<b", "ok?", "ñ", "{[()]}", "x|y"] {
            assert_eq!(is_valid(line), first_disallowed(line).is_none(), "'{}'", line);
        }
    }

    #[test]
    fn test_each_allowed_symbol_on_its_own() {
        for symbol in ALLOWED_SYMBOLS.chars() {
            assert!(is_valid(&symbol.to_string()), "'{}' should be accepted", symbol);
        }
    }
}
