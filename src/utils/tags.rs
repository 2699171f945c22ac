// src/utils/tags.rs

/// Normalizes a single tag: trimmed and lowercased. Blank tags yield `None`.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

/// Normalizes a tag list, dropping blanks. Order is kept and duplicates are
/// not removed.
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    raw.iter().filter_map(|t| normalize_tag(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_lowercased_without_dedup() {
        let tags = normalize_tags(&["Tag1".to_string(), " tag1 ".to_string()]);
        assert_eq!(tags, vec!["tag1", "tag1"]);
    }

    #[test]
    fn blank_tags_are_dropped() {
        let tags = normalize_tags(&["  ".to_string(), "".to_string(), " Rust ".to_string()]);
        assert_eq!(tags, vec!["rust"]);
    }

    #[test]
    fn single_tag() {
        assert_eq!(normalize_tag("  WEB "), Some("web".to_string()));
        assert_eq!(normalize_tag("   "), None);
    }
}
