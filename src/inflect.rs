//! Minimal English inflection for deriving entity type names from controller
//! and accessor names. Irregular nouns are the caller's problem
//! (`ControllerConfig::with_names` takes explicit singular/plural forms).

/// "notes" -> "note", "stories" -> "story", "boxes" -> "box"
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// "note" -> "notes", "story" -> "stories", "box" -> "boxes"
pub fn pluralize(word: &str) -> String {
    let bytes = word.as_bytes();
    if let Some(stem) = word.strip_suffix('y') {
        let preceded_by_vowel = stem
            .bytes()
            .last()
            .map(|b| matches!(b, b'a' | b'e' | b'i' | b'o' | b'u'))
            .unwrap_or(false);
        if !preceded_by_vowel && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    if word.ends_with("ch")
        || word.ends_with("sh")
        || matches!(bytes.last(), Some(b's' | b'x' | b'z'))
    {
        return format!("{word}es");
    }
    format!("{word}s")
}
