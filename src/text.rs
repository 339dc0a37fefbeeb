/// Collapses runs of whitespace and underscores into single spaces and trims.
pub fn normalize_spacing(input: &str) -> String {
    input
        .split(|character: char| character.is_whitespace() || character == '_')
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Appends `.{extension}` unless `name` already ends with it (ASCII case-insensitive).
pub fn ensure_extension(name: &str, extension: &str) -> String {
    let suffix = format!(".{extension}");
    let has_suffix = name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(&suffix);

    if has_suffix {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_spacing_collapses_underscores_and_whitespace() {
        assert_eq!(normalize_spacing("  OSN__2019 \t soal_ "), "OSN 2019 soal");
        assert_eq!(normalize_spacing("___"), "");
        assert_eq!(normalize_spacing("OSN-2019"), "OSN-2019");
    }

    #[test]
    fn ensure_extension_respects_existing_suffix() {
        assert_eq!(ensure_extension("diagram", "png"), "diagram.png");
        assert_eq!(ensure_extension("diagram.PNG", "png"), "diagram.PNG");
        assert_eq!(ensure_extension("diagram.png.txt", "png"), "diagram.png.txt.png");
        assert_eq!(ensure_extension("é", "png"), "é.png");
    }
}
