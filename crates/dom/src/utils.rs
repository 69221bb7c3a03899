//! Small helpers shared by the resolver, cache and config layers

/// Extension of every generated style sheet file
pub const STYLE_SHEET_EXTENSION: &str = ".css";

/// Public URL prefix for a style sheet folder: `/{last segment}` or `""`
pub fn style_base_from_folder(folder: Option<&str>) -> String {
    match folder.and_then(|f| f.rsplit('/').next()) {
        Some(segment) if !segment.is_empty() && segment != "." => format!("/{}", segment),
        _ => String::new(),
    }
}

/// `href` of a linked style sheet file
pub fn stylesheet_href(style_base: &str, file: &str) -> String {
    format!("{}/{}", style_base, file)
}

/// Cache key of a style sheet file name (`my-widget-0.css` → `my-widget-0`)
pub fn sheet_key(file: &str) -> &str {
    file.strip_suffix(STYLE_SHEET_EXTENSION).unwrap_or(file)
}
