use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Paths from the configuration file are relative to its directory.
pub fn resolve_path(root: Option<&str>, path: &str) -> String {
    match root {
        Some(r) if !Path::new(path).is_absolute() => Path::new(r).join(path).display().to_string(),
        _ => path.to_string(),
    }
}

pub fn guess_provider(path: &str) -> String {
    match Path::new(path).extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xlsx") => "xlsx".to_string(),
        _ => "csv".to_string(),
    }
}

pub fn strip_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}
