use std::path::{Path, PathBuf};

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Paths in a configuration file are relative to the directory of that file.
pub fn resolve_path(root: Option<&Path>, file_path: &str) -> String {
    match root {
        Some(root_p) if Path::new(file_path).is_relative() => {
            let p: PathBuf = [root_p, Path::new(file_path)].iter().collect();
            p.as_path().display().to_string()
        }
        _ => file_path.to_string(),
    }
}

/// The input type, when it is not specified: Excel workbooks are recognized by their extension.
pub fn guess_input_type(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".xlsx") || lower.ends_with(".xlsm") {
        "xlsx"
    } else {
        "csv"
    }
}
