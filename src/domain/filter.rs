use std::path::Path;

use tracing::debug;

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "pdf", "zip", "tar", "gz", "7z", "rar",
    "exe", "dll", "so", "dylib", "mp3", "mp4", "avi", "mov", "wmv", "woff", "woff2", "ttf",
    "eot", "bin", "dat", "db", "sqlite",
];

const IGNORED_DIRECTORIES: &[&str] = &[
    "/node_modules/",
    "/.git/",
    "/.vscode/",
    "/dist/",
    "/build/",
    "/.next/",
    "/coverage/",
    "/.nyc_output/",
];

/// Whether a saved file is worth sending through the analysis pipeline.
pub fn should_process(path: &Path) -> bool {
    if is_binary(path) {
        debug!(path = %path.display(), "skipping binary file");
        return false;
    }

    let normalized = path.to_string_lossy().replace('\\', "/");
    if IGNORED_DIRECTORIES
        .iter()
        .any(|pattern| normalized.contains(pattern))
    {
        debug!(path = %path.display(), "skipping ignored directory");
        return false;
    }

    true
}

fn is_binary(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.as_str()))
}
