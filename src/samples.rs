use std::path::{Path, PathBuf};

/// A discovered sample file; the stem doubles as the instrument name
pub struct SampleEntry {
    pub path: PathBuf,
    pub name: String,
}

/// Global samples directory (~/.tonegrid/samples/)
pub fn samples_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".tonegrid").join("samples")
}

/// Default search directories: project-local ./samples first, then the
/// global directory
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let local = PathBuf::from("./samples");
    if local.is_dir() {
        dirs.push(local);
    }
    let global = samples_dir();
    if global.is_dir() {
        dirs.push(global);
    }
    dirs
}

/// Scan directories recursively for .wav files
pub fn scan_samples(dirs: &[PathBuf]) -> Vec<SampleEntry> {
    let mut entries = Vec::new();
    for dir in dirs {
        scan_dir(dir, &mut entries);
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

fn scan_dir(current: &Path, entries: &mut Vec<SampleEntry>) {
    let Ok(read_dir) = std::fs::read_dir(current) else {
        return;
    };

    let mut items: Vec<_> = read_dir.filter_map(|e| e.ok()).collect();
    items.sort_by_key(|e| e.file_name());

    for entry in items {
        let path = entry.path();
        if path.is_dir() {
            scan_dir(&path, entries);
        } else if path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false)
        {
            let name = path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            entries.push(SampleEntry { path, name });
        }
    }
}
