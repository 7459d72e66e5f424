use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// Resolve input specs to files. A spec is a file, a directory (its files,
/// by name) or a file name with `*` / `?` wildcards, matched in its parent
/// directory.
pub fn resolve(specs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for spec in specs {
        let found = resolve_one(spec)?;
        if found.is_empty() {
            log::warn!("no files match '{}'", spec);
        }
        files.extend(found);
    }

    if files.is_empty() {
        return Err(Error::NoInput(specs.to_vec()));
    }
    Ok(files)
}

fn resolve_one(spec: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(spec);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        return list_files(path, |_| true);
    }
    if !spec.contains(['*', '?']) {
        return Ok(Vec::new());
    }

    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return Ok(Vec::new());
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let wildcard = wildcard_regex(name)?;
    list_files(dir, |file_name| wildcard.is_match(file_name))
}

fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let read_error = |source| Error::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(&keep) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// DOS-style wildcard as an anchored regex: `*` is any run, `?` one character.
fn wildcard_regex(wildcard: &str) -> Result<Regex> {
    let mut source = String::from("^");
    for c in wildcard.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|err| Error::InvalidFilter {
        spec: wildcard.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_wildcard_regex() {
        let regex = wildcard_regex("app?.log*").unwrap();
        assert!(regex.is_match("app1.log"));
        assert!(regex.is_match("app2.log.1"));
        assert!(!regex.is_match("app10.log"));
        assert!(!regex.is_match("xapp1.log"));
    }

    #[test]
    fn test_resolve_directory_and_wildcard() {
        let dir = tempdir().unwrap();
        for name in ["b.log", "a.log", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();

        let all = resolve(&[dir.path().to_string_lossy().into_owned()]).unwrap();
        let names: Vec<String> = all
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.log", "b.log", "notes.txt"]);

        let spec = dir.path().join("*.log").to_string_lossy().into_owned();
        let logs = resolve(&[spec]).unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[test]
    fn test_nothing_resolved() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("*.log").to_string_lossy().into_owned();
        assert!(matches!(resolve(&[spec]), Err(Error::NoInput(_))));
    }
}
