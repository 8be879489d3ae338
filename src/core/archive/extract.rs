use std::io::{Read, Seek};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{info, trace, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsafe path in archive: {0}")]
    UnsafePath(String),
    #[error("malformed archive: {0}")]
    MalformedArchive(#[from] zip::result::ZipError),
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One archive entry, validated and resolved against the wrapper directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub index: usize,
    pub is_directory: bool,
    /// Path below the destination; `None` for the wrapper directory itself.
    pub relative_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// Unpack a GitHub-style branch snapshot into `destination`.
///
/// Every member name is validated before anything is written, so an archive
/// carrying a traversal path leaves the destination untouched. Past that
/// point a failure keeps whatever members were already written.
pub fn extract_archive<R: Read + Seek>(
    reader: R,
    destination: &Path,
) -> Result<ExtractSummary, ExtractError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let members = plan_members(&mut archive)?;

    create_dir(destination)?;

    let mut summary = ExtractSummary::default();
    for member in members {
        let Some(relative) = member.relative_path else {
            summary.skipped += 1;
            continue;
        };

        let out_path = destination.join(&relative);
        if member.is_directory {
            create_dir(&out_path)?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            create_dir(parent)?;
        }

        let mut zipped = archive.by_index(member.index)?;
        let mut out = std::fs::File::create(&out_path).map_err(|source| ExtractError::Io {
            path: out_path.clone(),
            source,
        })?;
        std::io::copy(&mut zipped, &mut out).map_err(|source| ExtractError::Io {
            path: out_path.clone(),
            source,
        })?;
        trace!("Extracted {:?}", relative);
        summary.files += 1;
    }

    info!(
        "Extracted {} files and {} directories into {:?}",
        summary.files, summary.directories, destination
    );
    Ok(summary)
}

/// Reads the central directory in stored order and validates every name.
pub fn plan_members<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<Vec<ArchiveMember>, ExtractError> {
    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let raw_path = archive.by_index_raw(index)?.name().to_string();
        let relative_path = member_destination(&raw_path).inspect_err(|_| {
            warn!("Rejecting archive member with unsafe path {:?}", raw_path);
        })?;

        members.push(ArchiveMember {
            index,
            is_directory: raw_path.ends_with('/'),
            relative_path,
        });
    }
    Ok(members)
}

/// Resolves `.` and `..` in a member name.
///
/// A name that is absolute, climbs above the archive root, or contains a
/// segment the host would not treat as a plain file name is unsafe.
pub fn normalize_member_path(raw: &str) -> Result<Vec<&str>, ExtractError> {
    let unsafe_path = || ExtractError::UnsafePath(raw.to_string());

    if raw.starts_with(['/', '\\']) {
        return Err(unsafe_path());
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(unsafe_path());
                }
            }
            name => {
                let mut components = Path::new(name).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(name),
                    _ => return Err(unsafe_path()),
                }
            }
        }
    }

    Ok(segments)
}

/// Where a member lands below the destination.
///
/// The `<repo>-<branch>` wrapper is everything up to the first separator and
/// is dropped before `.` and `..` are resolved, so the rest may not climb
/// back into it. A name without a separator is kept as is. `None` means the
/// member is the wrapper directory itself.
pub fn member_destination(raw: &str) -> Result<Option<PathBuf>, ExtractError> {
    let unsafe_path = || ExtractError::UnsafePath(raw.to_string());

    if raw.starts_with(['/', '\\']) {
        return Err(unsafe_path());
    }

    let rest = match raw.split_once(['/', '\\']) {
        Some((".", rest)) => rest,
        Some((wrapper, rest)) => {
            let mut components = Path::new(wrapper).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => rest,
                _ => return Err(unsafe_path()),
            }
        }
        None => raw,
    };

    let segments = normalize_member_path(rest).map_err(|_| unsafe_path())?;
    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(segments.iter().collect()))
}

fn create_dir(path: &Path) -> Result<(), ExtractError> {
    std::fs::create_dir_all(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    /// `None` contents mean a directory entry.
    fn build_zip(entries: &[(&str, Option<&[u8]>)]) -> Cursor<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, contents) in entries {
            match contents {
                None => writer.add_directory(*name, options).unwrap(),
                Some(bytes) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(bytes).unwrap();
                }
            }
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(
            normalize_member_path("pack-master/./config/../mods/a.jar").unwrap(),
            vec!["pack-master", "mods", "a.jar"]
        );
        assert_eq!(normalize_member_path("pack-master/").unwrap(), vec!["pack-master"]);
    }

    #[test]
    fn normalize_rejects_escapes() {
        for raw in ["../evil", "a/../../evil", "/etc/passwd", "\\evil", ".."] {
            assert!(
                matches!(normalize_member_path(raw), Err(ExtractError::UnsafePath(ref n)) if n == raw),
                "{raw} should be unsafe"
            );
        }
    }

    #[test]
    fn wrapper_is_stripped() {
        assert_eq!(member_destination("pack-master/").unwrap(), None);
        assert_eq!(member_destination("pack-master").unwrap(), Some(PathBuf::from("pack-master")));
        assert_eq!(
            member_destination("pack-master/config/a.toml").unwrap(),
            Some(PathBuf::from("config").join("a.toml"))
        );
        assert_eq!(
            member_destination("pack-master/config/../mods/a.jar").unwrap(),
            Some(PathBuf::from("mods").join("a.jar"))
        );
    }

    #[test]
    fn climbing_into_the_wrapper_is_unsafe() {
        for raw in ["a/../b/c.txt", "pack-master/..", "../pack-master/x", "/pack-master/x"] {
            assert!(
                matches!(member_destination(raw), Err(ExtractError::UnsafePath(ref n)) if n == raw),
                "{raw} should be unsafe"
            );
        }
    }

    #[test]
    fn root_level_files_are_kept() {
        let archive = build_zip(&[
            ("README.md", Some(b"read me")),
            ("pack-master/", None),
            ("pack-master/a.txt", Some(b"a")),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let summary = extract_archive(archive, dir.path()).unwrap();

        assert_eq!(summary.files, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("README.md")).unwrap(), "read me");
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "a");
    }

    #[test]
    fn wrapper_relative_dotdot_aborts_extraction() {
        let archive = build_zip(&[
            ("a/b/keep.txt", Some(b"ok")),
            ("a/../b/c.txt", Some(b"moved")),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let err = extract_archive(archive, dir.path()).unwrap_err();

        assert!(matches!(err, ExtractError::UnsafePath(ref n) if n == "a/../b/c.txt"));
        assert!(!dir.path().join("c.txt").exists());
        assert!(!dir.path().join("b").exists());
    }

    #[test]
    fn extracts_tree_without_wrapper() {
        let archive = build_zip(&[
            ("pack-master/", None),
            ("pack-master/options.txt", Some(b"renderDistance:12\n")),
            ("pack-master/config/", None),
            ("pack-master/config/oculus.properties", Some(b"enableShaders=true\n")),
            ("pack-master/mods/nested/deep.jar", Some(b"jar")),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("game");

        let summary = extract_archive(archive, &dest).unwrap();

        assert_eq!(summary.files, 3);
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            std::fs::read_to_string(dest.join("options.txt")).unwrap(),
            "renderDistance:12\n"
        );
        assert_eq!(std::fs::read(dest.join("mods/nested/deep.jar")).unwrap(), b"jar");
        assert!(!dest.join("pack-master").exists());
    }

    #[test]
    fn existing_files_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("options.txt"), "old contents that are longer").unwrap();
        let archive = build_zip(&[("pack-master/options.txt", Some(b"new"))]);

        extract_archive(archive, dir.path()).unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("options.txt")).unwrap(), "new");
    }

    #[test]
    fn traversal_member_aborts_before_any_write() {
        let archive = build_zip(&[
            ("pack-master/", None),
            ("pack-master/options.txt", Some(b"ok")),
            ("pack-master/../../evil.txt", Some(b"evil")),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("game");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("keep.txt"), "mine").unwrap();

        let err = extract_archive(archive, &dest).unwrap_err();

        assert!(matches!(err, ExtractError::UnsafePath(ref n) if n == "pack-master/../../evil.txt"));
        assert!(!dir.path().join("evil.txt").exists());
        assert!(!dest.join("options.txt").exists());
        assert_eq!(std::fs::read_to_string(dest.join("keep.txt")).unwrap(), "mine");
    }

    #[test]
    fn garbage_is_a_malformed_archive() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(Cursor::new(b"not a zip at all".to_vec()), dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedArchive(_)));
    }
}
