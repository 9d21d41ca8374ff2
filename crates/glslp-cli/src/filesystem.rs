//! Shader files read from a list of directories.

use std::{
    io,
    path::{Path, PathBuf},
};

use glslp::ShaderFilesystem;
use relative_path::RelativePath;

/// Looks files up in each of its directories in turn, the first match winning.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct DirFilesystem {
    /// Canonical search directories, in lookup order.
    search_dirs: Vec<PathBuf>,
}

impl DirFilesystem {
    /// Creates a filesystem searching `dirs` in order.
    ///
    /// # Errors
    /// If one of the directories does not exist.
    #[inline]
    pub fn new<I>(dirs: I) -> io::Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let mut search_dirs: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            let dir = dunce::canonicalize(dir.as_ref())?;
            if !search_dirs.contains(&dir) {
                search_dirs.push(dir);
            }
        }
        Ok(Self { search_dirs })
    }

    /// The search directories, in lookup order.
    #[inline]
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// The first existing file named `name` among the search directories.
    #[inline]
    #[must_use]
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let relative = RelativePath::new(name);
        self.search_dirs
            .iter()
            .map(|dir| relative.to_logical_path(dir))
            .find(|path| path.is_file())
    }
}

impl ShaderFilesystem for DirFilesystem {
    #[inline]
    fn read_all_text(&self, name: &str) -> io::Result<String> {
        let Some(path) = self.find(name) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "not found in any of {}",
                    self.search_dirs
                        .iter()
                        .map(|dir| format!("'{}'", dir.display()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ));
        };
        log::debug!("reading '{}'", path.display());
        std::fs::read_to_string(path)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test_log::test]
    fn earlier_directories_win() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("common.glsl"), "first").unwrap();
        fs::write(second.path().join("common.glsl"), "second").unwrap();
        fs::create_dir(second.path().join("lib")).unwrap();
        fs::write(second.path().join("lib/noise.glsl"), "noise").unwrap();

        let filesystem = DirFilesystem::new([first.path(), second.path()]).unwrap();
        assert_eq!(filesystem.read_all_text("common.glsl").unwrap(), "first");
        assert_eq!(filesystem.read_all_text("lib/noise.glsl").unwrap(), "noise");
        assert_eq!(
            filesystem.read_all_text("lib/../common.glsl").unwrap(),
            "first"
        );
    }

    #[test_log::test]
    fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let filesystem = DirFilesystem::new([dir.path(), dir.path()]).unwrap();
        assert_eq!(filesystem.search_dirs().len(), 1);
        let err = filesystem.read_all_text("missing.glsl").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test_log::test]
    fn missing_directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirFilesystem::new([dir.path().join("nope")]).is_err());
    }
}
