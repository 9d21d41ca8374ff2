//! The read-only file access the parser needs to fetch shader programs and their includes.

use std::{
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
    io,
};

/// Supplies the text of files by name.
///
/// Names are passed exactly as they appear in `#include` directives (without the
/// surrounding quotes or angle brackets), so implementors decide how they map to storage.
pub trait ShaderFilesystem {
    /// Reads the whole file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or can not be read.
    fn read_all_text(&self, name: &str) -> io::Result<String>;
}

impl<F> ShaderFilesystem for &F
where
    F: ShaderFilesystem + ?Sized,
{
    #[inline]
    fn read_all_text(&self, name: &str) -> io::Result<String> {
        (**self).read_all_text(name)
    }
}

impl<S> ShaderFilesystem for HashMap<String, String, S>
where
    S: BuildHasher,
{
    #[inline]
    fn read_all_text(&self, name: &str) -> io::Result<String> {
        self.get(name).cloned().ok_or_else(|| not_found(name))
    }
}

impl ShaderFilesystem for BTreeMap<String, String> {
    #[inline]
    fn read_all_text(&self, name: &str) -> io::Result<String> {
        self.get(name).cloned().ok_or_else(|| not_found(name))
    }
}

/// The error in-memory filesystems report for unknown names.
fn not_found(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no file named `{name}` in memory"),
    )
}
