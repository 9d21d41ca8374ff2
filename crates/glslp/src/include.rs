//! Resolution of `#include` directives.
//!
//! Cycles are bounded by [`MAX_INCLUDE_DEPTH`] rather than detected, and files that declare
//! `#pragma once` are only ever expanded once per parse.

use std::collections::HashSet;

use crate::{error::ParseErrorKind, filesystem::ShaderFilesystem};

/// How deep `#include` directives may nest. The root file is at depth `0`.
pub const MAX_INCLUDE_DEPTH: u32 = 8;

/// The outcome of resolving an include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The text of the file, to be parsed in place.
    Text(String),
    /// The file declared `#pragma once` and was already expanded.
    AlreadyIncluded,
}

/// Reads included files and remembers which ones declared `#pragma once`.
#[derive(Debug)]
pub struct IncludeResolver<'fs, F: ?Sized> {
    /// Where file text comes from.
    filesystem: &'fs F,
    /// Files that declared `#pragma once`.
    once_files: HashSet<String>,
}

impl<'fs, F> IncludeResolver<'fs, F>
where
    F: ShaderFilesystem + ?Sized,
{
    /// Creates a resolver reading from the given filesystem.
    #[inline]
    pub fn new(filesystem: &'fs F) -> Self {
        Self {
            filesystem,
            once_files: HashSet::new(),
        }
    }

    /// Fetches the text of `name`, which is about to be parsed at `depth`.
    ///
    /// # Errors
    ///
    /// * [`ParseErrorKind::IncludeTooDeep`] if `depth` exceeds [`MAX_INCLUDE_DEPTH`],
    /// * [`ParseErrorKind::IncludeNotFound`] if the filesystem can not supply the file.
    #[inline]
    pub fn resolve(&self, name: &str, depth: u32) -> Result<Resolved, ParseErrorKind> {
        if self.once_files.contains(name) {
            log::debug!("skipping `{name}`, it was already included and has `#pragma once`");
            return Ok(Resolved::AlreadyIncluded);
        }

        if depth > MAX_INCLUDE_DEPTH {
            return Err(ParseErrorKind::IncludeTooDeep {
                name: name.to_owned(),
                max_depth: MAX_INCLUDE_DEPTH,
            });
        }

        log::trace!("reading `{name}` at include depth {depth}");
        match self.filesystem.read_all_text(name) {
            Ok(text) => Ok(Resolved::Text(text)),
            Err(source) => Err(ParseErrorKind::IncludeNotFound {
                name: name.to_owned(),
                source,
            }),
        }
    }

    /// Records that `name` declared `#pragma once`.
    #[inline]
    pub fn mark_once(&mut self, name: &str) {
        self.once_files.insert(name.to_owned());
    }
}

/// Extracts the file name of an `#include "name"` or `#include <name>` directive from the
/// tokens that follow `#include`.
///
/// # Errors
///
/// Returns [`ParseErrorKind::MalformedPragma`] if there is not exactly one properly
/// delimited, non-empty file name.
#[inline]
pub fn include_target<'line>(args: &[&'line str]) -> Result<&'line str, ParseErrorKind> {
    let [target] = args else {
        return Err(ParseErrorKind::MalformedPragma(
            "expected `#include \"name\"` or `#include <name>`".to_owned(),
        ));
    };

    let name = target
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            target
                .strip_prefix('<')
                .and_then(|rest| rest.strip_suffix('>'))
        })
        .filter(|name| !name.is_empty());

    name.ok_or_else(|| {
        ParseErrorKind::MalformedPragma(format!("invalid include file name {target}"))
    })
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    #[test_log::test]
    fn include_target_accepts_quotes_and_brackets() {
        assert_eq!(include_target(&["\"a.glsl\""]).unwrap(), "a.glsl");
        assert_eq!(include_target(&["<dir/b.glsl>"]).unwrap(), "dir/b.glsl");
        assert!(include_target(&["a.glsl"]).is_err());
        assert!(include_target(&["\"\""]).is_err());
        assert!(include_target(&["\"a.glsl\"", "extra"]).is_err());
        assert!(include_target(&[]).is_err());
    }

    #[test_log::test]
    fn resolve_reports_missing_files_and_depth() {
        let files = HashMap::from([("a.glsl".to_owned(), "void a() {}".to_owned())]);
        let resolver = IncludeResolver::new(&files);

        assert_eq!(
            resolver.resolve("a.glsl", MAX_INCLUDE_DEPTH).unwrap(),
            Resolved::Text("void a() {}".to_owned())
        );
        assert!(matches!(
            resolver.resolve("a.glsl", MAX_INCLUDE_DEPTH + 1),
            Err(ParseErrorKind::IncludeTooDeep { max_depth: 8, .. })
        ));
        assert!(matches!(
            resolver.resolve("missing.glsl", 1),
            Err(ParseErrorKind::IncludeNotFound { .. })
        ));
    }

    #[test_log::test]
    fn once_files_are_skipped() {
        let files = HashMap::from([("a.glsl".to_owned(), String::new())]);
        let mut resolver = IncludeResolver::new(&files);
        resolver.mark_once("a.glsl");
        assert_eq!(resolver.resolve("a.glsl", 1).unwrap(), Resolved::AlreadyIncluded);
    }
}
