use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::LocatorError;

/// Prefix used when a logical name has none.
pub const DEFAULT_PREFIX: &str = "page";
/// Extension appended to template paths that don't already carry it.
pub const DEFAULT_EXTENSION: &str = ".tpl";

/// Maps a logical template name to a readable file.
///
/// The registry only calls the locator on cache misses, so an implementation
/// is free to do filesystem work on every call.
pub trait TemplateLocator {
    fn locate(&self, name: &str) -> Result<PathBuf, LocatorError>;
}

impl<L: TemplateLocator + ?Sized> TemplateLocator for Box<L> {
    fn locate(&self, name: &str) -> Result<PathBuf, LocatorError> {
        (**self).locate(name)
    }
}

/// `prefix:relative/path`, split on the first `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalName<'a> {
    pub prefix: &'a str,
    pub path: &'a str,
}

impl<'a> LogicalName<'a> {
    pub fn parse(name: &'a str) -> LogicalName<'a> {
        match name.split_once(':') {
            Some((prefix, path)) => LogicalName { prefix, path },
            None => LogicalName {
                prefix: DEFAULT_PREFIX,
                path: name,
            },
        }
    }
}

/// Reject relative paths that could leave their root before touching the
/// filesystem at all.
fn validate_relative_path(name: &str, path: &str) -> Result<(), LocatorError> {
    let invalid = |reason: &'static str| -> Result<(), LocatorError> {
        Err(LocatorError::InvalidTemplateName(name.to_owned(), reason))
    };

    if path.is_empty() {
        return invalid("empty path");
    }
    if path.contains('\0') {
        return invalid("contains a NUL byte");
    }
    if path.contains('\r') || path.contains('\n') {
        return invalid("contains a line break");
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return invalid("absolute path");
    }
    if path.split(|c| c == '/' || c == '\\').any(|seg| seg == "..") {
        return invalid("parent directory segment");
    }
    Ok(())
}

/// Resolves logical names against a set of whitelisted root directories.
///
/// Roots are canonicalized when registered, and every resolved file is
/// canonicalized again and checked to still live under its root, so neither
/// `..` tricks nor symlinks pointing outside a root can escape it.
#[derive(Debug, Clone)]
pub struct FilesystemTemplateLocator {
    roots: BTreeMap<String, PathBuf>,
    extension: String,
}

impl Default for FilesystemTemplateLocator {
    fn default() -> FilesystemTemplateLocator {
        FilesystemTemplateLocator::new(DEFAULT_EXTENSION)
    }
}

impl FilesystemTemplateLocator {
    pub fn new<S: Into<String>>(extension: S) -> FilesystemTemplateLocator {
        FilesystemTemplateLocator {
            roots: BTreeMap::new(),
            extension: extension.into(),
        }
    }

    /// Bind `prefix` to the directory `dir`, which must exist.
    pub fn add_root<P: AsRef<Path>>(&mut self, prefix: &str, dir: P) -> Result<(), LocatorError> {
        let dir = dir.as_ref();
        let not_found = || LocatorError::RootNotFound(prefix.to_owned(), dir.to_path_buf());

        let canonical = fs::canonicalize(dir).map_err(|_| not_found())?;
        if !canonical.is_dir() {
            return Err(not_found());
        }
        fs::read_dir(&canonical).map_err(|_| not_found())?;

        debug!("template root {:?} => {:?}", prefix, canonical);
        self.roots.insert(prefix.to_owned(), canonical);
        Ok(())
    }

    /// Builder flavour of `add_root`.
    pub fn with_root<P: AsRef<Path>>(
        mut self,
        prefix: &str,
        dir: P,
    ) -> Result<FilesystemTemplateLocator, LocatorError> {
        self.add_root(prefix, dir)?;
        Ok(self)
    }

    pub fn root(&self, prefix: &str) -> Option<&Path> {
        self.roots.get(prefix).map(PathBuf::as_path)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl TemplateLocator for FilesystemTemplateLocator {
    fn locate(&self, name: &str) -> Result<PathBuf, LocatorError> {
        let logical = LogicalName::parse(name);
        let root = self
            .roots
            .get(logical.prefix)
            .ok_or_else(|| LocatorError::UnknownPrefix(logical.prefix.to_owned()))?;

        validate_relative_path(name, logical.path)?;

        let mut relative = logical.path.to_owned();
        if !self.extension.is_empty() && !relative.ends_with(&self.extension) {
            relative.push_str(&self.extension);
        }

        let candidate = root.join(&relative);
        let canonical = fs::canonicalize(&candidate).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LocatorError::TemplateNotFound(name.to_owned()),
            _ => LocatorError::TemplateNotReadable(name.to_owned(), e),
        })?;

        if !canonical.starts_with(root) {
            return Err(LocatorError::PathEscapesRoot(name.to_owned()));
        }
        if !canonical.is_file() {
            return Err(LocatorError::TemplateNotFound(name.to_owned()));
        }
        File::open(&canonical)
            .map_err(|e| LocatorError::TemplateNotReadable(name.to_owned(), e))?;

        Ok(canonical)
    }
}
