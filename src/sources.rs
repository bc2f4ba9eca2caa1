use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{LocatorError, RenderError};
use crate::template::Template;

pub(crate) trait Source {
    type Item;
    type Error;

    fn load(&self) -> Result<Self::Item, Self::Error>;
}

/// A template file that has already been through the locator.
pub(crate) struct FileTemplateSource {
    name: String,
    path: PathBuf,
}

impl FileTemplateSource {
    pub(crate) fn new(path: PathBuf, name: String) -> FileTemplateSource {
        FileTemplateSource { path, name }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn into_path(self) -> PathBuf {
        self.path
    }
}

impl Source for FileTemplateSource {
    type Item = Template;
    type Error = RenderError;

    fn load(&self) -> Result<Self::Item, Self::Error> {
        let not_readable = |e| LocatorError::TemplateNotReadable(self.name.clone(), e);

        let mut reader = BufReader::new(File::open(&self.path).map_err(not_readable)?);

        let mut buf = String::new();
        reader.read_to_string(&mut buf).map_err(not_readable)?;

        Ok(Template::compile_with_name(buf, self.name.clone())?)
    }
}

/// Modification time of `path`, when the platform reports one.
pub(crate) fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod test {
    use super::{modified_time, FileTemplateSource, Source};
    use crate::error::{LocatorError, RenderErrorReason, TemplateErrorReason};
    use std::fs;

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("home.tpl");
        fs::write(&path, "<h1>{{title}}</h1>").unwrap();

        let source = FileTemplateSource::new(path.clone(), "page:home".to_owned());
        let t = source.load().unwrap();
        assert_eq!(t.name.as_deref(), Some("page:home"));
        assert_eq!(t.elements.len(), 3);
        assert!(modified_time(source.path()).is_some());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = FileTemplateSource::new(dir.path().join("gone.tpl"), "page:gone".to_owned());
        match missing.load().unwrap_err().into_reason() {
            RenderErrorReason::Locator(LocatorError::TemplateNotReadable(name, _)) => {
                assert_eq!(name, "page:gone")
            }
            other => panic!("unexpected {:?}", other),
        }

        let binary = dir.path().join("bin.tpl");
        fs::write(&binary, [0xffu8, 0xfe, 0x00]).unwrap();
        let binary = FileTemplateSource::new(binary, "page:bin".to_owned());
        assert!(binary.load().is_err());

        let broken = dir.path().join("broken.tpl");
        fs::write(&broken, "{{#a}}").unwrap();
        let broken = FileTemplateSource::new(broken, "page:broken".to_owned());
        match broken.load().unwrap_err().into_reason() {
            RenderErrorReason::Template(e) => {
                assert_eq!(e.reason, TemplateErrorReason::UnclosedSection("a".to_owned()));
                assert_eq!(e.template_name.as_deref(), Some("page:broken"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
