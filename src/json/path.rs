use std::fmt;

/// A dotted key such as `article.author.name`, split into its segments.
///
/// Paths are produced by the template compiler from already validated
/// directive text, so parsing never fails: empty segments are dropped and an
/// empty path addresses the current value.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Path {
    raw: String,
    segs: Vec<String>,
}

impl Path {
    pub fn parse(raw: &str) -> Path {
        let segs = raw
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Path {
            raw: raw.trim().to_owned(),
            segs,
        }
    }

    /// The path as written in the template.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segs(&self) -> &[String] {
        &self.segs
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'a> From<&'a str> for Path {
    fn from(raw: &'a str) -> Path {
        Path::parse(raw)
    }
}
