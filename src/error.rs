use std::error::Error;
use std::fmt;
use std::io::Error as IOError;
use std::path::PathBuf;

use serde_json::error::Error as SerdeError;

quick_error! {
    /// Failure to resolve a logical template name to a file.
    #[derive(Debug)]
    pub enum LocatorError {
        UnknownPrefix(prefix: String) {
            display("no template root is registered for prefix {:?}", prefix)
        }
        InvalidTemplateName(name: String, reason: &'static str) {
            display("invalid template name {:?}: {}", name, reason)
        }
        PathEscapesRoot(name: String) {
            display("template {:?} resolves outside of its root directory", name)
        }
        TemplateNotFound(name: String) {
            display("template {:?} not found", name)
        }
        TemplateNotReadable(name: String, err: IOError) {
            display("template {:?} is not readable: {}", name, err)
            source(err)
        }
        RootNotFound(prefix: String, path: PathBuf) {
            display("template root {:?} for prefix {:?} is not a readable directory", path, prefix)
        }
    }
}

quick_error! {
    /// Template parsing error
    #[derive(PartialEq, Debug, Clone)]
    pub enum TemplateErrorReason {
        MismatchingClosedSection(open: String, closed: String) {
            display("section {:?} was opened, but {:?} is closing", open, closed)
        }
        UnexpectedClose(closed: String) {
            display("{:?} is closing, but no section is open", closed)
        }
        UnclosedSection(open: String) {
            display("section {:?} was not closed at the end of the template", open)
        }
        InvalidSyntax {
            display("invalid template syntax")
        }
    }
}

/// Error on parsing template.
#[derive(Debug, PartialEq, Clone)]
pub struct TemplateError {
    pub reason: TemplateErrorReason,
    pub template_name: Option<String>,
    pub line_no: Option<usize>,
    pub column_no: Option<usize>,
    segment: Option<String>,
}

impl TemplateError {
    pub fn of(e: TemplateErrorReason) -> TemplateError {
        TemplateError {
            reason: e,
            template_name: None,
            line_no: None,
            column_no: None,
            segment: None,
        }
    }

    pub fn at(mut self, template_str: &str, line_no: usize, column_no: usize) -> TemplateError {
        self.line_no = Some(line_no);
        self.column_no = Some(column_no);
        self.segment = Some(template_segment(template_str, line_no, column_no));
        self
    }

    pub fn in_template(mut self, name: Option<String>) -> TemplateError {
        self.template_name = name;
        self
    }
}

impl Error for TemplateError {}

/// Excerpt of the template around `line`/`col` (both 1-based), with a marker
/// line under the offending column.
pub(crate) fn template_segment(template_str: &str, line: usize, col: usize) -> String {
    let line_start = line.saturating_sub(2).max(1);
    let line_end = line + 2;

    let mut buf = String::new();
    for (line_count, line_content) in template_str.lines().enumerate() {
        let line_count = line_count + 1;
        if line_count >= line_start && line_count <= line_end {
            buf.push_str(&format!("{:4} | {}\n", line_count, line_content));
            if line_count == line {
                buf.push_str(&format!("{:4} |", ""));
                for c in 0..line_content.chars().count() {
                    if c + 1 != col {
                        buf.push('-');
                    } else {
                        buf.push('^');
                    }
                }
                buf.push('\n');
            }
        }
    }

    buf
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match (self.line_no, self.column_no, &self.segment) {
            (Some(line), Some(col), Some(seg)) => writeln!(
                f,
                "{reason}\n    --> Template error in \"{name}\":{line}:{col}\n     |\n{seg}     |\n     = reason: {reason}",
                reason = self.reason,
                name = self.template_name.as_deref().unwrap_or("Unnamed template"),
                line = line,
                col = col,
                seg = seg
            ),
            _ => write!(f, "{}", self.reason),
        }
    }
}

quick_error! {
    /// What went wrong during a render call.
    #[derive(Debug)]
    pub enum RenderErrorReason {
        Locator(err: LocatorError) {
            from()
            source(err)
            display("{}", err)
        }
        Template(err: TemplateError) {
            from()
            source(err)
            display("{}", err)
        }
        Io(err: IOError) {
            from()
            source(err)
            display("failed to write rendered output: {}", err)
        }
        Serialize(err: SerdeError) {
            from()
            source(err)
            display("failed to access render data: {}", err)
        }
        RecursionLimitExceeded(name: String, depth: usize) {
            display("partial {:?} exceeds the maximum render depth of {}", name, depth)
        }
    }
}

/// Error when rendering data on template.
///
/// Nothing is written to the caller on error: renders are all-or-nothing.
#[derive(Debug)]
pub struct RenderError {
    pub template_name: Option<String>,
    pub line_no: Option<usize>,
    pub column_no: Option<usize>,
    reason: RenderErrorReason,
}

impl RenderError {
    pub fn from_reason(reason: RenderErrorReason) -> RenderError {
        RenderError {
            template_name: None,
            line_no: None,
            column_no: None,
            reason,
        }
    }

    pub fn reason(&self) -> &RenderErrorReason {
        &self.reason
    }

    pub fn into_reason(self) -> RenderErrorReason {
        self.reason
    }

    pub fn is_recursion_limit(&self) -> bool {
        matches!(self.reason, RenderErrorReason::RecursionLimitExceeded(..))
    }

    /// The locator failure behind this error, if any.
    pub fn locator_error(&self) -> Option<&LocatorError> {
        match self.reason {
            RenderErrorReason::Locator(ref e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match (self.line_no, self.column_no) {
            (Some(line), Some(col)) => write!(
                f,
                "Error rendering \"{}\" line {}, col {}: {}",
                self.template_name.as_deref().unwrap_or("Unnamed template"),
                line,
                col,
                self.reason
            ),
            _ => write!(f, "{}", self.reason),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.reason.source()
    }
}

impl From<RenderErrorReason> for RenderError {
    fn from(e: RenderErrorReason) -> RenderError {
        RenderError::from_reason(e)
    }
}

impl From<LocatorError> for RenderError {
    fn from(e: LocatorError) -> RenderError {
        RenderError::from_reason(RenderErrorReason::from(e))
    }
}

impl From<TemplateError> for RenderError {
    fn from(e: TemplateError) -> RenderError {
        RenderError::from_reason(RenderErrorReason::from(e))
    }
}

impl From<IOError> for RenderError {
    fn from(e: IOError) -> RenderError {
        RenderError::from_reason(RenderErrorReason::from(e))
    }
}

impl From<SerdeError> for RenderError {
    fn from(e: SerdeError) -> RenderError {
        RenderError::from_reason(RenderErrorReason::from(e))
    }
}
