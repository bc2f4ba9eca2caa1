use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CachedTemplate, TemplateCache};
use crate::context::Context;
use crate::error::{LocatorError, RenderError};
use crate::locator::{
    FilesystemTemplateLocator, TemplateLocator, DEFAULT_EXTENSION, DEFAULT_PREFIX,
};
use crate::output::{Output, StringOutput, WriteOutput};
use crate::render::{RenderContext, Renderable};
use crate::sources::{modified_time, FileTemplateSource, Source};
use crate::support::str::escape_html;
use crate::template::Template;

/// Default bound on nested partial inclusion.
pub const DEFAULT_MAX_RENDER_DEPTH: usize = 32;

/// This type represents an *escape fn*, that is a function whose purpose it is
/// to escape potentially problematic characters in a string.
///
/// An *escape fn* is represented as a `Box` to avoid unnecessary type
/// parameters (and because traits cannot be aliased using `type`).
pub type EscapeFn = Box<dyn Fn(&str) -> String + Send + Sync>;

/// The default *escape fn* replaces the characters `&"<>'`
/// with the equivalent html / xml entities.
pub fn html_escape(data: &str) -> String {
    escape_html(data)
}

/// `EscapeFn` that does not change anything. Useful when using in a non-html
/// environment.
pub fn no_escape(data: &str) -> String {
    data.to_owned()
}

fn default_prefix_roots() -> BTreeMap<String, PathBuf> {
    BTreeMap::new()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_owned()
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_owned()
}

fn default_max_render_depth() -> usize {
    DEFAULT_MAX_RENDER_DEPTH
}

/// Startup configuration of a filesystem backed registry.
///
/// ```
/// use minimustache::RegistryConfig;
///
/// let config: RegistryConfig = serde_json::from_str(r#"{
///     "roots": {"page": "templates/pages", "component": "templates/components"},
///     "dev_mode": true
/// }"#).unwrap();
/// assert_eq!(config.extension, ".tpl");
/// assert_eq!(config.max_render_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// prefix => template root directory
    #[serde(default = "default_prefix_roots")]
    pub roots: BTreeMap<String, PathBuf>,
    /// prefix given to names that carry none
    #[serde(default = "default_prefix")]
    pub default_prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_max_render_depth")]
    pub max_render_depth: usize,
    #[serde(default)]
    pub dev_mode: bool,
}

impl Default for RegistryConfig {
    fn default() -> RegistryConfig {
        RegistryConfig {
            roots: default_prefix_roots(),
            default_prefix: default_prefix(),
            extension: default_extension(),
            max_render_depth: default_max_render_depth(),
            dev_mode: false,
        }
    }
}

/// The template engine.
///
/// Templates are addressed by logical name (`prefix:path`), resolved through a
/// [`TemplateLocator`], compiled once and cached for the lifetime of the
/// registry. A registry can be shared between threads.
pub struct Registry {
    locator: Box<dyn TemplateLocator + Send + Sync>,
    cache: TemplateCache,
    escape_fn: EscapeFn,
    default_prefix: String,
    dev_mode: bool,
    max_render_depth: usize,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("cached_templates", &self.cache.len())
            .field("dev_mode", &self.dev_mode)
            .field("max_render_depth", &self.max_render_depth)
            .finish()
    }
}

impl Registry {
    pub fn new<L>(locator: L) -> Registry
    where
        L: TemplateLocator + Send + Sync + 'static,
    {
        Registry {
            locator: Box::new(locator),
            cache: TemplateCache::new(),
            escape_fn: Box::new(html_escape),
            default_prefix: default_prefix(),
            dev_mode: false,
            max_render_depth: DEFAULT_MAX_RENDER_DEPTH,
        }
    }

    /// Build a registry over a [`FilesystemTemplateLocator`], checking every
    /// configured root.
    pub fn from_config(config: &RegistryConfig) -> Result<Registry, LocatorError> {
        let mut locator = FilesystemTemplateLocator::new(config.extension.clone());
        for (prefix, dir) in config.roots.iter() {
            locator.add_root(prefix, dir)?;
        }

        let mut registry = Registry::new(locator);
        registry.set_default_prefix(config.default_prefix.clone());
        registry.set_dev_mode(config.dev_mode);
        registry.set_max_render_depth(config.max_render_depth);
        Ok(registry)
    }

    /// Prefix assumed for names without one, `page` unless changed.
    pub fn set_default_prefix<S: Into<String>>(&mut self, prefix: S) {
        self.default_prefix = prefix.into();
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// The cache key of `name`: `prefix:path` with the default prefix filled
    /// in when `name` has none.
    pub fn normalize_name(&self, name: &str) -> String {
        if name.contains(':') {
            name.to_owned()
        } else {
            format!("{}:{}", self.default_prefix, name)
        }
    }

    /// Enable or disable dev mode
    ///
    /// With dev mode on, every cache hit checks the template file's
    /// modification time and reloads it when the file changed.
    pub fn set_dev_mode(&mut self, enabled: bool) {
        self.dev_mode = enabled;
    }

    /// Return dev mode state, default is false
    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Maximum number of nested templates, the page itself included.
    pub fn set_max_render_depth(&mut self, depth: usize) {
        self.max_render_depth = depth.max(1);
    }

    pub fn max_render_depth(&self) -> usize {
        self.max_render_depth
    }

    /// Register a new *escape fn* to be used from now on by this registry.
    pub fn register_escape_fn<F: 'static + Fn(&str) -> String + Send + Sync>(
        &mut self,
        escape_fn: F,
    ) {
        self.escape_fn = Box::new(escape_fn);
    }

    /// Restore the default *escape fn*.
    pub fn unregister_escape_fn(&mut self) {
        self.escape_fn = Box::new(html_escape);
    }

    /// Get a reference to the current *escape fn*.
    pub fn get_escape_fn(&self) -> &dyn Fn(&str) -> String {
        &*self.escape_fn
    }

    pub fn locator(&self) -> &dyn TemplateLocator {
        &*self.locator
    }

    /// Fetch the compiled template for `name`, loading it on first use.
    ///
    /// Cache hits never call the locator; in dev mode they stat the cached
    /// file to catch modifications.
    pub fn get_template(&self, name: &str) -> Result<Arc<Template>, RenderError> {
        let key = self.normalize_name(name);
        let name = key.as_str();
        if let Some(entry) = self.cache.get(name) {
            if !self.dev_mode {
                return Ok(entry.template);
            }
            if !entry.is_stale(modified_time(&entry.path)) {
                return Ok(entry.template);
            }
            warn!("template {:?} changed on disk, reloading", name);
            self.cache.remove(name);
        }

        debug!("loading template {:?}", name);
        let path = self.locator.locate(name)?;
        let source = FileTemplateSource::new(path, name.to_owned());
        let modified = modified_time(source.path());
        let template = Arc::new(source.load()?);

        self.cache.insert(
            name.to_owned(),
            CachedTemplate {
                template: template.clone(),
                path: source.into_path(),
                modified,
            },
        );
        Ok(template)
    }

    /// Whether `name` is currently cached.
    pub fn has_template(&self, name: &str) -> bool {
        self.cache.get(&self.normalize_name(name)).is_some()
    }

    /// Drop every cached template.
    pub fn clear_templates(&self) {
        self.cache.clear();
    }

    pub(crate) fn render_partial(
        &self,
        name: &str,
        ctx: &Context,
        rc: &mut RenderContext,
        out: &mut dyn Output,
    ) -> Result<(), RenderError> {
        rc.push_template(name, self.max_render_depth)?;
        let result = self
            .get_template(name)
            .and_then(|t| t.render(self, ctx, rc, out));
        rc.pop_template();
        result
    }

    /// Render the template `name` against an already wrapped context.
    pub fn render_with_context(&self, name: &str, ctx: &Context) -> Result<String, RenderError> {
        let mut output = StringOutput::new();
        let mut rc = RenderContext::new();
        self.render_partial(name, ctx, &mut rc, &mut output)?;
        Ok(output.into_string())
    }

    /// Render the page template `name` with `data`.
    ///
    /// Layouts are not applied here: a page includes its layout through a
    /// partial of its own.
    pub fn render<T>(&self, name: &str, data: &T) -> Result<String, RenderError>
    where
        T: Serialize,
    {
        let ctx = Context::wraps(data)?;
        self.render_with_context(name, &ctx)
    }

    /// Render a fragment, such as a component returned on its own to an
    /// asynchronous request. The mechanics are the same as `render`.
    pub fn render_component<T>(&self, name: &str, data: &T) -> Result<String, RenderError>
    where
        T: Serialize,
    {
        debug!(target: "minimustache::component", "rendering component {:?}", name);
        self.render(name, data)
    }

    /// Render `name` with `data` into `writer`.
    ///
    /// Output is buffered until the render succeeds, so `writer` never sees a
    /// partial page.
    pub fn render_to_write<T, W>(&self, name: &str, data: &T, writer: W) -> Result<(), RenderError>
    where
        T: Serialize,
        W: Write,
    {
        let rendered = self.render(name, data)?;
        let mut output = WriteOutput::new(writer);
        output.write(&rendered)?;
        Ok(())
    }

    /// Render inline template text. The text is compiled on every call and
    /// never cached, but partials it includes are.
    pub fn render_template<T>(&self, template_string: &str, data: &T) -> Result<String, RenderError>
    where
        T: Serialize,
    {
        let tpl = Template::compile(template_string)?;
        let ctx = Context::wraps(data)?;
        let mut rc = RenderContext::new();
        tpl.renders(self, &ctx, &mut rc)
    }
}
