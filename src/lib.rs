//! # MiniMustache
//!
//! A small mustache-like template engine for server rendered HTML, paired with
//! a filesystem locator that only ever reads templates from whitelisted
//! directories.
//!
//! ## Template syntax
//!
//! * `{{path.to.value}}` prints a value, HTML escaped.
//! * `{{{path}}}` prints a value unescaped. Only use it for trusted markup or
//!   for values checked with the [`safe`] helpers.
//! * `{{#path}}...{{/path}}` renders its body when the value is truthy, and
//!   `{{^path}}...{{/path}}` when it is not.
//! * `{{#each path}}...{{/each}}` renders its body once per item. Inside the
//!   body the fields of an object item shadow outer names, and a scalar item
//!   is available as `{{this}}`.
//! * `{{> prefix:name}}` includes another template. `{{> @key}}` and
//!   `{{> prefix:@key}}` take the name from the context.
//!
//! Text outside of tags is copied as is.
//!
//! ## Usage
//!
//! ```no_run
//! use minimustache::{FilesystemTemplateLocator, MiniMustache};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let locator = FilesystemTemplateLocator::default()
//!     .with_root("page", "templates/pages")?
//!     .with_root("component", "templates/components")?;
//! let engine = MiniMustache::new(locator);
//!
//! let html = engine.render("page:home", &json!({"title": "Agenda"}))?;
//! println!("{}", html);
//! # Ok(())
//! # }
//! ```
//!
//! Templates are compiled on first use and cached by logical name. Enable
//! [`Registry::set_dev_mode`] to pick up edits without a restart.
//!
//! Template names are resolved with the `prefix:relative/path` scheme. Names
//! without a prefix belong to `page`, and the `.tpl` extension is appended
//! unless present. Unknown prefixes, absolute paths, `..` segments and
//! symlinks leading out of a root are all refused.

#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;

pub use self::context::{BlockContext, Context};
pub use self::error::{
    LocatorError, RenderError, RenderErrorReason, TemplateError, TemplateErrorReason,
};
pub use self::json::value::{to_json, JsonRender, JsonTruthy};
pub use self::locator::{
    FilesystemTemplateLocator, LogicalName, TemplateLocator, DEFAULT_EXTENSION, DEFAULT_PREFIX,
};
pub use self::output::{Output, StringOutput, WriteOutput};
pub use self::registry::{
    html_escape, no_escape, EscapeFn, Registry, Registry as MiniMustache, RegistryConfig,
};
pub use self::render::{RenderContext, Renderable};
pub use self::support::str::escape_html;
pub use self::template::Template;

mod cache;
mod context;
mod error;
mod grammar;
pub mod json;
mod locator;
mod output;
mod registry;
mod render;
pub mod safe;
mod sources;
mod support;
pub mod template;
