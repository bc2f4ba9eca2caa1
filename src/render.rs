use std::mem;

use serde_json::value::Value as Json;

use crate::context::{BlockContext, Context};
use crate::error::{RenderError, RenderErrorReason};
use crate::json::path::Path;
use crate::json::value::{JsonRender, JsonTruthy};
use crate::output::{Output, StringOutput};
use crate::registry::Registry;
use crate::template::TemplateElement::*;
use crate::template::{
    rewrite_legacy_name, BlockTemplate, PartialRef, Template, TemplateElement, TemplateMapping,
};

/// The state of one render call tree.
///
/// It tracks the stack of templates entered through partials, which bounds
/// recursion and names the template an error happened in, the `{{#each}}`
/// scopes of the template being rendered and the expanded output of its
/// partials.
#[derive(Debug, Default, Clone)]
pub struct RenderContext {
    template_stack: Vec<String>,
    blocks: Vec<BlockContext>,
    partial_outputs: Vec<Vec<String>>,
}

impl RenderContext {
    pub fn new() -> RenderContext {
        RenderContext::default()
    }

    /// Number of templates currently entered.
    pub fn depth(&self) -> usize {
        self.template_stack.len()
    }

    pub fn current_template(&self) -> Option<&str> {
        self.template_stack.last().map(String::as_str)
    }

    /// Enter the template `name`, failing once more than `max_depth`
    /// templates would be nested.
    pub(crate) fn push_template(&mut self, name: &str, max_depth: usize) -> Result<(), RenderError> {
        if self.template_stack.len() >= max_depth {
            return Err(RenderError::from(RenderErrorReason::RecursionLimitExceeded(
                name.to_owned(),
                max_depth,
            )));
        }
        self.template_stack.push(name.to_owned());
        Ok(())
    }

    pub(crate) fn pop_template(&mut self) {
        self.template_stack.pop();
    }

    pub fn blocks(&self) -> &[BlockContext] {
        &self.blocks
    }

    pub(crate) fn push_block(&mut self, block: BlockContext) {
        self.blocks.push(block);
    }

    pub(crate) fn pop_block(&mut self) {
        self.blocks.pop();
    }

    /// Evaluate `path` in the innermost `{{#each}}` scope.
    pub fn evaluate<'a>(&self, ctx: &'a Context, path: &Path) -> Option<&'a Json> {
        ctx.navigate_in(&self.blocks, path)
    }

    fn partial_output(&self, index: usize) -> Option<&str> {
        self.partial_outputs
            .last()
            .and_then(|outputs| outputs.get(index))
            .map(String::as_str)
    }
}

/// Render trait
pub trait Renderable {
    /// render into the given output
    fn render(
        &self,
        registry: &Registry,
        ctx: &Context,
        rc: &mut RenderContext,
        out: &mut dyn Output,
    ) -> Result<(), RenderError>;

    /// render into string
    fn renders(
        &self,
        registry: &Registry,
        ctx: &Context,
        rc: &mut RenderContext,
    ) -> Result<String, RenderError> {
        let mut so = StringOutput::new();
        self.render(registry, ctx, rc, &mut so)?;
        Ok(so.into_string())
    }
}

impl Template {
    /// Attach the position of the innermost failing element and the name of
    /// the template to `e`, unless a nested template already did.
    fn locate_error(
        &self,
        mut e: RenderError,
        mapping: Option<&TemplateMapping>,
        rc: &RenderContext,
    ) -> RenderError {
        if e.line_no.is_none() {
            if let Some(&TemplateMapping(line, col)) = mapping {
                e.line_no = Some(line);
                e.column_no = Some(col);
            }
        }

        if e.template_name.is_none() {
            e.template_name = self
                .name
                .clone()
                .or_else(|| rc.current_template().map(str::to_owned));
        }

        e
    }

    /// Render every partial of this template, at any block depth, against
    /// `ctx`. Partials under falsy sections or empty lists are loaded and
    /// rendered too, so a broken reference always fails the render.
    fn expand_partials(
        &self,
        registry: &Registry,
        ctx: &Context,
        rc: &mut RenderContext,
    ) -> Result<Vec<String>, RenderError> {
        let partials = self.partials();
        let mut expanded = Vec::with_capacity(partials.len());
        for (include, mapping) in partials {
            let rendered = match resolve_partial_name(&include.target, ctx) {
                Some(name) => {
                    debug!("including partial {:?}", name);
                    let mut so = StringOutput::new();
                    registry
                        .render_partial(&name, ctx, rc, &mut so)
                        .map_err(|e| self.locate_error(e, Some(mapping), rc))?;
                    so.into_string()
                }
                None => {
                    debug!("dynamic partial {:?} resolved to nothing", include.target);
                    String::new()
                }
            };
            expanded.push(rendered);
        }
        Ok(expanded)
    }

    /// Render the elements of this template, or of a block body, in the
    /// scopes currently held by `rc`.
    pub(crate) fn render_elements(
        &self,
        registry: &Registry,
        ctx: &Context,
        rc: &mut RenderContext,
        out: &mut dyn Output,
    ) -> Result<(), RenderError> {
        for (idx, t) in self.elements.iter().enumerate() {
            t.render(registry, ctx, rc, out)
                .map_err(|e| self.locate_error(e, self.mapping.get(idx), rc))?;
        }
        Ok(())
    }
}

impl Renderable for Template {
    /// Partials are expanded first, against `ctx` itself, then the remaining
    /// directives are rendered with the partial output spliced in as text.
    fn render(
        &self,
        registry: &Registry,
        ctx: &Context,
        rc: &mut RenderContext,
        out: &mut dyn Output,
    ) -> Result<(), RenderError> {
        let outer_blocks = mem::take(&mut rc.blocks);

        let result = match self.expand_partials(registry, ctx, rc) {
            Ok(expanded) => {
                rc.partial_outputs.push(expanded);
                let rendered = self.render_elements(registry, ctx, rc, out);
                rc.partial_outputs.pop();
                rendered
            }
            Err(e) => Err(e),
        };

        rc.blocks = outer_blocks;
        result
    }
}

/// The logical name a partial reference points to in `ctx`, or `None` when a
/// dynamic reference has nothing usable to point at.
pub(crate) fn resolve_partial_name(partial: &PartialRef, ctx: &Context) -> Option<String> {
    match *partial {
        PartialRef::Static(ref name) => Some(name.clone()),
        PartialRef::Dynamic {
            ref prefix,
            ref key,
        } => {
            let value = match ctx.navigate(key) {
                Some(Json::String(s)) => s.trim(),
                _ => return None,
            };
            if value.is_empty() {
                return None;
            }
            match *prefix {
                Some(ref p) => Some(format!("{}:{}", p, value)),
                None => Some(rewrite_legacy_name(value).into_owned()),
            }
        }
    }
}

fn render_each_item(
    block: &BlockTemplate,
    base_path: &[String],
    seg: String,
    registry: &Registry,
    ctx: &Context,
    rc: &mut RenderContext,
    out: &mut dyn Output,
) -> Result<(), RenderError> {
    let mut item_path = Vec::with_capacity(base_path.len() + 1);
    item_path.extend_from_slice(base_path);
    item_path.push(seg);

    rc.push_block(BlockContext::new(item_path));
    let result = block.template.render_elements(registry, ctx, rc, out);
    rc.pop_block();
    result
}

impl Renderable for TemplateElement {
    fn render(
        &self,
        registry: &Registry,
        ctx: &Context,
        rc: &mut RenderContext,
        out: &mut dyn Output,
    ) -> Result<(), RenderError> {
        match *self {
            RawString(ref v) => {
                out.write(v)?;
                Ok(())
            }
            Expression(ref path) => {
                if let Some(value) = rc.evaluate(ctx, path) {
                    let rendered = value.render();
                    out.write(&registry.get_escape_fn()(&rendered))?;
                }
                Ok(())
            }
            HtmlExpression(ref path) => {
                if let Some(value) = rc.evaluate(ctx, path) {
                    out.write(&value.render())?;
                }
                Ok(())
            }
            Section(ref block) => {
                let truthy = rc.evaluate(ctx, &block.path).is_truthy();
                trace!("section {} is {}", block.path, truthy);
                if truthy {
                    block.template.render_elements(registry, ctx, rc, out)?;
                }
                Ok(())
            }
            InvertedSection(ref block) => {
                let truthy = rc.evaluate(ctx, &block.path).is_truthy();
                trace!("inverted section {} is {}", block.path, truthy);
                if !truthy {
                    block.template.render_elements(registry, ctx, rc, out)?;
                }
                Ok(())
            }
            Each(ref block) => {
                let (base_path, value) = match ctx.resolve_in(rc.blocks(), &block.path) {
                    Some(found) => found,
                    None => {
                        trace!("each {} has nothing to iterate", block.path);
                        return Ok(());
                    }
                };
                match *value {
                    Json::Array(ref list) => {
                        trace!("each {} over {} items", block.path, list.len());
                        for idx in 0..list.len() {
                            render_each_item(
                                block,
                                &base_path,
                                idx.to_string(),
                                registry,
                                ctx,
                                rc,
                                out,
                            )?;
                        }
                    }
                    Json::Object(ref obj) => {
                        trace!("each {} over {} values", block.path, obj.len());
                        for key in obj.keys() {
                            render_each_item(
                                block,
                                &base_path,
                                key.clone(),
                                registry,
                                ctx,
                                rc,
                                out,
                            )?;
                        }
                    }
                    _ => trace!("each {} is not iterable", block.path),
                }
                Ok(())
            }
            Partial(ref include) => {
                if let Some(rendered) = rc.partial_output(include.index) {
                    out.write(rendered)?;
                }
                Ok(())
            }
        }
    }
}
