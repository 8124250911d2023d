//! Caddyfile serializer.

use crate::config::RenderConfig;
use crate::render::{RenderError, RenderedConfig, Renderer, Template};
use crate::routing::RouteTable;

/// Renders a [`RouteTable`] as Caddyfile site blocks.
#[derive(Debug, Clone)]
pub struct CaddyfileRenderer {
    site_open: Template,
    route: Template,
    empty_route: Template,
    site_close: Template,
}

impl CaddyfileRenderer {
    /// Compile the configured fragments. Any template error is fatal.
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        Ok(Self {
            site_open: Template::compile("site_open", &config.site_open, &["host"])?,
            route: Template::compile("route", &config.route, &["host", "path", "upstreams"])?,
            empty_route: Template::compile("empty_route", &config.empty_route, &["host", "path"])?,
            site_close: Template::compile("site_close", &config.site_close, &["host"])?,
        })
    }
}

impl Renderer for CaddyfileRenderer {
    fn render(&self, table: &RouteTable) -> Result<RenderedConfig, RenderError> {
        let mut out = String::new();

        for (index, (host, vhost)) in table.hosts().enumerate() {
            if index > 0 {
                out.push('\n');
            }

            self.site_open.render_into(&mut out, &[("host", host)])?;
            out.push('\n');

            for (path, upstreams) in vhost.paths() {
                if upstreams.is_empty() {
                    tracing::warn!(host = %host, path = %path, "No upstreams for path, leaving it unrouted");
                    self.empty_route
                        .render_into(&mut out, &[("host", host), ("path", path)])?;
                } else {
                    let joined = upstreams.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
                    self.route.render_into(
                        &mut out,
                        &[("host", host), ("path", path), ("upstreams", joined.as_str())],
                    )?;
                }
                out.push('\n');
            }

            self.site_close.render_into(&mut out, &[("host", host)])?;
            out.push('\n');
        }

        Ok(RenderedConfig::new(out))
    }
}
