//! `${name}` placeholder templates.
//!
//! Only `${` opens a placeholder, so proxy syntax such as `{remote}` or a
//! trailing `{` passes through untouched.

use crate::render::RenderError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(&'static str),
}

/// A compiled template fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: &'static str,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile `source`, accepting only placeholders listed in `allowed`.
    pub fn compile(
        name: &'static str,
        source: &str,
        allowed: &[&'static str],
    ) -> Result<Self, RenderError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("${") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }

            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| RenderError::Unterminated {
                fragment: name.to_string(),
                offset: offset + start,
            })?;

            let placeholder = after[..end].trim();
            let known = allowed
                .iter()
                .find(|a| **a == placeholder)
                .ok_or_else(|| RenderError::UnknownPlaceholder {
                    fragment: name.to_string(),
                    name: placeholder.to_string(),
                })?;
            segments.push(Segment::Placeholder(*known));

            let consumed = start + 2 + end + 1;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { name, segments })
    }

    /// Append the expansion to `out`. `values` maps placeholder → text.
    pub fn render_into(&self, out: &mut String, values: &[(&str, &str)]) -> Result<(), RenderError> {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => {
                    let value = values
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| RenderError::Unresolved {
                            fragment: self.name.to_string(),
                            name: key.to_string(),
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(())
    }
}
