use crate::error::Result;
use crate::html::{self, Shell};
use crate::{Document, Render};

/// Embeds the raw text in a `<pre>` element without interpreting any Markdown.
///
/// Only `&`, `<` and `>` are escaped, so unescaping the `<pre>` content gives
/// back the input exactly. It never fails on content.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Render for Verbatim {
    fn render(&self, doc: &Document) -> Result<String> {
        let body = format!("<pre>{}</pre>", html::escape_text(&doc.text));
        Shell::new()?.wrap(&doc.title, &body)
    }
}
