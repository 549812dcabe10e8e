use tracing::debug;

use crate::error::Result;
use crate::generate::Generator;
use crate::html::Shell;
use crate::parser::Ast;
use crate::{Document, Render};

/// Parses the text as Markdown and renders the blocks as html elements.
///
/// The parser is permissive: syntax it does not recognise is kept as escaped
/// text, so content alone never makes a conversion fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRender;

impl Render for MarkdownRender {
    fn render(&self, doc: &Document) -> Result<String> {
        let body = to_body(&doc.text)?;
        Shell::new()?.wrap(&doc.title, &body)
    }
}

/// Render a markdown string into the html of the document body, without the shell.
pub fn to_body(text: &str) -> Result<String> {
    let mut ast = Ast::new();
    ast.parse_string(text);
    debug!(
        lines = ast.count_lines(),
        blocks = ast.blocks().len(),
        "parsed markdown"
    );
    ast.render_html(&Generator::new()?)
}
