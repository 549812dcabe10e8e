//! Convert one Markdown file into one self-contained html document.
//!
//! Two renderers sit behind the [`Render`] trait: [`Verbatim`] embeds the
//! escaped text in a `<pre>` element, [`MarkdownRender`] parses the text as
//! Markdown. [`Config`] picks one of them.

use std::path::Path;

pub mod config;
pub mod convert;
pub mod error;
mod html;
pub mod verbatim;

#[cfg(feature = "markdown")]
mod generate;
#[cfg(feature = "markdown")]
mod lexer;
#[cfg(feature = "markdown")]
mod limits;
#[cfg(feature = "markdown")]
pub mod markdown;
#[cfg(feature = "markdown")]
mod parser;
#[cfg(feature = "markdown")]
mod utils;

pub use config::{Config, Policy};
pub use convert::{convert, render_string};
pub use error::{Error, Result};
#[cfg(feature = "markdown")]
pub use markdown::MarkdownRender;
pub use verbatim::Verbatim;

/// The input of a renderer: the text of the file and the page title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub text: String,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Document {
            title: title.into(),
            text: text.into(),
        }
    }

    /// The title is the base name of `path`.
    pub fn from_path(path: &Path, text: String) -> Self {
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Document { title, text }
    }
}

/// Turns a document into a complete html page.
pub trait Render {
    fn render(&self, doc: &Document) -> Result<String>;
}
