use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::verbatim::Verbatim;
use crate::Render;

/// Which renderer turns the input text into html.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Embed the raw text in a `<pre>` element.
    Verbatim,
    /// Parse the text as Markdown.
    Markdown,
}

impl Policy {
    pub const NAMES: [&'static str; 2] = ["verbatim", "markdown"];
}

impl Default for Policy {
    fn default() -> Self {
        if cfg!(feature = "markdown") {
            Policy::Markdown
        } else {
            Policy::Verbatim
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Verbatim => write!(f, "verbatim"),
            Policy::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "verbatim" => Ok(Policy::Verbatim),
            "markdown" => Ok(Policy::Markdown),
            _ => Err(Error::Usage(format!(
                "unknown policy '{}', expected one of: {}",
                s,
                Policy::NAMES.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub policy: Policy,
}

impl Config {
    pub fn new(policy: Policy) -> Self {
        Config { policy }
    }

    // Get the renderer for the configured policy
    pub fn renderer(&self) -> Result<Box<dyn Render>> {
        match self.policy {
            Policy::Verbatim => Ok(Box::new(Verbatim)),
            #[cfg(feature = "markdown")]
            Policy::Markdown => Ok(Box::new(crate::markdown::MarkdownRender)),
            #[cfg(not(feature = "markdown"))]
            Policy::Markdown => Err(Error::MissingRenderer {
                policy: self.policy.to_string(),
                hint: "Rebuild md2html with `cargo install md2html --features markdown`, \
                       or pass `--policy verbatim`."
                    .to_string(),
            }),
        }
    }
}
