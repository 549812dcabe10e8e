use std::borrow::Cow;

use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::error::Result;

// The static document shell shared by every renderer.
const SHELL_TEMPLATE_NAME: &str = "shell";
const SHELL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        body \{ font-family: Arial, sans-serif; margin: 40px; }
        pre \{ background: #f4f4f4; padding: 10px; }
        code \{ background: #f4f4f4; padding: 2px 4px; }
    </style>
</head>
<body>
{body}
</body>
</html>
"#;

#[derive(Serialize)]
struct ShellContext<'shell_context> {
    title: &'shell_context str,
    body: &'shell_context str,
}

pub(crate) struct Shell<'shell> {
    tt: TinyTemplate<'shell>,
}

impl<'shell> Shell<'shell> {
    pub(crate) fn new() -> Result<Self> {
        let mut tt = TinyTemplate::new();
        tt.add_template(SHELL_TEMPLATE_NAME, SHELL_TEMPLATE)?;
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        Ok(Shell { tt })
    }

    // Wrap an already rendered body into a complete document, `title` is escaped here.
    pub(crate) fn wrap(&self, title: &str, body: &str) -> Result<String> {
        let title = escape_text(title);
        let ctx = ShellContext {
            title: &title,
            body,
        };
        Ok(self.tt.render(SHELL_TEMPLATE_NAME, &ctx)?)
    }
}

/// Escapes `&`, `<` and `>` for use as element content.
pub(crate) fn escape_text(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

/// Escapes a value placed inside a double-quoted attribute.
#[cfg(feature = "markdown")]
pub(crate) fn escape_attr(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}
