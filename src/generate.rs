use crate::error::Result;
use crate::html::{escape_attr, escape_text};
use crate::lexer::{self, Token};
use crate::limits::MAX_INLINE_NESTING;
use crate::parser::{self, Block, HtmlGenerate, List};

use serde::Serialize;
use tinytemplate::TinyTemplate;

// Generator turns the blocks of the Ast into html elements. The templates are
// unescaped, every value is escaped before it is put in a context.
pub(crate) struct Generator<'generator> {
    tt: TinyTemplate<'generator>,
}

impl<'generator> Generator<'generator> {
    pub(crate) fn new() -> Result<Self> {
        let mut g = Generator {
            tt: TinyTemplate::new(),
        };
        g.init()?;
        Ok(g)
    }

    fn init(&mut self) -> Result<()> {
        self.tt.add_template(TITLE_TEMPLATE_NAME, TITLE_TEMPLATE)?;
        self.tt
            .add_template(TEXT_PARAGRAPH_TEMPLATE_NAME, TEXT_PARAGRAPH_TEMPLATE)?;
        self.tt.add_template(CODE_TEMPLATE_NAME, CODE_TEMPLATE)?;
        self.tt.add_template(QUOTE_TEMPLATE_NAME, QUOTE_TEMPLATE)?;
        self.tt
            .add_template(ORDERED_LIST_TEMPLATE_NAME, ORDERED_LIST_TEMPLATE)?;
        self.tt
            .add_template(UNORDERED_LIST_TEMPLATE_NAME, UNORDERED_LIST_TEMPLATE)?;
        self.tt.add_template(LINK_TEMPLATE_NAME, LINK_TEMPLATE)?;
        self.tt.add_template(IMG_TEMPLATE_NAME, IMG_TEMPLATE)?;

        self.tt
            .set_default_formatter(&tinytemplate::format_unescaped);
        Ok(())
    }

    // Render the inline spans of a block's text
    pub(crate) fn render_inline(&self, text: &str) -> Result<String> {
        self.render_inline_nested(text, 0)
    }

    fn render_inline_nested(&self, text: &str, depth: usize) -> Result<String> {
        if depth >= MAX_INLINE_NESTING {
            return Ok(escape_text(text).into_owned());
        }
        let mut html = String::new();

        for t in lexer::split_inline(text) {
            match t {
                Token::Text(s) => html.push_str(&escape_text(&s)),
                Token::Code(s) => {
                    html.push_str("<code>");
                    html.push_str(&escape_text(&s));
                    html.push_str("</code>");
                }
                Token::Delimiter(d) => {
                    for tag in d.closes.iter() {
                        html.push_str(&format!("</{}>", tag));
                    }
                    html.push_str(&d.literal());
                    for tag in d.opens.iter() {
                        html.push_str(&format!("<{}>", tag));
                    }
                }
                Token::Link {
                    text,
                    location,
                    title,
                } => {
                    let show_name = self.render_inline_nested(&text, depth + 1)?;
                    let (location, title) = (decode(&location), decode(&title));
                    html.push_str(&self.render_link(&show_name, &location, &title)?);
                }
                Token::Image {
                    alt,
                    location,
                    title,
                } => {
                    let alt = lexer::plain_text(&alt);
                    let (location, title) = (decode(&location), decode(&title));
                    html.push_str(&self.render_image(&alt, &location, &title)?);
                }
                Token::AutoLink(s) => {
                    html.push_str(&self.render_link(&escape_text(&s), &s, "")?);
                }
                Token::AutoMail(s) => {
                    let location = format!("mailto:{}", s);
                    html.push_str(&self.render_link(&escape_text(&s), &location, "")?);
                }
                Token::Html(s) => html.push_str(&s),
                Token::LineBreak => html.push_str("<br>\n"),
                Token::SoftBreak => html.push('\n'),
            }
        }
        Ok(html)
    }

    // 'show_name' is already html
    fn render_link(&self, show_name: &str, location: &str, title: &str) -> Result<String> {
        let ctx = LinkContext {
            show_name,
            location: &escape_attr(location),
            title: &escape_attr(title),
        };
        Ok(self.tt.render(LINK_TEMPLATE_NAME, &ctx)?)
    }

    fn render_image(&self, alt: &str, location: &str, title: &str) -> Result<String> {
        let ctx = ImageContext {
            alt: &escape_attr(alt),
            location: &escape_attr(location),
            title: &escape_attr(title),
        };
        Ok(self.tt.render(IMG_TEMPLATE_NAME, &ctx)?)
    }

    // The paragraphs of a tight list are rendered without <p>
    fn render_items(&self, list: &List) -> Result<Vec<String>> {
        list.items
            .iter()
            .map(|item| -> Result<String> {
                let mut parts: Vec<(bool, String)> = vec![];
                for b in item.iter() {
                    let part = match b {
                        Block::NormalText(lines) if !list.loose => {
                            (true, self.render_inline(&lines.join("\n"))?)
                        }
                        _ => (false, parser::render_block(b, self)?),
                    };
                    parts.push(part);
                }

                let mut s = if parts.first().map_or(false, |p| !p.0) {
                    String::from("\n")
                } else {
                    String::new()
                };
                s.push_str(
                    &parts
                        .iter()
                        .map(|p| p.1.as_str())
                        .collect::<Vec<&str>>()
                        .join("\n"),
                );
                if parts.last().map_or(false, |p| !p.0) {
                    s.push('\n');
                }
                Ok(s)
            })
            .collect()
    }
}

impl<'generator> HtmlGenerate for Generator<'generator> {
    fn body_title(&self, level: usize, text: &str) -> Result<String> {
        let ctx = TitleContext {
            level,
            text: self.render_inline(text)?,
        };
        Ok(self.tt.render(TITLE_TEMPLATE_NAME, &ctx)?)
    }

    fn body_dividing(&self) -> Result<String> {
        Ok("<hr>".to_string())
    }

    fn body_normal(&self, lines: &[String]) -> Result<String> {
        let ctx = TextParagraphContext {
            text: self.render_inline(&lines.join("\n"))?,
        };
        Ok(self.tt.render(TEXT_PARAGRAPH_TEMPLATE_NAME, &ctx)?)
    }

    fn body_code(&self, info: &str, text: &str) -> Result<String> {
        let ctx = CodeBlockContext {
            name: &escape_attr(info),
            text: &escape_text(text),
        };
        Ok(self.tt.render(CODE_TEMPLATE_NAME, &ctx)?)
    }

    fn body_html(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn body_quote(&self, blocks: &[Block]) -> Result<String> {
        let ctx = QuoteContext {
            body: parser::render_blocks(blocks, self)?,
        };
        Ok(self.tt.render(QUOTE_TEMPLATE_NAME, &ctx)?)
    }

    fn body_ordered_list(&self, start: u64, list: &List) -> Result<String> {
        let ctx = OrderedListContext {
            has_start: start != 1,
            start,
            list: self.render_items(list)?,
        };
        Ok(self.tt.render(ORDERED_LIST_TEMPLATE_NAME, &ctx)?)
    }

    fn body_unordered_list(&self, list: &List) -> Result<String> {
        let ctx = UnorderedListContext {
            list: self.render_items(list)?,
        };
        Ok(self.tt.render(UNORDERED_LIST_TEMPLATE_NAME, &ctx)?)
    }
}

// title
const TITLE_TEMPLATE_NAME: &str = "title";
const TITLE_TEMPLATE: &str = "<h{level}>{text}</h{level}>";

#[derive(Serialize)]
struct TitleContext {
    level: usize,
    text: String,
}

// normal text
const TEXT_PARAGRAPH_TEMPLATE_NAME: &str = "normal_text";
const TEXT_PARAGRAPH_TEMPLATE: &str = "<p>{text}</p>";

#[derive(Serialize)]
struct TextParagraphContext {
    text: String,
}

// code block
const CODE_TEMPLATE_NAME: &str = "code_block";
const CODE_TEMPLATE: &str = "<pre><code\
{{ if name }} class=\"language-{name}\"{{ endif }}>\
{text}\
</code></pre>";

#[derive(Serialize)]
struct CodeBlockContext<'cbc> {
    name: &'cbc str,
    text: &'cbc str,
}

// quote block
const QUOTE_TEMPLATE_NAME: &str = "quote";
const QUOTE_TEMPLATE: &str = "\
<blockquote>
{{ if body }}{body}
{{ endif }}</blockquote>";

#[derive(Serialize)]
struct QuoteContext {
    body: String,
}

// ordered list
const ORDERED_LIST_TEMPLATE_NAME: &str = "ordered_list";
const ORDERED_LIST_TEMPLATE: &str = "\
<ol{{ if has_start }} start=\"{start}\"{{ endif }}>
{{ for item in list }}<li>{item}</li>
{{ endfor }}</ol>";

#[derive(Serialize)]
struct OrderedListContext {
    has_start: bool,
    start: u64,
    list: Vec<String>,
}

// unordered list
const UNORDERED_LIST_TEMPLATE_NAME: &str = "unordered_list";
const UNORDERED_LIST_TEMPLATE: &str = "\
<ul>
{{ for item in list }}<li>{item}</li>
{{ endfor }}</ul>";

#[derive(Serialize)]
struct UnorderedListContext {
    list: Vec<String>,
}

// link
const LINK_TEMPLATE_NAME: &str = "link";
const LINK_TEMPLATE: &str =
    r#"<a href="{location}"{{ if title }} title="{title}"{{ endif }}>{show_name}</a>"#;

#[derive(Serialize)]
struct LinkContext<'uc> {
    show_name: &'uc str,
    location: &'uc str,
    title: &'uc str,
}

// image
const IMG_TEMPLATE_NAME: &str = "img";
const IMG_TEMPLATE: &str =
    r#"<img src="{location}" alt="{alt}"{{ if title }} title="{title}"{{ endif }}>"#;

#[derive(Serialize)]
struct ImageContext<'ic> {
    alt: &'ic str,
    location: &'ic str,
    title: &'ic str,
}

// Entity references in a link destination or title stand for their character
fn decode(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}
