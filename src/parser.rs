use std::fmt;
use std::fmt::Debug;

use crate::error::Result;
use crate::lexer::{Lexer, Mark};
use crate::limits::MAX_BLOCK_NESTING;

use itertools::Itertools;

pub(crate) trait HtmlGenerate {
    fn body_title(&self, level: usize, text: &str) -> Result<String>;
    fn body_dividing(&self) -> Result<String>;
    fn body_normal(&self, lines: &[String]) -> Result<String>;
    fn body_code(&self, info: &str, text: &str) -> Result<String>;
    fn body_html(&self, text: &str) -> Result<String>;
    fn body_quote(&self, blocks: &[Block]) -> Result<String>;
    fn body_ordered_list(&self, start: u64, list: &List) -> Result<String>;
    fn body_unordered_list(&self, list: &List) -> Result<String>;
}

// Ast represents the abstract syntax tree of the markdown document.
pub(crate) struct Ast {
    document: Vec<Line>,
    blocks: Vec<Block>,
}

impl Ast {
    // Create a Ast instance.
    pub(crate) fn new() -> Self {
        Ast {
            document: vec![],
            blocks: vec![],
        }
    }

    // Parse markdown document from a string.
    pub(crate) fn parse_string(&mut self, s: &str) {
        self.document = Ast::split_lines(s.lines());
        self.blocks = Ast::establish_blocks(&self.document, 0);
    }

    // Iterate through each block of the Ast and process the block into a 'html' string
    pub(crate) fn render_html(&self, html: &impl HtmlGenerate) -> Result<String> {
        render_blocks(&self.blocks, html)
    }

    // Count the lines in ast
    pub(crate) fn count_lines(&self) -> usize {
        self.document.len()
    }

    pub(crate) fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn split_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Line> {
        lines
            .enumerate()
            .map(|(ix, l)| Line::new(ix + 1, l))
            .collect()
    }

    // Parse the content of a container (quote, list item) as a document of its own.
    // Past the nesting limit the content is only split into paragraphs,
    // container marks stay in the text.
    fn parse_nested(lines: &[String], depth: usize) -> Vec<Block> {
        if depth >= MAX_BLOCK_NESTING {
            return lines
                .split(|l| l.trim().is_empty())
                .filter(|group| !group.is_empty())
                .map(|group| {
                    Block::NormalText(group.iter().map(|l| l.trim_start().to_string()).collect())
                })
                .collect();
        }
        let document = Ast::split_lines(lines.iter().map(|s| s.as_str()));
        Ast::establish_blocks(&document, depth)
    }

    fn establish_blocks(all: &[Line], depth: usize) -> Vec<Block> {
        let mut blocks: Vec<Block> = vec![];

        let mut ix = 0;
        while ix < all.len() {
            let curr = &all[ix];

            // four spaces of indentation is code, whatever mark follows
            if curr.kind != Kind::Blank && curr.indent >= 4 {
                ix = Ast::establish_indented_code(all, ix, &mut blocks);
                continue;
            }

            ix = match &curr.mark {
                None if curr.kind == Kind::Blank => ix + 1,
                None => Ast::establish_normal(all, ix, &mut blocks),
                Some(Mark::Title(level)) => {
                    blocks.push(Block::Title(*level, title_text(curr.content())));
                    ix + 1
                }
                Some(Mark::Dividing) => {
                    blocks.push(Block::DividingLine);
                    ix + 1
                }
                Some(Mark::CodeFence { fence, info }) => {
                    Ast::establish_code(all, ix, fence, info, &mut blocks)
                }
                Some(Mark::Html) => Ast::establish_html(all, ix, &mut blocks),
                Some(Mark::Quote) => Ast::establish_quote(all, ix, depth, &mut blocks),
                Some(Mark::UnorderedList(_)) | Some(Mark::OrderedList(..)) => {
                    Ast::establish_list(all, ix, depth, &mut blocks)
                }
            };
        }

        blocks
    }

    // A paragraph runs until a blank line or a line that starts another block.
    // An underline of '=' or '-' turns it into a title.
    fn establish_normal(all: &[Line], ix: usize, blocks: &mut Vec<Block>) -> usize {
        let mut lines = vec![all[ix].text.trim_start().to_string()];

        let mut next = ix + 1;
        while let Some(l) = all.get(next) {
            if let Some(level) = l.setext_level() {
                let text = lines.iter().map(|s| s.trim()).join("\n");
                blocks.push(Block::Title(level, text));
                return next + 1;
            }
            let continued = match &l.mark {
                _ if l.kind == Kind::Blank => false,
                _ if l.indent >= 4 => true,
                None => true,
                // only a list starting with 1 interrupts a paragraph
                Some(Mark::OrderedList(start, _)) => *start != 1,
                Some(_) => false,
            };
            if !continued {
                break;
            }
            lines.push(l.text.trim_start().to_string());
            next += 1;
        }

        blocks.push(Block::NormalText(lines));
        next
    }

    fn establish_indented_code(all: &[Line], ix: usize, blocks: &mut Vec<Block>) -> usize {
        let mut lines: Vec<&str> = vec![];

        let mut next = ix;
        while let Some(l) = all.get(next) {
            if l.kind != Kind::Blank && l.indent < 4 {
                break;
            }
            lines.push(l.strip_indent(4));
            next += 1;
        }
        while lines.last().map_or(false, |s| s.trim().is_empty()) {
            lines.pop();
        }

        blocks.push(Block::Code {
            info: String::new(),
            text: lines.iter().map(|s| format!("{}\n", s)).collect(),
        });
        next
    }

    // A fenced code block is closed by a fence of the same character that is
    // at least as long, or by the end of the document.
    fn establish_code(
        all: &[Line],
        ix: usize,
        fence: &str,
        info: &str,
        blocks: &mut Vec<Block>,
    ) -> usize {
        let indent = all[ix].indent;
        let mut text = String::new();

        let mut next = ix + 1;
        while let Some(l) = all.get(next) {
            next += 1;
            if l.indent < 4 && l.closes_fence(fence) {
                break;
            }
            text.push_str(if indent == 0 {
                l.raw.as_str()
            } else {
                l.strip_indent(indent)
            });
            text.push('\n');
        }

        blocks.push(Block::Code {
            info: info.split_whitespace().next().unwrap_or("").to_string(),
            text,
        });
        next
    }

    // Raw html runs until a blank line.
    fn establish_html(all: &[Line], ix: usize, blocks: &mut Vec<Block>) -> usize {
        let next = all[ix..]
            .iter()
            .position(|l| l.kind == Kind::Blank)
            .map_or(all.len(), |n| ix + n);
        let text = all[ix..next].iter().map(|l| l.raw.as_str()).join("\n");
        blocks.push(Block::Html(text));
        next
    }

    fn establish_quote(all: &[Line], ix: usize, depth: usize, blocks: &mut Vec<Block>) -> usize {
        let mut content: Vec<String> = vec![];

        let mut next = ix;
        while let Some(l) = all.get(next) {
            if l.mark == Some(Mark::Quote) && l.indent < 4 {
                content.push(l.content().to_string());
            } else if l.kind == Kind::NormalText && Ast::continues_text(&content) {
                // lazy continuation of a paragraph in the quote
                content.push(l.text.trim_start().to_string());
            } else {
                break;
            }
            next += 1;
        }

        blocks.push(Block::Quote(Ast::parse_nested(&content, depth + 1)));
        next
    }

    // Items of one list share the same bullet character or the same delimiter.
    // Lines indented to the content of an item belong to the item.
    fn establish_list(all: &[Line], ix: usize, depth: usize, blocks: &mut Vec<Block>) -> usize {
        let leader = &all[ix].mark;
        let start = match leader {
            Some(Mark::OrderedList(start, _)) => Some(*start),
            _ => None,
        };
        let mut list = List {
            start,
            loose: false,
            items: vec![],
        };

        let mut next = ix;
        loop {
            let item = &all[next];
            let mut lines = vec![item.content().to_string()];

            next += 1;
            while let Some(l) = all.get(next) {
                if l.kind == Kind::Blank {
                    lines.push(String::new());
                } else if l.indent >= item.content {
                    lines.push(l.strip_indent(item.content).to_string());
                } else if l.kind == Kind::NormalText && Ast::continues_text(&lines) {
                    lines.push(l.text.trim_start().to_string());
                } else {
                    break;
                }
                next += 1;
            }

            let mut trailing = 0;
            while lines.len() > 1 && lines.last().map_or(false, |s| s.trim().is_empty()) {
                lines.pop();
                trailing += 1;
            }

            let nested = Ast::parse_nested(&lines, depth + 1);
            if nested.len() > 1 && lines.iter().any(|s| s.trim().is_empty()) {
                list.loose = true;
            }
            list.items.push(nested);

            match all.get(next) {
                Some(l) if l.indent < 4 && same_list(leader, &l.mark) => {
                    if trailing > 0 {
                        list.loose = true;
                    }
                }
                _ => break,
            }
        }

        blocks.push(Block::List(list));
        next
    }

    fn continues_text(lines: &[String]) -> bool {
        lines.last().map_or(false, |s| !s.trim().is_empty())
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = String::new();
        for line in self.document.iter() {
            debug.push_str(format!("[{}, {:?}]: {:?}", line.num, line.kind, line.mark).as_str());
            debug.push('\n');
        }
        writeln!(f, "{}", debug)
    }
}

pub(crate) fn render_blocks(blocks: &[Block], html: &impl HtmlGenerate) -> Result<String> {
    let parts: Vec<String> = blocks
        .iter()
        .map(|b| render_block(b, html))
        .collect::<Result<_>>()?;
    Ok(parts.into_iter().filter(|s| !s.is_empty()).join("\n"))
}

pub(crate) fn render_block(b: &Block, html: &impl HtmlGenerate) -> Result<String> {
    match b {
        Block::Title(level, text) => html.body_title(*level, text),
        Block::NormalText(lines) => html.body_normal(lines),
        Block::DividingLine => html.body_dividing(),
        Block::Code { info, text } => html.body_code(info, text),
        Block::Html(text) => html.body_html(text),
        Block::Quote(blocks) => html.body_quote(blocks),
        Block::List(list) => match list.start {
            Some(start) => html.body_ordered_list(start, list),
            None => html.body_unordered_list(list),
        },
    }
}

fn same_list(leader: &Option<Mark>, other: &Option<Mark>) -> bool {
    match (leader, other) {
        (Some(Mark::UnorderedList(a)), Some(Mark::UnorderedList(b))) => a == b,
        (Some(Mark::OrderedList(_, a)), Some(Mark::OrderedList(_, b))) => a == b,
        _ => false,
    }
}

// Strip the optional closing sequence of '#'
fn title_text(s: &str) -> String {
    let t = s.trim();
    let stripped = t.trim_end_matches('#');
    if stripped.is_empty() {
        String::new()
    } else if stripped.ends_with(' ') {
        stripped.trim_end().to_string()
    } else {
        t.to_string()
    }
}

// Expand tabs in the leading whitespace to spaces, tab stops are 4 columns.
fn expand_tabs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut column = 0;
    for (ix, ch) in s.char_indices() {
        match ch {
            ' ' => {
                out.push(' ');
                column += 1;
            }
            '\t' => {
                let width = 4 - column % 4;
                out.extend(std::iter::repeat(' ').take(width));
                column += width;
            }
            _ => {
                out.push_str(&s[ix..]);
                return out;
            }
        }
    }
    out
}

// Block is a group of lines rendered as one html element.
#[derive(Debug, PartialEq)]
pub(crate) enum Block {
    Title(usize, String),
    NormalText(Vec<String>),
    DividingLine,
    Code { info: String, text: String },
    Html(String),
    Quote(Vec<Block>),
    List(List),
}

#[derive(Debug, PartialEq)]
pub(crate) struct List {
    // the number of the first item, only for ordered lists
    pub(crate) start: Option<u64>,
    // a loose list wraps the paragraphs of its items in <p>
    pub(crate) loose: bool,
    pub(crate) items: Vec<Vec<Block>>,
}

#[derive(Debug, PartialEq, Copy, Clone)]
enum Kind {
    Blank,
    NormalText,
    Marked,
}

// Line is a line of the markdown document.
#[derive(Debug)]
struct Line {
    num: usize,
    raw: String,
    // the raw line with the leading tabs expanded
    text: String,
    kind: Kind,
    mark: Option<Mark>,
    indent: usize,
    content: usize,
}

impl Line {
    fn new(num: usize, raw: &str) -> Self {
        let text = expand_tabs(raw);
        let lexed = Lexer::new(&text).split();
        let kind = match (&lexed.mark, lexed.blank) {
            (_, true) => Kind::Blank,
            (None, false) => Kind::NormalText,
            (Some(_), false) => Kind::Marked,
        };
        Line {
            num,
            raw: raw.to_string(),
            kind,
            mark: lexed.mark,
            indent: lexed.indent,
            content: lexed.content,
            text,
        }
    }

    // Get the text after the mark
    fn content(&self) -> &str {
        utf8_slice::from(&self.text, self.content)
    }

    // Get the text with at most 'n' leading spaces removed
    fn strip_indent(&self, n: usize) -> &str {
        &self.text[self.indent.min(n)..]
    }

    fn closes_fence(&self, fence: &str) -> bool {
        let t = self.text.trim();
        match fence.chars().next() {
            Some(ch) => t.len() >= fence.len() && t.chars().all(|c| c == ch),
            None => false,
        }
    }

    // '===' under a paragraph is a level 1 title, '---' a level 2 title
    fn setext_level(&self) -> Option<usize> {
        let t = self.text.trim();
        if self.indent >= 4 || t.is_empty() {
            None
        } else if t.chars().all(|c| c == '=') {
            Some(1)
        } else if t.chars().all(|c| c == '-') {
            Some(2)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(md: &str) -> Ast {
        let mut ast = Ast::new();
        ast.parse_string(md);
        ast
    }

    fn normal(lines: &[&str]) -> Block {
        Block::NormalText(lines.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_document() {
        let md = "# dice 是一个 markdown 编辑器
这是我的一个学习 rust 编程语言的项目，我将尝试去开发一个强大的 markdown 编辑器。

重点:
* 支持 vim 操作
* 支持自动化的命令去编辑文档

1. 支持 vim 操作
2. 支持自动化的命令去编辑文档

---
--- 这不是一个分界线

> Rust, A language empowering everyone to build reliable and efficient software.";

        let ast = parse(md);
        assert_eq!(ast.count_lines(), md.lines().count());

        let blocks = ast.blocks();
        assert_eq!(blocks.len(), 8);
        assert_eq!(
            blocks[0],
            Block::Title(1, "dice 是一个 markdown 编辑器".to_string())
        );
        assert_eq!(
            blocks[1],
            normal(&["这是我的一个学习 rust 编程语言的项目，我将尝试去开发一个强大的 markdown 编辑器。"])
        );
        assert_eq!(blocks[2], normal(&["重点:"]));
        assert!(matches!(&blocks[3], Block::List(l) if l.start.is_none() && l.items.len() == 2));
        assert!(matches!(&blocks[4], Block::List(l) if l.start == Some(1) && l.items.len() == 2));
        assert_eq!(blocks[5], Block::DividingLine);
        assert_eq!(blocks[6], normal(&["--- 这不是一个分界线"]));
        assert!(matches!(&blocks[7], Block::Quote(bs) if bs.len() == 1));
    }

    #[test]
    fn test_title() {
        let ast = parse("# Header1\n## Header2 ##\n###### six\n#\n### a#");
        assert_eq!(
            ast.blocks(),
            &[
                Block::Title(1, "Header1".to_string()),
                Block::Title(2, "Header2".to_string()),
                Block::Title(6, "six".to_string()),
                Block::Title(1, String::new()),
                Block::Title(3, "a#".to_string()),
            ]
        );
    }

    #[test]
    fn test_setext_title() {
        let ast = parse("Title\n=====\n\nSub\ntitle\n---\n");
        assert_eq!(
            ast.blocks(),
            &[
                Block::Title(1, "Title".to_string()),
                Block::Title(2, "Sub\ntitle".to_string()),
            ]
        );
    }

    #[test]
    fn test_paragraph_keeps_trailing_spaces() {
        let ast = parse("这里带有换行  \n新的一行\n  indented\n");
        assert_eq!(
            ast.blocks(),
            &[normal(&["这里带有换行  ", "新的一行", "indented"])]
        );
    }

    #[test]
    fn test_code_block() {
        let md = "这是一个代码块的例子：
```rust
    let s = \"hello world\";

\tlet s1 = s.to_string();
````
    ```
    let s;";

        let ast = parse(md);
        assert_eq!(
            ast.blocks(),
            &[
                normal(&["这是一个代码块的例子："]),
                Block::Code {
                    info: "rust".to_string(),
                    text: "    let s = \"hello world\";\n\n\tlet s1 = s.to_string();\n"
                        .to_string(),
                },
                Block::Code {
                    info: String::new(),
                    text: "```\nlet s;\n".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let ast = parse("~~~\ncode\n```\n");
        assert_eq!(
            ast.blocks(),
            &[Block::Code {
                info: String::new(),
                text: "code\n```\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_nested_list() {
        let md = "* 支持 vim 操作
  vim1
  - nested
* 支持自动化的命令去编辑文档
lazy
+ another list";

        let ast = parse(md);
        let blocks = ast.blocks();
        assert_eq!(blocks.len(), 2);

        match &blocks[0] {
            Block::List(l) => {
                assert!(!l.loose);
                assert_eq!(l.items.len(), 2);
                assert_eq!(l.items[0].len(), 2);
                assert_eq!(l.items[0][0], normal(&["支持 vim 操作", "vim1"]));
                assert!(matches!(&l.items[0][1], Block::List(n) if n.items.len() == 1));
                assert_eq!(l.items[1], vec![normal(&["支持自动化的命令去编辑文档", "lazy"])]);
            }
            other => panic!("not a list: {:?}", other),
        }
        assert!(matches!(&blocks[1], Block::List(l) if l.items.len() == 1));
    }

    #[test]
    fn test_loose_list() {
        let ast = parse("1. a\n\n2. b\n");
        match &ast.blocks()[0] {
            Block::List(l) => {
                assert!(l.loose);
                assert_eq!(l.start, Some(1));
                assert_eq!(l.items.len(), 2);
            }
            other => panic!("not a list: {:?}", other),
        }

        let ast = parse("3) a\n4) b\n\nafter");
        assert_eq!(ast.blocks().len(), 2);
        assert!(matches!(&ast.blocks()[0], Block::List(l) if !l.loose && l.start == Some(3)));
    }

    #[test]
    fn test_quote() {
        let md = "> # In quote
> first
lazy
>
> - item

after";
        let ast = parse(md);
        assert_eq!(ast.blocks().len(), 2);
        match &ast.blocks()[0] {
            Block::Quote(bs) => {
                assert_eq!(bs.len(), 3);
                assert_eq!(bs[0], Block::Title(1, "In quote".to_string()));
                assert_eq!(bs[1], normal(&["first", "lazy"]));
                assert!(matches!(&bs[2], Block::List(_)));
            }
            other => panic!("not a quote: {:?}", other),
        }
        assert_eq!(ast.blocks()[1], normal(&["after"]));
    }

    #[test]
    fn test_html_block() {
        let ast = parse("<div align=\"center\">\n  <img src=\"a.png\">\n</div>\n\ntext");
        assert_eq!(
            ast.blocks(),
            &[
                Block::Html("<div align=\"center\">\n  <img src=\"a.png\">\n</div>".to_string()),
                normal(&["text"]),
            ]
        );
    }

    #[test]
    fn test_ordered_list_interrupts_paragraph_only_from_one() {
        let ast = parse("The year\n1999. was fine\n");
        assert_eq!(ast.blocks(), &[normal(&["The year", "1999. was fine"])]);

        let ast = parse("Steps:\n1. one\n");
        assert_eq!(ast.blocks().len(), 2);
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("\tfoo"), "    foo");
        assert_eq!(expand_tabs("  \tfoo\tbar"), "    foo\tbar");
    }

    #[test]
    fn test_deep_quotes_stop_at_nesting_limit() {
        let md = "> ".repeat(50_000) + "x";
        let ast = parse(&md);

        let mut depth = 0;
        let mut blocks: &[Block] = ast.blocks();
        while let Some(Block::Quote(bs)) = blocks.first() {
            depth += 1;
            blocks = bs;
        }
        assert_eq!(depth, MAX_BLOCK_NESTING);
        match blocks {
            [Block::NormalText(lines)] => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0], "> ".repeat(50_000 - MAX_BLOCK_NESTING) + "x");
            }
            other => panic!("unexpected: {:?}", other.first()),
        }
    }

    #[test]
    fn test_deep_lists_stop_at_nesting_limit() {
        let md = (0..200)
            .map(|i| format!("{}- item {}", "  ".repeat(i), i))
            .join("\n");
        let ast = parse(&md);

        let mut depth = 0;
        let mut blocks: &[Block] = ast.blocks();
        while let Some(Block::List(l)) = blocks.last() {
            depth += 1;
            blocks = &l.items[0];
        }
        assert_eq!(depth, MAX_BLOCK_NESTING);
        match blocks {
            [Block::NormalText(lines)] => {
                assert_eq!(lines.len(), 200 - (MAX_BLOCK_NESTING - 1));
                assert_eq!(lines[0], format!("item {}", MAX_BLOCK_NESTING - 1));
                assert_eq!(lines[1], format!("- item {}", MAX_BLOCK_NESTING));
            }
            other => panic!("unexpected: {:?}", other.first()),
        }
    }
}
