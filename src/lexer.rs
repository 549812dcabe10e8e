use lazy_static::lazy_static;
use regex::Regex;

use crate::limits::{
    MAX_BRACKET_DEPTH, MAX_CODE_SPAN_BACKTICKS, MAX_DELIMITER_STACK, MAX_INLINE_NESTING,
    MAX_LINK_PAREN_DEPTH,
};
use crate::utils::{self, stack::Stack};

lazy_static! {
    static ref ORDERED_MARK_RE: Regex = Regex::new(r"^(\d{1,9})([.)])$").unwrap();
    static ref HTML_BLOCK_RE: Regex = Regex::new(
        r"(?i)^(?:<!--|</?(?:address|article|aside|blockquote|body|details|dialog|div|dl|dd|dt|fieldset|figcaption|figure|footer|form|h[1-6]|header|hr|html|iframe|li|main|nav|ol|p|pre|script|section|style|summary|table|tbody|td|tfoot|th|thead|tr|ul)(?:\s|/?>|$))"
    )
    .unwrap();
    static ref ENTITY_RE: Regex =
        Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap();
    static ref AUTOLINK_RE: Regex =
        Regex::new(r"^<([A-Za-z][A-Za-z0-9+.\-]{1,31}:[^<>\x00-\x20]*)>").unwrap();
    static ref AUTOMAIL_RE: Regex = Regex::new(r"^<([^<>\s@]+@[^<>\s@]+)>").unwrap();
    static ref INLINE_HTML_RE: Regex = Regex::new(
        r#"^(?:<[A-Za-z][A-Za-z0-9\-]*(?:\s+[A-Za-z_:][A-Za-z0-9_.:\-]*(?:\s*=\s*(?:[^\s"'=<>`]+|'[^']*'|"[^"]*"))?)*\s*/?>|</[A-Za-z][A-Za-z0-9\-]*\s*>|<!--(?:[^-]|-[^-])*-->)"#
    )
    .unwrap();
}

// The leading mark of a line, it decides which kind of block the line starts.
#[derive(Debug, PartialEq, Clone)]
pub(crate) enum Mark {
    // #, ##, ..., ######
    Title(usize),
    // -, *, +
    UnorderedList(char),
    // 1. or 1)
    OrderedList(u64, char),
    // ---, ***, ___
    Dividing,
    // >
    Quote,
    // ``` or ~~~ with an optional info string
    CodeFence { fence: String, info: String },
    // <div>, <!-- ...
    Html,
}

// The result of splitting one line.
#[derive(Debug, PartialEq)]
pub(crate) struct Lexed {
    // number of leading spaces
    pub(crate) indent: usize,
    pub(crate) mark: Option<Mark>,
    // char position where the content after the mark begins
    pub(crate) content: usize,
    pub(crate) blank: bool,
}

impl Lexed {
    fn new(indent: usize, mark: Option<Mark>, content: usize) -> Self {
        Lexed {
            indent,
            mark,
            content,
            blank: false,
        }
    }
}

// Lexer recognizes the mark at the beginning of a line.
// Tabs in the leading whitespace must already be expanded to spaces.
pub(crate) struct Lexer<'lex> {
    line_text: &'lex str,
}

impl<'lex> Lexer<'lex> {
    pub(crate) fn new(text: &'lex str) -> Self {
        Lexer { line_text: text }
    }

    pub(crate) fn split(&self) -> Lexed {
        let indent = self.line_text.chars().take_while(|c| *c == ' ').count();
        let rest = utf8_slice::from(self.line_text, indent);

        if rest.trim().is_empty() {
            return Lexed {
                blank: true,
                ..Lexed::new(indent, None, indent)
            };
        }
        if let Some(m) = Self::split_fence(rest) {
            return Lexed::new(indent, Some(m), indent);
        }
        if let Some(after) = rest.strip_prefix('>') {
            let gap = usize::from(after.starts_with(' '));
            return Lexed::new(indent, Some(Mark::Quote), indent + 1 + gap);
        }
        if Self::is_dividing(rest) {
            return Lexed::new(indent, Some(Mark::Dividing), indent);
        }
        if HTML_BLOCK_RE.is_match(rest) {
            return Lexed::new(indent, Some(Mark::Html), indent);
        }

        // find the first word
        let word_len = rest.chars().take_while(|c| !c.is_whitespace()).count();
        let first_word = utf8_slice::slice(rest, 0, word_len);
        let after = utf8_slice::from(rest, word_len);
        let gap = after.chars().take_while(|c| c.is_whitespace()).count();

        match self.split_mark(first_word) {
            Some(m @ Mark::Title(_)) => Lexed::new(indent, Some(m), indent + word_len + gap),
            Some(m) => {
                // an empty item or an item starting with indented code keeps one space
                let gap = if after.trim().is_empty() || gap > 4 {
                    1
                } else {
                    gap
                };
                Lexed::new(indent, Some(m), indent + word_len + gap)
            }
            None => Lexed::new(indent, None, indent),
        }
    }

    // parse the first word in the line as the mark
    fn split_mark(&self, first_word: &str) -> Option<Mark> {
        if (1..=6).contains(&first_word.len()) && first_word.chars().all(|c| c == '#') {
            return Some(Mark::Title(first_word.len()));
        }
        match first_word {
            "*" | "-" | "+" => first_word.chars().next().map(Mark::UnorderedList),
            _ => ORDERED_MARK_RE.captures(first_word).and_then(|caps| {
                let start = caps[1].parse::<u64>().ok()?;
                let delimiter = caps[2].chars().next()?;
                Some(Mark::OrderedList(start, delimiter))
            }),
        }
    }

    // .e.g:
    //      ```rust
    //      ~~~~ text
    fn split_fence(rest: &str) -> Option<Mark> {
        let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let n = rest.chars().take_while(|c| *c == ch).count();
        if n < 3 {
            return None;
        }
        let info = rest[n..].trim();
        if ch == '`' && info.contains('`') {
            return None;
        }
        Some(Mark::CodeFence {
            fence: rest[..n].to_string(),
            info: info.to_string(),
        })
    }

    // three or more '*', '-' or '_', spaces are allowed between them
    fn is_dividing(rest: &str) -> bool {
        let mut chars = rest.chars().filter(|c| !c.is_whitespace());
        let first = match chars.next() {
            Some(c @ ('*' | '-' | '_')) => c,
            _ => return false,
        };
        let mut count = 1;
        for c in chars {
            if c != first {
                return false;
            }
            count += 1;
        }
        count >= 3
    }
}

// Token is an inline span inside the text of a block.
#[derive(Debug, PartialEq, Clone)]
pub(crate) enum Token {
    Text(String),
    Code(String),
    Delimiter(Delimiter),
    Link {
        text: String,
        location: String,
        title: String,
    },
    Image {
        alt: String,
        location: String,
        title: String,
    },
    AutoLink(String),
    AutoMail(String),
    Html(String),
    LineBreak,
    SoftBreak,
}

// A run of '*' or '_'. After emphasis is resolved, 'opens' and 'closes'
// hold the tags this run opens and closes, 'count' the characters left as text.
#[derive(Debug, PartialEq, Clone)]
pub(crate) struct Delimiter {
    pub(crate) mark: char,
    pub(crate) count: usize,
    run: usize,
    can_open: bool,
    can_close: bool,
    pub(crate) opens: Vec<&'static str>,
    pub(crate) closes: Vec<&'static str>,
}

impl Delimiter {
    pub(crate) fn literal(&self) -> String {
        std::iter::repeat(self.mark).take(self.count).collect()
    }
}

// Split the text of a block (lines joined with '\n') into inline tokens.
pub(crate) fn split_inline(text: &str) -> Vec<Token> {
    let mut lx = InlineLexer {
        text,
        pos: 0,
        buff: vec![],
        pending: String::new(),
        unclosed_ticks: [false; MAX_CODE_SPAN_BACKTICKS + 1],
    };
    lx.split();
    let mut buff = lx.buff;
    resolve_emphasis(&mut buff);
    buff
}

// The text of the inline spans without any markup, used for image alt.
pub(crate) fn plain_text(text: &str) -> String {
    plain_text_nested(text, 0)
}

fn plain_text_nested(text: &str, depth: usize) -> String {
    if depth >= MAX_INLINE_NESTING {
        return text.to_string();
    }
    split_inline(text)
        .iter()
        .map(|t| match t {
            Token::Text(s) | Token::Code(s) | Token::AutoLink(s) | Token::AutoMail(s) => s.clone(),
            Token::Delimiter(d) => d.literal(),
            Token::Link { text, .. } => plain_text_nested(text, depth + 1),
            Token::Image { alt, .. } => plain_text_nested(alt, depth + 1),
            // entity references keep their character, tags are dropped
            Token::Html(s) if s.starts_with('&') => {
                html_escape::decode_html_entities(s).into_owned()
            }
            Token::Html(_) => String::new(),
            Token::LineBreak | Token::SoftBreak => " ".to_string(),
        })
        .collect()
}

struct InlineLexer<'inline> {
    text: &'inline str,
    pos: usize,
    buff: Vec<Token>,
    pending: String,
    // backtick run lengths already known to have no closer
    unclosed_ticks: [bool; MAX_CODE_SPAN_BACKTICKS + 1],
}

struct LinkParts {
    text: String,
    location: String,
    title: String,
    end: usize,
}

impl<'inline> InlineLexer<'inline> {
    // 'pos' is a byte offset and always stays on a char boundary,
    // every mark recognized here is ASCII.
    fn split(&mut self) {
        let text = self.text;
        let bytes = text.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\\' => self.split_escape(),
                b'`' => self.split_code(),
                b'*' | b'_' => self.split_delimiter(),
                b'!' if bytes.get(self.pos + 1) == Some(&b'[') => {
                    if !self.split_link(true) {
                        self.push_literal(1);
                    }
                }
                b'[' => {
                    if !self.split_link(false) {
                        self.push_literal(1);
                    }
                }
                b'<' => {
                    if !self.split_angle() {
                        self.push_literal(1);
                    }
                }
                b'&' => self.split_entity(),
                b'\n' => self.split_newline(),
                _ => match text[self.pos..].chars().next() {
                    Some(ch) => {
                        self.pending.push(ch);
                        self.pos += ch.len_utf8();
                    }
                    None => break,
                },
            }
        }
        let len = self.pending.trim_end_matches(' ').len();
        self.pending.truncate(len);
        self.flush();
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.buff
                .push(Token::Text(std::mem::take(&mut self.pending)));
        }
    }

    fn push_literal(&mut self, n: usize) {
        self.pending.push_str(&self.text[self.pos..self.pos + n]);
        self.pos += n;
    }

    fn split_escape(&mut self) {
        match self.text[self.pos + 1..].chars().next() {
            Some('\n') => {
                self.pos += 1;
                self.split_line_break(true);
            }
            Some(c) if c.is_ascii_punctuation() => {
                self.pending.push(c);
                self.pos += 2;
            }
            _ => self.push_literal(1),
        }
    }

    fn split_newline(&mut self) {
        let trailing = self.pending.len() - self.pending.trim_end_matches(' ').len();
        self.split_line_break(trailing >= 2);
    }

    // 'pos' points at the '\n'
    fn split_line_break(&mut self, hard: bool) {
        let len = self.pending.trim_end_matches(' ').len();
        self.pending.truncate(len);
        self.flush();
        self.buff.push(if hard {
            Token::LineBreak
        } else {
            Token::SoftBreak
        });
        self.pos += 1;
        let text = self.text;
        let bytes = text.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
            self.pos += 1;
        }
    }

    fn run_length(&self, at: usize, b: u8) -> usize {
        self.text.as_bytes()[at..]
            .iter()
            .take_while(|x| **x == b)
            .count()
    }

    // a code span is closed by a backtick run of the same length
    fn split_code(&mut self) {
        let text = self.text;
        let bytes = text.as_bytes();
        let n = self.run_length(self.pos, b'`');
        if n > MAX_CODE_SPAN_BACKTICKS || self.unclosed_ticks[n] {
            self.push_literal(n);
            return;
        }
        let open_end = self.pos + n;

        let mut j = open_end;
        while j < bytes.len() {
            if bytes[j] != b'`' {
                j += 1;
                continue;
            }
            let m = self.run_length(j, b'`');
            if m == n {
                let content = text[open_end..j].replace('\n', " ");
                let content = if content.len() >= 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && !content.trim().is_empty()
                {
                    content[1..content.len() - 1].to_string()
                } else {
                    content
                };
                self.flush();
                self.buff.push(Token::Code(content));
                self.pos = j + m;
                return;
            }
            j += m;
        }
        // no closing run, the backticks are literal
        self.unclosed_ticks[n] = true;
        self.push_literal(n);
    }

    fn split_delimiter(&mut self) {
        let b = self.text.as_bytes()[self.pos];
        let mark = b as char;
        let n = self.run_length(self.pos, b);
        let end = self.pos + n;

        let prev = self.text[..self.pos].chars().next_back();
        let next = self.text[end..].chars().next();
        let prev_ws = prev.map_or(true, char::is_whitespace);
        let next_ws = next.map_or(true, char::is_whitespace);
        let prev_punct = prev.map_or(false, is_punctuation);
        let next_punct = next.map_or(false, is_punctuation);

        let left = !next_ws && (!next_punct || prev_ws || prev_punct);
        let right = !prev_ws && (!prev_punct || next_ws || next_punct);
        let (can_open, can_close) = if mark == '*' {
            (left, right)
        } else {
            (left && (!right || prev_punct), right && (!left || next_punct))
        };

        if !can_open && !can_close {
            self.push_literal(n);
            return;
        }
        self.flush();
        self.buff.push(Token::Delimiter(Delimiter {
            mark,
            count: n,
            run: n,
            can_open,
            can_close,
            opens: vec![],
            closes: vec![],
        }));
        self.pos = end;
    }

    // [text](location "title") or ![alt](location "title")
    fn split_link(&mut self, image: bool) -> bool {
        let open = if image { self.pos + 1 } else { self.pos };
        let parts = match scan_link(self.text, open) {
            Some(parts) => parts,
            None => return false,
        };
        self.flush();
        self.buff.push(if image {
            Token::Image {
                alt: parts.text,
                location: parts.location,
                title: parts.title,
            }
        } else {
            Token::Link {
                text: parts.text,
                location: parts.location,
                title: parts.title,
            }
        });
        self.pos = parts.end;
        true
    }

    // autolinks and inline html
    fn split_angle(&mut self) -> bool {
        let rest = &self.text[self.pos..];
        if let Some(caps) = AUTOLINK_RE.captures(rest) {
            if utils::is_url(&caps[1]) {
                let token = Token::AutoLink(caps[1].to_string());
                return self.push_token(token, caps[0].len());
            }
        }
        if let Some(caps) = AUTOMAIL_RE.captures(rest) {
            if utils::is_email(&caps[1]) {
                let token = Token::AutoMail(caps[1].to_string());
                return self.push_token(token, caps[0].len());
            }
        }
        if let Some(m) = INLINE_HTML_RE.find(rest) {
            let token = Token::Html(m.as_str().to_string());
            return self.push_token(token, m.end());
        }
        false
    }

    // entity references are kept as they are
    fn split_entity(&mut self) {
        match ENTITY_RE.find(&self.text[self.pos..]) {
            Some(m) => {
                let token = Token::Html(m.as_str().to_string());
                self.push_token(token, m.end());
            }
            None => self.push_literal(1),
        }
    }

    fn push_token(&mut self, t: Token, len: usize) -> bool {
        self.flush();
        self.buff.push(t);
        self.pos += len;
        true
    }
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii())
}

// skip a backslash and the punctuation it escapes, smaller steps would split a char
fn escape_len(bytes: &[u8], at: usize) -> usize {
    match bytes.get(at + 1) {
        Some(b) if b.is_ascii_punctuation() => 2,
        _ => 1,
    }
}

fn skip_whitespace(bytes: &[u8], mut at: usize) -> usize {
    while at < bytes.len() && bytes[at].is_ascii_whitespace() {
        at += 1;
    }
    at
}

// 'open' is the index of '['
fn scan_link(s: &str, open: usize) -> Option<LinkParts> {
    let bytes = s.as_bytes();

    // find the matching ']'
    let mut depth = 0usize;
    let mut i = open;
    let mut close = None;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += escape_len(bytes, i);
                continue;
            }
            b'[' => {
                depth += 1;
                if depth > MAX_BRACKET_DEPTH {
                    return None;
                }
            }
            b']' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }
    let close = close?;
    let text = s[open + 1..close].to_string();

    let mut i = close + 1;
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    i = skip_whitespace(bytes, i + 1);

    // location
    let location = if bytes.get(i) == Some(&b'<') {
        let begin = i + 1;
        let mut j = begin;
        while j < bytes.len() && bytes[j] != b'>' {
            match bytes[j] {
                b'\n' | b'<' => return None,
                b'\\' => j += escape_len(bytes, j),
                _ => j += 1,
            }
        }
        if j >= bytes.len() {
            return None;
        }
        i = j + 1;
        unescape(&s[begin..j])
    } else {
        let begin = i;
        let mut parens = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    i += escape_len(bytes, i);
                    continue;
                }
                b' ' | b'\t' | b'\n' => break,
                b'(' => {
                    parens += 1;
                    if parens > MAX_LINK_PAREN_DEPTH {
                        return None;
                    }
                }
                b')' => {
                    if parens == 0 {
                        break;
                    }
                    parens -= 1;
                }
                _ => {}
            }
            i += 1;
        }
        unescape(&s[begin..i])
    };

    // optional title
    i = skip_whitespace(bytes, i);
    let mut title = String::new();
    if let Some(&q) = bytes.get(i).filter(|q| matches!(**q, b'"' | b'\'' | b'(')) {
        let close_q = if q == b'(' { b')' } else { q };
        let begin = i + 1;
        let mut j = begin;
        while j < bytes.len() && bytes[j] != close_q {
            if q == b'(' && bytes[j] == b'(' {
                return None;
            }
            j += if bytes[j] == b'\\' {
                escape_len(bytes, j)
            } else {
                1
            };
        }
        if j >= bytes.len() {
            return None;
        }
        title = unescape(&s[begin..j]);
        i = skip_whitespace(bytes, j + 1);
    }

    if bytes.get(i) != Some(&b')') {
        return None;
    }
    Some(LinkParts {
        text,
        location,
        title,
        end: i + 1,
    })
}

// remove backslashes that escape ASCII punctuation
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(n) = chars.peek().copied().filter(char::is_ascii_punctuation) {
                out.push(n);
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn remaining(t: &Token) -> usize {
    match t {
        Token::Delimiter(d) => d.count,
        _ => 0,
    }
}

// Pair the delimiter runs into <em> and <strong>. A closer matches the nearest
// opener of the same mark, the openers between them stay literal text.
fn resolve_emphasis(buff: &mut [Token]) {
    let mut openers: Stack<usize> = Stack::new();

    for ix in 0..buff.len() {
        let (mark, run, can_open, can_close) = match &buff[ix] {
            Token::Delimiter(d) => (d.mark, d.run, d.can_open, d.can_close),
            _ => continue,
        };

        if can_close {
            while remaining(&buff[ix]) > 0 {
                let found = openers.rposition(|o| match &buff[*o] {
                    Token::Delimiter(d) => {
                        d.mark == mark
                            && d.count > 0
                            // the "multiple of 3" rule for runs that can both open and close
                            && !((d.can_close || can_open)
                                && (d.run + run) % 3 == 0
                                && !(d.run % 3 == 0 && run % 3 == 0))
                    }
                    _ => false,
                });
                let (at, o) = match found.and_then(|at| openers.get(at).map(|o| (at, *o))) {
                    Some(v) => v,
                    None => break,
                };

                let used = if remaining(&buff[o]) >= 2 && remaining(&buff[ix]) >= 2 {
                    2
                } else {
                    1
                };
                let tag = if used == 2 { "strong" } else { "em" };
                if let Token::Delimiter(d) = &mut buff[o] {
                    d.count -= used;
                    d.opens.insert(0, tag);
                }
                if let Token::Delimiter(d) = &mut buff[ix] {
                    d.count -= used;
                    d.closes.push(tag);
                }

                openers.truncate(at + 1);
                if remaining(&buff[o]) == 0 {
                    openers.pop();
                }
            }
        }

        if can_open && remaining(&buff[ix]) > 0 && openers.len() < MAX_DELIMITER_STACK {
            openers.push(ix);
        }
    }
}
