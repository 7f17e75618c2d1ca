//! Artifact minification.
//!
//! A conservative single-pass minifier for the block's built source: strips
//! `//` and `/* */` comments, collapses indentation and repeated blanks, and
//! leaves every token and line break intact, so automatic semicolon
//! insertion is never disturbed. String, template, and regex literals pass
//! through untouched.
//!
//! Whether a `/` opens a regex literal is decided from the previous
//! significant character (the usual jsmin heuristic). A regex directly after
//! a keyword (`return /[/]/`) reads as division; wrap it in parentheses.
//!
//! Malformed input — an unterminated comment, string, template, or regex —
//! is an error. Callers treat that as fatal; there is no raw fallback.

use anyhow::{Result, bail};

/// Characters after which a `/` opens a regex literal rather than division.
const REGEX_PRECEDERS: &str = "(,=:[!&|?{};+-*/%~^<>";

/// Minify block source text.
pub fn minify(code: &str) -> Result<String> {
    Minifier::new(code).run()
}

struct Minifier {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    out: String,
    /// Whitespace owed before the next emitted character; `\n` wins over ` `.
    pending: Option<char>,
    prev_significant: Option<char>,
}

impl Minifier {
    fn new(code: &str) -> Self {
        Self {
            chars: code.chars().collect(),
            pos: 0,
            line: 1,
            out: String::with_capacity(code.len()),
            pending: None,
            prev_significant: None,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn emit(&mut self, ch: char) {
        if let Some(ws) = self.pending.take()
            && !self.out.is_empty()
        {
            self.out.push(ws);
        }
        self.out.push(ch);
        if !ch.is_whitespace() {
            self.prev_significant = Some(ch);
        }
    }

    fn owe_space(&mut self) {
        if self.pending != Some('\n') {
            self.pending = Some(' ');
        }
    }

    fn run(mut self) -> Result<String> {
        while let Some(ch) = self.peek(0) {
            match ch {
                '\n' => {
                    self.line += 1;
                    self.pending = Some('\n');
                    self.pos += 1;
                }
                c if c.is_whitespace() => {
                    self.owe_space();
                    self.pos += 1;
                }
                '"' | '\'' => self.copy_string(ch)?,
                '`' => self.copy_template()?,
                '/' => match self.peek(1) {
                    Some('/') => self.skip_line_comment(),
                    Some('*') => self.skip_block_comment()?,
                    _ if self.starts_regex() => self.copy_regex()?,
                    _ => {
                        self.emit('/');
                        self.pos += 1;
                    }
                },
                _ => {
                    self.emit(ch);
                    self.pos += 1;
                }
            }
        }
        Ok(self.out)
    }

    fn starts_regex(&self) -> bool {
        match self.prev_significant {
            None => true,
            Some(prev) => REGEX_PRECEDERS.contains(prev),
        }
    }

    fn copy_string(&mut self, quote: char) -> Result<()> {
        let start_line = self.line;
        self.emit(quote);
        self.pos += 1;

        while let Some(ch) = self.peek(0) {
            match ch {
                '\\' => {
                    let Some(escaped) = self.peek(1) else {
                        bail!("unterminated string literal starting on line {start_line}");
                    };
                    if escaped == '\n' {
                        // Escaped line continuation.
                        self.line += 1;
                    }
                    self.emit('\\');
                    self.emit(escaped);
                    self.pos += 2;
                }
                '\n' => bail!("unterminated string literal starting on line {start_line}"),
                c => {
                    self.emit(c);
                    self.pos += 1;
                    if c == quote {
                        return Ok(());
                    }
                }
            }
        }
        bail!("unterminated string literal starting on line {start_line}");
    }

    fn copy_template(&mut self) -> Result<()> {
        let start_line = self.line;
        self.emit('`');
        self.pos += 1;

        while let Some(ch) = self.peek(0) {
            match ch {
                '\\' => {
                    let Some(escaped) = self.peek(1) else {
                        bail!("unterminated template literal starting on line {start_line}");
                    };
                    if escaped == '\n' {
                        self.line += 1;
                    }
                    self.emit('\\');
                    self.emit(escaped);
                    self.pos += 2;
                }
                '\n' => {
                    self.line += 1;
                    self.emit('\n');
                    self.pos += 1;
                }
                c => {
                    self.emit(c);
                    self.pos += 1;
                    if c == '`' {
                        return Ok(());
                    }
                }
            }
        }
        bail!("unterminated template literal starting on line {start_line}");
    }

    fn copy_regex(&mut self) -> Result<()> {
        let start_line = self.line;
        self.emit('/');
        self.pos += 1;
        let mut in_class = false;

        while let Some(ch) = self.peek(0) {
            match ch {
                '\\' => {
                    let Some(escaped) = self.peek(1) else {
                        bail!("unterminated regular expression starting on line {start_line}");
                    };
                    self.emit('\\');
                    self.emit(escaped);
                    self.pos += 2;
                }
                '\n' => bail!("unterminated regular expression starting on line {start_line}"),
                '[' => {
                    in_class = true;
                    self.emit('[');
                    self.pos += 1;
                }
                ']' => {
                    in_class = false;
                    self.emit(']');
                    self.pos += 1;
                }
                '/' if !in_class => {
                    self.emit('/');
                    self.pos += 1;
                    return Ok(());
                }
                c => {
                    self.emit(c);
                    self.pos += 1;
                }
            }
        }
        bail!("unterminated regular expression starting on line {start_line}");
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek(0) {
            if ch == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let start_line = self.line;
        self.pos += 2;
        let mut spanned_lines = false;

        while let Some(ch) = self.peek(0) {
            if ch == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                if spanned_lines {
                    self.pending = Some('\n');
                } else {
                    self.owe_space();
                }
                return Ok(());
            }
            if ch == '\n' {
                self.line += 1;
                spanned_lines = true;
            }
            self.pos += 1;
        }
        bail!("unterminated block comment starting on line {start_line}");
    }
}
