//! Line-oriented tokenizer for Sanny Builder scripts.
//!
//! The scanner never fails: characters it does not recognize are emitted as
//! one-character [`TokenKind::Unknown`] tokens so the stream stays lossless
//! apart from whitespace and `//` comments. Strings and comments never span
//! lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    OpenRoundBracket,
    CloseRoundBracket,
    OpenSquareBracket,
    CloseSquareBracket,
    Equals,
    Comma,
    Dot,
    EqualEqual,
    PlusEquals,
    MinusEquals,
    /// `@label`
    LabelJump,
    /// `:label`
    LabelDefine,
    /// `$name`
    GlobalVar,
    /// `0@`
    LocalVar,
    /// `10s`, `3v`, ...
    ArraySize,
    Identifier,
    Number,
    Float,
    String,
    Unknown,
    NewLine,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based
    pub line: u32,
    /// 0-based, counted in chars
    pub col: u32,
}

impl Token {
    /// Name of a prefix-tagged token without its tag character.
    pub fn bare_name(&self) -> &str {
        match self.kind {
            TokenKind::LabelJump | TokenKind::LabelDefine | TokenKind::GlobalVar => {
                self.text.get(1..).unwrap_or_default()
            },
            _ => &self.text,
        }
    }
}

fn single_char_kind(c: char) -> Option<TokenKind> {
    match c {
        '(' => Some(TokenKind::OpenRoundBracket),
        ')' => Some(TokenKind::CloseRoundBracket),
        '[' => Some(TokenKind::OpenSquareBracket),
        ']' => Some(TokenKind::CloseSquareBracket),
        '=' => Some(TokenKind::Equals),
        ',' => Some(TokenKind::Comma),
        '.' => Some(TokenKind::Dot),
        _ => None,
    }
}

fn two_char_kind(first: char, second: char) -> Option<TokenKind> {
    match (first, second) {
        ('=', '=') => Some(TokenKind::EqualEqual),
        ('+', '=') => Some(TokenKind::PlusEquals),
        ('-', '=') => Some(TokenKind::MinusEquals),
        _ => None,
    }
}

fn prefix_kind(c: char) -> Option<TokenKind> {
    match c {
        '@' => Some(TokenKind::LabelJump),
        ':' => Some(TokenKind::LabelDefine),
        '$' => Some(TokenKind::GlobalVar),
        _ => None,
    }
}

fn postfix_kind(c: char) -> Option<TokenKind> {
    match c {
        '@' => Some(TokenKind::LocalVar),
        'i' | 'f' | 's' | 'v' => Some(TokenKind::ArraySize),
        _ => None,
    }
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct LineScanner<'a> {
    chars: &'a [char],
    line: u32,
    tokens: &'a mut Vec<Token>,
}

impl LineScanner<'_> {
    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            text: self.chars[start..end].iter().collect(),
            line: self.line,
            col: start as u32,
        });
    }

    fn peek(&self, col: usize) -> Option<char> {
        self.chars.get(col).copied()
    }

    fn skip_while(&self, mut col: usize, pred: impl Fn(char) -> bool) -> usize {
        while self.peek(col).is_some_and(&pred) {
            col += 1;
        }
        col
    }

    /// Scan one token starting at `col` and return the column after it.
    fn scan(&mut self, col: usize) -> usize {
        let c = self.chars[col];
        let next = self.peek(col + 1);

        if let Some(kind) = next.and_then(|n| two_char_kind(c, n)) {
            self.push(kind, col, col + 2);
            return col + 2;
        }

        if let Some(kind) = single_char_kind(c) {
            self.push(kind, col, col + 1);
            return col + 1;
        }

        if let Some(kind) = prefix_kind(c) {
            let end = self.skip_while(col + 1, is_word);
            self.push(kind, col, end);
            return end;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let end = self.skip_while(col + 1, is_word);
            self.push(TokenKind::Identifier, col, end);
            return end;
        }

        if c.is_ascii_digit() {
            return self.scan_numeric(col);
        }

        if c == '\'' || c == '"' {
            return self.scan_string(col, c);
        }

        self.push(TokenKind::Unknown, col, col + 1);
        col + 1
    }

    fn scan_numeric(&mut self, start: usize) -> usize {
        let digits_end = self.skip_while(start, |c| c.is_ascii_digit());

        if let Some(kind) = self.peek(digits_end).and_then(postfix_kind) {
            self.push(kind, start, digits_end + 1);
            return digits_end + 1;
        }

        let mut end = digits_end;
        let mut is_float = false;
        if self.peek(end) == Some('.') {
            is_float = true;
            end = self.skip_while(end + 1, |c| c.is_ascii_digit());
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Number
        };
        self.push(kind, start, end);
        end
    }

    fn scan_string(&mut self, start: usize, quote: char) -> usize {
        let mut col = start + 1;
        while let Some(c) = self.peek(col) {
            if c == '\\' && col + 1 < self.chars.len() {
                col += 2;
                continue;
            }
            col += 1;
            if c == quote {
                break;
            }
        }
        self.push(TokenKind::String, start, col);
        col
    }

    fn run(&mut self) {
        let mut col = 0;
        while let Some(c) = self.peek(col) {
            if c.is_whitespace() {
                col += 1;
                continue;
            }
            if c == '/' && self.peek(col + 1) == Some('/') {
                break;
            }
            col = self.scan(col);
        }

        self.tokens.push(Token {
            kind: TokenKind::NewLine,
            text: "\n".to_string(),
            line: self.line,
            col: self.chars.len() as u32,
        });
    }
}

/// Scan `text` into a flat token stream ending with [`TokenKind::Eof`].
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut line_count = 0u32;

    for (index, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        let chars: Vec<char> = line.chars().collect();
        let mut scanner = LineScanner {
            chars: &chars,
            line: index as u32 + 1,
            tokens: &mut tokens,
        };
        scanner.run();
        line_count = index as u32 + 1;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line: line_count + 1,
        col: 0,
    });
    tokens
}
