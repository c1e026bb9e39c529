use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tools::errors::{ErrorKind, Position, ReportCodeErr};

#[derive(Debug, Error, PartialEq)]
pub enum LexerError {
    #[error("unsupported character: -{0}-")]
    UnrecognizedToken(char),

    #[error("found two '.' while tokenizing number -{0}-")]
    DoubleDotNumber(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated rune literal")]
    UnterminatedRune,

    #[error("rune literal must contain exactly one character or escape sequence, found: '{0}'")]
    InvalidRune(String),

    #[error("unknown escape sequence: \\{0}")]
    UnknownEscape(char),

    #[error("unterminated block comment")]
    UnterminatedComment,
}

impl ReportCodeErr for LexerError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Lexical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literal types
    Int,
    Float,
    Str,
    Rune,
    Identifier,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Equals,
    // Value holds the arithmetic operator: "+", "-", "*", "/"
    CompoundAssign,
    ColonEquals,
    Increment,
    Decrement,

    // Grouping
    OpenParen,    // (
    CloseParen,   // )
    OpenBrace,    // {
    CloseBrace,   // }
    OpenBracket,  // [
    CloseBracket, // ]
    Comma,        // ,
    Colon,        // :
    Dot,          // .
    Semicolon,    // ; or an inserted newline

    // Keywords
    Var,
    Const,
    Func,
    If,
    Else,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    True,
    False,
    Nil,

    // Types
    Int32Type,
    Float32Type,
    BoolType,
    StringType,
    RuneType,

    EOF,
}

impl TokenKind {
    // Used in parser error messages
    pub fn label(&self) -> &'static str {
        match self {
            TokenKind::Int => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::Str => "string literal",
            TokenKind::Rune => "rune literal",
            TokenKind::Identifier => "identifier",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Amp => "'&'",
            TokenKind::Equals => "'='",
            TokenKind::CompoundAssign => "compound assignment",
            TokenKind::ColonEquals => "':='",
            TokenKind::Increment => "'++'",
            TokenKind::Decrement => "'--'",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenBrace => "'{'",
            TokenKind::CloseBrace => "'}'",
            TokenKind::OpenBracket => "'['",
            TokenKind::CloseBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Dot => "'.'",
            TokenKind::Semicolon => "';'",
            TokenKind::Var => "'var'",
            TokenKind::Const => "'const'",
            TokenKind::Func => "'func'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::For => "'for'",
            TokenKind::Switch => "'switch'",
            TokenKind::Case => "'case'",
            TokenKind::Default => "'default'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Return => "'return'",
            TokenKind::True => "'true'",
            TokenKind::False => "'false'",
            TokenKind::Nil => "'nil'",
            TokenKind::Int32Type
            | TokenKind::Float32Type
            | TokenKind::BoolType
            | TokenKind::StringType
            | TokenKind::RuneType => "type name",
            TokenKind::EOF => "end of file",
        }
    }

    pub fn starts_type(&self) -> bool {
        matches!(
            self,
            TokenKind::Int32Type
                | TokenKind::Float32Type
                | TokenKind::BoolType
                | TokenKind::StringType
                | TokenKind::RuneType
                | TokenKind::OpenBracket
                | TokenKind::Star
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
        }
    }

    pub fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    // How the token is shown to the user in error messages
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::EOF => "end of file".into(),
            TokenKind::Semicolon if self.value == "\n" => "newline".into(),
            _ => self.value.clone(),
        }
    }

    // A newline right after one of these tokens ends the statement
    fn ends_statement(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Int
                | TokenKind::Float
                | TokenKind::Str
                | TokenKind::Rune
                | TokenKind::Identifier
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Nil
                | TokenKind::Int32Type
                | TokenKind::Float32Type
                | TokenKind::BoolType
                | TokenKind::StringType
                | TokenKind::RuneType
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Increment
                | TokenKind::Decrement
                | TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::CloseBrace
        )
    }
}

// Stands for the end of the stream once every token was consumed
impl Default for Token {
    fn default() -> Self {
        Token::new(TokenKind::EOF, "EOF", 0, 0)
    }
}

// Skip listed char
fn is_skippable(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

const ESCAPES: [char; 6] = ['n', 't', 'r', '\\', '"', '\''];

#[derive(Default)]
pub struct Lexer {
    pub tokens: VecDeque<Token>,
    pub errors: Vec<(LexerError, Position)>,
    reserved_keywords: HashMap<&'static str, TokenKind>,
    chars: Vec<char>,
    cursor: usize,
    line: u32,
    column: u32,
}

impl Lexer {
    pub fn new() -> Self {
        let mut lexer = Self::default();
        lexer.generate_keywords();
        lexer
    }

    // Keywords generation
    fn generate_keywords(&mut self) {
        let keywords = [
            ("var", TokenKind::Var),
            ("const", TokenKind::Const),
            ("func", TokenKind::Func),
            ("if", TokenKind::If),
            ("else", TokenKind::Else),
            ("for", TokenKind::For),
            ("switch", TokenKind::Switch),
            ("case", TokenKind::Case),
            ("default", TokenKind::Default),
            ("break", TokenKind::Break),
            ("continue", TokenKind::Continue),
            ("return", TokenKind::Return),
            ("true", TokenKind::True),
            ("false", TokenKind::False),
            ("nil", TokenKind::Nil),
            ("int32", TokenKind::Int32Type),
            ("float32", TokenKind::Float32Type),
            ("bool", TokenKind::BoolType),
            ("string", TokenKind::StringType),
            ("rune", TokenKind::RuneType),
        ];

        self.reserved_keywords.extend(keywords);
    }

    /// Turns the whole source into tokens. Errors are collected and the
    /// offending characters skipped, so the token stream is always usable.
    pub fn tokenize(&mut self, source_code: &str) {
        self.tokens.clear();
        self.errors.clear();
        self.chars = source_code.chars().collect();
        self.cursor = 0;
        self.line = 1;
        self.column = 1;

        while let Some(c) = self.peek(0) {
            if is_skippable(c) {
                self.advance();
                continue;
            }

            let (line, column) = (self.line, self.column);

            match c {
                '\n' => {
                    self.insert_semicolon(line, column);
                    self.advance();
                }
                '/' if self.peek(1) == Some('/') => {
                    while !matches!(self.peek(0), None | Some('\n')) {
                        self.advance();
                    }
                }
                '/' if self.peek(1) == Some('*') => self.skip_block_comment(line, column),
                '"' => self.tokenize_string(line, column),
                '\'' => self.tokenize_rune(line, column),
                c if c.is_ascii_digit() => self.tokenize_number(line, column),
                c if is_ident_start(c) => {
                    let mut word = String::new();
                    while let Some(c) = self.peek(0).filter(|c| is_ident_char(*c)) {
                        word.push(c);
                        self.advance();
                    }

                    let kind = self
                        .reserved_keywords
                        .get(word.as_str())
                        .copied()
                        .unwrap_or(TokenKind::Identifier);

                    self.push(kind, word, line, column);
                }
                _ => self.tokenize_operator(c, line, column),
            }
        }

        let (line, column) = (self.line, self.column);
        self.insert_semicolon(line, column);
        self.push(TokenKind::EOF, "EOF", line, column);
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.cursor + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.cursor += 1;

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    fn push(&mut self, kind: TokenKind, value: impl Into<String>, line: u32, column: u32) {
        self.tokens.push_back(Token::new(kind, value, line, column));
    }

    fn error(&mut self, err: LexerError, line: u32, column: u32) {
        self.errors.push((err, Position::new(line, column)));
    }

    fn insert_semicolon(&mut self, line: u32, column: u32) {
        if self.tokens.back().is_some_and(|t| t.ends_statement()) {
            self.push(TokenKind::Semicolon, "\n", line, column);
        }
    }

    fn skip_block_comment(&mut self, line: u32, column: u32) {
        // We skip the '/*'
        self.advance();
        self.advance();

        let mut saw_newline = false;
        loop {
            match (self.peek(0), self.peek(1)) {
                (Some('*'), Some('/')) => {
                    self.advance();
                    self.advance();
                    break;
                }
                (Some(c), _) => {
                    saw_newline |= c == '\n';
                    self.advance();
                }
                (None, _) => {
                    self.error(LexerError::UnterminatedComment, line, column);
                    break;
                }
            }
        }

        // A multi-line comment acts like a newline
        if saw_newline {
            self.insert_semicolon(line, column);
        }
    }

    fn tokenize_number(&mut self, line: u32, column: u32) {
        let mut number = String::new();
        let mut dot_count = 0;

        while let Some(c) = self.peek(0) {
            if c.is_ascii_digit() {
                number.push(c);
            } else if c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                dot_count += 1;
                number.push(c);
            } else {
                break;
            }
            self.advance();
        }

        if dot_count > 1 {
            self.error(LexerError::DoubleDotNumber(number.clone()), line, column);
        }

        let kind = if dot_count > 0 {
            TokenKind::Float
        } else {
            TokenKind::Int
        };

        self.push(kind, number, line, column);
    }

    // Reads until the closing quote, validating escapes but keeping them raw
    fn read_quoted(&mut self, quote: char) -> Option<String> {
        // Opening quote
        self.advance();
        let mut raw = String::new();

        loop {
            let (line, column) = (self.line, self.column);
            match self.peek(0) {
                None | Some('\n') => return None,
                Some(c) if c == quote => {
                    self.advance();
                    return Some(raw);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek(0) {
                        None | Some('\n') => return None,
                        Some(esc) => {
                            if !ESCAPES.contains(&esc) {
                                self.error(LexerError::UnknownEscape(esc), line, column);
                            }
                            raw.push('\\');
                            raw.push(esc);
                            self.advance();
                        }
                    }
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }
    }

    fn tokenize_string(&mut self, line: u32, column: u32) {
        match self.read_quoted('"') {
            Some(raw) => self.push(TokenKind::Str, raw, line, column),
            None => self.error(LexerError::UnterminatedString, line, column),
        }
    }

    fn tokenize_rune(&mut self, line: u32, column: u32) {
        match self.read_quoted('\'') {
            Some(raw) => {
                let len = raw.chars().count();
                let valid = len == 1 || (len == 2 && raw.starts_with('\\'));

                if !valid {
                    self.error(LexerError::InvalidRune(raw.clone()), line, column);
                }

                // Still pushed so the parser does not report a second error
                self.push(TokenKind::Rune, raw, line, column);
            }
            None => self.error(LexerError::UnterminatedRune, line, column),
        }
    }

    fn tokenize_operator(&mut self, c: char, line: u32, column: u32) {
        let next = self.peek(1);

        // Two characters operators first
        let double = match (c, next) {
            ('=', Some('=')) => Some(TokenKind::EqEq),
            ('!', Some('=')) => Some(TokenKind::NotEq),
            ('<', Some('=')) => Some(TokenKind::LtEq),
            ('>', Some('=')) => Some(TokenKind::GtEq),
            ('&', Some('&')) => Some(TokenKind::AndAnd),
            ('|', Some('|')) => Some(TokenKind::OrOr),
            (':', Some('=')) => Some(TokenKind::ColonEquals),
            ('+', Some('+')) => Some(TokenKind::Increment),
            ('-', Some('-')) => Some(TokenKind::Decrement),
            ('+' | '-' | '*' | '/', Some('=')) => Some(TokenKind::CompoundAssign),
            _ => None,
        };

        if let Some(kind) = double {
            let value = match kind {
                // We only keep the arithmetic operator
                TokenKind::CompoundAssign => c.to_string(),
                _ => format!("{c}{}", next.unwrap_or_default()),
            };

            self.advance();
            self.advance();
            self.push(kind, value, line, column);
            return;
        }

        let single = match c {
            '+' => Some(TokenKind::Plus),
            '-' => Some(TokenKind::Minus),
            '*' => Some(TokenKind::Star),
            '/' => Some(TokenKind::Slash),
            '%' => Some(TokenKind::Percent),
            '<' => Some(TokenKind::Lt),
            '>' => Some(TokenKind::Gt),
            '!' => Some(TokenKind::Bang),
            '&' => Some(TokenKind::Amp),
            '=' => Some(TokenKind::Equals),
            '(' => Some(TokenKind::OpenParen),
            ')' => Some(TokenKind::CloseParen),
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            '[' => Some(TokenKind::OpenBracket),
            ']' => Some(TokenKind::CloseBracket),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            '.' => Some(TokenKind::Dot),
            ';' => Some(TokenKind::Semicolon),
            _ => None,
        };

        self.advance();

        match single {
            Some(kind) => self.push(kind, c.to_string(), line, column),
            None => self.error(LexerError::UnrecognizedToken(c), line, column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(code: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new();
        lexer.tokenize(code);
        lexer.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenize_declaration() {
        assert_eq!(
            kinds("var x int32 = 10"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Int32Type,
                TokenKind::Equals,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn tokenize_operators() {
        assert_eq!(
            kinds("a += 1; b := &c; i++ && j || !k <= 3 != 4"),
            vec![
                TokenKind::Identifier,
                TokenKind::CompoundAssign,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::ColonEquals,
                TokenKind::Amp,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Increment,
                TokenKind::AndAnd,
                TokenKind::Identifier,
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Identifier,
                TokenKind::LtEq,
                TokenKind::Int,
                TokenKind::NotEq,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn semicolon_insertion() {
        // No semicolon after '{' nor on empty lines
        assert_eq!(
            kinds("func main() {\n\n  x := 1\n}\n"),
            vec![
                TokenKind::Func,
                TokenKind::Identifier,
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::OpenBrace,
                TokenKind::Identifier,
                TokenKind::ColonEquals,
                TokenKind::Int,
                TokenKind::Semicolon,
                TokenKind::CloseBrace,
                TokenKind::Semicolon,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn literals_keep_raw_text() {
        let mut lexer = Lexer::new();
        lexer.tokenize(r#""a\tb" 'x' '\n' 3.14"#);

        let values: Vec<&str> = lexer.tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec![r"a\tb", "x", r"\n", "3.14", "\n", "EOF"]);
        assert!(lexer.errors.is_empty());
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("x // trailing\n/* block\n comment */ y"),
            vec![
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let mut lexer = Lexer::new();
        lexer.tokenize("x\n  yy");

        assert_eq!(lexer.tokens[0].pos(), Position::new(1, 1));
        assert_eq!(lexer.tokens[2].pos(), Position::new(2, 3));
    }

    #[test]
    fn errors_are_collected() {
        let mut lexer = Lexer::new();
        lexer.tokenize("x := 1 @ 2\ns := \"open\n'ab'");

        let errs: Vec<&LexerError> = lexer.errors.iter().map(|(e, _)| e).collect();
        assert_eq!(
            errs,
            vec![
                &LexerError::UnrecognizedToken('@'),
                &LexerError::UnterminatedString,
                &LexerError::InvalidRune("ab".into()),
            ]
        );
        assert_eq!(lexer.errors[0].1, Position::new(1, 8));
    }
}
