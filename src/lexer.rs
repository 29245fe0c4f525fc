use std::{iter::Peekable, str::CharIndices};

use crate::token::{Span, Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    indent_stack: Vec<usize>,
    pending_tokens: Vec<Token<'a>>,
    at_line_start: bool,
    eof_reached: bool,
    bracket_depth: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            indent_stack: vec![0],
            pending_tokens: Vec::new(),
            at_line_start: true,
            eof_reached: false,
            bracket_depth: 0,
            line: 1,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        if let Some(token) = self.pending_tokens.pop() {
            return Ok(token);
        }

        if self.eof_reached {
            return Ok(Token::new(TokenKind::EOF, self.here()));
        }

        if self.at_line_start {
            self.at_line_start = false;
            if let Some(token) = self.handle_indentation()? {
                return Ok(token);
            }
        }

        self.skip_whitespace_and_comments();

        let Some(&(start_idx, ch)) = self.chars.peek() else {
            return Ok(self.finish());
        };

        let line = self.line;
        let column = self.column;
        match ch {
            '\n' => {
                self.advance_char();
                self.at_line_start = true;
                Ok(Token::new(
                    TokenKind::Newline,
                    Span {
                        start: start_idx,
                        end: start_idx + 1,
                        line,
                        column,
                    },
                ))
            }
            '=' => Ok(self.one_or_two(
                start_idx,
                line,
                column,
                TokenKind::Equal,
                '=',
                TokenKind::EqualEqual,
            )),
            '<' => Ok(self.one_or_two(
                start_idx,
                line,
                column,
                TokenKind::Less,
                '=',
                TokenKind::LessEqual,
            )),
            '>' => Ok(self.one_or_two(
                start_idx,
                line,
                column,
                TokenKind::Greater,
                '=',
                TokenKind::GreaterEqual,
            )),
            '-' => Ok(self.one_or_two(
                start_idx,
                line,
                column,
                TokenKind::Minus,
                '>',
                TokenKind::Arrow,
            )),
            '!' => self.require_second(start_idx, line, column, '=', TokenKind::NotEqual),
            '/' => self.require_second(start_idx, line, column, '/', TokenKind::DoubleSlash),
            '+' => Ok(self.single(TokenKind::Plus, start_idx, line, column)),
            '*' => Ok(self.single(TokenKind::Star, start_idx, line, column)),
            '%' => Ok(self.single(TokenKind::Percent, start_idx, line, column)),
            ':' => Ok(self.single(TokenKind::Colon, start_idx, line, column)),
            ',' => Ok(self.single(TokenKind::Comma, start_idx, line, column)),
            '.' => Ok(self.single(TokenKind::Dot, start_idx, line, column)),
            '@' => Ok(self.single(TokenKind::At, start_idx, line, column)),
            '(' => {
                self.bracket_depth += 1;
                Ok(self.single(TokenKind::LParen, start_idx, line, column))
            }
            '[' => {
                self.bracket_depth += 1;
                Ok(self.single(TokenKind::LBracket, start_idx, line, column))
            }
            ')' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                Ok(self.single(TokenKind::RParen, start_idx, line, column))
            }
            ']' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                Ok(self.single(TokenKind::RBracket, start_idx, line, column))
            }
            '"' | '\'' => self.read_string(start_idx, line, column, ch),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(start_idx, line, column)),
            c if c.is_ascii_digit() => self.read_integer(start_idx, line, column),
            _ => Err(LexError::UnexpectedCharacter {
                character: ch,
                line,
                column,
            }),
        }
    }

    fn handle_indentation(&mut self) -> LexResult<Option<Token<'a>>> {
        if self.bracket_depth > 0 {
            return Ok(None);
        }

        let indent_level = self.count_indentation()?;
        let current_indent = self.current_indent();
        let span = self.here();

        if indent_level > current_indent {
            self.indent_stack.push(indent_level);
            return Ok(Some(Token::new(TokenKind::Indent, span)));
        }

        if indent_level < current_indent {
            while let Some(&top) = self.indent_stack.last() {
                if top > indent_level {
                    self.indent_stack.pop();
                    self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
                } else {
                    break;
                }
            }
            if self.current_indent() != indent_level {
                return Err(LexError::InvalidDedent {
                    indent_level,
                    line: self.line,
                    column: self.column,
                });
            }
            return Ok(self.pending_tokens.pop());
        }

        Ok(None)
    }

    fn count_indentation(&mut self) -> LexResult<usize> {
        // Look ahead first: blank and comment-only lines keep the current level.
        let mut temp_chars = self.chars.clone();
        let mut width = 0;
        let mut is_blank_line = true;

        while let Some(&(_, c)) = temp_chars.peek() {
            match c {
                ' ' => {
                    width += 1;
                    temp_chars.next();
                }
                '\t' => {
                    return Err(LexError::TabIndentation {
                        line: self.line,
                        column: self.column + width,
                    });
                }
                '\n' | '\r' | '#' => break,
                _ => {
                    is_blank_line = false;
                    break;
                }
            }
        }

        if is_blank_line {
            return Ok(self.current_indent());
        }

        for _ in 0..width {
            self.advance_char();
        }
        Ok(width)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance_char();
                }
                '#' => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance_char();
                    }
                }
                '\n' if self.bracket_depth > 0 => {
                    self.advance_char();
                }
                _ => break,
            }
        }
    }

    fn finish(&mut self) -> Token<'a> {
        self.eof_reached = true;
        let span = self.here();
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
        }
        self.pending_tokens
            .pop()
            .unwrap_or_else(|| Token::new(TokenKind::EOF, span))
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = self.current_index();
        let ident = &self.input[start..end_idx];
        let kind = match ident {
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "pass" => TokenKind::Pass,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            _ => TokenKind::Identifier(ident),
        };
        Token::new(
            kind,
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        )
    }

    fn read_integer(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        self.advance_char(); // Consume first digit
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = self.current_index();
        let literal = &self.input[start..end_idx];
        let value = literal
            .parse::<i64>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                line,
                column,
            })?;
        Ok(Token::new(
            TokenKind::Integer(value),
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        ))
    }

    fn read_string(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
        quote: char,
    ) -> LexResult<Token<'a>> {
        let triple_quote = if quote == '"' { "\"\"\"" } else { "'''" };
        if self.input[start..].starts_with(triple_quote) {
            for _ in 0..3 {
                self.advance_char();
            }
            let content_start = start + 3;
            while let Some(&(idx, _)) = self.chars.peek() {
                if self.input[idx..].starts_with(triple_quote) {
                    for _ in 0..3 {
                        self.advance_char();
                    }
                    return Ok(Token::new(
                        TokenKind::String(&self.input[content_start..idx]),
                        Span {
                            start,
                            end: idx + 3,
                            line,
                            column,
                        },
                    ));
                }
                self.advance_char();
            }
            return Err(LexError::UnterminatedString { line, column });
        }

        self.advance_char(); // Consume opening quote
        let content_start = start + 1;
        while let Some(&(idx, c)) = self.chars.peek() {
            if c == quote {
                self.advance_char(); // Consume closing quote
                return Ok(Token::new(
                    TokenKind::String(&self.input[content_start..idx]),
                    Span {
                        start,
                        end: idx + 1,
                        line,
                        column,
                    },
                ));
            }
            if c == '\n' {
                break;
            }
            self.advance_char();
            if c == '\\' && matches!(self.chars.peek(), Some(&(_, next)) if next != '\n') {
                self.advance_char();
            }
        }
        Err(LexError::UnterminatedString { line, column })
    }

    fn single(&mut self, kind: TokenKind<'a>, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char();
        Token::new(
            kind,
            Span {
                start,
                end: start + 1,
                line,
                column,
            },
        )
    }

    fn one_or_two(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
        one: TokenKind<'a>,
        second: char,
        two: TokenKind<'a>,
    ) -> Token<'a> {
        self.advance_char();
        if matches!(self.chars.peek(), Some(&(_, c)) if c == second) {
            self.advance_char();
            return Token::new(
                two,
                Span {
                    start,
                    end: start + 2,
                    line,
                    column,
                },
            );
        }
        Token::new(
            one,
            Span {
                start,
                end: start + 1,
                line,
                column,
            },
        )
    }

    fn require_second(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
        second: char,
        kind: TokenKind<'a>,
    ) -> LexResult<Token<'a>> {
        let first = self.advance_char().map(|(_, c)| c).unwrap_or(second);
        if matches!(self.chars.peek(), Some(&(_, c)) if c == second) {
            self.advance_char();
            return Ok(Token::new(
                kind,
                Span {
                    start,
                    end: start + 2,
                    line,
                    column,
                },
            ));
        }
        Err(LexError::UnexpectedCharacter {
            character: first,
            line,
            column,
        })
    }
}

impl<'a> Lexer<'a> {
    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }

    fn current_indent(&self) -> usize {
        self.indent_stack.last().copied().unwrap_or(0)
    }

    fn here(&mut self) -> Span {
        let index = self.current_index();
        Span {
            start: index,
            end: index,
            line: self.line,
            column: self.column,
        }
    }
}

pub fn tokenize<'a>(input: &'a str) -> LexResult<Vec<Token<'a>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
