use super::Token;
use crate::{Error, ErrorKind, Location, Source, SrcFile};
use logos::{Lexer as LogosLexer, Logos};

pub struct Lexer<'source> {
    llex: LogosLexer<'source, Token>,
    location: Location,
    last_token_end: Location,
    peeked_token: Option<(Token, &'source str)>,
    file: SrcFile,
}

impl<'source> Lexer<'source> {
    pub fn new(src: &'source str, file: SrcFile) -> Self {
        let mut lexer = Lexer {
            llex: Token::lexer(src),
            location: (1, 1).into(),
            last_token_end: (1, 1).into(),
            peeked_token: None,
            file,
        };
        lexer.skip_comment_space();
        lexer
    }

    pub fn last_token_end(&self) -> Location {
        self.last_token_end
    }

    pub fn location(&self) -> Location {
        self.location
    }

    fn skip_comment_space(&mut self) {
        while let Some(token) = self.llex.next() {
            match token {
                Token::Comment => self.location.col += self.llex.slice().chars().count(),
                Token::NewLine => {
                    self.location.col = 1;
                    self.location.line += 1;
                }
                Token::WhiteSpace => self.location.col += self.llex.slice().len(),
                _ => {
                    self.peeked_token = Some((token, self.llex.slice()));
                    return;
                }
            }
        }
    }

    fn src_at(&self, width: usize) -> Source {
        Source {
            file: self.file.clone(),
            start: self.location,
            end: self.location.advance(width),
        }
    }

    /// Returns the next meaningful token without consuming it, or `None` at
    /// the end of the file. Malformed input surfaces here as a lex error.
    pub fn peek_opt(&mut self) -> Result<Option<(Token, &'source str)>, Error> {
        match self.peeked_token {
            Some((Token::Error, text)) => {
                let reason = if text.starts_with('"') {
                    "Unterminated string.".to_string()
                } else {
                    format!("Unrecognized input {:?}.", text)
                };
                Err(Error {
                    kind: ErrorKind::Lex { reason },
                    src: self.src_at(text.chars().count()),
                })
            }
            other => Ok(other),
        }
    }

    pub fn peek(&mut self) -> Result<(Token, &'source str), Error> {
        let error = Error {
            kind: ErrorKind::Syntax {
                expected: "more input".to_string(),
                found: "end of file".to_string(),
            },
            src: self.src_at(0),
        };
        self.peek_opt()?.ok_or(error)
    }

    #[inline]
    pub fn consume(&mut self) {
        let (_, text) = self.peeked_token.take().unwrap();
        let count = text.chars().count();
        self.location.col += count;
        self.last_token_end = self.location;
        self.skip_comment_space();
    }

    pub fn take(&mut self, expected: Token) -> Result<&'source str, Error> {
        let (token, text) = self.peek()?;
        if token != expected {
            Err(Error {
                kind: ErrorKind::Syntax {
                    expected: format!("{:?}", expected),
                    found: format!("{:?}({})", token, text),
                },
                src: self.src_at(text.chars().count()),
            })
        } else {
            self.consume();
            Ok(text)
        }
    }
}
