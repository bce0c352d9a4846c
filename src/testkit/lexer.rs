use crate::types::{Result, WidecolError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Token {
    Word(String),
    Str(String),
    Sym(char),
}

pub(super) fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '\'' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        literal.push('\'');
                    }
                    Some('\'') => break,
                    Some(c) => literal.push(c),
                    None => return Err(syntax(text, "unterminated string literal")),
                }
            }
            tokens.push(Token::Str(literal));
        } else if ch.is_alphanumeric() || ch == '_' {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    word.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(word));
        } else if "(),=*".contains(ch) {
            chars.next();
            tokens.push(Token::Sym(ch));
        } else {
            return Err(syntax(text, &format!("unexpected character '{ch}'")));
        }
    }
    Ok(tokens)
}

pub(super) fn syntax(text: &str, message: &str) -> WidecolError {
    WidecolError::connection(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("line 1: {message} in \"{text}\""),
    ))
}

pub(super) struct Parser<'t> {
    text: &'t str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'t> Parser<'t> {
    pub(super) fn new(text: &'t str) -> Result<Self> {
        Ok(Self {
            text,
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    pub(super) fn error(&self, message: &str) -> WidecolError {
        syntax(self.text, message)
    }

    pub(super) fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    pub(super) fn peek_sym(&self, sym: char) -> bool {
        self.tokens.get(self.pos) == Some(&Token::Sym(sym))
    }

    pub(super) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn keyword(&mut self, keyword: &str) -> Result<()> {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {keyword}")))
        }
    }

    pub(super) fn sym(&mut self, sym: char) -> Result<()> {
        if self.peek_sym(sym) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{sym}'")))
        }
    }

    pub(super) fn word(&mut self) -> Result<String> {
        match self.tokens.get(self.pos) {
            Some(Token::Word(w)) => {
                self.pos += 1;
                Ok(w.clone())
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    pub(super) fn literal(&mut self) -> Result<String> {
        match self.tokens.get(self.pos) {
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(s.clone())
            }
            _ => Err(self.error("expected string literal")),
        }
    }

    /// `lit, lit, ...` inside parentheses.
    pub(super) fn literal_list(&mut self) -> Result<Vec<String>> {
        self.sym('(')?;
        let mut out = vec![self.literal()?];
        while self.peek_sym(',') {
            self.pos += 1;
            out.push(self.literal()?);
        }
        self.sym(')')?;
        Ok(out)
    }

    /// Skips an optional `USING CONSISTENCY <level>`.
    pub(super) fn consistency(&mut self) -> Result<()> {
        if self.peek_keyword("USING") {
            self.pos += 1;
            self.keyword("CONSISTENCY")?;
            self.word()?;
        }
        Ok(())
    }
}
