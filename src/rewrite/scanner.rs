//! Token scanner with byte offsets for T-SQL module text.
//!
//! The sqlparser tokenizer reports line/column locations; the rewriter needs
//! byte ranges into the original text so it can splice without disturbing
//! anything else. Comments and whitespace are kept as tokens and skipped by
//! the navigation helpers.

use sqlparser::tokenizer::{Location, Token, Tokenizer};

use super::dialect::TsqlDialect;

/// A token and the byte range it occupies in the source text
#[derive(Debug, Clone)]
pub struct ScannedToken {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

/// Tokenized module text with span-accurate positions
pub struct TokenScanner {
    tokens: Vec<ScannedToken>,
}

impl TokenScanner {
    /// Tokenize `sql` with the T-SQL dialect.
    ///
    /// Returns `None` if tokenization fails or a location cannot be mapped
    /// back into the text.
    pub fn new(sql: &str) -> Option<Self> {
        let dialect = TsqlDialect::default();
        let raw = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .ok()?;

        let lines = LineIndex::new(sql);
        let mut tokens = Vec::with_capacity(raw.len());
        for t in raw {
            let start = lines.byte_offset(sql, t.span.start)?;
            let end = lines.byte_offset(sql, t.span.end)?;
            if start > end {
                return None;
            }
            tokens.push(ScannedToken {
                token: t.token,
                start,
                end,
            });
        }

        Some(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScannedToken> {
        self.tokens.get(index)
    }

    /// Index of the first unquoted word equal to `word` (case-insensitive).
    pub fn find_word(&self, word: &str) -> Option<usize> {
        self.tokens
            .iter()
            .position(|t| is_unquoted_word(&t.token, word))
    }

    /// Check if the token at `index` is an unquoted word equal to `word`.
    pub fn is_word(&self, index: usize, word: &str) -> bool {
        self.tokens
            .get(index)
            .is_some_and(|t| is_unquoted_word(&t.token, word))
    }

    pub fn is_comma(&self, index: usize) -> bool {
        matches!(self.tokens.get(index).map(|t| &t.token), Some(Token::Comma))
    }

    /// Index of the next non-whitespace, non-comment token after `index`.
    pub fn next_significant(&self, index: usize) -> Option<usize> {
        (index + 1..self.tokens.len()).find(|&i| !self.is_trivia(i))
    }

    /// Index of the closest non-whitespace, non-comment token before `index`.
    pub fn prev_significant(&self, index: usize) -> Option<usize> {
        (0..index).rev().find(|&i| !self.is_trivia(i))
    }

    fn is_trivia(&self, index: usize) -> bool {
        matches!(self.tokens[index].token, Token::Whitespace(_))
    }
}

fn is_unquoted_word(token: &Token, word: &str) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(word))
}

/// Byte offset of the first character of each line
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    /// Convert a 1-based line/column (columns count chars) into a byte offset.
    fn byte_offset(&self, text: &str, location: Location) -> Option<usize> {
        let line = usize::try_from(location.line).ok()?.checked_sub(1)?;
        let column = usize::try_from(location.column).ok()?.checked_sub(1)?;
        let line_start = *self.starts.get(line)?;
        let rest = &text[line_start..];

        match rest.char_indices().nth(column) {
            Some((offset, _)) => Some(line_start + offset),
            None if rest.chars().count() == column => Some(text.len()),
            None => None,
        }
    }
}
