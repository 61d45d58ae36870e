use crate::error::{Result, ScrapeError};

/// Forward-only reader over the text fragments of one document.
///
/// Layout assumptions are checked as the stream is consumed, so a layout
/// change upstream fails at the first token that moved instead of producing
/// shifted records.
pub struct Cursor<'a> {
    tokens: &'a [String],
    i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [String]) -> Self {
        Self { tokens, i: 0 }
    }

    pub fn position(&self) -> usize {
        self.i
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.i).map(String::as_str)
    }

    /// True when the current token is exactly `marker`.
    pub fn is_at(&self, marker: &str) -> bool {
        self.peek() == Some(marker)
    }

    pub fn consume(&mut self) -> Result<&'a str> {
        let token = self.tokens.get(self.i).ok_or(ScrapeError::UnexpectedToken {
            index: self.i,
            expected: None,
            actual: None,
        })?;
        self.i += 1;
        Ok(token.as_str())
    }

    /// Consume one token per literal, failing on the first that differs.
    pub fn expect(&mut self, literals: &[&str]) -> Result<()> {
        for literal in literals {
            let index = self.i;
            let actual = self.tokens.get(index).map(String::as_str);
            if actual != Some(*literal) {
                return Err(ScrapeError::UnexpectedToken {
                    index,
                    expected: Some(literal.to_string()),
                    actual: actual.map(str::to_string),
                });
            }
            self.i += 1;
        }
        Ok(())
    }

    /// Consume one token and run it through a field grammar.
    pub fn consume_with<T>(
        &mut self,
        field: &str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<T> {
        let token = self.consume()?;
        parse(token).ok_or_else(|| ScrapeError::malformed(field, token))
    }
}
