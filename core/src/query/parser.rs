//! Recursive descent over the query text.
//!
//! A leaf runs until whitespace, `(`, `)` or the end of input. Inside a quoted span whitespace and
//! parentheses are literal. Keywords are only recognized when followed by the end of input,
//! whitespace, `(` or `"`. Groups and negations may nest at most [`MAX_NESTING`] levels deep;
//! `and`/`or` chains are parsed in a loop and have no length limit.

use super::{Operator, Query};
use crate::error::{QuerySyntaxError, SyntaxErrorKind};
use crate::Field;

type ParseResult<T> = std::result::Result<T, QuerySyntaxError>;

/// Deepest allowed nesting of `(` groups and `not` operators combined.
pub const MAX_NESTING: usize = 256;

/// Parse a query. Blank input yields `Ok(None)`, which callers treat as "no matches".
pub fn parse(input: &str) -> ParseResult<Option<Query>> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.at_end() {
        return Ok(None);
    }
    let query = parser.parse_query()?;
    if !parser.at_end() {
        // parse_query only stops early on a ')' that no group opened.
        return Err(parser.error(SyntaxErrorKind::UnmatchedCloseParen));
    }
    Ok(Some(query))
}

struct Parser {
    input: Vec<char>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Self { Self { input: input.chars().collect(), position: 0, depth: 0 } }

    fn peek(&self) -> Option<char> { self.input.get(self.position).copied() }

    fn at_end(&self) -> bool { self.position >= self.input.len() }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn error(&self, kind: SyntaxErrorKind) -> QuerySyntaxError { QuerySyntaxError::new(kind, self.position) }

    /// Operands joined by operators, until the end of input or a closing parenthesis.
    fn parse_query(&mut self) -> ParseResult<Query> {
        let mut lhs = self.parse_operand()?;
        loop {
            self.skip_whitespace();
            if matches!(self.peek(), None | Some(')')) {
                return Ok(lhs);
            }
            let op = if self.eat_keyword("and") {
                Operator::And
            } else if self.eat_keyword("or") {
                Operator::Or
            } else {
                return Err(self.error(SyntaxErrorKind::ExpectedOperator));
            };
            let rhs = self.parse_operand()?;
            lhs = match op {
                Operator::And => Query::and(lhs, rhs),
                Operator::Or => Query::or(lhs, rhs),
            };
        }
    }

    fn parse_operand(&mut self) -> ParseResult<Query> {
        self.skip_whitespace();
        match self.peek() {
            None | Some(')') => Err(self.error(SyntaxErrorKind::ExpectedOperand)),
            Some('(') => {
                let open = self.position;
                self.descend()?;
                self.position += 1;
                let inner = self.parse_query()?;
                if self.peek() != Some(')') {
                    return Err(QuerySyntaxError::new(SyntaxErrorKind::UnmatchedOpenParen, open));
                }
                self.position += 1;
                self.depth -= 1;
                Ok(inner)
            }
            Some(_) if self.at_keyword("not") => {
                self.descend()?;
                self.eat_keyword("not");
                let inner = self.parse_operand()?;
                self.depth -= 1;
                Ok(Query::not(inner))
            }
            Some(_) => self.parse_leaf(),
        }
    }

    /// Enter one more group or negation, failing at the cursor past [`MAX_NESTING`].
    fn descend(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(SyntaxErrorKind::TooDeep(MAX_NESTING)));
        }
        self.depth += 1;
        Ok(())
    }

    /// Whether `keyword` (case-insensitive) stands as a whole word at the cursor.
    fn at_keyword(&self, keyword: &str) -> bool {
        let end = self.position + keyword.len();
        if end > self.input.len() {
            return false;
        }
        let matches = self.input[self.position..end]
            .iter()
            .zip(keyword.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b));
        let boundary = match self.input.get(end) {
            None => true,
            Some(&c) => c.is_whitespace() || c == '(' || c == '"',
        };
        matches && boundary
    }

    /// Consume `keyword` if [`Parser::at_keyword`] holds.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.position += keyword.len();
        }
        found
    }

    fn parse_leaf(&mut self) -> ParseResult<Query> {
        let start = self.position;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            if c == '"' {
                let quote = self.position;
                self.position += 1;
                while self.peek().is_some_and(|c| c != '"') {
                    self.position += 1;
                }
                if self.at_end() {
                    return Err(QuerySyntaxError::new(SyntaxErrorKind::UnterminatedQuote, quote));
                }
            }
            self.position += 1;
        }
        let raw: String = self.input[start..self.position].iter().collect();
        leaf(&raw, start)
    }
}

/// Split a raw leaf into its field and value, and decide between term and phrase.
fn leaf(raw: &str, start: usize) -> ParseResult<Query> {
    let malformed = || QuerySyntaxError::new(SyntaxErrorKind::MalformedLeaf(raw.to_string()), start);

    let (field, value) = match raw.find([':', '"']) {
        Some(i) if raw[i..].starts_with(':') => {
            let name = &raw[..i];
            let field = name
                .parse::<Field>()
                .map_err(|name| QuerySyntaxError::new(SyntaxErrorKind::UnknownField(name.to_lowercase()), start))?;
            (field, &raw[i + 1..])
        }
        _ => (Field::Article, raw),
    };

    if value.is_empty() {
        return Err(malformed());
    }
    if let Some(inner) = value.strip_prefix('"') {
        let inner = inner.strip_suffix('"').ok_or_else(malformed)?;
        if inner.contains('"') {
            return Err(malformed());
        }
        return Ok(Query::phrase(field, inner));
    }
    if value.contains('"') {
        return Err(malformed());
    }
    Ok(Query::term(field, value))
}
