//! Boolean query language.
//!
//! ```text
//! query         := term-or-group (ws operator ws term-or-group)*
//! term-or-group := "(" query ")" | "not" ws term-or-group | leaf
//! leaf          := [field ":"] (token | '"' token (ws token)* '"')
//! operator      := "and" | "or"
//! ```
//!
//! Keywords are case-insensitive. `and` and `or` share one precedence level and apply left to
//! right, so `a and b or c` reads as `(a and b) or c`.

mod parser;

pub use parser::{parse, MAX_NESTING};

use crate::Field;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A bare value. `value` is kept as typed; normalization happens at evaluation time.
    Term { field: Field, value: String },
    /// The text between the quotes of a quoted leaf.
    Phrase { field: Field, value: String },
    Not(Box<Query>),
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
}

impl Query {
    pub fn term(field: Field, value: impl Into<String>) -> Self { Query::Term { field, value: value.into() } }

    pub fn phrase(field: Field, value: impl Into<String>) -> Self { Query::Phrase { field, value: value.into() } }

    pub fn not(inner: Query) -> Self { Query::Not(Box::new(inner)) }

    pub fn and(lhs: Query, rhs: Query) -> Self { Query::And(Box::new(lhs), Box::new(rhs)) }

    pub fn or(lhs: Query, rhs: Query) -> Self { Query::Or(Box::new(lhs), Box::new(rhs)) }

    /// Flatten the left spine of an `and`/`or` chain: the first operand, then every operator with
    /// its right operand in reading order. Any other node is a chain of one operand.
    ///
    /// Chains like `a or b or c ...` nest one level per operator, so everything that walks the
    /// tree goes through here instead of recursing down the left side.
    pub fn chain(&self) -> (&Query, Vec<(Operator, &Query)>) {
        let mut rest = Vec::new();
        let mut node = self;
        loop {
            match node {
                Query::And(lhs, rhs) => {
                    rest.push((Operator::And, &**rhs));
                    node = &**lhs;
                }
                Query::Or(lhs, rhs) => {
                    rest.push((Operator::Or, &**rhs));
                    node = &**lhs;
                }
                _ => break,
            }
        }
        rest.reverse();
        (node, rest)
    }

    /// Term and phrase nodes, left to right.
    pub fn leaves(&self) -> Vec<&Query> {
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match node {
                Query::Term { .. } | Query::Phrase { .. } => out.push(node),
                Query::Not(inner) => pending.push(inner),
                Query::And(lhs, rhs) | Query::Or(lhs, rhs) => {
                    pending.push(rhs);
                    pending.push(lhs);
                }
            }
        }
        out
    }

    /// Field of the first phrase leaf, if any.
    pub fn phrase_field(&self) -> Option<Field> {
        self.leaves().into_iter().find_map(|q| match q {
            Query::Phrase { field, .. } => Some(*field),
            _ => None,
        })
    }
}

impl Drop for Query {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut node) = pending.pop() {
            detach_children(&mut node, &mut pending);
        }
    }
}

/// Move compound children out of `node` so dropping it does not recurse.
fn detach_children(node: &mut Query, out: &mut Vec<Query>) {
    let mut take = |child: &mut Box<Query>| {
        if matches!(**child, Query::Not(_) | Query::And(..) | Query::Or(..)) {
            out.push(std::mem::replace(&mut **child, Query::term(Field::Article, String::new())));
        }
    };
    match node {
        Query::Not(inner) => take(inner),
        Query::And(lhs, rhs) | Query::Or(lhs, rhs) => {
            take(lhs);
            take(rhs);
        }
        _ => {}
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term { field, value } => write!(f, "{field}:{value}"),
            Query::Phrase { field, value } => write!(f, "{field}:\"{value}\""),
            Query::Not(inner) => write!(f, "NOT {inner}"),
            Query::And(..) | Query::Or(..) => {
                let (first, rest) = self.chain();
                f.write_str(&"(".repeat(rest.len()))?;
                write!(f, "{first}")?;
                for (op, rhs) in rest {
                    let op = match op {
                        Operator::And => "AND",
                        Operator::Or => "OR",
                    };
                    write!(f, " {op} {rhs})")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_in_reading_order() {
        let q = Query::or(
            Query::and(Query::term(Field::Article, "a"), Query::not(Query::phrase(Field::Title, "b c"))),
            Query::term(Field::Date, "2015-01-01"),
        );
        let leaves = q.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[1], &Query::phrase(Field::Title, "b c"));
        assert_eq!(q.phrase_field(), Some(Field::Title));
        assert_eq!(q.to_string(), "((article:a AND NOT title:\"b c\") OR date:2015-01-01)");
        assert_eq!(Query::term(Field::Article, "a").phrase_field(), None);
    }

    #[test]
    fn chain_reads_left_to_right() {
        let q = Query::or(Query::and(Query::term(Field::Article, "a"), Query::term(Field::Article, "b")), Query::term(Field::Article, "c"));
        let (first, rest) = q.chain();
        assert_eq!(first, &Query::term(Field::Article, "a"));
        assert_eq!(
            rest,
            vec![(Operator::And, &Query::term(Field::Article, "b")), (Operator::Or, &Query::term(Field::Article, "c"))]
        );
        let leaf = Query::term(Field::Date, "x");
        assert!(leaf.chain().1.is_empty());
    }

    #[test]
    fn long_chains_drop_and_display_without_recursing() {
        let mut q = Query::term(Field::Article, "a");
        for _ in 0..100_000 {
            q = Query::or(q, Query::not(Query::term(Field::Article, "a")));
        }
        assert_eq!(q.leaves().len(), 100_001);
        assert!(q.to_string().ends_with(" OR NOT article:a)"));
        drop(q);

        let mut q = Query::term(Field::Article, "a");
        for _ in 0..100_000 {
            q = Query::not(q);
        }
        drop(q);
    }
}
