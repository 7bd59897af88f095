//! RQL front end.
//!
//! Accepts the subset of RQL the engine executes:
//!
//! ```text
//! (Any|DISTINCT Any|<EType>) sel, .. [GROUPBY ..] [ORDERBY ..] [LIMIT n] [OFFSET n]
//!     [WHERE restriction] [HAVING restriction]
//! INSERT <EType> V, .. [: rel, ..] [WHERE restriction]
//! DELETE <EType> V | V rtype V, .. [WHERE restriction]
//! SET rel, .. [WHERE restriction]
//! (<select>) UNION (<select>) ..
//! ```

mod parser;
use parser::Parser;

mod token;
use token::{tokenize, Token, TokenKind};

use crate::{stmt, Result};

/// Parses a statement.
pub fn parse(text: &str) -> Result<stmt::Statement> {
    let mut parser = Parser::new(text, tokenize(text)?);
    let stmt = parser.parse_statement()?;
    parser.expect_end()?;
    Ok(stmt)
}

/// Parses a restriction, such as a permission expression.
pub fn parse_restriction(text: &str) -> Result<stmt::Node> {
    let mut parser = Parser::new(text, tokenize(text)?);
    let node = parser.parse_restriction()?;
    parser.expect_end()?;
    Ok(node)
}

/// Returns true if `word` is written like a variable: an upper-case letter
/// followed by upper-case letters, digits or underscores.
pub fn is_var_name(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
