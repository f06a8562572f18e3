//! The ACTION/GOTO tables consumed by the parser driver. The tables are
//! produced by the generator; in-process use goes through a lazily built
//! singleton, and `conch_tablegen` serializes the same tables to disk.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::NodeKind;
use crate::lexer::TokenKind;

use super::generator::Generator;
use super::grammar::grammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    /// Reduce by the rule with this index into the grammar's rule list.
    Reduce(usize),
    Accept,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    pub actions: Vec<HashMap<TokenKind, Action>>,
    pub gotos: Vec<HashMap<NodeKind, usize>>,
}

impl ParseTable {
    pub fn action(&self, state: usize, token: TokenKind) -> Option<Action> {
        self.actions.get(state)?.get(&token).copied()
    }

    pub fn goto(&self, state: usize, node: NodeKind) -> Option<usize> {
        self.gotos.get(state)?.get(&node).copied()
    }

    pub fn state_count(&self) -> usize {
        self.actions.len()
    }
}

static PARSE_TABLE: Lazy<ParseTable> = Lazy::new(|| Generator::new(grammar()).build());

pub fn parse_table() -> &'static ParseTable {
    &PARSE_TABLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_nonempty() {
        let table = parse_table();
        assert!(table.state_count() > 1);
    }
}
