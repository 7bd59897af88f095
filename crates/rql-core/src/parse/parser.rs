use super::{is_var_name, Token, TokenKind};
use crate::{
    stmt::{
        ArithOp, CmpOp, Compare, Delete, Expr, ExprFunc, Insert, Node, Optional, Relation,
        Select, Set, SortTerm, Statement, Union, Value,
    },
    Error, Result,
};

const KEYWORDS: &[&str] = &[
    "AND", "ANY", "ASC", "DELETE", "DESC", "DISTINCT", "EXISTS", "FALSE", "GROUPBY", "HAVING",
    "ILIKE", "IN", "INSERT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "OR", "ORDERBY", "SET",
    "TRUE", "UNION", "WHERE",
];

#[derive(Debug)]
pub(crate) struct Parser<'a> {
    text: &'a str,
    toks: Vec<Token>,
    /// Index of token we should process next.
    idx: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(text: &'a str, toks: Vec<Token>) -> Self {
        Parser { text, toks, idx: 0 }
    }

    pub(crate) fn parse_statement(&mut self) -> Result<Statement> {
        if self.parse_keyword("INSERT") {
            self.parse_insert().map(Statement::Insert)
        } else if self.parse_keyword("DELETE") {
            self.parse_delete().map(Statement::Delete)
        } else if self.parse_keyword("SET") {
            self.parse_set().map(Statement::Set)
        } else if self.peek_kind(&TokenKind::LParen) {
            self.parse_union().map(Statement::Select)
        } else {
            Ok(Statement::Select(Union::single(self.parse_select()?)))
        }
    }

    pub(crate) fn expect_end(&mut self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(self.unexpected(tok)),
        }
    }

    fn parse_union(&mut self) -> Result<Union> {
        let mut selects = vec![];
        loop {
            self.expect(TokenKind::LParen, "`(`")?;
            selects.push(self.parse_select()?);
            self.expect(TokenKind::RParen, "`)`")?;

            if !self.parse_keyword("UNION") {
                break;
            }
        }
        Ok(Union::new(selects))
    }

    fn parse_select(&mut self) -> Result<Select> {
        let distinct = self.parse_keyword("DISTINCT");

        let etype = if self.parse_keyword("ANY") {
            None
        } else {
            Some(self.parse_etype()?)
        };

        let mut select = Select::new(self.parse_terms()?, None);
        select.distinct = distinct;

        if let Some(etype) = etype {
            let Some(Expr::Var(var)) = select.selection.first() else {
                return Err(self.error("expected a variable after the entity type"));
            };
            let var = var.clone();
            select.add_relation(Relation::new(var, "is", Expr::EType(etype)));
        }

        let mut restriction = select.restriction.take();

        loop {
            if self.parse_keyword("GROUPBY") {
                select.groupby = self.parse_terms()?;
            } else if self.parse_keyword("ORDERBY") {
                select.orderby = self.parse_sort_terms()?;
            } else if self.parse_keyword("LIMIT") {
                select.limit = Some(self.parse_u64()?);
            } else if self.parse_keyword("OFFSET") {
                select.offset = self.parse_u64()?;
            } else if self.parse_keyword("WHERE") {
                let node = self.parse_restriction()?;
                restriction = Node::and(restriction.into_iter().chain(Some(node)));
            } else if self.parse_keyword("HAVING") {
                select.having = Some(self.parse_having()?);
            } else {
                break;
            }
        }

        select.restriction = restriction;
        Ok(select)
    }

    fn parse_insert(&mut self) -> Result<Insert> {
        let mut main_vars = vec![];
        loop {
            let etype = self.parse_etype()?;
            let var = self.parse_var()?;
            main_vars.push((etype, var));
            if !self.parse_kind(&TokenKind::Comma) {
                break;
            }
        }

        let mut main_relations = vec![];
        if self.parse_kind(&TokenKind::Colon) {
            main_relations = self.parse_relations()?;
        }

        let restriction = self.parse_where()?;

        Ok(Insert {
            main_vars,
            main_relations,
            restriction,
            solutions: vec![],
        })
    }

    fn parse_delete(&mut self) -> Result<Delete> {
        let mut main_vars = vec![];
        let mut main_relations = vec![];

        loop {
            if self.peek_var() {
                let relation = self.parse_relation()?;
                if !relation.object.is_var() {
                    return Err(self.error("deleted relations must link two variables"));
                }
                main_relations.push(relation);
            } else {
                let etype = self.parse_etype()?;
                let var = self.parse_var()?;
                main_vars.push((etype, var));
            }

            if !self.parse_kind(&TokenKind::Comma) {
                break;
            }
        }

        let restriction = self.parse_where()?;

        Ok(Delete {
            main_vars,
            main_relations,
            restriction,
            solutions: vec![],
        })
    }

    fn parse_set(&mut self) -> Result<Set> {
        let main_relations = self.parse_relations()?;
        let restriction = self.parse_where()?;

        Ok(Set {
            main_relations,
            restriction,
            solutions: vec![],
        })
    }

    fn parse_relations(&mut self) -> Result<Vec<Relation>> {
        let mut ret = vec![self.parse_relation()?];
        while self.parse_kind(&TokenKind::Comma) {
            ret.push(self.parse_relation()?);
        }
        Ok(ret)
    }

    fn parse_where(&mut self) -> Result<Option<Node>> {
        if self.parse_keyword("WHERE") {
            Ok(Some(self.parse_restriction()?))
        } else {
            Ok(None)
        }
    }

    /// restriction := or_expr (("," | AND) or_expr)*
    pub(crate) fn parse_restriction(&mut self) -> Result<Node> {
        let mut nodes = vec![self.parse_or()?];
        while self.parse_kind(&TokenKind::Comma) || self.parse_keyword("AND") {
            nodes.push(self.parse_or()?);
        }
        Node::and(nodes).ok_or_else(|| self.error("empty restriction"))
    }

    fn parse_or(&mut self) -> Result<Node> {
        let mut nodes = vec![self.parse_unary()?];
        while self.parse_keyword("OR") {
            nodes.push(self.parse_unary()?);
        }
        Ok(Node::or(nodes))
    }

    fn parse_unary(&mut self) -> Result<Node> {
        if self.parse_keyword("NOT") {
            return Ok(Node::not(self.parse_unary()?));
        }

        if self.parse_keyword("EXISTS") {
            self.expect(TokenKind::LParen, "`(`")?;
            let inner = self.parse_restriction()?;
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(Node::exists(inner));
        }

        if self.parse_kind(&TokenKind::LParen) {
            let inner = self.parse_restriction()?;
            self.expect(TokenKind::RParen, "`)`")?;
            return Ok(inner);
        }

        Ok(Node::Relation(self.parse_relation()?))
    }

    /// relation := Var ["?"] rtype [op] object ["?"]
    fn parse_relation(&mut self) -> Result<Relation> {
        let subject = self.parse_var()?;
        let subject_optional = self.parse_kind(&TokenKind::Question);
        let rtype = self.parse_rtype()?;

        let mut relation = Relation::new(subject, rtype, Expr::Value(Value::Null));

        if matches!(relation.rtype.as_str(), "is" | "is_instance_of") {
            if self.parse_keyword("IN") {
                relation.op = CmpOp::In;
                self.expect(TokenKind::LParen, "`(`")?;
                let mut items = vec![Expr::EType(self.parse_etype()?)];
                while self.parse_kind(&TokenKind::Comma) {
                    items.push(Expr::EType(self.parse_etype()?));
                }
                self.expect(TokenKind::RParen, "`)`")?;
                relation.object = Expr::List(items);
            } else {
                relation.object = Expr::EType(self.parse_etype()?);
            }
        } else {
            relation.op = self.parse_cmp_op();
            relation.object = if relation.op == CmpOp::In {
                self.expect(TokenKind::LParen, "`(`")?;
                let items = self.parse_terms()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Expr::List(items)
            } else {
                self.parse_term()?
            };
        }

        let object_optional = self.parse_kind(&TokenKind::Question);

        relation.optional = match (subject_optional, object_optional) {
            (false, false) => Optional::None,
            (true, false) => Optional::Subject,
            (false, true) if relation.object.is_var() => Optional::Object,
            _ => return Err(self.error("invalid optional marker")),
        };

        Ok(relation)
    }

    fn parse_cmp_op(&mut self) -> CmpOp {
        let kind = self.peek().map(|tok| tok.kind.clone());
        let op = match kind {
            Some(TokenKind::Eq) => CmpOp::Eq,
            Some(TokenKind::Ne) => CmpOp::Ne,
            Some(TokenKind::Lt) => CmpOp::Lt,
            Some(TokenKind::Le) => CmpOp::Le,
            Some(TokenKind::Gt) => CmpOp::Gt,
            Some(TokenKind::Ge) => CmpOp::Ge,
            _ => {
                return if self.parse_keyword("LIKE") {
                    CmpOp::Like
                } else if self.parse_keyword("ILIKE") {
                    CmpOp::ILike
                } else if self.parse_keyword("IN") {
                    CmpOp::In
                } else {
                    CmpOp::Eq
                };
            }
        };
        self.idx += 1;
        op
    }

    /// having := compare (("," | AND | OR) compare)*, with NOT and parens
    fn parse_having(&mut self) -> Result<Node> {
        let mut nodes = vec![self.parse_having_or()?];
        while self.parse_kind(&TokenKind::Comma) || self.parse_keyword("AND") {
            nodes.push(self.parse_having_or()?);
        }
        Node::and(nodes).ok_or_else(|| self.error("empty having clause"))
    }

    fn parse_having_or(&mut self) -> Result<Node> {
        let mut nodes = vec![self.parse_having_unary()?];
        while self.parse_keyword("OR") {
            nodes.push(self.parse_having_unary()?);
        }
        Ok(Node::or(nodes))
    }

    fn parse_having_unary(&mut self) -> Result<Node> {
        if self.parse_keyword("NOT") {
            return Ok(Node::not(self.parse_having_unary()?));
        }

        let lhs = self.parse_term()?;
        let op = self.parse_cmp_op();
        let rhs = self.parse_term()?;
        Ok(Node::Compare(Compare { lhs, op, rhs }))
    }

    fn parse_terms(&mut self) -> Result<Vec<Expr>> {
        let mut ret = vec![self.parse_term()?];
        while self.parse_kind(&TokenKind::Comma) {
            ret.push(self.parse_term()?);
        }
        Ok(ret)
    }

    fn parse_sort_terms(&mut self) -> Result<Vec<SortTerm>> {
        let mut ret = vec![];
        loop {
            let expr = self.parse_term()?;
            let asc = if self.parse_keyword("DESC") {
                false
            } else {
                self.parse_keyword("ASC");
                true
            };
            ret.push(SortTerm { expr, asc });

            if !self.parse_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(ret)
    }

    /// term := factor (("+" | "-") factor)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = if self.parse_kind(&TokenKind::Plus) {
                ArithOp::Add
            } else if self.parse_kind(&TokenKind::Minus) {
                ArithOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_factor()?;
            lhs = Expr::binary_op(lhs, op, rhs);
        }
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_primary()?;
        loop {
            let op = if self.parse_kind(&TokenKind::Star) {
                ArithOp::Mul
            } else if self.parse_kind(&TokenKind::Slash) {
                ArithOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.parse_primary()?;
            lhs = Expr::binary_op(lhs, op, rhs);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(tok) = self.next_token() else {
            return Err(self.error("unexpected end of query"));
        };

        match tok.kind {
            TokenKind::Number(value) => Ok(Expr::Value(value)),
            TokenKind::String(value) => Ok(Expr::Value(Value::String(value))),
            TokenKind::Arg(name) => Ok(Expr::Arg(name)),
            TokenKind::Minus => match self.next_token().map(|tok| tok.kind) {
                Some(TokenKind::Number(Value::I64(v))) => Ok(Expr::Value(Value::I64(-v))),
                Some(TokenKind::Number(Value::F64(v))) => Ok(Expr::Value(Value::F64(-v))),
                _ => Err(Error::syntax("expected a number", tok.offset)),
            },
            TokenKind::LParen => {
                let expr = self.parse_term()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            TokenKind::Word(word) => {
                if word.eq_ignore_ascii_case("NULL") {
                    Ok(Expr::Value(Value::Null))
                } else if word.eq_ignore_ascii_case("TRUE") {
                    Ok(Expr::Value(Value::Bool(true)))
                } else if word.eq_ignore_ascii_case("FALSE") {
                    Ok(Expr::Value(Value::Bool(false)))
                } else if self.peek_kind(&TokenKind::LParen) {
                    self.parse_func(word)
                } else if is_var_name(&word) && !is_keyword(&word) {
                    Ok(Expr::Var(word))
                } else {
                    Err(Error::syntax(format!("unexpected `{word}`"), tok.offset))
                }
            }
            _ => Err(self.unexpected(&tok)),
        }
    }

    fn parse_func(&mut self, name: String) -> Result<Expr> {
        self.expect(TokenKind::LParen, "`(`")?;
        let distinct = self.parse_keyword("DISTINCT");
        let args = if self.peek_kind(&TokenKind::RParen) {
            vec![]
        } else {
            self.parse_terms()?
        };
        self.expect(TokenKind::RParen, "`)`")?;

        Ok(Expr::Func(ExprFunc {
            name: name.to_ascii_uppercase(),
            distinct,
            args,
        }))
    }

    fn parse_var(&mut self) -> Result<String> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) if is_var_name(&word) && !is_keyword(&word) => Ok(word),
            Some(tok) => Err(Error::syntax("expected a variable", tok.offset)),
            None => Err(self.error("expected a variable")),
        }
    }

    fn parse_etype(&mut self) -> Result<String> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) if word.starts_with(|c: char| c.is_ascii_uppercase()) && !is_keyword(&word) => {
                Ok(word)
            }
            Some(tok) => Err(Error::syntax("expected an entity type", tok.offset)),
            None => Err(self.error("expected an entity type")),
        }
    }

    fn parse_rtype(&mut self) -> Result<String> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) if word.starts_with(|c: char| c.is_ascii_lowercase()) => Ok(word),
            Some(tok) => Err(Error::syntax("expected a relation type", tok.offset)),
            None => Err(self.error("expected a relation type")),
        }
    }

    fn parse_u64(&mut self) -> Result<u64> {
        match self.next_token() {
            Some(Token {
                kind: TokenKind::Number(Value::I64(v)),
                ..
            }) if v >= 0 => Ok(v as u64),
            Some(tok) => Err(Error::syntax("expected a positive integer", tok.offset)),
            None => Err(self.error("expected a positive integer")),
        }
    }

    fn peek_var(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token { kind: TokenKind::Word(word), .. }) if is_var_name(word) && !is_keyword(word)
        )
    }

    /// Parse a single keyword.
    fn parse_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(tok) if tok.is_keyword(keyword) => {
                self.idx += 1;
                true
            }
            _ => false,
        }
    }

    fn parse_kind(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind(kind) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn peek_kind(&self, kind: &TokenKind) -> bool {
        self.peek().map(|tok| &tok.kind == kind).unwrap_or(false)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        match self.next_token() {
            Some(tok) if tok.kind == kind => Ok(()),
            Some(tok) => Err(Error::syntax(format!("expected {what}"), tok.offset)),
            None => Err(self.error(&format!("expected {what}"))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.toks.get(self.idx)
    }

    fn next_token(&mut self) -> Option<Token> {
        let tok = self.toks.get(self.idx).cloned();
        if tok.is_some() {
            self.idx += 1;
        }
        tok
    }

    /// Error at the current position.
    fn error(&self, msg: &str) -> Error {
        let offset = self
            .peek()
            .map(|tok| tok.offset)
            .unwrap_or(self.text.len());
        Error::syntax(msg, offset)
    }

    fn unexpected(&self, tok: &Token) -> Error {
        let end = self
            .toks
            .iter()
            .find(|t| t.offset > tok.offset)
            .map(|t| t.offset)
            .unwrap_or(self.text.len());
        let src = self.text[tok.offset..end].trim_end();
        Error::syntax(format!("unexpected `{src}`"), tok.offset)
    }
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}
