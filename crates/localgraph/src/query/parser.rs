//! Parser for the supported query subset.
//!
//! ```text
//! query      := [MATCH pattern [WHERE condition (AND condition)*]]
//!               RETURN projection ("," projection)* [LIMIT integer] [";"]
//! pattern    := node_pat [rel_pat node_pat]
//! node_pat   := "(" [var] (":" Label)* [prop_map] ")"
//! rel_pat    := "-[" [var] [":" TYPE] [prop_map] "]->"
//!             | "<-[" ... "]-"
//!             | "-[" ... "]-"
//! condition  := var "." key "=" operand
//! projection := expr [AS alias]
//! expr       := operand | var | var "." key
//!             | count(* | var) | id(var) | labels(var) | type(var)
//! ```
//!
//! Equality in property maps and `WHERE` compares numbers by value, so `3`
//! matches `3.0`; `null` matches nothing, not even a stored null.
//!
//! Everything else is rejected with [`GraphError::QuerySyntax`] naming the
//! construct.

use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{GraphError, Result};
use crate::graph::PropertyValue;
use std::collections::HashSet;
use std::fmt;

/// Clauses and keywords of the full language that this engine rejects by name.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "WITH", "UNWIND", "OPTIONAL",
    "ORDER", "SKIP", "UNION", "CALL", "YIELD", "FOREACH", "LOAD", "DISTINCT", "OR", "XOR",
    "NOT", "EXISTS", "CASE", "STARTS", "ENDS", "CONTAINS", "IN", "IS",
];

/// A literal or a `$parameter` reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Inline literal
    Literal(PropertyValue),
    /// Named parameter supplied with the query
    Param(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(PropertyValue::String(s)) => write!(f, "'{s}'"),
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Param(p) => write!(f, "${p}"),
        }
    }
}

/// `(var:Label:Other {key: value})`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    /// Bound variable name
    pub var: Option<String>,
    /// Required labels (all must be present)
    pub labels: Vec<String>,
    /// Inline property equality constraints
    pub properties: Vec<(String, Operand)>,
}

/// Direction of a relationship pattern, relative to the left-hand node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDirection {
    /// `-[]->`
    Outgoing,
    /// `<-[]-`
    Incoming,
    /// `-[]-`
    Either,
}

/// `-[var:TYPE {key: value}]->`
#[derive(Debug, Clone, PartialEq)]
pub struct RelPattern {
    /// Bound variable name
    pub var: Option<String>,
    /// Required relationship type
    pub rel_type: Option<String>,
    /// Inline property equality constraints
    pub properties: Vec<(String, Operand)>,
    /// Direction relative to the left node
    pub direction: PatternDirection,
}

/// A single node, optionally followed by one hop.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Left-hand node
    pub start: NodePattern,
    /// Optional relationship and right-hand node
    pub hop: Option<(RelPattern, NodePattern)>,
}

/// `var.key = operand`
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Variable the property belongs to
    pub var: String,
    /// Property key
    pub key: String,
    /// Required value
    pub value: Operand,
}

/// A projected expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal or parameter
    Operand(Operand),
    /// Whole node or relationship
    Var(String),
    /// `var.key`
    Property(String, String),
    /// `count(*)` (None) or `count(var)`
    Count(Option<String>),
    /// `id(var)`
    Id(String),
    /// `labels(var)`
    Labels(String),
    /// `type(var)`
    Type(String),
}

impl Expr {
    /// Whether the expression aggregates over all matched rows.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Count(_))
    }

    fn referenced_var(&self) -> Option<&str> {
        match self {
            Expr::Operand(_) | Expr::Count(None) => None,
            Expr::Var(v)
            | Expr::Property(v, _)
            | Expr::Count(Some(v))
            | Expr::Id(v)
            | Expr::Labels(v)
            | Expr::Type(v) => Some(v),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Operand(op) => write!(f, "{op}"),
            Expr::Var(v) => write!(f, "{v}"),
            Expr::Property(v, k) => write!(f, "{v}.{k}"),
            Expr::Count(None) => write!(f, "count(*)"),
            Expr::Count(Some(v)) => write!(f, "count({v})"),
            Expr::Id(v) => write!(f, "id({v})"),
            Expr::Labels(v) => write!(f, "labels({v})"),
            Expr::Type(v) => write!(f, "type({v})"),
        }
    }
}

/// `expr [AS alias]`
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// What to compute
    pub expr: Expr,
    /// Column name in the resulting record
    pub alias: String,
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// `MATCH` pattern; `None` for the bare `RETURN` form
    pub pattern: Option<Pattern>,
    /// `WHERE` equality conditions, all of which must hold
    pub conditions: Vec<Condition>,
    /// `RETURN` columns
    pub projections: Vec<Projection>,
    /// `LIMIT`
    pub limit: Option<usize>,
}

impl Statement {
    /// Parse query text.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::QuerySyntax`] for anything outside the subset.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = Lexer::new(text).tokenize()?;
        let statement = Parser { tokens, pos: 0 }.parse_statement()?;
        statement.validate()?;
        Ok(statement)
    }

    /// Column names, in order.
    pub fn columns(&self) -> Vec<&str> {
        self.projections.iter().map(|p| p.alias.as_str()).collect()
    }

    fn bound_vars(&self) -> Vec<(&str, bool)> {
        // (name, is_relationship)
        let mut vars = Vec::new();
        if let Some(pattern) = &self.pattern {
            if let Some(v) = &pattern.start.var {
                vars.push((v.as_str(), false));
            }
            if let Some((rel, end)) = &pattern.hop {
                if let Some(v) = &rel.var {
                    vars.push((v.as_str(), true));
                }
                if let Some(v) = &end.var {
                    vars.push((v.as_str(), false));
                }
            }
        }
        vars
    }

    fn validate(&self) -> Result<()> {
        let vars = self.bound_vars();
        let node_vars: HashSet<&str> = vars.iter().filter(|(_, r)| !r).map(|(v, _)| *v).collect();
        let rel_vars: HashSet<&str> = vars.iter().filter(|(_, r)| *r).map(|(v, _)| *v).collect();

        if let Some(v) = rel_vars.iter().find(|v| node_vars.contains(*v)) {
            return Err(GraphError::query_syntax(format!(
                "variable `{v}` bound to both a node and a relationship"
            )));
        }

        let is_bound = |v: &str| node_vars.contains(v) || rel_vars.contains(v);

        for condition in &self.conditions {
            if !is_bound(&condition.var) {
                return Err(GraphError::query_syntax(format!(
                    "unknown variable `{}` in WHERE",
                    condition.var
                )));
            }
        }

        let mut aliases = HashSet::new();
        for projection in &self.projections {
            if let Some(v) = projection.expr.referenced_var() {
                if !is_bound(v) {
                    return Err(GraphError::query_syntax(format!(
                        "unknown variable `{v}` in RETURN"
                    )));
                }
            }
            match &projection.expr {
                Expr::Type(v) if !rel_vars.contains(v.as_str()) => {
                    return Err(GraphError::query_syntax(format!(
                        "type() requires a relationship variable, got `{v}`"
                    )));
                }
                Expr::Labels(v) if !node_vars.contains(v.as_str()) => {
                    return Err(GraphError::query_syntax(format!(
                        "labels() requires a node variable, got `{v}`"
                    )));
                }
                _ => {}
            }
            if !aliases.insert(projection.alias.as_str()) {
                return Err(GraphError::query_syntax(format!(
                    "duplicate column name `{}`",
                    projection.alias
                )));
            }
        }

        let aggregates = self.projections.iter().filter(|p| p.expr.is_aggregate()).count();
        if aggregates > 0 && aggregates < self.projections.len() {
            return Err(GraphError::query_syntax(
                "mixing aggregates with non-aggregated columns (implicit grouping)",
            ));
        }

        Ok(())
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)].kind
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected `{}`", kind.describe())))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Error for the current token, naming unsupported keywords as such.
    fn unexpected(&self, context: &str) -> GraphError {
        match self.peek() {
            TokenKind::Ident(word)
                if UNSUPPORTED_KEYWORDS
                    .iter()
                    .any(|k| k.eq_ignore_ascii_case(word)) =>
            {
                GraphError::query_syntax(format!("{} is not supported", word.to_ascii_uppercase()))
            }
            other => GraphError::query_syntax(format!(
                "unexpected `{}` at offset {} ({context})",
                other.describe(),
                self.offset()
            )),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(&format!("expected {what}"))),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let mut pattern = None;
        let mut conditions = Vec::new();

        if self.eat_keyword("MATCH") {
            pattern = Some(self.parse_pattern()?);
            if self.peek() == &TokenKind::Comma {
                return Err(GraphError::query_syntax("multiple comma-separated patterns"));
            }
            if self.eat_keyword("WHERE") {
                conditions.push(self.parse_condition()?);
                while self.eat_keyword("AND") {
                    conditions.push(self.parse_condition()?);
                }
            }
        }

        if !self.eat_keyword("RETURN") {
            return Err(self.unexpected("expected MATCH or RETURN"));
        }
        if self.at_keyword("DISTINCT") {
            return Err(GraphError::query_syntax("RETURN DISTINCT is not supported"));
        }

        let mut projections = vec![self.parse_projection()?];
        while self.eat(&TokenKind::Comma) {
            projections.push(self.parse_projection()?);
        }

        let mut limit = None;
        if self.eat_keyword("LIMIT") {
            match self.advance() {
                TokenKind::Int(n) if n >= 0 => limit = Some(n as usize),
                other => {
                    return Err(GraphError::query_syntax(format!(
                        "LIMIT expects a non-negative integer, got `{}`",
                        other.describe()
                    )))
                }
            }
        }

        self.eat(&TokenKind::Semicolon);
        if self.peek() != &TokenKind::Eof {
            return Err(self.unexpected("expected end of query"));
        }

        Ok(Statement {
            pattern,
            conditions,
            projections,
            limit,
        })
    }

    fn parse_pattern(&mut self) -> Result<Pattern> {
        let start = self.parse_node_pattern()?;

        let direction_in = match self.peek() {
            TokenKind::Dash => false,
            TokenKind::LeftArrow => true,
            _ => return Ok(Pattern { start, hop: None }),
        };
        self.advance();

        let rel = self.parse_rel_body(direction_in)?;
        let end = self.parse_node_pattern()?;

        if matches!(self.peek(), TokenKind::Dash | TokenKind::LeftArrow) {
            return Err(GraphError::query_syntax(
                "multi-hop patterns (more than one relationship)",
            ));
        }

        Ok(Pattern {
            start,
            hop: Some((rel, end)),
        })
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern> {
        self.expect(&TokenKind::LeftParen)?;
        let mut node = NodePattern::default();

        if let TokenKind::Ident(name) = self.peek().clone() {
            self.advance();
            node.var = Some(name);
        }
        while self.eat(&TokenKind::Colon) {
            node.labels.push(self.identifier("a label")?);
            if self.peek() == &TokenKind::Pipe {
                return Err(GraphError::query_syntax("label alternation (`|`)"));
            }
        }
        if self.peek() == &TokenKind::LeftBrace {
            node.properties = self.parse_prop_map()?;
        }

        self.expect(&TokenKind::RightParen)?;
        Ok(node)
    }

    /// Parses `[...]` plus the closing arrow; the opening `-` or `<-` is consumed.
    fn parse_rel_body(&mut self, incoming: bool) -> Result<RelPattern> {
        if self.peek() != &TokenKind::LeftBracket {
            return Err(GraphError::query_syntax(
                "relationship patterns must use brackets, e.g. -[:CONTAINS]->",
            ));
        }
        self.advance();

        let mut var = None;
        if let TokenKind::Ident(name) = self.peek().clone() {
            self.advance();
            var = Some(name);
        }
        let mut rel_type = None;
        if self.eat(&TokenKind::Colon) {
            rel_type = Some(self.identifier("a relationship type")?);
            if self.peek() == &TokenKind::Pipe {
                return Err(GraphError::query_syntax("relationship type alternation (`|`)"));
            }
        }
        if self.peek() == &TokenKind::Star {
            return Err(GraphError::query_syntax("variable-length relationships (`*`)"));
        }
        let mut properties = Vec::new();
        if self.peek() == &TokenKind::LeftBrace {
            properties = self.parse_prop_map()?;
        }
        self.expect(&TokenKind::RightBracket)?;

        let direction = match (incoming, self.advance()) {
            (false, TokenKind::RightArrow) => PatternDirection::Outgoing,
            (false, TokenKind::Dash) => PatternDirection::Either,
            (true, TokenKind::Dash) => PatternDirection::Incoming,
            (true, TokenKind::RightArrow) => {
                return Err(GraphError::query_syntax("bidirectional arrow <-[]->"))
            }
            (_, other) => {
                return Err(GraphError::query_syntax(format!(
                    "unexpected `{}` after relationship pattern",
                    other.describe()
                )))
            }
        };

        Ok(RelPattern {
            var,
            rel_type,
            properties,
            direction,
        })
    }

    fn parse_prop_map(&mut self) -> Result<Vec<(String, Operand)>> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut entries = Vec::new();
        if self.eat(&TokenKind::RightBrace) {
            return Ok(entries);
        }
        loop {
            let key = self.identifier("a property key")?;
            self.expect(&TokenKind::Colon)?;
            entries.push((key, self.parse_operand()?));
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RightBrace)?;
            return Ok(entries);
        }
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let var = self.identifier("a variable")?;
        if !self.eat(&TokenKind::Dot) {
            return Err(self.unexpected("WHERE supports only `var.key = value`"));
        }
        let key = self.identifier("a property key")?;
        if !self.eat(&TokenKind::Equals) {
            return Err(match self.peek() {
                TokenKind::Other(op) => {
                    GraphError::query_syntax(format!("comparison operator `{op}` in WHERE"))
                }
                _ => self.unexpected("WHERE supports only `=`"),
            });
        }
        let value = self.parse_operand()?;
        if self.at_keyword("OR") || self.at_keyword("XOR") {
            return Err(self.unexpected("only AND may join conditions"));
        }
        Ok(Condition { var, key, value })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let negative = self.eat(&TokenKind::Dash);
        let operand = match self.peek().clone() {
            TokenKind::Int(i) => Operand::Literal(PropertyValue::Int(if negative { -i } else { i })),
            TokenKind::Float(f) => {
                Operand::Literal(PropertyValue::Float(if negative { -f } else { f }))
            }
            _ if negative => return Err(self.unexpected("expected a number after `-`")),
            TokenKind::Str(s) => Operand::Literal(PropertyValue::String(s)),
            TokenKind::Param(p) => Operand::Param(p),
            TokenKind::Ident(word) if word.eq_ignore_ascii_case("true") => {
                Operand::Literal(PropertyValue::Bool(true))
            }
            TokenKind::Ident(word) if word.eq_ignore_ascii_case("false") => {
                Operand::Literal(PropertyValue::Bool(false))
            }
            TokenKind::Ident(word) if word.eq_ignore_ascii_case("null") => {
                Operand::Literal(PropertyValue::Null)
            }
            TokenKind::LeftBracket => return Err(GraphError::query_syntax("list literals")),
            TokenKind::LeftBrace => return Err(GraphError::query_syntax("map literals")),
            _ => return Err(self.unexpected("expected a literal or parameter")),
        };
        self.advance();
        Ok(operand)
    }

    fn parse_projection(&mut self) -> Result<Projection> {
        let expr = self.parse_expr()?;
        if matches!(self.peek(), TokenKind::Other(_) | TokenKind::Star | TokenKind::Dash) {
            return Err(GraphError::query_syntax(format!(
                "operator `{}` in RETURN expressions",
                self.peek().describe()
            )));
        }
        let alias = if self.eat_keyword("AS") {
            self.identifier("an alias")?
        } else {
            expr.to_string()
        };
        Ok(Projection { expr, alias })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let TokenKind::Ident(name) = self.peek().clone() else {
            return self.parse_operand().map(Expr::Operand);
        };

        if ["true", "false", "null"]
            .iter()
            .any(|k| name.eq_ignore_ascii_case(k))
        {
            return self.parse_operand().map(Expr::Operand);
        }

        if self.peek_at(1) == &TokenKind::LeftParen {
            self.advance();
            self.advance();
            let expr = match name.to_ascii_lowercase().as_str() {
                "count" => {
                    if self.eat(&TokenKind::Star) {
                        Expr::Count(None)
                    } else {
                        Expr::Count(Some(self.identifier("a variable")?))
                    }
                }
                "id" => Expr::Id(self.identifier("a variable")?),
                "labels" => Expr::Labels(self.identifier("a variable")?),
                "type" => Expr::Type(self.identifier("a variable")?),
                _ => return Err(GraphError::query_syntax(format!("function {name}()"))),
            };
            self.expect(&TokenKind::RightParen)?;
            return Ok(expr);
        }

        if UNSUPPORTED_KEYWORDS
            .iter()
            .any(|k| k.eq_ignore_ascii_case(&name))
        {
            return Err(self.unexpected("expected an expression"));
        }

        self.advance();
        if self.eat(&TokenKind::Dot) {
            let key = self.identifier("a property key")?;
            return Ok(Expr::Property(name, key));
        }
        Ok(Expr::Var(name))
    }
}
