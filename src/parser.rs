// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SQL Parser
//!
//! A recursive-descent parser with precedence climbing. Hard syntax
//! errors abort with a [`ParserError`] carrying the byte offset and the
//! offending literal; semantic violations accumulate per statement in
//! [`Ast::errors`] and never abort.

use std::collections::BTreeMap;

use core::fmt;

use log::debug;

use crate::ast::visit::contains_subquery;
use crate::ast::*;
use crate::keywords::{self, Keyword};
use crate::tokenizer::{Token, TokenWithLocation, Tokenizer, Word};

/// A hard syntax error. Aborts the parse; no AST is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    /// What the parser was expecting.
    pub message: String,
    /// Byte offset of the offending token.
    pub offset: usize,
    /// The literal text of the offending token.
    pub near: String,
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "syntax error at position {} near '{}': {}",
            self.offset, self.near, self.message
        )
    }
}

impl std::error::Error for ParserError {}

// Precedence ladder, lowest binding first. The right operand of a binary
// operator parses at the operator's own level, which makes every level
// left-associative.
const OR_PREC: u8 = 5;
const AND_PREC: u8 = 10;
const NOT_PREC: u8 = 15;
const LIKE_PREC: u8 = 20;
const INEQ_PREC: u8 = 25;
const ESCAPE_PREC: u8 = 30;
const BIT_PREC: u8 = 35;
const ADD_PREC: u8 = 40;
const MUL_PREC: u8 = 45;
const CONCAT_PREC: u8 = 50;
const COLLATE_PREC: u8 = 55;
const UNARY_PREC: u8 = 60;

/// SQL Parser
pub struct Parser {
    tokens: Vec<TokenWithLocation>,
    index: usize,
    statement_index: usize,
    errors: BTreeMap<usize, Vec<SemanticError>>,
}

impl Parser {
    /// Tokenizes and parses a program, returning the AST together with
    /// any per-statement semantic errors.
    pub fn parse_sql(sql: &str) -> Result<Ast, ParserError> {
        debug!("parsing sql: {sql}");
        let tokens = Tokenizer::new(sql).tokenize().map_err(|e| ParserError {
            message: e.message,
            offset: e.offset,
            near: sql[e.offset..].chars().next().map(String::from).unwrap_or_default(),
        })?;
        let mut parser = Parser {
            tokens,
            index: 0,
            statement_index: 0,
            errors: BTreeMap::new(),
        };
        parser.parse_program()
    }

    // ------------------------------------------------------------------
    // token plumbing

    fn peek_with_location(&self) -> &TokenWithLocation {
        // the token stream always ends with EOF and the cursor never
        // moves past it
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn peek_token(&self) -> &Token {
        &self.peek_with_location().token
    }

    fn peek_nth_token(&self, n: usize) -> &Token {
        self.tokens
            .get(self.index + n)
            .map(|t| &t.token)
            .unwrap_or(&Token::EOF)
    }

    fn peek_keyword(&self) -> Keyword {
        match self.peek_token() {
            Token::Word(w) if w.quote_style.is_none() => w.keyword,
            _ => Keyword::NoKeyword,
        }
    }

    fn peek_nth_keyword(&self, n: usize) -> Keyword {
        match self.peek_nth_token(n) {
            Token::Word(w) if w.quote_style.is_none() => w.keyword,
            _ => Keyword::NoKeyword,
        }
    }

    fn next_token(&mut self) -> TokenWithLocation {
        let token = self.peek_with_location().clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn consume_token(&mut self, expected: &Token) -> bool {
        if self.peek_token() == expected {
            self.next_token();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, expected: &Token) -> Result<(), ParserError> {
        if self.consume_token(expected) {
            Ok(())
        } else {
            self.expected(&format!("'{expected}'"))
        }
    }

    fn parse_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek_keyword() == keyword {
            self.next_token();
            true
        } else {
            false
        }
    }

    fn parse_one_of_keywords(&mut self, candidates: &[Keyword]) -> Option<Keyword> {
        let keyword = self.peek_keyword();
        if candidates.contains(&keyword) {
            self.next_token();
            Some(keyword)
        } else {
            None
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParserError> {
        if self.parse_keyword(keyword) {
            Ok(())
        } else {
            self.expected(&format!("{keyword:?}"))
        }
    }

    fn expected<T>(&self, what: &str) -> Result<T, ParserError> {
        let token = self.peek_with_location();
        Err(ParserError {
            message: format!("expected {what}"),
            offset: token.offset,
            near: token.token.to_string(),
        })
    }

    fn expected_at<T>(&self, token: &TokenWithLocation, what: &str) -> Result<T, ParserError> {
        Err(ParserError {
            message: format!("expected {what}"),
            offset: token.offset,
            near: token.token.to_string(),
        })
    }

    fn record_error(&mut self, error: SemanticError) {
        self.errors
            .entry(self.statement_index)
            .or_default()
            .push(error);
    }

    // ------------------------------------------------------------------
    // program structure

    fn parse_program(&mut self) -> Result<Ast, ParserError> {
        let first = self.parse_statement()?;
        let single = matches!(first, Statement::Select(_) | Statement::CreateTable(_));
        let mut statements = vec![first];
        if single {
            self.consume_token(&Token::SemiColon);
            self.expect_end()?;
        } else {
            loop {
                if !self.consume_token(&Token::SemiColon) {
                    self.expect_end()?;
                    break;
                }
                if self.peek_token() == &Token::EOF {
                    break;
                }
                if matches!(self.peek_keyword(), Keyword::SELECT | Keyword::CREATE) {
                    return self.expected("an insert, update, delete, grant or revoke statement");
                }
                self.statement_index += 1;
                statements.push(self.parse_statement()?);
            }
        }
        Ok(Ast {
            statements,
            errors: std::mem::take(&mut self.errors),
        })
    }

    fn expect_end(&mut self) -> Result<(), ParserError> {
        if self.peek_token() == &Token::EOF {
            Ok(())
        } else {
            self.expected("end of statement")
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        debug!("parsing statement {}", self.statement_index);
        match self.peek_keyword() {
            Keyword::SELECT => self.parse_select().map(Statement::Select),
            Keyword::CREATE => self.parse_create_table().map(Statement::CreateTable),
            Keyword::INSERT => self.parse_insert(),
            Keyword::UPDATE => self.parse_update(),
            Keyword::DELETE => self.parse_delete(),
            Keyword::GRANT => self.parse_grant(),
            Keyword::REVOKE => self.parse_revoke(),
            _ => self.expected("a statement"),
        }
    }

    /// Compound operators are lexed but the dialect rejects them: the
    /// trailing selects parse and are dropped, and the statement gets a
    /// semantic error.
    fn reject_compound_select(&mut self) -> Result<(), ParserError> {
        while self
            .parse_one_of_keywords(&[Keyword::UNION, Keyword::EXCEPT, Keyword::INTERSECT])
            .is_some()
        {
            self.parse_keyword(Keyword::ALL);
            self.record_error(SemanticError::CompoundSelectNotAllowed);
            self.parse_select()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // identifiers

    fn parse_identifier(&mut self) -> Result<Ident, ParserError> {
        let token = self.next_token();
        match &token.token {
            Token::Word(w) => match self.make_ident(w.clone()) {
                Some(ident) => Ok(ident),
                None => self.expected_at(&token, "an identifier"),
            },
            _ => self.expected_at(&token, "an identifier"),
        }
    }

    /// Converts a word to an identifier. Reserved keywords are refused;
    /// the banned keywords parse as identifiers but attach a semantic
    /// error to the statement.
    fn make_ident(&mut self, word: Word) -> Option<Ident> {
        if word.quote_style.is_none() {
            if keywords::is_keyword_not_allowed(word.keyword) {
                self.record_error(SemanticError::KeywordIsNotAllowed {
                    keyword: keywords::banned_keyword_name(word.keyword).to_string(),
                });
            } else if word.keyword != Keyword::NoKeyword {
                return None;
            }
        }
        Some(Ident {
            value: word.value,
            quote_style: word.quote_style,
        })
    }

    fn parse_column_identifier(&mut self) -> Result<Ident, ParserError> {
        let ident = self.parse_identifier()?;
        self.check_column_name_length(&ident);
        Ok(ident)
    }

    fn check_column_name_length(&mut self, ident: &Ident) {
        if ident.value.len() > MAX_COLUMN_NAME_LENGTH {
            self.record_error(SemanticError::ColumnNameTooLong {
                name: ident.value.clone(),
            });
        }
    }

    fn parse_table(&mut self) -> Result<Table, ParserError> {
        let name = self.parse_identifier()?;
        Ok(Table {
            name,
            is_target: true,
        })
    }

    /// A bare alias: a plain word that is not a keyword.
    fn parse_optional_alias(&mut self) -> Result<Option<Ident>, ParserError> {
        if self.parse_keyword(Keyword::AS) {
            return Ok(Some(self.parse_identifier()?));
        }
        match self.peek_token() {
            Token::Word(w) if w.quote_style.is_some() || w.keyword == Keyword::NoKeyword => {
                Ok(Some(self.parse_identifier()?))
            }
            _ => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // SELECT

    fn parse_select(&mut self) -> Result<Select, ParserError> {
        self.expect_keyword(Keyword::SELECT)?;
        let distinct = if self.parse_keyword(Keyword::DISTINCT) {
            Some(Distinct::Distinct)
        } else if self.parse_keyword(Keyword::ALL) {
            Some(Distinct::All)
        } else {
            None
        };

        let mut columns = vec![self.parse_select_column()?];
        while self.consume_token(&Token::Comma) {
            columns.push(self.parse_select_column()?);
        }

        let mut from = Vec::new();
        if self.parse_keyword(Keyword::FROM) {
            from.push(self.parse_from_expr()?);
            while self.consume_token(&Token::Comma) {
                from.push(self.parse_from_expr()?);
            }
        }

        let selection = if self.parse_keyword(Keyword::WHERE) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.parse_keyword(Keyword::GROUP) {
            self.expect_keyword(Keyword::BY)?;
            group_by.push(self.parse_expr()?);
            while self.consume_token(&Token::Comma) {
                group_by.push(self.parse_expr()?);
            }
        }

        let having = if self.parse_keyword(Keyword::HAVING) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.parse_keyword(Keyword::ORDER) {
            self.expect_keyword(Keyword::BY)?;
            order_by.push(self.parse_ordering_term()?);
            while self.consume_token(&Token::Comma) {
                order_by.push(self.parse_ordering_term()?);
            }
        }

        let limit = if self.parse_keyword(Keyword::LIMIT) {
            Some(self.parse_limit()?)
        } else {
            None
        };

        self.reject_compound_select()?;

        Ok(Select {
            distinct,
            columns,
            from,
            selection,
            group_by,
            having,
            order_by,
            limit,
        })
    }

    fn parse_select_column(&mut self) -> Result<SelectColumn, ParserError> {
        if self.consume_token(&Token::Mul) {
            return Ok(SelectColumn::Star { table: None });
        }
        // `table.*`
        if let Token::Word(w) = self.peek_token() {
            if self.peek_nth_token(1) == &Token::Period && self.peek_nth_token(2) == &Token::Mul {
                let w = w.clone();
                if let Some(name) = self.make_ident(w) {
                    self.next_token();
                    self.next_token();
                    self.next_token();
                    return Ok(SelectColumn::Star {
                        table: Some(Table {
                            name,
                            is_target: false,
                        }),
                    });
                }
            }
        }
        let expr = self.parse_expr()?;
        let alias = self.parse_optional_alias()?;
        Ok(SelectColumn::Aliased { expr, alias })
    }

    fn parse_ordering_term(&mut self) -> Result<OrderingTerm, ParserError> {
        let expr = self.parse_expr()?;
        let direction = if self.parse_keyword(Keyword::ASC) {
            Some(OrderDirection::Asc)
        } else if self.parse_keyword(Keyword::DESC) {
            Some(OrderDirection::Desc)
        } else {
            None
        };
        Ok(OrderingTerm { expr, direction })
    }

    /// `limit a, b` means `limit b offset a`; the AST keeps only the
    /// limit/offset form.
    fn parse_limit(&mut self) -> Result<Limit, ParserError> {
        let first = self.parse_expr()?;
        if self.consume_token(&Token::Comma) {
            let second = self.parse_expr()?;
            Ok(Limit {
                limit: second,
                offset: Some(first),
            })
        } else if self.parse_keyword(Keyword::OFFSET) {
            let offset = self.parse_expr()?;
            Ok(Limit {
                limit: first,
                offset: Some(offset),
            })
        } else {
            Ok(Limit {
                limit: first,
                offset: None,
            })
        }
    }

    // ------------------------------------------------------------------
    // FROM

    fn parse_from_expr(&mut self) -> Result<FromExpr, ParserError> {
        let mut left = self.parse_from_factor()?;
        while let Some(op) = self.parse_join_operator()? {
            let right = self.parse_from_factor()?;
            let mut on = None;
            let mut using = Vec::new();
            if self.parse_keyword(Keyword::ON) {
                on = Some(self.parse_expr()?);
            } else if self.parse_keyword(Keyword::USING) {
                self.expect_token(&Token::LParen)?;
                using.push(self.parse_column_identifier()?);
                while self.consume_token(&Token::Comma) {
                    using.push(self.parse_column_identifier()?);
                }
                self.expect_token(&Token::RParen)?;
            }
            if op.natural && (on.is_some() || !using.is_empty()) {
                self.record_error(SemanticError::NaturalJoinWithOnOrUsingClause);
            }
            left = FromExpr::Join(Box::new(JoinExpr {
                left,
                op,
                right,
                on,
                using,
            }));
        }
        Ok(left)
    }

    fn parse_join_operator(&mut self) -> Result<Option<JoinOperator>, ParserError> {
        let natural = self.parse_keyword(Keyword::NATURAL);
        let kind = if self.parse_keyword(Keyword::JOIN) {
            JoinKind::Join
        } else if self.parse_keyword(Keyword::INNER) {
            self.expect_keyword(Keyword::JOIN)?;
            JoinKind::Inner
        } else if self.parse_keyword(Keyword::CROSS) {
            self.expect_keyword(Keyword::JOIN)?;
            JoinKind::Cross
        } else if self.parse_keyword(Keyword::LEFT) {
            let outer = self.parse_keyword(Keyword::OUTER);
            self.expect_keyword(Keyword::JOIN)?;
            if outer {
                JoinKind::LeftOuter
            } else {
                JoinKind::Left
            }
        } else if self.parse_keyword(Keyword::RIGHT) {
            let outer = self.parse_keyword(Keyword::OUTER);
            self.expect_keyword(Keyword::JOIN)?;
            if outer {
                JoinKind::RightOuter
            } else {
                JoinKind::Right
            }
        } else if self.parse_keyword(Keyword::FULL) {
            let outer = self.parse_keyword(Keyword::OUTER);
            self.expect_keyword(Keyword::JOIN)?;
            if outer {
                JoinKind::FullOuter
            } else {
                JoinKind::Full
            }
        } else if natural {
            return self.expected("a join clause after NATURAL");
        } else {
            return Ok(None);
        };
        if natural && kind == JoinKind::Cross {
            return self.expected("a non-cross join after NATURAL");
        }
        Ok(Some(JoinOperator { natural, kind }))
    }

    fn parse_from_factor(&mut self) -> Result<FromExpr, ParserError> {
        if self.consume_token(&Token::LParen) {
            if self.peek_keyword() == Keyword::SELECT {
                let select = self.parse_select()?;
                self.expect_token(&Token::RParen)?;
                let alias = self.parse_optional_alias()?;
                return Ok(FromExpr::Aliased(AliasedFrom {
                    inner: FromItem::Subquery(Box::new(select)),
                    alias,
                }));
            }
            let mut items = vec![self.parse_from_expr()?];
            while self.consume_token(&Token::Comma) {
                items.push(self.parse_from_expr()?);
            }
            self.expect_token(&Token::RParen)?;
            return Ok(FromExpr::Paren(items));
        }
        let table = self.parse_table()?;
        let alias = self.parse_optional_alias()?;
        Ok(FromExpr::Aliased(AliasedFrom {
            inner: FromItem::Table(table),
            alias,
        }))
    }

    // ------------------------------------------------------------------
    // CREATE TABLE

    fn parse_create_table(&mut self) -> Result<CreateTable, ParserError> {
        self.expect_keyword(Keyword::CREATE)?;
        self.expect_keyword(Keyword::TABLE)?;
        let table = self.parse_table()?;
        self.expect_token(&Token::LParen)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            if matches!(
                self.peek_keyword(),
                Keyword::CONSTRAINT | Keyword::PRIMARY | Keyword::UNIQUE | Keyword::CHECK
            ) {
                constraints.push(self.parse_table_constraint()?);
            } else if constraints.is_empty() {
                columns.push(self.parse_column_def()?);
            } else {
                return self.expected("a table constraint");
            }
            if self.consume_token(&Token::Comma) {
                continue;
            }
            self.expect_token(&Token::RParen)?;
            break;
        }

        if columns.len() > MAX_COLUMNS_ALLOWED {
            self.record_error(SemanticError::TooManyColumns {
                count: columns.len(),
            });
        }

        Ok(CreateTable {
            table,
            columns,
            constraints,
            strict: false,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParserError> {
        let name = self.parse_column_identifier()?;
        let column_type = match self.parse_one_of_keywords(&[
            Keyword::INT,
            Keyword::INTEGER,
            Keyword::REAL,
            Keyword::TEXT,
            Keyword::BLOB,
            Keyword::ANY,
        ]) {
            Some(Keyword::INT) => ColumnType::Int,
            Some(Keyword::INTEGER) => ColumnType::Integer,
            Some(Keyword::REAL) => ColumnType::Real,
            Some(Keyword::TEXT) => ColumnType::Text,
            Some(Keyword::BLOB) => ColumnType::Blob,
            Some(Keyword::ANY) => ColumnType::Any,
            _ => return self.expected("a column type"),
        };
        let mut constraints = Vec::new();
        while let Some(constraint) = self.parse_optional_column_constraint()? {
            constraints.push(constraint);
        }
        Ok(ColumnDef {
            name,
            column_type,
            constraints,
        })
    }

    fn parse_optional_column_constraint(
        &mut self,
    ) -> Result<Option<ColumnConstraint>, ParserError> {
        let name = if self.parse_keyword(Keyword::CONSTRAINT) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let constraint = if self.parse_keyword(Keyword::PRIMARY) {
            self.expect_keyword(Keyword::KEY)?;
            let order = if self.parse_keyword(Keyword::ASC) {
                Some(PrimaryKeyOrder::Asc)
            } else if self.parse_keyword(Keyword::DESC) {
                Some(PrimaryKeyOrder::Desc)
            } else {
                None
            };
            ColumnConstraint::PrimaryKey { name, order }
        } else if self.parse_keyword(Keyword::NOT) {
            self.expect_keyword(Keyword::NULL)?;
            ColumnConstraint::NotNull { name }
        } else if self.parse_keyword(Keyword::UNIQUE) {
            ColumnConstraint::Unique { name }
        } else if self.parse_keyword(Keyword::CHECK) {
            self.expect_token(&Token::LParen)?;
            let expr = self.parse_expr()?;
            self.expect_token(&Token::RParen)?;
            ColumnConstraint::Check { name, expr }
        } else if self.parse_keyword(Keyword::DEFAULT) {
            if self.consume_token(&Token::LParen) {
                let expr = self.parse_expr()?;
                self.expect_token(&Token::RParen)?;
                ColumnConstraint::Default {
                    name,
                    expr,
                    parenthesized: true,
                }
            } else {
                let expr = self.parse_literal_value()?;
                ColumnConstraint::Default {
                    name,
                    expr,
                    parenthesized: false,
                }
            }
        } else if self.parse_keyword(Keyword::GENERATED) {
            self.expect_keyword(Keyword::ALWAYS)?;
            self.expect_keyword(Keyword::AS)?;
            let (expr, stored) = self.parse_generated_body()?;
            ColumnConstraint::Generated {
                name,
                expr,
                always: true,
                stored,
            }
        } else if self.parse_keyword(Keyword::AS) {
            let (expr, stored) = self.parse_generated_body()?;
            ColumnConstraint::Generated {
                name,
                expr,
                always: false,
                stored,
            }
        } else if name.is_some() {
            return self.expected("a constraint");
        } else {
            return Ok(None);
        };
        Ok(Some(constraint))
    }

    fn parse_generated_body(&mut self) -> Result<(Expr, bool), ParserError> {
        self.expect_token(&Token::LParen)?;
        let expr = self.parse_expr()?;
        self.expect_token(&Token::RParen)?;
        let stored = if self.parse_keyword(Keyword::STORED) {
            true
        } else {
            self.parse_keyword(Keyword::VIRTUAL);
            false
        };
        Ok((expr, stored))
    }

    /// The unparenthesized DEFAULT accepts literals and signed numbers
    /// only.
    fn parse_literal_value(&mut self) -> Result<Expr, ParserError> {
        let token = self.next_token();
        let value = match &token.token {
            Token::Minus => {
                let number = self.parse_number_literal()?;
                return Ok(match number {
                    Value::Integer(n) => Expr::Value(Value::Integer(format!("-{n}"))),
                    other => Expr::Unary {
                        op: UnaryOperator::Minus,
                        expr: Box::new(Expr::Value(other)),
                    },
                });
            }
            Token::Plus => {
                let number = self.parse_number_literal()?;
                return Ok(Expr::Unary {
                    op: UnaryOperator::Plus,
                    expr: Box::new(Expr::Value(number)),
                });
            }
            Token::Number(n) => Value::Integer(n.clone()),
            Token::Float(n) => Value::Float(n.clone()),
            Token::HexNumber(n) => Value::HexNumber(n.clone()),
            Token::SingleQuotedString(s) => self.make_string_value(s.clone()),
            Token::Blob(b) => self.make_blob_value(b.clone()),
            Token::Word(w) if w.quote_style.is_none() => match w.keyword {
                Keyword::TRUE => Value::Boolean(true),
                Keyword::FALSE => Value::Boolean(false),
                Keyword::NULL => Value::Null,
                _ => return self.expected_at(&token, "a literal value"),
            },
            _ => return self.expected_at(&token, "a literal value"),
        };
        Ok(Expr::Value(value))
    }

    fn parse_number_literal(&mut self) -> Result<Value, ParserError> {
        let token = self.next_token();
        match &token.token {
            Token::Number(n) => Ok(Value::Integer(n.clone())),
            Token::Float(n) => Ok(Value::Float(n.clone())),
            Token::HexNumber(n) => Ok(Value::HexNumber(n.clone())),
            _ => self.expected_at(&token, "a numeric literal"),
        }
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint, ParserError> {
        let name = if self.parse_keyword(Keyword::CONSTRAINT) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        if self.parse_keyword(Keyword::PRIMARY) {
            self.expect_keyword(Keyword::KEY)?;
            let columns = self.parse_parenthesized_column_list()?;
            Ok(TableConstraint::PrimaryKey { name, columns })
        } else if self.parse_keyword(Keyword::UNIQUE) {
            let columns = self.parse_parenthesized_column_list()?;
            Ok(TableConstraint::Unique { name, columns })
        } else if self.parse_keyword(Keyword::CHECK) {
            self.expect_token(&Token::LParen)?;
            let expr = self.parse_expr()?;
            self.expect_token(&Token::RParen)?;
            Ok(TableConstraint::Check { name, expr })
        } else {
            self.expected("PRIMARY KEY, UNIQUE or CHECK")
        }
    }

    fn parse_parenthesized_column_list(&mut self) -> Result<Vec<Ident>, ParserError> {
        self.expect_token(&Token::LParen)?;
        let mut columns = vec![self.parse_column_identifier()?];
        while self.consume_token(&Token::Comma) {
            columns.push(self.parse_column_identifier()?);
        }
        self.expect_token(&Token::RParen)?;
        Ok(columns)
    }

    // ------------------------------------------------------------------
    // DML

    fn parse_insert(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(Keyword::INSERT)?;
        self.expect_keyword(Keyword::INTO)?;
        let table = self.parse_table()?;

        let mut columns = Vec::new();
        let mut rows = Vec::new();
        let mut default_values = false;

        if self.parse_keyword(Keyword::DEFAULT) {
            self.expect_keyword(Keyword::VALUES)?;
            default_values = true;
        } else {
            if self.peek_token() == &Token::LParen {
                columns = self.parse_parenthesized_column_list()?;
            }
            self.expect_keyword(Keyword::VALUES)?;
            loop {
                self.expect_token(&Token::LParen)?;
                let mut row = vec![self.parse_expr()?];
                while self.consume_token(&Token::Comma) {
                    row.push(self.parse_expr()?);
                }
                self.expect_token(&Token::RParen)?;
                rows.push(row);
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
        }

        let statement = Statement::Insert(Insert {
            table,
            columns,
            rows,
            default_values,
            returning: Vec::new(),
        });
        self.check_subquery(&statement, "insert");
        Ok(statement)
    }

    fn parse_update(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(Keyword::UPDATE)?;
        let table = self.parse_table()?;
        self.expect_keyword(Keyword::SET)?;

        let mut assignments = Vec::new();
        loop {
            if self.consume_token(&Token::LParen) {
                // `(a, b) = (1, 2)` desugars into the flat list
                let mut columns = vec![self.parse_column_identifier()?];
                while self.consume_token(&Token::Comma) {
                    columns.push(self.parse_column_identifier()?);
                }
                self.expect_token(&Token::RParen)?;
                self.expect_token(&Token::Eq)?;
                self.expect_token(&Token::LParen)?;
                let mut values = vec![self.parse_expr()?];
                while self.consume_token(&Token::Comma) {
                    values.push(self.parse_expr()?);
                }
                self.expect_token(&Token::RParen)?;
                if columns.len() != values.len() {
                    self.record_error(SemanticError::UpdateColumnsAndValuesDiffer {
                        columns: columns.len(),
                        values: values.len(),
                    });
                } else {
                    for (column, expr) in columns.into_iter().zip(values) {
                        assignments.push(UpdateExpr { column, expr });
                    }
                }
            } else {
                let column = self.parse_column_identifier()?;
                self.expect_token(&Token::Eq)?;
                let expr = self.parse_expr()?;
                assignments.push(UpdateExpr { column, expr });
            }
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }

        let selection = if self.parse_keyword(Keyword::WHERE) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let statement = Statement::Update(Update {
            table,
            assignments,
            selection,
            returning: Vec::new(),
        });
        self.check_subquery(&statement, "update");
        Ok(statement)
    }

    fn parse_delete(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(Keyword::DELETE)?;
        self.expect_keyword(Keyword::FROM)?;
        let table = self.parse_table()?;
        let selection = if self.parse_keyword(Keyword::WHERE) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let statement = Statement::Delete(Delete { table, selection });
        self.check_subquery(&statement, "delete");
        Ok(statement)
    }

    fn check_subquery(&mut self, statement: &Statement, kind: &str) {
        if contains_subquery(statement) {
            self.record_error(SemanticError::StatementContainsSubquery {
                statement_kind: kind.to_string(),
            });
        }
    }

    // ------------------------------------------------------------------
    // ACL

    fn parse_grant(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(Keyword::GRANT)?;
        let privileges = self.parse_privileges()?;
        self.expect_keyword(Keyword::ON)?;
        let table = self.parse_table()?;
        self.expect_keyword(Keyword::TO)?;
        let roles = self.parse_roles()?;
        Ok(Statement::Grant(Grant {
            table,
            privileges,
            roles,
        }))
    }

    fn parse_revoke(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(Keyword::REVOKE)?;
        let privileges = self.parse_privileges()?;
        self.expect_keyword(Keyword::ON)?;
        let table = self.parse_table()?;
        self.expect_keyword(Keyword::FROM)?;
        let roles = self.parse_roles()?;
        Ok(Statement::Revoke(Revoke {
            table,
            privileges,
            roles,
        }))
    }

    fn parse_privileges(&mut self) -> Result<Privileges, ParserError> {
        let mut listed = Vec::new();
        loop {
            let privilege = match self.parse_one_of_keywords(&[
                Keyword::INSERT,
                Keyword::UPDATE,
                Keyword::DELETE,
            ]) {
                Some(Keyword::INSERT) => Privilege::Insert,
                Some(Keyword::UPDATE) => Privilege::Update,
                Some(Keyword::DELETE) => Privilege::Delete,
                _ => return self.expected("a privilege (insert, update or delete)"),
            };
            listed.push(privilege);
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        if listed.len() > MAX_PRIVILEGES_COUNT {
            self.record_error(SemanticError::GrantPrivilegesCountExceeded {
                count: listed.len(),
            });
        }
        let mut privileges = Privileges::new();
        for privilege in listed {
            if !privileges.insert(privilege) {
                self.record_error(SemanticError::GrantRepeatedPrivilege {
                    privilege: privilege.to_string(),
                });
            }
        }
        Ok(privileges)
    }

    fn parse_roles(&mut self) -> Result<Vec<String>, ParserError> {
        let mut roles = Vec::new();
        loop {
            let token = self.next_token();
            match &token.token {
                Token::SingleQuotedString(role) => roles.push(role.clone()),
                _ => return self.expected_at(&token, "a quoted role"),
            }
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(roles)
    }

    // ------------------------------------------------------------------
    // expressions

    /// Parses a full expression at the lowest precedence.
    pub fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.parse_subexpr(0)
    }

    fn parse_subexpr(&mut self, precedence: u8) -> Result<Expr, ParserError> {
        let mut expr = self.parse_prefix()?;
        loop {
            let next_precedence = self.get_next_precedence();
            if next_precedence <= precedence {
                break;
            }
            expr = self.parse_infix(expr)?;
        }
        Ok(expr)
    }

    fn get_next_precedence(&self) -> u8 {
        match self.peek_token() {
            Token::Word(w) if w.quote_style.is_none() => match w.keyword {
                Keyword::OR => OR_PREC,
                Keyword::AND => AND_PREC,
                Keyword::IS
                | Keyword::ISNULL
                | Keyword::NOTNULL
                | Keyword::BETWEEN
                | Keyword::IN
                | Keyword::LIKE
                | Keyword::GLOB
                | Keyword::REGEXP
                | Keyword::MATCH => LIKE_PREC,
                Keyword::NOT => match self.peek_nth_keyword(1) {
                    Keyword::BETWEEN
                    | Keyword::IN
                    | Keyword::LIKE
                    | Keyword::GLOB
                    | Keyword::REGEXP
                    | Keyword::MATCH => LIKE_PREC,
                    _ => 0,
                },
                Keyword::COLLATE => COLLATE_PREC,
                _ => 0,
            },
            Token::Eq | Token::Neq => LIKE_PREC,
            Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => INEQ_PREC,
            Token::Ampersand | Token::Pipe | Token::ShiftLeft | Token::ShiftRight => BIT_PREC,
            Token::Plus | Token::Minus => ADD_PREC,
            Token::Mul | Token::Div | Token::Mod => MUL_PREC,
            Token::StringConcat | Token::Arrow | Token::LongArrow => CONCAT_PREC,
            _ => 0,
        }
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParserError> {
        let token = self.next_token();
        match &token.token {
            Token::Number(n) => Ok(Expr::Value(Value::Integer(n.clone()))),
            Token::Float(n) => Ok(Expr::Value(Value::Float(n.clone()))),
            Token::HexNumber(n) => Ok(Expr::Value(Value::HexNumber(n.clone()))),
            Token::SingleQuotedString(s) => {
                let value = self.make_string_value(s.clone());
                Ok(Expr::Value(value))
            }
            Token::Blob(b) => {
                let value = self.make_blob_value(b.clone());
                Ok(Expr::Value(value))
            }
            Token::Minus => {
                // a minus sign fuses with an integer literal into a
                // single negative literal; anything else stays unary
                self.fuse_minus_literal()
            }
            Token::Plus => Ok(Expr::Unary {
                op: UnaryOperator::Plus,
                expr: Box::new(self.parse_subexpr(UNARY_PREC)?),
            }),
            Token::Tilde => Ok(Expr::Unary {
                op: UnaryOperator::Tilde,
                expr: Box::new(self.parse_subexpr(UNARY_PREC)?),
            }),
            Token::LParen => {
                if self.peek_keyword() == Keyword::SELECT {
                    let select = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    return Ok(Expr::Subquery(Box::new(select)));
                }
                let mut exprs = vec![self.parse_expr()?];
                while self.consume_token(&Token::Comma) {
                    exprs.push(self.parse_expr()?);
                }
                self.expect_token(&Token::RParen)?;
                Ok(Expr::Paren(exprs))
            }
            Token::Word(w) => {
                let w = w.clone();
                self.parse_word_prefix(&token, w)
            }
            _ => self.expected_at(&token, "an expression"),
        }
    }

    fn parse_word_prefix(
        &mut self,
        token: &TokenWithLocation,
        w: Word,
    ) -> Result<Expr, ParserError> {
        if w.quote_style.is_none() {
            match w.keyword {
                Keyword::NULL => return Ok(Expr::Value(Value::Null)),
                Keyword::TRUE => return Ok(Expr::Value(Value::Boolean(true))),
                Keyword::FALSE => return Ok(Expr::Value(Value::Boolean(false))),
                Keyword::CASE => return self.parse_case(),
                Keyword::CAST => return self.parse_cast(),
                Keyword::EXISTS => {
                    self.expect_token(&Token::LParen)?;
                    let select = self.parse_select()?;
                    self.expect_token(&Token::RParen)?;
                    return Ok(Expr::Exists(Box::new(select)));
                }
                Keyword::NOT => {
                    return Ok(Expr::Not(Box::new(self.parse_subexpr(NOT_PREC)?)));
                }
                // `like(x, y)` and `glob(x, y)` are grammar forms of
                // their own, distinct from the infix comparisons
                Keyword::LIKE if self.peek_token() == &Token::LParen => {
                    return self.parse_keyword_function(token, "like", 2..=3);
                }
                Keyword::GLOB if self.peek_token() == &Token::LParen => {
                    return self.parse_keyword_function(token, "glob", 2..=2);
                }
                _ => {}
            }
        }
        let Some(name) = self.make_ident(w) else {
            return self.expected_at(token, "an expression");
        };
        if self.peek_token() == &Token::LParen {
            return self.parse_function(name);
        }
        if self.peek_token() == &Token::Period {
            self.next_token();
            let column_token = self.next_token();
            let column = match &column_token.token {
                Token::Word(cw) => match self.make_ident(cw.clone()) {
                    Some(ident) => ident,
                    None => return self.expected_at(&column_token, "a column name"),
                },
                _ => return self.expected_at(&column_token, "a column name"),
            };
            self.check_column_name_length(&column);
            return Ok(Expr::Column(Column {
                name: column,
                table: Some(Table {
                    name,
                    is_target: false,
                }),
            }));
        }
        self.check_column_name_length(&name);
        Ok(Expr::Column(Column {
            name,
            table: None,
        }))
    }

    fn fuse_minus_literal(&mut self) -> Result<Expr, ParserError> {
        if let Token::Number(n) = self.peek_token() {
            let n = n.clone();
            self.next_token();
            return Ok(Expr::Value(Value::Integer(format!("-{n}"))));
        }
        Ok(Expr::Unary {
            op: UnaryOperator::Minus,
            expr: Box::new(self.parse_subexpr(UNARY_PREC)?),
        })
    }

    fn make_string_value(&mut self, body: String) -> Value {
        if body.len() > MAX_TEXT_LENGTH {
            self.record_error(SemanticError::TextTooLong { length: body.len() });
        }
        Value::String(body)
    }

    fn make_blob_value(&mut self, body: String) -> Value {
        if body.len() > MAX_BLOB_LENGTH {
            self.record_error(SemanticError::BlobTooBig { length: body.len() });
        }
        Value::Blob(body)
    }

    fn parse_case(&mut self) -> Result<Expr, ParserError> {
        let operand = if self.peek_keyword() == Keyword::WHEN {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let mut whens = Vec::new();
        while self.parse_keyword(Keyword::WHEN) {
            let condition = self.parse_expr()?;
            self.expect_keyword(Keyword::THEN)?;
            let result = self.parse_expr()?;
            whens.push(When { condition, result });
        }
        if whens.is_empty() {
            return self.expected("WHEN");
        }
        let else_result = if self.parse_keyword(Keyword::ELSE) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_keyword(Keyword::END)?;
        Ok(Expr::Case {
            operand,
            whens,
            else_result,
        })
    }

    fn parse_cast(&mut self) -> Result<Expr, ParserError> {
        self.expect_token(&Token::LParen)?;
        let expr = self.parse_expr()?;
        self.expect_keyword(Keyword::AS)?;
        let target = match self.parse_one_of_keywords(&[
            Keyword::NONE,
            Keyword::TEXT,
            Keyword::REAL,
            Keyword::INTEGER,
            Keyword::NUMERIC,
        ]) {
            Some(Keyword::NONE) => ConvertType::None,
            Some(Keyword::TEXT) => ConvertType::Text,
            Some(Keyword::REAL) => ConvertType::Real,
            Some(Keyword::INTEGER) => ConvertType::Integer,
            Some(Keyword::NUMERIC) => ConvertType::Numeric,
            _ => return self.expected("a convert type"),
        };
        self.expect_token(&Token::RParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            target,
        })
    }

    fn parse_function(&mut self, name: Ident) -> Result<Expr, ParserError> {
        if !keywords::is_allowed_function(&name.value) {
            self.record_error(SemanticError::NoSuchFunction {
                name: name.value.clone(),
            });
        }
        self.expect_token(&Token::LParen)?;
        let distinct = self.parse_keyword(Keyword::DISTINCT);
        let args = if !distinct && self.consume_token(&Token::Mul) {
            self.expect_token(&Token::RParen)?;
            FunctionArgs::Star
        } else if self.consume_token(&Token::RParen) {
            FunctionArgs::List(Vec::new())
        } else {
            let mut args = vec![self.parse_expr()?];
            while self.consume_token(&Token::Comma) {
                args.push(self.parse_expr()?);
            }
            self.expect_token(&Token::RParen)?;
            FunctionArgs::List(args)
        };
        let filter = if self.parse_keyword(Keyword::FILTER) {
            self.expect_token(&Token::LParen)?;
            self.expect_keyword(Keyword::WHERE)?;
            let expr = self.parse_expr()?;
            self.expect_token(&Token::RParen)?;
            Some(Box::new(expr))
        } else {
            None
        };
        Ok(Expr::Function(FunctionCall {
            name,
            distinct,
            args,
            filter,
        }))
    }

    fn parse_keyword_function(
        &mut self,
        token: &TokenWithLocation,
        name: &str,
        arity: std::ops::RangeInclusive<usize>,
    ) -> Result<Expr, ParserError> {
        let call = self.parse_function(Ident::new(name))?;
        if let Expr::Function(FunctionCall {
            args: FunctionArgs::List(args),
            ..
        }) = &call
        {
            if !arity.contains(&args.len()) {
                return self.expected_at(
                    token,
                    &format!("{name} to take {} to {} arguments", arity.start(), arity.end()),
                );
            }
        } else {
            return self.expected_at(token, &format!("{name} to take an argument list"));
        }
        Ok(call)
    }

    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ParserError> {
        let token = self.next_token();
        let left = Box::new(left);
        match &token.token {
            Token::Word(w) if w.quote_style.is_none() => match w.keyword {
                Keyword::OR => Ok(Expr::Or {
                    left,
                    right: Box::new(self.parse_subexpr(OR_PREC)?),
                }),
                Keyword::AND => Ok(Expr::And {
                    left,
                    right: Box::new(self.parse_subexpr(AND_PREC)?),
                }),
                Keyword::COLLATE => Ok(Expr::Collate {
                    expr: left,
                    collation: self.parse_identifier()?,
                }),
                Keyword::IS => {
                    if self.parse_keyword(Keyword::NOT) {
                        Ok(Expr::IsNot {
                            left,
                            right: Box::new(self.parse_subexpr(LIKE_PREC)?),
                        })
                    } else {
                        Ok(Expr::Is {
                            left,
                            right: Box::new(self.parse_subexpr(LIKE_PREC)?),
                        })
                    }
                }
                Keyword::ISNULL => Ok(Expr::IsNull(left)),
                Keyword::NOTNULL => Ok(Expr::NotNull(left)),
                Keyword::BETWEEN => self.parse_between(left, false),
                Keyword::IN => self.parse_in(left, false),
                Keyword::LIKE => self.parse_like_class(left, CompareOperator::Like),
                Keyword::GLOB => self.parse_like_class(left, CompareOperator::Glob),
                Keyword::REGEXP => self.parse_like_class(left, CompareOperator::Regexp),
                Keyword::MATCH => self.parse_like_class(left, CompareOperator::Match),
                Keyword::NOT => {
                    if self.parse_keyword(Keyword::BETWEEN) {
                        self.parse_between(left, true)
                    } else if self.parse_keyword(Keyword::IN) {
                        self.parse_in(left, true)
                    } else if self.parse_keyword(Keyword::LIKE) {
                        self.parse_like_class(left, CompareOperator::NotLike)
                    } else if self.parse_keyword(Keyword::GLOB) {
                        self.parse_like_class(left, CompareOperator::NotGlob)
                    } else if self.parse_keyword(Keyword::REGEXP) {
                        self.parse_like_class(left, CompareOperator::NotRegexp)
                    } else if self.parse_keyword(Keyword::MATCH) {
                        self.parse_like_class(left, CompareOperator::NotMatch)
                    } else {
                        self.expected("BETWEEN, IN, LIKE, GLOB, REGEXP or MATCH")
                    }
                }
                _ => self.expected_at(&token, "an operator"),
            },
            Token::Eq => self.parse_comparison(left, CompareOperator::Eq, LIKE_PREC),
            Token::Neq => self.parse_comparison(left, CompareOperator::Neq, LIKE_PREC),
            Token::Lt => self.parse_comparison(left, CompareOperator::Lt, INEQ_PREC),
            Token::Gt => self.parse_comparison(left, CompareOperator::Gt, INEQ_PREC),
            Token::LtEq => self.parse_comparison(left, CompareOperator::LtEq, INEQ_PREC),
            Token::GtEq => self.parse_comparison(left, CompareOperator::GtEq, INEQ_PREC),
            Token::Ampersand => self.parse_binary(left, BinaryOperator::BitAnd, BIT_PREC),
            Token::Pipe => self.parse_binary(left, BinaryOperator::BitOr, BIT_PREC),
            Token::ShiftLeft => self.parse_binary(left, BinaryOperator::ShiftLeft, BIT_PREC),
            Token::ShiftRight => self.parse_binary(left, BinaryOperator::ShiftRight, BIT_PREC),
            Token::Plus => self.parse_binary(left, BinaryOperator::Plus, ADD_PREC),
            Token::Minus => self.parse_binary(left, BinaryOperator::Minus, ADD_PREC),
            Token::Mul => self.parse_binary(left, BinaryOperator::Multiply, MUL_PREC),
            Token::Div => self.parse_binary(left, BinaryOperator::Divide, MUL_PREC),
            Token::Mod => self.parse_binary(left, BinaryOperator::Modulo, MUL_PREC),
            Token::StringConcat => {
                self.parse_binary(left, BinaryOperator::StringConcat, CONCAT_PREC)
            }
            Token::Arrow => self.parse_binary(left, BinaryOperator::Arrow, CONCAT_PREC),
            Token::LongArrow => self.parse_binary(left, BinaryOperator::LongArrow, CONCAT_PREC),
            _ => self.expected_at(&token, "an operator"),
        }
    }

    fn parse_comparison(
        &mut self,
        left: Box<Expr>,
        op: CompareOperator,
        precedence: u8,
    ) -> Result<Expr, ParserError> {
        Ok(Expr::Compare {
            left,
            op,
            right: Box::new(self.parse_subexpr(precedence)?),
            escape: None,
        })
    }

    fn parse_binary(
        &mut self,
        left: Box<Expr>,
        op: BinaryOperator,
        precedence: u8,
    ) -> Result<Expr, ParserError> {
        Ok(Expr::Binary {
            left,
            op,
            right: Box::new(self.parse_subexpr(precedence)?),
        })
    }

    fn parse_like_class(
        &mut self,
        left: Box<Expr>,
        op: CompareOperator,
    ) -> Result<Expr, ParserError> {
        let pattern = self.parse_subexpr(LIKE_PREC)?;
        let escape = if self.parse_keyword(Keyword::ESCAPE) {
            Some(Box::new(self.parse_subexpr(ESCAPE_PREC)?))
        } else {
            None
        };
        Ok(Expr::Compare {
            left,
            op,
            right: Box::new(pattern),
            escape,
        })
    }

    /// BETWEEN binds its operands tighter than the joining AND, so
    /// `a between b and c and d` parses as `(a between b and c) and d`.
    fn parse_between(&mut self, left: Box<Expr>, negated: bool) -> Result<Expr, ParserError> {
        let low = self.parse_subexpr(LIKE_PREC)?;
        self.expect_keyword(Keyword::AND)?;
        let high = self.parse_subexpr(LIKE_PREC)?;
        Ok(Expr::Between {
            expr: left,
            negated,
            low: Box::new(low),
            high: Box::new(high),
        })
    }

    fn parse_in(&mut self, left: Box<Expr>, negated: bool) -> Result<Expr, ParserError> {
        self.expect_token(&Token::LParen)?;
        let right = if self.peek_keyword() == Keyword::SELECT {
            let select = self.parse_select()?;
            self.expect_token(&Token::RParen)?;
            Expr::Subquery(Box::new(select))
        } else if self.consume_token(&Token::RParen) {
            Expr::Paren(Vec::new())
        } else {
            let mut exprs = vec![self.parse_expr()?];
            while self.consume_token(&Token::Comma) {
                exprs.push(self.parse_expr()?);
            }
            self.expect_token(&Token::RParen)?;
            Expr::Paren(exprs)
        };
        Ok(Expr::Compare {
            left,
            op: if negated {
                CompareOperator::NotIn
            } else {
                CompareOperator::In
            },
            right: Box::new(right),
            escape: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(sql: &str) -> Ast {
        let ast = Parser::parse_sql(sql).unwrap();
        assert!(
            ast.errors.is_empty(),
            "unexpected semantic errors for {sql}: {:?}",
            ast.errors
        );
        ast
    }

    fn canonical(sql: &str) -> String {
        parse_ok(sql).to_canonical_sql()
    }

    fn selection(sql: &str) -> Expr {
        match parse_ok(sql).statements.remove(0) {
            Statement::Select(select) => select.selection.unwrap(),
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(
            selection("select * from t where a or b and c"),
            Expr::Or {
                left: Box::new(Expr::Column(Column::new("a"))),
                right: Box::new(Expr::And {
                    left: Box::new(Expr::Column(Column::new("b"))),
                    right: Box::new(Expr::Column(Column::new("c"))),
                }),
            }
        );
    }

    #[test]
    fn between_binds_tighter_than_and() {
        let expr = selection("select * from t where a between b and c and d");
        match expr {
            Expr::And { left, right } => {
                assert!(matches!(*left, Expr::Between { .. }));
                assert_eq!(*right, Expr::Column(Column::new("d")));
            }
            other => panic!("expected and at the top, got {other:?}"),
        }
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        let expr = selection("select * from t where not a=b");
        match expr {
            Expr::Not(inner) => assert!(matches!(*inner, Expr::Compare { .. })),
            other => panic!("expected not at the top, got {other:?}"),
        }
    }

    #[test]
    fn is_not_is_a_distinct_production() {
        assert!(matches!(
            selection("select * from t where a is not null"),
            Expr::IsNot { .. }
        ));
        assert!(matches!(
            selection("select * from t where a is null"),
            Expr::Is { .. }
        ));
    }

    #[test]
    fn unary_minus_fuses_with_integers_only() {
        assert_eq!(
            selection("select * from t where -12"),
            Expr::Value(Value::Integer("-12".to_string()))
        );
        assert!(matches!(
            selection("select * from t where -a"),
            Expr::Unary {
                op: UnaryOperator::Minus,
                ..
            }
        ));
        assert!(matches!(
            selection("select * from t where +12"),
            Expr::Unary {
                op: UnaryOperator::Plus,
                ..
            }
        ));
    }

    #[test]
    fn limit_comma_form_is_rewritten() {
        let a = parse_ok("select * from t limit 1, 2");
        let b = parse_ok("select * from t limit 2 offset 1");
        assert_eq!(a, b);
        assert_eq!(a.to_canonical_sql(), "select * from t limit 2 offset 1");
    }

    #[test]
    fn joins_nest_left_associative() {
        let ast = parse_ok("select * from t1 join t2 on a=b join t3 on c=d");
        let Statement::Select(select) = &ast.statements[0] else {
            panic!("expected select");
        };
        let FromExpr::Join(outer) = &select.from[0] else {
            panic!("expected join");
        };
        assert!(matches!(&outer.left, FromExpr::Join(_)));
        assert!(matches!(&outer.right, FromExpr::Aliased(_)));
    }

    #[test]
    fn natural_join_with_on_is_a_semantic_error() {
        let ast = Parser::parse_sql("select * from t1 natural join t2 on a=b").unwrap();
        assert_eq!(
            ast.errors[&0],
            vec![SemanticError::NaturalJoinWithOnOrUsingClause]
        );
    }

    #[test]
    fn escape_attaches_to_the_comparison() {
        let expr = selection("select * from t where a like 'x%' escape '\\'");
        match expr {
            Expr::Compare {
                op: CompareOperator::Like,
                escape: Some(escape),
                ..
            } => assert_eq!(*escape, Expr::Value(Value::String("\\".to_string()))),
            other => panic!("expected like with escape, got {other:?}"),
        }
    }

    #[test]
    fn like_function_form_enforces_arity() {
        parse_ok("select like('a%', b) from t");
        parse_ok("select like('a%', b, '\\') from t");
        assert!(Parser::parse_sql("select like('a%') from t").is_err());
        assert!(Parser::parse_sql("select like(a, b, c, d) from t").is_err());
    }

    #[test]
    fn function_star_and_distinct_and_filter() {
        assert_eq!(
            canonical("select count(*), count(distinct a), sum(b) filter (where b>0) from t"),
            "select count(*), count(distinct a), sum(b) filter (where b>0) from t"
        );
    }

    #[test]
    fn unknown_function_is_a_semantic_error() {
        let ast = Parser::parse_sql("select datetime('now') from t").unwrap();
        assert_eq!(
            ast.errors[&0],
            vec![SemanticError::NoSuchFunction {
                name: "datetime".to_string()
            }]
        );
    }

    #[test]
    fn update_paren_form_desugars() {
        let ast = parse_ok("update t set (a, b) = (1, 2)");
        assert_eq!(
            ast.to_canonical_sql(),
            "update t set a = 1, b = 2"
        );
    }

    #[test]
    fn update_paren_mismatch_leaves_empty_list() {
        let ast = Parser::parse_sql("update t set (a, b) = (1, 2, 3)").unwrap();
        assert_eq!(
            ast.errors[&0],
            vec![SemanticError::UpdateColumnsAndValuesDiffer {
                columns: 2,
                values: 3
            }]
        );
        let Statement::Update(update) = &ast.statements[0] else {
            panic!("expected update");
        };
        assert!(update.assignments.is_empty());
    }

    #[test]
    fn compound_selects_surface_as_semantic_errors() {
        let ast = Parser::parse_sql("select a from t union select b from u").unwrap();
        assert_eq!(ast.errors[&0], vec![SemanticError::CompoundSelectNotAllowed]);
        // only the left-hand select survives
        assert_eq!(ast.to_canonical_sql(), "select a from t");
    }

    #[test]
    fn select_cannot_mix_with_writes() {
        let err = Parser::parse_sql("select * from t;insert into t values (1)").unwrap_err();
        assert_eq!(err.offset, 16);
        assert_eq!(err.near, "insert");

        let err = Parser::parse_sql("insert into t values (1); select * from t").unwrap_err();
        assert_eq!(err.near, "select");
    }

    #[test]
    fn writes_chain_with_semicolons() {
        let ast = parse_ok("insert into t values (1); delete from t; update t set a = 1;");
        assert_eq!(ast.statements.len(), 3);
    }

    #[test]
    fn returning_has_no_production() {
        assert!(Parser::parse_sql("insert into t values (1) returning a").is_err());
    }

    #[test]
    fn empty_input_is_a_syntax_error() {
        let err = Parser::parse_sql("").unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn error_offsets_point_at_the_offending_token() {
        let err = Parser::parse_sql("select * from t where ^").unwrap_err();
        assert_eq!(err.offset, 22);
    }

    #[test]
    fn case_forms() {
        assert_eq!(
            canonical("select case a when 1 then 'x' else 'y' end from t"),
            "select case a when 1 then 'x' else 'y' end from t"
        );
        assert_eq!(
            canonical("select case when a=1 then 'x' end from t"),
            "select case when a=1 then 'x' end from t"
        );
    }

    #[test]
    fn collate_and_cast() {
        assert_eq!(
            canonical("select cast(a as text) from t where b collate nocase = 'x'"),
            "select cast(a as text) from t where b collate nocase='x'"
        );
    }
}
