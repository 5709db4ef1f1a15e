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

//! SQL Abstract Syntax Tree (AST) types.
//!
//! Every node implements [`fmt::Display`], producing the canonical SQL
//! form: keywords and operators lowercased, except CREATE TABLE statements
//! which print uppercase so that their column/constraint text is stable
//! for structural hashing. Canonical text is a fixed point under
//! re-parsing.

use core::fmt;
use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use sha2::{Digest, Sha256};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod visit;

pub use visit::{get_unique_table_references, update_table_names, walk, Node};

/// Maximum byte length of a string literal, surrounding quotes stripped.
pub const MAX_TEXT_LENGTH: usize = 1024;
/// Maximum number of hex digits in a blob literal.
pub const MAX_BLOB_LENGTH: usize = 1024;
/// Maximum byte length of a column identifier.
pub const MAX_COLUMN_NAME_LENGTH: usize = 64;
/// Maximum number of columns in a CREATE TABLE.
pub const MAX_COLUMNS_ALLOWED: usize = 24;
/// Maximum number of distinct privileges in a GRANT or REVOKE.
pub const MAX_PRIVILEGES_COUNT: usize = 3;

struct DisplaySeparated<'a, T>
where
    T: fmt::Display,
{
    slice: &'a [T],
    sep: &'static str,
}

impl<'a, T> fmt::Display for DisplaySeparated<'a, T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut delim = "";
        for t in self.slice {
            write!(f, "{delim}")?;
            delim = self.sep;
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

fn display_separated<'a, T>(slice: &'a [T], sep: &'static str) -> DisplaySeparated<'a, T>
where
    T: fmt::Display,
{
    DisplaySeparated { slice, sep }
}

fn display_comma_separated<T>(slice: &[T]) -> DisplaySeparated<'_, T>
where
    T: fmt::Display,
{
    DisplaySeparated { slice, sep: ", " }
}

/// An identifier, decomposed into its value and the enclosure style.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ident {
    /// The value of the identifier without enclosure characters.
    pub value: String,
    /// The starting enclosure if any. Valid enclosure characters are the
    /// double quote, backtick, and opening square bracket.
    pub quote_style: Option<char>,
}

impl Ident {
    /// Create a new identifier with the given value and no enclosure.
    pub fn new<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Ident {
            value: value.into(),
            quote_style: None,
        }
    }

    /// Create a new enclosed identifier with the given enclosure and value.
    /// This function panics if the given character is not a valid enclosure.
    pub fn with_quote<S>(quote: char, value: S) -> Self
    where
        S: Into<String>,
    {
        assert!(quote == '"' || quote == '`' || quote == '[');
        Ident {
            value: value.into(),
            quote_style: Some(quote),
        }
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        Ident::new(value)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.quote_style {
            Some('[') => write!(f, "[{}]", self.value),
            Some(q) => write!(f, "{q}{}{q}", self.value),
            None => f.write_str(&self.value),
        }
    }
}

/// The result of parsing a program: the statements in source order, plus
/// the semantic errors collected while reducing each statement, keyed by
/// statement index. A clean parse has an empty error map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ast {
    pub statements: Vec<Statement>,
    pub errors: BTreeMap<usize, Vec<SemanticError>>,
}

impl Ast {
    /// The canonical SQL text for the whole program.
    pub fn to_canonical_sql(&self) -> String {
        self.to_string()
    }

    /// Whether any statement carries semantic errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Classifies the program. A program mixing acl and write statements
    /// classifies as write; otherwise the first statement decides.
    pub fn kind(&self) -> Option<StatementKind> {
        let first = self.statements.first()?.kind();
        let kinds: HashSet<StatementKind> =
            self.statements.iter().map(Statement::kind).collect();
        if kinds.contains(&StatementKind::Acl) && kinds.contains(&StatementKind::Write) {
            return Some(StatementKind::Write);
        }
        Some(first)
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", display_separated(&self.statements, "; "))
    }
}

/// The coarse class of a statement, as surfaced to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatementKind {
    Read,
    Write,
    Create,
    Acl,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Read => "read",
            StatementKind::Write => "write",
            StatementKind::Create => "create",
            StatementKind::Acl => "acl",
        })
    }
}

/// A single SQL statement of any kind accepted by the dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Statement {
    Select(Select),
    CreateTable(CreateTable),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Grant(Grant),
    Revoke(Revoke),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Read,
            Statement::CreateTable(_) => StatementKind::Create,
            Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_) => {
                StatementKind::Write
            }
            Statement::Grant(_) | Statement::Revoke(_) => StatementKind::Acl,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Select(s) => write!(f, "{s}"),
            Statement::CreateTable(s) => write!(f, "{s}"),
            Statement::Insert(s) => write!(f, "{s}"),
            Statement::Update(s) => write!(f, "{s}"),
            Statement::Delete(s) => write!(f, "{s}"),
            Statement::Grant(s) => write!(f, "{s}"),
            Statement::Revoke(s) => write!(f, "{s}"),
        }
    }
}

/// A table reference. `is_target` marks tables a statement reads or
/// writes (FROM items and DML/ACL/CREATE targets), as opposed to the
/// table part of a qualified column, which is only a copy of the name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Table {
    pub name: Ident,
    pub is_target: bool,
}

impl Table {
    /// A non-target reference, e.g. the qualifier in `t.col`.
    pub fn new<S>(name: S) -> Self
    where
        S: Into<Ident>,
    {
        Table {
            name: name.into(),
            is_target: false,
        }
    }

    /// A target reference, e.g. a FROM item or a DML target.
    pub fn target<S>(name: S) -> Self
    where
        S: Into<Ident>,
    {
        Table {
            name: name.into(),
            is_target: true,
        }
    }

    pub fn set_is_target(&mut self, is_target: bool) {
        self.is_target = is_target;
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table::new(name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A column reference, optionally qualified with a table name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Column {
    pub name: Ident,
    pub table: Option<Table>,
}

impl Column {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<Ident>,
    {
        Column {
            name: name.into(),
            table: None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{table}.")?;
        }
        write!(f, "{}", self.name)
    }
}

/// SELECT
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Select {
    pub distinct: Option<Distinct>,
    pub columns: Vec<SelectColumn>,
    pub from: Vec<FromExpr>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderingTerm>,
    pub limit: Option<Limit>,
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "select")?;
        if let Some(distinct) = &self.distinct {
            write!(f, " {distinct}")?;
        }
        write!(f, " {}", display_comma_separated(&self.columns))?;
        if !self.from.is_empty() {
            write!(f, " from {}", display_comma_separated(&self.from))?;
        }
        if let Some(selection) = &self.selection {
            write!(f, " where {selection}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, " group by {}", display_comma_separated(&self.group_by))?;
        }
        if let Some(having) = &self.having {
            write!(f, " having {having}")?;
        }
        if !self.order_by.is_empty() {
            write!(f, " order by {}", display_comma_separated(&self.order_by))?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " {limit}")?;
        }
        Ok(())
    }
}

/// The `DISTINCT`/`ALL` quantifier of a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Distinct {
    Distinct,
    All,
}

impl fmt::Display for Distinct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Distinct::Distinct => "distinct",
            Distinct::All => "all",
        })
    }
}

/// One projected column of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectColumn {
    /// `*` or `table.*`
    Star { table: Option<Table> },
    /// An expression with an optional alias.
    Aliased { expr: Expr, alias: Option<Ident> },
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SelectColumn::Star { table: Some(table) } => write!(f, "{table}.*"),
            SelectColumn::Star { table: None } => f.write_str("*"),
            SelectColumn::Aliased { expr, alias } => {
                write!(f, "{expr}")?;
                if let Some(alias) = alias {
                    write!(f, " as {alias}")?;
                }
                Ok(())
            }
        }
    }
}

/// One item of a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FromExpr {
    Aliased(AliasedFrom),
    /// A parenthesized list of from-items.
    Paren(Vec<FromExpr>),
    Join(Box<JoinExpr>),
}

impl fmt::Display for FromExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FromExpr::Aliased(aliased) => write!(f, "{aliased}"),
            FromExpr::Paren(items) => write!(f, "({})", display_comma_separated(items)),
            FromExpr::Join(join) => write!(f, "{join}"),
        }
    }
}

/// A table or subquery with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AliasedFrom {
    pub inner: FromItem,
    pub alias: Option<Ident>,
}

impl fmt::Display for AliasedFrom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.inner)?;
        if let Some(alias) = &self.alias {
            write!(f, " as {alias}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FromItem {
    Table(Table),
    Subquery(Box<Select>),
}

impl fmt::Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FromItem::Table(table) => write!(f, "{table}"),
            FromItem::Subquery(select) => write!(f, "({select})"),
        }
    }
}

/// A join between two from-items. Joins are left-associative, so
/// `t1 join t2 join t3` nests as `(t1 join t2) join t3`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JoinExpr {
    pub left: FromExpr,
    pub op: JoinOperator,
    pub right: FromExpr,
    pub on: Option<Expr>,
    pub using: Vec<Ident>,
}

impl fmt::Display for JoinExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)?;
        if let Some(on) = &self.on {
            write!(f, " on {on}")?;
        }
        if !self.using.is_empty() {
            write!(f, " using ({})", display_comma_separated(&self.using))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JoinOperator {
    pub natural: bool,
    pub kind: JoinKind,
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.natural {
            f.write_str("natural ")?;
        }
        write!(f, "{}", self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JoinKind {
    Join,
    Inner,
    Cross,
    Left,
    LeftOuter,
    Right,
    RightOuter,
    Full,
    FullOuter,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            JoinKind::Join => "join",
            JoinKind::Inner => "inner join",
            JoinKind::Cross => "cross join",
            JoinKind::Left => "left join",
            JoinKind::LeftOuter => "left outer join",
            JoinKind::Right => "right join",
            JoinKind::RightOuter => "right outer join",
            JoinKind::Full => "full join",
            JoinKind::FullOuter => "full outer join",
        })
    }
}

/// One `expr [asc|desc]` term of an ORDER BY.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderingTerm {
    pub expr: Expr,
    pub direction: Option<OrderDirection>,
}

impl fmt::Display for OrderingTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(direction) = &self.direction {
            write!(f, " {direction}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        })
    }
}

/// LIMIT with an optional OFFSET. `limit a, b` source text is rewritten
/// to `limit b offset a` during parsing; only this form is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Limit {
    pub limit: Expr,
    pub offset: Option<Expr>,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "limit {}", self.limit)?;
        if let Some(offset) = &self.offset {
            write!(f, " offset {offset}")?;
        }
        Ok(())
    }
}

/// An SQL expression of any type.
///
/// The parser does not distinguish between expressions of different
/// types, so the caller must handle expressions of inappropriate type,
/// like `where 1`, as necessary.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Expr {
    /// A literal value
    Value(Value),
    /// A column reference, possibly qualified
    Column(Column),
    /// Unary `+`, `-` or `~`
    Unary { op: UnaryOperator, expr: Box<Expr> },
    /// Arithmetic, bitwise, concatenation and JSON-extraction operators
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// Comparison operators, with an optional ESCAPE for the LIKE class
    Compare {
        left: Box<Expr>,
        op: CompareOperator,
        right: Box<Expr>,
        escape: Option<Box<Expr>>,
    },
    /// Logical AND
    And { left: Box<Expr>, right: Box<Expr> },
    /// Logical OR
    Or { left: Box<Expr>, right: Box<Expr> },
    /// Logical NOT
    Not(Box<Expr>),
    /// `IS` operator
    Is { left: Box<Expr>, right: Box<Expr> },
    /// `IS NOT` operator
    IsNot { left: Box<Expr>, right: Box<Expr> },
    /// Postfix `ISNULL`
    IsNull(Box<Expr>),
    /// Postfix `NOTNULL`
    NotNull(Box<Expr>),
    /// `<expr> [NOT] BETWEEN <low> AND <high>`
    Between {
        expr: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    /// `<expr> COLLATE <collation>`
    Collate { expr: Box<Expr>, collation: Ident },
    /// `CAST(<expr> AS <type>)`
    Cast { expr: Box<Expr>, target: ConvertType },
    /// `CASE [<operand>] WHEN .. THEN .. [ELSE ..] END`
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<When>,
        else_result: Option<Box<Expr>>,
    },
    /// A parenthesized expression list
    Paren(Vec<Expr>),
    /// A parenthesized subquery used as an expression
    Subquery(Box<Select>),
    /// `EXISTS (<select>)`
    Exists(Box<Select>),
    /// A function call
    Function(FunctionCall),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Value(value) => write!(f, "{value}"),
            Expr::Column(column) => write!(f, "{column}"),
            Expr::Unary { op, expr } => write!(f, "{op}{expr}"),
            Expr::Binary { left, op, right } => write!(f, "{left}{op}{right}"),
            Expr::Compare {
                left,
                op,
                right,
                escape,
            } => {
                if op.is_symbol() {
                    write!(f, "{left}{op}{right}")?;
                } else {
                    write!(f, "{left} {op} {right}")?;
                }
                if let Some(escape) = escape {
                    write!(f, " escape {escape}")?;
                }
                Ok(())
            }
            Expr::And { left, right } => write!(f, "{left} and {right}"),
            Expr::Or { left, right } => write!(f, "{left} or {right}"),
            Expr::Not(expr) => write!(f, "not {expr}"),
            Expr::Is { left, right } => write!(f, "{left} is {right}"),
            Expr::IsNot { left, right } => write!(f, "{left} is not {right}"),
            Expr::IsNull(expr) => write!(f, "{expr} isnull"),
            Expr::NotNull(expr) => write!(f, "{expr} notnull"),
            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let not = if *negated { " not" } else { "" };
                write!(f, "{expr}{not} between {low} and {high}")
            }
            Expr::Collate { expr, collation } => write!(f, "{expr} collate {collation}"),
            Expr::Cast { expr, target } => write!(f, "cast({expr} as {target})"),
            Expr::Case {
                operand,
                whens,
                else_result,
            } => {
                write!(f, "case")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for when in whens {
                    write!(f, " {when}")?;
                }
                if let Some(else_result) = else_result {
                    write!(f, " else {else_result}")?;
                }
                write!(f, " end")
            }
            Expr::Paren(exprs) => write!(f, "({})", display_comma_separated(exprs)),
            Expr::Subquery(select) => write!(f, "({select})"),
            Expr::Exists(select) => write!(f, "exists ({select})"),
            Expr::Function(call) => write!(f, "{call}"),
        }
    }
}

/// One `WHEN <condition> THEN <result>` branch of a CASE.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct When {
    pub condition: Expr,
    pub result: Expr,
}

impl fmt::Display for When {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "when {} then {}", self.condition, self.result)
    }
}

/// A literal value. Numeric literals keep their source lexeme so the
/// printer is byte-faithful.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// A single-quoted string; the body keeps `''` escapes raw.
    String(String),
    /// An integer literal, possibly negative after unary-minus fusing.
    Integer(String),
    /// A floating point literal.
    Float(String),
    /// A `0x`-prefixed integer literal, prefix stripped.
    HexNumber(String),
    /// A blob literal; the hex digits only.
    Blob(String),
    Boolean(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "'{s}'"),
            Value::Integer(n) => f.write_str(n),
            Value::Float(n) => f.write_str(n),
            Value::HexNumber(n) => write!(f, "0x{n}"),
            Value::Blob(b) => write!(f, "x'{b}'"),
            Value::Boolean(true) => f.write_str("true"),
            Value::Boolean(false) => f.write_str("false"),
            Value::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOperator {
    Plus,
    Minus,
    Tilde,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Tilde => "~",
        })
    }
}

/// Binary operators that print without surrounding spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    ShiftLeft,
    ShiftRight,
    StringConcat,
    /// JSON extract `->`
    Arrow,
    /// JSON extract-and-unquote `->>`
    LongArrow,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::StringConcat => "||",
            BinaryOperator::Arrow => "->",
            BinaryOperator::LongArrow => "->>",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompareOperator {
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Like,
    NotLike,
    Glob,
    NotGlob,
    Regexp,
    NotRegexp,
    Match,
    NotMatch,
    In,
    NotIn,
}

impl CompareOperator {
    /// Symbol operators print without surrounding spaces; word operators
    /// are spaced.
    pub fn is_symbol(&self) -> bool {
        matches!(
            self,
            CompareOperator::Eq
                | CompareOperator::Neq
                | CompareOperator::Lt
                | CompareOperator::Gt
                | CompareOperator::LtEq
                | CompareOperator::GtEq
        )
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CompareOperator::Eq => "=",
            CompareOperator::Neq => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::Gt => ">",
            CompareOperator::LtEq => "<=",
            CompareOperator::GtEq => ">=",
            CompareOperator::Like => "like",
            CompareOperator::NotLike => "not like",
            CompareOperator::Glob => "glob",
            CompareOperator::NotGlob => "not glob",
            CompareOperator::Regexp => "regexp",
            CompareOperator::NotRegexp => "not regexp",
            CompareOperator::Match => "match",
            CompareOperator::NotMatch => "not match",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "not in",
        })
    }
}

/// The target of a CAST; the affinities this dialect can convert to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConvertType {
    None,
    Text,
    Real,
    Integer,
    Numeric,
}

impl fmt::Display for ConvertType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ConvertType::None => "none",
            ConvertType::Text => "text",
            ConvertType::Real => "real",
            ConvertType::Integer => "integer",
            ConvertType::Numeric => "numeric",
        })
    }
}

/// A function call. `f(*)` carries [`FunctionArgs::Star`] and no
/// argument expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionCall {
    pub name: Ident,
    pub distinct: bool,
    pub args: FunctionArgs,
    pub filter: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FunctionArgs {
    Star,
    List(Vec<Expr>),
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if self.distinct {
            f.write_str("distinct ")?;
        }
        match &self.args {
            FunctionArgs::Star => f.write_str("*")?,
            FunctionArgs::List(args) => write!(f, "{}", display_comma_separated(args))?,
        }
        f.write_str(")")?;
        if let Some(filter) = &self.filter {
            write!(f, " filter (where {filter})")?;
        }
        Ok(())
    }
}

/// CREATE TABLE. The `strict` flag is set out-of-band by the host; the
/// grammar does not parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CreateTable {
    pub table: Table,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub strict: bool,
}

impl CreateTable {
    /// Fingerprints the table shape: the lowercase hex SHA-256 of the
    /// comma-joined `name:TYPE` column pairs in declaration order. The
    /// table name and all constraints are excluded, so renamed tables
    /// with the same columns hash identically.
    pub fn structure_hash(&self) -> String {
        let structure = self
            .columns
            .iter()
            .map(|c| format!("{}:{}", c.name.value, c.column_type))
            .join(",");
        hex::encode(Sha256::digest(structure.as_bytes()))
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CREATE TABLE {} (", self.table)?;
        write!(f, "{}", display_comma_separated(&self.columns))?;
        if !self.constraints.is_empty() {
            write!(f, ", {}", display_comma_separated(&self.constraints))?;
        }
        f.write_str(")")?;
        if self.strict {
            f.write_str(" STRICT")?;
        }
        Ok(())
    }
}

/// One column definition of a CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColumnDef {
    pub name: Ident,
    pub column_type: ColumnType,
    pub constraints: Vec<ColumnConstraint>,
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)?;
        for constraint in &self.constraints {
            write!(f, " {constraint}")?;
        }
        Ok(())
    }
}

/// The storage types a column may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColumnType {
    Int,
    Integer,
    Real,
    Text,
    Blob,
    Any,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Int => "INT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
            ColumnType::Any => "ANY",
        })
    }
}

fn write_constraint_name(f: &mut fmt::Formatter, name: &Option<Ident>) -> fmt::Result {
    if let Some(name) = name {
        write!(f, "CONSTRAINT {name} ")?;
    }
    Ok(())
}

/// A constraint attached to a single column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ColumnConstraint {
    PrimaryKey {
        name: Option<Ident>,
        order: Option<PrimaryKeyOrder>,
    },
    NotNull {
        name: Option<Ident>,
    },
    Unique {
        name: Option<Ident>,
    },
    Check {
        name: Option<Ident>,
        expr: Expr,
    },
    Default {
        name: Option<Ident>,
        expr: Expr,
        parenthesized: bool,
    },
    Generated {
        name: Option<Ident>,
        expr: Expr,
        /// Whether the `GENERATED ALWAYS` prefix was written.
        always: bool,
        stored: bool,
    },
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ColumnConstraint::PrimaryKey { name, order } => {
                write_constraint_name(f, name)?;
                f.write_str("PRIMARY KEY")?;
                if let Some(order) = order {
                    write!(f, " {order}")?;
                }
                Ok(())
            }
            ColumnConstraint::NotNull { name } => {
                write_constraint_name(f, name)?;
                f.write_str("NOT NULL")
            }
            ColumnConstraint::Unique { name } => {
                write_constraint_name(f, name)?;
                f.write_str("UNIQUE")
            }
            ColumnConstraint::Check { name, expr } => {
                write_constraint_name(f, name)?;
                write!(f, "CHECK({expr})")
            }
            ColumnConstraint::Default {
                name,
                expr,
                parenthesized,
            } => {
                write_constraint_name(f, name)?;
                if *parenthesized {
                    write!(f, "DEFAULT ({expr})")
                } else {
                    write!(f, "DEFAULT {expr}")
                }
            }
            ColumnConstraint::Generated {
                name,
                expr,
                always,
                stored,
            } => {
                write_constraint_name(f, name)?;
                if *always {
                    f.write_str("GENERATED ALWAYS ")?;
                }
                write!(f, "AS ({expr})")?;
                if *stored {
                    f.write_str(" STORED")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PrimaryKeyOrder {
    Asc,
    Desc,
}

impl fmt::Display for PrimaryKeyOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PrimaryKeyOrder::Asc => "ASC",
            PrimaryKeyOrder::Desc => "DESC",
        })
    }
}

/// A table-level constraint of a CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<Ident>,
        columns: Vec<Ident>,
    },
    Unique {
        name: Option<Ident>,
        columns: Vec<Ident>,
    },
    Check {
        name: Option<Ident>,
        expr: Expr,
    },
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableConstraint::PrimaryKey { name, columns } => {
                write_constraint_name(f, name)?;
                write!(f, "PRIMARY KEY ({})", display_comma_separated(columns))
            }
            TableConstraint::Unique { name, columns } => {
                write_constraint_name(f, name)?;
                write!(f, "UNIQUE ({})", display_comma_separated(columns))
            }
            TableConstraint::Check { name, expr } => {
                write_constraint_name(f, name)?;
                write!(f, "CHECK({expr})")
            }
        }
    }
}

/// INSERT. An empty column list means "all columns in declaration
/// order". When `default_values` is set, both `columns` and `rows` are
/// empty. The `returning` clause has no grammar production yet and is
/// never populated by parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Insert {
    pub table: Table,
    pub columns: Vec<Ident>,
    pub rows: Vec<Vec<Expr>>,
    pub default_values: bool,
    pub returning: Vec<SelectColumn>,
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "insert into {}", self.table)?;
        if !self.columns.is_empty() {
            write!(f, " ({})", display_comma_separated(&self.columns))?;
        }
        if self.default_values {
            f.write_str(" default values")?;
        } else {
            f.write_str(" values ")?;
            let mut delim = "";
            for row in &self.rows {
                write!(f, "{delim}({})", display_comma_separated(row))?;
                delim = ", ";
            }
        }
        if !self.returning.is_empty() {
            write!(f, " returning {}", display_comma_separated(&self.returning))?;
        }
        Ok(())
    }
}

/// UPDATE. The parenthesized `(a, b) = (1, 2)` source form is desugared
/// into the flat assignment list during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Update {
    pub table: Table,
    pub assignments: Vec<UpdateExpr>,
    pub selection: Option<Expr>,
    pub returning: Vec<SelectColumn>,
}

impl Update {
    /// Conjoins `expr` onto the WHERE clause with AND, or installs it as
    /// the WHERE clause if there is none.
    pub fn add_where_clause(&mut self, expr: Expr) {
        add_where_clause(&mut self.selection, expr);
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "update {} set {}",
            self.table,
            display_comma_separated(&self.assignments)
        )?;
        if let Some(selection) = &self.selection {
            write!(f, " where {selection}")?;
        }
        if !self.returning.is_empty() {
            write!(f, " returning {}", display_comma_separated(&self.returning))?;
        }
        Ok(())
    }
}

/// One `column = expr` assignment of an UPDATE SET clause.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateExpr {
    pub column: Ident,
    pub expr: Expr,
}

impl fmt::Display for UpdateExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.expr)
    }
}

/// DELETE
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Delete {
    pub table: Table,
    pub selection: Option<Expr>,
}

impl Delete {
    /// Conjoins `expr` onto the WHERE clause with AND, or installs it as
    /// the WHERE clause if there is none.
    pub fn add_where_clause(&mut self, expr: Expr) {
        add_where_clause(&mut self.selection, expr);
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "delete from {}", self.table)?;
        if let Some(selection) = &self.selection {
            write!(f, " where {selection}")?;
        }
        Ok(())
    }
}

fn add_where_clause(selection: &mut Option<Expr>, expr: Expr) {
    *selection = Some(match selection.take() {
        Some(existing) => Expr::And {
            left: Box::new(existing),
            right: Box::new(expr),
        },
        None => expr,
    });
}

/// GRANT
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grant {
    pub table: Table,
    pub privileges: Privileges,
    pub roles: Vec<String>,
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "grant {} on {} to {}",
            self.privileges,
            self.table,
            display_quoted_roles(&self.roles)
        )
    }
}

/// REVOKE
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Revoke {
    pub table: Table,
    pub privileges: Privileges,
    pub roles: Vec<String>,
}

impl fmt::Display for Revoke {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "revoke {} on {} from {}",
            self.privileges,
            self.table,
            display_quoted_roles(&self.roles)
        )
    }
}

fn display_quoted_roles(roles: &[String]) -> String {
    roles.iter().map(|r| format!("'{r}'")).join(", ")
}

/// The privileges of a GRANT or REVOKE. Stored as a set; printed in
/// lexicographic order so canonical output does not depend on insertion
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Privileges(HashSet<Privilege>);

impl Privileges {
    pub fn new() -> Self {
        Privileges(HashSet::new())
    }

    /// Adds a privilege; returns false if it was already present.
    pub fn insert(&mut self, privilege: Privilege) -> bool {
        self.0.insert(privilege)
    }

    pub fn contains(&self, privilege: Privilege) -> bool {
        self.0.contains(&privilege)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Privilege> {
        self.0.iter()
    }
}

impl FromIterator<Privilege> for Privileges {
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        Privileges(iter.into_iter().collect())
    }
}

impl fmt::Display for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.iter().sorted().join(", "))
    }
}

/// A grantable privilege. The variant order is the lexicographic print
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Privilege {
    Delete,
    Insert,
    Update,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Privilege::Delete => "delete",
            Privilege::Insert => "insert",
            Privilege::Update => "update",
        })
    }
}

/// A violation detected while reducing a statement. Semantic errors never
/// abort the parse; they accumulate in [`Ast::errors`] under the index of
/// the statement that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SemanticError {
    ColumnNameTooLong { name: String },
    TextTooLong { length: usize },
    BlobTooBig { length: usize },
    TooManyColumns { count: usize },
    KeywordIsNotAllowed { keyword: String },
    NoSuchFunction { name: String },
    StatementContainsSubquery { statement_kind: String },
    UpdateColumnsAndValuesDiffer { columns: usize, values: usize },
    GrantRepeatedPrivilege { privilege: String },
    GrantPrivilegesCountExceeded { count: usize },
    TableNameWrongFormat { name: String },
    CompoundSelectNotAllowed,
    NaturalJoinWithOnOrUsingClause,
    /// Reserved: no check produces this yet.
    MultiplePrimaryKey,
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SemanticError::ColumnNameTooLong { name } => {
                write!(
                    f,
                    "column name '{name}' is longer than {MAX_COLUMN_NAME_LENGTH} bytes"
                )
            }
            SemanticError::TextTooLong { length } => {
                write!(
                    f,
                    "text literal of {length} bytes exceeds the limit of {MAX_TEXT_LENGTH}"
                )
            }
            SemanticError::BlobTooBig { length } => {
                write!(
                    f,
                    "blob literal of {length} hex digits exceeds the limit of {MAX_BLOB_LENGTH}"
                )
            }
            SemanticError::TooManyColumns { count } => {
                write!(
                    f,
                    "table has {count} columns, the limit is {MAX_COLUMNS_ALLOWED}"
                )
            }
            SemanticError::KeywordIsNotAllowed { keyword } => {
                write!(f, "keyword '{keyword}' is not allowed")
            }
            SemanticError::NoSuchFunction { name } => write!(f, "no such function: {name}"),
            SemanticError::StatementContainsSubquery { statement_kind } => {
                write!(f, "{statement_kind} statement may not contain a subquery")
            }
            SemanticError::UpdateColumnsAndValuesDiffer { columns, values } => {
                write!(f, "{columns} columns assigned {values} values")
            }
            SemanticError::GrantRepeatedPrivilege { privilege } => {
                write!(f, "privilege '{privilege}' granted more than once")
            }
            SemanticError::GrantPrivilegesCountExceeded { count } => {
                write!(
                    f,
                    "{count} privileges exceeds the limit of {MAX_PRIVILEGES_COUNT}"
                )
            }
            SemanticError::TableNameWrongFormat { name } => {
                write!(f, "table name '{name}' has wrong format")
            }
            SemanticError::CompoundSelectNotAllowed => {
                f.write_str("compound select is not allowed")
            }
            SemanticError::NaturalJoinWithOnOrUsingClause => {
                f.write_str("natural join cannot have an on or using clause")
            }
            SemanticError::MultiplePrimaryKey => {
                f.write_str("table has more than one primary key")
            }
        }
    }
}

impl std::error::Error for SemanticError {}
