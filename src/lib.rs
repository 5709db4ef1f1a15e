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

//! SQL lexer, parser, and canonicalizer for an on-chain relational data
//! service.
//!
//! The dialect is a constrained subset of SQLite's SQL: reads (`SELECT`),
//! creates (`CREATE TABLE`), writes (`INSERT`, `UPDATE`, `DELETE`) and
//! access control (`GRANT`, `REVOKE`), with strict size limits, a
//! function allow-list, and no subqueries inside write statements.
//! Parsing yields a typed [`ast::Ast`] plus per-statement semantic
//! diagnostics, and every node prints back to deterministic canonical
//! SQL.
//!
//! Example:
//!
//! ```
//! use chainsql::parse;
//!
//! let ast = parse("SELECT * FROM healthbot_31337_5 WHERE counter > 10").unwrap();
//! assert_eq!(
//!     ast.to_canonical_sql(),
//!     "select * from healthbot_31337_5 where counter>10"
//! );
//! assert!(ast.errors.is_empty());
//! ```
//!
//! Parsing never shares mutable state across calls; the only shared data
//! are the static keyword and function tables, so parses may run from
//! any number of threads concurrently.

#![warn(clippy::all)]

pub mod ast;
pub mod keywords;
pub mod parser;
pub mod tables;
pub mod tokenizer;

#[doc(hidden)]
pub mod test_utils;

pub use ast::{get_unique_table_references, update_table_names, walk};
pub use parser::{Parser, ParserError};
pub use tables::{
    validate_create_target_table, validate_target_table, ValidatedCreateTable, ValidatedTable,
    WrongFormatError,
};

/// Parses a program in the chain SQL dialect.
///
/// A hard syntax error aborts and returns [`ParserError`]; semantic
/// violations are collected in [`ast::Ast::errors`] alongside a complete
/// AST.
pub fn parse(sql: &str) -> Result<ast::Ast, ParserError> {
    Parser::parse_sql(sql)
}
