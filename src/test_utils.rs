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

//! Shared helpers for the integration tests.
//!
//! This module is public so `tests/` can use it, but it is not part of
//! the crate's API.

use crate::ast::{Ast, Statement};
use crate::parser::Parser;

/// Parses `sql`, asserting there is no syntax error and no semantic
/// errors.
pub fn parse_ok(sql: &str) -> Ast {
    let ast = Parser::parse_sql(sql).unwrap_or_else(|e| panic!("parse of {sql:?} failed: {e}"));
    assert!(
        ast.errors.is_empty(),
        "unexpected semantic errors for {sql:?}: {:?}",
        ast.errors
    );
    ast
}

/// Parses `sql` cleanly and asserts its canonical form equals `canonical`
/// and that the canonical form is a fixed point under re-parsing. Returns
/// the first statement.
pub fn one_statement_parses_to(sql: &str, canonical: &str) -> Statement {
    let ast = parse_ok(sql);
    assert_eq!(ast.to_canonical_sql(), canonical);

    let reparsed = parse_ok(canonical);
    assert_eq!(reparsed.to_canonical_sql(), canonical);
    assert_eq!(reparsed, ast);

    ast.statements.into_iter().next().expect("no statements")
}

/// Parses `sql`, asserting it is already in canonical form. Returns the
/// first statement.
pub fn verified_stmt(sql: &str) -> Statement {
    one_statement_parses_to(sql, sql)
}
