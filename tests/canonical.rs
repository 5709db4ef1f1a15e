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

#![warn(clippy::all)]
//! Canonical-form properties: deterministic printing, and canonical text
//! as a fixed point of parse-then-print.

use chainsql::parse;
use chainsql::test_utils::*;
use pretty_assertions::assert_eq;

/// parse(print(parse(x))) prints the same text as parse(x).
fn assert_fixed_point(sql: &str) {
    let canonical = parse(sql)
        .unwrap_or_else(|e| panic!("parse of {sql:?} failed: {e}"))
        .to_canonical_sql();
    let reparsed = parse(&canonical)
        .unwrap_or_else(|e| panic!("reparse of {canonical:?} failed: {e}"))
        .to_canonical_sql();
    assert_eq!(canonical, reparsed, "canonical form of {sql:?} drifted");
}

#[test]
fn canonical_form_is_a_fixed_point() {
    for sql in [
        "SELECT * FROM t_1_1",
        "select   a,b ,  c from t where a = 1",
        "select * from t limit 1, 2",
        "select * from t where a between b and c and d",
        "select * from t where a not between -1 and +1",
        "select 'it''s', x'AB', 0xFf, 1.5e-3, .5 from t",
        "select \"a\", `b`, [c] from \"t_1_1\"",
        "select a||b->'x'->>'y' from t",
        "select ~a, -b, -12, +12 from t",
        "select a & 3 | 4 << 1 >> 2 from t",
        "select a, b % 2 * 3 / 4 from t",
        "select * from t where a like 'x%' escape '\\'",
        "select * from t where a not like 'x%'",
        "select * from t where a glob 'x*' or b regexp 'x.' or c match 'x'",
        "select * from t where a in (1, 2) and b not in (select c from u)",
        "select * from t where a is null and b is not null and c isnull and d notnull",
        "select * from t where not a or not (b and c)",
        "select case a when 1 then 'one' when 2 then 'two' else 'many' end from t",
        "select cast(a as integer), cast(b as none) from t",
        "select a collate nocase from t order by a asc, b desc",
        "select count(*), group_concat(distinct a) from t group by b having count(*)>1",
        "select like('x%', a), like('x%', a, '\\'), glob('x*', a) from t",
        "select * from t, u join v on t.a=v.a, (w, y)",
        "select * from (select a from t_1_1) as sub where exists (select 1 from u)",
        "SELECT AUTOINCREMENT FROM t",
        "CREATE TABLE blah_5_ (id int, image blob, description text)",
        "CREATE TABLE t_1 (id INT PRIMARY KEY, v TEXT DEFAULT 'none', PRIMARY KEY (id))",
        "CREATE TABLE t_1 (id INT DEFAULT -1, f REAL DEFAULT +0.5)",
        "insert into t values (1,'x'),(2,'y')",
        "insert into t (a, b) values (1, 2)",
        "insert into t default values",
        "update t set (a, b) = (1, 2) where c",
        "delete from t where a=1; insert into t values (2)",
        "grant update, insert on t_1_1 to 'a', 'b'",
        "revoke delete on t_1_1 from 'a'",
    ] {
        assert_fixed_point(sql);
    }
}

#[test]
fn limit_comma_and_offset_forms_are_identical() {
    let comma = parse_ok("select * from t limit 1, 2");
    let offset = parse_ok("select * from t limit 2 offset 1");
    assert_eq!(comma, offset);
    assert_eq!(comma.to_canonical_sql(), "select * from t limit 2 offset 1");
}

#[test]
fn privilege_order_does_not_change_canonical_output() {
    let a = parse_ok("grant insert, update on t_1_1 to 'r'").to_canonical_sql();
    let b = parse_ok("grant update, insert on t_1_1 to 'r'").to_canonical_sql();
    assert_eq!(a, b);
    assert_eq!(a, "grant insert, update on t_1_1 to 'r'");
}

#[test]
fn strings_round_trip_their_quotes() {
    verified_stmt("select 'it''s' from t");
    verified_stmt("insert into t_1_1 values ('0x1234')");
}

#[test]
fn enclosed_identifiers_round_trip_their_enclosures() {
    verified_stmt("select \"a\" from \"t_1_1\"");
    verified_stmt("select `a` from `t_1_1`");
    verified_stmt("select [a] from [t_1_1]");
}

#[test]
fn keywords_lowercase_in_canonical_output() {
    let statement = one_statement_parses_to(
        "SELECT A, B FROM T WHERE A LIKE 'x' ORDER BY A DESC LIMIT 5",
        "select A, B from T where A like 'x' order by A desc limit 5",
    );
    // identifier case is preserved; only keywords fold
    assert_eq!(statement.kind(), chainsql::ast::StatementKind::Read);
}

#[test]
fn between_chain_prints_without_parentheses() {
    one_statement_parses_to(
        "select * from t where a BETWEEN b AND c AND d",
        "select * from t where a between b and c and d",
    );
}

#[test]
fn negative_literals_print_fused() {
    one_statement_parses_to("select - 12 from t", "select -12 from t");
}

#[test]
fn statements_join_with_semicolon_space() {
    let ast = parse_ok("delete from t;update t set a = 1;");
    assert_eq!(
        ast.to_canonical_sql(),
        "delete from t; update t set a = 1"
    );
}
