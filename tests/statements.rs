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
//! Statement-level behavior: the statements the dialect accepts, the
//! semantic diagnostics it attaches, and the statement classifier.

use chainsql::ast::*;
use chainsql::test_utils::*;
use chainsql::{get_unique_table_references, parse};
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};

#[test]
fn parse_simple_select() {
    let statement = one_statement_parses_to(
        "select * FrOM fake_table_1 WHere something='nothing';",
        "select * from fake_table_1 where something='nothing'",
    );
    assert_eq!(statement.kind(), StatementKind::Read);
    assert_eq!(get_unique_table_references(&statement), ["fake_table_1"]);
}

#[test]
fn parse_select_with_all_clauses() {
    verified_stmt(
        "select distinct t.a, b as x, count(*) from t_1_1 as t \
         where a>1 and b isnull group by a, b having count(*)>2 \
         order by a desc, b limit 10 offset 2",
    );
}

#[test]
fn parse_select_without_from() {
    verified_stmt("select 1, 'two', x'03', 0x04, 1.5, null, true, false");
}

#[test]
fn parse_create_table_and_structure_hash() {
    let ast = parse_ok("CREATE TABLE blah_5_ (id int, image blob, description text)");
    assert_eq!(ast.kind(), Some(StatementKind::Create));
    let Statement::CreateTable(create) = &ast.statements[0] else {
        panic!("expected create table");
    };
    assert_eq!(
        create.structure_hash(),
        hex::encode(Sha256::digest(b"id:INT,image:BLOB,description:TEXT"))
    );
    assert_eq!(
        ast.to_canonical_sql(),
        "CREATE TABLE blah_5_ (id INT, image BLOB, description TEXT)"
    );
}

#[test]
fn parse_create_table_with_constraints() {
    let statement = verified_stmt(
        "CREATE TABLE t_1 (id INT CONSTRAINT pk PRIMARY KEY DESC, \
         name TEXT NOT NULL UNIQUE, \
         score REAL DEFAULT 0.5, \
         tag ANY DEFAULT (1+2), \
         doubled INTEGER GENERATED ALWAYS AS (id*2) STORED, \
         CONSTRAINT both UNIQUE (id, name), \
         PRIMARY KEY (id), \
         CHECK(id>0))",
    );
    let Statement::CreateTable(create) = statement else {
        panic!("expected create table");
    };
    assert_eq!(create.columns.len(), 5);
    assert_eq!(create.constraints.len(), 3);
    assert!(!create.strict);
}

#[test]
fn strict_flag_is_out_of_band() {
    // the grammar has no STRICT production
    assert!(parse("CREATE TABLE t_1 (id INT) STRICT").is_err());

    let mut ast = parse_ok("CREATE TABLE t_1 (id INT)");
    let Statement::CreateTable(create) = &mut ast.statements[0] else {
        panic!("expected create table");
    };
    create.strict = true;
    assert_eq!(create.to_string(), "CREATE TABLE t_1 (id INT) STRICT");
}

#[test]
fn parse_multi_statement_writes() {
    let ast = parse_ok(
        "insert into blah_5_ values (1,'three','something'); \
         update blah_5_ set description='something';",
    );
    assert_eq!(ast.statements.len(), 2);
    assert_eq!(ast.kind(), Some(StatementKind::Write));
    assert_eq!(
        ast.to_canonical_sql(),
        "insert into blah_5_ values (1, 'three', 'something'); \
         update blah_5_ set description = 'something'"
    );
}

#[test]
fn parse_insert_forms() {
    verified_stmt("insert into t_1_1 (a, b) values (1, 2), (3, 4)");
    verified_stmt("insert into t_1_1 default values");
    let Statement::Insert(insert) = verified_stmt("insert into t_1_1 values (1)") else {
        panic!("expected insert");
    };
    assert!(insert.columns.is_empty());
    assert!(insert.returning.is_empty());
}

#[test]
fn parse_delete_and_update() {
    verified_stmt("delete from t_1_1 where a=1");
    verified_stmt("update t_1_1 set a = 1, b = 'x' where c notnull");
}

#[test]
fn parse_grant_sorts_privileges() {
    let ast = parse_ok(
        "grant INSERT, update, DELETE on foo_1337_100 to '0xd43c59d569', '0x4afe8e30'",
    );
    assert_eq!(ast.kind(), Some(StatementKind::Acl));
    assert_eq!(
        ast.to_canonical_sql(),
        "grant delete, insert, update on foo_1337_100 to '0xd43c59d569', '0x4afe8e30'"
    );
    let Statement::Grant(grant) = &ast.statements[0] else {
        panic!("expected grant");
    };
    assert_eq!(grant.privileges.len(), 3);
    assert_eq!(grant.roles, ["0xd43c59d569", "0x4afe8e30"]);
}

#[test]
fn parse_revoke() {
    verified_stmt("revoke insert on foo_1337_100 from '0xd43c59d569'");
}

#[test]
fn acl_and_write_chain_classifies_as_write() {
    let ast = parse_ok("grant insert on t_1_1 to '0xabc'; delete from t_1_1");
    assert_eq!(ast.kind(), Some(StatementKind::Write));
}

#[test]
fn autoincrement_is_an_identifier_but_current_time_is_banned() {
    parse_ok("select AUTOINCREMENT from t");

    let ast = parse("select CURRENT_TIME from t").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::KeywordIsNotAllowed {
            keyword: "CURRENT_TIME".to_string()
        }]
    );
    // the AST still surfaces
    assert_eq!(ast.statements.len(), 1);
}

#[test]
fn banned_keywords_attach_to_the_right_statement() {
    let ast = parse("insert into t values (1); insert into t values (current_date)").unwrap();
    assert!(!ast.errors.contains_key(&0));
    assert_eq!(
        ast.errors[&1],
        vec![SemanticError::KeywordIsNotAllowed {
            keyword: "CURRENT_DATE".to_string()
        }]
    );
}

#[test]
fn select_cannot_mix_with_writes() {
    let err = parse("select * from blah_5_;insert into blah_5_ values (1,'x','y');").unwrap_err();
    assert_eq!(err.offset, 22);
    assert_eq!(err.near, "insert");
}

#[test]
fn insert_with_subquery_is_a_semantic_error() {
    let ast = parse("insert into t (a) VALUES ((select 1 FROM t limit 1))").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::StatementContainsSubquery {
            statement_kind: "insert".to_string()
        }]
    );
    assert_eq!(ast.statements.len(), 1);
}

#[test]
fn update_and_delete_subqueries_are_semantic_errors() {
    let ast = parse("update t set a=(select 1 from u limit 1)").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::StatementContainsSubquery {
            statement_kind: "update".to_string()
        }]
    );

    let ast = parse("delete from t where exists (select 1 from u)").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::StatementContainsSubquery {
            statement_kind: "delete".to_string()
        }]
    );
}

#[test]
fn select_subqueries_are_fine() {
    parse_ok("select * from t where a in (select b from u)");
    parse_ok("select * from (select a from t_1_1) as sub");
}

#[test]
fn column_name_length_boundary() {
    let ok = "a".repeat(64);
    parse_ok(&format!("select {ok} from t"));

    let too_long = "a".repeat(65);
    let ast = parse(&format!("select {too_long} from t")).unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::ColumnNameTooLong { name: too_long }]
    );
}

#[test]
fn text_length_boundary() {
    let ok = "x".repeat(1024);
    parse_ok(&format!("select '{ok}' from t"));

    let too_long = "x".repeat(1025);
    let ast = parse(&format!("select '{too_long}' from t")).unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::TextTooLong { length: 1025 }]
    );
}

#[test]
fn blob_length_boundary() {
    let ok = "0f".repeat(512); // 1024 hex digits
    parse_ok(&format!("select x'{ok}' from t"));

    let too_big = "0f".repeat(513);
    let ast = parse(&format!("select x'{too_big}' from t")).unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::BlobTooBig { length: 1026 }]
    );
}

#[test]
fn column_count_boundary() {
    let defs: Vec<String> = (0..24).map(|i| format!("c{i} INT")).collect();
    parse_ok(&format!("CREATE TABLE t_1 ({})", defs.join(", ")));

    let defs: Vec<String> = (0..25).map(|i| format!("c{i} INT")).collect();
    let ast = parse(&format!("CREATE TABLE t_1 ({})", defs.join(", "))).unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::TooManyColumns { count: 25 }]
    );
}

#[test]
fn privilege_boundaries() {
    parse_ok("grant insert, update, delete on t_1_1 to 'r'");

    let ast = parse("grant insert, update, delete, insert on t_1_1 to 'r'").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![
            SemanticError::GrantPrivilegesCountExceeded { count: 4 },
            SemanticError::GrantRepeatedPrivilege {
                privilege: "insert".to_string()
            },
        ]
    );

    let ast = parse("grant update, update on t_1_1 to 'r'").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::GrantRepeatedPrivilege {
            privilege: "update".to_string()
        }]
    );
}

#[test]
fn errors_accumulate_within_a_statement() {
    // unknown function wrapping a subquery: both diagnostics surface
    let ast = parse("insert into t values (nosuch((select 1 from u limit 1)))").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![
            SemanticError::NoSuchFunction {
                name: "nosuch".to_string()
            },
            SemanticError::StatementContainsSubquery {
                statement_kind: "insert".to_string()
            },
        ]
    );
}

#[test]
fn allowed_functions_are_case_sensitive() {
    parse_ok("select abs(a), txn_hash(), block_num() from t");

    let ast = parse("select ABS(a) from t").unwrap();
    assert_eq!(
        ast.errors[&0],
        vec![SemanticError::NoSuchFunction {
            name: "ABS".to_string()
        }]
    );
}

#[test]
fn join_variants_parse() {
    verified_stmt("select * from t join u on t.a=u.a");
    verified_stmt("select * from t left join u on t.a=u.a");
    verified_stmt("select * from t left outer join u on t.a=u.a");
    verified_stmt("select * from t right join u using (a, b)");
    verified_stmt("select * from t cross join u");
    verified_stmt("select * from t natural join u");
    verified_stmt("select * from t inner join u on t.a=u.a");
    verified_stmt("select * from (t, u)");
}

#[test]
fn table_references_from_joins_and_subqueries() {
    let statement = verified_stmt(
        "select t.a from t join u on t.a=u.a where b in (select c from v) order by t.a",
    );
    assert_eq!(get_unique_table_references(&statement), ["t", "u", "v"]);
}
