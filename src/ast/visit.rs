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

//! Recursive traversal over the AST.
//!
//! [`walk`] drives a single callback over every node, descending in
//! declaration order. The callback decides per node whether to skip its
//! children, and any error aborts the traversal and propagates to the
//! caller. The table-oriented helpers in this module are built on top of
//! it, except [`update_table_names`] which needs mutable access and uses
//! a dedicated traversal over the target tables.

use std::collections::HashSet;
use std::convert::Infallible;

use super::{
    ColumnConstraint, ColumnDef, Expr, FromExpr, FromItem, FunctionArgs, Ident, Select,
    SelectColumn, Statement, Table, TableConstraint, UpdateExpr,
};
use crate::tables::{is_valid_mapped_name, strip_enclosure, WrongFormatError};

/// A borrowed reference to any AST node the walker can visit.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Statement(&'a Statement),
    Select(&'a Select),
    SelectColumn(&'a SelectColumn),
    FromExpr(&'a FromExpr),
    Table(&'a Table),
    Column(&'a super::Column),
    Expr(&'a Expr),
    OrderingTerm(&'a super::OrderingTerm),
    Limit(&'a super::Limit),
    ColumnDef(&'a ColumnDef),
    ColumnConstraint(&'a ColumnConstraint),
    TableConstraint(&'a TableConstraint),
    UpdateExpr(&'a UpdateExpr),
}

/// Invokes `visit` on each root and, unless it returns `Ok(true)`, on the
/// node's children, in declaration order. An `Err` aborts the whole
/// traversal and propagates.
pub fn walk<'a, E, F, I>(visit: &mut F, roots: I) -> Result<(), E>
where
    F: FnMut(Node<'a>) -> Result<bool, E>,
    I: IntoIterator<Item = Node<'a>>,
{
    for root in roots {
        walk_node(visit, root)?;
    }
    Ok(())
}

fn walk_node<'a, E, F>(visit: &mut F, node: Node<'a>) -> Result<(), E>
where
    F: FnMut(Node<'a>) -> Result<bool, E>,
{
    if visit(node)? {
        return Ok(());
    }
    match node {
        Node::Statement(statement) => walk_statement(visit, statement),
        Node::Select(select) => walk_select(visit, select),
        Node::SelectColumn(column) => match column {
            SelectColumn::Star { table: Some(table) } => walk_node(visit, Node::Table(table)),
            SelectColumn::Star { table: None } => Ok(()),
            SelectColumn::Aliased { expr, .. } => walk_node(visit, Node::Expr(expr)),
        },
        Node::FromExpr(from) => walk_from(visit, from),
        Node::Table(_) => Ok(()),
        Node::Column(column) => match &column.table {
            Some(table) => walk_node(visit, Node::Table(table)),
            None => Ok(()),
        },
        Node::Expr(expr) => walk_expr(visit, expr),
        Node::OrderingTerm(term) => walk_node(visit, Node::Expr(&term.expr)),
        Node::Limit(limit) => {
            walk_node(visit, Node::Expr(&limit.limit))?;
            if let Some(offset) = &limit.offset {
                walk_node(visit, Node::Expr(offset))?;
            }
            Ok(())
        }
        Node::ColumnDef(def) => {
            for constraint in &def.constraints {
                walk_node(visit, Node::ColumnConstraint(constraint))?;
            }
            Ok(())
        }
        Node::ColumnConstraint(constraint) => match constraint {
            ColumnConstraint::Check { expr, .. }
            | ColumnConstraint::Default { expr, .. }
            | ColumnConstraint::Generated { expr, .. } => walk_node(visit, Node::Expr(expr)),
            _ => Ok(()),
        },
        Node::TableConstraint(constraint) => match constraint {
            TableConstraint::Check { expr, .. } => walk_node(visit, Node::Expr(expr)),
            _ => Ok(()),
        },
        Node::UpdateExpr(update) => walk_node(visit, Node::Expr(&update.expr)),
    }
}

fn walk_statement<'a, E, F>(visit: &mut F, statement: &'a Statement) -> Result<(), E>
where
    F: FnMut(Node<'a>) -> Result<bool, E>,
{
    match statement {
        Statement::Select(select) => walk_node(visit, Node::Select(select)),
        Statement::CreateTable(create) => {
            walk_node(visit, Node::Table(&create.table))?;
            for column in &create.columns {
                walk_node(visit, Node::ColumnDef(column))?;
            }
            for constraint in &create.constraints {
                walk_node(visit, Node::TableConstraint(constraint))?;
            }
            Ok(())
        }
        Statement::Insert(insert) => {
            walk_node(visit, Node::Table(&insert.table))?;
            for row in &insert.rows {
                for expr in row {
                    walk_node(visit, Node::Expr(expr))?;
                }
            }
            Ok(())
        }
        Statement::Update(update) => {
            walk_node(visit, Node::Table(&update.table))?;
            for assignment in &update.assignments {
                walk_node(visit, Node::UpdateExpr(assignment))?;
            }
            if let Some(selection) = &update.selection {
                walk_node(visit, Node::Expr(selection))?;
            }
            Ok(())
        }
        Statement::Delete(delete) => {
            walk_node(visit, Node::Table(&delete.table))?;
            if let Some(selection) = &delete.selection {
                walk_node(visit, Node::Expr(selection))?;
            }
            Ok(())
        }
        Statement::Grant(grant) => walk_node(visit, Node::Table(&grant.table)),
        Statement::Revoke(revoke) => walk_node(visit, Node::Table(&revoke.table)),
    }
}

fn walk_select<'a, E, F>(visit: &mut F, select: &'a Select) -> Result<(), E>
where
    F: FnMut(Node<'a>) -> Result<bool, E>,
{
    for column in &select.columns {
        walk_node(visit, Node::SelectColumn(column))?;
    }
    for from in &select.from {
        walk_node(visit, Node::FromExpr(from))?;
    }
    if let Some(selection) = &select.selection {
        walk_node(visit, Node::Expr(selection))?;
    }
    for expr in &select.group_by {
        walk_node(visit, Node::Expr(expr))?;
    }
    if let Some(having) = &select.having {
        walk_node(visit, Node::Expr(having))?;
    }
    for term in &select.order_by {
        walk_node(visit, Node::OrderingTerm(term))?;
    }
    if let Some(limit) = &select.limit {
        walk_node(visit, Node::Limit(limit))?;
    }
    Ok(())
}

fn walk_from<'a, E, F>(visit: &mut F, from: &'a FromExpr) -> Result<(), E>
where
    F: FnMut(Node<'a>) -> Result<bool, E>,
{
    match from {
        FromExpr::Aliased(aliased) => match &aliased.inner {
            FromItem::Table(table) => walk_node(visit, Node::Table(table)),
            FromItem::Subquery(select) => walk_node(visit, Node::Select(select)),
        },
        FromExpr::Paren(items) => {
            for item in items {
                walk_node(visit, Node::FromExpr(item))?;
            }
            Ok(())
        }
        FromExpr::Join(join) => {
            walk_node(visit, Node::FromExpr(&join.left))?;
            walk_node(visit, Node::FromExpr(&join.right))?;
            if let Some(on) = &join.on {
                walk_node(visit, Node::Expr(on))?;
            }
            Ok(())
        }
    }
}

fn walk_expr<'a, E, F>(visit: &mut F, expr: &'a Expr) -> Result<(), E>
where
    F: FnMut(Node<'a>) -> Result<bool, E>,
{
    match expr {
        Expr::Value(_) => Ok(()),
        Expr::Column(column) => walk_node(visit, Node::Column(column)),
        Expr::Unary { expr, .. }
        | Expr::Not(expr)
        | Expr::IsNull(expr)
        | Expr::NotNull(expr)
        | Expr::Collate { expr, .. }
        | Expr::Cast { expr, .. } => walk_node(visit, Node::Expr(expr)),
        Expr::Binary { left, right, .. }
        | Expr::And { left, right }
        | Expr::Or { left, right }
        | Expr::Is { left, right }
        | Expr::IsNot { left, right } => {
            walk_node(visit, Node::Expr(left))?;
            walk_node(visit, Node::Expr(right))
        }
        Expr::Compare {
            left,
            right,
            escape,
            ..
        } => {
            walk_node(visit, Node::Expr(left))?;
            walk_node(visit, Node::Expr(right))?;
            if let Some(escape) = escape {
                walk_node(visit, Node::Expr(escape))?;
            }
            Ok(())
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_node(visit, Node::Expr(expr))?;
            walk_node(visit, Node::Expr(low))?;
            walk_node(visit, Node::Expr(high))
        }
        Expr::Case {
            operand,
            whens,
            else_result,
        } => {
            if let Some(operand) = operand {
                walk_node(visit, Node::Expr(operand))?;
            }
            for when in whens {
                walk_node(visit, Node::Expr(&when.condition))?;
                walk_node(visit, Node::Expr(&when.result))?;
            }
            if let Some(else_result) = else_result {
                walk_node(visit, Node::Expr(else_result))?;
            }
            Ok(())
        }
        Expr::Paren(exprs) => {
            for expr in exprs {
                walk_node(visit, Node::Expr(expr))?;
            }
            Ok(())
        }
        Expr::Subquery(select) | Expr::Exists(select) => {
            walk_node(visit, Node::Select(select))
        }
        Expr::Function(call) => {
            if let FunctionArgs::List(args) = &call.args {
                for arg in args {
                    walk_node(visit, Node::Expr(arg))?;
                }
            }
            if let Some(filter) = &call.filter {
                walk_node(visit, Node::Expr(filter))?;
            }
            Ok(())
        }
    }
}

/// Collects the names of all target tables under `statement`, in
/// discovery order, each at most once.
pub fn get_unique_table_references(statement: &Statement) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let result: Result<(), Infallible> = walk(
        &mut |node| {
            if let Node::Table(table) = node {
                if table.is_target && seen.insert(table.name.value.clone()) {
                    names.push(table.name.value.clone());
                }
            }
            Ok(false)
        },
        [Node::Statement(statement)],
    );
    match result {
        Ok(()) => names,
        Err(infallible) => match infallible {},
    }
}

/// Whether any expression under `statement` contains a subquery,
/// including `EXISTS` and `IN (select ..)` forms.
pub(crate) fn contains_subquery(statement: &Statement) -> bool {
    walk(
        &mut |node| {
            if matches!(node, Node::Expr(Expr::Subquery(_) | Expr::Exists(_))) {
                return Err(());
            }
            Ok(false)
        },
        [Node::Statement(statement)],
    )
    .is_err()
}

/// Rewrites the name of every target table under `statement`.
///
/// `mapper` receives the current name and returns the replacement, or
/// `None` to leave the table untouched. A replacement is stripped of any
/// enclosure and validated; an invalid replacement aborts the walk with
/// [`WrongFormatError`], leaving earlier replacements in place.
pub fn update_table_names<F>(statement: &mut Statement, mut mapper: F) -> Result<(), WrongFormatError>
where
    F: FnMut(&str) -> Option<String>,
{
    tables_in_statement_mut(statement, &mut |table| {
        let Some(mapped) = mapper(&table.name.value) else {
            return Ok(());
        };
        let (value, quote_style) = strip_enclosure(&mapped);
        if !is_valid_mapped_name(value) {
            return Err(WrongFormatError::new(mapped.clone()));
        }
        table.name = Ident {
            value: value.to_string(),
            quote_style,
        };
        Ok(())
    })
}

fn apply_if_target<E>(
    table: &mut Table,
    f: &mut impl FnMut(&mut Table) -> Result<(), E>,
) -> Result<(), E> {
    if table.is_target {
        f(table)
    } else {
        Ok(())
    }
}

fn tables_in_statement_mut<E>(
    statement: &mut Statement,
    f: &mut impl FnMut(&mut Table) -> Result<(), E>,
) -> Result<(), E> {
    match statement {
        Statement::Select(select) => tables_in_select_mut(select, f),
        Statement::CreateTable(create) => apply_if_target(&mut create.table, f),
        Statement::Insert(insert) => {
            apply_if_target(&mut insert.table, f)?;
            for row in &mut insert.rows {
                for expr in row {
                    tables_in_expr_mut(expr, f)?;
                }
            }
            Ok(())
        }
        Statement::Update(update) => {
            apply_if_target(&mut update.table, f)?;
            for assignment in &mut update.assignments {
                tables_in_expr_mut(&mut assignment.expr, f)?;
            }
            if let Some(selection) = &mut update.selection {
                tables_in_expr_mut(selection, f)?;
            }
            Ok(())
        }
        Statement::Delete(delete) => {
            apply_if_target(&mut delete.table, f)?;
            if let Some(selection) = &mut delete.selection {
                tables_in_expr_mut(selection, f)?;
            }
            Ok(())
        }
        Statement::Grant(grant) => apply_if_target(&mut grant.table, f),
        Statement::Revoke(revoke) => apply_if_target(&mut revoke.table, f),
    }
}

fn tables_in_select_mut<E>(
    select: &mut Select,
    f: &mut impl FnMut(&mut Table) -> Result<(), E>,
) -> Result<(), E> {
    for column in &mut select.columns {
        if let SelectColumn::Aliased { expr, .. } = column {
            tables_in_expr_mut(expr, f)?;
        }
    }
    for from in &mut select.from {
        tables_in_from_mut(from, f)?;
    }
    for expr in select
        .selection
        .iter_mut()
        .chain(&mut select.group_by)
        .chain(select.having.iter_mut())
    {
        tables_in_expr_mut(expr, f)?;
    }
    for term in &mut select.order_by {
        tables_in_expr_mut(&mut term.expr, f)?;
    }
    if let Some(limit) = &mut select.limit {
        tables_in_expr_mut(&mut limit.limit, f)?;
        if let Some(offset) = &mut limit.offset {
            tables_in_expr_mut(offset, f)?;
        }
    }
    Ok(())
}

fn tables_in_from_mut<E>(
    from: &mut FromExpr,
    f: &mut impl FnMut(&mut Table) -> Result<(), E>,
) -> Result<(), E> {
    match from {
        FromExpr::Aliased(aliased) => match &mut aliased.inner {
            FromItem::Table(table) => apply_if_target(table, f),
            FromItem::Subquery(select) => tables_in_select_mut(select, f),
        },
        FromExpr::Paren(items) => {
            for item in items {
                tables_in_from_mut(item, f)?;
            }
            Ok(())
        }
        FromExpr::Join(join) => {
            tables_in_from_mut(&mut join.left, f)?;
            tables_in_from_mut(&mut join.right, f)?;
            if let Some(on) = &mut join.on {
                tables_in_expr_mut(on, f)?;
            }
            Ok(())
        }
    }
}

fn tables_in_expr_mut<E>(
    expr: &mut Expr,
    f: &mut impl FnMut(&mut Table) -> Result<(), E>,
) -> Result<(), E> {
    match expr {
        Expr::Value(_) | Expr::Column(_) => Ok(()),
        Expr::Unary { expr, .. }
        | Expr::Not(expr)
        | Expr::IsNull(expr)
        | Expr::NotNull(expr)
        | Expr::Collate { expr, .. }
        | Expr::Cast { expr, .. } => tables_in_expr_mut(expr, f),
        Expr::Binary { left, right, .. }
        | Expr::And { left, right }
        | Expr::Or { left, right }
        | Expr::Is { left, right }
        | Expr::IsNot { left, right } => {
            tables_in_expr_mut(left, f)?;
            tables_in_expr_mut(right, f)
        }
        Expr::Compare {
            left,
            right,
            escape,
            ..
        } => {
            tables_in_expr_mut(left, f)?;
            tables_in_expr_mut(right, f)?;
            if let Some(escape) = escape {
                tables_in_expr_mut(escape, f)?;
            }
            Ok(())
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            tables_in_expr_mut(expr, f)?;
            tables_in_expr_mut(low, f)?;
            tables_in_expr_mut(high, f)
        }
        Expr::Case {
            operand,
            whens,
            else_result,
        } => {
            if let Some(operand) = operand {
                tables_in_expr_mut(operand, f)?;
            }
            for when in whens {
                tables_in_expr_mut(&mut when.condition, f)?;
                tables_in_expr_mut(&mut when.result, f)?;
            }
            if let Some(else_result) = else_result {
                tables_in_expr_mut(else_result, f)?;
            }
            Ok(())
        }
        Expr::Paren(exprs) => {
            for expr in exprs {
                tables_in_expr_mut(expr, f)?;
            }
            Ok(())
        }
        Expr::Subquery(select) | Expr::Exists(select) => tables_in_select_mut(select, f),
        Expr::Function(call) => {
            if let FunctionArgs::List(args) = &mut call.args {
                for arg in args {
                    tables_in_expr_mut(arg, f)?;
                }
            }
            if let Some(filter) = &mut call.filter {
                tables_in_expr_mut(filter, f)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn first_statement(sql: &str) -> Statement {
        parse(sql).unwrap().statements.remove(0)
    }

    #[test]
    fn unique_table_references_dedup_in_discovery_order() {
        let statement =
            first_statement("select t.a from t, u join t on t.a=u.a where b in (select c from v)");
        assert_eq!(get_unique_table_references(&statement), ["t", "u", "v"]);
    }

    #[test]
    fn column_qualifiers_are_not_references() {
        let statement = first_statement("select other.a from t");
        assert_eq!(get_unique_table_references(&statement), ["t"]);
    }

    #[test]
    fn walk_stop_skips_children() {
        let statement = first_statement("select a from t where b in (select c from u)");
        let mut tables = 0;
        let result: Result<(), std::convert::Infallible> = walk(
            &mut |node| match node {
                // skip the whole WHERE expression
                Node::Expr(Expr::Compare { .. }) => Ok(true),
                Node::Table(_) => {
                    tables += 1;
                    Ok(false)
                }
                _ => Ok(false),
            },
            [Node::Statement(&statement)],
        );
        assert!(result.is_ok());
        assert_eq!(tables, 1);
    }

    #[test]
    fn update_table_names_rewrites_targets() {
        let mut statement = first_statement("select t.a from t where x in (select y from u)");
        update_table_names(&mut statement, |name| match name {
            "t" => Some("t_31337_5".to_string()),
            "u" => Some("u_31337_6".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(
            statement.to_string(),
            "select t.a from t_31337_5 where x in (select y from u_31337_6)"
        );
    }

    #[test]
    fn update_table_names_strips_enclosure() {
        let mut statement = first_statement("insert into t values (1)");
        update_table_names(&mut statement, |_| Some("\"t_1_2\"".to_string())).unwrap();
        match &statement {
            Statement::Insert(insert) => {
                assert_eq!(insert.table.name.value, "t_1_2");
                assert_eq!(insert.table.name.quote_style, Some('"'));
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn update_table_names_rejects_bad_name() {
        let mut statement = first_statement("delete from t");
        let err = update_table_names(&mut statement, |_| Some("1bad".to_string())).unwrap_err();
        assert_eq!(err.name, "1bad");
    }

    #[test]
    fn contains_subquery_spots_nested_forms() {
        let statement = first_statement("select * from t where exists (select 1 from u)");
        assert!(contains_subquery(&statement));
        let statement = first_statement("select * from t where a=1");
        assert!(!contains_subquery(&statement));
    }
}
