//! Evaluation of parsed statements against a [`GraphStore`].

use super::parser::{Expr, NodePattern, Operand, PatternDirection, RelPattern, Statement};
use super::record::{Record, Value};
use crate::error::{GraphError, Result};
use crate::graph::{GraphStore, Node, PropertyMap, PropertyValue, Relationship};
use log::trace;
use std::collections::BTreeMap;

/// Query parameters by name.
pub type Params = BTreeMap<String, PropertyValue>;

#[derive(Debug, Clone, Copy)]
enum Bound<'a> {
    Node(&'a Node),
    Relationship(&'a Relationship),
}

/// Variables bound by one pattern match.
#[derive(Debug, Default, Clone)]
struct Row<'a> {
    bindings: Vec<(&'a str, Bound<'a>)>,
}

impl<'a> Row<'a> {
    fn bind(mut self, var: Option<&'a str>, value: Bound<'a>) -> Self {
        if let Some(var) = var {
            self.bindings.push((var, value));
        }
        self
    }

    fn get(&self, var: &str) -> Option<Bound<'a>> {
        self.bindings
            .iter()
            .find(|(name, _)| *name == var)
            .map(|(_, bound)| *bound)
    }
}

/// Node or relationship pattern with every parameter substituted.
struct ResolvedNode<'p> {
    pattern: &'p NodePattern,
    properties: PropertyMap,
}

impl ResolvedNode<'_> {
    fn accepts(&self, node: &Node) -> bool {
        self.pattern.labels.iter().all(|l| node.has_label(l))
            && node.properties.matches_query(&self.properties)
    }
}

struct ResolvedRel<'p> {
    pattern: &'p RelPattern,
    properties: PropertyMap,
}

impl ResolvedRel<'_> {
    fn accepts(&self, rel: &Relationship) -> bool {
        self.pattern
            .rel_type
            .as_deref()
            .map_or(true, |t| rel.rel_type == t)
            && rel.properties.matches_query(&self.properties)
    }
}

struct Filter<'s> {
    var: &'s str,
    key: &'s str,
    value: PropertyValue,
}

fn resolve(operand: &Operand, params: &Params) -> Result<PropertyValue> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Param(name) => params
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::query_syntax(format!("missing parameter ${name}"))),
    }
}

fn resolve_map(entries: &[(String, Operand)], params: &Params) -> Result<PropertyMap> {
    entries
        .iter()
        .map(|(key, operand)| Ok((key.clone(), resolve(operand, params)?)))
        .collect()
}

/// Run `statement` against `store`.
///
/// Parameters are resolved before any matching, so a missing parameter fails
/// even when nothing would match.
pub(crate) fn execute(store: &GraphStore, statement: &Statement, params: &Params) -> Result<Vec<Record>> {
    let filters = statement
        .conditions
        .iter()
        .map(|c| {
            Ok(Filter {
                var: &c.var,
                key: &c.key,
                value: resolve(&c.value, params)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = match &statement.pattern {
        None => vec![Row::default()],
        Some(pattern) => {
            let start = ResolvedNode {
                properties: resolve_map(&pattern.start.properties, params)?,
                pattern: &pattern.start,
            };
            let hop = match &pattern.hop {
                Some((rel, end)) => Some((
                    ResolvedRel {
                        properties: resolve_map(&rel.properties, params)?,
                        pattern: rel,
                    },
                    ResolvedNode {
                        properties: resolve_map(&end.properties, params)?,
                        pattern: end,
                    },
                )),
                None => None,
            };
            match_pattern(store, &start, hop.as_ref())?
        }
    };

    let rows: Vec<Row<'_>> = rows
        .into_iter()
        .filter(|row| filters.iter().all(|f| satisfies(row, f)))
        .collect();
    trace!("Pattern matched {} rows", rows.len());

    let columns: Vec<String> = statement.columns().into_iter().map(String::from).collect();
    let aggregate = statement.projections.iter().any(|p| p.expr.is_aggregate());

    if aggregate {
        if statement.limit == Some(0) {
            return Ok(Vec::new());
        }
        let values = statement
            .projections
            .iter()
            .map(|p| match &p.expr {
                Expr::Count(None) => Value::Int(rows.len() as i64),
                Expr::Count(Some(var)) => {
                    Value::Int(rows.iter().filter(|row| row.get(var).is_some()).count() as i64)
                }
                // validated at parse time: aggregates are never mixed
                _ => Value::Null,
            })
            .collect();
        return Ok(vec![Record::new(columns, values)]);
    }

    let limit = statement.limit.unwrap_or(usize::MAX);
    rows.iter()
        .take(limit)
        .map(|row| {
            let values = statement
                .projections
                .iter()
                .map(|p| evaluate(&p.expr, row, params))
                .collect::<Result<Vec<_>>>()?;
            Ok(Record::new(columns.clone(), values))
        })
        .collect()
}

fn start_candidates<'a>(store: &'a GraphStore, start: &ResolvedNode<'_>) -> Vec<&'a Node> {
    match start.pattern.labels.first() {
        Some(first) => store
            .find_nodes(first, &PropertyMap::new())
            .into_iter()
            .filter(|n| start.accepts(n))
            .collect(),
        None => store.nodes().into_iter().filter(|n| start.accepts(n)).collect(),
    }
}

fn match_pattern<'a, 'p>(
    store: &'a GraphStore,
    start: &ResolvedNode<'p>,
    hop: Option<&(ResolvedRel<'p>, ResolvedNode<'p>)>,
) -> Result<Vec<Row<'a>>>
where
    'p: 'a,
{
    let start_var = start.pattern.var.as_deref();
    let mut rows = Vec::new();

    for node in start_candidates(store, start) {
        let row = Row::default().bind(start_var, Bound::Node(node));

        let Some((rel_pattern, end)) = hop else {
            rows.push(row);
            continue;
        };

        let candidates = match rel_pattern.pattern.direction {
            PatternDirection::Outgoing => store.outgoing(node.identity),
            PatternDirection::Incoming => store.incoming(node.identity),
            PatternDirection::Either => store.find_node_relationships(node.identity),
        };

        for rel in candidates.into_iter().filter(|r| rel_pattern.accepts(r)) {
            let other_id = if rel.start_node_id == node.identity {
                rel.end_node_id
            } else {
                rel.start_node_id
            };
            let other = store.get_node(other_id)?;
            if !end.accepts(other) {
                continue;
            }

            let end_var = end.pattern.var.as_deref();
            if end_var.is_some() && end_var == start_var && other.identity != node.identity {
                continue;
            }

            let mut row = row
                .clone()
                .bind(rel_pattern.pattern.var.as_deref(), Bound::Relationship(rel));
            if end_var != start_var {
                row = row.bind(end_var, Bound::Node(other));
            }
            rows.push(row);
        }
    }

    Ok(rows)
}

fn property<'a>(bound: Bound<'a>, key: &str) -> Option<&'a PropertyValue> {
    match bound {
        Bound::Node(n) => n.get_property(key),
        Bound::Relationship(r) => r.get_property(key),
    }
}

// `x = null` never holds, even for a missing property
fn satisfies(row: &Row<'_>, filter: &Filter<'_>) -> bool {
    row.get(filter.var)
        .and_then(|bound| property(bound, filter.key))
        .is_some_and(|v| v.query_eq(&filter.value))
}

fn evaluate(expr: &Expr, row: &Row<'_>, params: &Params) -> Result<Value> {
    let bound = |var: &str| {
        row.get(var)
            .ok_or_else(|| GraphError::query_syntax(format!("unknown variable `{var}`")))
    };

    Ok(match expr {
        Expr::Operand(operand) => Value::from(resolve(operand, params)?),
        Expr::Var(var) => match bound(var)? {
            Bound::Node(n) => Value::Node(n.clone()),
            Bound::Relationship(r) => Value::Relationship(r.clone()),
        },
        Expr::Property(var, key) => property(bound(var)?, key)
            .cloned()
            .map(Value::from)
            .unwrap_or(Value::Null),
        Expr::Id(var) => match bound(var)? {
            Bound::Node(n) => Value::Int(n.identity as i64),
            Bound::Relationship(r) => Value::Int(r.identity as i64),
        },
        Expr::Labels(var) => match bound(var)? {
            Bound::Node(n) => Value::List(n.labels.iter().cloned().map(Value::String).collect()),
            Bound::Relationship(_) => Value::Null,
        },
        Expr::Type(var) => match bound(var)? {
            Bound::Relationship(r) => Value::String(r.rel_type.clone()),
            Bound::Node(_) => Value::Null,
        },
        Expr::Count(_) => Value::Null,
    })
}
