// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process graph store.
//!
//! Backs tests and Neo4j-less development runs with the same
//! [`GraphStore`] contract the Neo4j implementation honours: unique
//! `(kind, name)`, endpoint existence at edge creation, cascade delete,
//! and vector queries that only see embedded nodes. Vector scores use
//! the same `(1 + cos) / 2` normalization as Neo4j cosine indexes.
//!
//! Structural queries support the subset of Cypher the rest of EIR
//! emits: a single `(alias:Kind)` match pattern, an optional conjunction
//! of `alias.prop = $param` / `alias.prop = 'literal'` conditions, and a
//! comma list of `alias.prop [AS name]` return items. Raw queries are
//! not supported and return an error.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Mutex;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;

use eir_core::traits::graph::{GraphStore, QUERY_ROW_CAP};
use eir_core::types::{
    EdgeSpec, HybridHit, NodeChange, NodeKind, NodeProperties, NodeRef, NodeSummary, QueryRow,
    ScalarValue, StructuralQuery, VectorHit,
};
use eir_core::EirError;

use crate::score::{cosine_similarity, index_score};

#[derive(Debug, Clone)]
struct StoredNode {
    id: i64,
    kind: NodeKind,
    name: String,
    description: String,
    summary: Option<String>,
    embedding: Option<Vec<f32>>,
    extra: BTreeMap<String, ScalarValue>,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    id: i64,
    source: i64,
    target: i64,
    relationship: String,
    #[allow(dead_code)]
    description: String,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<i64, StoredNode>,
    edges: HashMap<i64, StoredEdge>,
    next_node_id: i64,
    next_edge_id: i64,
    schema_inits: u32,
}

/// HashMap-backed [`GraphStore`] implementation.
pub struct MemoryGraphStore {
    inner: Mutex<Inner>,
    dimension: usize,
}

impl MemoryGraphStore {
    /// Creates an empty store configured for the given embedding dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            dimension,
        }
    }

    /// Number of schema_init calls observed (used to verify idempotence).
    pub fn schema_init_count(&self) -> u32 {
        self.inner.lock().expect("store lock poisoned").schema_inits
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store lock poisoned")
    }
}

impl Inner {
    fn find(&self, kind: NodeKind, name: &str) -> Option<&StoredNode> {
        self.nodes
            .values()
            .find(|n| n.kind == kind && n.name == name)
    }

    fn ranked_hits(
        &self,
        kind: NodeKind,
        query_vec: &[f32],
        min_score: f32,
    ) -> Vec<(i64, f32)> {
        let mut hits: Vec<(i64, f32)> = self
            .nodes
            .values()
            .filter(|n| n.kind == kind)
            .filter_map(|n| {
                let embedding = n.embedding.as_ref()?;
                if embedding.len() != query_vec.len() {
                    return None;
                }
                let score = index_score(cosine_similarity(query_vec, embedding));
                (score >= min_score).then_some((n.id, score))
            })
            .collect();
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn create_node(
        &self,
        kind: NodeKind,
        props: NodeProperties,
        belongs_to: &[NodeRef],
    ) -> Result<i64, EirError> {
        if kind == NodeKind::Knowledge
            && props.summary.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            return Err(EirError::InvalidArguments(
                "Knowledge nodes require a summary".into(),
            ));
        }
        if let Some(embedding) = &props.embedding {
            if embedding.len() != self.dimension {
                return Err(EirError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        let mut inner = self.lock();
        if inner.find(kind, &props.name).is_some() {
            return Err(EirError::DuplicateName {
                kind,
                name: props.name,
            });
        }

        // Resolve every parent before touching state, so a missing
        // parent leaves neither the node nor partial edges behind.
        let mut parent_ids = Vec::with_capacity(belongs_to.len());
        for parent in belongs_to {
            let found = inner.find(parent.kind, &parent.name).ok_or_else(|| {
                EirError::NotFound {
                    kind: parent.kind,
                    key: parent.name.clone(),
                }
            })?;
            parent_ids.push(found.id);
        }

        inner.next_node_id += 1;
        let id = inner.next_node_id;
        inner.nodes.insert(
            id,
            StoredNode {
                id,
                kind,
                name: props.name,
                description: props.description,
                summary: props.summary,
                embedding: props.embedding,
                extra: props.extra,
            },
        );

        for parent_id in parent_ids {
            inner.next_edge_id += 1;
            let edge_id = inner.next_edge_id;
            inner.edges.insert(
                edge_id,
                StoredEdge {
                    id: edge_id,
                    source: id,
                    target: parent_id,
                    relationship: eir_core::BELONGS_TO.to_string(),
                    description: String::new(),
                },
            );
        }

        Ok(id)
    }

    async fn set_embedding(
        &self,
        kind: NodeKind,
        id: i64,
        embedding: &[f32],
    ) -> Result<(), EirError> {
        if embedding.len() != self.dimension {
            return Err(EirError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        let mut inner = self.lock();
        let node = inner
            .nodes
            .get_mut(&id)
            .filter(|n| n.kind == kind)
            .ok_or(EirError::NotFound {
                kind,
                key: id.to_string(),
            })?;
        node.embedding = Some(embedding.to_vec());
        Ok(())
    }

    async fn create_edge(&self, spec: EdgeSpec) -> Result<i64, EirError> {
        let mut inner = self.lock();

        let mut pairs = Vec::new();
        for src_name in &spec.src_names {
            let src = inner
                .find(spec.src_kind, src_name)
                .ok_or_else(|| EirError::NotFound {
                    kind: spec.src_kind,
                    key: src_name.clone(),
                })?;
            for dst_name in &spec.dst_names {
                let dst = inner
                    .find(spec.dst_kind, dst_name)
                    .ok_or_else(|| EirError::NotFound {
                        kind: spec.dst_kind,
                        key: dst_name.clone(),
                    })?;
                pairs.push((src.id, dst.id));
            }
        }
        if pairs.is_empty() {
            return Err(EirError::InvalidArguments(
                "edge creation requires at least one source and target".into(),
            ));
        }

        let mut last_id = 0;
        for (source, target) in pairs {
            inner.next_edge_id += 1;
            last_id = inner.next_edge_id;
            inner.edges.insert(
                last_id,
                StoredEdge {
                    id: last_id,
                    source,
                    target,
                    relationship: spec.relationship.clone(),
                    description: spec.description.clone(),
                },
            );
        }
        Ok(last_id)
    }

    async fn alter(&self, kind: NodeKind, id: i64, change: NodeChange) -> Result<(), EirError> {
        let mut inner = self.lock();
        if !inner.nodes.get(&id).is_some_and(|n| n.kind == kind) {
            return Err(EirError::NotFound {
                kind,
                key: id.to_string(),
            });
        }

        match change {
            NodeChange::Delete => {
                inner.nodes.remove(&id);
                // Cascade: detach every incident edge.
                inner.edges.retain(|_, e| e.source != id && e.target != id);
            }
            NodeChange::Update(update) => {
                if let Some(new_name) = &update.name {
                    let taken = inner
                        .find(kind, new_name)
                        .is_some_and(|other| other.id != id);
                    if taken {
                        return Err(EirError::DuplicateName {
                            kind,
                            name: new_name.clone(),
                        });
                    }
                }
                if let Some(embedding) = &update.embedding {
                    if embedding.len() != self.dimension {
                        return Err(EirError::DimensionMismatch {
                            expected: self.dimension,
                            actual: embedding.len(),
                        });
                    }
                }
                let node = inner.nodes.get_mut(&id).expect("checked above");
                if let Some(name) = update.name {
                    node.name = name;
                }
                if let Some(description) = update.description {
                    node.description = description;
                }
                if let Some(summary) = update.summary {
                    node.summary = Some(summary);
                }
                if let Some(embedding) = update.embedding {
                    node.embedding = Some(embedding);
                }
                for (key, value) in update.extra {
                    node.extra.insert(key, value);
                }
            }
        }
        Ok(())
    }

    async fn structural_query(&self, query: StructuralQuery) -> Result<Vec<QueryRow>, EirError> {
        let (alias, kind) = parse_match_clause(&query.match_clause)?;
        let conditions = parse_where_clause(query.where_clause.as_deref(), &alias, &query.params)?;
        let returns = parse_return_clause(query.return_clause.as_deref(), &alias)?;

        let inner = self.lock();
        let mut rows = Vec::new();
        let mut matched: Vec<&StoredNode> =
            inner.nodes.values().filter(|n| n.kind == kind).collect();
        matched.sort_by_key(|n| n.id);

        for node in matched {
            if !conditions.iter().all(|(prop, value)| {
                node_property(node, prop).as_ref() == Some(value)
            }) {
                continue;
            }
            let mut row = QueryRow::new();
            for (prop, out_name) in &returns {
                row.insert(
                    out_name.clone(),
                    node_property(node, prop).unwrap_or(serde_json::Value::Null),
                );
            }
            rows.push(row);
            if rows.len() >= QUERY_ROW_CAP {
                break;
            }
        }
        Ok(rows)
    }

    async fn vector_query(
        &self,
        kind: NodeKind,
        query_vec: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<VectorHit>, EirError> {
        let inner = self.lock();
        let hits = inner.ranked_hits(kind, query_vec, min_score);
        Ok(hits
            .into_iter()
            .take(k)
            .map(|(id, score)| {
                let node = &inner.nodes[&id];
                VectorHit {
                    id,
                    name: node.name.clone(),
                    description: node.description.clone(),
                    score,
                }
            })
            .collect())
    }

    async fn hybrid_query(
        &self,
        src_kind: NodeKind,
        query_vec: &[f32],
        relationship: &str,
        dst_kind: NodeKind,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<HybridHit>, EirError> {
        let inner = self.lock();
        let sources = inner.ranked_hits(src_kind, query_vec, min_score);

        let mut results = Vec::new();
        for (src_id, score) in sources.into_iter().take(k) {
            let src = &inner.nodes[&src_id];

            // Relationship direction is not significant for joins.
            let mut target_ids: Vec<i64> = inner
                .edges
                .values()
                .filter(|e| e.relationship == relationship)
                .filter_map(|e| {
                    if e.source == src_id {
                        Some(e.target)
                    } else if e.target == src_id {
                        Some(e.source)
                    } else {
                        None
                    }
                })
                .collect();
            target_ids.sort_unstable();
            target_ids.dedup();

            for target_id in target_ids {
                let Some(target) = inner.nodes.get(&target_id) else {
                    continue;
                };
                if target.kind != dst_kind {
                    continue;
                }
                results.push(HybridHit {
                    source: NodeSummary {
                        id: src.id,
                        name: src.name.clone(),
                        description: src.description.clone(),
                    },
                    relationship: relationship.to_string(),
                    target: NodeSummary {
                        id: target.id,
                        name: target.name.clone(),
                        description: target.description.clone(),
                    },
                    score,
                });
            }
        }
        Ok(results)
    }

    async fn raw_query(&self, query: &str) -> Result<Vec<QueryRow>, EirError> {
        debug!(query, "raw query against in-memory store");
        Err(EirError::graph(
            "raw queries require the Neo4j graph store",
        ))
    }

    async fn schema_init(&self) -> Result<(), EirError> {
        // Uniqueness and cascade semantics are structural here; only the
        // call count is recorded so idempotence stays observable.
        self.lock().schema_inits += 1;
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn node_property(node: &StoredNode, prop: &str) -> Option<serde_json::Value> {
    match prop {
        "id" => Some(serde_json::json!(node.id)),
        "name" => Some(serde_json::Value::String(node.name.clone())),
        "description" => Some(serde_json::Value::String(node.description.clone())),
        "summary" => node
            .summary
            .clone()
            .map(serde_json::Value::String),
        other => node.extra.get(other).map(|v| match v {
            ScalarValue::Bool(b) => serde_json::json!(b),
            ScalarValue::Integer(i) => serde_json::json!(i),
            ScalarValue::Float(f) => serde_json::json!(f),
            ScalarValue::String(s) => serde_json::json!(s),
        }),
    }
}

/// Parses `(alias:Kind)` out of a match clause.
fn parse_match_clause(clause: &str) -> Result<(String, NodeKind), EirError> {
    let trimmed = clause.trim().trim_start_matches('(').trim_end_matches(')');
    let (alias, kind_str) = trimmed.split_once(':').ok_or_else(|| {
        EirError::InvalidArguments(format!("unsupported match clause: {clause}"))
    })?;
    let kind = NodeKind::from_str(kind_str.trim()).map_err(|_| {
        EirError::InvalidArguments(format!("unknown node kind in match clause: {kind_str}"))
    })?;
    Ok((alias.trim().to_string(), kind))
}

/// Parses `alias.prop = $param AND ...` conditions into concrete values.
fn parse_where_clause(
    clause: Option<&str>,
    alias: &str,
    params: &BTreeMap<String, ScalarValue>,
) -> Result<Vec<(String, serde_json::Value)>, EirError> {
    let Some(clause) = clause else {
        return Ok(Vec::new());
    };
    let mut conditions = Vec::new();
    for part in clause.split(" AND ") {
        let (lhs, rhs) = part.split_once('=').ok_or_else(|| {
            EirError::InvalidArguments(format!("unsupported where condition: {part}"))
        })?;
        let prop = lhs
            .trim()
            .strip_prefix(&format!("{alias}."))
            .ok_or_else(|| {
                EirError::InvalidArguments(format!("condition must reference {alias}.: {part}"))
            })?
            .to_string();
        let rhs = rhs.trim();
        let value = if let Some(param) = rhs.strip_prefix('$') {
            match params.get(param) {
                Some(ScalarValue::Bool(b)) => serde_json::json!(b),
                Some(ScalarValue::Integer(i)) => serde_json::json!(i),
                Some(ScalarValue::Float(f)) => serde_json::json!(f),
                Some(ScalarValue::String(s)) => serde_json::json!(s),
                None => {
                    return Err(EirError::InvalidArguments(format!(
                        "missing query parameter: {param}"
                    )))
                }
            }
        } else {
            serde_json::Value::String(rhs.trim_matches('\'').to_string())
        };
        conditions.push((prop, value));
    }
    Ok(conditions)
}

/// Parses a `alias.prop [AS name]` comma list; defaults to id, name,
/// description.
fn parse_return_clause(
    clause: Option<&str>,
    alias: &str,
) -> Result<Vec<(String, String)>, EirError> {
    let Some(clause) = clause else {
        return Ok(vec![
            ("id".into(), "id".into()),
            ("name".into(), "name".into()),
            ("description".into(), "description".into()),
        ]);
    };
    let mut returns = Vec::new();
    for item in clause.split(',') {
        let item = item.trim();
        let (expr, out_name) = match item.split_once(" AS ") {
            Some((expr, name)) => (expr.trim(), name.trim().to_string()),
            None => (item, String::new()),
        };
        let prop = if expr == format!("id({alias})") {
            "id".to_string()
        } else {
            expr.strip_prefix(&format!("{alias}."))
                .unwrap_or(expr)
                .to_string()
        };
        let out_name = if out_name.is_empty() {
            prop.clone()
        } else {
            out_name
        };
        returns.push((prop, out_name));
    }
    Ok(returns)
}
