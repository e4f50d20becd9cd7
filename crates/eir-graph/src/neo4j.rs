// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Neo4j-backed [`GraphStore`] implementation.
//!
//! Vector operations run through a fallback chain: the native vector
//! index first, then an in-Cypher cosine scan over embedded nodes, and
//! finally an unscored scan with a placeholder score. Each degradation
//! is logged.

use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use tracing::{debug, info, warn};

use eir_core::traits::graph::{GraphStore, QUERY_ROW_CAP};
use eir_core::types::{
    EdgeSpec, HybridHit, NodeChange, NodeKind, NodeProperties, NodeRef, NodeSummary, QueryRow,
    ScalarValue, StructuralQuery, VectorHit,
};
use eir_core::EirError;

use crate::cypher::{checked_identifier, to_f64, valid_identifier, vector_index_name};

/// Connection settings for [`Neo4jGraphStore::connect`].
#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

/// Neo4j implementation of the graph store contract.
pub struct Neo4jGraphStore {
    graph: Graph,
    dimension: usize,
}

impl Neo4jGraphStore {
    /// Connects to Neo4j and verifies the connection with a probe query.
    pub async fn connect(settings: Neo4jSettings, dimension: usize) -> Result<Self, EirError> {
        let mut builder = ConfigBuilder::default()
            .uri(&settings.url)
            .user(&settings.user)
            .password(&settings.password);
        if let Some(db) = &settings.database {
            builder = builder.db(db.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| EirError::Config(format!("failed to build Neo4j config: {e}")))?;

        let graph = Graph::connect(config).await.map_err(|e| EirError::Graph {
            message: format!("failed to connect to Neo4j at {}", settings.url),
            source: Some(Box::new(e)),
        })?;

        // Probe the connection before handing the store out.
        graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| EirError::Graph {
                message: "Neo4j connection probe failed".into(),
                source: Some(Box::new(e)),
            })?;

        info!(url = %settings.url, "connected to Neo4j");
        Ok(Self { graph, dimension })
    }

    async fn collect_rows(&self, q: Query, cap: usize) -> Result<Vec<QueryRow>, EirError> {
        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(graph_err)? {
            let map: BTreeMap<String, serde_json::Value> =
                row.to().map_err(|e| EirError::Graph {
                    message: format!("failed to map result row: {e}"),
                    source: Some(Box::new(e)),
                })?;
            rows.push(map);
            if rows.len() >= cap {
                break;
            }
        }
        Ok(rows)
    }

    async fn find_node_id(&self, kind: NodeKind, name: &str) -> Result<Option<i64>, EirError> {
        let q = query(&format!(
            "MATCH (n:{kind} {{name: $name}}) RETURN id(n) AS id"
        ))
        .param("name", name);
        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        match stream.next().await.map_err(graph_err)? {
            Some(row) => Ok(Some(row.get::<i64>("id").map_err(|e| EirError::Graph {
                message: format!("failed to read node id: {e}"),
                source: Some(Box::new(e)),
            })?)),
            None => Ok(None),
        }
    }

    fn bind_scalar(q: Query, key: &str, value: &ScalarValue) -> Query {
        match value {
            ScalarValue::Bool(b) => q.param(key, *b),
            ScalarValue::Integer(i) => q.param(key, *i),
            ScalarValue::Float(f) => q.param(key, *f),
            ScalarValue::String(s) => q.param(key, s.as_str()),
        }
    }

    // --- vector strategies ---

    async fn vector_query_index(
        &self,
        kind: NodeKind,
        query_vec: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<VectorHit>, EirError> {
        let q = query(
            "CALL db.index.vector.queryNodes($index, $k, $embedding) \
             YIELD node, score \
             WHERE score >= $min_score \
             RETURN id(node) AS id, node.name AS name, \
                    coalesce(node.description, '') AS description, score \
             ORDER BY score DESC, id ASC",
        )
        .param("index", vector_index_name(kind).as_str())
        .param("k", k as i64)
        .param("embedding", to_f64(query_vec))
        .param("min_score", min_score as f64);

        self.collect_vector_hits(q).await
    }

    async fn vector_query_scan(
        &self,
        kind: NodeKind,
        query_vec: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<VectorHit>, EirError> {
        let q = query(&format!(
            "MATCH (n:{kind}) \
             WHERE n.embedding IS NOT NULL \
             WITH n, vector.similarity.cosine(n.embedding, $embedding) AS score \
             WHERE score >= $min_score \
             RETURN id(n) AS id, n.name AS name, \
                    coalesce(n.description, '') AS description, score \
             ORDER BY score DESC, id ASC \
             LIMIT $k"
        ))
        .param("embedding", to_f64(query_vec))
        .param("min_score", min_score as f64)
        .param("k", k as i64);

        self.collect_vector_hits(q).await
    }

    async fn vector_query_unscored(
        &self,
        kind: NodeKind,
        k: usize,
    ) -> Result<Vec<VectorHit>, EirError> {
        let q = query(&format!(
            "MATCH (n:{kind}) \
             WHERE n.embedding IS NOT NULL \
             RETURN id(n) AS id, n.name AS name, \
                    coalesce(n.description, '') AS description, 1.0 AS score \
             ORDER BY id ASC \
             LIMIT $k"
        ))
        .param("k", k as i64);

        self.collect_vector_hits(q).await
    }

    async fn collect_vector_hits(&self, q: Query) -> Result<Vec<VectorHit>, EirError> {
        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        let mut hits = Vec::new();
        while let Some(row) = stream.next().await.map_err(graph_err)? {
            hits.push(VectorHit {
                id: row.get("id").unwrap_or_default(),
                name: row.get("name").unwrap_or_default(),
                description: row.get("description").unwrap_or_default(),
                score: (row.get::<f64>("score").unwrap_or(0.0) as f32).clamp(0.0, 1.0),
            });
        }
        Ok(hits)
    }

    async fn hybrid_query_index(
        &self,
        src_kind: NodeKind,
        query_vec: &[f32],
        relationship: &str,
        dst_kind: NodeKind,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<HybridHit>, EirError> {
        let q = query(&format!(
            "CALL db.index.vector.queryNodes($index, $k, $embedding) \
             YIELD node, score \
             WHERE score >= $min_score \
             MATCH (node)-[r:{relationship}]-(t:{dst_kind}) \
             RETURN id(node) AS src_id, node.name AS src_name, \
                    coalesce(node.description, '') AS src_description, \
                    id(t) AS dst_id, t.name AS dst_name, \
                    coalesce(t.description, '') AS dst_description, score \
             ORDER BY score DESC, src_id ASC, dst_id ASC"
        ))
        .param("index", vector_index_name(src_kind).as_str())
        .param("k", k as i64)
        .param("embedding", to_f64(query_vec))
        .param("min_score", min_score as f64);

        self.collect_hybrid_hits(q, relationship).await
    }

    async fn hybrid_query_scan(
        &self,
        src_kind: NodeKind,
        query_vec: &[f32],
        relationship: &str,
        dst_kind: NodeKind,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<HybridHit>, EirError> {
        let q = query(&format!(
            "MATCH (n:{src_kind}) \
             WHERE n.embedding IS NOT NULL \
             WITH n, vector.similarity.cosine(n.embedding, $embedding) AS score \
             WHERE score >= $min_score \
             ORDER BY score DESC, id(n) ASC \
             LIMIT $k \
             MATCH (n)-[r:{relationship}]-(t:{dst_kind}) \
             RETURN id(n) AS src_id, n.name AS src_name, \
                    coalesce(n.description, '') AS src_description, \
                    id(t) AS dst_id, t.name AS dst_name, \
                    coalesce(t.description, '') AS dst_description, score \
             ORDER BY score DESC, src_id ASC, dst_id ASC"
        ))
        .param("embedding", to_f64(query_vec))
        .param("min_score", min_score as f64)
        .param("k", k as i64);

        self.collect_hybrid_hits(q, relationship).await
    }

    async fn hybrid_query_unscored(
        &self,
        src_kind: NodeKind,
        relationship: &str,
        dst_kind: NodeKind,
        k: usize,
    ) -> Result<Vec<HybridHit>, EirError> {
        let q = query(&format!(
            "MATCH (n:{src_kind}) \
             WHERE n.embedding IS NOT NULL \
             WITH n ORDER BY id(n) ASC LIMIT $k \
             MATCH (n)-[r:{relationship}]-(t:{dst_kind}) \
             RETURN id(n) AS src_id, n.name AS src_name, \
                    coalesce(n.description, '') AS src_description, \
                    id(t) AS dst_id, t.name AS dst_name, \
                    coalesce(t.description, '') AS dst_description, 1.0 AS score \
             ORDER BY src_id ASC, dst_id ASC"
        ))
        .param("k", k as i64);

        self.collect_hybrid_hits(q, relationship).await
    }

    async fn collect_hybrid_hits(
        &self,
        q: Query,
        relationship: &str,
    ) -> Result<Vec<HybridHit>, EirError> {
        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        let mut hits = Vec::new();
        while let Some(row) = stream.next().await.map_err(graph_err)? {
            hits.push(HybridHit {
                source: NodeSummary {
                    id: row.get("src_id").unwrap_or_default(),
                    name: row.get("src_name").unwrap_or_default(),
                    description: row.get("src_description").unwrap_or_default(),
                },
                relationship: relationship.to_string(),
                target: NodeSummary {
                    id: row.get("dst_id").unwrap_or_default(),
                    name: row.get("dst_name").unwrap_or_default(),
                    description: row.get("dst_description").unwrap_or_default(),
                },
                score: (row.get::<f64>("score").unwrap_or(0.0) as f32).clamp(0.0, 1.0),
            });
        }
        Ok(hits)
    }
}

fn graph_err(e: neo4rs::Error) -> EirError {
    EirError::Graph {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

/// Whether a driver error indicates a uniqueness constraint violation.
fn is_constraint_violation(e: &EirError) -> bool {
    match e {
        EirError::Graph { message, .. } => {
            message.contains("ConstraintValidation") || message.contains("already exists")
        }
        _ => false,
    }
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
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

        // Parents are matched before CREATE so a missing parent leaves
        // nothing behind (edge endpoints must exist at commit time).
        let mut cypher = String::new();
        for (i, parent) in belongs_to.iter().enumerate() {
            cypher.push_str(&format!(
                "MATCH (p{i}:{} {{name: $parent_{i}}})\n",
                parent.kind
            ));
        }
        cypher.push_str(&format!("CREATE (n:{kind})\n"));

        let mut set_parts = vec![
            "n.name = $name".to_string(),
            "n.description = $description".to_string(),
        ];
        if props.summary.is_some() {
            set_parts.push("n.summary = $summary".to_string());
        }
        if props.embedding.is_some() {
            set_parts.push("n.embedding = $embedding".to_string());
        }
        for (i, key) in props.extra.keys().enumerate() {
            checked_identifier(key)?;
            set_parts.push(format!("n.{key} = $extra_{i}"));
        }
        cypher.push_str(&format!("SET {}\n", set_parts.join(", ")));

        for i in 0..belongs_to.len() {
            cypher.push_str(&format!("MERGE (n)-[:BELONGS_TO]->(p{i})\n"));
        }
        cypher.push_str("RETURN id(n) AS id");

        let mut q = query(&cypher)
            .param("name", props.name.as_str())
            .param("description", props.description.as_str());
        if let Some(summary) = &props.summary {
            q = q.param("summary", summary.as_str());
        }
        if let Some(embedding) = &props.embedding {
            q = q.param("embedding", to_f64(embedding));
        }
        for (i, value) in props.extra.values().enumerate() {
            q = Self::bind_scalar(q, &format!("extra_{i}"), value);
        }
        for (i, parent) in belongs_to.iter().enumerate() {
            q = q.param(&format!("parent_{i}"), parent.name.as_str());
        }

        let result = self.graph.execute(q).await.map_err(graph_err);
        let mut stream = match result {
            Ok(stream) => stream,
            Err(e) if is_constraint_violation(&e) => {
                return Err(EirError::DuplicateName {
                    kind,
                    name: props.name,
                });
            }
            Err(e) => return Err(e),
        };

        match stream.next().await.map_err(|e| {
            let mapped = graph_err(e);
            if is_constraint_violation(&mapped) {
                EirError::DuplicateName {
                    kind,
                    name: props.name.clone(),
                }
            } else {
                mapped
            }
        })? {
            Some(row) => Ok(row.get::<i64>("id").unwrap_or_default()),
            None => {
                // MATCH on a parent produced no rows; report the first
                // missing parent by name.
                for parent in belongs_to {
                    if self.find_node_id(parent.kind, &parent.name).await?.is_none() {
                        return Err(EirError::NotFound {
                            kind: parent.kind,
                            key: parent.name.clone(),
                        });
                    }
                }
                Err(EirError::graph("node creation returned no rows"))
            }
        }
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
        let q = query(&format!(
            "MATCH (n:{kind}) WHERE id(n) = $id \
             SET n.embedding = $embedding \
             RETURN id(n) AS id"
        ))
        .param("id", id)
        .param("embedding", to_f64(embedding));

        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        match stream.next().await.map_err(graph_err)? {
            Some(_) => Ok(()),
            None => Err(EirError::NotFound {
                kind,
                key: id.to_string(),
            }),
        }
    }

    async fn create_edge(&self, spec: EdgeSpec) -> Result<i64, EirError> {
        let rel = checked_identifier(&spec.relationship)?;
        let q = query(&format!(
            "UNWIND $srcs AS src_name \
             UNWIND $dsts AS dst_name \
             MATCH (a:{src} {{name: src_name}}), (b:{dst} {{name: dst_name}}) \
             CREATE (a)-[r:{rel} {{description: $description}}]->(b) \
             RETURN id(r) AS id",
            src = spec.src_kind,
            dst = spec.dst_kind,
        ))
        .param("srcs", spec.src_names.clone())
        .param("dsts", spec.dst_names.clone())
        .param("description", spec.description.as_str());

        let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
        let mut last_id = None;
        let mut created = 0usize;
        while let Some(row) = stream.next().await.map_err(graph_err)? {
            last_id = Some(row.get::<i64>("id").unwrap_or_default());
            created += 1;
        }

        let expected = spec.src_names.len() * spec.dst_names.len();
        if created < expected {
            warn!(created, expected, "some edge endpoints did not match");
        }
        last_id.ok_or_else(|| {
            EirError::graph(format!(
                "no edges created: no {}/{} endpoints matched",
                spec.src_kind, spec.dst_kind
            ))
        })
    }

    async fn alter(&self, kind: NodeKind, id: i64, change: NodeChange) -> Result<(), EirError> {
        match change {
            NodeChange::Delete => {
                let q = query(&format!(
                    "MATCH (n:{kind}) WHERE id(n) = $id \
                     DETACH DELETE n \
                     RETURN count(n) AS deleted"
                ))
                .param("id", id);
                let mut stream = self.graph.execute(q).await.map_err(graph_err)?;
                let deleted = match stream.next().await.map_err(graph_err)? {
                    Some(row) => row.get::<i64>("deleted").unwrap_or(0),
                    None => 0,
                };
                if deleted == 0 {
                    return Err(EirError::NotFound {
                        kind,
                        key: id.to_string(),
                    });
                }
                Ok(())
            }
            NodeChange::Update(update) => {
                if let Some(embedding) = &update.embedding {
                    if embedding.len() != self.dimension {
                        return Err(EirError::DimensionMismatch {
                            expected: self.dimension,
                            actual: embedding.len(),
                        });
                    }
                }

                let mut set_parts = Vec::new();
                if update.name.is_some() {
                    set_parts.push("n.name = $name".to_string());
                }
                if update.description.is_some() {
                    set_parts.push("n.description = $description".to_string());
                }
                if update.summary.is_some() {
                    set_parts.push("n.summary = $summary".to_string());
                }
                if update.embedding.is_some() {
                    set_parts.push("n.embedding = $embedding".to_string());
                }
                for (i, key) in update.extra.keys().enumerate() {
                    checked_identifier(key)?;
                    set_parts.push(format!("n.{key} = $extra_{i}"));
                }
                if set_parts.is_empty() {
                    return Err(EirError::InvalidArguments(
                        "update carries no fields".into(),
                    ));
                }

                let mut q = query(&format!(
                    "MATCH (n:{kind}) WHERE id(n) = $id \
                     SET {} \
                     RETURN id(n) AS id",
                    set_parts.join(", ")
                ))
                .param("id", id);
                if let Some(name) = &update.name {
                    q = q.param("name", name.as_str());
                }
                if let Some(description) = &update.description {
                    q = q.param("description", description.as_str());
                }
                if let Some(summary) = &update.summary {
                    q = q.param("summary", summary.as_str());
                }
                if let Some(embedding) = &update.embedding {
                    q = q.param("embedding", to_f64(embedding));
                }
                for (i, value) in update.extra.values().enumerate() {
                    q = Self::bind_scalar(q, &format!("extra_{i}"), value);
                }

                let result = self.graph.execute(q).await.map_err(graph_err);
                let mut stream = match result {
                    Ok(stream) => stream,
                    Err(e) if is_constraint_violation(&e) => {
                        return Err(EirError::DuplicateName {
                            kind,
                            name: update.name.unwrap_or_default(),
                        });
                    }
                    Err(e) => return Err(e),
                };
                match stream.next().await.map_err(graph_err) {
                    Ok(Some(_)) => Ok(()),
                    Ok(None) => Err(EirError::NotFound {
                        kind,
                        key: id.to_string(),
                    }),
                    Err(e) if is_constraint_violation(&e) => Err(EirError::DuplicateName {
                        kind,
                        name: update.name.unwrap_or_default(),
                    }),
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn structural_query(&self, sq: StructuralQuery) -> Result<Vec<QueryRow>, EirError> {
        let mut cypher = format!("MATCH {}", sq.match_clause);
        if let Some(where_clause) = &sq.where_clause {
            cypher.push_str(&format!(" WHERE {where_clause}"));
        }
        cypher.push_str(&format!(
            " RETURN {} LIMIT {QUERY_ROW_CAP}",
            sq.return_clause.as_deref().unwrap_or("*")
        ));
        debug!(cypher = %cypher, "structural query");

        let mut q = query(&cypher);
        for (key, value) in &sq.params {
            q = Self::bind_scalar(q, key, value);
        }
        self.collect_rows(q, QUERY_ROW_CAP).await
    }

    async fn vector_query(
        &self,
        kind: NodeKind,
        query_vec: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<VectorHit>, EirError> {
        match self.vector_query_index(kind, query_vec, k, min_score).await {
            Ok(hits) => return Ok(hits),
            Err(e) => {
                warn!(kind = %kind, error = %e, "vector index query failed, falling back to cosine scan");
            }
        }
        match self.vector_query_scan(kind, query_vec, k, min_score).await {
            Ok(hits) => return Ok(hits),
            Err(e) => {
                warn!(kind = %kind, error = %e, "cosine scan failed, falling back to unscored scan");
            }
        }
        self.vector_query_unscored(kind, k).await
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
        let rel = checked_identifier(relationship)?;

        match self
            .hybrid_query_index(src_kind, query_vec, rel, dst_kind, k, min_score)
            .await
        {
            Ok(hits) => return Ok(hits),
            Err(e) => {
                warn!(src = %src_kind, error = %e, "hybrid index query failed, falling back to cosine scan");
            }
        }
        match self
            .hybrid_query_scan(src_kind, query_vec, rel, dst_kind, k, min_score)
            .await
        {
            Ok(hits) => return Ok(hits),
            Err(e) => {
                warn!(src = %src_kind, error = %e, "hybrid cosine scan failed, falling back to unscored scan");
            }
        }
        self.hybrid_query_unscored(src_kind, rel, dst_kind, k).await
    }

    async fn raw_query(&self, raw: &str) -> Result<Vec<QueryRow>, EirError> {
        debug!(query = raw, "raw query");
        self.collect_rows(query(raw), QUERY_ROW_CAP).await
    }

    async fn schema_init(&self) -> Result<(), EirError> {
        for kind in NodeKind::ALL {
            let label = kind.to_string();
            let lower = label.to_lowercase();
            debug_assert!(valid_identifier(&label));

            let statements = [
                format!(
                    "CREATE CONSTRAINT {lower}_name_unique IF NOT EXISTS \
                     FOR (n:{label}) REQUIRE n.name IS UNIQUE"
                ),
                format!(
                    "CREATE INDEX {lower}_name IF NOT EXISTS \
                     FOR (n:{label}) ON (n.name)"
                ),
                format!(
                    "CREATE VECTOR INDEX {lower}_embedding IF NOT EXISTS \
                     FOR (n:{label}) ON (n.embedding) \
                     OPTIONS {{indexConfig: {{`vector.dimensions`: {dim}, \
                     `vector.similarity_function`: 'cosine'}}}}",
                    dim = self.dimension
                ),
            ];

            for statement in &statements {
                if let Err(e) = self.graph.run(query(statement)).await {
                    // A unique constraint already owns a name index; the
                    // equivalent-schema error here is expected.
                    warn!(kind = %kind, error = %e, "schema statement skipped");
                }
            }
        }
        info!(dimension = self.dimension, "graph schema initialized");
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
