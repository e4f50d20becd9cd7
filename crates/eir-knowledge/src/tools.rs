// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The knowledge tools contract layer.
//!
//! [`KnowledgeTools`] is the closed set of operations the workers and
//! the external API consume. It owns the coupling between the graph
//! store and the embedder: names are embedded at creation and rename,
//! search text is embedded before vector queries, and embedding
//! failures degrade to embedding-less nodes rather than failed writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use eir_core::types::{
    EdgeSpec, HybridHit, NodeChange, NodeKind, NodeProperties, NodeRef, NodeUpdate, QueryRow,
    ScalarValue, StructuralQuery, VectorHit,
};
use eir_core::{Embedder, EirError, GraphStore};

/// Default `k` for vector and hybrid search.
pub const DEFAULT_SEARCH_K: usize = 10;
/// Default minimum similarity score for vector and hybrid search.
pub const DEFAULT_MIN_SCORE: f32 = 0.7;

/// Field updates accepted by [`KnowledgeTools::alter`].
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlterFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, ScalarValue>,
}

impl AlterFields {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.summary.is_none()
            && self.extra.is_empty()
    }
}

/// The contract layer over the graph store and embedder.
#[derive(Clone)]
pub struct KnowledgeTools {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
}

impl KnowledgeTools {
    pub fn new(store: Arc<dyn GraphStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// The underlying graph store handle.
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Embeds `text`, treating failure as "no embedding" and logging it.
    async fn embed_optional(&self, text: &str) -> Option<Vec<f32>> {
        match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "embedding generation failed, proceeding without vector");
                None
            }
        }
    }

    /// Creates a node, embedding its name and attaching `BELONGS_TO`
    /// edges to the named parents of the kind's natural parent kind.
    pub async fn create_node(
        &self,
        kind: NodeKind,
        name: &str,
        description: &str,
        summary: Option<String>,
        belongs_to: &[String],
        extra: BTreeMap<String, ScalarValue>,
    ) -> Result<i64, EirError> {
        if name.trim().is_empty() {
            return Err(EirError::InvalidArguments("node name must not be empty".into()));
        }
        if kind == NodeKind::Knowledge
            && summary.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            return Err(EirError::InvalidArguments(
                "Knowledge nodes require a summary".into(),
            ));
        }

        let parents: Vec<NodeRef> = match (belongs_to.is_empty(), kind.parent()) {
            (true, _) => Vec::new(),
            (false, Some(parent_kind)) => belongs_to
                .iter()
                .map(|name| NodeRef {
                    kind: parent_kind,
                    name: name.clone(),
                })
                .collect(),
            (false, None) => {
                return Err(EirError::InvalidArguments(format!(
                    "{kind} nodes cannot belong to a parent"
                )));
            }
        };

        let embedding = self.embed_optional(name).await;
        let props = NodeProperties {
            name: name.to_string(),
            description: description.to_string(),
            summary,
            embedding,
            extra,
        };

        let id = self.store.create_node(kind, props, &parents).await?;
        debug!(kind = %kind, name, id, parents = parents.len(), "node created");
        Ok(id)
    }

    /// Creates the cross-product of edges between the named sources and
    /// targets; returns the id of the last created edge.
    pub async fn create_edge(
        &self,
        src_kind: NodeKind,
        src_names: Vec<String>,
        dst_kind: NodeKind,
        dst_names: Vec<String>,
        relationship: &str,
        description: &str,
    ) -> Result<i64, EirError> {
        if src_names.is_empty() || dst_names.is_empty() {
            return Err(EirError::InvalidArguments(
                "edge creation requires at least one source and target".into(),
            ));
        }
        self.store
            .create_edge(EdgeSpec {
                src_kind,
                src_names,
                dst_kind,
                dst_names,
                relationship: relationship.to_string(),
                description: description.to_string(),
            })
            .await
    }

    /// Mutates or deletes a node. Deletion and field updates are
    /// mutually exclusive; renaming regenerates the name embedding in
    /// the same store call.
    pub async fn alter(
        &self,
        kind: NodeKind,
        id: i64,
        delete: bool,
        fields: Option<AlterFields>,
    ) -> Result<(), EirError> {
        let has_fields = fields.as_ref().is_some_and(|f| !f.is_empty());
        if delete && has_fields {
            return Err(EirError::InvalidArguments(
                "delete and field updates are mutually exclusive".into(),
            ));
        }

        if delete {
            return self.store.alter(kind, id, NodeChange::Delete).await;
        }

        let fields = fields.filter(|f| !f.is_empty()).ok_or_else(|| {
            EirError::InvalidArguments("alter requires delete or at least one field".into())
        })?;

        // Renaming changes what the embedding was derived from.
        let embedding = match &fields.name {
            Some(new_name) => self.embed_optional(new_name).await,
            None => None,
        };

        self.store
            .alter(
                kind,
                id,
                NodeChange::Update(NodeUpdate {
                    name: fields.name,
                    description: fields.description,
                    summary: fields.summary,
                    extra: fields.extra,
                    embedding,
                }),
            )
            .await
    }

    /// Runs a structural query, capped at 20 rows.
    pub async fn structural_search(
        &self,
        match_clause: &str,
        where_clause: Option<String>,
        return_clause: Option<String>,
        params: BTreeMap<String, ScalarValue>,
    ) -> Result<Vec<QueryRow>, EirError> {
        self.store
            .structural_query(StructuralQuery {
                match_clause: match_clause.to_string(),
                where_clause,
                return_clause,
                params,
            })
            .await
    }

    /// Embeds `text` and returns the top-k semantically similar nodes.
    pub async fn vector_search(
        &self,
        kind: NodeKind,
        text: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<VectorHit>, EirError> {
        let query_vec = self.embedder.embed(text).await?;
        self.store.vector_query(kind, &query_vec, k, min_score).await
    }

    /// Embeds `text`, ranks `src_kind` nodes by similarity, and joins
    /// them through `relationship` to `dst_kind` targets.
    pub async fn hybrid_search(
        &self,
        src_kind: NodeKind,
        text: &str,
        relationship: &str,
        dst_kind: NodeKind,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<HybridHit>, EirError> {
        let query_vec = self.embedder.embed(text).await?;
        self.store
            .hybrid_query(src_kind, &query_vec, relationship, dst_kind, k, min_score)
            .await
    }

    /// Escape hatch: runs a raw query, capped at 20 rows.
    pub async fn raw_search(&self, query: &str) -> Result<Vec<QueryRow>, EirError> {
        self.store.raw_query(query).await
    }

    /// Exact-name lookup, returning the node id when present.
    ///
    /// Built on the structural query path so it behaves identically on
    /// every store implementation.
    pub async fn find_by_name(
        &self,
        kind: NodeKind,
        name: &str,
    ) -> Result<Option<i64>, EirError> {
        let mut params = BTreeMap::new();
        params.insert("name".to_string(), ScalarValue::String(name.to_string()));
        let rows = self
            .structural_search(
                &format!("(n:{kind})"),
                Some("n.name = $name".to_string()),
                Some("id(n) AS id".to_string()),
                params,
            )
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(|v| v.as_i64()))
    }
}
