// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph store trait: labeled nodes, typed relationships, and per-label
//! cosine vector indexes over the `embedding` property.

use async_trait::async_trait;

use crate::error::EirError;
use crate::types::{
    EdgeSpec, HybridHit, NodeChange, NodeKind, NodeProperties, NodeRef, QueryRow, StructuralQuery,
    VectorHit,
};

/// Maximum rows returned by structural and raw queries.
pub const QUERY_ROW_CAP: usize = 20;

/// A transactional store of labeled nodes and typed relationships.
///
/// Implementations enforce the store-level invariants: `(kind, name)`
/// uniqueness, edge-endpoint existence, cascade delete on node removal,
/// and the exclusion of embedding-less nodes from vector queries.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Inserts a node and returns its graph-assigned id.
    ///
    /// When `belongs_to` is non-empty, one `BELONGS_TO` edge per parent
    /// is created atomically with the node. Fails with
    /// [`EirError::DuplicateName`] when `(kind, name)` already exists.
    async fn create_node(
        &self,
        kind: NodeKind,
        props: NodeProperties,
        belongs_to: &[NodeRef],
    ) -> Result<i64, EirError>;

    /// Writes the `embedding` property of an existing node.
    async fn set_embedding(
        &self,
        kind: NodeKind,
        id: i64,
        embedding: &[f32],
    ) -> Result<(), EirError>;

    /// Creates the cross-product of edges described by `spec`; returns
    /// the id of the last created edge.
    async fn create_edge(&self, spec: EdgeSpec) -> Result<i64, EirError>;

    /// Applies a mutation to an existing node. Deleting detaches all
    /// incident edges.
    async fn alter(&self, kind: NodeKind, id: i64, change: NodeChange) -> Result<(), EirError>;

    /// Runs a structural match/where/return query, capped at
    /// [`QUERY_ROW_CAP`] rows.
    async fn structural_query(&self, query: StructuralQuery) -> Result<Vec<QueryRow>, EirError>;

    /// Returns the top-`k` nodes of `kind` by cosine similarity to
    /// `query_vec`, scores descending, ties broken by ascending id.
    /// Only nodes with an embedding are returned.
    async fn vector_query(
        &self,
        kind: NodeKind,
        query_vec: &[f32],
        k: usize,
        min_score: f32,
    ) -> Result<Vec<VectorHit>, EirError>;

    /// Ranks `src_kind` nodes by similarity to `query_vec`, then joins
    /// each through `relationship` to `dst_kind` targets.
    async fn hybrid_query(
        &self,
        src_kind: NodeKind,
        query_vec: &[f32],
        relationship: &str,
        dst_kind: NodeKind,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<HybridHit>, EirError>;

    /// Escape hatch: runs a raw query string, capped at
    /// [`QUERY_ROW_CAP`] rows.
    async fn raw_query(&self, query: &str) -> Result<Vec<QueryRow>, EirError>;

    /// Idempotently creates uniqueness constraints on `(kind, name)`,
    /// scalar indexes on `name`, and cosine vector indexes of the
    /// store's configured dimension for every node kind.
    async fn schema_init(&self) -> Result<(), EirError>;

    /// The embedding dimension the store was configured with.
    fn dimension(&self) -> usize;
}
