//! Names of the tables and columns the compiled SQL reads.
//!
//! ```text
//! triples(id, subject_id, predicate_id, object_id, context_id, deleted)
//! nodes(id, node_kind, uri, content, int_content, double_content, date_content, anon_id,
//!       content_hash, language, datatype)
//! ```
//!
//! `context_id` is `NULL` for triples of the default graph.

use triplesql_model::algebra::QuadPosition;

pub const TRIPLES_TABLE: &str = "triples";
pub const NODES_TABLE: &str = "nodes";

pub const TRIPLE_ID: &str = "id";
pub const SUBJECT_ID: &str = "subject_id";
pub const PREDICATE_ID: &str = "predicate_id";
pub const OBJECT_ID: &str = "object_id";
pub const CONTEXT_ID: &str = "context_id";
pub const DELETED: &str = "deleted";

/// The triple-table column holding the node id of `position`.
pub const fn quad_column(position: QuadPosition) -> &'static str {
    match position {
        QuadPosition::Subject => SUBJECT_ID,
        QuadPosition::Predicate => PREDICATE_ID,
        QuadPosition::Object => OBJECT_ID,
        QuadPosition::Context => CONTEXT_ID,
    }
}

/// The columns of the node table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeColumn {
    Id,
    Kind,
    Uri,
    Content,
    IntContent,
    DoubleContent,
    DateContent,
    AnonId,
    ContentHash,
    Language,
    Datatype,
}

impl NodeColumn {
    pub const ALL: [NodeColumn; 11] = [
        Self::Id,
        Self::Kind,
        Self::Uri,
        Self::Content,
        Self::IntContent,
        Self::DoubleContent,
        Self::DateContent,
        Self::AnonId,
        Self::ContentHash,
        Self::Language,
        Self::Datatype,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Kind => "node_kind",
            Self::Uri => "uri",
            Self::Content => "content",
            Self::IntContent => "int_content",
            Self::DoubleContent => "double_content",
            Self::DateContent => "date_content",
            Self::AnonId => "anon_id",
            Self::ContentHash => "content_hash",
            Self::Language => "language",
            Self::Datatype => "datatype",
        }
    }
}
