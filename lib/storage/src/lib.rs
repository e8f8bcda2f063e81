#![doc(test(attr(deny(warnings))))]

//! An in-memory store with the triple and node tables of
//! [`triplesql_common::schema`], queried through [DataFusion](https://datafusion.apache.org/).

mod executor;
mod node_table;
mod storage;
mod triple_table;

pub use executor::DataFusionExecutor;
pub use node_table::{MemNodeTable, NODES_SCHEMA};
pub use storage::MemStorage;
pub use triple_table::{EncodedTriple, MemTripleTable, TRIPLES_SCHEMA};
