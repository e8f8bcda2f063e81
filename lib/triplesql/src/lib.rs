#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

pub mod error;
pub mod results;
pub mod store;

pub mod model {
    pub use triplesql_model::*;
}

pub mod compiler {
    pub use triplesql_common::{
        BlankNodeMatchingMode, CastPolicy, CompilerOptions, NodeLoader, NodeResolver, SqlDialect,
    };
    pub use triplesql_engine::*;
}

pub mod sparql {
    pub use triplesql_engine::sparql::*;
}

pub mod storage {
    pub use triplesql_storage::*;
}
