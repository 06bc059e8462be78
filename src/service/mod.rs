pub mod proto;
pub mod indexer;
pub mod stdio;
