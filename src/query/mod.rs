pub mod ast;
pub mod matcher;
