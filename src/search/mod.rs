pub mod executor;
pub mod facets;
pub mod results;
