//! HTTP surface
//!
//! - `POST /search` faceted search
//! - `GET /indices` configured indices and their field types
//! - `GET /facets` bucket overview of one index
//! - `PUT|DELETE /indices/:name` create or drop an index in the engine

pub mod routes;
pub mod server;

pub use routes::AppState;
pub use server::ApiServer;
