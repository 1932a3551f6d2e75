//! Formcraft kernel library.
//!
//! Form and response repositories over a pluggable [`store::Store`], the
//! access policy, the identity gateway and the HTTP API. The `formcraft`
//! binary wires these together against PostgreSQL.

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod state;
pub mod store;
