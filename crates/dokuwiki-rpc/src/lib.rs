//! Rust client for DokuWiki's JSON-RPC API.

mod client;
pub mod error;
pub mod models;
mod resources;

pub use client::{Client, ClientBuilder, Credentials};
pub use error::RpcError;
pub use resources::{MediaResource, PagesResource};
