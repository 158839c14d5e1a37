//! mail-gmail-mcp-rs: Gmail MCP server over stdio
//!
//! This server lets an MCP client search and read a Gmail mailbox via the
//! Gmail REST API. It features status-classified retries with exponential
//! backoff, multi-page search with deduplication, and selective metadata
//! enrichment, behind a stable JSON surface with tagged errors.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with env loading and stdio serving
//! - [`config`]: Environment-driven configuration for token location and retry knobs
//! - [`errors`]: Application error model with HTTP status classification
//! - [`auth`]: Stored OAuth credentials with atomic token refresh
//! - [`retry`]: Bounded exponential-backoff retry for remote calls
//! - [`gmail`]: Gmail REST client and provider wire types
//! - [`codec`]: Message payload body decoding and header extraction
//! - [`search`]: Multi-page search orchestration with enrichment
//! - [`server`]: MCP tool handlers with validation and error shaping
//! - [`models`]: Input/output DTOs and schema-bearing types

mod auth;
mod codec;
mod config;
mod errors;
mod gmail;
mod models;
mod retry;
mod search;
mod server;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use config::ServerConfig;
use gmail::{GmailClient, MailApi};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

/// Application entry point
///
/// Initializes tracing from environment, loads config and stored
/// credentials, and serves the MCP server over stdio. This process expects
/// to be spawned by an MCP client via `stdio` transport; logs go to stderr
/// so stdout stays clean for protocol framing.
///
/// # Environment Variables
///
/// See [`ServerConfig::load_from_env`] for full configuration options. The
/// token file at `GMAIL_MCP_TOKEN_PATH` must already exist; run the OAuth
/// pre-authorization step to create it.
///
/// # Example
///
/// ```no_run
/// GMAIL_MCP_TOKEN_PATH=.token.json cargo run
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::load_from_env()?;
    let tokens = Arc::new(auth::TokenStore::load(&config)?);
    let client: Arc<dyn MailApi> = Arc::new(GmailClient::new(&config, tokens)?);

    let service = server::GmailMcpServer::new(client).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
