//! # scribe-server
//!
//! HTTP API for Scribe: webhook intake, the pending-alert queue, templates and
//! documents, built on axum.
//!
//! ## Example
//!
//! ```rust,no_run
//! use scribe_server::{ScribeServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default().with_data_dir("/var/lib/scribe");
//!     let server = ScribeServer::open(config).unwrap();
//!     server.serve().await.unwrap();
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/api/webhook` | POST | Ingest an alert (JSON or text) |
//! | `/api/alerts/pending` | GET | Alerts waiting for a template |
//! | `/api/alerts` | GET | All alerts, processed included |
//! | `/api/alerts/{id}` | GET, DELETE | Alert detail, dismiss |
//! | `/api/alerts/{id}/process` | POST | Render a document |
//! | `/api/alerts/{id}/preview` | POST | Render without saving |
//! | `/api/templates` | GET, POST | List, create |
//! | `/api/templates/upload` | POST | Create from a multipart file |
//! | `/api/templates/{id}` | GET, PUT, DELETE | Read, update, delete |
//! | `/api/templates/{id}/preview` | POST | Preview against a sample or posted alert |
//! | `/api/documents` | GET, POST | List (`?search=`), create |
//! | `/api/documents/{id}` | GET, PUT, DELETE | Read, update, delete |
//! | `/api/documents/{id}/export` | GET | Download (`?format=text\|html`) |
//! | `/api/health` | GET | Liveness and pending count |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use cli::{Cli, LogFormat};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use extract::JsonBody;
pub use routes::create_router;
pub use server::ScribeServer;
pub use state::AppState;
