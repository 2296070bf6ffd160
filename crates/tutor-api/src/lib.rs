//! HTTP API for the voice tutor: document library, page text, assistant
//! turns, and chat history.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::{AppState, DocumentCache, SessionRegistry};
