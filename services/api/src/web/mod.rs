pub mod documents;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod suggestions;

// Re-export the router and the OpenAPI document so the binaries can build
// the server and the `openapi.json` file from one place.
pub use rest::{router, ApiDoc};
pub use state::AppState;
