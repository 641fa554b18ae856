pub mod handlers;
pub mod server;

// Re-export commonly used handler functions for convenience
pub use handlers::{ModelOptions, build_model_client, exit_code, load_request_file};
pub use server::{DEFAULT_BODY_LIMIT, LIVENESS_MESSAGE, router};
