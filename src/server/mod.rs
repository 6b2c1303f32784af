mod app;
mod state;

pub use app::{create_app, create_consumer_app};
pub use state::AppState;
