pub mod controller;
pub mod state;

pub use controller::GenerationSession;
pub use state::SessionState;
