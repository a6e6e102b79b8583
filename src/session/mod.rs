mod manager;

pub use manager::{ManagerState, SessionManager};
