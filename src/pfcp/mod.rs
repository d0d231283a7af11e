pub mod types;
pub mod header;
pub mod ie;
pub mod pfd;
pub mod messages;

pub use types::*;
pub use header::*;
pub use messages::*;
