pub mod health;
pub mod state;
pub mod diagnostics;

pub use health::*;
pub use state::*;
pub use diagnostics::*;
