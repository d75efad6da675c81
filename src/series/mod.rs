//! Date-indexed macro tables and their integration.

pub mod frame;
pub mod integrate;

pub use frame::MacroFrame;
pub use integrate::integrate;
