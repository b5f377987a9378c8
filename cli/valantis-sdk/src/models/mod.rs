pub mod controls;
pub mod filter_input;
pub mod pagination;
pub mod pipeline;
pub mod session;
