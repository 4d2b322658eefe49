pub mod env;
pub mod net;
