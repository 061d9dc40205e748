pub mod lead;
pub mod service;
pub mod session;
