//! HTTP delivery of wizard submissions to the leads endpoint.

pub mod gateway;
pub mod response;

pub use gateway::HttpLeadsGateway;
pub use response::LeadsResponse;
