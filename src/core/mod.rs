pub mod errors;
pub mod helpers;
pub mod query_params;
pub mod repo;
pub mod static_server;
