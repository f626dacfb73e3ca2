pub mod authorizer;
pub mod callback;
pub mod config;
pub mod crypto;
pub mod grant_helpers;
pub mod http_client;
pub mod memory;
pub mod oauth_client;
pub mod token;
pub mod token_store;
pub mod types;
