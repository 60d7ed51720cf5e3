//! Request middleware for the panel API.
pub mod auth;

pub use auth::{
    extract_api_key, generate_key, hash_token, ApiKey, ApiKeyStore, AuthContext, AuthError, AuthLayer, Authenticator,
};
