pub mod auto_refresh;
pub mod token;
pub mod token_cache;
