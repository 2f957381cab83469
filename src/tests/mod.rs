pub mod common;

mod cache_failure_and_concurrency;
mod token_gateway_routes;
