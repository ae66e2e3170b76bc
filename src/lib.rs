pub mod assemble;
pub mod config;
pub mod export;
pub mod fetch;
pub mod filters;
pub mod http_cache;
pub mod http_client;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod provider;
pub mod sportradar;
pub mod state;
pub mod table;
pub mod time_sort;
