pub mod api;
pub mod config;
pub mod fetcher;
pub mod handlers;
pub mod humanize;
pub mod links;
pub mod observability;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod store;
pub mod telegram;
