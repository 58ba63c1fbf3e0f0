//! Steam Achievement Aggregation API Library
//!
//! Resolves Steam profiles and joins per-player achievement unlocks with the
//! title's catalog and global rarity, behind a tiered read-through cache.
//!
//! # Modules
//!
//! - `achievements`: Achievement aggregation (unlocks + catalog + rarity).
//! - `audit`: Request history records and sinks.
//! - `cache_store`: TTL key-value store capability and its moka backend.
//! - `cache_validator`: Checksummed cache entries.
//! - `cached_fetch`: Cache tiers, keys and read-through fetchers.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema bootstrap.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Steam wire models and API responses.
//! - `services`: Profile lookups (vanity, owned games, summary).
//! - `steam_client`: Steam Web API client.

pub mod achievements;
pub mod audit;
pub mod cache_store;
pub mod cache_validator;
pub mod cached_fetch;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod steam_client;

#[cfg(test)]
mod test_support;
