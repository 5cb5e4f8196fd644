//! # campus-thrift
//!
//! Core of a campus resale marketplace: points, listings and buyer/seller chat.
//!
//! ## Architecture
//!
//! ```text
//! CLI → Marketplace → {PointsLedger, ItemLifecycle, ChatRegistry} → Store
//!                                   ↘ RealtimeNotifier → SessionHub
//! ```
//!
//! Every entity row carries a version. Services load, apply a pure transition
//! from [`domain`], and write back only if nobody else wrote in between,
//! retrying a bounded number of times.
//!
//! ## Quick Start
//!
//! ```bash
//! campus-thrift user add maya
//! campus-thrift item add --seller maya "Desk lamp" 15 --original 30
//! campus-thrift item list
//! campus-thrift chat open --user leo 1 --message "Still available?"
//! campus-thrift trade complete 1 --buyer leo
//! ```

/// Application context, clock and error types.
///
/// [`AppContext`](app::AppContext) wires the services against one store.
pub mod app;

/// Buyer/seller conversations keyed by user pair and item.
pub mod chat;

/// Command-line interface using clap.
pub mod cli;

/// Loads `~/.config/campus-thrift/config.toml`: points economy, boost
/// pricing, chat limits and store retries.
pub mod config;

/// Core domain models and their pure state transitions.
///
/// - [`User`](domain::User): account with points balance
/// - [`Item`](domain::Item): listing with boost, hearts and sale state
/// - [`ChatThread`](domain::ChatThread): message log with unread counters
pub mod domain;

/// Points credits and debits.
pub mod ledger;

/// Listing transitions: boost, heart, view, sell, withdraw.
pub mod lifecycle;

/// Multi-entity flows: paid boost, trade completion, starting a chat.
pub mod market;

/// Best-effort realtime notifications.
pub mod notifier;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait with versioned compare-and-swap updates
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
