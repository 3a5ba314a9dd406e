//! Subscription lifecycle and revenue ledger reconciliation.
//!
//! The engine keeps subscribers, trials and the sales pipeline consistent
//! with the calendar: overdue subscribers go to payment pending, lapsed ones
//! and idle trials become leads, and alerts fire once per condition.
//! Every write goes through a `PersistenceGateway`; `store::Store` is the
//! SQLite implementation.

pub mod alert_subsystem;
pub mod bus;
pub mod clock;
pub mod command;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod event;
pub mod expiration;
pub mod gateway;
pub mod ledger;
pub mod migration_subsystem;
pub mod model;
pub mod operations;
pub mod overdue_subsystem;
pub mod plans;
pub mod scheduler;
pub mod store;
pub mod subsystem;
pub mod trial_subsystem;
pub mod types;
