//! Core business logic - the bill scheduling and reconciliation engine, independent of
//! any user interface.

/// Category lookup and resolve-or-create by name
pub mod category;
/// Forward extension of instances as the horizon moves
pub mod horizon;
/// Instance store and regeneration planning
pub mod instance;
/// Budget-wide instance listing with payment annotations
pub mod listing;
/// Partial updates and schedule-change detection
pub mod patch;
/// Paid status, next occurrence, nearby payments, payment recording
pub mod payment;
/// Pure occurrence generator
pub mod schedule;
/// Series reconciliation controller
pub mod series;
