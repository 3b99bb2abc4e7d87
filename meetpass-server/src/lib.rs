//! Single-track meet/pass scheduler server.
//!
//! Loads a corridor of stations, running times and trains, computes the
//! time table, detects segment conflicts under headway and clearance rules,
//! and resolves them with a greedy repair loop or a mixed-integer optimizer.

pub mod domain;
pub mod resolve;
pub mod schedule;
pub mod session;
pub mod web;
