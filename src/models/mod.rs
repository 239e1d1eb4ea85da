// src/models/mod.rs
//
// Records returned verbatim by the AM API. Every payload carries a
// `status` string and most a nullable `message` for soft errors
// (e.g. no data for the period).

pub mod loan;
pub mod payroll;
