//! Closing Guard for accounts and periods.

pub mod guard;
