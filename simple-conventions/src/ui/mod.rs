//! Terminal rendering of the convention catalog.

pub mod table;
