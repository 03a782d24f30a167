//! Loosely typed query arguments and the helpers that bind them.

mod sql_value;

pub(crate) use sql_value::bind_query;
pub use sql_value::SqlValue;
