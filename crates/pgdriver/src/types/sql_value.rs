//! Positional query arguments.
//!
//! Queries take an ordered slice of [`SqlValue`]s; the n-th value is bound to
//! the `$n` placeholder of the query text. Every variant is nullable and keeps
//! its SQL type when null, so `None::<i32>` still binds as an `int4` parameter.

use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{
    BigInt, Bool, Bytea, Double, Float, Integer, Jsonb, Nullable, SmallInt, Text, Uuid,
};
use serde::{Deserialize, Serialize};

/// A raw SQL query with its arguments bound, ready to run on a connection.
pub(crate) type BoundQuery<'a> = BoxedSqlQuery<'a, Pg, SqlQuery>;

/// A single positional argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    /// `bool`
    Bool(Option<bool>),
    /// `int2`
    SmallInt(Option<i16>),
    /// `int4`
    Int(Option<i32>),
    /// `int8`
    BigInt(Option<i64>),
    /// `float4`
    Float(Option<f32>),
    /// `float8`
    Double(Option<f64>),
    /// `text`
    Text(Option<String>),
    /// `bytea`
    Bytes(Option<Vec<u8>>),
    /// `uuid`
    Uuid(Option<uuid::Uuid>),
    /// `jsonb`
    Json(Option<serde_json::Value>),
}

impl SqlValue {
    /// Returns whether this argument binds SQL `NULL`.
    pub fn is_null(&self) -> bool {
        match self {
            SqlValue::Bool(v) => v.is_none(),
            SqlValue::SmallInt(v) => v.is_none(),
            SqlValue::Int(v) => v.is_none(),
            SqlValue::BigInt(v) => v.is_none(),
            SqlValue::Float(v) => v.is_none(),
            SqlValue::Double(v) => v.is_none(),
            SqlValue::Text(v) => v.is_none(),
            SqlValue::Bytes(v) => v.is_none(),
            SqlValue::Uuid(v) => v.is_none(),
            SqlValue::Json(v) => v.is_none(),
        }
    }

    /// Returns the PostgreSQL type name the argument is sent as.
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Bool(_) => "bool",
            SqlValue::SmallInt(_) => "int2",
            SqlValue::Int(_) => "int4",
            SqlValue::BigInt(_) => "int8",
            SqlValue::Float(_) => "float4",
            SqlValue::Double(_) => "float8",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytea",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Json(_) => "jsonb",
        }
    }

    fn bind_to<'a>(&self, query: BoundQuery<'a>) -> BoundQuery<'a> {
        match self.clone() {
            SqlValue::Bool(v) => query.bind::<Nullable<Bool>, _>(v),
            SqlValue::SmallInt(v) => query.bind::<Nullable<SmallInt>, _>(v),
            SqlValue::Int(v) => query.bind::<Nullable<Integer>, _>(v),
            SqlValue::BigInt(v) => query.bind::<Nullable<BigInt>, _>(v),
            SqlValue::Float(v) => query.bind::<Nullable<Float>, _>(v),
            SqlValue::Double(v) => query.bind::<Nullable<Double>, _>(v),
            SqlValue::Text(v) => query.bind::<Nullable<Text>, _>(v),
            SqlValue::Bytes(v) => query.bind::<Nullable<Bytea>, _>(v),
            SqlValue::Uuid(v) => query.bind::<Nullable<Uuid>, _>(v),
            SqlValue::Json(v) => query.bind::<Nullable<Jsonb>, _>(v),
        }
    }
}

/// Builds a raw query from `sql` and binds `args` to its placeholders in order.
pub(crate) fn bind_query<'a>(sql: impl Into<String>, args: &[SqlValue]) -> BoundQuery<'a> {
    let query = diesel::sql_query(sql).into_boxed::<Pg>();
    args.iter().fold(query, |query, arg| arg.bind_to(query))
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                #[inline]
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(Some(value))
                }
            }

            impl From<Option<$ty>> for SqlValue {
                #[inline]
                fn from(value: Option<$ty>) -> Self {
                    SqlValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    uuid::Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<&str> for SqlValue {
    #[inline]
    fn from(value: &str) -> Self {
        SqlValue::Text(Some(value.to_owned()))
    }
}

impl From<Option<&str>> for SqlValue {
    #[inline]
    fn from(value: Option<&str>) -> Self {
        SqlValue::Text(value.map(str::to_owned))
    }
}

impl From<&[u8]> for SqlValue {
    #[inline]
    fn from(value: &[u8]) -> Self {
        SqlValue::Bytes(Some(value.to_vec()))
    }
}

/// Builds a `Vec<SqlValue>` from a list of convertible expressions.
///
/// ```rust
/// use pgdriver::{SqlValue, sql_args};
///
/// let args = sql_args![42, "name", None::<i64>];
/// assert_eq!(args[0], SqlValue::Int(Some(42)));
/// assert!(args[2].is_null());
/// ```
#[macro_export]
macro_rules! sql_args {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::SqlValue::from($value)),+]
    };
}
