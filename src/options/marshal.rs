//! Marshaling of annotated option structs into [`RequestOptions`].
//!
//! A configuration type declares which bucket each field belongs to by
//! implementing [`MarshalOptions`], usually through [`marshal_options!`](crate::marshal_options).

use super::value::ToValue;
use super::RequestOptions;
use crate::errors::{EncodingError, WireResult};

/// A type whose fields map onto header, param and query buckets.
pub trait MarshalOptions {
    /// Visit every annotated field, in declaration order
    fn marshal(&self, marshaler: &mut Marshaler);
}

/// Collects field values into the three buckets of a [`RequestOptions`].
///
/// Absent values (`None`) are skipped. Within a bucket the last field
/// declared under a name wins.
#[derive(Debug, Default)]
pub struct Marshaler {
    options: RequestOptions,
    error: Option<EncodingError>,
}

impl Marshaler {
    /// Create an empty marshaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a value in the header bucket
    pub fn header<V: ToValue + ?Sized>(&mut self, name: &str, value: &V) -> &mut Self {
        if let Some(value) = value.to_value() {
            match value.to_header(name) {
                Ok(encoded) => {
                    self.options.headers.insert(name.to_string(), encoded);
                }
                Err(e) => {
                    self.error.get_or_insert(e);
                }
            }
        }
        self
    }

    /// Place a value in the param bucket
    pub fn param<V: ToValue + ?Sized>(&mut self, name: &str, value: &V) -> &mut Self {
        if let Some(value) = value.to_value() {
            self.options.params.insert(name.to_string(), value);
        }
        self
    }

    /// Place a value in the query bucket
    pub fn query<V: ToValue + ?Sized>(&mut self, name: &str, value: &V) -> &mut Self {
        if let Some(value) = value.to_value() {
            self.options.query.insert(name.to_string(), value);
        }
        self
    }

    /// Finish marshaling, reporting the first encoding error
    pub fn finish(self) -> WireResult<RequestOptions> {
        match self.error {
            Some(e) => Err(e.into()),
            None => Ok(self.options),
        }
    }
}

/// Marshal an annotated options value into [`RequestOptions`].
pub fn marshal_options<T: MarshalOptions + ?Sized>(opts: &T) -> WireResult<RequestOptions> {
    let mut marshaler = Marshaler::new();
    opts.marshal(&mut marshaler);
    marshaler.finish()
}

/// Implement [`MarshalOptions`] from a field-to-bucket table.
///
/// Each entry names a field and one or more `bucket("name")` targets, where
/// the bucket is `header`, `param` or `query`. Fields left out are ignored.
///
/// ```rust
/// use api_wire::marshal_options;
/// use std::time::Duration;
///
/// struct LogsOptions {
///     follow: Option<bool>,
///     since: Option<Duration>,
///     rack: String,
/// }
///
/// marshal_options!(LogsOptions {
///     follow => query("follow");
///     since => query("since"), header("Since");
///     rack => header("Rack");
/// });
///
/// let opts = LogsOptions { follow: None, since: Some(Duration::from_secs(90)), rack: "dev".into() };
/// let ro = api_wire::options::marshal_options(&opts).unwrap();
/// assert_eq!(ro.querystring(), "since=1m30s");
/// assert_eq!(ro.headers["Since"], "1m30s");
/// ```
#[macro_export]
macro_rules! marshal_options {
    ($ty:ty { $( $field:ident => $( $bucket:ident ( $name:expr ) ),+ );* $(;)? }) => {
        impl $crate::options::MarshalOptions for $ty {
            fn marshal(&self, marshaler: &mut $crate::options::Marshaler) {
                $( $( marshaler.$bucket($name, &self.$field); )+ )*
            }
        }
    };
}
