use crate::{Envelope, Result};
use std::future::Future;

/// Sends one SQL statement to the endpoint and returns its envelope.
///
/// Statement level failures reported by the endpoint must come back inside
/// [`Envelope::error`]. An `Err` is reserved for failures to reach the endpoint or to read its
/// response, and is propagated to the caller untouched.
pub trait Transport: Send {
    fn execute(&mut self, sql: String) -> impl Future<Output = Result<Envelope>> + Send;
}

impl<T: Transport> Transport for &mut T {
    fn execute(&mut self, sql: String) -> impl Future<Output = Result<Envelope>> + Send {
        (**self).execute(sql)
    }
}
