mod as_value;
mod association;
pub mod codec;
mod database;
mod entity;
mod envelope;
mod error;
pub mod expr;
mod identity;
mod query;
mod record;
mod repository;
mod result;
mod schema;
mod state;
pub mod statement;
mod transport;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context;
pub use as_value::*;
pub use association::*;
pub use codec::{Codec, decode_with, encode_with};
pub use database::*;
pub use entity::*;
pub use envelope::*;
pub use error::*;
pub use expr::Order;
pub use identity::*;
pub use query::*;
pub use record::*;
pub use repository::*;
pub use result::*;
pub use schema::*;
pub use state::*;
pub use statement::*;
pub use transport::*;
pub use util::*;
pub use value::*;
pub use writer::*;
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
