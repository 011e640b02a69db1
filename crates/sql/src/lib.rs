#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod default_impl;
mod resource;
mod traits;
mod types;

pub use self::default_impl::{ConnectOptions, SqlDefault};
pub use self::resource::Connection;
pub use self::traits::{Backend, FromEnv, FutureResult};
pub use self::types::{DataType, Field, Row};
