//! Micro ORM for ad-hoc SQL.
//!
//! Maps the rows of any SELECT onto plain structs, including related objects
//! rebuilt from prefixed column labels, and pages arbitrary statements.
//!
//! # Quick Start
//!
//! ## Declare mapped types
//!
//! ```ignore
//! use rowmap::poco;
//!
//! poco! {
//!     #[derive(Debug, Clone, Default)]
//!     pub struct Money {
//!         pub value: f64,
//!         pub code: String,
//!     }
//! }
//!
//! poco! {
//!     references = [money: Money],
//!     read_only = [created_at],
//!     #[derive(Debug, Clone, Default)]
//!     pub struct Account {
//!         pub id: i64,
//!         pub name: String,
//!         pub created_at: String,
//!     }
//! }
//! ```
//!
//! Member names match column labels ignoring case and underscores, so
//! `UserId`, `userid` and `user_id` all reach `user_id`.
//!
//! ## Fetch
//!
//! ```ignore
//! use rowmap::{Database, params};
//! use rowmap_sql::{Backend, SqlDefault};
//!
//! let db = Database::new(SqlDefault::connect().await?);
//!
//! // related objects from `Relation__Member` labels
//! let account: Account = db
//!     .single("SELECT 4 Id, 'Will' Name, 23.5 Money__Value, 'AUD' Money__Code", params![]?)
//!     .await?;
//!
//! // bare labels the root cannot take go to the one related object that can
//! let accounts: Vec<Account> = db
//!     .fetch("SELECT a.Id, a.Name, m.Value, m.Code FROM accounts a JOIN money m ON m.Id = a.Id", params![]?)
//!     .await?;
//!
//! // several types per row, or several result sets
//! let pairs: Vec<(User, ExtraUserInfo)> = db.fetch_joined(sql, params![]?).await?;
//! let (users, infos) = db
//!     .fetch_multiple::<(User, ExtraUserInfo)>("SELECT * FROM users; SELECT * FROM infos", params![]?)
//!     .await?;
//! ```
//!
//! ## Paging
//!
//! ```ignore
//! let page = db
//!     .page::<User>(2, 5, "SELECT * FROM users WHERE age > ?1 ORDER BY name", params![18]?)
//!     .await?;
//!
//! println!("{} of {} ({} rows)", page.current_page(), page.total_pages(), page.total_items());
//! ```
//!
//! The count statement is derived from the base statement (`ORDER BY` dropped,
//! projection replaced with `COUNT(*)` or the statement wrapped as a derived
//! table); the page itself is produced by the configured [`WindowStrategy`].
//!
//! ## Errors
//!
//! Operations return [`anyhow::Result`]. Mapping and paging failures carry an
//! [`Error`]:
//!
//! ```ignore
//! match db.fetch::<Order>("SELECT o.Id, b.UserId, s.UserId FROM ...", params![]?).await {
//!     Err(e) if matches!(e.downcast_ref(), Some(rowmap::Error::AmbiguousColumn { .. })) => {}
//!     _ => {}
//! }
//! ```

mod database;
mod descriptor;
mod error;
mod mapper;
mod materialize;
mod options;
mod paging;
mod poco;
mod resolver;
mod statement;
mod value;
mod window;

pub use database::Database;
pub use descriptor::{Describe, Member, MemberKind, TypeDescriptor, normalize};
pub use error::Error;
pub use mapper::Mapper;
pub use materialize::{PocoSet, materialize};
pub use options::MapperOptions;
pub use paging::{Page, PagePlan};
pub use poco::{MemberSpec, Poco, Target};
pub use resolver::{Binding, Plan, resolve};
// Re-export row and value types so mapped types and custom conversions need only this crate.
pub use rowmap_sql::{Connection, DataType, Field, Row};
pub use statement::Statement;
pub use value::{FromValue, convert, into_params};
pub use window::{LimitOffset, OffsetFetch, RowNumber, WindowStrategy};

// Re-exports for `poco!` and `params!` macro use only.
#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use sea_query::Value;
}
