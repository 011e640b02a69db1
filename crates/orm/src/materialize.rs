//! Populating mapped objects from rows.

use anyhow::{Context, Result, bail};

use crate::mapper::Mapper;
use crate::poco::{Poco, Target};
use crate::resolver::Plan;
use crate::{DataType, Row};

/// Build one `T` from `row` following `plan`.
///
/// Related objects are created on the first non-NULL value that reaches them,
/// so a row with only NULLs for a relation leaves it `None`.
///
/// # Errors
///
/// Returns an error if the row is shorter than the plan expects or a value
/// cannot be converted to its member type.
pub fn materialize<T: Poco>(plan: &Plan, row: &Row) -> Result<T> {
    let mut target = T::default();

    for binding in plan.bindings() {
        let Some(field) = row.fields.get(binding.column) else {
            bail!(
                "row has {} columns but column '{}' was planned at position {}",
                row.fields.len(),
                binding.name,
                binding.column
            );
        };
        apply(&mut target, &binding.path, &field.value)
            .with_context(|| format!("mapping column '{}'", binding.name))?;
    }

    Ok(target)
}

fn apply(target: &mut dyn Target, path: &[usize], value: &DataType) -> Result<()> {
    match path {
        [] => Ok(()),
        [leaf] => target.assign(*leaf, value),
        [head, rest @ ..] => match target.reference(*head, !value.is_null()) {
            Some(related) => apply(related, rest, value),
            None => Ok(()),
        },
    }
}

/// A tuple of [`Poco`] types mapped together, either side by side from one
/// row or from consecutive result sets.
pub trait PocoSet: Sized {
    /// One list per member type, used for multi-result-set fetches.
    type Lists;

    /// Map each row onto every member type. Each type resolves its own plan
    /// against the full row, so one column may feed several types.
    ///
    /// # Errors
    ///
    /// Returns an error if any member type fails to resolve or convert.
    fn map_joined(mapper: &Mapper, rows: &[Row]) -> Result<Vec<Self>>;

    /// Map result set N onto member type N. Missing sets produce empty lists
    /// and surplus sets are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if any member type fails to resolve or convert.
    fn map_sets(mapper: &Mapper, sets: Vec<Vec<Row>>) -> Result<Self::Lists>;
}

macro_rules! impl_poco_set {
    ($($ty:ident => $idx:tt),+) => {
        impl<$($ty: Poco),+> PocoSet for ($($ty,)+) {
            type Lists = ($(Vec<$ty>,)+);

            fn map_joined(mapper: &Mapper, rows: &[Row]) -> Result<Vec<Self>> {
                let Some(first) = rows.first() else {
                    return Ok(Vec::new());
                };
                let columns: Vec<&str> = first.columns().collect();
                let plans = ($(mapper.plan::<$ty>(&columns)?,)+);

                rows.iter()
                    .map(|row| Ok::<_, anyhow::Error>(($(materialize::<$ty>(&plans.$idx, row)?,)+)))
                    .collect()
            }

            fn map_sets(mapper: &Mapper, sets: Vec<Vec<Row>>) -> Result<Self::Lists> {
                let mut sets = sets.into_iter();
                Ok(($(
                    {
                        let rows = sets.next().unwrap_or_default();
                        mapper.map_rows::<$ty>(&rows)?
                    },
                )+))
            }
        }
    };
}

impl_poco_set!(A => 0, B => 1);
impl_poco_set!(A => 0, B => 1, C => 2);
impl_poco_set!(A => 0, B => 1, C => 2, D => 3);
