use std::sync::Arc;

use anyhow::Result;

use crate::DataType;
use crate::descriptor::{Describe, MemberKind, TypeDescriptor, descriptor_of};
use crate::error::Error;

/// Object-safe access used by the materializer to populate an instance.
///
/// Member indices follow [`Poco::members`] order.
pub trait Target: Send {
    /// Assign a column value to the scalar member at `member`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to the member type or
    /// `member` does not name a scalar member.
    fn assign(&mut self, member: usize, value: &DataType) -> Result<()>;

    /// The related object at `member`. When `create` is set an absent related
    /// object is instantiated with its default value first.
    fn reference(&mut self, member: usize, create: bool) -> Option<&mut dyn Target>;
}

/// A plain struct that rows can be mapped onto.
///
/// Typically implemented via the `poco!` macro rather than manually.
pub trait Poco: Target + Default + Send + Sized + 'static {
    /// Member specifications in declaration order.
    fn members() -> Vec<MemberSpec>;

    /// The shared descriptor for this type.
    ///
    /// # Errors
    ///
    /// Returns an error if the declared members are inconsistent.
    fn descriptor() -> Result<Arc<TypeDescriptor>, Error> {
        descriptor_of::<Self>()
    }
}

/// Declared metadata for a single member.
#[derive(Debug, Clone, Copy)]
pub struct MemberSpec {
    /// Member name, matched against column labels.
    pub name: &'static str,
    /// Value or related object.
    pub kind: MemberKind,
    /// Whether the mapper may assign the member.
    pub writable: bool,
}

impl MemberSpec {
    /// A writable scalar member.
    #[must_use]
    pub const fn value(name: &'static str) -> Self {
        Self {
            name,
            kind: MemberKind::Value,
            writable: true,
        }
    }

    /// A related object whose shape is given by `describe`.
    #[must_use]
    pub const fn reference(name: &'static str, describe: Describe) -> Self {
        Self {
            name,
            kind: MemberKind::Reference(describe),
            writable: true,
        }
    }

    /// Marks the member read-only: it is never bound, even when a column
    /// matches, and keeps its construction-time value.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }
}

/// Declares a mapped struct with an automatic [`Poco`] implementation.
///
/// Related objects are listed in `references` and generated as `Option<_>`
/// fields after the declared ones.
///
/// Members listed in `read_only` are never bound: a matching column is
/// skipped and the field keeps its `Default` value. Every field is settable
/// from inside the macro, so `read_only` is the only way to exclude one;
/// fields that should be filled from columns are simply left off the list.
///
/// # Examples
///
/// ```ignore
/// poco! {
///     #[derive(Debug, Clone, Default)]
///     pub struct Money {
///         pub value: f64,
///         pub code: String,
///     }
/// }
///
/// poco! {
///     references = [money: Money],
///     #[derive(Debug, Clone, Default)]
///     pub struct Account {
///         pub id: i64,
///         pub name: String,
///     }
/// }
/// // `SELECT 4 Id, 'Will' Name, 23.0 Money__Value, 'AUD' Money__Code`
/// ```
#[macro_export]
macro_rules! poco {
    // Full form: references + read-only members + struct (single code-generation arm)
    (
        references = [$( $ref_name:ident : $ref_type:ty ),* $(,)?],
        read_only = [$( $ro_name:ident ),* $(,)?],
        $(#[$meta:meta])*
        pub struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field_name:ident : $field_type:ty
            ),* $(,)?
        }
    ) => {
        #[allow(missing_docs)]
        $(#[$meta])*
        pub struct $struct_name {
            $(
                $(#[$field_meta])*
                pub $field_name : $field_type,
            )*
            $(
                pub $ref_name : ::core::option::Option<$ref_type>,
            )*
        }

        impl $crate::Target for $struct_name {
            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn assign(
                &mut self, member: usize, value: &$crate::DataType,
            ) -> $crate::__private::anyhow::Result<()> {
                use $crate::__private::anyhow::Context as _;

                let mut index = 0usize;
                $(
                    if member == index {
                        let converted = $crate::convert::<$field_type>(value).with_context(|| {
                            format!(
                                "cannot assign {} value to {}.{}",
                                value.kind(),
                                stringify!($struct_name),
                                stringify!($field_name)
                            )
                        })?;
                        if let Some(converted) = converted {
                            self.$field_name = converted;
                        }
                        return Ok(());
                    }
                    index += 1;
                )*
                $crate::__private::anyhow::bail!(
                    "{} has no scalar member at position {member}",
                    stringify!($struct_name)
                )
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn reference(
                &mut self, member: usize, create: bool,
            ) -> ::core::option::Option<&mut dyn $crate::Target> {
                let mut index = <[&str]>::len(&[$( stringify!($field_name) ),*]);
                $(
                    if member == index {
                        return if create {
                            Some(
                                self.$ref_name.get_or_insert_with(<$ref_type as Default>::default)
                                    as &mut dyn $crate::Target,
                            )
                        } else {
                            self.$ref_name.as_mut().map(|related| related as &mut dyn $crate::Target)
                        };
                    }
                    index += 1;
                )*
                None
            }
        }

        impl $crate::Poco for $struct_name {
            fn members() -> Vec<$crate::MemberSpec> {
                let read_only: &[&str] = &[$( stringify!($ro_name) ),*];
                let mut members = vec![
                    $( $crate::MemberSpec::value(stringify!($field_name)), )*
                    $(
                        $crate::MemberSpec::reference(
                            stringify!($ref_name),
                            <$ref_type as $crate::Poco>::descriptor,
                        ),
                    )*
                ];
                for member in &mut members {
                    if read_only.contains(&member.name) {
                        member.writable = false;
                    }
                }
                members
            }
        }
    };

    // References only → forward with no read-only members
    (
        references = [$($refs:tt)*],
        $(#[$meta:meta])*
        pub struct $($rest:tt)*
    ) => {
        $crate::poco! {
            references = [$($refs)*],
            read_only = [],
            $(#[$meta])*
            pub struct $($rest)*
        }
    };

    // Read-only members only → forward with no references
    (
        read_only = [$($ro:tt)*],
        $(#[$meta:meta])*
        pub struct $($rest:tt)*
    ) => {
        $crate::poco! {
            references = [],
            read_only = [$($ro)*],
            $(#[$meta])*
            pub struct $($rest)*
        }
    };

    // Bare struct → forward with no references or read-only members
    (
        $(#[$meta:meta])*
        pub struct $($rest:tt)*
    ) => {
        $crate::poco! {
            references = [],
            read_only = [],
            $(#[$meta])*
            pub struct $($rest)*
        }
    };
}
