//! Records held in the backing store

/// Declare a newtype over an engine-assigned row id.
///
/// The tag shows up in log output so ids from different tables cannot be
/// confused (`u.4` vs `s.4`).
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident as $tag:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            serde::Serialize,
            serde::Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($tag, ".{}"), self.0)
            }
        }
    };
}

pub(crate) use id_type;

pub mod skill;
pub mod user;

pub use skill::*;
pub use user::*;
