//! Macro for implementing Display and FromStr for closed-vocabulary enums
//!
//! Provider tags and issue statuses are persisted as text and parsed back
//! from the database, so they need a stable string form in both directions.
//!
//! # Example
//!
//! ```rust
//! use ticketsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Pending,
//!     Running,
//! }
//!
//! impl_domain_status_conversions!(Phase {
//!     Pending => "pending",
//!     Running => "running",
//! });
//!
//! assert_eq!("RUNNING".parse::<Phase>().unwrap(), Phase::Running);
//! ```

/// Implements Display and FromStr for a fieldless enum.
///
/// - Display writes the mapped string exactly as given
/// - FromStr matches ASCII case-insensitively against the mapped strings
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
