//! Data models for the library server

/// Declares a fieldless enum stored as TEXT in Postgres and exchanged as
/// snake_case strings in JSON.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                s.parse().map_err(Into::into)
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

use std::borrow::Cow;

use validator::ValidationError;

pub mod activity_log;
pub mod book;
pub mod borrowing;
pub mod category;
pub mod user;

pub use activity_log::{ActivityAction, ActivityLog, NewActivity};
pub use book::Book;
pub use borrowing::{BorrowingDetail, BorrowingRequest, DetailStatus, RequestStatus};
pub use category::Category;
pub use user::{Role, User, UserClaims};

/// Default and maximum page sizes for list endpoints
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
/// Highest page number whose offset still fits in an i64
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Normalized pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// Rejects values that are empty once surrounding whitespace is trimmed
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::from("Value cannot be blank")));
    }
    Ok(())
}

/// Lowercased `LIKE` pattern matching `input` anywhere, with `%`, `_` and
/// backslash escaped
pub fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::new(None, None);
        assert_eq!(page, Page { page: 1, per_page: 20 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_clamping() {
        assert_eq!(Page::new(Some(0), Some(0)), Page { page: 1, per_page: 1 });
        assert_eq!(Page::new(Some(-3), Some(1000)).per_page, MAX_PER_PAGE);
        assert_eq!(Page::new(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn test_huge_page_offset_stays_positive() {
        let page = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(page.page, MAX_PAGE);
        assert!(page.offset() >= 0);

        let unclamped = Page { page: i64::MAX, per_page: MAX_PER_PAGE };
        assert_eq!(unclamped.offset(), i64::MAX);
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("Dune").is_ok());
        assert!(not_blank("  Dune ").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("   \t").is_err());
    }

    #[test]
    fn test_text_enum_strings() {
        assert_eq!(Role::SuperUser.as_str(), "super_user");
        assert_eq!("normal_user".parse::<Role>(), Ok(Role::NormalUser));
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(
            serde_json::to_string(&RequestStatus::Waiting).unwrap(),
            "\"waiting\""
        );
        assert_eq!(DetailStatus::Extended.to_string(), "extended");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Dune"), "%dune%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }
}
