//! Conversions from external infrastructure errors into domain errors.

use keyring::Error as KeyringError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use ticketsync_common::storage::StorageError;
use ticketsync_domain::TicketSyncError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TicketSyncError);

impl From<InfraError> for TicketSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TicketSyncError> for InfraError {
    fn from(value: TicketSyncError) -> Self {
        InfraError(value)
    }
}

/// Convert any infrastructure error straight into the domain error.
///
/// Shorthand for `InfraError::from(err).into()` at `map_err` sites.
pub fn to_domain<E>(err: E) -> TicketSyncError
where
    InfraError: From<E>,
{
    InfraError::from(err).0
}

trait IntoTicketSyncError {
    fn into_domain(self) -> TicketSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → TicketSyncError */
/* -------------------------------------------------------------------------- */

impl IntoTicketSyncError for SqlError {
    fn into_domain(self) -> TicketSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        fn looks_like_wrong_key(message: &str) -> bool {
            let lower = message.to_ascii_lowercase();
            lower.contains("not a database") || lower.contains("encrypted")
        }

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => TicketSyncError::Cache("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        TicketSyncError::Cache("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, _) => {
                        TicketSyncError::Cache(format!("constraint violation: {message}"))
                    }
                    (_, _) if looks_like_wrong_key(&message) => TicketSyncError::Security(
                        "SQLCipher key rejected or database not encrypted".into(),
                    ),
                    _ => TicketSyncError::Cache(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => TicketSyncError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                TicketSyncError::Cache(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                TicketSyncError::Cache(format!("invalid column type for {name}: {ty}"))
            }
            RE::Utf8Error(_) => TicketSyncError::Cache("invalid UTF-8 returned from sqlite".into()),
            other => TicketSyncError::Cache(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_domain())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → TicketSyncError */
/* -------------------------------------------------------------------------- */

impl IntoTicketSyncError for StorageError {
    fn into_domain(self) -> TicketSyncError {
        match self {
            StorageError::Rusqlite(err) => err.into_domain(),
            StorageError::WrongKeyOrNotEncrypted => TicketSyncError::Security(
                "SQLCipher key rejected or database not encrypted".into(),
            ),
            StorageError::Encryption(msg) => TicketSyncError::Security(msg),
            StorageError::Timeout(secs) => {
                TicketSyncError::Cache(format!("database connection timed out after {secs}s"))
            }
            StorageError::InvalidConfig(msg) => TicketSyncError::Configuration(msg),
            other => TicketSyncError::Cache(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_domain())
    }
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → TicketSyncError */
/* -------------------------------------------------------------------------- */

impl IntoTicketSyncError for KeyringError {
    fn into_domain(self) -> TicketSyncError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => TicketSyncError::NotFound("keychain entry not found".into()),
            BadEncoding(_) => {
                TicketSyncError::Security("credential in keychain is not valid UTF-8".into())
            }
            TooLong(name, limit) => TicketSyncError::Security(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => TicketSyncError::Security(format!(
                "keychain attribute '{attr}' is invalid: {reason}"
            )),
            PlatformFailure(err) => {
                TicketSyncError::Security(format!("keychain platform error: {err}"))
            }
            NoStorageAccess(err) => {
                TicketSyncError::Security(format!("unable to access secure storage: {err}"))
            }
            _ => TicketSyncError::Security(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_domain())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TicketSyncError */
/* -------------------------------------------------------------------------- */

impl IntoTicketSyncError for HttpError {
    fn into_domain(self) -> TicketSyncError {
        if self.is_timeout() {
            return TicketSyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return TicketSyncError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return TicketSyncError::Decode(format!("failed to decode response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => TicketSyncError::Authentication(message),
                404 => TicketSyncError::NotFound(message),
                429 => TicketSyncError::RateLimit(message),
                400..=499 => TicketSyncError::InvalidInput(message),
                _ => TicketSyncError::Network(message),
            };
        }

        TicketSyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_domain())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_cache_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        match to_domain(err) {
            TicketSyncError::Cache(msg) => assert!(msg.contains("busy")),
            other => panic!("expected cache error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_key_storage_error_maps_to_security() {
        let mapped = to_domain(StorageError::WrongKeyOrNotEncrypted);
        assert!(matches!(mapped, TicketSyncError::Security(_)));
    }

    #[test]
    fn keyring_no_entry_maps_to_not_found() {
        match to_domain(KeyringError::NoEntry) {
            TicketSyncError::NotFound(msg) => assert!(msg.contains("keychain")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_status_429_maps_to_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::TOO_MANY_REQUESTS))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        match to_domain(error) {
            TicketSyncError::RateLimit(msg) => assert!(msg.contains("429")),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }
}
