//! User preference settings

use crate::db::sqlite::kv;
use crate::db::{KEY_CURRENCY, KEY_ONBOARDING};
use crate::error::{Result, ValidationError};
use crate::market::currency::{self, DEFAULT_CURRENCY};
use rusqlite::Connection;

/// Get the preferred currency, falling back to the default for unknown values
pub fn get_currency(conn: &Connection) -> Result<String> {
    let stored = kv::get(conn, KEY_CURRENCY)?;

    Ok(stored
        .map(|c| c.trim().to_lowercase())
        .filter(|c| currency::is_supported(c))
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
}

/// Set the preferred currency
pub fn set_currency(conn: &Connection, code: &str) -> Result<String> {
    let code = code.trim().to_lowercase();
    if !currency::is_supported(&code) {
        return Err(ValidationError::UnsupportedCurrency(code).into());
    }

    kv::put(conn, KEY_CURRENCY, &code)?;
    Ok(code)
}

/// Whether onboarding already ran
pub fn has_seen_onboarding(conn: &Connection) -> Result<bool> {
    let flag = kv::get(conn, KEY_ONBOARDING)?;
    Ok(matches!(flag.as_deref(), Some("true") | Some("1")))
}

/// Mark onboarding as done
pub fn mark_onboarding_seen(conn: &Connection) -> Result<()> {
    kv::put(conn, KEY_ONBOARDING, "true")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::migrations::run_migrations;
    use crate::error::AppError;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_currency_defaults_to_usd() {
        let conn = create_test_db();
        assert_eq!(get_currency(&conn).unwrap(), "usd");
    }

    #[test]
    fn test_set_currency_normalizes() {
        let conn = create_test_db();
        assert_eq!(set_currency(&conn, " EUR ").unwrap(), "eur");
        assert_eq!(get_currency(&conn).unwrap(), "eur");
    }

    #[test]
    fn test_unsupported_currency_rejected() {
        let conn = create_test_db();
        let result = set_currency(&conn, "xyz");
        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::UnsupportedCurrency(_)))
        ));
        assert_eq!(get_currency(&conn).unwrap(), "usd");
    }

    #[test]
    fn test_onboarding_flag() {
        let conn = create_test_db();
        assert!(!has_seen_onboarding(&conn).unwrap());
        mark_onboarding_seen(&conn).unwrap();
        assert!(has_seen_onboarding(&conn).unwrap());
    }
}
