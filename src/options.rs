use crate::{Currency, Error, ErrorKind, Rounding, Source};

pub(crate) const KEY_OPERATING_CURRENCY: &str = "operating_currency";
pub(crate) const KEY_DEFAULT_ROUNDING: &str = "default_rounding";
pub(crate) const KEY_DEFAULT_COMMODITY_PRECISION: &str = "default_commodity_precision";

pub(crate) const DEFAULT_COMMODITY_PRECISION: u32 = 2;
pub(crate) const DEFAULT_ROUNDING: Rounding = Rounding::RoundDown;

/// The typed view of the builtin options. Unknown option keys are kept in the
/// plain options map only; builtin keys additionally update this state, which
/// feeds commodity defaults during registry building.
#[derive(Debug, Clone)]
pub(crate) struct LedgerOptions {
    pub operating_currency: Option<Currency>,
    pub default_rounding: Rounding,
    pub default_commodity_precision: u32,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        LedgerOptions {
            operating_currency: None,
            default_rounding: DEFAULT_ROUNDING,
            default_commodity_precision: DEFAULT_COMMODITY_PRECISION,
        }
    }
}

impl LedgerOptions {
    pub fn apply(&mut self, key: &str, value: &str, src: &Source) -> Result<(), Error> {
        match key {
            KEY_OPERATING_CURRENCY => {
                self.operating_currency = Some(value.to_string());
            }
            KEY_DEFAULT_ROUNDING => {
                self.default_rounding = value
                    .parse()
                    .map_err(|_| invalid_value(key, value, src))?;
            }
            KEY_DEFAULT_COMMODITY_PRECISION => {
                self.default_commodity_precision = value
                    .parse()
                    .map_err(|_| invalid_value(key, value, src))?;
            }
            _ => {}
        }
        Ok(())
    }
}

pub(crate) fn invalid_value(key: &str, value: &str, src: &Source) -> Error {
    Error {
        kind: ErrorKind::InvalidOptionValue {
            key: key.to_string(),
            value: value.to_string(),
        },
        src: src.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn src() -> Source {
        Source {
            file: Arc::new("test".to_string()),
            start: (1, 1).into(),
            end: (1, 1).into(),
        }
    }

    #[test]
    fn builtin_keys_update_typed_state() {
        let mut options = LedgerOptions::default();
        options
            .apply(KEY_DEFAULT_ROUNDING, "RoundHalfEven", &src())
            .unwrap();
        options
            .apply(KEY_DEFAULT_COMMODITY_PRECISION, "4", &src())
            .unwrap();
        options.apply(KEY_OPERATING_CURRENCY, "EUR", &src()).unwrap();
        assert_eq!(options.default_rounding, Rounding::RoundHalfEven);
        assert_eq!(options.default_commodity_precision, 4);
        assert_eq!(options.operating_currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut options = LedgerOptions::default();
        options.apply("title", "Example", &src()).unwrap();
        assert_eq!(options.default_commodity_precision, 2);
    }

    #[test]
    fn bad_builtin_values_fail() {
        let mut options = LedgerOptions::default();
        let err = options
            .apply(KEY_DEFAULT_ROUNDING, "Sideways", &src())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidOptionValue { .. }));
        let err = options
            .apply(KEY_DEFAULT_COMMODITY_PRECISION, "-1", &src())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidOptionValue { .. }));
    }
}
