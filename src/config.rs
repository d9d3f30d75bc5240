//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable (`CONFIG`).
use once_cell::sync::Lazy;
use std::env;

use crate::errors::AppError;

/// Configuración global de la aplicación.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub log: LogConfig,
    pub demo: DemoConfig,
}

/// Filtro de logs (sintaxis de `EnvFilter`, p. ej. `info,stepwise_core=debug`).
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub filter: String,
}

/// Parámetros del binario de demostración.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Oración inicial de la transaction de ejemplo.
    pub sentence: String,
    /// Imprimir la bitácora de eventos al terminar.
    pub show_events: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { log: LogConfig { filter: "info".to_string() },
               demo: DemoConfig { sentence: "Hello World!".to_string(),
                                  show_events: false } }
    }
}

impl AppConfig {
    /// Construye la configuración a partir de una función de lookup
    /// (`env::var` en producción). Claves ausentes toman el default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let defaults = Self::default();
        let filter = lookup("STEPWISE_LOG").unwrap_or(defaults.log.filter);
        let sentence = lookup("STEPWISE_SENTENCE").unwrap_or(defaults.demo.sentence);
        let show_events = match lookup("STEPWISE_SHOW_EVENTS") {
            None => defaults.demo.show_events,
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                                              AppError::Config(format!("STEPWISE_SHOW_EVENTS must be a boolean, got '{raw}'"))
                                          })?,
        };
        Ok(Self { log: LogConfig { filter },
                  demo: DemoConfig { sentence, show_events } })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    dotenvy::dotenv().ok();
    AppConfig::from_lookup(|key| env::var(key).ok()).unwrap_or_else(|err| {
                                                        log::warn!("{err}; using defaults");
                                                        AppConfig::default()
                                                    })
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_keys_take_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn values_are_read_from_lookup() {
        let cfg = AppConfig::from_lookup(lookup(&[("STEPWISE_LOG", "debug"),
                                                  ("STEPWISE_SENTENCE", "a b"),
                                                  ("STEPWISE_SHOW_EVENTS", "yes")])).unwrap();
        assert_eq!(cfg.log.filter, "debug");
        assert_eq!(cfg.demo.sentence, "a b");
        assert!(cfg.demo.show_events);
    }

    #[test]
    fn invalid_flag_is_a_config_error() {
        let err = AppConfig::from_lookup(lookup(&[("STEPWISE_SHOW_EVENTS", "maybe")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
