use chrono_tz::Tz;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Errors that can occur when assembling configuration from the environment.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is missing or empty.
    Missing(&'static str),
    /// A variable is present but unparseable.
    Invalid { var: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required environment variable {var}"),
            Self::Invalid { var, reason } => write!(f, "invalid value for {var}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Deployment mode. Anything other than PUBLIC/PRIVATE parses as Inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Public,
    Private,
    Inactive,
}

impl Mode {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Mode::Public,
            "PRIVATE" => Mode::Private,
            _ => Mode::Inactive,
        }
    }

    /// Whether the command surface is live in this mode.
    pub fn commands_enabled(&self) -> bool {
        matches!(self, Mode::Public | Mode::Private)
    }
}

/// Immutable runtime configuration, assembled once at startup and shared
/// by reference with every component.
#[derive(Debug)]
pub struct Config {
    /// Cache endpoint, e.g. redis://127.0.0.1/.
    pub redis_uri: String,
    /// Gemini API key.
    pub gemini_api_key: String,
    /// WhatsApp session store path, forwarded to the gateway.
    pub database_path: PathBuf,
    /// User ids allowed to run commands and always get a reply.
    pub sudo: HashSet<String>,
    /// Command prefix.
    pub prefix: String,
    pub mode: Mode,
    /// Timezone the night window is evaluated in.
    pub timezone: Tz,
    /// Base URL of the WhatsApp gateway sidecar.
    pub gateway_url: String,
    /// Phone number to pair on startup, if the session is fresh.
    pub pair_phone: Option<String>,
    /// Directory for the file log layer. Stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            match get(var) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => Err(ConfigError::Missing(var)),
            }
        };

        let redis_uri = required("REDIS_URI")?;
        let gemini_api_key = required("GEMINI_API_KEY")?;

        let database_path = get("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/var/lib/nightshift/session.db"));

        let sudo = get("SUDO")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let prefix = get("PREFIX").unwrap_or_else(|| "!".to_string());
        if prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "PREFIX",
                reason: "must not be blank".into(),
            });
        }

        let mode = get("MODE").map(|m| Mode::parse(&m)).unwrap_or(Mode::Private);

        let timezone = match get("TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                var: "TIMEZONE",
                reason: e.to_string(),
            })?,
            None => chrono_tz::Africa::Nairobi,
        };

        let gateway_url = get("GATEWAY_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8466".to_string())
            .trim_end_matches('/')
            .to_string();

        let pair_phone = get("PAIR_PHONE").filter(|p| !p.trim().is_empty());
        let log_dir = get("LOG_DIR").map(PathBuf::from);

        Ok(Self {
            redis_uri,
            gemini_api_key,
            database_path,
            sudo,
            prefix,
            mode,
            timezone,
            gateway_url,
            pair_phone,
            log_dir,
        })
    }

    pub fn is_sudo(&self, user_id: &str) -> bool {
        self.sudo.contains(user_id)
    }

    /// Build a config from explicit variables, for tests.
    #[cfg(test)]
    pub fn test_with(vars: &[(&str, &str)]) -> Result<Self, ConfigError> {
        let map: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::from_lookup(|key| map.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("REDIS_URI", "redis://127.0.0.1/"),
            ("GEMINI_API_KEY", "test-key"),
        ]
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = load(&minimal()).expect("should load");
        assert_eq!(config.prefix, "!");
        assert_eq!(config.mode, Mode::Private);
        assert_eq!(config.timezone, chrono_tz::Africa::Nairobi);
        assert!(config.sudo.is_empty());
        assert!(config.pair_phone.is_none());
        assert_eq!(config.gateway_url, "http://127.0.0.1:8466");
    }

    #[test]
    fn test_missing_redis_uri() {
        let err = load(&[("GEMINI_API_KEY", "k")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REDIS_URI")));
    }

    #[test]
    fn test_missing_api_key() {
        let err = load(&[("REDIS_URI", "redis://127.0.0.1/")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));
    }

    #[test]
    fn test_blank_required_is_missing() {
        let err = load(&[("REDIS_URI", "redis://127.0.0.1/"), ("GEMINI_API_KEY", " ")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));
    }

    #[test]
    fn test_sudo_list_parsing() {
        let mut vars = minimal();
        vars.push(("SUDO", "254700000001, 254700000002,,"));
        let config = load(&vars).expect("should load");
        assert!(config.is_sudo("254700000001"));
        assert!(config.is_sudo("254700000002"));
        assert!(!config.is_sudo("254700000003"));
    }

    #[test]
    fn test_mode_parsing() {
        let mut vars = minimal();
        vars.push(("MODE", "public"));
        assert_eq!(load(&vars).unwrap().mode, Mode::Public);

        let mut vars = minimal();
        vars.push(("MODE", "PRIVATE"));
        assert_eq!(load(&vars).unwrap().mode, Mode::Private);

        let mut vars = minimal();
        vars.push(("MODE", "maintenance"));
        let config = load(&vars).unwrap();
        assert_eq!(config.mode, Mode::Inactive);
        assert!(!config.mode.commands_enabled());
    }

    #[test]
    fn test_invalid_timezone() {
        let mut vars = minimal();
        vars.push(("TIMEZONE", "Mars/Olympus_Mons"));
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TIMEZONE", .. }));
    }

    #[test]
    fn test_custom_timezone() {
        let mut vars = minimal();
        vars.push(("TIMEZONE", "Europe/Berlin"));
        let config = load(&vars).unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_gateway_url_trailing_slash_stripped() {
        let mut vars = minimal();
        vars.push(("GATEWAY_URL", "http://gateway:9000/"));
        let config = load(&vars).unwrap();
        assert_eq!(config.gateway_url, "http://gateway:9000");
    }
}
