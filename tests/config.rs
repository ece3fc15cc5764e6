// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests YAML parsing, defaults, env var interpolation and discovery.

use std::path::PathBuf;
use std::time::Duration;
use voyager::config::*;
use voyager::error::Error;

const MINIMAL: &str = r#"
domain: apps.example.com
public_ip: 203.0.113.7
source:
  organization: pinkcloud
"#;

mod parsing {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.domain, "apps.example.com");
        assert_eq!(config.source.organization, "pinkcloud");
        assert_eq!(config.resolved_public_ip().unwrap().to_string(), "203.0.113.7");
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(
            config.deployments_dir.to_str(),
            Some("/var/opt/voyager/deployments")
        );
        assert_eq!(config.descriptor, "Dockerfile");
        assert_eq!(config.source.base_url, "https://github.com");
        assert_eq!(config.source.username, "x-access-token");
        assert!(matches!(config.store, StoreConfig::File { .. }));
        assert_eq!(
            config.store.lock_dir(),
            Some(PathBuf::from("/var/lib/voyager/locks"))
        );
        assert!(matches!(config.dns, DnsConfig::Disabled));
        assert!(config.notifications.operators.is_none());
        assert_eq!(config.proxy.entrypoints, "http,https");

        assert_eq!(config.limits.workers, 16);
        assert_eq!(config.limits.builds, 4);
        assert_eq!(config.limits.stop_timeout, Duration::from_secs(10));

        assert!(config.monitor.enabled);
        assert_eq!(config.monitor.floor, Duration::from_secs(20));
        assert_eq!(config.monitor.multiplier, 19);
        assert_eq!(config.monitor.fallback, Duration::from_secs(10));
    }

    #[test]
    fn parse_full_config() {
        let yaml = r#"
domain: apps.example.com
public_ip:
  env: VOYAGER_TEST_UNSET_IP
  default: 198.51.100.1
deployments_dir: /srv/voyager
descriptor: Containerfile
source:
  base_url: https://git.example.com
  organization: pinkcloud
  username: deploy
  token:
    env: VOYAGER_TEST_UNSET_TOKEN
store:
  backend: memory
runtime:
  runtime: podman
  socket: /run/podman/podman.sock
dns:
  provider: cloudflare
  zone: zone123
  token:
    env: CF_TOKEN
notifications:
  operators: https://hooks.example.com/ops
proxy:
  entrypoints: websecure
  caddyfile: /etc/caddy/Caddyfile
limits:
  workers: 4
  builds: 1
  stop_timeout: 30s
monitor:
  enabled: false
  floor: 1m
  multiplier: 5
  fallback: 2s
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.resolved_public_ip().unwrap().to_string(), "198.51.100.1");
        assert_eq!(config.descriptor, "Containerfile");
        assert_eq!(config.source.username, "deploy");
        assert!(matches!(config.store, StoreConfig::Memory));
        assert_eq!(
            config.runtime.runtime,
            Some(voyager::runtime::RuntimeType::Podman)
        );
        match &config.dns {
            DnsConfig::Cloudflare { zone, api_base, .. } => {
                assert_eq!(zone, &EnvValue::Literal("zone123".to_string()));
                assert!(api_base.is_none());
            }
            other => panic!("expected cloudflare, got {other:?}"),
        }
        assert_eq!(
            config.notifications.operators,
            Some(EnvValue::Literal("https://hooks.example.com/ops".to_string()))
        );
        assert_eq!(config.proxy.entrypoints, "websecure");
        assert_eq!(config.limits.builds, 1);
        assert_eq!(config.limits.stop_timeout, Duration::from_secs(30));
        assert!(!config.monitor.enabled);
        assert_eq!(config.monitor.floor, Duration::from_secs(60));
        assert_eq!(config.monitor.multiplier, 5);
    }

    #[test]
    fn missing_domain_returns_error() {
        let yaml = r#"
public_ip: 203.0.113.7
source:
  organization: pinkcloud
"#;
        assert!(matches!(Config::from_yaml(yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn missing_source_returns_error() {
        let yaml = r#"
domain: apps.example.com
public_ip: 203.0.113.7
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn file_store_lock_dir_can_be_set() {
        let yaml = format!(
            "{MINIMAL}store:\n  backend: file\n  path: /srv/registry\n  locks: /run/voyager/locks\n"
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(
            config.store.lock_dir(),
            Some(PathBuf::from("/run/voyager/locks"))
        );
    }

    #[test]
    fn memory_store_has_no_shared_locks() {
        let yaml = format!("{MINIMAL}store:\n  backend: memory\n");
        assert_eq!(Config::from_yaml(&yaml).unwrap().store.lock_dir(), None);
    }

    #[test]
    fn unknown_store_backend_returns_error() {
        let yaml = format!("{MINIMAL}store:\n  backend: redis\n");
        assert!(Config::from_yaml(&yaml).is_err());
    }
}

mod validation {
    use super::*;

    fn invalid(yaml: &str) -> String {
        match Config::from_yaml(yaml) {
            Err(Error::InvalidConfig(message)) => message,
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn rejects_dotted_domain() {
        let yaml = MINIMAL.replace("apps.example.com", ".example.com");
        assert!(invalid(&yaml).contains("domain"));
    }

    #[test]
    fn rejects_blank_organization() {
        let yaml = MINIMAL.replace("pinkcloud", "\"  \"");
        assert!(invalid(&yaml).contains("organization"));
    }

    #[test]
    fn rejects_zero_workers() {
        let yaml = format!("{MINIMAL}limits:\n  workers: 0\n");
        assert!(invalid(&yaml).contains("limits.workers"));
    }

    #[test]
    fn rejects_zero_port_attempts() {
        let yaml = format!("{MINIMAL}limits:\n  port_attempts: 0\n");
        assert!(invalid(&yaml).contains("port_attempts"));
    }

    #[test]
    fn rejects_zero_multiplier() {
        let yaml = format!("{MINIMAL}monitor:\n  multiplier: 0\n");
        assert!(invalid(&yaml).contains("multiplier"));
    }

    #[test]
    fn public_ip_must_be_ipv4() {
        let yaml = MINIMAL.replace("203.0.113.7", "not-an-ip");
        let config = Config::from_yaml(&yaml).unwrap();
        assert!(matches!(
            config.resolved_public_ip(),
            Err(Error::InvalidConfig(_))
        ));
    }
}

mod env_vars {
    use super::*;

    #[test]
    fn literal_value() {
        let value = EnvValue::Literal("plain".to_string());
        assert_eq!(value.resolve().unwrap(), "plain");
    }

    #[test]
    fn env_reference_resolves() {
        let value: EnvValue = serde_yaml::from_str("env: VOYAGER_TEST_VAR").unwrap();
        temp_env::with_var("VOYAGER_TEST_VAR", Some("from_environment"), || {
            assert_eq!(value.resolve().unwrap(), "from_environment");
        });
    }

    #[test]
    fn env_reference_with_default() {
        let value: EnvValue =
            serde_yaml::from_str("env: VOYAGER_TEST_DEFAULTED\ndefault: fallback").unwrap();
        temp_env::with_var_unset("VOYAGER_TEST_DEFAULTED", || {
            assert_eq!(value.resolve().unwrap(), "fallback");
        });
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let value: EnvValue = serde_yaml::from_str("env: VOYAGER_TEST_MISSING").unwrap();
        temp_env::with_var_unset("VOYAGER_TEST_MISSING", || {
            assert!(matches!(
                value.resolve(),
                Err(Error::MissingEnvVar(var)) if var == "VOYAGER_TEST_MISSING"
            ));
        });
    }

    #[test]
    fn optional_values_read_missing_or_empty_as_absent() {
        let missing: EnvValue = serde_yaml::from_str("env: VOYAGER_TEST_HOOK").unwrap();
        let empty = EnvValue::Literal(String::new());
        temp_env::with_var_unset("VOYAGER_TEST_HOOK", || {
            assert_eq!(resolve_optional(None).unwrap(), None);
            assert_eq!(resolve_optional(Some(&missing)).unwrap(), None);
            assert_eq!(resolve_optional(Some(&empty)).unwrap(), None);
        });
        temp_env::with_var("VOYAGER_TEST_HOOK", Some("https://hooks.example.com"), || {
            assert_eq!(
                resolve_optional(Some(&missing)).unwrap().as_deref(),
                Some("https://hooks.example.com")
            );
        });
    }

    #[test]
    fn public_ip_from_environment() {
        let yaml = MINIMAL.replace("203.0.113.7", "{ env: VOYAGER_TEST_IP }");
        let config = Config::from_yaml(&yaml).unwrap();
        temp_env::with_var("VOYAGER_TEST_IP", Some(" 192.0.2.10 "), || {
            assert_eq!(config.resolved_public_ip().unwrap().to_string(), "192.0.2.10");
        });
    }
}

mod discovery {
    use super::*;

    #[test]
    fn discovers_primary_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), MINIMAL).unwrap();
        assert_eq!(Config::discover(dir.path()).unwrap().domain, "apps.example.com");
    }

    #[test]
    fn discovers_dot_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".voyager")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME_DIR), MINIMAL).unwrap();
        assert!(Config::discover(dir.path()).is_ok());
    }

    #[test]
    fn reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }
}

mod init {
    use super::*;

    #[test]
    fn generated_template_parses() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), Some("apps.example.org"), false).unwrap();

        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.domain, "apps.example.org");
        assert!(matches!(config.dns, DnsConfig::Disabled));
    }

    #[test]
    fn refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), None, false).unwrap();
        assert!(matches!(
            init_config(dir.path(), None, false),
            Err(Error::AlreadyExists(_))
        ));
        init_config(dir.path(), Some("other.example.com"), true).unwrap();
    }

    #[test]
    fn rejects_blank_domain() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            init_config(dir.path(), Some(" "), false),
            Err(Error::InvalidConfig(_))
        ));
    }
}
