/// End-to-end tests for an injection pass
///
/// These cover the behaviour a build relies on:
/// - prefix scans forward exactly the `PIO_` variables
/// - fixed-key mode always forwards the OTA pair, set or not
/// - the `.env` overlay never overrides the OS environment
/// - secrets never reach the build log

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use envdefs::capability::{
        assess, CapabilityProbe, HostPlatform, InstallCommand, InstallSource, OsRelease,
    };
    use envdefs::{
        BuildConfig, Capability, DefineSet, Environment, Error, Injector, InjectorConfig,
    };

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` with logs captured, returning what was logged
    fn capture_logs(f: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().copied().collect()
    }

    fn run(config: InjectorConfig, env: &Environment) -> DefineSet {
        let mut build = DefineSet::new();
        Injector::new(config).inject(env, &mut build);
        build
    }

    #[test]
    fn test_prefix_scan_scenario() {
        let build = run(
            InjectorConfig::prefix_scan(),
            &env(&[("PIO_BOARD_ID", "42"), ("OTHER_VAR", "ignored")]),
        );

        assert_eq!(build.get("PIO_BOARD_ID"), Some("42"));
        assert!(!build.contains("OTHER_VAR"));
        assert_eq!(build.len(), 1);
    }

    #[test]
    fn test_prefix_scan_forwards_each_match_once() {
        let env = env(&[
            ("PIO_WIFI_SSID", "realraum"),
            ("PIO_WIFI_PASSWORD", "hunter2"),
            ("PIO_BOARD_ID", "42"),
            ("PIO", "no"),
            ("pio_lower", "no"),
            ("WIFI_SSID", "no"),
            ("OTA_PASSWORD", "no"),
        ]);
        let build = run(InjectorConfig::prefix_scan(), &env);

        let names: Vec<&str> = build.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["PIO_BOARD_ID", "PIO_WIFI_PASSWORD", "PIO_WIFI_SSID"]);
        for definition in build.definitions() {
            assert!(definition.name.starts_with("PIO_"));
            assert_eq!(env.get(&definition.name), Some(definition.value.as_str()));
        }
    }

    #[test]
    fn test_prefix_scan_with_nothing_to_forward() {
        let build = run(InjectorConfig::prefix_scan(), &env(&[("PATH", "/usr/bin")]));
        assert!(build.is_empty());
    }

    #[test]
    fn test_fixed_keys_always_forward_two_entries() {
        for env in [
            Environment::new(),
            env(&[("OTA_SERVER_BASE_URL", "https://ota.example.com")]),
            env(&[
                ("OTA_SERVER_BASE_URL", "https://ota.example.com"),
                ("OTA_PASSWORD", "hunter2"),
                ("PIO_BOARD_ID", "42"),
            ]),
        ] {
            let build = run(InjectorConfig::fixed_keys(), &env);

            let names: Vec<&str> = build.definitions().iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, vec!["OTA_SERVER_BASE_URL", "OTA_PASSWORD"]);
        }
    }

    #[test]
    fn test_fixed_keys_forward_missing_as_empty() {
        let build = run(
            InjectorConfig::fixed_keys(),
            &env(&[("OTA_SERVER_BASE_URL", "https://ota.example.com")]),
        );

        assert_eq!(build.get("OTA_SERVER_BASE_URL"), Some("https://ota.example.com"));
        assert_eq!(build.get("OTA_PASSWORD"), Some(""));
        assert_eq!(build.definitions()[1].macro_value(), "\"\"");
    }

    #[test]
    fn test_diagnostics_with_unset_variables() {
        let logs = capture_logs(|| {
            let build = run(InjectorConfig::fixed_keys_with_diagnostics(), &Environment::new());
            assert_eq!(build.len(), 2);
        });

        assert!(logs.contains("WIFI_SSID: <unset>"));
        assert!(logs.contains("WIFI_PASSWORD: <unset>"));
    }

    #[test]
    fn test_diagnostics_never_log_passwords() {
        let env = env(&[
            ("WIFI_SSID", "realraum"),
            ("WIFI_PASSWORD", "hunter2"),
            ("OTA_PASSWORD", "correct-horse"),
        ]);

        let logs = capture_logs(|| {
            run(InjectorConfig::fixed_keys_with_diagnostics(), &env);
        });

        assert!(logs.contains("WIFI_SSID: realraum"));
        assert!(logs.contains("WIFI_PASSWORD: <redacted>"));
        assert!(!logs.contains("hunter2"));
        assert!(!logs.contains("correct-horse"));
    }

    #[test]
    fn test_prefix_scan_logs_definitions_without_secrets() {
        let env = env(&[("PIO_BOARD_ID", "42"), ("PIO_WIFI_PASSWORD", "hunter2")]);

        let logs = capture_logs(|| {
            run(InjectorConfig::prefix_scan(), &env);
        });

        assert!(logs.contains("PIO_BOARD_ID=42"));
        assert!(logs.contains("PIO_WIFI_PASSWORD=<redacted>"));
        assert!(!logs.contains("hunter2"));
    }

    #[test]
    fn test_appends_to_existing_configuration() {
        let mut build = DefineSet::new();
        build.define(envdefs::Definition::new("ARDUINO", "10819").unwrap());

        Injector::new(InjectorConfig::prefix_scan())
            .inject(&env(&[("PIO_BOARD_ID", "42")]), &mut build);

        assert_eq!(build.get("ARDUINO"), Some("10819"));
        assert_eq!(build.get("PIO_BOARD_ID"), Some("42"));
    }

    #[cfg(feature = "dotenv")]
    #[test]
    fn test_overlay_is_additive_only() {
        let dir = std::env::temp_dir().join(format!("envdefs-overlay-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        std::fs::write(&path, "PIO_BOARD_ID=7\nPIO_WIFI_SSID=from-file\n").unwrap();

        let mut env = env(&[("PIO_BOARD_ID", "42")]);
        let added = env.overlay_dotenv_file(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(added, 1);
        let build = run(InjectorConfig::prefix_scan(), &env);
        assert_eq!(build.get("PIO_BOARD_ID"), Some("42"));
        assert_eq!(build.get("PIO_WIFI_SSID"), Some("from-file"));
    }

    struct Missing;

    impl CapabilityProbe for Missing {
        fn dotenv_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_missing_capability_on_restricted_host() {
        let host = HostPlatform {
            os: "linux".to_string(),
            release: Some(OsRelease::parse("ID=ubuntu\nID_LIKE=debian\n")),
            executable: Some("/usr/bin/envdefs".into()),
        };
        let mut build = DefineSet::new();

        let install = InstallCommand::cargo(
            &InstallSource::Path("/work/envdefs/envdefs_client".into()),
            "/home/dev/.cargo".as_ref(),
        );
        let result = assess(&Missing, &host, Some(install)).require().map(|()| {
            Injector::new(InjectorConfig::prefix_scan())
                .inject(&env(&[("PIO_BOARD_ID", "42")]), &mut build)
        });

        match result {
            Err(Error::MissingCapability { instruction }) => {
                assert!(instruction.contains("sudo apt install envdefs_client"));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(build.is_empty());
    }

    #[test]
    fn test_missing_capability_on_unrestricted_host_is_installable() {
        let host = HostPlatform {
            os: "linux".to_string(),
            release: None,
            executable: Some("/home/dev/.cargo/bin/envdefs".into()),
        };

        let install = InstallCommand::cargo(
            &InstallSource::Git("https://example.com/envdefs.git".to_string()),
            "/home/dev/.cargo".as_ref(),
        );

        match assess(&Missing, &host, Some(install)) {
            Capability::Installable(command) => {
                assert!(command.binary.starts_with("/home/dev/.cargo/bin"));
            }
            other => panic!("unexpected capability {:?}", other),
        }
    }
}
