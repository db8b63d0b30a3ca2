#[cfg(test)]
mod tests {
    use super::super::*;
    use std::env;
    use std::sync::Mutex;

    // Config::from_env reads process-global environment variables, so tests
    // that touch them must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        env::remove_var("MAIL_LASER_TARGET_EMAILS");
        env::remove_var("MAIL_LASER_WEBHOOK_URL");
        env::remove_var("MAIL_LASER_BIND_ADDRESS");
        env::remove_var("MAIL_LASER_PORT");
        env::remove_var("MAIL_LASER_HEALTH_BIND_ADDRESS");
        env::remove_var("MAIL_LASER_HEALTH_PORT");
        env::remove_var("MAIL_LASER_HEADER_PREFIX");
        env::remove_var("MAIL_LASER_WEBHOOK_TIMEOUT");
        env::remove_var("MAIL_LASER_WEBHOOK_MAX_RETRIES");
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("MAIL_LASER_TARGET_EMAILS", "test@example.com, second@example.com");
        env::set_var("MAIL_LASER_WEBHOOK_URL", "https://webhook.example.com/endpoint");
        env::set_var("MAIL_LASER_BIND_ADDRESS", "127.0.0.1");
        env::set_var("MAIL_LASER_PORT", "2525");

        let config = Config::from_env().expect("Failed to load config from environment in test");

        assert_eq!(
            config.target_emails,
            vec!["test@example.com".to_string(), "second@example.com".to_string()]
        );
        assert_eq!(config.webhook_url, "https://webhook.example.com/endpoint");
        assert_eq!(config.smtp_bind_address, "127.0.0.1");
        assert_eq!(config.smtp_port, 2525);

        clear_all();
    }

    #[test]
    fn test_config_default_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("MAIL_LASER_TARGET_EMAILS", "test@example.com");
        env::set_var("MAIL_LASER_WEBHOOK_URL", "https://webhook.example.com/endpoint");

        let config = Config::from_env().expect("Failed to load config from environment in test");

        assert_eq!(config.smtp_bind_address, "0.0.0.0");
        assert_eq!(config.smtp_port, 2525);
        assert_eq!(config.health_check_bind_address, "0.0.0.0");
        assert_eq!(config.health_check_port, 8080);
        assert!(config.header_prefixes.is_empty());
        assert_eq!(config.webhook_timeout_secs, 30);
        assert_eq!(config.webhook_max_retries, 3);

        clear_all();
    }

    #[test]
    fn test_config_missing_required_vars() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();

        let result = Config::from_env();
        assert!(result.is_err());

        clear_all();
    }

    #[test]
    fn test_config_header_prefixes_parsed() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("MAIL_LASER_TARGET_EMAILS", "test@example.com");
        env::set_var("MAIL_LASER_WEBHOOK_URL", "https://webhook.example.com/endpoint");
        env::set_var("MAIL_LASER_HEADER_PREFIX", "X-Custom-, X-Mailer");

        let config = Config::from_env().expect("Failed to load config from environment in test");
        assert_eq!(
            config.header_prefixes,
            vec!["X-Custom-".to_string(), "X-Mailer".to_string()]
        );

        clear_all();
    }
}
