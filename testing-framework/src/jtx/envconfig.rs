// File: testing-framework/src/jtx/envconfig.rs
//
// Configurations for test environments. Modifiers compose:
//
//     let cfg = envconfig_with(|cfg| validator(no_admin(cfg), ""));

use trackable_daemon::config::Config;

/// Validation seed used when `validator` is given an empty one.
pub const DEFAULT_VALIDATION_SEED: &str = "validator test seed";

/// The configuration every test environment starts from: standalone, in
/// memory, admin on both transports, signatures checked.
pub fn envconfig() -> Config {
    Config::default()
}

/// `envconfig()` passed through `modify`.
pub fn envconfig_with(modify: impl FnOnce(Config) -> Config) -> Config {
    modify(envconfig())
}

/// Take admin rights away from both transports.
pub fn no_admin(mut cfg: Config) -> Config {
    cfg.rpc_admin = false;
    cfg.ws_admin = false;
    cfg
}

/// Run as a validator signing with `seed`, or with a fixed seed when empty.
pub fn validator(mut cfg: Config, seed: &str) -> Config {
    let seed = if seed.is_empty() {
        DEFAULT_VALIDATION_SEED
    } else {
        seed
    };
    cfg.validation_seed = Some(seed.to_owned());
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_compose() {
        let cfg = envconfig_with(|cfg| validator(no_admin(cfg), ""));
        assert!(!cfg.rpc_admin);
        assert!(!cfg.ws_admin);
        assert_eq!(cfg.validation_seed.as_deref(), Some(DEFAULT_VALIDATION_SEED));
        assert!(cfg.standalone);
    }
}
