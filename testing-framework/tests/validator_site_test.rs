#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Validator Site Tests
//!
//! Loading publisher site uris, and fetching signed validator lists from
//! publishers served on the application's runtime.

use std::{sync::Arc, time::Duration};
use trackable_common::{crypto::KeyPair, features::FeatureSet};
use trackable_daemon::validators::{
    ListDisposition, Manifest, ValidatorList, ValidatorListError, ValidatorSite, LIST_VERSION,
};
use trackable_testing_framework::{
    jtx::{envconfig_with, Env, EnvError},
    utilities::{init_test_logging, PublishedValidator, TrustedPublisherServer},
};

// ============================================================================
// Test Helpers
// ============================================================================

// Validators on each published list
const LIST_SIZE: usize = 20;

fn owned(uris: &[&str]) -> Vec<String> {
    uris.iter().map(|uri| uri.to_string()).collect()
}

// A validator list sharing the application's manifests and clock
fn validator_list(env: &Env) -> Arc<ValidatorList> {
    let app = env.app();
    Arc::new(ValidatorList::new(
        app.validators().manifests().clone(),
        app.time_keeper().clone(),
    ))
}

struct Publisher {
    master: KeyPair,
    server: TrustedPublisherServer,
    validators: Vec<PublishedValidator>,
}

fn start_publisher(env: &Env, sequence: u32) -> Publisher {
    let master = KeyPair::random();
    let signing = KeyPair::random();
    let manifest = Manifest::make(&master, &signing, 1).unwrap();
    let validators: Vec<_> = (0..LIST_SIZE)
        .map(|_| PublishedValidator::random().unwrap())
        .collect();

    // Valid for an hour of network time
    let expiration = (env.now() + Duration::from_secs(3600)).as_secs();
    let server = TrustedPublisherServer::start(
        env.app().runtime(),
        &manifest,
        &signing,
        sequence,
        expiration,
        LIST_VERSION,
        &validators,
    )
    .unwrap();

    Publisher {
        master,
        server,
        validators,
    }
}

// ============================================================================
// Config Load
// ============================================================================

#[test]
fn test_config_load() {
    init_test_logging();
    let env = Env::new();
    let site = || ValidatorSite::new(env.app().runtime().clone(), validator_list(&env));

    // Empty list of sites
    assert!(site().load(&[]).is_ok());

    // Valid sites
    let good = owned(&[
        "http://trackable.com/",
        "http://trackable.com/validators",
        "http://trackable.com:8080/validators",
        "http://207.126.33.37/validators",
        "http://207.126.33.37:8080/validators",
        "https://trackable.com/validators",
        "https://trackable.com:443/validators",
    ]);
    assert!(site().load(&good).is_ok());

    // Unsupported schemes and a uri without one
    for bad in [
        "ftp://trackable.com/validators",
        "wss://trackable.com/validators",
        "trackable.com/validators",
    ] {
        let mut sites = good.clone();
        sites.push(bad.to_owned());
        assert!(site().load(&sites).is_err(), "{} accepted", bad);
        assert!(site().load(&owned(&[bad])).is_err(), "{} accepted", bad);
    }

    assert!(matches!(
        site().load(&owned(&["ftp://trackable.com/validators"])),
        Err(ValidatorListError::UnsupportedScheme(scheme)) if scheme == "ftp"
    ));
    assert!(matches!(
        site().load(&owned(&["trackable.com/validators"])),
        Err(ValidatorListError::InvalidUri(_))
    ));
}

#[test]
fn test_bad_configured_site_fails_startup() {
    init_test_logging();
    let config = envconfig_with(|mut config| {
        config.validator_list_sites = owned(&["wss://trackable.com/validators"]);
        config
    });
    let result = Env::try_new(config, FeatureSet::new());
    assert!(matches!(result, Err(EnvError::Application(_))));
}

// ============================================================================
// Fetch List
// ============================================================================

#[test]
fn test_fetch_list() {
    init_test_logging();
    let env = Env::new();
    let publishers = [start_publisher(&env, 1), start_publisher(&env, 1)];

    let validators = validator_list(&env);
    let publisher_keys: Vec<String> = publishers
        .iter()
        .map(|p| p.master.public_key().to_hex())
        .collect();
    validators.load(None, &[], &publisher_keys).unwrap();
    for publisher in &publishers {
        assert!(validators.trusted_publisher(publisher.master.public_key()));
    }

    let sites = ValidatorSite::new(env.app().runtime().clone(), validators.clone());
    let uris: Vec<String> = publishers.iter().map(|p| p.server.uri()).collect();
    sites.load(&uris).unwrap();
    sites.start();
    sites.join();

    for (publisher, uri) in publishers.iter().zip(&uris) {
        assert_eq!(sites.last_disposition(uri), Some(ListDisposition::Accepted), "{}", uri);
        for validator in &publisher.validators {
            assert!(validators.listed(validator.master.public_key()));
            assert!(validators.listed(validator.signing.public_key()));
            assert!(validators.trusted(validator.master.public_key()));
        }
    }
    assert_eq!(validators.trusted_count(), 2 * LIST_SIZE);
}

#[test]
fn test_list_from_unknown_publisher_is_untrusted() {
    init_test_logging();
    let env = Env::new();
    let publisher = start_publisher(&env, 1);

    // No publisher keys configured
    let validators = validator_list(&env);
    validators.load(None, &[], &[]).unwrap();

    let sites = ValidatorSite::new(env.app().runtime().clone(), validators.clone());
    let uri = publisher.server.uri();
    sites.load(&[uri.clone()]).unwrap();
    sites.start();
    sites.join();

    assert_eq!(sites.last_disposition(&uri), Some(ListDisposition::Untrusted));
    for validator in &publisher.validators {
        assert!(!validators.listed(validator.master.public_key()));
    }
    assert_eq!(validators.trusted_count(), 0);
}
