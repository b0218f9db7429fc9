use futures::future::join_all;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::{runtime::Handle, task::JoinHandle};
use url::Url;

use super::{
    list::{ListDisposition, PublishedList, ValidatorList},
    ValidatorListError,
};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
struct Site {
    uri: Url,
    last_disposition: Option<ListDisposition>,
}

/// Fetches validator lists from publisher sites and hands them to the
/// validator list.
pub struct ValidatorSite {
    runtime: Handle,
    validators: Arc<ValidatorList>,
    sites: Arc<Mutex<Vec<Site>>>,
    fetches: Mutex<Vec<JoinHandle<()>>>,
}

impl ValidatorSite {
    pub fn new(runtime: Handle, validators: Arc<ValidatorList>) -> Self {
        Self {
            runtime,
            validators,
            sites: Arc::new(Mutex::new(Vec::new())),
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// Add sites to fetch from. Nothing is added unless every uri is an
    /// http or https url.
    pub fn load(&self, uris: &[String]) -> Result<(), ValidatorListError> {
        let mut parsed = Vec::with_capacity(uris.len());
        for uri in uris {
            let url = Url::parse(uri).map_err(|e| {
                error!("Invalid validator site uri {}: {}", uri, e);
                ValidatorListError::InvalidUri(uri.clone())
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                error!("Unsupported scheme in validator site uri {}", uri);
                return Err(ValidatorListError::UnsupportedScheme(url.scheme().to_owned()));
            }
            parsed.push(Site {
                uri: url,
                last_disposition: None,
            });
        }
        debug!("Loaded {} validator sites", parsed.len());
        self.sites.lock().extend(parsed);
        Ok(())
    }

    /// Fetch every loaded site once on the runtime.
    pub fn start(&self) {
        let sites = self.sites.lock().clone();
        let client = match reqwest::Client::builder().timeout(FETCH_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                error!("Unable to build http client: {}", e);
                return;
            }
        };
        let mut fetches = self.fetches.lock();
        for (index, site) in sites.into_iter().enumerate() {
            let client = client.clone();
            let validators = self.validators.clone();
            let shared = self.sites.clone();
            fetches.push(self.runtime.spawn(async move {
                let disposition = match fetch(&client, &site.uri).await {
                    Ok(list) => {
                        let disposition =
                            validators.apply_list(&list.manifest, &list.blob, &list.signature, list.version);
                        info!("Applied list from {}: {:?}", site.uri, disposition);
                        Some(disposition)
                    }
                    Err(e) => {
                        warn!("Unable to fetch validator list from {}: {}", site.uri, e);
                        None
                    }
                };
                if let Some(entry) = shared.lock().get_mut(index) {
                    entry.last_disposition = disposition;
                }
            }));
        }
    }

    /// Block until every started fetch finished.
    pub fn join(&self) {
        let fetches: Vec<_> = self.fetches.lock().drain(..).collect();
        for result in futures::executor::block_on(join_all(fetches)) {
            if let Err(e) = result {
                error!("Validator site fetch failed: {}", e);
            }
        }
    }

    pub fn last_disposition(&self, uri: &str) -> Option<ListDisposition> {
        self.sites
            .lock()
            .iter()
            .find(|site| site.uri.as_str() == uri)
            .and_then(|site| site.last_disposition)
    }
}

async fn fetch(client: &reqwest::Client, uri: &Url) -> Result<PublishedList, ValidatorListError> {
    let response = client.get(uri.clone()).send().await?.error_for_status()?;
    Ok(response.json::<PublishedList>().await?)
}

impl Drop for ValidatorSite {
    fn drop(&mut self) {
        for fetch in self.fetches.lock().drain(..) {
            fetch.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{time_keeper::SystemTimeKeeper, validators::ManifestCache};

    fn site(runtime: &tokio::runtime::Runtime) -> ValidatorSite {
        let list = ValidatorList::new(Arc::new(ManifestCache::new()), Arc::new(SystemTimeKeeper));
        ValidatorSite::new(runtime.handle().clone(), Arc::new(list))
    }

    #[test]
    fn test_load_schemes() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let sites = site(&runtime);
        assert!(sites.load(&[]).is_ok());
        assert!(sites
            .load(&["https://example.com:443/validators".to_string()])
            .is_ok());
        for bad in ["ftp://example.com/validators", "wss://example.com/validators", "example.com/validators"] {
            assert!(sites.load(&[bad.to_string()]).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_unreachable_site_still_joins() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let sites = site(&runtime);
        sites.load(&["http://127.0.0.1:1/validators".to_string()]).unwrap();
        sites.start();
        sites.join();
        assert_eq!(sites.last_disposition("http://127.0.0.1:1/validators"), None);
    }
}
