use reqwest::Url;
use tracing::{debug, info, warn};

use super::{DirectoryProvider, MedicosDocProvider};
use crate::error::{Result, ScrapeError};

/// Providers in registration order. The first one that recognises a page wins.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn DirectoryProvider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registry with every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MedicosDocProvider::new()));
        registry
    }

    pub fn register(&mut self, provider: Box<dyn DirectoryProvider>) {
        debug!(provider = provider.name(), "registered provider");
        self.providers.push(provider);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Look a provider up by name.
    ///
    /// # Errors
    /// `UnknownProvider` when nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&dyn DirectoryProvider> {
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .map(|p| p.as_ref())
            .ok_or_else(|| ScrapeError::UnknownProvider {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Pick the provider for a directory given its first page.
    ///
    /// # Errors
    /// `UnknownProvider` for a bad forced name, `NoProviderMatched` when no
    /// provider recognises the page.
    pub fn select(
        &self,
        url: &Url,
        first_page: &str,
        forced: Option<&str>,
    ) -> Result<&dyn DirectoryProvider> {
        if let Some(name) = forced {
            let provider = self.get(name)?;
            if !provider.can_handle(url, first_page) {
                warn!(provider = provider.name(), %url, "forced provider does not recognise the page");
            }
            return Ok(provider);
        }

        let provider = self
            .providers
            .iter()
            .find(|p| p.can_handle(url, first_page))
            .map(|p| p.as_ref())
            .ok_or_else(|| ScrapeError::NoProviderMatched {
                url: url.to_string(),
            })?;

        info!(provider = provider.name(), %url, "selected provider");
        Ok(provider)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
