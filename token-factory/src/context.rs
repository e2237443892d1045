use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{AppConfig, ConfigProvider, ConfigValue};

/// A host application and its shared configuration.
///
/// Cloning is cheap; clones observe the same configuration. Readers get a
/// consistent view of one value per call, and [`Application::configure`]
/// changes are visible to every later read.
#[derive(Clone, Debug)]
pub struct Application {
    name: Arc<str>,
    config: Arc<RwLock<AppConfig>>,
}

impl Application {
    pub fn new(name: impl Into<String>, config: AppConfig) -> Self {
        Self {
            name: Arc::from(name.into()),
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutate the configuration under the write lock.
    pub fn configure<F, R>(&self, update: F) -> R
    where
        F: FnOnce(&mut AppConfig) -> R,
    {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut guard)
    }
}

impl ConfigProvider for Application {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
    }
}

/// The application the caller is currently serving, if any.
///
/// Passed explicitly to every resolution; an unbound factory reports
/// [`FactoryError::NoApplicationContext`](crate::FactoryError::NoApplicationContext)
/// when this is empty.
#[derive(Clone, Copy, Default)]
pub struct CurrentApp<'a>(Option<&'a dyn ConfigProvider>);

impl<'a> CurrentApp<'a> {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn of(provider: &'a dyn ConfigProvider) -> Self {
        Self(Some(provider))
    }

    pub fn provider(self) -> Option<&'a dyn ConfigProvider> {
        self.0
    }
}
