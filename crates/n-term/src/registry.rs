// SPDX-License-Identifier: MIT
//
// Backend discovery and selection.
//
// Each backend crate exports a `BackendProvider`: a short name, a fully
// qualified id, and a constructor. A registry is just the list of providers
// compiled into this build; selection picks one by name or id, or takes the
// only one when no preference is given. Only the chosen provider's
// constructor ever runs, so a backend whose platform is unusable costs
// nothing unless it is asked for.

use std::fmt;

use crate::backend::{Backend, BackendConfig};
use crate::error::{Error, ProviderList, Result};

/// Constructor signature every provider exports.
pub type CreateFn = fn(&BackendConfig) -> Result<Box<dyn Backend>>;

/// A backend implementation available for selection.
#[derive(Clone, Copy)]
pub struct BackendProvider {
    name: &'static str,
    id: &'static str,
    create: CreateFn,
}

impl BackendProvider {
    #[must_use]
    pub const fn new(name: &'static str, id: &'static str, create: CreateFn) -> Self {
        Self { name, id, create }
    }

    /// Short name, matched case-insensitively (e.g. `native`).
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Fully qualified id, matched exactly (e.g. `n_native::NativeBackend`).
    #[inline]
    #[must_use]
    pub const fn id(&self) -> &'static str {
        self.id
    }

    #[must_use]
    pub const fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name,
            id: self.id,
        }
    }

    /// Run the constructor, wrapping any failure with the provider's identity.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderInstantiation`] around the constructor's error.
    pub fn instantiate(&self, config: &BackendConfig) -> Result<Box<dyn Backend>> {
        (self.create)(config).map_err(|source| Error::ProviderInstantiation {
            name: self.name,
            id: self.id,
            source: Box::new(source),
        })
    }

    fn matches(&self, selector: &str) -> bool {
        if selector.contains("::") {
            self.id == selector
        } else {
            self.name.eq_ignore_ascii_case(selector)
        }
    }
}

impl fmt::Debug for BackendProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendProvider")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Read-only description of a provider, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub id: &'static str,
}

impl fmt::Display for ProviderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// The providers compiled into this build, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<BackendProvider>,
}

impl ProviderRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn register(&mut self, provider: BackendProvider) {
        tracing::trace!(name = provider.name, id = provider.id, "backend registered");
        self.providers.push(provider);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, provider: BackendProvider) -> Self {
        self.register(provider);
        self
    }

    #[must_use]
    pub fn providers(&self) -> &[BackendProvider] {
        &self.providers
    }

    /// Every registered provider as `name (id)`.
    #[must_use]
    pub fn describe(&self) -> Vec<ProviderInfo> {
        self.providers.iter().map(BackendProvider::info).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Pick a provider.
    ///
    /// A `selector` containing `::` is compared against ids exactly; anything
    /// else against names, ignoring case. With no selector (or a blank one)
    /// the registry must contain exactly one provider.
    ///
    /// # Errors
    ///
    /// - [`Error::NoProvider`] if nothing is registered.
    /// - [`Error::ProviderNotFound`] if `selector` matches nothing.
    /// - [`Error::AmbiguousProvider`] if there's no selector and several
    ///   providers.
    pub fn select(&self, selector: Option<&str>) -> Result<&BackendProvider> {
        if self.providers.is_empty() {
            return Err(Error::NoProvider);
        }

        match selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(selector) => self
                .providers
                .iter()
                .find(|p| p.matches(selector))
                .ok_or_else(|| Error::ProviderNotFound {
                    requested: selector.to_owned(),
                    available: ProviderList(self.describe()),
                }),
            None => match self.providers.as_slice() {
                [only] => Ok(only),
                _ => Err(Error::AmbiguousProvider {
                    available: ProviderList(self.describe()),
                }),
            },
        }
    }

    /// Select a provider and construct its backend.
    ///
    /// # Errors
    ///
    /// Any [`select`](Self::select) error, or
    /// [`Error::ProviderInstantiation`] if the constructor fails.
    pub fn create(&self, selector: Option<&str>, config: &BackendConfig) -> Result<Box<dyn Backend>> {
        let provider = self.select(selector)?;
        tracing::debug!(
            name = provider.name,
            id = provider.id,
            requested = selector,
            "creating terminal backend"
        );
        provider.instantiate(config)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
