use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use shared::domain::{Conversation, Product, Settings, Template};
use tracing::info;

use crate::{Entity, MockRepository, SettingsStore};

const CONVERSATIONS_JSON: &str = include_str!("../seed/conversations.json");
const PRODUCTS_JSON: &str = include_str!("../seed/products.json");
const TEMPLATES_JSON: &str = include_str!("../seed/templates.json");
const SETTINGS_JSON: &str = include_str!("../seed/settings.json");

/// Fixed data every repository starts from.
#[derive(Debug, Clone, Default)]
pub struct SeedSnapshot {
    pub conversations: Vec<Conversation>,
    pub products: Vec<Product>,
    pub templates: Vec<Template>,
    pub settings: Settings,
}

/// One repository per collection, all built from the same snapshot.
#[derive(Clone)]
pub struct Repositories {
    pub conversations: Arc<MockRepository<Conversation>>,
    pub products: Arc<MockRepository<Product>>,
    pub templates: Arc<MockRepository<Template>>,
    pub settings: Arc<SettingsStore>,
}

impl SeedSnapshot {
    /// The snapshot compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Ok(Self {
            conversations: parse("conversations.json", CONVERSATIONS_JSON)?,
            products: parse("products.json", PRODUCTS_JSON)?,
            templates: parse("templates.json", TEMPLATES_JSON)?,
            settings: parse("settings.json", SETTINGS_JSON)?,
        })
    }

    /// Reads seed files from `dir`, falling back to the bundled copy for any
    /// file that is absent.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            conversations: read_or_bundled(dir, "conversations.json", CONVERSATIONS_JSON)?,
            products: read_or_bundled(dir, "products.json", PRODUCTS_JSON)?,
            templates: read_or_bundled(dir, "templates.json", TEMPLATES_JSON)?,
            settings: read_or_bundled(dir, "settings.json", SETTINGS_JSON)?,
        })
    }

    /// Builds fresh repositories holding their own copies of the snapshot.
    /// `latency_scale` stretches or shrinks every simulated delay.
    pub fn load(&self, latency_scale: f64) -> Repositories {
        Repositories {
            conversations: Arc::new(repository(&self.conversations, latency_scale)),
            products: Arc::new(repository(&self.products, latency_scale)),
            templates: Arc::new(repository(&self.templates, latency_scale)),
            settings: Arc::new(SettingsStore::with_latency(
                self.settings.clone(),
                SettingsStore::default_latency().scaled(latency_scale),
            )),
        }
    }
}

fn repository<T: Entity>(seed: &[T], latency_scale: f64) -> MockRepository<T> {
    MockRepository::new(seed.to_vec(), T::default_latency().scaled(latency_scale))
}

fn parse<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("failed to parse seed file {name}"))
}

fn read_or_bundled<T: DeserializeOwned>(dir: &Path, name: &str, bundled: &str) -> Result<T> {
    let path = dir.join(name);
    match fs::read_to_string(&path) {
        Ok(raw) => {
            info!(path = %path.display(), "loading seed override");
            parse(name, &raw)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => parse(name, bundled),
        Err(err) => Err(err).with_context(|| format!("failed to read '{}'", path.display())),
    }
}
