use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{error, warn};
use unic_langid::LanguageIdentifier;

/// English message catalog, compiled into the binary.
const MAIN_FTL: &str = include_str!("../locales/en/main.ftl");

/// Message catalog for the bot replies
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Create a new localization manager from the bundled English catalog
    pub fn new() -> Result<Self> {
        Self::from_source(MAIN_FTL)
    }

    /// Create a localization manager from Fluent source text
    pub fn from_source(source: &str) -> Result<Self> {
        let mut bundle = Self::create_bundle()?;

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Failed to parse message catalog: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Conflicting message catalog entries: {errors:?}"))?;

        Ok(Self { bundle })
    }

    fn empty() -> Self {
        // Bundle creation only parses a constant locale
        let bundle = Self::create_bundle()
            .unwrap_or_else(|_| FluentBundle::new_concurrent(Vec::new()));
        Self { bundle }
    }

    fn create_bundle() -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = "en".parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Replies are plain text, no bidi isolation marks around arguments
        bundle.set_use_isolating(false);
        Ok(bundle)
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, value.to_string());
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = self
            .bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, errors = ?errors, "Message formatted with errors");
        }

        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message(key, Some(&args_map))
    }

    pub fn has_message(&self, key: &str) -> bool {
        self.bundle.has_message(key)
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager, failing if the catalog is broken
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        // A concurrent initializer may have won, both hold the same catalog
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(|| {
        LocalizationManager::new().unwrap_or_else(|e| {
            error!(error = %e, "Message catalog unavailable, replies will show missing keys");
            LocalizationManager::empty()
        })
    })
}

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    get_localization_manager().get_message(key, None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    get_localization_manager().get_message_with_args(key, args)
}
