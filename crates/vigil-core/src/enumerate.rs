//! Target enumeration.
//!
//! Pure functions from the configuration table to ordered target lists.
//! An empty category yields an empty list, never an error.

use crate::catalog::{Locale, SuiteConfig};
use crate::models::Target;

/// Path of `path` rendered in `locale`; the default locale has no prefix.
pub fn locale_path(config: &SuiteConfig, locale: &Locale, path: &str) -> String {
    if locale.code == config.default_locale {
        path.to_string()
    } else {
        format!("/{}{}", locale.code, path)
    }
}

fn locale_target(config: &SuiteConfig, locale: &Locale, path: &str) -> Target {
    let target = Target::locale(&locale.code, locale_path(config, locale, path));
    if locale.optional {
        target.optional()
    } else {
        target
    }
}

/// One target per configured locale, for the same page.
pub fn locale_targets(config: &SuiteConfig, path: &str) -> Vec<Target> {
    config
        .locales
        .iter()
        .map(|locale| locale_target(config, locale, path))
        .collect()
}

/// One target per provider guide, expecting the provider's keyword.
pub fn provider_targets(config: &SuiteConfig) -> Vec<Target> {
    let base = config.provider_base.trim_end_matches('/');
    config
        .providers
        .iter()
        .map(|provider| {
            let target = Target::provider(&provider.name, format!("{base}/{}", provider.slug))
                .expecting(provider.keyword());
            if provider.optional {
                target.optional()
            } else {
                target
            }
        })
        .collect()
}

pub fn page_targets<I, S>(paths: I) -> Vec<Target>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .map(|p| Target::page(p.as_ref()))
        .collect()
}

/// Every (locale, page) combination, locale-major.
pub fn locale_page_matrix<S: AsRef<str>>(config: &SuiteConfig, paths: &[S]) -> Vec<Target> {
    config
        .locales
        .iter()
        .flat_map(|locale| {
            paths
                .iter()
                .map(move |path| locale_target(config, locale, path.as_ref()))
        })
        .collect()
}
