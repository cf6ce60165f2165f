//! Task-derived layers for the site and space configs.

use press_core::SiteTask;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::mapping_of;

fn non_empty(value: &str) -> Option<Value> {
    let value = value.trim();
    (!value.is_empty()).then(|| Value::from(value))
}

fn to_value<T: Serialize>(value: &T) -> Option<Value> {
    serde_yaml::to_value(value).ok()
}

/// Generator config keys derived from a site task.
///
/// Blank fields are left out so they never mask a lower layer.
pub fn site_layer(task: &SiteTask) -> Mapping {
    let site = &task.site;

    let url = site
        .custom_domain()
        .map(|domain| Value::from(format!("https://{}", domain)));

    let keywords = (!site.keywords.is_empty()).then(|| {
        Value::Sequence(site.keywords.iter().map(|k| Value::from(k.as_str())).collect())
    });

    mapping_of([
        ("title", non_empty(&site.title)),
        ("description", non_empty(&site.description)),
        ("author", non_empty(&site.author)),
        ("language", site.language.as_deref().and_then(non_empty)),
        ("timezone", site.timezone.as_deref().and_then(non_empty)),
        ("url", url),
        ("keywords", keywords),
        ("theme", non_empty(&task.theme.name)),
    ])
}

/// Space config sections derived from a site task.
pub fn space_layer(task: &SiteTask) -> Mapping {
    mapping_of([
        ("user", to_value(&task.user)),
        ("site", to_value(&task.site)),
        ("theme", to_value(&task.theme)),
        ("gateway", task.gateway.clone()),
        ("metadata", task.metadata.clone()),
    ])
}
