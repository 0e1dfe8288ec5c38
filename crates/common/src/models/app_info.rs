//! Application attributes that give buyers transparency into the inventory.

use serde::{Deserialize, Serialize};

/// Application information supplied by the host application.
///
/// `app_id` and `name` are fixed at construction. The store URL should
/// contain the store id of the app, e.g.
/// `https://itunes.apple.com/us/app/id1175273098?mt=8`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    app_id: String,
    name: String,
    /// Domain of the application, e.g. "mygame.foo.com".
    pub domain: Option<String>,
    pub store_url: Option<String>,
    /// Comma separated IAB categories, e.g. "IAB-1, IAB-2".
    pub categories: Option<String>,
    /// Paid version of the app. Omitted from requests when unset.
    pub paid: Option<bool>,
}

impl ApplicationInfo {
    #[must_use]
    pub fn new(app_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Exchange-specific app id.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Categories with surrounding whitespace removed, e.g. "IAB-1,IAB-2".
    #[must_use]
    pub fn normalized_categories(&self) -> Option<String> {
        self.categories.as_ref().map(|cats| {
            cats.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(",")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_identity() {
        let info = ApplicationInfo::new("1175273098", "Sample");
        assert_eq!(info.app_id(), "1175273098");
        assert_eq!(info.name(), "Sample");
        assert_eq!(info.paid, None);
    }

    #[test]
    fn test_normalized_categories() {
        let mut info = ApplicationInfo::new("id", "name");
        info.categories = Some(" IAB-1, IAB-2 ,,".to_string());
        assert_eq!(info.normalized_categories().as_deref(), Some("IAB-1,IAB-2"));
    }
}
