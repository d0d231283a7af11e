use crate::pfcp::pfd::ApplicationIdsPfds;
use log::{debug, info};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPfd {
    app_id: String,
    flow_descs: Vec<String>,
}

impl AppPfd {
    pub fn new(app_id: impl Into<String>, flow_descs: Vec<String>) -> Self {
        AppPfd {
            app_id: app_id.into(),
            flow_descs,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn flow_descs(&self) -> &[String] {
        &self.flow_descs
    }
}

/// Entries are always stored under their own `app_id`, so a lookup never
/// returns a record for a different application.
#[derive(Debug, Clone, Default)]
pub struct AppPfdRegistry {
    pfds: HashMap<String, AppPfd>,
}

impl AppPfdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pfd: AppPfd) -> Option<AppPfd> {
        self.pfds.insert(pfd.app_id.clone(), pfd)
    }

    pub fn remove(&mut self, app_id: &str) -> Option<AppPfd> {
        self.pfds.remove(app_id)
    }

    pub fn get(&self, app_id: &str) -> Option<&AppPfd> {
        self.pfds.get(app_id)
    }

    pub fn len(&self) -> usize {
        self.pfds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pfds.is_empty()
    }

    /// Installs the contents of a PFD Management Request. An application
    /// sent without any PFD context has its PFDs deleted; otherwise the
    /// stored flow descriptions are replaced.
    pub fn apply_pfd_management(&mut self, applications: &[ApplicationIdsPfds]) {
        for app in applications {
            if app.contexts.is_empty() {
                if self.remove(&app.app_id).is_some() {
                    info!("Removed PFDs for application {}", app.app_id);
                }
                continue;
            }

            let flow_descs = app.flow_descriptions();
            debug!("Application {} flow descriptions: {:?}", app.app_id, flow_descs);
            self.insert(AppPfd::new(app.app_id.clone(), flow_descs));
            info!("Installed PFDs for application {}", app.app_id);
        }
    }
}

impl FromIterator<AppPfd> for AppPfdRegistry {
    fn from_iter<I: IntoIterator<Item = AppPfd>>(iter: I) -> Self {
        let mut registry = AppPfdRegistry::new();
        for pfd in iter {
            registry.insert(pfd);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pfcp::pfd::{PfdContents, PfdContext};

    fn pfds(app_id: &str, descs: &[&str]) -> ApplicationIdsPfds {
        ApplicationIdsPfds {
            app_id: app_id.to_string(),
            contexts: vec![PfdContext {
                contents: descs
                    .iter()
                    .map(|d| PfdContents {
                        flow_description: Some(d.to_string()),
                        additional_flow_descriptions: Vec::new(),
                    })
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_insert_keys_by_app_id() {
        let mut registry = AppPfdRegistry::new();
        registry.insert(AppPfd::new("app1", vec!["permit out ip from any to any".to_string()]));

        let pfd = registry.get("app1").unwrap();
        assert_eq!(pfd.app_id(), "app1");
        assert_eq!(pfd.flow_descs().len(), 1);
        assert!(registry.get("app2").is_none());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut registry: AppPfdRegistry =
            vec![AppPfd::new("app1", vec!["permit out ip from any to any".to_string()])]
                .into_iter()
                .collect();

        let old = registry.insert(AppPfd::new("app1", Vec::new()));

        assert!(old.is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.get("app1").unwrap().flow_descs().is_empty());
    }

    #[test]
    fn test_pfd_management_install_and_remove() {
        let mut registry = AppPfdRegistry::new();
        registry.apply_pfd_management(&[
            pfds("app1", &["permit out 6 from any to assigned 80"]),
            pfds("app2", &["permit in 17 from assigned to any 53"]),
        ]);
        assert_eq!(registry.len(), 2);

        registry.apply_pfd_management(&[ApplicationIdsPfds {
            app_id: "app1".to_string(),
            contexts: Vec::new(),
        }]);

        assert!(registry.get("app1").is_none());
        assert_eq!(
            registry.get("app2").unwrap().flow_descs(),
            &["permit in 17 from assigned to any 53".to_string()]
        );
    }
}
