// Configuration loading for upstream access and the group registry
use serde::{Deserialize, Serialize};

use crate::domain::error::GatewayError;
use crate::infrastructure::session::AuthMode;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_dashboard_ids")]
    pub dashboard_ids: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_dashboard_ids() -> String {
    "42,43,51,52,81".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Settings {
    pub fn base_url(&self) -> String {
        self.url.trim_end_matches('/').to_string()
    }

    /// The configured top-level summary dashboards, in listed order.
    pub fn dashboard_id_list(&self) -> Vec<i64> {
        self.dashboard_ids
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect()
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() || (self.username.is_some() && self.password.is_some())
    }

    /// API key wins over username/password when both are configured.
    pub fn auth_mode(&self) -> Option<AuthMode> {
        if let Some(key) = &self.api_key {
            return Some(AuthMode::ApiKey(key.clone()));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(AuthMode::Password {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/metabase").required(false))
        .add_source(config::Environment::with_prefix("METABASE"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Static mapping from a database-group key to the upstream card and
/// dashboard identifiers backing each of its views. Immutable after
/// startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRegistry {
    pub groups: Vec<DashboardGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardGroup {
    pub key: String,
    pub jobs: JobCards,
    pub workspaces: WorkspaceCards,
    pub files: FileCards,
    pub hyperlinks: HyperlinkCards,
    pub permissions: PermissionCards,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCards {
    pub dashboard_id: i64,
    pub job_list_card: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceCards {
    pub dashboard_id: i64,
    pub workspace_list_card: i64,
    pub file_folder_status_card: i64,
    pub hyperlinks_status_card: i64,
    pub permissions_status_card: i64,
    pub total_file_size_card: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCards {
    pub dashboard_id: i64,
    pub conflicts_card: i64,
    pub files_list_card: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HyperlinkCards {
    pub dashboard_id: i64,
    pub hyperlinks_list_card: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCards {
    pub dashboard_id: i64,
    pub permissions_list_card: i64,
}

/// Sentinel filter value meaning "no restriction".
pub const ALL: &str = "ALL";

impl GroupRegistry {
    pub fn group(&self, key: &str) -> Option<&DashboardGroup> {
        self.groups.iter().find(|g| g.key == key)
    }

    /// All groups, or the single named one. Unknown names are an error so
    /// a typoed filter is not silently widened to every group.
    pub fn select(&self, key: Option<&str>) -> Result<Vec<&DashboardGroup>, GatewayError> {
        match key {
            None => Ok(self.groups.iter().collect()),
            Some(k) if k == ALL => Ok(self.groups.iter().collect()),
            Some(k) => self
                .group(k)
                .map(|g| vec![g])
                .ok_or_else(|| GatewayError::UnknownGroup(k.to_string())),
        }
    }
}

fn group(
    key: &str,
    jobs: (i64, i64),
    workspaces: (i64, i64, i64, i64, i64, i64),
    files: (i64, i64, i64),
    hyperlinks: (i64, i64),
    permissions: (i64, i64),
) -> DashboardGroup {
    DashboardGroup {
        key: key.to_string(),
        jobs: JobCards {
            dashboard_id: jobs.0,
            job_list_card: jobs.1,
        },
        workspaces: WorkspaceCards {
            dashboard_id: workspaces.0,
            workspace_list_card: workspaces.1,
            file_folder_status_card: workspaces.2,
            hyperlinks_status_card: workspaces.3,
            permissions_status_card: workspaces.4,
            total_file_size_card: workspaces.5,
        },
        files: FileCards {
            dashboard_id: files.0,
            conflicts_card: files.1,
            files_list_card: files.2,
        },
        hyperlinks: HyperlinkCards {
            dashboard_id: hyperlinks.0,
            hyperlinks_list_card: hyperlinks.1,
        },
        permissions: PermissionCards {
            dashboard_id: permissions.0,
            permissions_list_card: permissions.1,
        },
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        GroupRegistry {
            groups: vec![
                group("WP1", (29, 143), (30, 156, 137, 140, 149, 152), (27, 136, 138), (28, 139), (31, 148)),
                group("WP2", (37, 161), (38, 164, 157, 160, 167, 170), (35, 154, 156), (36, 159), (39, 166)),
                group("WP3", (46, 176), (47, 179, 172, 175, 182, 185), (44, 169, 171), (45, 174), (48, 181)),
                group("WP4", (55, 191), (56, 194, 187, 190, 197, 200), (53, 184, 186), (54, 189), (57, 196)),
                group("WP5", (76, 221), (77, 224, 217, 220, 227, 230), (74, 214, 216), (75, 219), (78, 226)),
            ],
        }
    }
}

/// Load the group registry from `config/registry`, falling back to the
/// built-in card tables when no file is present.
pub fn load_registry() -> anyhow::Result<GroupRegistry> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name("config/registry").required(false))
        .build()?;

    match cfg.get::<Vec<DashboardGroup>>("groups") {
        Ok(groups) => Ok(GroupRegistry { groups }),
        Err(config::ConfigError::NotFound(_)) => Ok(GroupRegistry::default()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            url: "http://metabase.internal/".to_string(),
            username: None,
            password: None,
            api_key: None,
            dashboard_ids: "42, 43,51 ,bogus,81".to_string(),
            port: 3000,
        }
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        assert_eq!(settings().base_url(), "http://metabase.internal");
    }

    #[test]
    fn dashboard_ids_are_trimmed_and_unparseable_entries_skipped() {
        assert_eq!(settings().dashboard_id_list(), [42, 43, 51, 81]);
    }

    #[test]
    fn api_key_wins_over_password_credentials() {
        let mut settings = settings();
        settings.api_key = Some("mb_key".to_string());
        settings.username = Some("user".to_string());
        settings.password = Some("pass".to_string());
        assert!(matches!(settings.auth_mode(), Some(AuthMode::ApiKey(_))));
        assert!(settings.has_credentials());
    }

    #[test]
    fn partial_password_credentials_count_as_absent() {
        let mut settings = settings();
        settings.username = Some("user".to_string());
        assert!(settings.auth_mode().is_none());
        assert!(!settings.has_credentials());
    }

    #[test]
    fn registry_lookup_and_selection() {
        let registry = GroupRegistry::default();
        assert_eq!(registry.groups.len(), 5);
        assert_eq!(registry.group("WP3").unwrap().jobs.job_list_card, 176);

        assert_eq!(registry.select(None).unwrap().len(), 5);
        assert_eq!(registry.select(Some("ALL")).unwrap().len(), 5);
        assert_eq!(registry.select(Some("WP2")).unwrap()[0].key, "WP2");
        assert!(matches!(
            registry.select(Some("WP9")),
            Err(GatewayError::UnknownGroup(_))
        ));
    }
}
