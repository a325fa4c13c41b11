//! Backend API addressing.
//!
//! Each panel talks to its own `/api/<namespace>/...` tree and always
//! passes the active org and env (and user, when one is selected) as
//! query parameters.

use serde::{Deserialize, Serialize};
use terrain_protocol::Packet;
use url::Url;

use crate::error::PanelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiNamespace {
    Tsm,
    Screentool,
    Vox,
    Tut,
    Voxlab,
}

impl ApiNamespace {
    pub const ALL: [ApiNamespace; 5] = [
        ApiNamespace::Tsm,
        ApiNamespace::Screentool,
        ApiNamespace::Vox,
        ApiNamespace::Tut,
        ApiNamespace::Voxlab,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tsm => "tsm",
            Self::Screentool => "screentool",
            Self::Vox => "vox",
            Self::Tut => "tut",
            Self::Voxlab => "voxlab",
        }
    }

    pub fn parse(s: &str) -> Result<Self, PanelError> {
        Self::ALL
            .into_iter()
            .find(|ns| ns.as_str() == s)
            .ok_or_else(|| PanelError::UnknownNamespace(s.to_string()))
    }
}

impl std::fmt::Display for ApiNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters shared by every panel request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelQuery {
    pub org: String,
    pub env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl PanelQuery {
    pub fn new(org: &str, env: &str) -> Self {
        Self {
            org: org.to_string(),
            env: env.to_string(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    /// Read org/env/user out of an environment-change packet.
    pub fn from_packet(packet: &Packet) -> Option<Self> {
        serde_json::from_value(packet.payload.clone()).ok()
    }

    /// `<base>/api/<namespace>/<path>?org=..&env=..[&user=..]`
    pub fn endpoint(
        &self,
        base: &Url,
        namespace: ApiNamespace,
        path: &str,
    ) -> Result<Url, PanelError> {
        let mut url = base.join(&format!(
            "/api/{}/{}",
            namespace,
            path.trim_start_matches('/')
        ))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("org", &self.org);
            pairs.append_pair("env", &self.env);
            if let Some(user) = &self.user {
                pairs.append_pair("user", user);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain_protocol::{PacketType, TerrainTopics};

    fn base() -> Url {
        Url::parse("http://localhost:4444").unwrap()
    }

    #[test]
    fn test_endpoint_carries_org_and_env() {
        let url = PanelQuery::new("acme", "dev")
            .endpoint(&base(), ApiNamespace::Tsm, "services")
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:4444/api/tsm/services?org=acme&env=dev");
    }

    #[test]
    fn test_endpoint_with_user_and_escaping() {
        let url = PanelQuery::new("acme corp", "prod")
            .with_user("mike")
            .endpoint(&base(), ApiNamespace::Voxlab, "/runs/7")
            .unwrap();
        assert_eq!(url.path(), "/api/voxlab/runs/7");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("org".to_string(), "acme corp".to_string()),
                ("env".to_string(), "prod".to_string()),
                ("user".to_string(), "mike".to_string()),
            ]
        );
    }

    #[test]
    fn test_namespace_parse() {
        for ns in ApiNamespace::ALL {
            assert_eq!(ApiNamespace::parse(ns.as_str()).unwrap(), ns);
        }
        assert!(matches!(
            ApiNamespace::parse("games"),
            Err(PanelError::UnknownNamespace(_))
        ));
    }

    #[test]
    fn test_query_from_env_packet() {
        let packet = Packet::new(
            TerrainTopics::env("acme", "dev"),
            PacketType::Command,
            serde_json::json!({"org": "acme", "env": "dev", "user": "ann"}),
            "terrain",
        )
        .unwrap();
        let query = PanelQuery::from_packet(&packet).unwrap();
        assert_eq!(query, PanelQuery::new("acme", "dev").with_user("ann"));
    }
}
