//! Host-application context sent with the first message of a session.
//!
//! The backend uses this to ground the bot's answers in the portal it is
//! embedded in. Sent once per session, as a JSON query parameter.

use serde::{Deserialize, Serialize};

/// Description of the host portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteContext {
    pub platform: PlatformInfo,
    pub pages: Vec<PageInfo>,
    pub user_types: Vec<UserTypeInfo>,
}

/// Top-level platform description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub name: String,
    pub description: String,
    pub purpose: String,
    pub features: Vec<String>,
}

/// One routed page of the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub name: String,
    pub purpose: String,
}

/// A class of portal user and what it can do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTypeInfo {
    pub role: String,
    pub capabilities: String,
}

impl Default for SiteContext {
    fn default() -> Self {
        Self {
            platform: PlatformInfo {
                name: "FestFlex".to_owned(),
                description: "Professional events management platform".to_owned(),
                purpose: "Seamless event organization, registration, and participation"
                    .to_owned(),
                features: vec![
                    "Event management".to_owned(),
                    "User registration".to_owned(),
                    "Gallery".to_owned(),
                    "Support system".to_owned(),
                    "Interactive dashboard".to_owned(),
                ],
            },
            pages: vec![
                PageInfo {
                    name: "home".to_owned(),
                    purpose: "Main landing page with event highlights".to_owned(),
                },
                PageInfo {
                    name: "about".to_owned(),
                    purpose: "Platform, team, and mission information".to_owned(),
                },
                PageInfo {
                    name: "gallery".to_owned(),
                    purpose: "Visual showcase of past events".to_owned(),
                },
                PageInfo {
                    name: "support".to_owned(),
                    purpose: "Help center and contact forms".to_owned(),
                },
            ],
            user_types: vec![
                UserTypeInfo {
                    role: "student".to_owned(),
                    capabilities: "Browse events, register, participate, view content"
                        .to_owned(),
                },
                UserTypeInfo {
                    role: "admin".to_owned(),
                    capabilities: "Create events, manage registrations, oversee the platform"
                        .to_owned(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_serializes_camel_case() {
        let context = SiteContext::default();
        let json = serde_json::to_value(&context).expect("serializes");
        assert_eq!(json["platform"]["name"], "FestFlex");
        assert!(json["userTypes"].is_array());
        assert!(json["platform"]["features"]
            .as_array()
            .is_some_and(|f| !f.is_empty()));
    }
}
