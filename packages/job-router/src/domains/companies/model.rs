//! Company aggregate: a downstream company that can receive routed jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use typed_builder::TypedBuilder;

use crate::common::CompanyId;

/// Which external system a company's jobs are synced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Servicetitan,
    Housecallpro,
    Mock,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Servicetitan => "servicetitan",
            ProviderType::Housecallpro => "housecallpro",
            ProviderType::Mock => "mock",
        }
    }

    /// Credential keys required in `provider_config` for this provider type.
    pub fn required_credential_keys(&self) -> &'static [&'static str] {
        match self {
            ProviderType::Servicetitan => &["client_id", "client_secret", "tenant_id"],
            ProviderType::Housecallpro => &["api_key", "company_id"],
            ProviderType::Mock => &[],
        }
    }
}

/// Skill proficiency level, both for what a company offers and what a job requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Basic,
    Intermediate,
    Expert,
}

impl SkillLevel {
    /// Numeric value used by the matching engine's scoring formula.
    pub fn value(&self) -> f64 {
        match self {
            SkillLevel::Basic => 1.0,
            SkillLevel::Intermediate => 2.0,
            SkillLevel::Expert => 3.0,
        }
    }
}

/// A single (skill, level, primary?) entry owned by a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CompanySkill {
    pub company_id: CompanyId,
    pub skill_name: String,
    pub level: SkillLevel,
    pub is_primary: bool,
}

/// A downstream company that can receive routed jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct Company {
    #[builder(default = CompanyId::new())]
    pub id: CompanyId,
    pub name: String,
    pub provider_type: ProviderType,
    #[builder(default)]
    pub provider_config: HashMap<String, String>,
    #[builder(default = true)]
    pub is_active: bool,
    #[builder(default)]
    pub skills: Vec<CompanySkill>,
    #[builder(default, setter(strip_option))]
    pub created_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Company {
    /// A company may receive jobs only if active and its provider credentials are present.
    ///
    /// `mock` never requires credentials, but is not a production-eligible provider type
    /// — callers that must exclude mock for production use should check `provider_type`
    /// separately (see §3 of the routing spec for the exact invariant).
    pub fn is_routable(&self) -> bool {
        if !self.is_active {
            return false;
        }
        self.provider_type
            .required_credential_keys()
            .iter()
            .all(|key| {
                self.provider_config
                    .get(*key)
                    .is_some_and(|v| !v.is_empty())
            })
    }

    pub fn primary_skill_names(&self) -> Vec<&str> {
        self.skills
            .iter()
            .filter(|s| s.is_primary)
            .map(|s| s.skill_name.as_str())
            .collect()
    }

    pub fn skill_level(&self, skill_name: &str) -> Option<SkillLevel> {
        self.skills
            .iter()
            .find(|s| s.skill_name == skill_name)
            .map(|s| s.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_company() -> Company {
        Company::builder()
            .name("Acme Plumbing".to_string())
            .provider_type(ProviderType::Mock)
            .build()
    }

    #[test]
    fn mock_company_is_routable_without_credentials() {
        assert!(mock_company().is_routable());
    }

    #[test]
    fn servicetitan_company_requires_credentials() {
        let mut company = Company::builder()
            .name("Bolt HVAC".to_string())
            .provider_type(ProviderType::Servicetitan)
            .build();
        assert!(!company.is_routable());

        company.provider_config.insert("client_id".into(), "a".into());
        company.provider_config.insert("client_secret".into(), "b".into());
        company.provider_config.insert("tenant_id".into(), "c".into());
        assert!(company.is_routable());
    }

    #[test]
    fn inactive_company_is_never_routable() {
        let mut company = mock_company();
        company.is_active = false;
        assert!(!company.is_routable());
    }
}
