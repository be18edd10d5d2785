//! Deployment target of a stack: an AWS account and region.
//!
//! A stack without an environment is "environment-agnostic": its template
//! can be deployed into any account and region.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account implied by the current CLI configuration
pub const ACCOUNT_VARIABLE: &str = "CDK_DEFAULT_ACCOUNT";

/// Region implied by the current CLI configuration
pub const REGION_VARIABLE: &str = "CDK_DEFAULT_REGION";

pub const UNKNOWN_ACCOUNT: &str = "unknown-account";
pub const UNKNOWN_REGION: &str = "unknown-region";

static REGION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").expect("Valid region regex"));

/// Account and region a stack is deployed to
///
/// Either part may be missing, in which case the template does not depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvironment")]
pub struct Environment {
    account: Option<String>,
    region: Option<String>,
}

/// Unchecked account and region as they come from a serialized form
#[derive(Deserialize)]
struct RawEnvironment {
    account: Option<String>,
    region: Option<String>,
}

impl TryFrom<RawEnvironment> for Environment {
    type Error = eyre::Report;

    fn try_from(raw: RawEnvironment) -> eyre::Result<Self> {
        Environment::partial(raw.account.as_deref(), raw.region.as_deref())
    }
}

impl Environment {
    /// Fully specified environment
    pub fn new(account: &str, region: &str) -> eyre::Result<Self> {
        Self::partial(Some(account), Some(region))
    }

    /// Environment with possibly unknown account or region
    pub fn partial(account: Option<&str>, region: Option<&str>) -> eyre::Result<Self> {
        if let Some(account) = account {
            if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
                eyre::bail!("Invalid AWS account id {account:?} (must be a 12-digit string)");
            }
        }

        if let Some(region) = region {
            if !REGION_REGEX.is_match(region) {
                eyre::bail!("Invalid AWS region {region:?}");
            }
        }

        Ok(Environment {
            account: account.map(str::to_string),
            region: region.map(str::to_string),
        })
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The aws://account/region form, with placeholders for unknown parts
    pub fn uri(env: Option<&Environment>) -> String {
        let account = env.and_then(Environment::account).unwrap_or(UNKNOWN_ACCOUNT);
        let region = env.and_then(Environment::region).unwrap_or(UNKNOWN_REGION);
        format!("aws://{account}/{region}")
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Environment::uri(Some(self)))
    }
}

/// How the environment of a stack is chosen
///
/// Read from the `[environment]` section of the config, e.g.
/// `policy = "fixed"` with `account` and `region` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum EnvironmentPolicy {
    /// No account or region, the template is portable
    #[default]
    Agnostic,

    /// Literal account and region, recommended for production stacks
    Fixed { account: String, region: String },

    /// Account and region of the invoking environment, recommended for dev stacks
    Ambient,
}

impl EnvironmentPolicy {
    /// Resolve the environment using the process variables
    pub fn resolve(&self) -> eyre::Result<Option<Environment>> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve the environment, looking variables up with the given function
    pub fn resolve_with<F>(&self, lookup: F) -> eyre::Result<Option<Environment>>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            EnvironmentPolicy::Agnostic => Ok(None),

            EnvironmentPolicy::Fixed { account, region } => {
                Environment::new(account, region).map(Some)
            }

            EnvironmentPolicy::Ambient => {
                let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
                let account = read(ACCOUNT_VARIABLE);
                let region = read(REGION_VARIABLE);

                if account.is_none() && region.is_none() {
                    log::warn!(
                        "Neither {ACCOUNT_VARIABLE} nor {REGION_VARIABLE} is set, the stack is environment-agnostic"
                    );

                    return Ok(None);
                }

                Environment::partial(account.as_deref(), region.as_deref()).map(Some)
            }
        }
    }
}
