//! Declared A/B test topology: tests, weighted variants and their origins

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_subpath, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Everything provisioned on the router for one domain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Description stored on the provisioned domain
    #[serde(default = "default_domain_description")]
    pub domain_description: String,

    /// A/B tests, one per subpath
    #[serde(default = "default_tests")]
    pub tests: Vec<TestConfig>,

    /// Domain default endpoints, used by the router when no test matches
    #[serde(default = "default_fallback_origins")]
    pub fallback_origins: Vec<OriginSpec>,
}

/// One A/B test bound to a subpath
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    pub name: String,
    pub subpath: String,
    #[serde(default)]
    pub description: Option<String>,
    pub variants: Vec<VariantConfig>,
}

/// One weighted arm of a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    pub weight: u32,
    pub origins: Vec<OriginSpec>,
}

/// A mock origin; port 0 binds an ephemeral port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginSpec {
    pub name: String,
    #[serde(default)]
    pub port: u16,
}

impl OriginSpec {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

impl TestConfig {
    /// Sum of all variant weights
    pub fn total_weight(&self) -> u64 {
        self.variants.iter().map(|v| u64::from(v.weight)).sum()
    }
}

impl TopologyConfig {
    /// Every origin of the topology, variant origins first
    pub fn all_origins(&self) -> impl Iterator<Item = &OriginSpec> {
        self.tests
            .iter()
            .flat_map(|t| t.variants.iter())
            .flat_map(|v| v.origins.iter())
            .chain(self.fallback_origins.iter())
    }

    /// Find a test by its subpath
    pub fn test_for_subpath(&self, subpath: &str) -> Option<&TestConfig> {
        self.tests.iter().find(|t| t.subpath == subpath)
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            domain_description: default_domain_description(),
            tests: default_tests(),
            fallback_origins: default_fallback_origins(),
        }
    }
}

impl Validatable for TopologyConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.tests.is_empty() {
            return Err(self.validation_error("at least one test must be configured"));
        }

        let mut test_names = HashSet::new();
        let mut subpaths = HashSet::new();
        for test in &self.tests {
            test.validate()?;
            if !test_names.insert(test.name.as_str()) {
                return Err(self.validation_error(format!("duplicate test name '{}'", test.name)));
            }
            if !subpaths.insert(test.subpath.as_str()) {
                return Err(self.validation_error(format!(
                    "subpath '{}' is used by more than one test",
                    test.subpath
                )));
            }
        }

        let mut origin_names = HashSet::new();
        let mut ports = HashSet::new();
        for origin in self.all_origins() {
            validate_required_string(&origin.name, "origin name", self.domain_name())?;
            if !origin_names.insert(origin.name.as_str()) {
                return Err(
                    self.validation_error(format!("duplicate origin name '{}'", origin.name))
                );
            }
            if origin.port != 0 && !ports.insert(origin.port) {
                return Err(self.validation_error(format!(
                    "port {} is assigned to more than one origin",
                    origin.port
                )));
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "topology"
    }
}

impl Validatable for TestConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.name, "name", self.domain_name())?;
        validate_subpath(&self.subpath, "subpath", self.domain_name())?;

        if self.variants.is_empty() {
            return Err(self.validation_error(format!("test '{}' has no variants", self.name)));
        }
        if self.total_weight() == 0 {
            return Err(self.validation_error(format!(
                "test '{}' has a total variant weight of 0",
                self.name
            )));
        }

        let mut names = HashSet::new();
        for variant in &self.variants {
            validate_required_string(&variant.name, "variant name", self.domain_name())?;
            if !names.insert(variant.name.as_str()) {
                return Err(self.validation_error(format!(
                    "test '{}' declares variant '{}' twice",
                    self.name, variant.name
                )));
            }
            if variant.origins.is_empty() {
                return Err(self.validation_error(format!(
                    "variant '{}' of test '{}' has no origins",
                    variant.name, self.name
                )));
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "topology.test"
    }
}

fn default_domain_description() -> String {
    "Test e-commerce domain".to_string()
}

fn variant(name: &str, weight: u32, origins: &[(&str, u16)]) -> VariantConfig {
    VariantConfig {
        name: name.to_string(),
        weight,
        origins: origins
            .iter()
            .map(|(name, port)| OriginSpec::new(*name, *port))
            .collect(),
    }
}

fn default_tests() -> Vec<TestConfig> {
    vec![
        TestConfig {
            name: "Cart A/B Test".to_string(),
            subpath: "/cart".to_string(),
            description: Some("Testing cart page variants".to_string()),
            variants: vec![
                variant("Cart-Variant-A", 50, &[("cart_v1_e1", 9001), ("cart_v1_e2", 9002)]),
                variant("Cart-Variant-B", 50, &[("cart_v2_e1", 9003), ("cart_v2_e2", 9004)]),
            ],
        },
        TestConfig {
            name: "User Page Test".to_string(),
            subpath: "/user".to_string(),
            description: Some("Testing user page variants".to_string()),
            variants: vec![
                variant("User-Variant-A", 50, &[("user_v1_e1", 9011), ("user_v1_e2", 9012)]),
                variant("User-Variant-B", 30, &[("user_v2_e1", 9013), ("user_v2_e2", 9014)]),
                variant("User-Variant-C", 20, &[("user_v3_e1", 9015), ("user_v3_e2", 9016)]),
            ],
        },
    ]
}

fn default_fallback_origins() -> Vec<OriginSpec> {
    vec![
        OriginSpec::new("domain_default_1", 9100),
        OriginSpec::new("domain_default_2", 9101),
    ]
}
