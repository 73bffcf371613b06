//! Engine configuration loaded from YAML.

use anyhow::{Context, Result};
use contracts::{
    ContractRenderer, ContractTemplate, DEFAULT_PREFIX, DEFAULT_SIGNATURE_IMAGE,
};
use order_core::PromoCode;
use order_pricing::{OrderCalculator, PricingTable};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub contract_prefix: String,
    pub signature_image: String,
    /// Built-in price list when unset.
    pub pricing_path: Option<PathBuf>,
    /// Bundled license agreement when unset.
    pub template_path: Option<PathBuf>,
    pub promo_catalog_path: Option<PathBuf>,
    pub database_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contract_prefix: DEFAULT_PREFIX.to_string(),
            signature_image: DEFAULT_SIGNATURE_IMAGE.to_string(),
            pricing_path: None,
            template_path: None,
            promo_catalog_path: None,
            database_url: persistence::default_sqlite_url().to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_yaml_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn calculator(&self) -> Result<OrderCalculator> {
        let table = match &self.pricing_path {
            Some(path) => PricingTable::from_yaml_file(path)
                .with_context(|| format!("loading price list {}", path.display()))?,
            None => PricingTable::standard(),
        };
        Ok(OrderCalculator::new(table))
    }

    pub fn renderer(&self) -> Result<ContractRenderer> {
        let template = match &self.template_path {
            Some(path) => ContractTemplate::from_file(path)
                .with_context(|| format!("loading template {}", path.display()))?,
            None => ContractTemplate::standard()?,
        };
        Ok(ContractRenderer::new(template, self.signature_image.clone()))
    }

    /// `override_path` wins over the configured catalog; no catalog at all
    /// means every code is unknown.
    pub fn promo_catalog(&self, override_path: Option<&Path>) -> Result<Vec<PromoCode>> {
        let Some(path) = override_path.or(self.promo_catalog_path.as_deref()) else {
            return Ok(Vec::new());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading promo catalog {}", path.display()))?;
        Ok(order_pricing::promo_catalog_from_yaml(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_parses() {
        let cfg = EngineConfig::from_yaml_str(include_str!("../../../assets/config/engine.yaml"))
            .unwrap();
        assert_eq!(cfg.contract_prefix, "LIC");
        assert_eq!(cfg.template_path, None);
        assert_eq!(
            cfg.pricing_path.as_deref(),
            Some(Path::new("assets/pricing/standard.yaml"))
        );
    }

    #[test]
    fn missing_keys_take_defaults() {
        let cfg = EngineConfig::from_yaml_str("contract_prefix: DOG\n").unwrap();
        assert_eq!(cfg.contract_prefix, "DOG");
        assert_eq!(cfg.signature_image, DEFAULT_SIGNATURE_IMAGE);
        assert_eq!(cfg.database_url, persistence::default_sqlite_url());
    }

    #[test]
    fn defaults_build_engine_parts() {
        let cfg = EngineConfig::default();
        assert!(cfg.calculator().is_ok());
        assert!(cfg.renderer().is_ok());
        assert!(cfg.promo_catalog(None).unwrap().is_empty());
    }
}
