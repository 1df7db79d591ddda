//! Configuration types and validation for the rewrite engine
//! Author: kartik4091
//! Created: 2025-06-03

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::PageSize;

/// Fixed application-identifying metadata written into every output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    /// Creator written by the rewrite path
    pub rewrite_creator: String,
    /// Creator written by documents secured from scratch
    pub secured_creator: String,
    pub producer: String,
}

/// Fallback values used when the caller or the source supplies none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub rewrite_title: String,
    pub secured_title: String,
    pub secured_content: String,
    /// Owner password substituted when preserving encryption without one
    pub placeholder_owner_password: String,
}

/// Page geometry and typography for documents authored from text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_size: PageSize,
    pub margin: f32,
    pub font_size: f32,
    /// Line height as a multiple of the font size
    pub leading: f32,
}

/// Global engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriterConfig {
    pub branding: BrandingConfig,
    pub defaults: DefaultsConfig,
    pub layout: LayoutConfig,
    /// Re-open rewritten output to report its security profile
    pub verify_output: bool,
    /// Prefix of temporary directories used to stage uploads
    pub temp_prefix: String,
    pub max_parallel_jobs: usize,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            rewrite_creator: "PDF Rewriter Application".into(),
            secured_creator: "PDF Security Service".into(),
            producer: "PDX Rewriter".into(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            rewrite_title: "Rewritten PDF Document".into(),
            secured_title: "Secured PDF Document".into(),
            secured_content: "This is a secured PDF document.".into(),
            placeholder_owner_password: "default-owner-password".into(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin: 36.0,
            font_size: 12.0,
            leading: 1.5,
        }
    }
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            branding: BrandingConfig::default(),
            defaults: DefaultsConfig::default(),
            layout: LayoutConfig::default(),
            verify_output: true,
            temp_prefix: "pdx-rewrite".into(),
            max_parallel_jobs: num_cpus::get().max(1),
        }
    }
}

impl RewriterConfig {
    /// Loads a configuration file. `.yaml`/`.yml` files are read as YAML,
    /// anything else as JSON. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let config: RewriterConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.defaults.placeholder_owner_password.is_empty() {
            return Err(Error::Config("Placeholder owner password must not be empty".into()));
        }
        if self.layout.font_size <= 0.0 || self.layout.leading <= 0.0 {
            return Err(Error::Config("Font size and leading must be positive".into()));
        }
        let size = self.layout.page_size;
        if self.layout.margin < 0.0
            || size.width - 2.0 * self.layout.margin < self.layout.font_size
            || size.height - 2.0 * self.layout.margin < self.layout.font_size * self.layout.leading
        {
            return Err(Error::Config("Margins leave no writable area".into()));
        }
        if self.max_parallel_jobs == 0 {
            return Err(Error::Config("Concurrency must be at least 1".into()));
        }
        Ok(())
    }

    /// Overrides a single scalar setting by key, e.g. from the command line
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |kind: &str| Error::Config(format!("Invalid {} for {}: {}", kind, key, value));
        match key {
            "verify_output" => self.verify_output = value.parse().map_err(|_| invalid("bool"))?,
            "temp_prefix" => self.temp_prefix = value.to_string(),
            "max_parallel_jobs" => self.max_parallel_jobs = value.parse().map_err(|_| invalid("usize"))?,
            "branding.rewrite_creator" => self.branding.rewrite_creator = value.to_string(),
            "branding.secured_creator" => self.branding.secured_creator = value.to_string(),
            "branding.producer" => self.branding.producer = value.to_string(),
            "defaults.rewrite_title" => self.defaults.rewrite_title = value.to_string(),
            "defaults.secured_title" => self.defaults.secured_title = value.to_string(),
            "defaults.secured_content" => self.defaults.secured_content = value.to_string(),
            "defaults.placeholder_owner_password" => {
                self.defaults.placeholder_owner_password = value.to_string()
            }
            "layout.margin" => self.layout.margin = value.parse().map_err(|_| invalid("number"))?,
            "layout.font_size" => self.layout.font_size = value.parse().map_err(|_| invalid("number"))?,
            "layout.leading" => self.layout.leading = value.parse().map_err(|_| invalid("number"))?,
            _ => return Err(Error::Config(format!("Unknown key: {}", key))),
        }
        self.validate()
    }
}
