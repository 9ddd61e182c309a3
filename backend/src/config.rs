use image::imageops::FilterType;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "NEUROSCAN_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/neuroscan.yaml";

pub const DEFAULT_MAX_INPUT_DIMENSION: u32 = 4096;

const RANGE_TOLERANCE: f32 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub version: f32,
    #[serde(default)]
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub image: ImageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub device: DeviceChoice,
    #[serde(default)]
    pub output: OutputKind,
    /// Value range the artifact was trained on, e.g. `[0.0, 1.0]`.
    pub input_range: [f32; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Probabilities,
    Logits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// `[width, height]`
    pub size: Vec<u32>,
    #[serde(default = "default_channels")]
    pub channels: u32,
    #[serde(default)]
    pub layout: TensorLayout,
    /// Uploads wider or taller than this are refused before decoding.
    #[serde(default = "default_max_input_dimension")]
    pub max_input_dimension: u32,
    pub preprocessing: PreprocessingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    #[default]
    Nhwc,
    Nchw,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default)]
    pub resize_method: ResizeMethod,
    pub pixel_scaling: PixelScaling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMethod {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeMethod {
    pub fn filter(self) -> FilterType {
        match self {
            ResizeMethod::Nearest => FilterType::Nearest,
            ResizeMethod::Triangle => FilterType::Triangle,
            ResizeMethod::CatmullRom => FilterType::CatmullRom,
            ResizeMethod::Gaussian => FilterType::Gaussian,
            ResizeMethod::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// How 8-bit channel values are mapped before inference. There is no default:
/// the choice has to match what the artifact was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelScaling {
    /// `value / 255`, giving `[0, 1]`
    Unit,
    /// `value` unchanged, giving `[0, 255]`
    Raw,
}

impl PixelScaling {
    pub fn apply(self, value: u8) -> f32 {
        match self {
            PixelScaling::Unit => f32::from(value) / 255.0,
            PixelScaling::Raw => f32::from(value),
        }
    }

    pub fn output_range(self) -> (f32, f32) {
        (self.apply(u8::MIN), self.apply(u8::MAX))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_channels() -> u32 {
    3
}

fn default_max_input_dimension() -> u32 {
    DEFAULT_MAX_INPUT_DIMENSION
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            static_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Reads the file named by `NEUROSCAN_CONFIG` (or the default path) and
    /// applies the `PORT` override.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_path(&path)?;
        config.apply_port_override(std::env::var("PORT").ok())?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = serde_yaml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_port_override(&mut self, port: Option<String>) -> Result<(), ConfigError> {
        if let Some(port) = port {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {}", port)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_bytes must be greater than zero".into(),
            ));
        }

        let image = &self.image;
        if image.size.len() != 2 || image.size.iter().any(|&d| d == 0) {
            return Err(ConfigError::Invalid(format!(
                "image.size must be two non-zero dimensions [width, height], got {:?}",
                image.size
            )));
        }
        if image.channels != 3 {
            return Err(ConfigError::Invalid(format!(
                "image.channels must be 3 (RGB), got {}",
                image.channels
            )));
        }

        if image.max_input_dimension == 0 {
            return Err(ConfigError::Invalid(
                "image.max_input_dimension must be greater than zero".into(),
            ));
        }

        let [min, max] = self.model.input_range;
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(ConfigError::Invalid(format!(
                "model.input_range must be an increasing pair of finite numbers, got [{}, {}]",
                min, max
            )));
        }

        let scaling = image.preprocessing.pixel_scaling;
        let (low, high) = scaling.output_range();
        if low < min - RANGE_TOLERANCE || high > max + RANGE_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "image.preprocessing.pixel_scaling {:?} yields [{}, {}], outside the model input range [{}, {}]",
                scaling, low, high, min, max
            )));
        }

        Ok(())
    }
}

impl ImageConfig {
    pub fn width(&self) -> u32 {
        self.size[0]
    }

    pub fn height(&self) -> u32 {
        self.size[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
version: 1.0
server:
  port: 9000
model:
  path: model/brain_tumor.pt
  input_range: [0.0, 1.0]
image:
  size: [150, 150]
  preprocessing:
    pixel_scaling: unit
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = ServiceConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.model.device, DeviceChoice::Auto);
        assert_eq!(config.model.output, OutputKind::Probabilities);
        assert_eq!(config.image.channels, 3);
        assert_eq!(config.image.layout, TensorLayout::Nhwc);
        assert_eq!(config.image.max_input_dimension, 4096);
        assert_eq!(config.image.preprocessing.resize_method, ResizeMethod::CatmullRom);
        assert_eq!((config.image.width(), config.image.height()), (150, 150));
    }

    #[test]
    fn shipped_config_is_valid() {
        let config =
            ServiceConfig::from_yaml_str(include_str!("../../config/neuroscan.yaml")).unwrap();
        assert_eq!(config.image.preprocessing.pixel_scaling, PixelScaling::Unit);
        assert_eq!(config.model.input_range, [0.0, 1.0]);
    }

    #[test]
    fn pixel_scaling_is_required() {
        let yaml = SAMPLE.replace("    pixel_scaling: unit\n", "    resize_method: nearest\n");
        assert!(matches!(
            ServiceConfig::from_yaml_str(&yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn raw_scaling_must_fit_model_input_range() {
        let yaml = SAMPLE.replace("pixel_scaling: unit", "pixel_scaling: raw");
        let err = ServiceConfig::from_yaml_str(&yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("pixel_scaling")));

        let yaml = yaml.replace("input_range: [0.0, 1.0]", "input_range: [0.0, 255.0]");
        assert!(ServiceConfig::from_yaml_str(&yaml).is_ok());
    }

    #[test]
    fn rejects_bad_image_shape() {
        let yaml = SAMPLE.replace("size: [150, 150]", "size: [150]");
        assert!(matches!(
            ServiceConfig::from_yaml_str(&yaml),
            Err(ConfigError::Invalid(_))
        ));

        let yaml = SAMPLE.replace("size: [150, 150]", "size: [150, 150]\n  channels: 1");
        assert!(matches!(
            ServiceConfig::from_yaml_str(&yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_zero_max_input_dimension() {
        let yaml = SAMPLE.replace("size: [150, 150]", "size: [150, 150]\n  max_input_dimension: 0");
        assert!(matches!(
            ServiceConfig::from_yaml_str(&yaml),
            Err(ConfigError::Invalid(ref msg)) if msg.contains("max_input_dimension")
        ));
    }

    #[test]
    fn rejects_inverted_input_range() {
        let yaml = SAMPLE.replace("input_range: [0.0, 1.0]", "input_range: [1.0, 0.0]");
        assert!(matches!(
            ServiceConfig::from_yaml_str(&yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn port_override() {
        let mut config = ServiceConfig::from_yaml_str(SAMPLE).unwrap();
        config.apply_port_override(Some("8081".into())).unwrap();
        assert_eq!(config.server.port, 8081);
        config.apply_port_override(None).unwrap();
        assert_eq!(config.server.port, 8081);
        assert!(config.apply_port_override(Some("eighty".into())).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ServiceConfig::from_path(file.path()).unwrap();
        assert_eq!(config.model.path, PathBuf::from("model/brain_tumor.pt"));

        let missing = ServiceConfig::from_path("does/not/exist.yaml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn scaling_maps_channel_values() {
        assert_eq!(PixelScaling::Unit.apply(255), 1.0);
        assert_eq!(PixelScaling::Unit.apply(0), 0.0);
        assert_eq!(PixelScaling::Raw.apply(128), 128.0);
        assert_eq!(PixelScaling::Raw.output_range(), (0.0, 255.0));
    }
}
