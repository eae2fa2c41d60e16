use anyhow::{Context, Result, bail};
use flag_list_patcher::{FlagSpec, is_token};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = include_str!("config.toml");

#[derive(Debug, Deserialize)]
pub struct BrandingConfig {
    /// 默认的 build_ffmpeg.py 路径
    pub path: PathBuf,
    /// Chrome branding 代码块的多种写法，按优先级排列
    pub markers: Vec<String>,
    #[serde(flatten)]
    pub spec: FlagSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    pub os: String,
    pub arch: String,
}

impl Target {
    pub fn label(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }
}

#[derive(Debug, Deserialize)]
pub struct FfmpegConfig {
    pub config_root: PathBuf,
    pub ffmpeg_root: PathBuf,
    pub generated_gni: PathBuf,
    pub gni_marker: String,
    pub targets: Vec<Target>,
    pub config_flags: Vec<String>,
    pub codec_list: Vec<String>,
    pub parser_list: Vec<String>,
    pub demuxer_list: Vec<String>,
    pub gni_sources: Vec<String>,
}

impl FfmpegConfig {
    pub fn platform_dir(&self, root: &Path, target: &Target) -> PathBuf {
        root.join(&self.config_root).join(&target.os).join(&target.arch)
    }

    /// （相对平台目录的路径，必须列出的条目）
    pub fn list_files(&self) -> [(&'static str, &[String]); 3] {
        [
            ("libavcodec/codec_list.c", self.codec_list.as_slice()),
            ("libavcodec/parser_list.c", self.parser_list.as_slice()),
            ("libavformat/demuxer_list.c", self.demuxer_list.as_slice()),
        ]
    }
}

#[derive(Debug, Deserialize)]
pub struct Check {
    pub file: PathBuf,
    pub contains: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyConfig {
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub branding: BrandingConfig,
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
}

impl Config {
    /// 读取配置文件，未指定时使用内置配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
            }
            None => Self::parse(DEFAULT_CONFIG).context("built-in config is invalid"),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let branding = &self.branding;
        if branding.markers.iter().all(|m| m.trim().is_empty()) {
            bail!("branding.markers must contain at least one non-empty marker");
        }
        if branding.spec.prefix.is_empty() {
            bail!("branding.prefix must not be empty");
        }

        let mut names = HashSet::new();
        for rule in &branding.spec.rules {
            if !is_token(&rule.name) {
                bail!("invalid flag name `{}`", rule.name);
            }
            if !names.insert(rule.name.as_str()) {
                bail!("flag `{}` is listed more than once", rule.name);
            }
            if let Some(bad) = rule.required.iter().find(|t| !is_token(t)) {
                bail!("flag `{}` has invalid token `{}`", rule.name, bad);
            }
        }

        if let Some(bad) = self
            .ffmpeg
            .config_flags
            .iter()
            .find(|f| f.is_empty() || !f.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            bail!("invalid config flag `{bad}`");
        }
        if self.ffmpeg.gni_marker.trim().is_empty() {
            bail!("ffmpeg.gni_marker must not be empty");
        }
        Ok(())
    }
}
