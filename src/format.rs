use crate::error::{Error, Result};
use clap::ValueEnum;
use pulldown_cmark::Options;
use std::path::Path;

/// Markdown dialect of the source document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Markdown,
    Gfm,
    #[value(name = "commonmark")]
    CommonMark,
}

impl InputFormat {
    pub fn from_ext(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "md" | "markdown" | "mkd" | "mdown" => Ok(Self::Markdown),
            "gfm" => Ok(Self::Gfm),
            "commonmark" | "cm" => Ok(Self::CommonMark),
            _ => Err(Error::UnsupportedExt(s.to_string())),
        }
    }

    /// Guesses the format of `path` from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                Error::Msg(format!(
                    "Cannot infer input format of '{}', use --from",
                    path.display()
                ))
            })?;
        Self::from_ext(ext)
    }

    pub fn parser_options(self) -> Options {
        match self {
            InputFormat::Markdown => {
                Options::ENABLE_TABLES
                    | Options::ENABLE_FOOTNOTES
                    | Options::ENABLE_STRIKETHROUGH
                    | Options::ENABLE_TASKLISTS
                    | Options::ENABLE_HEADING_ATTRIBUTES
                    | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
                    | Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS
                    | Options::ENABLE_MATH
            }
            InputFormat::Gfm => {
                Options::ENABLE_TABLES
                    | Options::ENABLE_FOOTNOTES
                    | Options::ENABLE_STRIKETHROUGH
                    | Options::ENABLE_TASKLISTS
            }
            InputFormat::CommonMark => Options::empty(),
        }
    }
}

/// Target dialect of the conversion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Rst,
    Html,
}

impl OutputFormat {
    pub fn from_ext(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rst" | "rest" => Ok(Self::Rst),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(Error::UnsupportedExt(s.to_string())),
        }
    }

    /// Output format implied by the output path, `rst` when there is no usable extension.
    pub fn infer(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Self::from_ext(ext).ok())
            .unwrap_or(Self::Rst)
    }
}

/// Serialization format of a metadata file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MetadataFormat {
    Json,
    Yaml,
    Toml,
}

impl MetadataFormat {
    pub fn from_ext(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(Error::UnsupportedExt(s.to_string())),
        }
    }
}
