// CLI module for captionmaption
// Author: kelexine (https://github.com/kelexine)

use crate::models::{GenerationMode, GenerationOptions, Tone};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// captionmaption - photo analysis and creative caption generation
#[derive(Parser, Debug)]
#[command(name = "captionmaption", version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the caption API over HTTP for a browser UI
    Serve,

    /// Caption local image files one after another
    Caption(CaptionArgs),

    /// Print a free-form detailed description of one image
    Describe(DescribeArgs),
}

#[derive(clap::Args, Debug)]
pub struct DescribeArgs {
    /// Image file to describe
    pub file: PathBuf,

    /// Instruction sent instead of the default "describe in detail" prompt
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CaptionArgs {
    /// Image files to caption
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,

    /// Caption tone in custom mode (sarcastic, deadpan, original, unexpected, dark-humor)
    #[arg(long, default_value = "original")]
    pub tone: Tone,

    /// Where the photos were taken (custom mode)
    #[arg(long)]
    pub location: Option<String>,

    /// Additional context for the caption prompt (custom mode)
    #[arg(long)]
    pub info: Option<String>,

    /// Seed tag added after the detected ones (custom mode, repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Ignore previously stored analyses and call the API again
    #[arg(long)]
    pub refresh: bool,

    /// Print results as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Auto,
    Custom,
}

impl From<ModeArg> for GenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => GenerationMode::Auto,
            ModeArg::Custom => GenerationMode::Custom,
        }
    }
}

impl CaptionArgs {
    /// Generation options shared by every file of this invocation.
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            mode: self.mode.into(),
            location: self.location.clone(),
            tone: self.tone,
            additional_info: self.info.clone(),
            tags: self.tags.clone(),
        }
    }
}
