use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::Parser;

/// Turn baby photos into themed AI portraits.
#[derive(Parser, Debug)]
#[command(name = "portrait-studio", version)]
pub struct Cli {
    /// Accept the privacy terms as the baby's legal guardian
    #[arg(
        long,
        env = "PORTRAIT_STUDIO_GUARDIAN_CONSENT",
        value_parser = BoolishValueParser::new()
    )]
    pub agree: bool,

    /// Print the available scenes and styles, then exit
    #[arg(long)]
    pub list_templates: bool,

    /// Scene id, e.g. "crib"
    #[arg(required_unless_present = "list_templates")]
    pub scene: Option<String>,

    /// Style id, e.g. "cream"
    #[arg(required_unless_present = "list_templates")]
    pub style: Option<String>,

    /// JPG or PNG photos of the baby
    #[arg(required_unless_present = "list_templates")]
    pub photos: Vec<PathBuf>,
}
