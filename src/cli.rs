use clap::Parser;

use crate::ai::prompt::DEFAULT_TEMPLATE;

/// Ask a multimodal model about whatever is on screen, from a hotkey.
#[derive(Debug, Clone, Parser)]
#[command(name = "screen-qa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Prompt template from the prompt_files directory (".txt" may be omitted)
    #[arg(default_value = DEFAULT_TEMPLATE)]
    pub prompt: String,

    /// Start with the window hidden and the hotkeys already active
    #[arg(short, long)]
    pub listen: bool,
}
