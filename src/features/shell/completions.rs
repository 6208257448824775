//! Shell completions generation.

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::Cli;
use crate::error::MecalError;

const BIN: &str = "mecal";

/// Generate the completion script for `shell`.
///
/// # Errors
///
/// Returns an error if the generated script is not valid UTF-8.
pub fn generate_completions(shell: Shell) -> Result<String, MecalError> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, BIN, &mut buf);
    String::from_utf8(buf).map_err(|e| MecalError::Config(format!("completion script is not UTF-8: {e}")))
}

/// Where to put the generated script.
#[must_use]
pub fn completion_install_instructions(shell: Shell) -> String {
    match shell {
        Shell::Bash => "# Add to ~/.bashrc:\nsource <(mecal completions bash)\n".to_string(),
        Shell::Zsh => "# Save to your fpath, then run compinit:\nmecal completions zsh > ~/.zsh/completions/_mecal\n"
            .to_string(),
        Shell::Fish => "mecal completions fish > ~/.config/fish/completions/mecal.fish\n".to_string(),
        Shell::PowerShell => {
            "# Add to $PROFILE:\nmecal completions powershell | Out-String | Invoke-Expression\n".to_string()
        },
        Shell::Elvish => "mecal completions elvish > ~/.elvish/lib/mecal.elv\n".to_string(),
        _ => String::new(),
    }
}
