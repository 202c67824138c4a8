//! Shell completions generation command.
//!
//! ```bash
//! tree-parity completions bash > ~/.local/share/bash-completion/completions/tree-parity
//! tree-parity completions zsh -o ~/.zsh/completions/_tree-parity
//! ```

use crate::cli::{Cli, CompletionsArgs, ShellType};
use crate::error::{Result, ResultExt};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::fs::File;
use std::io;
use tracing::info;

const BIN_NAME: &str = "tree-parity";

/// Execute the completions command.
///
/// # Errors
///
/// Returns an error if the output file cannot be written.
pub fn execute(args: &CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = convert_shell_type(args.shell);

    if let Some(output_path) = &args.output {
        let mut file =
            File::create(output_path).with_context(|| format!("creating {}", output_path.display()))?;
        generate(shell, &mut cmd, BIN_NAME, &mut file);
        info!(path = %output_path.display(), ?shell, "wrote completion script");
    } else {
        generate(shell, &mut cmd, BIN_NAME, &mut io::stdout());
    }
    Ok(())
}

const fn convert_shell_type(shell: ShellType) -> Shell {
    match shell {
        ShellType::Bash => Shell::Bash,
        ShellType::Zsh => Shell::Zsh,
        ShellType::Fish => Shell::Fish,
        ShellType::PowerShell => Shell::PowerShell,
        ShellType::Elvish => Shell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut cmd = Cli::command();
        let mut output = Vec::new();
        generate(shell, &mut cmd, BIN_NAME, &mut output);
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_convert_shell_type() {
        assert_eq!(convert_shell_type(ShellType::Bash), Shell::Bash);
        assert_eq!(convert_shell_type(ShellType::PowerShell), Shell::PowerShell);
        assert_eq!(convert_shell_type(ShellType::Elvish), Shell::Elvish);
    }

    #[test]
    fn test_bash_completion_lists_commands_and_flags() {
        let script = script(Shell::Bash);
        for word in ["run", "fixture", "snapshot", "clean", "--suite", "--workdir", "--json"] {
            assert!(script.contains(word), "missing {word}");
        }
    }

    #[test]
    fn test_zsh_completion_header() {
        assert!(script(Shell::Zsh).contains("#compdef tree-parity"));
    }
}
