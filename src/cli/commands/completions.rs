//! Shell completions for `tkb`.
//!
//! ```bash
//! tkb completions bash > ~/.local/share/bash-completion/completions/tkb
//! tkb completions zsh -o ~/.zsh/completions/_tkb
//! ```

use super::CommandContext;
use crate::cli::{Cli, CompletionsArgs, ShellType};
use crate::error::Result;
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::fs;
use std::io::{self, Write};
use tracing::{debug, info};

const BIN_NAME: &str = "tkb";

/// Execute the completions command.
///
/// Parent directories of `--output` are created as needed.
///
/// # Errors
///
/// Returns an error if the script cannot be written.
pub fn execute(args: &CompletionsArgs, ctx: &CommandContext) -> Result<()> {
    let shell = Shell::from(args.shell);
    info!(%shell, output = ?args.output, "Generating shell completions");
    let script = render(shell);
    debug!(bytes = script.len(), "Completion script rendered");

    let Some(path) = &args.output else {
        io::stdout().write_all(&script)?;
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &script)?;
    if !ctx.quiet {
        eprintln!("Generated {shell} completions to {}", path.display());
    }
    Ok(())
}

fn render(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    generate(shell, &mut cmd, BIN_NAME, &mut out);
    out
}

impl From<ShellType> for Shell {
    fn from(shell: ShellType) -> Self {
        match shell {
            ShellType::Bash => Self::Bash,
            ShellType::Zsh => Self::Zsh,
            ShellType::Fish => Self::Fish,
            ShellType::PowerShell => Self::PowerShell,
            ShellType::Elvish => Self::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        String::from_utf8(render(shell)).unwrap()
    }

    #[test]
    fn shell_types_map_one_to_one() {
        assert_eq!(Shell::from(ShellType::Bash), Shell::Bash);
        assert_eq!(Shell::from(ShellType::PowerShell), Shell::PowerShell);
        assert_eq!(Shell::from(ShellType::Elvish), Shell::Elvish);
    }

    #[test]
    fn bash_script_lists_commands_and_global_flags() {
        let script = script(Shell::Bash);
        for word in ["_tkb", "issues", "sync", "mapping", "--json", "--bridge-dir"] {
            assert!(script.contains(word), "missing {word}");
        }
    }

    #[test]
    fn fish_script_uses_complete_syntax() {
        assert!(script(Shell::Fish).contains("complete -c tkb"));
    }

    #[test]
    fn output_creates_missing_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("nested").join("completions").join("_tkb");
        let args = CompletionsArgs {
            shell: ShellType::Zsh,
            output: Some(target.clone()),
        };
        let ctx = CommandContext {
            bridge_dir: None,
            json: false,
            quiet: true,
        };
        execute(&args, &ctx).unwrap();
        assert!(fs::read_to_string(target).unwrap().contains("#compdef tkb"));
    }
}
