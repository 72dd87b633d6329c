//! completions command - Shell completion scripts

use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for the requested shell
pub fn execute(args: CompletionsArgs) -> ExitCode {
    write_completions(args.shell, &mut std::io::stdout());
    ExitCode::Success
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_completions(shell, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_bash_completes_subcommands() {
        let output = script(Shell::Bash);
        assert!(output.contains("bw"));
        assert!(output.contains("complete"));
        assert!(output.contains("instance"));
    }

    #[test]
    fn test_zsh_registers_compdef() {
        assert!(script(Shell::Zsh).contains("compdef"));
    }

    #[test]
    fn test_powershell_registers_completer() {
        assert!(script(Shell::PowerShell).contains("Register-ArgumentCompleter"));
    }
}
