use clap::CommandFactory;

pub(crate) fn cmd_completions(shell: clap_complete::Shell) {
    let mut cmd = crate::args::Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
