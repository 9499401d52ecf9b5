mod cli;
mod compile_cmd;
mod config;
mod init;
mod load;
mod logging;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Compile(args) => compile_cmd::run(args),
        cli::Command::Init(args) => init::run(args),
        cli::Command::Load(args) => {
            logging::init();
            load::run(args).await
        }
    }
}
