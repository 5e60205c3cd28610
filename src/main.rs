use bgenix::cli::{print_tool_report, Cli, Output};
use bgenix::secrets::Interrupted;
use bgenix::tools::ToolError;
use clap::error::ErrorKind;
use clap::Parser;

fn init_logging(verbose: bool) {
    let default = if verbose { "bgenix=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

/// A failing age, nix-instantiate or editor passes its exit code through
fn exit_code(err: &anyhow::Error) -> i32 {
    if err.chain().any(|e| e.is::<Interrupted>()) {
        return Interrupted::EXIT_CODE;
    }
    err.chain()
        .find_map(|e| e.downcast_ref::<ToolError>())
        .and_then(ToolError::exit_code)
        .unwrap_or(1)
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            if err.kind() == ErrorKind::DisplayHelp {
                init_logging(false);
                print_tool_report().await;
            }
            std::process::exit(err.exit_code());
        }
    };

    init_logging(cli.verbose);

    if let Err(err) = cli.run().await {
        Output::error(&format!("{:#}", err));
        std::process::exit(exit_code(&err));
    }
}
