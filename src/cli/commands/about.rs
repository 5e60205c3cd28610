use crate::cli::Output;
use crate::config::Config;
use crate::rules::NixRules;
use crate::tools::{AgeCli, SecretCipher};

/// Versions and locations of the external tools, printed after --help
pub async fn print_tool_report() {
    let config = Config::load().unwrap_or_else(|e| {
        Output::warning(&format!("Ignoring config: {:#}", e));
        Config::default()
    });

    println!();
    Output::field(
        &format!("{} version", clap::crate_name!()),
        clap::crate_version!(),
    );

    let age = AgeCli::new(&config.tools.age);
    match age.tool().locate() {
        Ok(path) => {
            Output::field("age binary path", &path.display().to_string());
            match age.version().await {
                Ok(version) => Output::field("age version", &version),
                Err(e) => Output::field("age version", &format!("unknown ({})", e)),
            }
        }
        Err(e) => Output::field("age binary path", &e.to_string()),
    }

    let nix = NixRules::new(&config.tools.nix_instantiate);
    match nix.tool().locate() {
        Ok(path) => Output::field("nix-instantiate path", &path.display().to_string()),
        Err(e) => Output::field("nix-instantiate path", &e.to_string()),
    }
}
