// Entrypoint for the CLI application.
// Keeps `main` small: set up logging, build the API client and hand it to
// the UI loop.

use session_dispatch::{api::ApiClient, logging::init_logging, ui::main_menu};

fn main() -> anyhow::Result<()> {
    let verbose = std::env::args().skip(1).any(|a| a == "-v" || a == "--verbose");
    init_logging(verbose);

    // Cookies come from the session file, the base URL from `API_URL`.
    let api = ApiClient::from_env()?;

    main_menu(&api)?;
    Ok(())
}
