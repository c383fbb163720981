//! Static-only server: serves the static root, no validation endpoint

use form_validate::config::Config;
use form_validate::handler::Router;
use form_validate::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    logger::init(&cfg)?;

    let router = Router::static_only(&cfg);
    server::run(cfg, router)
}
