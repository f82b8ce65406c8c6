use dotenvy::dotenv;
use gift_market_server::{cli::handle_command_line_args, config::ServerConfig, daemon::run_daemon};
use log::info;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = ServerConfig::from_env_or_default();

    info!("🚀️ Starting gift market daemon on {}", config.database_url);
    match run_daemon(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}
