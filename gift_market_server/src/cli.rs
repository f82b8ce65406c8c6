use std::{env, env::VarError};

/// The daemon takes no arguments, so any argument at all prints the help text and the current environment.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 17] = [
        "RUST_LOG",
        "GMX_DATABASE_URL",
        "GMX_BASE_ASK_LIMIT",
        "GMX_PREMIUM_ASK_LIMIT",
        "GMX_STATUS_POLICY",
        "GMX_JOB_PAGE_SIZE",
        "GMX_JOB_PACING_MS",
        "GMX_INVENTORY_CHECK_INTERVAL",
        "GMX_INVENTORY_RECHECK_INTERVAL",
        "GMX_DELIVERY_CHECK_INTERVAL",
        "GMX_GIFTWRAPPED_CHECK_INTERVAL",
        "GMX_SHUTDOWN_TIMEOUT",
        "GMX_EVENT_BUFFER_SIZE",
        "GMX_STEAM_COMMUNITY_URL",
        "GMX_STEAM_API_URL",
        "GMX_STEAM_APP_ID",
        "GMX_STEAM_TIMEOUT",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
