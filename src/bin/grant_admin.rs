//! CLI tool to manage wiki admins.
//!
//! Usage:
//!   cargo run --bin grant-admin -- list
//!   cargo run --bin grant-admin -- grant --uid <uid>
//!   cargo run --bin grant-admin -- revoke --uid <uid>
//!
//! Users appear after their first sign-in.

use std::env;

use fanwiki_lib::config::Config;
use fanwiki_lib::db::{DbPool, users};
use fanwiki_lib::models::{PaginationParams, UserResponse};

const LIST_PAGE_SIZE: u32 = 100;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    match command.as_str() {
        "list" | "ls" => list_users(&pool).await,
        "grant" => {
            let uid = parse_uid_arg(&args);
            set_admin(&pool, &uid, true).await;
        }
        "revoke" => {
            let uid = parse_uid_arg(&args);
            set_admin(&pool, &uid, false).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_uid_arg(args: &[String]) -> String {
    let mut i = 2;
    while i < args.len() {
        if (args[i] == "--uid" || args[i] == "-u") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
        i += 1;
    }
    eprintln!("Error: --uid is required");
    std::process::exit(1);
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

async fn list_users(pool: &DbPool) {
    let mut page = 1;
    let mut printed_header = false;

    loop {
        let params = PaginationParams::new(Some(page), Some(LIST_PAGE_SIZE));
        let (batch, total) = match users::list(pool.connection(), &params).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error listing users: {}", e);
                std::process::exit(1);
            }
        };

        if total == 0 {
            println!("No users found.");
            return;
        }

        if !printed_header {
            println!();
            println!("{:<30} {:<24} {:<30} {:<6}", "UID", "NAME", "EMAIL", "ADMIN");
            println!("{}", "-".repeat(92));
            printed_header = true;
        }

        let fetched = batch.len();
        for user in batch.into_iter().map(UserResponse::from) {
            println!(
                "{:<30} {:<24} {:<30} {:<6}",
                truncate(&user.uid, 28),
                truncate(user.display_name.as_deref().unwrap_or("-"), 22),
                truncate(user.email.as_deref().unwrap_or("-"), 28),
                if user.is_admin { "yes" } else { "no" }
            );
        }

        if fetched < LIST_PAGE_SIZE as usize || u64::from(page * LIST_PAGE_SIZE) >= total {
            break;
        }
        page += 1;
    }
    println!();
}

async fn set_admin(pool: &DbPool, uid: &str, is_admin: bool) {
    match users::set_admin(pool.connection(), uid, is_admin).await {
        Ok(user) => {
            let verb = if is_admin { "granted to" } else { "revoked from" };
            println!("Admin rights {} {}.", verb, user.uid);
        }
        Err(e) => {
            eprintln!("Error updating {}: {}", uid, e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: grant-admin <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  list                List users and their admin flag");
    eprintln!("  grant  --uid <uid>  Grant admin rights");
    eprintln!("  revoke --uid <uid>  Revoke admin rights");
    eprintln!("  help                Show this message");
}
