use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use entrada::api::{AppState, run_http_server};
use entrada::config::{Cli, Command, QuoteArgs, ServeArgs, ServeConfig, load_tables};
use entrada::core::{BuyerMode, QuoteInput, compute, split_for_display};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Quote(args) => quote(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            error!("{msg}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(args: ServeArgs) -> Result<(), String> {
    let config = ServeConfig::from_args(args).map_err(|e| e.to_string())?;
    let state = AppState::from_config(&config).map_err(|e| e.to_string())?;
    run_http_server(config.addr, Arc::new(state))
        .await
        .map_err(|e| format!("Server error: {e}"))
}

fn quote(args: QuoteArgs) -> Result<(), String> {
    if !args.price.is_finite() || args.price <= 0.0 {
        return Err("--price must be > 0".to_string());
    }

    let tables = load_tables(args.tables.as_deref()).map_err(|e| e.to_string())?;
    let mode = if args.partner {
        BuyerMode::Partner
    } else {
        BuyerMode::Alone
    };
    let quote = compute(&tables, &QuoteInput::new(args.price, args.region.as_str(), args.age));
    let display = split_for_display(&quote, mode);

    if args.json {
        let body = serde_json::json!({ "quote": quote, "display": display });
        let text = serde_json::to_string_pretty(&body).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    let suffix = if display.per_person { " per person" } else { "" };
    println!("Region:                    {}", args.region);
    println!("Bank down payment:         {}{suffix}", display.traditional_down_payment);
    println!("Rent-advance down payment: {}{suffix}", display.optimized_down_payment);
    println!("Savings:                   {}{suffix}", display.savings);
    println!("Monthly rent equivalent:   {}{suffix}", display.monthly_rent_equivalent);
    println!("Advance term:              {} months", display.chosen_term_months);
    if quote.used_fallback {
        println!("Note: no term keeps the down payment non-negative; showing the shortest term");
    }
    Ok(())
}
