use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use gestion_api::{
    config, db,
    events::{process_events, EventSender},
    services::clients::ClientService,
};
use tracing::info;
use uuid::Uuid;

/// Recomputes the stored rollups of clients from their invoices and delivery notes.
#[derive(Parser)]
#[command(name = "recalculate-totals", version)]
struct Cli {
    #[arg(long, value_parser = clap::value_parser!(Uuid), help = "Only this client (UUID); all clients otherwise")]
    client: Option<Uuid>,
    #[arg(long, action = ArgAction::SetTrue, help = "Print the updated client as JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        db::run_migrations(&pool).await?;
    }

    let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
    let drain = tokio::spawn(process_events(event_rx));
    let service = ClientService::new(Arc::new(pool), Arc::new(event_sender));

    match cli.client {
        Some(client_id) => {
            let client = service
                .recalculate(client_id)
                .await
                .with_context(|| format!("failed to recalculate client {}", client_id))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&client)?);
            } else {
                println!(
                    "{} : facturé {} / payé {} / dû {}",
                    client.nom, client.total_facture, client.total_paye, client.total_du
                );
            }
        }
        None => {
            let count = service
                .recalculate_all()
                .await
                .context("failed to recalculate clients")?;
            info!(count, "client totals recalculated");
            println!("{} client(s) recalculé(s)", count);
        }
    }

    // Closing the last sender lets the event drain finish.
    drop(service);
    drain.await?;
    Ok(())
}
