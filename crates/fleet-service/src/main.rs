//! Command line front end for the fleet order engine.
//!
//! Builds the engine from a configuration file, restores the cached snapshot,
//! refreshes it from the backend and then runs one command, printing the
//! result as JSON on stdout.

use clap::{Parser, Subcommand};
use fleet_config::Config;
use fleet_core::{OrderEngine, StatusCounts};
use fleet_types::{FilterCriteria, OrderStatus, PaginationState, StatusFilter};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

mod factory_registry;

/// Command-line arguments for the fleet service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Order counts by status and recognized revenue
	Summary,
	/// One page of orders matching a filter
	List {
		/// Text matched against id, customer name and email
		#[arg(short, long, default_value = "")]
		search: String,
		/// Status to keep, or "all"
		#[arg(long, default_value = "all")]
		status: String,
		#[arg(short, long, default_value_t = 1)]
		page: u32,
		/// Page size; the configured default when absent
		#[arg(long)]
		limit: Option<u32>,
	},
	/// Change the status of an order through the backend
	SetStatus { id: String, status: OrderStatus },
	/// Delete an order through the backend
	Delete { id: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
	counts: StatusCounts,
	revenue: Decimal,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	// Logs go to stderr so stdout carries only the JSON result
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.engine.id);
	let default_limit = config.view.default_page_size;

	let engine = factory_registry::build_engine_from_config(config).await?;

	match engine.restore().await {
		Ok(Some(count)) => tracing::info!(count, "Restored cached orders"),
		Ok(None) => {},
		Err(e) => tracing::warn!(error = %e, "Ignoring unreadable order cache"),
	}
	if let Err(e) = engine.fetch_all().await {
		// Keep working from the cached snapshot
		tracing::warn!(error = %e, "Failed to refresh orders from backend");
	}

	let output = run(&engine, args.command, default_limit).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}

async fn run(
	engine: &OrderEngine,
	command: Command,
	default_limit: u32,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
	let value = match command {
		Command::Summary => serde_json::to_value(Summary {
			counts: engine.counts().await,
			revenue: engine.revenue().await,
		})?,
		Command::List {
			search,
			status,
			page,
			limit,
		} => {
			let Ok(status) = status.parse::<StatusFilter>();
			engine.set_filter(FilterCriteria::new(search, status)).await?;
			engine
				.set_page(page, limit.unwrap_or(default_limit))
				.await?;
			serde_json::to_value(engine.current_view().await)?
		},
		Command::SetStatus { id, status } => {
			serde_json::to_value(engine.change_status(&id, status).await?)?
		},
		Command::Delete { id } => {
			engine.delete_remote(&id).await?;
			serde_json::json!({ "deleted": id })
		},
	};
	Ok(value)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_list_arguments() {
		let args = Args::try_parse_from([
			"fleet", "--config", "depot.toml", "list", "--search", "sarah", "--status", "pending",
			"--page", "2",
		])
		.unwrap();

		assert_eq!(args.config, PathBuf::from("depot.toml"));
		match args.command {
			Command::List {
				search,
				status,
				page,
				limit,
			} => {
				assert_eq!(search, "sarah");
				assert_eq!(status, "pending");
				assert_eq!(page, 2);
				assert_eq!(limit, None);
			},
			other => panic!("unexpected command {:?}", other),
		}
	}

	#[test]
	fn test_parse_set_status() {
		let args = Args::try_parse_from(["fleet", "set-status", "ORD-1", "shipped"]).unwrap();
		assert!(matches!(
			args.command,
			Command::SetStatus { ref id, status: OrderStatus::Shipped } if id == "ORD-1"
		));

		assert!(Args::try_parse_from(["fleet", "set-status", "ORD-1", "lost"]).is_err());
	}

	#[tokio::test]
	async fn test_run_against_seeded_backend() {
		let temp_dir = tempfile::TempDir::new().unwrap();
		let seed = temp_dir.path().join("seed.json");
		std::fs::write(
			&seed,
			r#"[
  {"id":"ORD-1","customer":{"name":"Sarah Johnson","email":"sarah@fleet.test","phone":""},
   "status":"delivered","total":"300","shippingAddress":"1 Pier","orderDate":"2024-05-01T00:00:00Z",
   "createdAt":"2024-05-01T00:00:00Z","updatedAt":"2024-05-01T00:00:00Z"},
  {"id":"ORD-2","customer":{"name":"Mike Chen","email":"mike@fleet.test","phone":""},
   "status":"pending","total":"100","shippingAddress":"2 Pier","orderDate":"2024-05-02T00:00:00Z",
   "createdAt":"2024-05-02T00:00:00Z","updatedAt":"2024-05-02T00:00:00Z"}
]"#,
		)
		.unwrap();

		let config: Config = format!(
			r#"
[engine]
id = "cli-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[backend]
primary = "memory"
[backend.implementations.memory]
seed_file = "{}"
"#,
			seed.display()
		)
		.parse()
		.unwrap();

		let engine = factory_registry::build_engine_from_config(config).await.unwrap();
		engine.fetch_all().await.unwrap();

		let summary = run(&engine, Command::Summary, 10).await.unwrap();
		assert_eq!(summary["counts"]["all"], 2);
		assert_eq!(summary["revenue"], "300");

		let listed = run(
			&engine,
			Command::List {
				search: "SARAH".to_string(),
				status: "all".to_string(),
				page: 1,
				limit: None,
			},
			10,
		)
		.await
		.unwrap();
		assert_eq!(listed["total"], 1);
		assert_eq!(listed["items"][0]["id"], "ORD-1");

		run(
			&engine,
			Command::SetStatus {
				id: "ORD-2".to_string(),
				status: OrderStatus::Shipped,
			},
			10,
		)
		.await
		.unwrap();
		assert_eq!(engine.get("ORD-2").await.unwrap().status, OrderStatus::Shipped);

		run(&engine, Command::Delete { id: "ORD-1".to_string() }, 10)
			.await
			.unwrap();
		assert!(engine.get("ORD-1").await.is_none());
	}
}
