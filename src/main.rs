use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use std::path::PathBuf;
use touchlink_datasource::{ClientConfig, DataSourceConfig, DataSourceSession, DataSourceType};

struct Args {
    config_path: Option<PathBuf>,
    save_as: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        config_path: None,
        save_as: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--save" => {
                parsed.save_as = Some(args.next().context("--save requires a name")?);
            }
            "-h" | "--help" => {
                println!("Usage: touchlink-probe [CONFIG_JSON_PATH] [--save NAME]");
                std::process::exit(0);
            }
            other if parsed.config_path.is_none() => parsed.config_path = Some(PathBuf::from(other)),
            other => bail!("Unexpected argument: {}", other),
        }
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("touchlink_datasource=info".parse()?)
                .add_directive("notification=error".parse()?),
        )
        .init();

    let args = parse_args()?;
    let config = ClientConfig::from_env()?;
    tracing::info!("Using backend {}{}", config.api_url, config.api_prefix);

    let session = DataSourceSession::from_config(&config)?;

    let types = session
        .fetch_data_source_types()
        .await
        .unwrap_or_else(DataSourceType::default_names);
    println!("Supported types: {}", types.join(", "));

    let Some(path) = args.config_path else {
        return Ok(());
    };
    let source = DataSourceConfig::from_json_file(&path)?;

    let test = session.test_connection(&source).await;
    println!(
        "Test {}: {:?} {}",
        test.name,
        test.status,
        test.message.as_deref().unwrap_or("")
    );

    let response = session
        .connect(&source)
        .await
        .with_context(|| format!("Failed to connect to {}", source.display_name()))?;
    println!("Connected: {}", response.name);

    if let Some(name) = args.save_as {
        let detail = session.save_current(&name).await?;
        println!("Saved as {} ({})", detail.name, detail.id);
    }

    let tables = session.tables();
    println!("Tables ({}):", tables.len());
    for table in &tables {
        match session.fetch_table_schema(table).await {
            Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
            None => println!("  {} (schema unavailable)", table),
        }
    }

    session.disconnect();
    Ok(())
}
