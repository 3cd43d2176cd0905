use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tether::api::{ApiClient, HttpTransport, Method, RequestError, RequestOptions, Transport};
use tether::cache::ResponseCache;
use tether::config::Config;
use tether::queue::MutationQueue;
use tether::session::Session;
use tether::store::{KeyValueStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(about = "API client that keeps working offline: cached reads, queued writes")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/tether/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// GET an endpoint; falls back to the cached copy when offline
  Get {
    endpoint: String,
    /// Keep the response cached for this many seconds
    #[arg(long)]
    ttl: Option<u64>,
    /// Don't read or write the cache
    #[arg(long)]
    no_cache: bool,
  },
  /// POST to an endpoint; queued for later if offline
  Post(WriteArgs),
  /// PUT to an endpoint; queued for later if offline
  Put(WriteArgs),
  /// PATCH an endpoint; queued for later if offline
  Patch(WriteArgs),
  /// DELETE an endpoint; queued for later if offline
  Delete(WriteArgs),
  /// Store an API token (and optionally the user identity as JSON)
  Login {
    /// Token to store (default: $TETHER_API_TOKEN)
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    user: Option<String>,
  },
  /// Forget the stored token, pending writes and cached responses
  Logout,
  /// Inspect or replay pending writes
  #[command(subcommand)]
  Queue(QueueCommand),
  /// Manage cached responses
  #[command(subcommand)]
  Cache(CacheCommand),
}

#[derive(clap::Args, Debug)]
struct WriteArgs {
  endpoint: String,
  /// JSON request body
  #[arg(short, long)]
  data: Option<String>,
  /// Fail instead of queueing when offline
  #[arg(long)]
  no_queue: bool,
}

#[derive(Subcommand, Debug)]
enum QueueCommand {
  /// List pending writes in replay order
  List,
  /// Replay pending writes now
  Sync,
  /// Drop all pending writes
  Clear,
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
  /// Remove one cached endpoint, or everything
  Clear { endpoint: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = setup_logging(config.log_dir.as_deref());

  let client = build_client(&config).await?;
  run(&client, args.command).await
}

/// Wire the store, transport, session, cache and queue together.
async fn build_client(config: &Config) -> Result<ApiClient> {
  let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(config.storage.path.as_deref())?);
  let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
    &config.api.base_url,
    config.api.timeout(),
  )?);

  let session = Session::new(store.clone());
  let cache = ResponseCache::new(store.clone()).with_default_ttl(config.cache.default_ttl());
  let queue = MutationQueue::open(store, transport.clone(), session.clone()).await?;

  Ok(ApiClient::new(transport, session, cache, Arc::new(queue)))
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
  match command {
    Command::Get {
      endpoint,
      ttl,
      no_cache,
    } => {
      let mut options = RequestOptions::default();
      if let Some(secs) = ttl {
        options = options.with_cache_ttl(Duration::from_secs(secs));
      }
      if no_cache {
        options = options.bypass_cache();
      }
      let result = client.get(&endpoint, options).await;
      print_outcome(result)
    }
    Command::Post(write) => send_write(client, Method::Post, write).await,
    Command::Put(write) => send_write(client, Method::Put, write).await,
    Command::Patch(write) => send_write(client, Method::Patch, write).await,
    Command::Delete(write) => send_write(client, Method::Delete, write).await,
    Command::Login { token, user } => {
      let token = match token {
        Some(t) => t,
        None => Config::get_api_token()?,
      };
      let user: Option<Value> = user
        .map(|u| serde_json::from_str(&u))
        .transpose()
        .map_err(|e| eyre!("--user is not valid JSON: {}", e))?;
      client.session().save(&token, user.as_ref()).await?;
      println!("Signed in");
      Ok(())
    }
    Command::Logout => {
      client.session().clear().await?;
      client.queue().clear().await?;
      client.cache().clear_all().await;
      println!("Signed out");
      Ok(())
    }
    Command::Queue(QueueCommand::List) => {
      let pending = client.queue().get_all().await;
      if pending.is_empty() {
        println!("No pending writes");
      }
      for m in pending {
        println!(
          "{}  {:<6} {}  retries={}  queued {}",
          m.id,
          Method::from(m.method),
          m.url,
          m.retry_count,
          m.enqueued_at.format("%Y-%m-%d %H:%M:%S")
        );
      }
      Ok(())
    }
    Command::Queue(QueueCommand::Sync) => {
      let _changes = client.queue().subscribe(|| debug!("queue changed"));
      let report = client.queue().sync().await?;
      if report.paused {
        println!("Not signed in; pending writes kept for later");
      }
      println!(
        "delivered {}, will retry {}, dropped {}",
        report.delivered,
        report.retried,
        report.dropped.len()
      );
      for m in &report.dropped {
        println!("dropped {} {} {}", m.id, Method::from(m.method), m.url);
      }
      Ok(())
    }
    Command::Queue(QueueCommand::Clear) => {
      client.queue().clear().await?;
      println!("Pending writes cleared");
      Ok(())
    }
    Command::Cache(CacheCommand::Clear { endpoint }) => {
      match endpoint {
        Some(endpoint) => client.cache().clear(&endpoint).await,
        None => client.cache().clear_all().await,
      }
      println!("Cache cleared");
      Ok(())
    }
  }
}

async fn send_write(client: &ApiClient, method: Method, write: WriteArgs) -> Result<()> {
  let body: Option<Value> = write
    .data
    .map(|d| serde_json::from_str(&d))
    .transpose()
    .map_err(|e| eyre!("--data is not valid JSON: {}", e))?;

  let mut options = RequestOptions::default();
  if write.no_queue {
    options = options.no_queue();
  }

  let result = client.request(method, &write.endpoint, body, options).await;
  print_outcome(result)
}

fn print_outcome(result: Result<Value, RequestError>) -> Result<()> {
  match result {
    Ok(payload) => {
      println!("{}", serde_json::to_string_pretty(&payload)?);
      Ok(())
    }
    // Queued writes are not failures; they go out on the next `queue sync`.
    Err(e) if e.is_queued() => {
      println!("{}", e);
      Ok(())
    }
    Err(e) => Err(eyre!(e)),
  }
}

fn setup_logging(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
  match log_dir {
    Some(dir) => {
      let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
      let appender = tracing_appender::rolling::daily(dir, "tether.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Some(guard)
    }
    None => {
      let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      None
    }
  }
}
