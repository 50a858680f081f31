//! geotiles: build and publish boundary map tiles
//!
//! Usage examples
//! --------------
//!
//! - Download the coarse country source
//!   $ geotiles fetch
//!
//! - Frame every French department from the fine source
//!   $ geotiles --family departments --scale fine build
//!
//! - Inspect one result
//!   $ geotiles --family departments inspect 971
//!
//! - Publish, or wipe and republish
//!   $ geotiles --family departments publish
//!   $ DESTRUCTIVE_FLAG=1 geotiles --family departments reseed
mod args;

use crate::args::{CliArgs, Commands};
use anyhow::{bail, Context};
use clap::Parser;
use geotiles_core::output::read_render_metas;
use geotiles_core::pipeline::{build, fetch};
use geotiles_core::source::fetch::source_path;
use geotiles_core::{Config, Family, PublishReport};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, flags on top.
fn load_config(args: &CliArgs) -> anyhow::Result<Config> {
    let mut config = Config::from_env().context("invalid environment configuration")?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.out_dir {
        config.out_dir = dir.clone();
    }
    if let Some(url) = &args.source_url {
        config.source_url = Some(url.clone());
    }
    if let Some(scale) = args.scale {
        config.source_scale = scale;
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let family = args.family;
    debug!(%family, command = ?args.command, out_dir = %config.out_dir.display(), "starting");

    match args.command {
        Commands::Fetch { force } => {
            let path = fetch(&config, family, force).await?;
            println!("Source for {family}: {}", path.display());
        }

        Commands::Build { input } => {
            let source = match input {
                Some(path) => path,
                None => {
                    let path = source_path(&config, family);
                    if path.exists() {
                        path
                    } else {
                        fetch(&config, family, false).await?
                    }
                }
            };
            let report = build(&config, family, &source)?;
            println!("Build {family}:");
            println!("  Input features: {}", report.load.total);
            println!("  Loaded: {}", report.load.loaded);
            println!("  Skipped on load: {}", report.load.skipped());
            println!("  Framed: {}", report.metas.len());
            for (code, reason) in &report.skipped {
                println!("  - skipped {code}: {reason}");
            }
            if let Some(dir) = &report.out_dir {
                println!("  Output: {}", dir.display());
            }
        }

        Commands::Inspect { code } => {
            let metas = read_render_metas(&config.out_dir, family)?;
            let wanted = code.trim().to_ascii_uppercase();
            match metas.iter().find(|m| m.code == wanted) {
                Some(m) => {
                    println!("Feature: {} ({})", m.name, m.code);
                    if let Some(alt) = &m.alt_name {
                        println!("Also known as: {alt}");
                    }
                    println!("Centroid: {:.4}, {:.4}", m.centroid.lon, m.centroid.lat);
                    let b = &m.bbox;
                    println!(
                        "Raw bbox: [{:.4}, {:.4}, {:.4}, {:.4}]",
                        b.raw.min.lon, b.raw.min.lat, b.raw.max.lon, b.raw.max.lat
                    );
                    println!(
                        "Unwrapped bbox (ref {:.4}): [{:.4}, {:.4}, {:.4}, {:.4}]",
                        b.unwrap_ref,
                        b.unwrapped.min.lon,
                        b.unwrapped.min.lat,
                        b.unwrapped.max.lon,
                        b.unwrapped.max.lat
                    );
                    let v = &m.projected.view_box;
                    println!(
                        "ViewBox: {:.4} {:.4} {:.4} {:.4}",
                        v.min_lon, v.min_lat, v.width, v.height
                    );
                    let f = &m.projected.fitted;
                    println!(
                        "Fitted: [{:.1}, {:.1}, {:.1}, {:.1}] at {:.3} px/deg",
                        f.x0, f.y0, f.x1, f.y1, m.projected.scale
                    );
                }
                None => bail!("no {family} feature with code {wanted} in the last build"),
            }
        }

        Commands::Publish => {
            let report = publish(&config, family, false).await?;
            print_publish(&report);
            finish(&report)?;
        }

        Commands::Reseed => {
            let report = publish(&config, family, true).await?;
            print_publish(&report);
            finish(&report)?;
        }

        Commands::CheckCredentials => {
            let remote = config.remote()?;
            let project = geotiles_core::credentials::verify_same_project(
                &remote.storage_url,
                &remote.storage_credentials,
                &remote.db_connection,
            )?;
            println!("Credentials OK: storage and database both target project {project}");
        }
    }

    Ok(())
}

#[cfg(feature = "postgres")]
async fn publish(config: &Config, family: Family, reseed: bool) -> anyhow::Result<PublishReport> {
    use geotiles_core::pipeline::connect_remote;

    let metas = read_render_metas(&config.out_dir, family)?;
    let publisher = connect_remote(config).await?;
    let report = if reseed {
        publisher.reseed(&config.out_dir, family, &metas).await?
    } else {
        publisher.publish(&config.out_dir, family, &metas).await?
    };
    Ok(report)
}

#[cfg(not(feature = "postgres"))]
async fn publish(_config: &Config, _family: Family, _reseed: bool) -> anyhow::Result<PublishReport> {
    bail!("this build of geotiles has no database support; rebuild with the `postgres` feature")
}

fn print_publish(report: &PublishReport) {
    println!("Publish {}:", report.family);
    if let Some(deleted) = report.deleted {
        println!("  Rows deleted: {deleted}");
    }
    println!("  Uploaded: {}", report.uploaded());
    println!("  Failed: {}", report.failed());
    println!("  Rows upserted: {}", report.upserted);
    for job in report.sync.failures() {
        if let geotiles_core::sync::JobOutcome::Failed(reason) = &job.outcome {
            println!("  - {} after {} attempt(s): {reason}", job.key, job.attempts);
        }
    }
}

/// Partial publishes exit non-zero.
fn finish(report: &PublishReport) -> anyhow::Result<()> {
    if report.sync.is_complete_success() {
        Ok(())
    } else {
        bail!("{} of {} uploads failed", report.failed(), report.sync.jobs.len())
    }
}
