use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gear_mesh::config::{CliArgs, GearConfig};
use gear_mesh::pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("gear_mesh=debug")
    } else {
        EnvFilter::new("gear_mesh=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = GearConfig::from_args(args).context("Failed to load gear configuration")?;

    match Pipeline::run(&config) {
        Ok(result) => {
            match result.bytes_written {
                Some(bytes) => println!(
                    "Done: {} gear(s), {} triangles, {} bytes written in {:.2}s",
                    result.gear_count,
                    result.triangle_count,
                    bytes,
                    result.duration.as_secs_f64()
                ),
                None => println!(
                    "Done: {} gear(s), {} triangles in {:.2}s",
                    result.gear_count,
                    result.triangle_count,
                    result.duration.as_secs_f64()
                ),
            }
            Ok(())
        }
        Err(e) => {
            error!(%e, "Gear build failed");
            Err(anyhow::anyhow!(e)).context("gear-mesh pipeline failed")
        }
    }
}
