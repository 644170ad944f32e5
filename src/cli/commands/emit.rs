use anyhow::{bail, Context, Result};
use std::io::Read;

use crate::cli::config::resolve_config;
use crate::cli::EmitArgs;
use crate::generator::{BuildPointGenerator, PointGenerator};
use crate::handler::decode_record;
use crate::line_protocol::to_line;
use crate::sink::{InfluxClient, PointSink};

fn read_input(file: &str) -> Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read build record from stdin")?;
        Ok(buf)
    } else {
        std::fs::read(file).with_context(|| format!("Failed to read {}", file))
    }
}

pub async fn execute_emit(args: EmitArgs) -> Result<()> {
    let body = read_input(&args.file)?;
    let record = decode_record(&body)?;
    let points = BuildPointGenerator::new().generate(&record)?;

    if args.dry_run {
        for point in &points {
            println!("{}", to_line(point));
        }
        return Ok(());
    }

    let influx = args.influx;
    let config = resolve_config(influx.config.as_deref(), influx.url, influx.database, influx.token)?;
    let client = InfluxClient::new(config.influx_target(), config.retry_config())
        .map_err(anyhow::Error::msg)?;

    let result = client.send_points(points).await;
    if !result.failed.is_empty() {
        bail!("Failed to write points: {}", result.failed.join("; "));
    }
    eprintln!(
        "Wrote {} point(s) for {} #{}",
        result.sent, record.job_name, record.build_number
    );
    Ok(())
}
