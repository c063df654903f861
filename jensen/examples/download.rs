//! Download one recording, cancelling on Ctrl-C
//!
//! Usage: `cargo run --example download -- <name> [output]`

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Context;
use jensen::{CancelToken, Device, WriteSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let name = args.next().context("missing file name")?;
    let output = args.next().unwrap_or_else(|| name.clone());

    let device = Device::new();
    device.connect().await?;

    let file = device
        .list_files()
        .await?
        .into_iter()
        .find(|f| f.name == name)
        .with_context(|| format!("{} not on device", name))?;

    let cancel = CancelToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mut sink = WriteSink(BufWriter::new(File::create(&output)?));
    let report = device
        .stream_file(&file.name, file.length.into(), &mut sink, &cancel)
        .await;

    device.disconnect().await?;

    let received = report
        .into_result()
        .with_context(|| format!("download of {} failed", file.name))?;
    sink.0
        .flush()
        .with_context(|| format!("cannot write {}", output))?;

    println!("Saved {} ({} bytes, {:.1}s)", output, received, file.duration_secs);
    Ok(())
}
