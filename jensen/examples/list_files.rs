//! List recordings on the first attached recorder

use jensen::{list_devices, Device};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    for summary in list_devices(jensen::DeviceConfig::default().target.vendor_id)? {
        println!(
            "Found {:04x}:{:04x} on bus {} address {}",
            summary.vendor_id, summary.product_id, summary.bus, summary.address
        );
    }

    let device = Device::new();
    let model = device.connect().await?;

    let info = device.get_device_info().await?;
    println!("{} {}", model, info);
    println!("Clock: {}", device.get_device_time().await?);
    println!("Storage: {}", device.get_card_info().await?);

    let files = device.list_files().await?;
    println!("{} recordings:", files.len());
    for file in &files {
        println!("  {}", file);
    }

    if let Some(recording) = device.get_recording_file().await? {
        println!("Recording now: {}", recording.name);
    }

    device.disconnect().await?;

    Ok(())
}
