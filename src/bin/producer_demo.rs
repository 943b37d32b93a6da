//! Stand-alone producer process: publishes a moving synthetic frame into
//! the shared channel at a fixed rate so the plugin side can be exercised
//! end-to-end without the real capture pipeline.

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use vcam::channel::{row_stride, FrameChannel, PixelBuffer, PixelFormat};
use vcam::producer::{FrameProducer, FramePump};
use vcam::registry::DeviceDescriptor;

const DEVICE_IDENTITY: Uuid = Uuid::from_u128(0x5f8e1c3a_9d42_4b76_a1e0_73c2b8d4f915);

#[derive(Parser)]
#[command(name = "producer-demo", about = "Synthetic frame producer for the virtual camera")]
struct Cli {
    /// Publish rate in frames per second
    #[arg(long, default_value_t = 15)]
    fps: u32,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,
}

/// Horizontal gradient that scrolls one pixel per frame.
struct ScrollingGradient {
    width: u32,
    height: u32,
    tick: u64,
}

impl FrameProducer for ScrollingGradient {
    fn latest_frame(&mut self) -> PixelBuffer {
        let mut frame = PixelBuffer::black(self.width, self.height, PixelFormat::Bgr24);
        let stride = row_stride(self.width, PixelFormat::Bgr24);

        for row in 0..self.height as usize {
            for x in 0..self.width as usize {
                let phase = ((x as u64 + self.tick) % 256) as u8;
                let px = row * stride + x * 3;
                frame.data[px] = phase;
                frame.data[px + 1] = 255 - phase;
                frame.data[px + 2] = (row % 256) as u8;
            }
        }

        self.tick += 1;
        frame
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let descriptor = DeviceDescriptor::new(DEVICE_IDENTITY, "VCam Virtual Camera");
    let channel = FrameChannel::open_or_create(&descriptor.channel_name())?;

    info!(
        channel = %channel.name(),
        fps = cli.fps,
        width = cli.width,
        height = cli.height,
        "producer started, ctrl-c to stop"
    );

    let mut pump = FramePump::new(
        channel,
        Box::new(ScrollingGradient {
            width: cli.width,
            height: cli.height,
            tick: 0,
        }),
    );

    let mut interval = tokio::time::interval(Duration::from_secs(1) / cli.fps.max(1));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                pump.publish_once()?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}
