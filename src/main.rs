use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use vcam::error::VcamError;
use vcam::filter::VideoFilter;
use vcam::registry::{DeviceBroker, DeviceDescriptor, RegistrationDirectory};

/// Well-known identity of the single virtual camera this server serves.
const DEVICE_IDENTITY: Uuid = Uuid::from_u128(0x5f8e1c3a_9d42_4b76_a1e0_73c2b8d4f915);
const DISPLAY_NAME: &str = "VCam Virtual Camera";

#[derive(Parser)]
#[command(name = "vcam", about = "Virtual camera registration and verification")]
struct Cli {
    /// Registration directory root (defaults to the system location)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the registration record (requires elevation)
    Install,
    /// Remove the registration record (requires elevation)
    Uninstall,
    /// Read the record and verify it by instantiating through the broker
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let directory = match &cli.root {
        Some(root) => RegistrationDirectory::at(root.clone()),
        None => RegistrationDirectory::system(),
    };

    match cli.command {
        Command::Install => install(&directory),
        Command::Uninstall => uninstall(&directory),
        Command::Status => status(directory),
    }
}

fn descriptor() -> DeviceDescriptor {
    DeviceDescriptor::new(DEVICE_IDENTITY, DISPLAY_NAME)
}

fn install(directory: &RegistrationDirectory) -> Result<()> {
    let server_location = std::env::current_exe().context("failed to resolve server location")?;

    match directory.install(descriptor(), server_location) {
        Ok(record) => {
            println!(
                "Installed '{}' ({}) under {}",
                record.descriptor.display_name,
                record.descriptor.identity,
                directory.root().display()
            );
            Ok(())
        }
        Err(VcamError::PrivilegeRequired { path }) => {
            bail!(
                "installing requires elevated privileges (cannot write {}); re-run elevated",
                path.display()
            )
        }
        Err(e) => Err(e).context("install failed"),
    }
}

fn uninstall(directory: &RegistrationDirectory) -> Result<()> {
    match directory.uninstall(DEVICE_IDENTITY) {
        Ok(()) => {
            println!("Uninstalled device {DEVICE_IDENTITY}");
            Ok(())
        }
        Err(VcamError::PrivilegeRequired { path }) => {
            bail!(
                "uninstalling requires elevated privileges (cannot write {}); re-run elevated",
                path.display()
            )
        }
        Err(e) => Err(e).context("uninstall failed"),
    }
}

/// Hard verification: the record must both exist and resolve to a working
/// instance through the broker, the same path a host load takes.
fn status(directory: RegistrationDirectory) -> Result<()> {
    let record = match directory.lookup(DEVICE_IDENTITY) {
        Ok(record) => record,
        Err(VcamError::NotRegistered(id)) => bail!("device {id} is not registered"),
        Err(e) => return Err(e).context("failed to read registration record"),
    };

    println!(
        "Registered: '{}' ({}) -> {}",
        record.descriptor.display_name,
        record.descriptor.identity,
        record.server_location.display()
    );

    let broker = DeviceBroker::new(directory);
    let instance = broker
        .instantiate(DEVICE_IDENTITY)
        .context("record exists but instantiation through the broker failed")?;

    let pins = instance.enumerate_pins();
    println!(
        "Instantiated OK: state {}, {} pin(s), first pin {:?}/{:?}",
        instance.query_state(Duration::ZERO).name(),
        pins.len(),
        pins[0].direction,
        pins[0].category
    );
    Ok(())
}
