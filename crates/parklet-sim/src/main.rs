//! Concurrent client simulator for a parklet server.
//!
//! Spawns many simulated drivers, each running the full lifecycle: poll
//! availability, take a slot, hold it for a while, give it back. Staggered
//! starts and randomized backoff/hold intervals shape the interleaved load
//! the allocation core has to tolerate.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parklet::{ClientError, ParkingClient};

const START_STAGGER: Duration = Duration::from_millis(50);
const DRIVER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
enum DriverOutcome {
    Completed,
    TimedOut,
    Failed,
}

#[derive(Debug, Serialize)]
struct RunReport {
    clients: usize,
    completed: usize,
    timed_out: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = env_or("PORT", 5000)?;
    let clients: usize = env_or("SIM_CLIENTS", 50)?;
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse()?;

    info!(clients, %addr, "starting simulated drivers");

    let mut handles = Vec::with_capacity(clients);
    for driver in 0..clients {
        handles.push(tokio::spawn(async move {
            match time::timeout(DRIVER_TIMEOUT, drive(addr, driver)).await {
                Ok(Ok(())) => DriverOutcome::Completed,
                Ok(Err(e)) => {
                    warn!(driver, error = %e, "driver failed");
                    DriverOutcome::Failed
                }
                Err(_) => {
                    warn!(driver, "driver timed out");
                    DriverOutcome::TimedOut
                }
            }
        }));
        time::sleep(START_STAGGER).await;
    }

    let mut report = RunReport {
        clients,
        completed: 0,
        timed_out: 0,
        failed: 0,
    };
    for handle in handles {
        match handle.await {
            Ok(DriverOutcome::Completed) => report.completed += 1,
            Ok(DriverOutcome::TimedOut) => report.timed_out += 1,
            Ok(DriverOutcome::Failed) | Err(_) => report.failed += 1,
        }
    }

    info!(
        completed = report.completed,
        timed_out = report.timed_out,
        failed = report.failed,
        "all drivers finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// One driver's lifecycle: poll until the lot reports room, take a slot
/// (going back to polling on a lost race), hold it, give it back.
async fn drive(addr: SocketAddr, driver: usize) -> Result<(), ClientError> {
    let mut client = ParkingClient::connect(addr).await?;

    loop {
        while client.query().await? == 0 {
            info!(driver, "lot full, waiting");
            time::sleep(backoff()).await;
        }
        if client.acquire().await? {
            break;
        }
        // Lost the race for the last free slot.
        info!(driver, "slot taken by another driver, retrying");
    }
    info!(driver, "parked");

    time::sleep(hold_time()).await;

    if client.release().await? {
        info!(driver, "left the lot");
    } else {
        warn!(driver, "release denied");
    }
    Ok(())
}

fn backoff() -> Duration {
    Duration::from_millis(rand::rng().random_range(500..=2000))
}

fn hold_time() -> Duration {
    Duration::from_millis(rand::rng().random_range(1000..=3000))
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => Ok(value.trim().parse()?),
        Err(_) => Ok(default),
    }
}
