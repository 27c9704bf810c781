//! Command-line interface for the sveglia daemon.
//!
//! This binary controls and monitors the alarm server via its HTTP API.

use std::env;

use anyhow::{Result, bail};

use sveglia_server::api_client::{self, types::CreateAlarmRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: sveglia-cli <command>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  list               Show all alarms");
        eprintln!("  add <H:MM> [label] Create an alarm");
        eprintln!("  rm <id>            Delete an alarm");
        eprintln!("  toggle <id>        Enable/disable an alarm");
        eprintln!("  stop               Stop the ringing alarm");
        eprintln!("  ringing            Show the ringing slot");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  SVEGLIA_API_URL    API base URL (default: {})", api_client::DEFAULT_BASE_URL);
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "list" => cmd_list().await?,
        "add" => cmd_add(&args[2..]).await?,
        "rm" => cmd_rm(&args[2..]).await?,
        "toggle" => cmd_toggle(&args[2..]).await?,
        "stop" => cmd_stop().await?,
        "ringing" => cmd_ringing().await?,
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Build an API client, honoring SVEGLIA_API_URL if set.
fn make_client() -> api_client::Client {
    match env::var("SVEGLIA_API_URL") {
        Ok(url) => api_client::Client::with_base_url(url),
        Err(_) => api_client::Client::new(),
    }
}

/// Parse "H:MM" into an (hour, minute) pair.
fn parse_time(spec: &str) -> Result<(u8, u8)> {
    let Some((hour, minute)) = spec.split_once(':') else {
        bail!("time must look like H:MM, got {spec:?}");
    };
    Ok((hour.parse()?, minute.parse()?))
}

async fn cmd_list() -> Result<()> {
    let alarms = make_client().list_alarms().await?;
    if alarms.is_empty() {
        println!("No alarms.");
        return Ok(());
    }
    for alarm in alarms {
        let state = if alarm.ringing {
            "ringing"
        } else if alarm.enabled {
            "on"
        } else {
            "off"
        };
        println!(
            "{}  {:02}:{:02}  [{state}]  {}",
            alarm.id, alarm.hour, alarm.minute, alarm.label
        );
    }
    Ok(())
}

async fn cmd_add(args: &[String]) -> Result<()> {
    let Some(spec) = args.first() else {
        bail!("add needs a time, e.g. `sveglia-cli add 6:30 standup`");
    };
    let (hour, minute) = parse_time(spec)?;
    let label = (args.len() > 1).then(|| args[1..].join(" "));

    let created = make_client()
        .create_alarm(&CreateAlarmRequest {
            hour,
            minute,
            label,
            vibrate: None,
            sound_file: None,
        })
        .await?;
    println!("Created {}", created.id);
    Ok(())
}

async fn cmd_rm(args: &[String]) -> Result<()> {
    let Some(id) = args.first() else {
        bail!("rm needs an alarm id");
    };
    if make_client().delete_alarm(id).await? {
        println!("Deleted {id}");
    } else {
        println!("No such alarm: {id}");
    }
    Ok(())
}

async fn cmd_toggle(args: &[String]) -> Result<()> {
    let Some(id) = args.first() else {
        bail!("toggle needs an alarm id");
    };
    if make_client().toggle_alarm(id).await? {
        println!("Toggled {id}");
    } else {
        println!("No such alarm: {id}");
    }
    Ok(())
}

async fn cmd_stop() -> Result<()> {
    make_client().stop().await?;
    println!("Stopped.");
    Ok(())
}

async fn cmd_ringing() -> Result<()> {
    let state = make_client().ringing().await?;
    if state.ringing {
        println!("Ringing: {}", state.label);
    } else {
        println!("Silent.");
    }
    Ok(())
}
