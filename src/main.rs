//! speakgate main entry point
//!
//! Without a command, greets and then speaks "1", "2", "3", ... one after
//! another until Ctrl-C. `say` speaks its arguments once, `voices` lists the
//! installed voices.

use anyhow::{bail, Context};
use log::{debug, error, info};
use speakgate::config::Config;
use speakgate::speech::{BackendKind, Locale, SpeakOutcome, Speaker, SpeechOptions};
use std::process;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "\
Usage: speakgate [--debug] [--simulated] [COMMAND]

Commands:
  (none)                 speak a counter until Ctrl-C
  say <text...>          speak text once
      --pitch <0.0-2.0>
      --volume <0.0-1.0>
      --lang <tag>         e.g. en-US
  voices [--json]        list installed voices";

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    debug: bool,
    simulated: bool,
    json: bool,
    command: Option<String>,
    words: Vec<String>,
    pitch: Option<f32>,
    volume: Option<f32>,
    lang: Option<String>,
}

impl Args {
    fn parse(mut raw: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut args = Args::default();

        while let Some(arg) = raw.next() {
            match arg.as_str() {
                "--debug" | "-d" => args.debug = true,
                "--simulated" => args.simulated = true,
                "--json" => args.json = true,
                "--pitch" => args.pitch = Some(Self::value(&mut raw, "--pitch")?),
                "--volume" => args.volume = Some(Self::value(&mut raw, "--volume")?),
                "--lang" => {
                    args.lang = Some(raw.next().context("--lang needs a language tag")?)
                }
                "--help" | "-h" => bail!("{}", USAGE),
                _ if args.command.is_none() && !arg.starts_with("--") => {
                    args.command = Some(arg.clone())
                }
                _ => args.words.push(arg.clone()),
            }
        }

        Ok(args)
    }

    fn value(raw: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<f32> {
        let value = raw.next().with_context(|| format!("{} needs a value", flag))?;
        value
            .parse()
            .with_context(|| format!("{} expects a number, got '{}'", flag, value))
    }

    fn options(&self) -> SpeechOptions {
        SpeechOptions {
            locale: self.lang.as_deref().map(Locale::from_tag),
            pitch: self.pitch,
            volume: self.volume,
        }
    }
}

fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    // Initialize logger
    if args.debug {
        // Debug mode: write to speakgate.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("speakgate.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open speakgate.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "speakgate version {} starting (debug mode, logging to speakgate.log)",
            speakgate::VERSION
        );
    } else {
        // Normal mode: errors only unless RUST_LOG says otherwise
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Error)
            .parse_default_env()
            .init();
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(args)) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading configuration")?;
    info!("Config loaded from {:?}", config.path());
    if args.simulated {
        config.set("speech", "backend", "simulated");
    }
    debug!("Backend: {:?}", config.backend()?);
    if config.backend()? == BackendKind::Simulated {
        println!("Using the simulated backend (silent)");
    }

    let speaker = Speaker::from_config(&config).context("creating speech backend")?;

    match args.command.as_deref() {
        None => speak_loop(&speaker, &config).await,
        Some("say") => {
            if args.words.is_empty() {
                bail!("say needs some text\n\n{}", USAGE);
            }
            let text = args.words.join(" ");
            let cancel = cancel_on_ctrl_c();
            let outcome = speaker.speak(&text, &args.options(), Some(&cancel)).await?;
            debug!("say finished: {:?}", outcome);
            Ok(())
        }
        Some("voices") => list_voices(&speaker, args.json),
        Some(other) => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

/// Greet, then count aloud until Ctrl-C or the configured limit
async fn speak_loop(speaker: &Speaker, config: &Config) -> anyhow::Result<()> {
    let cancel = cancel_on_ctrl_c();
    let max_count = config.max_count();

    speaker.speak_text(&config.greeting(), Some(&cancel)).await?;

    let mut count: u64 = 0;
    while !cancel.is_cancelled() {
        if max_count > 0 && count >= max_count {
            break;
        }
        count += 1;
        println!("Speak : {}", count);
        let outcome = speaker.speak_text(&count.to_string(), Some(&cancel)).await?;
        if outcome == SpeakOutcome::Cancelled {
            break;
        }
    }

    info!("Spoke {} utterances", count);
    Ok(())
}

fn list_voices(speaker: &Speaker, json: bool) -> anyhow::Result<()> {
    let voices = speaker.list_voices().context("listing voices")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&voices)?);
        return Ok(());
    }

    if voices.is_empty() {
        println!("No voices reported by the {} backend", speaker.backend().name());
    }
    for voice in voices {
        println!("{:<8} {:<40} {}", voice.tag(), voice.name(), voice.id());
    }
    Ok(())
}

/// Token that fires on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping speech");
            child.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_say() {
        let args = parse(&["say", "hello", "world", "--pitch", "1.5", "--lang", "fr"]).unwrap();
        assert_eq!(args.command.as_deref(), Some("say"));
        assert_eq!(args.words, vec!["hello", "world"]);
        assert_eq!(args.pitch, Some(1.5));

        let options = args.options();
        assert_eq!(options.locale.unwrap().language(), "fr");
        assert_eq!(options.volume, None);
    }

    #[test]
    fn test_parse_flags() {
        let args = parse(&["--debug", "--simulated", "voices", "--json"]).unwrap();
        assert!(args.debug && args.simulated && args.json);
        assert_eq!(args.command.as_deref(), Some("voices"));
    }

    #[test]
    fn test_parse_bad_number() {
        assert!(parse(&["say", "x", "--volume", "loud"]).is_err());
        assert!(parse(&["say", "x", "--pitch"]).is_err());
    }
}
