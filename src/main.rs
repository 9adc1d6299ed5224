use janusgen::logger::{self, LoggerConfig};
use janusgen::{AppConfig, GenerationSession, SessionState};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Prompt(String),
    Seed(i64),
    Guidance(f64),
    Temperature(f64),
    Generate,
    Download(usize),
    Show,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "prompt" | "p" => Ok(Command::Prompt(rest.to_string())),
        "seed" => rest
            .parse()
            .map(Command::Seed)
            .map_err(|_| format!("seed must be an integer, got `{}`", rest)),
        "guidance" | "cfg" => rest
            .parse()
            .map(Command::Guidance)
            .map_err(|_| format!("guidance must be a number, got `{}`", rest)),
        "temperature" | "temp" => rest
            .parse()
            .map(Command::Temperature)
            .map_err(|_| format!("temperature must be a number, got `{}`", rest)),
        "generate" | "g" => Ok(Command::Generate),
        "download" | "d" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Command::Download(n - 1)),
            _ => Err(format!("download takes an image number from 1, got `{}`", rest)),
        },
        "show" | "" => Ok(Command::Show),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command `{}` (try `help`)", other)),
    }
}

fn render(state: &SessionState) {
    println!();
    println!("=== AI Image Generator ===");
    println!(
        "Prompt: {}",
        if state.prompt.is_empty() {
            "<describe the image you want to generate>"
        } else {
            state.prompt.as_str()
        }
    );
    println!("Seed (Optional): {}", state.seed);
    println!("Guidance (CFG Weight): {}", state.guidance);
    println!("Temperature: {:.1}", state.temperature);
    if let Some(error) = &state.error {
        println!("! {}", error);
    }
    println!("[ {} ]", state.trigger_label());

    if !state.generated_images.is_empty() {
        println!("Generated Images:");
        for item in &state.generated_images {
            println!("  {}. {}", item.index + 1, item.url);
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  prompt <text>        set the prompt");
    println!("  seed <n>             set the seed");
    println!("  guidance <5-10>      set the CFG weight");
    println!("  temperature <0-1>    set the temperature");
    println!("  generate             generate images");
    println!("  download <n>         save image n");
    println!("  show | help | quit");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let config = AppConfig::from_env()?;

    logger::init_with_config(LoggerConfig::from_app_config(&config))?;
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }
    logger::log_config_info(&config);

    let session = Arc::new(GenerationSession::from_config(&config));

    let initial_prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !initial_prompt.trim().is_empty() {
        session.set_prompt(initial_prompt);
    }

    // Re-render whenever a generation settles or a new error appears.
    let mut updates = session.subscribe();
    tokio::spawn(async move {
        let mut previous = updates.borrow().clone();
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            let settled = previous.loading && !state.loading;
            let new_error = state.error.is_some() && state.error != previous.error;
            if settled || (new_error && !state.loading) {
                render(&state);
            }
            previous = state;
        }
    });

    render(&session.state());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            Command::Prompt(prompt) => session.set_prompt(prompt),
            Command::Seed(seed) => session.set_seed(seed),
            Command::Guidance(guidance) => session.set_guidance(guidance),
            Command::Temperature(temperature) => session.set_temperature(temperature),
            Command::Generate => {
                if !session.state().can_submit() {
                    println!("Generating... (wait for the current request to finish)");
                    continue;
                }
                let session = session.clone();
                tokio::spawn(async move {
                    let _ = session.submit().await;
                });
                continue;
            }
            Command::Download(index) => {
                let url = session
                    .state()
                    .generated_images
                    .get(index)
                    .map(|item| item.url.clone());
                match url {
                    Some(url) => {
                        let session = session.clone();
                        tokio::spawn(async move {
                            if let Ok(path) = session.download_image(&url, index).await {
                                println!("Saved {}", path.display());
                            }
                        });
                    }
                    None => println!("No image {}", index + 1),
                }
                continue;
            }
            Command::Show => {}
            Command::Help => {
                print_help();
                continue;
            }
            Command::Quit => break,
        }
        render(&session.state());
    }

    Ok(())
}
