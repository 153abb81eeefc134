use ingredient_extractor::{render, ExtractError, ImageSource, Outcome, Pipeline};
use log::debug;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "Usage: ingredient-extractor [--json] [--raw-text] <IMAGE|->

Extracts ingredient lists from a food-product photo (.jpg, .jpeg or .png).
Pass - to read a captured image from standard input.

Options:
  --json       print only the JSON array of ingredient lists
  --raw-text   also print the text found by OCR
  -h, --help   show this message

Exit status: 0 ingredients found, 1 unreadable input, 2 nothing extracted,
3 missing or invalid configuration";

const CONFIGURATION_HINT: &str = "Set GEMINI_API_KEY and GOOGLE_APPLICATION_CREDENTIALS, \
or provide gemini_api_key and vision_credentials_json in secrets.toml";

/// Message and exit status for an error that stopped the run
fn failure(e: &ExtractError) -> (String, u8) {
    if e.is_startup_error() {
        (format!("Error: {}\n{}", e, CONFIGURATION_HINT), 3)
    } else {
        (format!("Error: {}", e), 1)
    }
}

#[derive(Debug, PartialEq)]
struct Args {
    json: bool,
    raw_text: bool,
    /// `None` means standard input
    image: Option<PathBuf>,
}

enum Command {
    Run(Args),
    Help,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, String> {
    let mut json = false;
    let mut raw_text = false;
    let mut image: Option<Option<PathBuf>> = None;

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--json" => json = true,
            "--raw-text" => raw_text = true,
            "-" => image = Some(None),
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
            path => {
                if image.is_some() {
                    return Err("Please provide a single image".to_string());
                }
                image = Some(Some(PathBuf::from(path)));
            }
        }
    }

    let image = image.ok_or("Please provide an image path or - as an argument")?;
    Ok(Command::Run(Args {
        json,
        raw_text,
        image,
    }))
}

async fn run(args: Args) -> Result<ExitCode, ExtractError> {
    // Credentials problems end the process here, before any image is read
    let pipeline = Pipeline::builder().build().await?;

    let source = match args.image {
        Some(path) => ImageSource::Path(path),
        None => ImageSource::from_stdin().await?,
    };

    let outcome = pipeline.run_source(source).await?;
    debug!("{:#?}", outcome);

    if args.json {
        match &outcome {
            Outcome::Extracted { ingredients, .. } => {
                println!("{}", render::render_json(ingredients)?)
            }
            _ => eprint!("{}", render::render_report(&outcome, false)?),
        }
    } else {
        print!("{}", render::render_report(&outcome, args.raw_text)?);
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(1);
        }
    };

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            let (message, status) = failure(&e);
            eprintln!("{}", message);
            ExitCode::from(status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        parse_args(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_path() {
        match parse(&["--raw-text", "label.jpg"]) {
            Ok(Command::Run(args)) => assert_eq!(
                args,
                Args {
                    json: false,
                    raw_text: true,
                    image: Some(PathBuf::from("label.jpg")),
                }
            ),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_stdin() {
        match parse(&["-", "--json"]) {
            Ok(Command::Run(args)) => {
                assert!(args.json);
                assert_eq!(args.image, None);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a.jpg", "b.jpg"]).is_err());
        assert!(parse(&["--verbose", "a.jpg"]).is_err());
        assert!(matches!(parse(&["--help"]), Ok(Command::Help)));
    }

    #[test]
    fn test_startup_failure_gets_hint_and_own_status() {
        let (message, status) =
            failure(&ExtractError::MissingCredentials("GEMINI_API_KEY".to_string()));
        assert_eq!(status, 3);
        assert!(message.contains("GEMINI_API_KEY"));
        assert!(message.contains("secrets.toml"));

        let (message, status) = failure(&ExtractError::UnsupportedImage("label.gif".to_string()));
        assert_eq!(status, 1);
        assert!(!message.contains("secrets.toml"));
    }
}
