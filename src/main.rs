//! Purpose: `addon-fixture` CLI entry point for inspecting and exercising the fixture.
//! Role: Binary crate root; parses args, drives the reference loader, emits JSON on stdout.
//! Invariants: Successful commands emit one JSON document per line on stdout.
//! Invariants: Errors are emitted as JSON on stderr; exit code comes from `to_exit_code`.
//! Invariants: Logging goes to stderr via `tracing` and never mixes into stdout payloads.
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use addon_fixture::core::error::{Error, ErrorKind, to_exit_code};
use addon_fixture::core::exports::ExportsTable;
use addon_fixture::core::loader::{DEFAULT_MODULE_VERSION, Loader, LoaderConfig};
use addon_fixture::core::registry::Convention;
use addon_fixture::fixture;

#[derive(Parser, Debug)]
#[command(
    name = "addon-fixture",
    version,
    about = "Exercise a native addon fixture that exposes a real and a fake entry point"
)]
struct Cli {
    /// NODE_MODULE_VERSION the reference loader expects.
    #[arg(
        long,
        global = true,
        env = "ADDON_FIXTURE_MODULE_VERSION",
        default_value_t = DEFAULT_MODULE_VERSION
    )]
    expected_version: i32,

    /// Refuse pending legacy (non context-aware) module records.
    #[arg(long, global = true)]
    force_context_aware: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the registration table.
    Candidates,
    /// Load the fixture repeatedly and report which initializer ran.
    Load {
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
    /// Load once and call an exported function with JSON arguments.
    Call {
        name: String,
        #[arg(value_name = "ARG_JSON")]
        args: Vec<String>,
    },
    /// Invoke the default-convention initializer directly (negative control).
    InvokeDefault,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let config = LoaderConfig::default()
        .with_expected_version(cli.expected_version)
        .with_force_context_aware(cli.force_context_aware);
    if let Err(err) = run(cli.command, config) {
        eprintln!("{}", error_json(&err));
        std::process::exit(to_exit_code(err.kind()));
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Command, config: LoaderConfig) -> Result<(), Error> {
    let registry = fixture::registry()?;
    match command {
        Command::Candidates => {
            println!("{}", json!({ "candidates": registry }));
        }
        Command::Load { times } => {
            if times == 0 {
                return Err(Error::new(ErrorKind::Usage).with_message("--times must be at least 1"));
            }
            let mut loader = Loader::new(config);
            for _ in 0..times {
                let module = loader.load(&registry)?;
                println!("{}", module.to_json());
            }
            println!("{}", json!({ "trace": loader.trace() }));
        }
        Command::Call { name, args } => {
            let args = parse_args(&args)?;
            let module = Loader::new(config).load(&registry)?;
            let result = module.exports.call(&name, &args)?;
            println!("{}", json!({ "name": name, "result": result }));
        }
        Command::InvokeDefault => {
            let candidate = registry.find(Convention::Default).ok_or_else(|| {
                Error::new(ErrorKind::NotFound).with_message("no default entry point registered")
            })?;
            let mut exports = ExportsTable::new();
            candidate.invoke(&mut exports)?;
            println!("{}", json!({ "invoked": candidate.name, "exports": exports.to_json() }));
        }
    }
    Ok(())
}

fn parse_args(raw: &[String]) -> Result<Vec<Value>, Error> {
    raw.iter()
        .enumerate()
        .map(|(index, arg)| {
            serde_json::from_str(arg).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("argument {index} is not valid JSON: {arg}"))
                    .with_source(err)
            })
        })
        .collect()
}

fn error_json(err: &Error) -> Value {
    let mut inner = serde_json::Map::new();
    inner.insert("kind".to_string(), json!(err.kind().label()));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or_else(|| err.kind().label())),
    );
    if let Some(candidate) = err.candidate() {
        inner.insert("candidate".to_string(), json!(candidate));
    }
    if let Some(version) = err.version() {
        inner.insert("version".to_string(), json!(version));
    }
    json!({ "error": Value::Object(inner) })
}

#[cfg(test)]
mod tests {
    use super::{error_json, parse_args};
    use addon_fixture::core::error::{Error, ErrorKind};
    use serde_json::json;

    #[test]
    fn parse_args_accepts_json_values() {
        let args = ["1".to_string(), "\"x\"".to_string(), "null".to_string()];
        assert_eq!(
            parse_args(&args).expect("parse"),
            vec![json!(1), json!("x"), json!(null)]
        );
    }

    #[test]
    fn parse_args_rejects_bare_words() {
        let err = parse_args(&["x".to_string()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn error_json_carries_candidate_and_version() {
        let err = Error::new(ErrorKind::Fatal)
            .with_message("stop")
            .with_candidate("FakeInit")
            .with_version(3);
        assert_eq!(
            error_json(&err),
            json!({"error": {"kind": "Fatal", "message": "stop", "candidate": "FakeInit", "version": 3}})
        );
    }
}
