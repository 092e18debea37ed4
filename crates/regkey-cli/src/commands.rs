use std::io::{self, BufRead, Write};

use anyhow::Context;
use colored::Colorize;
use regkey::request::{handle, Request, Response};
use regkey::{KeyStore, Registry, RegistryConfig};
use regkey_store::InMemoryKeyStore;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RegistryConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RegistryConfig::default(),
    };
    tracing::debug!(store = ?cli.store, grow_buffers = config.grow_buffers, "running command");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut input = stdin.lock();
    let mut out = stdout.lock();

    match &cli.store {
        Some(path) => {
            let store = InMemoryKeyStore::load(path)
                .with_context(|| format!("loading store {}", path.display()))?;
            let registry = Registry::with_config(store, config);
            execute(&registry, &cli.command, cli.format, &mut input, &mut out)?;
            if cli.command.mutates() {
                registry
                    .store()
                    .save(path)
                    .with_context(|| format!("saving store {}", path.display()))?;
            }
            Ok(())
        }
        None => run_native(&cli, config, &mut input, &mut out),
    }
}

#[cfg(windows)]
fn run_native(
    cli: &Cli,
    config: RegistryConfig,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let registry = Registry::with_config(regkey::NativeKeyStore::new(), config);
    execute(&registry, &cli.command, cli.format, input, out)
}

#[cfg(not(windows))]
fn run_native(
    _cli: &Cli,
    _config: RegistryConfig,
    _input: &mut impl BufRead,
    _out: &mut impl Write,
) -> anyhow::Result<()> {
    anyhow::bail!("no system registry on this platform; pass --store <file.json>")
}

pub fn execute<S: KeyStore>(
    registry: &Registry<S>,
    command: &Command,
    format: OutputFormat,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::Keys(args) => {
            let names = registry.enumerate_keys(&args.hive, &args.path)?;
            print_names(out, format, &names)
        }
        Command::Values(args) => {
            let names = registry.enumerate_values(&args.hive, &args.path)?;
            print_names(out, format, &names)
        }
        Command::Get(args) => {
            let value = registry.get_string(&args.hive, &args.path, &args.name)?;
            match format {
                OutputFormat::Text => writeln!(out, "{value}")?,
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&value)?)?,
            }
            Ok(())
        }
        Command::Set(args) => {
            registry.set_string(&args.hive, &args.path, &args.name, &args.value)?;
            confirm(out, format, "set", &full_name(&args.hive, &args.path, &args.name))
        }
        Command::DeleteKey(args) => {
            registry.delete_key(&args.hive, &args.path, &args.name)?;
            confirm(out, format, "deleted key", &full_name(&args.hive, &args.path, &args.name))
        }
        Command::DeleteValue(args) => {
            registry.delete_value(&args.hive, &args.path, &args.name)?;
            confirm(out, format, "deleted value", &full_name(&args.hive, &args.path, &args.name))
        }
        Command::Batch => run_batch(registry, input, out),
    }
}

/// Answer one JSON request per input line. Malformed lines get an error
/// line of their own and do not stop the batch.
fn run_batch<S: KeyStore>(
    registry: &Registry<S>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(request) => serde_json::to_string(&handle(registry, &request))?,
            Err(e) => serde_json::json!({ "parse_error": e.to_string() }).to_string(),
        };
        writeln!(out, "{reply}")?;
    }
    Ok(())
}

fn full_name(hive: &str, path: &str, name: &str) -> String {
    if path.is_empty() {
        format!("{hive}\\{name}")
    } else {
        format!("{hive}\\{path}\\{name}")
    }
}

fn print_names(out: &mut impl Write, format: OutputFormat, names: &[String]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            for name in names {
                writeln!(out, "{name}")?;
            }
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(names)?)?,
    }
    Ok(())
}

fn confirm(out: &mut impl Write, format: OutputFormat, action: &str, target: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{} {} {}", "✓".green().bold(), action, target.bold())?,
        OutputFormat::Json => {
            let response = Response::Ok(regkey::Reply::Done);
            writeln!(out, "{}", serde_json::to_string(&response)?)?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(registry: &Registry<InMemoryKeyStore>, argv: &[&str], stdin: &str) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut input = io::Cursor::new(stdin.as_bytes().to_vec());
        let mut out = Vec::new();
        execute(registry, &cli.command, cli.format, &mut input, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn set_get_and_list() {
        colored::control::set_override(false);
        let reg = Registry::new(InMemoryKeyStore::new());
        let out = run(&reg, &["regkey", "set", "HKEY_CURRENT_USER", "Software\\App", "Token", "abc123"], "").unwrap();
        assert!(out.contains("HKEY_CURRENT_USER\\Software\\App\\Token"));

        let out = run(&reg, &["regkey", "get", "HKEY_CURRENT_USER", "Software\\App", "Token"], "").unwrap();
        assert_eq!(out, "abc123\n");

        let out = run(&reg, &["regkey", "--format", "json", "values", "HKEY_CURRENT_USER", "Software\\App"], "").unwrap();
        assert_eq!(out.trim(), r#"["Token"]"#);

        let out = run(&reg, &["regkey", "keys", "HKEY_CURRENT_USER"], "").unwrap();
        assert_eq!(out, "Software\n");
    }

    #[test]
    fn errors_propagate() {
        let reg = Registry::new(InMemoryKeyStore::new());
        let err = run(&reg, &["regkey", "get", "HKEY_CURRENT_USER", "Missing", "v"], "").unwrap_err();
        assert!(err.to_string().contains("Unable to open registry key"));
        let err = run(&reg, &["regkey", "keys", "HKCU"], "").unwrap_err();
        assert!(err.to_string().contains("Unable to open registry hive"));
    }

    #[test]
    fn batch_answers_each_line() {
        let reg = Registry::new(InMemoryKeyStore::new());
        let stdin = concat!(
            r#"{"op":"SetStringRegKey","args":["HKEY_USERS","K","n","v"]}"#,
            "\n\n",
            "not json\n",
            r#"{"op":"GetStringRegKey","args":["HKEY_USERS","K","n"]}"#,
            "\n",
        );
        let out = run(&reg, &["regkey", "batch"], stdin).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"ok":{"type":"done"}}"#);
        assert!(lines[1].contains("parse_error"));
        assert_eq!(lines[2], r#"{"ok":{"type":"value","data":"v"}}"#);
    }

    #[test]
    fn snapshot_store_persists_mutations() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.json");
        let store_arg = path.to_str().unwrap();

        let cli = Cli::try_parse_from([
            "regkey", "--store", store_arg, "set", "HKEY_CURRENT_USER", "App", "Theme", "dark",
        ])
        .unwrap();
        run_command(cli).unwrap();

        let store = InMemoryKeyStore::load(&path).unwrap();
        let reg = Registry::new(store);
        assert_eq!(reg.get_string("HKEY_CURRENT_USER", "App", "Theme").unwrap(), "dark");
    }

    #[test]
    fn full_name_formatting() {
        assert_eq!(full_name("HKEY_USERS", "", "n"), "HKEY_USERS\\n");
        assert_eq!(full_name("HKEY_USERS", "a\\b", "n"), "HKEY_USERS\\a\\b\\n");
    }
}
