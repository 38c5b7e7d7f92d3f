use anyhow::{Context, Result, bail};
use docmux_config::Config;
use docmux_engine::{
    DocumentFile, DocumentModel, FileContentLoader, InterpreterError, MapDataRow, MessageSink,
    NoTransforms, Services, process_document,
};
use std::{collections::BTreeMap, env, path::PathBuf, process};

const USAGE: &str = "Usage: docmux <document.toml> [data.toml] [--content <location>]... [--force] [--output <file.toml>]";

/// Shows blocking messages on stderr. There is nobody to wait for.
struct StderrMessages;

impl MessageSink for StderrMessages {
    fn show_blocking_message(&self, title: &str, message: &str) {
        eprintln!("{title}:\n{message}\n");
    }
}

struct Args {
    document: PathBuf,
    data: Option<PathBuf>,
    content_locations: Vec<String>,
    force: bool,
    output: Option<PathBuf>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut positional = Vec::new();
        let mut content_locations = Vec::new();
        let mut force = false;
        let mut output = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--output" | "-o" => {
                    let path = args.next().context("--output needs a file name")?;
                    output = Some(PathBuf::from(path));
                }
                "--content" => {
                    content_locations.push(args.next().context("--content needs a location")?);
                }
                "--force" => force = true,
                flag if flag.starts_with('-') => bail!("unknown option '{flag}'"),
                _ => positional.push(PathBuf::from(arg)),
            }
        }

        let mut positional = positional.into_iter();
        let Some(document) = positional.next() else {
            bail!("no document given");
        };
        let data = positional.next();
        if positional.next().is_some() {
            bail!("too many arguments");
        }

        Ok(Self {
            document,
            data,
            content_locations,
            force,
            output,
        })
    }
}

/// Reads the selected data row: a flat table of column names to values.
fn load_data_row(path: Option<&PathBuf>) -> Result<MapDataRow> {
    let Some(path) = path else {
        return Ok(MapDataRow::none_selected());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file {}", path.display()))?;
    let row: BTreeMap<String, String> = toml::from_str(&content)
        .with_context(|| format!("Failed to parse data file {}", path.display()))?;
    Ok(MapDataRow::selected(row))
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    let config_path = Config::config_path();
    let config = match Config::load() {
        Ok(Some(config)) => {
            log::info!("Using config file {}", config_path.display());
            config
        }
        Ok(None) => {
            log::info!("No config file at {}, using defaults", config_path.display());
            Config::default()
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let doc = DocumentFile::load(&args.document)?.into_document()?;
    let mut content_locations = config.content_locations.clone();
    content_locations.extend(args.content_locations);
    let mut model = DocumentModel::new(doc).with_content_locations(content_locations);
    model.must_process = args.force;

    let data = load_data_row(args.data.as_ref())?;
    let services = Services {
        resolver: &config,
        loader: &FileContentLoader,
        data: &data,
        transformer: &NoTransforms,
        messages: &StderrMessages,
        policy: config.policy.clone(),
    };

    let failed = match process_document(&mut model, &services) {
        Ok(report) => {
            if let Some(fixpoint) = report.fixpoint {
                log::info!("Template processed in {} rounds", fixpoint.iterations());
            }
            if report.is_form_document {
                log::info!("Document is a form document");
            }
            false
        }
        Err(e @ InterpreterError::CommandsFailed { .. }) => {
            eprintln!("{e}");
            true
        }
    };

    let doc = model.into_document();
    match &args.output {
        Some(path) => {
            DocumentFile::from_document(&doc).save(path)?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", doc.text()),
    }

    if failed {
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Result<Args> {
        Args::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["letter.toml", "row.toml", "--content", "a.toml", "-o", "out.toml"]).unwrap();
        assert_eq!(parsed.document, PathBuf::from("letter.toml"));
        assert_eq!(parsed.data, Some(PathBuf::from("row.toml")));
        assert_eq!(parsed.content_locations, vec!["a.toml".to_string()]);
        assert_eq!(parsed.output, Some(PathBuf::from("out.toml")));
        assert!(!parsed.force);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["a", "b", "c"]).is_err());
        assert!(args(&["a", "--output"]).is_err());
        assert!(args(&["a", "--verbose"]).is_err());
    }

    #[test]
    fn test_load_data_row() {
        use docmux_engine::DataRowProvider;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("row.toml");
        std::fs::write(&path, "Name = \"Ada\"\nCity = \"London\"\n").unwrap();

        let row = load_data_row(Some(&path)).unwrap();
        assert_eq!(row.value("City").unwrap(), "London");

        let none = load_data_row(None).unwrap();
        assert!(none.value("City").is_err());
    }
}
