mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use sheetsift_ai::{Classifier, ClassifierError, OpenAiClient, OpenAiConfig, RelevanceEngine};
use sheetsift_core::{Dataset, QueryConfig};
use tracing_subscriber::EnvFilter;

/// Ask a natural-language question of a table and print the relevant rows.
#[derive(Parser, Debug)]
#[command(name = "sheetsift", version, about, long_about = None)]
struct Cli {
    /// Natural-language query. Empty returns every row.
    #[arg(default_value = "")]
    query: String,

    /// Dataset as JSON `{"headers": [...], "rows": [[...]]}`; `-` reads stdin.
    #[arg(short, long)]
    data: PathBuf,

    /// TOML file with `model_id`, `relevance_threshold`, `chunk_size`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    threshold: Option<f32>,

    #[arg(long)]
    temperature: Option<f32>,

    /// Required unless the query is empty.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = sheetsift_ai::openai::DEFAULT_BASE_URL)]
    base_url: String,

    /// Per-request classifier timeout in seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    fn query_config(&self) -> anyhow::Result<QueryConfig> {
        let mut config = match &self.config {
            Some(path) => QueryConfig::load(path)?,
            None => QueryConfig::default(),
        };
        if let Some(model) = &self.model {
            config = config.with_model_id(model.clone());
        }
        if let Some(size) = self.chunk_size {
            config = config.with_chunk_size(size);
        }
        if let Some(threshold) = self.threshold {
            config = config.with_relevance_threshold(threshold);
        }
        config.validate()?;
        Ok(config)
    }

    fn client_config(&self, api_key: &str) -> OpenAiConfig {
        OpenAiConfig::new(api_key)
            .with_base_url(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_temperature(self.temperature)
    }

    /// The OpenAI client, or a keyless stand-in when the query is empty and
    /// the engine will never call it.
    fn classifier(&self) -> anyhow::Result<Arc<dyn Classifier>> {
        match self.api_key.as_deref() {
            Some(key) => {
                let client = OpenAiClient::new(self.client_config(key))
                    .context("building classifier client")?;
                Ok(Arc::new(client))
            }
            None if self.query.is_empty() => Ok(Arc::new(NoApiKey)),
            None => bail!("an API key is required: pass --api-key or set OPENAI_API_KEY"),
        }
    }
}

struct NoApiKey;

#[async_trait]
impl Classifier for NoApiKey {
    async fn classify(&self, _model_id: &str, _prompt: &str) -> Result<String, ClassifierError> {
        Err(ClassifierError::MissingApiKey)
    }
}

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading dataset from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading dataset {}", path.display()))?
    };
    serde_json::from_str(&text).context("parsing dataset JSON")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sheetsift=info,sheetsift_ai=info,sheetsift_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("sheetsift v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.query_config().context("loading query config")?;
    let engine = RelevanceEngine::new(cli.classifier()?, config)?;

    let dataset = Arc::new(load_dataset(&cli.data)?);
    let result = engine.run_query(&cli.query, Arc::clone(&dataset)).await;

    match cli.format {
        OutputFormat::Table => print!("{}", display::render_table(&dataset.headers, &result.rows)),
        OutputFormat::Json => {
            let out = Dataset::new(dataset.headers.clone(), result.rows);
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    eprint!("{}", display::render_summary(&result.report));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["sheetsift"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model_id = \"gpt-4o\"\nchunk_size = 10").unwrap();
        let path = file.path().to_str().unwrap();

        let cli = parse(&[
            "yoga", "--data", "d.json", "--config", path, "--chunk-size", "5", "--api-key", "k",
        ]);
        let config = cli.query_config().unwrap();
        assert_eq!(config.model_id, "gpt-4o");
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.relevance_threshold, 0.7);
    }

    #[test]
    fn invalid_flag_value_rejected() {
        let cli = parse(&["q", "--data", "d.json", "--threshold", "2", "--api-key", "k"]);
        assert!(cli.query_config().is_err());
    }

    #[test]
    fn query_defaults_to_empty() {
        let cli = parse(&["--data", "d.json", "--api-key", "k"]);
        assert_eq!(cli.query, "");
    }

    #[test]
    fn client_config_from_flags() {
        let cli = parse(&[
            "q", "--data", "d.json", "--api-key", "k", "--base-url", "http://localhost:1234/v1/",
            "--timeout-secs", "5", "--temperature", "0.2",
        ]);
        let client = cli.client_config("k");
        assert_eq!(client.base_url, "http://localhost:1234/v1");
        assert_eq!(client.request_timeout, Duration::from_secs(5));
        assert_eq!(client.temperature, Some(0.2));
    }

    #[test]
    fn empty_query_needs_no_api_key() {
        let mut cli = parse(&["--data", "d.json"]);
        cli.api_key = None;
        assert!(cli.classifier().is_ok());
    }

    #[tokio::test]
    async fn empty_query_without_key_returns_all_rows() {
        let mut cli = parse(&["--data", "d.json"]);
        cli.api_key = None;
        let engine = RelevanceEngine::new(cli.classifier().unwrap(), QueryConfig::default()).unwrap();
        let ds = Arc::new(Dataset::new(
            vec!["A".into()],
            vec![vec!["1".into()], vec!["2".into()]],
        ));
        let result = engine.run_query(&cli.query, Arc::clone(&ds)).await;
        assert_eq!(result.rows, ds.rows);
    }

    #[test]
    fn non_empty_query_needs_api_key() {
        let mut cli = parse(&["yoga", "--data", "d.json"]);
        cli.api_key = None;
        assert!(cli.classifier().is_err());

        cli.api_key = Some("k".into());
        assert!(cli.classifier().is_ok());
    }

    #[test]
    fn load_dataset_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"headers": ["A"], "rows": [["1"], ["2"]]}}"#).unwrap();
        let ds = load_dataset(file.path()).unwrap();
        assert_eq!(ds.headers, vec!["A"]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn load_dataset_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Event,Category\nyoga,yoga").unwrap();
        assert!(load_dataset(file.path()).is_err());
    }
}
