use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::{
    analysis::{AnalysisRequester, Diagnosis, TextGenerator},
    cli_types::{DebugArgs, ScanArgs, ServeArgs},
    config::Settings,
    gemini::GeminiClient,
    pipeline::Codefix,
    scanner::{FileTreeScanner, ScanOptions},
    server,
};

pub struct CliApp {
    settings: Settings,
    generator: Option<Arc<dyn TextGenerator>>,
    verbose: bool,
}

impl CliApp {
    pub fn new(settings: Settings, verbose: bool, colors_enabled: bool) -> Self {
        if !colors_enabled {
            colored::control::set_override(false);
        }
        Self {
            settings,
            generator: None,
            verbose,
        }
    }

    /// Use `generator` for `debug` instead of the configured Gemini client.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub async fn serve(&mut self, args: ServeArgs) -> Result<()> {
        if let Some(host) = args.host {
            self.settings.server.host = host;
        }
        if let Some(port) = args.port {
            self.settings.server.port = port;
        }

        let codefix = Codefix::from_settings(&self.settings).context("Failed to initialize pipeline")?;
        let address = self.settings.bind_address();

        print_header("Codefix API");
        print_info(&format!("Listening on http://{}", address));
        print_info(&format!("Repositories: {}", self.settings.storage.repositories_root.display()));
        print_info(&format!("Project storage: {:?}", self.settings.storage.backend).to_lowercase());

        server::serve(&address, codefix).await
    }

    pub async fn scan(&self, args: ScanArgs) -> Result<()> {
        let start_time = Instant::now();
        print_header("Repository Scan");

        if self.verbose {
            print_info(&format!("Scanning directory: {}", args.path.display()));
            print_info(&format!("Skipped directories: {:?}", self.settings.scanner.skip_dirs));
        }

        let files = self.collect_files(&args).await?;
        for file in &files {
            println!("  {}", file);
        }

        print_success(&format!(
            "Found {} files in {:?}",
            files.len(),
            start_time.elapsed()
        ));
        Ok(())
    }

    pub async fn debug(&self, args: DebugArgs) -> Result<()> {
        print_header("File Debug");
        if self.verbose {
            print_info(&format!("Analyzing file: {}", args.file.display()));
        }

        let start_time = Instant::now();
        let diagnosis = self.diagnose_file(&args).await?;

        if diagnosis.degraded {
            print_warning(&diagnosis.text);
        } else {
            print_success("Diagnosis:");
            println!("{}", diagnosis.text);
        }

        if self.verbose {
            print_info(&format!("Analysis completed in {:?}", start_time.elapsed()));
        }
        Ok(())
    }

    async fn collect_files(&self, args: &ScanArgs) -> Result<Vec<String>> {
        let mut options = ScanOptions::from(&self.settings.scanner);
        options.follow_symlinks |= args.follow_symlinks;
        let scanner = FileTreeScanner::new(options);
        let path = args.path.clone();

        let files = tokio::task::spawn_blocking(move || scanner.scan(&path))
            .await
            .context("Scan task panicked")?
            .with_context(|| format!("Failed to scan {}", args.path.display()))?;
        info!(path = %args.path.display(), files = files.len(), "Scan complete");
        Ok(files)
    }

    async fn diagnose_file(&self, args: &DebugArgs) -> Result<Diagnosis> {
        let content = tokio::fs::read_to_string(&args.file)
            .await
            .with_context(|| format!("Failed to read {}", args.file.display()))?;

        let generator = match &self.generator {
            Some(generator) => generator.clone(),
            None => Arc::new(
                GeminiClient::from_config(&self.settings.ai).context("Failed to create Gemini client")?,
            ),
        };

        let requester =
            AnalysisRequester::new(generator).with_max_content_bytes(self.settings.ai.max_content_bytes);
        requester
            .diagnose(&content)
            .await
            .context("Failed to analyze file")
    }
}

fn print_header(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "=".repeat(title.len()).cyan());
}

fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message.yellow());
}
