use charts_lsp::check;
use charts_lsp::config::Config;
use charts_lsp::server::ChartsLsp;
use charts_lsp::service::LanguageService;
use std::path::PathBuf;
use std::process::ExitCode;
use tower_lsp::{LspService, Server};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    // Check for --check flag
    if args.len() > 1 && args[1] == "--check" {
        let paths: Vec<PathBuf> = args[2..].iter().map(PathBuf::from).collect();
        if paths.is_empty() {
            eprintln!("Usage: charts-lsp --check <files or directories...>");
            return ExitCode::from(2);
        }
        let service = match LanguageService::new(&Config::load_quiet()) {
            Ok(service) => service,
            Err(e) => {
                eprintln!("Failed to load the setting catalog: {:#}", e);
                return ExitCode::from(2);
            }
        };
        return if check::run_check(&service, &paths) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    // Check for --settings flag
    if args.len() > 1 && args[1] == "--settings" {
        let service = match LanguageService::builtin() {
            Ok(service) => service,
            Err(e) => {
                eprintln!("Failed to load the setting catalog: {:#}", e);
                return ExitCode::from(2);
            }
        };
        let section = args.get(2).map(|s| s.as_str());
        return if check::list_settings(service.catalog(), section) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    // Normal LSP server mode; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration: embedded defaults + user + local overrides
    let config = Config::load_with_local_overrides();
    let language_service = match LanguageService::new(&config) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("[ChartsLsp] Failed to start: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(move |client| ChartsLsp::new(client, config, language_service));
    Server::new(stdin, stdout, socket).serve(service).await;
    ExitCode::SUCCESS
}
