use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

const URI: &str = "file:///home/user/portals/cpu.config";

/// Minimal JSON-RPC client speaking Content-Length framing over the server's stdio
struct LspClient {
    server: Child,
    reader: BufReader<ChildStdout>,
    writer: std::io::BufWriter<ChildStdin>,
}

impl LspClient {
    fn spawn() -> Self {
        let mut server = Command::new(env!("CARGO_BIN_EXE_charts-lsp"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn charts-lsp");
        let stdin = server.stdin.take().expect("Failed to get stdin");
        let stdout = server.stdout.take().expect("Failed to get stdout");
        LspClient {
            server,
            reader: BufReader::new(stdout),
            writer: std::io::BufWriter::new(stdin),
        }
    }

    fn send(&mut self, message: Value) {
        let body = message.to_string();
        let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        self.writer
            .write_all(framed.as_bytes())
            .expect("Failed to write message");
        self.writer.flush().expect("Failed to flush");
    }

    fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}));
        loop {
            let message = self.read_message();
            if message.get("id").and_then(Value::as_i64) == Some(id)
                && (message.get("result").is_some() || message.get("error").is_some())
            {
                return message;
            }
        }
    }

    fn notify(&mut self, method: &str, params: Value) {
        self.send(json!({"jsonrpc": "2.0", "method": method, "params": params}));
    }

    /// Skip messages until a server notification with `method` arrives
    fn wait_for_notification(&mut self, method: &str) -> Value {
        loop {
            let message = self.read_message();
            if message.get("method").and_then(Value::as_str) == Some(method)
                && message.get("id").is_none()
            {
                return message["params"].clone();
            }
        }
    }

    fn read_message(&mut self) -> Value {
        let mut content_length = None;
        let mut line = String::new();
        loop {
            line.clear();
            self.reader.read_line(&mut line).expect("Failed to read header");
            if line.trim().is_empty() {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                if key.trim().eq_ignore_ascii_case("Content-Length") {
                    content_length = Some(value.trim().parse::<usize>().expect("Invalid Content-Length"));
                }
            }
        }
        let mut body = vec![0u8; content_length.expect("Missing Content-Length header")];
        self.reader.read_exact(&mut body).expect("Failed to read body");
        serde_json::from_slice(&body).expect("Failed to parse JSON message")
    }

    fn initialize(&mut self, options: Value) -> Value {
        let response = self.request(
            1,
            "initialize",
            json!({
                "processId": std::process::id(),
                "rootUri": "file:///home/user/portals",
                "capabilities": {},
                "initializationOptions": options,
            }),
        );
        self.notify("initialized", json!({}));
        response
    }

    fn open(&mut self, text: &str) -> Value {
        self.notify(
            "textDocument/didOpen",
            json!({"textDocument": {
                "uri": URI,
                "languageId": "axibasecharts",
                "version": 1,
                "text": text,
            }}),
        );
        self.wait_for_notification("textDocument/publishDiagnostics")
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        let _ = self.server.kill();
    }
}

fn messages(diagnostics: &Value) -> Vec<String> {
    diagnostics["diagnostics"]
        .as_array()
        .expect("diagnostics array")
        .iter()
        .map(|d| d["message"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_initialize_advertises_capabilities() {
    let mut client = LspClient::spawn();
    let response = client.initialize(json!({}));
    let capabilities = &response["result"]["capabilities"];

    assert_eq!(capabilities["textDocumentSync"], json!(1));
    assert_eq!(capabilities["hoverProvider"], json!(true));
    assert_eq!(capabilities["documentFormattingProvider"], json!(true));
    let triggers = capabilities["completionProvider"]["triggerCharacters"]
        .as_array()
        .expect("trigger characters");
    assert!(triggers.contains(&json!("[")));
    assert!(triggers.contains(&json!("=")));
}

#[test]
fn test_diagnostics_follow_document_changes() {
    let mut client = LspClient::spawn();
    client.initialize(json!({}));

    let published = client.open("[widget]\n  type = chart\n  [series]\n    entity = srv1\n");
    assert_eq!(published["uri"], json!(URI));
    let found = messages(&published);
    assert!(found.contains(&"metric is required".to_string()), "{:?}", found);
    assert!(published["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["source"] == json!("charts")));

    client.notify(
        "textDocument/didChange",
        json!({
            "textDocument": {"uri": URI, "version": 2},
            "contentChanges": [{"text": "[configuration]\n[group]\n[widget]\n  type = chart\n  [series]\n    entity = srv1\n    metric = cpu_busy\n"}],
        }),
    );
    let published = client.wait_for_notification("textDocument/publishDiagnostics");
    assert_eq!(published["version"], json!(2));
    assert!(messages(&published).is_empty());

    client.notify("textDocument/didClose", json!({"textDocument": {"uri": URI}}));
    let published = client.wait_for_notification("textDocument/publishDiagnostics");
    assert!(messages(&published).is_empty());
}

#[test]
fn test_completion_and_hover() {
    let mut client = LspClient::spawn();
    client.initialize(json!({}));
    client.open("[configuration]\n[group]\n[widget]\n  type = gauge\n  [series]\n    \n");

    let response = client.request(
        2,
        "textDocument/completion",
        json!({"textDocument": {"uri": URI}, "position": {"line": 5, "character": 4}}),
    );
    let items = response["result"].as_array().expect("completion items");
    let labels: Vec<&str> = items.iter().filter_map(|i| i["label"].as_str()).collect();
    assert!(labels.contains(&"arrow-length"));
    assert!(!labels.contains(&"bar-count"));

    let response = client.request(
        3,
        "textDocument/hover",
        json!({"textDocument": {"uri": URI}, "position": {"line": 3, "character": 3}}),
    );
    let value = response["result"]["contents"]["value"]
        .as_str()
        .expect("hover markdown");
    assert!(value.starts_with("**type**"), "{}", value);
}

#[test]
fn test_initialization_options_disable_validation() {
    let mut client = LspClient::spawn();
    client.initialize(json!({"features": {"validation": false}}));

    let published = client.open("[widget]\n[series]\n");
    assert!(messages(&published).is_empty());
}
