use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State as AxumState;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::env;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use uigen_core::{extract, transpile};
use uigen_web::render::DEFAULT_COMPONENT_NS;
use uigen_web::{synthesize_document, synthesize_styles, LocalSandbox, SeqGuard};

#[derive(Debug, Clone)]
enum CliCommand {
    Compile {
        file: PathBuf,
        entry: Option<String>,
    },
    Render {
        file: PathBuf,
        pretty: bool,
    },
    Dev {
        file: Option<PathBuf>,
        port: u16,
        watch: bool,
    },
}

#[derive(Clone)]
struct AppState {
    buffer: Arc<Mutex<String>>,
    file: Option<PathBuf>,
    watch: bool,
    version: Arc<AtomicU64>,
    reload_tx: broadcast::Sender<u64>,
    seq: Arc<SeqGuard>,
}

pub async fn run_from_env() -> Result<(), String> {
    run_from_args(env::args().skip(1).collect()).await
}

pub async fn run_from_args(args: Vec<String>) -> Result<(), String> {
    let command = parse_command(args)?;

    match command {
        CliCommand::Compile { file, entry } => run_compile(file, entry),
        CliCommand::Render { file, pretty } => run_render(file, pretty),
        CliCommand::Dev { file, port, watch } => run_dev(file, port, watch).await,
    }
}

fn parse_command(args: Vec<String>) -> Result<CliCommand, String> {
    if args.is_empty() {
        return Err(help_text());
    }

    let cmd = args[0].as_str();
    match cmd {
        "compile" => parse_compile(args),
        "render" => parse_render(args),
        "dev" => parse_dev(args),
        "help" | "--help" | "-h" => Err(help_text()),
        _ => Err(format!("unknown command: {cmd}\n\n{}", help_text())),
    }
}

fn parse_compile(args: Vec<String>) -> Result<CliCommand, String> {
    let mut file: Option<PathBuf> = None;
    let mut entry: Option<String> = None;

    let mut i = 1usize;
    while i < args.len() {
        let token = &args[i];
        match token.as_str() {
            "--entry" => {
                i += 1;
                entry = Some(
                    args.get(i)
                        .ok_or_else(|| "--entry requires a value".to_string())?
                        .to_string(),
                );
            }
            x if x.starts_with("--") => return Err(format!("unknown flag: {x}")),
            _ => {
                if file.is_some() {
                    return Err("only one FILE positional argument is allowed".to_string());
                }
                file = Some(PathBuf::from(token));
            }
        }
        i += 1;
    }

    let file = file.ok_or_else(|| "compile requires FILE".to_string())?;
    Ok(CliCommand::Compile { file, entry })
}

fn parse_render(args: Vec<String>) -> Result<CliCommand, String> {
    let mut file: Option<PathBuf> = None;
    let mut pretty = false;

    let mut i = 1usize;
    while i < args.len() {
        let token = &args[i];
        match token.as_str() {
            "--pretty" => pretty = true,
            x if x.starts_with("--") => return Err(format!("unknown flag: {x}")),
            _ => {
                if file.is_some() {
                    return Err("only one FILE positional argument is allowed".to_string());
                }
                file = Some(PathBuf::from(token));
            }
        }
        i += 1;
    }

    let file = file.ok_or_else(|| "render requires FILE".to_string())?;
    Ok(CliCommand::Render { file, pretty })
}

fn parse_dev(args: Vec<String>) -> Result<CliCommand, String> {
    let mut file: Option<PathBuf> = None;
    let mut port: u16 = 3000;
    let mut watch = true;

    let mut i = 1usize;
    while i < args.len() {
        let token = &args[i];
        match token.as_str() {
            "--port" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "--port requires a value".to_string())?;
                port = value
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {value}"))?;
            }
            "--watch" => watch = true,
            "--no-watch" => watch = false,
            x if x.starts_with("--") => return Err(format!("unknown flag: {x}")),
            _ => {
                if file.is_some() {
                    return Err("only one FILE positional argument is allowed".to_string());
                }
                file = Some(PathBuf::from(token));
            }
        }
        i += 1;
    }

    Ok(CliCommand::Dev { file, port, watch })
}

fn help_text() -> String {
    [
        "uigen CLI",
        "",
        "Commands:",
        "  uigen compile FILE [--entry NAME]",
        "  uigen render FILE [--pretty]",
        "  uigen dev [FILE] [--port 3000] [--watch|--no-watch]",
    ]
    .join("\n")
}

fn read_source(file: &Path) -> Result<String, String> {
    fs::read_to_string(file).map_err(|e| format!("failed to read {}: {e}", file.display()))
}

fn run_compile(file: PathBuf, entry: Option<String>) -> Result<(), String> {
    let source = read_source(&file)?;
    let extracted = extract(&source);
    let entry = entry.unwrap_or(extracted.entry_name);
    let artifact = transpile(&extracted.code, &entry, DEFAULT_COMPONENT_NS);
    println!("{}", artifact.script);
    Ok(())
}

fn run_render(file: PathBuf, pretty: bool) -> Result<(), String> {
    let source = read_source(&file)?;
    let extracted = extract(&source);
    let artifact = transpile(&extracted.code, &extracted.entry_name, DEFAULT_COMPONENT_NS);
    let tree = LocalSandbox::new()
        .render(&artifact)
        .map_err(|e| e.to_string())?;

    let json = if pretty {
        serde_json::to_string_pretty(&tree)
    } else {
        serde_json::to_string(&tree)
    }
    .map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

const PLACEHOLDER_SOURCE: &str = "function Interface() {\n  return (\n    <div className=\"p-8 text-center text-gray-500\">\n      Waiting for a component. Push code to /update-preview or pass a file.\n    </div>\n  );\n}\n";

async fn run_dev(file: Option<PathBuf>, port: u16, watch: bool) -> Result<(), String> {
    let file = match file {
        Some(f) => Some(
            f.canonicalize()
                .map_err(|e| format!("failed to resolve {}: {e}", f.display()))?,
        ),
        None => None,
    };

    let initial = match &file {
        Some(f) => read_source(f)?,
        None => PLACEHOLDER_SOURCE.to_string(),
    };

    let state = Arc::new(AppState {
        buffer: Arc::new(Mutex::new(initial)),
        file: file.clone(),
        watch,
        version: Arc::new(AtomicU64::new(0)),
        reload_tx: broadcast::channel(256).0,
        seq: Arc::new(SeqGuard::new()),
    });

    if watch && file.is_some() {
        let watcher_state = Arc::clone(&state);
        tokio::spawn(async move {
            watch_loop(watcher_state).await;
        });
    }

    let state_for_app = Arc::clone(&state);
    let app = Router::new()
        .route("/", get(route_index))
        .route("/__uigen_ws", get(ws_reload))
        .route("/update-preview", post(update_preview))
        .with_state(state_for_app);

    let host = format!("0.0.0.0:{port}");
    println!("uigen dev");
    if let Some(f) = &file {
        println!("File: {}", f.display());
    }
    println!("URL:  http://localhost:{port}");
    println!("Watch: {}", if watch { "on" } else { "off" });

    let listener = tokio::net::TcpListener::bind(&host)
        .await
        .map_err(|e| format!("failed to bind {host}: {e}"))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server failed: {e}"))?;

    Ok(())
}

/// Compile the buffered source into a full preview page.
fn compose_page(source: &str, watch: bool) -> String {
    let extracted = extract(source);
    let artifact = transpile(&extracted.code, &extracted.entry_name, DEFAULT_COMPONENT_NS);
    let css = synthesize_styles(&[extracted.code.as_str(), artifact.script.as_str()]);
    let mut html = synthesize_document(&artifact, &css);
    if watch {
        html = inject_reload_script(html);
    }
    html
}

async fn route_index(AxumState(state): AxumState<Arc<AppState>>) -> Response {
    let source = match state.buffer.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "buffer poisoned").into_response();
        }
    };
    Html(compose_page(&source, state.watch)).into_response()
}

#[derive(Debug, Deserialize)]
struct PreviewPush {
    code: String,
    seq: u64,
}

async fn update_preview(
    AxumState(state): AxumState<Arc<AppState>>,
    Json(push): Json<PreviewPush>,
) -> Response {
    if !state.seq.accept(push.seq) {
        tracing::debug!(seq = push.seq, "stale preview push dropped");
        return (StatusCode::OK, "stale").into_response();
    }

    match state.buffer.lock() {
        Ok(mut guard) => *guard = push.code,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "buffer poisoned").into_response();
        }
    }
    let next = state.version.fetch_add(1, Ordering::SeqCst) + 1;
    let _ = state.reload_tx.send(next);
    tracing::info!(seq = push.seq, version = next, "preview updated");
    (StatusCode::OK, "ok").into_response()
}

async fn ws_reload(ws: WebSocketUpgrade, AxumState(state): AxumState<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_reload_socket(socket, state))
}

async fn handle_reload_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.reload_tx.subscribe();
    let initial = state.version.load(Ordering::SeqCst);

    if socket
        .send(Message::Text(initial.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
            next = rx.recv() => {
                match next {
                    Ok(version) => {
                        if socket
                            .send(Message::Text(version.to_string().into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn watch_loop(state: Arc<AppState>) {
    let Some(file) = state.file.clone() else {
        return;
    };

    let mut last = compute_file_fingerprint(&file);
    let mut fallback_interval = tokio::time::interval(Duration::from_millis(1500));
    let mut notify = start_fs_watcher(&file).ok();

    if notify.is_some() {
        tracing::info!("filesystem watcher active (event-driven + fallback sweep)");
    } else {
        tracing::warn!("filesystem watcher unavailable; using polling fallback");
    }

    loop {
        if let Some((_, rx)) = notify.as_mut() {
            tokio::select! {
                _ = fallback_interval.tick() => {
                    check_and_broadcast_if_changed(&state, &file, &mut last).await;
                }
                evt = rx.recv() => {
                    match evt {
                        Some(_) => {
                            debounce_fs_events(rx).await;
                            check_and_broadcast_if_changed(&state, &file, &mut last).await;
                        }
                        None => {
                            tracing::warn!("watcher channel closed; fallback polling only");
                            notify = None;
                        }
                    }
                }
            }
        } else {
            fallback_interval.tick().await;
            check_and_broadcast_if_changed(&state, &file, &mut last).await;
        }
    }
}

async fn check_and_broadcast_if_changed(state: &Arc<AppState>, file: &Path, last: &mut u64) {
    let path = file.to_path_buf();
    let now = tokio::task::spawn_blocking(move || compute_file_fingerprint(&path))
        .await
        .unwrap_or(*last);
    if now == *last {
        return;
    }
    *last = now;

    match fs::read_to_string(file) {
        Ok(source) => {
            if let Ok(mut guard) = state.buffer.lock() {
                *guard = source;
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to re-read watched file");
            return;
        }
    }

    let next = state.version.fetch_add(1, Ordering::SeqCst) + 1;
    let _ = state.reload_tx.send(next);
    tracing::info!(version = next, "change detected, reloading preview");
}

async fn debounce_fs_events(rx: &mut mpsc::UnboundedReceiver<()>) {
    let debounce_window = Duration::from_millis(120);
    let mut deadline = Instant::now() + debounce_window;
    let sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => break,
            maybe = rx.recv() => {
                if maybe.is_none() {
                    break;
                }
                deadline = Instant::now() + debounce_window;
                sleep.as_mut().reset(deadline);
            }
        }
    }
}

fn start_fs_watcher(
    file: &Path,
) -> Result<(RecommendedWatcher, mpsc::UnboundedReceiver<()>), String> {
    let (tx, rx) = mpsc::unbounded_channel::<()>();
    let tx_cb = tx.clone();
    let watched = file.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if event.paths.is_empty() || event.paths.iter().any(|p| p == &watched) {
                let _ = tx_cb.send(());
            }
        }
        Err(_) => {
            let _ = tx_cb.send(());
        }
    })
    .map_err(|e| format!("failed to initialize filesystem watcher: {e}"))?;

    // Watch the parent directory: editors that save via rename replace
    // the inode, which drops a watch registered on the file itself.
    let target = file.parent().unwrap_or(file);
    watcher
        .watch(target, RecursiveMode::NonRecursive)
        .map_err(|e| format!("failed to watch {}: {e}", target.display()))?;

    Ok((watcher, rx))
}

/// Content hash of the watched file. Metadata-only checks can miss
/// rapid same-size edits, so the bytes themselves are hashed.
fn compute_file_fingerprint(file: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    if let Ok(meta) = fs::metadata(file) {
        meta.len().hash(&mut hasher);
        if let Ok(modified) = meta.modified() {
            if let Ok(duration) = modified.duration_since(std::time::UNIX_EPOCH) {
                duration.as_secs().hash(&mut hasher);
                duration.subsec_nanos().hash(&mut hasher);
            }
        }
    }
    if let Ok(bytes) = fs::read(file) {
        bytes.hash(&mut hasher);
    }
    hasher.finish()
}

fn inject_reload_script(mut html: String) -> String {
    if html.contains("/__uigen_ws") {
        return html;
    }

    let script = r#"<script>
(function(){
  var current = null;
  var reconnectTimer = null;

  function connect(){
    var proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
    var ws = new WebSocket(proto + location.host + '/__uigen_ws');

    ws.onmessage = function(event){
      var next = Number(event && event.data || 0);
      if (!Number.isFinite(next)) return;
      if (current === null) {
        current = next;
        return;
      }
      if (next !== current) {
        location.reload();
      }
    };

    ws.onclose = function(){
      if (reconnectTimer) clearTimeout(reconnectTimer);
      reconnectTimer = setTimeout(connect, 600);
    };

    ws.onerror = function(){
      try { ws.close(); } catch (_) {}
    };
  }

  connect();
})();
</script>"#;

    if let Some(idx) = html.rfind("</body>") {
        let before = &html[..idx];
        let after = &html[idx..];
        html = format!("{}{}{}", before, script, after);
    } else {
        html.push_str(script);
    }

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_file(prefix: &str, contents: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "{}-{}-{}.tsx",
            prefix,
            std::process::id(),
            ts
        ));
        std::fs::write(&path, contents).expect("failed to write temp file");
        path
    }

    #[test]
    fn parse_dev_accepts_port_and_watch_flags() {
        let cmd = parse_command(vec![
            "dev".to_string(),
            "app.tsx".to_string(),
            "--port".to_string(),
            "4000".to_string(),
            "--no-watch".to_string(),
        ])
        .unwrap();
        match cmd {
            CliCommand::Dev { file, port, watch } => {
                assert_eq!(file, Some(PathBuf::from("app.tsx")));
                assert_eq!(port, 4000);
                assert!(!watch);
            }
            other => panic!("expected dev command, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_unknown_flags_and_commands() {
        assert!(parse_command(vec!["dev".to_string(), "--bogus".to_string()]).is_err());
        assert!(parse_command(vec!["frobnicate".to_string()]).is_err());
        assert!(parse_command(vec!["compile".to_string()]).is_err());
    }

    #[test]
    fn parse_compile_takes_an_entry_override() {
        let cmd = parse_command(vec![
            "compile".to_string(),
            "app.tsx".to_string(),
            "--entry".to_string(),
            "Dashboard".to_string(),
        ])
        .unwrap();
        match cmd {
            CliCommand::Compile { file, entry } => {
                assert_eq!(file, PathBuf::from("app.tsx"));
                assert_eq!(entry.as_deref(), Some("Dashboard"));
            }
            other => panic!("expected compile command, got {other:?}"),
        }
    }

    #[test]
    fn fingerprint_detects_same_size_content_change() {
        let file = unique_temp_file("uigen-watch", "<div>A</div>\n");
        let before = compute_file_fingerprint(&file);
        std::fs::write(&file, "<div>B</div>\n").expect("failed to rewrite temp file");
        let after = compute_file_fingerprint(&file);
        assert_ne!(before, after);
    }

    #[test]
    fn compose_page_renders_source_and_injects_reload() {
        let html = compose_page(
            "function App() { return <div className=\"p-4\">hi</div>; }",
            true,
        );
        assert!(html.contains("__entry__ = App;"));
        assert!(html.contains(".p-4{padding:1rem;}"));
        assert!(html.contains("/__uigen_ws"));

        let without = compose_page("function App() { return <div>hi</div>; }", false);
        assert!(!without.contains("/__uigen_ws"));
    }

    #[test]
    fn reload_script_is_injected_once() {
        let page = inject_reload_script("<html><body></body></html>".to_string());
        let again = inject_reload_script(page.clone());
        assert_eq!(page, again);
        assert!(page.contains("</script></body>"));
    }

    #[test]
    fn placeholder_page_renders_without_a_file() {
        let html = compose_page(PLACEHOLDER_SOURCE, false);
        assert!(html.contains("__entry__ = Interface;"));
        assert!(html.contains("Waiting for a component"));
    }
}
