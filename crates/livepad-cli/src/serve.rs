use anyhow::{Context, Result, anyhow};
use livepad_compiler::Compiler;
use livepad_core::{read_source, rewrite_document};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::debug;

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone)]
pub(crate) struct ServeConfig {
    pub host: String,
    pub port: u16,
    pub file: PathBuf,
}

#[derive(Debug)]
pub(crate) struct ServerHandle {
    pub url: String,
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    pub fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }

    /// Blocks until the server thread ends.
    pub fn wait(mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Document,
    Source,
    NotFound,
}

fn route(raw_path: &str) -> Route {
    let path = raw_path.split(['?', '#']).next().unwrap_or("/");
    match path {
        "/" | "/index.html" => Route::Document,
        "/source" => Route::Source,
        _ => Route::NotFound,
    }
}

fn write_http_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
    head_only: bool,
) -> Result<()> {
    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    if !head_only {
        response.extend_from_slice(body);
    }
    stream.write_all(&response)?;
    Ok(())
}

fn handle_connection<C: Compiler>(mut stream: TcpStream, file: &Path, compiler: &C) -> Result<()> {
    // Accepted sockets can inherit the listener's nonblocking mode.
    stream
        .set_nonblocking(false)
        .context("failed configuring connection")?;
    let mut buffer = [0_u8; 16_384];
    let read = stream.read(&mut buffer)?;
    if read == 0 {
        return Ok(());
    }

    let request = String::from_utf8_lossy(&buffer[..read]);
    let Some(first_line) = request.lines().next() else {
        return Ok(());
    };
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let raw_path = parts.next().unwrap_or("/");
    let head_only = method.eq_ignore_ascii_case("HEAD");
    debug!(method, path = raw_path, "preview request");

    if !method.eq_ignore_ascii_case("GET") && !head_only {
        return write_http_response(
            &mut stream,
            "405 Method Not Allowed",
            TEXT,
            b"Method Not Allowed",
            head_only,
        );
    }

    let route = route(raw_path);
    if route == Route::NotFound {
        return write_http_response(&mut stream, "404 Not Found", TEXT, b"Not Found", head_only);
    }

    let source = match read_source(file) {
        Ok(source) => source,
        Err(err) => {
            let body = format!("{err:#}");
            return write_http_response(
                &mut stream,
                "500 Internal Server Error",
                TEXT,
                body.as_bytes(),
                head_only,
            );
        }
    };

    match route {
        Route::Document => {
            let html = rewrite_document(&source, compiler);
            write_http_response(&mut stream, "200 OK", HTML, html.as_bytes(), head_only)
        }
        _ => write_http_response(&mut stream, "200 OK", TEXT, source.as_bytes(), head_only),
    }
}

/// Serves the rewritten document from a background thread. The file is read
/// and rewritten again on every request.
pub(crate) fn start_preview_server<C>(config: &ServeConfig, compiler: C) -> Result<ServerHandle>
where
    C: Compiler + Send + 'static,
{
    if !config.file.is_file() {
        return Err(anyhow!("'{}' is not a file", config.file.display()));
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port)).with_context(|| {
        format!(
            "failed binding preview server on {}:{}",
            config.host, config.port
        )
    })?;
    listener
        .set_nonblocking(true)
        .context("failed setting listener nonblocking mode")?;
    let actual_port = listener
        .local_addr()
        .context("failed reading listener local address")?
        .port();

    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let file = config.file.clone();
    let join_handle = thread::spawn(move || {
        loop {
            if stop_rx.try_recv().is_ok() {
                break;
            }
            match listener.accept() {
                Ok((stream, _)) => {
                    if let Err(err) = handle_connection(stream, &file, &compiler) {
                        eprintln!("error: preview request failed: {err:#}");
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(40));
                }
                Err(err) => {
                    eprintln!("error: preview listener failed: {err}");
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }
    });

    Ok(ServerHandle {
        url: format!("http://{}:{}/", config.host, actual_port),
        stop_tx,
        join_handle: Some(join_handle),
    })
}

pub(crate) fn open_url_in_default_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    let status = Command::new("open").arg(url).status();
    #[cfg(target_os = "linux")]
    let status = Command::new("xdg-open").arg(url).status();
    #[cfg(target_os = "windows")]
    let status = Command::new("cmd").args(["/C", "start", "", url]).status();

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let status: io::Result<std::process::ExitStatus> = Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "unsupported platform for browser launch",
    ));

    let status = status.with_context(|| format!("failed launching browser for {url}"))?;
    if !status.success() {
        return Err(anyhow!("browser command exited with status {status}"));
    }
    Ok(())
}
