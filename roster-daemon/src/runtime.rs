use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use roster_core::{Config, DirStore, NodeName, RegistryStore};

use crate::error::{io_err, DaemonError};
use crate::paths::{roster_root, socket_path};
use crate::protocol::{
    DaemonRequest, DaemonResponse, StatusPayload, TargetsPayload, CMD_STATUS, CMD_STOP,
    CMD_TARGETS,
};
use crate::reconciler::{Reconciler, ReconcilerConfig, TargetManager};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: Config, home: &Path, json_logs: bool) -> Result<(), DaemonError> {
    init_tracing(json_logs);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, home.to_path_buf()))
}

/// Run a reconciler over the configured directory store.
pub async fn run(config: Config, home: PathBuf) -> Result<(), DaemonError> {
    tracing::info!(
        name = %config.name,
        store = %config.store_dir.display(),
        refresh_interval_secs = config.refresh_interval.as_secs(),
        registration_interval_secs = config.registration_interval.as_secs(),
        unhealthy_threshold_secs = config.unhealthy_threshold.as_secs(),
        "starting roster daemon",
    );
    let store: Arc<dyn RegistryStore> = Arc::new(DirStore::new(&config.store_dir));
    let reconciler = Arc::new(Reconciler::new(store, ReconcilerConfig::from(&config)));
    serve(reconciler, home).await
}

/// Host `reconciler` together with the status socket and a ctrl-c handler.
///
/// Returns once the reconcile loop has ended and the socket is removed.
pub async fn serve(reconciler: Arc<Reconciler>, home: PathBuf) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let name = reconciler.config().name.clone();
    let started_at_unix = unix_seconds_now();
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let reconciler_handle = {
        let shutdown = shutdown_tx.clone();
        let cancel = shutdown_tx.subscribe();
        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            let result = reconciler.run(cancel).await.map_err(DaemonError::from);
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let manager: Arc<dyn TargetManager> = reconciler.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result =
                socket_server_task(home, manager, name, shutdown_rx, started_at_unix).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => {
                            let _ = shutdown.send(());
                            Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}")))
                        }
                    }
                }
            }
        })
    };

    let (reconciler_result, socket_result, signal_result) =
        tokio::join!(reconciler_handle, socket_handle, signal_handle);

    handle_join("reconciler", reconciler_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn socket_server_task(
    home: PathBuf,
    manager: Arc<dyn TargetManager>,
    name: NodeName,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::debug!(socket = %socket.display(), "status socket listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let manager = manager.clone();
                let name = name.clone();
                let home = home.clone();
                tokio::spawn(async move {
                    if let Err(err) =
                        handle_socket_client(stream, manager, name, home, started_at_unix).await
                    {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    manager: Arc<dyn TargetManager>,
    name: NodeName,
    home: PathBuf,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let response =
            handle_command(&request.cmd, manager.as_ref(), &name, &home, started_at_unix).await;
        write_response(&mut writer, &response).await?;
        if request.cmd == CMD_STOP {
            break;
        }
    }

    Ok(())
}

async fn handle_command(
    cmd: &str,
    manager: &dyn TargetManager,
    name: &NodeName,
    home: &Path,
    started_at_unix: u64,
) -> DaemonResponse {
    match cmd {
        CMD_STATUS => {
            let payload = StatusPayload {
                running: true,
                name: name.to_string(),
                registered: manager.is_registered().await,
                peers: manager.get_targets().await.len(),
                started_at_unix,
                socket: socket_path(home).display().to_string(),
            };
            to_response(&payload)
        }
        CMD_TARGETS => to_response(&TargetsPayload {
            targets: manager.get_targets().await,
        }),
        CMD_STOP => match manager.shutdown().await {
            Ok(()) => DaemonResponse::ok(json!({ "stopping": true })),
            Err(err) => DaemonResponse::error(err.to_string()),
        },
        other => DaemonResponse::error(format!("unknown command '{other}'")),
    }
}

fn to_response<T: serde::Serialize>(payload: &T) -> DaemonResponse {
    match serde_json::to_value(payload) {
        Ok(value) => DaemonResponse::ok(value),
        Err(err) => DaemonResponse::error(format!("failed to encode response: {err}")),
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = roster_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing(json_logs: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
