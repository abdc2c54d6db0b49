//! HTTP/1 server wiring the demo routes through the session middleware

use crate::app;
use anyhow::{Context, Result};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use sessionstone_core::config::{SessionStoneConfig, StoreConfig};
use sessionstone_core::session::{
    generate_id, JanitorConfig, MemoryStore, SessionConfig, SessionMiddleware, SqlStore, Store,
    StoreJanitor,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Open the store selected by configuration
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    match config.kind.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sqlite" => {
            let store =
                SqlStore::open_with_pool_size(&config.sqlite_path, &config.table, config.pool_size)
                    .with_context(|| {
                        format!("Failed to open session database {}", config.sqlite_path)
                    })?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("Unknown store kind '{}'", other),
    }
}

/// Build the middleware from resolved configuration
pub fn build_middleware(config: &SessionStoneConfig, store: Arc<dyn Store>) -> Result<SessionMiddleware> {
    let mut session_config = SessionConfig::from_settings(&config.sessions)?;

    if session_config.secret.is_empty() && !session_config.disable_hash_id {
        log::warn!("No session secret configured; sessions will not survive a restart");
        session_config = session_config.with_secret(generate_id(32));
    }

    Ok(SessionMiddleware::new(session_config.with_shared_store(store))?)
}

/// Serve the demo application until the process is stopped
pub async fn serve(addr: SocketAddr, config: &SessionStoneConfig) -> Result<()> {
    let store = open_store(&config.store)?;
    let _janitor = StoreJanitor::with_config(
        Arc::clone(&store),
        JanitorConfig::new().with_interval(Duration::from_secs(config.store.gc_interval)),
    );
    let sessions = Arc::new(build_middleware(config, store)?);

    let listener =
        TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("SessionStone demo listening on http://{} ({} store)", addr, config.store.kind);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let sessions = Arc::clone(&sessions);

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(
                    io,
                    service_fn(move |req| {
                        let sessions = Arc::clone(&sessions);
                        async move { Ok::<_, Infallible>(sessions.handle(req, app::route).await) }
                    }),
                )
                .await
            {
                log::debug!("Error serving connection: {:?}", err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_kinds() {
        assert!(open_store(&StoreConfig::default()).is_ok());

        let dir = tempfile::tempdir().unwrap();
        let sqlite = StoreConfig {
            kind: "sqlite".into(),
            sqlite_path: dir.path().join("s.db").display().to_string(),
            ..Default::default()
        };
        assert!(open_store(&sqlite).is_ok());

        let unknown = StoreConfig { kind: "redis".into(), ..Default::default() };
        assert!(open_store(&unknown).is_err());
    }

    #[test]
    fn test_build_middleware_generates_missing_secret() {
        let config = SessionStoneConfig::default();
        let store = open_store(&config.store).unwrap();
        let mw = build_middleware(&config, store).unwrap();
        assert!(!mw.config().secret.is_empty());
    }
}
