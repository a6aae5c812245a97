use valbridge::prelude::*;

/// Follows session state changes until the client goes away.
async fn follow<T, C>(bridge: &Bridge<T, C>, mut state: SessionState)
where
    T: valbridge::transport::HttpTransport,
    C: valbridge::transport::StreamConnector,
{
    loop {
        match bridge.await_state_change(&state).await {
            WatchOutcome::Changed(next) => {
                tracing::info!(from = %state, to = %next, "session state changed");
                state = next;
            }
            WatchOutcome::Disconnected => {
                tracing::info!("client disconnected");
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    valbridge::logging::init("info");

    let bridge = Bridge::builder()
        .on_local_failure(|failure| {
            tracing::warn!(path = %failure.path, attempts = failure.attempts, "game client unreachable");
        })
        .build()?;
    bridge.start();

    let state = match bridge.self_presence().await? {
        Some(presence) => {
            tracing::info!(
                state = ?presence.session_state,
                party = ?presence.party_id,
                size = presence.party_size,
                queue = ?presence.queue_id,
                "own presence"
            );
            presence.session_state.unwrap_or(SessionState::Menus)
        }
        None => {
            tracing::info!("no presence yet; assuming menus");
            SessionState::Menus
        }
    };

    tokio::select! {
        _ = follow(&bridge, state) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
        }
    }
    bridge.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use valbridge::transport::mock::{ScriptedConnector, ScriptedTransport};

    #[tokio::test]
    async fn test_follow_returns_when_client_absent() {
        let bridge = BridgeBuilder::new()
            .descriptor_path(std::env::temp_dir().join("presence-watch-absent"))
            .build_with(ScriptedTransport::new(), ScriptedConnector::new())
            .unwrap();

        follow(&bridge, SessionState::Menus).await;
    }
}
