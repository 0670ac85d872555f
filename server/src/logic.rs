use defectlog_shared::{
    ClickResult, ClientMessage, DefectRecord, DiagramLayout, ServerMessage, SessionContext,
};
use log::{error, info, warn};

use crate::config::StationConfig;
use crate::storage::DefectStore;

pub fn welcome_message(config: &StationConfig, total: u64) -> ServerMessage {
    ServerMessage::Welcome {
        layout: config.layout.clone(),
        part_numbers: config.part_numbers.clone(),
        defaults: SessionContext::today(),
        total,
    }
}

/// Checks that a result could have come from this station's diagram.
fn check_click(click: &ClickResult, layout: &DiagramLayout) -> Result<(), String> {
    if !layout.sectors.iter().any(|sector| sector.clock == click.segment) {
        return Err(format!("Unknown clock position {}", click.segment));
    }
    if !layout.rings.iter().any(|ring| ring.label == click.ring) {
        return Err(format!("Unknown ring '{}'", click.ring));
    }
    if !layout.defect_types.contains(&click.defect) {
        return Err(format!("Unknown defect type '{}'", click.defect));
    }
    if !layout.options.contains(&click.option) {
        return Err(format!("Unknown location '{}'", click.option));
    }
    if click.cavity.trim().is_empty() {
        return Err("Cavity is required".to_string());
    }
    if click.angle >= 360 {
        return Err(format!("Angle {} is out of range", click.angle));
    }
    Ok(())
}

pub async fn apply_client_message(
    store: &dyn DefectStore,
    config: &StationConfig,
    message: ClientMessage,
) -> ServerMessage {
    match message {
        ClientMessage::LogDefect { session, click } => {
            if let Err(reason) = check_click(&click, &config.layout) {
                warn!("Rejected defect: {reason}");
                return ServerMessage::Rejected { reason };
            }
            let record = match DefectRecord::from_click(&click, &session) {
                Ok(record) => record,
                Err(err) => {
                    warn!("Rejected defect: {err}");
                    return ServerMessage::Rejected {
                        reason: err.to_string(),
                    };
                }
            };
            let id = match store.append(&record).await {
                Ok(id) => id,
                Err(err) => {
                    error!("Failed to log defect: {err:#}");
                    return ServerMessage::Failed {
                        message: format!("Failed to log defect: {err}"),
                    };
                }
            };
            info!(
                "Logged defect id={id} product={} batch={} {}",
                record.product,
                record.batch_number,
                click.summary()
            );
            let total = match store.count().await {
                Ok(total) => total,
                Err(err) => {
                    error!("Failed to count defects after insert: {err:#}");
                    0
                }
            };
            ServerMessage::Logged { id, total }
        }
        ClientMessage::CountRequest => match store.count().await {
            Ok(total) => ServerMessage::Count { total },
            Err(err) => {
                error!("Failed to count defects: {err:#}");
                ServerMessage::Failed {
                    message: format!("Failed to count defects: {err}"),
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, ListOrder};
    use crate::storage::tests::BrokenStore;
    use crate::storage::SqliteStore;

    fn session() -> SessionContext {
        SessionContext {
            inspection_date: "2026-10-14".into(),
            part_number: "19.N222.03".into(),
            batch_number: "B-0042".into(),
            date_code: "D41".into(),
            notes: "second shift".into(),
        }
    }

    fn click() -> ClickResult {
        ClickResult {
            defect: "Pinholes".into(),
            segment: 6,
            distance: 188,
            timestamp: "2026-10-14T08:30:00.000Z".into(),
            cavity: "3".into(),
            ring: "Outer".into(),
            angle: 172,
            option: "Outboard".into(),
        }
    }

    fn log(session: SessionContext, click: ClickResult) -> ClientMessage {
        ClientMessage::LogDefect { session, click }
    }

    #[tokio::test]
    async fn accepted_click_is_stored_and_counted() {
        let store = SqliteStore::new(Database::open_in_memory().unwrap());
        let config = StationConfig::default();
        let reply = apply_client_message(&store, &config, log(session(), click())).await;
        let ServerMessage::Logged { id, total } = reply else {
            panic!("expected Logged, got {reply:?}");
        };
        assert_eq!(total, 1);
        let rows = store.list(ListOrder::Insertion).await.unwrap();
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].record.casting_clock, 6);
        assert_eq!(rows[0].record.core_clock, "Outer");
        assert_eq!(rows[0].record.location, "Outboard");
        assert_eq!(rows[0].record.notes, "second shift");
    }

    #[tokio::test]
    async fn missing_batch_number_is_rejected_without_insert() {
        let store = SqliteStore::new(Database::open_in_memory().unwrap());
        let config = StationConfig::default();
        let mut session = session();
        session.batch_number = " ".into();
        let reply = apply_client_message(&store, &config, log(session, click())).await;
        assert!(matches!(
            reply,
            ServerMessage::Rejected { ref reason } if reason == "Batch Number is required to log defects"
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clicks_outside_the_vocabulary_are_rejected() {
        let store = SqliteStore::new(Database::open_in_memory().unwrap());
        let config = StationConfig::default();
        let mut bad = click();
        bad.defect = "Rust".into();
        let reply = apply_client_message(&store, &config, log(session(), bad)).await;
        assert!(matches!(reply, ServerMessage::Rejected { .. }));

        let mut bad = click();
        bad.segment = 13;
        let reply = apply_client_message(&store, &config, log(session(), bad)).await;
        assert!(matches!(reply, ServerMessage::Rejected { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn storage_failure_is_reported() {
        let config = StationConfig::default();
        let reply = apply_client_message(&BrokenStore, &config, log(session(), click())).await;
        assert!(matches!(
            reply,
            ServerMessage::Failed { ref message } if message.starts_with("Failed to log defect")
        ));
        let reply = apply_client_message(&BrokenStore, &config, ClientMessage::CountRequest).await;
        assert!(matches!(reply, ServerMessage::Failed { .. }));
    }

    #[tokio::test]
    async fn count_request_reports_total() {
        let store = SqliteStore::new(Database::open_in_memory().unwrap());
        let config = StationConfig::default();
        apply_client_message(&store, &config, log(session(), click())).await;
        apply_client_message(&store, &config, log(session(), click())).await;
        let reply = apply_client_message(&store, &config, ClientMessage::CountRequest).await;
        assert!(matches!(reply, ServerMessage::Count { total: 2 }));
    }

    #[test]
    fn welcome_carries_station_configuration() {
        let config = StationConfig::default();
        let ServerMessage::Welcome {
            layout,
            part_numbers,
            defaults,
            total,
        } = welcome_message(&config, 7)
        else {
            panic!("expected Welcome");
        };
        assert_eq!(layout, config.layout);
        assert_eq!(part_numbers.len(), 66);
        assert!(defaults.batch_number.is_empty());
        assert!(!defaults.inspection_date.is_empty());
        assert_eq!(total, 7);
    }
}
