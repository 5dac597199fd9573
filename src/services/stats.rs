use crate::config::Config;
use crate::logger::EventJournal;
use crate::models::{DashboardSnapshot, MonitorEvent};
use chrono::{DateTime, Local};
use log::{debug, info};
use num_format::{Locale, ToFormattedString};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;

const BOX_WIDTH: usize = 53;
const RECENT_ROWS: usize = 5;

fn line(text: String) -> String {
    format!("│ {:<width$} │\n", text, width = BOX_WIDTH - 2)
}

/// Rendu terminal d'un instantané
///
/// `rate` est le débit observé en enregistrements par seconde.
pub fn render_dashboard(snapshot: &DashboardSnapshot, rate: f64) -> String {
    let border = "─".repeat(BOX_WIDTH);
    let updated: DateTime<Local> = snapshot.last_update.into();
    let counters = &snapshot.counters;

    let alert_ratio = if counters.total_traffic > 0 {
        counters.total_alerts as f64 * 100.0 / counters.total_traffic as f64
    } else {
        0.0
    };

    let mut out = String::new();
    out.push_str(&format!("┌{}┐\n", border));
    out.push_str(&line("CyberGuard - Statistiques en temps réel".to_string()));
    out.push_str(&format!("├{}┤\n", border));
    out.push_str(&line(format!(
        "État: {}",
        if snapshot.running { "surveillance active" } else { "arrêté" }
    )));
    out.push_str(&line(format!(
        "Trafic analysé: {} ({:.1}/s)",
        counters.total_traffic.to_formatted_string(&Locale::fr),
        rate
    )));
    out.push_str(&line(format!(
        "Alertes: {} ({:.1}%)",
        counters.total_alerts.to_formatted_string(&Locale::fr),
        alert_ratio
    )));
    out.push_str(&line(format!(
        "Modèle: v{} - exactitude {:.2}%",
        snapshot.model_version, snapshot.accuracy
    )));
    out.push_str(&line(format!("Seuil d'alerte: {:.2}", snapshot.threshold)));
    out.push_str(&line(format!(
        "Mise à jour: {}",
        updated.format("%Y-%m-%d %H:%M:%S")
    )));
    out.push_str(&format!("└{}┘\n", border));

    if !snapshot.window.is_empty() {
        out.push_str(&format!(
            "\n{} derniers enregistrements (fenêtre de {}):\n",
            snapshot.window.len().min(RECENT_ROWS),
            snapshot.window.len()
        ));
        out.push_str("┌──────────┬────────────┬──────────┬─────────────┐\n");
        out.push_str("│ Heure    │ Octets     │ Durée    │ Taille paq. │\n");
        out.push_str("├──────────┼────────────┼──────────┼─────────────┤\n");
        for record in snapshot.window.iter().rev().take(RECENT_ROWS) {
            let at: DateTime<Local> = record.timestamp.into();
            out.push_str(&format!(
                "│ {:8} │ {:>10} │ {:>8.3} │ {:>11} │\n",
                at.format("%H:%M:%S"),
                record.bytes,
                record.duration,
                record.packet_size
            ));
        }
        out.push_str("└──────────┴────────────┴──────────┴─────────────┘\n");
    }

    if let Some([bytes, duration, packet_size]) = snapshot.series.means() {
        out.push_str(&format!(
            "Moyennes de la fenêtre: {:.1} octets, {:.3} s, {:.1} octets/paquet\n",
            bytes, duration, packet_size
        ));
    }

    out
}

/// Affiche le tableau de bord à chaque nouvel instantané, selon la configuration
pub fn start_stats_display(
    mut snapshots: watch::Receiver<DashboardSnapshot>,
    config: Arc<RwLock<Config>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut prev_total = 0;
        let mut prev_time = Instant::now();

        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();

            let (realtime_stats, display) = {
                let config = config.read().await;
                (config.realtime_stats, config.display_realtime_stats)
            };
            if !realtime_stats {
                continue;
            }

            let now = Instant::now();
            let elapsed = now.duration_since(prev_time).as_secs_f64();
            let total = snapshot.counters.total_traffic;
            // Les compteurs repartent de zéro au redémarrage d'une session
            let delta = total.saturating_sub(prev_total);
            let rate = if elapsed > 0.0 { delta as f64 / elapsed } else { 0.0 };

            if display {
                // Effacer l'écran et revenir en haut à gauche
                print!("\x1B[2J\x1B[1;1H");
                print!("{}", render_dashboard(&snapshot, rate));
                let _ = std::io::stdout().flush();
            } else {
                info!(
                    "Trafic: {} enregistrements, {} alertes ({:.1}/s)",
                    total, snapshot.counters.total_alerts, rate
                );
            }

            prev_total = total;
            prev_time = now;
        }
        debug!("Fin de l'affichage des statistiques");
    })
}

/// Consommateur d'événements: écrit chaque événement dans le journal du trafic
pub fn start_event_consumer(
    mut events: mpsc::Receiver<MonitorEvent>,
    journal: Arc<EventJournal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            journal.log_event(&event);
        }
        debug!("File d'événements fermée");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Counters, TrafficRecord};
    use crate::window::TrafficSeries;

    fn snapshot() -> DashboardSnapshot {
        let window: Vec<TrafficRecord> = (0..8)
            .map(|i| TrafficRecord::new(100.0 + i as f64, 0.5, 60.0))
            .collect();
        DashboardSnapshot {
            counters: Counters {
                total_traffic: 120,
                total_alerts: 30,
            },
            series: TrafficSeries::from_records(&window),
            window,
            model_version: 2,
            accuracy: 91.5,
            threshold: 0.7,
            running: true,
            ..DashboardSnapshot::default()
        }
    }

    #[test]
    fn test_render_dashboard_contents() {
        let out = render_dashboard(&snapshot(), 2.0);

        assert!(out.contains("Trafic analysé: 120 (2.0/s)"));
        assert!(out.contains("Alertes: 30 (25.0%)"));
        assert!(out.contains("v2"));
        assert!(out.contains("Seuil d'alerte: 0.70"));
        assert!(out.contains("5 derniers enregistrements (fenêtre de 8)"));
    }

    #[test]
    fn test_render_lists_most_recent_first() {
        let out = render_dashboard(&snapshot(), 0.0);
        let newest = out.find("107").unwrap();
        let older = out.find("103").unwrap();
        assert!(newest < older);
        assert!(!out.contains(" 102 "));
    }

    #[test]
    fn test_render_empty_snapshot() {
        let out = render_dashboard(&DashboardSnapshot::default(), 0.0);
        assert!(out.contains("arrêté"));
        assert!(!out.contains("derniers enregistrements"));
        assert!(!out.contains("Moyennes"));
    }

    #[test]
    fn test_render_window_means() {
        let out = render_dashboard(&snapshot(), 0.0);
        assert!(out.contains("Moyennes de la fenêtre: 103.5 octets, 0.500 s, 60.0 octets/paquet"));
    }
}
