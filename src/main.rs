mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use cyberguard::classifier::{self, parse_threshold};
use cyberguard::config::{Config, CONFIG_FILE};
use cyberguard::logger::EventJournal;
use cyberguard::services::stats::{start_event_consumer, start_stats_display};
use cyberguard::{LogMode, MonitorService, SyntheticSource};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> Result<()> {
    // Analyser les arguments de ligne de commande
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    // Charger la configuration pour déterminer le mode de log
    let config = Config::load_from(&config_path).unwrap_or_else(|e| {
        eprintln!(
            "AVERTISSEMENT: configuration {} inutilisable ({:#}), valeurs par défaut utilisées",
            config_path.display(),
            e
        );
        Config::default()
    });

    init_logger(&config);

    match cli.command {
        Command::Monitor { ticks, seed, export } => {
            run_monitor(config, ticks, seed, export).await
        }
        Command::Analyze {
            bytes,
            duration,
            packet_size,
        } => run_analyze(config, &bytes, &duration, &packet_size).await,
        Command::Train => run_train(config).await,
        Command::Threshold { value } => update_threshold(&config_path, &value),
        Command::Status => {
            show_status(&config_path, &config);
            Ok(())
        }
    }
}

/// Initialise le logger approprié
fn init_logger(config: &Config) {
    match config.log_mode {
        LogMode::File => {
            env_logger::init_from_env(env_logger::Env::default().default_filter_or(&config.log_level));
        }
        LogMode::SystemdJournal => {
            // Initialiser le logger systemd-journal uniquement si la feature est activée
            #[cfg(feature = "systemd")]
            {
                use systemd_journal_logger::JournalLog;

                let log_level = match config.log_level.to_lowercase().as_str() {
                    "trace" => log::LevelFilter::Trace,
                    "debug" => log::LevelFilter::Debug,
                    "info" => log::LevelFilter::Info,
                    "warn" => log::LevelFilter::Warn,
                    "error" => log::LevelFilter::Error,
                    _ => log::LevelFilter::Info,
                };

                match JournalLog::new() {
                    Ok(logger) => {
                        if let Err(e) = logger
                            .with_syslog_identifier("cyberguard".to_string())
                            .install()
                        {
                            eprintln!("Erreur lors de l'installation du logger systemd: {}", e);
                            env_logger::init_from_env(
                                env_logger::Env::default().default_filter_or(&config.log_level),
                            );
                        } else {
                            log::set_max_level(log_level);
                            info!("Logger systemd initialisé avec niveau: {}", config.log_level);
                        }
                    }
                    Err(e) => {
                        eprintln!("Erreur lors de l'initialisation du logger systemd: {}", e);
                        env_logger::init_from_env(
                            env_logger::Env::default().default_filter_or(&config.log_level),
                        );
                    }
                }
            }

            // Fallback si la feature systemd n'est pas activée
            #[cfg(not(feature = "systemd"))]
            {
                eprintln!("AVERTISSEMENT: Le mode SystemdJournal n'est pas disponible (feature 'systemd' non activée). Utilisation du logger standard à la place.");
                env_logger::init_from_env(env_logger::Env::default().default_filter_or(&config.log_level));
            }
        }
    }
}

async fn run_monitor(
    config: Config,
    ticks: Option<u64>,
    seed: Option<u64>,
    export: Option<PathBuf>,
) -> Result<()> {
    let mut synthetic = config.synthetic.clone();
    if seed.is_some() {
        synthetic.seed = seed;
    }
    let journal = Arc::new(EventJournal::new_with_mode(
        config.log_file.clone(),
        config.log_mode,
    ));

    let config = Arc::new(RwLock::new(config));
    let service = MonitorService::new(config.clone()).await?;

    let consumer = service
        .take_events()
        .map(|events| start_event_consumer(events, journal));
    let stats = start_stats_display(service.subscribe(), config.clone());

    service.start(Box::new(SyntheticSource::new(synthetic))).await?;
    wait_for_end(&service, ticks).await;
    let snapshot = service.stop().await?;

    println!(
        "Surveillance terminée: {} enregistrements analysés, {} alertes (modèle v{}, exactitude {:.2}%)",
        snapshot.counters.total_traffic,
        snapshot.counters.total_alerts,
        snapshot.model_version,
        snapshot.accuracy
    );

    if let Some(path) = export {
        let count = service.export_alerts(&path)?;
        println!("{} alerte(s) exportée(s) vers {}", count, path.display());
    }

    // Fermer la file d'événements pour laisser le journal se vider
    drop(service);
    stats.abort();
    if let Some(consumer) = consumer {
        if let Err(e) = consumer.await {
            error!("Erreur du consommateur d'événements: {}", e);
        }
    }

    Ok(())
}

/// Attend le nombre de ticks demandé ou Ctrl-C
async fn wait_for_end(service: &MonitorService, ticks: Option<u64>) {
    let mut snapshots = service.subscribe();

    let target = async {
        match ticks {
            Some(limit) => loop {
                if snapshots.borrow_and_update().counters.total_traffic >= limit {
                    break;
                }
                if snapshots.changed().await.is_err() {
                    break;
                }
            },
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = target => {
            info!("Nombre de ticks demandé atteint");
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Interruption reçue, arrêt de la surveillance"),
                Err(e) => error!("Erreur lors de l'attente du signal d'arrêt: {}", e),
            }
        }
    }
}

async fn run_analyze(config: Config, bytes: &str, duration: &str, packet_size: &str) -> Result<()> {
    let journal = EventJournal::new_with_mode(config.log_file.clone(), config.log_mode);
    let service = MonitorService::new(Arc::new(RwLock::new(config))).await?;
    let mut events = service.take_events();

    let result = service.analyze_manual(bytes, duration, packet_size)?;

    if let Some(events) = events.as_mut() {
        while let Ok(event) = events.try_recv() {
            journal.log_event(&event);
        }
    }

    println!(
        "Résultat: {} (probabilité {:.2}, seuil {:.2}, modèle v{})",
        result.label,
        result.probability,
        service.current_model().threshold,
        result.model_version
    );
    Ok(())
}

async fn run_train(config: Config) -> Result<()> {
    let training = config.training.clone();
    let handle = tokio::task::spawn_blocking(move || classifier::train(&training))
        .await
        .context("Tâche d'entraînement interrompue")??;

    println!(
        "Modèle v{} entraîné: {} arbres, exactitude {:.2}%",
        handle.version,
        handle.n_estimators(),
        handle.accuracy
    );
    Ok(())
}

fn update_threshold(config_path: &Path, value: &str) -> Result<()> {
    let threshold = parse_threshold(value)?;

    let mut config = Config::load_from(config_path)?;
    config.alert_threshold = threshold;
    config.save_to(config_path)?;

    info!("Seuil d'alerte mis à jour: {:.2}", threshold);
    println!("Seuil d'alerte fixé à {:.2}", threshold);
    Ok(())
}

fn show_status(config_path: &Path, config: &Config) {
    println!("CyberGuard v{}", config.version);
    println!("Configuration: {}", config_path.display());
    println!("Période de surveillance: {} ms", config.tick_interval_ms);
    println!("Fenêtre glissante: {} enregistrements", config.window_capacity);
    println!("Seuil d'alerte: {:.2}", config.alert_threshold);
    println!(
        "Modèle: {} arbres, {} échantillons, graine {}",
        config.training.n_estimators, config.training.n_samples, config.training.seed
    );
    match config.log_mode {
        LogMode::File => println!("Journal du trafic: {}", config.log_file),
        LogMode::SystemdJournal => println!("Journal du trafic: {}", config.log_mode.as_str()),
    }
    println!(
        "Statistiques en temps réel: {}",
        if config.realtime_stats { "Activées" } else { "Désactivées" }
    );
}
