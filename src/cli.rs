use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cyberguard")]
#[command(author, version, about = "Surveillance du trafic réseau par forêt aléatoire")]
pub struct Cli {
    /// Chemin du fichier de configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lance la surveillance sur le trafic synthétique
    Monitor {
        /// Arrêter après N ticks (sinon jusqu'à Ctrl-C)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Graine du générateur de trafic
        #[arg(short, long)]
        seed: Option<u64>,

        /// Exporter les alertes dans ce fichier à l'arrêt
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Classe un enregistrement saisi à la main
    Analyze {
        /// Volume en octets
        #[arg(long, allow_hyphen_values = true)]
        bytes: String,

        /// Durée en secondes
        #[arg(long, allow_hyphen_values = true)]
        duration: String,

        /// Taille moyenne des paquets
        #[arg(long, allow_hyphen_values = true)]
        packet_size: String,
    },

    /// Entraîne le modèle et affiche son exactitude
    Train,

    /// Modifie le seuil d'alerte (0.0 - 1.0) dans la configuration
    Threshold {
        value: String,
    },

    /// Affiche la configuration courante
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_monitor() {
        let cli = Cli::try_parse_from([
            "cyberguard", "--config", "/tmp/c.json", "monitor", "--ticks", "5", "--seed", "9",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        match cli.command {
            Command::Monitor { ticks, seed, export } => {
                assert_eq!(ticks, Some(5));
                assert_eq!(seed, Some(9));
                assert!(export.is_none());
            }
            other => panic!("commande inattendue: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_keeps_raw_text() {
        let cli = Cli::try_parse_from([
            "cyberguard", "analyze", "--bytes", "abc", "--duration", "12", "--packet-size", "500",
        ])
        .unwrap();

        match cli.command {
            Command::Analyze { bytes, duration, packet_size } => {
                assert_eq!(bytes, "abc");
                assert_eq!(duration, "12");
                assert_eq!(packet_size, "500");
            }
            other => panic!("commande inattendue: {:?}", other),
        }
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["cyberguard"]).is_err());
    }
}
