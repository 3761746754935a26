//! Command-line flags. Overrides take precedence over the config file.

use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[clap(version, about = "Prometheus exporter for continuous OWAMP (powstream) measurements")]
pub struct Args {
    /// The configuration file
    #[arg(long, env = "OWAMP_EXPORT_CFG_FILE", default_value = "owamp-export.yaml")]
    pub cfg_file: String,

    /// Listen port for the exporter
    #[arg(long, env = "OWAMP_EXPORT_LISTEN_PORT", default_value_t = 9099)]
    pub listen_port: u16,

    /// Location of the powstream binary to use
    #[arg(long, env = "OWAMP_EXPORT_POWSTREAM_CMD")]
    pub powstream_cmd: Option<String>,

    /// Location to place collected owping reports
    #[arg(long, env = "OWAMP_EXPORT_WORKDIR")]
    pub workdir: Option<String>,

    /// Use the VictoriaMetrics histogram format
    #[arg(long, env = "OWAMP_EXPORT_VICTORIA_HISTOGRAM")]
    pub victoria_histogram: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["owamp-exporter"]).unwrap();
        assert_eq!(args.cfg_file, "owamp-export.yaml");
        assert_eq!(args.listen_port, 9099);
        assert!(args.powstream_cmd.is_none());
        assert!(!args.victoria_histogram);
    }

    #[test]
    fn overrides() {
        let args = Args::try_parse_from([
            "owamp-exporter",
            "--cfg-file",
            "/etc/owamp.yaml",
            "--listen-port",
            "9100",
            "--powstream-cmd",
            "/opt/bin/powstream",
            "--workdir",
            "/var/tmp/ow",
            "--victoria-histogram",
        ])
        .unwrap();
        assert_eq!(args.cfg_file, "/etc/owamp.yaml");
        assert_eq!(args.listen_port, 9100);
        assert_eq!(args.powstream_cmd.as_deref(), Some("/opt/bin/powstream"));
        assert_eq!(args.workdir.as_deref(), Some("/var/tmp/ow"));
        assert!(args.victoria_histogram);
    }
}
