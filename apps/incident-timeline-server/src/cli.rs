use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "incident-timeline-server",
    version,
    about = "Event incident timeline comparison server"
)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, default_value_t = false)]
    pub print_openapi: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_to_loopback() {
        let args = Args::parse_from(["incident-timeline-server"]);
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert!(!args.print_openapi);
    }
}
