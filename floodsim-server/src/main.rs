use clap::Parser;
use floodsim_server::ServerState;
use std::net::SocketAddr;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_PORT: u16 = 8000;

#[derive(Parser, Debug)]
#[command(version = "0.1")]
struct FloodsimCli {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = FloodsimCli::parse();

    FmtSubscriber::builder()
        .with_env_filter("floodsim=debug,floodsim_server=debug,tower_http=info,axum::rejection=trace")
        .init();

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    // The default target is this server's own victim endpoints.
    let state = ServerState::new(format!("http://127.0.0.1:{}", args.port));
    state.spawn_background_tasks();

    if let Err(err) = floodsim_server::run(addr, state).await {
        error!("server failed: {err:?}");
        std::process::exit(1);
    }
}
