use floodsim_server::ServerState;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

pub const SERVER_PORT: u16 = 8003;

pub fn base_url() -> String {
    format!("http://127.0.0.1:{SERVER_PORT}")
}

#[allow(unused)]
pub async fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    let wait = ONCE_LOCK.get().is_none();

    ONCE_LOCK.get_or_init(|| {
        FmtSubscriber::builder()
            .with_env_filter("floodsim=debug,floodsim_server=debug,axum::rejection=trace")
            .init();

        // The server must outlive any single test's runtime, so it gets a
        // dedicated runtime on its own thread instead of tokio::spawn.
        std::thread::spawn(|| {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], SERVER_PORT));
                let state = ServerState::new(base_url());
                state.spawn_background_tasks();
                floodsim_server::run(addr, state).await.unwrap();
            });
        });
    });

    if wait {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
