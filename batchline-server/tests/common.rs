use axum_test::TestServer;
use batchline_config::Config;
use batchline_core::SchedulerConfig;
use batchline_server::{AppState, create_app};
use tokio_util::sync::CancellationToken;

// Code is used by test modules, but not in this scope
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub shutdown: CancellationToken,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// 1s simulated latency and 5s rate limit, the production defaults.
#[allow(unused)]
pub fn default_scheduler() -> SchedulerConfig {
    SchedulerConfig::default()
}

/// Build the app; the drain loop runs only when `start_drain` is set.
#[allow(unused)]
pub fn build_test_app(scheduler: SchedulerConfig, start_drain: bool) -> TestApp {
    let config = Config {
        scheduler,
        ..Config::default()
    };
    let state = AppState::from_config(config);
    let shutdown = CancellationToken::new();
    if start_drain {
        state
            .service()
            .start(shutdown.clone())
            .expect("drain loop starts once");
    }

    let server = TestServer::new(create_app(state.clone())).expect("test server");
    TestApp {
        server,
        state,
        shutdown,
    }
}
