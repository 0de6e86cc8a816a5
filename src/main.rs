use mealtrack::{
    app::{build_app, init_tracing, serve},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("mealtrack=debug,axum=info,tower_http=info");

    let app_state = AppState::init().await?;
    let addr = app_state.config.bind_addr();

    let app = build_app(app_state);
    serve(app, &addr).await
}
