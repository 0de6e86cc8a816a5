use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{batches, foods, meals};

/// Installs the global subscriber. `RUST_LOG` overrides `default_filter`;
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(default_filter: &str) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(meals::router())
                .merge(batches::router())
                .merge(foods::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::nutrition::normalize_name;
    use crate::store::NewFoodItem;

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    async fn app_with_foods() -> Router {
        let state = AppState::fake();
        for (name, kcal) in [("Chicken Breast", 165.0), ("Rice", 130.0)] {
            state
                .store
                .upsert_food(NewFoodItem {
                    name: name.into(),
                    normalized_name: normalize_name(name),
                    calories_per_100g: kcal,
                    protein_per_100g: None,
                    carbs_per_100g: None,
                    fat_per_100g: None,
                })
                .await
                .unwrap();
        }
        build_app(state)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("ok"));
    }

    #[tokio::test]
    async fn logging_a_day_end_to_end() {
        let app = app_with_foods().await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/meals",
            Some(json!({
                "foodName": "  chicken   BREAST ",
                "weightGrams": 150,
                "category": "lunch",
                "date": "2024-03-10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entry"]["calories"], json!(247.5));
        assert_eq!(body["entry"]["entryType"], json!("food"));
        let entry_id = body["entry"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/meals",
            Some(json!({
                "foodName": "Homemade cookie",
                "weightGrams": "40",
                "category": "snacks",
                "date": "2024-03-10",
                "caloriesOverride": 190
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let (status, body) = call(&app, Method::GET, "/api/meals?date=2024-03-10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entries"].as_array().unwrap().len(), 2);
        assert_eq!(body["totalWeight"], json!(190.0));
        assert_eq!(body["totalCalories"], json!(437.5));
        assert_eq!(body["categories"]["dinner"]["calories"], json!(0.0));

        let (status, body) = call(&app, Method::DELETE, &format!("/api/meals/{entry_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deletedId"], json!(entry_id));

        let (status, _) = call(&app, Method::DELETE, &format!("/api/meals/{entry_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn batch_portion_is_amortized() {
        let app = build_app(AppState::fake());
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/batches",
            Some(json!({
                "name": "Chili",
                "servings": 4,
                "items": [{ "foodName": "Base", "weightGrams": 1000, "caloriesOverride": 1200 }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["batch"]["caloriesPerServing"], json!(300.0));
        let batch_id = body["batch"]["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/meals",
            Some(json!({
                "entryType": "batch",
                "batchCookId": batch_id,
                "weightGrams": 250,
                "category": "dinner",
                "date": "2024-03-11"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entry"]["calories"], json!(300.0));
        assert_eq!(body["entry"]["foodName"], json!("Chili (Batch)"));
        assert_eq!(body["entry"]["batchCookId"], json!(batch_id));

        let (_, body) = call(&app, Method::GET, "/api/batches", None).await;
        assert_eq!(body["batches"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn batch_totals_survive_catalog_resync() {
        let state = AppState::fake();
        let store = state.store.clone();
        crate::sync::sync_foods(
            store.as_ref(),
            r#"{"name": "Kidney Beans", "caloriesPer100g": 50}"#,
        )
        .await
        .unwrap();
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/batches",
            Some(json!({
                "name": "Chili",
                "items": [
                    { "foodName": "kidney beans", "weightGrams": 300 },
                    { "foodName": "Spice mix", "weightGrams": 200, "caloriesOverride": 80 }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["batch"]["totalCalories"], json!(230.0));
        let batch_id = body["batch"]["id"].as_str().unwrap().to_string();

        crate::sync::sync_foods(
            store.as_ref(),
            r#"{"name": "Kidney Beans", "caloriesPer100g": 100}"#,
        )
        .await
        .unwrap();

        let stored = store
            .find_batch(batch_id.parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.total_calories, 230.0);
        assert_eq!(stored.items[0].calories, Some(150.0));

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/meals",
            Some(json!({
                "entryType": "batch",
                "batchCookId": batch_id,
                "weightGrams": 250,
                "category": "dinner",
                "date": "2024-03-11"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entry"]["calories"], json!(115.0));
    }

    #[tokio::test]
    async fn history_and_week_views() {
        let app = app_with_foods().await;
        for date in ["2024-03-10", "2024-03-12"] {
            let (status, _) = call(
                &app,
                Method::POST,
                "/api/meals",
                Some(json!({ "foodName": "Rice", "weightGrams": 100, "category": "dinner", "date": date })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = call(
            &app,
            Method::GET,
            "/api/meals/history?start=2024-03-10&end=2024-03-12",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let days = body["days"].as_array().unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[1]["date"], json!("2024-03-11"));
        assert_eq!(days[1]["totalCalories"], json!(0.0));
        assert_eq!(body["totalCalories"], json!(260.0));

        // 2024-03-13 is a Wednesday; its week runs Sunday 10th to Saturday 16th.
        let (status, body) = call(&app, Method::GET, "/api/meals/history/week?date=2024-03-13", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["start"], json!("2024-03-10"));
        assert_eq!(body["end"], json!("2024-03-16"));
        assert_eq!(body["days"].as_array().unwrap().len(), 7);
        assert_eq!(body["totalWeight"], json!(200.0));

        let (_, body) = call(&app, Method::GET, "/api/meals/history/week?date=2024-03-13&offset=1", None).await;
        assert_eq!(body["start"], json!("2024-03-03"));
        assert_eq!(body["totalCalories"], json!(0.0));
    }

    #[tokio::test]
    async fn bad_requests_get_json_errors() {
        let app = app_with_foods().await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/meals",
            Some(json!({ "foodName": "Rice", "weightGrams": -5, "category": "lunch", "date": "2024-03-10" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        for uri in [
            "/api/meals?date=2024-02-30",
            "/api/meals?date=9999-12-31",
            "/api/meals/history/week?date=9999-12-30",
            "/api/meals/history?start=2020-01-01&end=2024-01-01",
        ] {
            let (status, body) = call(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }

        let (status, _) = call(
            &app,
            Method::GET,
            "/api/meals/history?start=2024-03-12&end=2024-03-10",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/meals",
            Some(json!({
                "entryType": "batch",
                "batchCookId": "not-a-uuid",
                "weightGrams": 10,
                "category": "lunch",
                "date": "2024-03-10"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("batch cook not found"));
    }

    #[tokio::test]
    async fn unknown_food_is_logged_without_calories() {
        let app = app_with_foods().await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/meals",
            Some(json!({ "foodName": "Unobtainium", "weightGrams": 10, "category": "lunch", "date": "2024-03-10" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["entry"]["calories"], Value::Null);
        assert_eq!(body["entry"]["foodItemId"], Value::Null);

        let (_, body) = call(&app, Method::GET, "/api/meals?date=2024-03-10", None).await;
        assert_eq!(body["totalWeight"], json!(10.0));
        assert_eq!(body["totalCalories"], json!(0.0));
    }

    #[tokio::test]
    async fn food_search_is_case_insensitive() {
        let app = app_with_foods().await;
        let (status, body) = call(&app, Method::GET, "/api/foods?q=CHICK&limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        let foods = body["foods"].as_array().unwrap();
        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0]["name"], json!("Chicken Breast"));
        assert!(foods[0].get("normalizedName").is_none());
    }
}
