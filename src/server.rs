/// HTTP server: the single-page UI, a JSON API and the WebSocket endpoint
use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;
use serde::Deserialize;

use crate::config::DashConfig;
use crate::dashboard::{AnalysisKind, Dashboard};
use crate::error::DashError;
use crate::websocket::DashboardSocket;

const INDEX_HTML: &str = include_str!("../static/index.html");

fn status_for(err: &DashError) -> StatusCode {
    match err {
        DashError::UnknownAnalysis(_) | DashError::UnknownProduct(_) => StatusCode::NOT_FOUND,
        DashError::MissingColumns { .. } | DashError::ColumnNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DashError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DashError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &DashError) -> HttpResponse {
    HttpResponse::build(status_for(err)).json(serde_json::json!({
        "error": err.kind(),
        "message": err.to_string(),
    }))
}

fn json_or_error<T: serde::Serialize>(result: crate::error::Result<T>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => error_response(&e),
    }
}

/// WebSocket endpoint handler
async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    dashboard: web::Data<Dashboard>,
) -> Result<HttpResponse, Error> {
    ws::start(DashboardSocket::new(dashboard), &req, stream)
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "EasyDash server is running"
    }))
}

async fn status(dashboard: web::Data<Dashboard>) -> HttpResponse {
    HttpResponse::Ok().json(dashboard.status())
}

async fn segments(dashboard: web::Data<Dashboard>) -> HttpResponse {
    json_or_error(dashboard.segments())
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    /// Comma-separated segment names; absent or empty means all segments.
    segments: Option<String>,
}

fn split_segments(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn dashboard_view(dashboard: web::Data<Dashboard>, query: web::Query<DashboardQuery>) -> HttpResponse {
    let selected = split_segments(query.segments.as_deref());
    json_or_error(dashboard.render(&selected))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search(dashboard: web::Data<Dashboard>, query: web::Query<SearchQuery>) -> HttpResponse {
    json_or_error(dashboard.search(&query.q))
}

async fn product(dashboard: web::Data<Dashboard>, name: web::Path<String>) -> HttpResponse {
    json_or_error(dashboard.product_detail(&name))
}

async fn purchase_analysis(dashboard: web::Data<Dashboard>, analysis: web::Path<String>) -> HttpResponse {
    json_or_error(
        analysis
            .parse::<AnalysisKind>()
            .and_then(|kind| dashboard.purchase_analysis(kind)),
    )
}

/// Register every route; shared by `run_server` and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health_check))
        .route("/ws", web::get().to(ws_index))
        .service(
            web::scope("/api")
                .route("/status", web::get().to(status))
                .route("/segments", web::get().to(segments))
                .route("/dashboard", web::get().to(dashboard_view))
                .route("/search", web::get().to(search))
                .route("/products/{name}", web::get().to(product))
                .route("/purchases/{analysis}", web::get().to(purchase_analysis)),
        );
}

/// Load the datasets and serve until shutdown
pub async fn run_server(config: DashConfig) -> std::io::Result<()> {
    let dashboard = web::Data::new(Dashboard::load(&config));

    log::info!("EasyDash listening on http://{}:{}", config.host, config.port);
    log::info!("websocket endpoint ws://{}:{}/ws", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .app_data(dashboard.clone())
            .wrap(middleware::Logger::default())
            // CORS for development
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{read_orders_csv, read_purchases_csv, LoadOptions};
    use actix_web::test;
    use std::sync::Arc;

    const ORDERS_CSV: &str = "\
Order ID,Order Date,Customer Name,Segment,Region,State,Category,Product Name,Sales,Quantity,Discount,Profit
O-1,11/8/2016,Ann,Consumer,South,Kentucky,Furniture,Office Chair,\"731,94\",3,0,\"219,582\"
O-1,11/8/2016,Ann,Consumer,South,Kentucky,Furniture,Lamp,\"61,5\",1,0,\"9,1\"
O-2,6/12/2016,Bob,Corporate,West,California,Office Supplies,Labels,\"14,62\",2,0.2,\"6,8714\"
O-3,6/13/2016,Bob,Corporate,West,California,Furniture,Office Chair,\"700,00\",1,0.2,\"50,0\"
";

    const PURCHASES_CSV: &str = "\
product_name,actual_price,discount_percentage,user_id
P1,₹600,4%,U1
P2,₹600,7%,U1
";

    fn dashboard() -> web::Data<Dashboard> {
        let orders = read_orders_csv(ORDERS_CSV.as_bytes(), LoadOptions::default()).map(Arc::new);
        let purchases = read_purchases_csv(PURCHASES_CSV.as_bytes(), LoadOptions::default()).map(Arc::new);
        web::Data::new(Dashboard::new(orders, purchases, 50))
    }

    #[actix_web::test]
    async fn test_health_and_index() {
        let app = test::init_service(App::new().app_data(dashboard()).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("EasyDash"));
    }

    #[actix_web::test]
    async fn test_dashboard_endpoint_filters_segments() {
        let app = test::init_service(App::new().app_data(dashboard()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/dashboard").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"], 4);
        assert_eq!(body["grid"].as_array().unwrap().len(), 3);

        let req = test::TestRequest::get()
            .uri("/api/dashboard?segments=Corporate")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"], 2);
        assert_eq!(body["segments"][0], "Corporate");
    }

    #[actix_web::test]
    async fn test_search_and_product_detail() {
        let app = test::init_service(App::new().app_data(dashboard()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/search?q=chair").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "matches");
        assert_eq!(body["products"][0], "Office Chair");

        let req = test::TestRequest::get().uri("/api/search?q=sofa").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "no_match");

        let req = test::TestRequest::get().uri("/api/products/Office%20Chair").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["buyers"].as_array().unwrap().len(), 2);
        let recs = body["recommendations"].as_array().unwrap();
        assert!(recs.iter().all(|r| r["product"] != "Office Chair"));
    }

    #[actix_web::test]
    async fn test_error_status_codes() {
        let app = test::init_service(App::new().app_data(dashboard()).configure(configure)).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/purchases/sideways").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/products/Sofa").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/purchases/distribution").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["analysis"], "distribution");
        assert_eq!(body["data"][0]["purchases"], 2);
    }

    #[actix_web::test]
    async fn test_unavailable_dataset_is_503() {
        let dash = Dashboard::new(
            Err(DashError::Config("missing workbook".to_string())),
            Err(DashError::Config("missing csv".to_string())),
            50,
        );
        let app = test::init_service(App::new().app_data(web::Data::new(dash)).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/segments").to_request()).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["orders"]["available"], false);
    }

    #[actix_web::test]
    async fn test_split_segments() {
        assert!(split_segments(None).is_empty());
        assert!(split_segments(Some("")).is_empty());
        assert_eq!(
            split_segments(Some("Consumer, Home Office,")),
            vec!["Consumer", "Home Office"]
        );
    }
}
