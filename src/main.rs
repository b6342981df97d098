mod handlers;
mod models;
mod scoring;
mod store;

use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use log::{error, info};

use models::Catalog;
use store::Store;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let data_dir = env::var("POLLA_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let catalog = Catalog::from_env();
    info!("catalog: {} outcomes", catalog.len());

    let store = match Store::new(&data_dir, catalog) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to initialize store in {}: {}", data_dir, e);
            return;
        }
    };

    let make_svc = make_service_fn(move |_conn| {
        let store = Arc::clone(&store);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let store = Arc::clone(&store);
                handlers::route(store, req)
            }))
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = Server::bind(&addr).serve(make_svc);
    info!("Prediction pool server listening on {}", addr);

    let graceful = server.with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    });
    if let Err(e) = graceful.await {
        error!("Server error: {}", e);
    }
}
