//! Shared fixtures for integration tests.

#![allow(dead_code)]

use axum::Router;
use std::net::SocketAddr;

/// Serve `router` on an ephemeral local port, returning the GraphQL endpoint URL
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/graphql", addr)
}

/// A local address with nothing listening on it
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/graphql", addr)
}
