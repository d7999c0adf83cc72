use axum::Router;
use std::net::{SocketAddr, TcpListener};

/// Serve `router` on an ephemeral local port for the lifetime of the test runtime.
pub fn spawn_stub(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(router.into_make_service());
    tokio::spawn(server);
    addr
}
