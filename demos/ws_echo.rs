use spindle::{limits::WsLimits, Outbox, Request, Response, Router, Server, WebSocketHandler};
use tokio::net::TcpListener;

#[derive(Default)]
struct Echo {
    count: usize,
}

impl WebSocketHandler for Echo {
    fn setup(&mut self, ws: &mut Outbox) {
        ws.send_text("Connected. Send \"bye\" to leave.");
    }

    fn received_message(&mut self, ws: &mut Outbox, message: Vec<u8>) {
        self.count += 1;

        if message == b"bye" {
            ws.send_text(format!("Bye after {} messages", self.count)).close();
            return;
        }

        ws.send_text(String::from_utf8_lossy(&message));
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let mut router = Router::builder();
    router
        .get_ws("/echo", |_: &Request, _: &mut Response, _: &[&str]| {}, Echo::default)
        .unwrap();

    Server::builder()
        .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
        .router(router.build())
        .ws_limits(WsLimits {
            max_chunk_size: 16 * 1024,
            ..WsLimits::default()
        })
        .build()
        .launch()
        .await;
}
