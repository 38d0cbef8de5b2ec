use spindle::{Flow, Request, Response, Router, Server};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

static SERVED: AtomicUsize = AtomicUsize::new(0);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let mut router = Router::builder();
    router
        .get("/hello", |_: &Request, resp: &mut Response, _: &[&str]| {
            resp.set_header("Content-Type", "text/plain")
                .set_body("Hello, world!");
        })
        .unwrap()
        .get("/hello/:name", |req: &Request, resp: &mut Response, args: &[&str]| {
            let greeting = req.query_param("greeting").unwrap_or("Hello");

            resp.set_header("Content-Type", "text/plain")
                .set_body(format!("{greeting}, {}!", args[0]));
        })
        .unwrap()
        .post("/echo", |req: &Request, resp: &mut Response, _: &[&str]| {
            resp.set_body(req.body().unwrap_or_default().to_vec());
        })
        .unwrap()
        .after_parsing_request(|req: &Request, resp: &mut Response| {
            match req.header("User-Agent") {
                Some(agent) if agent.contains("BadBot") => {
                    resp.set_status(403).set_body("Go away");
                    Flow::Stop
                }
                _ => Flow::Continue,
            }
        })
        .before_sending_response(|_: Option<&Request>, resp: &mut Response| {
            resp.set_header("Server", "spindle");
        })
        .after_sending_response(|_: Option<&Request>, _: &Response| {
            SERVED.fetch_add(1, Ordering::Relaxed);
        });

    Server::builder()
        .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
        .router(router.build())
        .build()
        .launch()
        .await;
}
