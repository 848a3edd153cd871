//! The routes served by the `rawhttp` binary.

use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;
use crate::proxy::upstream::{self, ProxyHandler};
use crate::server::handler::{Handler, HandlerError};

const YOUR_PROBLEM: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const MY_PROBLEM: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

const SUCCESS: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

/// Dispatches on the request target.
///
/// - `/httpbin/...` is forwarded upstream
/// - `/yourproblem` answers 400
/// - `/myproblem` answers 500
/// - everything else answers 200
pub struct Router {
    proxy: ProxyHandler,
}

impl Router {
    pub fn new(proxy: ProxyHandler) -> Self {
        Self { proxy }
    }
}

impl Handler for Router {
    async fn handle<W>(&self, req: &Request, w: &mut ResponseWriter<W>) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        if req.target().starts_with(upstream::PREFIX) {
            return self.proxy.handle(req, w).await;
        }

        match req.target() {
            "/yourproblem" => write_html(w, StatusCode::BAD_REQUEST, YOUR_PROBLEM).await,
            "/myproblem" => write_html(w, StatusCode::INTERNAL_SERVER_ERROR, MY_PROBLEM).await,
            _ => write_html(w, StatusCode::OK, SUCCESS).await,
        }
    }
}

async fn write_html<W>(
    w: &mut ResponseWriter<W>,
    status: StatusCode,
    body: &str,
) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut headers = default_headers(body.len());
    headers.set("content-type", "text/html");

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(body.as_bytes()).await?;
    Ok(())
}
